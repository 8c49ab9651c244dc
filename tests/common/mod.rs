#![allow(dead_code)]

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use contracts_api::{create_router, ApiOptions, AppState, TableSource};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tower::ServiceExt;

pub const CONTRACTS_CSV: &str = "\
Contract ID,Legal Business Name,Entity State,NAICS Description,Contracting Agency,Action Obligation ($),Tags,Latitude,Longitude
C-100,Acme Corp,Texas,Engineering Services,Department of Defense,\"$1,234.50\",\"Defense, Aerospace\",30.27,-97.74
C-200,Beta LLC,ohio,Software Publishers,General Services Administration,900,\"IT, Cloud\",39.96,-83.0
,Gamma Inc,Texas,Engineering Services,Department of Energy,12,Energy,29.76,-95.37
C-400,Delta Co,TEXAS,Computer Systems Design,Department of Defense,not disclosed,Data,32.78,-96.8
\"  \",Epsilon Group,Utah,Research and Development,NASA,\"$50,000.00\",Space,40.76,-111.89
C-600,Zeta Ltd,California,Software Publishers,Department of Veterans Affairs,\"$2,500\",\"Healthcare, IT\",34.05,-118.24
C-700,Eta Partners,,Software Publishers,Department of Commerce,10,IT,,
";

/// A temporary directory holding one contracts file.
pub struct Fixture {
    _dir: TempDir,
    pub path: PathBuf,
}

impl Fixture {
    pub fn new(contents: &str) -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("contracts.csv");
        fs::write(&path, contents).expect("write fixture csv");
        Self { _dir: dir, path }
    }

    /// A path inside the fixture directory that does not exist yet.
    pub fn missing() -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("absent.csv");
        Self { _dir: dir, path }
    }

    pub fn rewrite(&self, contents: &str) {
        fs::write(&self.path, contents).expect("rewrite fixture csv");
    }
}

pub fn app(path: &Path) -> Router {
    app_with(TableSource::per_request(path), ApiOptions::default())
}

pub fn app_with(source: TableSource, options: ApiOptions) -> Router {
    create_router(AppState::new(source, options))
}

pub async fn send(app: &Router, method: Method, uri: &str) -> (StatusCode, String) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

pub async fn get_json(app: &Router, uri: &str) -> (StatusCode, Value) {
    let (status, body) = send(app, Method::GET, uri).await;
    let json = serde_json::from_str(&body).unwrap_or_else(|e| panic!("invalid JSON {:?}: {}", body, e));
    (status, json)
}

pub fn contract_ids(json: &Value) -> Vec<String> {
    json.as_array()
        .expect("array of contracts")
        .iter()
        .map(|c| c["Contract ID"].as_str().unwrap_or_default().to_string())
        .collect()
}
