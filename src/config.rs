use crate::server::{ApiOptions, TableSource, DEFAULT_ALLOWED_ORIGIN};
use anyhow::{Context, Result};
use axum::http::HeaderValue;
use clap::Parser;
use std::path::PathBuf;

pub const DEFAULT_DATA_PATH: &str = "../public/data/geocoded_data1.csv";
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:5001";

#[derive(Parser, Debug, Clone)]
#[command(name = "contracts-api")]
#[command(about = "Read-only HTTP API over a CSV dataset of government contracts")]
pub struct Config {
    /// Address to listen on
    #[arg(long, env = "CONTRACTS_BIND_ADDR", default_value = DEFAULT_BIND_ADDR)]
    pub bind: String,

    /// Path to the contracts CSV file
    #[arg(long, env = "CONTRACTS_DATA_PATH", default_value = DEFAULT_DATA_PATH)]
    pub data_path: PathBuf,

    /// The single origin allowed to make cross-origin requests
    #[arg(long, env = "CONTRACTS_ALLOWED_ORIGIN", default_value = DEFAULT_ALLOWED_ORIGIN)]
    pub allowed_origin: String,

    /// Load the dataset once at startup instead of on every request
    #[arg(long, env = "CONTRACTS_PRELOAD")]
    pub preload: bool,

    /// Return states and descriptions in file order instead of sorted
    #[arg(long, env = "CONTRACTS_UNSORTED_LISTS")]
    pub unsorted_lists: bool,

    /// Keep rows whose contract id is missing or blank
    #[arg(long, env = "CONTRACTS_ALLOW_MISSING_IDS")]
    pub allow_missing_ids: bool,
}

impl Config {
    pub fn api_options(&self) -> Result<ApiOptions> {
        let allowed_origin = HeaderValue::from_str(&self.allowed_origin)
            .with_context(|| format!("Invalid allowed origin: {}", self.allowed_origin))?;

        Ok(ApiOptions {
            sort_lists: !self.unsorted_lists,
            require_contract_id: !self.allow_missing_ids,
            allowed_origin,
        })
    }

    pub async fn table_source(&self) -> TableSource {
        if self.preload {
            TableSource::preloaded(self.data_path.clone()).await
        } else {
            TableSource::per_request(self.data_path.clone())
        }
    }
}
