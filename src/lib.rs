//! Read-only HTTP API over a CSV dataset of government contracts.

pub mod config;
pub mod dataset;
pub mod error;
pub mod filter;
pub mod search;
pub mod server;

pub use dataset::{ContractTable, RowView};
pub use error::{ApiError, FilterError, LoadError};
pub use filter::{normalize_amount, ContractFilter};
pub use server::{create_router, ApiOptions, AppState, TableSource};
