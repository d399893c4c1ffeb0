//! Core library for hiva, a client of the HIVA billing service.
//!
//! - `api`: the HTTP client wrapper every service call goes through
//! - `auth`: where the session token is kept
//! - `state`: the shared cart counter
//! - `models`: companies, cart lines, invoices and invoice arithmetic
//! - `config`: base URL, timeout and credential backend settings

pub mod api;
pub mod auth;
pub mod config;
pub mod models;
pub mod state;

pub use api::{ApiClient, ApiConfig, ApiError, ApiResult, FailureKind, RequestOptions};
pub use auth::{CredentialProvider, FileStore, KeyringStore, MemoryStore};
pub use config::{Config, CredentialBackend};
pub use state::{CartCount, CartCounter, LoadPhase};
