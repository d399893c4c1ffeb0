//! REST API client module for the HIVA billing service.
//!
//! This module provides the `ApiClient` through which every call to the
//! billing service goes: it joins relative paths onto the configured base
//! URL, attaches the session token as a bearer header, unwraps JSON
//! bodies and logs every failure before handing it back to the caller.
//!
//! Failures are never retried or swallowed.

pub mod client;
pub mod endpoints;
pub mod error;

pub use client::{ApiClient, ApiConfig, RequestOptions};
pub use error::{status_label, status_message, ApiError, ApiResult, FailureKind};
