//! Authentication module for holding the session credential.
//!
//! This module provides:
//! - `CredentialProvider`: where the bearer token lives (get/set/clear)
//! - `KeyringStore`: OS-level credential storage via keyring
//! - `FileStore`: token persisted as `session.json` in the cache directory
//! - `MemoryStore`: process-local token, used by tests
//!
//! The token is written by an external login flow. The API client only
//! ever reads it.

pub mod credentials;
pub mod session;

pub use credentials::{CredentialProvider, KeyringStore, MemoryStore};
pub use session::{FileStore, SessionData};
