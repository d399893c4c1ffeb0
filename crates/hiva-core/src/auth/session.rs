use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::CredentialProvider;

/// Session file name in cache directory
const SESSION_FILE: &str = "session.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionData {
    #[serde(rename = "authToken")]
    pub token: String,
    pub saved_at: DateTime<Utc>,
}

impl SessionData {
    pub fn new(token: &str) -> Self {
        Self {
            token: token.to_string(),
            saved_at: Utc::now(),
        }
    }

    pub fn age_minutes(&self) -> i64 {
        (Utc::now() - self.saved_at).num_minutes()
    }

    /// Human readable age for status output.
    pub fn age_display(&self) -> String {
        let minutes = self.age_minutes();
        if minutes < 1 {
            // Also covers clock skew
            "just now".to_string()
        } else if minutes < 60 {
            format!("{}m ago", minutes)
        } else if minutes < 1440 {
            format!("{}h ago", minutes / 60)
        } else {
            format!("{}d ago", minutes / 1440)
        }
    }
}

/// Token persisted to disk. There is no expiry: a stale token is only
/// discovered when the server answers 401.
pub struct FileStore {
    cache_dir: PathBuf,
}

impl FileStore {
    pub fn new(cache_dir: PathBuf) -> Self {
        Self { cache_dir }
    }

    /// Load session from disk
    pub fn load(&self) -> Result<Option<SessionData>> {
        let path = self.session_path();
        if !path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&path).context("Failed to read session file")?;
        let data: SessionData =
            serde_json::from_str(&contents).context("Failed to parse session file")?;
        Ok(Some(data))
    }

    fn session_path(&self) -> PathBuf {
        self.cache_dir.join(SESSION_FILE)
    }
}

impl CredentialProvider for FileStore {
    fn get(&self) -> Result<Option<String>> {
        Ok(self
            .load()?
            .map(|data| data.token)
            .filter(|token| !token.is_empty()))
    }

    fn set(&self, token: &str) -> Result<()> {
        let path = self.session_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(&SessionData::new(token))?;
        std::fs::write(path, contents).context("Failed to write session file")?;
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let path = self.session_path();
        if path.exists() {
            std::fs::remove_file(path).context("Failed to remove session file")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("hiva"));

        assert_eq!(store.get().unwrap(), None);

        store.set("secret").unwrap();
        assert_eq!(store.get().unwrap().as_deref(), Some("secret"));
        assert!(store.load().unwrap().is_some());

        store.clear().unwrap();
        assert_eq!(store.get().unwrap(), None);
        store.clear().unwrap();
    }

    #[test]
    fn test_file_store_rejects_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(SESSION_FILE), "not json").unwrap();
        let store = FileStore::new(dir.path().to_path_buf());
        assert!(store.get().is_err());
    }

    #[test]
    fn test_age_display() {
        let mut data = SessionData::new("t");
        assert_eq!(data.age_display(), "just now");

        data.saved_at = Utc::now() - Duration::minutes(5);
        assert_eq!(data.age_display(), "5m ago");

        data.saved_at = Utc::now() - Duration::hours(3);
        assert_eq!(data.age_display(), "3h ago");

        data.saved_at = Utc::now() - Duration::days(2);
        assert_eq!(data.age_display(), "2d ago");
    }
}
