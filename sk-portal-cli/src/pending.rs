//! Remembering a login that still waits for its second factor
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sk_portal_core::{common::Purpose, email::Email};
use std::{
    fs::{self, create_dir_all},
    io::ErrorKind,
    path::PathBuf,
};

/// A verification that was started but not finished
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingSession {
    pub email: Email,
    pub purpose: Purpose,
}

/// JSON file holding at most one [`PendingSession`]
#[derive(Debug, Clone)]
pub struct PendingSessionStore {
    path: PathBuf,
}

impl PendingSessionStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn load(&self) -> Result<Option<PendingSession>> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e).context("Reading pending session"),
        };

        match serde_json::from_str(&contents) {
            Ok(session) => Ok(Some(session)),
            Err(e) => {
                tracing::warn!(path = ?self.path, %e, "Ignoring unreadable pending session");
                Ok(None)
            }
        }
    }

    pub fn save(&self, session: &PendingSession) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            create_dir_all(dir)?;
        }
        fs::write(&self.path, serde_json::to_vec_pretty(session)?)
            .context("Writing pending session")?;
        tracing::info!(path = ?self.path, email = %session.email, "Stored pending session");
        Ok(())
    }

    pub fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                tracing::info!(path = ?self.path, "Cleared pending session");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).context("Removing pending session"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::TempDir;
    use testresult::TestResult;

    #[test_log::test]
    fn test_missing_file_means_no_session() -> TestResult {
        let dir = TempDir::new()?;
        let store = PendingSessionStore::new(dir.path().join("pending-session.json"));
        assert_eq!(store.load()?, None);
        store.clear()?;
        Ok(())
    }

    #[test_log::test]
    fn test_save_load_clear() -> TestResult {
        let dir = TempDir::new()?;
        let store = PendingSessionStore::new(dir.path().join("nested/pending-session.json"));
        let session = PendingSession {
            email: "a@b.com".parse()?,
            purpose: Purpose::TwoFactor,
        };

        store.save(&session)?;
        assert_eq!(store.load()?, Some(session));

        store.clear()?;
        assert_eq!(store.load()?, None);
        Ok(())
    }

    #[test_log::test]
    fn test_corrupt_file_is_ignored() -> TestResult {
        let dir = TempDir::new()?;
        let path = dir.path().join("pending-session.json");
        fs::write(&path, r#"{ "email": "not-an-email", "purpose": "twofactor" }"#)?;

        assert_eq!(PendingSessionStore::new(path).load()?, None);
        Ok(())
    }
}
