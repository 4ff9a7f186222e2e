use crate::common::StoredToken;
use crate::error::AuthError;
use std::fs;
use std::path::{Path, PathBuf};

const TOKEN_FILE_NAME: &str = "token.json";

/// Persists the credential pair as a single JSON document
#[derive(Debug, Clone)]
pub struct TokenStore {
    token_path: PathBuf,
}

impl TokenStore {
    pub fn new(token_path: PathBuf) -> Self {
        Self { token_path }
    }

    /// Store under `<data dir>/medichaser/token.json`
    pub fn in_data_dir() -> Result<Self, AuthError> {
        Ok(Self::new(Self::default_path()?))
    }

    pub fn default_path() -> Result<PathBuf, AuthError> {
        let data_dir = dirs::data_dir()
            .ok_or_else(|| AuthError::Configuration("Could not find data directory".to_string()))?;
        Ok(data_dir.join("medichaser").join(TOKEN_FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.token_path
    }

    /// Replace the persisted token as a whole.
    ///
    /// The JSON is written to a sibling file first and renamed over the
    /// target, so an interrupted write never leaves a truncated token file.
    pub fn save_token(&self, token: &StoredToken) -> Result<(), AuthError> {
        let json = serde_json::to_string_pretty(token)?;

        if let Some(parent) = self.token_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).map_err(|e| {
                    AuthError::TokenStorage(format!("Failed to create token directory: {}", e))
                })?;
            }
        }

        let tmp_path = self.token_path.with_extension("json.tmp");
        fs::write(&tmp_path, json)
            .map_err(|e| AuthError::TokenStorage(format!("Failed to save token: {}", e)))?;

        // Set permissions to 0600 (read/write for owner only)
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = fs::metadata(&tmp_path)
                .map_err(|e| {
                    AuthError::TokenStorage(format!("Failed to get file permissions: {}", e))
                })?
                .permissions();
            perms.set_mode(0o600);
            fs::set_permissions(&tmp_path, perms).map_err(|e| {
                AuthError::TokenStorage(format!("Failed to set file permissions: {}", e))
            })?;
        }

        fs::rename(&tmp_path, &self.token_path)
            .map_err(|e| AuthError::TokenStorage(format!("Failed to replace token: {}", e)))?;

        Ok(())
    }

    pub fn load_token(&self) -> Result<Option<StoredToken>, AuthError> {
        if !self.token_path.exists() {
            return Ok(None);
        }

        let json = fs::read_to_string(&self.token_path)
            .map_err(|e| AuthError::TokenStorage(format!("Failed to read token: {}", e)))?;

        let token: StoredToken = serde_json::from_str(&json)?;
        Ok(Some(token))
    }

    pub fn delete_token(&self) -> Result<(), AuthError> {
        if self.token_path.exists() {
            fs::remove_file(&self.token_path)
                .map_err(|e| AuthError::TokenStorage(format!("Failed to delete token: {}", e)))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn sample_token() -> StoredToken {
        StoredToken {
            access_token: "access".into(),
            refresh_token: "refresh".into(),
            expires_at: Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap(),
        }
    }

    #[test]
    fn load_missing_token_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(dir.path().join("token.json"));

        assert!(store.load_token().unwrap().is_none());
    }

    #[test]
    fn save_creates_parent_directory_and_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(dir.path().join("nested").join("token.json"));

        store.save_token(&sample_token()).unwrap();

        assert_eq!(store.load_token().unwrap(), Some(sample_token()));
        assert!(!dir.path().join("nested").join("token.json.tmp").exists());
    }

    #[test]
    fn save_replaces_previous_token() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(dir.path().join("token.json"));
        store.save_token(&sample_token()).unwrap();

        let mut rotated = sample_token();
        rotated.access_token = "rotated".into();
        store.save_token(&rotated).unwrap();

        assert_eq!(store.load_token().unwrap().unwrap().access_token, "rotated");
    }

    #[cfg(unix)]
    #[test]
    fn saved_token_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(dir.path().join("token.json"));
        store.save_token(&sample_token()).unwrap();

        let mode = fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn delete_is_a_no_op_without_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(dir.path().join("token.json"));

        store.delete_token().unwrap();
        store.save_token(&sample_token()).unwrap();
        store.delete_token().unwrap();

        assert!(!store.path().exists());
    }
}
