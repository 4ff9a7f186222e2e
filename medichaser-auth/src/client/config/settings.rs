use serde::Deserialize;
use std::path::PathBuf;

/// `[auth]` section of the application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct AuthSettings {
    #[serde(default = "default_token_url")]
    pub token_url: String,

    #[serde(default = "default_login_url")]
    pub login_url: String,

    #[serde(default = "default_client_id")]
    pub client_id: String,

    #[serde(default = "default_scope")]
    pub scope: String,

    /// Defaults to `<data dir>/medichaser/token.json`
    #[serde(default)]
    pub token_path: Option<PathBuf>,

    #[serde(default = "default_refresh_margin")]
    pub refresh_margin_seconds: i64,
}

fn default_token_url() -> String {
    "https://login-online24.medicover.pl/connect/token".to_string()
}

fn default_login_url() -> String {
    "https://online24.medicover.pl/signin-oidc".to_string()
}

fn default_client_id() -> String {
    "web".to_string()
}

fn default_scope() -> String {
    "openid offline_access profile".to_string()
}

const MAX_REFRESH_MARGIN_SECONDS: i64 = 24 * 60 * 60;

fn default_refresh_margin() -> i64 {
    60
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            token_url: default_token_url(),
            login_url: default_login_url(),
            client_id: default_client_id(),
            scope: default_scope(),
            token_path: None,
            refresh_margin_seconds: default_refresh_margin(),
        }
    }
}

impl AuthSettings {
    pub fn validate(&self) -> Result<(), String> {
        for (key, url) in [("auth.token_url", &self.token_url), ("auth.login_url", &self.login_url)] {
            if url.is_empty() {
                return Err(format!("{} is required", key));
            }
            if !url.starts_with("http") {
                return Err(format!("{} must be a valid HTTP(S) URL", key));
            }
        }
        if self.client_id.is_empty() {
            return Err("auth.client_id is required".to_string());
        }
        if self.refresh_margin_seconds < 0 {
            return Err("auth.refresh_margin_seconds must not be negative".to_string());
        }
        if self.refresh_margin_seconds > MAX_REFRESH_MARGIN_SECONDS {
            return Err(format!(
                "auth.refresh_margin_seconds must be at most {}",
                MAX_REFRESH_MARGIN_SECONDS
            ));
        }
        Ok(())
    }
}
