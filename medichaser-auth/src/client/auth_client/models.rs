use serde::{Deserialize, Serialize};

use crate::common::TokenGrant;

#[derive(Debug, Serialize)]
pub struct RefreshRequest<'a> {
    pub grant_type: &'static str,
    pub refresh_token: &'a str,
    pub scope: &'a str,
    pub client_id: &'a str,
}

/// Either a token grant or an OAuth error body
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum RefreshResponse {
    Error {
        error: String,
        #[serde(default)]
        error_description: Option<String>,
    },
    Grant(TokenGrant),
}

#[derive(Debug)]
pub enum TokenClientError {
    Http(reqwest::Error),
    InvalidGrant,
    OAuthError(String),
    ServerError(String),
}

impl std::fmt::Display for TokenClientError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Http(e) => write!(f, "HTTP error: {}", e),
            Self::InvalidGrant => write!(f, "Invalid grant"),
            Self::OAuthError(msg) => write!(f, "OAuth error: {}", msg),
            Self::ServerError(msg) => write!(f, "Server error: {}", msg),
        }
    }
}

impl std::error::Error for TokenClientError {}

impl From<reqwest::Error> for TokenClientError {
    fn from(err: reqwest::Error) -> Self {
        Self::Http(err)
    }
}
