use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::Client;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use crate::error::AuthError;

const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// HTTP client plus the header set every authenticated request carries.
///
/// Clones share the header map, so a holder sees the `Authorization` header
/// change as soon as the authenticator rotates the token.
#[derive(Debug, Clone)]
pub struct Session {
    client: Client,
    headers: Arc<RwLock<HeaderMap>>,
}

impl Session {
    pub fn new() -> Result<Self, AuthError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(Self::with_client(client))
    }

    pub fn with_client(client: Client) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(USER_AGENT, HeaderValue::from_static(APP_USER_AGENT));

        Self {
            client,
            headers: Arc::new(RwLock::new(headers)),
        }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Snapshot of the current headers
    pub fn headers(&self) -> HeaderMap {
        self.headers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Snapshot of the headers minus `Authorization`, for the token endpoint
    pub(crate) fn headers_without_bearer(&self) -> HeaderMap {
        let mut headers = self.headers();
        headers.remove(AUTHORIZATION);
        headers
    }

    pub fn bearer(&self) -> Option<String> {
        self.headers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
    }

    pub(crate) fn set_bearer(&self, access_token: &str) -> Result<(), AuthError> {
        let mut value = HeaderValue::from_str(&format!("Bearer {}", access_token))?;
        value.set_sensitive(true);

        self.headers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(AUTHORIZATION, value);
        Ok(())
    }
}
