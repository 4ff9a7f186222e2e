use thiserror::Error;

use crate::client::auth_client::TokenClientError;

/// Failure to complete the interactive multi-factor login
#[derive(Error, Debug)]
pub enum MfaError {
    #[error("Failed to start login driver: {0}")]
    Launch(String),

    #[error("MFA challenge was not completed: {0}")]
    Challenge(String),

    #[error("Login did not yield a token pair: {0}")]
    Exchange(String),
}

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Invalid grant: refresh token was rejected, interactive login required")]
    InvalidGrant,

    #[error("MFA error: {0}")]
    Mfa(#[from] MfaError),

    #[error("Token refresh failed: {0}")]
    Refresh(String),

    #[error("Token lifetime out of range: {0} seconds")]
    TokenLifetime(i64),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid header value: {0}")]
    Header(#[from] reqwest::header::InvalidHeaderValue),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Token storage error: {0}")]
    TokenStorage(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AuthError {
    /// Terminal errors need a human at the keyboard; retrying the same
    /// credentials on the next cycle will not help.
    pub fn is_terminal(&self) -> bool {
        matches!(self, AuthError::InvalidGrant | AuthError::Mfa(_))
    }
}

impl From<TokenClientError> for AuthError {
    fn from(err: TokenClientError) -> Self {
        match err {
            TokenClientError::InvalidGrant => AuthError::InvalidGrant,
            TokenClientError::Http(e) => AuthError::Http(e),
            other => AuthError::Refresh(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_invalid_grant_and_mfa_are_terminal() {
        assert!(AuthError::InvalidGrant.is_terminal());
        assert!(AuthError::Mfa(MfaError::Challenge("code rejected".into())).is_terminal());
        assert!(!AuthError::Refresh("temporarily_unavailable".into()).is_terminal());
        assert!(!AuthError::TokenStorage("disk full".into()).is_terminal());
    }

    #[test]
    fn token_client_invalid_grant_maps_to_terminal_error() {
        let err: AuthError = TokenClientError::InvalidGrant.into();
        assert!(matches!(err, AuthError::InvalidGrant));

        let err: AuthError = TokenClientError::OAuthError("invalid_client".into()).into();
        assert!(matches!(err, AuthError::Refresh(_)));
    }
}
