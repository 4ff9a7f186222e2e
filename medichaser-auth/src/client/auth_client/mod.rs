mod models;

use crate::common::TokenGrant;
use crate::session::Session;
pub use models::TokenClientError;
use models::*;

const REFRESH_GRANT_TYPE: &str = "refresh_token";

/// Talks to the OAuth token endpoint
#[derive(Debug, Clone)]
pub struct TokenClient {
    token_url: String,
    client_id: String,
    scope: String,
}

impl TokenClient {
    pub fn new(token_url: String, client_id: String, scope: String) -> Self {
        Self {
            token_url,
            client_id,
            scope,
        }
    }

    /// Exchange a refresh token for a new token pair.
    ///
    /// The status code is not trusted on its own: the provider answers some
    /// failures with a 200 and an `error` field, so the body decides.
    pub async fn refresh(
        &self,
        session: &Session,
        refresh_token: &str,
    ) -> Result<TokenGrant, TokenClientError> {
        let form = RefreshRequest {
            grant_type: REFRESH_GRANT_TYPE,
            refresh_token,
            scope: &self.scope,
            client_id: &self.client_id,
        };

        let response = session
            .client()
            .post(&self.token_url)
            .headers(session.headers_without_bearer())
            .form(&form)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        match serde_json::from_str::<RefreshResponse>(&body) {
            Ok(RefreshResponse::Grant(grant)) => Ok(grant),
            Ok(RefreshResponse::Error { error, .. }) if error == "invalid_grant" => {
                Err(TokenClientError::InvalidGrant)
            }
            Ok(RefreshResponse::Error {
                error,
                error_description,
            }) => Err(TokenClientError::OAuthError(match error_description {
                Some(description) => format!("{}: {}", error, description),
                None => error,
            })),
            Err(_) => Err(TokenClientError::ServerError(format!(
                "unexpected token response ({}): {}",
                status, body
            ))),
        }
    }
}
