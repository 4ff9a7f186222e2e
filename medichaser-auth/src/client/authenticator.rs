use chrono::Duration;
use reqwest::header::HeaderMap;
use secrecy::SecretString;
use std::sync::Arc;

use super::auth_client::{TokenClient, TokenClientError};
use super::config::AuthSettings;
use super::login::{DriverGuard, LoginDriver, MfaLogin};
use super::token_storage::TokenStore;
use crate::clock::Clock;
use crate::common::{Credentials, TokenGrant};
use crate::error::{AuthError, MfaError};
use crate::session::Session;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    Unauthenticated,
    Authenticating,
    Authenticated,
    Refreshing,
    /// The refresh token was revoked; only an interactive login recovers
    Expired,
    /// The last interactive login could not complete its MFA challenge
    LoginFailed,
}

/// Collaborators shared by every authenticator operation
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub session: Session,
    pub token_client: TokenClient,
    pub token_store: TokenStore,
    pub clock: Arc<dyn Clock>,
    pub refresh_margin: Duration,
}

impl AuthContext {
    pub fn from_settings(
        settings: &AuthSettings,
        session: Session,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, AuthError> {
        let token_store = match &settings.token_path {
            Some(path) => TokenStore::new(path.clone()),
            None => TokenStore::in_data_dir()?,
        };

        let refresh_margin = Duration::try_seconds(settings.refresh_margin_seconds)
            .ok_or_else(|| {
                AuthError::Configuration(format!(
                    "auth.refresh_margin_seconds out of range: {}",
                    settings.refresh_margin_seconds
                ))
            })?;

        Ok(Self {
            session,
            token_client: TokenClient::new(
                settings.token_url.clone(),
                settings.client_id.clone(),
                settings.scope.clone(),
            ),
            token_store,
            clock,
            refresh_margin,
        })
    }
}

/// Owns the credential pair and keeps the session's bearer header valid
pub struct Authenticator<L: MfaLogin> {
    username: String,
    password: SecretString,
    login: L,
    context: AuthContext,
    credentials: Option<Credentials>,
    state: AuthState,
}

impl<L: MfaLogin> Authenticator<L> {
    /// Create an authenticator, picking up a previously persisted token pair
    /// if one exists.
    pub fn new(
        username: impl Into<String>,
        password: SecretString,
        login: L,
        context: AuthContext,
    ) -> Self {
        let mut authenticator = Self {
            username: username.into(),
            password,
            login,
            context,
            credentials: None,
            state: AuthState::Unauthenticated,
        };

        match authenticator.context.token_store.load_token() {
            Ok(Some(token)) => {
                let credentials = Credentials::from(token);
                match authenticator.context.session.set_bearer(&credentials.access_token) {
                    Ok(()) => {
                        tracing::info!(
                            expires_at = %credentials.expires_at,
                            "Loaded persisted token"
                        );
                        authenticator.credentials = Some(credentials);
                        authenticator.state = AuthState::Authenticated;
                    }
                    Err(e) => tracing::warn!("Ignoring persisted token: {}", e),
                }
            }
            Ok(None) => tracing::debug!("No persisted token found"),
            Err(e) => tracing::warn!("Ignoring unreadable token file: {}", e),
        }

        authenticator
    }

    pub fn state(&self) -> AuthState {
        self.state
    }

    pub fn credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }

    pub fn session(&self) -> &Session {
        &self.context.session
    }

    fn needs_refresh(&self) -> bool {
        let now = self.context.clock.now();
        match &self.credentials {
            Some(credentials) => {
                credentials.access_token.is_empty()
                    || credentials.expires_within(now, self.context.refresh_margin)
            }
            None => true,
        }
    }

    fn refresh_token_value(&self) -> Option<String> {
        self.credentials
            .as_ref()
            .map(|credentials| credentials.refresh_token.clone())
            .filter(|token| !token.is_empty())
    }

    /// Make sure the session carries a usable access token and return the
    /// headers to send with the next request.
    ///
    /// Refreshes when the token is missing or about to expire, and falls back
    /// to a full interactive login when there is nothing to refresh with.
    pub async fn ensure_valid_session(&mut self) -> Result<HeaderMap, AuthError> {
        if self.needs_refresh() {
            if self.refresh_token_value().is_some() {
                self.refresh_token().await?;
            } else {
                self.login().await?;
            }
        }

        Ok(self.context.session.headers())
    }

    /// Exchange the held refresh token for a new pair.
    ///
    /// Without a refresh token this only logs a warning; the caller decides
    /// whether to start a full login.
    pub async fn refresh_token(&mut self) -> Result<(), AuthError> {
        let Some(refresh_token) = self.refresh_token_value() else {
            tracing::warn!("No refresh token available, cannot refresh access token.");
            return Ok(());
        };

        let previous = self.state;
        self.state = AuthState::Refreshing;

        match self
            .context
            .token_client
            .refresh(&self.context.session, &refresh_token)
            .await
        {
            Ok(grant) => match self.install(grant) {
                Ok(()) => {
                    self.state = AuthState::Authenticated;
                    tracing::info!("Access token refreshed");
                    Ok(())
                }
                Err(e) => {
                    self.state = previous;
                    tracing::warn!("Token refresh failed: {}", e);
                    Err(e)
                }
            },
            Err(TokenClientError::InvalidGrant) => {
                self.credentials = None;
                self.state = AuthState::Expired;
                tracing::error!("Refresh token rejected (invalid_grant), removing persisted token");
                if let Err(e) = self.context.token_store.delete_token() {
                    tracing::error!("Failed to remove revoked token: {}", e);
                }
                Err(AuthError::InvalidGrant)
            }
            Err(e) => {
                self.state = previous;
                tracing::warn!("Token refresh failed: {}", e);
                Err(e.into())
            }
        }
    }

    /// Run the interactive login through the MFA collaborator.
    ///
    /// Nothing is persisted unless the collaborator hands back a token pair.
    pub async fn login(&mut self) -> Result<(), AuthError> {
        self.state = AuthState::Authenticating;
        tracing::info!(username = %self.username, "Starting interactive login");

        let driver = match self.login.launch().await {
            Ok(driver) => driver,
            Err(e) => {
                self.state = AuthState::LoginFailed;
                tracing::error!("Could not start login: {}", e);
                return Err(e.into());
            }
        };

        let mut guard = DriverGuard::new(driver);
        let result = match guard.driver_mut() {
            Some(driver) => driver.complete_login(&self.username, &self.password).await,
            None => Err(MfaError::Launch("driver released before login".to_string())),
        };
        guard.quit();

        match result {
            Ok(grant) => match self.install(grant) {
                Ok(()) => {
                    self.state = AuthState::Authenticated;
                    tracing::info!("Interactive login succeeded");
                    Ok(())
                }
                Err(e) => {
                    self.state = AuthState::LoginFailed;
                    tracing::error!("Interactive login failed: {}", e);
                    Err(e)
                }
            },
            Err(e) => {
                self.state = AuthState::LoginFailed;
                tracing::error!("Interactive login failed: {}", e);
                Err(e.into())
            }
        }
    }

    // Header and memory are updated together; a failed save only costs us the
    // token on the next restart, so it is logged rather than failing the cycle.
    fn install(&mut self, grant: TokenGrant) -> Result<(), AuthError> {
        let credentials = Credentials::from_grant(grant, self.context.clock.now())?;
        self.context.session.set_bearer(&credentials.access_token)?;

        if let Err(e) = self
            .context
            .token_store
            .save_token(&credentials.clone().into())
        {
            tracing::error!("Failed to persist token: {}", e);
        }

        tracing::debug!(expires_at = %credentials.expires_at, "Installed new access token");
        self.credentials = Some(credentials);
        Ok(())
    }
}

impl<L: MfaLogin> std::fmt::Debug for Authenticator<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Authenticator")
            .field("username", &self.username)
            .field("state", &self.state)
            .field("expires_at", &self.credentials.as_ref().map(|c| c.expires_at))
            .finish_non_exhaustive()
    }
}
