use async_trait::async_trait;
use secrecy::SecretString;

use super::auth_client::TokenClient;
use crate::common::TokenGrant;
use crate::error::MfaError;
use crate::session::Session;

/// Handle on whatever drives the interactive login (a browser, a prompt, ...)
#[async_trait]
pub trait LoginDriver: Send {
    /// Sign in and pass the multi-factor challenge, yielding a fresh token pair
    async fn complete_login(
        &mut self,
        username: &str,
        password: &SecretString,
    ) -> Result<TokenGrant, MfaError>;

    /// Release the underlying resource
    fn quit(&mut self);
}

/// Acquires a [`LoginDriver`] for one login attempt
#[async_trait]
pub trait MfaLogin: Send + Sync {
    type Driver: LoginDriver;

    async fn launch(&self) -> Result<Self::Driver, MfaError>;
}

/// Owns a driver for the duration of a login attempt and quits it on every
/// exit path, including when the login future is dropped mid-flight.
pub struct DriverGuard<D: LoginDriver> {
    driver: Option<D>,
}

impl<D: LoginDriver> DriverGuard<D> {
    pub fn new(driver: D) -> Self {
        Self {
            driver: Some(driver),
        }
    }

    pub fn driver_mut(&mut self) -> Option<&mut D> {
        self.driver.as_mut()
    }

    /// Quit the driver if one is held. Safe to call repeatedly.
    pub fn quit(&mut self) {
        if let Some(mut driver) = self.driver.take() {
            driver.quit();
            tracing::debug!("Login driver released");
        }
    }
}

impl<D: LoginDriver> Drop for DriverGuard<D> {
    fn drop(&mut self) {
        self.quit();
    }
}

/// Interactive login through the user's own browser.
///
/// Opens the sign-in page, lets the user complete the password and MFA steps
/// there, then exchanges the refresh token they paste back for a token pair.
#[derive(Debug, Clone)]
pub struct PromptLogin {
    login_url: String,
    token_client: TokenClient,
    session: Session,
}

impl PromptLogin {
    pub fn new(login_url: String, token_client: TokenClient, session: Session) -> Self {
        Self {
            login_url,
            token_client,
            session,
        }
    }
}

#[async_trait]
impl MfaLogin for PromptLogin {
    type Driver = BrowserPrompt;

    async fn launch(&self) -> Result<Self::Driver, MfaError> {
        if let Err(e) = open::that(&self.login_url) {
            eprintln!("Failed to open browser automatically: {}", e);
            eprintln!("\nPlease open this URL in your browser:");
            eprintln!("{}\n", self.login_url);
        } else {
            println!("Browser opened. Please sign in and complete the MFA challenge...");
            println!("\nYou can also open this URL directly in your browser:");
            println!("{}\n", self.login_url);
        }

        Ok(BrowserPrompt {
            token_client: self.token_client.clone(),
            session: self.session.clone(),
            open: true,
        })
    }
}

#[derive(Debug)]
pub struct BrowserPrompt {
    token_client: TokenClient,
    session: Session,
    open: bool,
}

#[async_trait]
impl LoginDriver for BrowserPrompt {
    async fn complete_login(
        &mut self,
        username: &str,
        _password: &SecretString,
    ) -> Result<TokenGrant, MfaError> {
        println!("Sign in as {} in the browser window.", username);
        println!("Once signed in, paste the refresh token from the browser session and press Enter:");

        let input = tokio::task::spawn_blocking(|| {
            let mut input = String::new();
            std::io::stdin().read_line(&mut input).map(|_| input)
        })
        .await
        .map_err(|e| MfaError::Challenge(e.to_string()))?
        .map_err(|e| MfaError::Challenge(e.to_string()))?;

        let refresh_token = input.trim();
        if refresh_token.is_empty() {
            return Err(MfaError::Challenge("no refresh token entered".to_string()));
        }

        self.token_client
            .refresh(&self.session, refresh_token)
            .await
            .map_err(|e| MfaError::Exchange(e.to_string()))
    }

    fn quit(&mut self) {
        if self.open {
            self.open = false;
            println!("Login complete, you can close the browser tab.");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingDriver {
        quits: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl LoginDriver for CountingDriver {
        async fn complete_login(
            &mut self,
            _username: &str,
            _password: &SecretString,
        ) -> Result<TokenGrant, MfaError> {
            Err(MfaError::Challenge("not used".into()))
        }

        fn quit(&mut self) {
            self.quits.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn quit_releases_driver_exactly_once() {
        let quits = Arc::new(AtomicUsize::new(0));
        let mut guard = DriverGuard::new(CountingDriver {
            quits: quits.clone(),
        });

        guard.quit();
        guard.quit();
        drop(guard);

        assert_eq!(quits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn dropping_guard_releases_driver() {
        let quits = Arc::new(AtomicUsize::new(0));
        {
            let _guard = DriverGuard::new(CountingDriver {
                quits: quits.clone(),
            });
            assert_eq!(quits.load(Ordering::SeqCst), 0);
        }
        assert_eq!(quits.load(Ordering::SeqCst), 1);
    }
}
