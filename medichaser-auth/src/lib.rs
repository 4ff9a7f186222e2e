// Credential models shared by the store, the token client and the authenticator
pub mod common;

mod client;
mod clock;
mod error;
mod session;

pub use client::{
    auth_client::TokenClientError, AuthContext, AuthSettings, AuthState, Authenticator,
    BrowserPrompt, DriverGuard, LoginDriver, MfaLogin, PromptLogin, TokenClient, TokenStore,
};
pub use clock::{Clock, SystemClock};
pub use common::{Credentials, StoredToken, TokenGrant};
pub use error::{AuthError, MfaError};
pub use session::Session;

// Always expose testing module (downstream crates' tests need it)
pub mod testing;
