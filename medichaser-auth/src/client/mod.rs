pub mod auth_client;
mod authenticator;
mod config;
mod login;
mod token_storage;

pub use auth_client::TokenClient;
pub use authenticator::{AuthContext, AuthState, Authenticator};
pub use config::AuthSettings;
pub use login::{BrowserPrompt, DriverGuard, LoginDriver, MfaLogin, PromptLogin};
pub use token_storage::TokenStore;
