mod models;

pub use models::{Credentials, StoredToken, TokenGrant};
