use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::AuthError;

/// Token grant as handed out by the token endpoint or an interactive login
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenGrant {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
}

/// Credential pair held by the authenticator during a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
}

impl Credentials {
    /// `expires_at` is always `now + expires_in` at the moment the grant was observed.
    ///
    /// A lifetime that does not fit a timestamp is rejected instead of
    /// installed.
    pub fn from_grant(grant: TokenGrant, now: DateTime<Utc>) -> Result<Self, AuthError> {
        let expires_at = Duration::try_seconds(grant.expires_in)
            .and_then(|lifetime| now.checked_add_signed(lifetime))
            .ok_or(AuthError::TokenLifetime(grant.expires_in))?;

        Ok(Self {
            access_token: grant.access_token,
            refresh_token: grant.refresh_token,
            expires_at,
        })
    }

    /// A margin reaching past the end of time counts as expiring.
    pub fn expires_within(&self, now: DateTime<Utc>, margin: Duration) -> bool {
        now.checked_add_signed(margin)
            .is_none_or(|limit| self.expires_at <= limit)
    }
}

/// Persisted form of [`Credentials`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredToken {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(
        serialize_with = "chrono::serde::ts_seconds::serialize",
        deserialize_with = "deserialize_expiry"
    )]
    pub expires_at: DateTime<Utc>,
}

impl From<Credentials> for StoredToken {
    fn from(credentials: Credentials) -> Self {
        Self {
            access_token: credentials.access_token,
            refresh_token: credentials.refresh_token,
            expires_at: credentials.expires_at,
        }
    }
}

impl From<StoredToken> for Credentials {
    fn from(token: StoredToken) -> Self {
        Self {
            access_token: token.access_token,
            refresh_token: token.refresh_token,
            expires_at: token.expires_at,
        }
    }
}

// Token files are written as unix seconds, but older files may carry RFC 3339.
fn deserialize_expiry<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Expiry {
        Seconds(i64),
        Fractional(f64),
        Text(String),
    }

    match Expiry::deserialize(deserializer)? {
        Expiry::Seconds(secs) => DateTime::from_timestamp(secs, 0)
            .ok_or_else(|| serde::de::Error::custom(format!("timestamp out of range: {secs}"))),
        Expiry::Fractional(secs) => DateTime::from_timestamp(secs.trunc() as i64, 0)
            .ok_or_else(|| serde::de::Error::custom(format!("timestamp out of range: {secs}"))),
        Expiry::Text(text) => DateTime::parse_from_rfc3339(&text)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(serde::de::Error::custom),
    }
}
