use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use secrecy::SecretString;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use crate::clock::Clock;
use crate::common::TokenGrant;
use crate::error::MfaError;
use crate::{LoginDriver, MfaLogin};

/// Clock that only moves when told to
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl ManualClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(Mutex::new(now)),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner) = now;
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Login collaborator returning a canned outcome (no browser involved)
#[derive(Debug, Clone)]
pub struct StaticLogin {
    outcome: Result<TokenGrant, String>,
    launches: Arc<AtomicUsize>,
    quits: Arc<AtomicUsize>,
}

impl StaticLogin {
    pub fn succeeding(grant: TokenGrant) -> Self {
        Self {
            outcome: Ok(grant),
            launches: Arc::new(AtomicUsize::new(0)),
            quits: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn failing(reason: impl Into<String>) -> Self {
        Self {
            outcome: Err(reason.into()),
            launches: Arc::new(AtomicUsize::new(0)),
            quits: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn launches(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }

    pub fn quits(&self) -> usize {
        self.quits.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MfaLogin for StaticLogin {
    type Driver = StaticDriver;

    async fn launch(&self) -> Result<Self::Driver, MfaError> {
        self.launches.fetch_add(1, Ordering::SeqCst);
        Ok(StaticDriver {
            outcome: self.outcome.clone(),
            quits: self.quits.clone(),
        })
    }
}

#[derive(Debug)]
pub struct StaticDriver {
    outcome: Result<TokenGrant, String>,
    quits: Arc<AtomicUsize>,
}

#[async_trait]
impl LoginDriver for StaticDriver {
    async fn complete_login(
        &mut self,
        _username: &str,
        _password: &SecretString,
    ) -> Result<TokenGrant, MfaError> {
        self.outcome.clone().map_err(MfaError::Challenge)
    }

    fn quit(&mut self) {
        self.quits.fetch_add(1, Ordering::SeqCst);
    }
}
