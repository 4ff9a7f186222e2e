use medichaser_auth::{AuthError, Authenticator, MfaLogin};
use medicover_api::endpoints::appointments::FilterCriteria;
use medicover_api::AppointmentFinder;

use crate::notifier::{display_appointments, Channel, Notifier, SendOutcome};
use crate::scheduler::NextRun;

/// Where to send results, when the user asked for notifications
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationTarget {
    pub channel: Channel,
    pub title: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleReport {
    /// Authentication failed in a way the next cycle may recover from
    Skipped,
    Completed {
        found: usize,
        notified: Option<SendOutcome>,
    },
}

/// Authenticate, search, notify, sleep; repeat until the schedule says stop
pub struct RunLoop<L: MfaLogin> {
    authenticator: Authenticator<L>,
    finder: AppointmentFinder,
    notifier: Notifier,
    next_run: NextRun,
    criteria: FilterCriteria,
    notification: Option<NotificationTarget>,
}

impl<L: MfaLogin> RunLoop<L> {
    pub fn new(
        authenticator: Authenticator<L>,
        finder: AppointmentFinder,
        notifier: Notifier,
        next_run: NextRun,
        criteria: FilterCriteria,
    ) -> Self {
        Self {
            authenticator,
            finder,
            notifier,
            next_run,
            criteria,
            notification: None,
        }
    }

    pub fn notify_via(mut self, channel: Channel, title: Option<String>) -> Self {
        self.notification = Some(NotificationTarget { channel, title });
        self
    }

    pub fn authenticator(&self) -> &Authenticator<L> {
        &self.authenticator
    }

    pub fn next_run(&self) -> &NextRun {
        &self.next_run
    }

    /// Run one poll cycle.
    ///
    /// Only terminal authentication failures (revoked refresh token, failed
    /// MFA) are returned; anything else is logged and the cycle is skipped.
    pub async fn run_cycle(&mut self) -> Result<CycleReport, AuthError> {
        match self.poll().await {
            Err(e) if !e.is_terminal() => {
                tracing::warn!("Skipping this cycle, authentication failed: {}", e);
                Ok(CycleReport::Skipped)
            }
            result => result,
        }
    }

    async fn poll(&mut self) -> Result<CycleReport, AuthError> {
        self.authenticator.ensure_valid_session().await?;

        let appointments = self.finder.find_appointments(&self.criteria).await;
        display_appointments(&appointments);

        let notified = match &self.notification {
            Some(target) if !appointments.is_empty() => Some(
                self.notifier
                    .send_notification(&appointments, target.channel, target.title.as_deref())
                    .await,
            ),
            _ => None,
        };

        Ok(CycleReport::Completed {
            found: appointments.len(),
            notified,
        })
    }

    /// Poll until stopped. A one-shot run has no later cycle to retry in,
    /// so every authentication failure is returned.
    pub async fn run(&mut self) -> Result<(), AuthError> {
        if self.next_run.is_one_shot() {
            return self.poll().await.map(|_| ());
        }

        loop {
            if self.next_run.is_time_to_run() {
                self.run_cycle().await?;
                self.next_run.set_next_run();
                tracing::info!(next_run = %self.next_run.next_run(), "Waiting for next cycle");
            }

            tokio::time::sleep(self.next_run.time_until_next_run()).await;
        }
    }
}
