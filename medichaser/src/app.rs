use anyhow::{anyhow, Result};
use medichaser_auth::{
    AuthContext, AuthError, Authenticator, Clock, PromptLogin, Session, SystemClock,
};
use medicover_api::endpoints::filters::filter_options;
use medicover_api::AppointmentFinder;
use secrecy::SecretString;
use std::sync::Arc;

use crate::cli::{FindAppointment, ListFilters};
use crate::config::Settings;
use crate::notifier::{Notifier, ProcessEnv};
use crate::run_loop::RunLoop;
use crate::scheduler::NextRun;

/// Wires configuration and account credentials into the runtime components
pub struct App {
    settings: Settings,
    username: String,
    password: SecretString,
    clock: Arc<dyn Clock>,
}

impl App {
    pub fn new(settings: Settings, username: String, password: SecretString) -> Self {
        Self {
            settings,
            username,
            password,
            clock: Arc::new(SystemClock),
        }
    }

    pub async fn find_appointment(self, args: FindAppointment) -> Result<()> {
        let session = Session::new()?;
        let authenticator = self.authenticator(session.clone())?;
        let finder = AppointmentFinder::new(session.clone(), self.settings.api.base_url.clone());
        let notifier = Notifier::new(session.client().clone(), Arc::new(ProcessEnv));
        let next_run = NextRun::new(args.interval, self.clock.clone());

        let today = self.clock.now().with_timezone(&chrono::Local).date_naive();
        let criteria = args.criteria(today);
        tracing::info!(
            region = criteria.region,
            start_date = %criteria.start_date,
            end_date = ?criteria.end_date,
            interval = ?next_run.interval_minutes(),
            "Searching for appointments"
        );

        let mut run_loop = RunLoop::new(authenticator, finder, notifier, next_run, criteria);
        if let Some(channel) = args.notification {
            run_loop = run_loop.notify_via(channel, args.title);
        }

        run_loop.run().await.map_err(login_again)
    }

    pub async fn list_filters(self, args: ListFilters) -> Result<()> {
        let session = Session::new()?;
        let mut authenticator = self.authenticator(session.clone())?;
        authenticator
            .ensure_valid_session()
            .await
            .map_err(login_again)?;

        let finder = AppointmentFinder::new(session, self.settings.api.base_url.clone());
        let metadata = finder.find_filters(args.region, args.specialty).await;

        let options = filter_options(&metadata, args.kind);
        if options.is_empty() {
            println!("No {} found.", args.kind);
        }
        for option in options {
            println!("{}", option);
        }

        Ok(())
    }

    fn authenticator(&self, session: Session) -> Result<Authenticator<PromptLogin>> {
        let context =
            AuthContext::from_settings(&self.settings.auth, session.clone(), self.clock.clone())?;
        let login = PromptLogin::new(
            self.settings.auth.login_url.clone(),
            context.token_client.clone(),
            session,
        );

        Ok(Authenticator::new(
            self.username.clone(),
            self.password.clone(),
            login,
            context,
        ))
    }
}

fn login_again(e: AuthError) -> anyhow::Error {
    if e.is_terminal() {
        anyhow!("{}. Run medichaser again to sign in from scratch.", e)
    } else {
        e.into()
    }
}
