mod channels;
mod env;

pub use channels::{
    sender_for, telegram_text, Channel, ChannelParseError, GotifySender, NotificationSender,
    NotifyError, PushbulletSender, PushoverSender, TelegramSender, XmppSender,
};
pub use env::{EnvSource, ProcessEnv};

use itertools::Itertools;
use medicover_api::endpoints::appointments::Appointment;
use reqwest::Client;
use std::sync::Arc;

pub const NO_APPOINTMENTS: &str = "No appointments found.";

const MISSING: &str = "N/A";

/// Render records as blank-line separated blocks of `Key: value` lines
pub fn format_appointments(appointments: &[Appointment]) -> String {
    if appointments.is_empty() {
        return NO_APPOINTMENTS.to_string();
    }

    appointments.iter().map(format_appointment).join("\n\n")
}

fn format_appointment(appointment: &Appointment) -> String {
    let languages = appointment.language_names();
    let languages = if languages.is_empty() {
        MISSING.to_string()
    } else {
        languages.join(", ")
    };

    format!(
        "Date: {}\nClinic: {}\nDoctor: {}\nSpecialty: {}\nLanguages: {}",
        appointment.appointment_date.as_deref().unwrap_or(MISSING),
        appointment.clinic_name().unwrap_or(MISSING),
        appointment.doctor_name().unwrap_or(MISSING),
        appointment.specialty_name().unwrap_or(MISSING),
        languages,
    )
}

/// Log the records for the operator watching the terminal
pub fn display_appointments(appointments: &[Appointment]) {
    if appointments.is_empty() {
        tracing::info!("No new appointments found.");
        return;
    }

    tracing::info!("New appointments found:");
    for line in format_appointments(appointments).lines() {
        tracing::info!("{}", line);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    Delivered,
    Failed,
}

/// Formats appointments and hands them to the sender for one channel.
///
/// Delivery problems never surface as errors: they are logged and reported as
/// [`SendOutcome::Failed`] so a poll loop can carry on.
#[derive(Clone)]
pub struct Notifier {
    client: Client,
    env: Arc<dyn EnvSource>,
}

impl std::fmt::Debug for Notifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Notifier").finish_non_exhaustive()
    }
}

impl Notifier {
    pub fn new(client: Client, env: Arc<dyn EnvSource>) -> Self {
        Self { client, env }
    }

    pub async fn send_notification(
        &self,
        appointments: &[Appointment],
        channel: Channel,
        title: Option<&str>,
    ) -> SendOutcome {
        let message = format_appointments(appointments);

        match sender_for(channel, self.env.as_ref(), &self.client) {
            Ok(sender) => dispatch(sender.as_ref(), &message, title).await,
            Err(e) => {
                tracing::error!("{}", e);
                SendOutcome::Failed
            }
        }
    }
}

pub async fn dispatch(
    sender: &dyn NotificationSender,
    message: &str,
    title: Option<&str>,
) -> SendOutcome {
    match sender.send(message, title).await {
        Ok(()) => {
            tracing::info!(channel = %sender.channel(), "Notification sent");
            SendOutcome::Delivered
        }
        Err(e) => {
            tracing::error!("{}", e);
            SendOutcome::Failed
        }
    }
}
