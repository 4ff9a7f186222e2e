use anyhow::{Context, Result};
use clap::Parser;
use secrecy::SecretString;

use medichaser::cli::{Cli, Command};
use medichaser::config::Settings;
use medichaser::logging::init_logging;
use medichaser::App;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Channel credentials usually live in .env
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let settings = Settings::new().context("Failed to load configuration")?;
    settings.validate().map_err(anyhow::Error::msg)?;

    let log_dir = settings.logging.file_directory();
    let _guard = init_logging(log_dir.as_deref())?;

    tracing::info!("medichaser starting");

    let app = App::new(settings, cli.username, SecretString::from(cli.password));
    let work = async {
        match cli.command {
            Command::FindAppointment(args) => app.find_appointment(args).await,
            Command::ListFilters(args) => app.list_filters(args).await,
        }
    };

    tokio::select! {
        result = work => result,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Interrupted, shutting down");
            Ok(())
        }
    }
}
