mod app;
pub mod cli;
pub mod config;
pub mod logging;
pub mod notifier;
pub mod run_loop;
pub mod scheduler;

pub use app::App;
