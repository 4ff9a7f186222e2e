mod settings;

pub use settings::AuthSettings;
