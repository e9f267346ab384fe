//! CLI module
//!
//! Provides:
//! - Argument parsing (`clap`)
//! - Layered settings (defaults, file, environment, flags)
//! - Logging setup
//! - Process wiring for the server and one-shot modes

pub mod args;
pub mod bootstrap;
pub mod logging;
pub mod settings;

// Re-exports
pub use args::{Args, LogFormatArg, ModeArg};
pub use bootstrap::{load_descriptions, run_once, run_server};
pub use settings::{LogFormat, Settings, StoreMode};

/// CLI errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid settings: {0}")]
    InvalidSettings(String),

    #[error("Settings error: {0}")]
    Settings(#[from] config::ConfigError),

    #[error("Test description error: {0}")]
    Descriptions(#[from] perfdash_core::ConfigError),

    #[error("Artifact store error: {0}")]
    Store(#[from] perfdash_core::StoreError),

    #[error("Logging setup failed: {0}")]
    Logging(String),

    #[error("Server error: {0}")]
    Server(anyhow::Error),
}

/// Exit codes
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILURE: i32 = 1;
pub const EXIT_CONFIG_ERROR: i32 = 2;

impl Error {
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::InvalidSettings(_) | Error::Settings(_) | Error::Descriptions(_) => {
                EXIT_CONFIG_ERROR
            }
            _ => EXIT_FAILURE,
        }
    }
}

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, Error>;
