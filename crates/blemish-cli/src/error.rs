use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] blemish_core::Error),
    #[error(transparent)]
    Remote(#[from] blemish_core::sync::RemoteError),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("Inspector name cannot be empty")]
    EmptyInspector,
    #[error("Invalid {0} id: {1}")]
    InvalidId(&'static str, String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error(
        "No API endpoint configured. Set BLEMISH_API_URL or add \"api_url\" to the config file."
    )]
    ApiNotConfigured,
}
