use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error(
        "Configuration file not found. Checked:\n\
        - current directory: config.json\n\
        - ./.cloudscope/config.json\n\
        - ~/.config/cloudscope/config.json\n\
        Set CLOUDSCOPE_CONFIG to point at a file directly"
    )]
    ConfigFileNotFound,

    #[error("Invalid JSON in config file {path}: {source}")]
    InvalidConfig {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
