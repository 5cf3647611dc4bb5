//! Error types.
//!
//! Library code returns [`PipelineError`]; the binary boundary converts it into
//! an [`AppError`] that carries the process exit code.
//!
//! Exit codes:
//! - `2`: input, configuration, or filesystem problems
//! - `3`: a required source produced no data
//! - `4`: the remote extraction service failed

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("No partitions matching prefix '{prefix}' in '{}'", dir.display())]
    SourceNotFound { prefix: String, dir: PathBuf },

    #[error("Missing required column `{column}` in source '{source_name}'")]
    MissingColumn { source_name: String, column: String },

    #[error("Remote request for '{path}' failed with status {status}")]
    RemoteStatus { path: String, status: u16 },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Missing credential {0} in environment (.env)")]
    Credentials(&'static str),

    #[error("CSV error in '{}': {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid configuration file: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("I/O error on '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl PipelineError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn csv(path: impl Into<PathBuf>, source: csv::Error) -> Self {
        Self::Csv {
            path: path.into(),
            source,
        }
    }

    pub fn exit_code(&self) -> u8 {
        match self {
            Self::SourceNotFound { .. } | Self::MissingColumn { .. } => 3,
            Self::RemoteStatus { .. } | Self::Http(_) | Self::Credentials(_) => 4,
            Self::Csv { .. } | Self::Json(_) | Self::Toml(_) | Self::Io { .. } | Self::Config(_) => 2,
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl From<PipelineError> for AppError {
    fn from(err: PipelineError) -> Self {
        Self::new(err.exit_code(), err.to_string())
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}
