use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PackError {
    #[error("invalid pack limits: {0}")]
    InvalidLimits(String),

    #[error("invalid prefix '{prefix}': {reason}")]
    InvalidPrefix { prefix: String, reason: String },

    #[error("input not found: {}", .0.display())]
    InputNotFound(PathBuf),

    #[error("unsupported input file '{}': expected .json, .yaml or .yml", .0.display())]
    UnsupportedInput(PathBuf),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, PackError>;
