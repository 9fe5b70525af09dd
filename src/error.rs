//! Error types for heat-nn.

use std::path::PathBuf;

use thiserror::Error;

use crate::config::validate::ValidationError;

/// Top-level error type for heat-nn.
#[derive(Debug, Error)]
pub enum HeatNnError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration: {0}")]
    Validation(#[from] ValidationError),

    #[error("YAML error in {path}: {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Architecture '{name}' not found in {db}")]
    ArchNotFound { name: String, db: PathBuf },

    #[error("Checkpoint error: {0}")]
    Checkpoint(String),

    #[error("Shape mismatch: expected {expected:?}, got {got:?}")]
    Shape {
        expected: (usize, usize),
        got: (usize, usize),
    },

    #[error("NPY format error: {0}")]
    Npy(String),

    #[error("Dataset error: {0}")]
    Dataset(String),

    #[error("Plot error: {0}")]
    Plot(#[from] image::ImageError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl HeatNnError {
    /// Create an IO error with context.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }
}

/// Result type alias for heat-nn.
pub type Result<T> = std::result::Result<T, HeatNnError>;
