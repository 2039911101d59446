//! Error types for loading block streams and configuration

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, IngestError>;

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Neither a JSON nor a YAML extension.
    #[error("unsupported block stream format: {0}")]
    UnknownFormat(PathBuf),

    #[error("invalid JSON block stream: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid YAML block stream: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid topicmap.toml: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("failed to load .env: {0}")]
    Env(#[from] dotenvy::Error),

    #[error("environment variable {var} has invalid value '{value}'")]
    InvalidEnv { var: String, value: String },

    /// An image block names an asset the stream does not declare.
    #[error("image references undeclared asset '{0}'")]
    UndeclaredAsset(String),
}

impl IngestError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        IngestError::Io {
            path: path.into(),
            source,
        }
    }
}
