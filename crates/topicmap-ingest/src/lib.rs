//! Block stream loading and engine configuration

pub mod blocks;
pub mod config;
pub mod error;

#[cfg(test)]
pub mod tests;

pub use blocks::{SourceBlock, SourceFile, SourceFormat, load_source};
pub use config::{EngineConfig, FilterConfig, CONFIG_FILE};
pub use error::{IngestError, Result};
