//! Block stream files (JSON or YAML) handed over by the document parser

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use topicmap_core::{Block, Fragment, SourceDocument};
use tracing::{debug, info};

use crate::error::{IngestError, Result};

/// On-disk encoding of a block stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Json,
    Yaml,
}

impl SourceFormat {
    /// Detect format from file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Some(SourceFormat::Json),
            Some("yml") | Some("yaml") => Some(SourceFormat::Yaml),
            _ => None,
        }
    }
}

/// One block as written in the stream file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceBlock {
    Heading {
        level: u32,
        /// Style name from the source document; `Heading{level}` when absent.
        #[serde(default)]
        key: Option<String>,
        title: String,
        #[serde(default)]
        anchor: Option<String>,
    },
    Paragraph {
        text: String,
    },
    Table {
        rows: Vec<Vec<String>>,
    },
    Image {
        asset: String,
        #[serde(default)]
        alt: Option<String>,
    },
    Xref {
        anchor: String,
        #[serde(default)]
        text: String,
    },
}

impl SourceBlock {
    pub fn into_block(self) -> Block {
        match self {
            SourceBlock::Heading {
                level,
                key,
                title,
                anchor,
            } => Block::Heading {
                level,
                classification_key: key.unwrap_or_else(|| format!("Heading{}", level)),
                title,
                anchor,
            },
            SourceBlock::Paragraph { text } => Block::Content(Fragment::Paragraph { text }),
            SourceBlock::Table { rows } => Block::Content(Fragment::Table { rows }),
            SourceBlock::Image { asset, alt } => Block::Content(Fragment::Image { asset, alt }),
            SourceBlock::Xref { anchor, text } => Block::Content(Fragment::CrossRef { anchor, text }),
        }
    }
}

/// The whole stream file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFile {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
    /// Asset reference -> file path, relative to the stream file.
    #[serde(default)]
    pub assets: BTreeMap<String, PathBuf>,
    #[serde(default)]
    pub blocks: Vec<SourceBlock>,
}

impl SourceFile {
    pub fn parse(text: &str, format: SourceFormat) -> Result<Self> {
        Ok(match format {
            SourceFormat::Json => serde_json::from_str(text)?,
            SourceFormat::Yaml => serde_yaml::from_str(text)?,
        })
    }

    /// Read asset bytes relative to `base` and convert blocks.
    pub fn resolve(self, base: &Path) -> Result<SourceDocument> {
        for block in &self.blocks {
            if let SourceBlock::Image { asset, .. } = block {
                if !self.assets.contains_key(asset) {
                    return Err(IngestError::UndeclaredAsset(asset.clone()));
                }
            }
        }

        let mut assets = BTreeMap::new();
        for (reference, rel) in &self.assets {
            let path = base.join(rel);
            let bytes = std::fs::read(&path).map_err(|e| IngestError::io(&path, e))?;
            debug!("Loaded asset '{}' ({} bytes)", reference, bytes.len());
            assets.insert(reference.clone(), bytes);
        }

        Ok(SourceDocument {
            title: self.title,
            blocks: self.blocks.into_iter().map(SourceBlock::into_block).collect(),
            assets,
            metadata: self.metadata,
        })
    }
}

/// Load a block stream file and everything it points at.
pub fn load_source(path: &Path) -> Result<SourceDocument> {
    let format = SourceFormat::from_path(path).ok_or_else(|| IngestError::UnknownFormat(path.to_path_buf()))?;
    let text = std::fs::read_to_string(path).map_err(|e| IngestError::io(path, e))?;
    let file = SourceFile::parse(&text, format)?;
    let base = path.parent().unwrap_or_else(|| Path::new("."));
    let document = file.resolve(base)?;
    info!(
        "Loaded {} blocks and {} assets from {}",
        document.blocks.len(),
        document.assets.len(),
        path.display()
    );
    Ok(document)
}
