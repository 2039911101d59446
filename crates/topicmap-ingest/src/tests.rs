//! Unit tests for topicmap-ingest

use std::path::{Path, PathBuf};

use topicmap_core::{Block, Fragment};

use crate::config::{ENV_HISTORY_LIMIT, ENV_MAX_DEPTH};
use crate::*;

const GUIDE_JSON: &str = r#"{
  "title": "Guide",
  "metadata": { "author": "docs team" },
  "assets": { "logo": "logo.png" },
  "blocks": [
    { "kind": "heading", "level": 1, "title": "Intro", "anchor": "intro" },
    { "kind": "paragraph", "text": "hello" },
    { "kind": "image", "asset": "logo", "alt": "Logo" },
    { "kind": "heading", "level": 1, "key": "Appendix", "title": "Notes" },
    { "kind": "xref", "anchor": "intro", "text": "back" }
  ]
}"#;

const GUIDE_YAML: &str = r#"
title: Guide
blocks:
  - kind: heading
    level: 1
    title: Intro
  - kind: table
    rows: [["a", "b"], ["1", "2"]]
"#;

fn write(dir: &Path, name: &str, contents: &[u8]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).unwrap();
    path
}

#[test]
fn test_format_detection() {
    let cases = [
        ("doc.json", Some(SourceFormat::Json)),
        ("doc.yaml", Some(SourceFormat::Yaml)),
        ("doc.yml", Some(SourceFormat::Yaml)),
        ("doc.docx", None),
        ("doc", None),
    ];
    for (name, expected) in cases {
        assert_eq!(SourceFormat::from_path(Path::new(name)), expected, "{}", name);
    }
}

#[test]
fn test_heading_key_defaults_from_level() {
    let file = SourceFile::parse(GUIDE_JSON, SourceFormat::Json).unwrap();
    let blocks: Vec<Block> = file.blocks.into_iter().map(SourceBlock::into_block).collect();
    assert_eq!(
        blocks[0],
        Block::Heading {
            level: 1,
            classification_key: "Heading1".to_string(),
            title: "Intro".to_string(),
            anchor: Some("intro".to_string()),
        }
    );
    assert!(matches!(&blocks[3], Block::Heading { classification_key, .. } if classification_key == "Appendix"));
    assert_eq!(
        blocks[4],
        Block::Content(Fragment::CrossRef {
            anchor: "intro".to_string(),
            text: "back".to_string(),
        })
    );
}

#[test]
fn test_yaml_stream() {
    let file = SourceFile::parse(GUIDE_YAML, SourceFormat::Yaml).unwrap();
    assert_eq!(file.title.as_deref(), Some("Guide"));
    assert_eq!(
        file.blocks[1],
        SourceBlock::Table {
            rows: vec![
                vec!["a".to_string(), "b".to_string()],
                vec!["1".to_string(), "2".to_string()],
            ],
        }
    );
}

#[test]
fn test_unknown_kind_is_rejected() {
    let err = SourceFile::parse(r#"{"blocks": [{"kind": "footnote"}]}"#, SourceFormat::Json).unwrap_err();
    assert!(matches!(err, IngestError::Json(_)));
}

#[test]
fn test_load_source_reads_assets() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "logo.png", b"\x89PNG");
    let path = write(dir.path(), "guide.json", GUIDE_JSON.as_bytes());

    let doc = load_source(&path).unwrap();
    assert_eq!(doc.title.as_deref(), Some("Guide"));
    assert_eq!(doc.assets["logo"], b"\x89PNG".to_vec());
    assert_eq!(doc.metadata["author"], "docs team");
    assert_eq!(doc.blocks.len(), 5);
}

#[test]
fn test_missing_asset_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(dir.path(), "guide.json", GUIDE_JSON.as_bytes());
    let err = load_source(&path).unwrap_err();
    assert!(matches!(err, IngestError::Io { .. }));
}

#[test]
fn test_undeclared_asset_is_rejected() {
    let text = r#"{"blocks": [
        {"kind": "heading", "level": 1, "title": "A"},
        {"kind": "image", "asset": "ghost"}
    ]}"#;
    let file = SourceFile::parse(text, SourceFormat::Json).unwrap();
    let err = file.resolve(Path::new(".")).unwrap_err();
    assert!(matches!(err, IngestError::UndeclaredAsset(ref a) if a == "ghost"));
}

#[test]
fn test_unknown_extension() {
    let err = load_source(Path::new("manual.docx")).unwrap_err();
    assert!(matches!(err, IngestError::UnknownFormat(_)));
}

#[test]
fn test_config_from_toml() {
    let config = EngineConfig::from_toml_str(
        r#"
history_limit = 20
slug_max_len = 32

[filter]
max_depth = 2
exclude = ["Note"]
"#,
    )
    .unwrap();
    assert_eq!(config.history_limit, 20);
    assert_eq!(config.slug_max_len, 32);
    assert_eq!(config.max_id_attempts, 1000);

    let spec = config.exclusion_spec();
    assert_eq!(spec.max_depth, Some(2));
    assert!(spec.excluded_classification_keys.contains("Note"));
    assert_eq!(config.import_options().history_limit, 20);
}

#[test]
fn test_env_overrides() {
    let mut config = EngineConfig::default();
    config
        .apply_overrides(|var| match var {
            ENV_HISTORY_LIMIT => Some("5".to_string()),
            ENV_MAX_DEPTH => Some(" 1 ".to_string()),
            _ => None,
        })
        .unwrap();
    assert_eq!(config.history_limit, 5);
    assert_eq!(config.filter.max_depth, Some(1));

    let err = config
        .apply_overrides(|var| (var == ENV_MAX_DEPTH).then(|| "deep".to_string()))
        .unwrap_err();
    assert!(matches!(err, IngestError::InvalidEnv { .. }));
}

#[test]
fn test_load_without_files_uses_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let config = EngineConfig::load(dir.path()).unwrap();
    assert_eq!(config.slug_max_len, EngineConfig::default().slug_max_len);
    assert_eq!(config.max_id_attempts, 1000);
    // Unlimited unless a cap is configured.
    assert_eq!(config.history_limit, 0);
}

#[test]
fn test_load_reads_config_file() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), CONFIG_FILE, b"max_id_attempts = 7\n");
    let config = EngineConfig::load(dir.path()).unwrap();
    assert_eq!(config.max_id_attempts, 7);
}
