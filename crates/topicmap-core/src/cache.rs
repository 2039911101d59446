//! Session cache under `.topicmap/`

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::generator::GeneratorOptions;
use crate::model::StructureGraph;
use crate::session::{Session, SessionState};
use crate::undo::UndoService;

/// Cache directory: .topicmap/
pub const CACHE_DIR: &str = ".topicmap";

/// Binary session file (pristine graph + history)
pub const SESSION_CACHE: &str = "session.bin";

/// Human-readable marker describing the cached session
pub const MARKER_FILE: &str = "cache.json";

/// Borrowed view with the same layout as `SessionState`.
#[derive(Serialize)]
struct SessionStateRef<'a> {
    pristine: &'a StructureGraph,
    history: &'a UndoService,
}

pub fn cache_dir(root: &Path) -> PathBuf {
    root.join(CACHE_DIR)
}

pub fn session_cache_path(root: &Path) -> PathBuf {
    root.join(CACHE_DIR).join(SESSION_CACHE)
}

pub fn marker_path(root: &Path) -> PathBuf {
    root.join(CACHE_DIR).join(MARKER_FILE)
}

/// Ensure cache directory exists
pub fn ensure_cache_dir(root: &Path) -> std::io::Result<()> {
    let cache = cache_dir(root);
    if !cache.exists() {
        std::fs::create_dir_all(&cache)?;
    }
    Ok(())
}

/// Persist `session` with bincode and refresh the JSON marker.
pub fn save_session(session: &Session, root: &Path) -> anyhow::Result<()> {
    ensure_cache_dir(root)?;
    let path = session_cache_path(root);

    let state = SessionStateRef {
        pristine: session.pristine(),
        history: session.history(),
    };
    let bytes = bincode::serialize(&state)?;
    std::fs::write(&path, bytes)?;

    let current = session.current();
    let marker = serde_json::json!({
        "version": env!("CARGO_PKG_VERSION"),
        "title": current.metadata.get("title"),
        "units": current.unit_count(),
        "containers": current.container_count(),
        "snapshots": session.history().len(),
        "cursor": session.history().cursor(),
        "cached_at": chrono::Utc::now().to_rfc3339()
    });
    std::fs::write(marker_path(root), serde_json::to_string_pretty(&marker)?)?;

    tracing::debug!("Session cache saved: {}", path.display());
    Ok(())
}

/// Load the cached session, if any.
pub fn load_session(root: &Path, options: GeneratorOptions) -> anyhow::Result<Option<Session>> {
    let path = session_cache_path(root);
    if !path.exists() {
        return Ok(None);
    }

    let bytes = std::fs::read(&path)?;
    let state: SessionState = bincode::deserialize(&bytes)?;

    tracing::debug!("Session cache loaded from: {}", path.display());
    Ok(Some(Session::from_state(state, options)))
}

/// Read the marker written alongside the session.
pub fn load_marker(root: &Path) -> anyhow::Result<Option<serde_json::Value>> {
    let path = marker_path(root);
    if !path.exists() {
        return Ok(None);
    }
    let json_str = std::fs::read_to_string(&path)?;
    Ok(Some(serde_json::from_str(&json_str)?))
}

/// Clear cache directory
pub fn clear_cache(root: &Path) -> std::io::Result<()> {
    let cache = cache_dir(root);
    if cache.exists() {
        std::fs::remove_dir_all(&cache)?;
    }
    Ok(())
}
