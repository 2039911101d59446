//! CLI command implementations

use std::path::Path;

use anyhow::{Context, bail};
use topicmap_core::{Edit, ExclusionSpec, Session, StructureGraph};
use topicmap_ingest::EngineConfig;

/// Load configuration and the cached session for `root`.
fn open(root: &Path) -> anyhow::Result<(EngineConfig, Session)> {
    let config = EngineConfig::load(root)?;
    let session = topicmap_core::load_session(root, config.generator_options())?
        .with_context(|| format!("no session under {}; run `topicmap import <file>` first", root.display()))?;
    Ok((config, session))
}

fn print_outline(graph: &StructureGraph) {
    if graph.is_empty() {
        println!("(empty)");
        return;
    }
    graph.walk(|path, depth, entry| {
        let indent = "  ".repeat(depth.saturating_sub(1));
        match &entry.ref_id {
            Some(ref_id) => println!(
                "{}{} {} [{}]{}",
                indent,
                path,
                entry.title,
                ref_id,
                if entry.synthetic { " (intro)" } else { "" }
            ),
            None => println!("{}{} {}/", indent, path, entry.title),
        }
    });
}

pub fn import(root: &Path, file: &Path) -> anyhow::Result<()> {
    tracing::info!("Importing {}", file.display());

    let config = EngineConfig::load(root)?;
    let source = topicmap_ingest::load_source(file)?;
    let session = Session::import(&source, config.import_options())?;
    topicmap_core::save_session(&session, root)?;

    print_outline(session.current());
    Ok(())
}

pub fn show(root: &Path) -> anyhow::Result<()> {
    let (_, session) = open(root)?;
    if let Some(spec) = session.active_filter() {
        println!("{}", Edit::Filter { spec: spec.clone() }.label());
    }
    print_outline(session.current());
    Ok(())
}

pub fn filter(root: &Path, max_depth: Option<u32>, exclude: Vec<String>, commit: bool) -> anyhow::Result<()> {
    let (config, mut session) = open(root)?;

    let spec = if max_depth.is_none() && exclude.is_empty() {
        config.exclusion_spec()
    } else {
        ExclusionSpec {
            max_depth,
            excluded_classification_keys: exclude.into_iter().collect(),
        }
    };
    if spec == ExclusionSpec::default() {
        bail!("nothing to filter: pass --max-depth or --exclude, or set [filter] in topicmap.toml");
    }

    if commit {
        let diff = session.commit_filter(spec)?;
        topicmap_core::save_session(&session, root)?;
        println!("{}", diff.summary());
        print_outline(session.current());
    } else {
        let report = session.preview(&spec)?;
        print_outline(&report.graph);
        for (from, to) in &report.redirects {
            match to {
                Some(to) => println!("  {} -> {}", from, to),
                None => println!("  {} dropped", from),
            }
        }
        println!("{} entries collapsed (preview only)", report.collapsed);
    }
    Ok(())
}

pub fn edit(root: &Path, edit: Edit) -> anyhow::Result<()> {
    let (_, mut session) = open(root)?;
    let diff = session.apply(&edit)?;
    topicmap_core::save_session(&session, root)?;

    println!("{}: {}", edit.label(), diff.summary());
    print_outline(session.current());
    Ok(())
}

pub fn undo(root: &Path) -> anyhow::Result<()> {
    let (_, mut session) = open(root)?;
    let label = session.history().undo_label().map(str::to_string);
    match session.undo() {
        Some(diff) => {
            topicmap_core::save_session(&session, root)?;
            println!("undid {}: {}", label.unwrap_or_default(), diff.summary());
        }
        None => println!("nothing to undo"),
    }
    Ok(())
}

pub fn redo(root: &Path) -> anyhow::Result<()> {
    let (_, mut session) = open(root)?;
    let label = session.history().redo_label().map(str::to_string);
    match session.redo() {
        Some(diff) => {
            topicmap_core::save_session(&session, root)?;
            println!("redid {}: {}", label.unwrap_or_default(), diff.summary());
        }
        None => println!("nothing to redo"),
    }
    Ok(())
}

pub fn restore(root: &Path) -> anyhow::Result<()> {
    let (_, mut session) = open(root)?;
    let diff = session.restore_pristine();
    topicmap_core::save_session(&session, root)?;
    println!("restored: {}", diff.summary());
    Ok(())
}

pub fn history(root: &Path) -> anyhow::Result<()> {
    let (_, session) = open(root)?;
    let history = session.history();
    for (idx, snapshot) in history.history().iter().enumerate() {
        let marker = if idx == history.cursor() { "*" } else { " " };
        println!(
            "{} #{:<4} {}  {}",
            marker,
            snapshot.sequence,
            snapshot.taken_at.format("%Y-%m-%d %H:%M:%S"),
            snapshot.label
        );
    }
    Ok(())
}

pub fn stats(root: &Path, json: bool) -> anyhow::Result<()> {
    let (_, session) = open(root)?;
    let stats = topicmap_core::stats(session.current());

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }
    println!(
        "{} units, {} containers, depth {}",
        stats.units, stats.containers, stats.max_depth
    );
    for (key, count) in &stats.counts {
        let levels: Vec<_> = stats.levels[key].iter().map(u32::to_string).collect();
        println!("  {:<20} {:>4}  levels {}", key, count, levels.join(","));
    }
    Ok(())
}

/// Write `structure.json` plus one file per asset under `out/assets/`.
pub fn export(root: &Path, out: &Path) -> anyhow::Result<()> {
    let (_, session) = open(root)?;
    let graph = session.current();

    let assets_dir = out.join("assets");
    std::fs::create_dir_all(&assets_dir).with_context(|| format!("creating {}", assets_dir.display()))?;

    let structure = serde_json::json!({
        "metadata": graph.metadata,
        "entries": graph.entries,
        "documents": graph.documents,
        "assets": graph.assets.keys().collect::<Vec<_>>(),
    });
    let structure_path = out.join("structure.json");
    std::fs::write(&structure_path, serde_json::to_string_pretty(&structure)?)?;

    for (reference, bytes) in &graph.assets {
        if Path::new(reference).file_name().and_then(|n| n.to_str()) != Some(reference.as_str()) {
            tracing::warn!("Skipping asset with non-file name '{}'", reference);
            continue;
        }
        std::fs::write(assets_dir.join(reference), bytes)?;
    }

    tracing::info!(
        "Exported {} documents and {} assets to {}",
        graph.documents.len(),
        graph.assets.len(),
        out.display()
    );
    Ok(())
}

pub fn clear(root: &Path) -> anyhow::Result<()> {
    tracing::info!("Clearing cache for: {}", root.display());

    topicmap_core::clear_cache(root)?;

    tracing::info!("Cache cleared");
    Ok(())
}
