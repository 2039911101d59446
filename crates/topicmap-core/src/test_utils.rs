//! Test utilities for topicmap-core

use crate::generator::{build_structure, GeneratorOptions};
use crate::model::*;

pub fn para(text: &str) -> ContentBlock {
    ContentBlock::Paragraph {
        text: text.to_string(),
    }
}

pub fn heading_with_anchor(level: u32, key: &str, title: &str, anchor: &str) -> Block {
    Block::Heading {
        level,
        classification_key: key.to_string(),
        title: title.to_string(),
        anchor: Some(anchor.to_string()),
    }
}

pub fn xref(anchor: &str, text: &str) -> Block {
    Block::Content(Fragment::CrossRef {
        anchor: anchor.to_string(),
        text: text.to_string(),
    })
}

/// Build a graph from blocks, panicking on failure.
pub fn graph_from(blocks: &[Block]) -> StructureGraph {
    build_structure(blocks, None, GeneratorOptions::default()).unwrap()
}

/// `H1 > H2 > H3`, each with one paragraph.
pub fn chain_blocks() -> Vec<Block> {
    vec![
        Block::heading(1, "Heading1", "H1"),
        Block::paragraph("h1 body"),
        Block::heading(2, "Heading2", "H2"),
        Block::paragraph("h2 body"),
        Block::heading(3, "Heading3", "H3"),
        Block::paragraph("h3 body"),
    ]
}

pub fn chain_graph() -> StructureGraph {
    graph_from(&chain_blocks())
}

/// Guide (with Install beneath) and an Appendix that references Install,
/// while Install points back at the Guide.
pub fn referencing_blocks() -> Vec<Block> {
    vec![
        heading_with_anchor(1, "Heading1", "Guide", "guide"),
        Block::paragraph("guide intro"),
        heading_with_anchor(2, "Heading2", "Install", "install"),
        Block::paragraph("steps"),
        xref("guide", "back to the guide"),
        Block::heading(1, "Heading1", "Appendix"),
        xref("install", "see install"),
    ]
}

pub fn referencing_graph() -> StructureGraph {
    graph_from(&referencing_blocks())
}

/// Two chapters with three flat sections each; handy for edit tests.
pub fn book_blocks() -> Vec<Block> {
    vec![
        Block::heading(1, "Heading1", "Chapter One"),
        Block::heading(2, "Heading2", "Alpha"),
        Block::paragraph("alpha text"),
        Block::heading(2, "Heading2", "Beta"),
        Block::paragraph("beta text"),
        Block::heading(2, "Heading2", "Gamma"),
        Block::paragraph("gamma text"),
        Block::heading(1, "Heading1", "Chapter Two"),
        Block::heading(2, "Heading2", "Delta"),
        Block::paragraph("delta text"),
        Block::heading(2, "Heading2", "Epsilon"),
        Block::paragraph("epsilon text"),
    ]
}

pub fn book_graph() -> StructureGraph {
    graph_from(&book_blocks())
}

/// Titles of the top level and each entry's children, for quick shape checks.
pub fn outline(graph: &StructureGraph) -> Vec<String> {
    let mut out = Vec::new();
    graph.walk(|path, _, entry| out.push(format!("{} {}", path, entry.title)));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_book_fixture_shape() {
        let graph = book_graph();
        assert_eq!(graph.entries.len(), 2);
        assert_eq!(graph.unit_count(), 5);
        assert_eq!(graph.container_count(), 2);
        assert_eq!(outline(&graph)[0], "1 Chapter One");
        assert_eq!(outline(&graph)[1], "1.1 Alpha");
    }
}
