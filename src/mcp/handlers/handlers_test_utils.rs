//! Shared fixtures for MCP handler and server tests.

use std::path::PathBuf;
use std::sync::Arc;

use handbook::{EngineConfig, MemoryCorpus, Snapshot, SnapshotHandle};

use super::HandlerContext;
use crate::mcp::reload::Reloader;

/// Small handbook used across the MCP tests.
pub(crate) fn sample_corpus() -> MemoryCorpus {
    MemoryCorpus::default()
        .with(
            "glyphs/anchors",
            "Anchors",
            "Anchors position marks. Use mark to base attachment for diacritics above letters.",
        )
        .with(
            "spacing/kerning",
            "Kerning",
            "Kerning groups let you kern many glyphs at once. Base glyphs share a group.",
        )
        .with(
            "glyphs/components",
            "Smart Components",
            "Smart components interpolate between masters. Anchors are inherited from components.",
        )
}

pub(crate) fn make_ctx_with(corpus: MemoryCorpus, max_response_bytes: usize) -> HandlerContext {
    let snapshot = Snapshot::from_source(&corpus, EngineConfig::default()).unwrap();
    let reloader = Reloader::new(
        Arc::new(SnapshotHandle::new(snapshot)),
        Arc::new(corpus),
        "memory".to_string(),
        EngineConfig::default(),
        PathBuf::from("nonexistent-index-dir"),
        false,
    );
    HandlerContext::new(Arc::new(reloader), PathBuf::from("nonexistent-index-dir"), max_response_bytes)
}

pub(crate) fn make_ctx() -> HandlerContext {
    make_ctx_with(sample_corpus(), 16 * 1024)
}
