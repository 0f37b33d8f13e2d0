//! Memory module — core data types for the cognitive memory engine.
//!
//! Memory entries carry a dual-strength trace (working + core), access-log
//! rows record retrieval history, the caller-supplied entity graph links
//! memories to named entities, and the symmetric Hebbian graph tracks
//! co-activation between memory pairs.

mod entry;

pub use entry::{
    AccessLogEntry, AddInput, ConfidenceLabel, ConsolidationReport, EngineStats, GraphLink,
    HebbianLink, Layer, MemoryEntry, MemoryKind, RecallQuery, RecallResult,
};
