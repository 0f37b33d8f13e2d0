//! # Mnemos Core
//!
//! A cognitive memory engine for LLM agents: durable storage for discrete
//! memories, retrieval that ranks by a composite of recency, frequency,
//! importance, and co-activation, and background consolidation that mimics
//! how biological memory stabilizes over time.
//!
//! Built on four ideas, each isolated in its own module:
//!
//! - **ACT-R base-level activation** ([`activation`]): recency- and
//!   frequency-weighted recall strength, plus spreading activation from
//!   Hebbian neighbors and an importance term.
//! - **Ebbinghaus forgetting with dual-strength traces** ([`forgetting`]):
//!   a fast-decaying working trace and a slow-decaying core trace, following
//!   Bjork & Bjork's storage/retrieval strength distinction.
//! - **Hebbian co-activation** ([`hebbian`]): memories recalled together
//!   repeatedly form a strengthening, decaying association.
//! - **Hybrid retrieval** ([`retrieval`]): lexical (SQLite FTS5/BM25) and
//!   semantic (cosine similarity) candidates fused with overlap-adaptive
//!   weights, then re-ranked by composite activation.
//!
//! [`engine::Engine`] is the single entry point applications embed; it wires
//! the above together with durable SQLite storage ([`storage`]) and exposes
//! `add`, `recall`, `consolidate`, `forget`, `reward`, `pin`/`unpin`,
//! `update_memory`, `stats`, and `export`.
//!
//! ## Quick start
//!
//! ```
//! use mnemos_core::{AddInput, Engine, EngineConfig, RecallQuery};
//!
//! let engine = Engine::in_memory(EngineConfig::default())?;
//! let id = engine.add(AddInput::new("the standup moved to 10am"))?;
//!
//! let results = engine.recall(RecallQuery::new("standup time"))?;
//! assert_eq!(results[0].id, id);
//! # Ok::<(), mnemos_core::EngineError>(())
//! ```
//!
//! ## Feature flags
//!
//! - `embeddings` (default): enables the [`embeddings::EmbeddingProvider`]
//!   trait and vector-search recall path. The engine never runs an embedding
//!   model itself; callers supply vectors through the trait.

#![warn(rustdoc::missing_crate_level_docs)]

pub mod activation;
pub mod confidence;
pub mod config;
pub mod consolidation;
pub mod engine;
pub mod error;
pub mod forgetting;
pub mod hebbian;
pub mod memory;
pub mod retrieval;
pub mod storage;

#[cfg(feature = "embeddings")]
pub mod embeddings;

pub use config::EngineConfig;
pub use engine::Engine;
pub use error::{EngineError, Result};
pub use memory::{
    AccessLogEntry, AddInput, ConfidenceLabel, ConsolidationReport, EngineStats, GraphLink,
    HebbianLink, Layer, MemoryEntry, MemoryKind, RecallQuery, RecallResult,
};
pub use storage::{AccessRecord, Store, StorageError};

#[cfg(feature = "embeddings")]
pub use embeddings::{EmbeddingProvider, NoopProvider, ProviderSelection};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Convenient imports for common usage.
pub mod prelude {
    pub use crate::{
        AddInput, ConfidenceLabel, Engine, EngineConfig, EngineError, EngineStats, Layer,
        MemoryEntry, MemoryKind, RecallQuery, RecallResult, Result,
    };

    #[cfg(feature = "embeddings")]
    pub use crate::{EmbeddingProvider, ProviderSelection};
}
