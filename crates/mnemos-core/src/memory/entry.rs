//! Memory entry — the primary record of the engine.
//!
//! A [`MemoryEntry`] combines durable content with the dynamical state the
//! rest of the engine evolves over time: ACT-R access history, dual strength
//! traces, importance, layer assignment, and contradiction links.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// KIND / LAYER
// ============================================================================

/// Kind of memory content.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MemoryKind {
    /// A discrete fact.
    #[default]
    Factual,
    /// A recalled event or experience.
    Episodic,
    /// A relationship between entities.
    Relational,
    /// Emotionally charged content.
    Emotional,
    /// How-to / procedural knowledge.
    Procedural,
    /// A stated opinion or preference.
    Opinion,
}

impl MemoryKind {
    /// String form used in storage and on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            MemoryKind::Factual => "factual",
            MemoryKind::Episodic => "episodic",
            MemoryKind::Relational => "relational",
            MemoryKind::Emotional => "emotional",
            MemoryKind::Procedural => "procedural",
            MemoryKind::Opinion => "opinion",
        }
    }

    /// Parse from a caller-supplied string name.
    pub fn parse_name(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "factual" => Some(MemoryKind::Factual),
            "episodic" => Some(MemoryKind::Episodic),
            "relational" => Some(MemoryKind::Relational),
            "emotional" => Some(MemoryKind::Emotional),
            "procedural" => Some(MemoryKind::Procedural),
            "opinion" => Some(MemoryKind::Opinion),
            _ => None,
        }
    }
}

impl std::fmt::Display for MemoryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Coarse lifecycle bucket an entry sits in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Layer {
    /// Slow-decaying, consolidated long-term memory.
    Core,
    /// Fast-decaying, recently formed memory.
    #[default]
    Working,
    /// Long-inactive or weak memory; searchable but not expanded.
    Archive,
}

impl Layer {
    pub fn as_str(&self) -> &'static str {
        match self {
            Layer::Core => "core",
            Layer::Working => "working",
            Layer::Archive => "archive",
        }
    }

    pub fn parse_name(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "core" => Some(Layer::Core),
            "working" => Some(Layer::Working),
            "archive" => Some(Layer::Archive),
            _ => None,
        }
    }
}

impl std::fmt::Display for Layer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// MEMORY ENTRY
// ============================================================================

/// The primary record: content plus the state that makes retrieval dynamical.
///
/// Identifiers are UUID v4 strings; entries reference each other (and the
/// Hebbian graph references entries) purely by id, never by borrow, so the
/// contradiction chain and co-activation graph can't form ownership cycles.
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryEntry {
    /// Unique, immutable identifier (UUID v4).
    pub id: String,
    /// The textual content.
    pub content: String,
    /// Optional short summary (also indexed by full-text search).
    pub summary: Option<String>,
    /// Kind of memory.
    pub kind: MemoryKind,
    /// Current lifecycle layer.
    pub layer: Layer,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,

    // ===== Dual-strength model =====
    /// Fast-decaying short-term strength trace.
    pub working_strength: f64,
    /// Slow-decaying long-term strength trace.
    pub core_strength: f64,

    /// Caller-assigned importance in [0, 1].
    pub importance: f64,
    /// Pinned entries are exempt from decay, downscaling, and pruning.
    pub pinned: bool,

    /// Number of consolidation cycles this entry has been processed in.
    pub consolidation_count: u32,
    /// Timestamp of the last consolidation that touched this entry.
    pub last_consolidated: Option<DateTime<Utc>>,

    /// Caller-supplied provenance tag.
    pub source: Option<String>,

    /// Forward link: this entry supersedes (contradicts) an older one.
    pub contradicts: Option<String>,
    /// Reverse link: the entry (if any) that supersedes this one.
    pub contradicted_by: Option<String>,

    /// Embedding vector, when the caller supplied one. Dimension is
    /// provider-dependent but fixed per store: all vectors in a single store
    /// must share one dimension.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
}

impl MemoryEntry {
    /// Construct a brand-new entry at `now`, with a fresh id and default
    /// strengths. Used by [`crate::storage::Store::insert`] callers.
    pub fn new(content: impl Into<String>, kind: MemoryKind, now: DateTime<Utc>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            content: content.into(),
            summary: None,
            kind,
            layer: Layer::Working,
            created_at: now,
            working_strength: 1.0,
            core_strength: 0.0,
            importance: 0.5,
            pinned: false,
            consolidation_count: 0,
            last_consolidated: None,
            source: None,
            contradicts: None,
            contradicted_by: None,
            embedding: None,
        }
    }

    /// Whether this entry has been superseded by a contradictor.
    pub fn is_contradicted(&self) -> bool {
        self.contradicted_by.is_some()
    }
}

// ============================================================================
// GRAPH / HEBBIAN LINKS
// ============================================================================

/// A (memory-id, entity-label, relation-label) edge into the caller-supplied
/// entity graph. Many-to-many: a memory may reference many entities.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GraphLink {
    pub memory_id: String,
    pub entity: String,
    pub relation: String,
}

/// A symmetric co-activation edge between two distinct memories.
///
/// Endpoints are always stored in canonical order (`a < b` by string compare)
/// so that `(a, b)` and `(b, a)` are never both materialized — this is what
/// makes `neighbors(a) ∋ b ⇔ neighbors(b) ∋ a` trivially true.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HebbianLink {
    pub a: String,
    pub b: String,
    pub strength: f64,
    pub co_activation_count: u32,
    pub created_at: DateTime<Utc>,
}

impl HebbianLink {
    /// Canonicalize an unordered pair of ids.
    pub fn canonical_pair(x: &str, y: &str) -> (String, String) {
        if x <= y {
            (x.to_string(), y.to_string())
        } else {
            (y.to_string(), x.to_string())
        }
    }
}

/// A single (memory-id, timestamp) access-log row. Append-only.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AccessLogEntry {
    pub timestamp: DateTime<Utc>,
}

// ============================================================================
// INPUT / OUTPUT DTOs
// ============================================================================

/// Input for [`crate::engine::Engine::add`].
///
/// Uses `deny_unknown_fields` to reject field-injection attempts from callers
/// that deserialize this from untrusted JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AddInput {
    pub content: String,
    #[serde(default)]
    pub kind: MemoryKind,
    #[serde(default)]
    pub importance: Option<f64>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub entities: Vec<(String, String)>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub contradicts: Option<String>,
}

impl AddInput {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            kind: MemoryKind::default(),
            importance: None,
            tags: Vec::new(),
            entities: Vec::new(),
            source: None,
            contradicts: None,
        }
    }
}

/// Input for [`crate::engine::Engine::recall`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RecallQuery {
    pub query: String,
    #[serde(default = "default_limit")]
    pub k: usize,
    #[serde(default)]
    pub context: Vec<String>,
    #[serde(default)]
    pub kinds: Option<Vec<MemoryKind>>,
    #[serde(default)]
    pub min_confidence: Option<f64>,
    #[serde(default = "default_true")]
    pub graph_expand: bool,
}

fn default_limit() -> usize {
    10
}
fn default_true() -> bool {
    true
}

impl RecallQuery {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            k: default_limit(),
            context: Vec::new(),
            kinds: None,
            min_confidence: None,
            graph_expand: true,
        }
    }
}

/// Human-readable confidence band derived from a numeric confidence score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceLabel {
    Certain,
    Likely,
    Uncertain,
    Vague,
}

impl ConfidenceLabel {
    pub fn from_score(score: f64) -> Self {
        if score >= 0.85 {
            ConfidenceLabel::Certain
        } else if score >= 0.6 {
            ConfidenceLabel::Likely
        } else if score >= 0.3 {
            ConfidenceLabel::Uncertain
        } else {
            ConfidenceLabel::Vague
        }
    }
}

/// A single ranked result returned by [`crate::engine::Engine::recall`].
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecallResult {
    pub id: String,
    pub content: String,
    pub kind: MemoryKind,
    pub confidence: f64,
    pub confidence_label: ConfidenceLabel,
    pub effective_strength: f64,
    pub activation: f64,
    pub age_days: f64,
    pub layer: Layer,
    pub importance: f64,
    pub contradicted: bool,
}

/// Aggregate statistics returned by [`crate::engine::Engine::stats`].
#[non_exhaustive]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineStats {
    pub total_entries: u64,
    pub by_kind: std::collections::BTreeMap<String, u64>,
    pub by_layer: std::collections::BTreeMap<String, u64>,
    pub average_effective_strength: f64,
    pub average_importance: f64,
    pub pinned_count: u64,
    pub hebbian_link_count: u64,
    pub uptime_seconds: u64,
}

/// Outcome of a [`crate::engine::Engine::consolidate`] cycle.
#[non_exhaustive]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsolidationReport {
    pub entries_processed: u64,
    pub entries_promoted: u64,
    pub entries_demoted: u64,
    pub entries_pruned: u64,
    pub hebbian_links_decayed: u64,
    pub hebbian_links_removed: u64,
    pub failures: u64,
}
