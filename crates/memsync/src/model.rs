//! Record and query-view models shared across the sync layer.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Memory record as returned by the remote store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MemoryRecord {
    /// Server-assigned opaque identifier.
    pub id: String,
    /// Record text.
    pub text: String,
    /// Key/value metadata attached to the record.
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
    /// Ranking score, present only in search results. Opaque to this
    /// layer; range and direction are owned by the remote ranker.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub similarity: Option<f64>,
}

/// Identifier for a cached view: the full list, or one search string.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum QueryKey {
    /// The "list all records" view.
    List,
    /// The view for one trimmed, non-empty search string.
    Search(String),
}

impl QueryKey {
    /// Build a search key from raw input. Returns `None` when the input
    /// trims to empty; blank queries never name a cache entry.
    pub fn search(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(QueryKey::Search(trimmed.to_string()))
        }
    }
}

impl std::fmt::Display for QueryKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QueryKey::List => write!(f, "list"),
            QueryKey::Search(query) => write!(f, "search:{query}"),
        }
    }
}

/// Lifecycle of a cached view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryStatus {
    /// No data requested yet, or the view was invalidated.
    Idle,
    /// A request is in flight.
    Loading,
    /// The view holds the latest applied result.
    Ready,
    /// The latest request for this view failed.
    Error,
}

/// Read-only snapshot of a cached view, as handed to subscribers.
///
/// The cache's internal request sequence counter is deliberately absent.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryEntry {
    /// The view this snapshot belongs to.
    pub key: QueryKey,
    /// Records in server order; never re-sorted locally.
    pub records: Vec<MemoryRecord>,
    /// Current lifecycle state.
    pub status: QueryStatus,
    /// Failure detail when `status` is [`QueryStatus::Error`].
    pub error_detail: Option<String>,
}

/// Metadata under assembly in a form, before submission.
///
/// Replaces ad-hoc per-field state with an explicit mapping where a
/// repeated `set` for the same key overwrites the previous value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetadataDraft {
    entries: BTreeMap<String, String>,
}

impl MetadataDraft {
    /// Create an empty draft.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a key to a value. Last write wins per key.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }

    /// Remove a key, returning its value if present.
    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.entries.remove(key)
    }

    /// Whether the draft holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Consume the draft into the metadata map sent to the server.
    pub fn into_map(self) -> BTreeMap<String, String> {
        self.entries
    }
}
