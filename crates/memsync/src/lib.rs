//! Client-side synchronization layer for a remote memory store.
//!
//! Keeps cached views of list and search queries consistent with server
//! state under concurrent user actions: typing-driven search is debounced
//! into one fetch per quiet period, responses are applied in issue order
//! through a per-key sequence guard, and confirmed mutations invalidate
//! exactly the views they affect.

pub mod cache;
pub mod config;
pub mod coordinator;
pub mod debounce;
pub mod error;
pub mod model;
pub mod transport;

/// Keyed result cache with staleness guarding.
pub use cache::QueryCache;
/// Sync layer configuration.
pub use config::SyncConfig;
/// Fetch and mutation orchestration.
pub use coordinator::SyncCoordinator;
/// Trailing-edge input coalescing.
pub use debounce::Debouncer;
/// Error types for sync and transport operations.
pub use error::{SyncError, TransportError};
/// Record and query-view models.
pub use model::{MemoryRecord, MetadataDraft, QueryEntry, QueryKey, QueryStatus};
/// Transport seam and default HTTP implementation.
pub use transport::{HttpTransport, Transport};
