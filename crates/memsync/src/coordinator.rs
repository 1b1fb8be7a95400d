//! Orchestration of fetches, debounced search, and mutation invalidation.

use crate::cache::QueryCache;
use crate::config::SyncConfig;
use crate::debounce::{DebounceCallback, Debouncer};
use crate::error::SyncError;
use crate::model::{QueryEntry, QueryKey};
use crate::transport::Transport;
use log::{debug, info, warn};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::{Arc, Weak};
use tokio::sync::broadcast;

/// Drives the query cache from user input and transport completions.
///
/// One coordinator owns one cache. Search input flows through the
/// debouncer; mutations invalidate the list view only after the server
/// confirms them. All operations take shared references, so a single
/// `Arc<SyncCoordinator>` can back every part of a UI.
pub struct SyncCoordinator {
    transport: Arc<dyn Transport>,
    cache: QueryCache,
    debouncer: Debouncer,
    last_search: Mutex<Option<String>>,
}

impl SyncCoordinator {
    /// Create a coordinator over the given transport.
    pub fn new(transport: Arc<dyn Transport>, config: SyncConfig) -> Arc<Self> {
        Arc::new_cyclic(|weak: &Weak<Self>| {
            let weak = weak.clone();
            let on_quiet: DebounceCallback = Arc::new(move |query: String| {
                let Some(coordinator) = weak.upgrade() else {
                    return;
                };
                tokio::spawn(async move {
                    coordinator.refresh_search(&query).await;
                });
            });
            Self {
                transport,
                cache: QueryCache::new(config.channel_buffer),
                debouncer: Debouncer::new(config.debounce(), on_quiet),
                last_search: Mutex::new(None),
            }
        })
    }

    /// Feed one search-input change.
    ///
    /// Non-blank input (after trimming) restarts the debounce timer with
    /// it. Blank input cancels any pending timer and invalidates the view
    /// of the previous search, without issuing a fetch.
    pub fn on_input_change(&self, raw: &str) {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            self.debouncer.cancel();
            if let Some(previous) = self.last_search.lock().take() {
                debug!("search input cleared (previous={previous})");
                self.cache.invalidate(&QueryKey::Search(previous));
            }
            return;
        }
        self.debouncer.schedule(trimmed.to_string());
    }

    /// Fetch search results for `raw` immediately, bypassing the debounce
    /// timer. Used by the debounce callback and by explicit submission.
    /// Blank input is a no-op.
    pub async fn refresh_search(&self, raw: &str) {
        let query = raw.trim();
        if query.is_empty() {
            return;
        }
        let key = QueryKey::Search(query.to_string());
        *self.last_search.lock() = Some(query.to_string());
        let seq = self.cache.begin_request(&key);
        match self.transport.search(query).await {
            Ok(records) => self.cache.apply_result(&key, seq, records),
            Err(err) => {
                warn!("search failed (key={key}, seq={seq}, err={err})");
                self.cache.apply_error(&key, seq, err.to_string());
            }
        }
    }

    /// Fetch the full record list into the [`QueryKey::List`] view.
    pub async fn load_list(&self) {
        let key = QueryKey::List;
        let seq = self.cache.begin_request(&key);
        match self.transport.list().await {
            Ok(records) => self.cache.apply_result(&key, seq, records),
            Err(err) => {
                warn!("list failed (seq={seq}, err={err})");
                self.cache.apply_error(&key, seq, err.to_string());
            }
        }
    }

    /// Create a record, then refresh the list view.
    ///
    /// Text that trims to empty is rejected locally; the transport is not
    /// called. A transport failure leaves the cache untouched.
    pub async fn create_memory(
        &self,
        text: &str,
        metadata: BTreeMap<String, String>,
    ) -> Result<String, SyncError> {
        if text.trim().is_empty() {
            return Err(SyncError::Validation(
                "memory text must not be empty".to_string(),
            ));
        }
        let id = self.transport.create(text, &metadata).await?;
        info!("memory created (id={id})");
        self.cache.invalidate(&QueryKey::List);
        self.load_list().await;
        Ok(id)
    }

    /// Replace a record's text and metadata, then refresh the list view.
    /// Same local validation and failure rules as
    /// [`create_memory`](Self::create_memory).
    pub async fn update_memory(
        &self,
        id: &str,
        text: &str,
        metadata: BTreeMap<String, String>,
    ) -> Result<bool, SyncError> {
        if text.trim().is_empty() {
            return Err(SyncError::Validation(
                "memory text must not be empty".to_string(),
            ));
        }
        let updated = self.transport.update(id, text, &metadata).await?;
        info!("memory updated (id={id}, updated={updated})");
        self.cache.invalidate(&QueryKey::List);
        self.load_list().await;
        Ok(updated)
    }

    /// Delete a record, then refresh the list view. A transport failure
    /// leaves the cache untouched.
    pub async fn delete_memory(&self, id: &str) -> Result<bool, SyncError> {
        let deleted = self.transport.delete(id).await?;
        info!("memory deleted (id={id}, deleted={deleted})");
        self.cache.invalidate(&QueryKey::List);
        self.load_list().await;
        Ok(deleted)
    }

    /// Read-only snapshot of a cached view.
    pub fn entry(&self, key: &QueryKey) -> QueryEntry {
        self.cache.entry(key)
    }

    /// Subscribe to snapshots of a cached view. Dropping the receiver
    /// unsubscribes.
    pub fn subscribe(&self, key: &QueryKey) -> broadcast::Receiver<QueryEntry> {
        self.cache.subscribe(key)
    }
}
