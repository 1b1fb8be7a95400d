//! Keyed cache of query results with staleness guarding and push updates.

use crate::model::{MemoryRecord, QueryEntry, QueryKey, QueryStatus};
use log::debug;
use parking_lot::Mutex;
use std::collections::HashMap;
use tokio::sync::broadcast;

struct Slot {
    records: Vec<MemoryRecord>,
    status: QueryStatus,
    last_request_seq: u64,
    error_detail: Option<String>,
    updates: broadcast::Sender<QueryEntry>,
}

impl Slot {
    fn new(buffer: usize) -> Self {
        let (updates, _) = broadcast::channel(buffer);
        Self {
            records: Vec::new(),
            status: QueryStatus::Idle,
            last_request_seq: 0,
            error_detail: None,
            updates,
        }
    }

    fn snapshot(&self, key: &QueryKey) -> QueryEntry {
        QueryEntry {
            key: key.clone(),
            records: self.records.clone(),
            status: self.status,
            error_detail: self.error_detail.clone(),
        }
    }

    fn notify(&self, key: &QueryKey) {
        // No-op when nobody is subscribed.
        let _ = self.updates.send(self.snapshot(key));
    }
}

/// Cache of the last-known result set per [`QueryKey`].
///
/// Responses are applied only when their captured request sequence number
/// still equals the slot's most recently issued one; anything older is
/// silently discarded. That guard, not transport cancellation, is what
/// keeps out-of-order completions from ever being observed.
pub struct QueryCache {
    channel_buffer: usize,
    slots: Mutex<HashMap<QueryKey, Slot>>,
}

impl QueryCache {
    /// Create an empty cache with the given subscriber channel capacity.
    pub fn new(channel_buffer: usize) -> Self {
        Self {
            channel_buffer,
            slots: Mutex::new(HashMap::new()),
        }
    }

    fn with_slot<T>(&self, key: &QueryKey, apply: impl FnOnce(&mut Slot) -> T) -> T {
        let mut slots = self.slots.lock();
        let slot = slots
            .entry(key.clone())
            .or_insert_with(|| Slot::new(self.channel_buffer));
        apply(slot)
    }

    /// Snapshot of the entry for `key`, creating an idle one if absent.
    pub fn entry(&self, key: &QueryKey) -> QueryEntry {
        self.with_slot(key, |slot| slot.snapshot(key))
    }

    /// Issue a new request generation for `key` and mark it loading.
    ///
    /// Returns the sequence number the caller must hand back to
    /// [`apply_result`](Self::apply_result) or
    /// [`apply_error`](Self::apply_error).
    pub fn begin_request(&self, key: &QueryKey) -> u64 {
        self.with_slot(key, |slot| {
            slot.last_request_seq += 1;
            slot.status = QueryStatus::Loading;
            debug!("request issued (key={key}, seq={})", slot.last_request_seq);
            slot.last_request_seq
        })
    }

    /// Apply a successful response for the given request generation.
    ///
    /// Discarded without effect when a newer request has been issued for
    /// `key` since `request_seq` was obtained.
    pub fn apply_result(&self, key: &QueryKey, request_seq: u64, records: Vec<MemoryRecord>) {
        self.with_slot(key, |slot| {
            if request_seq != slot.last_request_seq {
                debug!(
                    "stale result discarded (key={key}, seq={request_seq}, latest={})",
                    slot.last_request_seq
                );
                return;
            }
            debug!(
                "result applied (key={key}, seq={request_seq}, records={})",
                records.len()
            );
            slot.records = records;
            slot.status = QueryStatus::Ready;
            slot.error_detail = None;
            slot.notify(key);
        });
    }

    /// Apply a failed response for the given request generation, subject
    /// to the same staleness guard as [`apply_result`](Self::apply_result).
    pub fn apply_error(&self, key: &QueryKey, request_seq: u64, detail: String) {
        self.with_slot(key, |slot| {
            if request_seq != slot.last_request_seq {
                debug!(
                    "stale error discarded (key={key}, seq={request_seq}, latest={})",
                    slot.last_request_seq
                );
                return;
            }
            debug!("error applied (key={key}, seq={request_seq}, detail={detail})");
            slot.status = QueryStatus::Error;
            slot.error_detail = Some(detail);
            slot.notify(key);
        });
    }

    /// Mark the entry for `key` idle.
    ///
    /// In-flight transport calls are not cancelled; their responses remain
    /// subject to the sequence guard once the next request is issued.
    pub fn invalidate(&self, key: &QueryKey) {
        self.with_slot(key, |slot| {
            debug!("invalidated (key={key})");
            slot.status = QueryStatus::Idle;
            slot.error_detail = None;
            slot.notify(key);
        });
    }

    /// Subscribe to entry snapshots for `key`.
    ///
    /// A snapshot is pushed on every applied result, applied error, and
    /// invalidation affecting the key. Dropping the receiver unsubscribes.
    pub fn subscribe(&self, key: &QueryKey) -> broadcast::Receiver<QueryEntry> {
        self.with_slot(key, |slot| slot.updates.subscribe())
    }
}
