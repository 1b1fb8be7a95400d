use async_trait::async_trait;
use memsync::error::TransportError;
use memsync::model::MemoryRecord;
use memsync::transport::Transport;
use parking_lot::Mutex;
use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use tokio::sync::oneshot;

/// Build a record with the given id and text and no metadata.
pub fn sample_record(id: &str, text: &str) -> MemoryRecord {
    MemoryRecord {
        id: id.to_string(),
        text: text.to_string(),
        metadata: BTreeMap::new(),
        similarity: None,
    }
}

/// Transport behaving like a tiny in-process server.
///
/// Create appends, delete removes, search substring-matches on text and
/// attaches a fixed score. Every call is counted so tests can assert how
/// many requests actually went out.
#[derive(Default)]
pub struct InMemoryTransport {
    records: Mutex<Vec<MemoryRecord>>,
    next_id: AtomicU64,
    search_calls: Mutex<Vec<String>>,
    create_calls: AtomicUsize,
    list_calls: AtomicUsize,
    update_calls: AtomicUsize,
    delete_calls: AtomicUsize,
}

impl InMemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: Vec<MemoryRecord>) -> Self {
        Self {
            records: Mutex::new(records),
            ..Self::default()
        }
    }

    /// Queries received by `search`, in call order.
    pub fn search_calls(&self) -> Vec<String> {
        self.search_calls.lock().clone()
    }

    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn delete_calls(&self) -> usize {
        self.delete_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for InMemoryTransport {
    async fn create(
        &self,
        text: &str,
        metadata: &BTreeMap<String, String>,
    ) -> Result<String, TransportError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        let id = format!("mem-{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        self.records.lock().push(MemoryRecord {
            id: id.clone(),
            text: text.to_string(),
            metadata: metadata.clone(),
            similarity: None,
        });
        Ok(id)
    }

    async fn list(&self) -> Result<Vec<MemoryRecord>, TransportError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.records.lock().clone())
    }

    async fn search(&self, query: &str) -> Result<Vec<MemoryRecord>, TransportError> {
        self.search_calls.lock().push(query.to_string());
        let results = self
            .records
            .lock()
            .iter()
            .filter(|record| record.text.contains(query))
            .cloned()
            .map(|record| MemoryRecord {
                similarity: Some(1.0),
                ..record
            })
            .collect();
        Ok(results)
    }

    async fn update(
        &self,
        id: &str,
        text: &str,
        metadata: &BTreeMap<String, String>,
    ) -> Result<bool, TransportError> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);
        let mut records = self.records.lock();
        match records.iter_mut().find(|record| record.id == id) {
            Some(record) => {
                record.text = text.to_string();
                record.metadata = metadata.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, id: &str) -> Result<bool, TransportError> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        let mut records = self.records.lock();
        let before = records.len();
        records.retain(|record| record.id != id);
        Ok(records.len() < before)
    }
}

/// Transport where every operation fails with the configured error.
pub struct FailingTransport {
    error: TransportError,
    calls: AtomicUsize,
    list_calls: AtomicUsize,
}

impl FailingTransport {
    pub fn new(error: TransportError) -> Self {
        Self {
            error,
            calls: AtomicUsize::new(0),
            list_calls: AtomicUsize::new(0),
        }
    }

    /// Total calls across all operations.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    fn fail<T>(&self) -> Result<T, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(self.error.clone())
    }
}

#[async_trait]
impl Transport for FailingTransport {
    async fn create(
        &self,
        _text: &str,
        _metadata: &BTreeMap<String, String>,
    ) -> Result<String, TransportError> {
        self.fail()
    }

    async fn list(&self) -> Result<Vec<MemoryRecord>, TransportError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.fail()
    }

    async fn search(&self, _query: &str) -> Result<Vec<MemoryRecord>, TransportError> {
        self.fail()
    }

    async fn update(
        &self,
        _id: &str,
        _text: &str,
        _metadata: &BTreeMap<String, String>,
    ) -> Result<bool, TransportError> {
        self.fail()
    }

    async fn delete(&self, _id: &str) -> Result<bool, TransportError> {
        self.fail()
    }
}

/// Operation captured by a [`ManualTransport`].
#[derive(Debug, Clone, PartialEq)]
pub enum PendingOp {
    Create { text: String },
    List,
    Search(String),
    Update { id: String },
    Delete(String),
}

enum Response {
    Id(String),
    Records(Vec<MemoryRecord>),
    Flag(bool),
}

/// A parked transport call awaiting manual resolution.
pub struct PendingCall {
    op: PendingOp,
    responder: oneshot::Sender<Result<Response, TransportError>>,
}

impl PendingCall {
    pub fn op(&self) -> &PendingOp {
        &self.op
    }

    /// Complete a list or search call with records.
    pub fn resolve_records(self, records: Vec<MemoryRecord>) {
        let _ = self.responder.send(Ok(Response::Records(records)));
    }

    /// Complete a create call with a server-assigned id.
    pub fn resolve_id(self, id: &str) {
        let _ = self.responder.send(Ok(Response::Id(id.to_string())));
    }

    /// Complete an update or delete call with a success flag.
    pub fn resolve_flag(self, flag: bool) {
        let _ = self.responder.send(Ok(Response::Flag(flag)));
    }

    /// Fail the call.
    pub fn resolve_error(self, error: TransportError) {
        let _ = self.responder.send(Err(error));
    }
}

/// Transport whose calls park until the test resolves them, in any order.
///
/// Lets tests interleave completions to exercise the staleness guard.
#[derive(Default)]
pub struct ManualTransport {
    pending: Mutex<VecDeque<PendingCall>>,
}

impl ManualTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of calls currently parked.
    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }

    /// Take the oldest parked call, if any.
    pub fn take_next(&self) -> Option<PendingCall> {
        self.pending.lock().pop_front()
    }

    async fn park(&self, op: PendingOp) -> Result<Response, TransportError> {
        let (responder, waiter) = oneshot::channel();
        self.pending.lock().push_back(PendingCall { op, responder });
        waiter
            .await
            .unwrap_or_else(|_| Err(TransportError::Request("transport dropped".to_string())))
    }
}

#[async_trait]
impl Transport for ManualTransport {
    async fn create(
        &self,
        text: &str,
        _metadata: &BTreeMap<String, String>,
    ) -> Result<String, TransportError> {
        match self
            .park(PendingOp::Create {
                text: text.to_string(),
            })
            .await?
        {
            Response::Id(id) => Ok(id),
            _ => panic!("create call resolved with a non-id response"),
        }
    }

    async fn list(&self) -> Result<Vec<MemoryRecord>, TransportError> {
        match self.park(PendingOp::List).await? {
            Response::Records(records) => Ok(records),
            _ => panic!("list call resolved with a non-records response"),
        }
    }

    async fn search(&self, query: &str) -> Result<Vec<MemoryRecord>, TransportError> {
        match self.park(PendingOp::Search(query.to_string())).await? {
            Response::Records(records) => Ok(records),
            _ => panic!("search call resolved with a non-records response"),
        }
    }

    async fn update(
        &self,
        id: &str,
        _text: &str,
        _metadata: &BTreeMap<String, String>,
    ) -> Result<bool, TransportError> {
        match self
            .park(PendingOp::Update { id: id.to_string() })
            .await?
        {
            Response::Flag(flag) => Ok(flag),
            _ => panic!("update call resolved with a non-flag response"),
        }
    }

    async fn delete(&self, id: &str) -> Result<bool, TransportError> {
        match self.park(PendingOp::Delete(id.to_string())).await? {
            Response::Flag(flag) => Ok(flag),
            _ => panic!("delete call resolved with a non-flag response"),
        }
    }
}
