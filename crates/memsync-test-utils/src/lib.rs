//! Test helpers shared across memsync crates.

pub mod transport;

pub use transport::{
    FailingTransport, InMemoryTransport, ManualTransport, PendingCall, PendingOp, sample_record,
};
