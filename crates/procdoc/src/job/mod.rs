//! Job model: record types, the store, the status write path and the
//! event stream.

pub mod events;
pub mod notifier;
pub mod record;
pub mod store;

pub use events::{StatusBroadcaster, StatusEvent};
pub use notifier::StatusNotifier;
pub use record::{
    DocumentRef, DocumentType, ErrorKind, Job, JobFailure, JobStatus, StageOutput, StageOutputs,
};
pub use store::JobStore;
