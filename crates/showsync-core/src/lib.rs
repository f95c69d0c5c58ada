pub mod backoff;
pub mod batching;
pub mod cloud;
pub mod context;
pub mod coordinator;
pub mod error;
pub mod events;
pub mod housekeeping;
pub mod metadata;
pub mod network;
pub mod paging;
pub mod progress;
pub mod reconcile;
pub mod social;
pub mod store;
pub mod tasks;

#[cfg(test)]
mod testing;

pub use backoff::BackoffPolicy;
pub use cloud::CloudOrchestrator;
pub use context::SyncContext;
pub use coordinator::{SyncCoordinator, SyncKind, SyncReport};
pub use error::{Severity, StepOutcome, SyncError};
pub use events::{SyncEvent, SyncEvents};
pub use metadata::{add_shows, MetadataProvider, ShowDetails, ShowRefresh};
pub use network::{AlwaysOnline, Connectivity};
pub use progress::{SyncProgress, SyncStep};
pub use social::SocialOrchestrator;
pub use store::{apply_in_batches, FileStore, LocalStore, StoreError, StoreOp};
pub use tasks::{TaskKind, TaskRegistry};
