//! msync-reconcile
//!
//! The match lifecycle engine:
//! - ingestion: server-ready / match-finished events become store writes
//! - sweep: periodic pass that drives every record toward the orchestration
//!   API (create, promote after grace, delete)
//! - coordination: per-match lock, single-flight sweep gate, bounded pool
//!
//! Ingestion never calls the orchestration API; the sweep never consumes
//! events. The store is the only thing they share.

mod clock;
mod error;
mod gate;
mod ingest;
mod lock;
pub mod metrics;
mod pool;
mod sweep;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{IngestError, ReconcileError};
pub use gate::{FlightPermit, SingleFlight};
pub use ingest::{DispatchOutcome, Dispatcher};
pub use lock::{KeyGuard, KeyedLock, LockHeld};
pub use pool::WorkerPool;
pub use sweep::{Reconciler, RecordOutcome, SweepOutcome, SweepReport};
