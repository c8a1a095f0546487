//! Frame synchronization and GPU handle bookkeeping.
//!
//! - `frames`: per-in-flight-frame fences/semaphores and the round-robin cursor
//! - `ledger`: creation-ordered registry of GPU handles with reverse-order teardown

mod frames;
mod ledger;

pub use frames::{Fence, FrameCursor, FrameSync, FrameSyncSet, Semaphore};
pub use ledger::{GpuObject, HandleId, HandleLedger, HandleRecord, LedgerReport, Teardown, Tracked};
