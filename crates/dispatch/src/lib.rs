//! Per-recipient dispatch: selection, delivery, retry, pacing.

pub mod engine;

pub use engine::{DispatchEngine, Error, Result, RunSummary};
