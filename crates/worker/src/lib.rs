//! Task primitives shared by the lineage resolver.
//!
//! Speculative resolution is the only part of the engine that spans
//! asynchronous time. This crate holds the pieces it races on: a classified
//! spawn entrypoint, a single-assignment completion latch, and the
//! settle-or-deadline wait built from the two.

mod class;
/// Single-assignment completion latch.
pub mod completion;
/// Settle-or-deadline race.
pub mod deadline;
mod spawn;

pub use class::TaskClass;
pub use completion::{Completion, CompletionPath};
pub use deadline::settle_or_deadline;
pub use spawn::spawn;
