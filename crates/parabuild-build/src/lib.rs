//! parabuild build orchestration
//!
//! Builds the images of a [`parabuild_core::BuildPlan`] for every platform in
//! parallel, then publishes one multi-architecture manifest per registry.
//!
//! ```text
//! Orchestrator ── image 0 ──┬─ build linux/amd64 ─┐
//!              │            └─ build linux/arm64 ─┴─ (barrier) ─┬─ manifest registry A
//!              │                                                └─ manifest registry B
//!              └─ image 1 ── ...
//! ```
//!
//! Every level runs inside a [`Scope`]; the first failure cancels the scope
//! and everything below it, terminating running subprocesses.

pub mod context;
pub mod error;
pub mod group;
pub mod logger;
pub mod orchestrator;
pub mod runner;
pub mod scope;
pub mod skip;
pub mod task;

pub use error::{BuildError, Result};
pub use group::Group;
pub use logger::{GroupedLogger, LineSink, MemorySink, StdoutSink};
pub use orchestrator::Orchestrator;
pub use runner::{CommandRunner, ProcessRunner};
pub use scope::Scope;
pub use skip::SkipEvaluator;
pub use tokio_util::sync::CancellationToken;
