// src/graph/mod.rs

//! Task dependency graph and its execution engine.
//!
//! - [`task`] holds the core schedulable unit: a named node with an optional
//!   body, an ordered dependency list, and a memoized outcome.
//! - [`verify`] checks an assembled graph for cycles before execution.
//! - [`timing`] formats wall-clock durations for the task lifecycle logs.

pub mod task;
pub mod timing;
pub mod verify;

pub use task::{GraphError, Task};
pub use verify::{collect_reachable, verify_acyclic};
