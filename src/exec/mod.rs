// src/exec/mod.rs

//! Process execution layer.
//!
//! Every leaf task body that shells out goes through [`process::Invocation`]:
//! a blocking call that captures the command's combined output so it can be
//! printed at the point of failure with the underlying tool's diagnostics.

pub mod process;

pub use process::{Invocation, RunOutput};
