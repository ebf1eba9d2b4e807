// src/ops/mod.rs

//! Leaf task bodies: the concrete operations the task graph schedules.
//!
//! Everything here is a plain blocking call returning success/failure. Some
//! bodies fan out over files with a rayon pool internally; the graph engine
//! still sees a single atomic call. None of these functions invoke other
//! tasks; dependency execution is the engine's job.

pub mod analysis;
pub mod checks;
pub mod cmake;
pub mod coverage;
pub mod files;
pub mod format;
pub mod hooks;
pub mod legal;
pub mod system;
