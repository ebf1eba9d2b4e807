// src/errors.rs

//! Crate-wide error aliases.
//!
//! Fallible plumbing uses `anyhow`; the one structured error type is
//! [`GraphError`], raised when the task graph itself is malformed.

pub use anyhow::{Error, Result};

pub use crate::graph::GraphError;
