// src/graph/task.rs

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;
use std::time::Instant;

use thiserror::Error;
use tracing::{info, warn};

use crate::graph::timing::format_duration;

/// Error surfaced by the engine when the assembled graph turns out not to be
/// a DAG after all. Correctly wired graphs never produce this.
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("cycle detected in task graph: task '{task}' depends on itself")]
    Cycle { task: String },
}

/// Per-node execution state.
///
/// A node moves from `NotAttempted` through `InProgress` to exactly one of
/// the terminal states; terminal states are memoized and never change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunState {
    NotAttempted,
    /// Set while this node's dependencies or body are running. Observing a
    /// node in this state from its own transitive dependency means the
    /// wiring is cyclic.
    InProgress,
    FailedDeps,
    FailedBody,
    Succeeded,
}

type TaskBody = Box<dyn Fn() -> bool>;

struct TaskInner {
    name: String,
    body: Option<TaskBody>,
    deps: RefCell<Vec<Task>>,
    state: Cell<RunState>,
}

/// The core schedulable unit: a named node with an optional zero-argument
/// body, an ordered list of dependencies, and a memoized outcome.
///
/// Identity is by node reference, not by name: cloning a `Task` yields a
/// second handle to the *same* node, which is how the same sub-goal is shared
/// across many parents without running twice.
///
/// Dependencies are appended with [`Task::depends_on`] during graph assembly;
/// calling it after the first [`Task::run`] is a precondition violation.
#[derive(Clone)]
pub struct Task {
    inner: Rc<TaskInner>,
}

impl Task {
    /// Create an umbrella node: no body, trivially succeeds once its
    /// dependencies have succeeded.
    pub fn new(name: impl Into<String>) -> Self {
        Self::build(name.into(), None)
    }

    /// Create a node with a concrete body.
    pub fn with_body(name: impl Into<String>, body: impl Fn() -> bool + 'static) -> Self {
        Self::build(name.into(), Some(Box::new(body) as TaskBody))
    }

    fn build(name: String, body: Option<TaskBody>) -> Self {
        Self {
            inner: Rc::new(TaskInner {
                name,
                body,
                deps: RefCell::new(Vec::new()),
                state: Cell::new(RunState::NotAttempted),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Stable identity for this node handle, used to key graph traversals.
    pub fn id(&self) -> usize {
        Rc::as_ptr(&self.inner) as usize
    }

    /// Snapshot of the declared dependencies, in declaration order.
    pub fn dependencies(&self) -> Vec<Task> {
        self.inner.deps.borrow().clone()
    }

    /// Append the given nodes to this node's dependency list.
    ///
    /// May be called repeatedly during assembly; the combined list keeps
    /// declaration order across calls.
    pub fn depends_on(&self, deps: &[Task]) {
        let mut current = self.inner.deps.borrow_mut();
        for d in deps {
            current.push(d.clone());
        }
    }

    /// Attempt this node: dependencies first, in declaration order, then the
    /// body. The outcome is memoized; repeated calls return it without
    /// re-walking dependencies or re-invoking the body.
    ///
    /// Fail-fast: the walk stops at the first failing dependency (later
    /// declared dependencies are not attempted through this node), and the
    /// body never runs when any dependency failed.
    pub fn run(&self) -> Result<bool, GraphError> {
        match self.inner.state.get() {
            RunState::Succeeded => return Ok(true),
            RunState::FailedDeps | RunState::FailedBody => return Ok(false),
            RunState::InProgress => {
                return Err(GraphError::Cycle {
                    task: self.inner.name.clone(),
                });
            }
            RunState::NotAttempted => {}
        }

        self.inner.state.set(RunState::InProgress);

        let start_total = Instant::now();

        // Clone the handles so no borrow is held across recursive calls.
        let deps = self.inner.deps.borrow().clone();
        let has_deps = !deps.is_empty();

        if has_deps {
            info!("Preparing task: {}", self.inner.name);
        }

        for dep in &deps {
            if !dep.run()? {
                self.inner.state.set(RunState::FailedDeps);
                return Ok(false);
            }
        }

        info!("Running task: {}", self.inner.name);
        let start_body = Instant::now();
        let success = match &self.inner.body {
            Some(body) => body(),
            None => true,
        };
        let body_elapsed = start_body.elapsed();

        if success {
            if has_deps {
                info!(
                    "Finished task: {} ({}, total: {})",
                    self.inner.name,
                    format_duration(body_elapsed),
                    format_duration(start_total.elapsed()),
                );
            } else {
                info!(
                    "Finished task: {} ({})",
                    self.inner.name,
                    format_duration(body_elapsed),
                );
            }
            self.inner.state.set(RunState::Succeeded);
        } else {
            if has_deps {
                warn!(
                    "Task failed: {} ({}, total: {})",
                    self.inner.name,
                    format_duration(body_elapsed),
                    format_duration(start_total.elapsed()),
                );
            } else {
                warn!(
                    "Task failed: {} ({})",
                    self.inner.name,
                    format_duration(body_elapsed),
                );
            }
            self.inner.state.set(RunState::FailedBody);
        }

        Ok(success)
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("name", &self.inner.name)
            .field("state", &self.inner.state.get())
            .field("deps", &self.inner.deps.borrow().len())
            .finish()
    }
}
