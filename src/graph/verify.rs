// src/graph/verify.rs

use std::collections::HashMap;

use anyhow::{Result, anyhow};
use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::graph::task::Task;

/// Collect every task reachable from the given roots, depth-first, each node
/// exactly once. Order is deterministic for a fixed graph shape.
pub fn collect_reachable(roots: &[Task]) -> Vec<Task> {
    let mut seen: HashMap<usize, ()> = HashMap::new();
    let mut out = Vec::new();
    let mut stack: Vec<Task> = roots.to_vec();

    while let Some(task) = stack.pop() {
        if seen.insert(task.id(), ()).is_some() {
            continue;
        }
        for dep in task.dependencies() {
            stack.push(dep);
        }
        out.push(task);
    }

    out
}

/// Check that the assembled graph is acyclic before anything runs.
///
/// The engine also detects cycles at run time via its in-progress marker, but
/// catching the mistake here turns it into a plain configuration error
/// instead of an aborted run. Edge direction: dependency -> dependent, so a
/// topological sort fails exactly when the wiring is cyclic.
pub fn verify_acyclic(roots: &[Task]) -> Result<()> {
    let tasks = collect_reachable(roots);

    let mut names: HashMap<usize, String> = HashMap::new();
    let mut graph: DiGraphMap<usize, ()> = DiGraphMap::new();

    for task in &tasks {
        names.insert(task.id(), task.name().to_string());
        graph.add_node(task.id());
    }

    for task in &tasks {
        for dep in task.dependencies() {
            graph.add_edge(dep.id(), task.id(), ());
        }
    }

    match toposort(&graph, None) {
        Ok(_order) => Ok(()),
        Err(cycle) => {
            let name = names
                .get(&cycle.node_id())
                .map(String::as_str)
                .unwrap_or("<unknown>");
            Err(anyhow!(
                "cycle detected in task graph involving task '{}'",
                name
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diamond_is_reported_once_and_is_acyclic() {
        let a = Task::new("A");
        let b = Task::new("B");
        let c = Task::new("C");
        let d = Task::new("D");
        b.depends_on(&[a.clone()]);
        c.depends_on(&[a.clone()]);
        d.depends_on(&[b.clone(), c.clone()]);

        let reachable = collect_reachable(&[d.clone()]);
        assert_eq!(reachable.len(), 4);
        assert!(verify_acyclic(&[d]).is_ok());
    }

    #[test]
    fn two_node_cycle_is_detected() {
        let a = Task::new("A");
        let b = Task::new("B");
        a.depends_on(&[b.clone()]);
        b.depends_on(&[a.clone()]);

        let err = verify_acyclic(&[a]).unwrap_err();
        assert!(err.to_string().contains("cycle detected"));
    }
}
