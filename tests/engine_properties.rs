use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

use proptest::prelude::*;

use taskforge::graph::{Task, verify_acyclic};

// Strategy to generate random acyclic wirings. Acyclicity is guaranteed by
// only allowing task N to depend on tasks 0..N-1 (indices are sanitized with
// a modulo, the way arbitrary values map into a valid range).
fn dag_strategy(max_tasks: usize) -> impl Strategy<Value = Vec<Vec<usize>>> {
    (1..=max_tasks).prop_flat_map(|num_tasks| {
        proptest::collection::vec(
            proptest::collection::vec(any::<usize>(), 0..num_tasks),
            num_tasks,
        )
        .prop_map(|raw| {
            raw.into_iter()
                .enumerate()
                .map(|(i, potential)| {
                    let mut deps: Vec<usize> = potential
                        .into_iter()
                        .filter(|_| i > 0)
                        .map(|d| d % i)
                        .collect();
                    deps.sort_unstable();
                    deps.dedup();
                    deps
                })
                .collect()
        })
    })
}

fn build_tasks(
    deps: &[Vec<usize>],
    failing: &HashSet<usize>,
    log: &Rc<RefCell<Vec<usize>>>,
) -> Vec<Task> {
    let mut tasks: Vec<Task> = Vec::with_capacity(deps.len());
    for (i, dep_indices) in deps.iter().enumerate() {
        let log = Rc::clone(log);
        let ok = !failing.contains(&i);
        let task = Task::with_body(format!("task_{i}"), move || {
            log.borrow_mut().push(i);
            ok
        });
        let dep_tasks: Vec<Task> = dep_indices.iter().map(|&d| tasks[d].clone()).collect();
        task.depends_on(&dep_tasks);
        tasks.push(task);
    }
    tasks
}

proptest! {
    #[test]
    fn bodies_run_at_most_once_and_after_their_dependencies(
        deps in dag_strategy(12),
        failing_raw in proptest::collection::vec(0..12usize, 0..4),
    ) {
        let failing: HashSet<usize> = failing_raw
            .into_iter()
            .filter(|&i| i < deps.len())
            .collect();

        let log = Rc::new(RefCell::new(Vec::new()));
        let tasks = build_tasks(&deps, &failing, &log);

        let root = Task::new("root");
        root.depends_on(&tasks);
        let result = root.run().unwrap();

        let log = log.borrow();

        // At most one execution per body.
        let mut seen = HashSet::new();
        for &i in log.iter() {
            prop_assert!(seen.insert(i), "task_{i} ran twice");
        }

        // A body only runs once all of its dependencies have succeeded, and
        // those ran earlier.
        for (pos, &i) in log.iter().enumerate() {
            for &d in &deps[i] {
                let dep_pos = log.iter().position(|&x| x == d);
                prop_assert!(
                    matches!(dep_pos, Some(p) if p < pos),
                    "task_{i} ran before its dependency task_{d}"
                );
                prop_assert!(!failing.contains(&d), "task_{i} ran after task_{d} failed");
            }
        }

        // The root succeeds exactly when nothing fails, and a fully
        // successful run executes every body exactly once.
        prop_assert_eq!(result, failing.is_empty());
        if failing.is_empty() {
            prop_assert_eq!(log.len(), deps.len());
        }
    }

    #[test]
    fn layered_wirings_verify_as_acyclic(deps in dag_strategy(12)) {
        let log = Rc::new(RefCell::new(Vec::new()));
        let tasks = build_tasks(&deps, &HashSet::new(), &log);

        let root = Task::new("root");
        root.depends_on(&tasks);

        prop_assert!(verify_acyclic(&[root]).is_ok());
        // Verification must not execute anything.
        prop_assert!(log.borrow().is_empty());
    }
}
