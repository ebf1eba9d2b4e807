use taskforge::graph::{GraphError, Task, verify_acyclic};

#[test]
fn self_dependency_is_reported_as_a_cycle() {
    let a = Task::new("a");
    a.depends_on(&[a.clone()]);

    match a.run() {
        Err(GraphError::Cycle { task }) => assert_eq!(task, "a"),
        other => panic!("expected cycle error, got {other:?}"),
    }
}

#[test]
fn two_task_cycle_is_reported() {
    let a = Task::new("a");
    let b = Task::new("b");
    a.depends_on(&[b.clone()]);
    b.depends_on(&[a.clone()]);

    match a.run() {
        Err(GraphError::Cycle { task }) => assert_eq!(task, "a"),
        other => panic!("expected cycle error, got {other:?}"),
    }
}

#[test]
fn cycle_buried_under_healthy_tasks_is_still_caught() {
    let healthy = Task::with_body("healthy", || true);
    let x = Task::new("x");
    let y = Task::new("y");
    x.depends_on(&[healthy, y.clone()]);
    y.depends_on(&[x.clone()]);

    let root = Task::new("root");
    root.depends_on(&[x]);

    assert!(root.run().is_err());
}

#[test]
fn verify_acyclic_rejects_a_cyclic_graph_without_running_bodies() {
    let a = Task::with_body("a", || panic!("body must not run during verification"));
    let b = Task::new("b");
    a.depends_on(&[b.clone()]);
    b.depends_on(&[a.clone()]);

    assert!(verify_acyclic(&[a]).is_err());
}

#[test]
fn verify_acyclic_accepts_a_diamond() {
    let base = Task::new("base");
    let left = Task::new("left");
    let right = Task::new("right");
    left.depends_on(&[base.clone()]);
    right.depends_on(&[base]);
    let top = Task::new("top");
    top.depends_on(&[left, right]);

    assert!(verify_acyclic(&[top]).is_ok());
}
