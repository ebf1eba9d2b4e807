use std::cell::RefCell;
use std::rc::Rc;

use taskforge::graph::Task;

/// Shared log of body executions, in the order they happened.
fn recorder() -> (Rc<RefCell<Vec<String>>>, impl Fn(&str) -> Task) {
    let log = Rc::new(RefCell::new(Vec::new()));
    let log_for_factory = Rc::clone(&log);
    let make = move |name: &str| {
        let log = Rc::clone(&log_for_factory);
        let recorded = name.to_string();
        Task::with_body(name, move || {
            log.borrow_mut().push(recorded.clone());
            true
        })
    };
    (log, make)
}

#[test]
fn dependencies_run_before_the_body_in_declaration_order() {
    let (log, make) = recorder();

    let a = make("a");
    let b = make("b");
    let c = make("c");
    let root = make("root");
    root.depends_on(&[a, b, c]);

    assert!(root.run().unwrap());
    assert_eq!(*log.borrow(), vec!["a", "b", "c", "root"]);
}

#[test]
fn shared_dependency_in_a_diamond_runs_once() {
    let (log, make) = recorder();

    let base = make("base");
    let left = make("left");
    let right = make("right");
    left.depends_on(&[base.clone()]);
    right.depends_on(&[base]);
    let top = make("top");
    top.depends_on(&[left, right]);

    assert!(top.run().unwrap());
    assert_eq!(*log.borrow(), vec!["base", "left", "right", "top"]);
}

#[test]
fn repeated_runs_return_the_memoized_outcome_without_rerunning() {
    let (log, make) = recorder();

    let task = make("once");
    assert!(task.run().unwrap());
    assert!(task.run().unwrap());
    assert!(task.run().unwrap());
    assert_eq!(log.borrow().len(), 1);
}

#[test]
fn failing_dependency_stops_the_walk_and_skips_the_body() {
    let log = Rc::new(RefCell::new(Vec::new()));

    let record = |name: &str, outcome: bool| {
        let log = Rc::clone(&log);
        let recorded = name.to_string();
        Task::with_body(name, move || {
            log.borrow_mut().push(recorded.clone());
            outcome
        })
    };

    let good = record("good", true);
    let bad = record("bad", false);
    let never = record("never", true);
    let root = record("root", true);
    root.depends_on(&[good, bad, never]);

    assert!(!root.run().unwrap());
    // "never" is declared after the failure and "root"'s body must not run.
    assert_eq!(*log.borrow(), vec!["good", "bad"]);
}

#[test]
fn failure_is_memoized_too() {
    let attempts = Rc::new(RefCell::new(0));
    let counted = {
        let attempts = Rc::clone(&attempts);
        Task::with_body("flaky", move || {
            *attempts.borrow_mut() += 1;
            false
        })
    };

    let first = Task::new("first");
    first.depends_on(&[counted.clone()]);
    let second = Task::new("second");
    second.depends_on(&[counted]);

    assert!(!first.run().unwrap());
    assert!(!second.run().unwrap());
    assert_eq!(*attempts.borrow(), 1);
}

#[test]
fn failure_in_one_root_leaves_an_independent_root_untouched() {
    let log = Rc::new(RefCell::new(Vec::new()));

    let record = |name: &str, outcome: bool| {
        let log = Rc::clone(&log);
        let recorded = name.to_string();
        Task::with_body(name, move || {
            log.borrow_mut().push(recorded.clone());
            outcome
        })
    };

    let bad = record("bad", false);
    let first = record("first", true);
    first.depends_on(&[bad]);

    let leaf = record("leaf", true);
    let second = record("second", true);
    second.depends_on(&[leaf]);

    assert!(!first.run().unwrap());
    assert!(second.run().unwrap());
    assert_eq!(*log.borrow(), vec!["bad", "leaf", "second"]);
}

#[test]
fn bodyless_umbrella_succeeds_when_all_dependencies_succeed() {
    let (log, make) = recorder();

    let a = make("a");
    let b = make("b");
    let umbrella = Task::new("umbrella");
    umbrella.depends_on(&[a, b]);

    assert!(umbrella.run().unwrap());
    assert_eq!(*log.borrow(), vec!["a", "b"]);
}

#[test]
fn downstream_of_a_failed_dependency_reports_failure_without_running() {
    let ran = Rc::new(RefCell::new(false));

    let bad = Task::with_body("bad", || false);
    let downstream = {
        let ran = Rc::clone(&ran);
        Task::with_body("downstream", move || {
            *ran.borrow_mut() = true;
            true
        })
    };
    downstream.depends_on(&[bad]);

    assert!(!downstream.run().unwrap());
    assert!(!*ran.borrow());
}
