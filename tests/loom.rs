#![allow(missing_docs)]
#![cfg(feature = "loom")]

use cct::{
    completer::Completer,
    config::Config,
    task::{Scheduler, Task},
    types::{CompletionError, NodeRef, Status},
};
use core::fmt;
use loom::{
    sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    thread,
};
use std::sync::Arc;

#[derive(Clone)]
struct Log(Arc<Mutex<Vec<&'static str>>>);

impl Log {
    fn new() -> Self {
        Self(Arc::new(Mutex::new(Vec::new())))
    }

    fn entries(&self) -> Vec<&'static str> {
        self.0.lock().unwrap().clone()
    }
}

struct TestConfig;

impl Config for TestConfig {
    type Task = Probe;
}

struct Probe {
    name: &'static str,
    completions: AtomicUsize,
    log: Log,
}

impl Probe {
    fn new(name: &'static str, log: &Log) -> Self {
        Self {
            name,
            completions: AtomicUsize::new(0),
            log: log.clone(),
        }
    }

    fn completions(&self) -> usize {
        self.completions.load(Ordering::Relaxed)
    }
}

impl fmt::Debug for Probe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Probe").field("name", &self.name).finish()
    }
}

impl Task<TestConfig> for Probe {
    type Output = u32;

    fn compute(
        &self,
        node: &NodeRef<TestConfig>,
        _scheduler: &impl Scheduler<TestConfig>,
    ) -> Result<(), CompletionError> {
        node.try_complete();
        Ok(())
    }

    fn on_completion(&self, _node: &Completer<TestConfig>, _caller: &Completer<TestConfig>) {
        self.completions.fetch_add(1, Ordering::Relaxed);
        self.log.0.lock().unwrap().push(self.name);
    }
}

fn node(
    completer: Option<&NodeRef<TestConfig>>,
    pending: i32,
    name: &'static str,
    log: &Log,
) -> NodeRef<TestConfig> {
    Completer::new(completer.cloned(), pending, Probe::new(name, log))
}

fn both(lhs: impl FnOnce() + Send + 'static, rhs: impl FnOnce() + Send + 'static) {
    let lhs = thread::spawn(lhs);
    let rhs = thread::spawn(rhs);
    lhs.join().unwrap();
    rhs.join().unwrap();
}

#[test]
fn loom_racing_try_complete_triggers_once() {
    loom::model(|| {
        let log = Log::new();
        let p = node(None, 0, "P", &log);
        let n = node(Some(&p), 1, "N", &log);

        let (lhs, rhs) = (Arc::clone(&n), Arc::clone(&n));
        both(move || lhs.try_complete(), move || rhs.try_complete());

        assert_eq!(n.task().completions(), 1);
        assert_eq!(n.status(), Status::CompletedNormally);
        assert_eq!(p.task().completions(), 1);
        assert_eq!(p.status(), Status::CompletedNormally);
        assert_eq!(log.entries(), ["N", "P"]);
    });
}

#[test]
fn loom_chain_completes_in_order() {
    loom::model(|| {
        // A -> B -> C, where B also waits for its own work.
        let log = Log::new();
        let c = node(None, 0, "C", &log);
        let b = node(Some(&c), 1, "B", &log);
        let a = node(Some(&b), 0, "A", &log);

        let (a2, b2) = (Arc::clone(&a), Arc::clone(&b));
        both(move || a2.try_complete(), move || b2.try_complete());

        assert_eq!(log.entries(), ["A", "B", "C"]);
        for node in [&a, &b, &c] {
            assert_eq!(node.task().completions(), 1);
            assert_eq!(node.status(), Status::CompletedNormally);
        }
    });
}

#[test]
fn loom_normal_and_exceptional_completion_race() {
    loom::model(|| {
        let log = Log::new();
        let n = node(None, 0, "N", &log);

        let (lhs, rhs) = (Arc::clone(&n), Arc::clone(&n));
        both(
            move || lhs.complete(7),
            move || rhs.complete_exceptionally(CompletionError::msg("boom")),
        );

        match n.status() {
            Status::CompletedNormally => {
                assert_eq!(n.raw_result(), Some(&7));
                assert!(n.exception().is_none());
                assert_eq!(n.task().completions(), 1);
            }
            Status::CompletedExceptionally => {
                assert_eq!(n.raw_result(), None);
                assert!(n.exception().is_some());
                assert_eq!(n.task().completions(), 0);
            }
            Status::Active => panic!("node must be terminal"),
        }
    });
}

#[test]
fn loom_double_complete_keeps_one_result() {
    loom::model(|| {
        let log = Log::new();
        let p = node(None, 1, "P", &log);
        let n = node(Some(&p), 0, "N", &log);

        let (lhs, rhs) = (Arc::clone(&n), Arc::clone(&n));
        both(move || lhs.complete(1), move || rhs.complete(2));

        let result = *n.raw_result().unwrap();
        assert!(result == 1 || result == 2);
        assert_eq!(n.task().completions(), 1);
        // Both calls signalled the completer: one absorbed, one completed it.
        assert_eq!(p.task().completions(), 1);
        assert_eq!(p.status(), Status::CompletedNormally);
    });
}

#[test]
fn loom_traversal_hands_completer_to_one_owner() {
    loom::model(|| {
        let log = Log::new();
        let p = node(None, 1, "P", &log);
        let x = node(Some(&p), 0, "X", &log);
        let y = node(Some(&p), 0, "Y", &log);
        let owners = Arc::new(AtomicUsize::new(0));

        let traverse = |start: NodeRef<TestConfig>, owners: Arc<AtomicUsize>| {
            move || {
                let mut next = start.first_complete();
                while let Some(owned) = next {
                    if owned.is_root() {
                        owners.fetch_add(1, Ordering::Relaxed);
                    }
                    next = owned.next_complete();
                }
            }
        };
        both(
            traverse(Arc::clone(&x), Arc::clone(&owners)),
            traverse(Arc::clone(&y), Arc::clone(&owners)),
        );

        assert_eq!(owners.load(Ordering::Relaxed), 1);
        assert_eq!(p.status(), Status::CompletedNormally);
        assert!(log.entries().is_empty());
    });
}
