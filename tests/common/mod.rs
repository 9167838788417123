#![allow(dead_code)]

use cct::{
    completer::Completer,
    config::Config,
    task::{Scheduler, Task},
    types::{CompletionError, NodeRef},
};
use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};

/// Names of nodes in the order their callbacks ran, shared by a whole tree.
#[derive(Debug, Clone, Default)]
pub struct Log(Arc<Mutex<Vec<&'static str>>>);

impl Log {
    pub fn push(&self, name: &'static str) {
        self.0.lock().unwrap().push(name);
    }

    pub fn entries(&self) -> Vec<&'static str> {
        self.0.lock().unwrap().clone()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Behavior {
    Complete,
    Fail,
    Panic,
}

pub struct TestConfig;

impl Config for TestConfig {
    type Task = Probe;
}

/// Task that records every callback it receives.
#[derive(Debug)]
pub struct Probe {
    pub name: &'static str,
    behavior: Behavior,
    fanout: usize,
    refuse_exceptions: bool,
    panic_on_completion: bool,
    log: Log,
    completions: AtomicUsize,
    exceptional_offers: AtomicUsize,
    callers: Mutex<Vec<&'static str>>,
    /// Whether each non-self caller was already done when the callback ran.
    callers_done: Mutex<Vec<bool>>,
}

impl Probe {
    pub fn new(name: &'static str, log: &Log) -> Self {
        Self {
            name,
            behavior: Behavior::Complete,
            fanout: 0,
            refuse_exceptions: false,
            panic_on_completion: false,
            log: log.clone(),
            completions: AtomicUsize::new(0),
            exceptional_offers: AtomicUsize::new(0),
            callers: Mutex::new(Vec::new()),
            callers_done: Mutex::new(Vec::new()),
        }
    }

    pub fn behaving(mut self, behavior: Behavior) -> Self {
        self.behavior = behavior;
        self
    }

    pub fn with_fanout(mut self, fanout: usize) -> Self {
        self.fanout = fanout;
        self
    }

    pub fn refusing_exceptions(mut self) -> Self {
        self.refuse_exceptions = true;
        self
    }

    pub fn panicking_on_completion(mut self) -> Self {
        self.panic_on_completion = true;
        self
    }

    pub fn completions(&self) -> usize {
        self.completions.load(Ordering::SeqCst)
    }

    pub fn exceptional_offers(&self) -> usize {
        self.exceptional_offers.load(Ordering::SeqCst)
    }

    pub fn callers(&self) -> Vec<&'static str> {
        self.callers.lock().unwrap().clone()
    }

    pub fn callers_done(&self) -> Vec<bool> {
        self.callers_done.lock().unwrap().clone()
    }
}

impl Task<TestConfig> for Probe {
    type Output = u32;

    fn compute(
        &self,
        node: &NodeRef<TestConfig>,
        scheduler: &impl Scheduler<TestConfig>,
    ) -> Result<(), CompletionError> {
        for _ in 0..self.fanout {
            node.add_to_pending_count(1);
            scheduler.fork(Completer::new_child(node, Probe::new("leaf", &self.log)));
        }
        match self.behavior {
            Behavior::Complete => {
                node.try_complete();
                Ok(())
            }
            Behavior::Fail => Err(CompletionError::msg(format!("{} failed", self.name))),
            Behavior::Panic => panic!("{} panicked", self.name),
        }
    }

    fn on_completion(&self, node: &Completer<TestConfig>, caller: &Completer<TestConfig>) {
        if self.panic_on_completion {
            panic!("{} completion panicked", self.name);
        }
        self.completions.fetch_add(1, Ordering::SeqCst);
        self.callers.lock().unwrap().push(caller.task().name);
        if !std::ptr::eq(node, caller) {
            self.callers_done.lock().unwrap().push(caller.is_done());
        }
        self.log.push(self.name);
    }

    fn on_exceptional_completion(
        &self,
        _node: &Completer<TestConfig>,
        _error: &CompletionError,
        caller: &Completer<TestConfig>,
    ) -> bool {
        self.exceptional_offers.fetch_add(1, Ordering::SeqCst);
        self.callers.lock().unwrap().push(caller.task().name);
        !self.refuse_exceptions
    }
}

pub fn root(probe: Probe, pending: i32) -> NodeRef<TestConfig> {
    Completer::new(None, pending, probe)
}

pub fn child(parent: &NodeRef<TestConfig>, probe: Probe, pending: i32) -> NodeRef<TestConfig> {
    Completer::new(Some(Arc::clone(parent)), pending, probe)
}
