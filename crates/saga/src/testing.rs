//! Recording commands and events shared by the unit tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::command::Command;
use crate::event::Event;

#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub(crate) struct TestError(pub(crate) String);

/// Ordered log of `execute:<label>` / `undo:<label>` entries.
#[derive(Debug, Clone, Default)]
pub(crate) struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    pub(crate) fn record(&self, entry: String) {
        self.0.lock().unwrap().push(entry);
    }

    pub(crate) fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub(crate) fn undone(&self) -> Vec<String> {
        self.entries()
            .into_iter()
            .filter_map(|e| e.strip_prefix("undo:").map(str::to_string))
            .collect()
    }
}

pub(crate) struct Step {
    pub(crate) label: &'static str,
    pub(crate) journal: Journal,
    pub(crate) fail_execute: bool,
    pub(crate) fail_undo: bool,
    pub(crate) panic_undo: bool,
    pub(crate) panic_on_drop: bool,
}

impl Step {
    pub(crate) fn new(label: &'static str, journal: &Journal) -> Self {
        Self {
            label,
            journal: journal.clone(),
            fail_execute: false,
            fail_undo: false,
            panic_undo: false,
            panic_on_drop: false,
        }
    }

    pub(crate) fn failing_execute(mut self) -> Self {
        self.fail_execute = true;
        self
    }

    pub(crate) fn failing_undo(mut self) -> Self {
        self.fail_undo = true;
        self
    }

    pub(crate) fn panicking_undo(mut self) -> Self {
        self.panic_undo = true;
        self
    }

    pub(crate) fn panicking_drop(mut self) -> Self {
        self.panic_on_drop = true;
        self
    }
}

#[async_trait]
impl Command for Step {
    type Output = &'static str;
    type Error = TestError;

    fn name(&self) -> &'static str {
        self.label
    }

    async fn execute(&mut self) -> Result<&'static str, TestError> {
        self.journal.record(format!("execute:{}", self.label));
        if self.fail_execute {
            return Err(TestError(format!("{} failed", self.label)));
        }
        Ok(self.label)
    }

    async fn undo(&mut self) -> Result<(), TestError> {
        self.journal.record(format!("undo:{}", self.label));
        if self.panic_undo {
            panic!("{} undo panicked", self.label);
        }
        if self.fail_undo {
            return Err(TestError(format!("{} undo failed", self.label)));
        }
        Ok(())
    }
}

impl Drop for Step {
    fn drop(&mut self) {
        if self.panic_on_drop && !std::thread::panicking() {
            panic!("{} release panicked", self.label);
        }
    }
}

#[derive(Debug)]
pub(crate) struct Ping;

impl Event for Ping {
    fn variant(&self) -> &'static str {
        "Ping"
    }
}

#[derive(Debug)]
pub(crate) struct Pong;

impl Event for Pong {
    fn variant(&self) -> &'static str {
        "Pong"
    }
}
