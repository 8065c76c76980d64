//! Scoped command invoker with a LIFO undo history.

use std::panic::AssertUnwindSafe;

use futures_util::FutureExt;
use uuid::Uuid;

use crate::command::{Command, Undoable};
use crate::error::{CloseError, panic_message};

/// Outcome of [`ScopedInvoker::undo_all`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UndoReport {
    /// Number of history entries popped and undone.
    pub attempted: usize,
    /// Number of undo calls that returned an error or panicked.
    pub failed: usize,
}

impl UndoReport {
    /// Returns true if every undo succeeded.
    pub fn is_clean(&self) -> bool {
        self.failed == 0
    }
}

/// Executes commands for one scope and records the ones that succeeded.
///
/// The invoker is the scope: its history is a plain field, never shared with
/// another invoker. Closing (or dropping) the invoker discards the history
/// without calling `undo`.
pub struct ScopedInvoker {
    scope_id: Uuid,
    history: Vec<Box<dyn Undoable>>,
}

impl ScopedInvoker {
    /// Opens a new, empty scope.
    pub fn new() -> Self {
        Self {
            scope_id: Uuid::new_v4(),
            history: Vec::new(),
        }
    }

    /// Returns the unique ID of this scope.
    pub fn scope_id(&self) -> Uuid {
        self.scope_id
    }

    /// Returns the number of commands on the history.
    pub fn len(&self) -> usize {
        self.history.len()
    }

    /// Returns true if the history is empty.
    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    /// Names of the commands on the history, oldest first.
    pub fn history(&self) -> Vec<&'static str> {
        self.history.iter().map(|entry| entry.name()).collect()
    }

    /// Executes `command`, pushing it onto the history if it succeeds.
    ///
    /// A failed command is not recorded and its error is returned unchanged.
    pub async fn execute<C: Command>(
        &mut self,
        mut command: C,
    ) -> std::result::Result<C::Output, C::Error> {
        let name = command.name();
        match command.execute().await {
            Ok(output) => {
                self.history.push(Box::new(command));
                metrics::counter!("saga_commands_executed_total").increment(1);
                tracing::debug!(scope_id = %self.scope_id, command = name, depth = self.history.len(), "command executed");
                Ok(output)
            }
            Err(error) => {
                metrics::counter!("saga_command_failures_total").increment(1);
                tracing::debug!(scope_id = %self.scope_id, command = name, %error, "command failed");
                Err(error)
            }
        }
    }

    /// Pops the most recent command and undoes it.
    ///
    /// Returns false if the history was empty. An undo failure is logged and
    /// swallowed; the popped entry is not restored.
    pub async fn undo_last(&mut self) -> bool {
        match self.history.pop() {
            Some(entry) => {
                undo_entry(self.scope_id, entry).await;
                true
            }
            None => false,
        }
    }

    /// Undoes every command on the history, most recent first.
    ///
    /// A failing undo does not stop the remaining ones.
    pub async fn undo_all(&mut self) -> UndoReport {
        let mut report = UndoReport::default();
        while let Some(entry) = self.history.pop() {
            report.attempted += 1;
            if !undo_entry(self.scope_id, entry).await {
                report.failed += 1;
            }
        }
        if report.attempted > 0 {
            tracing::info!(
                scope_id = %self.scope_id,
                attempted = report.attempted,
                failed = report.failed,
                "command history undone"
            );
        }
        report
    }

    /// Discards the history without undoing anything.
    ///
    /// Returns the number of discarded entries. Every entry is released even
    /// if releasing one of them panics; in that case [`CloseError`] is returned.
    pub fn clear(&mut self) -> std::result::Result<usize, CloseError> {
        let discarded = self.history.len();
        let mut failed = 0;
        // Release in LIFO order, like undo.
        while let Some(entry) = self.history.pop() {
            let name = entry.name();
            if let Err(message) = release(entry) {
                failed += 1;
                tracing::warn!(scope_id = %self.scope_id, command = name, panic = %message, "releasing command panicked");
            }
        }
        if failed > 0 {
            return Err(CloseError {
                scope_id: self.scope_id,
                discarded,
                failed,
            });
        }
        Ok(discarded)
    }

    /// Closes the scope, discarding the history without undoing anything.
    pub fn close(mut self) -> std::result::Result<usize, CloseError> {
        self.clear()
    }
}

impl Default for ScopedInvoker {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ScopedInvoker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScopedInvoker")
            .field("scope_id", &self.scope_id)
            .field("history", &self.history())
            .finish()
    }
}

impl Drop for ScopedInvoker {
    fn drop(&mut self) {
        if self.history.is_empty() {
            return;
        }
        if let Err(error) = self.clear() {
            tracing::warn!(%error, "scope dropped with a failing release");
        }
    }
}

/// Undoes a popped entry. Returns false if the undo failed or panicked.
async fn undo_entry(scope_id: Uuid, mut entry: Box<dyn Undoable>) -> bool {
    let name = entry.name();
    metrics::counter!("saga_undo_total").increment(1);

    let succeeded = match AssertUnwindSafe(entry.undo()).catch_unwind().await {
        Ok(Ok(())) => {
            tracing::debug!(%scope_id, command = name, "command undone");
            true
        }
        Ok(Err(error)) => {
            tracing::warn!(%scope_id, command = name, %error, "undo failed for command");
            false
        }
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            tracing::warn!(%scope_id, command = name, panic = %message, "undo panicked for command");
            false
        }
    };
    if !succeeded {
        metrics::counter!("saga_undo_failures_total").increment(1);
    }

    if let Err(message) = release(entry) {
        tracing::warn!(%scope_id, command = name, panic = %message, "releasing command panicked");
    }
    succeeded
}

fn release(entry: Box<dyn Undoable>) -> std::result::Result<(), String> {
    std::panic::catch_unwind(AssertUnwindSafe(move || drop(entry)))
        .map_err(|payload| panic_message(payload.as_ref()))
}
