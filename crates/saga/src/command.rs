//! Reversible units of work executed through a [`ScopedInvoker`](crate::ScopedInvoker).

use async_trait::async_trait;

use crate::error::BoxError;

/// A reversible unit of work.
///
/// A command is single-shot: at most one successful [`execute`](Command::execute)
/// followed by at most one [`undo`](Command::undo). Undo is best-effort. The
/// kernel only guarantees that `undo` was called, not that the world is back
/// in its pre-execute state.
#[async_trait]
pub trait Command: Send + 'static {
    /// Value produced by a successful execution.
    type Output: Send;

    /// Error returned by `execute` or `undo`.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Name used in logs and history inspection.
    fn name(&self) -> &'static str {
        short_type_name::<Self>()
    }

    /// Performs the work.
    async fn execute(&mut self) -> Result<Self::Output, Self::Error>;

    /// Reverses the side effects of the last successful `execute`.
    async fn undo(&mut self) -> Result<(), Self::Error>;
}

/// Type-erased view of an executed command kept on an invoker's history.
#[async_trait]
pub(crate) trait Undoable: Send {
    fn name(&self) -> &'static str;

    async fn undo(&mut self) -> Result<(), BoxError>;
}

#[async_trait]
impl<C: Command> Undoable for C {
    fn name(&self) -> &'static str {
        Command::name(self)
    }

    async fn undo(&mut self) -> Result<(), BoxError> {
        Command::undo(self).await.map_err(Into::into)
    }
}

/// Last path segment of a type name, without generic arguments.
pub(crate) fn short_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}
