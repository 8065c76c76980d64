//! Events and the variant keys used to route them.

use std::any::Any;

use crate::error::{Result, SagaError};

/// An event delivered to the orchestrator.
///
/// The orchestrator treats events as opaque except for their variant key.
pub trait Event: AsAny + std::fmt::Debug + Send + 'static {
    /// Stable tag identifying the concrete event type.
    fn variant(&self) -> &'static str;
}

/// Conversion into `Any`, used to recover the concrete event type.
///
/// Call through the trait object (`(*boxed).as_any()`), not on the `Box`
/// itself, or the box is what gets converted.
pub trait AsAny {
    fn as_any(&self) -> &dyn Any;

    fn into_any(self: Box<Self>) -> Box<dyn Any + Send>;
}

impl<T: Any + Send> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any + Send> {
        self
    }
}

/// Validated registry key for an event variant.
///
/// Keys are non-empty and contain no whitespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VariantKey(&'static str);

impl VariantKey {
    /// Validates a variant tag.
    pub fn parse(key: &'static str) -> Result<Self> {
        if key.is_empty() {
            return Err(SagaError::InvalidVariant {
                key: key.to_string(),
                reason: "variant key is empty",
            });
        }
        if key.chars().any(char::is_whitespace) {
            return Err(SagaError::InvalidVariant {
                key: key.to_string(),
                reason: "variant key contains whitespace",
            });
        }
        Ok(Self(key))
    }

    /// Derives the key of an event.
    pub fn of(event: &dyn Event) -> Result<Self> {
        Self::parse(event.variant())
    }

    /// Returns the key as a string slice.
    pub fn as_str(&self) -> &'static str {
        self.0
    }
}

impl std::fmt::Display for VariantKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.0)
    }
}
