//! Variant-keyed handler registry.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::{PoisonError, RwLock};

use crate::error::Result;
use crate::event::VariantKey;
use crate::handler::RegisteredHandler;

/// Maps each event variant to at most one handler.
///
/// Written during startup, read on every dispatch. The first registration of
/// a key wins; later ones are ignored.
#[derive(Debug, Default)]
pub struct HandlerRegistry {
    handlers: RwLock<HashMap<VariantKey, RegisteredHandler>>,
}

impl HandlerRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` under its declared variant key.
    ///
    /// Returns `Ok(false)` if another handler already owns the key, and an
    /// error if the declared key is invalid.
    pub fn register(&self, handler: RegisteredHandler) -> Result<bool> {
        let key = VariantKey::parse(handler.variant())?;
        let mut handlers = self.handlers.write().unwrap_or_else(PoisonError::into_inner);

        match handlers.entry(key) {
            Entry::Occupied(existing) => {
                tracing::warn!(
                    variant = %key,
                    kept = existing.get().name(),
                    ignored = handler.name(),
                    "handler already registered for variant, ignoring"
                );
                Ok(false)
            }
            Entry::Vacant(slot) => {
                tracing::debug!(variant = %key, handler = handler.name(), "handler registered");
                slot.insert(handler);
                Ok(true)
            }
        }
    }

    /// Returns the handler registered for `key`.
    pub fn lookup(&self, key: VariantKey) -> Option<RegisteredHandler> {
        self.handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
            .cloned()
    }

    /// Returns true if a handler is registered for `key`.
    pub fn has(&self, key: VariantKey) -> bool {
        self.handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&key)
    }

    /// Returns the number of registered handlers.
    pub fn len(&self) -> usize {
        self.handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns true if no handler is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Registered variant keys, sorted.
    pub fn variants(&self) -> Vec<VariantKey> {
        let mut keys: Vec<VariantKey> = self
            .handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .copied()
            .collect();
        keys.sort();
        keys
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;

    use super::*;
    use crate::error::SagaError;
    use crate::handler::EventHandler;
    use crate::invoker::ScopedInvoker;
    use crate::testing::{Ping, TestError};

    struct Named {
        name: &'static str,
        variant: &'static str,
    }

    #[async_trait]
    impl EventHandler for Named {
        type Event = Ping;
        type Error = TestError;

        fn variant(&self) -> &'static str {
            self.variant
        }

        fn name(&self) -> &'static str {
            self.name
        }

        async fn handle(
            &self,
            _event: Ping,
            _invoker: &mut ScopedInvoker,
        ) -> std::result::Result<(), TestError> {
            Ok(())
        }
    }

    fn handler(name: &'static str, variant: &'static str) -> RegisteredHandler {
        RegisteredHandler::new(Named { name, variant })
    }

    fn key(variant: &'static str) -> VariantKey {
        VariantKey::parse(variant).unwrap()
    }

    #[test]
    fn test_register_and_lookup() {
        let registry = HandlerRegistry::new();
        assert!(registry.is_empty());

        assert!(registry.register(handler("first", "Ping")).unwrap());

        assert!(registry.has(key("Ping")));
        assert!(!registry.has(key("Pong")));
        assert_eq!(registry.lookup(key("Ping")).unwrap().name(), "first");
        assert!(registry.lookup(key("Pong")).is_none());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_first_registration_wins() {
        let registry = HandlerRegistry::new();

        assert!(registry.register(handler("first", "Ping")).unwrap());
        assert!(!registry.register(handler("second", "Ping")).unwrap());

        assert_eq!(registry.lookup(key("Ping")).unwrap().name(), "first");
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_invalid_declared_key_is_rejected() {
        let registry = HandlerRegistry::new();

        let result = registry.register(handler("blank", ""));

        assert!(matches!(result, Err(SagaError::InvalidVariant { .. })));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_variants_are_sorted() {
        let registry = HandlerRegistry::new();
        registry.register(handler("c", "Charlie")).unwrap();
        registry.register(handler("a", "Alpha")).unwrap();
        registry.register(handler("b", "Bravo")).unwrap();

        let variants: Vec<&str> = registry.variants().iter().map(|k| k.as_str()).collect();
        assert_eq!(variants, vec!["Alpha", "Bravo", "Charlie"]);
    }

    #[test]
    fn test_concurrent_registration_keeps_exactly_one() {
        let registry = Arc::new(HandlerRegistry::new());
        let names = ["t0", "t1", "t2", "t3", "t4", "t5", "t6", "t7"];

        let threads: Vec<_> = names
            .iter()
            .map(|&name| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || {
                    let inserted = registry.register(handler(name, "Ping")).unwrap();
                    let seen = registry.lookup(key("Ping")).map(|h| h.name());
                    (name, inserted, seen)
                })
            })
            .collect();
        let results: Vec<_> = threads.into_iter().map(|t| t.join().unwrap()).collect();

        let winners: Vec<_> = results.iter().filter(|(_, inserted, _)| *inserted).collect();
        assert_eq!(winners.len(), 1);
        let winner = winners[0].0;
        assert_eq!(registry.lookup(key("Ping")).unwrap().name(), winner);
        assert!(results.iter().all(|(_, _, seen)| *seen == Some(winner)));
    }
}
