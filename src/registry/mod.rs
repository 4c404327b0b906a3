//! Animation handler registry.
//!
//! A static, pre-resolved mapping of animation name to [`HandlerDescriptor`].
//! The sequencer only reads it; [`discovery`] builds it from disk before the
//! sequencer is constructed.

pub mod discovery;

pub use discovery::{discover, discover_in};

use crate::domain::{HandlerDescriptor, PowerManagerError, Result};
use std::collections::BTreeMap;

/// Read-only set of available animation handlers, ordered by name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HandlerRegistry {
    handlers: BTreeMap<String, HandlerDescriptor>,
}

impl HandlerRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up a handler by name.
    ///
    /// # Errors
    ///
    /// Returns [`PowerManagerError::HandlerNotFound`] if no handler has that name.
    pub fn resolve(&self, name: &str) -> Result<&HandlerDescriptor> {
        self.handlers
            .get(name)
            .ok_or_else(|| PowerManagerError::HandlerNotFound {
                name: name.to_string(),
            })
    }

    /// Handler names in stable, sorted order.
    #[must_use]
    pub fn list_available(&self) -> Vec<&str> {
        self.handlers.keys().map(String::as_str).collect()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.len()
    }
}

impl FromIterator<HandlerDescriptor> for HandlerRegistry {
    fn from_iter<I: IntoIterator<Item = HandlerDescriptor>>(iter: I) -> Self {
        Self {
            handlers: iter
                .into_iter()
                .map(|handler| (handler.name.clone(), handler))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn handler(name: &str) -> HandlerDescriptor {
        HandlerDescriptor::new(name, vec!["true".to_string()], PathBuf::from("/tmp"))
    }

    #[test]
    fn lists_names_sorted() {
        let registry: HandlerRegistry = ["sakura", "fire", "fade"].into_iter().map(handler).collect();
        assert_eq!(registry.list_available(), vec!["fade", "fire", "sakura"]);
    }

    #[test]
    fn resolve_unknown_name_is_not_found() {
        let registry = HandlerRegistry::new();
        assert!(matches!(
            registry.resolve("fire"),
            Err(PowerManagerError::HandlerNotFound { name }) if name == "fire"
        ));
    }
}
