//! Name-keyed registries.
//!
//! Every table the engine keeps (features, phases, commands, actions,
//! binaries, services, caches) is a [`Registry`]. Entries are shared through
//! `Rc` because the same action is referenced from its feature, the action
//! table and every bus runner bound to it.

use std::{collections::HashMap, fmt, rc::Rc};

use super::DomainError;

/// Anything registrable under a unique name.
pub trait RegistryObject {
    fn name(&self) -> &str;
}

/// Insertion-ordered, duplicate-rejecting map from name to object.
pub struct Registry<T: ?Sized> {
    kind: &'static str,
    entries: Vec<(String, Rc<T>)>,
    index: HashMap<String, usize>,
}

impl<T: ?Sized> Registry<T> {
    /// Create an empty registry. `kind` labels error messages.
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Register `object` under an explicit name.
    pub fn register_as(
        &mut self,
        name: impl Into<String>,
        object: Rc<T>,
    ) -> Result<(), DomainError> {
        let name = name.into();
        if self.index.contains_key(&name) {
            return Err(DomainError::DuplicateName {
                kind: self.kind,
                name,
            });
        }

        self.index.insert(name.clone(), self.entries.len());
        self.entries.push((name, object));
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Rc<T>> {
        self.index
            .get(name)
            .map(|&position| Rc::clone(&self.entries[position].1))
    }

    pub fn has(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// All objects, in registration order.
    pub fn all(&self) -> Vec<Rc<T>> {
        self.entries.iter().map(|(_, o)| Rc::clone(o)).collect()
    }

    /// All names, in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|(n, _)| n.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn kind(&self) -> &'static str {
        self.kind
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.index.clear();
    }
}

impl<T: ?Sized + RegistryObject> Registry<T> {
    /// Register `object` under its own name.
    pub fn register(&mut self, object: Rc<T>) -> Result<(), DomainError> {
        let name = object.name().to_owned();
        self.register_as(name, object)
    }
}

impl<T: ?Sized> fmt::Debug for Registry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("kind", &self.kind)
            .field("names", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Named(&'static str);

    impl RegistryObject for Named {
        fn name(&self) -> &str {
            self.0
        }
    }

    #[test]
    fn keeps_registration_order() {
        let mut registry = Registry::new("thing");
        registry.register(Rc::new(Named("b"))).unwrap();
        registry.register(Rc::new(Named("a"))).unwrap();
        assert_eq!(registry.names(), vec!["b", "a"]);
        assert_eq!(registry.get("a").unwrap().name(), "a");
    }

    #[test]
    fn rejects_duplicate_names() {
        let mut registry = Registry::new("thing");
        registry.register(Rc::new(Named("a"))).unwrap();
        let err = registry.register(Rc::new(Named("a"))).unwrap_err();
        assert_eq!(
            err,
            DomainError::DuplicateName {
                kind: "thing",
                name: "a".into()
            }
        );
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn clear_empties_everything() {
        let mut registry = Registry::new("thing");
        registry.register(Rc::new(Named("a"))).unwrap();
        registry.clear();
        assert!(registry.is_empty());
        assert!(!registry.has("a"));
        // names are reusable after a clear
        registry.register(Rc::new(Named("a"))).unwrap();
    }

    #[test]
    fn explicit_keys_work_for_unnamed_objects() {
        let mut registry: Registry<str> = Registry::new("cache");
        registry.register_as("global", Rc::from("value")).unwrap();
        assert!(registry.has("global"));
    }
}
