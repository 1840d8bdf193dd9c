use crate::builtin;
use crate::descriptor::TypeDescriptor;
use invitation_model::{ModelError, ModelResult, Mode};
use std::collections::BTreeMap;

/// Result of looking up a type tag
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TypeLookup<'a> {
    Known(&'a TypeDescriptor),
    /// Tag not registered (e.g. authored by a newer client); render as placeholder
    Unknown(&'a str),
}

impl<'a> TypeLookup<'a> {
    pub fn is_known(&self) -> bool {
        matches!(self, TypeLookup::Known(_))
    }

    pub fn descriptor(&self) -> Option<&'a TypeDescriptor> {
        match self {
            TypeLookup::Known(descriptor) => Some(descriptor),
            TypeLookup::Unknown(_) => None,
        }
    }
}

/// Catalog of content types, keyed by tag.
///
/// Built once during startup, then shared behind an `Arc`; nothing can
/// register through a shared reference, so concurrent lookups need no lock.
#[derive(Clone, Default)]
pub struct TypeRegistry {
    types: BTreeMap<String, TypeDescriptor>,
}

impl TypeRegistry {
    /// Create an empty registry
    pub fn empty() -> Self {
        Self::default()
    }

    /// Create a registry with all built-in invitation types
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        for descriptor in builtin::descriptors() {
            registry.register(descriptor);
        }
        registry
    }

    /// Register a descriptor; a later registration of the same tag wins
    pub fn register(&mut self, descriptor: TypeDescriptor) {
        self.types.insert(descriptor.tag.clone(), descriptor);
    }

    /// Look up a tag; never fails
    pub fn lookup<'a>(&'a self, tag: &'a str) -> TypeLookup<'a> {
        match self.types.get(tag) {
            Some(descriptor) => TypeLookup::Known(descriptor),
            None => TypeLookup::Unknown(tag),
        }
    }

    /// All registered descriptors in tag order
    pub fn list_types(&self) -> impl Iterator<Item = &TypeDescriptor> {
        self.types.values()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Resolve a tag for an add operation in the given mode
    pub fn validate(&self, tag: &str, mode: Mode) -> ModelResult<&TypeDescriptor> {
        let descriptor = self
            .types
            .get(tag)
            .ok_or_else(|| ModelError::UnknownType(tag.to_string()))?;

        if !descriptor.availability.allows(mode) {
            return Err(ModelError::TypeNotAvailable {
                kind: tag.to_string(),
                mode,
            });
        }

        Ok(descriptor)
    }
}

impl std::fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeRegistry")
            .field("types", &format!("{} types", self.types.len()))
            .finish()
    }
}
