use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Index of an interned scope inside one container.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub(crate) struct ScopeId(usize);

/// Identity of a registration scope.
///
/// Scope keys are interned per container: the first registration under a name
/// creates the key, and every later use of the same name yields the same
/// identity. Equality is an index comparison, not a string comparison.
///
/// A provider may declare a `ScopeKey` input to learn which scope it is being
/// invoked for; such a provider is instantiated once per requesting scope.
#[derive(Clone, Debug)]
pub struct ScopeKey {
    id: ScopeId,
    name: Arc<str>,
}

impl ScopeKey {
    /// The scope name this key was interned under.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn id(&self) -> ScopeId {
        self.id
    }
}

impl PartialEq for ScopeKey {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ScopeKey {}

impl fmt::Display for ScopeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// The scope a provider or invoker was registered in.
///
/// Unlike [`ScopeKey`], which names the scope a provider is invoked *for*,
/// an `OwnScopeKey` input always names the scope the function was registered
/// *in*, and is only legal for registrations made in a named scope.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OwnScopeKey(ScopeKey);

impl OwnScopeKey {
    pub(crate) fn new(key: ScopeKey) -> Self {
        Self(key)
    }

    /// The scope name this key was interned under.
    pub fn name(&self) -> &str {
        self.0.name()
    }
}

impl From<OwnScopeKey> for ScopeKey {
    fn from(key: OwnScopeKey) -> Self {
        key.0
    }
}

/// Interning arena for scope keys, owned by one container.
#[derive(Default)]
pub(crate) struct ScopeRegistry {
    names: Vec<Arc<str>>,
    by_name: HashMap<Arc<str>, ScopeId>,
}

impl ScopeRegistry {
    pub(crate) fn create_or_get(&mut self, name: &str) -> ScopeId {
        if let Some(id) = self.by_name.get(name) {
            return *id;
        }
        let id = ScopeId(self.names.len());
        let name: Arc<str> = name.into();
        self.names.push(name.clone());
        self.by_name.insert(name, id);
        id
    }

    pub(crate) fn name(&self, id: ScopeId) -> &str {
        &self.names[id.0]
    }

    pub(crate) fn key(&self, id: ScopeId) -> ScopeKey {
        ScopeKey {
            id,
            name: self.names[id.0].clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_returns_the_same_identity() {
        let mut registry = ScopeRegistry::default();
        let a = registry.create_or_get("a");
        let b = registry.create_or_get("b");
        assert_ne!(a, b);
        assert_eq!(a, registry.create_or_get("a"));
        assert_eq!(registry.key(a), registry.key(a));
        assert_ne!(registry.key(a), registry.key(b));
        assert_eq!(registry.key(b).name(), "b");
        assert_eq!(registry.name(a), "a");
    }
}
