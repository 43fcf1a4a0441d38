use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;
use std::sync::Arc;

use crate::container::Container;
use crate::errors::InjectError;
use crate::location::Location;
use crate::resolver::{ProviderNode, Resolver};
use crate::scope::ScopeId;
use crate::type_info::{MapOps, TypeInfo, TypeKey, Value};

#[derive(Clone)]
struct Contribution {
    node: Rc<ProviderNode>,
    idx: usize,
}

#[derive(Default)]
struct MapState {
    contributions: BTreeMap<ScopeId, Contribution>,
    resolved: Option<Value>,
}

/// Aggregates one-per-scope contributions into a scope-name-keyed map.
///
/// Registered under the bare element type, where resolution is always an
/// error pointing at the map form; [`MapOfScopedResolver`] exposes the same
/// state under the map type.
pub(crate) struct OnePerScopeResolver {
    pub(crate) elem: TypeKey,
    pub(crate) collection: TypeKey,
    ops: MapOps,
    state: RefCell<MapState>,
}

impl OnePerScopeResolver {
    pub(crate) fn new(elem: TypeKey, collection: TypeKey, ops: MapOps) -> Rc<Self> {
        Rc::new(Self {
            elem,
            collection,
            ops,
            state: RefCell::default(),
        })
    }

    /// Adds the contribution of `scope`; a second contribution from the same
    /// scope is a duplicate definition.
    pub(crate) fn add_contribution(
        &self,
        scope: ScopeId,
        node: Rc<ProviderNode>,
        idx: usize,
    ) -> Result<(), InjectError> {
        let mut state = self.state.borrow_mut();
        if let Some(existing) = state.contributions.get(&scope) {
            return Err(InjectError::DuplicateDefinition {
                type_name: self.elem.name,
                new_location: node.location().clone(),
                existing: format!("provider {}", existing.node.location()),
            });
        }
        state.contributions.insert(scope, Contribution { node, idx });
        Ok(())
    }

    fn resolve_values(&self, ctr: &mut Container, caller: &Location) -> Result<Value, InjectError> {
        {
            if let Some(value) = &self.state.borrow().resolved {
                return Ok(value.clone());
            }
        }
        let contributions: Vec<(ScopeId, Contribution)> = self
            .state
            .borrow()
            .contributions
            .iter()
            .map(|(scope, contribution)| (*scope, contribution.clone()))
            .collect();
        ctr.logf(format_args!(
            "Providing {} to {}",
            self.collection,
            caller.full_name()
        ));
        let mut acc = (self.ops.new)();
        for (scope, contribution) in &contributions {
            let values = contribution.node.resolve_values(ctr)?;
            let value = &values[contribution.idx];
            let name = ctr.scope_name(*scope).to_string();
            (self.ops.insert)(acc.as_mut(), &name, value);
        }
        let value: Value = Arc::from(acc);
        self.state.borrow_mut().resolved = Some(value.clone());
        Ok(value)
    }
}

impl Resolver for OnePerScopeResolver {
    fn produced_info(&self) -> Option<&TypeInfo> {
        None
    }

    fn describe(&self) -> String {
        format!("one-per-scope type {}", self.elem)
    }

    fn resolve(
        &self,
        _ctr: &mut Container,
        _scope: Option<ScopeId>,
        caller: &Location,
    ) -> Result<Value, InjectError> {
        Err(InjectError::InvalidShape {
            location: caller.clone(),
            reason: format!(
                "{} is a one-per-scope type and cannot be used as an input value, use {} instead",
                self.elem, self.collection
            ),
        })
    }
}

/// Exposes a scoped map's aggregate under its map type.
pub(crate) struct MapOfScopedResolver {
    pub(crate) map: Rc<OnePerScopeResolver>,
}

impl Resolver for MapOfScopedResolver {
    fn produced_info(&self) -> Option<&TypeInfo> {
        None
    }

    fn describe(&self) -> String {
        format!("one-per-scope type map {}", self.map.collection)
    }

    fn resolve(
        &self,
        ctr: &mut Container,
        _scope: Option<ScopeId>,
        caller: &Location,
    ) -> Result<Value, InjectError> {
        self.map.resolve_values(ctr, caller)
    }
}
