use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::container::Container;
use crate::errors::InjectError;
use crate::location::Location;
use crate::provider::ProviderDescriptor;
use crate::scope::ScopeId;
use crate::type_info::{TypeInfo, Value};

/// A source of values for one registered type.
///
/// Resolvers keep their memoization state behind `RefCell` and never hold a
/// borrow across a container call, so re-entrant resolution reaches the
/// container's cycle check instead of poisoning a borrow.
pub(crate) trait Resolver {
    /// Metadata of the produced type, for implicit interface matching.
    /// Collection and interface resolvers return `None` and never match.
    fn produced_info(&self) -> Option<&TypeInfo>;

    /// Human-readable description of the registration backing this resolver.
    fn describe(&self) -> String;

    fn resolve(
        &self,
        ctr: &mut Container,
        scope: Option<ScopeId>,
        caller: &Location,
    ) -> Result<Value, InjectError>;
}

#[derive(Default)]
struct NodeState {
    called: bool,
    values: Vec<Value>,
}

/// One registered provider plus its at-most-once invocation state.
pub(crate) struct ProviderNode {
    pub(crate) desc: Rc<ProviderDescriptor>,
    pub(crate) scope: Option<ScopeId>,
    state: RefCell<NodeState>,
}

impl ProviderNode {
    pub(crate) fn new(desc: Rc<ProviderDescriptor>, scope: Option<ScopeId>) -> Rc<Self> {
        Rc::new(Self {
            desc,
            scope,
            state: RefCell::default(),
        })
    }

    pub(crate) fn resolve_values(&self, ctr: &mut Container) -> Result<Vec<Value>, InjectError> {
        {
            let state = self.state.borrow();
            if state.called {
                return Ok(state.values.clone());
            }
        }
        let values = ctr.call(&self.desc, self.scope, self.scope)?;
        let mut state = self.state.borrow_mut();
        state.called = true;
        state.values = values.clone();
        Ok(values)
    }

    pub(crate) fn location(&self) -> &Location {
        &self.desc.location
    }
}

/// Direct resolver: one output of one provider.
pub(crate) struct SimpleResolver {
    pub(crate) node: Rc<ProviderNode>,
    pub(crate) info: TypeInfo,
    pub(crate) idx: usize,
}

impl Resolver for SimpleResolver {
    fn produced_info(&self) -> Option<&TypeInfo> {
        Some(&self.info)
    }

    fn describe(&self) -> String {
        format!("provider {}", self.node.desc.location)
    }

    fn resolve(
        &self,
        ctr: &mut Container,
        _scope: Option<ScopeId>,
        caller: &Location,
    ) -> Result<Value, InjectError> {
        ctr.logf(format_args!(
            "Providing {} from {} to {}",
            self.info.key,
            self.node.desc.location,
            caller.full_name()
        ));
        let values = self.node.resolve_values(ctr)?;
        Ok(values[self.idx].clone())
    }
}

/// Resolver for a constant registered through `supply`.
pub(crate) struct SupplyResolver {
    pub(crate) value: Value,
    pub(crate) info: TypeInfo,
    pub(crate) location: Location,
}

impl Resolver for SupplyResolver {
    fn produced_info(&self) -> Option<&TypeInfo> {
        Some(&self.info)
    }

    fn describe(&self) -> String {
        format!("value supplied at {}", self.location)
    }

    fn resolve(
        &self,
        ctr: &mut Container,
        _scope: Option<ScopeId>,
        caller: &Location,
    ) -> Result<Value, InjectError> {
        ctr.logf(format_args!(
            "Supplying {} to {}",
            self.info.key,
            caller.full_name()
        ));
        Ok(self.value.clone())
    }
}

/// A scope-aware provider, invoked and memoized once per requesting scope.
pub(crate) struct ScopedNode {
    pub(crate) desc: Rc<ProviderDescriptor>,
    pub(crate) own_scope: Option<ScopeId>,
    state: RefCell<HashMap<ScopeId, Vec<Value>>>,
}

impl ScopedNode {
    pub(crate) fn new(desc: Rc<ProviderDescriptor>, own_scope: Option<ScopeId>) -> Rc<Self> {
        Rc::new(Self {
            desc,
            own_scope,
            state: RefCell::default(),
        })
    }

    fn resolve_values(&self, ctr: &mut Container, scope: ScopeId) -> Result<Vec<Value>, InjectError> {
        {
            if let Some(values) = self.state.borrow().get(&scope) {
                return Ok(values.clone());
            }
        }
        let values = ctr.call(&self.desc, Some(scope), self.own_scope)?;
        self.state.borrow_mut().insert(scope, values.clone());
        Ok(values)
    }
}

/// Resolver for one output of a scope-aware provider.
pub(crate) struct ScopedResolver {
    pub(crate) node: Rc<ScopedNode>,
    pub(crate) info: TypeInfo,
    pub(crate) idx: usize,
}

impl Resolver for ScopedResolver {
    fn produced_info(&self) -> Option<&TypeInfo> {
        Some(&self.info)
    }

    fn describe(&self) -> String {
        format!("per-scope provider {}", self.node.desc.location)
    }

    fn resolve(
        &self,
        ctr: &mut Container,
        scope: Option<ScopeId>,
        caller: &Location,
    ) -> Result<Value, InjectError> {
        let scope = scope.ok_or_else(|| InjectError::ScopeRequired {
            reason: format!(
                "type {} from {} is instantiated per scope and cannot be resolved in the global scope",
                self.info.key, self.node.desc.location
            ),
        })?;
        ctr.logf(format_args!(
            "Providing {} from {} to {} in scope {}",
            self.info.key,
            self.node.desc.location,
            caller.full_name(),
            ctr.scope_name(scope)
        ));
        let values = self.node.resolve_values(ctr, scope)?;
        Ok(values[self.idx].clone())
    }
}

/// Resolver for an interface type bound, explicitly or implicitly, to an
/// implementation's resolver.
pub(crate) struct BoundInterfaceResolver {
    pub(crate) info: TypeInfo,
    pub(crate) inner: Rc<dyn Resolver>,
    pub(crate) upcast: Rc<dyn Fn(&Value) -> Value>,
}

impl Resolver for BoundInterfaceResolver {
    fn produced_info(&self) -> Option<&TypeInfo> {
        None
    }

    fn describe(&self) -> String {
        format!("interface {} bound to {}", self.info.key, self.inner.describe())
    }

    fn resolve(
        &self,
        ctr: &mut Container,
        scope: Option<ScopeId>,
        caller: &Location,
    ) -> Result<Value, InjectError> {
        let value = self.inner.resolve(ctr, scope, caller)?;
        Ok((self.upcast)(&value))
    }
}
