use std::any::TypeId;
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use crate::check_type::check_exported;
use crate::debug::DebugConfig;
use crate::errors::InjectError;
use crate::group::{GroupResolver, SliceGroupResolver};
use crate::location::Location;
use crate::provider::{ArgKind, ProviderDescriptor};
use crate::resolver::{
    BoundInterfaceResolver, ProviderNode, Resolver, ScopedNode, ScopedResolver, SimpleResolver,
    SupplyResolver,
};
use crate::scope::{ScopeId, ScopeRegistry};
use crate::scoped_map::{MapOfScopedResolver, OnePerScopeResolver};
use crate::type_info::{CollectionOps, GroupOps, MapOps, TypeInfo, TypeKey, TypeKind, Value};

/// Key of the resolver registry: a type in a scope. Global registrations
/// carry no scope.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct BindingKey {
    type_id: TypeId,
    scope: Option<ScopeId>,
}

impl BindingKey {
    fn new(key: TypeKey, scope: Option<ScopeId>) -> Self {
        Self {
            type_id: key.id,
            scope,
        }
    }
}

/// An explicit interface-to-implementation binding. The interface itself is
/// the registry key the binding is stored under.
struct InterfaceBinding {
    implementation: TypeKey,
    upcast: Rc<dyn Fn(&Value) -> Value>,
    scope: Option<ScopeId>,
    resolver: Option<Rc<dyn Resolver>>,
}

#[derive(Clone)]
struct Invoker {
    desc: Rc<ProviderDescriptor>,
    scope: Option<ScopeId>,
}

/// The dependency injection container: owns the type registry, interface
/// bindings, invokers, interned scopes, and the active-call stack used for
/// cycle detection. Built from a configuration, used for one resolution
/// pass, then discarded.
pub(crate) struct Container {
    debug: Rc<RefCell<DebugConfig>>,
    resolvers: HashMap<BindingKey, Rc<dyn Resolver>>,
    resolver_order: Vec<BindingKey>,
    groups: HashMap<TypeId, Rc<GroupResolver>>,
    scoped_maps: HashMap<TypeId, Rc<OnePerScopeResolver>>,
    bindings: HashMap<BindingKey, InterfaceBinding>,
    invokers: Vec<Invoker>,
    scopes: ScopeRegistry,
    caller_stack: Vec<Location>,
    caller_set: HashSet<Location>,
}

impl Container {
    pub(crate) fn new(debug: Rc<RefCell<DebugConfig>>) -> Self {
        Self {
            debug,
            resolvers: HashMap::new(),
            resolver_order: Vec::new(),
            groups: HashMap::new(),
            scoped_maps: HashMap::new(),
            bindings: HashMap::new(),
            invokers: Vec::new(),
            scopes: ScopeRegistry::default(),
            caller_stack: Vec::new(),
            caller_set: HashSet::new(),
        }
    }

    pub(crate) fn logf(&self, args: std::fmt::Arguments<'_>) {
        self.debug.borrow().logf(args);
    }

    pub(crate) fn indent_logger(&self) {
        self.debug.borrow_mut().indent_logger();
    }

    pub(crate) fn dedent_logger(&self) {
        self.debug.borrow_mut().dedent_logger();
    }

    pub(crate) fn scope_name(&self, id: ScopeId) -> &str {
        self.scopes.name(id)
    }

    pub(crate) fn create_or_get_scope(&mut self, name: &str) -> ScopeId {
        self.scopes.create_or_get(name)
    }

    // Registration

    pub(crate) fn supply_value(
        &mut self,
        value: Value,
        info: TypeInfo,
        location: Location,
    ) -> Result<(), InjectError> {
        check_exported(&info.key)?;
        self.debug.borrow_mut().type_graph_node(info.key.name);
        let resolver = Rc::new(SupplyResolver {
            value,
            info: info.clone(),
            location: location.clone(),
        });
        self.add_resolver_checked(info.key, None, resolver, &location)
    }

    /// Registers one provider descriptor: validates every declared type,
    /// then routes each output to a direct, per-scope, group, or scoped-map
    /// resolver.
    pub(crate) fn add_node(
        &mut self,
        desc: ProviderDescriptor,
        scope: Option<ScopeId>,
    ) -> Result<(), InjectError> {
        let desc = Rc::new(desc);
        for input in &desc.inputs {
            if let Some(info) = input.type_info() {
                check_exported(&info.key)?;
            }
        }
        for output in &desc.outputs {
            check_exported(&output.key)?;
        }
        if desc.has_own_scope_input() && scope.is_none() {
            return Err(InjectError::ScopeRequired {
                reason: format!(
                    "{} declares an own-scope input and must be registered in a named scope",
                    desc.location
                ),
            });
        }

        let scope_name = scope.map(|id| self.scopes.name(id).to_string());
        let provider_node = self
            .debug
            .borrow_mut()
            .location_graph_node(&desc.location, scope_name.as_deref());
        for input in &desc.inputs {
            if let Some(info) = input.type_info() {
                self.get_resolver(info, scope)?;
                let type_node = self.debug.borrow_mut().type_graph_node(info.key.name);
                self.debug.borrow_mut().graph.add_edge(type_node, provider_node);
            }
        }

        if desc.has_scope_input() {
            self.add_scoped_node(desc, scope, provider_node)
        } else {
            self.add_simple_node(desc, scope, provider_node)
        }
    }

    fn add_simple_node(
        &mut self,
        desc: Rc<ProviderDescriptor>,
        scope: Option<ScopeId>,
        provider_node: crate::graphviz::NodeId,
    ) -> Result<(), InjectError> {
        let node = ProviderNode::new(desc.clone(), scope);
        for (idx, output) in desc.outputs.iter().enumerate() {
            let form_key = match output.kind {
                TypeKind::ManyPerContainer => {
                    let form = output.element_form.as_ref().unwrap();
                    let CollectionOps::Group(ops) = &form.ops else {
                        unreachable!()
                    };
                    let group =
                        self.ensure_group(output.key, form.collection, *ops, &desc.location)?;
                    group.add_contribution(node.clone(), idx, false);
                    group.collection
                }
                TypeKind::OnePerScope => {
                    let contribution_scope = scope.ok_or_else(|| InjectError::ScopeRequired {
                        reason: format!(
                            "one-per-scope type {} from {} must be provided in a named scope",
                            output.key, desc.location
                        ),
                    })?;
                    let form = output.element_form.as_ref().unwrap();
                    let CollectionOps::ScopedMap(ops) = &form.ops else {
                        unreachable!()
                    };
                    let map =
                        self.ensure_scoped_map(output.key, form.collection, *ops, &desc.location)?;
                    map.add_contribution(contribution_scope, node.clone(), idx)?;
                    map.collection
                }
                TypeKind::Single | TypeKind::Interface => match &output.collection {
                    Some(collection) => match &collection.ops {
                        CollectionOps::Group(ops) => {
                            let group = self.ensure_group(
                                collection.elem,
                                output.key,
                                *ops,
                                &desc.location,
                            )?;
                            group.add_contribution(node.clone(), idx, true);
                            group.collection
                        }
                        CollectionOps::ScopedMap(_) => {
                            return Err(InjectError::InvalidShape {
                                location: desc.location.clone(),
                                reason: format!(
                                    "{} is the scope-map form of {} and cannot be provided directly",
                                    output.key, collection.elem
                                ),
                            });
                        }
                    },
                    None => {
                        let resolver = Rc::new(SimpleResolver {
                            node: node.clone(),
                            info: output.clone(),
                            idx,
                        });
                        self.add_resolver_checked(output.key, scope, resolver, &desc.location)?;
                        output.key
                    }
                },
            };
            let type_node = self.debug.borrow_mut().type_graph_node(form_key.name);
            self.debug.borrow_mut().graph.add_edge(provider_node, type_node);
        }
        Ok(())
    }

    fn add_scoped_node(
        &mut self,
        desc: Rc<ProviderDescriptor>,
        own_scope: Option<ScopeId>,
        provider_node: crate::graphviz::NodeId,
    ) -> Result<(), InjectError> {
        let node = ScopedNode::new(desc.clone(), own_scope);
        for (idx, output) in desc.outputs.iter().enumerate() {
            let plain = matches!(output.kind, TypeKind::Single | TypeKind::Interface)
                && output.collection.is_none();
            if !plain {
                return Err(InjectError::InvalidShape {
                    location: desc.location.clone(),
                    reason: format!(
                        "output {} of the per-scope provider must be a plain type",
                        output.key
                    ),
                });
            }
            let resolver = Rc::new(ScopedResolver {
                node: node.clone(),
                info: output.clone(),
                idx,
            });
            self.add_resolver_checked(output.key, None, resolver, &desc.location)?;
            let type_node = self.debug.borrow_mut().type_graph_node(output.key.name);
            self.debug.borrow_mut().graph.add_edge(provider_node, type_node);
        }
        Ok(())
    }

    pub(crate) fn add_invoker(
        &mut self,
        desc: ProviderDescriptor,
        scope: Option<ScopeId>,
    ) -> Result<(), InjectError> {
        let desc = Rc::new(desc);
        for input in &desc.inputs {
            if let Some(info) = input.type_info() {
                check_exported(&info.key)?;
            }
        }
        if (desc.has_scope_input() || desc.has_own_scope_input()) && scope.is_none() {
            return Err(InjectError::ScopeRequired {
                reason: format!(
                    "invoker {} declares a scope input and must be registered in a named scope",
                    desc.location
                ),
            });
        }
        let scope_name = scope.map(|id| self.scopes.name(id).to_string());
        let invoker_node = self
            .debug
            .borrow_mut()
            .location_graph_node(&desc.location, scope_name.as_deref());
        for input in &desc.inputs {
            if let Some(info) = input.type_info() {
                let type_node = self.debug.borrow_mut().type_graph_node(info.key.name);
                self.debug.borrow_mut().graph.add_edge(type_node, invoker_node);
            }
        }
        self.invokers.push(Invoker { desc, scope });
        Ok(())
    }

    pub(crate) fn add_binding(
        &mut self,
        interface: TypeKey,
        implementation: TypeKey,
        upcast: Rc<dyn Fn(&Value) -> Value>,
        scope: Option<ScopeId>,
    ) {
        self.bindings.insert(
            BindingKey::new(interface, scope),
            InterfaceBinding {
                implementation,
                upcast,
                scope,
                resolver: None,
            },
        );
    }

    fn add_resolver_checked(
        &mut self,
        type_key: TypeKey,
        scope: Option<ScopeId>,
        resolver: Rc<dyn Resolver>,
        new_location: &Location,
    ) -> Result<(), InjectError> {
        let key = BindingKey::new(type_key, scope);
        if let Some(existing) = self.resolvers.get(&key) {
            return Err(InjectError::DuplicateDefinition {
                type_name: type_key.name,
                new_location: new_location.clone(),
                existing: existing.describe(),
            });
        }
        self.resolvers.insert(key, resolver);
        self.resolver_order.push(key);
        Ok(())
    }

    fn add_resolver(&mut self, type_key: TypeKey, scope: Option<ScopeId>, resolver: Rc<dyn Resolver>) {
        let key = BindingKey::new(type_key, scope);
        self.resolvers.insert(key, resolver);
        self.resolver_order.push(key);
    }

    fn ensure_group(
        &mut self,
        elem: TypeKey,
        collection: TypeKey,
        ops: GroupOps,
        location: &Location,
    ) -> Result<Rc<GroupResolver>, InjectError> {
        if let Some(group) = self.groups.get(&elem.id) {
            return Ok(group.clone());
        }
        let group = GroupResolver::new(elem, collection, ops);
        self.add_resolver_checked(elem, None, group.clone(), location)?;
        self.add_resolver_checked(
            collection,
            None,
            Rc::new(SliceGroupResolver {
                group: group.clone(),
            }),
            location,
        )?;
        self.groups.insert(elem.id, group.clone());
        Ok(group)
    }

    fn ensure_scoped_map(
        &mut self,
        elem: TypeKey,
        collection: TypeKey,
        ops: MapOps,
        location: &Location,
    ) -> Result<Rc<OnePerScopeResolver>, InjectError> {
        if let Some(map) = self.scoped_maps.get(&elem.id) {
            return Ok(map.clone());
        }
        let map = OnePerScopeResolver::new(elem, collection, ops);
        self.add_resolver_checked(elem, None, map.clone(), location)?;
        self.add_resolver_checked(
            collection,
            None,
            Rc::new(MapOfScopedResolver { map: map.clone() }),
            location,
        )?;
        self.scoped_maps.insert(elem.id, map.clone());
        Ok(map)
    }

    // Resolution

    fn lookup(&self, key: TypeKey, scope: Option<ScopeId>) -> Option<Rc<dyn Resolver>> {
        if let Some(s) = scope
            && let Some(resolver) = self.resolvers.get(&BindingKey::new(key, Some(s)))
        {
            return Some(resolver.clone());
        }
        self.resolvers.get(&BindingKey::new(key, None)).cloned()
    }

    /// Finds the resolver for a requested type. Precedence: explicit
    /// binding, direct registration, collection unwrap, then implicit
    /// interface binding. `None` means no resolver; the caller decides
    /// whether that is an error.
    pub(crate) fn get_resolver(
        &mut self,
        info: &TypeInfo,
        scope: Option<ScopeId>,
    ) -> Result<Option<Rc<dyn Resolver>>, InjectError> {
        if let Some(resolver) = self.get_explicit_resolver(info, scope)? {
            return Ok(Some(resolver));
        }
        if let Some(resolver) = self.lookup(info.key, scope) {
            return Ok(Some(resolver));
        }
        if let Some(collection) = &info.collection {
            match &collection.ops {
                CollectionOps::Group(ops) => {
                    self.ensure_group(collection.elem, info.key, *ops, &Location::unknown())?;
                }
                CollectionOps::ScopedMap(ops) => {
                    self.ensure_scoped_map(collection.elem, info.key, *ops, &Location::unknown())?;
                }
            }
            return Ok(self.lookup(info.key, None));
        }
        if let Some(form) = &info.element_form {
            match &form.ops {
                CollectionOps::Group(ops) => {
                    self.ensure_group(info.key, form.collection, *ops, &Location::unknown())?;
                }
                CollectionOps::ScopedMap(ops) => {
                    self.ensure_scoped_map(info.key, form.collection, *ops, &Location::unknown())?;
                }
            }
            return Ok(self.lookup(info.key, None));
        }
        if info.kind == TypeKind::Interface {
            return self.resolve_interface_type(info, scope);
        }
        Ok(None)
    }

    fn get_explicit_resolver(
        &mut self,
        info: &TypeInfo,
        scope: Option<ScopeId>,
    ) -> Result<Option<Rc<dyn Resolver>>, InjectError> {
        let binding_key = [scope.map(|s| BindingKey::new(info.key, Some(s))), Some(BindingKey::new(info.key, None))]
            .into_iter()
            .flatten()
            .find(|key| self.bindings.contains_key(key));
        let Some(binding_key) = binding_key else {
            return Ok(None);
        };
        let (implementation, upcast, cached, binding_scope) = {
            let binding = &self.bindings[&binding_key];
            (
                binding.implementation,
                binding.upcast.clone(),
                binding.resolver.clone(),
                binding.scope,
            )
        };
        if let Some(resolver) = cached {
            return Ok(Some(resolver));
        }
        let Some(inner) = self.lookup(implementation, scope) else {
            return Err(InjectError::MissingExplicitBinding {
                interface: info.key.name,
                implementation: implementation.name,
                scope: binding_scope.map(|s| self.scopes.name(s).to_string()),
            });
        };
        let resolver: Rc<dyn Resolver> = Rc::new(BoundInterfaceResolver {
            info: info.clone(),
            inner,
            upcast,
        });
        self.bindings.get_mut(&binding_key).unwrap().resolver = Some(resolver.clone());
        Ok(Some(resolver))
    }

    /// Implicit interface resolution: exactly one candidate whose declared
    /// capability set covers the requested interface is auto-bound and
    /// cached; two or more fail; zero is not an error here.
    fn resolve_interface_type(
        &mut self,
        info: &TypeInfo,
        scope: Option<ScopeId>,
    ) -> Result<Option<Rc<dyn Resolver>>, InjectError> {
        let mut seen = HashSet::new();
        let mut matches: Vec<(TypeKey, Rc<dyn Fn(&Value) -> Value>)> = Vec::new();
        for key in &self.resolver_order {
            if key.scope.is_some() && key.scope != scope {
                continue;
            }
            let Some(resolver) = self.resolvers.get(key) else {
                continue;
            };
            let Some(produced) = resolver.produced_info() else {
                continue;
            };
            for declared in &produced.interfaces {
                if declared.interface == info.key && seen.insert(produced.key.id) {
                    matches.push((produced.key, declared.upcast.clone()));
                }
            }
        }
        match matches.len() {
            0 => Ok(None),
            1 => {
                let (impl_key, upcast) = matches.remove(0);
                let inner = self.lookup(impl_key, scope).unwrap();
                self.logf(format_args!(
                    "Implicitly registering resolver {} for interface type {}",
                    impl_key, info.key
                ));
                tracing::debug!(
                    target: "solder",
                    interface = info.key.name,
                    implementation = impl_key.name,
                    "implicit interface binding"
                );
                let resolver: Rc<dyn Resolver> = Rc::new(BoundInterfaceResolver {
                    info: info.clone(),
                    inner,
                    upcast,
                });
                self.add_resolver(info.key, None, resolver.clone());
                Ok(Some(resolver))
            }
            _ => {
                let mut candidates: Vec<&'static str> =
                    matches.iter().map(|(key, _)| key.name).collect();
                candidates.sort_unstable();
                Err(InjectError::AmbiguousBinding {
                    interface: info.key.name,
                    candidates,
                })
            }
        }
    }

    pub(crate) fn resolve_one(
        &mut self,
        info: &TypeInfo,
        scope: Option<ScopeId>,
        caller: &Location,
    ) -> Result<Option<Value>, InjectError> {
        match self.get_resolver(info, scope)? {
            Some(resolver) => resolver.resolve(self, scope, caller).map(Some),
            None => Ok(None),
        }
    }

    /// Invokes a descriptor: cycle check, left-to-right input resolution,
    /// the call itself, and error wrapping with the descriptor's location.
    /// The location is pushed before input resolution and popped
    /// unconditionally.
    pub(crate) fn call(
        &mut self,
        desc: &Rc<ProviderDescriptor>,
        scope: Option<ScopeId>,
        own_scope: Option<ScopeId>,
    ) -> Result<Vec<Value>, InjectError> {
        let location = &desc.location;
        let scope_name = scope.map(|id| self.scopes.name(id).to_string());
        let graph_node = self
            .debug
            .borrow_mut()
            .location_graph_node(location, scope_name.as_deref());
        self.debug.borrow_mut().mark_graph_node_as_failed(graph_node);

        if self.caller_set.contains(location) {
            let start = self
                .caller_stack
                .iter()
                .position(|active| active == location)
                .unwrap_or(0);
            let mut chain = self.caller_stack[start..].to_vec();
            chain.push(location.clone());
            return Err(InjectError::CyclicDependency { chain });
        }
        self.caller_set.insert(location.clone());
        self.caller_stack.push(location.clone());
        let result = self.call_inner(desc, scope, own_scope);
        self.caller_stack.pop();
        self.caller_set.remove(location);

        let values = result?;
        self.debug.borrow_mut().mark_graph_node_as_used(graph_node);
        Ok(values)
    }

    fn call_inner(
        &mut self,
        desc: &Rc<ProviderDescriptor>,
        scope: Option<ScopeId>,
        own_scope: Option<ScopeId>,
    ) -> Result<Vec<Value>, InjectError> {
        self.logf(format_args!(
            "Resolving dependencies for {}",
            desc.location
        ));
        self.indent_logger();
        let resolved = self.resolve_inputs(desc, scope);
        self.dedent_logger();
        let values = resolved?;

        self.logf(format_args!("Calling {}", desc.location));
        let invoking = scope.map(|id| self.scopes.key(id));
        let own = own_scope.map(|id| self.scopes.key(id));
        (desc.call)(&values, invoking.as_ref(), own.as_ref()).map_err(|source| {
            InjectError::ProviderError {
                location: desc.location.clone(),
                source,
            }
        })
    }

    fn resolve_inputs(
        &mut self,
        desc: &Rc<ProviderDescriptor>,
        scope: Option<ScopeId>,
    ) -> Result<Vec<Option<Value>>, InjectError> {
        let mut values = Vec::with_capacity(desc.inputs.len());
        for input in &desc.inputs {
            values.push(match input {
                ArgKind::Required(info) => Some(
                    self.resolve_one(info, scope, &desc.location)?
                        .ok_or_else(|| InjectError::MissingDependency {
                            type_name: info.key.name,
                            caller: desc.location.clone(),
                        })?,
                ),
                ArgKind::Optional(info) => self.resolve_one(info, scope, &desc.location)?,
                ArgKind::Scope | ArgKind::OwnScope => None,
            });
        }
        Ok(values)
    }

    /// Runs registered invokers in registration order. Invoker inputs are
    /// optional by construction, so a missing dependency arrives as `None`.
    pub(crate) fn run_invokers(&mut self) -> Result<(), InjectError> {
        let invokers = self.invokers.clone();
        for invoker in invokers {
            tracing::debug!(
                target: "solder",
                invoker = %invoker.desc.location,
                "running invoker"
            );
            self.call(&invoker.desc, invoker.scope, invoker.scope)?;
        }
        Ok(())
    }
}
