use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use crate::container::Container;
use crate::errors::InjectError;
use crate::location::Location;
use crate::resolver::{ProviderNode, Resolver};
use crate::scope::ScopeId;
use crate::type_info::{GroupOps, TypeInfo, TypeKey, Value};

/// One provider output feeding a group.
#[derive(Clone)]
struct Contribution {
    node: Rc<ProviderNode>,
    idx: usize,
    /// The output was declared as a collection of elements and is spliced
    /// into the aggregate instead of appended as one element.
    spliced: bool,
}

#[derive(Default)]
struct GroupState {
    contributions: Vec<Contribution>,
    resolved: Option<Value>,
}

/// Aggregates many-per-container contributions into an ordered collection.
///
/// Registered under the bare element type, where resolution is always an
/// error pointing at the collection form; [`SliceGroupResolver`] exposes the
/// same state under the collection type.
pub(crate) struct GroupResolver {
    pub(crate) elem: TypeKey,
    pub(crate) collection: TypeKey,
    ops: GroupOps,
    state: RefCell<GroupState>,
}

impl GroupResolver {
    pub(crate) fn new(elem: TypeKey, collection: TypeKey, ops: GroupOps) -> Rc<Self> {
        Rc::new(Self {
            elem,
            collection,
            ops,
            state: RefCell::default(),
        })
    }

    pub(crate) fn add_contribution(&self, node: Rc<ProviderNode>, idx: usize, spliced: bool) {
        self.state.borrow_mut().contributions.push(Contribution {
            node,
            idx,
            spliced,
        });
    }

    fn resolve_values(&self, ctr: &mut Container, caller: &Location) -> Result<Value, InjectError> {
        {
            if let Some(value) = &self.state.borrow().resolved {
                return Ok(value.clone());
            }
        }
        let contributions = self.state.borrow().contributions.clone();
        ctr.logf(format_args!(
            "Providing {} to {} from:",
            self.collection,
            caller.full_name()
        ));
        ctr.indent_logger();
        for contribution in &contributions {
            ctr.logf(format_args!("{}", contribution.node.location()));
        }
        ctr.dedent_logger();
        let mut acc = (self.ops.new)();
        for contribution in &contributions {
            let values = contribution.node.resolve_values(ctr)?;
            let value = &values[contribution.idx];
            if contribution.spliced {
                (self.ops.splice)(acc.as_mut(), value);
            } else {
                (self.ops.push)(acc.as_mut(), value);
            }
        }
        let value: Value = Arc::from(acc);
        self.state.borrow_mut().resolved = Some(value.clone());
        Ok(value)
    }
}

impl Resolver for GroupResolver {
    fn produced_info(&self) -> Option<&TypeInfo> {
        None
    }

    fn describe(&self) -> String {
        format!("many-per-container type {}", self.elem)
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
                "{} is a many-per-container type and cannot be used as an input value, use {} instead",
                self.elem, self.collection
            ),
        })
    }
}

/// Exposes a group's aggregate under its collection type.
pub(crate) struct SliceGroupResolver {
    pub(crate) group: Rc<GroupResolver>,
}

impl Resolver for SliceGroupResolver {
    fn produced_info(&self) -> Option<&TypeInfo> {
        None
    }

    fn describe(&self) -> String {
        format!("many-per-container type collection {}", self.group.collection)
    }

    fn resolve(
        &self,
        ctr: &mut Container,
        _scope: Option<ScopeId>,
        caller: &Location,
    ) -> Result<Value, InjectError> {
        self.group.resolve_values(ctr, caller)
    }
}
