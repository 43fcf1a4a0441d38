use std::any::{Any, TypeId, type_name};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

/// Type-erased value passed between providers.
pub(crate) type Value = Arc<dyn Any + Send + Sync>;

/// Stable identifier of a participating type.
///
/// Identity is the `TypeId`; the type name is carried alongside for
/// diagnostics and binding descriptions.
#[derive(Clone, Copy, Debug)]
pub struct TypeKey {
    pub(crate) id: TypeId,
    pub(crate) name: &'static str,
}

impl TypeKey {
    pub(crate) fn of<T: 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
        }
    }
}

impl PartialEq for TypeKey {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeKey {}

impl std::hash::Hash for TypeKey {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// How a type participates in resolution.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum TypeKind {
    /// A regular type resolved through exactly one provider per scope.
    Single,
    /// An element type aggregated container-wide; requested as `Vec<T>`.
    ManyPerContainer,
    /// An element type contributed once per scope; requested as
    /// `BTreeMap<String, T>`.
    OnePerScope,
    /// An interface type, resolved through an explicit or implicit binding
    /// to an implementation.
    Interface,
}

/// A declared interface implementation: the interface key plus the erased
/// conversion from the implementing type to the interface value.
#[derive(Clone)]
pub(crate) struct InterfaceImpl {
    pub(crate) interface: TypeKey,
    pub(crate) upcast: Rc<dyn Fn(&Value) -> Value>,
}

/// Erased operations for building an ordered `Vec<E>` of group elements.
#[derive(Clone, Copy)]
pub(crate) struct GroupOps {
    pub(crate) new: fn() -> Box<dyn Any + Send + Sync>,
    pub(crate) push: fn(&mut (dyn Any + Send + Sync), &Value),
    pub(crate) splice: fn(&mut (dyn Any + Send + Sync), &Value),
}

fn group_ops<E: Injectable>() -> GroupOps {
    GroupOps {
        new: || Box::new(Vec::<E>::new()),
        push: |acc, value| {
            let vec = acc.downcast_mut::<Vec<E>>().unwrap();
            vec.push(value.downcast_ref::<E>().unwrap().clone());
        },
        splice: |acc, value| {
            let vec = acc.downcast_mut::<Vec<E>>().unwrap();
            vec.extend_from_slice(value.downcast_ref::<Vec<E>>().unwrap());
        },
    }
}

/// Erased operations for building a `BTreeMap<String, E>` keyed by scope name.
#[derive(Clone, Copy)]
pub(crate) struct MapOps {
    pub(crate) new: fn() -> Box<dyn Any + Send + Sync>,
    pub(crate) insert: fn(&mut (dyn Any + Send + Sync), &str, &Value),
}

fn map_ops<E: Injectable>() -> MapOps {
    MapOps {
        new: || Box::new(BTreeMap::<String, E>::new()),
        insert: |acc, scope, value| {
            let map = acc.downcast_mut::<BTreeMap<String, E>>().unwrap();
            map.insert(scope.into(), value.downcast_ref::<E>().unwrap().clone());
        },
    }
}

/// Erased builder for one collection shape.
#[derive(Clone)]
pub(crate) enum CollectionOps {
    Group(GroupOps),
    ScopedMap(MapOps),
}

/// Links a collection form (`Vec<E>` or `BTreeMap<String, E>`) to its marked
/// element type.
#[derive(Clone)]
pub(crate) struct Collection {
    pub(crate) elem: TypeKey,
    pub(crate) ops: CollectionOps,
}

/// Links a marked element type to its collection form.
#[derive(Clone)]
pub(crate) struct ElementForm {
    pub(crate) collection: TypeKey,
    pub(crate) ops: CollectionOps,
}

/// Registered metadata of one participating type.
///
/// Produced by [`Injectable::type_info`]; the container never inspects types
/// structurally, it only consults the metadata declared here.
#[derive(Clone)]
pub struct TypeInfo {
    pub(crate) key: TypeKey,
    pub(crate) kind: TypeKind,
    pub(crate) collection: Option<Collection>,
    pub(crate) element_form: Option<ElementForm>,
    pub(crate) interfaces: Vec<InterfaceImpl>,
}

impl TypeInfo {
    /// Builds the metadata record for `T` with the given kind.
    ///
    /// Marked element kinds also record their collection form so the
    /// container can route contributions without inspecting `T`.
    pub fn new<T: Injectable>(kind: TypeKind) -> Self {
        let element_form = match kind {
            TypeKind::ManyPerContainer => Some(ElementForm {
                collection: TypeKey::of::<Vec<T>>(),
                ops: CollectionOps::Group(group_ops::<T>()),
            }),
            TypeKind::OnePerScope => Some(ElementForm {
                collection: TypeKey::of::<BTreeMap<String, T>>(),
                ops: CollectionOps::ScopedMap(map_ops::<T>()),
            }),
            TypeKind::Single | TypeKind::Interface => None,
        };
        Self {
            key: TypeKey::of::<T>(),
            kind,
            collection: None,
            element_form,
            interfaces: Vec::new(),
        }
    }

    /// Declares that values of `T` satisfy the interface type `I`.
    ///
    /// Matching interface requests against implementations uses exactly the
    /// declarations made here; there is no structural discovery. The `upcast`
    /// function converts an owned implementation value into the interface
    /// value, typically `|value| Arc::new(value) as Arc<dyn Trait>`.
    pub fn implements<T: Injectable, I: Injectable>(mut self, upcast: fn(T) -> I) -> Self {
        let erased: Rc<dyn Fn(&Value) -> Value> = Rc::new(move |value: &Value| {
            let concrete = value.downcast_ref::<T>().unwrap().clone();
            Arc::new(upcast(concrete)) as Value
        });
        self.interfaces.push(InterfaceImpl {
            interface: TypeKey::of::<I>(),
            upcast: erased,
        });
        self
    }

    /// The key identifying this type.
    pub fn key(&self) -> TypeKey {
        self.key
    }

    /// How this type participates in resolution.
    pub fn kind(&self) -> TypeKind {
        self.kind
    }
}

/// A type that can participate in dependency resolution.
///
/// Implementations describe the type to the container: its identity, how it
/// aggregates (one per container, many per container, or one per scope), and
/// which interface types it satisfies. The `macros` feature provides
/// `#[derive(Injectable)]` for user types:
///
/// ```rust
/// use solder::Injectable;
///
/// #[derive(Clone, Injectable)]
/// struct Registry {
///     entries: Vec<String>,
/// }
///
/// #[derive(Clone, Injectable)]
/// #[injectable(many_per_container)]
/// struct Route {
///     path: String,
/// }
/// ```
///
/// Primitive types, `String`, `Vec<E>`, and `BTreeMap<String, E>` are covered
/// by the crate. A `Vec<E>` whose element is marked `many_per_container` is
/// the request form of the group aggregate; a `BTreeMap<String, E>` whose
/// element is marked `one_per_scope` is the request form of the scoped map.
pub trait Injectable: Clone + Send + Sync + 'static {
    /// Returns the registered metadata for this type.
    fn type_info() -> TypeInfo;
}

macro_rules! impl_injectable_primitive {
    ($($ty:ty),* $(,)?) => {
        $(impl Injectable for $ty {
            fn type_info() -> TypeInfo {
                TypeInfo::new::<Self>(TypeKind::Single)
            }
        })*
    };
}

impl_injectable_primitive!(
    bool, char, String, &'static str, i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128,
    usize, f32, f64,
);

impl<E: Injectable> Injectable for Vec<E> {
    fn type_info() -> TypeInfo {
        let elem = E::type_info();
        let mut info = TypeInfo::new::<Self>(TypeKind::Single);
        if elem.kind == TypeKind::ManyPerContainer {
            info.collection = Some(Collection {
                elem: elem.key,
                ops: CollectionOps::Group(group_ops::<E>()),
            });
        }
        info
    }
}

impl<E: Injectable> Injectable for BTreeMap<String, E> {
    fn type_info() -> TypeInfo {
        let elem = E::type_info();
        let mut info = TypeInfo::new::<Self>(TypeKind::Single);
        if elem.kind == TypeKind::OnePerScope {
            info.collection = Some(Collection {
                elem: elem.key,
                ops: CollectionOps::ScopedMap(map_ops::<E>()),
            });
        }
        info
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone)]
    struct Elem(&'static str);

    impl Injectable for Elem {
        fn type_info() -> TypeInfo {
            TypeInfo::new::<Self>(TypeKind::ManyPerContainer)
        }
    }

    #[test]
    fn marked_element_records_its_collection_form() {
        let info = Elem::type_info();
        let form = info.element_form.expect("element form");
        assert_eq!(form.collection, TypeKey::of::<Vec<Elem>>());
    }

    #[test]
    fn vec_of_marked_element_unwraps() {
        let info = <Vec<Elem>>::type_info();
        let collection = info.collection.expect("collection");
        assert_eq!(collection.elem, TypeKey::of::<Elem>());
    }

    #[test]
    fn vec_of_plain_type_is_plain() {
        assert!(<Vec<i32>>::type_info().collection.is_none());
    }

    #[test]
    fn group_ops_push_and_splice() {
        let ops = group_ops::<Elem>();
        let mut acc = (ops.new)();
        let one: Value = Arc::new(Elem("a"));
        let rest: Value = Arc::new(vec![Elem("b"), Elem("c")]);
        (ops.push)(&mut *acc, &one);
        (ops.splice)(&mut *acc, &rest);
        let vec = acc.downcast_ref::<Vec<Elem>>().unwrap();
        let names: Vec<_> = vec.iter().map(|e| e.0).collect();
        assert_eq!(names, ["a", "b", "c"]);
    }
}
