use std::sync::Arc;

use crate::errors::StdError;
use crate::location::Location;
use crate::scope::{OwnScopeKey, ScopeKey};
use crate::type_info::{Injectable, TypeInfo, Value};

/// Declared role of one function argument.
#[derive(Clone)]
pub(crate) enum ArgKind {
    /// A value the container must resolve.
    Required(TypeInfo),
    /// A value passed as `None` when no resolver exists.
    Optional(TypeInfo),
    /// The scope the function is invoked for.
    Scope,
    /// The scope the function was registered in.
    OwnScope,
}

impl ArgKind {
    pub(crate) fn type_info(&self) -> Option<&TypeInfo> {
        match self {
            ArgKind::Required(info) | ArgKind::Optional(info) => Some(info),
            ArgKind::Scope | ArgKind::OwnScope => None,
        }
    }
}

/// Specification of one provider or invoker argument.
pub struct ArgSpec(pub(crate) ArgKind);

/// Resolved material handed to one argument during a call.
pub struct ArgValue<'a> {
    pub(crate) value: Option<&'a Value>,
    pub(crate) scope: Option<&'a ScopeKey>,
    pub(crate) own_scope: Option<&'a ScopeKey>,
}

/// A type usable as a provider argument.
///
/// Implemented for any [`Injectable`] type (a required input), for
/// `Option<T>` of such a type (an optional input), and for the scope
/// identity types [`ScopeKey`] and [`OwnScopeKey`]. The marker parameter
/// distinguishes the forms and is inferred.
pub trait ProviderArg<M>: Sized {
    fn spec() -> ArgSpec;
    fn extract(cx: ArgValue<'_>) -> Self;
}

/// A type usable as an invoker argument.
///
/// Invoker inputs are always optional, so only `Option<T>` and the scope
/// identity types qualify; a missing dependency arrives as `None` instead of
/// failing the build.
pub trait InvokerArg<M>: ProviderArg<M> {}

/// Marker for required value arguments.
pub struct ValueArg;
/// Marker for optional value arguments.
pub struct OptionArg;
/// Marker for the invoking-scope identity argument.
pub struct ScopeArg;
/// Marker for the registration-scope identity argument.
pub struct OwnScopeArg;

impl<T: Injectable> ProviderArg<ValueArg> for T {
    fn spec() -> ArgSpec {
        ArgSpec(ArgKind::Required(T::type_info()))
    }

    fn extract(cx: ArgValue<'_>) -> Self {
        cx.value.unwrap().downcast_ref::<T>().unwrap().clone()
    }
}

impl<T: Injectable> ProviderArg<OptionArg> for Option<T> {
    fn spec() -> ArgSpec {
        ArgSpec(ArgKind::Optional(T::type_info()))
    }

    fn extract(cx: ArgValue<'_>) -> Self {
        cx.value.map(|v| v.downcast_ref::<T>().unwrap().clone())
    }
}

impl ProviderArg<ScopeArg> for ScopeKey {
    fn spec() -> ArgSpec {
        ArgSpec(ArgKind::Scope)
    }

    fn extract(cx: ArgValue<'_>) -> Self {
        cx.scope.unwrap().clone()
    }
}

impl ProviderArg<OwnScopeArg> for OwnScopeKey {
    fn spec() -> ArgSpec {
        ArgSpec(ArgKind::OwnScope)
    }

    fn extract(cx: ArgValue<'_>) -> Self {
        OwnScopeKey::new(cx.own_scope.unwrap().clone())
    }
}

impl<T: Injectable> InvokerArg<OptionArg> for Option<T> {}
impl InvokerArg<ScopeArg> for ScopeKey {}
impl InvokerArg<OwnScopeArg> for OwnScopeKey {}

/// An erased provider output value.
pub struct ProvidedValue(pub(crate) Value);

/// A type usable as a provider return value: a single [`Injectable`] value,
/// a tuple of them, or a `Result` of either.
pub trait ProviderOutput<M> {
    fn spec() -> Vec<TypeInfo>;
    fn into_values(self) -> Result<Vec<ProvidedValue>, StdError>;
}

/// A type usable as an invoker return value: `()` or `Result<(), E>`.
pub trait InvokerOutput<M> {
    fn into_result(self) -> Result<(), StdError>;
}

/// Marker for single-value outputs.
pub struct ValueOutput;
/// Marker for tuple outputs.
pub struct TupleOutput;
/// Marker for fallible outputs.
pub struct ResultOutput<M>(std::marker::PhantomData<M>);
/// Marker for empty invoker outputs.
pub struct UnitOutput;

impl<T: Injectable> ProviderOutput<ValueOutput> for T {
    fn spec() -> Vec<TypeInfo> {
        vec![T::type_info()]
    }

    fn into_values(self) -> Result<Vec<ProvidedValue>, StdError> {
        Ok(vec![ProvidedValue(Arc::new(self))])
    }
}

macro_rules! impl_provider_output_tuple {
    ($($ty:ident),+) => {
        impl<$($ty: Injectable),+> ProviderOutput<TupleOutput> for ($($ty,)+) {
            fn spec() -> Vec<TypeInfo> {
                vec![$($ty::type_info()),+]
            }

            fn into_values(self) -> Result<Vec<ProvidedValue>, StdError> {
                #[allow(non_snake_case)]
                let ($($ty,)+) = self;
                Ok(vec![$(ProvidedValue(Arc::new($ty))),+])
            }
        }
    };
}

impl_provider_output_tuple!(A, B);
impl_provider_output_tuple!(A, B, C);
impl_provider_output_tuple!(A, B, C, D);
impl_provider_output_tuple!(A, B, C, D, E);
impl_provider_output_tuple!(A, B, C, D, E, F);
impl_provider_output_tuple!(A, B, C, D, E, F, G);
impl_provider_output_tuple!(A, B, C, D, E, F, G, H);

impl<O, E, M> ProviderOutput<ResultOutput<M>> for Result<O, E>
where
    O: ProviderOutput<M>,
    E: Into<StdError>,
{
    fn spec() -> Vec<TypeInfo> {
        O::spec()
    }

    fn into_values(self) -> Result<Vec<ProvidedValue>, StdError> {
        self.map_err(Into::into)?.into_values()
    }
}

impl InvokerOutput<UnitOutput> for () {
    fn into_result(self) -> Result<(), StdError> {
        Ok(())
    }
}

impl<E: Into<StdError>> InvokerOutput<ResultOutput<UnitOutput>> for Result<(), E> {
    fn into_result(self) -> Result<(), StdError> {
        self.map_err(Into::into)
    }
}

/// Erased calling convention shared by providers and invokers: resolved
/// values in, produced values or an error out.
pub(crate) type ProviderCall = Box<
    dyn Fn(&[Option<Value>], Option<&ScopeKey>, Option<&ScopeKey>) -> Result<Vec<Value>, StdError>,
>;

/// Type-erased record of one registered function.
pub(crate) struct ProviderDescriptor {
    pub(crate) location: Location,
    pub(crate) inputs: Vec<ArgKind>,
    pub(crate) outputs: Vec<TypeInfo>,
    pub(crate) call: ProviderCall,
}

impl ProviderDescriptor {
    pub(crate) fn has_scope_input(&self) -> bool {
        self.inputs.iter().any(|arg| matches!(arg, ArgKind::Scope))
    }

    pub(crate) fn has_own_scope_input(&self) -> bool {
        self.inputs.iter().any(|arg| matches!(arg, ArgKind::OwnScope))
    }
}

/// Extracted descriptor of a registered function.
pub struct FnDescriptor(pub(crate) ProviderDescriptor);

/// A function registrable as a provider.
///
/// Implemented for `Fn` values of arity 0 to 8 whose arguments implement
/// [`ProviderArg`] and whose return type implements [`ProviderOutput`].
pub trait ProviderFn<M> {
    fn descriptor(self, location: Location) -> FnDescriptor;
}

/// A function registrable as an invoker.
///
/// Implemented for `Fn` values of arity 0 to 8 whose arguments implement
/// [`InvokerArg`] and whose return type implements [`InvokerOutput`].
pub trait InvokerFn<M> {
    fn descriptor(self, location: Location) -> FnDescriptor;
}

macro_rules! impl_provider_fn {
    ($($idx:tt $arg:ident $marker:ident),*) => {
        impl<Fun, Out, OutM, $($arg, $marker),*> ProviderFn<(Out, OutM, $($arg, $marker),*)> for Fun
        where
            Fun: Fn($($arg),*) -> Out + 'static,
            Out: ProviderOutput<OutM>,
            $($arg: ProviderArg<$marker>,)*
        {
            fn descriptor(self, location: Location) -> FnDescriptor {
                let inputs = vec![$(<$arg as ProviderArg<$marker>>::spec().0),*];
                let outputs = <Out as ProviderOutput<OutM>>::spec();
                let call: ProviderCall = Box::new(
                    move |_values: &[Option<Value>],
                          _scope: Option<&ScopeKey>,
                          _own: Option<&ScopeKey>| {
                        let out = (self)($(<$arg as ProviderArg<$marker>>::extract(ArgValue {
                            value: _values[$idx].as_ref(),
                            scope: _scope,
                            own_scope: _own,
                        })),*);
                        let values = <Out as ProviderOutput<OutM>>::into_values(out)?;
                        Ok(values.into_iter().map(|v| v.0).collect())
                    },
                );
                FnDescriptor(ProviderDescriptor {
                    location,
                    inputs,
                    outputs,
                    call,
                })
            }
        }

        impl<Fun, Out, OutM, $($arg, $marker),*> InvokerFn<(Out, OutM, $($arg, $marker),*)> for Fun
        where
            Fun: Fn($($arg),*) -> Out + 'static,
            Out: InvokerOutput<OutM>,
            $($arg: InvokerArg<$marker>,)*
        {
            fn descriptor(self, location: Location) -> FnDescriptor {
                let inputs = vec![$(<$arg as ProviderArg<$marker>>::spec().0),*];
                let call: ProviderCall = Box::new(
                    move |_values: &[Option<Value>],
                          _scope: Option<&ScopeKey>,
                          _own: Option<&ScopeKey>| {
                        let out = (self)($(<$arg as ProviderArg<$marker>>::extract(ArgValue {
                            value: _values[$idx].as_ref(),
                            scope: _scope,
                            own_scope: _own,
                        })),*);
                        <Out as InvokerOutput<OutM>>::into_result(out)?;
                        Ok(Vec::new())
                    },
                );
                FnDescriptor(ProviderDescriptor {
                    location,
                    inputs,
                    outputs: Vec::new(),
                    call,
                })
            }
        }
    };
}

impl_provider_fn!();
impl_provider_fn!(0 A0 M0);
impl_provider_fn!(0 A0 M0, 1 A1 M1);
impl_provider_fn!(0 A0 M0, 1 A1 M1, 2 A2 M2);
impl_provider_fn!(0 A0 M0, 1 A1 M1, 2 A2 M2, 3 A3 M3);
impl_provider_fn!(0 A0 M0, 1 A1 M1, 2 A2 M2, 3 A3 M3, 4 A4 M4);
impl_provider_fn!(0 A0 M0, 1 A1 M1, 2 A2 M2, 3 A3 M3, 4 A4 M4, 5 A5 M5);
impl_provider_fn!(0 A0 M0, 1 A1 M1, 2 A2 M2, 3 A3 M3, 4 A4 M4, 5 A5 M5, 6 A6 M6);
impl_provider_fn!(0 A0 M0, 1 A1 M1, 2 A2 M2, 3 A3 M3, 4 A4 M4, 5 A5 M5, 6 A6 M6, 7 A7 M7);

#[cfg(test)]
mod tests {
    use super::*;

    fn extract<F, M>(f: F) -> ProviderDescriptor
    where
        F: ProviderFn<M>,
    {
        let site = std::panic::Location::caller();
        f.descriptor(Location::from_fn::<F>(site)).0
    }

    #[test]
    fn plain_provider_shape() {
        let desc = extract(|x: i32, _label: Option<String>| (x as f64, x + 1));
        assert_eq!(desc.inputs.len(), 2);
        assert!(matches!(desc.inputs[0], ArgKind::Required(_)));
        assert!(matches!(desc.inputs[1], ArgKind::Optional(_)));
        assert_eq!(desc.outputs.len(), 2);
    }

    #[test]
    fn call_convention_round_trip() {
        let desc = extract(|x: i32| -> Result<f64, StdError> { Ok(f64::from(x) * 2.0) });
        let input: Value = Arc::new(21i32);
        let out = (desc.call)(&[Some(input)], None, None).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(*out[0].downcast_ref::<f64>().unwrap(), 42.0);
    }

    #[test]
    fn provider_errors_pass_through() {
        let desc = extract(|| -> Result<i32, StdError> { Err("boom".into()) });
        let err = (desc.call)(&[], None, None).unwrap_err();
        assert_eq!(err.to_string(), "boom");
    }

    #[test]
    fn scope_inputs_are_detected() {
        let desc = extract(|key: ScopeKey| key.name().len() as i64);
        assert!(desc.has_scope_input());
        assert!(!desc.has_own_scope_input());
    }
}
