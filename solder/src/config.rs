use std::sync::Arc;

use crate::container::Container;
use crate::errors::{InjectError, StdError};
use crate::location::Location;
use crate::provider::{InvokerFn, ProviderFn};
use crate::type_info::{Injectable, TypeKind};

/// A declarative list of registration actions.
///
/// A `Config` does no work on its own; it mutates a fresh container when a
/// build entry point applies it. Configs compose with [`configs`], which
/// applies its members in order and stops at the first failure.
pub struct Config {
    apply: Box<dyn FnOnce(&mut Container) -> Result<(), InjectError>>,
}

impl Config {
    fn new(apply: impl FnOnce(&mut Container) -> Result<(), InjectError> + 'static) -> Self {
        Self {
            apply: Box::new(apply),
        }
    }

    pub(crate) fn apply(self, ctr: &mut Container) -> Result<(), InjectError> {
        (self.apply)(ctr)
    }
}

/// Registers providers in the global scope.
///
/// A provider is called at most once per build, when one of its outputs is
/// first needed. Its arguments are resolved left to right; `Option<T>`
/// arguments are optional, and a [`ScopeKey`](crate::ScopeKey) argument makes
/// the provider scope-aware, instantiated once per requesting scope.
///
/// # Examples
///
/// ```rust
/// use solder::{configs, inject, provide};
///
/// # fn main() -> Result<(), solder::InjectError> {
/// let (text,): (String,) = inject(configs([
///     provide(|| 21i32),
///     provide(|x: i32| (x * 2).to_string()),
/// ]))?;
/// assert_eq!(text, "42");
/// # Ok(())
/// # }
/// ```
#[track_caller]
pub fn provide<F, M>(provider: F) -> Config
where
    F: ProviderFn<M>,
{
    let location = Location::from_fn::<F>(std::panic::Location::caller());
    let desc = provider.descriptor(location);
    Config::new(move |ctr| ctr.add_node(desc.0, None))
}

/// Registers providers in a named scope. See [`provide`] for provider
/// requirements.
#[track_caller]
pub fn provide_in_scope<F, M>(scope: impl Into<String>, provider: F) -> Config
where
    F: ProviderFn<M>,
{
    let location = Location::from_fn::<F>(std::panic::Location::caller());
    let desc = provider.descriptor(location.clone());
    let scope = scope.into();
    Config::new(move |ctr| {
        let scope = check_scope_name(&scope, &location)?;
        let scope = ctr.create_or_get_scope(scope);
        ctr.add_node(desc.0, Some(scope))
    })
}

/// Registers an invoker to run, in registration order, after the provider
/// graph is resolved. Invoker inputs are always optional: a missing
/// dependency arrives as `None` instead of failing the build.
#[track_caller]
pub fn invoke<F, M>(invoker: F) -> Config
where
    F: InvokerFn<M>,
{
    let location = Location::from_fn::<F>(std::panic::Location::caller());
    let desc = invoker.descriptor(location);
    Config::new(move |ctr| ctr.add_invoker(desc.0, None))
}

/// Registers an invoker in a named scope. See [`invoke`] for invoker
/// requirements.
#[track_caller]
pub fn invoke_in_scope<F, M>(scope: impl Into<String>, invoker: F) -> Config
where
    F: InvokerFn<M>,
{
    let location = Location::from_fn::<F>(std::panic::Location::caller());
    let desc = invoker.descriptor(location.clone());
    let scope = scope.into();
    Config::new(move |ctr| {
        let scope = check_scope_name(&scope, &location)?;
        let scope = ctr.create_or_get_scope(scope);
        ctr.add_invoker(desc.0, Some(scope))
    })
}

/// Registers a pre-built value as a zero-input provider for its exact type.
#[track_caller]
pub fn supply<T: Injectable>(value: T) -> Config {
    let location =
        Location::from_value_type(std::any::type_name::<T>(), std::panic::Location::caller());
    Config::new(move |ctr| ctr.supply_value(Arc::new(value), T::type_info(), location))
}

/// Declares that the interface type `I` resolves to the implementation `T`
/// in every scope without a more specific binding.
///
/// `I` is the interface form, typically `Arc<dyn Trait>` registered with
/// `#[interface]`, and `T` must declare `I` in its capability set via
/// `#[injectable(implements(...))]`. The implementation must gain a provider
/// before `I` is requested; resolution fails otherwise.
#[track_caller]
pub fn bind_interface<I, T>() -> Config
where
    I: Injectable,
    T: Injectable,
{
    bind::<I, T>(None, Location::entry("bind_interface", std::panic::Location::caller()))
}

/// Declares an interface binding restricted to one scope. See
/// [`bind_interface`].
#[track_caller]
pub fn bind_interface_in_scope<I, T>(scope: impl Into<String>) -> Config
where
    I: Injectable,
    T: Injectable,
{
    bind::<I, T>(
        Some(scope.into()),
        Location::entry("bind_interface_in_scope", std::panic::Location::caller()),
    )
}

fn bind<I, T>(scope: Option<String>, location: Location) -> Config
where
    I: Injectable,
    T: Injectable,
{
    Config::new(move |ctr| {
        let interface = I::type_info();
        let implementation = T::type_info();
        if interface.kind() != TypeKind::Interface {
            return Err(InjectError::InvalidShape {
                location,
                reason: format!("{} is not an interface type", interface.key()),
            });
        }
        let Some(declared) = implementation
            .interfaces
            .iter()
            .find(|decl| decl.interface == interface.key)
        else {
            return Err(InjectError::InvalidShape {
                location,
                reason: format!(
                    "{} does not declare interface {}",
                    implementation.key, interface.key
                ),
            });
        };
        let scope = match &scope {
            Some(name) => {
                let name = check_scope_name(name, &location)?;
                Some(ctr.create_or_get_scope(name))
            }
            None => None,
        };
        ctr.add_binding(
            interface.key,
            implementation.key,
            declared.upcast.clone(),
            scope,
        );
        Ok(())
    })
}

/// Registers a fixed error that fails container initialization.
pub fn error(err: impl Into<StdError>) -> Config {
    let err = err.into();
    Config::new(move |_| Err(InjectError::Failed(err)))
}

/// Bundles multiple configs into one, applied in order; the first failure
/// aborts the rest.
pub fn configs(configs: impl IntoIterator<Item = Config> + 'static) -> Config {
    Config::new(move |ctr| {
        for config in configs {
            config.apply(ctr)?;
        }
        Ok(())
    })
}

fn check_scope_name<'a>(name: &'a str, location: &Location) -> Result<&'a str, InjectError> {
    if name.is_empty() {
        return Err(InjectError::InvalidShape {
            location: location.clone(),
            reason: "expected non-empty scope name".into(),
        });
    }
    Ok(name)
}
