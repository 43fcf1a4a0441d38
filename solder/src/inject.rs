use std::cell::RefCell;
use std::rc::Rc;

use crate::config::Config;
use crate::container::Container;
use crate::debug::{DebugConfig, DebugOption, auto_debug};
use crate::errors::InjectError;
use crate::location::Location;
use crate::provider::{ArgKind, ArgValue, ProviderArg};
use crate::type_info::Value;

/// Builds and runs a dependency injection container, returning the requested
/// outputs as a tuple.
///
/// The configuration is applied to a fresh container, the requested types are
/// resolved in order, and registered invokers run afterwards in registration
/// order. Any failure aborts the whole build; no partial results are
/// returned. Tuple elements follow input semantics, so an `Option<T>` element
/// is an optional request.
///
/// Debugging uses [`auto_debug`]: verbose output appears only on error.
///
/// # Examples
///
/// ```rust
/// use solder::{configs, inject, provide};
///
/// # fn main() -> Result<(), solder::InjectError> {
/// let (x, text): (i32, String) = inject(configs([
///     provide(|| 1i32),
///     provide(|x: i32| format!("got {x}")),
/// ]))?;
/// assert_eq!(x, 1);
/// assert_eq!(text, "got 1");
/// # Ok(())
/// # }
/// ```
#[track_caller]
pub fn inject<Out, M>(config: Config) -> Result<Out, InjectError>
where
    Out: InjectOutputs<M>,
{
    inject_run(
        auto_debug(),
        config,
        Location::entry("inject", std::panic::Location::caller()),
    )
}

/// Like [`inject`], with explicit debug options.
#[track_caller]
pub fn inject_debug<Out, M>(debug_opt: DebugOption, config: Config) -> Result<Out, InjectError>
where
    Out: InjectOutputs<M>,
{
    inject_run(
        debug_opt,
        config,
        Location::entry("inject_debug", std::panic::Location::caller()),
    )
}

fn inject_run<Out, M>(
    debug_opt: DebugOption,
    config: Config,
    location: Location,
) -> Result<Out, InjectError>
where
    Out: InjectOutputs<M>,
{
    let debug = Rc::new(RefCell::new(DebugConfig::default()));
    debug_opt.apply_config(&mut debug.borrow_mut());

    let result = build(debug.clone(), config, &location);
    match &result {
        Ok(_) => {
            let hook = debug.borrow().on_success.clone();
            if let Some(hook) = hook {
                hook.apply_config(&mut debug.borrow_mut());
            }
        }
        Err(err) => {
            debug.borrow().logf(format_args!("Error: {err}"));
            let hook = debug.borrow().on_error.clone();
            if let Some(hook) = hook {
                hook.apply_config(&mut debug.borrow_mut());
            }
        }
    }
    debug.borrow_mut().generate_graph();
    debug.borrow_mut().run_cleanup();
    result
}

fn build<Out, M>(
    debug: Rc<RefCell<DebugConfig>>,
    config: Config,
    location: &Location,
) -> Result<Out, InjectError>
where
    Out: InjectOutputs<M>,
{
    debug.borrow().logf(format_args!("Registering providers"));
    let mut ctr = Container::new(debug.clone());
    debug.borrow_mut().indent_logger();
    let applied = config.apply(&mut ctr);
    debug.borrow_mut().dedent_logger();
    if let Err(err) = applied {
        debug
            .borrow()
            .logf(format_args!("Failed registering providers: {err}"));
        return Err(err);
    }
    let mut cx = BuildContext {
        ctr: &mut ctr,
        caller: location.clone(),
    };
    let out = Out::resolve(&mut cx)?;
    ctr.run_invokers()?;
    Ok(out)
}

/// Resolution context handed to [`InjectOutputs`] implementations.
pub struct BuildContext<'a> {
    ctr: &'a mut Container,
    caller: Location,
}

impl BuildContext<'_> {
    fn resolve_element<E, M>(&mut self) -> Result<E, InjectError>
    where
        E: ProviderArg<M>,
    {
        match E::spec().0 {
            ArgKind::Required(info) => {
                let value: Value = self
                    .ctr
                    .resolve_one(&info, None, &self.caller)?
                    .ok_or_else(|| InjectError::MissingDependency {
                        type_name: info.key.name,
                        caller: self.caller.clone(),
                    })?;
                Ok(E::extract(ArgValue {
                    value: Some(&value),
                    scope: None,
                    own_scope: None,
                }))
            }
            ArgKind::Optional(info) => {
                let value = self.ctr.resolve_one(&info, None, &self.caller)?;
                Ok(E::extract(ArgValue {
                    value: value.as_ref(),
                    scope: None,
                    own_scope: None,
                }))
            }
            ArgKind::Scope | ArgKind::OwnScope => Err(InjectError::InvalidShape {
                location: self.caller.clone(),
                reason: "scope keys cannot be requested as build outputs".into(),
            }),
        }
    }
}

/// A tuple of types requestable from [`inject`].
///
/// Implemented for tuples of up to eight elements, each a required `T` or an
/// optional `Option<T>`.
pub trait InjectOutputs<M>: Sized {
    fn resolve(cx: &mut BuildContext<'_>) -> Result<Self, InjectError>;
}

impl InjectOutputs<()> for () {
    fn resolve(_cx: &mut BuildContext<'_>) -> Result<Self, InjectError> {
        Ok(())
    }
}

macro_rules! impl_inject_outputs {
    ($($elem:ident $marker:ident),+) => {
        impl<$($elem, $marker),+> InjectOutputs<($($marker,)+)> for ($($elem,)+)
        where
            $($elem: ProviderArg<$marker>,)+
        {
            fn resolve(cx: &mut BuildContext<'_>) -> Result<Self, InjectError> {
                Ok(($(cx.resolve_element::<$elem, $marker>()?,)+))
            }
        }
    };
}

impl_inject_outputs!(A0 M0);
impl_inject_outputs!(A0 M0, A1 M1);
impl_inject_outputs!(A0 M0, A1 M1, A2 M2);
impl_inject_outputs!(A0 M0, A1 M1, A2 M2, A3 M3);
impl_inject_outputs!(A0 M0, A1 M1, A2 M2, A3 M3, A4 M4);
impl_inject_outputs!(A0 M0, A1 M1, A2 M2, A3 M3, A4 M4, A5 M5);
impl_inject_outputs!(A0 M0, A1 M1, A2 M2, A3 M3, A4 M4, A5 M5, A6 M6);
impl_inject_outputs!(A0 M0, A1 M1, A2 M2, A3 M3, A4 M4, A5 M5, A6 M6, A7 M7);
