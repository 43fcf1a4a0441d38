use std::sync::Arc;

use solder::{
    InjectError, Injectable, OwnScopeKey, bind_interface, bind_interface_in_scope, configs,
    inject, interface, provide, provide_in_scope,
};

#[interface]
trait Duck {
    fn species(&self) -> &'static str;
}

#[derive(Clone, Injectable)]
#[injectable(implements(Duck))]
struct Mallard;

impl Duck for Mallard {
    fn species(&self) -> &'static str {
        "mallard"
    }
}

#[derive(Clone, Injectable)]
#[injectable(implements(Duck))]
struct Canvasback;

impl Duck for Canvasback {
    fn species(&self) -> &'static str {
        "canvasback"
    }
}

#[derive(Clone, Injectable)]
#[injectable(implements(Duck))]
struct Marbled;

impl Duck for Marbled {
    fn species(&self) -> &'static str {
        "marbled"
    }
}

#[derive(Clone, Injectable)]
#[injectable(many_per_container)]
struct DuckWrapper {
    scope: String,
    duck: Arc<dyn Duck>,
}

fn provide_mallard() -> Mallard {
    Mallard
}

fn provide_canvasback() -> Canvasback {
    Canvasback
}

fn provide_duck_wrapper(duck: Arc<dyn Duck>) -> DuckWrapper {
    DuckWrapper {
        scope: String::new(),
        duck,
    }
}

fn provide_scoped_duck_wrapper(duck: Arc<dyn Duck>, own: OwnScopeKey) -> DuckWrapper {
    DuckWrapper {
        scope: own.name().to_string(),
        duck,
    }
}

#[test]
fn single_implementation_binds_implicitly() {
    let (wrappers,): (Vec<DuckWrapper>,) = inject(configs([
        provide(provide_mallard),
        provide(provide_duck_wrapper),
    ]))
    .unwrap();
    assert_eq!(wrappers.len(), 1);
    assert_eq!(wrappers[0].duck.species(), "mallard");
}

#[test]
fn two_implementations_without_a_binding_are_ambiguous() {
    let err = inject::<(Vec<DuckWrapper>,), _>(configs([
        provide(provide_mallard),
        provide(provide_canvasback),
        provide(provide_duck_wrapper),
    ]))
    .unwrap_err();
    let InjectError::AmbiguousBinding { candidates, .. } = &err else {
        panic!("unexpected error: {err}");
    };
    assert_eq!(candidates.len(), 2);
    assert!(candidates.iter().any(|name| name.contains("Mallard")));
    assert!(candidates.iter().any(|name| name.contains("Canvasback")));
}

#[test]
fn explicit_binding_disambiguates() {
    let (wrappers,): (Vec<DuckWrapper>,) = inject(configs([
        provide(provide_mallard),
        provide(provide_canvasback),
        bind_interface::<Arc<dyn Duck>, Canvasback>(),
        provide(provide_duck_wrapper),
    ]))
    .unwrap();
    assert_eq!(wrappers.len(), 1);
    assert_eq!(wrappers[0].duck.species(), "canvasback");
}

#[test]
fn binding_to_an_unregistered_implementation_fails() {
    let err = inject::<(Vec<DuckWrapper>,), _>(configs([
        provide(provide_canvasback),
        bind_interface::<Arc<dyn Duck>, Marbled>(),
        provide(provide_duck_wrapper),
    ]))
    .unwrap_err();
    let InjectError::MissingExplicitBinding {
        implementation, ..
    } = &err
    else {
        panic!("unexpected error: {err}");
    };
    assert!(implementation.contains("Marbled"));
}

#[test]
fn scoped_bindings_override_the_global_binding() {
    let (wrappers,): (Vec<DuckWrapper>,) = inject(configs([
        provide(provide_mallard),
        provide(provide_canvasback),
        bind_interface::<Arc<dyn Duck>, Mallard>(),
        bind_interface_in_scope::<Arc<dyn Duck>, Canvasback>("pond"),
        provide(provide_duck_wrapper),
        provide_in_scope("pond", provide_scoped_duck_wrapper),
    ]))
    .unwrap();
    assert_eq!(wrappers.len(), 2);
    let global = wrappers.iter().find(|w| w.scope.is_empty()).unwrap();
    let pond = wrappers.iter().find(|w| w.scope == "pond").unwrap();
    assert_eq!(global.duck.species(), "mallard");
    assert_eq!(pond.duck.species(), "canvasback");
}

#[test]
fn binding_a_type_that_does_not_declare_the_interface_fails() {
    #[derive(Clone, Injectable)]
    struct Goose;

    let err = inject::<(), _>(configs([
        provide(|| Goose),
        bind_interface::<Arc<dyn Duck>, Goose>(),
    ]))
    .unwrap_err();
    let InjectError::InvalidShape { reason, .. } = &err else {
        panic!("unexpected error: {err}");
    };
    assert!(reason.contains("does not declare interface"));
}

#[test]
fn interfaces_resolve_directly_as_outputs() {
    let (duck,): (Arc<dyn Duck>,) = inject(configs([
        provide(provide_mallard),
        provide(provide_canvasback),
        bind_interface::<Arc<dyn Duck>, Mallard>(),
    ]))
    .unwrap();
    assert_eq!(duck.species(), "mallard");
}
