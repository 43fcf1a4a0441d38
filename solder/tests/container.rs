use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use solder::{
    Config, InjectError, Injectable, OwnScopeKey, ScopeKey, StdError, configs, inject,
    invoke_in_scope, provide, provide_in_scope, supply,
};

#[derive(Clone, Debug, PartialEq, Injectable)]
struct StoreKey {
    name: String,
}

#[derive(Clone, Debug, PartialEq, Injectable)]
struct MsgClient {
    scope: String,
}

#[derive(Clone, Debug, Injectable)]
struct KeeperA {
    key: StoreKey,
    name: String,
}

#[derive(Clone, Debug, Injectable)]
struct KeeperB {
    key: StoreKey,
    client: MsgClient,
}

#[derive(Clone, Debug, PartialEq, Injectable)]
#[injectable(one_per_scope)]
struct Handler {
    scope: String,
}

#[derive(Clone, Debug, PartialEq, Injectable)]
#[injectable(many_per_container)]
struct Command {
    name: String,
}

fn provide_store_key(key: ScopeKey) -> StoreKey {
    StoreKey {
        name: key.name().to_string(),
    }
}

fn provide_msg_client(key: ScopeKey) -> MsgClient {
    MsgClient {
        scope: key.name().to_string(),
    }
}

fn module_a_provide(key: StoreKey, own: OwnScopeKey) -> (KeeperA, Handler, Command) {
    (
        KeeperA {
            key,
            name: own.name().to_string(),
        },
        Handler {
            scope: own.name().to_string(),
        },
        Command { name: "a".into() },
    )
}

#[allow(clippy::type_complexity)]
fn module_b_provide(
    key: StoreKey,
    client: MsgClient,
) -> Result<(KeeperB, Handler, Vec<Command>), StdError> {
    Ok((
        KeeperB { key, client },
        Handler { scope: "b".into() },
        vec![
            Command { name: "b1".into() },
            Command { name: "b2".into() },
        ],
    ))
}

fn scenario_config() -> Config {
    configs([
        provide(provide_msg_client),
        provide(provide_store_key),
        provide_in_scope("a", module_a_provide),
        provide_in_scope("b", module_b_provide),
    ])
}

#[test]
fn scenario() {
    let seen: Rc<RefCell<Vec<String>>> = Rc::default();
    let seen_a = seen.clone();
    let seen_b = seen.clone();
    let config = configs([
        scenario_config(),
        invoke_in_scope("a", move |keeper: Option<KeeperA>| {
            let keeper = keeper.expect("KeeperA in scope a");
            seen_a
                .borrow_mut()
                .push(format!("a={}/{}", keeper.name, keeper.key.name));
        }),
        invoke_in_scope("b", move |keeper: Option<KeeperB>| {
            let keeper = keeper.expect("KeeperB in scope b");
            seen_b
                .borrow_mut()
                .push(format!("b={}/{}", keeper.key.name, keeper.client.scope));
        }),
    ]);

    let (handlers, commands): (BTreeMap<String, Handler>, Vec<Command>) =
        inject(config).unwrap();

    assert_eq!(handlers.len(), 2);
    assert_eq!(handlers["a"].scope, "a");
    assert_eq!(handlers["b"].scope, "b");

    let names: Vec<&str> = commands.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, ["a", "b1", "b2"]);

    assert_eq!(seen.borrow().as_slice(), ["a=a/a", "b=b/b"]);
}

#[test]
fn determinism_across_fresh_containers() {
    let first: (BTreeMap<String, Handler>, Vec<Command>) = inject(scenario_config()).unwrap();
    let second: (BTreeMap<String, Handler>, Vec<Command>) = inject(scenario_config()).unwrap();
    assert_eq!(first, second);
}

#[derive(Clone, Injectable)]
struct Counter(Arc<AtomicUsize>);

#[derive(Clone, Debug, PartialEq, Injectable)]
struct Expensive {
    id: usize,
}

#[derive(Clone, Injectable)]
struct UserA {
    thing: Expensive,
}

#[derive(Clone, Injectable)]
struct UserB {
    thing: Expensive,
}

#[test]
fn providers_run_at_most_once() {
    let counter = Arc::new(AtomicUsize::new(0));
    let (a, b): (UserA, UserB) = inject(configs([
        supply(Counter(counter.clone())),
        provide(|counter: Counter| Expensive {
            id: counter.0.fetch_add(1, Ordering::SeqCst),
        }),
        provide(|thing: Expensive| UserA { thing }),
        provide(|thing: Expensive| UserB { thing }),
    ]))
    .unwrap();
    assert_eq!(counter.load(Ordering::SeqCst), 1);
    assert_eq!(a.thing, b.thing);
}

#[test]
fn cyclic_dependency_is_detected() {
    fn int_from_float(x: f64) -> i32 {
        x as i32
    }
    fn float_from_int(x: i32) -> f64 {
        f64::from(x)
    }
    let err = inject::<(i32,), _>(configs([provide(int_from_float), provide(float_from_int)]))
        .unwrap_err();
    let InjectError::CyclicDependency { .. } = &err else {
        panic!("unexpected error: {err}");
    };
    let text = err.to_string();
    assert!(text.contains("int_from_float"));
    assert!(text.contains("float_from_int"));
}

#[test]
fn missing_dependency_names_the_type() {
    let err = inject::<(String,), _>(configs([
        provide(|x: f64| x.to_string()),
        provide(|x: i64| x as f64),
        provide(|x: u32| i64::from(x)),
    ]))
    .unwrap_err();
    let InjectError::MissingDependency { .. } = &err else {
        panic!("unexpected error: {err}");
    };
    assert!(err.to_string().contains("u32"));
}

#[test]
fn duplicate_direct_providers_are_rejected() {
    fn provide_five() -> i32 {
        5
    }
    fn provide_six() -> i32 {
        6
    }
    let err =
        inject::<(i32,), _>(configs([provide(provide_five), provide(provide_six)])).unwrap_err();
    assert!(matches!(err, InjectError::DuplicateDefinition { .. }));
}

#[test]
fn supplying_an_already_provided_type_is_rejected() {
    let err = inject::<(i32,), _>(configs([provide(|| 5i32), supply(6i32)])).unwrap_err();
    assert!(matches!(err, InjectError::DuplicateDefinition { .. }));
}

#[test]
fn same_type_in_different_scopes_is_allowed() {
    fn provide_five() -> i32 {
        5
    }
    fn provide_six() -> i32 {
        6
    }
    let seen: Rc<RefCell<Vec<i32>>> = Rc::default();
    let seen_a = seen.clone();
    let seen_b = seen.clone();
    inject::<(), _>(configs([
        provide_in_scope("a", provide_five),
        provide_in_scope("b", provide_six),
        invoke_in_scope("a", move |x: Option<i32>| {
            seen_a.borrow_mut().push(x.expect("i32 in scope a"));
        }),
        invoke_in_scope("b", move |x: Option<i32>| {
            seen_b.borrow_mut().push(x.expect("i32 in scope b"));
        }),
    ]))
    .unwrap();
    assert_eq!(seen.borrow().as_slice(), [5, 6]);
}

#[test]
fn scoped_contributions_stay_isolated() {
    let (handlers,): (BTreeMap<String, Handler>,) = inject(configs([
        provide_in_scope("a", || Handler { scope: "a".into() }),
        provide_in_scope("b", || Handler { scope: "b".into() }),
    ]))
    .unwrap();
    assert_eq!(handlers.len(), 2);
    assert_eq!(handlers["a"].scope, "a");
    assert_eq!(handlers["b"].scope, "b");
}

#[test]
fn duplicate_scope_contribution_is_rejected() {
    let err = inject::<(BTreeMap<String, Handler>,), _>(configs([
        provide_in_scope("a", || Handler {
            scope: "first".into(),
        }),
        provide_in_scope("a", || Handler {
            scope: "second".into(),
        }),
    ]))
    .unwrap_err();
    assert!(matches!(err, InjectError::DuplicateDefinition { .. }));
}

#[test]
fn bare_group_element_requests_are_rejected() {
    let err = inject::<(Command,), _>(configs([provide(|| Command { name: "x".into() })]))
        .unwrap_err();
    let InjectError::InvalidShape { reason, .. } = &err else {
        panic!("unexpected error: {err}");
    };
    assert!(reason.contains("Vec"));
}

#[test]
fn empty_group_resolves_to_an_empty_collection() {
    let (commands,): (Vec<Command>,) = inject(configs([])).unwrap();
    assert!(commands.is_empty());
}

#[test]
fn optional_outputs_allow_absence() {
    let (x, missing): (i32, Option<String>) = inject(configs([provide(|| 3i32)])).unwrap();
    assert_eq!(x, 3);
    assert!(missing.is_none());
}

#[test]
fn provider_errors_carry_their_location() {
    fn failing_provider() -> Result<i32, StdError> {
        Err("boom".into())
    }
    let err = inject::<(i32,), _>(configs([provide(failing_provider)])).unwrap_err();
    let InjectError::ProviderError { location, source } = &err else {
        panic!("unexpected error: {err}");
    };
    assert!(location.full_name().contains("failing_provider"));
    assert_eq!(source.to_string(), "boom");
}

#[test]
fn declared_errors_abort_the_build() {
    let err =
        inject::<(), _>(configs([provide(|| 1i32), solder::error("nope")])).unwrap_err();
    let InjectError::Failed(inner) = &err else {
        panic!("unexpected error: {err}");
    };
    assert_eq!(inner.to_string(), "nope");
}

#[test]
fn per_scope_types_cannot_resolve_globally() {
    let err = inject::<(StoreKey,), _>(configs([provide(provide_store_key)])).unwrap_err();
    assert!(matches!(err, InjectError::ScopeRequired { .. }));
}

#[test]
fn own_scope_inputs_require_a_named_scope() {
    fn needs_own_scope(own: OwnScopeKey) -> String {
        own.name().into()
    }
    let err = inject::<(), _>(configs([provide(needs_own_scope)])).unwrap_err();
    assert!(matches!(err, InjectError::ScopeRequired { .. }));
}

#[test]
fn empty_scope_names_are_rejected() {
    let err = inject::<(), _>(configs([provide_in_scope("", || 1i32)])).unwrap_err();
    let InjectError::InvalidShape { reason, .. } = &err else {
        panic!("unexpected error: {err}");
    };
    assert!(reason.contains("non-empty scope name"));
}

mod internal {
    use solder::Injectable;

    #[derive(Clone, Injectable)]
    pub struct Hidden;
}

#[allow(non_camel_case_types)]
#[derive(Clone, Injectable)]
struct lower_case;

#[test]
fn internal_types_are_rejected() {
    let err = inject::<(), _>(configs([provide(|| internal::Hidden)])).unwrap_err();
    assert!(matches!(err, InjectError::RestrictedNamespace { .. }));
}

#[test]
fn unexported_types_are_rejected() {
    let err = inject::<(), _>(configs([provide(|| lower_case)])).unwrap_err();
    assert!(matches!(err, InjectError::TypeNotExported { .. }));
}
