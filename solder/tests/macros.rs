use std::collections::BTreeMap;
use std::sync::Arc;

use solder::{Injectable, TypeKind, configs, inject, interface, provide, provide_in_scope};

#[interface]
trait Greeter {
    fn greet(&self) -> String;
}

#[derive(Clone, Injectable)]
#[injectable(implements(Greeter))]
struct English;

impl Greeter for English {
    fn greet(&self) -> String {
        "hello".into()
    }
}

#[derive(Clone, Injectable)]
#[injectable(many_per_container)]
struct Route(&'static str);

#[derive(Clone, Injectable)]
#[injectable(one_per_scope)]
struct Worker {
    name: String,
}

#[derive(Clone, Injectable)]
struct Plain;

#[test]
fn derive_records_the_declared_kind() {
    assert_eq!(Plain::type_info().kind(), TypeKind::Single);
    assert_eq!(English::type_info().kind(), TypeKind::Single);
    assert_eq!(Route::type_info().kind(), TypeKind::ManyPerContainer);
    assert_eq!(Worker::type_info().kind(), TypeKind::OnePerScope);
    assert_eq!(
        <Arc<dyn Greeter>>::type_info().kind(),
        TypeKind::Interface
    );
}

#[test]
fn declared_interfaces_resolve_through_the_container() {
    let (greeter,): (Arc<dyn Greeter>,) = inject(configs([provide(|| English)])).unwrap();
    assert_eq!(greeter.greet(), "hello");
}

#[test]
fn marked_types_aggregate_through_their_forms() {
    let (routes, workers): (Vec<Route>, BTreeMap<String, Worker>) = inject(configs([
        provide(|| Route("/health")),
        provide(|| vec![Route("/login"), Route("/logout")]),
        provide_in_scope("jobs", || Worker {
            name: "jobs".into(),
        }),
    ]))
    .unwrap();
    let paths: Vec<&str> = routes.iter().map(|r| r.0).collect();
    assert_eq!(paths, ["/health", "/login", "/logout"]);
    assert_eq!(workers["jobs"].name, "jobs");
}
