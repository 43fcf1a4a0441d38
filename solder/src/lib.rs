//! # solder
//!
//! A type-directed dependency injection container: providers declare typed
//! inputs and outputs, and the container computes the dependency graph,
//! invokes each provider at most once, and delivers fully constructed values.
//!
//! ## Core Concepts
//!
//! - **Provider**: a function registered with [`provide`]; its arguments are
//!   resolved recursively and its return values become resolvable types
//! - **Config**: a composable, declarative list of registration actions,
//!   applied to a fresh container by [`inject`]
//! - **Scope**: a named partition of registrations; scoped providers and
//!   invokers see their own scope first, then the global scope
//! - **Interface**: an `Arc<dyn Trait>` request, bound to an implementation
//!   explicitly with [`bind_interface`] or implicitly when exactly one
//!   registered implementation declares the trait
//! - **Invoker**: a function registered with [`invoke`], run after
//!   resolution with every input optional
//!
//! ## Basic Usage
//!
//! ```rust
//! use solder::{configs, inject, provide, supply, Injectable};
//!
//! #[derive(Clone, Injectable)]
//! struct Database {
//!     url: String,
//! }
//!
//! #[derive(Clone, Injectable)]
//! struct Api {
//!     database: Database,
//! }
//!
//! fn main() -> Result<(), solder::InjectError> {
//!     let (api,): (Api,) = inject(configs([
//!         supply("postgres://localhost:5432/app".to_string()),
//!         provide(|url: String| Database { url }),
//!         provide(|database: Database| Api { database }),
//!     ]))?;
//!     assert_eq!(api.database.url, "postgres://localhost:5432/app");
//!     Ok(())
//! }
//! ```
//!
//! ## Interfaces
//!
//! Implementations declare the traits they satisfy; requests for the trait
//! object resolve through an explicit binding, or automatically when the
//! implementation is unambiguous:
//!
//! ```rust
//! use std::sync::Arc;
//! use solder::{configs, inject, interface, provide, Injectable};
//!
//! #[interface]
//! trait Greeter {
//!     fn greet(&self) -> String;
//! }
//!
//! #[derive(Clone, Injectable)]
//! #[injectable(implements(Greeter))]
//! struct English;
//!
//! impl Greeter for English {
//!     fn greet(&self) -> String {
//!         "hello".into()
//!     }
//! }
//!
//! fn main() -> Result<(), solder::InjectError> {
//!     let (greeter,): (Arc<dyn Greeter>,) =
//!         inject(configs([provide(|| English)]))?;
//!     assert_eq!(greeter.greet(), "hello");
//!     Ok(())
//! }
//! ```
//!
//! ## Scopes and Aggregation
//!
//! Types marked `many_per_container` collect contributions from every
//! registration into an ordered `Vec`; types marked `one_per_scope` collect
//! one contribution per named scope into a `BTreeMap` keyed by scope name:
//!
//! ```rust
//! use std::collections::BTreeMap;
//! use solder::{configs, inject, provide_in_scope, Injectable};
//!
//! #[derive(Clone, Injectable)]
//! #[injectable(one_per_scope)]
//! struct Handler {
//!     name: String,
//! }
//!
//! fn main() -> Result<(), solder::InjectError> {
//!     let (handlers,): (BTreeMap<String, Handler>,) = inject(configs([
//!         provide_in_scope("auth", || Handler { name: "auth".into() }),
//!         provide_in_scope("billing", || Handler { name: "billing".into() }),
//!     ]))?;
//!     assert_eq!(handlers.len(), 2);
//!     assert_eq!(handlers["auth"].name, "auth");
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `macros` (default): enables `#[derive(Injectable)]` and `#[interface]`

mod check_type;
mod config;
mod container;
mod debug;
mod errors;
mod graphviz;
mod group;
mod inject;
mod location;
mod provider;
mod resolver;
mod scope;
mod scoped_map;
mod type_info;

pub use config::{
    Config, bind_interface, bind_interface_in_scope, configs, error, invoke, invoke_in_scope,
    provide, provide_in_scope, supply,
};
pub use debug::{
    DebugOption, auto_debug, debug, debug_cleanup, debug_options, file_visualizer, log_visualizer,
    logger, on_error, on_success, stderr_logger, stdout_logger, tracing_logger, visualizer,
};
pub use errors::{InjectError, StdError};
pub use inject::{BuildContext, InjectOutputs, inject, inject_debug};
pub use location::Location;
pub use provider::{
    ArgSpec, ArgValue, FnDescriptor, InvokerArg, InvokerFn, InvokerOutput, OptionArg, OwnScopeArg,
    ProvidedValue, ProviderArg, ProviderFn, ProviderOutput, ResultOutput, ScopeArg, TupleOutput,
    UnitOutput, ValueArg, ValueOutput,
};
pub use scope::{OwnScopeKey, ScopeKey};
pub use type_info::{Injectable, TypeInfo, TypeKey, TypeKind};

#[cfg(feature = "macros")]
pub use solder_macros::*;
