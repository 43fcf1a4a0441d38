use thiserror::Error;

use crate::location::Location;

/// Boxed error returned by providers and invokers.
pub type StdError = Box<dyn std::error::Error + Send + Sync>;

/// Errors raised while configuring or resolving a container.
///
/// None of these are recoverable for the current build: they are returned to
/// the caller and the container is discarded.
#[derive(Debug, Error)]
pub enum InjectError {
    /// A provider's resolution chain re-entered a location already active on
    /// the call stack. The chain lists every location from the first
    /// occurrence back to the re-entry.
    #[error("cyclic dependency detected: {}", format_chain(.chain))]
    CyclicDependency { chain: Vec<Location> },

    /// A direct or scoped-map binding key was registered twice.
    #[error(
        "duplicate provision of type {type_name}:\n  new definition: {new_location}\n  existing definition: {existing}"
    )]
    DuplicateDefinition {
        type_name: &'static str,
        new_location: Location,
        existing: String,
    },

    /// Automatic interface resolution found two or more candidate
    /// implementations; an explicit binding is required.
    #[error(
        "multiple implementations found for interface {interface}:{}",
        format_candidates(.candidates)
    )]
    AmbiguousBinding {
        interface: &'static str,
        candidates: Vec<&'static str>,
    },

    /// An explicit binding names an implementation type with no registered
    /// provider.
    #[error(
        "no implementation found for explicit binding{}:\n  interface: {interface}\n  expected implementation: {implementation}",
        format_scope(.scope)
    )]
    MissingExplicitBinding {
        interface: &'static str,
        implementation: &'static str,
        scope: Option<String>,
    },

    /// A registration violates the container's shape rules.
    #[error("invalid registration at {location}: {reason}")]
    InvalidShape { location: Location, reason: String },

    /// A registered type is not exported from its defining module.
    #[error("type {type_name} must be exported")]
    TypeNotExported { type_name: &'static str },

    /// A registered type comes from a restricted (internal) namespace.
    #[error("type {type_name} must not come from an internal module")]
    RestrictedNamespace { type_name: &'static str },

    /// A required input type has no resolver in scope. Only surfaces when the
    /// input is actually needed.
    #[error("can't resolve type {type_name} for {caller}")]
    MissingDependency {
        type_name: &'static str,
        caller: Location,
    },

    /// A scope-dependent operation ran without a named scope.
    #[error("scope required: {reason}")]
    ScopeRequired { reason: String },

    /// A provider or invoker returned an error; carries its location for
    /// context.
    #[error("error calling {location}: {source}")]
    ProviderError {
        location: Location,
        source: StdError,
    },

    /// A fixed error registered through the `error` configuration action.
    #[error("{0}")]
    Failed(StdError),
}

fn format_chain(chain: &[Location]) -> String {
    chain
        .iter()
        .map(Location::full_name)
        .collect::<Vec<_>>()
        .join(" -> ")
}

fn format_candidates(candidates: &[&'static str]) -> String {
    candidates
        .iter()
        .map(|name| format!("\n  {name}"))
        .collect()
}

fn format_scope(scope: &Option<String>) -> String {
    match scope {
        Some(name) => format!(" in scope {name:?}"),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ambiguous_binding_lists_candidates() {
        let err = InjectError::AmbiguousBinding {
            interface: "app::Duck",
            candidates: vec!["app::Canvasback", "app::Mallard"],
        };
        let text = err.to_string();
        assert!(text.contains("app::Duck"));
        assert!(text.contains("\n  app::Canvasback"));
        assert!(text.contains("\n  app::Mallard"));
    }

    #[test]
    fn missing_binding_mentions_scope() {
        let err = InjectError::MissingExplicitBinding {
            interface: "app::Duck",
            implementation: "app::Marbled",
            scope: Some("pond".into()),
        };
        assert!(err.to_string().contains("in scope \"pond\""));
    }
}
