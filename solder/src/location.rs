use std::fmt;
use std::hash::{Hash, Hasher};

const CLOSURE_MARKER: &str = "{{closure}}";

/// Identity of a registration site.
///
/// A `Location` names the function (or closure) that was registered with the
/// container, together with the source position of the registration call. It
/// is used for diagnostics, duplicate reporting, and cycle detection.
///
/// Two locations are equal when they refer to the same symbol in the same
/// module. Closures all share the same symbol name within their enclosing
/// function, so for them the source line participates in equality as well.
#[derive(Clone, Debug)]
pub struct Location {
    scope: String,
    name: String,
    file: &'static str,
    line: u32,
}

impl Location {
    /// Captures the location of a registered function value.
    ///
    /// The symbol is recovered from the function's type name: function items
    /// carry their full module path, closures carry the path of the enclosing
    /// function plus a closure marker.
    pub(crate) fn from_fn<F>(site: &'static std::panic::Location<'static>) -> Self {
        let (scope, name) = split_symbol(std::any::type_name::<F>());
        Self {
            scope: scope.into(),
            name: name.into(),
            file: site.file(),
            line: site.line(),
        }
    }

    /// Location for a supplied value, named after the value's type.
    pub(crate) fn from_value_type(
        type_name: &'static str,
        site: &'static std::panic::Location<'static>,
    ) -> Self {
        let (scope, name) = split_symbol(type_name);
        Self {
            scope: scope.into(),
            name: name.into(),
            file: site.file(),
            line: site.line(),
        }
    }

    /// Location for a container entry point such as `inject`.
    pub(crate) fn entry(name: &str, site: &'static std::panic::Location<'static>) -> Self {
        Self {
            scope: env!("CARGO_PKG_NAME").into(),
            name: name.into(),
            file: site.file(),
            line: site.line(),
        }
    }

    /// Placeholder for resolutions with no registration site, such as
    /// collection resolvers created on demand.
    pub(crate) fn unknown() -> Self {
        Self {
            scope: String::new(),
            name: "unknown".into(),
            file: "unknown",
            line: 0,
        }
    }

    /// Fully qualified symbol name, `scope::name`.
    pub fn full_name(&self) -> String {
        if self.scope.is_empty() {
            self.name.clone()
        } else {
            format!("{}::{}", self.scope, self.name)
        }
    }
}

impl PartialEq for Location {
    fn eq(&self, other: &Self) -> bool {
        if self.scope != other.scope || self.name != other.name {
            return false;
        }
        // Closures are indistinguishable by symbol alone.
        if self.name == CLOSURE_MARKER {
            return self.file == other.file && self.line == other.line;
        }
        true
    }
}

impl Eq for Location {}

impl Hash for Location {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.scope.hash(state);
        self.name.hash(state);
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if f.alternate() {
            write!(f, "{}\n\t{}:{}", self.full_name(), self.file, self.line)
        } else {
            write!(f, "{} ({}:{})", self.full_name(), self.file, self.line)
        }
    }
}

/// Splits a fully qualified symbol into its module path and final segment.
///
/// Trailing closure markers collapse into a single marker segment so that the
/// enclosing function stays visible in diagnostics.
fn split_symbol(symbol: &str) -> (&str, &str) {
    let mut symbol = symbol;
    let nested = format!("::{CLOSURE_MARKER}::{CLOSURE_MARKER}");
    while symbol.ends_with(&nested) {
        symbol = &symbol[..symbol.len() - CLOSURE_MARKER.len() - 2];
    }
    match symbol.rfind("::") {
        Some(idx) => (&symbol[..idx], &symbol[idx + 2..]),
        None => ("", symbol),
    }
}
