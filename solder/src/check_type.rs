use crate::errors::InjectError;
use crate::type_info::TypeKey;

/// Verifies that a registered type is addressable by other registrants.
///
/// The rendered type name is decomposed into its qualified paths (generic
/// arguments included). A path whose final segment starts with a lowercase
/// letter names an unexported type, and a path routed through an `internal`
/// module is from a restricted namespace; both are rejected, since such a
/// type could never be referenced symmetrically by another registrant.
/// Unqualified names (primitives, type parameters already resolved away)
/// are always valid.
pub(crate) fn check_exported(key: &TypeKey) -> Result<(), InjectError> {
    for path in qualified_paths(key.name) {
        check_path(&path, key.name)?;
    }
    Ok(())
}

fn check_path(segments: &[&str], full_name: &'static str) -> Result<(), InjectError> {
    if segments.len() < 2 {
        return Ok(());
    }
    for segment in &segments[..segments.len() - 1] {
        if *segment == "internal" {
            return Err(InjectError::RestrictedNamespace {
                type_name: full_name,
            });
        }
    }
    let last = segments[segments.len() - 1];
    if last.starts_with(|c: char| c.is_lowercase() || c == '_') {
        return Err(InjectError::TypeNotExported {
            type_name: full_name,
        });
    }
    Ok(())
}

/// Extracts every `a::b::C`-shaped path from a rendered type name.
///
/// Identifiers joined by `::` belong to one path; any other separator (`<`,
/// `>`, `,`, spaces, brackets, `&`) ends the current path. Non-identifier
/// runs such as closure markers terminate paths as well.
fn qualified_paths(name: &str) -> Vec<Vec<&str>> {
    let mut paths = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut rest = name;
    while !rest.is_empty() {
        let ident_len = rest
            .find(|c: char| !c.is_alphanumeric() && c != '_')
            .unwrap_or(rest.len());
        if ident_len > 0 {
            current.push(&rest[..ident_len]);
            rest = &rest[ident_len..];
        }
        if rest.starts_with("::") {
            rest = &rest[2..];
            // A separator other than `::` follows an empty segment; flush.
            if !rest.starts_with(|c: char| c.is_alphanumeric() || c == '_') {
                paths.push(std::mem::take(&mut current));
            }
        } else if !rest.is_empty() {
            let sep_len = rest
                .find(|c: char| c.is_alphanumeric() || c == '_' || c == ':')
                .unwrap_or(rest.len());
            rest = &rest[sep_len.max(1)..];
            paths.push(std::mem::take(&mut current));
        }
    }
    paths.push(current);
    paths.retain(|p| !p.is_empty());
    paths
}
