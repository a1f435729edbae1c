use crate::DynamicsError;

/// Separator joining a local name to the name of the instance that owns it.
///
/// User-chosen identifiers may never contain it, which keeps flattened names
/// unambiguous.
pub const NAMESPACE_SEPARATOR: &str = "__";

/// Symbols with a fixed meaning in every expression.
///
/// `t` is the simulation time. Reserved symbols are never renamed when an
/// expression is moved into a namespace and cannot be used as member names.
pub const RESERVED_SYMBOLS: [&str; 4] = ["t", "pi", "true", "false"];

/// Returns `true` if `symbol` is one of the [`RESERVED_SYMBOLS`].
#[must_use]
pub fn is_reserved(symbol: &str) -> bool {
    RESERVED_SYMBOLS.contains(&symbol)
}

/// Checks that `name` is a legal identifier.
///
/// A legal identifier:
///
/// - Consists of ASCII alphanumerics and underscores.
/// - Starts with an ASCII letter and ends with an ASCII alphanumeric.
/// - Does not contain [`NAMESPACE_SEPARATOR`].
/// - Is not a reserved symbol.
///
/// # Errors
///
/// Returns [`DynamicsError::InvalidIdentifier`] describing the first rule
/// that `name` breaks.
pub fn validate_identifier(name: &str) -> Result<(), DynamicsError> {
    let reason = if name.is_empty() {
        Some("identifiers cannot be empty")
    } else if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        Some("only ASCII letters, digits and underscores are allowed")
    } else if !name.starts_with(|c: char| c.is_ascii_alphabetic()) {
        Some("identifiers must start with a letter")
    } else if !name.ends_with(|c: char| c.is_ascii_alphanumeric()) {
        Some("identifiers must end with a letter or digit")
    } else if name.contains(NAMESPACE_SEPARATOR) {
        Some("the namespace separator `__` is reserved")
    } else if is_reserved(name) {
        Some("the name is a reserved symbol")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(DynamicsError::InvalidIdentifier {
            name: name.to_string(),
            reason,
        }),
        None => Ok(()),
    }
}
