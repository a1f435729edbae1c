//! Flattening of instance-local names into the composite namespace.
//!
//! A member `v` of the instance `cell` becomes `v__cell` in the composite.
//! Instance names are identifiers and never contain the separator, so the
//! last separator of a flattened name always splits off the instance, even
//! when the local name was itself flattened by a nested composite.

use braid_core::{Expression, identifier::NAMESPACE_SEPARATOR, identifier::is_reserved};

use crate::Endpoint;

/// Marker that starts every synthesized delay-trigger name.
///
/// Identifiers must start with a letter, so no user name can collide with it.
pub const DELAY_TRIGGER_PREFIX: &str = "_delay";

pub(crate) const REGIME_SEPARATOR: &str = "___";

/// Moves `local_name` into the namespace of `instance`.
#[must_use]
pub fn append_namespace(local_name: &str, instance: &str) -> String {
    format!("{local_name}{NAMESPACE_SEPARATOR}{instance}")
}

/// Splits a flattened name into `(local_name, instance)`.
///
/// Returns `None` if `flat_name` was not produced by [`append_namespace`].
#[must_use]
pub fn split_namespace(flat_name: &str) -> Option<(&str, &str)> {
    flat_name
        .rsplit_once(NAMESPACE_SEPARATOR)
        .filter(|(local, instance)| !local.is_empty() && !instance.is_empty())
}

/// Renames every non-reserved symbol of `expression` into `instance`.
#[must_use]
pub fn namespace_expression(expression: &Expression, instance: &str) -> Expression {
    expression.map_symbols(|symbol| (!is_reserved(symbol)).then(|| append_namespace(symbol, instance)))
}

/// Builds the canonical name of a composite regime.
///
/// `selection` pairs each instance with the name of its active regime. Pairs
/// are sorted by instance first, so the name does not depend on the order in
/// which they are given.
#[must_use]
pub fn make_regime_name<'a>(selection: impl IntoIterator<Item = (&'a str, &'a str)>) -> String {
    let mut selection: Vec<_> = selection.into_iter().collect();
    selection.sort_unstable();
    selection
        .into_iter()
        .map(|(instance, regime)| append_namespace(regime, instance))
        .collect::<Vec<_>>()
        .join(REGIME_SEPARATOR)
}

/// Builds the name of the state variable that schedules a delayed event.
///
/// Distinct `(sender, receiver)` endpoint pairs always give distinct names.
#[must_use]
pub fn make_delay_trigger_name(sender: &Endpoint, receiver: &Endpoint) -> String {
    [
        DELAY_TRIGGER_PREFIX,
        sender.instance(),
        sender.port(),
        receiver.instance(),
        receiver.port(),
    ]
    .join(NAMESPACE_SEPARATOR)
}
