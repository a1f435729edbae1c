use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::namespace::append_namespace;

/// A port of one sub-component instance.
///
/// Used as the key of every connection and exposure map in a composite.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Endpoint {
    instance: String,
    port: String,
}

impl Endpoint {
    #[must_use]
    pub fn new(instance: impl Into<String>, port: impl Into<String>) -> Self {
        Self {
            instance: instance.into(),
            port: port.into(),
        }
    }

    #[must_use]
    pub fn instance(&self) -> &str {
        &self.instance
    }

    #[must_use]
    pub fn port(&self) -> &str {
        &self.port
    }

    /// Returns the port name moved into the composite namespace.
    #[must_use]
    pub fn flat_name(&self) -> String {
        append_namespace(&self.port, &self.instance)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.instance, self.port)
    }
}

impl<T: Into<String>> From<(T, T)> for Endpoint {
    fn from((instance, port): (T, T)) -> Self {
        Self::new(instance, port)
    }
}
