use std::{
    fmt,
    hash::{Hash, Hasher},
};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The physical dimension of a quantity.
///
/// A dimension is the vector of exponents over the seven SI base quantities
/// (mass, length, time, current, amount, temperature, luminous intensity).
/// Two dimensions are equal when their exponents are equal; the name is only
/// used for display.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Dimension {
    name: String,
    exponents: [i8; 7],
}

impl Dimension {
    /// Creates a dimension from its name and base-quantity exponents.
    ///
    /// Exponents are ordered as mass, length, time, current, amount,
    /// temperature and luminous intensity.
    #[must_use]
    pub fn new(name: impl Into<String>, exponents: [i8; 7]) -> Self {
        Self {
            name: name.into(),
            exponents,
        }
    }

    #[must_use]
    pub fn dimensionless() -> Self {
        Self::new("dimensionless", [0; 7])
    }

    #[must_use]
    pub fn time() -> Self {
        Self::new("time", [0, 0, 1, 0, 0, 0, 0])
    }

    #[must_use]
    pub fn per_time() -> Self {
        Self::new("per_time", [0, 0, -1, 0, 0, 0, 0])
    }

    #[must_use]
    pub fn voltage() -> Self {
        Self::new("voltage", [1, 2, -3, -1, 0, 0, 0])
    }

    #[must_use]
    pub fn current() -> Self {
        Self::new("current", [0, 0, 0, 1, 0, 0, 0])
    }

    #[must_use]
    pub fn conductance() -> Self {
        Self::new("conductance", [-1, -2, 3, 2, 0, 0, 0])
    }

    #[must_use]
    pub fn capacitance() -> Self {
        Self::new("capacitance", [-1, -2, 4, 2, 0, 0, 0])
    }

    /// Returns the display name of this dimension.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the base-quantity exponents.
    #[must_use]
    pub fn exponents(&self) -> [i8; 7] {
        self.exponents
    }

    /// Returns `true` if every exponent is zero.
    #[must_use]
    pub fn is_dimensionless(&self) -> bool {
        self.exponents == [0; 7]
    }
}

impl PartialEq for Dimension {
    fn eq(&self, other: &Self) -> bool {
        self.exponents == other.exponents
    }
}

impl Eq for Dimension {}

impl Hash for Dimension {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.exponents.hash(state);
    }
}

impl Default for Dimension {
    fn default() -> Self {
        Self::dimensionless()
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}
