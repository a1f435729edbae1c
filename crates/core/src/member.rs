//! Named members of a dynamics definition.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{Dimension, Expression};

/// A value fixed for the lifetime of a component instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Parameter {
    name: String,
    dimension: Dimension,
}

impl Parameter {
    #[must_use]
    pub fn new(name: impl Into<String>, dimension: Dimension) -> Self {
        Self {
            name: name.into(),
            dimension,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn dimension(&self) -> &Dimension {
        &self.dimension
    }
}

/// A literal value shared by every instance of a definition.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Constant {
    name: String,
    value: f64,
    dimension: Dimension,
}

impl Constant {
    #[must_use]
    pub fn new(name: impl Into<String>, value: f64, dimension: Dimension) -> Self {
        Self {
            name: name.into(),
            value,
            dimension,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn value(&self) -> f64 {
        self.value
    }

    #[must_use]
    pub fn dimension(&self) -> &Dimension {
        &self.dimension
    }
}

/// A quantity evolved by time derivatives and changed by state assignments.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StateVariable {
    name: String,
    dimension: Dimension,
}

impl StateVariable {
    #[must_use]
    pub fn new(name: impl Into<String>, dimension: Dimension) -> Self {
        Self {
            name: name.into(),
            dimension,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn dimension(&self) -> &Dimension {
        &self.dimension
    }
}

/// A named expression, `name := rhs`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Alias {
    name: String,
    rhs: Expression,
}

impl Alias {
    #[must_use]
    pub fn new(name: impl Into<String>, rhs: Expression) -> Self {
        Self {
            name: name.into(),
            rhs,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn rhs(&self) -> &Expression {
        &self.rhs
    }
}

/// The rate of change of a state variable, `d(variable)/dt = rhs`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TimeDerivative {
    variable: String,
    rhs: Expression,
}

impl TimeDerivative {
    #[must_use]
    pub fn new(variable: impl Into<String>, rhs: Expression) -> Self {
        Self {
            variable: variable.into(),
            rhs,
        }
    }

    #[must_use]
    pub fn variable(&self) -> &str {
        &self.variable
    }

    #[must_use]
    pub fn rhs(&self) -> &Expression {
        &self.rhs
    }
}

/// A discrete update applied when a transition fires, `variable = rhs`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StateAssignment {
    variable: String,
    rhs: Expression,
}

impl StateAssignment {
    #[must_use]
    pub fn new(variable: impl Into<String>, rhs: Expression) -> Self {
        Self {
            variable: variable.into(),
            rhs,
        }
    }

    #[must_use]
    pub fn variable(&self) -> &str {
        &self.variable
    }

    #[must_use]
    pub fn rhs(&self) -> &Expression {
        &self.rhs
    }
}
