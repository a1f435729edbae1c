//! Capability traits shared by primitive and composite definitions.
//!
//! Code that only reads a definition should accept these traits rather than
//! the concrete types, so that composites can stand in for primitives.

use std::{borrow::Cow, fmt};

use crate::{
    Alias, Constant, DynamicsError, Parameter, Port, PortKind, Regime, StateAssignment,
    StateVariable, TimeDerivative,
};

/// A boxed iterator over members produced on demand.
pub type Members<'a, T> = Box<dyn Iterator<Item = T> + 'a>;

/// The read surface of a dynamics definition.
///
/// Implemented by [`crate::Dynamics`] and by composite definitions, which
/// makes composites nestable: anything accepting a `DynamicsLike` accepts a
/// composite as readily as a primitive.
///
/// Members are returned by value because composites synthesize them on every
/// call.
pub trait DynamicsLike: fmt::Debug + Send + Sync {
    fn name(&self) -> &str;

    fn parameters(&self) -> Members<'_, Parameter>;

    fn aliases(&self) -> Members<'_, Alias>;

    fn constants(&self) -> Members<'_, Constant>;

    fn state_variables(&self) -> Members<'_, StateVariable>;

    fn ports(&self) -> Members<'_, Port>;

    /// Returns the number of regimes without producing them.
    fn num_regimes(&self) -> usize;

    /// Returns the regimes, produced lazily.
    ///
    /// Composites flatten each regime as it is requested, which can fail, so
    /// every item is a `Result`.
    fn regimes(&self) -> Members<'_, Result<Regime, DynamicsError>>;

    /// # Errors
    ///
    /// Returns [`DynamicsError::MissingElement`] if there is no such parameter.
    fn parameter(&self, name: &str) -> Result<Parameter, DynamicsError>;

    /// # Errors
    ///
    /// Returns [`DynamicsError::MissingElement`] if there is no such alias.
    fn alias(&self, name: &str) -> Result<Alias, DynamicsError>;

    /// # Errors
    ///
    /// Returns [`DynamicsError::MissingElement`] if there is no such constant.
    fn constant(&self, name: &str) -> Result<Constant, DynamicsError>;

    /// # Errors
    ///
    /// Returns [`DynamicsError::MissingElement`] if there is no such state
    /// variable.
    fn state_variable(&self, name: &str) -> Result<StateVariable, DynamicsError>;

    /// # Errors
    ///
    /// Returns [`DynamicsError::MissingElement`] if there is no such port.
    fn port(&self, name: &str) -> Result<Port, DynamicsError>;

    /// Returns the ports of one kind.
    fn ports_of_kind(&self, kind: PortKind) -> Members<'_, Port> {
        Box::new(self.ports().filter(move |port| port.kind() == kind))
    }

    fn num_parameters(&self) -> usize {
        self.parameters().count()
    }

    fn num_aliases(&self) -> usize {
        self.aliases().count()
    }

    fn num_constants(&self) -> usize {
        self.constants().count()
    }

    fn num_state_variables(&self) -> usize {
        self.state_variables().count()
    }
}

/// The continuous part of a regime.
pub trait RegimeLike {
    fn name(&self) -> Cow<'_, str>;

    fn time_derivatives(&self) -> Members<'_, TimeDerivative>;

    fn aliases(&self) -> Members<'_, Alias>;

    /// # Errors
    ///
    /// Returns [`DynamicsError::MissingElement`] if `variable` has no time
    /// derivative in this regime.
    fn time_derivative(&self, variable: &str) -> Result<TimeDerivative, DynamicsError>;

    /// # Errors
    ///
    /// Returns [`DynamicsError::MissingElement`] if there is no such alias.
    fn alias(&self, name: &str) -> Result<Alias, DynamicsError>;
}

/// The effect of a transition.
pub trait TransitionLike {
    fn state_assignments(&self) -> Members<'_, StateAssignment>;

    /// Returns the names of the event send ports this transition emits on.
    fn output_events(&self) -> Members<'_, String>;

    /// Returns the regime entered after firing, or `None` to stay.
    fn target_regime(&self) -> Option<Cow<'_, str>>;

    /// # Errors
    ///
    /// Returns [`DynamicsError::MissingElement`] if `variable` is not assigned.
    fn state_assignment(&self, variable: &str) -> Result<StateAssignment, DynamicsError> {
        self.state_assignments()
            .find(|sa| sa.variable() == variable)
            .ok_or_else(|| DynamicsError::missing("state assignment", variable, "transition"))
    }

    /// # Errors
    ///
    /// Returns [`DynamicsError::MissingElement`] if no event is emitted on
    /// `name`.
    fn output_event(&self, name: &str) -> Result<String, DynamicsError> {
        self.output_events()
            .find(|port| port == name)
            .ok_or_else(|| DynamicsError::missing("output event", name, "transition"))
    }

    fn num_state_assignments(&self) -> usize {
        self.state_assignments().count()
    }

    fn num_output_events(&self) -> usize {
        self.output_events().count()
    }
}
