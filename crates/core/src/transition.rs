use std::{borrow::Cow, fmt};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{Expression, StateAssignment, traits::TransitionLike};

/// What causes a [`Transition`] to fire.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Trigger {
    /// An event arriving on the named event receive port.
    Event { port: String },
    /// A boolean condition becoming true.
    Condition { condition: Expression },
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Event { port } => write!(f, "on event `{port}`"),
            Self::Condition { condition } => write!(f, "on condition `{condition}`"),
        }
    }
}

/// A discrete jump out of a regime.
///
/// When its trigger fires, a transition applies its state assignments, emits
/// its output events (named by event send port) and moves to its target
/// regime. A transition without a target stays in the current regime.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Transition {
    trigger: Trigger,
    state_assignments: Vec<StateAssignment>,
    output_events: Vec<String>,
    target_regime: Option<String>,
}

impl Transition {
    /// Creates a transition triggered by events on `port`.
    #[must_use]
    pub fn on_event(port: impl Into<String>) -> Self {
        Self::new(Trigger::Event { port: port.into() })
    }

    /// Creates a transition triggered by `condition` becoming true.
    #[must_use]
    pub fn on_condition(condition: Expression) -> Self {
        Self::new(Trigger::Condition { condition })
    }

    #[must_use]
    pub fn new(trigger: Trigger) -> Self {
        Self {
            trigger,
            state_assignments: Vec::new(),
            output_events: Vec::new(),
            target_regime: None,
        }
    }

    #[must_use]
    pub fn with_assignment(mut self, assignment: StateAssignment) -> Self {
        self.state_assignments.push(assignment);
        self
    }

    #[must_use]
    pub fn with_output_event(mut self, port: impl Into<String>) -> Self {
        self.output_events.push(port.into());
        self
    }

    #[must_use]
    pub fn with_target(mut self, regime: impl Into<String>) -> Self {
        self.target_regime = Some(regime.into());
        self
    }

    #[must_use]
    pub fn trigger(&self) -> &Trigger {
        &self.trigger
    }

    /// Returns the receive port if this is an event-triggered transition.
    #[must_use]
    pub fn event_port(&self) -> Option<&str> {
        match &self.trigger {
            Trigger::Event { port } => Some(port),
            Trigger::Condition { .. } => None,
        }
    }

    /// Returns the condition if this is a condition-triggered transition.
    #[must_use]
    pub fn condition(&self) -> Option<&Expression> {
        match &self.trigger {
            Trigger::Condition { condition } => Some(condition),
            Trigger::Event { .. } => None,
        }
    }

    /// Returns the state assignments in declaration order.
    #[must_use]
    pub fn assignments(&self) -> &[StateAssignment] {
        &self.state_assignments
    }

    /// Returns the names of the emitted event send ports.
    #[must_use]
    pub fn emitted(&self) -> &[String] {
        &self.output_events
    }

    #[must_use]
    pub fn target(&self) -> Option<&str> {
        self.target_regime.as_deref()
    }

    /// Rebuilds the transition with every name passed through the given maps.
    ///
    /// `trigger` rewrites the trigger, `expression` rewrites every expression,
    /// `variable` rewrites assigned variables and `output` rewrites emitted
    /// port names. The target regime is kept.
    #[must_use]
    pub fn map_names(
        &self,
        trigger: impl FnOnce(&Trigger) -> Trigger,
        expression: impl Fn(&Expression) -> Expression,
        variable: impl Fn(&str) -> String,
        output: impl Fn(&str) -> String,
    ) -> Self {
        Self {
            trigger: trigger(&self.trigger),
            state_assignments: self
                .state_assignments
                .iter()
                .map(|sa| StateAssignment::new(variable(sa.variable()), expression(sa.rhs())))
                .collect(),
            output_events: self.output_events.iter().map(|oe| output(oe)).collect(),
            target_regime: self.target_regime.clone(),
        }
    }
}

impl TransitionLike for Transition {
    fn state_assignments(&self) -> Box<dyn Iterator<Item = StateAssignment> + '_> {
        Box::new(self.state_assignments.iter().cloned())
    }

    fn output_events(&self) -> Box<dyn Iterator<Item = String> + '_> {
        Box::new(self.output_events.iter().cloned())
    }

    fn target_regime(&self) -> Option<Cow<'_, str>> {
        self.target_regime.as_deref().map(Cow::Borrowed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DynamicsError;

    #[test]
    fn point_lookups() {
        let transition = Transition::on_event("spike_in")
            .with_assignment(StateAssignment::new(
                "v",
                Expression::parse("v + w").expect("valid expression"),
            ))
            .with_output_event("spike_out");

        assert_eq!(transition.event_port(), Some("spike_in"));
        assert!(transition.state_assignment("v").is_ok());
        assert!(matches!(
            transition.state_assignment("w"),
            Err(DynamicsError::MissingElement { .. })
        ));
        assert_eq!(
            transition.output_event("spike_out").expect("emitted"),
            "spike_out"
        );
        assert!(transition.target_regime().is_none());
    }
}
