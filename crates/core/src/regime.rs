use std::borrow::Cow;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{
    Alias, DynamicsError, Expression, TimeDerivative, Transition, Trigger,
    traits::{Members, RegimeLike},
};

/// One discrete mode of a dynamics definition.
///
/// A regime owns the time derivatives that hold while it is active, aliases
/// local to it, and the transitions out of it. State variables without a
/// time derivative stay constant in the regime.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Regime {
    name: String,
    time_derivatives: Vec<TimeDerivative>,
    aliases: Vec<Alias>,
    transitions: Vec<Transition>,
}

impl Regime {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            time_derivatives: Vec::new(),
            aliases: Vec::new(),
            transitions: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_time_derivative(mut self, time_derivative: TimeDerivative) -> Self {
        self.time_derivatives.push(time_derivative);
        self
    }

    #[must_use]
    pub fn with_alias(mut self, alias: Alias) -> Self {
        self.aliases.push(alias);
        self
    }

    #[must_use]
    pub fn with_transition(mut self, transition: Transition) -> Self {
        self.transitions.push(transition);
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn derivatives(&self) -> &[TimeDerivative] {
        &self.time_derivatives
    }

    #[must_use]
    pub fn local_aliases(&self) -> &[Alias] {
        &self.aliases
    }

    /// Returns every transition, event- and condition-triggered.
    #[must_use]
    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }

    /// Returns the event-triggered transitions.
    pub fn on_events(&self) -> impl Iterator<Item = &Transition> {
        self.transitions
            .iter()
            .filter(|t| matches!(t.trigger(), Trigger::Event { .. }))
    }

    /// Returns the condition-triggered transitions.
    pub fn on_conditions(&self) -> impl Iterator<Item = &Transition> {
        self.transitions
            .iter()
            .filter(|t| matches!(t.trigger(), Trigger::Condition { .. }))
    }

    /// Returns the transition triggered by events on `port`.
    ///
    /// # Errors
    ///
    /// Returns [`DynamicsError::MissingElement`] if no transition listens on
    /// `port`.
    pub fn on_event(&self, port: &str) -> Result<&Transition, DynamicsError> {
        self.on_events()
            .find(|t| t.event_port() == Some(port))
            .ok_or_else(|| DynamicsError::missing("on-event transition", port, &self.name))
    }

    /// Returns the transition triggered by `condition`.
    ///
    /// # Errors
    ///
    /// Returns [`DynamicsError::MissingElement`] if no transition has a
    /// structurally equal trigger.
    pub fn on_condition(&self, condition: &Expression) -> Result<&Transition, DynamicsError> {
        self.on_conditions()
            .find(|t| t.condition() == Some(condition))
            .ok_or_else(|| {
                DynamicsError::missing("on-condition transition", condition.to_string(), &self.name)
            })
    }

    /// Rebuilds the regime with every member passed through the given maps.
    ///
    /// Used to move a regime into another namespace. The regime keeps its
    /// name; transitions are rewritten by `transition`.
    #[must_use]
    pub fn map_members(
        &self,
        variable: impl Fn(&str) -> String,
        expression: impl Fn(&Expression) -> Expression,
        transition: impl Fn(&Transition) -> Transition,
    ) -> Self {
        Self {
            name: self.name.clone(),
            time_derivatives: self
                .time_derivatives
                .iter()
                .map(|td| TimeDerivative::new(variable(td.variable()), expression(td.rhs())))
                .collect(),
            aliases: self
                .aliases
                .iter()
                .map(|a| Alias::new(variable(a.name()), expression(a.rhs())))
                .collect(),
            transitions: self.transitions.iter().map(transition).collect(),
        }
    }
}

impl RegimeLike for Regime {
    fn name(&self) -> Cow<'_, str> {
        Cow::Borrowed(&self.name)
    }

    fn time_derivatives(&self) -> Members<'_, TimeDerivative> {
        Box::new(self.time_derivatives.iter().cloned())
    }

    fn aliases(&self) -> Members<'_, Alias> {
        Box::new(self.aliases.iter().cloned())
    }

    fn time_derivative(&self, variable: &str) -> Result<TimeDerivative, DynamicsError> {
        self.time_derivatives
            .iter()
            .find(|td| td.variable() == variable)
            .cloned()
            .ok_or_else(|| DynamicsError::missing("time derivative", variable, &self.name))
    }

    fn alias(&self, name: &str) -> Result<Alias, DynamicsError> {
        self.aliases
            .iter()
            .find(|a| a.name() == name)
            .cloned()
            .ok_or_else(|| DynamicsError::missing("alias", name, &self.name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expr(text: &str) -> Expression {
        Expression::parse(text).expect("valid expression")
    }

    #[test]
    fn transitions_split_by_trigger() {
        let regime = Regime::new("active")
            .with_time_derivative(TimeDerivative::new("v", expr("-v / tau")))
            .with_transition(Transition::on_event("spike_in"))
            .with_transition(Transition::on_condition(expr("v > theta")))
            .with_transition(Transition::on_condition(expr("t > t_ref")));

        assert_eq!(regime.on_events().count(), 1);
        assert_eq!(regime.on_conditions().count(), 2);
        assert!(regime.on_event("spike_in").is_ok());
        assert!(regime.on_condition(&expr("v>theta")).is_ok());
        assert!(matches!(
            regime.on_event("reset"),
            Err(DynamicsError::MissingElement { .. })
        ));
        assert_eq!(
            regime.time_derivative("v").expect("defined").rhs(),
            &expr("-v / tau")
        );
    }
}
