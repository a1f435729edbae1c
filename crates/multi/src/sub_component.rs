use std::sync::Arc;

use braid_core::{
    Alias, Constant, DynamicsLike, Expression, Parameter, Port, Regime, StateVariable,
    Transition, Trigger, identifier::validate_identifier,
};

use crate::{
    Error,
    namespace::{append_namespace, namespace_expression},
};

/// One named instance of a dynamics definition inside a composite.
///
/// Members are seen through the composite namespace: a state variable `v` of
/// the instance `cell` is reported as `v__cell`. Port names, regime names and
/// the port names used by transitions stay local to the definition; they are
/// addressed through an [`crate::Endpoint`] instead.
#[derive(Debug, Clone)]
pub struct SubComponent {
    name: String,
    definition: Arc<dyn DynamicsLike>,
    regimes: Vec<Regime>,
}

impl SubComponent {
    /// Wraps `definition` as the instance `name`.
    ///
    /// The definition's regimes are produced and namespaced once, here.
    ///
    /// # Errors
    ///
    /// Returns an error if `name` is not a valid identifier or if producing
    /// the definition's regimes fails, which can happen when the definition
    /// is itself a composite.
    pub fn new(name: impl Into<String>, definition: Arc<dyn DynamicsLike>) -> Result<Self, Error> {
        let name = name.into();
        validate_identifier(&name)?;

        let regimes = definition
            .regimes()
            .map(|regime| Ok(namespace_regime(&regime?, &name)))
            .collect::<Result<Vec<_>, Error>>()?;

        Ok(Self {
            name,
            definition,
            regimes,
        })
    }

    /// Returns the instance name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn definition(&self) -> &Arc<dyn DynamicsLike> {
        &self.definition
    }

    pub fn parameters(&self) -> impl Iterator<Item = Parameter> + '_ {
        self.definition
            .parameters()
            .map(|p| Parameter::new(self.flatten(p.name()), p.dimension().clone()))
    }

    pub fn aliases(&self) -> impl Iterator<Item = Alias> + '_ {
        self.definition.aliases().map(|a| self.namespace_alias(&a))
    }

    pub fn constants(&self) -> impl Iterator<Item = Constant> + '_ {
        self.definition
            .constants()
            .map(|c| Constant::new(self.flatten(c.name()), c.value(), c.dimension().clone()))
    }

    pub fn state_variables(&self) -> impl Iterator<Item = StateVariable> + '_ {
        self.definition
            .state_variables()
            .map(|sv| StateVariable::new(self.flatten(sv.name()), sv.dimension().clone()))
    }

    /// Returns the ports renamed into the composite namespace.
    pub fn ports(&self) -> impl Iterator<Item = Port> + '_ {
        self.definition
            .ports()
            .map(|port| port.renamed(self.flatten(port.name())))
    }

    /// Returns the namespaced regimes, in the definition's order.
    #[must_use]
    pub fn regimes(&self) -> &[Regime] {
        &self.regimes
    }

    #[must_use]
    pub fn num_regimes(&self) -> usize {
        self.regimes.len()
    }

    /// Returns the namespaced regime with the local name `name`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingElement`] if the definition has no such regime.
    pub fn regime(&self, name: &str) -> Result<&Regime, Error> {
        self.regimes
            .iter()
            .find(|regime| regime.name() == name)
            .ok_or_else(|| Error::missing("regime", name, &self.name))
    }

    /// Looks up a parameter by its local name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingElement`] if the definition has no such member.
    pub fn parameter(&self, local_name: &str) -> Result<Parameter, Error> {
        let p = self.definition.parameter(local_name)?;
        Ok(Parameter::new(self.flatten(p.name()), p.dimension().clone()))
    }

    /// Looks up an alias by its local name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingElement`] if the definition has no such member.
    pub fn alias(&self, local_name: &str) -> Result<Alias, Error> {
        Ok(self.namespace_alias(&self.definition.alias(local_name)?))
    }

    /// Looks up a constant by its local name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingElement`] if the definition has no such member.
    pub fn constant(&self, local_name: &str) -> Result<Constant, Error> {
        let c = self.definition.constant(local_name)?;
        Ok(Constant::new(
            self.flatten(c.name()),
            c.value(),
            c.dimension().clone(),
        ))
    }

    /// Looks up a state variable by its local name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingElement`] if the definition has no such member.
    pub fn state_variable(&self, local_name: &str) -> Result<StateVariable, Error> {
        let sv = self.definition.state_variable(local_name)?;
        Ok(StateVariable::new(
            self.flatten(sv.name()),
            sv.dimension().clone(),
        ))
    }

    /// Looks up a port of the definition, keeping its local name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingElement`] if the definition has no such port.
    pub fn port(&self, local_name: &str) -> Result<Port, Error> {
        Ok(self.definition.port(local_name)?)
    }

    fn flatten(&self, local_name: &str) -> String {
        append_namespace(local_name, &self.name)
    }

    fn namespace_alias(&self, alias: &Alias) -> Alias {
        Alias::new(
            self.flatten(alias.name()),
            namespace_expression(alias.rhs(), &self.name),
        )
    }
}

/// Moves the members of `regime` into the namespace of `instance`.
///
/// Event ports, output events and target regimes keep their local names.
fn namespace_regime(regime: &Regime, instance: &str) -> Regime {
    let variable = |name: &str| append_namespace(name, instance);
    let expression = |expr: &Expression| namespace_expression(expr, instance);

    regime.map_members(variable, expression, |transition: &Transition| {
        transition.map_names(
            |trigger| match trigger {
                Trigger::Event { port } => Trigger::Event { port: port.clone() },
                Trigger::Condition { condition } => Trigger::Condition {
                    condition: namespace_expression(condition, instance),
                },
            },
            expression,
            variable,
            str::to_string,
        )
    })
}

#[cfg(test)]
mod tests {
    use braid_core::{Dimension, Dynamics, RegimeLike, StateAssignment, TimeDerivative};

    use super::*;

    fn expr(text: &str) -> Expression {
        Expression::parse(text).expect("valid expression")
    }

    fn leaky() -> Arc<dyn DynamicsLike> {
        let dynamics = Dynamics::builder("leaky")
            .parameter(Parameter::new("tau", Dimension::time()))
            .parameter(Parameter::new("theta", Dimension::voltage()))
            .state_variable(StateVariable::new("v", Dimension::voltage()))
            .alias(Alias::new("v_half", expr("v / 2")))
            .port(Port::event_send("spike_out"))
            .port(Port::event_receive("reset"))
            .regime(
                Regime::new("active")
                    .with_time_derivative(TimeDerivative::new("v", expr("-v / tau")))
                    .with_transition(
                        Transition::on_condition(expr("v > theta"))
                            .with_assignment(StateAssignment::new("v", expr("0")))
                            .with_output_event("spike_out")
                            .with_target("refractory"),
                    ),
            )
            .regime(
                Regime::new("refractory")
                    .with_transition(Transition::on_event("reset").with_target("active")),
            )
            .build()
            .expect("valid dynamics");
        Arc::new(dynamics)
    }

    #[test]
    fn members_are_namespaced() {
        let sub = SubComponent::new("cell", leaky()).expect("valid sub-component");

        let parameters: Vec<_> = sub.parameters().map(|p| p.name().to_string()).collect();
        assert_eq!(parameters, ["tau__cell", "theta__cell"]);
        assert_eq!(sub.alias("v_half").expect("defined").rhs(), &expr("v__cell / 2"));
        assert_eq!(sub.state_variable("v").expect("defined").name(), "v__cell");
        assert!(sub.ports().any(|p| p.name() == "spike_out__cell"));
        assert_eq!(sub.port("spike_out").expect("defined").name(), "spike_out");
    }

    #[test]
    fn regimes_keep_local_ports_and_targets() {
        let sub = SubComponent::new("cell", leaky()).expect("valid sub-component");

        let active = sub.regime("active").expect("defined");
        assert_eq!(
            active.time_derivative("v__cell").expect("namespaced").rhs(),
            &expr("-v__cell / tau__cell")
        );

        let fire = active.on_conditions().next().expect("one on-condition");
        assert_eq!(fire.condition(), Some(&expr("v__cell > theta__cell")));
        assert_eq!(fire.assignments()[0].variable(), "v__cell");
        assert_eq!(fire.emitted(), ["spike_out"]);
        assert_eq!(fire.target(), Some("refractory"));

        let refractory = sub.regime("refractory").expect("defined");
        assert!(refractory.on_event("reset").is_ok());
    }

    #[test]
    fn rejects_invalid_instance_names() {
        assert!(matches!(
            SubComponent::new("bad__name", leaky()),
            Err(Error::InvalidIdentifier { .. })
        ));
        assert!(matches!(
            sub_missing_parameter(),
            Err(Error::MissingElement { .. })
        ));
    }

    fn sub_missing_parameter() -> Result<Parameter, Error> {
        SubComponent::new("cell", leaky())?.parameter("gamma")
    }
}
