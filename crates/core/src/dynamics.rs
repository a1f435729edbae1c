use std::collections::HashSet;

use indexmap::IndexMap;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{
    Alias, Constant, DynamicsError, Expression, Parameter, Port, PortKind, Regime, StateVariable,
    Trigger,
    identifier::{is_reserved, validate_identifier},
    traits::{DynamicsLike, Members},
};

/// Name of the regime added to definitions declared without one.
pub const DEFAULT_REGIME: &str = "default";

/// A primitive hybrid-automaton definition.
///
/// Built with [`Dynamics::builder`], which validates the definition before
/// handing it out. A `Dynamics` value is therefore always well formed:
///
/// - Every name is a valid identifier and unique within its namespace.
/// - Every symbol in every expression resolves to a parameter, alias,
///   constant, state variable, analog receive/reduce port, or a reserved
///   symbol.
/// - Every transition listens on an event receive port, emits on event send
///   ports, assigns state variables and targets an existing regime.
/// - Every analog send port publishes a state variable or an alias.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Dynamics {
    name: String,
    parameters: IndexMap<String, Parameter>,
    aliases: IndexMap<String, Alias>,
    constants: IndexMap<String, Constant>,
    state_variables: IndexMap<String, StateVariable>,
    regimes: IndexMap<String, Regime>,
    ports: IndexMap<String, Port>,
}

impl Dynamics {
    /// Starts building a definition named `name`.
    #[must_use]
    pub fn builder(name: impl Into<String>) -> DynamicsBuilder {
        DynamicsBuilder {
            name: name.into(),
            parameters: Vec::new(),
            aliases: Vec::new(),
            constants: Vec::new(),
            state_variables: Vec::new(),
            regimes: Vec::new(),
            ports: Vec::new(),
        }
    }

    /// Returns the regime named `name`.
    ///
    /// # Errors
    ///
    /// Returns [`DynamicsError::MissingElement`] if there is no such regime.
    pub fn regime(&self, name: &str) -> Result<&Regime, DynamicsError> {
        self.regimes
            .get(name)
            .ok_or_else(|| DynamicsError::missing("regime", name, &self.name))
    }

    /// Returns the regimes in declaration order.
    pub fn regime_definitions(&self) -> impl Iterator<Item = &Regime> {
        self.regimes.values()
    }

    fn lookup<'a, T: Clone>(
        &self,
        map: &'a IndexMap<String, T>,
        kind: &'static str,
        name: &str,
    ) -> Result<T, DynamicsError> {
        map.get(name)
            .cloned()
            .ok_or_else(|| DynamicsError::missing(kind, name, &self.name))
    }
}

impl DynamicsLike for Dynamics {
    fn name(&self) -> &str {
        &self.name
    }

    fn parameters(&self) -> Members<'_, Parameter> {
        Box::new(self.parameters.values().cloned())
    }

    fn aliases(&self) -> Members<'_, Alias> {
        Box::new(self.aliases.values().cloned())
    }

    fn constants(&self) -> Members<'_, Constant> {
        Box::new(self.constants.values().cloned())
    }

    fn state_variables(&self) -> Members<'_, StateVariable> {
        Box::new(self.state_variables.values().cloned())
    }

    fn ports(&self) -> Members<'_, Port> {
        Box::new(self.ports.values().cloned())
    }

    fn num_regimes(&self) -> usize {
        self.regimes.len()
    }

    fn regimes(&self) -> Members<'_, Result<Regime, DynamicsError>> {
        Box::new(self.regimes.values().cloned().map(Ok))
    }

    fn parameter(&self, name: &str) -> Result<Parameter, DynamicsError> {
        self.lookup(&self.parameters, "parameter", name)
    }

    fn alias(&self, name: &str) -> Result<Alias, DynamicsError> {
        self.lookup(&self.aliases, "alias", name)
    }

    fn constant(&self, name: &str) -> Result<Constant, DynamicsError> {
        self.lookup(&self.constants, "constant", name)
    }

    fn state_variable(&self, name: &str) -> Result<StateVariable, DynamicsError> {
        self.lookup(&self.state_variables, "state variable", name)
    }

    fn port(&self, name: &str) -> Result<Port, DynamicsError> {
        self.lookup(&self.ports, "port", name)
    }
}

/// Collects the members of a [`Dynamics`] and validates them on
/// [`build`](DynamicsBuilder::build).
#[derive(Debug, Clone)]
#[must_use]
pub struct DynamicsBuilder {
    name: String,
    parameters: Vec<Parameter>,
    aliases: Vec<Alias>,
    constants: Vec<Constant>,
    state_variables: Vec<StateVariable>,
    regimes: Vec<Regime>,
    ports: Vec<Port>,
}

impl DynamicsBuilder {
    pub fn parameter(mut self, parameter: Parameter) -> Self {
        self.parameters.push(parameter);
        self
    }

    pub fn alias(mut self, alias: Alias) -> Self {
        self.aliases.push(alias);
        self
    }

    pub fn constant(mut self, constant: Constant) -> Self {
        self.constants.push(constant);
        self
    }

    pub fn state_variable(mut self, state_variable: StateVariable) -> Self {
        self.state_variables.push(state_variable);
        self
    }

    pub fn regime(mut self, regime: Regime) -> Self {
        self.regimes.push(regime);
        self
    }

    pub fn port(mut self, port: Port) -> Self {
        self.ports.push(port);
        self
    }

    /// Validates the collected members and builds the definition.
    ///
    /// A definition declared without regimes gets a single empty regime
    /// named [`DEFAULT_REGIME`].
    ///
    /// # Errors
    ///
    /// - [`DynamicsError::InvalidIdentifier`] for a malformed name.
    /// - [`DynamicsError::DuplicateMember`] for a name declared twice in one
    ///   namespace.
    /// - [`DynamicsError::UnresolvedSymbol`] for an expression referencing an
    ///   undefined symbol.
    /// - [`DynamicsError::MissingElement`] for a transition naming an
    ///   undefined port, variable or regime.
    /// - [`DynamicsError::InvalidReference`] for a reference to something of
    ///   the wrong kind.
    pub fn build(mut self) -> Result<Dynamics, DynamicsError> {
        validate_identifier(&self.name)?;
        if self.regimes.is_empty() {
            self.regimes.push(Regime::new(DEFAULT_REGIME));
        }

        let name = self.name;
        let dynamics = Dynamics {
            parameters: index(&name, "parameter", self.parameters, |p| p.name())?,
            aliases: index(&name, "alias", self.aliases, |a| a.name())?,
            constants: index(&name, "constant", self.constants, |c| c.name())?,
            state_variables: index(&name, "state variable", self.state_variables, |s| s.name())?,
            regimes: index(&name, "regime", self.regimes, |r| r.name())?,
            ports: index(&name, "port", self.ports, |p| p.name())?,
            name,
        };

        Validator::new(&dynamics)?.validate()?;
        Ok(dynamics)
    }
}

/// Indexes members by name, rejecting invalid and duplicate names.
fn index<T>(
    container: &str,
    kind: &'static str,
    members: Vec<T>,
    name_of: impl Fn(&T) -> &str,
) -> Result<IndexMap<String, T>, DynamicsError> {
    let mut map = IndexMap::with_capacity(members.len());
    for member in members {
        let name = name_of(&member).to_string();
        validate_identifier(&name)?;
        if map.contains_key(&name) {
            return Err(DynamicsError::duplicate(kind, name, container));
        }
        map.insert(name, member);
    }
    Ok(map)
}

/// Cross-member checks run once every member has been indexed.
struct Validator<'a> {
    dynamics: &'a Dynamics,
    symbols: HashSet<&'a str>,
}

impl<'a> Validator<'a> {
    /// Collects the shared symbol namespace, rejecting names used twice.
    fn new(dynamics: &'a Dynamics) -> Result<Self, DynamicsError> {
        let receive_ports = dynamics
            .ports
            .values()
            .filter(|p| matches!(p.kind(), PortKind::AnalogReceive | PortKind::AnalogReduce))
            .map(Port::name);

        let mut symbols = HashSet::new();
        for symbol in dynamics
            .parameters
            .keys()
            .chain(dynamics.aliases.keys())
            .chain(dynamics.constants.keys())
            .chain(dynamics.state_variables.keys())
            .map(String::as_str)
            .chain(receive_ports)
        {
            if !symbols.insert(symbol) {
                return Err(DynamicsError::duplicate("symbol", symbol, &dynamics.name));
            }
        }

        Ok(Self { dynamics, symbols })
    }

    fn validate(&self) -> Result<(), DynamicsError> {
        for alias in self.dynamics.aliases.values() {
            self.check_expression(alias.rhs(), &format!("alias `{}`", alias.name()), &[])?;
        }
        for port in self.dynamics.ports.values() {
            self.check_port(port)?;
        }
        for regime in self.dynamics.regimes.values() {
            self.check_regime(regime)?;
        }
        Ok(())
    }

    fn check_port(&self, port: &Port) -> Result<(), DynamicsError> {
        let publishes_member = self.dynamics.state_variables.contains_key(port.name())
            || self.dynamics.aliases.contains_key(port.name());
        if port.kind() == PortKind::AnalogSend && !publishes_member {
            return Err(self.invalid(
                format!("analog send port `{}`", port.name()),
                "a state variable or alias",
            ));
        }
        Ok(())
    }

    fn check_regime(&self, regime: &Regime) -> Result<(), DynamicsError> {
        let context = |what: String| format!("{what} in regime `{}`", regime.name());

        let mut local = Vec::new();
        for alias in regime.local_aliases() {
            validate_identifier(alias.name())?;
            if self.symbols.contains(alias.name()) || local.contains(&alias.name()) {
                return Err(DynamicsError::duplicate(
                    "symbol",
                    alias.name(),
                    &self.dynamics.name,
                ));
            }
            local.push(alias.name());
        }
        for alias in regime.local_aliases() {
            self.check_expression(alias.rhs(), &context(format!("alias `{}`", alias.name())), &local)?;
        }

        let mut derived = HashSet::new();
        for td in regime.derivatives() {
            self.check_state_variable(td.variable())?;
            if !derived.insert(td.variable()) {
                return Err(DynamicsError::duplicate(
                    "time derivative",
                    td.variable(),
                    regime.name(),
                ));
            }
            self.check_expression(td.rhs(), &context(format!("d{}/dt", td.variable())), &local)?;
        }

        let mut triggers = HashSet::new();
        for transition in regime.transitions() {
            if !triggers.insert(transition.trigger()) {
                return Err(DynamicsError::duplicate(
                    "transition trigger",
                    transition.trigger().to_string(),
                    regime.name(),
                ));
            }

            let description = context(format!("transition {}", transition.trigger()));
            match transition.trigger() {
                Trigger::Event { port } => self.check_port_kind(port, PortKind::EventReceive)?,
                Trigger::Condition { condition } => {
                    self.check_expression(condition, &description, &local)?;
                }
            }
            for sa in transition.assignments() {
                self.check_state_variable(sa.variable())?;
                self.check_expression(sa.rhs(), &description, &local)?;
            }
            for port in transition.emitted() {
                self.check_port_kind(port, PortKind::EventSend)?;
            }
            if let Some(target) = transition.target() {
                self.dynamics.regime(target)?;
            }
        }

        Ok(())
    }

    fn check_expression(
        &self,
        expression: &Expression,
        context: &str,
        local: &[&str],
    ) -> Result<(), DynamicsError> {
        match expression
            .symbols()
            .find(|s| !is_reserved(s) && !self.symbols.contains(s) && !local.contains(s))
        {
            Some(symbol) => Err(DynamicsError::UnresolvedSymbol {
                symbol: symbol.to_string(),
                context: context.to_string(),
                container: self.dynamics.name.clone(),
            }),
            None => Ok(()),
        }
    }

    fn check_state_variable(&self, name: &str) -> Result<(), DynamicsError> {
        self.dynamics.state_variable(name).map(|_| ())
    }

    fn check_port_kind(&self, name: &str, expected: PortKind) -> Result<(), DynamicsError> {
        let port = self.dynamics.port(name)?;
        if port.kind() == expected {
            Ok(())
        } else {
            Err(self.invalid(format!("port `{name}`"), expected.as_str()))
        }
    }

    fn invalid(&self, member: String, expected: &'static str) -> DynamicsError {
        DynamicsError::InvalidReference {
            member,
            expected,
            container: self.dynamics.name.clone(),
        }
    }
}
