use std::{collections::HashSet, ops::Range, sync::Arc};

use braid_core::{
    Alias, Constant, Dimension, DynamicsError, DynamicsLike, Expression, Parameter, Port,
    PortKind, Regime, StateVariable, identifier::validate_identifier, traits::Members,
};
use indexmap::{IndexMap, map::Entry};
use itertools::{Itertools, structs::MultiProduct};
use tracing::{debug, warn};

use crate::{
    BoundConnection, BoundExposure, Container, Endpoint, Error, MultiRegime, Options,
    PortConnection, PortExposure, SubComponent, exposure::Exposures, graph::CausalGraph,
    namespace::{REGIME_SEPARATOR, append_namespace, split_namespace},
};

/// A connection given either fully or as `(sender, send_port, receiver,
/// receive_port)`, with role and kind inferred when the composite is built.
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionSpec {
    Connection(PortConnection),
    Compact([String; 4]),
}

impl From<PortConnection> for ConnectionSpec {
    fn from(connection: PortConnection) -> Self {
        Self::Connection(connection)
    }
}

impl<S: Into<String>> From<(S, S, S, S)> for ConnectionSpec {
    fn from((sender, send_port, receiver, receive_port): (S, S, S, S)) -> Self {
        Self::Compact([
            sender.into(),
            send_port.into(),
            receiver.into(),
            receive_port.into(),
        ])
    }
}

/// An exposure given either fully or as `(name, instance, port)`, with the
/// kind taken from the internal port when the composite is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExposureSpec {
    Exposure(PortExposure),
    Compact([String; 3]),
}

impl From<PortExposure> for ExposureSpec {
    fn from(exposure: PortExposure) -> Self {
        Self::Exposure(exposure)
    }
}

impl<S: Into<String>> From<(S, S, S)> for ExposureSpec {
    fn from((name, instance, port): (S, S, S)) -> Self {
        Self::Compact([name.into(), instance.into(), port.into()])
    }
}

/// A dynamics definition built from connected instances of other
/// definitions.
///
/// Construction validates every connection and exposure up front. After
/// that, the composite is read like any other definition: members are the
/// namespaced members of its sub-components plus the aliases and state
/// variables the wiring implies, its regimes are the product of the
/// sub-components' regimes, and its ports are its exposures.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
///
/// use braid_core::{Dynamics, Port, Regime, Transition};
/// use braid_multi::MultiDynamics;
///
/// let emitter = Dynamics::builder("emitter")
///     .port(Port::event_send("spike_out"))
///     .port(Port::event_receive("trigger"))
///     .regime(Regime::new("default").with_transition(
///         Transition::on_event("trigger").with_output_event("spike_out"),
///     ))
///     .build()?;
/// let receiver = Dynamics::builder("receiver")
///     .port(Port::event_receive("spike_in"))
///     .build()?;
///
/// let pair = MultiDynamics::builder("pair")
///     .sub_component("a", Arc::new(emitter))
///     .sub_component("b", Arc::new(receiver))
///     .connection(("a", "spike_out", "b", "spike_in"))
///     .exposure(("go", "a", "trigger"))
///     .build()?;
///
/// assert_eq!(pair.num_regimes(), 1);
/// assert_eq!(pair.port("go")?.name(), "go");
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug)]
pub struct MultiDynamics {
    name: String,
    options: Options,
    sub_components: IndexMap<String, SubComponent>,
    roles: IndexMap<String, String>,
    /// Keyed by receiving endpoint; at most one per analog receive port.
    analog_connections: IndexMap<Endpoint, BoundConnection>,
    /// Keyed by receiving endpoint, then sending endpoint.
    reduce_connections: IndexMap<Endpoint, IndexMap<Endpoint, BoundConnection>>,
    /// Keyed by sending endpoint, then receiving endpoint.
    zero_delay_connections: IndexMap<Endpoint, IndexMap<Endpoint, BoundConnection>>,
    /// Keyed by sending endpoint, then receiving endpoint.
    delayed_connections: IndexMap<Endpoint, IndexMap<Endpoint, BoundConnection>>,
    exposures: Exposures,
}

impl MultiDynamics {
    #[must_use]
    pub fn builder(name: impl Into<String>) -> MultiDynamicsBuilder {
        MultiDynamicsBuilder {
            name: name.into(),
            options: Options::default(),
            sub_components: Vec::new(),
            roles: Vec::new(),
            connections: Vec::new(),
            exposures: Vec::new(),
        }
    }

    /// Builds a composite with strict validation.
    ///
    /// # Errors
    ///
    /// See [`MultiDynamicsBuilder::build`].
    pub fn new<N, C, E>(
        name: impl Into<String>,
        sub_components: impl IntoIterator<Item = (N, Arc<dyn DynamicsLike>)>,
        connections: impl IntoIterator<Item = C>,
        exposures: impl IntoIterator<Item = E>,
    ) -> Result<Self, Error>
    where
        N: Into<String>,
        C: Into<ConnectionSpec>,
        E: Into<ExposureSpec>,
    {
        Self::with_options(
            name,
            sub_components,
            connections,
            exposures,
            Options::default(),
        )
    }

    /// Builds a composite with the given validation options.
    ///
    /// # Errors
    ///
    /// See [`MultiDynamicsBuilder::build`].
    pub fn with_options<N, C, E>(
        name: impl Into<String>,
        sub_components: impl IntoIterator<Item = (N, Arc<dyn DynamicsLike>)>,
        connections: impl IntoIterator<Item = C>,
        exposures: impl IntoIterator<Item = E>,
        options: Options,
    ) -> Result<Self, Error>
    where
        N: Into<String>,
        C: Into<ConnectionSpec>,
        E: Into<ExposureSpec>,
    {
        let builder = sub_components.into_iter().fold(
            Self::builder(name).options(options),
            |builder, (name, definition)| builder.sub_component(name, definition),
        );
        let builder = connections
            .into_iter()
            .fold(builder, |builder, connection| builder.connection(connection));
        exposures
            .into_iter()
            .fold(builder, |builder, exposure| builder.exposure(exposure))
            .build()
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn sub_components(&self) -> impl Iterator<Item = &SubComponent> {
        self.sub_components.values()
    }

    #[must_use]
    pub fn num_sub_components(&self) -> usize {
        self.sub_components.len()
    }

    /// Connections into analog receive ports.
    pub fn analog_connections(&self) -> impl Iterator<Item = &BoundConnection> {
        self.analog_connections.values()
    }

    /// Connections into analog reduce ports.
    pub fn reduce_connections(&self) -> impl Iterator<Item = &BoundConnection> {
        self.reduce_connections.values().flat_map(IndexMap::values)
    }

    /// Event connections that deliver within the same instant.
    pub fn zero_delay_connections(&self) -> impl Iterator<Item = &BoundConnection> {
        self.zero_delay_connections.values().flat_map(IndexMap::values)
    }

    /// Event connections that deliver after a positive delay.
    pub fn delayed_connections(&self) -> impl Iterator<Item = &BoundConnection> {
        self.delayed_connections.values().flat_map(IndexMap::values)
    }

    /// Returns every exposure, grouped by port kind.
    pub fn exposures(&self) -> impl Iterator<Item = &BoundExposure> {
        self.exposures.iter()
    }

    pub fn parameters(&self) -> impl Iterator<Item = Parameter> + '_ {
        self.sub_components.values().flat_map(SubComponent::parameters)
    }

    /// Returns the aliases implied by the wiring, then the namespaced aliases
    /// of every sub-component.
    pub fn aliases(&self) -> impl Iterator<Item = Alias> + '_ {
        self.wiring_aliases()
            .chain(self.sub_components.values().flat_map(SubComponent::aliases))
    }

    pub fn constants(&self) -> impl Iterator<Item = Constant> + '_ {
        self.sub_components.values().flat_map(SubComponent::constants)
    }

    /// Returns one delay-trigger variable per delayed connection, then the
    /// namespaced state variables of every sub-component.
    pub fn state_variables(&self) -> impl Iterator<Item = StateVariable> + '_ {
        self.delay_trigger_variables()
            .chain(self.sub_components.values().flat_map(SubComponent::state_variables))
    }

    /// Returns the exposures as ports of the composite.
    pub fn ports(&self) -> impl Iterator<Item = Port> + '_ {
        self.exposures.iter().map(BoundExposure::port)
    }

    /// Returns the composite regimes, one per combination of sub-component
    /// regimes, built as they are requested.
    #[must_use]
    pub fn regimes(&self) -> Regimes<'_> {
        Regimes {
            parent: self,
            product: self
                .sub_components
                .values()
                .map(|sc| 0..sc.num_regimes())
                .multi_cartesian_product(),
        }
    }

    /// Returns the number of composite regimes without building them.
    ///
    /// The count grows exponentially with the number of instances and
    /// saturates at `usize::MAX`.
    #[must_use]
    pub fn num_regimes(&self) -> usize {
        self.sub_components
            .values()
            .map(SubComponent::num_regimes)
            .fold(1_usize, usize::saturating_mul)
    }

    /// Returns the composite regime with the given name.
    ///
    /// The name is matched instance by instance against the sub-component
    /// regimes, without enumerating the product.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingElement`] if no combination of sub-component
    /// regimes has that name.
    pub fn regime(&self, name: &str) -> Result<MultiRegime<'_>, Error> {
        let missing = || Error::missing("regime", name, &self.name);

        let mut by_instance: Vec<(usize, &SubComponent)> =
            self.sub_components.values().enumerate().collect();
        by_instance.sort_unstable_by(|(_, a), (_, b)| a.name().cmp(b.name()));

        let mut indices = vec![0; by_instance.len()];
        let mut rest = name;
        for (position, &(slot, sc)) in by_instance.iter().enumerate() {
            if position > 0 {
                rest = rest.strip_prefix(REGIME_SEPARATOR).ok_or_else(missing)?;
            }
            let (index, remaining) = sc
                .regimes()
                .iter()
                .enumerate()
                .find_map(|(index, regime)| {
                    let remaining =
                        rest.strip_prefix(append_namespace(regime.name(), sc.name()).as_str())?;
                    (remaining.is_empty() || remaining.starts_with(REGIME_SEPARATOR))
                        .then_some((index, remaining))
                })
                .ok_or_else(missing)?;
            indices[slot] = index;
            rest = remaining;
        }

        if rest.is_empty() {
            Ok(MultiRegime::new(self, &indices))
        } else {
            Err(missing())
        }
    }

    /// Returns the sub-component instance `name`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingElement`] if there is no such instance.
    pub fn sub_component(&self, name: &str) -> Result<&SubComponent, Error> {
        self.sub_components
            .get(name)
            .ok_or_else(|| Error::missing("sub-component", name, &self.name))
    }

    /// # Errors
    ///
    /// Returns [`Error::MissingElement`] if there is no such parameter.
    pub fn parameter(&self, name: &str) -> Result<Parameter, Error> {
        self.delegate("parameter", name, SubComponent::parameter)
    }

    /// # Errors
    ///
    /// Returns [`Error::MissingElement`] if there is no such alias.
    pub fn alias(&self, name: &str) -> Result<Alias, Error> {
        match self.wiring_aliases().find(|alias| alias.name() == name) {
            Some(alias) => Ok(alias),
            None => self.delegate("alias", name, SubComponent::alias),
        }
    }

    /// # Errors
    ///
    /// Returns [`Error::MissingElement`] if there is no such constant.
    pub fn constant(&self, name: &str) -> Result<Constant, Error> {
        self.delegate("constant", name, SubComponent::constant)
    }

    /// # Errors
    ///
    /// Returns [`Error::MissingElement`] if there is no such state variable.
    pub fn state_variable(&self, name: &str) -> Result<StateVariable, Error> {
        match self.delay_trigger_variables().find(|sv| sv.name() == name) {
            Some(sv) => Ok(sv),
            None => self.delegate("state variable", name, SubComponent::state_variable),
        }
    }

    /// # Errors
    ///
    /// Returns [`Error::MissingElement`] if no exposure has that name.
    pub fn port(&self, name: &str) -> Result<Port, Error> {
        self.exposures
            .iter()
            .find(|exposure| exposure.name() == name)
            .map(BoundExposure::port)
            .ok_or_else(|| Error::missing("port", name, &self.name))
    }

    /// Returns the exposure of `kind` called `name`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingElement`] if there is no such exposure.
    pub fn exposure(&self, kind: PortKind, name: &str) -> Result<&BoundExposure, Error> {
        self.exposures
            .get(kind, name)
            .ok_or_else(|| Error::missing(kind.as_str(), name, &self.name))
    }

    pub(crate) fn exposures_of_kind(
        &self,
        kind: PortKind,
    ) -> impl Iterator<Item = &BoundExposure> {
        self.exposures.of_kind(kind)
    }

    /// Returns the receivers of zero-delay event connections from `sender`.
    pub(crate) fn zero_delay_receivers(&self, sender: &Endpoint) -> impl Iterator<Item = &Endpoint> {
        self.zero_delay_connections
            .get(sender)
            .into_iter()
            .flat_map(IndexMap::keys)
    }

    /// Returns the delayed connections from `sender`.
    pub(crate) fn delayed_from(&self, sender: &Endpoint) -> impl Iterator<Item = &BoundConnection> {
        self.delayed_connections
            .get(sender)
            .into_iter()
            .flat_map(IndexMap::values)
    }

    fn delay_trigger_variables(&self) -> impl Iterator<Item = StateVariable> + '_ {
        self.delayed_connections()
            .map(|pc| StateVariable::new(pc.delay_trigger_name(), Dimension::time()))
    }

    /// Aliases for analog connections, reduce aggregations and analog
    /// exposures.
    fn wiring_aliases(&self) -> impl Iterator<Item = Alias> + '_ {
        let reduce = self.sub_components.values().flat_map(move |sc| {
            sc.definition()
                .ports_of_kind(PortKind::AnalogReduce)
                .map(move |port| self.reduce_alias(&Endpoint::new(sc.name(), port.name())))
        });

        self.analog_connections
            .values()
            .map(BoundConnection::alias)
            .chain(reduce)
            .chain(self.exposures.iter().filter_map(BoundExposure::alias))
    }

    /// Sums every input of a reduce port; an unconnected port reduces to zero.
    fn reduce_alias(&self, endpoint: &Endpoint) -> Alias {
        let senders = self
            .reduce_connections
            .get(endpoint)
            .into_iter()
            .flat_map(IndexMap::keys)
            .map(|sender| Expression::symbol(sender.flat_name()));
        let exposed = self
            .exposures
            .targeting(PortKind::AnalogReduce, endpoint)
            .map(|exposure| Expression::symbol(exposure.name()));

        Alias::new(endpoint.flat_name(), Expression::sum(senders.chain(exposed)))
    }

    /// Splits a flattened name and looks up its local part in the owning
    /// instance.
    fn delegate<T>(
        &self,
        kind: &'static str,
        name: &str,
        lookup: impl FnOnce(&SubComponent, &str) -> Result<T, Error>,
    ) -> Result<T, Error> {
        split_namespace(name)
            .and_then(|(local, instance)| {
                let sub_component = self.sub_components.get(instance)?;
                lookup(sub_component, local).ok()
            })
            .ok_or_else(|| Error::missing(kind, name, &self.name))
    }

    fn insert_connection(&mut self, connection: BoundConnection) -> Result<(), Error> {
        let sender = connection.sender().clone();
        let receiver = connection.receiver().clone();

        match connection.receive_port().kind() {
            PortKind::AnalogReceive => match self.analog_connections.entry(receiver) {
                Entry::Occupied(existing) => {
                    return Err(Error::PortDoubleBound {
                        endpoint: existing.key().clone(),
                        reason: format!(
                            "already connected from {}",
                            existing.get().sender()
                        ),
                    });
                }
                Entry::Vacant(slot) => {
                    debug!(connection = %connection, "analog connection");
                    slot.insert(connection);
                }
            },
            PortKind::AnalogReduce => {
                debug!(connection = %connection, "reduce connection");
                self.reduce_connections
                    .entry(receiver)
                    .or_default()
                    .insert(sender, connection);
            }
            PortKind::EventReceive if connection.is_delayed() => {
                debug!(
                    connection = %connection,
                    trigger = connection.delay_trigger_name(),
                    "delayed event connection"
                );
                self.delayed_connections
                    .entry(sender)
                    .or_default()
                    .insert(receiver, connection);
            }
            PortKind::EventReceive => {
                debug!(connection = %connection, "zero-delay event connection");
                self.zero_delay_connections
                    .entry(sender)
                    .or_default()
                    .insert(receiver, connection);
            }
            PortKind::AnalogSend | PortKind::EventSend => {
                return Err(Error::UnrecognizedConnection {
                    connection: connection.to_string(),
                });
            }
        }
        Ok(())
    }

    fn validate(&self) -> Result<(), Error> {
        let mut bound: HashSet<&Endpoint> = self.analog_connections.keys().collect();
        for exposure in self.exposures.of_kind(PortKind::AnalogReceive) {
            if !bound.insert(exposure.endpoint()) {
                return Err(Error::PortDoubleBound {
                    endpoint: exposure.endpoint().clone(),
                    reason: format!("also bound to the exposure `{}`", exposure.name()),
                });
            }
        }

        for sc in self.sub_components.values() {
            for port in sc.definition().ports_of_kind(PortKind::AnalogReceive) {
                let endpoint = Endpoint::new(sc.name(), port.name());
                if !bound.contains(&endpoint) {
                    warn!(%endpoint, composite = %self.name, "analog receive port is never bound");
                }
            }
        }

        let internally_fed: HashSet<&Endpoint> = self
            .zero_delay_connections()
            .chain(self.delayed_connections())
            .map(BoundConnection::receiver)
            .collect();
        for exposure in self.exposures.of_kind(PortKind::EventReceive) {
            if internally_fed.contains(exposure.endpoint()) {
                if self.options.validate_dimensions() {
                    return Err(Error::PortDoubleBound {
                        endpoint: exposure.endpoint().clone(),
                        reason: format!(
                            "exposed as `{}` and fed by an internal connection",
                            exposure.name()
                        ),
                    });
                }
                warn!(
                    endpoint = %exposure.endpoint(),
                    exposure = exposure.name(),
                    "event receive exposure shadows an internal connection"
                );
            }
        }

        self.causal_graph().check_acyclic()
    }

    fn causal_graph(&self) -> CausalGraph {
        let mut graph = CausalGraph::default();
        for connection in self.zero_delay_connections() {
            let (sender, receiver) = (connection.sender(), connection.receiver());
            let (Some(sending), Some(receiving)) = (
                self.sub_components.get(sender.instance()),
                self.sub_components.get(receiver.instance()),
            ) else {
                continue;
            };

            let emits = sending
                .regimes()
                .iter()
                .flat_map(Regime::transitions)
                .any(|transition| transition.emitted().iter().any(|port| port == sender.port()));
            let consumes = receiving
                .regimes()
                .iter()
                .any(|regime| regime.on_event(receiver.port()).is_ok());
            if emits && consumes {
                graph.connect(sender.instance(), receiver.instance());
            }
        }
        graph
    }
}

impl Container for MultiDynamics {
    fn container_name(&self) -> &str {
        &self.name
    }

    fn sub_component(&self, instance: &str) -> Option<&SubComponent> {
        self.sub_components.get(instance)
    }

    fn role(&self, role: &str) -> Option<&SubComponent> {
        self.roles
            .get(role)
            .and_then(|instance| self.sub_components.get(instance))
    }
}

impl DynamicsLike for MultiDynamics {
    fn name(&self) -> &str {
        &self.name
    }

    fn parameters(&self) -> Members<'_, Parameter> {
        Box::new(MultiDynamics::parameters(self))
    }

    fn aliases(&self) -> Members<'_, Alias> {
        Box::new(MultiDynamics::aliases(self))
    }

    fn constants(&self) -> Members<'_, Constant> {
        Box::new(MultiDynamics::constants(self))
    }

    fn state_variables(&self) -> Members<'_, StateVariable> {
        Box::new(MultiDynamics::state_variables(self))
    }

    fn ports(&self) -> Members<'_, Port> {
        Box::new(MultiDynamics::ports(self))
    }

    fn num_regimes(&self) -> usize {
        MultiDynamics::num_regimes(self)
    }

    /// Flattens each composite regime into a primitive [`Regime`].
    fn regimes(&self) -> Members<'_, Result<Regime, DynamicsError>> {
        Box::new(
            MultiDynamics::regimes(self)
                .map(|regime| regime.to_regime().map_err(DynamicsError::from)),
        )
    }

    fn parameter(&self, name: &str) -> Result<Parameter, DynamicsError> {
        Ok(MultiDynamics::parameter(self, name)?)
    }

    fn alias(&self, name: &str) -> Result<Alias, DynamicsError> {
        Ok(MultiDynamics::alias(self, name)?)
    }

    fn constant(&self, name: &str) -> Result<Constant, DynamicsError> {
        Ok(MultiDynamics::constant(self, name)?)
    }

    fn state_variable(&self, name: &str) -> Result<StateVariable, DynamicsError> {
        Ok(MultiDynamics::state_variable(self, name)?)
    }

    fn port(&self, name: &str) -> Result<Port, DynamicsError> {
        Ok(MultiDynamics::port(self, name)?)
    }
}

/// Builds a [`MultiDynamics`].
#[derive(Debug)]
pub struct MultiDynamicsBuilder {
    name: String,
    options: Options,
    sub_components: Vec<(String, Arc<dyn DynamicsLike>)>,
    roles: Vec<(String, String)>,
    connections: Vec<ConnectionSpec>,
    exposures: Vec<ExposureSpec>,
}

impl MultiDynamicsBuilder {
    /// Adds an instance of `definition` called `name`.
    #[must_use]
    pub fn sub_component(
        mut self,
        name: impl Into<String>,
        definition: Arc<dyn DynamicsLike>,
    ) -> Self {
        self.sub_components.push((name.into(), definition));
        self
    }

    /// Lets connections refer to the instance `instance` as `role`.
    #[must_use]
    pub fn role(mut self, role: impl Into<String>, instance: impl Into<String>) -> Self {
        self.roles.push((role.into(), instance.into()));
        self
    }

    #[must_use]
    pub fn connection(mut self, connection: impl Into<ConnectionSpec>) -> Self {
        self.connections.push(connection.into());
        self
    }

    #[must_use]
    pub fn exposure(mut self, exposure: impl Into<ExposureSpec>) -> Self {
        self.exposures.push(exposure.into());
        self
    }

    #[must_use]
    pub fn options(mut self, options: Options) -> Self {
        self.options = options;
        self
    }

    /// Validates the wiring and builds the composite.
    ///
    /// # Errors
    ///
    /// Fails on the first problem found, in this order:
    ///
    /// - [`Error::InvalidIdentifier`] for a bad composite, instance or
    ///   exposure name.
    /// - [`Error::DuplicateMember`] for a repeated instance or role name.
    /// - [`Error::MissingElement`] for a role naming an unknown instance.
    /// - Any error from [`PortConnection::bind`], or
    ///   [`Error::PortDoubleBound`] for a second connection into an analog
    ///   receive port.
    /// - Any error from [`PortExposure::bind`], or
    ///   [`Error::DuplicateExposure`] for a repeated name within a kind.
    /// - [`Error::PortDoubleBound`] if an analog receive port is both
    ///   connected and exposed, or, under strict options, if an event receive
    ///   port is both exposed and internally connected.
    /// - [`Error::CausalCycle`] if zero-delay event connections can feed an
    ///   event back into itself.
    pub fn build(self) -> Result<MultiDynamics, Error> {
        validate_identifier(&self.name)?;

        let mut sub_components = IndexMap::with_capacity(self.sub_components.len());
        for (name, definition) in self.sub_components {
            let sub_component = SubComponent::new(name, definition)?;
            match sub_components.entry(sub_component.name().to_string()) {
                Entry::Occupied(slot) => {
                    return Err(Error::DuplicateMember {
                        kind: "sub-component",
                        name: slot.key().clone(),
                        container: self.name,
                    });
                }
                Entry::Vacant(slot) => {
                    debug!(
                        composite = %self.name,
                        instance = sub_component.name(),
                        definition = sub_component.definition().name(),
                        "registered sub-component"
                    );
                    slot.insert(sub_component);
                }
            }
        }

        let mut roles = IndexMap::with_capacity(self.roles.len());
        for (role, instance) in self.roles {
            validate_identifier(&role)?;
            if !sub_components.contains_key(&instance) {
                return Err(Error::missing("sub-component", instance, self.name));
            }
            if roles.insert(role.clone(), instance).is_some() {
                return Err(Error::DuplicateMember {
                    kind: "role",
                    name: role,
                    container: self.name,
                });
            }
        }

        let mut multi = MultiDynamics {
            name: self.name,
            options: self.options,
            sub_components,
            roles,
            analog_connections: IndexMap::new(),
            reduce_connections: IndexMap::new(),
            zero_delay_connections: IndexMap::new(),
            delayed_connections: IndexMap::new(),
            exposures: Exposures::default(),
        };

        let connections = self
            .connections
            .into_iter()
            .map(|spec| {
                let connection = match spec {
                    ConnectionSpec::Connection(connection) => connection,
                    ConnectionSpec::Compact([sender, send_port, receiver, receive_port]) => {
                        PortConnection::from_compact_tuple(
                            (
                                sender.as_str(),
                                send_port.as_str(),
                                receiver.as_str(),
                                receive_port.as_str(),
                            ),
                            &multi,
                        )?
                    }
                };
                connection.bind(&multi, &self.options)
            })
            .collect::<Result<Vec<_>, Error>>()?;
        for connection in connections {
            multi.insert_connection(connection)?;
        }

        let exposures = self
            .exposures
            .into_iter()
            .map(|spec| match spec {
                ExposureSpec::Exposure(exposure) => exposure.bind(&multi),
                ExposureSpec::Compact([name, instance, port]) => {
                    PortExposure::from_compact_tuple(
                        (name.as_str(), instance.as_str(), port.as_str()),
                        &multi,
                    )?
                        .bind(&multi)
                }
            })
            .collect::<Result<Vec<_>, Error>>()?;
        for exposure in exposures {
            debug!(composite = %multi.name, exposure = exposure.name(), kind = %exposure.kind(), "exposed port");
            multi.exposures.insert(exposure)?;
        }

        multi.validate()?;
        Ok(multi)
    }
}

/// Iterator over the regimes of a [`MultiDynamics`].
///
/// Each item is built from the next combination of sub-component regime
/// indices; nothing is precomputed.
#[derive(Debug, Clone)]
pub struct Regimes<'a> {
    parent: &'a MultiDynamics,
    product: MultiProduct<Range<usize>>,
}

impl<'a> Iterator for Regimes<'a> {
    type Item = MultiRegime<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let indices = self.product.next()?;
        Some(MultiRegime::new(self.parent, &indices))
    }
}

#[cfg(test)]
mod tests {
    use braid_core::{Dynamics, Regime, StateAssignment, Transition};

    use super::*;

    fn expr(text: &str) -> Expression {
        Expression::parse(text).expect("valid expression")
    }

    fn integrator() -> Arc<dyn DynamicsLike> {
        Arc::new(
            Dynamics::builder("integrator")
                .parameter(Parameter::new("tau", Dimension::time()))
                .state_variable(StateVariable::new("x", Dimension::dimensionless()))
                .port(Port::analog_send("x", Dimension::dimensionless()))
                .port(Port::analog_reduce("input", Dimension::dimensionless()))
                .port(Port::event_receive("reset"))
                .regime(
                    Regime::new("default")
                        .with_transition(
                            Transition::on_event("reset")
                                .with_assignment(StateAssignment::new("x", expr("0"))),
                        ),
                )
                .build()
                .expect("valid dynamics"),
        )
    }

    #[test]
    fn lookups_split_flattened_names() {
        let multi = MultiDynamics::builder("chain")
            .sub_component("first", integrator())
            .sub_component("second", integrator())
            .connection(("first", "x", "second", "input"))
            .build()
            .expect("valid composite");

        assert_eq!(multi.parameter("tau__first").expect("defined").name(), "tau__first");
        assert!(matches!(
            multi.parameter("tau__third"),
            Err(Error::MissingElement { .. })
        ));
        assert!(matches!(
            multi.parameter("tau"),
            Err(Error::MissingElement { .. })
        ));
        assert_eq!(
            multi.alias("input__second").expect("reduce alias").rhs(),
            &expr("x__first")
        );
        assert_eq!(
            multi.alias("input__first").expect("unconnected reduce alias").rhs(),
            &expr("0.0")
        );
        assert_eq!(multi.num_parameters(), 2);
        assert_eq!(multi.ports().count(), 0);
    }

    #[test]
    fn rejects_duplicate_instances_and_unknown_roles() {
        let duplicate = MultiDynamics::builder("dup")
            .sub_component("a", integrator())
            .sub_component("a", integrator())
            .build();
        assert!(matches!(
            duplicate,
            Err(Error::DuplicateMember {
                kind: "sub-component",
                ..
            })
        ));

        let unknown_role = MultiDynamics::builder("roles")
            .sub_component("a", integrator())
            .role("pre", "b")
            .build();
        assert!(matches!(unknown_role, Err(Error::MissingElement { .. })));
    }

    #[test]
    fn zero_sub_components_have_one_empty_regime() {
        let multi = MultiDynamics::builder("empty").build().expect("valid composite");
        assert_eq!(multi.num_regimes(), 1);
        assert_eq!(multi.parameters().count(), 0);
    }
}
