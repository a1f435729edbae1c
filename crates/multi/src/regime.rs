use std::borrow::Cow;

use braid_core::{
    Alias, Comparison, DynamicsError, Expression, PortKind, Regime, RegimeLike, TimeDerivative,
    Transition, Trigger, traits::Members,
};
use indexmap::IndexMap;

use crate::{
    Endpoint, Error, MultiDynamics, MultiTransition, SubComponent,
    namespace::{make_regime_name, split_namespace},
    transition::{DaisyChain, SubTransition},
};

/// The active regime of one sub-component within a composite regime.
#[derive(Debug, Clone, Copy)]
pub struct SubRegime<'a> {
    sub_component: &'a SubComponent,
    regime: &'a Regime,
}

impl<'a> SubRegime<'a> {
    /// Returns the instance name.
    #[must_use]
    pub fn instance(&self) -> &'a str {
        self.sub_component.name()
    }

    #[must_use]
    pub fn sub_component(&self) -> &'a SubComponent {
        self.sub_component
    }

    /// Returns the namespaced regime.
    #[must_use]
    pub fn regime(&self) -> &'a Regime {
        self.regime
    }

    /// Returns the regime's local name.
    #[must_use]
    pub fn name(&self) -> &'a str {
        self.regime.name()
    }

    /// Returns the transition triggered by events on the local port `port`.
    #[must_use]
    pub fn on_event(&self, port: &str) -> Option<SubTransition<'a>> {
        self.regime
            .on_event(port)
            .ok()
            .map(|transition| self.sub_transition(transition))
    }

    pub fn on_events(&self) -> impl Iterator<Item = SubTransition<'a>> + use<'a> {
        let instance = self.instance();
        let regime: &'a Regime = self.regime;
        regime
            .on_events()
            .map(move |transition| SubTransition::new(instance, transition))
    }

    pub fn on_conditions(&self) -> impl Iterator<Item = SubTransition<'a>> + use<'a> {
        let instance = self.instance();
        let regime: &'a Regime = self.regime;
        regime
            .on_conditions()
            .map(move |transition| SubTransition::new(instance, transition))
    }

    fn sub_transition(&self, transition: &'a Transition) -> SubTransition<'a> {
        SubTransition::new(self.instance(), transition)
    }
}

/// One combination of sub-component regimes, seen as a regime of the
/// composite.
///
/// A composite regime is a view: it borrows the composite and builds its
/// transitions when they are requested. Use [`MultiRegime::to_regime`] for a
/// self-contained copy.
#[derive(Debug, Clone)]
pub struct MultiRegime<'a> {
    parent: &'a MultiDynamics,
    sub_regimes: Vec<SubRegime<'a>>,
}

impl<'a> MultiRegime<'a> {
    /// Selects regime `indices[i]` of the `i`-th sub-component.
    pub(crate) fn new(parent: &'a MultiDynamics, indices: &[usize]) -> Self {
        let sub_regimes = parent
            .sub_components()
            .zip(indices)
            .filter_map(|(sub_component, &index)| {
                let regime = sub_component.regimes().get(index)?;
                Some(SubRegime {
                    sub_component,
                    regime,
                })
            })
            .collect();
        Self {
            parent,
            sub_regimes,
        }
    }

    /// Returns the canonical name, which depends only on the set of
    /// `(instance, regime)` pairs.
    #[must_use]
    pub fn name(&self) -> String {
        make_regime_name(self.selection())
    }

    #[must_use]
    pub fn parent(&self) -> &'a MultiDynamics {
        self.parent
    }

    #[must_use]
    pub fn sub_regimes(&self) -> &[SubRegime<'a>] {
        &self.sub_regimes
    }

    #[must_use]
    pub fn num_sub_regimes(&self) -> usize {
        self.sub_regimes.len()
    }

    /// Returns the active regime of `instance`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingElement`] if there is no such instance.
    pub fn sub_regime(&self, instance: &str) -> Result<&SubRegime<'a>, Error> {
        self.sub_regimes
            .iter()
            .find(|sub| sub.instance() == instance)
            .ok_or_else(|| Error::missing("sub-regime", instance, self.name()))
    }

    pub fn time_derivatives(&self) -> impl Iterator<Item = &'a TimeDerivative> + '_ {
        self.sub_regimes.iter().flat_map(|sub| sub.regime().derivatives())
    }

    pub fn aliases(&self) -> impl Iterator<Item = &'a Alias> + '_ {
        self.sub_regimes
            .iter()
            .flat_map(|sub| sub.regime().local_aliases())
    }

    /// Returns one transition per event receive exposure whose internal port
    /// is consumed in this regime.
    ///
    /// Each transition carries the exposed port as its trigger and every
    /// transition daisy-chained from the consuming one.
    pub fn on_events(&self) -> impl Iterator<Item = Result<MultiTransition<'a>, Error>> + '_ {
        self.parent
            .exposures_of_kind(PortKind::EventReceive)
            .filter_map(move |exposure| {
                let endpoint = exposure.endpoint();
                let root = self.sub_regime(endpoint.instance()).ok()?.on_event(endpoint.port())?;
                let trigger = Trigger::Event {
                    port: exposure.name().to_string(),
                };
                Some(MultiTransition::new(self, trigger, vec![root]))
            })
    }

    /// Returns the condition-triggered transitions.
    ///
    /// Sub-transitions with structurally equal triggers fire together and
    /// become one transition. Every delayed event connection into a port
    /// consumed in this regime adds a transition that fires when the
    /// connection's delay trigger is reached.
    pub fn on_conditions(&self) -> impl Iterator<Item = Result<MultiTransition<'a>, Error>> + '_ {
        let mut groups: IndexMap<Expression, Vec<SubTransition<'a>>> = IndexMap::new();
        for sub in &self.sub_regimes {
            for transition in sub.on_conditions() {
                if let Some(condition) = transition.transition().condition() {
                    groups
                        .entry(condition.clone())
                        .or_default()
                        .push(transition);
                }
            }
        }

        let delayed = self.parent.delayed_connections().filter_map(move |connection| {
            let receiver = connection.receiver();
            let root = self.sub_regime(receiver.instance()).ok()?.on_event(receiver.port())?;
            let condition = Expression::compare(
                Expression::symbol("t"),
                Comparison::Greater,
                Expression::symbol(connection.delay_trigger_name()),
            );
            Some((condition, vec![root]))
        });

        groups
            .into_iter()
            .chain(delayed)
            .map(move |(condition, roots)| {
                MultiTransition::new(self, Trigger::Condition { condition }, roots)
            })
    }

    #[must_use]
    pub fn num_on_events(&self) -> usize {
        self.on_events().count()
    }

    #[must_use]
    pub fn num_on_conditions(&self) -> usize {
        self.on_conditions().count()
    }

    /// Flattens this view into a primitive [`Regime`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::CausalCycle`] or [`Error::ConflictingTransition`] if
    /// a transition cannot be merged.
    pub fn to_regime(&self) -> Result<Regime, Error> {
        let mut regime = Regime::new(self.name());
        for time_derivative in self.time_derivatives() {
            regime = regime.with_time_derivative(time_derivative.clone());
        }
        for alias in self.aliases() {
            regime = regime.with_alias(alias.clone());
        }
        for transition in self.on_events().chain(self.on_conditions()) {
            regime = regime.with_transition(transition?.to_transition());
        }
        Ok(regime)
    }

    /// Returns the `(instance, regime)` pairs of this regime.
    pub(crate) fn selection(&self) -> impl Iterator<Item = (&'a str, &'a str)> + '_ {
        self.sub_regimes.iter().map(|sub| (sub.instance(), sub.name()))
    }

    /// Starts a daisy-chain expansion from `roots`.
    pub(crate) fn daisy_chain(
        &self,
        trigger: &Trigger,
        roots: Vec<SubTransition<'a>>,
    ) -> DaisyChain<'_, 'a> {
        DaisyChain::new(self, trigger.to_string(), roots)
    }

    /// Returns the transitions, in this regime, that consume events emitted
    /// by `transition` over zero-delay connections.
    pub(crate) fn chained_from(&self, transition: &SubTransition<'a>) -> Vec<SubTransition<'a>> {
        let mut chained = Vec::new();
        for port in transition.transition().emitted() {
            let sender = Endpoint::new(transition.instance(), port);
            for receiver in self.parent.zero_delay_receivers(&sender) {
                if let Some(next) = self
                    .sub_regime(receiver.instance())
                    .ok()
                    .and_then(|sub| sub.on_event(receiver.port()))
                {
                    chained.push(next);
                }
            }
        }
        chained
    }

    fn missing(&self, kind: &'static str, name: &str) -> DynamicsError {
        DynamicsError::MissingElement {
            kind,
            name: name.to_string(),
            container: self.name(),
        }
    }
}

impl RegimeLike for MultiRegime<'_> {
    fn name(&self) -> Cow<'_, str> {
        Cow::Owned(MultiRegime::name(self))
    }

    fn time_derivatives(&self) -> Members<'_, TimeDerivative> {
        Box::new(MultiRegime::time_derivatives(self).cloned())
    }

    fn aliases(&self) -> Members<'_, Alias> {
        Box::new(MultiRegime::aliases(self).cloned())
    }

    fn time_derivative(&self, variable: &str) -> Result<TimeDerivative, DynamicsError> {
        let (_, instance) =
            split_namespace(variable).ok_or_else(|| self.missing("time derivative", variable))?;
        let sub = self
            .sub_regime(instance)
            .map_err(|_| self.missing("time derivative", variable))?;
        sub.regime()
            .time_derivative(variable)
            .map_err(|_| self.missing("time derivative", variable))
    }

    fn alias(&self, name: &str) -> Result<Alias, DynamicsError> {
        let (_, instance) = split_namespace(name).ok_or_else(|| self.missing("alias", name))?;
        let sub = self
            .sub_regime(instance)
            .map_err(|_| self.missing("alias", name))?;
        RegimeLike::alias(sub.regime(), name).map_err(|_| self.missing("alias", name))
    }
}
