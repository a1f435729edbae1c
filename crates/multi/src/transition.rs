use std::{
    borrow::Cow,
    collections::{HashMap, HashSet},
    vec,
};

use braid_core::{
    DynamicsError, Expression, PortKind, StateAssignment, Transition, TransitionLike, Trigger,
    traits::Members,
};
use tracing::trace;
use uom::si::time::second;

use crate::{Endpoint, Error, MultiDynamics, MultiRegime, namespace::make_regime_name};

/// A transition of one sub-component, already in the composite namespace.
///
/// Event ports, output events and the target regime keep their local names.
#[derive(Debug, Clone, Copy)]
pub struct SubTransition<'a> {
    instance: &'a str,
    transition: &'a Transition,
}

impl<'a> SubTransition<'a> {
    pub(crate) fn new(instance: &'a str, transition: &'a Transition) -> Self {
        Self {
            instance,
            transition,
        }
    }

    #[must_use]
    pub fn instance(&self) -> &'a str {
        self.instance
    }

    #[must_use]
    pub fn transition(&self) -> &'a Transition {
        self.transition
    }

    /// Returns the local name of the regime the instance moves to, if any.
    #[must_use]
    pub fn target(&self) -> Option<&'a str> {
        self.transition.target()
    }

    /// Returns the send ports this transition emits on.
    pub fn output_endpoints(&self) -> impl Iterator<Item = Endpoint> + use<'a> {
        let instance = self.instance;
        let transition: &'a Transition = self.transition;
        transition
            .emitted()
            .iter()
            .map(move |port| Endpoint::new(instance, port))
    }
}

/// Depth-first expansion of the transitions that fire together.
///
/// Yields each root, then every transition that consumes one of its output
/// events over a zero-delay connection, recursively. Expansion stops at the
/// first error:
///
/// - [`Error::CausalCycle`] if an instance already on the current path would
///   fire again;
/// - [`Error::ConflictingTransition`] if an instance that already fired
///   would fire again by another route.
#[derive(Debug)]
pub struct DaisyChain<'r, 'a> {
    regime: &'r MultiRegime<'a>,
    trigger: String,
    roots: vec::IntoIter<SubTransition<'a>>,
    path: Vec<(SubTransition<'a>, vec::IntoIter<SubTransition<'a>>)>,
    fired: HashSet<&'a str>,
    failed: bool,
}

impl<'r, 'a> DaisyChain<'r, 'a> {
    pub(crate) fn new(
        regime: &'r MultiRegime<'a>,
        trigger: String,
        roots: Vec<SubTransition<'a>>,
    ) -> Self {
        Self {
            regime,
            trigger,
            roots: roots.into_iter(),
            path: Vec::new(),
            fired: HashSet::new(),
            failed: false,
        }
    }

    fn enter(&mut self, next: SubTransition<'a>) -> Result<SubTransition<'a>, Error> {
        let instance = next.instance();

        if let Some(start) = self.path.iter().position(|(t, _)| t.instance() == instance) {
            self.failed = true;
            let mut instances: Vec<String> = self.path[start..]
                .iter()
                .map(|(t, _)| t.instance().to_string())
                .collect();
            instances.push(instance.to_string());
            return Err(Error::CausalCycle { instances });
        }
        if !self.fired.insert(instance) {
            self.failed = true;
            return Err(Error::ConflictingTransition {
                instance: instance.to_string(),
                trigger: self.trigger.clone(),
            });
        }

        trace!(
            trigger = %self.trigger,
            instance,
            depth = self.path.len(),
            "daisy-chained transition"
        );
        let pending = self.regime.chained_from(&next);
        self.path.push((next, pending.into_iter()));
        Ok(next)
    }
}

impl<'a> Iterator for DaisyChain<'_, 'a> {
    type Item = Result<SubTransition<'a>, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        loop {
            let next = match self.path.last_mut() {
                Some((_, pending)) => match pending.next() {
                    Some(next) => next,
                    None => {
                        self.path.pop();
                        continue;
                    }
                },
                None => self.roots.next()?,
            };
            return Some(self.enter(next));
        }
    }
}

/// Transitions of several sub-components that fire together, seen as one
/// transition of the composite.
///
/// Each contributing instance appears once. The merged transition assigns
/// what every contributor assigns, schedules the delayed connections fed by
/// the contributors' output events, and emits on the event send exposures of
/// those output events.
#[derive(Debug, Clone)]
pub struct MultiTransition<'a> {
    parent: &'a MultiDynamics,
    selection: Vec<(&'a str, &'a str)>,
    trigger: Trigger,
    sub_transitions: Vec<SubTransition<'a>>,
}

impl<'a> MultiTransition<'a> {
    /// Merges `roots` with everything daisy-chained from them in `regime`.
    ///
    /// # Errors
    ///
    /// Returns the first error of the [`DaisyChain`] expansion.
    pub(crate) fn new(
        regime: &MultiRegime<'a>,
        trigger: Trigger,
        roots: Vec<SubTransition<'a>>,
    ) -> Result<Self, Error> {
        let sub_transitions = regime
            .daisy_chain(&trigger, roots)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            parent: regime.parent(),
            selection: regime.selection().collect(),
            trigger,
            sub_transitions,
        })
    }

    #[must_use]
    pub fn trigger(&self) -> &Trigger {
        &self.trigger
    }

    /// Returns the contributing sub-transitions in firing order.
    #[must_use]
    pub fn sub_transitions(&self) -> &[SubTransition<'a>] {
        &self.sub_transitions
    }

    #[must_use]
    pub fn num_sub_transitions(&self) -> usize {
        self.sub_transitions.len()
    }

    /// Returns the sub-transition contributed by `instance`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingElement`] if `instance` does not contribute.
    pub fn sub_transition(&self, instance: &str) -> Result<&SubTransition<'a>, Error> {
        self.sub_transitions
            .iter()
            .find(|t| t.instance() == instance)
            .ok_or_else(|| Error::missing("sub-transition", instance, self.trigger.to_string()))
    }

    /// Flattens this view into a primitive [`Transition`].
    #[must_use]
    pub fn to_transition(&self) -> Transition {
        let transition = self
            .state_assignments()
            .fold(Transition::new(self.trigger.clone()), |t, sa| {
                t.with_assignment(sa)
            });
        let transition = self
            .output_events()
            .fold(transition, |t, port| t.with_output_event(port));
        match self.target_regime() {
            Some(target) => transition.with_target(target),
            None => transition,
        }
    }

    fn output_endpoints(&self) -> HashSet<Endpoint> {
        self.sub_transitions
            .iter()
            .flat_map(SubTransition::output_endpoints)
            .collect()
    }

    /// Assignments `delay_trigger := t + delay` for every delayed connection
    /// fed by this transition.
    fn delay_assignments(&self) -> impl Iterator<Item = StateAssignment> + '_ {
        self.sub_transitions
            .iter()
            .flat_map(SubTransition::output_endpoints)
            .flat_map(|sender| self.parent.delayed_from(&sender).collect::<Vec<_>>())
            .map(|connection| {
                StateAssignment::new(
                    connection.delay_trigger_name(),
                    Expression::sum([
                        Expression::symbol("t"),
                        Expression::number(connection.delay().get::<second>()),
                    ]),
                )
            })
    }
}

impl TransitionLike for MultiTransition<'_> {
    /// Returns the delay-trigger assignments, then the assignments of every
    /// sub-transition in firing order.
    fn state_assignments(&self) -> Members<'_, StateAssignment> {
        Box::new(
            self.delay_assignments().chain(
                self.sub_transitions
                    .iter()
                    .flat_map(|t| t.transition().assignments())
                    .cloned(),
            ),
        )
    }

    /// Returns the names of the event send exposures whose internal port is
    /// emitted on by some sub-transition.
    fn output_events(&self) -> Members<'_, String> {
        let emitted = self.output_endpoints();
        Box::new(
            self.parent
                .exposures_of_kind(PortKind::EventSend)
                .filter(move |exposure| emitted.contains(exposure.endpoint()))
                .map(|exposure| exposure.name().to_string()),
        )
    }

    /// Returns the composite regime in which every contributing instance has
    /// moved to its target, or `None` if no contributor changes regime.
    fn target_regime(&self) -> Option<Cow<'_, str>> {
        let targets: HashMap<&str, &str> = self
            .sub_transitions
            .iter()
            .filter_map(|t| Some((t.instance(), t.target()?)))
            .collect();
        if targets.is_empty() {
            return None;
        }

        let name = make_regime_name(self.selection.iter().map(|&(instance, regime)| {
            (instance, targets.get(instance).copied().unwrap_or(regime))
        }));
        Some(Cow::Owned(name))
    }

    fn output_event(&self, name: &str) -> Result<String, DynamicsError> {
        let exposure = self.parent.exposure(PortKind::EventSend, name)?;
        if self.output_endpoints().contains(exposure.endpoint()) {
            Ok(name.to_string())
        } else {
            Err(DynamicsError::MissingElement {
                kind: "output event",
                name: name.to_string(),
                container: self.trigger.to_string(),
            })
        }
    }
}
