use std::fmt;

use braid_core::{Alias, Expression, Port, PortKind, identifier::validate_identifier};
use indexmap::IndexMap;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{Container, Endpoint, Error};

/// An unbound request to make a port of one sub-component a port of the
/// composite, under a new name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PortExposure {
    kind: PortKind,
    name: String,
    instance: String,
    port: String,
}

impl PortExposure {
    #[must_use]
    pub fn new(
        kind: PortKind,
        name: impl Into<String>,
        instance: impl Into<String>,
        port: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            name: name.into(),
            instance: instance.into(),
            port: port.into(),
        }
    }

    #[must_use]
    pub fn analog_send(
        name: impl Into<String>,
        instance: impl Into<String>,
        port: impl Into<String>,
    ) -> Self {
        Self::new(PortKind::AnalogSend, name, instance, port)
    }

    #[must_use]
    pub fn analog_receive(
        name: impl Into<String>,
        instance: impl Into<String>,
        port: impl Into<String>,
    ) -> Self {
        Self::new(PortKind::AnalogReceive, name, instance, port)
    }

    #[must_use]
    pub fn analog_reduce(
        name: impl Into<String>,
        instance: impl Into<String>,
        port: impl Into<String>,
    ) -> Self {
        Self::new(PortKind::AnalogReduce, name, instance, port)
    }

    #[must_use]
    pub fn event_send(
        name: impl Into<String>,
        instance: impl Into<String>,
        port: impl Into<String>,
    ) -> Self {
        Self::new(PortKind::EventSend, name, instance, port)
    }

    #[must_use]
    pub fn event_receive(
        name: impl Into<String>,
        instance: impl Into<String>,
        port: impl Into<String>,
    ) -> Self {
        Self::new(PortKind::EventReceive, name, instance, port)
    }

    /// Creates an exposure from `(name, instance, port)`, taking its kind
    /// from the internal port.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingElement`] if the instance or its port does
    /// not exist in `container`.
    pub fn from_compact_tuple<C: Container + ?Sized>(
        (name, instance, port): (&str, &str, &str),
        container: &C,
    ) -> Result<Self, Error> {
        let kind = container
            .sub_component(instance)
            .ok_or_else(|| Error::missing("sub-component", instance, container.container_name()))?
            .port(port)?
            .kind();
        Ok(Self::new(kind, name, instance, port))
    }

    #[must_use]
    pub fn kind(&self) -> PortKind {
        self.kind
    }

    /// Returns the name the port has on the composite.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn instance(&self) -> &str {
        &self.instance
    }

    #[must_use]
    pub fn port(&self) -> &str {
        &self.port
    }

    /// Resolves the internal port within `container`.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidIdentifier`] if the exposed name is not valid.
    /// - [`Error::MissingElement`] if the instance or its port does not exist.
    /// - [`Error::PortKind`] if the internal port is of another kind.
    pub fn bind<C: Container + ?Sized>(&self, container: &C) -> Result<BoundExposure, Error> {
        validate_identifier(&self.name)?;

        let internal_port = container
            .sub_component(&self.instance)
            .ok_or_else(|| {
                Error::missing("sub-component", &self.instance, container.container_name())
            })?
            .port(&self.port)?;

        let endpoint = Endpoint::new(&self.instance, &self.port);
        if internal_port.kind() != self.kind {
            return Err(Error::PortKind {
                port: endpoint.to_string(),
                expected: self.kind.as_str(),
                found: internal_port.kind(),
            });
        }

        Ok(BoundExposure {
            name: self.name.clone(),
            endpoint,
            internal_port,
        })
    }
}

impl fmt::Display for PortExposure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} `{}` <- {}.{}",
            self.kind, self.name, self.instance, self.port
        )
    }
}

/// An exposure whose internal port has been resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundExposure {
    name: String,
    endpoint: Endpoint,
    internal_port: Port,
}

impl BoundExposure {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn kind(&self) -> PortKind {
        self.internal_port.kind()
    }

    /// Returns the internal `(instance, port)` pair.
    #[must_use]
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    #[must_use]
    pub fn internal_port(&self) -> &Port {
        &self.internal_port
    }

    /// Returns the exposure as a port of the composite.
    #[must_use]
    pub fn port(&self) -> Port {
        self.internal_port.renamed(&self.name)
    }

    /// Returns the alias that links the exposed name to the flattened
    /// internal port.
    ///
    /// Send exposures define the exposed name; receive exposures define the
    /// internal port. Reduce and event exposures have no alias.
    #[must_use]
    pub fn alias(&self) -> Option<Alias> {
        match self.kind() {
            PortKind::AnalogSend => Some(Alias::new(
                &self.name,
                Expression::symbol(self.endpoint.flat_name()),
            )),
            PortKind::AnalogReceive => Some(Alias::new(
                self.endpoint.flat_name(),
                Expression::symbol(&self.name),
            )),
            PortKind::AnalogReduce | PortKind::EventSend | PortKind::EventReceive => None,
        }
    }
}

/// Bound exposures partitioned by port kind and keyed by exposed name.
#[derive(Debug, Clone, Default)]
pub(crate) struct Exposures {
    by_kind: IndexMap<PortKind, IndexMap<String, BoundExposure>>,
}

impl Exposures {
    /// # Errors
    ///
    /// Returns [`Error::DuplicateExposure`] if any exposure already uses the
    /// name. Exposures become the ports of the composite, and port names are
    /// unique across kinds.
    pub(crate) fn insert(&mut self, exposure: BoundExposure) -> Result<(), Error> {
        let kind = exposure.kind();
        if let Some(existing) = self.iter().find(|e| e.name() == exposure.name()) {
            return Err(Error::DuplicateExposure {
                kind: existing.kind(),
                name: exposure.name().to_string(),
            });
        }
        self.by_kind
            .entry(kind)
            .or_default()
            .insert(exposure.name().to_string(), exposure);
        Ok(())
    }

    pub(crate) fn of_kind(&self, kind: PortKind) -> impl Iterator<Item = &BoundExposure> {
        self.by_kind
            .get(&kind)
            .into_iter()
            .flat_map(IndexMap::values)
    }

    pub(crate) fn get(&self, kind: PortKind, name: &str) -> Option<&BoundExposure> {
        self.by_kind.get(&kind).and_then(|of_kind| of_kind.get(name))
    }

    /// Returns every exposure, grouped by kind in [`PortKind::ALL`] order.
    pub(crate) fn iter(&self) -> impl Iterator<Item = &BoundExposure> {
        PortKind::ALL.into_iter().flat_map(|kind| self.of_kind(kind))
    }

    /// Returns the exposures of `kind` whose internal port is `endpoint`.
    pub(crate) fn targeting<'a>(
        &'a self,
        kind: PortKind,
        endpoint: &'a Endpoint,
    ) -> impl Iterator<Item = &'a BoundExposure> {
        self.of_kind(kind)
            .filter(move |exposure| exposure.endpoint() == endpoint)
    }
}
