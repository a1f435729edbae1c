use std::fmt;

use braid_core::{Alias, Expression, Port, PortKind};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uom::si::{f64::Time, time::second};

use crate::{
    Endpoint, Error, Options, SubComponent,
    namespace::make_delay_trigger_name,
};

/// Something that owns sub-components that connections can bind to.
pub trait Container {
    /// Returns the name used in error messages.
    fn container_name(&self) -> &str;

    /// Returns the sub-component instance called `instance`.
    fn sub_component(&self, instance: &str) -> Option<&SubComponent>;

    /// Returns the sub-component that plays `role`.
    ///
    /// Containers without roles return `None`.
    fn role(&self, _role: &str) -> Option<&SubComponent> {
        None
    }

    /// Resolves either side of a connection.
    fn resolve(&self, participant: &Participant) -> Option<&SubComponent> {
        match participant {
            Participant::Role(role) => self.role(role),
            Participant::Instance(instance) => self.sub_component(instance),
        }
    }
}

/// How one side of a [`PortConnection`] names its sub-component.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Participant {
    /// A fixed role, such as `pre` or `post`, that the container maps to an
    /// instance.
    Role(String),
    /// An instance name.
    Instance(String),
}

impl Participant {
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Role(name) | Self::Instance(name) => name,
        }
    }
}

impl fmt::Display for Participant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Role(role) => write!(f, "<{role}>"),
            Self::Instance(instance) => f.write_str(instance),
        }
    }
}

impl From<&str> for Participant {
    fn from(instance: &str) -> Self {
        Self::Instance(instance.to_string())
    }
}

impl From<String> for Participant {
    fn from(instance: String) -> Self {
        Self::Instance(instance)
    }
}

/// Whether a connection carries a continuous value or discrete events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ConnectionKind {
    Analog,
    Event,
}

/// An unbound edge from a send port of one sub-component to a receive port of
/// another.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PortConnection {
    sender: Participant,
    send_port: String,
    receiver: Participant,
    receive_port: String,
    kind: ConnectionKind,
    delay: Time,
}

impl PortConnection {
    /// Creates an undelayed connection of the given kind.
    #[must_use]
    pub fn new(
        kind: ConnectionKind,
        sender: impl Into<Participant>,
        send_port: impl Into<String>,
        receiver: impl Into<Participant>,
        receive_port: impl Into<String>,
    ) -> Self {
        Self {
            sender: sender.into(),
            send_port: send_port.into(),
            receiver: receiver.into(),
            receive_port: receive_port.into(),
            kind,
            delay: Time::new::<second>(0.0),
        }
    }

    /// Creates a connection from an analog send port to an analog receive or
    /// reduce port.
    #[must_use]
    pub fn analog(
        sender: impl Into<Participant>,
        send_port: impl Into<String>,
        receiver: impl Into<Participant>,
        receive_port: impl Into<String>,
    ) -> Self {
        Self::new(ConnectionKind::Analog, sender, send_port, receiver, receive_port)
    }

    /// Creates a connection from an event send port to an event receive port.
    #[must_use]
    pub fn event(
        sender: impl Into<Participant>,
        send_port: impl Into<String>,
        receiver: impl Into<Participant>,
        receive_port: impl Into<String>,
    ) -> Self {
        Self::new(ConnectionKind::Event, sender, send_port, receiver, receive_port)
    }

    /// Creates a connection from `(sender, send_port, receiver, receive_port)`.
    ///
    /// A side is taken as a role if `container` knows a role by that name and
    /// as an instance otherwise. The connection is an event connection if the
    /// send port is an event port.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Binding`] if the sender or its send port cannot be
    /// found, since the kind cannot be inferred without them.
    pub fn from_compact_tuple<C: Container + ?Sized>(
        (sender, send_port, receiver, receive_port): (&str, &str, &str, &str),
        container: &C,
    ) -> Result<Self, Error> {
        let participant = |name: &str| {
            if container.role(name).is_some() {
                Participant::Role(name.to_string())
            } else {
                Participant::Instance(name.to_string())
            }
        };

        let mut connection = Self::new(
            ConnectionKind::Analog,
            participant(sender),
            send_port,
            participant(receiver),
            receive_port,
        );

        let sub_component = container
            .resolve(&connection.sender)
            .ok_or_else(|| connection.binding_error(format!("no sub-component `{sender}`")))?;
        let port = sub_component
            .port(send_port)
            .map_err(|_| connection.binding_error(format!("`{sender}` has no port `{send_port}`")))?;

        if port.kind().is_event() {
            connection.kind = ConnectionKind::Event;
        }
        Ok(connection)
    }

    /// Returns a copy that delivers events after `delay`.
    #[must_use]
    pub fn with_delay(mut self, delay: Time) -> Self {
        self.delay = delay;
        self
    }

    #[must_use]
    pub fn sender(&self) -> &Participant {
        &self.sender
    }

    #[must_use]
    pub fn send_port(&self) -> &str {
        &self.send_port
    }

    #[must_use]
    pub fn receiver(&self) -> &Participant {
        &self.receiver
    }

    #[must_use]
    pub fn receive_port(&self) -> &str {
        &self.receive_port
    }

    #[must_use]
    pub fn kind(&self) -> ConnectionKind {
        self.kind
    }

    #[must_use]
    pub fn delay(&self) -> Time {
        self.delay
    }

    /// Resolves both sides of the connection within `container`.
    ///
    /// # Errors
    ///
    /// - [`Error::Binding`] if a side or a port cannot be resolved, if both
    ///   sides are the same sub-component, or if the delay is negative,
    ///   non-finite, or set on an analog connection.
    /// - [`Error::PortKind`] if a port has the wrong direction or category.
    /// - [`Error::Dimension`] if the analog dimensions differ and
    ///   `options` asks for dimension validation.
    pub fn bind<C: Container + ?Sized>(
        &self,
        container: &C,
        options: &Options,
    ) -> Result<BoundConnection, Error> {
        let sending = container
            .resolve(&self.sender)
            .ok_or_else(|| self.binding_error(format!("no sub-component `{}`", self.sender)))?;
        let receiving = container
            .resolve(&self.receiver)
            .ok_or_else(|| self.binding_error(format!("no sub-component `{}`", self.receiver)))?;

        if sending.name() == receiving.name() {
            return Err(self.binding_error(format!(
                "sender and receiver are both `{}`",
                sending.name()
            )));
        }

        let seconds = self.delay.get::<second>();
        if !seconds.is_finite() || seconds < 0.0 {
            return Err(self.binding_error("delay must be finite and non-negative".into()));
        }
        if self.kind == ConnectionKind::Analog && seconds > 0.0 {
            return Err(self.binding_error("analog connections cannot be delayed".into()));
        }

        let sender = Endpoint::new(sending.name(), &self.send_port);
        let receiver_endpoint = Endpoint::new(receiving.name(), &self.receive_port);

        let send_port = sending
            .port(&self.send_port)
            .map_err(|_| self.binding_error(format!("no send port `{sender}`")))?;
        let receive_port = receiving
            .port(&self.receive_port)
            .map_err(|_| self.binding_error(format!("no receive port `{receiver_endpoint}`")))?;

        let (send_ok, receive_ok, send_expected, receive_expected) = match self.kind {
            ConnectionKind::Analog => (
                send_port.kind() == PortKind::AnalogSend,
                matches!(
                    receive_port.kind(),
                    PortKind::AnalogReceive | PortKind::AnalogReduce
                ),
                "an analog send port",
                "an analog receive or reduce port",
            ),
            ConnectionKind::Event => (
                send_port.kind() == PortKind::EventSend,
                receive_port.kind() == PortKind::EventReceive,
                "an event send port",
                "an event receive port",
            ),
        };
        if !send_ok {
            return Err(Error::PortKind {
                port: sender.to_string(),
                expected: send_expected,
                found: send_port.kind(),
            });
        }
        if !receive_ok {
            return Err(Error::PortKind {
                port: receiver_endpoint.to_string(),
                expected: receive_expected,
                found: receive_port.kind(),
            });
        }

        if let (Some(send_dimension), Some(receive_dimension)) =
            (send_port.dimension(), receive_port.dimension())
        {
            if send_dimension != receive_dimension {
                if options.validate_dimensions() {
                    return Err(Error::Dimension {
                        send_port: sender.to_string(),
                        send_dimension: send_dimension.clone(),
                        receive_port: receiver_endpoint.to_string(),
                        receive_dimension: receive_dimension.clone(),
                    });
                }
                warn!(
                    %sender,
                    receiver = %receiver_endpoint,
                    %send_dimension,
                    %receive_dimension,
                    "connecting ports of different dimensions"
                );
            }
        }

        debug!(connection = %self, container = container.container_name(), "bound connection");
        Ok(BoundConnection {
            sender,
            receiver: receiver_endpoint,
            send_port,
            receive_port,
            delay: self.delay,
        })
    }

    fn binding_error(&self, reason: String) -> Error {
        Error::Binding {
            connection: self.to_string(),
            reason,
        }
    }
}

impl fmt::Display for PortConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{} -> {}.{}",
            self.sender, self.send_port, self.receiver, self.receive_port
        )?;
        let seconds = self.delay.get::<second>();
        if seconds != 0.0 {
            write!(f, " after {seconds:?} s")?;
        }
        Ok(())
    }
}

/// A connection whose sides have been resolved and validated.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundConnection {
    sender: Endpoint,
    receiver: Endpoint,
    send_port: Port,
    receive_port: Port,
    delay: Time,
}

impl BoundConnection {
    #[must_use]
    pub fn sender(&self) -> &Endpoint {
        &self.sender
    }

    #[must_use]
    pub fn receiver(&self) -> &Endpoint {
        &self.receiver
    }

    #[must_use]
    pub fn send_port(&self) -> &Port {
        &self.send_port
    }

    #[must_use]
    pub fn receive_port(&self) -> &Port {
        &self.receive_port
    }

    #[must_use]
    pub fn delay(&self) -> Time {
        self.delay
    }

    /// Returns `true` for event connections with a positive delay.
    #[must_use]
    pub fn is_delayed(&self) -> bool {
        self.delay.get::<second>() > 0.0
    }

    /// Returns the name of the state variable that schedules delayed events.
    #[must_use]
    pub fn delay_trigger_name(&self) -> String {
        make_delay_trigger_name(&self.sender, &self.receiver)
    }

    /// Returns the alias that feeds an analog receive port from its sender,
    /// `receive_port__receiver := send_port__sender`.
    #[must_use]
    pub fn alias(&self) -> Alias {
        Alias::new(
            self.receiver.flat_name(),
            Expression::symbol(self.sender.flat_name()),
        )
    }
}

impl fmt::Display for BoundConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.sender, self.receiver)
    }
}
