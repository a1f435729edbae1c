use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::Dimension;

/// The direction and category of a [`Port`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum PortKind {
    AnalogSend,
    AnalogReceive,
    AnalogReduce,
    EventSend,
    EventReceive,
}

impl PortKind {
    /// All kinds, in declaration order.
    pub const ALL: [PortKind; 5] = [
        Self::AnalogSend,
        Self::AnalogReceive,
        Self::AnalogReduce,
        Self::EventSend,
        Self::EventReceive,
    ];

    #[must_use]
    pub fn is_analog(self) -> bool {
        matches!(
            self,
            Self::AnalogSend | Self::AnalogReceive | Self::AnalogReduce
        )
    }

    #[must_use]
    pub fn is_event(self) -> bool {
        !self.is_analog()
    }

    #[must_use]
    pub fn is_send(self) -> bool {
        matches!(self, Self::AnalogSend | Self::EventSend)
    }

    #[must_use]
    pub fn is_receive(self) -> bool {
        !self.is_send()
    }

    /// Returns a human-readable name, such as `"analog receive port"`.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AnalogSend => "analog send port",
            Self::AnalogReceive => "analog receive port",
            Self::AnalogReduce => "analog reduce port",
            Self::EventSend => "event send port",
            Self::EventReceive => "event receive port",
        }
    }
}

impl fmt::Display for PortKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The operator an analog reduce port uses to aggregate its inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ReduceOperator {
    #[default]
    Add,
}

/// A named interface point of a dynamics definition.
///
/// Analog ports carry a [`Dimension`]; event ports carry none. Reduce ports
/// also carry the [`ReduceOperator`] used to combine their inputs.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Port {
    name: String,
    kind: PortKind,
    dimension: Option<Dimension>,
    operator: Option<ReduceOperator>,
}

impl Port {
    #[must_use]
    pub fn analog_send(name: impl Into<String>, dimension: Dimension) -> Self {
        Self::analog(name, PortKind::AnalogSend, dimension)
    }

    #[must_use]
    pub fn analog_receive(name: impl Into<String>, dimension: Dimension) -> Self {
        Self::analog(name, PortKind::AnalogReceive, dimension)
    }

    #[must_use]
    pub fn analog_reduce(name: impl Into<String>, dimension: Dimension) -> Self {
        Self {
            operator: Some(ReduceOperator::Add),
            ..Self::analog(name, PortKind::AnalogReduce, dimension)
        }
    }

    #[must_use]
    pub fn event_send(name: impl Into<String>) -> Self {
        Self::event(name, PortKind::EventSend)
    }

    #[must_use]
    pub fn event_receive(name: impl Into<String>) -> Self {
        Self::event(name, PortKind::EventReceive)
    }

    fn analog(name: impl Into<String>, kind: PortKind, dimension: Dimension) -> Self {
        Self {
            name: name.into(),
            kind,
            dimension: Some(dimension),
            operator: None,
        }
    }

    fn event(name: impl Into<String>, kind: PortKind) -> Self {
        Self {
            name: name.into(),
            kind,
            dimension: None,
            operator: None,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn kind(&self) -> PortKind {
        self.kind
    }

    /// Returns the dimension of an analog port, or `None` for event ports.
    #[must_use]
    pub fn dimension(&self) -> Option<&Dimension> {
        self.dimension.as_ref()
    }

    /// Returns the aggregation operator of a reduce port.
    #[must_use]
    pub fn operator(&self) -> Option<ReduceOperator> {
        self.operator
    }

    /// Returns the same port under a different name.
    #[must_use]
    pub fn renamed(&self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..self.clone()
        }
    }
}
