use braid_core::{Dimension, DynamicsError, PortKind};
use thiserror::Error;

use crate::Endpoint;

/// Errors that can occur when composing dynamics.
///
/// Every error raised while constructing a composite is fatal to that
/// construction; no partially built composite is ever returned.
#[derive(Debug, Error)]
pub enum Error {
    #[error("`{name}` is not a valid identifier: {reason}")]
    InvalidIdentifier { name: String, reason: &'static str },

    #[error("duplicate {kind} `{name}` in `{container}`")]
    DuplicateMember {
        kind: &'static str,
        name: String,
        container: String,
    },

    #[error("no {kind} named `{name}` in `{container}`")]
    MissingElement {
        kind: &'static str,
        name: String,
        container: String,
    },

    /// A connection could not resolve one of its endpoints.
    #[error("cannot bind {connection}: {reason}")]
    Binding { connection: String, reason: String },

    /// A port has the wrong direction or category for its use.
    #[error("port `{port}` is an {found}, expected {expected}")]
    PortKind {
        port: String,
        expected: &'static str,
        found: PortKind,
    },

    #[error(
        "dimension mismatch: send port `{send_port}` is {send_dimension}, \
         receive port `{receive_port}` is {receive_dimension}"
    )]
    Dimension {
        send_port: String,
        send_dimension: Dimension,
        receive_port: String,
        receive_dimension: Dimension,
    },

    /// A receive port is driven by more than one source.
    #[error("receive port `{endpoint}` is bound more than once: {reason}")]
    PortDoubleBound { endpoint: Endpoint, reason: String },

    #[error("duplicate {kind} exposure `{name}`")]
    DuplicateExposure { kind: PortKind, name: String },

    /// Zero-delay event connections feed back into an instance within one step.
    #[error("causal cycle through zero-delay event connections: {}", .instances.join(" -> "))]
    CausalCycle { instances: Vec<String> },

    /// One instance would contribute two transitions to one composite transition.
    #[error("sub-component `{instance}` contributes more than one transition to {trigger}")]
    ConflictingTransition { instance: String, trigger: String },

    #[error("unrecognized port connection {connection}")]
    UnrecognizedConnection { connection: String },

    #[error(transparent)]
    Dynamics(DynamicsError),
}

impl Error {
    pub(crate) fn missing(
        kind: &'static str,
        name: impl Into<String>,
        container: impl Into<String>,
    ) -> Self {
        Self::MissingElement {
            kind,
            name: name.into(),
            container: container.into(),
        }
    }
}

impl From<DynamicsError> for Error {
    fn from(err: DynamicsError) -> Self {
        match err {
            DynamicsError::InvalidIdentifier { name, reason } => {
                Self::InvalidIdentifier { name, reason }
            }
            DynamicsError::DuplicateMember {
                kind,
                name,
                container,
            } => Self::DuplicateMember {
                kind,
                name,
                container,
            },
            DynamicsError::MissingElement {
                kind,
                name,
                container,
            } => Self::MissingElement {
                kind,
                name,
                container,
            },
            DynamicsError::Composition(source) => match source.downcast::<Error>() {
                Ok(err) => *err,
                Err(source) => Self::Dynamics(DynamicsError::Composition(source)),
            },
            other => Self::Dynamics(other),
        }
    }
}

impl From<Error> for DynamicsError {
    /// Carries a composition error through the [`braid_core::DynamicsLike`]
    /// surface, which only speaks `DynamicsError`.
    fn from(err: Error) -> Self {
        match err {
            Error::Dynamics(inner) => inner,
            Error::MissingElement {
                kind,
                name,
                container,
            } => DynamicsError::MissingElement {
                kind,
                name,
                container,
            },
            other => DynamicsError::Composition(Box::new(other)),
        }
    }
}
