use std::error::Error as StdError;

use thiserror::Error;

/// Errors raised while defining or querying a dynamics description.
#[derive(Debug, Error)]
pub enum DynamicsError {
    /// A name does not satisfy the identifier rules.
    #[error("`{name}` is not a valid identifier: {reason}")]
    InvalidIdentifier { name: String, reason: &'static str },

    /// Two members of the same namespace share a name.
    #[error("duplicate {kind} `{name}` in `{container}`")]
    DuplicateMember {
        kind: &'static str,
        name: String,
        container: String,
    },

    /// A named lookup found nothing.
    #[error("no {kind} named `{name}` in `{container}`")]
    MissingElement {
        kind: &'static str,
        name: String,
        container: String,
    },

    /// An expression references a symbol the dynamics does not define.
    #[error("symbol `{symbol}` in {context} of `{container}` does not resolve")]
    UnresolvedSymbol {
        symbol: String,
        context: String,
        container: String,
    },

    /// The expression text could not be tokenized.
    #[error("invalid expression `{text}`: {reason}")]
    InvalidExpression { text: String, reason: String },

    /// A member refers to something of the wrong kind.
    ///
    /// For example, an `OnEvent` triggered by a port that is not an event
    /// receive port.
    #[error("{member} in `{container}` must refer to {expected}")]
    InvalidReference {
        member: String,
        expected: &'static str,
        container: String,
    },

    /// A composite definition failed while producing its flattened view.
    #[error("composition failed: {0}")]
    Composition(#[source] Box<dyn StdError + Send + Sync>),
}

impl DynamicsError {
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

    pub(crate) fn duplicate(
        kind: &'static str,
        name: impl Into<String>,
        container: impl Into<String>,
    ) -> Self {
        Self::DuplicateMember {
            kind,
            name: name.into(),
            container: container.into(),
        }
    }
}
