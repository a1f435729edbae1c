//! Composition of dynamics definitions for the Braid framework.
//!
//! A [`MultiDynamics`] wires named instances of other definitions together:
//!
//! - [`PortConnection`]: links a send port of one instance to a receive port
//!   of another, optionally delaying events
//! - [`PortExposure`]: makes an internal port a port of the composite
//! - [`MultiRegime`]: one combination of the instances' regimes
//! - [`MultiTransition`]: the transitions that fire together when an event
//!   propagates through zero-delay connections
//!
//! The composite flattens every member into a single namespace (see
//! [`namespace`]) and implements [`braid_core::DynamicsLike`], so it can be
//! used wherever a primitive definition is expected, including inside
//! another composite.

mod config;
mod connection;
mod endpoint;
mod error;
mod exposure;
mod graph;
mod multi_dynamics;
mod regime;
mod sub_component;
mod transition;

pub mod namespace;

pub use config::Options;
pub use connection::{BoundConnection, ConnectionKind, Container, Participant, PortConnection};
pub use endpoint::Endpoint;
pub use error::Error;
pub use exposure::{BoundExposure, PortExposure};
pub use multi_dynamics::{
    ConnectionSpec, ExposureSpec, MultiDynamics, MultiDynamicsBuilder, Regimes,
};
pub use regime::{MultiRegime, SubRegime};
pub use sub_component::SubComponent;
pub use transition::{DaisyChain, MultiTransition, SubTransition};
