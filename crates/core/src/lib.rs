//! Hybrid-automaton dynamics definitions for the Braid framework.
//!
//! This crate defines the component model that composites are built from:
//!
//! - [`Dynamics`]: a validated primitive definition with parameters,
//!   aliases, constants, state variables, regimes and ports
//! - [`Regime`] and [`Transition`]: discrete modes and the jumps between them
//! - [`Port`] and [`Dimension`]: typed interface points
//! - [`Expression`]: structurally comparable expressions over named symbols
//! - [`DynamicsLike`], [`RegimeLike`], [`TransitionLike`]: the read surface
//!   shared by primitive and composite definitions

mod dimension;
mod dynamics;
mod error;
mod expression;
mod member;
mod port;
mod regime;
mod transition;

pub mod identifier;
pub mod traits;

pub use dimension::Dimension;
pub use dynamics::{DEFAULT_REGIME, Dynamics, DynamicsBuilder};
pub use error::DynamicsError;
pub use expression::{Comparison, Expression};
pub use member::{Alias, Constant, Parameter, StateAssignment, StateVariable, TimeDerivative};
pub use port::{Port, PortKind, ReduceOperator};
pub use regime::Regime;
pub use traits::{DynamicsLike, Members, RegimeLike, TransitionLike};
pub use transition::{Transition, Trigger};
