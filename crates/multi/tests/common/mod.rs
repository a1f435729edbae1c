//! Small dynamics definitions shared by the composition tests.

#![allow(dead_code)]

use std::sync::Arc;

use braid_core::{
    Dimension, Dynamics, DynamicsLike, Expression, Parameter, Port, Regime, StateAssignment,
    StateVariable, TimeDerivative, Transition,
};

pub fn expr(text: &str) -> Expression {
    Expression::parse(text).expect("valid expression")
}

fn build(builder: braid_core::DynamicsBuilder) -> Arc<dyn DynamicsLike> {
    Arc::new(builder.build().expect("valid dynamics"))
}

/// Integrates `v` and emits `spike_out` when it crosses `theta`.
pub fn emitter() -> Arc<dyn DynamicsLike> {
    build(
        Dynamics::builder("emitter")
            .parameter(Parameter::new("rate", Dimension::per_time()))
            .parameter(Parameter::new("theta", Dimension::dimensionless()))
            .state_variable(StateVariable::new("v", Dimension::dimensionless()))
            .port(Port::event_send("spike_out"))
            .regime(
                Regime::new("default")
                    .with_time_derivative(TimeDerivative::new("v", expr("rate")))
                    .with_transition(
                        Transition::on_condition(expr("v > theta"))
                            .with_assignment(StateAssignment::new("v", expr("0")))
                            .with_output_event("spike_out"),
                    ),
            ),
    )
}

/// Counts the events arriving on `spike_in`.
pub fn receiver() -> Arc<dyn DynamicsLike> {
    build(
        Dynamics::builder("receiver")
            .state_variable(StateVariable::new("count", Dimension::dimensionless()))
            .port(Port::event_receive("spike_in"))
            .regime(
                Regime::new("default").with_transition(
                    Transition::on_event("spike_in")
                        .with_assignment(StateAssignment::new("count", expr("count + 1"))),
                ),
            ),
    )
}

/// Re-emits every event it receives.
pub fn relay() -> Arc<dyn DynamicsLike> {
    build(
        Dynamics::builder("relay")
            .port(Port::event_receive("spike_in"))
            .port(Port::event_send("spike_out"))
            .regime(
                Regime::new("default")
                    .with_transition(Transition::on_event("spike_in").with_output_event("spike_out")),
            ),
    )
}

/// Sends its voltage `V`.
pub fn voltage_source() -> Arc<dyn DynamicsLike> {
    build(
        Dynamics::builder("voltage_source")
            .state_variable(StateVariable::new("V", Dimension::voltage()))
            .port(Port::analog_send("V", Dimension::voltage())),
    )
}

/// Sends its current `i`.
pub fn current_source() -> Arc<dyn DynamicsLike> {
    build(
        Dynamics::builder("current_source")
            .state_variable(StateVariable::new("i", Dimension::current()))
            .port(Port::analog_send("i", Dimension::current())),
    )
}

/// Receives a single current on `i_in`.
pub fn current_sink() -> Arc<dyn DynamicsLike> {
    build(
        Dynamics::builder("current_sink")
            .state_variable(StateVariable::new("q", Dimension::dimensionless()))
            .port(Port::analog_receive("i_in", Dimension::current()))
            .regime(
                Regime::new("default").with_time_derivative(TimeDerivative::new("q", expr("i_in"))),
            ),
    )
}

/// Relaxes `v` towards the voltage received on `v_in`.
pub fn follower() -> Arc<dyn DynamicsLike> {
    build(
        Dynamics::builder("follower")
            .parameter(Parameter::new("tau", Dimension::time()))
            .state_variable(StateVariable::new("v", Dimension::voltage()))
            .port(Port::analog_receive("v_in", Dimension::voltage()))
            .port(Port::analog_send("v", Dimension::voltage()))
            .regime(
                Regime::new("default")
                    .with_time_derivative(TimeDerivative::new("v", expr("(v_in - v) / tau"))),
            ),
    )
}

/// Charges `v` with the sum of the currents on `i_syn`.
pub fn reducer() -> Arc<dyn DynamicsLike> {
    build(
        Dynamics::builder("reducer")
            .parameter(Parameter::new("c", Dimension::capacitance()))
            .state_variable(StateVariable::new("v", Dimension::voltage()))
            .port(Port::analog_reduce("i_syn", Dimension::current()))
            .regime(
                Regime::new("default")
                    .with_time_derivative(TimeDerivative::new("v", expr("i_syn / c"))),
            ),
    )
}

/// Emits `done` once time passes ten.
pub fn timer() -> Arc<dyn DynamicsLike> {
    build(
        Dynamics::builder("timer")
            .state_variable(StateVariable::new("fired", Dimension::dimensionless()))
            .port(Port::event_send("done"))
            .regime(
                Regime::new("default").with_transition(
                    Transition::on_condition(expr("t > 10"))
                        .with_assignment(StateAssignment::new("fired", expr("1")))
                        .with_output_event("done"),
                ),
            ),
    )
}

/// Switches between `off` and `on` on every `flip`, emitting `flipped`.
pub fn toggle() -> Arc<dyn DynamicsLike> {
    build(
        Dynamics::builder("toggle")
            .port(Port::event_receive("flip"))
            .port(Port::event_send("flipped"))
            .regime(
                Regime::new("off").with_transition(
                    Transition::on_event("flip")
                        .with_output_event("flipped")
                        .with_target("on"),
                ),
            )
            .regime(
                Regime::new("on").with_transition(
                    Transition::on_event("flip")
                        .with_output_event("flipped")
                        .with_target("off"),
                ),
            ),
    )
}

/// Forwards events from `in1` to `out1` and only counts those on `in2`.
pub fn junction() -> Arc<dyn DynamicsLike> {
    build(
        Dynamics::builder("junction")
            .state_variable(StateVariable::new("count", Dimension::dimensionless()))
            .port(Port::event_receive("in1"))
            .port(Port::event_receive("in2"))
            .port(Port::event_send("out1"))
            .regime(
                Regime::new("default")
                    .with_transition(Transition::on_event("in1").with_output_event("out1"))
                    .with_transition(
                        Transition::on_event("in2")
                            .with_assignment(StateAssignment::new("count", expr("count + 1"))),
                    ),
            ),
    )
}
