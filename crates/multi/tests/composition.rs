mod common;

use std::{collections::HashSet, sync::Arc};

use approx::assert_relative_eq;
use braid_core::{
    Comparison, Dimension, DynamicsError, DynamicsLike, Expression, PortKind, Regime, RegimeLike,
    TransitionLike, Trigger,
};
use braid_multi::{
    Endpoint, Error, ExposureSpec, MultiDynamics, MultiTransition, Options, Participant,
    PortConnection, PortExposure, SubTransition, namespace::DELAY_TRIGGER_PREFIX,
};
use uom::si::{f64::Time, time::second};

use common::*;

fn instances<'a>(transition: &MultiTransition<'a>) -> Vec<&'a str> {
    transition
        .sub_transitions()
        .iter()
        .map(SubTransition::instance)
        .collect()
}

fn condition(text: &str) -> Trigger {
    Trigger::Condition {
        condition: expr(text),
    }
}

#[test]
fn zero_delay_events_chain_into_one_transition() {
    let multi = MultiDynamics::builder("pair")
        .sub_component("a", emitter())
        .sub_component("b", receiver())
        .connection(("a", "spike_out", "b", "spike_in"))
        .build()
        .expect("valid composite");

    assert!(
        multi
            .state_variables()
            .all(|sv| !sv.name().starts_with(DELAY_TRIGGER_PREFIX))
    );
    assert_eq!(multi.num_regimes(), 1);

    let regime = multi.regimes().next().expect("one regime");
    assert_eq!(regime.name(), "default__a___default__b");
    assert_eq!(regime.num_on_events(), 0);

    let transitions = regime
        .on_conditions()
        .collect::<Result<Vec<_>, _>>()
        .expect("transitions merge");
    assert_eq!(transitions.len(), 1);

    let fire = &transitions[0];
    assert_eq!(fire.trigger(), &condition("v__a > theta__a"));
    assert_eq!(instances(fire), ["a", "b"]);
    assert_eq!(
        fire.state_assignment("v__a").expect("own assignment").rhs(),
        &expr("0")
    );
    assert_eq!(
        fire.state_assignment("count__b")
            .expect("chained assignment")
            .rhs(),
        &expr("count__b + 1")
    );
    assert_eq!(fire.num_output_events(), 0);
    assert!(fire.target_regime().is_none());
}

#[test]
fn delayed_events_schedule_a_trigger_variable() {
    let multi = MultiDynamics::builder("pair")
        .sub_component("a", emitter())
        .sub_component("b", receiver())
        .connection(
            PortConnection::event("a", "spike_out", "b", "spike_in")
                .with_delay(Time::new::<second>(5.0)),
        )
        .build()
        .expect("valid composite");

    let delay_name = "_delay__a__spike_out__b__spike_in";
    let delay_variables: Vec<_> = multi
        .state_variables()
        .filter(|sv| sv.name().starts_with(DELAY_TRIGGER_PREFIX))
        .collect();
    assert_eq!(delay_variables.len(), 1);
    assert_eq!(delay_variables[0].name(), delay_name);
    assert_eq!(delay_variables[0].dimension(), &Dimension::time());
    assert!(multi.state_variable(delay_name).is_ok());

    let connection = multi.delayed_connections().next().expect("one delayed connection");
    assert_relative_eq!(connection.delay().get::<second>(), 5.0);
    assert_eq!(multi.zero_delay_connections().count(), 0);

    let regime = multi.regimes().next().expect("one regime");
    let transitions = regime
        .on_conditions()
        .collect::<Result<Vec<_>, _>>()
        .expect("transitions merge");
    assert_eq!(transitions.len(), 2);

    let fire = transitions
        .iter()
        .find(|t| t.trigger() == &condition("v__a > theta__a"))
        .expect("emitter transition");
    assert_eq!(instances(fire), ["a"]);
    let schedule = fire.state_assignments().next().expect("assignments");
    assert_eq!(schedule.variable(), delay_name);
    assert_eq!(schedule.rhs(), &expr("t + 5.0"));

    let deliver = transitions
        .iter()
        .find(|t| t.sub_transition("b").is_ok())
        .expect("delivery transition");
    assert_eq!(
        deliver.trigger(),
        &Trigger::Condition {
            condition: Expression::compare(
                Expression::symbol("t"),
                Comparison::Greater,
                Expression::symbol(delay_name),
            ),
        }
    );
    assert!(deliver.state_assignment("count__b").is_ok());
    assert!(deliver.state_assignment(delay_name).is_err());
}

#[test]
fn analog_dimensions_must_match() {
    let build = |options| {
        MultiDynamics::builder("mismatch")
            .sub_component("s", voltage_source())
            .sub_component("k", current_sink())
            .connection(("s", "V", "k", "i_in"))
            .options(options)
            .build()
    };

    let err = build(Options::default()).unwrap_err();
    assert!(
        matches!(err, Error::Dimension { .. }),
        "unexpected error: {err}"
    );

    let multi = build(Options::permissive()).expect("dimensions are not checked");
    assert_eq!(
        multi.alias("i_in__k").expect("connection alias").rhs(),
        &expr("V__s")
    );
}

#[test]
fn analog_receive_ports_take_one_connection() {
    let err = MultiDynamics::builder("crowded")
        .sub_component("s1", voltage_source())
        .sub_component("s2", voltage_source())
        .sub_component("f", follower())
        .connection(("s1", "V", "f", "v_in"))
        .connection(("s2", "V", "f", "v_in"))
        .build()
        .unwrap_err();

    let Error::PortDoubleBound { endpoint, .. } = err else {
        panic!("unexpected error: {err}");
    };
    assert_eq!(endpoint, Endpoint::new("f", "v_in"));
}

#[test]
fn analog_reduce_ports_sum_every_connection() {
    let multi = MultiDynamics::builder("summing")
        .sub_component("s1", current_source())
        .sub_component("s2", current_source())
        .sub_component("s3", current_source())
        .sub_component("r", reducer())
        .connection(("s1", "i", "r", "i_syn"))
        .connection(("s2", "i", "r", "i_syn"))
        .connection(("s3", "i", "r", "i_syn"))
        .build()
        .expect("reduce ports accept any number of inputs");

    assert_eq!(multi.reduce_connections().count(), 3);
    assert_eq!(
        multi.alias("i_syn__r").expect("aggregation alias").rhs(),
        &expr("i__s1 + i__s2 + i__s3")
    );
}

#[test]
fn zero_delay_cycles_are_rejected() {
    let err = MultiDynamics::builder("ring")
        .sub_component("a", relay())
        .sub_component("b", relay())
        .sub_component("c", relay())
        .connection(("a", "spike_out", "b", "spike_in"))
        .connection(("b", "spike_out", "c", "spike_in"))
        .connection(("c", "spike_out", "a", "spike_in"))
        .build()
        .unwrap_err();

    let Error::CausalCycle { instances } = err else {
        panic!("unexpected error: {err}");
    };
    assert_eq!(instances.len(), 4);
    assert_eq!(instances.first(), instances.last());
    let unique: HashSet<_> = instances.iter().map(String::as_str).collect();
    assert_eq!(unique, HashSet::from(["a", "b", "c"]));
}

#[test]
fn delayed_cycles_are_allowed() {
    let multi = MultiDynamics::builder("ring")
        .sub_component("a", relay())
        .sub_component("b", relay())
        .connection(("a", "spike_out", "b", "spike_in"))
        .connection(
            PortConnection::event("b", "spike_out", "a", "spike_in")
                .with_delay(Time::new::<second>(1.0)),
        )
        .build()
        .expect("the delay breaks the cycle");
    assert_eq!(multi.delayed_connections().count(), 1);
}

#[test]
fn exposure_errors() {
    let missing = MultiDynamics::builder("pair")
        .sub_component("a", emitter())
        .exposure(PortExposure::event_send("spike", "a", "missing"))
        .build();
    assert!(matches!(missing, Err(Error::MissingElement { .. })));

    let missing_compact = MultiDynamics::builder("pair")
        .sub_component("a", emitter())
        .exposure(("spike", "z", "spike_out"))
        .build();
    assert!(matches!(missing_compact, Err(Error::MissingElement { .. })));

    let duplicate = MultiDynamics::builder("pair")
        .sub_component("a", emitter())
        .sub_component("c", emitter())
        .exposure(("spike", "a", "spike_out"))
        .exposure(("spike", "c", "spike_out"))
        .build();
    assert!(matches!(
        duplicate,
        Err(Error::DuplicateExposure {
            kind: PortKind::EventSend,
            ..
        })
    ));
}

#[test]
fn composites_nest() {
    let inner = MultiDynamics::builder("inner")
        .sub_component("a", emitter())
        .sub_component("b", receiver())
        .connection(("a", "spike_out", "b", "spike_in"))
        .exposure(("spike", "a", "spike_out"))
        .build()
        .expect("valid inner composite");
    assert_eq!(inner.port("spike").expect("exposed").kind(), PortKind::EventSend);

    let outer = MultiDynamics::builder("outer")
        .sub_component("net", Arc::new(inner))
        .sub_component("c", receiver())
        .connection(("net", "spike", "c", "spike_in"))
        .build()
        .expect("valid outer composite");

    let state_variables: Vec<_> = outer
        .state_variables()
        .map(|sv| sv.name().to_string())
        .collect();
    assert_eq!(state_variables, ["v__a__net", "count__b__net", "count__c"]);
    assert_eq!(
        outer.parameter("theta__a__net").expect("nested lookup").name(),
        "theta__a__net"
    );

    let regime = outer.regimes().next().expect("one regime");
    assert_eq!(regime.name(), "default__c___default__a___default__b__net");
    assert!(
        RegimeLike::time_derivative(&regime, "v__a__net").is_ok(),
        "nested time derivative"
    );

    let transitions = regime
        .on_conditions()
        .collect::<Result<Vec<_>, _>>()
        .expect("transitions merge");
    assert_eq!(transitions.len(), 1);
    let fire = &transitions[0];
    assert_eq!(fire.trigger(), &condition("v__a__net > theta__a__net"));
    assert_eq!(instances(fire), ["net", "c"]);
    assert!(fire.state_assignment("count__b__net").is_ok());
    assert!(fire.state_assignment("count__c").is_ok());

    let flattened = DynamicsLike::regimes(&outer)
        .collect::<Result<Vec<Regime>, _>>()
        .expect("flattens");
    assert_eq!(flattened.len(), 1);
    assert_eq!(flattened[0].on_conditions().count(), 1);
}

#[test]
fn structurally_equal_conditions_fire_together() {
    let multi = MultiDynamics::builder("timers")
        .sub_component("a", timer())
        .sub_component("b", timer())
        .exposure(("done_a", "a", "done"))
        .build()
        .expect("valid composite");

    let regime = multi.regimes().next().expect("one regime");
    let transitions = regime
        .on_conditions()
        .collect::<Result<Vec<_>, _>>()
        .expect("transitions merge");
    assert_eq!(transitions.len(), 1);

    let fire = &transitions[0];
    assert_eq!(fire.trigger(), &condition("t > 10"));
    assert_eq!(instances(fire), ["a", "b"]);
    assert_eq!(fire.output_events().collect::<Vec<_>>(), ["done_a"]);
    assert!(fire.output_event("done_a").is_ok());
    assert!(fire.output_event("done_b").is_err());
}

#[test]
fn an_instance_fires_once_per_transition() {
    let multi = MultiDynamics::builder("diamond")
        .sub_component("a", emitter())
        .sub_component("b", relay())
        .sub_component("c", relay())
        .sub_component("d", receiver())
        .connection(("a", "spike_out", "b", "spike_in"))
        .connection(("a", "spike_out", "c", "spike_in"))
        .connection(("b", "spike_out", "d", "spike_in"))
        .connection(("c", "spike_out", "d", "spike_in"))
        .build()
        .expect("no cycle, so construction succeeds");

    let regime = multi.regimes().next().expect("one regime");
    let err = regime
        .on_conditions()
        .next()
        .expect("one on-condition")
        .unwrap_err();
    assert!(
        matches!(&err, Error::ConflictingTransition { instance, .. } if instance == "d"),
        "unexpected error: {err}"
    );

    let flattened = DynamicsLike::regimes(&multi)
        .next()
        .expect("one regime")
        .unwrap_err();
    assert!(matches!(flattened, DynamicsError::Composition(_)));
    assert!(matches!(
        Error::from(flattened),
        Error::ConflictingTransition { .. }
    ));
}

#[test]
fn target_regime_moves_every_contributor() {
    let multi = MultiDynamics::builder("toggles")
        .sub_component("x", toggle())
        .sub_component("y", toggle())
        .connection(("x", "flipped", "y", "flip"))
        .exposure(("flip", "x", "flip"))
        .exposure(("flipped_out", "y", "flipped"))
        .build()
        .expect("valid composite");
    assert_eq!(multi.num_regimes(), 4);
    assert_eq!(multi.regimes().count(), 4);

    let both_off = multi.regime("off__x___off__y").expect("regime exists");
    let transitions = both_off
        .on_events()
        .collect::<Result<Vec<_>, _>>()
        .expect("transitions merge");
    assert_eq!(transitions.len(), 1);

    let flip = &transitions[0];
    assert_eq!(
        flip.trigger(),
        &Trigger::Event {
            port: "flip".into()
        }
    );
    assert_eq!(instances(flip), ["x", "y"]);
    assert_eq!(flip.target_regime().as_deref(), Some("on__x___on__y"));
    assert_eq!(flip.output_events().collect::<Vec<_>>(), ["flipped_out"]);

    let mixed = multi.regime("on__x___off__y").expect("regime exists");
    let flip = mixed
        .on_events()
        .next()
        .expect("one on-event")
        .expect("transitions merge");
    assert_eq!(flip.to_transition().target(), Some("off__x___on__y"));

    let names: HashSet<String> = multi.regimes().map(|r| r.name()).collect();
    for regime in DynamicsLike::regimes(&multi) {
        let regime = regime.expect("flattens");
        for transition in regime.transitions() {
            let target = transition.target().expect("every flip changes regime");
            assert!(names.contains(target), "unknown target {target}");
        }
    }
}

#[test]
fn analog_exposures_alias_the_internal_ports() {
    let multi = MultiDynamics::builder("exposed")
        .sub_component("s", voltage_source())
        .sub_component("f", follower())
        .exposure(PortExposure::analog_send("v_out", "s", "V"))
        .exposure(PortExposure::analog_receive("v_ext", "f", "v_in"))
        .build()
        .expect("valid composite");

    assert_eq!(multi.alias("v_out").expect("send alias").rhs(), &expr("V__s"));
    assert_eq!(
        multi.alias("v_in__f").expect("receive alias").rhs(),
        &expr("v_ext")
    );

    let port = multi.port("v_ext").expect("exposed");
    assert_eq!(port.kind(), PortKind::AnalogReceive);
    assert_eq!(port.dimension(), Some(&Dimension::voltage()));
    assert_eq!(DynamicsLike::ports(&multi).count(), 2);
    assert_eq!(
        multi
            .ports_of_kind(PortKind::AnalogSend)
            .map(|p| p.name().to_string())
            .collect::<Vec<_>>(),
        ["v_out"]
    );

    let err = MultiDynamics::builder("exposed")
        .sub_component("s", voltage_source())
        .sub_component("f", follower())
        .connection(("s", "V", "f", "v_in"))
        .exposure(PortExposure::analog_receive("v_ext", "f", "v_in"))
        .build()
        .unwrap_err();
    assert!(matches!(err, Error::PortDoubleBound { .. }));
}

#[test]
fn shadowed_event_receive_exposures_depend_on_options() {
    let build = |options| {
        MultiDynamics::builder("shadow")
            .sub_component("a", emitter())
            .sub_component("b", receiver())
            .connection(("a", "spike_out", "b", "spike_in"))
            .exposure(("ext_spike", "b", "spike_in"))
            .options(options)
            .build()
    };

    assert!(matches!(
        build(Options::default()),
        Err(Error::PortDoubleBound { .. })
    ));

    let multi = build(Options::permissive()).expect("only a warning");
    let regime = multi.regimes().next().expect("one regime");
    let on_event = regime
        .on_events()
        .next()
        .expect("one on-event")
        .expect("transitions merge");
    assert_eq!(
        on_event.trigger(),
        &Trigger::Event {
            port: "ext_spike".into()
        }
    );
}

#[test]
fn connections_resolve_roles() {
    let multi = MultiDynamics::builder("projection")
        .sub_component("a", emitter())
        .sub_component("b", receiver())
        .role("pre", "a")
        .role("post", "b")
        .connection(PortConnection::event(
            Participant::Role("pre".into()),
            "spike_out",
            Participant::Role("post".into()),
            "spike_in",
        ))
        .build()
        .expect("valid composite");

    let connection = multi.zero_delay_connections().next().expect("one connection");
    assert_eq!(connection.sender(), &Endpoint::new("a", "spike_out"));
    assert_eq!(connection.receiver(), &Endpoint::new("b", "spike_in"));
}

#[test]
fn constructor_and_lookups() {
    let multi = MultiDynamics::new(
        "pair",
        [("a", emitter()), ("b", receiver())],
        [("a", "spike_out", "b", "spike_in")],
        Vec::<ExposureSpec>::new(),
    )
    .expect("valid composite");

    assert_eq!(multi.num_sub_components(), 2);
    assert_eq!(
        multi.parameter("theta__a").expect("defined").dimension(),
        &Dimension::dimensionless()
    );
    assert!(matches!(
        multi.parameter("theta__z"),
        Err(Error::MissingElement { .. })
    ));
    assert!(matches!(
        multi.constant("c__a"),
        Err(Error::MissingElement { .. })
    ));
    assert!(matches!(
        DynamicsLike::state_variable(&multi, "nope"),
        Err(DynamicsError::MissingElement { .. })
    ));
    assert!(matches!(
        multi.regime("missing"),
        Err(Error::MissingElement { .. })
    ));

    let regime = multi.regimes().next().expect("one regime");
    assert!(RegimeLike::time_derivative(&regime, "v__a").is_ok());
    assert!(RegimeLike::time_derivative(&regime, "count__b").is_err());
    assert!(regime.sub_regime("b").is_ok());
}

#[test]
fn reentering_an_instance_through_another_port_is_a_cycle() {
    let build = |feedback: PortConnection| {
        MultiDynamics::builder("loop")
            .sub_component("a", emitter())
            .sub_component("b", junction())
            .sub_component("c", relay())
            .connection(("a", "spike_out", "b", "in1"))
            .connection(("b", "out1", "c", "spike_in"))
            .connection(feedback)
            .build()
    };

    let err = build(PortConnection::event("c", "spike_out", "b", "in2")).unwrap_err();
    let Error::CausalCycle { instances } = err else {
        panic!("unexpected error: {err}");
    };
    assert_eq!(instances.len(), 3);
    assert_eq!(instances.first(), instances.last());
    let unique: HashSet<_> = instances.iter().map(String::as_str).collect();
    assert_eq!(unique, HashSet::from(["b", "c"]));

    let multi = build(
        PortConnection::event("c", "spike_out", "b", "in2").with_delay(Time::new::<second>(1.0)),
    )
    .expect("the delay breaks the cycle");
    let flattened = DynamicsLike::regimes(&multi)
        .collect::<Result<Vec<Regime>, _>>()
        .expect("every transition merges");
    assert_eq!(flattened.len(), 1);
}

#[test]
fn regime_count_saturates() {
    let toggles = |count: usize| {
        (0..count)
            .fold(MultiDynamics::builder("bank"), |builder, i| {
                builder.sub_component(format!("x{i}"), toggle())
            })
            .build()
            .expect("valid composite")
    };

    assert_eq!(toggles(3).num_regimes(), 8);

    let bank = toggles(65);
    assert_eq!(bank.num_regimes(), usize::MAX);
    assert_eq!(DynamicsLike::num_regimes(&bank), usize::MAX);
    assert!(bank.regimes().next().is_some());
}

#[test]
fn exposed_names_are_unique_across_kinds() {
    let err = MultiDynamics::builder("mixed")
        .sub_component("s", voltage_source())
        .sub_component("a", emitter())
        .exposure(("x", "s", "V"))
        .exposure(("x", "a", "spike_out"))
        .build()
        .unwrap_err();
    assert!(
        matches!(&err, Error::DuplicateExposure { name, .. } if name == "x"),
        "unexpected error: {err}"
    );
}

#[test]
fn regimes_are_found_by_name() {
    let multi = MultiDynamics::builder("toggles")
        .sub_component("y", toggle())
        .sub_component("x", toggle())
        .build()
        .expect("valid composite");

    for regime in multi.regimes() {
        let found = multi.regime(&regime.name()).expect("regime exists");
        assert_eq!(found.name(), regime.name());
        for instance in ["x", "y"] {
            assert_eq!(
                found.sub_regime(instance).expect("instance").name(),
                regime.sub_regime(instance).expect("instance").name()
            );
        }
    }

    let mixed = multi.regime("on__x___off__y").expect("regime exists");
    assert_eq!(mixed.sub_regime("x").expect("instance").name(), "on");
    assert_eq!(mixed.sub_regime("y").expect("instance").name(), "off");

    for name in ["on__x", "off__y___on__x", "on__x___off__y___", "on__x___off__z", ""] {
        assert!(
            matches!(multi.regime(name), Err(Error::MissingElement { .. })),
            "`{name}` should not resolve"
        );
    }
}

#[test]
fn nested_regimes_are_found_by_name() {
    let inner = MultiDynamics::builder("inner")
        .sub_component("p", toggle())
        .sub_component("q", toggle())
        .build()
        .expect("valid inner composite");
    let outer = MultiDynamics::builder("outer")
        .sub_component("net", Arc::new(inner))
        .sub_component("r", toggle())
        .build()
        .expect("valid outer composite");
    assert_eq!(outer.num_regimes(), 8);

    let name = "on__p___off__q__net___off__r";
    let regime = outer.regime(name).expect("regime exists");
    assert_eq!(regime.name(), name);
    assert_eq!(
        regime.sub_regime("net").expect("instance").name(),
        "on__p___off__q"
    );
}
