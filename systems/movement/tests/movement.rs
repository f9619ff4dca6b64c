use std::time::Duration;

use cityroute_core::{
    BlockCoord, ExclusionSet, MovementError, MovementEvent, MovementHandle, MovementPhase, Point,
};
use cityroute_system_movement::{MovementConfig, MovementConfigError, MovementSimulator};
use cityroute_system_pathfinding::find_path;
use cityroute_world::Topology;

const EPSILON: f64 = 1e-9;

fn simulator() -> MovementSimulator {
    MovementSimulator::new(Topology::default(), MovementConfig::default())
        .expect("default config is valid")
}

fn at(millis: u64) -> Duration {
    Duration::from_millis(millis)
}

fn route_distance(events: &[MovementEvent]) -> f64 {
    events
        .iter()
        .find_map(|event| match event {
            MovementEvent::Started { route_distance, .. } => Some(*route_distance),
            _ => None,
        })
        .expect("movement should have started")
}

fn walk_to_completion(simulator: &mut MovementSimulator, handle: MovementHandle) {
    let mut events = Vec::new();
    let mut now = 0;
    while simulator.phase() != MovementPhase::Idle {
        let _ = simulator
            .tick(handle, at(now), &mut events)
            .expect("handle stays valid until idle");
        now += 100;
        assert!(now < 120_000, "movement never settled");
    }
}

#[test]
fn concrete_scenario_arrives_with_route_cost_deducted() {
    let mut simulator = simulator();
    let mut events = Vec::new();
    let start = Point::new(0.5, 0.5);

    let handle = simulator
        .start_movement(start, BlockCoord::new(2, 2), &ExclusionSet::new(), 10.0, &mut events)
        .expect("movement accepted");
    let total = route_distance(&events);
    assert!((total - 4.0).abs() < EPSILON);
    assert_eq!(simulator.phase(), MovementPhase::Moving);

    let first = simulator.tick(handle, at(1_000), &mut events).expect("tick");
    assert_eq!(first.position, start);
    assert_eq!(first.phase, MovementPhase::Moving);

    // ten energy is below the exhaustion threshold: one block per second
    let halfway = simulator.tick(handle, at(3_000), &mut events).expect("tick");
    assert_eq!(halfway.phase, MovementPhase::Moving);
    assert!((halfway.energy_remaining - 8.0).abs() < EPSILON);

    let arrived = simulator.tick(handle, at(5_000), &mut events).expect("tick");
    assert_eq!(arrived.phase, MovementPhase::Arriving);
    assert_eq!(arrived.position, Point::new(2.5, 2.5));
    assert_eq!(arrived.trail.last(), Some(&Point::new(2.5, 2.5)));
    assert!((10.0 - arrived.energy_remaining - total).abs() < EPSILON);

    let arrivals = events
        .iter()
        .filter(|event| matches!(event, MovementEvent::Arrived { .. }))
        .count();
    assert_eq!(arrivals, 1);

    let settled = simulator.tick(handle, at(5_250), &mut events).expect("tick");
    assert_eq!(settled.phase, MovementPhase::Idle);
    assert!((simulator.energy() - 6.0).abs() < EPSILON);
    assert_eq!(
        simulator.tick(handle, at(5_300), &mut events),
        Err(MovementError::UnknownHandle { handle })
    );
}

#[test]
fn cancel_charges_only_the_distance_covered() {
    let mut simulator = simulator();
    let mut events = Vec::new();

    let handle = simulator
        .start_movement(
            Point::new(0.5, 0.5),
            BlockCoord::new(5, 4),
            &ExclusionSet::new(),
            50.0,
            &mut events,
        )
        .expect("movement accepted");
    let total = route_distance(&events);

    let _ = simulator.tick(handle, at(0), &mut events).expect("tick");
    let moving = simulator.tick(handle, at(1_500), &mut events).expect("tick");
    assert_eq!(moving.phase, MovementPhase::Moving);

    let settled = simulator.cancel(handle, &mut events).expect("cancel");
    assert!((settled.distance_covered - 3.0).abs() < EPSILON);
    assert!(settled.distance_covered < total);
    assert!((50.0 - settled.energy_remaining - settled.distance_covered).abs() < EPSILON);
    assert_eq!(settled.position, moving.position);
    assert_eq!(simulator.phase(), MovementPhase::Idle);
    assert!((simulator.energy() - settled.energy_remaining).abs() < EPSILON);

    assert!(!events
        .iter()
        .any(|event| matches!(event, MovementEvent::Arrived { .. })));
    assert!(events
        .iter()
        .any(|event| matches!(event, MovementEvent::Cancelled { .. })));
    assert_eq!(
        simulator.cancel(handle, &mut events),
        Err(MovementError::UnknownHandle { handle })
    );
}

#[test]
fn rejections_leave_the_agent_untouched() {
    let mut simulator = simulator();
    let mut events = Vec::new();
    let handle = simulator
        .start_movement(
            Point::new(0.5, 0.5),
            BlockCoord::new(1, 0),
            &ExclusionSet::new(),
            50.0,
            &mut events,
        )
        .expect("movement accepted");
    walk_to_completion(&mut simulator, handle);
    let before = simulator.snapshot();

    let exclusions: ExclusionSet = [BlockCoord::new(3, 3)].into_iter().collect();
    let cases = [
        (
            BlockCoord::new(3, 3),
            exclusions.clone(),
            49.0,
            MovementError::NoGoZone {
                block: BlockCoord::new(3, 3),
            },
        ),
        (
            BlockCoord::new(7, 3),
            ExclusionSet::new(),
            49.0,
            MovementError::Unreachable {
                block: BlockCoord::new(7, 3),
            },
        ),
    ];

    for (target, exclusions, energy, expected) in cases {
        let result = simulator.start_movement(
            before.position,
            target,
            &exclusions,
            energy,
            &mut events,
        );
        assert_eq!(result, Err(expected));
        let after = simulator.snapshot();
        assert_eq!(after.phase, MovementPhase::Rejected);
        assert_eq!(after.position, before.position);
        assert_eq!(after.trail, before.trail);
        assert!((after.energy_remaining - before.energy_remaining).abs() < EPSILON);
        simulator.dismiss_rejection();
        assert_eq!(simulator.phase(), MovementPhase::Idle);
    }
}

#[test]
fn insufficient_energy_is_refused_without_deduction() {
    let mut simulator = simulator();
    let mut events = Vec::new();

    let result = simulator.start_movement(
        Point::new(0.5, 0.5),
        BlockCoord::new(2, 2),
        &ExclusionSet::new(),
        3.5,
        &mut events,
    );

    match result {
        Err(MovementError::InsufficientEnergy {
            required,
            available,
        }) => {
            assert!((required - 4.0).abs() < EPSILON);
            assert!((available - 3.5).abs() < EPSILON);
        }
        other => panic!("expected insufficient energy, got {other:?}"),
    }
    assert_eq!(simulator.phase(), MovementPhase::Rejected);
    assert!(simulator.energy().abs() < EPSILON);
    assert!(matches!(
        events.as_slice(),
        [MovementEvent::Rejected { .. }]
    ));
}

#[test]
fn exact_energy_budget_is_enough() {
    let mut simulator = simulator();
    let mut events = Vec::new();

    let handle = simulator
        .start_movement(
            Point::new(0.5, 0.5),
            BlockCoord::new(2, 2),
            &ExclusionSet::new(),
            4.0,
            &mut events,
        )
        .expect("exact budget accepted");
    walk_to_completion(&mut simulator, handle);
    assert!(simulator.energy().abs() < EPSILON);
}

#[test]
fn trail_records_each_crossing_once() {
    let mut simulator = simulator();
    let mut events = Vec::new();
    let start = Point::new(0.5, 0.5);
    let street = Point::new(1.0, 0.5);
    let goal = Point::new(1.5, 0.5);

    let handle = simulator
        .start_movement(start, BlockCoord::new(1, 0), &ExclusionSet::new(), 50.0, &mut events)
        .expect("movement accepted");

    let _ = simulator.tick(handle, at(0), &mut events).expect("tick");
    let early = simulator.tick(handle, at(100), &mut events).expect("tick");
    assert_eq!(early.trail, vec![start]);
    assert!(early.position.approx_eq(Point::new(0.7, 0.5)));

    let crossed = simulator.tick(handle, at(300), &mut events).expect("tick");
    assert_eq!(crossed.trail, vec![start, street]);

    let later = simulator.tick(handle, at(400), &mut events).expect("tick");
    assert_eq!(later.trail, vec![start, street]);

    let arrived = simulator.tick(handle, at(500), &mut events).expect("tick");
    assert_eq!(arrived.phase, MovementPhase::Arriving);
    assert_eq!(arrived.trail, vec![start, street, goal]);

    let crossings = events
        .iter()
        .filter(|event| matches!(event, MovementEvent::WaypointReached { .. }))
        .count();
    assert_eq!(crossings, 1);
}

#[test]
fn low_energy_halves_the_pace() {
    let target = BlockCoord::new(1, 0);
    let start = Point::new(0.5, 0.5);

    let mut rested = simulator();
    let mut tired = simulator();
    let mut events = Vec::new();
    let rested_handle = rested
        .start_movement(start, target, &ExclusionSet::new(), 50.0, &mut events)
        .expect("accepted");
    let tired_handle = tired
        .start_movement(start, target, &ExclusionSet::new(), 10.0, &mut events)
        .expect("accepted");

    for (simulator, handle) in [(&mut rested, rested_handle), (&mut tired, tired_handle)] {
        let _ = simulator.tick(handle, at(0), &mut events).expect("tick");
        let _ = simulator.tick(handle, at(500), &mut events).expect("tick");
    }

    assert_eq!(rested.phase(), MovementPhase::Arriving);
    assert_eq!(tired.phase(), MovementPhase::Moving);
    assert_eq!(tired.position(), Point::new(1.0, 0.5));
}

#[test]
fn restarting_mid_flight_settles_the_previous_walk() {
    let mut simulator = simulator();
    let mut events = Vec::new();

    let first = simulator
        .start_movement(
            Point::new(0.5, 0.5),
            BlockCoord::new(5, 4),
            &ExclusionSet::new(),
            50.0,
            &mut events,
        )
        .expect("accepted");
    let _ = simulator.tick(first, at(0), &mut events).expect("tick");
    let moving = simulator.tick(first, at(1_000), &mut events).expect("tick");

    let second = simulator
        .start_movement(
            Point::new(9.5, 9.5),
            BlockCoord::new(0, 0),
            &ExclusionSet::new(),
            999.0,
            &mut events,
        )
        .expect("accepted");
    assert_ne!(first, second);

    let cancelled = events.iter().find_map(|event| match event {
        MovementEvent::Cancelled {
            handle,
            distance_covered,
            energy_remaining,
        } => Some((*handle, *distance_covered, *energy_remaining)),
        _ => None,
    });
    let (handle, covered, remaining) = cancelled.expect("previous walk was cancelled");
    assert_eq!(handle, first);
    assert!((covered - 2.0).abs() < EPSILON);
    assert!((remaining - 48.0).abs() < EPSILON);

    let resumed = simulator.tick(second, at(2_000), &mut events).expect("tick");
    assert_eq!(resumed.position, moving.position);
    assert!((resumed.energy_remaining - 48.0).abs() < EPSILON);
    assert_eq!(
        simulator.tick(first, at(2_000), &mut events),
        Err(MovementError::UnknownHandle { handle: first })
    );
}

#[test]
fn moving_to_the_current_block_arrives_immediately() {
    let mut simulator = simulator();
    let mut events = Vec::new();
    let here = Point::new(2.5, 2.5);

    let handle = simulator
        .start_movement(here, BlockCoord::new(2, 2), &ExclusionSet::new(), 5.0, &mut events)
        .expect("accepted");
    let snapshot = simulator.tick(handle, at(0), &mut events).expect("tick");

    assert_eq!(snapshot.phase, MovementPhase::Arriving);
    assert_eq!(snapshot.position, here);
    assert_eq!(snapshot.trail, vec![here]);
    assert!((snapshot.energy_remaining - 5.0).abs() < EPSILON);
}

#[test]
fn grace_period_delays_return_to_idle() {
    let config = MovementConfig {
        arrival_grace_ms: 400,
        ..MovementConfig::default()
    };
    let mut simulator =
        MovementSimulator::new(Topology::default(), config).expect("config is valid");
    let mut events = Vec::new();

    let handle = simulator
        .start_movement(
            Point::new(0.5, 0.5),
            BlockCoord::new(1, 0),
            &ExclusionSet::new(),
            50.0,
            &mut events,
        )
        .expect("accepted");
    let _ = simulator.tick(handle, at(0), &mut events).expect("tick");
    let arrived = simulator.tick(handle, at(500), &mut events).expect("tick");
    assert_eq!(arrived.phase, MovementPhase::Arriving);

    let waiting = simulator.tick(handle, at(800), &mut events).expect("tick");
    assert_eq!(waiting.phase, MovementPhase::Arriving);

    let idle = simulator.tick(handle, at(900), &mut events).expect("tick");
    assert_eq!(idle.phase, MovementPhase::Idle);
    assert_eq!(simulator.active_handle(), None);
}

#[test]
fn cancelling_during_grace_keeps_the_full_charge() {
    let mut simulator = simulator();
    let mut events = Vec::new();

    let handle = simulator
        .start_movement(
            Point::new(0.5, 0.5),
            BlockCoord::new(1, 0),
            &ExclusionSet::new(),
            50.0,
            &mut events,
        )
        .expect("accepted");
    let _ = simulator.tick(handle, at(0), &mut events).expect("tick");
    let _ = simulator.tick(handle, at(500), &mut events).expect("tick");

    let settled = simulator.cancel(handle, &mut events).expect("cancel");
    assert!((settled.distance_covered - 1.0).abs() < EPSILON);
    assert!((settled.energy_remaining - 49.0).abs() < EPSILON);
    assert_eq!(simulator.phase(), MovementPhase::Idle);
    assert!(!events
        .iter()
        .any(|event| matches!(event, MovementEvent::Cancelled { .. })));
}

#[test]
fn off_lattice_start_pays_for_the_exact_first_leg() {
    let start = Point::new(0.6, 0.4);
    let target = BlockCoord::new(2, 2);
    let goal = Point::block_center(target);
    let planned = find_path(&Topology::default(), start, goal, &ExclusionSet::new());
    let expected = planned.length_from(start);
    assert!((expected - 4.0).abs() > 0.05, "first leg should not be half a block");

    let mut simulator = simulator();
    let mut events = Vec::new();
    let handle = simulator
        .start_movement(start, target, &ExclusionSet::new(), 50.0, &mut events)
        .expect("movement accepted");
    assert!((route_distance(&events) - expected).abs() < EPSILON);

    let first = simulator.tick(handle, at(0), &mut events).expect("tick");
    assert_eq!(first.position, start);
    assert_eq!(first.trail, vec![start]);

    walk_to_completion(&mut simulator, handle);
    assert_eq!(simulator.position(), goal);
    assert!((simulator.energy() - (50.0 - expected)).abs() < EPSILON);
}

#[test]
fn start_near_the_target_center_walks_the_last_step() {
    let start = Point::new(2.6, 2.4);
    let goal = Point::new(2.5, 2.5);
    let mut simulator = simulator();
    let mut events = Vec::new();

    let handle = simulator
        .start_movement(start, BlockCoord::new(2, 2), &ExclusionSet::new(), 10.0, &mut events)
        .expect("movement accepted");
    let total = route_distance(&events);
    assert!((total - start.distance(goal)).abs() < EPSILON);

    let moving = simulator.tick(handle, at(0), &mut events).expect("tick");
    assert_eq!(moving.phase, MovementPhase::Moving);
    assert_eq!(moving.position, start);

    let arrived = simulator.tick(handle, at(1_000), &mut events).expect("tick");
    assert_eq!(arrived.phase, MovementPhase::Arriving);
    assert_eq!(arrived.position, goal);
    assert_eq!(arrived.trail, vec![start, goal]);
    assert!((arrived.energy_remaining - (10.0 - total)).abs() < EPSILON);
}

#[test]
fn non_finite_positions_are_refused() {
    let mut simulator = simulator();
    let mut events = Vec::new();

    for position in [Point::new(f64::NAN, f64::NAN), Point::new(0.5, f64::INFINITY)] {
        let result = simulator.start_movement(
            position,
            BlockCoord::new(2, 2),
            &ExclusionSet::new(),
            50.0,
            &mut events,
        );
        assert!(
            matches!(result, Err(MovementError::InvalidPosition { .. })),
            "{position:?} was accepted"
        );
        assert_eq!(simulator.phase(), MovementPhase::Rejected);
        assert_eq!(simulator.active_handle(), None);
    }
}

#[test]
fn energy_budgets_must_be_finite_and_non_negative() {
    let mut simulator = simulator();
    let mut events = Vec::new();

    for energy in [f64::NAN, f64::INFINITY, -1.0] {
        let result = simulator.start_movement(
            Point::new(2.5, 2.5),
            BlockCoord::new(2, 2),
            &ExclusionSet::new(),
            energy,
            &mut events,
        );
        assert!(
            matches!(result, Err(MovementError::InvalidEnergy { .. })),
            "{energy} was accepted"
        );
        assert_eq!(simulator.phase(), MovementPhase::Rejected);
        assert!(simulator.energy().abs() < EPSILON);
    }
}

#[test]
fn configurations_that_never_move_forward_are_refused() {
    for base_speed in [f64::INFINITY, -2.0] {
        let config = MovementConfig {
            base_speed,
            ..MovementConfig::default()
        };
        assert!(matches!(
            MovementSimulator::new(Topology::default(), config),
            Err(MovementConfigError::BaseSpeed { .. })
        ));
    }
}
