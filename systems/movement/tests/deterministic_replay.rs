use std::{
    collections::hash_map::DefaultHasher,
    hash::{Hash, Hasher},
    time::Duration,
};

use cityroute_core::{
    BlockCoord, ExclusionSet, MovementEvent, MovementPhase, MovementSnapshot, Point,
};
use cityroute_system_movement::{MovementConfig, MovementSimulator};
use cityroute_world::Topology;

const FRAME: Duration = Duration::from_millis(33);

#[test]
fn deterministic_replay_produces_expected_snapshot() {
    let first = replay();
    let second = replay();

    assert_eq!(first, second, "replay diverged between runs");
    assert_eq!(first.fingerprint(), second.fingerprint());

    let last = first.frames.last().expect("replay recorded frames");
    assert_eq!(last.phase, MovementPhase::Idle);
    assert_eq!(last.position, bits(Point::new(12.5, 7.5)));
    assert_eq!(
        first.events.last(),
        Some(&EventRecord::Arrived {
            position: bits(Point::new(12.5, 7.5)),
        })
    );
    assert_eq!(
        first
            .events
            .iter()
            .filter(|event| matches!(event, EventRecord::Cancelled { .. }))
            .count(),
        1
    );
}

#[test]
fn replay_never_walks_through_excluded_blocks() {
    let outcome = replay();
    let excluded = scripted_exclusions();

    for frame in &outcome.frames {
        let (x, y) = frame.position;
        let position = Point::new(f64::from_bits(x), f64::from_bits(y));
        let inside_center = excluded
            .iter()
            .any(|block| Point::block_center(block).approx_eq(position));
        assert!(!inside_center, "agent stood on an excluded center at {position:?}");
    }
}

/// Starts a walk, abandons it halfway, then walks to the final target.
fn replay() -> ReplayOutcome {
    let mut simulator = MovementSimulator::new(Topology::default(), MovementConfig::default())
        .expect("default config is valid");
    let exclusions = scripted_exclusions();
    let mut events = Vec::new();
    let mut frames = Vec::new();
    let mut now = Duration::ZERO;

    let detour = simulator
        .start_movement(
            Point::new(0.5, 0.5),
            BlockCoord::new(5, 8),
            &exclusions,
            60.0,
            &mut events,
        )
        .expect("detour accepted");
    for _ in 0..60 {
        let snapshot = simulator.tick(detour, now, &mut events).expect("tick");
        frames.push(FrameRecord::from_snapshot(&snapshot));
        now += FRAME;
    }

    let snapshot = simulator.snapshot();
    let handle = simulator
        .start_movement(
            snapshot.position,
            BlockCoord::new(12, 7),
            &exclusions,
            snapshot.energy_remaining,
            &mut events,
        )
        .expect("final walk accepted");
    while simulator.phase() != MovementPhase::Idle {
        let snapshot = simulator.tick(handle, now, &mut events).expect("tick");
        frames.push(FrameRecord::from_snapshot(&snapshot));
        now += FRAME;
        assert!(frames.len() < 10_000, "walk never settled");
    }

    ReplayOutcome {
        frames,
        events: events.iter().map(EventRecord::from).collect(),
    }
}

fn scripted_exclusions() -> ExclusionSet {
    [
        BlockCoord::new(3, 3),
        BlockCoord::new(4, 4),
        BlockCoord::new(9, 6),
        BlockCoord::new(10, 1),
    ]
    .into_iter()
    .collect()
}

fn bits(point: Point) -> (u64, u64) {
    (point.x().to_bits(), point.y().to_bits())
}

#[derive(Debug, PartialEq, Eq, Hash)]
struct ReplayOutcome {
    frames: Vec<FrameRecord>,
    events: Vec<EventRecord>,
}

impl ReplayOutcome {
    fn fingerprint(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.hash(&mut hasher);
        hasher.finish()
    }
}

#[derive(Debug, PartialEq, Eq, Hash)]
struct FrameRecord {
    position: (u64, u64),
    phase: MovementPhase,
    trail_len: usize,
    energy: u64,
}

impl FrameRecord {
    fn from_snapshot(snapshot: &MovementSnapshot) -> Self {
        Self {
            position: bits(snapshot.position),
            phase: snapshot.phase,
            trail_len: snapshot.trail.len(),
            energy: snapshot.energy_remaining.to_bits(),
        }
    }
}

#[derive(Debug, PartialEq, Eq, Hash)]
enum EventRecord {
    Started { distance: u64 },
    WaypointReached { waypoint: (u64, u64) },
    Arrived { position: (u64, u64) },
    Cancelled { covered: u64 },
    Rejected,
}

impl From<&MovementEvent> for EventRecord {
    fn from(event: &MovementEvent) -> Self {
        match event {
            MovementEvent::Started { route_distance, .. } => Self::Started {
                distance: route_distance.to_bits(),
            },
            MovementEvent::WaypointReached { waypoint, .. } => Self::WaypointReached {
                waypoint: bits(*waypoint),
            },
            MovementEvent::Arrived { position, .. } => Self::Arrived {
                position: bits(*position),
            },
            MovementEvent::Cancelled {
                distance_covered, ..
            } => Self::Cancelled {
                covered: distance_covered.to_bits(),
            },
            MovementEvent::Rejected { .. } => Self::Rejected,
        }
    }
}
