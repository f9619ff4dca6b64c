#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Deterministic movement system that walks an agent along planned routes.
//!
//! The simulator is driven by the host: [`MovementSimulator::start_movement`]
//! plans and validates a walk, [`MovementSimulator::tick`] advances it to the
//! host's clock once per frame, and [`MovementSimulator::cancel`] stops it and
//! settles the energy spent so far. Notifications are appended to a
//! caller-provided event buffer.

use std::time::Duration;

use cityroute_core::{
    BlockCoord, EnergySettled, ExclusionSet, LatticeCoord, MovementError, MovementEvent,
    MovementHandle, MovementPhase, MovementSnapshot, Point,
};
use cityroute_system_pathfinding::PathFinder;
use cityroute_world::Topology;

mod config;

pub use config::{MovementConfig, MovementConfigError};

/// Owns the moving agent and its in-flight movement, if any.
#[derive(Clone, Debug)]
pub struct MovementSimulator {
    topology: Topology,
    config: MovementConfig,
    position: Point,
    energy: f64,
    trail: Vec<Point>,
    phase: MovementPhase,
    active: Option<ActiveMovement>,
    next_handle: u64,
}

#[derive(Clone, Debug)]
struct ActiveMovement {
    handle: MovementHandle,
    waypoints: Vec<Point>,
    cumulative: Vec<f64>,
    total_distance: f64,
    starting_energy: f64,
    speed: f64,
    origin: Option<Duration>,
    covered: f64,
    next_waypoint: usize,
    arrived_at: Option<Duration>,
}

impl MovementSimulator {
    /// Creates an idle simulator over the provided topology.
    ///
    /// Fails when the configuration would not move the agent forward.
    pub fn new(topology: Topology, config: MovementConfig) -> Result<Self, MovementConfigError> {
        config.validate()?;
        Ok(Self {
            topology,
            config,
            position: Point::default(),
            energy: 0.0,
            trail: Vec::new(),
            phase: MovementPhase::Idle,
            active: None,
            next_handle: 1,
        })
    }

    /// Topology the agent walks on.
    #[must_use]
    pub const fn topology(&self) -> &Topology {
        &self.topology
    }

    /// Motion tunables in effect.
    #[must_use]
    pub const fn config(&self) -> &MovementConfig {
        &self.config
    }

    /// Current phase of the state machine.
    #[must_use]
    pub const fn phase(&self) -> MovementPhase {
        self.phase
    }

    /// Last settled or interpolated position of the agent.
    #[must_use]
    pub const fn position(&self) -> Point {
        self.position
    }

    /// Energy held by the agent, not counting an unsettled movement.
    #[must_use]
    pub const fn energy(&self) -> f64 {
        self.energy
    }

    /// Handle of the movement currently in flight.
    #[must_use]
    pub fn active_handle(&self) -> Option<MovementHandle> {
        self.active.as_ref().map(|active| active.handle)
    }

    /// Plans a walk to the center of `target` and starts it.
    ///
    /// A movement already in flight is cancelled first; the new walk then
    /// starts from the settled position with the settled energy instead of
    /// `position` and `energy`. Refused requests leave the agent untouched and
    /// switch the phase to [`MovementPhase::Rejected`]. Positions that are not
    /// finite and energy that is negative or not finite are refused.
    pub fn start_movement(
        &mut self,
        position: Point,
        target: BlockCoord,
        exclusions: &ExclusionSet,
        energy: f64,
        out_events: &mut Vec<MovementEvent>,
    ) -> Result<MovementHandle, MovementError> {
        let (position, energy) = match self.settle_in_flight(out_events) {
            Some(settled) => (settled.position, settled.energy_remaining),
            None => (position, energy),
        };

        if !position.is_finite() {
            return self.reject(MovementError::InvalidPosition { position }, out_events);
        }
        if !energy.is_finite() || energy < 0.0 {
            return self.reject(MovementError::InvalidEnergy { energy }, out_events);
        }

        if exclusions.contains(target) {
            return self.reject(MovementError::NoGoZone { block: target }, out_events);
        }

        let goal = Point::block_center(target);
        let route = PathFinder::new(&self.topology).find_path(position, goal, exclusions);
        let mut waypoints = Vec::with_capacity(route.len() + 1);
        waypoints.push(position);
        if route.is_empty() {
            if LatticeCoord::from_point(position) != LatticeCoord::block_center(target) {
                return self.reject(MovementError::Unreachable { block: target }, out_events);
            }
            if !position.approx_eq(goal) {
                waypoints.push(goal);
            }
        } else {
            waypoints.extend(route.into_points());
        }

        let cumulative = cumulative_distances(&waypoints);
        let total_distance = cumulative.last().copied().unwrap_or(0.0);
        if energy < total_distance {
            return self.reject(
                MovementError::InsufficientEnergy {
                    required: total_distance,
                    available: energy,
                },
                out_events,
            );
        }

        let handle = MovementHandle::new(self.next_handle);
        self.next_handle += 1;

        tracing::debug!(
            handle = handle.get(),
            distance = total_distance,
            waypoints = waypoints.len(),
            energy,
            "movement started"
        );

        self.position = position;
        self.energy = energy;
        self.trail = vec![position];
        self.phase = MovementPhase::Moving;
        self.active = Some(ActiveMovement {
            handle,
            waypoints,
            cumulative,
            total_distance,
            starting_energy: energy,
            speed: self.config.speed_for(energy),
            origin: None,
            covered: 0.0,
            next_waypoint: 1,
            arrived_at: None,
        });
        out_events.push(MovementEvent::Started {
            handle,
            route_distance: total_distance,
        });

        Ok(handle)
    }

    /// Advances the movement to the host clock `now`.
    ///
    /// The first tick after a start latches the elapsed-time origin, so its
    /// position is the route's first waypoint.
    pub fn tick(
        &mut self,
        handle: MovementHandle,
        now: Duration,
        out_events: &mut Vec<MovementEvent>,
    ) -> Result<MovementSnapshot, MovementError> {
        let mut active = self.take_active(handle)?;

        if self.phase == MovementPhase::Moving {
            self.advance(&mut active, now, out_events);
        }

        let finished = self.phase == MovementPhase::Arriving
            && active
                .arrived_at
                .is_some_and(|arrived_at| now.saturating_sub(arrived_at) >= self.config.arrival_grace());
        if finished {
            tracing::debug!(handle = handle.get(), "movement settled");
            self.phase = MovementPhase::Idle;
        } else {
            self.active = Some(active);
        }

        Ok(self.snapshot())
    }

    /// Stops the movement and pays for the distance covered so far.
    ///
    /// The distance is taken from the latest tick. Cancelling during the
    /// arrival grace period only ends the grace period.
    pub fn cancel(
        &mut self,
        handle: MovementHandle,
        out_events: &mut Vec<MovementEvent>,
    ) -> Result<EnergySettled, MovementError> {
        let active = self.take_active(handle)?;
        Ok(self.settle(active, out_events))
    }

    /// Clears a rejection so the agent reads as idle again.
    pub fn dismiss_rejection(&mut self) {
        if self.phase == MovementPhase::Rejected {
            self.phase = MovementPhase::Idle;
        }
    }

    /// Immutable view of the agent for renderers.
    #[must_use]
    pub fn snapshot(&self) -> MovementSnapshot {
        let energy_remaining = match &self.active {
            Some(active) if self.phase == MovementPhase::Moving => {
                active.starting_energy - active.covered
            }
            _ => self.energy,
        };

        MovementSnapshot {
            position: self.position,
            phase: self.phase,
            trail: self.trail.clone(),
            energy_remaining,
        }
    }

    fn take_active(&mut self, handle: MovementHandle) -> Result<ActiveMovement, MovementError> {
        match self.active.take() {
            Some(active) if active.handle == handle => Ok(active),
            other => {
                self.active = other;
                Err(MovementError::UnknownHandle { handle })
            }
        }
    }

    fn settle_in_flight(&mut self, out_events: &mut Vec<MovementEvent>) -> Option<EnergySettled> {
        let active = self.active.take()?;
        Some(self.settle(active, out_events))
    }

    fn settle(
        &mut self,
        active: ActiveMovement,
        out_events: &mut Vec<MovementEvent>,
    ) -> EnergySettled {
        if self.phase != MovementPhase::Moving {
            self.phase = MovementPhase::Idle;
            return EnergySettled {
                energy_remaining: self.energy,
                distance_covered: active.total_distance,
                position: self.position,
            };
        }

        self.energy = active.starting_energy - active.covered;
        self.phase = MovementPhase::Idle;

        tracing::debug!(
            handle = active.handle.get(),
            covered = active.covered,
            energy = self.energy,
            "movement cancelled"
        );
        out_events.push(MovementEvent::Cancelled {
            handle: active.handle,
            distance_covered: active.covered,
            energy_remaining: self.energy,
        });

        EnergySettled {
            energy_remaining: self.energy,
            distance_covered: active.covered,
            position: self.position,
        }
    }

    fn reject(
        &mut self,
        reason: MovementError,
        out_events: &mut Vec<MovementEvent>,
    ) -> Result<MovementHandle, MovementError> {
        tracing::debug!(%reason, "movement rejected");
        self.phase = MovementPhase::Rejected;
        out_events.push(MovementEvent::Rejected {
            reason: reason.clone(),
        });
        Err(reason)
    }

    fn advance(
        &mut self,
        active: &mut ActiveMovement,
        now: Duration,
        out_events: &mut Vec<MovementEvent>,
    ) {
        let origin = *active.origin.get_or_insert(now);
        let elapsed = now.saturating_sub(origin);
        let covered = elapsed.as_secs_f64() * active.speed;

        let last = active.waypoints.len() - 1;
        if last == 0 || covered >= active.total_distance {
            self.arrive(active, now, out_events);
            return;
        }

        // cumulative[0] is zero and covered < total, so the segment is interior
        let segment = active
            .cumulative
            .partition_point(|&distance| distance <= covered)
            .clamp(1, last);
        let from = active.cumulative[segment - 1];
        let span = active.cumulative[segment] - from;
        let fraction = if span > 0.0 {
            (covered - from) / span
        } else {
            1.0
        };

        active.covered = covered;
        self.position = active.waypoints[segment - 1].lerp(active.waypoints[segment], fraction);
        self.record_crossings(active, segment, out_events);
    }

    fn arrive(
        &mut self,
        active: &mut ActiveMovement,
        now: Duration,
        out_events: &mut Vec<MovementEvent>,
    ) {
        let last = active.waypoints.len() - 1;
        self.record_crossings(active, last, out_events);

        let destination = active.waypoints[last];
        if last > 0 {
            self.trail.push(destination);
        }
        active.next_waypoint = active.waypoints.len();
        active.covered = active.total_distance;
        active.arrived_at = Some(now);

        self.position = destination;
        self.energy = active.starting_energy - active.total_distance;
        self.phase = MovementPhase::Arriving;

        tracing::debug!(
            handle = active.handle.get(),
            distance = active.total_distance,
            energy = self.energy,
            "movement arrived"
        );
        out_events.push(MovementEvent::Arrived {
            handle: active.handle,
            position: destination,
            energy_remaining: self.energy,
        });
    }

    /// Appends every waypoint before `segment_end` that has not been recorded yet.
    fn record_crossings(
        &mut self,
        active: &mut ActiveMovement,
        segment_end: usize,
        out_events: &mut Vec<MovementEvent>,
    ) {
        while active.next_waypoint < segment_end {
            let waypoint = active.waypoints[active.next_waypoint];
            tracing::trace!(handle = active.handle.get(), ?waypoint, "waypoint reached");
            self.trail.push(waypoint);
            out_events.push(MovementEvent::WaypointReached {
                handle: active.handle,
                waypoint,
            });
            active.next_waypoint += 1;
        }
    }
}

fn cumulative_distances(waypoints: &[Point]) -> Vec<f64> {
    let mut cumulative = Vec::with_capacity(waypoints.len());
    let mut total = 0.0;
    cumulative.push(total);
    for pair in waypoints.windows(2) {
        total += pair[0].distance(pair[1]);
        cumulative.push(total);
    }
    cumulative
}
