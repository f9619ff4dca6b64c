#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that draws the city, plans routes and replays walks.

mod config;
mod render;

use std::{path::PathBuf, time::Duration};

use anyhow::{bail, Context, Result};
use cityroute_core::{BlockCoord, ExclusionSet, MovementEvent, MovementPhase, Point};
use cityroute_system_movement::MovementSimulator;
use cityroute_system_pathfinding::PathFinder;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::{config::AppConfig, render::render_map};

const MAX_FRAMES: u32 = 100_000;

#[derive(Debug, Parser)]
#[command(name = "cityroute", version, about = "Plan and replay walks across a city grid")]
struct Cli {
    /// TOML file with `[movement]` and `[layout]` tables.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the terrain as an ASCII map.
    Map(Exclusions),
    /// Plan a route from a point to the center of a block.
    Route {
        /// Starting point as `X,Y`.
        #[arg(value_parser = parse_point)]
        from: Point,
        /// Target block as `COLUMN,ROW`.
        #[arg(value_parser = parse_block)]
        to: BlockCoord,
        #[command(flatten)]
        exclusions: Exclusions,
    },
    /// Simulate a walk at a fixed frame rate.
    Walk {
        /// Starting point as `X,Y`.
        #[arg(value_parser = parse_point)]
        from: Point,
        /// Target block as `COLUMN,ROW`.
        #[arg(value_parser = parse_block)]
        to: BlockCoord,
        /// Energy available to the walker.
        #[arg(long, default_value_t = 100.0)]
        energy: f64,
        /// Simulated frames per second.
        #[arg(long, default_value_t = 10, value_parser = clap::value_parser!(u32).range(1..))]
        fps: u32,
        /// Cancel the walk once this many frames have been simulated.
        #[arg(long, value_name = "FRAMES")]
        cancel_after: Option<u32>,
        #[command(flatten)]
        exclusions: Exclusions,
    },
}

#[derive(Debug, Args)]
struct Exclusions {
    /// Block to avoid as `COLUMN,ROW`; repeatable.
    #[arg(long = "exclude", value_name = "COLUMN,ROW", value_parser = parse_block)]
    blocks: Vec<BlockCoord>,
}

impl Exclusions {
    fn to_set(&self) -> ExclusionSet {
        self.blocks.iter().copied().collect()
    }
}

/// Entry point for the city route command-line interface.
fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.as_deref())?;

    match cli.command {
        Command::Map(exclusions) => map(&config, &exclusions),
        Command::Route {
            from,
            to,
            exclusions,
        } => route(&config, from, to, &exclusions),
        Command::Walk {
            from,
            to,
            energy,
            fps,
            cancel_after,
            exclusions,
        } => walk(
            &config,
            WalkPlan {
                from,
                to,
                energy,
                fps,
                cancel_after,
            },
            &exclusions,
        ),
    }
}

fn map(config: &AppConfig, exclusions: &Exclusions) -> Result<()> {
    let topology = config.topology()?;
    print!("{}", render_map(&topology, &exclusions.to_set(), &[]));
    Ok(())
}

fn route(config: &AppConfig, from: Point, to: BlockCoord, exclusions: &Exclusions) -> Result<()> {
    let topology = config.topology()?;
    let exclusions = exclusions.to_set();
    let goal = Point::block_center(to);
    let outcome = PathFinder::new(&topology).search(from, goal, &exclusions);

    let Some(distance) = outcome.goal_cost else {
        bail!(
            "no route from {} to block {} ({} nodes expanded)",
            format_point(from),
            format_block(to),
            outcome.expanded
        );
    };

    let mut drawn = Vec::with_capacity(outcome.route.len() + 1);
    drawn.push(from);
    drawn.extend_from_slice(outcome.route.points());
    print!("{}", render_map(&topology, &exclusions, &drawn));
    println!(
        "route: {} waypoints, distance {distance:.3}, {} nodes expanded",
        outcome.route.len(),
        outcome.expanded
    );
    for point in outcome.route.points() {
        println!("  {}", format_point(*point));
    }
    Ok(())
}

#[derive(Clone, Copy, Debug)]
struct WalkPlan {
    from: Point,
    to: BlockCoord,
    energy: f64,
    fps: u32,
    cancel_after: Option<u32>,
}

fn walk(config: &AppConfig, plan: WalkPlan, exclusions: &Exclusions) -> Result<()> {
    let mut simulator = MovementSimulator::new(config.topology()?, config.movement)?;
    let exclusions = exclusions.to_set();
    let mut events = Vec::new();

    let started = simulator.start_movement(
        plan.from,
        plan.to,
        &exclusions,
        plan.energy,
        &mut events,
    );
    print_events(&mut events);
    let handle =
        started.with_context(|| format!("walk to block {} refused", format_block(plan.to)))?;
    println!(
        "walking at {:.3} blocks/s",
        simulator.config().speed_for(plan.energy)
    );

    let frame = Duration::from_secs(1) / plan.fps;
    for index in 0..MAX_FRAMES {
        if plan.cancel_after == Some(index) {
            let settled = simulator.cancel(handle, &mut events)?;
            print_events(&mut events);
            println!(
                "cancelled after {index} frames at {}: covered {:.3}, energy {:.3}",
                format_point(settled.position),
                settled.distance_covered,
                settled.energy_remaining
            );
            return Ok(());
        }

        let now = frame * index;
        let snapshot = simulator.tick(handle, now, &mut events)?;
        println!(
            "{index:>5} t={:>8.3}s {:<8} at {} energy {:.3}",
            now.as_secs_f64(),
            format!("{:?}", snapshot.phase),
            format_point(snapshot.position),
            snapshot.energy_remaining
        );
        print_events(&mut events);

        if snapshot.phase == MovementPhase::Idle {
            print!(
                "{}",
                render_map(simulator.topology(), &exclusions, &snapshot.trail)
            );
            return Ok(());
        }
    }

    bail!("walk did not settle within {MAX_FRAMES} frames")
}

fn print_events(events: &mut Vec<MovementEvent>) {
    for event in events.drain(..) {
        println!("  > {}", describe(&event));
    }
}

fn describe(event: &MovementEvent) -> String {
    match event {
        MovementEvent::Started {
            handle,
            route_distance,
        } => format!("movement {} started, {route_distance:.3} to walk", handle.get()),
        MovementEvent::WaypointReached { waypoint, .. } => {
            format!("passed {}", format_point(*waypoint))
        }
        MovementEvent::Arrived {
            position,
            energy_remaining,
            ..
        } => format!(
            "arrived at {} with {energy_remaining:.3} energy",
            format_point(*position)
        ),
        MovementEvent::Cancelled {
            distance_covered,
            energy_remaining,
            ..
        } => format!("cancelled after {distance_covered:.3} with {energy_remaining:.3} energy"),
        MovementEvent::Rejected { reason } => format!("rejected: {reason}"),
    }
}

fn format_point(point: Point) -> String {
    format!("({:.2}, {:.2})", point.x(), point.y())
}

fn format_block(block: BlockCoord) -> String {
    format!("({}, {})", block.column(), block.row())
}

fn parse_pair(value: &str) -> Result<(&str, &str), String> {
    value
        .split_once(',')
        .map(|(left, right)| (left.trim(), right.trim()))
        .ok_or_else(|| format!("expected two comma-separated values, got `{value}`"))
}

fn parse_point(value: &str) -> Result<Point, String> {
    let (x, y) = parse_pair(value)?;
    let coordinate = |text: &str| {
        text.parse::<f64>()
            .ok()
            .filter(|number| number.is_finite())
            .ok_or_else(|| format!("`{text}` is not a finite number"))
    };
    Ok(Point::new(coordinate(x)?, coordinate(y)?))
}

fn parse_block(value: &str) -> Result<BlockCoord, String> {
    let (column, row) = parse_pair(value)?;
    let index = |text: &str| {
        text.parse::<u32>()
            .map_err(|error| format!("`{text}` is not a block index: {error}"))
    };
    Ok(BlockCoord::new(index(column)?, index(row)?))
}
