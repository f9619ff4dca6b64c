#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Deterministic A* search over the city topology.

use std::{cmp::Ordering, collections::BinaryHeap};

use cityroute_core::{ExclusionSet, LatticeCoord, Point, Route};
use cityroute_world::Topology;
use ordered_float::OrderedFloat;

/// Result of a single search, including diagnostics.
#[derive(Clone, Debug, PartialEq)]
pub struct SearchOutcome {
    /// Route from start (exclusive) to goal (inclusive); empty when unreachable.
    pub route: Route,
    /// Accumulated distance of the goal node when it was finalised.
    pub goal_cost: Option<f64>,
    /// Number of nodes finalised before the search stopped.
    pub expanded: usize,
}

impl SearchOutcome {
    fn trivial() -> Self {
        Self {
            route: Route::empty(),
            goal_cost: Some(0.0),
            expanded: 0,
        }
    }

    fn unreachable(expanded: usize) -> Self {
        Self {
            route: Route::empty(),
            goal_cost: None,
            expanded,
        }
    }

    /// Reports whether the goal was reached.
    #[must_use]
    pub fn is_reachable(&self) -> bool {
        self.goal_cost.is_some()
    }
}

/// A* path finder borrowing a topology for the duration of its queries.
#[derive(Clone, Copy, Debug)]
pub struct PathFinder<'t> {
    topology: &'t Topology,
}

impl<'t> PathFinder<'t> {
    /// Creates a path finder over the provided topology.
    #[must_use]
    pub const fn new(topology: &'t Topology) -> Self {
        Self { topology }
    }

    /// Shortest route from `start` to `goal` avoiding `exclusions`.
    ///
    /// Returns an empty route when the goal is unreachable or coincides with
    /// the start.
    #[must_use]
    pub fn find_path(&self, start: Point, goal: Point, exclusions: &ExclusionSet) -> Route {
        self.search(start, goal, exclusions).route
    }

    /// Runs the search and reports the goal cost alongside the route.
    ///
    /// Both endpoints snap to the nearest lattice node; an endpoint that is not
    /// a finite point is unreachable. Nodes are finalised in
    /// ascending `f` order; equal `f` values are resolved by discovery order so
    /// repeated queries always produce the same route.
    #[must_use]
    pub fn search(&self, start: Point, goal: Point, exclusions: &ExclusionSet) -> SearchOutcome {
        if !start.is_finite() || !goal.is_finite() {
            tracing::debug!(?start, ?goal, "search endpoint is not a finite point");
            return SearchOutcome::unreachable(0);
        }
        if start.approx_eq(goal) {
            return SearchOutcome::trivial();
        }

        let start_node = LatticeCoord::from_point(start);
        let goal_node = LatticeCoord::from_point(goal);
        if start_node == goal_node {
            return SearchOutcome::trivial();
        }

        let topology = self.topology;
        let (Some(start_index), Some(goal_index)) =
            (topology.index(start_node), topology.index(goal_node))
        else {
            tracing::debug!(?start, ?goal, "search endpoint lies outside the city");
            return SearchOutcome::unreachable(0);
        };

        let mut nodes: Vec<Option<SearchNode>> = vec![None; topology.node_count()];
        let mut open = BinaryHeap::new();
        let mut discovered: u64 = 0;

        let h = start_node.manhattan_distance(goal_node);
        nodes[start_index] = Some(SearchNode::new(start_node, 0.0, h, None, discovered));
        open.push(OpenEntry {
            f: OrderedFloat(h),
            sequence: discovered,
            index: start_index,
        });
        discovered += 1;

        let mut neighbors = Vec::with_capacity(8);
        let mut expanded = 0;

        while let Some(entry) = open.pop() {
            let Some(node) = nodes[entry.index].as_mut() else {
                continue;
            };
            if node.closed {
                continue;
            }
            node.closed = true;
            expanded += 1;

            if entry.index == goal_index {
                let goal_cost = node.g;
                let route = reconstruct(&nodes, goal_index);
                tracing::debug!(
                    expanded,
                    waypoints = route.len(),
                    distance = goal_cost,
                    "route found"
                );
                return SearchOutcome {
                    route,
                    goal_cost: Some(goal_cost),
                    expanded,
                };
            }

            let current = node.coord;
            let current_g = node.g;

            neighbors.clear();
            topology.neighbors_into(current, start_node, goal_node, &mut neighbors);

            for &next in &neighbors {
                if !topology.is_valid(next, exclusions) {
                    continue;
                }
                let Some(next_index) = topology.index(next) else {
                    continue;
                };
                let tentative = current_g + current.distance(next);

                match &mut nodes[next_index] {
                    Some(existing) => {
                        if existing.closed || tentative >= existing.g {
                            continue;
                        }
                        existing.g = tentative;
                        existing.f = tentative + existing.h;
                        existing.parent = Some(entry.index);
                        open.push(OpenEntry {
                            f: OrderedFloat(existing.f),
                            sequence: existing.sequence,
                            index: next_index,
                        });
                    }
                    slot @ None => {
                        let h = next.manhattan_distance(goal_node);
                        let node =
                            SearchNode::new(next, tentative, h, Some(entry.index), discovered);
                        open.push(OpenEntry {
                            f: OrderedFloat(node.f),
                            sequence: discovered,
                            index: next_index,
                        });
                        *slot = Some(node);
                        discovered += 1;
                    }
                }
            }
        }

        tracing::debug!(expanded, ?start, ?goal, "no route");
        SearchOutcome::unreachable(expanded)
    }
}

/// Convenience wrapper around [`PathFinder::find_path`].
#[must_use]
pub fn find_path(
    topology: &Topology,
    start: Point,
    goal: Point,
    exclusions: &ExclusionSet,
) -> Route {
    PathFinder::new(topology).find_path(start, goal, exclusions)
}

#[derive(Clone, Copy, Debug)]
struct SearchNode {
    coord: LatticeCoord,
    g: f64,
    h: f64,
    f: f64,
    parent: Option<usize>,
    sequence: u64,
    closed: bool,
}

impl SearchNode {
    fn new(coord: LatticeCoord, g: f64, h: f64, parent: Option<usize>, sequence: u64) -> Self {
        Self {
            coord,
            g,
            h,
            f: g + h,
            parent,
            sequence,
            closed: false,
        }
    }
}

/// Heap entry ordered so `BinaryHeap` pops the lowest `f`, then the earliest
/// discovered node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct OpenEntry {
    f: OrderedFloat<f64>,
    sequence: u64,
    index: usize,
}

impl Ord for OpenEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .f
            .cmp(&self.f)
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

impl PartialOrd for OpenEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

fn reconstruct(nodes: &[Option<SearchNode>], goal_index: usize) -> Route {
    let mut points = Vec::new();
    let mut cursor = Some(goal_index);
    while let Some(index) = cursor {
        let Some(node) = nodes[index].as_ref() else {
            break;
        };
        // the start node has no parent and is left out of the route
        if node.parent.is_none() {
            break;
        }
        points.push(node.coord.to_point());
        cursor = node.parent;
    }
    points.reverse();
    Route::new(points)
}
