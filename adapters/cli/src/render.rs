use std::collections::BTreeSet;

use cityroute_core::{ExclusionSet, LatticeCoord, NodeKind, Point, TerrainKind};
use cityroute_world::Topology;

/// Draws the city at lattice resolution.
///
/// Block centers show their terrain (`#` land, `P` park, `~` water, `b`
/// beach, `D` dock, `X` excluded). Walkable street nodes are drawn as `+`,
/// `|` and `-`; unwalkable ones are left blank. Route nodes are drawn as `*`
/// with the first one marked `S` and the last one `G`.
pub(crate) fn render_map(topology: &Topology, exclusions: &ExclusionSet, route: &[Point]) -> String {
    let route_nodes: BTreeSet<LatticeCoord> =
        route.iter().copied().map(LatticeCoord::from_point).collect();
    let first = route.first().copied().map(LatticeCoord::from_point);
    let last = route.last().copied().map(LatticeCoord::from_point);

    let width = i32::try_from(topology.lattice_width()).unwrap_or(0);
    let height = i32::try_from(topology.lattice_height()).unwrap_or(0);
    let mut out = String::with_capacity(usize::try_from((width + 1) * height).unwrap_or(0));

    for y in 0..height {
        for x in 0..width {
            let node = LatticeCoord::new(x, y);
            let glyph = if Some(node) == first {
                'S'
            } else if Some(node) == last {
                'G'
            } else if route_nodes.contains(&node) {
                '*'
            } else {
                node_glyph(topology, exclusions, node)
            };
            out.push(glyph);
        }
        out.push('\n');
    }

    out
}

fn node_glyph(topology: &Topology, exclusions: &ExclusionSet, node: LatticeCoord) -> char {
    if let Some(block) = node.block() {
        if exclusions.contains(block) {
            return 'X';
        }
        return match topology.terrain().kind(block) {
            TerrainKind::Water => '~',
            TerrainKind::Beach => 'b',
            TerrainKind::Dock => 'D',
            TerrainKind::Park => 'P',
            TerrainKind::Land => '#',
        };
    }

    if !topology.is_valid(node, exclusions) {
        return ' ';
    }
    match node.kind() {
        NodeKind::Intersection => '+',
        NodeKind::VerticalMidpoint => '|',
        NodeKind::HorizontalMidpoint | NodeKind::BlockCenter => '-',
    }
}
