//! River tracing over the elevation field.
//!
//! Each river starts at a random highland cell and walks steepest-descent
//! through its 8-neighbourhood until it reaches the sea, runs into existing
//! water, or bottoms out in a pit (which becomes a lake). Completed paths are
//! then classified into directional connector tiles for rendering.
//!
//! A trace that touches another river stops there and records a join on the
//! touched river, so tributary mouths classify as 3-way junctions.

use std::collections::{HashMap, HashSet};

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::heightmap::HeightMap;
use crate::params::WorldParameters;
use crate::raster::{Position, Raster};

/// RNG seed offset for this stage.
const RNG_SEED_OFFSET: u64 = 333211;

/// Compass direction of a river connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    North,
    East,
    South,
    West,
}

impl Direction {
    /// Bit in the connector mask: N=1, E=2, S=4, W=8.
    pub fn bit(&self) -> u8 {
        match self {
            Direction::North => 1,
            Direction::East => 2,
            Direction::South => 4,
            Direction::West => 8,
        }
    }

    /// Direction from one cell toward an 8-adjacent cell. Diagonal steps
    /// reduce to their horizontal component so connector tiles stay
    /// 4-directional.
    pub fn between(from: Position, to: Position) -> Direction {
        let dx = to.x as i32 - from.x as i32;
        let dy = to.y as i32 - from.y as i32;
        debug_assert!(dx.abs() <= 1 && dy.abs() <= 1 && (dx, dy) != (0, 0));
        if dx > 0 {
            Direction::East
        } else if dx < 0 {
            Direction::West
        } else if dy > 0 {
            Direction::South
        } else {
            Direction::North
        }
    }
}

/// Connector shape of a river cell, derived from its connection mask.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RiverTileType {
    /// Head of a river (or an isolated one-cell river).
    Source,
    Horizontal,
    Vertical,
    /// Corners are named by the two sides they connect.
    CornerNorthEast,
    CornerNorthWest,
    CornerSouthEast,
    CornerSouthWest,
    /// Tees are named by the side the third arm points at.
    TeeNorth,
    TeeEast,
    TeeSouth,
    TeeWest,
    Cross,
}

/// Connector shape for each of the 16 possible direction masks
/// (index = N·1 + E·2 + S·4 + W·8).
const TILE_LOOKUP: [RiverTileType; 16] = [
    RiverTileType::Source,          // 0b0000 no connections
    RiverTileType::Vertical,        // 0b0001 N
    RiverTileType::Horizontal,      // 0b0010 E
    RiverTileType::CornerNorthEast, // 0b0011 N+E
    RiverTileType::Vertical,        // 0b0100 S
    RiverTileType::Vertical,        // 0b0101 N+S
    RiverTileType::CornerSouthEast, // 0b0110 E+S
    RiverTileType::TeeEast,         // 0b0111 N+E+S
    RiverTileType::Horizontal,      // 0b1000 W
    RiverTileType::CornerNorthWest, // 0b1001 N+W
    RiverTileType::Horizontal,      // 0b1010 E+W
    RiverTileType::TeeNorth,        // 0b1011 N+E+W
    RiverTileType::CornerSouthWest, // 0b1100 S+W
    RiverTileType::TeeWest,         // 0b1101 N+S+W
    RiverTileType::TeeSouth,        // 0b1110 E+S+W
    RiverTileType::Cross,           // 0b1111 all four
];

/// Connector shape for a direction mask.
pub fn tile_for_mask(mask: u8) -> RiverTileType {
    TILE_LOOKUP[(mask & 0x0F) as usize]
}

/// An ordered river path with O(1) membership tests.
#[derive(Clone, Debug)]
pub struct River {
    path: Vec<Position>,
    cells: HashSet<Position>,
}

impl River {
    pub fn new(source: Position) -> Self {
        let mut cells = HashSet::new();
        cells.insert(source);
        Self {
            path: vec![source],
            cells,
        }
    }

    pub fn push(&mut self, pos: Position) {
        debug_assert!(!self.cells.contains(&pos), "river path must not revisit a cell");
        self.path.push(pos);
        self.cells.insert(pos);
    }

    pub fn contains(&self, pos: Position) -> bool {
        self.cells.contains(&pos)
    }

    pub fn path(&self) -> &[Position] {
        &self.path
    }

    pub fn source(&self) -> Position {
        self.path[0]
    }

    pub fn len(&self) -> usize {
        self.path.len()
    }

    pub fn is_empty(&self) -> bool {
        false // a river always has at least its source cell
    }
}

/// All rivers and lakes of a generation run.
pub struct RiverNetwork {
    pub rivers: Vec<River>,
    /// Pit cells where a trace bottomed out.
    pub lakes: Vec<Position>,
    /// Tributary mouths: position on the joined river, with the directions
    /// tributaries come in from.
    pub joins: HashMap<Position, Vec<Direction>>,
    /// Connector classification for every river cell.
    pub tiles: Raster<Option<RiverTileType>>,
}

impl RiverNetwork {
    /// Iterate over every river path cell.
    pub fn river_cells(&self) -> impl Iterator<Item = Position> + '_ {
        self.rivers.iter().flat_map(|r| r.path().iter().copied())
    }
}

/// Why a trace step ended.
enum StepOutcome {
    /// Continue to this neighbour.
    Descend(Position),
    /// No downhill neighbour: the current cell becomes a lake.
    Pit,
    /// Adjacent to sea, another river or a lake; the path ends as-is.
    Blocked,
}

pub fn generate_rivers(height_map: &HeightMap, seed: u64, params: &WorldParameters) -> RiverNetwork {
    let dims = height_map.elevation.dimensions();
    let mut rng = ChaCha8Rng::seed_from_u64(seed.wrapping_add(RNG_SEED_OFFSET));

    // Candidate sources: the highland band between the tree line and the low
    // mountains. Collected once, consumed without replacement.
    let mut sources: Vec<Position> = height_map
        .elevation
        .iter()
        .filter(|(_, _, &v)| {
            v >= height_map.thresholds.land && v < height_map.thresholds.low_mountain
        })
        .map(|(x, y, _)| Position::new(x, y))
        .collect();

    let mut rivers: Vec<River> = Vec::new();
    let mut occupied: HashMap<Position, usize> = HashMap::new();
    let mut lakes: Vec<Position> = Vec::new();
    let mut lake_set: HashSet<Position> = HashSet::new();
    let mut joins: HashMap<Position, Vec<Direction>> = HashMap::new();

    for _ in 0..params.river_iterations {
        let Some(source) = draw_source(&mut sources, &mut rng) else {
            break;
        };
        if occupied.contains_key(&source) || lake_set.contains(&source) {
            continue;
        }

        let mut river = River::new(source);
        let mut prev: Option<Position> = None;
        let mut current = source;

        loop {
            let outcome = step(
                height_map,
                &river,
                current,
                prev,
                &occupied,
                &lake_set,
                &mut joins,
            );
            match outcome {
                StepOutcome::Descend(next) => {
                    river.push(next);
                    prev = Some(current);
                    current = next;
                }
                StepOutcome::Pit => {
                    lakes.push(current);
                    lake_set.insert(current);
                    break;
                }
                StepOutcome::Blocked => break,
            }
        }

        let index = rivers.len();
        for &pos in river.path() {
            occupied.insert(pos, index);
        }
        rivers.push(river);
    }

    let tiles = classify_tiles(&rivers, &joins, dims);

    RiverNetwork {
        rivers,
        lakes,
        joins,
        tiles,
    }
}

fn draw_source(sources: &mut Vec<Position>, rng: &mut ChaCha8Rng) -> Option<Position> {
    if sources.is_empty() {
        return None;
    }
    let idx = rng.gen_range(0..sources.len());
    Some(sources.swap_remove(idx))
}

/// Examine the 8 neighbours of the current cell and decide the next move.
///
/// Neighbours are scanned clockwise from north, so the first blocking
/// neighbour encountered is deterministic for a given map.
fn step(
    height_map: &HeightMap,
    river: &River,
    current: Position,
    prev: Option<Position>,
    occupied: &HashMap<Position, usize>,
    lake_set: &HashSet<Position>,
    joins: &mut HashMap<Position, Vec<Direction>>,
) -> StepOutcome {
    let elevation_here = *height_map.elevation.get_pos(current);
    let mut best: Option<(Position, f32)> = None;

    for neighbour in height_map.elevation.neighbours_8(current.x, current.y) {
        if Some(neighbour) == prev || river.contains(neighbour) {
            continue;
        }

        // Contact with another river ends the trace and records the join so
        // the mouth classifies as a junction.
        if occupied.contains_key(&neighbour) {
            joins
                .entry(neighbour)
                .or_default()
                .push(Direction::between(neighbour, current));
            return StepOutcome::Blocked;
        }
        if lake_set.contains(&neighbour) {
            return StepOutcome::Blocked;
        }
        // Reached the sea.
        if *height_map.elevation.get_pos(neighbour) <= height_map.thresholds.sea {
            return StepOutcome::Blocked;
        }

        let delta = *height_map.elevation.get_pos(neighbour) - elevation_here;
        match best {
            Some((_, best_delta)) if delta >= best_delta => {}
            _ => best = Some((neighbour, delta)),
        }
    }

    match best {
        Some((next, delta)) if delta < 0.0 => StepOutcome::Descend(next),
        // Local minimum (or no admissible neighbour): pond here.
        _ => StepOutcome::Pit,
    }
}

/// Classify every river cell by the mask of directions it connects to.
fn classify_tiles(
    rivers: &[River],
    joins: &HashMap<Position, Vec<Direction>>,
    dims: crate::raster::Dimensions,
) -> Raster<Option<RiverTileType>> {
    let mut tiles: Raster<Option<RiverTileType>> = Raster::new_with(dims, None);

    for river in rivers {
        let path = river.path();
        for (i, &pos) in path.iter().enumerate() {
            if i == 0 {
                tiles.set_pos(pos, Some(RiverTileType::Source));
                continue;
            }

            let mut mask = Direction::between(pos, path[i - 1]).bit();
            if i + 1 < path.len() {
                mask |= Direction::between(pos, path[i + 1]).bit();
            }
            if let Some(tributaries) = joins.get(&pos) {
                for dir in tributaries {
                    mask |= dir.bit();
                }
            }
            tiles.set_pos(pos, Some(tile_for_mask(mask)));
        }
    }

    tiles
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heightmap::generate_heightmap;
    use crate::raster::Dimensions;

    fn network_for(seed: u64) -> (crate::heightmap::HeightMap, RiverNetwork) {
        let params = WorldParameters::default();
        let height_map = generate_heightmap(Dimensions::new(64, 64), seed, &params);
        let network = generate_rivers(&height_map, seed, &params);
        (height_map, network)
    }

    #[test]
    fn test_paths_are_valid() {
        let (height_map, network) = network_for(1337);
        let dims = height_map.elevation.dimensions();

        for river in &network.rivers {
            let path = river.path();
            let unique: HashSet<Position> = path.iter().copied().collect();
            assert_eq!(unique.len(), path.len(), "no duplicate positions");

            for pos in path {
                assert!(dims.contains(pos.x as i32, pos.y as i32));
            }
            for pair in path.windows(2) {
                assert_eq!(
                    pair[0].chebyshev_distance(pair[1]),
                    1,
                    "consecutive cells must be 8-neighbours"
                );
            }
        }
    }

    #[test]
    fn test_some_rivers_or_lakes_exist() {
        let (_, network) = network_for(1337);
        assert!(
            !network.rivers.is_empty() || !network.lakes.is_empty(),
            "default parameters on a 64x64 map should produce water features"
        );
    }

    #[test]
    fn test_tracing_is_deterministic() {
        let (_, a) = network_for(99);
        let (_, b) = network_for(99);
        assert_eq!(a.rivers.len(), b.rivers.len());
        for (ra, rb) in a.rivers.iter().zip(&b.rivers) {
            assert_eq!(ra.path(), rb.path());
        }
        assert_eq!(a.lakes, b.lakes);
    }

    #[test]
    fn test_tile_lookup_covers_all_masks() {
        use RiverTileType::*;
        let expected = [
            (0b0000, Source),
            (0b0001, Vertical),
            (0b0010, Horizontal),
            (0b0011, CornerNorthEast),
            (0b0100, Vertical),
            (0b0101, Vertical),
            (0b0110, CornerSouthEast),
            (0b0111, TeeEast),
            (0b1000, Horizontal),
            (0b1001, CornerNorthWest),
            (0b1010, Horizontal),
            (0b1011, TeeNorth),
            (0b1100, CornerSouthWest),
            (0b1101, TeeWest),
            (0b1110, TeeSouth),
            (0b1111, Cross),
        ];
        for (mask, tile) in expected {
            assert_eq!(tile_for_mask(mask), tile, "mask {mask:#06b}");
        }
    }

    #[test]
    fn test_straight_east_path_classifies_horizontal() {
        let mut river = River::new(Position::new(1, 1));
        river.push(Position::new(2, 1));
        river.push(Position::new(3, 1));

        let tiles = classify_tiles(&[river], &HashMap::new(), Dimensions::new(5, 3));
        assert_eq!(*tiles.get(1, 1), Some(RiverTileType::Source));
        assert_eq!(*tiles.get(2, 1), Some(RiverTileType::Horizontal));
        assert_eq!(*tiles.get(3, 1), Some(RiverTileType::Horizontal));
    }

    #[test]
    fn test_turn_classifies_as_corner() {
        // Arrives from the north, departs to the east: the bend connects its
        // north and east sides.
        let mut river = River::new(Position::new(2, 0));
        river.push(Position::new(2, 1));
        river.push(Position::new(3, 1));

        let tiles = classify_tiles(&[river], &HashMap::new(), Dimensions::new(5, 3));
        assert_eq!(*tiles.get(2, 1), Some(RiverTileType::CornerNorthEast));
    }

    #[test]
    fn test_join_promotes_tile_to_junction() {
        // Main river flowing east through y=1; a tributary joins cell (2,1)
        // from the south.
        let mut main = River::new(Position::new(1, 1));
        main.push(Position::new(2, 1));
        main.push(Position::new(3, 1));

        let mut joins = HashMap::new();
        joins.insert(Position::new(2, 1), vec![Direction::South]);

        let tiles = classify_tiles(&[main], &joins, Dimensions::new(5, 4));
        assert_eq!(*tiles.get(2, 1), Some(RiverTileType::TeeSouth));
    }

    #[test]
    fn test_degenerate_river_is_a_lone_source() {
        let river = River::new(Position::new(2, 2));
        let tiles = classify_tiles(&[river], &HashMap::new(), Dimensions::new(5, 5));
        assert_eq!(*tiles.get(2, 2), Some(RiverTileType::Source));
    }

    #[test]
    fn test_rivers_descend_or_end_in_lake() {
        let (height_map, network) = network_for(7);
        for river in &network.rivers {
            for pair in river.path().windows(2) {
                let here = *height_map.elevation.get_pos(pair[0]);
                let next = *height_map.elevation.get_pos(pair[1]);
                assert!(next < here, "river must flow strictly downhill");
            }
        }
    }
}
