//! ASCII rendering of the generated world.
//!
//! One character per map cell. River cells use box-drawing connectors picked
//! from the tile classification so channels read as continuous lines.

use std::fs::File;
use std::io::{self, Write};

use crate::biomes::TerrainType;
use crate::rivers::RiverTileType;
use crate::world::World;

/// Map glyph for a terrain type.
pub fn terrain_char(terrain: TerrainType) -> char {
    match terrain {
        TerrainType::Ocean => '~',
        TerrainType::SeaIce => '-',
        TerrainType::Glacier => '*',
        TerrainType::Tundra => ':',
        TerrainType::SandDesert => 'd',
        TerrainType::Badlands => 'b',
        TerrainType::RockyWasteland => 'r',
        TerrainType::Steppe => ',',
        TerrainType::Savanna => ';',
        TerrainType::Shrubland => '"',
        TerrainType::Grassland => '.',
        TerrainType::Woodland => 'w',
        TerrainType::TropicalDryForest => 't',
        TerrainType::Hills => 'n',
        TerrainType::Marsh => 'm',
        TerrainType::Swamp => 'S',
        TerrainType::TropicalBroadleafForest => 'T',
        TerrainType::TemperateBroadleafForest => 'F',
        TerrainType::ConiferousForest => 'C',
        TerrainType::ForestedHills => 'f',
        TerrainType::LowMountain => '^',
        TerrainType::MediumMountain => 'M',
        TerrainType::HighMountain => 'A',
        TerrainType::MountainPeak => '@',
        TerrainType::River => '|',
        TerrainType::Lake => 'o',
        TerrainType::Unknown => '?',
    }
}

/// Connector glyph for a classified river cell.
pub fn river_tile_char(tile: RiverTileType) -> char {
    match tile {
        RiverTileType::Source => '·',
        RiverTileType::Horizontal => '─',
        RiverTileType::Vertical => '│',
        RiverTileType::CornerNorthEast => '└',
        RiverTileType::CornerNorthWest => '┘',
        RiverTileType::CornerSouthEast => '┌',
        RiverTileType::CornerSouthWest => '┐',
        RiverTileType::TeeNorth => '┴',
        RiverTileType::TeeEast => '├',
        RiverTileType::TeeSouth => '┬',
        RiverTileType::TeeWest => '┤',
        RiverTileType::Cross => '┼',
    }
}

/// Render the full map, one line per row. River connectors override the
/// terrain glyph wherever a river tile was classified.
pub fn render_world(world: &World) -> String {
    let dims = world.dimensions;
    let mut out = String::with_capacity((dims.width + 1) * dims.height);

    for y in 0..dims.height {
        for x in 0..dims.width {
            let ch = match world.river_tiles.get(x, y) {
                Some(tile) => river_tile_char(*tile),
                None => terrain_char(*world.terrain.get(x, y)),
            };
            out.push(ch);
        }
        out.push('\n');
    }

    out
}

/// Render the overview terrain layer.
pub fn render_overview(world: &World) -> String {
    let dims = world.overview.terrain.dimensions();
    let mut out = String::with_capacity((dims.width + 1) * dims.height);

    for y in 0..dims.height {
        for x in 0..dims.width {
            out.push(terrain_char(*world.overview.terrain.get(x, y)));
        }
        out.push('\n');
    }

    out
}

/// Write the rendered map to a text file with a small header.
pub fn export_ascii(world: &World, path: &str) -> io::Result<()> {
    let mut file = File::create(path)?;
    writeln!(
        file,
        "# {}x{} seed {}",
        world.dimensions.width, world.dimensions.height, world.seed
    )?;
    file.write_all(render_world(world).as_bytes())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::WorldParameters;
    use crate::raster::Dimensions;
    use crate::world::generate;

    #[test]
    fn test_rendered_lines_match_dimensions() {
        let params = WorldParameters::default();
        let world = generate(Dimensions::new(32, 24), 7, &params).unwrap();
        let rendered = render_world(&world);

        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines.len(), 24);
        assert!(lines.iter().all(|l| l.chars().count() == 32));
    }

    #[test]
    fn test_terrain_glyphs_are_distinct_for_water() {
        assert_ne!(
            terrain_char(TerrainType::Ocean),
            terrain_char(TerrainType::Lake)
        );
        assert_ne!(
            terrain_char(TerrainType::Ocean),
            terrain_char(TerrainType::Grassland)
        );
    }

    #[test]
    fn test_river_cells_use_connector_glyphs() {
        let params = WorldParameters::default();
        let world = generate(Dimensions::new(64, 64), 1337, &params).unwrap();
        let rendered = render_world(&world);
        let rows: Vec<Vec<char>> = rendered.lines().map(|l| l.chars().collect()).collect();

        for (x, y, tile) in world.river_tiles.iter() {
            if let Some(tile) = tile {
                assert_eq!(rows[y][x], river_tile_char(*tile));
            }
        }
    }
}
