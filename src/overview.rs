//! Reduced-resolution overview layers for the minimap.
//!
//! Discrete rasters are downsampled by majority vote over square blocks, so
//! the overview shows the dominant terrain of each region instead of a
//! blurred average. Color/tile presentation is regenerated from the
//! downsampled classification by the renderer, never averaged directly.

use crate::biomes::TerrainType;
use crate::heightmap::HeightLevel;
use crate::raster::{Dimensions, Raster};
use crate::temperature::TemperatureLevel;

/// Downsampled copies of the discrete world layers.
#[derive(Debug)]
pub struct Overview {
    /// Side length of the source block behind each overview cell.
    pub factor: usize,
    pub terrain: Raster<TerrainType>,
    pub height_levels: Raster<HeightLevel>,
    pub temperature_levels: Raster<TemperatureLevel>,
    pub discovered: Raster<bool>,
}

impl Overview {
    pub fn build(
        terrain: &Raster<TerrainType>,
        height_levels: &Raster<HeightLevel>,
        temperature_levels: &Raster<TemperatureLevel>,
        discovered: &Raster<bool>,
        factor: usize,
    ) -> Self {
        Self {
            factor,
            terrain: downsample_majority(terrain, factor),
            height_levels: downsample_majority(height_levels, factor),
            temperature_levels: downsample_majority(temperature_levels, factor),
            discovered: downsample_majority(discovered, factor),
        }
    }
}

/// Downsample by majority vote over `factor`×`factor` blocks (clipped at the
/// map edges). Ties break toward the value encountered first in row-major
/// block order.
pub fn downsample_majority<T: Copy + PartialEq>(source: &Raster<T>, factor: usize) -> Raster<T> {
    assert!(factor >= 1, "downsample factor must be at least 1");
    if factor == 1 {
        return clone_raster(source);
    }

    let src_dims = source.dimensions();
    let out_dims = Dimensions::new(
        src_dims.width.div_ceil(factor),
        src_dims.height.div_ceil(factor),
    );

    // Seed value is irrelevant; every cell is overwritten below.
    let mut result = Raster::new_with(out_dims, *source.get(0, 0));

    for oy in 0..out_dims.height {
        for ox in 0..out_dims.width {
            let x0 = ox * factor;
            let y0 = oy * factor;
            let x1 = (x0 + factor).min(src_dims.width);
            let y1 = (y0 + factor).min(src_dims.height);

            let mut counts: Vec<(T, usize)> = Vec::new();
            for y in y0..y1 {
                for x in x0..x1 {
                    let value = *source.get(x, y);
                    match counts.iter_mut().find(|(v, _)| *v == value) {
                        Some((_, n)) => *n += 1,
                        None => counts.push((value, 1)),
                    }
                }
            }

            // Strictly-greater comparison keeps the first-encountered value
            // on ties.
            let mut winner = counts[0];
            for &candidate in &counts[1..] {
                if candidate.1 > winner.1 {
                    winner = candidate;
                }
            }
            result.set(ox, oy, winner.0);
        }
    }

    result
}

fn clone_raster<T: Copy>(source: &Raster<T>) -> Raster<T> {
    let mut result = Raster::new_with(source.dimensions(), *source.get(0, 0));
    for (x, y, &v) in source.iter() {
        result.set(x, y, v);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_majority_vote_in_mixed_block() {
        // A 5x5 map with 13 Ocean and 12 Grassland cells downsampled by 5
        // collapses to a single Ocean cell.
        let mut raster = Raster::new_with(Dimensions::new(5, 5), TerrainType::Grassland);
        let mut ocean_placed = 0;
        'outer: for y in 0..5 {
            for x in 0..5 {
                raster.set(x, y, TerrainType::Ocean);
                ocean_placed += 1;
                if ocean_placed == 13 {
                    break 'outer;
                }
            }
        }

        let overview = downsample_majority(&raster, 5);
        assert_eq!(overview.dimensions(), Dimensions::new(1, 1));
        assert_eq!(*overview.get(0, 0), TerrainType::Ocean);
    }

    #[test]
    fn test_tie_breaks_toward_first_occurrence() {
        // 2x2 block: Ocean first in row-major order, then two Grassland and
        // another Ocean -> 2:2 tie, Ocean wins by first occurrence.
        let mut raster = Raster::new_with(Dimensions::new(2, 2), TerrainType::Grassland);
        raster.set(0, 0, TerrainType::Ocean);
        raster.set(1, 1, TerrainType::Ocean);

        let overview = downsample_majority(&raster, 2);
        assert_eq!(*overview.get(0, 0), TerrainType::Ocean);
    }

    #[test]
    fn test_edge_blocks_are_clipped() {
        // 5x3 map downsampled by 2 -> 3x2 overview; right/bottom blocks are
        // partial but still vote.
        let raster = Raster::new_with(Dimensions::new(5, 3), TerrainType::Steppe);
        let overview = downsample_majority(&raster, 2);
        assert_eq!(overview.dimensions(), Dimensions::new(3, 2));
        assert!(overview.iter().all(|(_, _, &v)| v == TerrainType::Steppe));
    }

    #[test]
    fn test_factor_one_is_identity() {
        let mut raster = Raster::new_with(Dimensions::new(3, 3), false);
        raster.set(1, 1, true);
        let overview = downsample_majority(&raster, 1);
        assert_eq!(overview.data(), raster.data());
    }
}
