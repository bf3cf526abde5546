//! Drainage layer: local terrain roughness blended with noise.
//!
//! Drainage here means how dissected the local terrain is. Cells in rough
//! neighbourhoods (high elevation standard deviation) drain well; flat basins
//! pond. Sea cells and the high mountain bands are excluded outright; the
//! biome mapper never consults drainage there.

use crate::calibrate::{calculate_threshold_ignoring_zeros, ValueMapper};
use crate::heightmap::HeightMap;
use crate::noise_field::{sample_plane_normalized, NoiseModule, SampleWindow};
use crate::params::WorldParameters;
use crate::raster::Raster;

/// Final drainage raster, already calibrated and remapped.
pub struct DrainageMap {
    /// Values in [0, 1]; 0 marks cells excluded from drainage (sea, peaks).
    /// The configured desert/rocky/hills percentiles sit at 0.32/0.49/0.65.
    pub values: Raster<f32>,
}

/// Noise seed offset for this stage.
const NOISE_SEED_OFFSET: u64 = 44122;

/// Side length of the square neighbourhood the std-dev is computed over.
const WINDOW_SIZE: usize = 16;

const STD_DEV_WEIGHT: f32 = 0.75;
const NOISE_WEIGHT: f32 = 0.75;

/// Fixed sub-range boundaries the calibrated percentiles are remapped onto.
const DESERT_BOUNDARY: f32 = 0.32;
const ROCKY_BOUNDARY: f32 = 0.49;
const HILLS_BOUNDARY: f32 = 0.65;

pub fn generate_drainage(height_map: &HeightMap, seed: u64, params: &WorldParameters) -> DrainageMap {
    let dims = height_map.elevation.dimensions();

    let mut std_dev = local_std_dev(&height_map.elevation, WINDOW_SIZE);
    std_dev.normalize();

    let module = NoiseModule::perlin(seed.wrapping_add(NOISE_SEED_OFFSET) as u32, 8.0, 2);
    let noise = sample_plane_normalized(&module, SampleWindow::standard(), dims);

    let sea = height_map.thresholds.sea;
    let high_mountain = height_map.thresholds.high_mountain;

    let mut values = Raster::new_with(dims, 0.0f32);
    for (x, y, v) in values.iter_mut() {
        let elevation = *height_map.elevation.get(x, y);
        if elevation <= sea || elevation >= high_mountain {
            *v = 0.0;
        } else {
            *v = STD_DEV_WEIGHT * std_dev.get(x, y) + NOISE_WEIGHT * noise.get(x, y);
        }
    }
    values.normalize();

    // Calibrate over land cells only; the forced zeros would otherwise pull
    // every percentile toward the floor.
    let mapper = ValueMapper::new(vec![
        (
            calculate_threshold_ignoring_zeros(&values, params.desert_percentage),
            DESERT_BOUNDARY,
        ),
        (
            calculate_threshold_ignoring_zeros(&values, params.rocky_percentage),
            ROCKY_BOUNDARY,
        ),
        (
            calculate_threshold_ignoring_zeros(&values, params.hills_percentage),
            HILLS_BOUNDARY,
        ),
    ]);
    for (x, y, v) in values.iter_mut() {
        let elevation = *height_map.elevation.get(x, y);
        if elevation > sea && elevation < high_mountain {
            *v = mapper.map(*v);
        }
    }

    DrainageMap { values }
}

/// Standard deviation of elevation within a centered square window, clipped
/// at the map edges.
fn local_std_dev(elevation: &Raster<f32>, window: usize) -> Raster<f32> {
    let dims = elevation.dimensions();
    let half = (window / 2) as i32;
    let mut result = Raster::new_with(dims, 0.0f32);

    for (x, y, out) in result.iter_mut() {
        let x0 = (x as i32 - half).max(0) as usize;
        let x1 = (x as i32 + half).min(dims.width as i32 - 1) as usize;
        let y0 = (y as i32 - half).max(0) as usize;
        let y1 = (y as i32 + half).min(dims.height as i32 - 1) as usize;

        let mut sum = 0.0f32;
        let mut count = 0usize;
        for wy in y0..=y1 {
            for wx in x0..=x1 {
                sum += elevation.get(wx, wy);
                count += 1;
            }
        }
        let mean = sum / count as f32;

        let mut var = 0.0f32;
        for wy in y0..=y1 {
            for wx in x0..=x1 {
                let d = elevation.get(wx, wy) - mean;
                var += d * d;
            }
        }
        *out = (var / count as f32).sqrt();
    }

    result
}
