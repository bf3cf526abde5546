//! Rainfall layer: orographic rain shadow plus river irrigation.
//!
//! A moisture "cloud" sweeps each latitude line west to east. Over the sea it
//! soaks up moisture; over land it deposits a share proportional to the
//! elevation it has to climb; over the mountain bands it dumps at a fixed
//! high rate. The deposited amounts form the rain-shadow raster, which is
//! then blended with noise and an optional irrigation bonus around rivers.
//!
//! Runs after both the height map (elevation bands) and the river generator
//! (irrigation sources).

use crate::calibrate::{calculate_threshold_ignoring_zeros, ValueMapper};
use crate::heightmap::HeightMap;
use crate::noise_field::{sample_plane_normalized, NoiseModule, SampleWindow};
use crate::params::WorldParameters;
use crate::raster::{Position, Raster};
use crate::rivers::RiverNetwork;

/// Final rainfall raster, calibrated and remapped.
pub struct RainfallMap {
    /// Values in [0, 1]; 0 marks sea cells. The configured
    /// barren/grass/conifer percentiles sit at 0.09/0.65/0.88.
    pub values: Raster<f32>,
}

/// Noise seed offset for this stage.
const NOISE_SEED_OFFSET: u64 = 13185;

// Cloud model constants. These set the sweep's dynamic range before
// normalization flattens the scale out.
const INITIAL_CLOUD: f32 = 1.0;
const OCEAN_GAIN: f32 = 1.25;
const CLOUD_MIN: f32 = 0.05;
const CLOUD_MAX: f32 = 2.0;
const LAND_LOSS_MIN: f32 = 0.05;
const LAND_LOSS_MAX: f32 = 0.20;
const LAND_FLAT_BONUS: f32 = 0.01;
const MOUNTAIN_LOSS: f32 = 0.35;

const SHADOW_WEIGHT: f32 = 0.85;
const NOISE_WEIGHT: f32 = 0.085;

// Irrigation falloff: product of independent per-axis exponential decays,
// capped, within a radius-5 square around every river cell.
const IRRIGATION_RADIUS: i32 = 5;
const IRRIGATION_STRENGTH: f32 = 0.3;
const IRRIGATION_DECAY: f32 = 0.4;
const IRRIGATION_CAP: f32 = 0.25;

/// Fixed sub-range boundaries the calibrated percentiles are remapped onto.
const BARREN_BOUNDARY: f32 = 0.09;
const GRASS_BOUNDARY: f32 = 0.65;
const CONIFER_BOUNDARY: f32 = 0.88;

pub fn generate_rainfall(
    height_map: &HeightMap,
    rivers: &RiverNetwork,
    seed: u64,
    params: &WorldParameters,
) -> RainfallMap {
    let dims = height_map.elevation.dimensions();

    let mut shadow = rain_shadow(height_map);
    shadow.normalize();

    let module = NoiseModule::perlin(seed.wrapping_add(NOISE_SEED_OFFSET) as u32, 4.0, 4);
    let noise = sample_plane_normalized(&module, SampleWindow::standard(), dims);

    let irrigation = if params.river_irrigation {
        Some(irrigation_bonus(rivers, dims))
    } else {
        None
    };

    let sea = height_map.thresholds.sea;
    let mut values = Raster::new_with(dims, 0.0f32);
    for (x, y, v) in values.iter_mut() {
        if *height_map.elevation.get(x, y) <= sea {
            *v = 0.0;
            continue;
        }
        let mut rainfall = SHADOW_WEIGHT * shadow.get(x, y) + NOISE_WEIGHT * noise.get(x, y);
        if let Some(irrigation) = &irrigation {
            rainfall += irrigation.get(x, y);
        }
        *v = rainfall;
    }
    values.normalize();

    let mapper = ValueMapper::new(vec![
        (
            calculate_threshold_ignoring_zeros(&values, params.barren_percentage),
            BARREN_BOUNDARY,
        ),
        (
            calculate_threshold_ignoring_zeros(&values, params.grass_percentage),
            GRASS_BOUNDARY,
        ),
        (
            calculate_threshold_ignoring_zeros(&values, params.conifer_percentage),
            CONIFER_BOUNDARY,
        ),
    ]);
    for (x, y, v) in values.iter_mut() {
        if *height_map.elevation.get(x, y) > sea {
            *v = mapper.map(*v);
        }
    }

    RainfallMap { values }
}

/// West-to-east cloud sweep per latitude line.
fn rain_shadow(height_map: &HeightMap) -> Raster<f32> {
    let dims = height_map.elevation.dimensions();
    let sea = height_map.thresholds.sea;
    let land = height_map.thresholds.land;
    let mut shadow = Raster::new_with(dims, 0.0f32);

    for y in 0..dims.height {
        let mut cloud = INITIAL_CLOUD;
        for x in 0..dims.width {
            let elevation = *height_map.elevation.get(x, y);

            if elevation <= sea {
                // Open water recharges the cloud.
                cloud = (cloud * OCEAN_GAIN).clamp(CLOUD_MIN, CLOUD_MAX);
            } else if elevation <= land {
                // Ordinary land: deposit a share that grows with elevation
                // within the land band, then pick up a little ground moisture.
                let t = (elevation - sea) / (land - sea).max(f32::EPSILON);
                let loss_rate = LAND_LOSS_MIN + t * (LAND_LOSS_MAX - LAND_LOSS_MIN);
                let deposit = cloud * loss_rate;
                cloud -= deposit;
                shadow.set(x, y, deposit);
                cloud = (cloud + LAND_FLAT_BONUS).max(CLOUD_MIN);
            } else {
                // Mountains wring the cloud out at a fixed high rate.
                let deposit = cloud * MOUNTAIN_LOSS;
                cloud -= deposit;
                shadow.set(x, y, deposit);
            }
        }
    }

    shadow
}

/// Moisture bonus around river cells; overlapping rivers take the maximum
/// rather than stacking.
fn irrigation_bonus(rivers: &RiverNetwork, dims: crate::raster::Dimensions) -> Raster<f32> {
    let mut irrigation = Raster::new_with(dims, 0.0f32);

    for Position { x, y } in rivers.river_cells() {
        for dy in -IRRIGATION_RADIUS..=IRRIGATION_RADIUS {
            for dx in -IRRIGATION_RADIUS..=IRRIGATION_RADIUS {
                let nx = x as i32 + dx;
                let ny = y as i32 + dy;
                if !dims.contains(nx, ny) {
                    continue;
                }
                let falloff_x = (-IRRIGATION_DECAY * dx.abs() as f32).exp();
                let falloff_y = (-IRRIGATION_DECAY * dy.abs() as f32).exp();
                let bonus = (IRRIGATION_STRENGTH * falloff_x * falloff_y).min(IRRIGATION_CAP);

                let nx = nx as usize;
                let ny = ny as usize;
                if bonus > *irrigation.get(nx, ny) {
                    irrigation.set(nx, ny, bonus);
                }
            }
        }
    }

    irrigation
}
