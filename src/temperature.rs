//! Temperature layer: latitude ramp blended with noise.
//!
//! Row 0 is the cold pole; temperature rises toward the bottom of the map.
//! Classification happens against raw percentile thresholds; a separate
//! display raster remaps those thresholds onto fixed sub-ranges so renderers
//! get a stable color scale whatever the configured percentages are.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::calibrate::{calculate_threshold, ValueMapper};
use crate::noise_field::{sample_plane_normalized, NoiseModule, SampleWindow};
use crate::params::WorldParameters;
use crate::raster::{Dimensions, Raster};

/// Discrete temperature band, ordered coldest first.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TemperatureLevel {
    #[default]
    Coldest,
    Colder,
    Cold,
    Warm,
    Warmer,
    Warmest,
}

impl TemperatureLevel {
    pub fn display_name(&self) -> &'static str {
        match self {
            TemperatureLevel::Coldest => "Coldest",
            TemperatureLevel::Colder => "Colder",
            TemperatureLevel::Cold => "Cold",
            TemperatureLevel::Warm => "Warm",
            TemperatureLevel::Warmer => "Warmer",
            TemperatureLevel::Warmest => "Warmest",
        }
    }
}

/// Raw threshold values for the five band boundaries, reused by the biome
/// mapper's climate-zone logic.
#[derive(Clone, Copy, Debug)]
pub struct TemperatureThresholds {
    pub coldest: f32,
    pub colder: f32,
    pub cold: f32,
    pub warm: f32,
    pub warmer: f32,
}

/// Classified temperature plus both float rasters.
pub struct TemperatureMap {
    pub levels: Raster<TemperatureLevel>,
    /// Normalized gradient+noise blend; what the thresholds were computed on.
    pub raw: Raster<f32>,
    /// Raw values remapped so band boundaries land on fixed display values.
    pub display: Raster<f32>,
    pub thresholds: TemperatureThresholds,
}

/// Noise seed offset for this stage.
const NOISE_SEED_OFFSET: u64 = 1337;
/// RNG seed offset for the cold-zone downgrade.
const COLD_ZONE_SEED_OFFSET: u64 = 12842;

const GRADIENT_WEIGHT: f32 = 1.0;
const NOISE_WEIGHT: f32 = 0.25;

/// Fixed display values each band boundary is remapped onto.
const DISPLAY_BOUNDARIES: [f32; 5] = [0.15, 0.35, 0.55, 0.75, 0.85];

/// Width of the band (as a fraction of map height) over which the cold-zone
/// downgrade probability ramps from 0 to 1.
const COLD_ZONE_TRANSITION: f32 = 0.1;

pub fn generate_temperature(
    dims: Dimensions,
    seed: u64,
    params: &WorldParameters,
) -> TemperatureMap {
    // High-frequency, low-octave noise: local variation without overriding
    // the latitude gradient.
    let module = NoiseModule::perlin(seed.wrapping_add(NOISE_SEED_OFFSET) as u32, 8.0, 2);
    let noise = sample_plane_normalized(&module, SampleWindow::standard(), dims);

    let mut raw = Raster::new_with(dims, 0.0f32);
    for (x, y, v) in raw.iter_mut() {
        let gradient = y as f32 / dims.height as f32;
        *v = GRADIENT_WEIGHT * gradient + NOISE_WEIGHT * noise.get(x, y);
    }
    raw.normalize();

    let thresholds = TemperatureThresholds {
        coldest: calculate_threshold(&raw, params.coldest_percentage),
        colder: calculate_threshold(&raw, params.colder_percentage),
        cold: calculate_threshold(&raw, params.cold_percentage),
        warm: calculate_threshold(&raw, params.warm_percentage),
        warmer: calculate_threshold(&raw, params.warmer_percentage),
    };

    let mut levels = Raster::new_with(dims, TemperatureLevel::Coldest);
    for (x, y, &v) in raw.iter() {
        levels.set(x, y, classify(v, &thresholds));
    }

    if params.cold_zone_enabled {
        apply_cold_zone_limit(&mut levels, seed, params);
    }

    let mapper = ValueMapper::new(vec![
        (thresholds.coldest, DISPLAY_BOUNDARIES[0]),
        (thresholds.colder, DISPLAY_BOUNDARIES[1]),
        (thresholds.cold, DISPLAY_BOUNDARIES[2]),
        (thresholds.warm, DISPLAY_BOUNDARIES[3]),
        (thresholds.warmer, DISPLAY_BOUNDARIES[4]),
    ]);
    let mut display = raw.clone();
    mapper.apply(&mut display);

    TemperatureMap {
        levels,
        raw,
        display,
        thresholds,
    }
}

fn classify(value: f32, t: &TemperatureThresholds) -> TemperatureLevel {
    if value <= t.coldest {
        TemperatureLevel::Coldest
    } else if value <= t.colder {
        TemperatureLevel::Colder
    } else if value <= t.cold {
        TemperatureLevel::Cold
    } else if value <= t.warm {
        TemperatureLevel::Warm
    } else if value <= t.warmer {
        TemperatureLevel::Warmer
    } else {
        TemperatureLevel::Warmest
    }
}

/// Probabilistically downgrade Colder/Coldest cells that lie equatorward of
/// the configured cold-zone limit to Cold. The downgrade chance ramps up
/// smoothly with the distance past the limit, so the zone edge stays ragged
/// instead of forming a hard line.
fn apply_cold_zone_limit(
    levels: &mut Raster<TemperatureLevel>,
    seed: u64,
    params: &WorldParameters,
) {
    let height = levels.height() as f32;
    let boundary = params.cold_zone_latitude_limit * height;
    let transition = (COLD_ZONE_TRANSITION * height).max(1.0);
    let mut rng = ChaCha8Rng::seed_from_u64(seed.wrapping_add(COLD_ZONE_SEED_OFFSET));

    for (_, y, level) in levels.iter_mut() {
        let overshoot = y as f32 - boundary;
        if overshoot <= 0.0 {
            continue;
        }
        if *level == TemperatureLevel::Coldest || *level == TemperatureLevel::Colder {
            let p = smoothstep(overshoot / transition);
            if rng.gen::<f32>() < p {
                *level = TemperatureLevel::Cold;
            }
        }
    }
}

fn smoothstep(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_top_rows_colder_than_bottom_rows() {
        let params = WorldParameters::default();
        let map = generate_temperature(Dimensions::new(32, 64), 11, &params);

        let top_avg: f32 = (0..32).map(|x| map.raw.get(x, 1)).sum::<f32>() / 32.0;
        let bottom_avg: f32 = (0..32).map(|x| map.raw.get(x, 62)).sum::<f32>() / 32.0;
        assert!(top_avg < bottom_avg, "latitude gradient must dominate");
    }

    #[test]
    fn test_thresholds_are_monotone() {
        let params = WorldParameters::default();
        let map = generate_temperature(Dimensions::new(32, 32), 5, &params);
        let t = map.thresholds;
        assert!(t.coldest <= t.colder);
        assert!(t.colder <= t.cold);
        assert!(t.cold <= t.warm);
        assert!(t.warm <= t.warmer);
    }

    #[test]
    fn test_display_remap_hits_fixed_boundaries() {
        let params = WorldParameters::default();
        let map = generate_temperature(Dimensions::new(32, 32), 5, &params);
        let mapper = ValueMapper::new(vec![
            (map.thresholds.coldest, 0.15),
            (map.thresholds.colder, 0.35),
            (map.thresholds.cold, 0.55),
            (map.thresholds.warm, 0.75),
            (map.thresholds.warmer, 0.85),
        ]);
        assert!((mapper.map(map.thresholds.cold) - 0.55).abs() < 1e-6);
        assert!((mapper.map(map.thresholds.warmer) - 0.85).abs() < 1e-6);
    }

    #[test]
    fn test_cold_zone_limit_reduces_polar_levels_inland() {
        let mut params = WorldParameters::default();
        params.cold_zone_enabled = false;
        let without = generate_temperature(Dimensions::new(48, 96), 21, &params);

        params.cold_zone_enabled = true;
        let with = generate_temperature(Dimensions::new(48, 96), 21, &params);

        let boundary = (params.cold_zone_latitude_limit * 96.0) as usize;
        let count_cold = |map: &TemperatureMap| {
            map.levels
                .iter()
                .filter(|(_, y, &l)| *y > boundary + 9 && l <= TemperatureLevel::Colder)
                .count()
        };
        assert!(
            count_cold(&with) < count_cold(&without)
                || count_cold(&without) == 0,
            "cold zone clamp should strip Colder/Coldest cells past the limit"
        );
    }

    #[test]
    fn test_generation_is_deterministic() {
        let params = WorldParameters::default();
        let a = generate_temperature(Dimensions::new(32, 32), 42, &params);
        let b = generate_temperature(Dimensions::new(32, 32), 42, &params);
        assert_eq!(a.levels.data(), b.levels.data());
        assert_eq!(a.display.data(), b.display.data());
    }
}
