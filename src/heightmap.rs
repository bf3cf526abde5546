//! Elevation synthesis and height-level classification.
//!
//! Elevation is composited from a ridged mountain source and a billowed
//! lowland source, chosen per-cell by a selector field, then roughened with
//! turbulence. The raw raster is kept for the drainage, river and rainfall
//! stages; discrete [`HeightLevel`]s come from percentile thresholds so the
//! configured sea/land fractions hold regardless of seed.

use serde::{Deserialize, Serialize};

use crate::calibrate::calculate_threshold;
use crate::noise_field::{sample_plane, NoiseModule, SampleWindow};
use crate::params::WorldParameters;
use crate::raster::{Dimensions, Raster};

/// Discrete elevation band, ordered from sea to peak.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum HeightLevel {
    #[default]
    Sea,
    Land,
    LowMountain,
    MediumMountain,
    HighMountain,
    MountainPeak,
}

impl HeightLevel {
    pub fn display_name(&self) -> &'static str {
        match self {
            HeightLevel::Sea => "Sea",
            HeightLevel::Land => "Land",
            HeightLevel::LowMountain => "Low Mountain",
            HeightLevel::MediumMountain => "Medium Mountain",
            HeightLevel::HighMountain => "High Mountain",
            HeightLevel::MountainPeak => "Mountain Peak",
        }
    }

    pub fn is_mountain(&self) -> bool {
        *self >= HeightLevel::LowMountain
    }
}

/// Calibrated elevation values separating the height bands.
/// Downstream stages compare raw elevation against these directly.
#[derive(Clone, Copy, Debug)]
pub struct HeightThresholds {
    /// At or below this: sea.
    pub sea: f32,
    /// At or below this (and above sea): ordinary land. The tree line.
    pub land: f32,
    pub low_mountain: f32,
    pub medium_mountain: f32,
    pub high_mountain: f32,
}

/// Raw elevation plus its classification.
pub struct HeightMap {
    pub elevation: Raster<f32>,
    pub levels: Raster<HeightLevel>,
    pub thresholds: HeightThresholds,
}

// Shape constants for the composite graph. The flat source is compressed
// into a narrow band near the bottom of the range so lowlands stay low.
const FLAT_SCALE: f64 = 0.125;
const FLAT_BIAS: f64 = -0.75;
const FLAT_FREQUENCY: f64 = 2.0;
const SELECT_EDGE_FALLOFF: f64 = 0.125;
const TURBULENCE_FREQUENCY: f64 = 4.0;
const TURBULENCE_POWER: f64 = 0.125;

/// Build the elevation module graph for a seed.
fn height_module(seed: u64) -> NoiseModule {
    let seed = seed as u32;
    let mountain = NoiseModule::ridged(seed, 1.0);
    let flat = NoiseModule::scale_bias(
        NoiseModule::billow(seed.wrapping_add(1), FLAT_FREQUENCY),
        FLAT_SCALE,
        FLAT_BIAS,
    );
    // Two multiplied Perlin fields give a patchy selector: mountains where
    // both fields agree, lowlands elsewhere.
    let selector = NoiseModule::multiply(
        NoiseModule::perlin(seed.wrapping_add(2), 0.5, 4),
        NoiseModule::perlin(seed.wrapping_add(3), 0.5, 4),
    );
    let blended = NoiseModule::select(
        flat,
        mountain,
        selector,
        0.0,
        1000.0,
        SELECT_EDGE_FALLOFF,
    );
    NoiseModule::turbulence(
        blended,
        seed.wrapping_add(4),
        TURBULENCE_FREQUENCY,
        TURBULENCE_POWER,
    )
}

/// Generate elevation and classify it into height levels.
pub fn generate_heightmap(dims: Dimensions, seed: u64, params: &WorldParameters) -> HeightMap {
    let module = height_module(seed);
    let mut elevation = sample_plane(&module, SampleWindow::standard(), dims);

    // Normalize, square to accentuate peaks, normalize again. Squaring in
    // [0, 1] pushes the median down; the percentile calibration below is
    // what fixes the sea fraction, not the absolute values.
    elevation.normalize();
    for (_, _, v) in elevation.iter_mut() {
        *v = *v * *v;
    }
    elevation.normalize();

    let thresholds = calibrate_thresholds(&elevation, params);
    let levels = classify_levels(&elevation, &thresholds);

    HeightMap {
        elevation,
        levels,
        thresholds,
    }
}

/// Compute the five band thresholds from the configured percentages.
///
/// The three mountain bands split the above-tree-line percentile mass
/// geometrically: each band takes half of what remains.
fn calibrate_thresholds(elevation: &Raster<f32>, params: &WorldParameters) -> HeightThresholds {
    let tree = params.tree_line_percentage;
    let above = 1.0 - tree;

    HeightThresholds {
        sea: calculate_threshold(elevation, params.underwater_percentage),
        land: calculate_threshold(elevation, tree),
        low_mountain: calculate_threshold(elevation, 1.0 - above / 2.0),
        medium_mountain: calculate_threshold(elevation, 1.0 - above / 4.0),
        high_mountain: calculate_threshold(elevation, 1.0 - above / 8.0),
    }
}

/// Classify each cell against the ordered thresholds; the first threshold a
/// value sits at or below wins, anything above all of them is a peak.
fn classify_levels(elevation: &Raster<f32>, thresholds: &HeightThresholds) -> Raster<HeightLevel> {
    let ordered = [
        (thresholds.sea, HeightLevel::Sea),
        (thresholds.land, HeightLevel::Land),
        (thresholds.low_mountain, HeightLevel::LowMountain),
        (thresholds.medium_mountain, HeightLevel::MediumMountain),
        (thresholds.high_mountain, HeightLevel::HighMountain),
    ];

    let mut levels = Raster::new_with(elevation.dimensions(), HeightLevel::Sea);
    for (x, y, &v) in elevation.iter() {
        let level = ordered
            .iter()
            .find(|(threshold, _)| v <= *threshold)
            .map(|(_, level)| *level)
            .unwrap_or(HeightLevel::MountainPeak);
        levels.set(x, y, level);
    }
    levels
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levels_are_ordered() {
        assert!(HeightLevel::Sea < HeightLevel::Land);
        assert!(HeightLevel::Land < HeightLevel::LowMountain);
        assert!(HeightLevel::HighMountain < HeightLevel::MountainPeak);
        assert!(HeightLevel::LowMountain.is_mountain());
        assert!(!HeightLevel::Land.is_mountain());
    }

    #[test]
    fn test_sea_fraction_matches_configured_percentage() {
        let params = WorldParameters::default();
        let map = generate_heightmap(Dimensions::new(64, 64), 1337, &params);

        let sea_cells = map
            .levels
            .iter()
            .filter(|(_, _, &l)| l == HeightLevel::Sea)
            .count();
        let fraction = sea_cells as f32 / map.levels.dimensions().area() as f32;
        assert!(
            (fraction - params.underwater_percentage).abs() < 0.05,
            "sea fraction {fraction} should track underwater_percentage"
        );
    }

    #[test]
    fn test_thresholds_are_monotone() {
        let params = WorldParameters::default();
        let map = generate_heightmap(Dimensions::new(48, 48), 7, &params);
        let t = map.thresholds;
        assert!(t.sea <= t.land);
        assert!(t.land <= t.low_mountain);
        assert!(t.low_mountain <= t.medium_mountain);
        assert!(t.medium_mountain <= t.high_mountain);
    }

    #[test]
    fn test_generation_is_deterministic() {
        let params = WorldParameters::default();
        let a = generate_heightmap(Dimensions::new(32, 32), 42, &params);
        let b = generate_heightmap(Dimensions::new(32, 32), 42, &params);
        assert_eq!(a.elevation.data(), b.elevation.data());
        assert_eq!(a.levels.data(), b.levels.data());
    }

    #[test]
    fn test_elevation_is_normalized() {
        let params = WorldParameters::default();
        let map = generate_heightmap(Dimensions::new(32, 32), 3, &params);
        assert!((map.elevation.min_value() - 0.0).abs() < 1e-6);
        assert!((map.elevation.max_value() - 1.0).abs() < 1e-6);
    }
}
