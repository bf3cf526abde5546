//! World generation parameters.
//!
//! A flat record of named thresholds and weights consumed by every pipeline
//! stage. Stages receive it by reference and never mutate it; all tuning
//! lives here so a saved parameter file plus a seed reproduces a world.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Validation failure for a parameter set.
#[derive(Debug, Error)]
pub enum ParameterError {
    #[error("parameter `{name}` is {value}, expected a fraction in [0, 1]")]
    OutOfRange { name: &'static str, value: f32 },
    #[error("river iteration count must be at least 1")]
    NoRiverIterations,
    #[error("parameter file could not be read: {0}")]
    Io(#[from] std::io::Error),
    #[error("parameter file could not be parsed: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Named thresholds and weights for one generation run.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldParameters {
    /// Fraction of cells classified as sea (elevation percentile).
    pub underwater_percentage: f32,
    /// Elevation percentile separating ordinary land from the mountain bands.
    pub tree_line_percentage: f32,

    /// Drainage percentile below which dry land reads as sandy desert.
    pub desert_percentage: f32,
    /// Drainage percentile below which dry land reads as rocky wasteland.
    pub rocky_percentage: f32,
    /// Drainage percentile below which terrain stays flat rather than hilly.
    pub hills_percentage: f32,

    /// Temperature percentiles for the five band boundaries, coldest first.
    pub coldest_percentage: f32,
    pub colder_percentage: f32,
    pub cold_percentage: f32,
    pub warm_percentage: f32,
    pub warmer_percentage: f32,

    /// Rainfall percentile below which land is barren.
    pub barren_percentage: f32,
    /// Rainfall percentile separating grassland moisture from forest moisture.
    pub grass_percentage: f32,
    /// Rainfall percentile above which conifer-grade moisture begins.
    pub conifer_percentage: f32,

    /// Restrict Coldest/Colder bands to the polar fringe of the map.
    pub cold_zone_enabled: bool,
    /// Fraction of map height the cold zone may reach before cells start
    /// downgrading to Cold.
    pub cold_zone_latitude_limit: f32,

    /// Number of river source attempts per generation run.
    pub river_iterations: u32,
    /// Add a moisture bonus around river cells during rainfall generation.
    pub river_irrigation: bool,
}

impl Default for WorldParameters {
    fn default() -> Self {
        Self {
            underwater_percentage: 0.50,
            tree_line_percentage: 0.85,
            desert_percentage: 0.25,
            rocky_percentage: 0.50,
            hills_percentage: 0.75,
            coldest_percentage: 0.05,
            colder_percentage: 0.18,
            cold_percentage: 0.40,
            warm_percentage: 0.70,
            warmer_percentage: 0.90,
            barren_percentage: 0.15,
            grass_percentage: 0.65,
            conifer_percentage: 0.85,
            cold_zone_enabled: true,
            cold_zone_latitude_limit: 0.12,
            river_iterations: 300,
            river_irrigation: true,
        }
    }
}

impl WorldParameters {
    /// Load parameters from a JSON file. Missing fields fall back to defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ParameterError> {
        let text = std::fs::read_to_string(path)?;
        let params = serde_json::from_str(&text)?;
        Ok(params)
    }

    /// Check every fraction parameter before generation starts.
    ///
    /// The pipeline itself assumes valid inputs; out-of-range percentages
    /// would otherwise produce degenerate rasters silently.
    pub fn validate(&self) -> Result<(), ParameterError> {
        let fractions: [(&'static str, f32); 14] = [
            ("underwater_percentage", self.underwater_percentage),
            ("tree_line_percentage", self.tree_line_percentage),
            ("desert_percentage", self.desert_percentage),
            ("rocky_percentage", self.rocky_percentage),
            ("hills_percentage", self.hills_percentage),
            ("coldest_percentage", self.coldest_percentage),
            ("colder_percentage", self.colder_percentage),
            ("cold_percentage", self.cold_percentage),
            ("warm_percentage", self.warm_percentage),
            ("warmer_percentage", self.warmer_percentage),
            ("barren_percentage", self.barren_percentage),
            ("grass_percentage", self.grass_percentage),
            ("conifer_percentage", self.conifer_percentage),
            ("cold_zone_latitude_limit", self.cold_zone_latitude_limit),
        ];

        for (name, value) in fractions {
            if !(0.0..=1.0).contains(&value) || !value.is_finite() {
                return Err(ParameterError::OutOfRange { name, value });
            }
        }

        if self.river_iterations == 0 {
            return Err(ParameterError::NoRiverIterations);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_parameters_validate() {
        assert!(WorldParameters::default().validate().is_ok());
    }

    #[test]
    fn test_out_of_range_percentage_rejected() {
        let mut params = WorldParameters::default();
        params.underwater_percentage = 1.3;
        let err = params.validate().unwrap_err();
        assert!(matches!(
            err,
            ParameterError::OutOfRange {
                name: "underwater_percentage",
                ..
            }
        ));
    }

    #[test]
    fn test_zero_river_iterations_rejected() {
        let mut params = WorldParameters::default();
        params.river_iterations = 0;
        assert!(matches!(
            params.validate().unwrap_err(),
            ParameterError::NoRiverIterations
        ));
    }

    #[test]
    fn test_json_roundtrip_preserves_fields() {
        let mut params = WorldParameters::default();
        params.underwater_percentage = 0.42;
        params.river_irrigation = false;
        let text = serde_json::to_string(&params).unwrap();
        let back: WorldParameters = serde_json::from_str(&text).unwrap();
        assert_eq!(back.underwater_percentage, 0.42);
        assert!(!back.river_irrigation);
    }
}
