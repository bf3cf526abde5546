//! Terrain classification: the final per-cell biome decision.
//!
//! Combines the discrete height and temperature levels with the calibrated
//! drainage and rainfall rasters. The branch thresholds here are deliberate
//! literal constants, not derived from `WorldParameters`: biome boundaries
//! are meant to be stable under parameter tuning, because the upstream
//! calibration already pinned the drainage/rainfall sub-ranges they test
//! against.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::drainage::DrainageMap;
use crate::heightmap::{HeightLevel, HeightMap};
use crate::rainfall::RainfallMap;
use crate::raster::Raster;
use crate::temperature::{TemperatureLevel, TemperatureMap, TemperatureThresholds};

/// RNG seed offset for this stage.
const RNG_SEED_OFFSET: u64 = 1443285;

/// Final terrain classification of a cell.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TerrainType {
    #[default]
    Ocean,
    SeaIce,
    Glacier,
    Tundra,

    SandDesert,
    Badlands,
    RockyWasteland,

    Steppe,
    Savanna,
    Shrubland,
    Grassland,
    Woodland,
    TropicalDryForest,
    Hills,

    Marsh,
    Swamp,

    TropicalBroadleafForest,
    TemperateBroadleafForest,
    ConiferousForest,
    ForestedHills,

    LowMountain,
    MediumMountain,
    HighMountain,
    MountainPeak,

    River,
    Lake,

    /// Fallback for terrain data with no recognized classification, e.g.
    /// when a save written by a newer version is loaded. Never produced by
    /// generation itself.
    Unknown,
}

impl TerrainType {
    pub fn display_name(&self) -> &'static str {
        match self {
            TerrainType::Ocean => "Ocean",
            TerrainType::SeaIce => "Sea Ice",
            TerrainType::Glacier => "Glacier",
            TerrainType::Tundra => "Tundra",
            TerrainType::SandDesert => "Sand Desert",
            TerrainType::Badlands => "Badlands",
            TerrainType::RockyWasteland => "Rocky Wasteland",
            TerrainType::Steppe => "Steppe",
            TerrainType::Savanna => "Savanna",
            TerrainType::Shrubland => "Shrubland",
            TerrainType::Grassland => "Grassland",
            TerrainType::Woodland => "Woodland",
            TerrainType::TropicalDryForest => "Tropical Dry Forest",
            TerrainType::Hills => "Hills",
            TerrainType::Marsh => "Marsh",
            TerrainType::Swamp => "Swamp",
            TerrainType::TropicalBroadleafForest => "Tropical Broadleaf Forest",
            TerrainType::TemperateBroadleafForest => "Temperate Broadleaf Forest",
            TerrainType::ConiferousForest => "Coniferous Forest",
            TerrainType::ForestedHills => "Forested Hills",
            TerrainType::LowMountain => "Low Mountain",
            TerrainType::MediumMountain => "Medium Mountain",
            TerrainType::HighMountain => "High Mountain",
            TerrainType::MountainPeak => "Mountain Peak",
            TerrainType::River => "River",
            TerrainType::Lake => "Lake",
            TerrainType::Unknown => "Unknown",
        }
    }

    /// Map color for PNG export.
    pub fn color(&self) -> (u8, u8, u8) {
        match self {
            TerrainType::Ocean => (24, 58, 120),
            TerrainType::SeaIce => (188, 214, 230),
            TerrainType::Glacier => (228, 240, 248),
            TerrainType::Tundra => (148, 158, 132),
            TerrainType::SandDesert => (220, 200, 130),
            TerrainType::Badlands => (180, 130, 90),
            TerrainType::RockyWasteland => (150, 140, 125),
            TerrainType::Steppe => (190, 180, 100),
            TerrainType::Savanna => (200, 185, 90),
            TerrainType::Shrubland => (160, 170, 95),
            TerrainType::Grassland => (110, 170, 80),
            TerrainType::Woodland => (95, 145, 70),
            TerrainType::TropicalDryForest => (120, 150, 60),
            TerrainType::Hills => (140, 150, 95),
            TerrainType::Marsh => (90, 130, 100),
            TerrainType::Swamp => (70, 110, 80),
            TerrainType::TropicalBroadleafForest => (35, 115, 45),
            TerrainType::TemperateBroadleafForest => (55, 130, 55),
            TerrainType::ConiferousForest => (40, 95, 60),
            TerrainType::ForestedHills => (75, 115, 70),
            TerrainType::LowMountain => (136, 128, 118),
            TerrainType::MediumMountain => (156, 148, 140),
            TerrainType::HighMountain => (186, 180, 174),
            TerrainType::MountainPeak => (232, 232, 232),
            TerrainType::River => (60, 120, 190),
            TerrainType::Lake => (50, 100, 170),
            TerrainType::Unknown => (255, 0, 255),
        }
    }

    pub fn is_water(&self) -> bool {
        matches!(
            self,
            TerrainType::Ocean | TerrainType::SeaIce | TerrainType::River | TerrainType::Lake
        )
    }
}

/// Tropical/temperate split used by the land decision tree.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClimateZone {
    Tropical,
    Temperate,
}

// Decision-tree constants. Rainfall and drainage are the *remapped* rasters,
// so these line up with the fixed calibration boundaries (0.09/0.65/0.88 and
// 0.32/0.49/0.65).
const VERY_DRY_RAINFALL: f32 = 0.1;
const WET_RAINFALL: f32 = 0.66;
const MARSH_DRAINAGE: f32 = 0.12;
const STEPPE_DRAINAGE: f32 = 0.30;
const GRASS_DRAINAGE: f32 = 0.45;
const HILLS_DRAINAGE: f32 = 0.65;
const ROCKY_DRAINAGE: f32 = 0.85;
const COLD_DESERT_DRAINAGE: f32 = 0.20;
const WOODLAND_DRAINAGE: f32 = 0.55;
/// Raw temperature below which wet temperate forest tends coniferous.
const CONIFER_TEMPERATURE: f32 = 0.40;
/// Half-width of the probabilistic forest transition bands.
const FOREST_BLEND: f32 = 0.20;

/// Classify every cell of the map.
pub fn generate_biomes(
    height_map: &HeightMap,
    temperature: &TemperatureMap,
    drainage: &DrainageMap,
    rainfall: &RainfallMap,
    seed: u64,
) -> Raster<TerrainType> {
    let dims = height_map.elevation.dimensions();
    let mut rng = ChaCha8Rng::seed_from_u64(seed.wrapping_add(RNG_SEED_OFFSET));
    let mut terrain = Raster::new_with(dims, TerrainType::Ocean);

    for y in 0..dims.height {
        for x in 0..dims.width {
            let cell = classify_cell(
                *height_map.levels.get(x, y),
                *temperature.levels.get(x, y),
                *temperature.raw.get(x, y),
                *drainage.values.get(x, y),
                *rainfall.values.get(x, y),
                &temperature.thresholds,
                &mut rng,
            );
            terrain.set(x, y, cell);
        }
    }

    terrain
}

/// Pure per-cell classification. Exposed for tests; the RNG is only drawn
/// from in the Warm climate band and the forest transition bands.
pub fn classify_cell(
    height: HeightLevel,
    temperature: TemperatureLevel,
    raw_temperature: f32,
    drainage: f32,
    rainfall: f32,
    thresholds: &TemperatureThresholds,
    rng: &mut ChaCha8Rng,
) -> TerrainType {
    match height {
        HeightLevel::Sea => match temperature {
            TemperatureLevel::Coldest => TerrainType::Glacier,
            TemperatureLevel::Colder => TerrainType::SeaIce,
            _ => TerrainType::Ocean,
        },
        HeightLevel::Land => match temperature {
            TemperatureLevel::Coldest => TerrainType::Glacier,
            TemperatureLevel::Colder => TerrainType::Tundra,
            _ => {
                let zone = climate_zone(temperature, raw_temperature, thresholds, rng);
                classify_land(zone, raw_temperature, drainage, rainfall, rng)
            }
        },
        HeightLevel::LowMountain => TerrainType::LowMountain,
        HeightLevel::MediumMountain => TerrainType::MediumMountain,
        HeightLevel::HighMountain => TerrainType::HighMountain,
        HeightLevel::MountainPeak => TerrainType::MountainPeak,
    }
}

/// Tropical or temperate. The Warm band splits probabilistically, smoothly
/// weighted by where the raw value sits between the warm and warmer
/// thresholds.
fn climate_zone(
    temperature: TemperatureLevel,
    raw: f32,
    thresholds: &TemperatureThresholds,
    rng: &mut ChaCha8Rng,
) -> ClimateZone {
    match temperature {
        TemperatureLevel::Warmer | TemperatureLevel::Warmest => ClimateZone::Tropical,
        TemperatureLevel::Cold | TemperatureLevel::Colder | TemperatureLevel::Coldest => {
            ClimateZone::Temperate
        }
        TemperatureLevel::Warm => {
            let band = (thresholds.warmer - thresholds.warm).max(f32::EPSILON);
            let p = smoothstep((raw - thresholds.warm) / band);
            if rng.gen::<f32>() < p {
                ClimateZone::Tropical
            } else {
                ClimateZone::Temperate
            }
        }
    }
}

fn classify_land(
    zone: ClimateZone,
    raw_temperature: f32,
    drainage: f32,
    rainfall: f32,
    rng: &mut ChaCha8Rng,
) -> TerrainType {
    if rainfall < VERY_DRY_RAINFALL {
        return match zone {
            ClimateZone::Tropical => {
                if drainage < ROCKY_DRAINAGE {
                    TerrainType::SandDesert
                } else {
                    TerrainType::RockyWasteland
                }
            }
            ClimateZone::Temperate => {
                if drainage < COLD_DESERT_DRAINAGE {
                    TerrainType::SandDesert
                } else if drainage < ROCKY_DRAINAGE {
                    TerrainType::Badlands
                } else {
                    TerrainType::RockyWasteland
                }
            }
        };
    }

    if rainfall < WET_RAINFALL {
        // Dry band: open country graded by drainage.
        if drainage < MARSH_DRAINAGE {
            TerrainType::Marsh
        } else if drainage < STEPPE_DRAINAGE {
            match zone {
                ClimateZone::Tropical => TerrainType::Savanna,
                ClimateZone::Temperate => TerrainType::Steppe,
            }
        } else if drainage < GRASS_DRAINAGE {
            match zone {
                ClimateZone::Tropical => TerrainType::Shrubland,
                ClimateZone::Temperate => TerrainType::Grassland,
            }
        } else if drainage < WOODLAND_DRAINAGE {
            match zone {
                ClimateZone::Tropical => TerrainType::TropicalDryForest,
                ClimateZone::Temperate => TerrainType::Woodland,
            }
        } else {
            TerrainType::Hills
        }
    } else {
        // Wet band: swamps in basins, forest elsewhere.
        if drainage < MARSH_DRAINAGE {
            TerrainType::Swamp
        } else if drainage >= HILLS_DRAINAGE {
            TerrainType::ForestedHills
        } else {
            forest_for(zone, raw_temperature, rng)
        }
    }
}

/// Pick the forest variant, with smooth probabilistic transitions at the
/// temperature-band edges so forest borders interleave instead of forming
/// hard lines.
fn forest_for(zone: ClimateZone, raw_temperature: f32, rng: &mut ChaCha8Rng) -> TerrainType {
    match zone {
        ClimateZone::Tropical => TerrainType::TropicalBroadleafForest,
        ClimateZone::Temperate => {
            let p_conifer = 1.0
                - smoothstep((raw_temperature - (CONIFER_TEMPERATURE - FOREST_BLEND)) / (2.0 * FOREST_BLEND));
            if rng.gen::<f32>() < p_conifer {
                TerrainType::ConiferousForest
            } else {
                TerrainType::TemperateBroadleafForest
            }
        }
    }
}

fn smoothstep(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}
