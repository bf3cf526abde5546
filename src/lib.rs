//! Realm generation library
//!
//! Deterministic generation of kingdom maps: elevation, temperature,
//! drainage, rivers, rainfall, terrain classification and an overview layer,
//! all derived from a seed and a parameter set.

pub mod ascii;
pub mod biomes;
pub mod calibrate;
pub mod drainage;
pub mod export;
pub mod heightmap;
pub mod noise_field;
pub mod overview;
pub mod params;
pub mod rainfall;
pub mod raster;
pub mod rivers;
pub mod temperature;
pub mod world;
