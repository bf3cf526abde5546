//! World data container and pipeline orchestrator.
//!
//! Runs the generation stages strictly in order, bundles every layer into a
//! [`World`], and optionally drives the whole run on a dedicated worker
//! thread with progress events delivered over a channel. Generation takes
//! seconds at full size, so interactive callers are expected to use
//! [`spawn_generation`] and drain events once per frame.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use thiserror::Error;

use crate::biomes::{generate_biomes, TerrainType};
use crate::drainage::generate_drainage;
use crate::heightmap::{generate_heightmap, HeightLevel, HeightThresholds};
use crate::overview::Overview;
use crate::params::{ParameterError, WorldParameters};
use crate::rainfall::generate_rainfall;
use crate::raster::{Dimensions, Position, Raster};
use crate::rivers::{generate_rivers, River, RiverTileType};
use crate::temperature::{generate_temperature, TemperatureLevel, TemperatureThresholds};

/// Overview scale used when the caller does not pick one: 1 overview cell
/// per 4x4 block.
pub const DEFAULT_OVERVIEW_SCALE: f32 = 0.25;

/// Terminal failure of a generation run.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("invalid map dimensions {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },
    #[error(transparent)]
    Parameters(#[from] ParameterError),
    #[error("generation aborted")]
    Aborted,
}

/// Everything one generation run produces.
#[derive(Debug)]
pub struct World {
    pub dimensions: Dimensions,
    pub seed: u64,
    pub parameters: WorldParameters,

    /// Raw normalized elevation, kept for downstream scoring.
    pub elevation: Raster<f32>,
    pub height_levels: Raster<HeightLevel>,
    pub height_thresholds: HeightThresholds,

    /// Temperature remapped onto the fixed display scale.
    pub temperature: Raster<f32>,
    /// Temperature as classified (pre-remap).
    pub temperature_raw: Raster<f32>,
    pub temperature_levels: Raster<TemperatureLevel>,
    pub temperature_thresholds: TemperatureThresholds,

    /// Calibrated drainage, 0 on excluded cells.
    pub drainage: Raster<f32>,
    /// Calibrated rainfall, 0 on sea cells.
    pub rainfall: Raster<f32>,

    pub terrain: Raster<TerrainType>,
    pub river_tiles: Raster<Option<RiverTileType>>,
    pub rivers: Vec<River>,
    pub lakes: Vec<Position>,

    /// Fog of war; everything starts undiscovered.
    pub discovered: Raster<bool>,

    pub overview: Overview,
}

impl World {
    pub fn ocean_fraction(&self) -> f32 {
        let sea = self
            .height_levels
            .iter()
            .filter(|(_, _, &l)| l == HeightLevel::Sea)
            .count();
        sea as f32 / self.dimensions.area() as f32
    }

    pub fn river_cell_count(&self) -> usize {
        self.rivers.iter().map(|r| r.len()).sum()
    }
}

/// Generate a world with default overview scale and no progress reporting.
pub fn generate(
    dimensions: Dimensions,
    seed: u64,
    parameters: &WorldParameters,
) -> Result<World, GenerationError> {
    generate_with_progress(dimensions, seed, parameters, DEFAULT_OVERVIEW_SCALE, |_, _| {})
}

/// Generate a world, invoking `progress` with a stage label and cumulative
/// fraction after each completed stage.
pub fn generate_with_progress(
    dimensions: Dimensions,
    seed: u64,
    parameters: &WorldParameters,
    overview_scale: f32,
    progress: impl FnMut(&str, f32),
) -> Result<World, GenerationError> {
    generate_inner(dimensions, seed, parameters, overview_scale, progress, None)
}

fn generate_inner(
    dimensions: Dimensions,
    seed: u64,
    parameters: &WorldParameters,
    overview_scale: f32,
    mut progress: impl FnMut(&str, f32),
    abort: Option<&AtomicBool>,
) -> Result<World, GenerationError> {
    if dimensions.width == 0 || dimensions.height == 0 {
        return Err(GenerationError::InvalidDimensions {
            width: dimensions.width,
            height: dimensions.height,
        });
    }
    parameters.validate()?;

    let check_abort = |abort: Option<&AtomicBool>| -> Result<(), GenerationError> {
        match abort {
            Some(flag) if flag.load(Ordering::Relaxed) => Err(GenerationError::Aborted),
            _ => Ok(()),
        }
    };

    let height_map = generate_heightmap(dimensions, seed, parameters);
    progress("Shaping elevation", 0.16);
    check_abort(abort)?;

    let temperature = generate_temperature(dimensions, seed, parameters);
    progress("Charting temperature", 0.30);
    check_abort(abort)?;

    let drainage = generate_drainage(&height_map, seed, parameters);
    progress("Measuring drainage", 0.44);
    check_abort(abort)?;

    let rivers = generate_rivers(&height_map, seed, parameters);
    progress("Tracing rivers", 0.60);
    check_abort(abort)?;

    let rainfall = generate_rainfall(&height_map, &rivers, seed, parameters);
    progress("Simulating rainfall", 0.74);
    check_abort(abort)?;

    let mut terrain = generate_biomes(&height_map, &temperature, &drainage, &rainfall, seed);
    // Stamp water features over the biome classification. Lakes win over
    // river cells where a path ends in its own pit.
    for river in &rivers.rivers {
        for &pos in river.path() {
            terrain.set_pos(pos, TerrainType::River);
        }
    }
    for &pos in &rivers.lakes {
        terrain.set_pos(pos, TerrainType::Lake);
    }
    progress("Classifying biomes", 0.86);
    check_abort(abort)?;

    let discovered = Raster::new_with(dimensions, false);
    let factor = ((1.0 / overview_scale).round() as usize).max(1);
    let overview = Overview::build(
        &terrain,
        &height_map.levels,
        &temperature.levels,
        &discovered,
        factor,
    );
    progress("Building overview", 1.0);

    Ok(World {
        dimensions,
        seed,
        parameters: parameters.clone(),
        elevation: height_map.elevation,
        height_levels: height_map.levels,
        height_thresholds: height_map.thresholds,
        temperature: temperature.display,
        temperature_raw: temperature.raw,
        temperature_levels: temperature.levels,
        temperature_thresholds: temperature.thresholds,
        drainage: drainage.values,
        rainfall: rainfall.values,
        terrain,
        river_tiles: rivers.tiles,
        rivers: rivers.rivers,
        lakes: rivers.lakes,
        discovered,
        overview,
    })
}

/// Event stream of a worker-thread generation run.
pub enum GenerationEvent {
    Progress { stage: String, fraction: f32 },
    Completed(Box<World>),
    Failed(GenerationError),
}

/// Handle to a generation run on its worker thread.
pub struct GenerationHandle {
    receiver: Receiver<GenerationEvent>,
    abort: Arc<AtomicBool>,
    join: Option<JoinHandle<()>>,
}

impl GenerationHandle {
    /// The event channel. Progress events arrive in stage order and the
    /// stream ends with exactly one `Completed` or `Failed`.
    pub fn events(&self) -> &Receiver<GenerationEvent> {
        &self.receiver
    }

    /// Request cooperative cancellation. The worker notices between stages.
    pub fn abort(&self) {
        self.abort.store(true, Ordering::Relaxed);
    }

    /// Block until the run ends and return its final event.
    pub fn wait(mut self) -> GenerationEvent {
        let mut last = None;
        while let Ok(event) = self.receiver.recv() {
            let terminal = matches!(
                event,
                GenerationEvent::Completed(_) | GenerationEvent::Failed(_)
            );
            last = Some(event);
            if terminal {
                break;
            }
        }
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
        last.unwrap_or(GenerationEvent::Failed(GenerationError::Aborted))
    }
}

/// Run generation on a dedicated worker thread.
///
/// The consumer drains [`GenerationHandle::events`] at its own pace; send
/// failures (receiver dropped) silently end the worker.
pub fn spawn_generation(
    dimensions: Dimensions,
    seed: u64,
    parameters: WorldParameters,
    overview_scale: f32,
) -> GenerationHandle {
    let (sender, receiver) = mpsc::channel();
    let abort = Arc::new(AtomicBool::new(false));
    let abort_flag = Arc::clone(&abort);

    let join = thread::spawn(move || {
        let progress_sender = sender.clone();
        let result = generate_inner(
            dimensions,
            seed,
            &parameters,
            overview_scale,
            move |stage, fraction| {
                let _ = progress_sender.send(GenerationEvent::Progress {
                    stage: stage.to_string(),
                    fraction,
                });
            },
            Some(&abort_flag),
        );
        let _ = match result {
            Ok(world) => sender.send(GenerationEvent::Completed(Box::new(world))),
            Err(err) => sender.send(GenerationEvent::Failed(err)),
        };
    });

    GenerationHandle {
        receiver,
        abort,
        join: Some(join),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_degenerate_dimensions_fail_fast() {
        let params = WorldParameters::default();
        let err = generate(Dimensions::new(0, 64), 1, &params).unwrap_err();
        assert!(matches!(err, GenerationError::InvalidDimensions { .. }));
    }

    #[test]
    fn test_invalid_parameters_fail_fast() {
        let mut params = WorldParameters::default();
        params.warm_percentage = -0.5;
        let err = generate(Dimensions::new(16, 16), 1, &params).unwrap_err();
        assert!(matches!(err, GenerationError::Parameters(_)));
    }

    #[test]
    fn test_progress_events_are_ordered() {
        let params = WorldParameters::default();
        let mut fractions = Vec::new();
        generate_with_progress(Dimensions::new(32, 32), 9, &params, 0.25, |stage, fraction| {
            assert!(!stage.is_empty());
            fractions.push(fraction);
        })
        .unwrap();

        assert_eq!(fractions.len(), 7);
        assert!(fractions.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(*fractions.last().unwrap(), 1.0);
    }

    #[test]
    fn test_worker_thread_delivers_completion() {
        let params = WorldParameters::default();
        let handle = spawn_generation(Dimensions::new(32, 32), 5, params, 0.25);
        match handle.wait() {
            GenerationEvent::Completed(world) => {
                assert_eq!(world.dimensions, Dimensions::new(32, 32));
            }
            _ => panic!("expected successful completion"),
        }
    }

    #[test]
    fn test_aborted_run_reports_failure() {
        let params = WorldParameters::default();
        let handle = spawn_generation(Dimensions::new(128, 128), 5, params, 0.25);
        handle.abort();
        // Either the abort lands between stages, or the run was already past
        // the last checkpoint and completes; both are terminal.
        match handle.wait() {
            GenerationEvent::Failed(GenerationError::Aborted)
            | GenerationEvent::Completed(_) => {}
            _ => panic!("expected abort or completion"),
        }
    }

    #[test]
    fn test_ocean_fraction_tracks_target() {
        let params = WorldParameters::default();
        let world = generate(Dimensions::new(64, 64), 1337, &params).unwrap();
        let target = params.underwater_percentage;
        assert!(
            (world.ocean_fraction() - target).abs() < 0.05,
            "ocean fraction {} too far from target {}",
            world.ocean_fraction(),
            target
        );
    }

    #[test]
    fn test_full_pipeline_is_deterministic() {
        let params = WorldParameters::default();
        let a = generate(Dimensions::new(64, 64), 42, &params).unwrap();
        let b = generate(Dimensions::new(64, 64), 42, &params).unwrap();

        assert_eq!(a.elevation.data(), b.elevation.data());
        assert_eq!(a.terrain.data(), b.terrain.data());
        assert_eq!(a.rivers.len(), b.rivers.len());
        assert_eq!(a.lakes, b.lakes);
        assert_eq!(a.overview.terrain.data(), b.overview.terrain.data());
    }

    #[test]
    fn test_river_cells_are_stamped_into_terrain() {
        let params = WorldParameters::default();
        let world = generate(Dimensions::new(64, 64), 1337, &params).unwrap();
        for river in &world.rivers {
            for &pos in river.path() {
                let t = *world.terrain.get_pos(pos);
                assert!(
                    t == TerrainType::River || t == TerrainType::Lake,
                    "river path cell must be stamped as water, got {t:?}"
                );
            }
        }
        for &pos in &world.lakes {
            assert_eq!(*world.terrain.get_pos(pos), TerrainType::Lake);
        }
    }
}
