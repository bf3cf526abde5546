use clap::Parser;

use realm_generator::ascii;
use realm_generator::export;
use realm_generator::params::WorldParameters;
use realm_generator::raster::Dimensions;
use realm_generator::world::{self, DEFAULT_OVERVIEW_SCALE};

#[derive(Parser, Debug)]
#[command(name = "realm_generator")]
#[command(about = "Generate procedural kingdom maps from a seed")]
struct Args {
    /// Width of the map in cells
    #[arg(short = 'W', long, default_value = "256")]
    width: usize,

    /// Height of the map in cells
    #[arg(short = 'H', long, default_value = "256")]
    height: usize,

    /// Random seed (uses a random seed if not specified)
    #[arg(short, long)]
    seed: Option<u64>,

    /// Path to a JSON parameter file (defaults otherwise)
    #[arg(short, long)]
    params: Option<String>,

    /// Prefix for the exported PNG layers
    #[arg(short, long, default_value = "realm")]
    output: String,

    /// Overview scale (overview cells per map cell)
    #[arg(long, default_value = "0.25")]
    overview_scale: f32,

    /// Also write an ASCII rendering of the map
    #[arg(long)]
    ascii: Option<String>,

    /// Disable the river irrigation rainfall bonus
    #[arg(long)]
    no_irrigation: bool,
}

fn main() {
    let args = Args::parse();

    let mut params = match &args.params {
        Some(path) => match WorldParameters::from_file(path) {
            Ok(params) => params,
            Err(err) => {
                eprintln!("Failed to load parameters from {}: {}", path, err);
                std::process::exit(1);
            }
        },
        None => WorldParameters::default(),
    };
    if args.no_irrigation {
        params.river_irrigation = false;
    }

    let seed = args.seed.unwrap_or_else(rand::random);
    println!("Generating realm with seed: {}", seed);
    println!("Map size: {}x{}", args.width, args.height);

    let dimensions = Dimensions::new(args.width, args.height);
    let scale = if args.overview_scale > 0.0 {
        args.overview_scale
    } else {
        DEFAULT_OVERVIEW_SCALE
    };

    let result = world::generate_with_progress(dimensions, seed, &params, scale, |stage, fraction| {
        println!("{}... ({:.0}%)", stage, fraction * 100.0);
    });
    let world = match result {
        Ok(world) => world,
        Err(err) => {
            eprintln!("Generation failed: {}", err);
            std::process::exit(1);
        }
    };

    println!(
        "Ocean coverage: {:.1}% (target {:.1}%)",
        100.0 * world.ocean_fraction(),
        100.0 * world.parameters.underwater_percentage
    );
    println!(
        "Rivers: {} ({} cells), lakes: {}",
        world.rivers.len(),
        world.river_cell_count(),
        world.lakes.len()
    );
    println!(
        "Overview: {}x{} (factor {})",
        world.overview.terrain.dimensions().width,
        world.overview.terrain.dimensions().height,
        world.overview.factor
    );

    if let Err(err) = export::export_world(&world, &args.output) {
        eprintln!("Export failed: {}", err);
        std::process::exit(1);
    }
    println!("Exported PNG layers with prefix '{}'", args.output);

    if let Some(path) = &args.ascii {
        if let Err(err) = ascii::export_ascii(&world, path) {
            eprintln!("ASCII export failed: {}", err);
            std::process::exit(1);
        }
        println!("Wrote ASCII map to {}", path);
    }
}
