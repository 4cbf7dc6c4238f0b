use clap::Parser;
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::info;

use tilestream::chunk::WorldCell;
use tilestream::config::WorldConfig;
use tilestream::export::export_chunks;
use tilestream::streaming::ChunkStreamingManager;
use tilestream::surface::{MemorySurface, TileSurface};

#[derive(Parser, Debug)]
#[command(name = "tilestream")]
#[command(about = "Stream a procedural tile world around a wandering observer")]
struct Args {
    /// Random seed (uses a random seed if not specified)
    #[arg(short, long)]
    seed: Option<u64>,

    /// World configuration JSON file (built-in world if not specified)
    #[arg(short, long)]
    config: Option<String>,

    /// Number of ticks to simulate
    #[arg(short, long, default_value = "240")]
    ticks: usize,

    /// Observer speed in cells per tick
    #[arg(long, default_value = "1.5")]
    step: f32,

    /// Half-width of the ASCII window printed at the end (0 disables)
    #[arg(long, default_value = "28")]
    view: i32,

    /// Stamp this preset at the observer's final position
    #[arg(long)]
    place: Option<String>,

    /// Export generated chunks to a PNG at this path
    #[arg(long)]
    export: Option<String>,
}

fn main() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => match WorldConfig::from_path(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Failed to load {path}: {e}");
                std::process::exit(1);
            }
        },
        None => WorldConfig::default(),
    };
    if let Some(seed) = args.seed {
        config.seed = seed;
    } else if args.config.is_none() {
        config.seed = rand::random();
    }
    config.log_warnings();

    info!(
        seed = config.seed,
        chunk_size = config.streaming.chunk_size,
        render_distance = config.streaming.render_distance,
        "starting walk"
    );

    let mut manager = config.streaming_manager(MemorySurface::new());
    let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
    let mut pos = (0.0f32, 0.0f32);
    let mut heading = rng.gen::<f32>() * std::f32::consts::TAU;
    let mut total_loaded = 0usize;
    let mut total_unloaded = 0usize;

    for _ in 0..args.ticks {
        let report = manager.tick(pos);
        total_loaded += report.loaded.len();
        total_unloaded += report.unloaded.len();

        heading += rng.gen_range(-0.4..0.4);
        pos.0 += heading.cos() * args.step;
        pos.1 += heading.sin() * args.step;
    }

    let stats = manager.stats();
    info!(
        ticks = args.ticks,
        loaded = total_loaded,
        unloaded = total_unloaded,
        resident = stats.resident,
        generated = stats.generated,
        surface_cells = manager.surface().len(),
        "walk finished"
    );

    if let Some(name) = &args.place {
        place_at_observer(&mut manager, name, pos);
    }

    if args.view > 0 {
        println!("{}", render_window(&manager, pos, args.view));
    }

    if let Some(path) = &args.export {
        match export_chunks(manager.chunks(), manager.generator().terrain(), path) {
            Ok(true) => info!(path = path.as_str(), "exported region"),
            Ok(false) => info!("nothing generated, export skipped"),
            Err(e) => eprintln!("Export failed: {e}"),
        }
    }
}

/// Exercise the interactive placement path at the observer position.
fn place_at_observer(
    manager: &mut ChunkStreamingManager<MemorySurface>,
    name: &str,
    pos: (f32, f32),
) {
    let Some(preset) = manager.generator().presets().registry().find(name) else {
        eprintln!("Unknown preset '{name}'");
        return;
    };
    manager.request_interactive_placement(preset);
    manager.update_pointer(pos);
    let valid = manager
        .placement_preview()
        .map(|p| p.valid)
        .unwrap_or(false);
    if manager.try_place_at_pointer() {
        info!(preset = name, x = pos.0 as f64, y = pos.1 as f64, "placed interactively");
    } else {
        info!(preset = name, preview_valid = valid, "placement failed");
        manager.cancel_placement_mode();
    }
}

/// Render the surface around a position using terrain glyphs.
fn render_window(
    manager: &ChunkStreamingManager<MemorySurface>,
    center: (f32, f32),
    radius: i32,
) -> String {
    let center = WorldCell::from_world_pos(center.0, center.1);
    let mut out = String::new();

    for dy in -radius..=radius {
        for dx in -radius..=radius {
            let cell = center.offset(dx, dy);
            let glyph = if dx == 0 && dy == 0 {
                '@'
            } else if manager.surface().cell(cell).is_some() {
                manager
                    .terrain_def_at(cell)
                    .map(|d| d.glyph)
                    .unwrap_or(' ')
            } else {
                ' '
            };
            out.push(glyph);
        }
        out.push('\n');
    }
    out
}
