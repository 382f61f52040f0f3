//! tilecheck command line interface
//!
//! Generates the synthetic source, renders expected tiles and checks tiles a
//! cache has stored.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tilecheck::{
    BackendKind, BoundingBox, ComparisonResult, GridConfig, MapcacheSeeder, OracleConfig, Point,
    ReferenceSampler, Scenario, SyntheticCompression, SyntheticRaster, TileAddress, compare,
    open_backend, open_geotiff,
};
use tracing::{Level, error, info};
use tracing_subscriber::FmtSubscriber;

/// Pixel-exact correctness oracle for tile caches
#[derive(Parser)]
#[command(name = "tilecheck")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Pixel-exact correctness oracle for tile caches", long_about = None)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the synthetic GeoTIFF
    Generate(GenerateArgs),
    /// Render the expected tile for an address as PNG
    Expected(ExpectedArgs),
    /// Compare a cached tile with the expected one
    Verify(VerifyArgs),
    /// Generate, seed and verify in a scratch directory
    Run(RunArgs),
}

#[derive(Clone, Copy, ValueEnum)]
enum CompressionArg {
    None,
    Lzw,
    Deflate,
}

impl From<CompressionArg> for SyntheticCompression {
    fn from(arg: CompressionArg) -> Self {
        match arg {
            CompressionArg::None => Self::None,
            CompressionArg::Lzw => Self::Lzw,
            CompressionArg::Deflate => Self::Deflate,
        }
    }
}

#[derive(Args)]
struct GenerateArgs {
    /// Output GeoTIFF path
    #[arg(short, long)]
    output: PathBuf,

    #[arg(long, default_value_t = 512)]
    width: usize,

    #[arg(long, default_value_t = 512)]
    height: usize,

    /// Side of the square extent centered on the origin, in map units
    #[arg(long, default_value_t = tilecheck::synthetic::DEFAULT_EXTENT_SIZE)]
    extent_size: f64,

    #[arg(long, default_value_t = tilecheck::synthetic::DEFAULT_EPSG)]
    epsg: u16,

    #[arg(long, value_enum, default_value = "none")]
    compression: CompressionArg,
}

#[derive(Args)]
struct GridArgs {
    /// Map units per pixel at zoom 0
    #[arg(long, default_value_t = 1000.0)]
    base_resolution: f64,

    #[arg(long, default_value_t = -500_000.0, allow_hyphen_values = true)]
    origin_x: f64,

    #[arg(long, default_value_t = 500_000.0, allow_hyphen_values = true)]
    origin_y: f64,

    #[arg(long, default_value_t = tilecheck::DEFAULT_TILE_SIZE)]
    tile_size: usize,
}

impl GridArgs {
    fn to_config(&self) -> GridConfig {
        GridConfig {
            base_resolution: self.base_resolution,
            origin: Point::new(self.origin_x, self.origin_y),
            tile_size: self.tile_size,
        }
    }
}

#[derive(Args)]
struct ExpectedArgs {
    /// Source GeoTIFF
    #[arg(short, long)]
    raster: PathBuf,

    /// Tile address as z/x/y
    #[arg(value_parser = parse_tile)]
    tile: TileAddress,

    /// Output PNG path
    #[arg(short, long)]
    output: PathBuf,

    #[command(flatten)]
    grid: GridArgs,
}

#[derive(Args)]
struct VerifyArgs {
    /// Source GeoTIFF the cache was seeded from
    #[arg(short, long)]
    raster: PathBuf,

    /// Cache base directory (holding `disk/` and `cache.sqlite`)
    #[arg(short, long)]
    cache_dir: PathBuf,

    #[arg(short, long, default_value = "disk")]
    backend: BackendKind,

    /// Tileset name; `<backend>-tileset` when omitted
    #[arg(long)]
    tileset: Option<String>,

    #[arg(long, default_value = "synthetic_grid")]
    grid_name: String,

    /// Tile addresses as z/x/y
    #[arg(value_parser = parse_tile, required = true)]
    tiles: Vec<TileAddress>,

    #[command(flatten)]
    grid: GridArgs,
}

#[derive(Args)]
struct RunArgs {
    /// Scratch directory, removed afterwards; must be new, empty or from an earlier run
    #[arg(long)]
    work_dir: Option<PathBuf>,

    /// Seeding executable
    #[arg(long)]
    seeder: Option<String>,

    /// Seeder timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Backends to seed and verify
    #[arg(short, long, value_delimiter = ',', default_value = "disk,sqlite")]
    backends: Vec<BackendKind>,

    /// Tile addresses as z/x/y
    #[arg(value_parser = parse_tile, default_values = ["0/0/0", "1/1/2"])]
    tiles: Vec<TileAddress>,
}

fn parse_tile(s: &str) -> Result<TileAddress, String> {
    let parts: Vec<&str> = s.split('/').collect();
    let [z, x, y] = parts.as_slice() else {
        return Err(format!("expected z/x/y, got {s:?}"));
    };
    let parse = |v: &str| v.parse::<u32>().map_err(|e| format!("{v:?}: {e}"));
    Ok(TileAddress::new(parse(z)?, parse(x)?, parse(y)?))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Generate(args) => generate(args),
        Commands::Expected(args) => expected(args),
        Commands::Verify(args) => verify(args),
        Commands::Run(args) => run(args),
    }
}

fn generate(args: GenerateArgs) -> Result<()> {
    SyntheticRaster::new(args.width, args.height)
        .extent(BoundingBox::centered(Point::origin(), args.extent_size))
        .epsg(args.epsg)
        .compression(args.compression.into())
        .write(&args.output)
        .with_context(|| format!("writing {}", args.output.display()))?;
    println!("{}", args.output.display());
    Ok(())
}

fn expected(args: ExpectedArgs) -> Result<()> {
    let source = open_geotiff(&args.raster)
        .with_context(|| format!("reading {}", args.raster.display()))?;
    let grid = args.grid.to_config().to_tile_grid();
    let tile = ReferenceSampler::new(&source).sample_tile(&grid, args.tile);
    tile.save(&args.output)?;
    info!(tile = %args.tile, black = tile.count_black(), "Wrote expected tile");
    println!("{}", args.output.display());
    Ok(())
}

fn verify(args: VerifyArgs) -> Result<()> {
    let source = open_geotiff(&args.raster)
        .with_context(|| format!("reading {}", args.raster.display()))?;
    let grid = args.grid.to_config().to_tile_grid();
    let tileset = args.tileset.unwrap_or_else(|| args.backend.default_tileset());
    let backend = open_backend(args.backend, &args.cache_dir, &tileset, &args.grid_name);
    let sampler = ReferenceSampler::new(&source);

    let mut results = Vec::with_capacity(args.tiles.len());
    for tile in args.tiles {
        let expected = sampler.sample_tile(&grid, tile);
        let actual = backend.read_tile(tile)?;
        results.push((args.backend, tile, compare(&expected, actual.as_ref())));
    }
    report(&results)
}

fn run(args: RunArgs) -> Result<()> {
    let mut config = OracleConfig::default();
    if let Some(dir) = args.work_dir {
        config = config.with_work_dir(dir);
    }
    if let Some(seeder) = &args.seeder {
        config = config.with_seeder(seeder);
    }
    if let Some(secs) = args.timeout {
        config = config.with_seed_timeout(Duration::from_secs(secs));
    }
    let mut zooms: Vec<u32> = args.tiles.iter().map(|t| t.zoom).collect();
    zooms.sort_unstable();
    zooms.dedup();
    config = config.with_zoom_levels(&zooms);

    let seeder = MapcacheSeeder::new(&config.seeder, config.seed_timeout);
    let scenario = Scenario::prepare(config)?;

    let mut results = Vec::new();
    for kind in &args.backends {
        scenario.seed(&seeder, *kind)?;
        let backend = scenario.backend(*kind);
        for (tile, result) in scenario.verify_tiles(backend.as_ref(), &args.tiles)? {
            results.push((*kind, tile, result));
        }
    }
    report(&results)
}

fn report(results: &[(BackendKind, TileAddress, ComparisonResult)]) -> Result<()> {
    let failed = results.iter().filter(|(_, _, r)| !r.matched).count();
    for (kind, tile, result) in results {
        let status = if result.matched { "OK" } else { "FAIL" };
        println!("{status:<4} {kind:<6} {tile} ({} differing samples)", result.mismatch_count);
    }
    if failed > 0 {
        error!(failed, total = results.len(), "Tile verification failed");
        bail!("{failed} of {} tiles did not match", results.len());
    }
    info!(total = results.len(), "All tiles match");
    Ok(())
}
