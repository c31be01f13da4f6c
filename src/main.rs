mod progress;

use std::path::PathBuf;

use clap::Parser;
use miette::IntoDiagnostic;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use poles::{Colormap, Config, GridFile, Hemisphere, PngSurface, RecordSource};
use progress::Progress;

#[derive(Parser, Debug)]
#[command(name = "poles")]
#[command(about = "Polar maps of monthly temperature anomalies")]
struct Args {
    /// Grid archive to read
    #[arg(long, default_value = "data.grid")]
    data: PathBuf,

    /// Directory holding the cached baselines
    #[arg(long, default_value = ".")]
    cache_dir: PathBuf,

    /// Directory receiving grid_N.png / grid_S.png
    #[arg(long, default_value = ".")]
    output_dir: PathBuf,

    /// Absolute latitude where the maps stop
    #[arg(long, default_value_t = 66.0)]
    lat_max: f64,

    /// Lower end of the color scale
    #[arg(long, default_value_t = -12.0, allow_negative_numbers = true)]
    vmin: f64,

    /// Upper end of the color scale
    #[arg(long, default_value_t = 12.0, allow_negative_numbers = true)]
    vmax: f64,

    /// Number of tiles per row
    #[arg(long, default_value_t = 12)]
    ncols: usize,

    /// Colormap name, `_r` reverses it
    #[arg(long, default_value = "coolwarm")]
    colormap: Colormap,

    /// First year of the baseline (included)
    #[arg(long, default_value_t = 1981)]
    year_min: i32,

    /// Last year of the baseline (included)
    #[arg(long, default_value_t = 2010)]
    year_max: i32,

    /// Hemisphere to draw, N or S
    #[arg(long, default_value = "N")]
    hemisphere: Hemisphere,

    /// Side of a tile in pixels
    #[arg(long, default_value_t = 100)]
    tile_px: u32,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,
}

impl From<Args> for Config {
    fn from(args: Args) -> Self {
        Self {
            data_path: args.data,
            cache_dir: args.cache_dir,
            output_dir: args.output_dir,
            lat_max: args.lat_max,
            vmin: args.vmin,
            vmax: args.vmax,
            ncols: args.ncols,
            colormap: args.colormap,
            year_min: args.year_min,
            year_max: args.year_max,
            hemisphere: args.hemisphere,
            tile_px: args.tile_px,
        }
    }
}

fn main() -> miette::Result<()> {
    let args = Args::parse();

    let level = match args.log_level.to_lowercase().as_str() {
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
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber).into_diagnostic()?;

    let config = Config::from(args);
    config.validate()?;

    info!(path = %config.data_path.display(), "Opening data");
    let source = GridFile::open(&config.data_path)?;
    println!("Number of time-series points: {}", source.len());
    println!("Number of rows: {}", source.len() / config.ncols);

    let output = config.output_path();
    let mut source = Progress::new(source).into_diagnostic()?;
    let mut surface = PngSurface::new(&output, config.tile_px);
    let summary = poles::run(&config, &mut source, &mut surface)?;
    source.finish();

    match summary.render.extrema.range() {
        Some((min, max)) => println!("Anomaly range: {min} {max}"),
        None => println!("Anomaly range: none"),
    }
    let scale = config.color_scale()?;
    println!("Current range: {} {}", scale.vmin(), scale.vmax());
    info!(
        output = %output.display(),
        colormap = %scale.colormap(),
        tiles = summary.render.rendered(),
        dropped = summary.render.dropped(),
        records = summary.records,
        "Done"
    );

    Ok(())
}
