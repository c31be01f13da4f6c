//! Monthly temperature climatologies and polar anomaly maps.
//!
//! A [`RecordSource`] is scanned once by [`build_baseline`] to average every
//! calendar month over a range of years, then replayed by [`render`] to draw
//! each record's departure from its month onto a grid of polar tiles.

mod anomaly;
pub mod baseline;
mod cache;
mod colormap;
mod config;
mod record;
mod render;
pub mod source;
mod surface;

use miette::Diagnostic;
use thiserror::Error;

pub use anomaly::{edges, Extrema, PolarMesh, Tile, TileLayout};
pub use baseline::{build_baseline, Baseline, BaselineError, Baselines};
pub use cache::{load_or_build, BaselineCache, CacheError};
pub use colormap::{ColorScale, Colormap, Palette};
pub use config::{BaselineParams, Config, ConfigError};
pub use record::{Band, DateError, ExtractError, Hemisphere, Record, RecordDate, SubGrid};
pub use render::{render, RenderError, RenderParams, RenderSummary};
pub use source::{write_grid_file, GridFile, MemorySource, RecordSource, SourceError};
pub use surface::{cell_polygon, PngSurface, SurfaceError, TileSurface};

#[derive(Debug, Error, Diagnostic)]
pub enum Error {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    #[diagnostic(transparent)]
    Source(#[from] SourceError),
    #[error(transparent)]
    #[diagnostic(transparent)]
    Baseline(#[from] BaselineError),
    #[error(transparent)]
    #[diagnostic(transparent)]
    Cache(#[from] CacheError),
    #[error(transparent)]
    #[diagnostic(transparent)]
    Render(#[from] RenderError),
}

/// Everything a run reports back to the operator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunSummary {
    pub records: usize,
    pub render: RenderSummary,
}

/// Builds (or loads) the baselines described by `config`, then draws the
/// anomalies of `source` onto `surface`.
pub fn run<S, T>(config: &Config, source: &mut S, surface: &mut T) -> Result<RunSummary, Error>
where
    S: RecordSource + ?Sized,
    T: TileSurface + ?Sized,
{
    config.validate()?;
    let baseline_params = config.baseline_params()?;
    let cache = BaselineCache::new(&config.cache_dir);
    let baselines = load_or_build(&cache, source, &baseline_params)?;

    let params = RenderParams {
        hemisphere: config.hemisphere,
        ncols: config.ncols,
        scale: config.color_scale()?,
    };
    let summary = render(source, &baselines, &params, surface)?;

    Ok(RunSummary {
        records: source.len(),
        render: summary,
    })
}
