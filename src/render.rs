//! The anomaly pass: one polar tile per record.

use miette::Diagnostic;
use thiserror::Error;
use tracing::{info, warn};

use crate::{
    Baselines, ColorScale, DateError, Extrema, ExtractError, Hemisphere, PolarMesh,
    RecordSource, SourceError, SurfaceError, TileLayout, TileSurface,
};

#[derive(Debug, Error, Diagnostic)]
pub enum RenderError {
    #[error("ncols must be at least 1")]
    #[diagnostic(code(poles::render::ncols))]
    NoColumns,
    #[error("{total} records do not fill a single row of {ncols} tiles")]
    #[diagnostic(code(poles::render::rows), help("lower `ncols` or add records"))]
    TooFewRecords { total: usize, ncols: usize },
    #[error("The source ended after {index} of {total} records")]
    #[diagnostic(code(poles::render::exhausted))]
    SourceExhausted { index: usize, total: usize },
    #[error("Record {index} has a grid of {found:?}, the {hemisphere} baseline is {expected:?}")]
    #[diagnostic(code(poles::render::shape))]
    ShapeMismatch {
        index: usize,
        hemisphere: Hemisphere,
        expected: (usize, usize),
        found: (usize, usize),
    },
    #[error("Record {index}: {source}")]
    #[diagnostic(code(poles::render::date))]
    Date {
        index: usize,
        #[source]
        source: DateError,
    },
    #[error("Record {index}: {source}")]
    #[diagnostic(code(poles::render::extract))]
    Extract {
        index: usize,
        #[source]
        source: ExtractError,
    },
    #[error(transparent)]
    #[diagnostic(transparent)]
    Source(#[from] SourceError),
    #[error(transparent)]
    #[diagnostic(transparent)]
    Surface(#[from] SurfaceError),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderParams {
    pub hemisphere: Hemisphere,
    pub ncols: usize,
    pub scale: ColorScale,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderSummary {
    pub layout: TileLayout,
    pub extrema: Extrema,
}

impl RenderSummary {
    pub fn rendered(&self) -> usize {
        self.layout.rendered()
    }

    pub fn dropped(&self) -> usize {
        self.layout.dropped()
    }
}

/// Replays `source` from the start and draws the anomaly of every record
/// that fits the layout onto `surface`.
///
/// Trailing records that do not fill a whole row are neither read nor drawn.
pub fn render<S, T>(
    source: &mut S,
    baselines: &Baselines,
    params: &RenderParams,
    surface: &mut T,
) -> Result<RenderSummary, RenderError>
where
    S: RecordSource + ?Sized,
    T: TileSurface + ?Sized,
{
    if params.ncols == 0 {
        return Err(RenderError::NoColumns);
    }
    let layout = TileLayout::new(source.len(), params.ncols);
    if layout.rows() == 0 {
        return Err(RenderError::TooFewRecords {
            total: layout.total(),
            ncols: layout.ncols(),
        });
    }
    info!(
        hemisphere = %params.hemisphere,
        rows = layout.rows(),
        ncols = layout.ncols(),
        "Rendering anomalies"
    );
    if layout.dropped() > 0 {
        warn!(
            dropped = layout.dropped(),
            "Trailing records do not fill a row and will not be drawn"
        );
    }

    let hemisphere = params.hemisphere;
    let baseline = baselines.get(hemisphere);
    let band = hemisphere.band(baselines.params.lat_max());
    let mut extrema = Extrema::new();

    source.rewind()?;
    surface.begin(&layout)?;

    for index in 0..layout.rendered() {
        let record = source
            .next_record()?
            .ok_or(RenderError::SourceExhausted {
                index,
                total: layout.total(),
            })?;
        let date = record
            .date()
            .map_err(|source| RenderError::Date { index, source })?;
        let grid = record
            .extract(&band)
            .map_err(|source| RenderError::Extract { index, source })?;

        let anomaly =
            baseline
                .anomaly(&grid.data, date.month)
                .ok_or(RenderError::ShapeMismatch {
                    index,
                    hemisphere,
                    expected: baseline.grid_shape(),
                    found: grid.shape(),
                })?;
        extrema.update(&anomaly);

        let mesh = PolarMesh::new(&grid, hemisphere);
        if let Some(tile) = layout.tile(index) {
            surface.draw_tile(tile, &mesh, &anomaly, &params.scale)?;
        }
    }

    surface.finish()?;
    Ok(RenderSummary { layout, extrema })
}
