//! Monthly climatology over a range of years.

use miette::Diagnostic;
use ndarray::{Array2, Array3, ArrayView2, Axis};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::Month;
use tracing::{debug, info};

use crate::{BaselineParams, DateError, ExtractError, Hemisphere, RecordSource, SourceError};

pub const MONTHS: usize = 12;

#[derive(Debug, Error, Diagnostic)]
pub enum BaselineError {
    #[error("The data source holds no record")]
    #[diagnostic(code(poles::baseline::empty))]
    EmptySource,
    #[error("Record {index} has a {hemisphere} grid of {found:?}, expected {expected:?}")]
    #[diagnostic(
        code(poles::baseline::shape),
        help("every record of a dataset must share the same grid")
    )]
    ShapeMismatch {
        index: usize,
        hemisphere: Hemisphere,
        expected: (usize, usize),
        found: (usize, usize),
    },
    #[error("Record {index}: {source}")]
    #[diagnostic(code(poles::baseline::date))]
    Date {
        index: usize,
        #[source]
        source: DateError,
    },
    #[error("Record {index}: {source}")]
    #[diagnostic(code(poles::baseline::extract))]
    Extract {
        index: usize,
        #[source]
        source: ExtractError,
    },
    #[error(transparent)]
    #[diagnostic(transparent)]
    Source(#[from] SourceError),
}

/// Mean grid of every calendar month for one hemisphere, shaped `(12, H, W)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Baseline {
    months: Array3<f64>,
}

impl Baseline {
    fn zeros((height, width): (usize, usize)) -> Self {
        Self {
            months: Array3::zeros((MONTHS, height, width)),
        }
    }

    pub fn months(&self) -> &Array3<f64> {
        &self.months
    }

    /// Shape of a single month's grid.
    pub fn grid_shape(&self) -> (usize, usize) {
        let (_, height, width) = self.months.dim();
        (height, width)
    }

    pub fn month(&self, month: Month) -> ArrayView2<'_, f64> {
        self.months.index_axis(Axis(0), u8::from(month) as usize - 1)
    }

    /// `data` minus the mean of `month`, `None` if the shapes differ.
    pub fn anomaly(&self, data: &Array2<f64>, month: Month) -> Option<Array2<f64>> {
        if data.dim() != self.grid_shape() {
            return None;
        }
        Some(data - &self.month(month))
    }
}

/// Baselines of both hemispheres and the parameters they were built with.
#[derive(Debug, Clone, PartialEq)]
pub struct Baselines {
    pub north: Baseline,
    pub south: Baseline,
    pub params: BaselineParams,
}

impl Baselines {
    pub fn get(&self, hemisphere: Hemisphere) -> &Baseline {
        match hemisphere {
            Hemisphere::North => &self.north,
            Hemisphere::South => &self.south,
        }
    }
}

struct Accumulator {
    hemisphere: Hemisphere,
    sums: Baseline,
}

impl Accumulator {
    fn add(
        &mut self,
        index: usize,
        month: usize,
        grid: &Array2<f64>,
    ) -> Result<(), BaselineError> {
        self.check(index, grid)?;
        let mut slot = self.sums.months.index_axis_mut(Axis(0), month);
        slot += grid;
        Ok(())
    }

    fn check(&self, index: usize, grid: &Array2<f64>) -> Result<(), BaselineError> {
        let expected = self.sums.grid_shape();
        if grid.dim() != expected {
            return Err(BaselineError::ShapeMismatch {
                index,
                hemisphere: self.hemisphere,
                expected,
                found: grid.dim(),
            });
        }
        Ok(())
    }
}

/// Scans every record of `source` once and averages the grids of each
/// calendar month over the years of `params`.
///
/// Sums are divided by the number of configured years, not by the number of
/// records that were summed: a month missing from some year is averaged as if
/// it had been zero.
pub fn build_baseline<S: RecordSource + ?Sized>(
    source: &mut S,
    params: &BaselineParams,
) -> Result<Baselines, BaselineError> {
    info!(
        records = source.len(),
        lat_max = params.lat_max(),
        year_min = params.year_min(),
        year_max = params.year_max(),
        "Computing monthly baselines"
    );
    source.rewind()?;

    let north_band = Hemisphere::North.band(params.lat_max());
    let south_band = Hemisphere::South.band(params.lat_max());

    let mut accumulators: Option<[Accumulator; 2]> = None;
    let mut contributions = [0usize; MONTHS];
    let mut index = 0;

    while let Some(record) = source.next_record()? {
        let north = record
            .extract(&north_band)
            .map_err(|source| BaselineError::Extract { index, source })?;
        let south = record
            .extract(&south_band)
            .map_err(|source| BaselineError::Extract { index, source })?;
        let date = record
            .date()
            .map_err(|source| BaselineError::Date { index, source })?;

        let [acc_north, acc_south] = accumulators.get_or_insert_with(|| {
            [
                Accumulator {
                    hemisphere: Hemisphere::North,
                    sums: Baseline::zeros(north.shape()),
                },
                Accumulator {
                    hemisphere: Hemisphere::South,
                    sums: Baseline::zeros(south.shape()),
                },
            ]
        });

        if params.contains_year(date.year) {
            acc_north.add(index, date.month_index(), &north.data)?;
            acc_south.add(index, date.month_index(), &south.data)?;
            contributions[date.month_index()] += 1;
        } else {
            acc_north.check(index, &north.data)?;
            acc_south.check(index, &south.data)?;
        }
        index += 1;
    }

    let [north, south] = accumulators.ok_or(BaselineError::EmptySource)?;

    let divisor = params.year_count();
    for (month, count) in contributions.iter().enumerate() {
        debug!(month = month + 1, records = count, divisor, "Month contributions");
    }

    let mut north = north.sums;
    let mut south = south.sums;
    north.months /= divisor as f64;
    south.months /= divisor as f64;

    info!(
        records = index,
        north = ?north.grid_shape(),
        south = ?south.grid_shape(),
        "Baselines computed"
    );

    Ok(Baselines {
        north,
        south,
        params: *params,
    })
}
