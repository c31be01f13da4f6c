use std::path::PathBuf;

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{ColorScale, Colormap, Hemisphere};

#[derive(Debug, Error, Diagnostic, PartialEq)]
pub enum ConfigError {
    #[error("Year range {year_min}..={year_max} is empty")]
    #[diagnostic(code(poles::config::years), help("`year_min` must not exceed `year_max`"))]
    EmptyYearRange { year_min: i32, year_max: i32 },
    #[error("lat_max must lie strictly between 0 and 90, got {0}")]
    #[diagnostic(code(poles::config::lat_max))]
    LatMaxOutOfRange(f64),
    #[error("ncols must be at least 1")]
    #[diagnostic(code(poles::config::ncols))]
    NoColumns,
    #[error("Color range [{vmin}, {vmax}] is empty")]
    #[diagnostic(code(poles::config::range), help("`vmin` must be lower than `vmax`"))]
    EmptyColorRange { vmin: f64, vmax: f64 },
    #[error("Tiles must be at least one pixel wide")]
    #[diagnostic(code(poles::config::tile_px))]
    NoTileSize,
}

/// Everything that determines a baseline, and therefore its cache key.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BaselineParams {
    lat_max: f64,
    year_min: i32,
    year_max: i32,
}

impl BaselineParams {
    pub fn new(lat_max: f64, year_min: i32, year_max: i32) -> Result<Self, ConfigError> {
        if !(lat_max > 0.0 && lat_max < 90.0) {
            return Err(ConfigError::LatMaxOutOfRange(lat_max));
        }
        if year_max < year_min {
            return Err(ConfigError::EmptyYearRange { year_min, year_max });
        }
        Ok(Self {
            lat_max,
            year_min,
            year_max,
        })
    }

    pub fn lat_max(&self) -> f64 {
        self.lat_max
    }

    pub fn year_min(&self) -> i32 {
        self.year_min
    }

    pub fn year_max(&self) -> i32 {
        self.year_max
    }

    pub fn contains_year(&self, year: i32) -> bool {
        self.year_min <= year && year <= self.year_max
    }

    /// Number of years in the averaging window, never zero.
    pub fn year_count(&self) -> usize {
        (i64::from(self.year_max) - i64::from(self.year_min) + 1) as usize
    }
}

/// Run configuration of the `poles` binary.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub data_path: PathBuf,
    pub cache_dir: PathBuf,
    pub output_dir: PathBuf,
    /// Absolute latitude where the maps stop, in degrees.
    pub lat_max: f64,
    pub vmin: f64,
    pub vmax: f64,
    pub ncols: usize,
    pub colormap: Colormap,
    pub year_min: i32,
    pub year_max: i32,
    pub hemisphere: Hemisphere,
    /// Side of one tile in pixels.
    pub tile_px: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from("data.grid"),
            cache_dir: PathBuf::from("."),
            output_dir: PathBuf::from("."),
            lat_max: 66.0,
            vmin: -12.0,
            vmax: 12.0,
            ncols: 12,
            colormap: Colormap::default(),
            year_min: 1981,
            year_max: 2010,
            hemisphere: Hemisphere::North,
            tile_px: 100,
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.baseline_params()?;
        self.color_scale()?;
        if self.ncols == 0 {
            return Err(ConfigError::NoColumns);
        }
        if self.tile_px == 0 {
            return Err(ConfigError::NoTileSize);
        }
        Ok(())
    }

    pub fn baseline_params(&self) -> Result<BaselineParams, ConfigError> {
        BaselineParams::new(self.lat_max, self.year_min, self.year_max)
    }

    pub fn color_scale(&self) -> Result<ColorScale, ConfigError> {
        ColorScale::new(self.vmin, self.vmax, self.colormap)
    }

    /// `grid_N.png` or `grid_S.png` in the output directory.
    pub fn output_path(&self) -> PathBuf {
        self.output_dir
            .join(format!("grid_{}.png", self.hemisphere.code()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = Config::default();
        config.validate().unwrap();
        assert_eq!(config.baseline_params().unwrap().year_count(), 30);
        assert_eq!(config.output_path(), PathBuf::from("./grid_N.png"));
    }

    #[test]
    fn reject_empty_year_range() {
        let config = Config {
            year_min: 2000,
            year_max: 1999,
            ..Config::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::EmptyYearRange {
                year_min: 2000,
                year_max: 1999
            })
        );
    }

    #[test]
    fn single_year_range() {
        let params = BaselineParams::new(60.0, 1990, 1990).unwrap();
        assert_eq!(params.year_count(), 1);
        assert!(params.contains_year(1990));
        assert!(!params.contains_year(1991));
        assert!(!params.contains_year(1989));
    }

    #[test]
    fn widest_year_range() {
        let params = BaselineParams::new(60.0, i32::MIN, i32::MAX).unwrap();
        assert_eq!(params.year_count(), 1 << 32);
        assert!(params.contains_year(0));
    }

    #[test]
    fn reject_bad_values() {
        assert_eq!(
            BaselineParams::new(90.0, 1990, 2000),
            Err(ConfigError::LatMaxOutOfRange(90.0))
        );
        assert_eq!(
            BaselineParams::new(0.0, 1990, 2000),
            Err(ConfigError::LatMaxOutOfRange(0.0))
        );
        assert!(BaselineParams::new(f64::NAN, 1990, 2000).is_err());

        let config = Config {
            ncols: 0,
            ..Config::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::NoColumns));

        let config = Config {
            vmin: 3.0,
            vmax: 3.0,
            ..Config::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::EmptyColorRange {
                vmin: 3.0,
                vmax: 3.0
            })
        );

        let config = Config {
            tile_px: 0,
            ..Config::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::NoTileSize));
    }

    #[test]
    fn south_output_name() {
        let config = Config {
            hemisphere: Hemisphere::South,
            output_dir: PathBuf::from("out"),
            ..Config::default()
        };
        assert_eq!(config.output_path(), PathBuf::from("out/grid_S.png"));
    }
}
