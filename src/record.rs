use std::{fmt, str::FromStr};

use miette::Diagnostic;
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::Month;

/// Longitude window kept for both hemispheres, in degrees.
pub const LON_MIN: f64 = 0.0;
pub const LON_MAX: f64 = 359.9;

/// One timestamped grid as served by a [`RecordSource`](crate::RecordSource).
///
/// Grids are regular in latitude/longitude: `lats[row]` is the latitude of
/// every cell in `data.row(row)` and `lons[col]` the longitude of every cell in
/// `data.column(col)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub descriptor: String,
    pub data: Array2<f64>,
    pub lats: Array1<f64>,
    pub lons: Array1<f64>,
}

#[derive(Debug, Error, Diagnostic)]
pub enum DateError {
    #[error("Descriptor `{0}` is empty")]
    #[diagnostic(code(poles::date::empty))]
    Empty(String),
    #[error("Descriptor `{descriptor}` does not end in YYYYMM")]
    #[diagnostic(
        code(poles::date::format),
        help("the last whitespace separated token must start with a year and a month, e.g. `198101`")
    )]
    BadFormat { descriptor: String },
    #[error("Bad month {month} in descriptor `{descriptor}`")]
    #[diagnostic(code(poles::date::month))]
    BadMonth { descriptor: String, month: u8 },
}

/// Year and calendar month of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct RecordDate {
    pub year: i32,
    pub month: Month,
}

impl RecordDate {
    /// Parses the trailing `YYYYMM...` token of a descriptor such as
    /// `1:2 metre temperature:K:regular_ll:sfc:level 0:from 198101010000`.
    pub fn from_descriptor(descriptor: &str) -> Result<Self, DateError> {
        let token = descriptor
            .split_whitespace()
            .last()
            .ok_or_else(|| DateError::Empty(descriptor.to_string()))?;

        let bad_format = || DateError::BadFormat {
            descriptor: descriptor.to_string(),
        };
        let digits = token.get(..6).ok_or_else(bad_format)?;
        if !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(bad_format());
        }

        let year = digits[..4].parse().map_err(|_| bad_format())?;
        let month: u8 = digits[4..].parse().map_err(|_| bad_format())?;
        let month = Month::try_from(month).map_err(|_| DateError::BadMonth {
            descriptor: descriptor.to_string(),
            month,
        })?;

        Ok(Self { year, month })
    }

    /// Zero based month, the first axis of a baseline array.
    pub fn month_index(&self) -> usize {
        u8::from(self.month) as usize - 1
    }
}

impl fmt::Display for RecordDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.month, self.year)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Hemisphere {
    North,
    South,
}

impl Hemisphere {
    pub const ALL: [Hemisphere; 2] = [Hemisphere::North, Hemisphere::South];

    /// Single letter code used in file names.
    pub fn code(&self) -> &'static str {
        match self {
            Self::North => "N",
            Self::South => "S",
        }
    }

    /// Latitude band between the pole and `lat_max` degrees away from the
    /// equator.
    pub fn band(&self, lat_max: f64) -> Band {
        match self {
            Self::North => Band {
                lat_min: lat_max,
                lat_max: 90.0,
                lon_min: LON_MIN,
                lon_max: LON_MAX,
            },
            Self::South => Band {
                lat_min: -90.0,
                lat_max: -lat_max,
                lon_min: LON_MIN,
                lon_max: LON_MAX,
            },
        }
    }

    /// Distance from the pole in radians, the radial coordinate of a tile.
    pub fn radius(&self, latitude: f64) -> f64 {
        match self {
            Self::North => (90.0 - latitude) / 180.0 * std::f64::consts::PI,
            Self::South => (90.0 + latitude) / 180.0 * std::f64::consts::PI,
        }
    }
}

impl fmt::Display for Hemisphere {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Hemisphere {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "N" | "n" | "north" | "North" => Ok(Self::North),
            "S" | "s" | "south" | "South" => Ok(Self::South),
            s => Err(format!("Unknown hemisphere {s}. Expecting `N` or `S`")),
        }
    }
}

/// Inclusive latitude/longitude bounding box, in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Band {
    pub lat_min: f64,
    pub lat_max: f64,
    pub lon_min: f64,
    pub lon_max: f64,
}

impl Band {
    pub fn contains_lat(&self, lat: f64) -> bool {
        self.lat_min <= lat && lat <= self.lat_max
    }

    pub fn contains_lon(&self, lon: f64) -> bool {
        self.lon_min <= lon && lon <= self.lon_max
    }
}

#[derive(Debug, Error, Diagnostic)]
pub enum ExtractError {
    #[error("No grid row lies in latitudes [{lat_min}, {lat_max}]")]
    #[diagnostic(code(poles::extract::no_rows), help("check `lat_max` against the grid resolution"))]
    NoRows { lat_min: f64, lat_max: f64 },
    #[error("No grid column lies in longitudes [{lon_min}, {lon_max}]")]
    #[diagnostic(code(poles::extract::no_columns))]
    NoColumns { lon_min: f64, lon_max: f64 },
}

/// The part of a record that falls in a [`Band`].
#[derive(Debug, Clone, PartialEq)]
pub struct SubGrid {
    pub data: Array2<f64>,
    pub lats: Array1<f64>,
    pub lons: Array1<f64>,
}

impl SubGrid {
    pub fn shape(&self) -> (usize, usize) {
        self.data.dim()
    }
}

impl Record {
    pub fn date(&self) -> Result<RecordDate, DateError> {
        RecordDate::from_descriptor(&self.descriptor)
    }

    pub fn shape(&self) -> (usize, usize) {
        self.data.dim()
    }

    /// Keeps the rows and columns whose coordinates lie inside `band`,
    /// preserving their order in the record.
    pub fn extract(&self, band: &Band) -> Result<SubGrid, ExtractError> {
        let rows: Vec<usize> = self
            .lats
            .iter()
            .enumerate()
            .filter(|(_, lat)| band.contains_lat(**lat))
            .map(|(row, _)| row)
            .collect();
        if rows.is_empty() {
            return Err(ExtractError::NoRows {
                lat_min: band.lat_min,
                lat_max: band.lat_max,
            });
        }

        let cols: Vec<usize> = self
            .lons
            .iter()
            .enumerate()
            .filter(|(_, lon)| band.contains_lon(**lon))
            .map(|(col, _)| col)
            .collect();
        if cols.is_empty() {
            return Err(ExtractError::NoColumns {
                lon_min: band.lon_min,
                lon_max: band.lon_max,
            });
        }

        Ok(SubGrid {
            data: self.data.select(Axis(0), &rows).select(Axis(1), &cols),
            lats: self.lats.select(Axis(0), &rows),
            lons: self.lons.select(Axis(0), &cols),
        })
    }
}

#[cfg(test)]
mod tests {
    use ndarray::{array, Array};

    use super::*;

    fn record(descriptor: &str) -> Record {
        let lats = array![90.0, 60.0, 30.0, 0.0, -30.0, -60.0, -90.0];
        let lons = array![0.0, 90.0, 180.0, 270.0];
        let data = Array::from_shape_fn((7, 4), |(row, col)| (row * 10 + col) as f64);
        Record {
            descriptor: descriptor.to_string(),
            data,
            lats,
            lons,
        }
    }

    #[test]
    fn parse_trailing_date() {
        let date =
            RecordDate::from_descriptor("1:2 metre temperature:K:regular_ll:from 198107010000")
                .unwrap();
        assert_eq!(date.year, 1981);
        assert_eq!(date.month, Month::July);
        assert_eq!(date.month_index(), 6);

        let date = RecordDate::from_descriptor("t2m 202312").unwrap();
        assert_eq!(date.year, 2023);
        assert_eq!(date.month, Month::December);
    }

    #[test]
    fn reject_bad_dates() {
        assert!(matches!(
            RecordDate::from_descriptor("   "),
            Err(DateError::Empty(_))
        ));
        assert!(matches!(
            RecordDate::from_descriptor("t2m 1981"),
            Err(DateError::BadFormat { .. })
        ));
        assert!(matches!(
            RecordDate::from_descriptor("t2m from:198101"),
            Err(DateError::BadFormat { .. })
        ));
        assert!(matches!(
            RecordDate::from_descriptor("t2m 198113"),
            Err(DateError::BadMonth { month: 13, .. })
        ));
        assert!(matches!(
            RecordDate::from_descriptor("t2m 198100"),
            Err(DateError::BadMonth { month: 0, .. })
        ));
    }

    #[test]
    fn extract_north_and_south() {
        let record = record("t2m 198101");

        let north = record.extract(&Hemisphere::North.band(60.0)).unwrap();
        assert_eq!(north.lats, array![90.0, 60.0]);
        assert_eq!(north.lons, array![0.0, 90.0, 180.0, 270.0]);
        assert_eq!(north.data, array![[0.0, 1.0, 2.0, 3.0], [10.0, 11.0, 12.0, 13.0]]);

        let south = record.extract(&Hemisphere::South.band(60.0)).unwrap();
        assert_eq!(south.lats, array![-60.0, -90.0]);
        assert_eq!(south.shape(), (2, 4));
        assert_eq!(south.data[[1, 3]], 63.0);
    }

    #[test]
    fn extract_drops_wrapped_longitude() {
        let mut record = record("t2m 198101");
        record.lons = array![0.0, 120.0, 240.0, 360.0];
        let north = record.extract(&Hemisphere::North.band(60.0)).unwrap();
        assert_eq!(north.lons, array![0.0, 120.0, 240.0]);
        assert_eq!(north.shape(), (2, 3));
    }

    #[test]
    fn extract_empty_band() {
        let record = record("t2m 198101");
        assert!(matches!(
            record.extract(&Hemisphere::North.band(75.0)),
            Ok(SubGrid { .. })
        ));
        let mut record = record;
        record.lats = array![45.0, 40.0, 30.0, 0.0, -30.0, -40.0, -45.0];
        assert!(matches!(
            record.extract(&Hemisphere::North.band(60.0)),
            Err(ExtractError::NoRows { .. })
        ));
    }

    #[test]
    fn hemisphere_parsing() {
        assert_eq!("N".parse::<Hemisphere>().unwrap(), Hemisphere::North);
        assert_eq!("south".parse::<Hemisphere>().unwrap(), Hemisphere::South);
        assert!("E".parse::<Hemisphere>().is_err());
    }
}
