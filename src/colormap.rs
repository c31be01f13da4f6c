//! Named colormaps and the clipped color scale used to paint anomalies.

use std::{fmt, str::FromStr};

use plotters::style::RGBColor;

use crate::ConfigError;

const COOLWARM: &[(u8, u8, u8)] = &[
    (59, 76, 192),
    (98, 130, 234),
    (141, 176, 254),
    (184, 208, 249),
    (221, 221, 221),
    (245, 196, 173),
    (244, 154, 123),
    (222, 96, 77),
    (180, 4, 38),
];

const BWR: &[(u8, u8, u8)] = &[(0, 0, 255), (255, 255, 255), (255, 0, 0)];

const SEISMIC: &[(u8, u8, u8)] = &[
    (0, 0, 77),
    (0, 0, 255),
    (255, 255, 255),
    (255, 0, 0),
    (128, 0, 0),
];

const RDBU: &[(u8, u8, u8)] = &[
    (103, 0, 31),
    (178, 24, 43),
    (214, 96, 77),
    (244, 165, 130),
    (253, 219, 199),
    (247, 247, 247),
    (209, 229, 240),
    (146, 197, 222),
    (67, 147, 195),
    (33, 102, 172),
    (5, 48, 97),
];

const VIRIDIS: &[(u8, u8, u8)] = &[
    (68, 1, 84),
    (72, 36, 117),
    (65, 68, 135),
    (53, 95, 141),
    (42, 120, 142),
    (33, 145, 140),
    (34, 168, 132),
    (68, 191, 112),
    (122, 209, 81),
    (189, 223, 38),
    (253, 231, 37),
];

const PLASMA: &[(u8, u8, u8)] = &[
    (13, 8, 135),
    (65, 4, 157),
    (106, 0, 168),
    (143, 13, 164),
    (177, 42, 144),
    (204, 71, 120),
    (225, 100, 98),
    (242, 132, 75),
    (252, 166, 54),
    (252, 206, 37),
    (240, 249, 33),
];

const GRAY: &[(u8, u8, u8)] = &[(0, 0, 0), (255, 255, 255)];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Palette {
    Coolwarm,
    Bwr,
    Seismic,
    RdBu,
    Viridis,
    Plasma,
    Gray,
}

impl Palette {
    fn name(&self) -> &'static str {
        match self {
            Self::Coolwarm => "coolwarm",
            Self::Bwr => "bwr",
            Self::Seismic => "seismic",
            Self::RdBu => "RdBu",
            Self::Viridis => "viridis",
            Self::Plasma => "plasma",
            Self::Gray => "gray",
        }
    }

    fn stops(&self) -> &'static [(u8, u8, u8)] {
        match self {
            Self::Coolwarm => COOLWARM,
            Self::Bwr => BWR,
            Self::Seismic => SEISMIC,
            Self::RdBu => RDBU,
            Self::Viridis => VIRIDIS,
            Self::Plasma => PLASMA,
            Self::Gray => GRAY,
        }
    }
}

/// A palette, optionally reversed with the `_r` suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Colormap {
    pub palette: Palette,
    pub reversed: bool,
}

impl Default for Colormap {
    fn default() -> Self {
        Self {
            palette: Palette::Coolwarm,
            reversed: false,
        }
    }
}

impl Colormap {
    /// Color at position `t`, clamped to `[0, 1]`.
    pub fn at(&self, t: f64) -> RGBColor {
        let t = t.clamp(0.0, 1.0);
        let t = if self.reversed { 1.0 - t } else { t };

        let stops = self.palette.stops();
        let position = t * (stops.len() - 1) as f64;
        let lower = (position.floor() as usize).min(stops.len() - 2);
        interpolate(stops[lower], stops[lower + 1], position - lower as f64)
    }
}

fn interpolate(from: (u8, u8, u8), to: (u8, u8, u8), t: f64) -> RGBColor {
    let t = t.clamp(0.0, 1.0);
    let channel = |a: u8, b: u8| (a as f64 * (1.0 - t) + b as f64 * t).round() as u8;
    RGBColor(
        channel(from.0, to.0),
        channel(from.1, to.1),
        channel(from.2, to.2),
    )
}

impl fmt::Display for Colormap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.palette.name())?;
        if self.reversed {
            f.write_str("_r")?;
        }
        Ok(())
    }
}

impl FromStr for Colormap {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (name, reversed) = match s.strip_suffix("_r") {
            Some(name) => (name, true),
            None => (s, false),
        };
        let palette = match name {
            "coolwarm" => Palette::Coolwarm,
            "bwr" => Palette::Bwr,
            "seismic" => Palette::Seismic,
            "RdBu" => Palette::RdBu,
            "viridis" => Palette::Viridis,
            "plasma" => Palette::Plasma,
            "gray" | "grey" => Palette::Gray,
            _ => {
                return Err(format!(
                    "Unknown colormap {s}. Expecting one of coolwarm, bwr, seismic, RdBu, viridis, plasma, gray, optionally suffixed with `_r`"
                ))
            }
        };
        Ok(Self { palette, reversed })
    }
}

/// Fixed `[vmin, vmax]` range mapped onto a colormap.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorScale {
    vmin: f64,
    vmax: f64,
    colormap: Colormap,
}

impl ColorScale {
    pub fn new(vmin: f64, vmax: f64, colormap: Colormap) -> Result<Self, ConfigError> {
        if !(vmin < vmax) {
            return Err(ConfigError::EmptyColorRange { vmin, vmax });
        }
        Ok(Self {
            vmin,
            vmax,
            colormap,
        })
    }

    pub fn vmin(&self) -> f64 {
        self.vmin
    }

    pub fn vmax(&self) -> f64 {
        self.vmax
    }

    pub fn colormap(&self) -> Colormap {
        self.colormap
    }

    /// Position of `value` in the range, clipped to `[0, 1]`.
    pub fn normalize(&self, value: f64) -> f64 {
        ((value - self.vmin) / (self.vmax - self.vmin)).clamp(0.0, 1.0)
    }

    /// `None` for missing (NaN) values.
    pub fn color(&self, value: f64) -> Option<RGBColor> {
        if value.is_nan() {
            return None;
        }
        Some(self.colormap.at(self.normalize(value)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rgb(color: RGBColor) -> (u8, u8, u8) {
        (color.0, color.1, color.2)
    }

    #[test]
    fn parse_names() {
        assert_eq!("coolwarm".parse::<Colormap>().unwrap(), Colormap::default());
        let reversed: Colormap = "RdBu_r".parse().unwrap();
        assert_eq!(reversed.palette, Palette::RdBu);
        assert!(reversed.reversed);
        assert_eq!(reversed.to_string(), "RdBu_r");
        assert!("jet".parse::<Colormap>().is_err());
        assert!("_r".parse::<Colormap>().is_err());
    }

    #[test]
    fn endpoints_and_middle() {
        let bwr: Colormap = "bwr".parse().unwrap();
        assert_eq!(rgb(bwr.at(0.0)), (0, 0, 255));
        assert_eq!(rgb(bwr.at(0.5)), (255, 255, 255));
        assert_eq!(rgb(bwr.at(1.0)), (255, 0, 0));
        assert_eq!(rgb(bwr.at(0.25)), (128, 128, 255));

        let reversed: Colormap = "bwr_r".parse().unwrap();
        assert_eq!(rgb(reversed.at(0.0)), (255, 0, 0));
    }

    #[test]
    fn scale_clips() {
        let scale = ColorScale::new(-12.0, 12.0, Colormap::default()).unwrap();
        assert_eq!(scale.normalize(0.0), 0.5);
        assert_eq!(scale.normalize(-40.0), 0.0);
        assert_eq!(scale.normalize(40.0), 1.0);
        assert_eq!(rgb(scale.color(100.0).unwrap()), (180, 4, 38));
        assert_eq!(rgb(scale.color(-100.0).unwrap()), (59, 76, 192));
        assert_eq!(rgb(scale.color(0.0).unwrap()), (221, 221, 221));
        assert!(scale.color(f64::NAN).is_none());
        assert_eq!((scale.vmin(), scale.vmax()), (-12.0, 12.0));
        assert_eq!(scale.colormap().to_string(), "coolwarm");
    }

    #[test]
    fn empty_range() {
        assert!(ColorScale::new(1.0, -1.0, Colormap::default()).is_err());
        assert!(ColorScale::new(f64::NAN, 1.0, Colormap::default()).is_err());
    }
}
