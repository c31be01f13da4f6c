use std::f64::consts::PI;

use ndarray::{Array1, Array2};

use crate::{Hemisphere, SubGrid};

/// Running minimum and maximum over every anomaly field seen so far.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Extrema {
    min: f64,
    max: f64,
}

impl Default for Extrema {
    fn default() -> Self {
        Self::new()
    }
}

impl Extrema {
    /// Starts out of range, so the first update always wins.
    pub fn new() -> Self {
        Self {
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        }
    }

    /// Folds in every non NaN value of `field`.
    pub fn update(&mut self, field: &Array2<f64>) {
        for value in field.iter().copied().filter(|value| !value.is_nan()) {
            self.min = self.min.min(value);
            self.max = self.max.max(value);
        }
    }

    /// `(min, max)`, or `None` before any value was seen.
    pub fn range(&self) -> Option<(f64, f64)> {
        (self.min <= self.max).then_some((self.min, self.max))
    }
}

/// Grid position of one tile in the composite image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tile {
    pub row: usize,
    pub col: usize,
}

/// How records map onto a figure with a fixed number of columns.
///
/// Only full rows are drawn: with `total` records and `ncols` columns the
/// last `total % ncols` records get no tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileLayout {
    total: usize,
    ncols: usize,
}

impl TileLayout {
    /// `ncols` must be at least 1.
    pub fn new(total: usize, ncols: usize) -> Self {
        assert!(ncols > 0, "a tile layout needs at least one column");
        Self { total, ncols }
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn ncols(&self) -> usize {
        self.ncols
    }

    pub fn rows(&self) -> usize {
        self.total / self.ncols
    }

    /// Number of records that get a tile.
    pub fn rendered(&self) -> usize {
        self.rows() * self.ncols
    }

    /// Number of trailing records left out.
    pub fn dropped(&self) -> usize {
        self.total - self.rendered()
    }

    pub fn tile(&self, index: usize) -> Option<Tile> {
        (index < self.rendered()).then(|| Tile {
            row: index / self.ncols,
            col: index % self.ncols,
        })
    }
}

/// Polar coordinates of a sub-grid: one angle per column, one radius per row.
///
/// Angles are longitudes in radians. Radii are angular distances from the
/// pole in radians, so the pole sits at the origin.
#[derive(Debug, Clone, PartialEq)]
pub struct PolarMesh {
    pub angles: Array1<f64>,
    pub radii: Array1<f64>,
}

impl PolarMesh {
    pub fn new(grid: &SubGrid, hemisphere: Hemisphere) -> Self {
        Self {
            angles: grid.lons.mapv(|lon| lon / 180.0 * PI),
            radii: grid.lats.mapv(|lat| hemisphere.radius(lat)),
        }
    }

    /// Cell boundaries along the angular axis, see [`edges`].
    pub fn angle_edges(&self) -> Vec<f64> {
        edges(&self.angles)
    }

    /// Cell boundaries along the radial axis, never below the pole.
    pub fn radius_edges(&self) -> Vec<f64> {
        edges(&self.radii)
            .into_iter()
            .map(|radius| radius.max(0.0))
            .collect()
    }

    /// Largest radius any cell reaches.
    pub fn extent(&self) -> f64 {
        self.radius_edges().into_iter().fold(0.0, f64::max)
    }
}

/// Boundaries of the cells centred on `centers`: halfway between neighbours
/// and half a step beyond both ends. A single center gets a half degree on
/// each side.
pub fn edges(centers: &Array1<f64>) -> Vec<f64> {
    match centers.len() {
        0 => Vec::new(),
        1 => {
            let half = PI / 360.0;
            vec![centers[0] - half, centers[0] + half]
        }
        n => {
            let mut edges = Vec::with_capacity(n + 1);
            edges.push(centers[0] - (centers[1] - centers[0]) / 2.0);
            for pair in centers.windows(2) {
                edges.push((pair[0] + pair[1]) / 2.0);
            }
            edges.push(centers[n - 1] + (centers[n - 1] - centers[n - 2]) / 2.0);
            edges
        }
    }
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-12, "{a} != {b}");
    }

    #[test]
    fn extrema_over_fields() {
        let fields = [
            array![[1.0, -2.0], [0.5, 3.0]],
            array![[-7.5, 0.0], [1.0, 1.0]],
            array![[4.0, 9.25], [f64::NAN, -1.0]],
        ];
        let orders = [[0, 1, 2], [2, 1, 0], [1, 2, 0]];
        for order in orders {
            let mut extrema = Extrema::new();
            assert_eq!(extrema.range(), None);
            for index in order {
                extrema.update(&fields[index]);
            }
            assert_eq!(extrema.range(), Some((-7.5, 9.25)));
        }
    }

    #[test]
    fn extrema_are_monotonic() {
        let mut extrema = Extrema::new();
        extrema.update(&array![[-1.0, 1.0]]);
        extrema.update(&array![[0.0, 0.5]]);
        assert_eq!(extrema.range(), Some((-1.0, 1.0)));
    }

    #[test]
    fn tile_positions() {
        let layout = TileLayout::new(24, 12);
        assert_eq!(layout.rows(), 2);
        assert_eq!(layout.tile(13), Some(Tile { row: 1, col: 1 }));
        assert_eq!(layout.tile(0), Some(Tile { row: 0, col: 0 }));
        assert_eq!(layout.tile(23), Some(Tile { row: 1, col: 11 }));
        assert_eq!(layout.tile(24), None);
        assert_eq!(layout.dropped(), 0);
    }

    #[test]
    fn trailing_records_are_dropped() {
        let layout = TileLayout::new(23, 12);
        assert_eq!(layout.rows(), 1);
        assert_eq!(layout.rendered(), 12);
        assert_eq!(layout.dropped(), 23 % 12);
        assert_eq!(layout.tile(11), Some(Tile { row: 0, col: 11 }));
        assert_eq!(layout.tile(12), None);
        assert_eq!(layout.tile(22), None);

        let layout = TileLayout::new(5, 12);
        assert_eq!(layout.rows(), 0);
        assert_eq!(layout.dropped(), 5);
    }

    #[test]
    fn polar_transform() {
        let grid = SubGrid {
            data: Array2::zeros((3, 2)),
            lats: array![90.0, 78.0, 66.0],
            lons: array![0.0, 90.0],
        };
        let mesh = PolarMesh::new(&grid, Hemisphere::North);
        assert_eq!(mesh.angles[0], 0.0);
        assert_close(mesh.angles[1], PI / 2.0);
        assert_eq!(mesh.radii[0], 0.0);
        assert_close(mesh.radii[2], (90.0 - 66.0) / 180.0 * PI);

        let grid = SubGrid {
            data: Array2::zeros((2, 2)),
            lats: array![-66.0, -90.0],
            lons: array![0.0, 180.0],
        };
        let mesh = PolarMesh::new(&grid, Hemisphere::South);
        assert_close(mesh.radii[0], (90.0 - 66.0) / 180.0 * PI);
        assert_eq!(mesh.radii[1], 0.0);
        assert_close(mesh.angles[1], PI);
    }

    #[test]
    fn cell_edges() {
        assert_eq!(edges(&array![0.0, 2.0, 4.0]), vec![-1.0, 1.0, 3.0, 5.0]);
        assert_eq!(edges(&array![4.0, 2.0]), vec![5.0, 3.0, 1.0]);
        assert!(edges(&Array1::zeros(0)).is_empty());
        assert_eq!(edges(&array![1.0]).len(), 2);

        let grid = SubGrid {
            data: Array2::zeros((2, 1)),
            lats: array![90.0, 80.0],
            lons: array![0.0],
        };
        let mesh = PolarMesh::new(&grid, Hemisphere::North);
        let radii = mesh.radius_edges();
        assert_eq!(radii[0], 0.0);
        assert_close(radii[2], 15.0 / 180.0 * PI);
        assert_close(mesh.extent(), 15.0 / 180.0 * PI);
    }
}
