//! Where anomaly tiles get drawn.

use std::path::Path;

use miette::Diagnostic;
use ndarray::Array2;
use plotters::{coord::Shift, prelude::*};
use thiserror::Error;
use tracing::info;

use crate::{ColorScale, PolarMesh, Tile, TileLayout};

/// Largest angular step, in radians, between two vertices of a cell arc.
const ARC_STEP: f64 = std::f64::consts::PI / 90.0;

#[derive(Debug, Error, Diagnostic)]
pub enum SurfaceError {
    #[error("Tiles were drawn before the layout was set")]
    #[diagnostic(code(poles::surface::not_started))]
    NotStarted,
    #[error("Tile {tile:?} lies outside the figure")]
    #[diagnostic(code(poles::surface::layout))]
    OutOfLayout { tile: Tile },
    #[error("Field of {field:?} does not match a mesh of {mesh:?}")]
    #[diagnostic(code(poles::surface::shape))]
    Shape {
        field: (usize, usize),
        mesh: (usize, usize),
    },
    #[error("A figure of {rows}x{ncols} tiles of {tile_px} pixels is too large")]
    #[diagnostic(code(poles::surface::size), help("lower `tile_px` or `ncols`"))]
    TooLarge {
        rows: usize,
        ncols: usize,
        tile_px: u32,
    },
    #[error("Could not draw {path}: {reason}")]
    #[diagnostic(code(poles::surface::drawing))]
    Drawing { path: String, reason: String },
}

/// A figure made of `rows × ncols` polar tiles.
pub trait TileSurface {
    /// Sizes the figure, called once before any tile.
    fn begin(&mut self, layout: &TileLayout) -> Result<(), SurfaceError>;

    /// Paints `field` over `mesh` into `tile`, clipping values to `scale`.
    fn draw_tile(
        &mut self,
        tile: Tile,
        mesh: &PolarMesh,
        field: &Array2<f64>,
        scale: &ColorScale,
    ) -> Result<(), SurfaceError>;

    /// Flushes the figure to its destination.
    fn finish(&mut self) -> Result<(), SurfaceError>;
}

/// PNG figure backed by the plotters bitmap backend.
pub struct PngSurface<'a> {
    path: &'a Path,
    tile_px: u32,
    ncols: usize,
    root: Option<DrawingArea<BitMapBackend<'a>, Shift>>,
    tiles: Vec<DrawingArea<BitMapBackend<'a>, Shift>>,
}

impl<'a> PngSurface<'a> {
    pub fn new(path: &'a Path, tile_px: u32) -> Self {
        Self {
            path,
            tile_px,
            ncols: 0,
            root: None,
            tiles: Vec::new(),
        }
    }

    fn drawing_error(&self, error: impl std::fmt::Display) -> SurfaceError {
        SurfaceError::Drawing {
            path: self.path.display().to_string(),
            reason: error.to_string(),
        }
    }
}

impl TileSurface for PngSurface<'_> {
    fn begin(&mut self, layout: &TileLayout) -> Result<(), SurfaceError> {
        let side = |count: usize| {
            u32::try_from(count)
                .ok()
                .and_then(|count| count.checked_mul(self.tile_px))
        };
        let size = side(layout.ncols())
            .zip(side(layout.rows()))
            .ok_or(SurfaceError::TooLarge {
                rows: layout.rows(),
                ncols: layout.ncols(),
                tile_px: self.tile_px,
            })?;
        let root = BitMapBackend::new(self.path, size).into_drawing_area();
        root.fill(&WHITE).map_err(|e| self.drawing_error(e))?;

        self.ncols = layout.ncols();
        self.tiles = root.split_evenly((layout.rows(), layout.ncols()));
        self.root = Some(root);
        Ok(())
    }

    fn draw_tile(
        &mut self,
        tile: Tile,
        mesh: &PolarMesh,
        field: &Array2<f64>,
        scale: &ColorScale,
    ) -> Result<(), SurfaceError> {
        if self.root.is_none() {
            return Err(SurfaceError::NotStarted);
        }
        let mesh_shape = (mesh.radii.len(), mesh.angles.len());
        if field.dim() != mesh_shape {
            return Err(SurfaceError::Shape {
                field: field.dim(),
                mesh: mesh_shape,
            });
        }
        let area = self
            .tiles
            .get(tile.row * self.ncols + tile.col)
            .filter(|_| tile.col < self.ncols)
            .ok_or(SurfaceError::OutOfLayout { tile })?;

        let extent = mesh.extent();
        if extent <= 0.0 {
            return Ok(());
        }
        let (width, height) = area.dim_in_pixel();
        let center = (width as f64 / 2.0, height as f64 / 2.0);
        let pixels_per_radian = width.min(height) as f64 / 2.0 / extent;

        let angle_edges = mesh.angle_edges();
        let radius_edges = mesh.radius_edges();
        for ((row, col), value) in field.indexed_iter() {
            let Some(color) = scale.color(*value) else {
                continue;
            };
            let points = cell_polygon(
                center,
                pixels_per_radian,
                (angle_edges[col], angle_edges[col + 1]),
                (radius_edges[row], radius_edges[row + 1]),
            );
            area.draw(&Polygon::new(points, color.filled()))
                .map_err(|e| self.drawing_error(e))?;
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<(), SurfaceError> {
        let root = self.root.take().ok_or(SurfaceError::NotStarted)?;
        self.tiles.clear();
        root.present().map_err(|e| self.drawing_error(e))?;
        info!(path = %self.path.display(), "Saved figure");
        Ok(())
    }
}

/// Pixel outline of the polar cell spanning `angles` and `radii`, both in
/// radians. Angle 0 points right and angles grow counter-clockwise.
pub fn cell_polygon(
    center: (f64, f64),
    pixels_per_radian: f64,
    (from_angle, to_angle): (f64, f64),
    (inner, outer): (f64, f64),
) -> Vec<(i32, i32)> {
    let steps = ((to_angle - from_angle).abs() / ARC_STEP - 1e-9).ceil().max(1.0) as usize;
    let point = |angle: f64, radius: f64| {
        let r = radius * pixels_per_radian;
        (
            (center.0 + r * angle.cos()).round() as i32,
            (center.1 - r * angle.sin()).round() as i32,
        )
    };
    let angle_at = |step: usize| from_angle + (to_angle - from_angle) * step as f64 / steps as f64;

    let mut points = Vec::with_capacity(2 * (steps + 1));
    points.extend((0..=steps).map(|step| point(angle_at(step), inner)));
    points.extend((0..=steps).rev().map(|step| point(angle_at(step), outer)));
    points
}

#[cfg(test)]
mod tests {
    use std::f64::consts::PI;

    use ndarray::array;

    use super::*;
    use crate::{Colormap, Hemisphere, SubGrid};

    #[test]
    fn quarter_cell_outline() {
        let points = cell_polygon((50.0, 50.0), 10.0, (0.0, PI / 2.0), (1.0, 2.0));
        // 45 arc steps on each side
        assert_eq!(points.len(), 92);
        assert_eq!(points[0], (60, 50));
        assert_eq!(points[45], (50, 40));
        assert_eq!(points[46], (50, 30));
        assert_eq!(points[91], (70, 50));
    }

    #[test]
    fn narrow_cell_is_a_quad() {
        let points = cell_polygon((0.0, 0.0), 100.0, (0.0, 0.01), (0.0, 1.0));
        assert_eq!(points.len(), 4);
        assert_eq!(points[0], (0, 0));
        assert_eq!(points[1], (0, 0));
        assert_eq!(points[3], (100, 0));
    }

    #[test]
    fn draw_before_begin_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("grid_N.png");
        let mut surface = PngSurface::new(&path, 20);
        let grid = SubGrid {
            data: Array2::zeros((1, 1)),
            lats: array![90.0],
            lons: array![0.0],
        };
        let mesh = PolarMesh::new(&grid, Hemisphere::North);
        let scale = ColorScale::new(-1.0, 1.0, Colormap::default()).unwrap();
        assert!(matches!(
            surface.draw_tile(Tile { row: 0, col: 0 }, &mesh, &grid.data, &scale),
            Err(SurfaceError::NotStarted)
        ));
        assert!(matches!(surface.finish(), Err(SurfaceError::NotStarted)));
    }

    #[test]
    fn oversized_figure_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("grid_N.png");
        let mut surface = PngSurface::new(&path, 1_000_000_000);
        assert!(matches!(
            surface.begin(&TileLayout::new(24, 12)),
            Err(SurfaceError::TooLarge {
                rows: 2,
                ncols: 12,
                tile_px: 1_000_000_000
            })
        ));
        assert!(!path.exists());
    }

    #[test]
    fn writes_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("grid_N.png");
        let grid = SubGrid {
            data: array![[0.0, 5.0, -5.0, f64::NAN], [20.0, -20.0, 1.0, 2.0]],
            lats: array![90.0, 80.0],
            lons: array![0.0, 90.0, 180.0, 270.0],
        };
        let mesh = PolarMesh::new(&grid, Hemisphere::North);
        let scale = ColorScale::new(-12.0, 12.0, Colormap::default()).unwrap();

        let mut surface = PngSurface::new(&path, 20);
        surface.begin(&TileLayout::new(2, 2)).unwrap();
        surface
            .draw_tile(Tile { row: 0, col: 0 }, &mesh, &grid.data, &scale)
            .unwrap();
        surface
            .draw_tile(Tile { row: 0, col: 1 }, &mesh, &grid.data, &scale)
            .unwrap();
        assert!(matches!(
            surface.draw_tile(Tile { row: 1, col: 0 }, &mesh, &grid.data, &scale),
            Err(SurfaceError::OutOfLayout { .. })
        ));
        assert!(matches!(
            surface.draw_tile(Tile { row: 0, col: 0 }, &mesh, &Array2::zeros((3, 3)), &scale),
            Err(SurfaceError::Shape { .. })
        ));
        surface.finish().unwrap();

        let header = std::fs::read(&path).unwrap();
        assert_eq!(&header[1..4], b"PNG");
    }
}
