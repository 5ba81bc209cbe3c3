//! Footprint geometry shared by the localization engine and the grid rasterizer:
//! axis-aligned bounds, polygon/extent intersection, pixel windows covering a
//! footprint, and pixel-centre membership masks.
use geo::{BoundingRect, Coord, Intersects, LineString, Polygon, Rect};
use ndarray::{Array2, Zip};
use serde::Serialize;

use crate::io::dmi::GridCell;

// Pixel coordinates closer than this to an integer are treated as on the pixel edge
const EDGE_EPS: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Bounds {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Bounds {
    pub fn new(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Self {
            min_x: x0.min(x1),
            min_y: y0.min(y1),
            max_x: x0.max(x1),
            max_y: y0.max(y1),
        }
    }

    pub fn from_points<I: IntoIterator<Item = (f64, f64)>>(points: I) -> Option<Self> {
        points.into_iter().fold(None, |acc, (x, y)| {
            Some(match acc {
                None => Bounds::new(x, y, x, y),
                Some(b) => b.union(&Bounds::new(x, y, x, y)),
            })
        })
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    /// Closed-interval test: shared edges intersect
    pub fn intersects(&self, other: &Bounds) -> bool {
        self.min_x <= other.max_x
            && other.min_x <= self.max_x
            && self.min_y <= other.max_y
            && other.min_y <= self.max_y
    }

    pub fn union(&self, other: &Bounds) -> Bounds {
        Bounds {
            min_x: self.min_x.min(other.min_x),
            min_y: self.min_y.min(other.min_y),
            max_x: self.max_x.max(other.max_x),
            max_y: self.max_y.max(other.max_y),
        }
    }

    pub fn to_rect(&self) -> Rect<f64> {
        Rect::new(
            Coord {
                x: self.min_x,
                y: self.min_y,
            },
            Coord {
                x: self.max_x,
                y: self.max_y,
            },
        )
    }
}

/// A grid cell together with its polygon in the target raster's CRS
#[derive(Debug, Clone)]
pub struct CellFootprint<'a> {
    pub cell: &'a GridCell,
    pub polygon: Polygon<f64>,
}

pub fn ring_to_polygon(ring: &[(f64, f64)]) -> Polygon<f64> {
    Polygon::new(LineString::from(ring.to_vec()), vec![])
}

pub fn polygon_bounds(polygon: &Polygon<f64>) -> Option<Bounds> {
    polygon
        .bounding_rect()
        .map(|r| Bounds::new(r.min().x, r.min().y, r.max().x, r.max().y))
}

pub fn polygon_intersects_bounds(polygon: &Polygon<f64>, bounds: &Bounds) -> bool {
    polygon.intersects(&bounds.to_rect())
}

pub fn is_north_up(gt: &[f64; 6]) -> bool {
    gt[2] == 0.0 && gt[4] == 0.0 && gt[1] != 0.0 && gt[5] != 0.0
}

/// Extent covered by a `size = (cols, rows)` raster with geotransform `gt`
pub fn raster_extent(gt: &[f64; 6], size: (usize, usize)) -> Bounds {
    let (cols, rows) = (size.0 as f64, size.1 as f64);
    Bounds::new(
        gt[0],
        gt[3],
        gt[0] + cols * gt[1] + rows * gt[2],
        gt[3] + cols * gt[4] + rows * gt[5],
    )
}

/// Rectangular block of pixels, in raster pixel offsets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PixelWindow {
    pub col_off: usize,
    pub row_off: usize,
    pub cols: usize,
    pub rows: usize,
}

impl PixelWindow {
    pub fn offset(&self) -> (isize, isize) {
        (self.col_off as isize, self.row_off as isize)
    }

    pub fn size(&self) -> (usize, usize) {
        (self.cols, self.rows)
    }

    pub fn len(&self) -> usize {
        self.cols * self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn floor_snapped(v: f64) -> f64 {
    let r = v.round();
    if (v - r).abs() < EDGE_EPS { r } else { v.floor() }
}

pub(crate) fn ceil_snapped(v: f64) -> f64 {
    let r = v.round();
    if (v - r).abs() < EDGE_EPS { r } else { v.ceil() }
}

/// Smallest pixel window covering every pixel that touches `bounds`, clipped to the
/// raster. `None` when nothing of the raster remains after clipping.
pub fn window_for_bounds(
    gt: &[f64; 6],
    raster_size: (usize, usize),
    bounds: &Bounds,
) -> Option<PixelWindow> {
    let c0 = (bounds.min_x - gt[0]) / gt[1];
    let c1 = (bounds.max_x - gt[0]) / gt[1];
    let r0 = (bounds.max_y - gt[3]) / gt[5];
    let r1 = (bounds.min_y - gt[3]) / gt[5];
    if ![c0, c1, r0, r1].iter().all(|v| v.is_finite()) {
        return None;
    }

    let col_start = floor_snapped(c0.min(c1)).max(0.0);
    let col_end = ceil_snapped(c0.max(c1)).min(raster_size.0 as f64);
    let row_start = floor_snapped(r0.min(r1)).max(0.0);
    let row_end = ceil_snapped(r0.max(r1)).min(raster_size.1 as f64);

    if col_end <= col_start || row_end <= row_start {
        return None;
    }
    Some(PixelWindow {
        col_off: col_start as usize,
        row_off: row_start as usize,
        cols: (col_end - col_start) as usize,
        rows: (row_end - row_start) as usize,
    })
}

/// `true` for each window pixel whose centre lies inside (or on the boundary of) `polygon`
pub fn footprint_mask(gt: &[f64; 6], window: &PixelWindow, polygon: &Polygon<f64>) -> Array2<bool> {
    let mut mask = Array2::from_elem((window.rows, window.cols), false);
    Zip::indexed(&mut mask).par_for_each(|(r, c), inside| {
        let px = (window.col_off + c) as f64 + 0.5;
        let py = (window.row_off + r) as f64 + 0.5;
        let centre = Coord {
            x: gt[0] + px * gt[1] + py * gt[2],
            y: gt[3] + px * gt[4] + py * gt[5],
        };
        *inside = polygon.intersects(&centre);
    });
    mask
}
