use ndarray::{Array2, Zip};

use crate::error::{Error, Result};

// Interior nodata pixels are filled only with at least this many valid neighbours
const MIN_VALID_NEIGHBOURS: usize = 2;

#[inline]
pub(crate) fn is_valid(v: f32, nodata: f32) -> bool {
    !v.is_nan() && v != nodata
}

/// Clamp valid pixels into `[lo, hi]`; returns the number of pixels changed
pub fn constrict_dynamic_range(data: &mut Array2<f32>, nodata: f32, range: (f64, f64)) -> Result<usize> {
    let (lo, hi) = range;
    if lo.is_nan() || hi.is_nan() || lo > hi {
        return Err(Error::invalid("dynamic_range", format!("({}, {})", lo, hi)));
    }
    let (lo, hi) = (lo as f32, hi as f32);
    let mut changed = 0usize;
    data.iter_mut().filter(|v| is_valid(**v, nodata)).for_each(|v| {
        let clamped = v.clamp(lo, hi);
        if clamped != *v {
            *v = clamped;
            changed += 1;
        }
    });
    Ok(changed)
}

#[inline]
fn neighbour_mean(data: &Array2<f32>, nodata: f32, row: usize, col: usize) -> Option<f32> {
    let mut sum = 0.0f64;
    let mut count = 0usize;
    for r in row - 1..=row + 1 {
        for c in col - 1..=col + 1 {
            if (r, c) == (row, col) {
                continue;
            }
            let v = data[(r, c)];
            if is_valid(v, nodata) {
                sum += v as f64;
                count += 1;
            }
        }
    }
    (count >= MIN_VALID_NEIGHBOURS).then(|| (sum / count as f64) as f32)
}

/// Fill interior nodata pixels with the mean of their valid 8-neighbours.
/// Border rows and columns are left untouched and neighbours are always read from `data`.
/// Returns the smoothed array and the number of filled pixels.
pub fn smooth_nodata_pixels(data: &Array2<f32>, nodata: f32) -> (Array2<f32>, usize) {
    let (rows, cols) = data.dim();
    let mut out = data.clone();
    if rows < 3 || cols < 3 {
        return (out, 0);
    }

    Zip::indexed(&mut out).par_for_each(|(r, c), v| {
        if r == 0 || c == 0 || r == rows - 1 || c == cols - 1 || is_valid(*v, nodata) {
            return;
        }
        if let Some(mean) = neighbour_mean(data, nodata, r, c) {
            *v = mean;
        }
    });

    let filled = Zip::from(data)
        .and(&out)
        .fold(0usize, |n, before, after| {
            if !is_valid(*before, nodata) && is_valid(*after, nodata) {
                n + 1
            } else {
                n
            }
        });
    (out, filled)
}
