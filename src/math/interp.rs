use serde::{Deserialize, Serialize};

use super::grid::Grid;

/// Resampling kernel used when a field must change resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterpKind {
    #[default]
    Bilinear,
    Nearest,
}

/// Source coordinate of destination index `k` with corner alignment.
#[inline]
fn source_coord(k: usize, src_len: usize, dst_len: usize) -> f64 {
    if dst_len <= 1 || src_len <= 1 {
        0.0
    } else {
        k as f64 * (src_len - 1) as f64 / (dst_len - 1) as f64
    }
}

/// Resizes `grid` to `(rows, cols)`.
///
/// Corner nodes of source and destination coincide (`align_corners = true`),
/// which preserves boundary values of a potential exactly.
pub fn interpolate(grid: &Grid, size: (usize, usize), kind: InterpKind) -> Grid {
    let (rows, cols) = size;
    if grid.shape() == size {
        return grid.clone();
    }

    match kind {
        InterpKind::Nearest => Grid::from_fn(rows, cols, |i, j| {
            let si = source_coord(i, grid.rows, rows).round() as usize;
            let sj = source_coord(j, grid.cols, cols).round() as usize;
            grid.get(si.min(grid.rows - 1), sj.min(grid.cols - 1))
        }),
        InterpKind::Bilinear => Grid::from_fn(rows, cols, |i, j| {
            let y = source_coord(i, grid.rows, rows);
            let x = source_coord(j, grid.cols, cols);
            let i0 = (y.floor() as usize).min(grid.rows - 1);
            let j0 = (x.floor() as usize).min(grid.cols - 1);
            let i1 = (i0 + 1).min(grid.rows - 1);
            let j1 = (j0 + 1).min(grid.cols - 1);
            let wy = y - i0 as f64;
            let wx = x - j0 as f64;
            let top = grid.get(i0, j0) * (1.0 - wx) + grid.get(i0, j1) * wx;
            let bottom = grid.get(i1, j0) * (1.0 - wx) + grid.get(i1, j1) * wx;
            top * (1.0 - wy) + bottom * wy
        }),
    }
}
