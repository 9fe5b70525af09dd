use crate::math::Grid;

/// Five-point Laplacian on interior nodes; boundary nodes are left at zero.
pub fn laplacian(field: &Grid, dx: f64, dy: f64) -> Grid {
    let (rows, cols) = field.shape();
    let mut lap = Grid::zeros(rows, cols);
    if rows < 3 || cols < 3 {
        return lap;
    }
    let (cx, cy) = (1.0 / (dx * dx), 1.0 / (dy * dy));
    for i in 1..rows - 1 {
        for j in 1..cols - 1 {
            let c = field.get(i, j);
            let d2x = field.get(i, j - 1) - 2.0 * c + field.get(i, j + 1);
            let d2y = field.get(i - 1, j) - 2.0 * c + field.get(i + 1, j);
            lap.set(i, j, cx * d2x + cy * d2y);
        }
    }
    lap
}

pub struct LaplacianLoss;

impl LaplacianLoss {
    /// mean((∇²output + rhs)²) over interior nodes, i.e. the residual of ∇²u = -rhs.
    pub fn loss(output: &Grid, rhs: &Grid, dx: f64, dy: f64) -> f64 {
        let (rows, cols) = output.shape();
        if rows < 3 || cols < 3 {
            return 0.0;
        }
        let lap = laplacian(output, dx, dy);
        let mut sum = 0.0;
        for i in 1..rows - 1 {
            for j in 1..cols - 1 {
                sum += (lap.get(i, j) + rhs.get(i, j)).powi(2);
            }
        }
        sum / ((rows - 2) * (cols - 2)) as f64
    }
}
