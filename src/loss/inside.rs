use crate::math::Grid;

pub struct InsideLoss;

impl InsideLoss {
    /// mean((output - target)²) over interior nodes
    pub fn loss(output: &Grid, target: &Grid) -> f64 {
        let (rows, cols) = output.shape();
        if rows < 3 || cols < 3 {
            return 0.0;
        }
        let mut sum = 0.0;
        for i in 1..rows - 1 {
            for j in 1..cols - 1 {
                sum += (output.get(i, j) - target.get(i, j)).powi(2);
            }
        }
        sum / ((rows - 2) * (cols - 2)) as f64
    }
}
