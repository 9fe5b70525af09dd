use crate::math::Grid;

pub struct DirichletBoundaryLoss;

impl DirichletBoundaryLoss {
    /// mean(output²) over the boundary ring: walls are held at zero potential.
    pub fn loss(output: &Grid) -> f64 {
        let (rows, cols) = output.shape();
        let mut sum = 0.0;
        let mut count = 0usize;
        for i in 0..rows {
            for j in 0..cols {
                if output.is_boundary(i, j) {
                    sum += output.get(i, j).powi(2);
                    count += 1;
                }
            }
        }
        if count == 0 { 0.0 } else { sum / count as f64 }
    }
}
