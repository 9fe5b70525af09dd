use std::path::Path;

use tracing::info;

use crate::config::Normalization;
use crate::data::npy::{read_npy, NpyArray};
use crate::error::{HeatNnError, Result};
use crate::math::Grid;

pub const RHS_FILE: &str = "physical_rhs.npy";
pub const POTENTIAL_FILE: &str = "potential.npy";

/// Pairs of right-hand sides and reference potentials stored as
/// `physical_rhs.npy` / `potential.npy`, each of shape `(N, nny, nnx)`.
#[derive(Debug, Clone)]
pub struct PoissonDataset {
    pub rhs: Vec<Grid>,
    pub potential: Vec<Grid>,
    pub batch_size: usize,
    pub normalize: Normalization,
    /// Analytical potential/rhs ratio of the training domain
    pub ratio: f64,
    pub scaling_factor: f64,
}

/// One batch as fed to the network.
#[derive(Debug, Clone)]
pub struct Batch {
    /// Normalised network inputs
    pub data: Vec<Grid>,
    /// Reference potentials times the scaling factor
    pub target: Vec<Grid>,
    /// Unscaled right-hand sides
    pub rhs: Vec<Grid>,
}

fn split_samples(arr: NpyArray, name: &str) -> Result<Vec<Grid>> {
    let (n, rows, cols) = match arr.shape.as_slice() {
        [rows, cols] => (1, *rows, *cols),
        [n, rows, cols] => (*n, *rows, *cols),
        other => {
            return Err(HeatNnError::Dataset(format!(
                "{name} must be 2-D or 3-D, found shape {other:?}"
            )))
        }
    };
    let per_sample = rows * cols;
    (0..n)
        .map(|s| Grid::from_vec(rows, cols, arr.data[s * per_sample..(s + 1) * per_sample].to_vec()))
        .collect()
}

impl PoissonDataset {
    pub fn load<P: AsRef<Path>>(
        data_dir: P,
        batch_size: usize,
        normalize: Normalization,
        ratio: f64,
        scaling_factor: f64,
    ) -> Result<PoissonDataset> {
        let dir = data_dir.as_ref();
        let rhs = split_samples(read_npy(dir.join(RHS_FILE))?, RHS_FILE)?;
        let potential = split_samples(read_npy(dir.join(POTENTIAL_FILE))?, POTENTIAL_FILE)?;
        let dataset = PoissonDataset::from_samples(rhs, potential, batch_size, normalize, ratio, scaling_factor)?;
        info!(dir = %dir.display(), samples = dataset.len(), "dataset loaded");
        Ok(dataset)
    }

    pub fn from_samples(
        rhs: Vec<Grid>,
        potential: Vec<Grid>,
        batch_size: usize,
        normalize: Normalization,
        ratio: f64,
        scaling_factor: f64,
    ) -> Result<PoissonDataset> {
        if rhs.len() != potential.len() {
            return Err(HeatNnError::Dataset(format!(
                "{} right-hand sides but {} potentials",
                rhs.len(),
                potential.len()
            )));
        }
        if let (Some(r), Some(p)) = (rhs.first(), potential.first()) {
            if r.shape() != p.shape() {
                return Err(HeatNnError::Shape { expected: r.shape(), got: p.shape() });
            }
        }
        if batch_size == 0 {
            return Err(HeatNnError::Dataset("batch_size must be at least 1".into()));
        }
        Ok(PoissonDataset { rhs, potential, batch_size, normalize, ratio, scaling_factor })
    }

    pub fn len(&self) -> usize {
        self.rhs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rhs.is_empty()
    }

    /// `(rows, cols)` of the samples, if any.
    pub fn sample_shape(&self) -> Option<(usize, usize)> {
        self.rhs.first().map(|g| g.shape())
    }

    /// Network input for one rhs.
    pub fn normalise_input(&self, rhs: &Grid) -> Grid {
        match self.normalize {
            Normalization::Analytical => rhs.scale(self.ratio * self.scaling_factor),
            Normalization::None => rhs.scale(self.scaling_factor),
        }
    }

    /// Batches in storage order; the last one may be short.
    pub fn batches(&self) -> impl Iterator<Item = Batch> + '_ {
        (0..self.len()).step_by(self.batch_size).map(move |start| {
            let end = (start + self.batch_size).min(self.len());
            Batch {
                data: self.rhs[start..end].iter().map(|r| self.normalise_input(r)).collect(),
                target: self.potential[start..end].iter().map(|p| p.scale(self.scaling_factor)).collect(),
                rhs: self.rhs[start..end].to_vec(),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::npy::write_npy;

    #[test]
    fn loads_and_batches_with_scaling() {
        let dir = tempfile::tempdir().unwrap();
        let rhs: Vec<f64> = (0..5 * 4).map(|v| v as f64).collect();
        let pot: Vec<f64> = vec![1.0; 5 * 4];
        write_npy(dir.path().join(RHS_FILE), &[5, 2, 2], &rhs).unwrap();
        write_npy(dir.path().join(POTENTIAL_FILE), &[5, 2, 2], &pot).unwrap();

        let ds = PoissonDataset::load(dir.path(), 2, Normalization::Analytical, 0.5, 10.0).unwrap();
        assert_eq!(ds.len(), 5);
        assert_eq!(ds.sample_shape(), Some((2, 2)));

        let batches: Vec<Batch> = ds.batches().collect();
        assert_eq!(batches.len(), 3);
        assert_eq!(batches[2].data.len(), 1);
        assert_eq!(batches[0].data[1].data, vec![20.0, 25.0, 30.0, 35.0]);
        assert_eq!(batches[0].target[0].data, vec![10.0; 4]);
        assert_eq!(batches[0].rhs[1].data, vec![4.0, 5.0, 6.0, 7.0]);
    }

    #[test]
    fn mismatched_counts_are_rejected() {
        let g = Grid::zeros(3, 3);
        assert!(PoissonDataset::from_samples(
            vec![g.clone(), g.clone()],
            vec![g],
            1,
            Normalization::None,
            1.0,
            1.0
        )
        .is_err());
    }

    #[test]
    fn four_dimensional_arrays_are_rejected() {
        let arr = NpyArray { shape: vec![1, 1, 2, 2], data: vec![0.0; 4] };
        assert!(split_samples(arr, "x").is_err());
    }
}
