pub mod dataset;
pub mod npy;

pub use dataset::{Batch, PoissonDataset, POTENTIAL_FILE, RHS_FILE};
pub use npy::{parse_npy, read_npy, write_npy, NpyArray};
