pub mod grid;
pub mod interp;
pub mod sparse;

pub use grid::Grid;
pub use interp::{interpolate, InterpKind};
pub use sparse::SparseMatrix;
