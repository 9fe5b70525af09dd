pub mod operator;
pub mod refine;

pub use operator::{cartesian_matrix, impose_dirichlet, BoundaryKind, BoundaryKinds, BoundaryValues};
pub use refine::Refiner;
