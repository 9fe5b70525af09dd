pub mod boundary;
pub mod composed;
pub mod inside;
pub mod laplacian;
pub mod loss_type;

pub use boundary::DirichletBoundaryLoss;
pub use composed::{ComposedLoss, LossBreakdown};
pub use inside::InsideLoss;
pub use laplacian::{laplacian, LaplacianLoss};
pub use loss_type::LossTerm;
