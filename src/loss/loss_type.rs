use serde::{Serialize, Deserialize};
use std::fmt;

/// One term of the composed physics-informed loss.
///
/// - `Inside`            : MSE against the target potential on interior nodes
/// - `DirichletBoundary` : MSE of the predicted potential on the walls (target 0)
/// - `Laplacian`         : MSE of the discrete Poisson residual on interior nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LossTerm {
    #[serde(rename = "InsideLoss")]
    Inside,
    #[serde(rename = "DirichletBoundaryLoss")]
    DirichletBoundary,
    #[serde(rename = "LaplacianLoss")]
    Laplacian,
}

impl fmt::Display for LossTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LossTerm::Inside => "InsideLoss",
            LossTerm::DirichletBoundary => "DirichletBoundaryLoss",
            LossTerm::Laplacian => "LaplacianLoss",
        };
        write!(f, "{name}")
    }
}
