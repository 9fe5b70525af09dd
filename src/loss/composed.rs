use serde::Serialize;

use crate::config::LossConfig;
use crate::domain::Domain;
use crate::error::{HeatNnError, Result};
use crate::loss::boundary::DirichletBoundaryLoss;
use crate::loss::inside::InsideLoss;
use crate::loss::laplacian::LaplacianLoss;
use crate::loss::loss_type::LossTerm;
use crate::math::Grid;

/// Weighted sum of loss terms, as declared by the `loss` section.
#[derive(Debug, Clone, PartialEq)]
pub struct ComposedLoss {
    pub terms: Vec<(LossTerm, f64)>,
}

/// Value of every weighted term and of their sum.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LossBreakdown {
    pub terms: Vec<(LossTerm, f64)>,
    pub total: f64,
}

impl ComposedLoss {
    pub fn from_config(cfg: &LossConfig) -> Result<ComposedLoss> {
        let listed: Vec<LossTerm> = if cfg.pure_lapl {
            vec![LossTerm::Laplacian]
        } else {
            cfg.args.loss_list.clone()
        };

        let terms = listed
            .into_iter()
            .map(|term| {
                cfg.args
                    .weight(term)
                    .map(|w| (term, w))
                    .ok_or_else(|| HeatNnError::Config(format!("no weight given for {term}")))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(ComposedLoss { terms })
    }

    /// Evaluates the loss of one predicted potential.
    pub fn evaluate(&self, output: &Grid, target: &Grid, rhs: &Grid, domain: &Domain) -> LossBreakdown {
        let terms: Vec<(LossTerm, f64)> = self
            .terms
            .iter()
            .map(|&(term, weight)| {
                let value = match term {
                    LossTerm::Inside => InsideLoss::loss(output, target),
                    LossTerm::DirichletBoundary => DirichletBoundaryLoss::loss(output),
                    LossTerm::Laplacian => LaplacianLoss::loss(output, rhs, domain.dx, domain.dy),
                };
                (term, weight * value)
            })
            .collect();
        let total = terms.iter().map(|(_, v)| v).sum();
        LossBreakdown { terms, total }
    }
}
