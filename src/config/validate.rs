//! Configuration validation

use super::schema::{Coord, DomainConfig, NetworkConfig};
use crate::loss::LossTerm;

/// Validation error type
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("Missing section: {0}")]
    MissingSection(&'static str),

    #[error("Invalid resolution {nnx}x{nny} (each direction needs at least 3 nodes)")]
    InvalidResolution { nnx: usize, nny: usize },

    #[error("Invalid {axis} extent: [{min}, {max}] (max must be > min)")]
    InvalidExtent { axis: &'static str, min: f64, max: f64 },

    #[error("Invalid batch size: {0} (must be > 0)")]
    InvalidBatchSize(usize),

    #[error("Invalid validation split: {0} (must be in [0, 1))")]
    InvalidValidationSplit(f64),

    #[error("Invalid alpha: {0} (must be > 0.0)")]
    InvalidAlpha(f64),

    #[error("Invalid scaling factor: {0} (must be > 0.0)")]
    InvalidScalingFactor(f64),

    #[error("Invalid learning rate: {0} (must be > 0.0)")]
    InvalidLearningRate(f64),

    #[error("Invalid weight decay: {0} (must be >= 0.0)")]
    InvalidWeightDecay(f64),

    #[error("Empty loss list")]
    EmptyLossList,

    #[error("Missing weight for loss term {0}")]
    MissingLossWeight(LossTerm),

    #[error("Invalid weight {weight} for loss term {term} (must be >= 0.0)")]
    InvalidLossWeight { term: LossTerm, weight: f64 },

    #[error("Invalid epochs: {0} (must be > 0)")]
    InvalidEpochs(usize),

    #[error("Invalid save period: {0} (must be > 0)")]
    InvalidSavePeriod(usize),

    #[error("iterative_refine is set but refine_its is missing")]
    MissingRefineIts,

    #[error("Iterative refinement requires cartesian coordinates")]
    RefineNeedsCartesian,

    #[error("Architecture needs either db_file + name or an inline type")]
    IncompleteArch,

    #[error("Inline architecture declares no scales")]
    EmptyScales,
}

/// Validate a network configuration
///
/// Checks numeric ranges and cross-field requirements of every section that
/// is present. Sections that only the training run needs are optional here;
/// see [`require_training_sections`].
pub fn validate_config(cfg: &NetworkConfig) -> Result<(), ValidationError> {
    validate_domain(&cfg.globals)?;

    if let Some(eval) = &cfg.eval {
        validate_domain(&eval.domain)?;
        if eval.iterative_refine.is_some() {
            if eval.refine_its.is_none() {
                return Err(ValidationError::MissingRefineIts);
            }
            if eval.domain.coord != Coord::Cart {
                return Err(ValidationError::RefineNeedsCartesian);
            }
        }
    }

    let arch = &cfg.arch;
    let from_db = arch.db_file.is_some() && arch.name.is_some();
    if !from_db {
        if arch.kind.is_none() {
            return Err(ValidationError::IncompleteArch);
        }
        let has_scales = arch
            .args
            .get("scales")
            .and_then(|v| v.as_mapping())
            .is_some_and(|m| !m.is_empty());
        if !has_scales {
            return Err(ValidationError::EmptyScales);
        }
    }

    let dl = &cfg.data_loader.args;
    if dl.batch_size == 0 {
        return Err(ValidationError::InvalidBatchSize(dl.batch_size));
    }
    if !(0.0..1.0).contains(&dl.validation_split) {
        return Err(ValidationError::InvalidValidationSplit(dl.validation_split));
    }
    if dl.alpha <= 0.0 {
        return Err(ValidationError::InvalidAlpha(dl.alpha));
    }
    if dl.scaling_factor <= 0.0 {
        return Err(ValidationError::InvalidScalingFactor(dl.scaling_factor));
    }

    if let Some(optimizer) = &cfg.optimizer {
        if optimizer.args.lr <= 0.0 {
            return Err(ValidationError::InvalidLearningRate(optimizer.args.lr));
        }
        if optimizer.args.weight_decay < 0.0 {
            return Err(ValidationError::InvalidWeightDecay(optimizer.args.weight_decay));
        }
    }

    if let Some(loss) = &cfg.loss {
        if loss.args.loss_list.is_empty() {
            return Err(ValidationError::EmptyLossList);
        }
        for &term in &loss.args.loss_list {
            match loss.args.weight(term) {
                None => return Err(ValidationError::MissingLossWeight(term)),
                Some(weight) if weight < 0.0 => {
                    return Err(ValidationError::InvalidLossWeight { term, weight })
                }
                Some(_) => {}
            }
        }
    }

    if let Some(trainer) = &cfg.trainer {
        if trainer.epochs == 0 {
            return Err(ValidationError::InvalidEpochs(trainer.epochs));
        }
        if trainer.save_period == 0 {
            return Err(ValidationError::InvalidSavePeriod(trainer.save_period));
        }
    }

    Ok(())
}

/// A training configuration must carry all seven documented sections.
pub fn require_training_sections(cfg: &NetworkConfig) -> Result<(), ValidationError> {
    if cfg.optimizer.is_none() {
        return Err(ValidationError::MissingSection("optimizer"));
    }
    if cfg.loss.is_none() {
        return Err(ValidationError::MissingSection("loss"));
    }
    if cfg.lr_scheduler.is_none() {
        return Err(ValidationError::MissingSection("lr_scheduler"));
    }
    if cfg.trainer.is_none() {
        return Err(ValidationError::MissingSection("trainer"));
    }
    Ok(())
}

pub fn validate_domain(domain: &DomainConfig) -> Result<(), ValidationError> {
    if domain.nnx < 3 || domain.nny < 3 {
        return Err(ValidationError::InvalidResolution {
            nnx: domain.nnx,
            nny: domain.nny,
        });
    }
    if domain.xmax <= domain.xmin {
        return Err(ValidationError::InvalidExtent {
            axis: "x",
            min: domain.xmin,
            max: domain.xmax,
        });
    }
    if domain.ymax <= domain.ymin {
        return Err(ValidationError::InvalidExtent {
            axis: "y",
            min: domain.ymin,
            max: domain.ymax,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::{EvalConfig, RefineMethod};

    fn base_config() -> NetworkConfig {
        let yaml = r#"
globals:
  nnx: 65
  nny: 65
  xmin: 0.0
  xmax: 1.0
  ymin: 0.0
  ymax: 1.0
arch:
  type: MSNet
  args:
    input_res: 65
    scales:
      scale_0: [1, 8, 1]
data_loader:
  type: PoissonDataLoader
  args:
    batch_size: 4
    alpha: 0.1
    scaling_factor: 1.0e+6
optimizer:
  type: Adam
  args:
    lr: 4.0e-4
loss:
  type: ComposedLoss
  args:
    loss_list: [InsideLoss, DirichletBoundaryLoss]
    inside_weight: 1.0
    bound_weight: 1.0
lr_scheduler:
  type: ReduceLROnPlateau
  args:
    mode: min
trainer:
  epochs: 10
  save_dir: saved/
  save_period: 5
  monitor: min val_loss
"#;
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn base_config_is_valid() {
        let cfg = base_config();
        validate_config(&cfg).unwrap();
        require_training_sections(&cfg).unwrap();
    }

    #[test]
    fn test_invalid_resolution() {
        let mut cfg = base_config();
        cfg.globals.nnx = 2;
        assert!(matches!(
            validate_config(&cfg),
            Err(ValidationError::InvalidResolution { nnx: 2, .. })
        ));
    }

    #[test]
    fn test_inverted_extent() {
        let mut cfg = base_config();
        cfg.globals.ymax = -1.0;
        assert!(matches!(
            validate_config(&cfg),
            Err(ValidationError::InvalidExtent { axis: "y", .. })
        ));
    }

    #[test]
    fn test_zero_batch_size() {
        let mut cfg = base_config();
        cfg.data_loader.args.batch_size = 0;
        assert!(matches!(
            validate_config(&cfg),
            Err(ValidationError::InvalidBatchSize(0))
        ));
    }

    #[test]
    fn test_missing_loss_weight() {
        let mut cfg = base_config();
        if let Some(loss) = cfg.loss.as_mut() {
            loss.args.loss_list.push(LossTerm::Laplacian);
        }
        assert!(matches!(
            validate_config(&cfg),
            Err(ValidationError::MissingLossWeight(LossTerm::Laplacian))
        ));
    }

    #[test]
    fn test_negative_lr() {
        let mut cfg = base_config();
        if let Some(opt) = cfg.optimizer.as_mut() {
            opt.args.lr = -1.0;
        }
        assert!(matches!(
            validate_config(&cfg),
            Err(ValidationError::InvalidLearningRate(_))
        ));
    }

    #[test]
    fn test_refine_requires_iterations() {
        let mut cfg = base_config();
        cfg.eval = Some(EvalConfig {
            domain: cfg.globals.clone(),
            iterative_refine: Some(RefineMethod::Jacobi),
            refine_its: None,
        });
        assert!(matches!(
            validate_config(&cfg),
            Err(ValidationError::MissingRefineIts)
        ));
    }

    #[test]
    fn test_refine_rejects_cylindrical() {
        let mut cfg = base_config();
        let mut domain = cfg.globals.clone();
        domain.coord = Coord::Cyl;
        cfg.eval = Some(EvalConfig {
            domain,
            iterative_refine: Some(RefineMethod::Jacobi),
            refine_its: Some(2),
        });
        assert!(matches!(
            validate_config(&cfg),
            Err(ValidationError::RefineNeedsCartesian)
        ));
    }

    #[test]
    fn test_missing_training_section() {
        let mut cfg = base_config();
        cfg.trainer = None;
        validate_config(&cfg).unwrap();
        assert!(matches!(
            require_training_sections(&cfg),
            Err(ValidationError::MissingSection("trainer"))
        ));
    }

    #[test]
    fn test_inline_arch_without_scales() {
        let mut cfg = base_config();
        cfg.arch.args = serde_yaml::from_str("input_res: 65\nscales: {}").unwrap();
        assert!(matches!(validate_config(&cfg), Err(ValidationError::EmptyScales)));

        cfg.arch.args = serde_yaml::from_str("input_res: 65").unwrap();
        assert!(matches!(validate_config(&cfg), Err(ValidationError::EmptyScales)));
    }
}
