//! YAML schema of the training / evaluation configuration.
//!
//! Sections that follow the "instantiate `type` with `args`" convention are
//! modelled as a `kind` enum plus a typed `args` struct, so an unknown
//! component name is rejected at parse time instead of at lookup time.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::loss::LossTerm;
use crate::math::InterpKind;
use crate::metrics::MetricKind;

/// Complete configuration of one network case.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Run name, used by the trainer as sub-directory of `save_dir`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Number of GPUs requested by the training run (inference here is CPU only)
    #[serde(default)]
    pub n_gpu: usize,

    /// Domain the network was trained on
    pub globals: DomainConfig,

    /// Architecture selection
    pub arch: ArchConfig,

    /// Dataset options
    pub data_loader: DataLoaderConfig,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub optimizer: Option<OptimizerConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loss: Option<LossConfig>,

    /// Metrics tracked during evaluation, in order
    #[serde(default)]
    pub metrics: Vec<MetricKind>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lr_scheduler: Option<LrSchedulerConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trainer: Option<TrainerConfig>,

    /// Evaluation domain; overrides `globals` when present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eval: Option<EvalConfig>,

    /// Checkpoint to load weights from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resume: Option<PathBuf>,

    /// Resampling kernel when the rhs does not match the network resolution
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interp_kind: Option<InterpKind>,

    /// Training resolution of an in-memory model
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub train_nnx: Option<usize>,

    /// Output directory of an evaluation run
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub casename: Option<String>,
}

impl NetworkConfig {
    /// The domain the solver works on: `eval` when given, `globals` otherwise.
    pub fn domain(&self) -> &DomainConfig {
        match &self.eval {
            Some(eval) => &eval.domain,
            None => &self.globals,
        }
    }

    pub fn alpha(&self) -> f64 {
        self.data_loader.args.alpha
    }

    pub fn scaling_factor(&self) -> f64 {
        self.data_loader.args.scaling_factor
    }

    pub fn interp_kind(&self) -> InterpKind {
        self.interp_kind.unwrap_or_default()
    }
}

/// Coordinate system of the domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Coord {
    #[default]
    Cart,
    Cyl,
}

/// Grid resolution and extents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainConfig {
    pub nnx: usize,
    pub nny: usize,
    pub xmin: f64,
    pub xmax: f64,
    pub ymin: f64,
    pub ymax: f64,

    #[serde(default)]
    pub coord: Coord,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verbosity: Option<u8>,

    /// Log per-stage timings of every solve
    #[serde(default)]
    pub benchmark: bool,
}

/// Stationary iteration used to polish the network prediction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefineMethod {
    Jacobi,
    GaussSeidel,
}

impl fmt::Display for RefineMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RefineMethod::Jacobi => write!(f, "jacobi"),
            RefineMethod::GaussSeidel => write!(f, "gauss_seidel"),
        }
    }
}

/// Evaluation domain plus optional iterative refinement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvalConfig {
    #[serde(flatten)]
    pub domain: DomainConfig,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iterative_refine: Option<RefineMethod>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refine_its: Option<usize>,
}

/// Known architecture families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArchKind {
    #[serde(rename = "MSNet")]
    MsNet,
}

impl fmt::Display for ArchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArchKind::MsNet => write!(f, "MSNet"),
        }
    }
}

/// Architecture selection: either a named entry of an architecture database
/// (`db_file` + `name`) or an inline `type` + `args`.
///
/// `args` stays untyped here because database and config args are merged
/// key by key before being interpreted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ArchConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub db_file: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<ArchKind>,

    #[serde(default)]
    pub args: serde_yaml::Mapping,
}

/// One entry of an architecture database file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchEntry {
    #[serde(rename = "type")]
    pub kind: ArchKind,

    #[serde(default)]
    pub args: serde_yaml::Mapping,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataLoaderKind {
    PoissonDataLoader,
}

/// How network inputs are scaled before inference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Normalization {
    /// Multiply the rhs by the analytical potential/rhs ratio
    #[default]
    Analytical,
    None,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataLoaderConfig {
    #[serde(rename = "type")]
    pub kind: DataLoaderKind,
    pub args: DataLoaderArgs,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataLoaderArgs {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,

    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    #[serde(default)]
    pub shuffle: bool,

    #[serde(default)]
    pub validation_split: f64,

    #[serde(default)]
    pub num_workers: usize,

    #[serde(default)]
    pub normalize: Normalization,

    /// Permittivity-like constant of the analytical normalisation
    pub alpha: f64,

    #[serde(default = "default_scaling_factor")]
    pub scaling_factor: f64,
}

fn default_batch_size() -> usize {
    64
}

fn default_scaling_factor() -> f64 {
    1.0
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OptimizerKind {
    Adam,
    AdamW,
    #[serde(rename = "SGD")]
    Sgd,
    #[serde(rename = "RMSprop")]
    RmsProp,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizerConfig {
    #[serde(rename = "type")]
    pub kind: OptimizerKind,
    pub args: OptimizerArgs,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizerArgs {
    pub lr: f64,

    #[serde(default)]
    pub weight_decay: f64,

    #[serde(default)]
    pub amsgrad: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub momentum: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LossKind {
    ComposedLoss,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LossConfig {
    #[serde(rename = "type")]
    pub kind: LossKind,

    /// Keep only the Laplacian term regardless of `loss_list`
    #[serde(default)]
    pub pure_lapl: bool,

    pub args: LossArgs,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LossArgs {
    pub loss_list: Vec<LossTerm>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inside_weight: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bound_weight: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lapl_weight: Option<f64>,
}

impl LossArgs {
    /// Weight attached to a term, looked up by its `*_weight` key.
    pub fn weight(&self, term: LossTerm) -> Option<f64> {
        match term {
            LossTerm::Inside => self.inside_weight,
            LossTerm::DirichletBoundary => self.bound_weight,
            LossTerm::Laplacian => self.lapl_weight,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LrSchedulerKind {
    #[serde(rename = "ReduceLROnPlateau")]
    ReduceLrOnPlateau,
    #[serde(rename = "StepLR")]
    StepLr,
    #[serde(rename = "ExponentialLR")]
    ExponentialLr,
    #[serde(rename = "CosineAnnealingLR")]
    CosineAnnealingLr,
}

/// Learning-rate schedule policy; options are passed through untouched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LrSchedulerConfig {
    #[serde(rename = "type")]
    pub kind: LrSchedulerKind,

    #[serde(default)]
    pub args: serde_yaml::Mapping,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainerConfig {
    pub epochs: usize,
    pub save_dir: PathBuf,
    pub save_period: usize,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plot_period: Option<usize>,

    #[serde(default)]
    pub monitor: Monitor,

    /// Epochs without improvement before stopping
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub early_stop: Option<usize>,

    #[serde(default)]
    pub tensorboard: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verbosity: Option<u8>,
}

/// Model-selection criterion, written `off`, `min <metric>` or `max <metric>`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Monitor {
    #[default]
    Off,
    Min(String),
    Max(String),
}

impl FromStr for Monitor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split_whitespace();
        match (parts.next(), parts.next(), parts.next()) {
            (Some("off"), None, None) => Ok(Monitor::Off),
            (Some("min"), Some(metric), None) => Ok(Monitor::Min(metric.to_string())),
            (Some("max"), Some(metric), None) => Ok(Monitor::Max(metric.to_string())),
            _ => Err(format!(
                "invalid monitor '{s}' (expected 'off', 'min <metric>' or 'max <metric>')"
            )),
        }
    }
}

impl TryFrom<String> for Monitor {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Monitor> for String {
    fn from(value: Monitor) -> Self {
        value.to_string()
    }
}

impl fmt::Display for Monitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Monitor::Off => write!(f, "off"),
            Monitor::Min(metric) => write!(f, "min {metric}"),
            Monitor::Max(metric) => write!(f, "max {metric}"),
        }
    }
}
