//! Declarative YAML configuration: schema, loading and validation.

pub mod load;
pub mod schema;
pub mod validate;

pub use load::{read_yaml, ARCHS_DIR_ENV};
pub use schema::{
    ArchConfig, ArchKind, Coord, DataLoaderConfig, DomainConfig, EvalConfig, LossConfig,
    LrSchedulerConfig, Monitor, NetworkConfig, Normalization, OptimizerConfig, RefineMethod,
    TrainerConfig,
};
pub use validate::{require_training_sections, validate_config, validate_domain, ValidationError};
