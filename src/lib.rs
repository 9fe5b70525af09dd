pub mod activation;
pub mod config;
pub mod data;
pub mod domain;
pub mod error;
pub mod layers;
pub mod linsystem;
pub mod logging;
pub mod loss;
pub mod math;
pub mod metrics;
pub mod network;
pub mod plot;
pub mod report;
pub mod solver;

// Convenience re-exports
pub use activation::ActivationFunction;
pub use config::NetworkConfig;
pub use data::PoissonDataset;
pub use domain::Domain;
pub use error::{HeatNnError, Result};
pub use math::Grid;
pub use metrics::{MetricKind, MetricTracker};
pub use network::{ArchSpec, Checkpoint, Model};
pub use report::EvalRunConfig;
pub use solver::PoissonNetwork;
