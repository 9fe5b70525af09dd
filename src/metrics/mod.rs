pub mod functions;
pub mod tracker;

pub use functions::{electric_field, fourier_coefficient, MetricKind};
pub use tracker::MetricTracker;
