use serde::{Serialize, Deserialize};
use std::f64::consts::{E, PI};

/// Negative-side slope of `LeakyRelu`.
// Kept fixed so the variant stays a plain YAML string (`leaky_relu`).
const LEAKY_SLOPE: f64 = 0.01;

/// Element-wise nonlinearity applied between convolutions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivationFunction {
    #[default]
    Relu,
    LeakyRelu,
    Tanh,
    Sigmoid,
    Gelu,
    Identity,
}

impl ActivationFunction {
    pub fn function(&self, x: f64) -> f64 {
        match self {
            ActivationFunction::Relu => if x > 0.0 { x } else { 0.0 },
            ActivationFunction::LeakyRelu => if x > 0.0 { x } else { LEAKY_SLOPE * x },
            ActivationFunction::Tanh => x.tanh(),
            ActivationFunction::Sigmoid => 1.0 / (1.0 + E.powf(-x)),
            ActivationFunction::Gelu => {
                let c = (2.0_f64 / PI).sqrt();
                0.5 * x * (1.0 + (c * (x + 0.044715 * x.powi(3))).tanh())
            }
            ActivationFunction::Identity => x,
        }
    }
}
