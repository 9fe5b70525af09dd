use serde::{Serialize, Deserialize};
use std::collections::BTreeMap;

use crate::activation::ActivationFunction;
use crate::config::ArchKind;
use crate::error::{HeatNnError, Result};
use crate::network::model::Model;

/// Network input resolution, either `n` (square) or `[rows, cols]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InputRes {
    Square(usize),
    Rect([usize; 2]),
}

impl InputRes {
    /// `(rows, cols)`
    pub fn dims(&self) -> (usize, usize) {
        match *self {
            InputRes::Square(n) => (n, n),
            InputRes::Rect([rows, cols]) => (rows, cols),
        }
    }
}

/// Kernel size shared by all scales, or one per scale (finest first).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum KernelSizes {
    Uniform(usize),
    PerScale(Vec<usize>),
}

impl Default for KernelSizes {
    fn default() -> Self {
        KernelSizes::Uniform(3)
    }
}

impl KernelSizes {
    pub fn for_scale(&self, scale: usize) -> Option<usize> {
        match self {
            KernelSizes::Uniform(k) => Some(*k),
            KernelSizes::PerScale(ks) => ks.get(scale).copied(),
        }
    }
}

/// Architecture arguments.
///
/// `scales` maps `scale_<k>` to the channel list of branch `k`, where branch
/// 0 runs at full resolution and branch `k` at resolution / 2^k. A list
/// `[c_in, c_1, ..., c_out]` describes `len - 1` convolutions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchArgs {
    pub input_res: InputRes,

    #[serde(default)]
    pub scales: BTreeMap<String, Vec<usize>>,

    #[serde(default)]
    pub kernel_sizes: KernelSizes,

    #[serde(default)]
    pub activation: ActivationFunction,
}

impl ArchArgs {
    /// Channel lists ordered by scale index, finest first.
    pub fn scales(&self) -> Result<Vec<Vec<usize>>> {
        let mut indexed = Vec::with_capacity(self.scales.len());
        for (key, channels) in &self.scales {
            let idx = key
                .strip_prefix("scale_")
                .and_then(|s| s.parse::<usize>().ok())
                .ok_or_else(|| HeatNnError::Config(format!("invalid scale key '{key}'")))?;
            indexed.push((idx, channels.clone()));
        }
        indexed.sort_by_key(|(idx, _)| *idx);

        if indexed.is_empty() {
            return Err(HeatNnError::Config("architecture has no scales".into()));
        }
        for (expected, (idx, _)) in indexed.iter().enumerate() {
            if *idx != expected {
                return Err(HeatNnError::Config(format!(
                    "scale keys must be scale_0..scale_{}, missing scale_{expected}",
                    indexed.len() - 1
                )));
            }
        }
        Ok(indexed.into_iter().map(|(_, channels)| channels).collect())
    }
}

/// A fully resolved architecture: which family plus its arguments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchSpec {
    #[serde(rename = "type")]
    pub kind: ArchKind,
    pub args: ArchArgs,
}

impl ArchSpec {
    pub fn from_mapping(kind: ArchKind, args: serde_yaml::Mapping) -> Result<ArchSpec> {
        let args: ArchArgs = serde_yaml::from_value(serde_yaml::Value::Mapping(args))
            .map_err(|e| HeatNnError::Config(format!("invalid {kind} args: {e}")))?;
        Ok(ArchSpec { kind, args })
    }

    /// Instantiates the architecture with freshly initialised weights.
    pub fn build(&self) -> Result<Model> {
        Model::new(self)
    }
}
