use serde::{Serialize, Deserialize};

use crate::activation::ActivationFunction;
use crate::error::{HeatNnError, Result};
use crate::layers::Conv2d;
use crate::math::{interpolate, Grid, InterpKind};
use crate::network::spec::ArchArgs;

/// Multi-scale convolutional network.
///
/// Branch `k` works at resolution / 2^k. The coarsest branch sees only the
/// downsampled input; every finer branch sees the input at its own
/// resolution concatenated with the upsampled output of the branch below.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MsNet {
    pub input_res: (usize, usize),
    pub activation: ActivationFunction,
    /// One kernel size per branch, finest first
    pub kernel_sizes: Vec<usize>,
    /// Convolutions per branch, finest first
    pub branches: Vec<Vec<Conv2d>>,
}

/// Resolution of branch `scale` for a full-resolution side of `n` nodes.
/// Keeps the corner nodes aligned across scales.
fn scale_len(n: usize, scale: usize) -> usize {
    (n.saturating_sub(1) >> scale) + 1
}

impl MsNet {
    pub fn new(args: &ArchArgs) -> Result<MsNet> {
        let scales = args.scales()?;
        let n_scales = scales.len();

        for (k, channels) in scales.iter().enumerate() {
            if channels.len() < 2 {
                return Err(HeatNnError::Config(format!(
                    "scale_{k} needs at least an input and an output channel count"
                )));
            }
            if channels.contains(&0) {
                return Err(HeatNnError::Config(format!("scale_{k} has a zero channel count")));
            }
        }

        let mut kernel_sizes = Vec::with_capacity(n_scales);
        let mut branches = Vec::with_capacity(n_scales);

        for (k, channels) in scales.iter().enumerate() {
            let expected_in = if k + 1 == n_scales {
                1
            } else {
                1 + scales[k + 1][scales[k + 1].len() - 1]
            };
            if channels[0] != expected_in {
                return Err(HeatNnError::Config(format!(
                    "scale_{k} must take {expected_in} input channels, found {}",
                    channels[0]
                )));
            }

            let ks = args.kernel_sizes.for_scale(k).ok_or_else(|| {
                HeatNnError::Config(format!("no kernel size given for scale_{k}"))
            })?;
            if ks % 2 == 0 {
                return Err(HeatNnError::Config(format!("kernel size {ks} must be odd")));
            }
            kernel_sizes.push(ks);

            branches.push(
                channels
                    .windows(2)
                    .map(|pair| Conv2d::new(pair[0], pair[1], ks))
                    .collect(),
            );
        }

        if scales[0][scales[0].len() - 1] != 1 {
            return Err(HeatNnError::Config(
                "scale_0 must end with a single output channel".into(),
            ));
        }

        Ok(MsNet {
            input_res: args.input_res.dims(),
            activation: args.activation,
            kernel_sizes,
            branches,
        })
    }

    pub fn n_scales(&self) -> usize {
        self.branches.len()
    }

    pub fn depths(&self) -> Vec<usize> {
        self.branches.iter().map(|b| b.len()).collect()
    }

    /// Receptive field in nodes at full resolution. A kernel of size `k` at
    /// scale `s` widens the field by `(k - 1) * 2^s` nodes per convolution.
    pub fn rf_global(&self) -> usize {
        1 + self
            .branches
            .iter()
            .zip(&self.kernel_sizes)
            .enumerate()
            .map(|(scale, (branch, ks))| branch.len() * (ks - 1) * (1 << scale))
            .sum::<usize>()
    }

    /// Square kernels give the same field along both axes.
    pub fn rf_global_x(&self) -> usize {
        self.rf_global()
    }

    pub fn rf_global_y(&self) -> usize {
        self.rf_global()
    }

    pub fn forward(&self, input: &Grid) -> Result<Grid> {
        let (rows, cols) = input.shape();
        let mut coarse: Option<Vec<Grid>> = None;

        for (scale, branch) in self.branches.iter().enumerate().rev() {
            let size = (scale_len(rows, scale), scale_len(cols, scale));

            let mut channels = vec![interpolate(input, size, InterpKind::Bilinear)];
            if let Some(prev) = coarse.take() {
                channels.extend(prev.iter().map(|g| interpolate(g, size, InterpKind::Bilinear)));
            }

            let last = branch.len() - 1;
            for (l, conv) in branch.iter().enumerate() {
                channels = conv.forward(&channels)?;
                if l < last {
                    channels = channels.iter().map(|g| g.map(|x| self.activation.function(x))).collect();
                }
            }
            coarse = Some(channels);
        }

        coarse
            .and_then(|mut out| out.pop())
            .ok_or_else(|| HeatNnError::Config("network has no branches".into()))
    }

    /// Copies weights from `state`, which must have the same layout.
    pub fn load_state(&mut self, state: MsNet) -> Result<()> {
        let layout = |net: &MsNet| -> Vec<Vec<(usize, usize, usize)>> {
            net.branches
                .iter()
                .map(|b| b.iter().map(|c| (c.in_channels, c.out_channels, c.kernel_size)).collect())
                .collect()
        };
        if layout(self) != layout(&state) {
            return Err(HeatNnError::Checkpoint(
                "checkpoint layout does not match the configured architecture".into(),
            ));
        }
        for conv in state.branches.iter().flatten() {
            conv.check()?;
        }
        self.branches = state.branches;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(yaml: &str) -> ArchArgs {
        serde_yaml::from_str(yaml).unwrap()
    }

    fn three_scale() -> ArchArgs {
        args(
            r#"
input_res: 33
kernel_sizes: 3
scales:
  scale_0: [3, 4, 1]
  scale_1: [3, 4, 2]
  scale_2: [1, 4, 4, 2]
"#,
        )
    }

    #[test]
    fn structure_and_receptive_field() {
        let net = MsNet::new(&three_scale()).unwrap();
        assert_eq!(net.n_scales(), 3);
        assert_eq!(net.depths(), vec![2, 2, 3]);
        // 1 + 2*2*1 + 2*2*2 + 3*2*4
        assert_eq!(net.rf_global_x(), 1 + 4 + 8 + 24);
    }

    #[test]
    fn forward_keeps_input_resolution() {
        let net = MsNet::new(&three_scale()).unwrap();
        let input = Grid::from_fn(33, 17, |i, j| ((i + j) as f64 * 0.1).sin());
        let out = net.forward(&input).unwrap();
        assert_eq!(out.shape(), (33, 17));
        assert!(out.data.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn channel_mismatch_is_rejected() {
        let bad = args("input_res: 9\nscales:\n  scale_0: [1, 4, 1]\n  scale_1: [1, 2]\n");
        assert!(MsNet::new(&bad).is_err());
        let even = args("input_res: 9\nkernel_sizes: 4\nscales:\n  scale_0: [1, 1]\n");
        assert!(MsNet::new(&even).is_err());
    }

    #[test]
    fn malformed_scales_are_errors() {
        let empty = args("input_res: 9\nscales:\n  scale_0: [2, 4, 1]\n  scale_1: []\n");
        assert!(MsNet::new(&empty).is_err());
        let zero = args("input_res: 9\nscales:\n  scale_0: [1, 0, 1]\n");
        assert!(MsNet::new(&zero).is_err());
    }

    #[test]
    fn load_state_checks_layout() {
        let mut net = MsNet::new(&three_scale()).unwrap();
        let trained = MsNet::new(&three_scale()).unwrap();
        net.load_state(trained.clone()).unwrap();
        assert_eq!(net.branches, trained.branches);

        let other = MsNet::new(&args("input_res: 33\nscales:\n  scale_0: [1, 1]\n")).unwrap();
        assert!(net.load_state(other).is_err());
    }

    #[test]
    fn scale_lengths_align_corners() {
        assert_eq!(scale_len(101, 1), 51);
        assert_eq!(scale_len(101, 2), 26);
        assert_eq!(scale_len(64, 1), 32);
        assert_eq!(scale_len(1, 3), 1);
    }
}
