use serde::{Serialize, Deserialize};

use crate::error::{HeatNnError, Result};
use crate::math::Grid;

/// 2-D convolution with zero "same" padding and unit stride.
///
/// `weights[o * in_channels + c]` is the `k x k` kernel mapping input channel
/// `c` to output channel `o`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conv2d {
    pub in_channels: usize,
    pub out_channels: usize,
    pub kernel_size: usize,
    pub weights: Vec<Grid>,
    pub biases: Vec<f64>,
}

impl Conv2d {
    /// He-initialised weights, zero biases. `kernel_size` must be odd.
    pub fn new(in_channels: usize, out_channels: usize, kernel_size: usize) -> Conv2d {
        let fan_in = in_channels * kernel_size * kernel_size;
        let weights = (0..in_channels * out_channels)
            .map(|_| Grid::he(kernel_size, kernel_size, fan_in))
            .collect();
        Conv2d {
            in_channels,
            out_channels,
            kernel_size,
            weights,
            biases: vec![0.0; out_channels],
        }
    }

    pub fn kernel(&self, out_c: usize, in_c: usize) -> &Grid {
        &self.weights[out_c * self.in_channels + in_c]
    }

    /// Checks that stored parameters agree with the declared dimensions.
    pub fn check(&self) -> Result<()> {
        let k = self.kernel_size;
        let consistent = k % 2 == 1
            && self.weights.len() == self.in_channels * self.out_channels
            && self.biases.len() == self.out_channels
            && self.weights.iter().all(|w| w.shape() == (k, k));
        if consistent {
            Ok(())
        } else {
            Err(HeatNnError::Checkpoint(format!(
                "inconsistent conv layer {}->{} (k={})",
                self.in_channels, self.out_channels, k
            )))
        }
    }

    pub fn forward(&self, input: &[Grid]) -> Result<Vec<Grid>> {
        if input.len() != self.in_channels {
            return Err(HeatNnError::Config(format!(
                "conv layer expects {} channels, got {}",
                self.in_channels,
                input.len()
            )));
        }
        let (rows, cols) = input
            .first()
            .map(|g| g.shape())
            .ok_or_else(|| HeatNnError::Config("conv layer needs at least one input channel".into()))?;
        if let Some(bad) = input.iter().find(|g| g.shape() != (rows, cols)) {
            return Err(HeatNnError::Shape { expected: (rows, cols), got: bad.shape() });
        }

        let k = self.kernel_size;
        let pad = (k / 2) as isize;

        let output = (0..self.out_channels)
            .map(|o| {
                let mut acc = Grid::filled(rows, cols, self.biases[o]);
                for (c, channel) in input.iter().enumerate() {
                    let kernel = self.kernel(o, c);
                    for ki in 0..k {
                        let di = ki as isize - pad;
                        for kj in 0..k {
                            let dj = kj as isize - pad;
                            let w = kernel.get(ki, kj);
                            if w == 0.0 {
                                continue;
                            }
                            // Restrict to output rows/cols whose shifted source is inside.
                            let i_lo = (-di).max(0) as usize;
                            let i_hi = (rows as isize - di).min(rows as isize).max(0) as usize;
                            let j_lo = (-dj).max(0) as usize;
                            let j_hi = (cols as isize - dj).min(cols as isize).max(0) as usize;
                            for i in i_lo..i_hi {
                                let si = (i as isize + di) as usize;
                                let src = &channel.data[si * cols..(si + 1) * cols];
                                let dst = &mut acc.data[i * cols..(i + 1) * cols];
                                for j in j_lo..j_hi {
                                    dst[j] += w * src[(j as isize + dj) as usize];
                                }
                            }
                        }
                    }
                }
                acc
            })
            .collect();

        Ok(output)
    }
}
