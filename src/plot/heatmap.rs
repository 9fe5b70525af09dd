use std::path::Path;

use image::{Rgb, RgbImage};

use crate::error::{HeatNnError, Result};
use crate::math::Grid;

/// Smallest side of a rendered panel in pixels.
const MIN_PANEL_PX: usize = 256;
/// Spacing between panels of a comparison strip.
const GAP_PX: u32 = 8;

/// Colour scales used for fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Colormap {
    /// Perceptually ordered dark-blue → yellow scale for potentials
    Viridis,
    /// Blue-white-red scale centred on zero for errors
    Diverging,
}

const VIRIDIS: [[f64; 3]; 5] = [
    [68.0, 1.0, 84.0],
    [59.0, 82.0, 139.0],
    [33.0, 145.0, 140.0],
    [94.0, 201.0, 98.0],
    [253.0, 231.0, 37.0],
];

const DIVERGING: [[f64; 3]; 3] = [[59.0, 76.0, 192.0], [242.0, 242.0, 242.0], [180.0, 4.0, 38.0]];

fn lerp_stops(stops: &[[f64; 3]], t: f64) -> Rgb<u8> {
    let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.0 };
    let pos = t * (stops.len() - 1) as f64;
    let k = (pos.floor() as usize).min(stops.len() - 2);
    let w = pos - k as f64;
    let c = |ch: usize| (stops[k][ch] * (1.0 - w) + stops[k + 1][ch] * w).round() as u8;
    Rgb([c(0), c(1), c(2)])
}

impl Colormap {
    /// Colour of `t` in `[0, 1]`; values outside are clamped.
    pub fn color(&self, t: f64) -> Rgb<u8> {
        match self {
            Colormap::Viridis => lerp_stops(&VIRIDIS, t),
            Colormap::Diverging => lerp_stops(&DIVERGING, t),
        }
    }
}

fn pixel_scale(rows: usize, cols: usize) -> u32 {
    (MIN_PANEL_PX / rows.max(cols).max(1)).max(1) as u32
}

/// Paints `field` into `img` with its lower-left node at the bottom-left
/// corner of the panel starting at column `x0`.
fn paint(img: &mut RgbImage, x0: u32, field: &Grid, range: (f64, f64), cmap: Colormap, px: u32) {
    let (rows, cols) = field.shape();
    let (lo, hi) = range;
    let span = if hi > lo { hi - lo } else { 1.0 };
    for i in 0..rows {
        let y = (rows - 1 - i) as u32 * px;
        for j in 0..cols {
            let color = cmap.color((field.get(i, j) - lo) / span);
            let x = x0 + j as u32 * px;
            for dy in 0..px {
                for dx in 0..px {
                    img.put_pixel(x + dx, y + dy, color);
                }
            }
        }
    }
}

fn save(img: &RgbImage, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .map_err(|e| HeatNnError::io(format!("creating {}", parent.display()), e))?;
    }
    img.save(path)?;
    Ok(())
}

/// Renders one field as a PNG heat map scaled to its own min/max.
pub fn plot_field<P: AsRef<Path>>(field: &Grid, path: P) -> Result<()> {
    let (rows, cols) = field.shape();
    let px = pixel_scale(rows, cols);
    let mut img = RgbImage::new(cols as u32 * px, rows as u32 * px);
    paint(&mut img, 0, field, field.min_max(), Colormap::Viridis, px);
    save(&img, path.as_ref())
}

/// Renders `output | target | output - target` side by side.
///
/// The first two panels share one colour range; the difference panel uses a
/// symmetric diverging scale.
pub fn plot_comparison<P: AsRef<Path>>(output: &Grid, target: &Grid, path: P) -> Result<()> {
    if output.shape() != target.shape() {
        return Err(HeatNnError::Shape { expected: target.shape(), got: output.shape() });
    }
    let (rows, cols) = output.shape();
    let px = pixel_scale(rows, cols);
    let panel_w = cols as u32 * px;

    let (olo, ohi) = output.min_max();
    let (tlo, thi) = target.min_max();
    let shared = (olo.min(tlo), ohi.max(thi));
    let diff = output.clone() - target.clone();
    let bound = diff.max_abs();
    let diff_range = if bound > 0.0 { (-bound, bound) } else { (-1.0, 1.0) };

    let mut img = RgbImage::from_pixel(3 * panel_w + 2 * GAP_PX, rows as u32 * px, Rgb([255, 255, 255]));
    paint(&mut img, 0, output, shared, Colormap::Viridis, px);
    paint(&mut img, panel_w + GAP_PX, target, shared, Colormap::Viridis, px);
    paint(&mut img, 2 * (panel_w + GAP_PX), &diff, diff_range, Colormap::Diverging, px);
    save(&img, path.as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn colormaps_hit_their_end_stops() {
        assert_eq!(Colormap::Viridis.color(0.0), Rgb([68, 1, 84]));
        assert_eq!(Colormap::Viridis.color(1.0), Rgb([253, 231, 37]));
        assert_eq!(Colormap::Viridis.color(7.0), Rgb([253, 231, 37]));
        assert_eq!(Colormap::Diverging.color(0.5), Rgb([242, 242, 242]));
        assert_eq!(Colormap::Diverging.color(f64::NAN), Rgb([59, 76, 192]));
    }

    #[test]
    fn field_plot_is_upscaled_and_flipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("figures").join("field.png");
        let mut g = Grid::zeros(4, 8);
        g.set(0, 0, 1.0);
        plot_field(&g, &path).unwrap();

        let img = image::open(&path).unwrap().to_rgb8();
        assert_eq!(img.dimensions(), (256, 128));
        // Row 0 is drawn at the bottom.
        assert_eq!(*img.get_pixel(0, 127), Rgb([253, 231, 37]));
        assert_eq!(*img.get_pixel(0, 0), Rgb([68, 1, 84]));
    }

    #[test]
    fn comparison_strip_has_three_panels() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("batch.png");
        let out = Grid::filled(16, 16, 2.0);
        let tgt = Grid::filled(16, 16, 1.0);
        plot_comparison(&out, &tgt, &path).unwrap();

        let img = image::open(&path).unwrap().to_rgb8();
        assert_eq!(img.dimensions(), (3 * 256 + 2 * GAP_PX, 256));
        assert!(plot_comparison(&out, &Grid::zeros(3, 3), &path).is_err());
    }
}
