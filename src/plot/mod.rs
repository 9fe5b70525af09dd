pub mod heatmap;

pub use heatmap::{plot_comparison, plot_field, Colormap};
