//! Report and plot generation.

pub mod generator;
pub mod plot;

pub use generator::*;
pub use plot::{confusion_matrix_plot, output_folder, similarity_plot, PlotSize};
