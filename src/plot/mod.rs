// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 svmflow contributors

//! PNG rendering for pipeline plots

mod canvas;
mod charts;
mod confusion;

pub use canvas::{Canvas, Rgb};
pub use charts::{correlation_heatmap, correlation_matrix, target_distribution_plot};
pub use confusion::{plot_confusion_matrix, save_confusion_plot, ConfusionPlot};
