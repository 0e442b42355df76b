// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 svmflow contributors

//! Confusion matrix heatmap

use std::path::{Path, PathBuf};

use super::canvas::{contrast, lerp, Canvas, Rgb, BLACK, WHITE};
use crate::errors::{SvmflowError, SvmflowResult};
use crate::transforms::ConfusionMatrix;

const MARGIN: u32 = 40;
const CELL: u32 = 120;

const LIGHT: Rgb = [247, 251, 255];
const DARK: Rgb = [8, 48, 107];

/// A rendered 2×2 confusion matrix, ready to be saved
#[derive(Debug, Clone, PartialEq)]
pub struct ConfusionPlot {
    matrix: ConfusionMatrix,
    canvas: Canvas,
}

impl ConfusionPlot {
    pub fn matrix(&self) -> &ConfusionMatrix {
        &self.matrix
    }

    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }
}

/// Render a binary confusion matrix; anything but 2×2 is a shape error
pub fn plot_confusion_matrix(cm: &ConfusionMatrix) -> SvmflowResult<ConfusionPlot> {
    let (rows, cols) = cm.dims();
    if (rows, cols) != (2, 2) || cm.levels.len() != 2 {
        return Err(SvmflowError::shape(format!(
            "confusion matrix plot needs a 2x2 matrix, got {}x{}",
            rows, cols
        )));
    }

    let size = 2 * MARGIN + 2 * CELL;
    let mut canvas = Canvas::new(size, size, WHITE);
    let max = cm.max_count().max(1) as f64;

    for prediction in 0..2 {
        for truth in 0..2 {
            let count = cm.get(prediction, truth);
            let color = lerp(LIGHT, DARK, count as f64 / max);
            let x = MARGIN + truth as u32 * CELL;
            let y = MARGIN + prediction as u32 * CELL;

            canvas.fill_rect(x, y, CELL, CELL, color);
            canvas.draw_text_centered(
                x + CELL / 2,
                y + CELL / 2,
                &count.to_string(),
                4,
                contrast(color),
            );
        }
    }

    canvas.outline_rect(MARGIN - 1, MARGIN - 1, 2 * CELL + 2, 2 * CELL + 2, BLACK);
    canvas.fill_rect(MARGIN + CELL, MARGIN, 1, 2 * CELL, BLACK);
    canvas.fill_rect(MARGIN, MARGIN + CELL, 2 * CELL, 1, BLACK);

    // Level labels: truth along the top, prediction down the left
    for (idx, level) in cm.levels.iter().enumerate() {
        let offset = MARGIN + idx as u32 * CELL + CELL / 2;
        canvas.draw_text_centered(offset, MARGIN / 2, level, 2, BLACK);
        canvas.draw_text_centered(MARGIN / 2, offset, level, 2, BLACK);
    }

    Ok(ConfusionPlot {
        matrix: cm.clone(),
        canvas,
    })
}

/// Write the plot as a PNG at exactly `path`
pub fn save_confusion_plot(plot: &ConfusionPlot, path: &Path) -> SvmflowResult<PathBuf> {
    plot.canvas.save(path)
}
