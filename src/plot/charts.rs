// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 svmflow contributors

//! Exploratory plots of the encoded dataset

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use super::canvas::{contrast, lerp, Canvas, Rgb, BLACK, GRID, WHITE};
use crate::errors::SvmflowResult;
use crate::frame::DataFrame;

const MARGIN: u32 = 40;
const BAR_WIDTH: u32 = 80;
const BAR_GAP: u32 = 40;
const PLOT_HEIGHT: u32 = 240;
const CELL: u32 = 32;

/// Qualitative bar colors
const PALETTE: [Rgb; 8] = [
    [102, 194, 165],
    [252, 141, 98],
    [141, 160, 203],
    [231, 138, 195],
    [166, 216, 84],
    [255, 217, 47],
    [229, 196, 148],
    [179, 179, 179],
];

/// Diverging color scale from -1 to 1
const COOL: Rgb = [59, 76, 192];
const NEUTRAL: Rgb = [221, 221, 221];
const WARM: Rgb = [180, 4, 38];

/// Bar chart of how often each target value occurs
pub fn target_distribution_plot(
    df: &DataFrame,
    target_column: &str,
    path: &Path,
) -> SvmflowResult<PathBuf> {
    let column = df.require(target_column)?;

    let mut counts: BTreeMap<String, (f64, u64)> = BTreeMap::new();
    for row in 0..column.len() {
        let label = column.cell(row);
        let order = label.parse::<f64>().unwrap_or(f64::INFINITY);
        counts.entry(label).or_insert((order, 0)).1 += 1;
    }

    let mut bars: Vec<(String, f64, u64)> = counts
        .into_iter()
        .map(|(label, (order, count))| (label, order, count))
        .collect();
    bars.sort_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.cmp(&b.0)));

    let n = bars.len().max(1) as u32;
    let width = 2 * MARGIN + n * BAR_WIDTH + (n - 1) * BAR_GAP;
    let height = PLOT_HEIGHT + 2 * MARGIN;
    let mut canvas = Canvas::new(width, height, WHITE);

    let max = bars.iter().map(|b| b.2).max().unwrap_or(0).max(1);
    let baseline = MARGIN + PLOT_HEIGHT;

    for (idx, (label, _, count)) in bars.iter().enumerate() {
        let x = MARGIN + idx as u32 * (BAR_WIDTH + BAR_GAP);
        let bar_height = ((*count as f64 / max as f64) * (PLOT_HEIGHT - 20) as f64).round() as u32;
        let color = PALETTE[idx % PALETTE.len()];

        canvas.fill_rect(x, baseline - bar_height, BAR_WIDTH, bar_height, color);
        canvas.outline_rect(x, baseline - bar_height, BAR_WIDTH, bar_height.max(1), BLACK);
        canvas.draw_text_centered(
            x + BAR_WIDTH / 2,
            baseline - bar_height - 10,
            &count.to_string(),
            2,
            BLACK,
        );
        canvas.draw_text_centered(x + BAR_WIDTH / 2, baseline + 16, label, 2, BLACK);
    }

    canvas.fill_rect(MARGIN / 2, baseline, width - MARGIN, 1, BLACK);
    canvas.save(path)
}

/// Pearson correlation between every pair of numeric columns, computed
/// over rows where both values are present
pub fn correlation_matrix(df: &DataFrame) -> (Vec<String>, Vec<Vec<f64>>) {
    let numeric = df.numeric_columns();
    let names: Vec<String> = numeric.iter().map(|(n, _)| n.to_string()).collect();

    let n = numeric.len();
    let mut matrix = vec![vec![f64::NAN; n]; n];
    for i in 0..n {
        for j in i..n {
            let r = pearson(&numeric[i].1, &numeric[j].1);
            matrix[i][j] = r;
            matrix[j][i] = r;
        }
    }
    (names, matrix)
}

fn pearson(a: &[f64], b: &[f64]) -> f64 {
    let pairs: Vec<(f64, f64)> = a
        .iter()
        .zip(b)
        .filter(|(x, y)| !x.is_nan() && !y.is_nan())
        .map(|(&x, &y)| (x, y))
        .collect();
    if pairs.len() < 2 {
        return f64::NAN;
    }

    let n = pairs.len() as f64;
    let mean_a = pairs.iter().map(|p| p.0).sum::<f64>() / n;
    let mean_b = pairs.iter().map(|p| p.1).sum::<f64>() / n;

    let (mut cov, mut var_a, mut var_b) = (0.0, 0.0, 0.0);
    for (x, y) in &pairs {
        cov += (x - mean_a) * (y - mean_b);
        var_a += (x - mean_a).powi(2);
        var_b += (y - mean_b).powi(2);
    }

    if var_a == 0.0 || var_b == 0.0 {
        f64::NAN
    } else {
        (cov / (var_a * var_b).sqrt()).clamp(-1.0, 1.0)
    }
}

fn diverging(r: f64) -> Rgb {
    if r.is_nan() {
        GRID
    } else if r < 0.0 {
        lerp(NEUTRAL, COOL, -r)
    } else {
        lerp(NEUTRAL, WARM, r)
    }
}

/// Heatmap of the correlation matrix, annotated with coefficients. A frame
/// without numeric columns yields a placeholder image.
pub fn correlation_heatmap(df: &DataFrame, path: &Path) -> SvmflowResult<PathBuf> {
    let (names, matrix) = correlation_matrix(df);
    if names.is_empty() {
        tracing::warn!("no numeric columns to correlate; writing a placeholder heatmap");
        return placeholder().save(path);
    }

    let n = names.len() as u32;
    let size = 2 * MARGIN + n * CELL;
    let mut canvas = Canvas::new(size, size, WHITE);

    for (i, row) in matrix.iter().enumerate() {
        for (j, &r) in row.iter().enumerate() {
            let x = MARGIN + j as u32 * CELL;
            let y = MARGIN + i as u32 * CELL;
            let color = diverging(r);

            canvas.fill_rect(x, y, CELL, CELL, color);
            if !r.is_nan() {
                canvas.draw_text_centered(
                    x + CELL / 2,
                    y + CELL / 2,
                    &format!("{:.1}", r),
                    1,
                    contrast(color),
                );
            }
        }
    }
    canvas.outline_rect(MARGIN - 1, MARGIN - 1, n * CELL + 2, n * CELL + 2, BLACK);

    canvas.save(path)
}

/// Grey square with a cross, for plots with nothing to draw
fn placeholder() -> Canvas {
    let size = 2 * MARGIN + 4 * CELL;
    let mut canvas = Canvas::new(size, size, WHITE);
    canvas.fill_rect(MARGIN, MARGIN, 4 * CELL, 4 * CELL, GRID);
    canvas.line((MARGIN, MARGIN), (size - MARGIN - 1, size - MARGIN - 1), WHITE);
    canvas.line((MARGIN, size - MARGIN - 1), (size - MARGIN - 1, MARGIN), WHITE);
    canvas
}
