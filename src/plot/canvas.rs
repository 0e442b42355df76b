// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 svmflow contributors

//! RGB raster canvas with PNG output

use std::path::{Path, PathBuf};

use crate::errors::{SvmflowError, SvmflowResult};

pub type Rgb = [u8; 3];

pub const WHITE: Rgb = [255, 255, 255];
pub const BLACK: Rgb = [0, 0, 0];
pub const GRID: Rgb = [200, 200, 200];

/// Glyph cell size of the built-in font, before scaling
const GLYPH_WIDTH: u32 = 3;
const GLYPH_HEIGHT: u32 = 5;

/// A fixed-size RGB image
#[derive(Debug, Clone, PartialEq)]
pub struct Canvas {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl Canvas {
    pub fn new(width: u32, height: u32, background: Rgb) -> Self {
        let pixels = background
            .iter()
            .copied()
            .cycle()
            .take((width * height * 3) as usize)
            .collect();
        Self {
            width,
            height,
            pixels,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgb> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = ((y * self.width + x) * 3) as usize;
        Some([self.pixels[i], self.pixels[i + 1], self.pixels[i + 2]])
    }

    /// Set one pixel; out-of-bounds writes are clipped
    pub fn set(&mut self, x: u32, y: u32, color: Rgb) {
        if x < self.width && y < self.height {
            let i = ((y * self.width + x) * 3) as usize;
            self.pixels[i..i + 3].copy_from_slice(&color);
        }
    }

    pub fn fill_rect(&mut self, x: u32, y: u32, w: u32, h: u32, color: Rgb) {
        for py in y..y.saturating_add(h).min(self.height) {
            for px in x..x.saturating_add(w).min(self.width) {
                self.set(px, py, color);
            }
        }
    }

    pub fn outline_rect(&mut self, x: u32, y: u32, w: u32, h: u32, color: Rgb) {
        if w == 0 || h == 0 {
            return;
        }
        self.fill_rect(x, y, w, 1, color);
        self.fill_rect(x, y + h - 1, w, 1, color);
        self.fill_rect(x, y, 1, h, color);
        self.fill_rect(x + w - 1, y, 1, h, color);
    }

    /// Straight line between two points (Bresenham)
    pub fn line(&mut self, from: (u32, u32), to: (u32, u32), color: Rgb) {
        let (mut x0, mut y0) = (from.0 as i64, from.1 as i64);
        let (x1, y1) = (to.0 as i64, to.1 as i64);
        let dx = (x1 - x0).abs();
        let dy = -(y1 - y0).abs();
        let sx = if x0 < x1 { 1 } else { -1 };
        let sy = if y0 < y1 { 1 } else { -1 };
        let mut err = dx + dy;

        loop {
            self.set(x0 as u32, y0 as u32, color);
            if x0 == x1 && y0 == y1 {
                break;
            }
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x0 += sx;
            }
            if e2 <= dx {
                err += dx;
                y0 += sy;
            }
        }
    }

    /// Pixel width of `text` at `scale`
    pub fn text_width(text: &str, scale: u32) -> u32 {
        let n = text.chars().count() as u32;
        if n == 0 {
            0
        } else {
            (n * (GLYPH_WIDTH + 1) - 1) * scale
        }
    }

    pub fn text_height(scale: u32) -> u32 {
        GLYPH_HEIGHT * scale
    }

    /// Draw `text` with its top-left corner at (x, y). Only digits, `.` and
    /// `-` have glyphs; anything else leaves a gap.
    pub fn draw_text(&mut self, x: u32, y: u32, text: &str, scale: u32, color: Rgb) {
        for (idx, ch) in text.chars().enumerate() {
            let origin = x + idx as u32 * (GLYPH_WIDTH + 1) * scale;
            let Some(rows) = glyph(ch) else { continue };

            for (gy, bits) in rows.iter().enumerate() {
                for gx in 0..GLYPH_WIDTH {
                    if bits & (1 << (GLYPH_WIDTH - 1 - gx)) != 0 {
                        self.fill_rect(
                            origin + gx * scale,
                            y + gy as u32 * scale,
                            scale,
                            scale,
                            color,
                        );
                    }
                }
            }
        }
    }

    /// Draw `text` centered on (cx, cy)
    pub fn draw_text_centered(&mut self, cx: u32, cy: u32, text: &str, scale: u32, color: Rgb) {
        let x = cx.saturating_sub(Self::text_width(text, scale) / 2);
        let y = cy.saturating_sub(Self::text_height(scale) / 2);
        self.draw_text(x, y, text, scale, color);
    }

    /// Encode as an 8-bit RGB PNG
    pub fn encode_png(&self) -> SvmflowResult<Vec<u8>> {
        let mut bytes = Vec::new();
        {
            let mut encoder = png::Encoder::new(&mut bytes, self.width, self.height);
            encoder.set_color(png::ColorType::Rgb);
            encoder.set_depth(png::BitDepth::Eight);
            let mut writer = encoder.write_header()?;
            writer.write_image_data(&self.pixels)?;
            writer.finish()?;
        }
        Ok(bytes)
    }

    /// Encode and write to `path`, creating parent directories
    pub fn save(&self, path: &Path) -> SvmflowResult<PathBuf> {
        let bytes = self.encode_png()?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| SvmflowError::FileWriteError {
                path: parent.to_path_buf(),
                error: e.to_string(),
            })?;
        }
        std::fs::write(path, bytes).map_err(|e| SvmflowError::FileWriteError {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;
        Ok(path.to_path_buf())
    }
}

fn glyph(ch: char) -> Option<[u8; 5]> {
    let rows = match ch {
        '0' => [0b111, 0b101, 0b101, 0b101, 0b111],
        '1' => [0b010, 0b110, 0b010, 0b010, 0b111],
        '2' => [0b111, 0b001, 0b111, 0b100, 0b111],
        '3' => [0b111, 0b001, 0b111, 0b001, 0b111],
        '4' => [0b101, 0b101, 0b111, 0b001, 0b001],
        '5' => [0b111, 0b100, 0b111, 0b001, 0b111],
        '6' => [0b111, 0b100, 0b111, 0b101, 0b111],
        '7' => [0b111, 0b001, 0b001, 0b001, 0b001],
        '8' => [0b111, 0b101, 0b111, 0b101, 0b111],
        '9' => [0b111, 0b101, 0b111, 0b001, 0b111],
        '.' => [0b000, 0b000, 0b000, 0b000, 0b010],
        '-' => [0b000, 0b000, 0b111, 0b000, 0b000],
        _ => return None,
    };
    Some(rows)
}

/// Linear blend between two colors, `t` in [0, 1]
pub fn lerp(a: Rgb, b: Rgb, t: f64) -> Rgb {
    let t = t.clamp(0.0, 1.0);
    let mix = |x: u8, y: u8| (x as f64 + (y as f64 - x as f64) * t).round() as u8;
    [mix(a[0], b[0]), mix(a[1], b[1]), mix(a[2], b[2])]
}

/// Black or white, whichever reads better on `background`
pub fn contrast(background: Rgb) -> Rgb {
    let luma = 0.299 * background[0] as f64
        + 0.587 * background[1] as f64
        + 0.114 * background[2] as f64;
    if luma > 140.0 {
        BLACK
    } else {
        WHITE
    }
}
