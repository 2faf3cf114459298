use std::path::Path;

use crate::error::Result;
use crate::plot::font::{self, ADVANCE, GLYPH_HEIGHT, GLYPH_WIDTH};
use crate::plot::png;

pub type Rgb = [u8; 3];

pub const WHITE: Rgb = [255, 255, 255];
pub const BLACK: Rgb = [0, 0, 0];
pub const GREY: Rgb = [128, 128, 128];
pub const BLUE: Rgb = [31, 119, 180];
pub const ORANGE: Rgb = [255, 127, 14];

/// An RGB raster with the origin at the top-left corner.
#[derive(Debug, Clone)]
pub struct Canvas {
    width: usize,
    height: usize,
    pixels: Vec<u8>,
}

impl Canvas {
    pub fn new(width: usize, height: usize, background: Rgb) -> Self {
        let pixels = background
            .iter()
            .copied()
            .cycle()
            .take(width * height * 3)
            .collect();
        Canvas {
            width,
            height,
            pixels,
        }
    }

    pub fn pixel(&self, x: usize, y: usize) -> Option<Rgb> {
        (x < self.width && y < self.height).then(|| {
            let i = (y * self.width + x) * 3;
            [self.pixels[i], self.pixels[i + 1], self.pixels[i + 2]]
        })
    }

    /// Set one pixel; anything off the canvas is clipped.
    pub fn set(&mut self, x: i32, y: i32, color: Rgb) {
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
            return;
        }
        let i = (y as usize * self.width + x as usize) * 3;
        self.pixels[i..i + 3].copy_from_slice(&color);
    }

    /// Fill the half-open box `[x0, x1) x [y0, y1)`, corners in any order.
    pub fn fill_rect(&mut self, x0: i32, y0: i32, x1: i32, y1: i32, color: Rgb) {
        let (x0, x1) = (x0.min(x1), x0.max(x1));
        let (y0, y1) = (y0.min(y1), y0.max(y1));
        for y in y0.max(0)..y1.min(self.height as i32) {
            for x in x0.max(0)..x1.min(self.width as i32) {
                self.set(x, y, color);
            }
        }
    }

    /// One-pixel outline through both corners.
    pub fn stroke_rect(&mut self, x0: i32, y0: i32, x1: i32, y1: i32, color: Rgb) {
        self.line(x0, y0, x1, y0, color);
        self.line(x1, y0, x1, y1, color);
        self.line(x1, y1, x0, y1, color);
        self.line(x0, y1, x0, y0, color);
    }

    /// Bresenham line, both endpoints included.
    pub fn line(&mut self, x0: i32, y0: i32, x1: i32, y1: i32, color: Rgb) {
        let (dx, dy) = ((x1 - x0).abs(), -(y1 - y0).abs());
        let (sx, sy) = (if x0 < x1 { 1 } else { -1 }, if y0 < y1 { 1 } else { -1 });
        let (mut x, mut y, mut err) = (x0, y0, dx + dy);
        loop {
            self.set(x, y, color);
            if x == x1 && y == y1 {
                break;
            }
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x += sx;
            }
            if e2 <= dx {
                err += dx;
                y += sy;
            }
        }
    }

    pub fn fill_circle(&mut self, cx: i32, cy: i32, radius: f64, color: Rgb) {
        let reach = radius.ceil() as i32;
        for dy in -reach..=reach {
            for dx in -reach..=reach {
                if f64::from(dx * dx + dy * dy) <= radius * radius {
                    self.set(cx + dx, cy + dy, color);
                }
            }
        }
    }

    pub fn stroke_circle(&mut self, cx: i32, cy: i32, radius: f64, color: Rgb) {
        let reach = radius.ceil() as i32 + 1;
        for dy in -reach..=reach {
            for dx in -reach..=reach {
                let d = f64::from(dx * dx + dy * dy).sqrt();
                if (d - radius).abs() < 0.5 {
                    self.set(cx + dx, cy + dy, color);
                }
            }
        }
    }

    /// Horizontal text with its top-left corner at `(x, y)`.
    pub fn text(&mut self, x: i32, y: i32, text: &str, scale: usize, color: Rgb) {
        let scale = scale.max(1) as i32;
        for (i, c) in text.chars().enumerate() {
            let left = x + i as i32 * ADVANCE as i32 * scale;
            for (row, &bits) in font::glyph(c).iter().enumerate() {
                for col in 0..GLYPH_WIDTH {
                    if (bits >> (GLYPH_WIDTH - 1 - col)) & 1 != 0 {
                        let px = left + col as i32 * scale;
                        let py = y + row as i32 * scale;
                        self.fill_rect(px, py, px + scale, py + scale, color);
                    }
                }
            }
        }
    }

    /// Text rotated counter-clockwise by `degrees` about `(x, y)`, which is
    /// the top-left corner of the unrotated string.
    pub fn text_rotated(&mut self, x: i32, y: i32, text: &str, scale: usize, degrees: f64, color: Rgb) {
        let scale = scale.max(1);
        let (sin, cos) = degrees.to_radians().sin_cos();
        // screen y grows downward
        let along = (cos, -sin);
        let down = (sin, cos);
        let dot = (scale as f64 * 0.75).ceil().max(1.0) as i32;

        for (i, c) in text.chars().enumerate() {
            for (row, &bits) in font::glyph(c).iter().enumerate() {
                for col in 0..GLYPH_WIDTH {
                    if (bits >> (GLYPH_WIDTH - 1 - col)) & 1 == 0 {
                        continue;
                    }
                    for sy in 0..scale {
                        for sx in 0..scale {
                            let u = ((i * ADVANCE + col) * scale + sx) as f64;
                            let v = (row * scale + sy) as f64;
                            let px = x as f64 + u * along.0 + v * down.0;
                            let py = y as f64 + u * along.1 + v * down.1;
                            let (px, py) = (px.round() as i32, py.round() as i32);
                            self.fill_rect(px, py, px + dot, py + dot, color);
                        }
                    }
                }
            }
        }
    }

    /// Pixel size of `text` at `scale`.
    pub fn text_size(text: &str, scale: usize) -> (i32, i32) {
        let scale = scale.max(1);
        (
            (font::text_width(text) * scale) as i32,
            (GLYPH_HEIGHT * scale) as i32,
        )
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        png::write_rgb(path, self.width as u32, self.height as u32, &self.pixels)
    }
}
