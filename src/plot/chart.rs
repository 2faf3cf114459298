//! Chart shapes drawn onto a [`Canvas`]: histogram, scatter, heatmap,
//! boxplot and node-link drawing.

use std::path::Path;

use tracing::{debug, warn};

use crate::error::Result;
use crate::plot::canvas::{Canvas, Rgb, BLACK, BLUE, GREY, ORANGE, WHITE};
use crate::report::general;
use crate::stats::{self, Histogram};

pub const WIDTH: usize = 640;
pub const HEIGHT: usize = 480;
pub const SQUARE: usize = 800;

const TICK: i32 = 4;
const TICKS_WANTED: f64 = 6.0;

/// Title and axis captions of a chart.
#[derive(Debug, Clone, Copy)]
pub struct Labels<'a> {
    pub title: &'a str,
    pub x: &'a str,
    pub y: &'a str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scale {
    Linear,
    Log,
}

/// Data range of one axis, held in transformed (log10 for `Log`) units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Axis {
    lo: f64,
    hi: f64,
    scale: Scale,
}

impl Axis {
    /// Range of `values` plus a 5% margin on each side.
    pub fn fit(values: &[f64], scale: Scale) -> Axis {
        let (lo, hi) = values
            .iter()
            .filter_map(|&v| transform(v, scale))
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
                (lo.min(v), hi.max(v))
            });
        let (lo, hi) = if lo > hi {
            (0.0, 1.0)
        } else if lo == hi {
            (lo - 0.5, hi + 0.5)
        } else {
            (lo, hi)
        };
        let pad = (hi - lo) * 0.05;
        Axis {
            lo: lo - pad,
            hi: hi + pad,
            scale,
        }
    }

    pub fn linear(lo: f64, hi: f64) -> Axis {
        Axis {
            lo,
            hi: if hi > lo { hi } else { lo + 1.0 },
            scale: Scale::Linear,
        }
    }

    /// Position of `value` along the axis, 0 at `lo` and 1 at `hi`.
    pub fn fraction(&self, value: f64) -> Option<f64> {
        transform(value, self.scale).map(|t| (t - self.lo) / (self.hi - self.lo))
    }

    pub fn ticks(&self) -> Vec<(f64, String)> {
        match self.scale {
            Scale::Log => {
                let (first, last) = (self.lo.ceil() as i32, self.hi.floor() as i32);
                let ticks: Vec<(f64, String)> = (first..=last)
                    .map(|k| {
                        let v = 10f64.powi(k);
                        (v, general(v, 1))
                    })
                    .collect();
                if ticks.is_empty() {
                    [self.lo, self.hi]
                        .iter()
                        .map(|t| {
                            let v = 10f64.powf(*t);
                            (v, general(v, 2))
                        })
                        .collect()
                } else {
                    ticks
                }
            }
            Scale::Linear => {
                let step = nice_step((self.hi - self.lo) / TICKS_WANTED);
                let decimals = (-step.log10().floor()).max(0.0) as usize;
                let first = (self.lo / step).ceil() as i64;
                let last = (self.hi / step).floor() as i64;
                (first..=last)
                    .map(|i| {
                        let v = i as f64 * step;
                        (v, tick_label(v, decimals))
                    })
                    .collect()
            }
        }
    }
}

fn transform(value: f64, scale: Scale) -> Option<f64> {
    if !value.is_finite() {
        return None;
    }
    match scale {
        Scale::Linear => Some(value),
        Scale::Log => (value > 0.0).then(|| value.log10()),
    }
}

/// Round `raw` up to 1, 2 or 5 times a power of ten.
fn nice_step(raw: f64) -> f64 {
    if !(raw > 0.0) || !raw.is_finite() {
        return 1.0;
    }
    let magnitude = 10f64.powf(raw.log10().floor());
    let normalized = raw / magnitude;
    let nice = if normalized <= 1.0 {
        1.0
    } else if normalized <= 2.0 {
        2.0
    } else if normalized <= 5.0 {
        5.0
    } else {
        10.0
    };
    nice * magnitude
}

fn tick_label(value: f64, decimals: usize) -> String {
    if value != 0.0 && (value.abs() >= 1e6 || value.abs() < 1e-4) {
        return general(value, 3);
    }
    let text = format!("{:.*}", decimals, value);
    // avoid "-0.0"
    if text.trim_start_matches('-').chars().all(|c| c == '0' || c == '.') {
        text.trim_start_matches('-').to_string()
    } else {
        text
    }
}

/// Pixel box the data is drawn into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Area {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Area {
    fn width(&self) -> f64 {
        f64::from(self.right - self.left)
    }

    fn height(&self) -> f64 {
        f64::from(self.bottom - self.top)
    }
}

/// A canvas with a title, axis captions and a plotting area.
pub struct Plot {
    canvas: Canvas,
    area: Area,
}

impl Plot {
    pub fn new(width: usize, height: usize, labels: &Labels) -> Plot {
        let area = Area {
            left: 80,
            top: 45,
            right: width as i32 - 25,
            bottom: height as i32 - 55,
        };
        let mut plot = Plot::with_area(width, height, labels.title, area);

        let (w, h) = Canvas::text_size(labels.x, 1);
        let centre_x = (area.left + area.right) / 2;
        plot.canvas
            .text(centre_x - w / 2, height as i32 - 12 - h, labels.x, 1, BLACK);

        let (w, _) = Canvas::text_size(labels.y, 1);
        let centre_y = (area.top + area.bottom) / 2;
        plot.canvas
            .text_rotated(12, centre_y + w / 2, labels.y, 1, 90.0, BLACK);
        plot
    }

    pub fn with_area(width: usize, height: usize, title: &str, area: Area) -> Plot {
        let mut canvas = Canvas::new(width, height, WHITE);
        let (w, _) = Canvas::text_size(title, 2);
        canvas.text(width as i32 / 2 - w / 2, 14, title, 2, BLACK);
        Plot { canvas, area }
    }

    /// Pixel for a data point, `None` if either coordinate cannot be placed.
    pub fn to_pixel(&self, x_axis: &Axis, y_axis: &Axis, x: f64, y: f64) -> Option<(i32, i32)> {
        let fx = x_axis.fraction(x)?;
        let fy = y_axis.fraction(y)?;
        Some((
            self.area.left + (fx * self.area.width()).round() as i32,
            self.area.bottom - (fy * self.area.height()).round() as i32,
        ))
    }

    fn x_pixel(&self, axis: &Axis, x: f64) -> Option<i32> {
        axis.fraction(x)
            .map(|f| self.area.left + (f * self.area.width()).round() as i32)
    }

    fn y_pixel(&self, axis: &Axis, y: f64) -> Option<i32> {
        axis.fraction(y)
            .map(|f| self.area.bottom - (f * self.area.height()).round() as i32)
    }

    pub fn draw_axes(&mut self, x_axis: &Axis, y_axis: &Axis) {
        let x_ticks = x_axis.ticks();
        let y_ticks = y_axis.ticks();
        self.draw_axes_with(x_axis, &x_ticks, y_axis, &y_ticks);
    }

    pub fn draw_axes_with(
        &mut self,
        x_axis: &Axis,
        x_ticks: &[(f64, String)],
        y_axis: &Axis,
        y_ticks: &[(f64, String)],
    ) {
        let Area {
            left,
            top,
            right,
            bottom,
        } = self.area;
        self.canvas.stroke_rect(left, top, right, bottom, BLACK);

        for (value, label) in x_ticks {
            if let Some(x) = self.x_pixel(x_axis, *value).filter(|x| (left..=right).contains(x)) {
                self.canvas.line(x, bottom, x, bottom + TICK, BLACK);
                let (w, _) = Canvas::text_size(label, 1);
                self.canvas.text(x - w / 2, bottom + TICK + 4, label, 1, BLACK);
            }
        }
        for (value, label) in y_ticks {
            if let Some(y) = self.y_pixel(y_axis, *value).filter(|y| (top..=bottom).contains(y)) {
                self.canvas.line(left - TICK, y, left, y, BLACK);
                let (w, h) = Canvas::text_size(label, 1);
                self.canvas
                    .text(left - TICK - 4 - w, y - h / 2, label, 1, BLACK);
            }
        }
    }

    pub fn save(self, path: &Path) -> Result<()> {
        self.canvas.save(path)?;
        debug!("Wrote {}", path.display());
        Ok(())
    }
}

/// Frequency histogram of `data` in `bins` equal-width bins.
pub fn histogram(path: &Path, data: &[f64], bins: usize, labels: &Labels) -> Result<()> {
    let Histogram { edges, counts } = stats::histogram(data, bins);
    histogram_from_bins(path, &edges, &counts, labels)
}

fn histogram_from_bins(path: &Path, edges: &[f64], counts: &[usize], labels: &Labels) -> Result<()> {
    let mut plot = Plot::new(WIDTH, HEIGHT, labels);
    let x_axis = Axis::fit(&[edges[0], edges[edges.len() - 1]], Scale::Linear);
    let peak = counts.iter().copied().max().unwrap_or(0).max(1) as f64;
    let y_axis = Axis::linear(0.0, peak * 1.05);

    let base = plot.y_pixel(&y_axis, 0.0).unwrap_or(plot.area.bottom);
    for (i, &count) in counts.iter().enumerate() {
        if count == 0 {
            continue;
        }
        let (Some(x0), Some(x1), Some(y)) = (
            plot.x_pixel(&x_axis, edges[i]),
            plot.x_pixel(&x_axis, edges[i + 1]),
            plot.y_pixel(&y_axis, count as f64),
        ) else {
            continue;
        };
        // keep one-pixel bars visible
        plot.canvas.fill_rect(x0, y, x1.max(x0 + 1), base, BLUE);
    }

    plot.draw_axes(&x_axis, &y_axis);
    plot.save(path)
}

/// One small dot per `(x, y)` pair. On a log axis non-positive values
/// cannot be placed and are dropped.
pub fn scatter(
    path: &Path,
    x: &[f64],
    y: &[f64],
    scales: (Scale, Scale),
    labels: &Labels,
) -> Result<()> {
    let points: Vec<(f64, f64)> = x
        .iter()
        .zip(y)
        .filter(|&(&a, &b)| transform(a, scales.0).is_some() && transform(b, scales.1).is_some())
        .map(|(&a, &b)| (a, b))
        .collect();
    let dropped = x.len().min(y.len()) - points.len();
    if dropped > 0 {
        warn!(
            "{}: dropped {} points that cannot be placed on the axes",
            labels.title, dropped
        );
    }

    let xs: Vec<f64> = points.iter().map(|p| p.0).collect();
    let ys: Vec<f64> = points.iter().map(|p| p.1).collect();
    let x_axis = Axis::fit(&xs, scales.0);
    let y_axis = Axis::fit(&ys, scales.1);

    let mut plot = Plot::new(WIDTH, HEIGHT, labels);
    for &(a, b) in &points {
        if let Some((px, py)) = plot.to_pixel(&x_axis, &y_axis, a, b) {
            plot.canvas.fill_circle(px, py, 1.5, BLUE);
        }
    }
    plot.draw_axes(&x_axis, &y_axis);
    plot.save(path)
}

/// Colour-mapped square matrix with names on both axes and a colour bar.
/// NaN cells stay blank.
pub fn heatmap(path: &Path, names: &[&str], matrix: &[Vec<f64>], title: &str) -> Result<()> {
    let k = names.len().max(1) as i32;
    let grid = Area {
        left: 160,
        top: 50,
        right: SQUARE as i32 - 140,
        bottom: SQUARE as i32 - 170,
    };
    let cell = (grid.width().min(grid.height()) as i32 / k).max(1);
    let area = Area {
        right: grid.left + cell * k,
        bottom: grid.top + cell * k,
        ..grid
    };
    let mut plot = Plot::with_area(SQUARE, SQUARE, title, area);

    let (lo, hi) = matrix
        .iter()
        .flatten()
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    let (lo, hi) = if lo > hi { (0.0, 1.0) } else { (lo, hi) };
    let shade = |v: f64| viridis(if hi > lo { (v - lo) / (hi - lo) } else { 0.5 });

    for (row, values) in matrix.iter().enumerate() {
        for (col, &v) in values.iter().enumerate() {
            if !v.is_finite() {
                continue;
            }
            let x = area.left + col as i32 * cell;
            let y = area.top + row as i32 * cell;
            plot.canvas.fill_rect(x, y, x + cell, y + cell, shade(v));
        }
    }
    plot.canvas
        .stroke_rect(area.left, area.top, area.right, area.bottom, BLACK);

    for (i, name) in names.iter().enumerate() {
        let centre = i as i32 * cell + cell / 2;

        let (w, h) = Canvas::text_size(name, 1);
        let y = area.top + centre;
        plot.canvas.line(area.left - TICK, y, area.left, y, BLACK);
        plot.canvas
            .text(area.left - TICK - 4 - w, y - h / 2, name, 1, BLACK);

        // 45 degrees, right end of the label under the tick
        let x = area.left + centre;
        plot.canvas.line(x, area.bottom, x, area.bottom + TICK, BLACK);
        let reach = (f64::from(w) * std::f64::consts::FRAC_1_SQRT_2).round() as i32;
        plot.canvas.text_rotated(
            x - reach - 3,
            area.bottom + TICK + 4 + reach,
            name,
            1,
            45.0,
            BLACK,
        );
    }

    // colour bar
    let bar_left = area.right + 30;
    let bar_right = bar_left + 20;
    let span = (area.bottom - area.top).max(1);
    for y in area.top..area.bottom {
        let t = f64::from(area.bottom - 1 - y) / f64::from(span - 1).max(1.0);
        plot.canvas.fill_rect(bar_left, y, bar_right, y + 1, viridis(t));
    }
    plot.canvas
        .stroke_rect(bar_left, area.top, bar_right, area.bottom, BLACK);
    let bar_axis = Axis::linear(lo, hi);
    for (value, label) in bar_axis.ticks() {
        if let Some(f) = bar_axis.fraction(value).filter(|f| (0.0..=1.0).contains(f)) {
            let y = area.bottom - (f * f64::from(span)).round() as i32;
            plot.canvas.line(bar_right, y, bar_right + TICK, y, BLACK);
            let (_, h) = Canvas::text_size(&label, 1);
            plot.canvas
                .text(bar_right + TICK + 4, y - h / 2, &label, 1, BLACK);
        }
    }

    plot.save(path)
}

/// Side-by-side box-and-whisker plots, one per named group.
pub fn boxplot(path: &Path, groups: &[(&str, Vec<f64>)], labels: &Labels) -> Result<()> {
    let mut plot = Plot::new(WIDTH, HEIGHT, labels);
    let x_axis = Axis::linear(0.5, groups.len() as f64 + 0.5);
    let everything: Vec<f64> = groups.iter().flat_map(|(_, v)| v.iter().copied()).collect();
    let y_axis = Axis::fit(&everything, Scale::Linear);

    let mut x_ticks = Vec::with_capacity(groups.len());
    for (i, (name, values)) in groups.iter().enumerate() {
        let position = i as f64 + 1.0;
        x_ticks.push((position, name.to_string()));
        let Some(summary) = stats::box_summary(values) else {
            continue;
        };

        let px = |plot: &Plot, x: f64| plot.x_pixel(&x_axis, x).unwrap_or(plot.area.left);
        let py = |plot: &Plot, y: f64| plot.y_pixel(&y_axis, y).unwrap_or(plot.area.bottom);
        let (left, right) = (px(&plot, position - 0.25), px(&plot, position + 0.25));
        let (cap_left, cap_right) = (px(&plot, position - 0.125), px(&plot, position + 0.125));
        let centre = px(&plot, position);
        let (q1, q3, median) = (
            py(&plot, summary.q1),
            py(&plot, summary.q3),
            py(&plot, summary.median),
        );
        let (low, high) = (py(&plot, summary.whisker_low), py(&plot, summary.whisker_high));

        plot.canvas.stroke_rect(left, q3, right, q1, BLACK);
        plot.canvas.line(left, median, right, median, ORANGE);
        plot.canvas.line(centre, q1, centre, low, BLACK);
        plot.canvas.line(centre, q3, centre, high, BLACK);
        plot.canvas.line(cap_left, low, cap_right, low, BLACK);
        plot.canvas.line(cap_left, high, cap_right, high, BLACK);
        for &outlier in &summary.outliers {
            plot.canvas
                .stroke_circle(centre, py(&plot, outlier), 3.0, BLACK);
        }
    }

    let y_ticks = y_axis.ticks();
    plot.draw_axes_with(&x_axis, &x_ticks, &y_axis, &y_ticks);
    plot.save(path)
}

/// Node-link drawing of laid-out positions, without axes or labels.
pub fn network(
    path: &Path,
    positions: &[(f64, f64)],
    edges: &[(usize, usize)],
    title: &str,
) -> Result<()> {
    let area = Area {
        left: 30,
        top: 50,
        right: SQUARE as i32 - 30,
        bottom: SQUARE as i32 - 30,
    };
    let mut plot = Plot::with_area(SQUARE, SQUARE, title, area);

    let xs: Vec<f64> = positions.iter().map(|p| p.0).collect();
    let ys: Vec<f64> = positions.iter().map(|p| p.1).collect();
    let x_axis = Axis::fit(&xs, Scale::Linear);
    let y_axis = Axis::fit(&ys, Scale::Linear);
    let pixels: Vec<Option<(i32, i32)>> = positions
        .iter()
        .map(|&(x, y)| plot.to_pixel(&x_axis, &y_axis, x, y))
        .collect();

    for &(a, b) in edges {
        if let (Some(Some(p)), Some(Some(q))) = (pixels.get(a), pixels.get(b)) {
            plot.canvas.line(p.0, p.1, q.0, q.1, GREY);
        }
    }
    for p in pixels.iter().flatten() {
        plot.canvas.fill_circle(p.0, p.1, 3.0, BLUE);
    }
    plot.save(path)
}

/// Approximation of the viridis colour map, `t` clamped to `[0, 1]`.
pub fn viridis(t: f64) -> Rgb {
    const STOPS: [(f64, [f64; 3]); 5] = [
        (0.00, [68.0, 1.0, 84.0]),
        (0.25, [59.0, 82.0, 139.0]),
        (0.50, [33.0, 145.0, 140.0]),
        (0.75, [94.0, 201.0, 98.0]),
        (1.00, [253.0, 231.0, 37.0]),
    ];
    let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.0 };
    let upper = STOPS.iter().position(|(at, _)| *at >= t).unwrap_or(STOPS.len() - 1).max(1);
    let (t0, c0) = STOPS[upper - 1];
    let (t1, c1) = STOPS[upper];
    let f = (t - t0) / (t1 - t0);
    let mix = |i: usize| (c0[i] + f * (c1[i] - c0[i])).round() as u8;
    [mix(0), mix(1), mix(2)]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_ticks_are_round_numbers() {
        let axis = Axis::linear(0.0, 10.0);
        let ticks: Vec<String> = axis.ticks().into_iter().map(|(_, label)| label).collect();
        assert_eq!(ticks, vec!["0", "2", "4", "6", "8", "10"]);

        let axis = Axis::linear(-0.05, 1.05);
        let labels: Vec<String> = axis.ticks().into_iter().map(|(_, label)| label).collect();
        assert_eq!(labels, vec!["0.0", "0.2", "0.4", "0.6", "0.8", "1.0"]);
    }

    #[test]
    fn test_log_axis_ticks_at_decades() {
        let axis = Axis::fit(&[1.0, 1000.0, -5.0, 0.0], Scale::Log);
        let values: Vec<f64> = axis.ticks().into_iter().map(|(v, _)| v).collect();
        assert_eq!(values, vec![1.0, 10.0, 100.0, 1000.0]);
        assert_eq!(axis.fraction(0.0), None);
    }

    #[test]
    fn test_fit_pads_and_handles_degenerate_input() {
        let axis = Axis::fit(&[0.0, 10.0], Scale::Linear);
        assert_eq!(axis.fraction(0.0).map(|f| (f * 1e9).round()), Some((1.0 / 22.0 * 1e9_f64).round()));

        let flat = Axis::fit(&[3.0, 3.0], Scale::Linear);
        assert!(flat.fraction(3.0).unwrap() > 0.0);
        assert!(Axis::fit(&[], Scale::Linear).fraction(0.5).is_some());
    }

    #[test]
    fn test_viridis_endpoints() {
        assert_eq!(viridis(0.0), [68, 1, 84]);
        assert_eq!(viridis(1.0), [253, 231, 37]);
        assert_eq!(viridis(f64::NAN), [68, 1, 84]);
    }

    #[test]
    fn test_charts_write_png_files() {
        let dir = tempfile::tempdir().unwrap();
        let labels = Labels {
            title: "Test",
            x: "x",
            y: "y",
        };

        let data: Vec<f64> = (0..100).map(|i| (i % 17) as f64).collect();
        let hist = dir.path().join("hist.png");
        histogram(&hist, &data, 50, &labels).unwrap();

        let scatter_path = dir.path().join("scatter.png");
        let ys: Vec<f64> = data.iter().map(|v| v * 2.0).collect();
        scatter(&scatter_path, &data, &ys, (Scale::Log, Scale::Log), &labels).unwrap();

        let heat = dir.path().join("heat.png");
        let matrix = vec![vec![1.0, 0.5], vec![0.5, f64::NAN]];
        heatmap(&heat, &["a", "b"], &matrix, "Heat").unwrap();

        let boxes = dir.path().join("box.png");
        boxplot(&boxes, &[("a", data.clone()), ("empty", Vec::new())], &labels).unwrap();

        let net = dir.path().join("net.png");
        network(&net, &[(0.0, 0.0), (1.0, 1.0)], &[(0, 1)], "Net").unwrap();

        for path in [hist, scatter_path, heat, boxes, net] {
            let bytes = std::fs::read(&path).unwrap();
            assert_eq!(&bytes[1..4], b"PNG", "{}", path.display());
        }
    }
}
