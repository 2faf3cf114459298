//! Descriptive statistics over node-table columns.
//!
//! Columns are `&[Option<f64>]`; `None` is a missing cell. Every function
//! here skips missing cells, and any comparison against one is false.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::f64::consts::PI;

use serde::Serialize;

use crate::error::{AnalysisError, Result};

/// Non-missing values in table order.
pub fn present(values: &[Option<f64>]) -> Vec<f64> {
    values.iter().flatten().copied().collect()
}

pub fn mean(values: &[Option<f64>]) -> Option<f64> {
    let mut sum = 0.0;
    let mut n = 0usize;
    for v in values.iter().flatten() {
        sum += v;
        n += 1;
    }
    (n > 0).then(|| sum / n as f64)
}

pub fn count_where(values: &[Option<f64>], predicate: impl Fn(f64) -> bool) -> usize {
    values.iter().flatten().filter(|&&v| predicate(v)).count()
}

/// Quantile by linear interpolation between closest ranks (type 7).
pub fn quantile(values: &[Option<f64>], q: f64) -> Result<f64> {
    let mut sorted = present(values);
    if sorted.is_empty() {
        return Err(AnalysisError::InsufficientData {
            what: "quantile",
            need: 1,
            got: 0,
        });
    }
    sorted.sort_by(|a, b| a.total_cmp(b));
    Ok(quantile_sorted(&sorted, q))
}

/// Same rule as [`quantile`] over already sorted, non-empty data.
pub fn quantile_sorted(sorted: &[f64], q: f64) -> f64 {
    let h = (sorted.len() - 1) as f64 * q.clamp(0.0, 1.0);
    let lower = h.floor() as usize;
    let upper = h.ceil() as usize;
    let fraction = h - lower as f64;
    sorted[lower] + fraction * (sorted[upper] - sorted[lower])
}

/// Rows of `x` and `y` where both cells are present.
pub fn paired(x: &[Option<f64>], y: &[Option<f64>]) -> (Vec<f64>, Vec<f64>) {
    x.iter()
        .zip(y)
        .filter_map(|(a, b)| Some(((*a)?, (*b)?)))
        .unzip()
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Correlation {
    pub r: f64,
    pub p_value: f64,
    pub n: usize,
}

/// Pearson correlation with its two-sided p-value.
///
/// The p-value is the Student-t tail with `n - 2` degrees of freedom,
/// evaluated as `I_{1-r²}((n-2)/2, 1/2)`. A constant input yields NaN.
pub fn pearson(x: &[f64], y: &[f64]) -> Result<Correlation> {
    let n = x.len().min(y.len());
    if n < 2 {
        return Err(AnalysisError::InsufficientData {
            what: "pearson correlation",
            need: 2,
            got: n,
        });
    }
    let (x, y) = (&x[..n], &y[..n]);
    let mean_x = x.iter().sum::<f64>() / n as f64;
    let mean_y = y.iter().sum::<f64>() / n as f64;

    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for (a, b) in x.iter().zip(y) {
        let (dx, dy) = (a - mean_x, b - mean_y);
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }
    if sxx == 0.0 || syy == 0.0 {
        return Ok(Correlation {
            r: f64::NAN,
            p_value: f64::NAN,
            n,
        });
    }

    let r = (sxy / (sxx * syy).sqrt()).clamp(-1.0, 1.0);
    let p_value = if n == 2 {
        1.0
    } else if r.abs() == 1.0 {
        0.0
    } else {
        let df = (n - 2) as f64;
        regularized_incomplete_beta(df / 2.0, 0.5, 1.0 - r * r)
    };
    Ok(Correlation { r, p_value, n })
}

/// Distinct labels with their row counts, largest first, ties in first-seen order.
pub fn value_counts(labels: &[Option<String>]) -> Vec<(String, usize)> {
    let mut order: Vec<String> = Vec::new();
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for label in labels.iter().flatten() {
        let count = counts.entry(label.as_str()).or_insert(0);
        if *count == 0 {
            order.push(label.clone());
        }
        *count += 1;
    }
    let mut sizes: Vec<(String, usize)> = order
        .into_iter()
        .map(|label| {
            let count = counts[label.as_str()];
            (label, count)
        })
        .collect();
    sizes.sort_by(|a, b| b.1.cmp(&a.1));
    sizes
}

/// Row indices of the `n` largest present values; ties keep table order.
pub fn nlargest(values: &[Option<f64>], n: usize) -> Vec<usize> {
    let mut rows: Vec<(usize, f64)> = values
        .iter()
        .enumerate()
        .filter_map(|(row, v)| v.map(|v| (row, v)))
        .collect();
    rows.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
    rows.into_iter().take(n).map(|(row, _)| row).collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct Histogram {
    /// `bins + 1` edges; the last bin is closed on the right.
    pub edges: Vec<f64>,
    pub counts: Vec<usize>,
}

/// Equal-width bins over the observed range of `data`.
pub fn histogram(data: &[f64], bins: usize) -> Histogram {
    let bins = bins.max(1);
    let (mut lo, mut hi) = data
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    if data.is_empty() {
        lo = 0.0;
        hi = 1.0;
    } else if lo == hi {
        lo -= 0.5;
        hi += 0.5;
    }

    let width = (hi - lo) / bins as f64;
    let edges: Vec<f64> = (0..=bins).map(|i| lo + i as f64 * width).collect();
    let mut counts = vec![0usize; bins];
    for &v in data {
        let bin = (((v - lo) / width) as usize).min(bins - 1);
        counts[bin] += 1;
    }
    Histogram { edges, counts }
}

/// Box-and-whisker summary with whiskers at 1.5 IQR.
#[derive(Debug, Clone, PartialEq)]
pub struct BoxSummary {
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub whisker_low: f64,
    pub whisker_high: f64,
    pub outliers: Vec<f64>,
}

pub fn box_summary(data: &[f64]) -> Option<BoxSummary> {
    if data.is_empty() {
        return None;
    }
    let mut sorted = data.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let q1 = quantile_sorted(&sorted, 0.25);
    let median = quantile_sorted(&sorted, 0.5);
    let q3 = quantile_sorted(&sorted, 0.75);
    let reach = 1.5 * (q3 - q1);
    let (fence_low, fence_high) = (q1 - reach, q3 + reach);

    let whisker_low = sorted
        .iter()
        .copied()
        .find(|&v| v >= fence_low)
        .unwrap_or(q1);
    let whisker_high = sorted
        .iter()
        .rev()
        .copied()
        .find(|&v| v <= fence_high)
        .unwrap_or(q3);
    let outliers = sorted
        .iter()
        .copied()
        .filter(|&v| v < whisker_low || v > whisker_high)
        .collect();

    Some(BoxSummary {
        q1,
        median,
        q3,
        whisker_low,
        whisker_high,
        outliers,
    })
}

/// Regularized incomplete beta function `I_x(a, b)`.
pub fn regularized_incomplete_beta(a: f64, b: f64, x: f64) -> f64 {
    if x <= 0.0 {
        return 0.0;
    }
    if x >= 1.0 {
        return 1.0;
    }

    let ln_front = ln_gamma(a + b) - ln_gamma(a) - ln_gamma(b) + a * x.ln() + b * (1.0 - x).ln();
    let front = ln_front.exp();
    let value = if x < (a + 1.0) / (a + b + 2.0) {
        front * beta_continued_fraction(a, b, x) / a
    } else {
        1.0 - front * beta_continued_fraction(b, a, 1.0 - x) / b
    };
    value.clamp(0.0, 1.0)
}

/// Continued fraction for the incomplete beta (modified Lentz).
fn beta_continued_fraction(a: f64, b: f64, x: f64) -> f64 {
    const MAX_ITER: usize = 500;
    const EPS: f64 = 1e-15;
    const TINY: f64 = 1e-300;

    let qab = a + b;
    let qap = a + 1.0;
    let qam = a - 1.0;

    let mut c = 1.0;
    let mut d = 1.0 - qab * x / qap;
    if d.abs() < TINY {
        d = TINY;
    }
    d = 1.0 / d;
    let mut h = d;

    for m in 1..=MAX_ITER {
        let m = m as f64;
        let m2 = 2.0 * m;

        let aa = m * (b - m) * x / ((qam + m2) * (a + m2));
        d = 1.0 + aa * d;
        if d.abs() < TINY {
            d = TINY;
        }
        c = 1.0 + aa / c;
        if c.abs() < TINY {
            c = TINY;
        }
        d = 1.0 / d;
        h *= d * c;

        let aa = -(a + m) * (qab + m) * x / ((a + m2) * (qap + m2));
        d = 1.0 + aa * d;
        if d.abs() < TINY {
            d = TINY;
        }
        c = 1.0 + aa / c;
        if c.abs() < TINY {
            c = TINY;
        }
        d = 1.0 / d;
        let delta = d * c;
        h *= delta;

        if (delta - 1.0).abs() < EPS {
            break;
        }
    }

    h
}

/// Natural log of the gamma function (Lanczos, g = 7).
pub fn ln_gamma(z: f64) -> f64 {
    const G: f64 = 7.0;
    const COEFFICIENTS: [f64; 9] = [
        0.999_999_999_999_809_9,
        676.520_368_121_885_1,
        -1_259.139_216_722_402_8,
        771.323_428_777_653_1,
        -176.615_029_162_140_6,
        12.507_343_278_686_905,
        -0.138_571_095_265_720_12,
        9.984_369_578_019_572e-6,
        1.505_632_735_149_311_6e-7,
    ];

    if z < 0.5 {
        // Reflection: Γ(z)Γ(1-z) = π / sin(πz)
        return (PI / (PI * z).sin().abs()).ln() - ln_gamma(1.0 - z);
    }

    let z = z - 1.0;
    let mut a = COEFFICIENTS[0];
    let t = z + G + 0.5;
    for (i, &c) in COEFFICIENTS.iter().enumerate().skip(1) {
        a += c / (z + i as f64);
    }
    0.5 * (2.0 * PI).ln() + (z + 0.5) * t.ln() - t + a.ln()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column(values: &[f64]) -> Vec<Option<f64>> {
        values.iter().copied().map(Some).collect()
    }

    #[test]
    fn test_mean_skips_missing() {
        let values = vec![Some(1.0), None, Some(0.0), Some(0.5)];
        assert_eq!(mean(&values), Some(0.5));
        assert_eq!(mean(&[None, None]), None);
    }

    #[test]
    fn test_quantile_interpolates_linearly() {
        let degree = column(&[4.0, 3.0, 2.0, 1.0, 0.0]);
        assert!((quantile(&degree, 0.9).unwrap() - 3.6).abs() < 1e-12);
        assert_eq!(quantile(&degree, 0.5).unwrap(), 2.0);
        assert_eq!(quantile(&degree, 0.0).unwrap(), 0.0);
        assert_eq!(quantile(&degree, 1.0).unwrap(), 4.0);
        assert!(quantile(&[None], 0.5).is_err());
    }

    #[test]
    fn test_pearson_matches_reference_values() {
        let c = pearson(&[1.0, 2.0, 3.0, 4.0, 5.0], &[2.0, 4.0, 5.0, 4.0, 5.0]).unwrap();
        assert!((c.r - 0.774_596_669_241_483_4).abs() < 1e-12);
        assert!((c.p_value - 0.124_027_062_657_554_57).abs() < 1e-9);

        let x: Vec<f64> = (1..=10).map(f64::from).collect();
        let y = [2.0, 1.0, 4.0, 3.0, 7.0, 8.0, 6.0, 9.0, 12.0, 10.0];
        let c = pearson(&x, &y).unwrap();
        assert!((c.r - 0.926_179_711_399_930_2).abs() < 1e-12);
        assert!((c.p_value - 1.187_627_512_851_657_6e-4).abs() < 1e-10);
    }

    #[test]
    fn test_pearson_edge_cases() {
        let c = pearson(&[1.0, 2.0, 3.0], &[2.0, 4.0, 6.0]).unwrap();
        assert_eq!(c.r, 1.0);
        assert_eq!(c.p_value, 0.0);

        let c = pearson(&[1.0, 2.0], &[5.0, 3.0]).unwrap();
        assert_eq!(c.r, -1.0);
        assert_eq!(c.p_value, 1.0);

        let c = pearson(&[1.0, 1.0, 1.0], &[1.0, 2.0, 3.0]).unwrap();
        assert!(c.r.is_nan() && c.p_value.is_nan());

        assert!(pearson(&[1.0], &[1.0]).is_err());
    }

    #[test]
    fn test_pearson_is_bounded_and_repeatable() {
        let x: Vec<f64> = (0..200).map(|i| ((i * 37) % 101) as f64).collect();
        let y: Vec<f64> = (0..200).map(|i| ((i * 53) % 89) as f64 + i as f64 * 0.1).collect();
        let first = pearson(&x, &y).unwrap();
        let second = pearson(&x, &y).unwrap();
        assert!((-1.0..=1.0).contains(&first.r));
        assert_eq!(first.r.to_bits(), second.r.to_bits());
        assert_eq!(first.p_value.to_bits(), second.p_value.to_bits());
    }

    #[test]
    fn test_paired_drops_incomplete_rows() {
        let x = vec![Some(1.0), None, Some(3.0), Some(4.0)];
        let y = vec![Some(2.0), Some(5.0), None, Some(8.0)];
        assert_eq!(paired(&x, &y), (vec![1.0, 4.0], vec![2.0, 8.0]));
    }

    #[test]
    fn test_value_counts_orders_by_size() {
        let labels: Vec<Option<String>> = ["A", "B", "A", "C", "B", "A"]
            .iter()
            .map(|s| Some(s.to_string()))
            .chain(std::iter::once(None))
            .collect();
        assert_eq!(
            value_counts(&labels),
            vec![("A".to_string(), 3), ("B".to_string(), 2), ("C".to_string(), 1)]
        );
    }

    #[test]
    fn test_nlargest_keeps_table_order_on_ties() {
        let values = vec![Some(2.0), Some(5.0), None, Some(5.0), Some(1.0)];
        assert_eq!(nlargest(&values, 3), vec![1, 3, 0]);
        assert_eq!(nlargest(&values, 10).len(), 4);
    }

    #[test]
    fn test_histogram_bins_cover_range() {
        let h = histogram(&[0.0, 1.0, 2.0, 3.0, 4.0], 4);
        assert_eq!(h.edges, vec![0.0, 1.0, 2.0, 3.0, 4.0]);
        assert_eq!(h.counts, vec![1, 1, 1, 2]);

        let h = histogram(&[7.0, 7.0], 50);
        assert_eq!(h.counts.iter().sum::<usize>(), 2);
        assert_eq!(h.edges[0], 6.5);
        assert!((h.edges[50] - 7.5).abs() < 1e-12);
    }

    #[test]
    fn test_box_summary_flags_outliers() {
        let data = [1.0, 2.0, 3.0, 4.0, 5.0, 100.0];
        let summary = box_summary(&data).unwrap();
        assert_eq!(summary.median, 3.5);
        assert_eq!(summary.whisker_low, 1.0);
        assert_eq!(summary.whisker_high, 5.0);
        assert_eq!(summary.outliers, vec![100.0]);
    }

    #[test]
    fn test_ln_gamma_known_values() {
        assert!(ln_gamma(1.0).abs() < 1e-12);
        assert!((ln_gamma(5.0) - 24f64.ln()).abs() < 1e-12);
        assert!((ln_gamma(0.5) - PI.sqrt().ln()).abs() < 1e-12);
    }
}
