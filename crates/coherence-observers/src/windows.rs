// ─────────────────────────────────────────────────────────────────────
// Coherence Kernel — Windowed Metrics
// ─────────────────────────────────────────────────────────────────────
//! Trend slopes, tail averages, and sliding-window series. Every
//! helper reports an explicit marker (None or an empty vector) when
//! the data cannot fill a window, never a value from a partial one.

use crate::metrics::phase_entropy;
use crate::pairwise::plv_pair;

/// Least-squares slope over the last `w` samples.
///
/// Returns None when `w < 2` or the series is shorter than `w`.
pub fn poly_slope(y: &[f64], w: usize) -> Option<f64> {
    if w < 2 || y.len() < w {
        return None;
    }
    let tail = &y[y.len() - w..];
    let n = w as f64;
    let x_mean = (n - 1.0) / 2.0;
    let y_mean = tail.iter().sum::<f64>() / n;
    let mut num = 0.0;
    let mut den = 0.0;
    for (k, &v) in tail.iter().enumerate() {
        let dx = k as f64 - x_mean;
        num += dx * (v - y_mean);
        den += dx * dx;
    }
    if den <= 0.0 {
        return None;
    }
    Some(num / den)
}

/// Mean of the trailing `frac` of a series (frac clamped to (0, 1]).
///
/// NaN for an empty series.
pub fn tail_mean(y: &[f64], frac: f64) -> f64 {
    if y.is_empty() {
        return f64::NAN;
    }
    let frac = frac.clamp(f64::EPSILON, 1.0);
    let start = ((y.len() as f64) * (1.0 - frac)).floor() as usize;
    let start = start.min(y.len() - 1);
    let tail = &y[start..];
    tail.iter().sum::<f64>() / tail.len() as f64
}

/// Time-resolved PLV between two phase series over sliding windows.
///
/// Empty output when either series is shorter than the window.
pub fn sliding_plv(a: &[f64], b: &[f64], win: usize, step: usize) -> Vec<f64> {
    let t = a.len().min(b.len());
    let win = win.max(2);
    let step = step.max(1);
    let mut out = Vec::new();
    if t < win {
        return out;
    }
    let mut start = 0;
    while start + win <= t {
        out.push(plv_pair(&a[start..start + win], &b[start..start + win]));
        start += step;
    }
    out
}

/// Sliding normalised phase entropy of one phase series.
pub fn sliding_entropy(theta: &[f64], win: usize, bins: usize, step: usize) -> Vec<f64> {
    let win = win.max(4);
    let step = step.max(1);
    let mut out = Vec::new();
    if theta.len() < win {
        return out;
    }
    let mut start = 0;
    while start + win <= theta.len() {
        out.push(phase_entropy(&theta[start..start + win], bins));
        start += step;
    }
    out
}
