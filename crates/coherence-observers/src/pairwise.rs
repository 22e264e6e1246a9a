// ─────────────────────────────────────────────────────────────────────
// Coherence Kernel — Pairwise Phase Locking
// ─────────────────────────────────────────────────────────────────────
//! Phase-locking value, its unbiased pairwise-phase-consistency
//! variant, and stochastic drift estimates over phase histories.
//! Histories are time-major: `history[t][i]` is node i at step t.

use coherence_physics::angle_diff;

/// Phase-locking value between two equal-length phase series:
/// |mean_t e^{i(a_t - b_t)}| ∈ [0, 1]. Empty input reports 0.
pub fn plv_pair(a: &[f64], b: &[f64]) -> f64 {
    let n = a.len().min(b.len());
    if n == 0 {
        return 0.0;
    }
    let (mut s, mut c) = (0.0, 0.0);
    for (&x, &y) in a.iter().zip(b.iter()) {
        let d = angle_diff(x, y);
        s += d.sin();
        c += d.cos();
    }
    let m = n as f64;
    ((s / m).powi(2) + (c / m).powi(2)).sqrt().clamp(0.0, 1.0)
}

/// Unbiased pairwise phase consistency (Vinck et al. 2010):
/// (|Σ z|² - N) / (N (N - 1)) with z = e^{iΔφ_t}.
///
/// Corrects the small-sample bias of the plain PLV estimator;
/// 0 for fewer than two samples.
pub fn ppc_pair(a: &[f64], b: &[f64]) -> f64 {
    let n = a.len().min(b.len());
    if n < 2 {
        return 0.0;
    }
    let (mut s, mut c) = (0.0, 0.0);
    for (&x, &y) in a.iter().zip(b.iter()) {
        let d = angle_diff(x, y);
        s += d.sin();
        c += d.cos();
    }
    let nf = n as f64;
    let mag_sq = s * s + c * c;
    (mag_sq - nf) / (nf * (nf - 1.0))
}

/// PLV for all node pairs of a time-major history.
///
/// Returns an n×n row-major symmetric matrix with ones on the diagonal;
/// all zeros when the history is empty.
pub fn plv_matrix(history: &[Vec<f64>], n: usize) -> Vec<f64> {
    let mut out = vec![0.0; n * n];
    if history.is_empty() {
        return out;
    }
    let t = history.len();
    for i in 0..n {
        out[i * n + i] = 1.0;
        for j in (i + 1)..n {
            let (mut s, mut c) = (0.0, 0.0);
            for row in history {
                let d = angle_diff(row[i], row[j]);
                s += d.sin();
                c += d.cos();
            }
            let m = t as f64;
            let val = ((s / m).powi(2) + (c / m).powi(2)).sqrt().clamp(0.0, 1.0);
            out[i * n + j] = val;
            out[j * n + i] = val;
        }
    }
    out
}

/// Diffusion coefficient per node from wrapped phase increments:
/// D ≈ Var(Δφ) / (2 Δt). Zeros for histories shorter than two steps.
pub fn phase_diffusion(history: &[Vec<f64>], dt: f64) -> Vec<f64> {
    if history.len() < 2 {
        return history.first().map_or(Vec::new(), |row| vec![0.0; row.len()]);
    }
    let n = history[0].len();
    let steps = history.len() - 1;
    let mut mean = vec![0.0; n];
    for t in 1..history.len() {
        for i in 0..n {
            mean[i] += angle_diff(history[t][i], history[t - 1][i]);
        }
    }
    for m in mean.iter_mut() {
        *m /= steps as f64;
    }
    let mut var = vec![0.0; n];
    for t in 1..history.len() {
        for i in 0..n {
            let d = angle_diff(history[t][i], history[t - 1][i]) - mean[i];
            var[i] += d * d;
        }
    }
    let denom = 2.0 * dt.max(1e-12);
    var.iter().map(|v| (v / steps as f64) / denom).collect()
}

/// Windowed diffusion estimates over time.
///
/// Row t holds the estimate from the `win` increments ending at t;
/// rows before the first full window are NaN.
pub fn phase_diffusion_windowed(history: &[Vec<f64>], dt: f64, win: usize) -> Vec<Vec<f64>> {
    if history.len() < 2 {
        return Vec::new();
    }
    let n = history[0].len();
    let win = win.max(2);
    let steps = history.len() - 1;
    let mut out = vec![vec![f64::NAN; n]; steps];
    if steps < win {
        return out;
    }
    for t in win..=steps {
        let segment = &history[t - win..=t];
        let d = phase_diffusion(segment, dt);
        out[t - 1] = d;
    }
    out
}
