// ─────────────────────────────────────────────────────────────────────
// Coherence Kernel — Snapshot Metrics
// ─────────────────────────────────────────────────────────────────────
//! Instantaneous metrics over one phase snapshot (plus, for the lag-1
//! family, the previous snapshot).

use serde::{Deserialize, Serialize};

use coherence_physics::{angle_diff, order_parameter, wrap_phase, Adjacency};

/// Observer configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Radians within the mean phase that count as "locked".
    pub anchor_eps: f64,
    /// Consecutive locked steps required (1 = instantaneous).
    pub anchor_window: usize,
    /// Samples used for trend-slope estimates.
    pub trend_window: usize,
    /// Histogram bins for phase entropy.
    pub entropy_bins: usize,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            anchor_eps: 0.35,
            anchor_window: 1,
            trend_window: 400,
            entropy_bins: 36,
        }
    }
}

/// Global order-parameter magnitude R ∈ [0, 1].
pub fn phase_coherence(theta: &[f64]) -> f64 {
    order_parameter(theta).0
}

/// Mean cosine over symmetrised positive-weight edges, remapped to
/// [0, 1]. Reports 0 when the graph has no edges.
pub fn cross_edge_sync(adj: &Adjacency, theta: &[f64]) -> f64 {
    let n = adj.n().min(theta.len());
    let mut sum = 0.0;
    let mut count = 0usize;
    for i in 0..n {
        for j in (i + 1)..n {
            if adj.weight(i, j) > 0.0 {
                sum += (theta[j] - theta[i]).cos();
                count += 1;
            }
        }
    }
    if count == 0 {
        return 0.0;
    }
    (sum / count as f64 + 1.0) * 0.5
}

/// Per-node local coherence: phasor magnitude over the node and its
/// direct neighbours. Isolated nodes report 0.
pub fn local_coherence(adj: &Adjacency, theta: &[f64]) -> Vec<f64> {
    let n = adj.n().min(theta.len());
    let mut out = vec![0.0; n];
    for (i, o) in out.iter_mut().enumerate() {
        let mut sum_sin = theta[i].sin();
        let mut sum_cos = theta[i].cos();
        let mut count = 1usize;
        for j in adj.neighbors(i) {
            sum_sin += theta[j].sin();
            sum_cos += theta[j].cos();
            count += 1;
        }
        if count > 1 {
            let m = count as f64;
            *o = ((sum_sin / m).powi(2) + (sum_cos / m).powi(2)).sqrt().clamp(0.0, 1.0);
        }
    }
    out
}

/// Normalised Shannon entropy of the wrapped phase histogram, in [0, 1].
///
/// 0 = all mass in one bin (fully clamped), 1 = uniform (fully diverse).
/// An empty population reports 0.
pub fn phase_entropy(theta: &[f64], bins: usize) -> f64 {
    let bins = bins.max(2);
    if theta.is_empty() {
        return 0.0;
    }
    let tau = std::f64::consts::TAU;
    let mut counts = vec![0u32; bins];
    for &th in theta {
        let bin = ((wrap_phase(th) / tau) * bins as f64) as usize;
        counts[bin.min(bins - 1)] += 1;
    }
    let total = theta.len() as f64;
    let mut entropy = 0.0;
    for &c in &counts {
        if c > 0 {
            let p = c as f64 / total;
            entropy -= p * p.ln();
        }
    }
    (entropy / (bins as f64).ln()).clamp(0.0, 1.0)
}

/// Lag-1 flow smoothness: mean cos of the wrapped one-step phase
/// change, remapped to [0, 1]. Near 1 = gentle evolution, near 0 = jitter.
pub fn lag1_smoothness(now: &[f64], prev: &[f64]) -> f64 {
    let n = now.len().min(prev.len());
    if n == 0 {
        return 0.0;
    }
    let sum: f64 = now
        .iter()
        .zip(prev.iter())
        .map(|(&a, &b)| angle_diff(a, b).cos())
        .sum();
    (sum / n as f64 + 1.0) * 0.5
}

/// Mean absolute wrapped one-step phase change, bounded in [0, π].
pub fn mean_drift(now: &[f64], prev: &[f64]) -> f64 {
    let n = now.len().min(prev.len());
    if n == 0 {
        return 0.0;
    }
    now.iter()
        .zip(prev.iter())
        .map(|(&a, &b)| angle_diff(a, b).abs())
        .sum::<f64>()
        / n as f64
}

/// Instantaneous fraction of nodes within `eps` of the mean phase `psi`.
pub fn anchor_fraction(theta: &[f64], psi: f64, eps: f64) -> f64 {
    if theta.is_empty() {
        return 0.0;
    }
    let locked = theta
        .iter()
        .filter(|&&th| angle_diff(th, psi).abs() <= eps)
        .count();
    locked as f64 / theta.len() as f64
}

/// Rolling lock memory: a node counts only if it stayed within `eps`
/// of the mean phase for every recorded step of the window.
///
/// Until the window fills, the requirement covers the steps recorded
/// so far, so early values converge smoothly onto the full-window rule.
#[derive(Debug, Clone)]
pub struct LockTracker {
    n: usize,
    window: usize,
    buf: Vec<bool>,
    wptr: usize,
    warm: usize,
}

impl LockTracker {
    pub fn new(n: usize, window: usize) -> Self {
        let window = window.max(1);
        Self {
            n,
            window,
            buf: vec![false; window * n],
            wptr: 0,
            warm: 0,
        }
    }

    /// Record this step's locks and return the sustained fraction.
    pub fn update(&mut self, theta: &[f64], psi: f64, eps: f64) -> f64 {
        debug_assert_eq!(theta.len(), self.n);
        let row = self.wptr * self.n;
        for (i, &th) in theta.iter().enumerate().take(self.n) {
            self.buf[row + i] = angle_diff(th, psi).abs() <= eps;
        }
        self.wptr = (self.wptr + 1) % self.window;
        self.warm = (self.warm + 1).min(self.window);

        let mut locked = 0usize;
        for i in 0..self.n {
            let mut all = true;
            for row in 0..self.warm {
                if !self.buf[row * self.n + i] {
                    all = false;
                    break;
                }
            }
            if all {
                locked += 1;
            }
        }
        if self.n == 0 {
            0.0
        } else {
            locked as f64 / self.n as f64
        }
    }
}
