// ─────────────────────────────────────────────────────────────────────
// Coherence Kernel — Flow Indices
// ─────────────────────────────────────────────────────────────────────
//! Composite flow indicators over one step transition, and the
//! breath envelope used to modulate coupling schedules.
//!
//! The hum index rewards balance, not maxima: a fully clamped field
//! (zero diversity) or a turbulent one (zero smoothness) both score 0.

use serde::{Deserialize, Serialize};

use coherence_physics::Adjacency;

use crate::metrics::{
    cross_edge_sync, lag1_smoothness, local_coherence, mean_drift, phase_coherence, phase_entropy,
};

/// All single-step flow metrics in one bundle.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FlowBundle {
    pub r_total: f64,
    pub cross_sync: f64,
    pub drift: f64,
    /// Population mean of per-node local coherence.
    pub local: f64,
    pub diversity: f64,
    pub smoothness: f64,
    pub hum: f64,
    pub clamp_risk: f64,
    pub turbulence: f64,
}

/// Core hum score: geometric blend of coherence, diversity, and
/// gentleness, with soft floors against collapse.
pub fn hum_index(local: f64, diversity: f64, smoothness: f64) -> f64 {
    let eps = 1e-6;
    ((local + eps) * (diversity + eps) * (smoothness + eps)).cbrt()
}

/// High when global order is high while diversity and drift are low.
pub fn clamp_risk(r_total: f64, diversity: f64, drift: f64) -> f64 {
    let r = r_total.clamp(0.0, 1.0);
    let d = diversity.clamp(0.0, 1.0);
    let drift_norm = drift.clamp(0.0, std::f64::consts::PI) / std::f64::consts::PI;
    r * (1.0 - d) * (1.0 - drift_norm)
}

/// Turbulence proxy: low smoothness together with low order.
pub fn turbulence(r_total: f64, smoothness: f64) -> f64 {
    let r = r_total.clamp(0.0, 1.0);
    let s = smoothness.clamp(0.0, 1.0);
    (1.0 - s) * (1.0 - r)
}

/// Compute every flow metric for one step transition.
pub fn metrics_bundle(adj: &Adjacency, now: &[f64], prev: &[f64], entropy_bins: usize) -> FlowBundle {
    let r_total = phase_coherence(now);
    let cross = cross_edge_sync(adj, now);
    let drift = mean_drift(now, prev);
    let local_nodes = local_coherence(adj, now);
    let local = if local_nodes.is_empty() {
        0.0
    } else {
        local_nodes.iter().sum::<f64>() / local_nodes.len() as f64
    };
    let diversity = phase_entropy(now, entropy_bins);
    let smoothness = lag1_smoothness(now, prev);
    FlowBundle {
        r_total,
        cross_sync: cross,
        drift,
        local,
        diversity,
        smoothness,
        hum: hum_index(local, diversity, smoothness),
        clamp_risk: clamp_risk(r_total, diversity, drift),
        turbulence: turbulence(r_total, smoothness),
    }
}

/// Cosine easing of x ∈ [0, 1] with smooth start and stop.
pub fn cosine_ease01(x: f64) -> f64 {
    let x = x.clamp(0.0, 1.0);
    0.5 - 0.5 * (std::f64::consts::PI * x).cos()
}

/// Breath envelope e(t) ∈ [0, 1]: inhale ramp up over the first
/// `inhale_ratio` of the period, exhale ramp down over the rest.
pub fn breath_envelope(t: f64, period: f64, inhale_ratio: f64) -> f64 {
    let period = period.max(1e-9);
    let inhale = inhale_ratio.max(1e-9) * period;
    let tm = t.rem_euclid(period);
    if tm <= inhale {
        cosine_ease01(tm / inhale)
    } else {
        1.0 - cosine_ease01((tm - inhale) / (period - inhale).max(1e-9))
    }
}

/// Breath-modulated coupling between `k_min` and `k_max`.
pub fn coupling_breath(k_min: f64, k_max: f64, t: f64, period: f64, inhale_ratio: f64) -> f64 {
    let e = breath_envelope(t, period, inhale_ratio);
    (1.0 - e) * k_min + e * k_max
}

#[cfg(test)]
mod tests {
    use super::*;
    use coherence_physics::TopologyShape;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_hum_rewards_balance_over_maxima() {
        let balanced = hum_index(0.7, 0.7, 0.7);
        let clamped = hum_index(1.0, 0.0, 1.0);
        assert!(balanced > 0.69);
        assert!(clamped < 0.02, "zero diversity collapses the hum, got {clamped}");
    }

    #[test]
    fn test_clamp_risk_peaks_on_frozen_order() {
        assert!((clamp_risk(1.0, 0.0, 0.0) - 1.0).abs() < 1e-12);
        assert!(clamp_risk(1.0, 1.0, 0.0) < 1e-12, "diverse field carries no clamp risk");
    }

    #[test]
    fn test_turbulence_needs_both_low() {
        assert!((turbulence(0.0, 0.0) - 1.0).abs() < 1e-12);
        assert!(turbulence(1.0, 0.0) < 1e-12);
        assert!(turbulence(0.0, 1.0) < 1e-12);
    }

    #[test]
    fn test_bundle_fields_in_range() {
        let adj = Adjacency::build(
            &TopologyShape::Ring { nodes: 16 },
            &mut ChaCha8Rng::seed_from_u64(0),
        );
        let prev: Vec<f64> = (0..16).map(|i| i as f64 * 0.39).collect();
        let now: Vec<f64> = prev.iter().map(|v| v + 0.05).collect();
        let b = metrics_bundle(&adj, &now, &prev, 36);
        for v in [
            b.r_total, b.cross_sync, b.local, b.diversity, b.smoothness, b.hum, b.clamp_risk,
            b.turbulence,
        ] {
            assert!((0.0..=1.0).contains(&v), "bundle value {v} out of range");
        }
        assert!((0.0..=std::f64::consts::PI).contains(&b.drift));
        assert!(b.smoothness > 0.99, "uniform small step is smooth");
    }

    #[test]
    fn test_breath_envelope_endpoints() {
        assert!(breath_envelope(0.0, 20.0, 0.5) < 1e-12);
        assert!((breath_envelope(10.0, 20.0, 0.5) - 1.0).abs() < 1e-12);
        // full period returns to the start
        assert!(breath_envelope(20.0, 20.0, 0.5) < 1e-12);
    }

    #[test]
    fn test_coupling_breath_spans_band() {
        let lo = coupling_breath(0.4, 0.8, 0.0, 20.0, 0.5);
        let hi = coupling_breath(0.4, 0.8, 10.0, 20.0, 0.5);
        assert!((lo - 0.4).abs() < 1e-9);
        assert!((hi - 0.8).abs() < 1e-9);
    }
}
