// ─────────────────────────────────────────────────────────────────────
// Coherence Kernel — Run Records
// ─────────────────────────────────────────────────────────────────────
//! Append-only per-step series, tail summaries, and detector outputs.
//!
//! The engine writes one [`StepSample`] per step into a [`RunSeries`];
//! dashboards and CSV writers consume the arrays read-only.

use serde::{Deserialize, Serialize};

/// Scalars recorded for a single simulation step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepSample {
    pub step: u64,
    /// Simulated time in seconds (step * dt).
    pub time: f64,
    /// Global Kuramoto order parameter R in [0, 1].
    pub r_global: f64,
    /// Mean phase psi in [0, 2π).
    pub mean_phase: f64,
    /// Cross-edge synchrony in [0, 1].
    pub cross_sync: f64,
    /// Mean absolute one-step wrapped phase change in [0, π].
    pub drift: f64,
    /// Population mean of per-node local coherence in [0, 1].
    pub local_coherence: f64,
    /// Normalised phase entropy in [0, 1].
    pub diversity: f64,
    /// Lag-1 flow smoothness in [0, 1].
    pub smoothness: f64,
    /// Number of crystallised anchors.
    pub anchor_count: u32,
    /// Fraction of nodes locked to the mean phase.
    pub anchor_fraction: f64,
    /// Mean resource level in [0, 1].
    pub resource_mean: f64,
    /// |wrapped gap| between mean phase and driver phase, in [0, π].
    pub gap_to_driver: f64,
    /// Effective base coupling at this step.
    pub coupling: f64,
    /// Effective base noise at this step.
    pub noise: f64,
}

/// Fixed-length, append-only time series for one run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunSeries {
    pub step: Vec<u64>,
    pub time: Vec<f64>,
    pub r_global: Vec<f64>,
    pub mean_phase: Vec<f64>,
    pub cross_sync: Vec<f64>,
    pub drift: Vec<f64>,
    pub local_coherence: Vec<f64>,
    pub diversity: Vec<f64>,
    pub smoothness: Vec<f64>,
    pub anchor_count: Vec<u32>,
    pub anchor_fraction: Vec<f64>,
    pub resource_mean: Vec<f64>,
    pub gap_to_driver: Vec<f64>,
    pub coupling: Vec<f64>,
    pub noise: Vec<f64>,
}

impl RunSeries {
    pub fn with_capacity(steps: usize) -> Self {
        Self {
            step: Vec::with_capacity(steps),
            time: Vec::with_capacity(steps),
            r_global: Vec::with_capacity(steps),
            mean_phase: Vec::with_capacity(steps),
            cross_sync: Vec::with_capacity(steps),
            drift: Vec::with_capacity(steps),
            local_coherence: Vec::with_capacity(steps),
            diversity: Vec::with_capacity(steps),
            smoothness: Vec::with_capacity(steps),
            anchor_count: Vec::with_capacity(steps),
            anchor_fraction: Vec::with_capacity(steps),
            resource_mean: Vec::with_capacity(steps),
            gap_to_driver: Vec::with_capacity(steps),
            coupling: Vec::with_capacity(steps),
            noise: Vec::with_capacity(steps),
        }
    }

    pub fn push(&mut self, s: &StepSample) {
        self.step.push(s.step);
        self.time.push(s.time);
        self.r_global.push(s.r_global);
        self.mean_phase.push(s.mean_phase);
        self.cross_sync.push(s.cross_sync);
        self.drift.push(s.drift);
        self.local_coherence.push(s.local_coherence);
        self.diversity.push(s.diversity);
        self.smoothness.push(s.smoothness);
        self.anchor_count.push(s.anchor_count);
        self.anchor_fraction.push(s.anchor_fraction);
        self.resource_mean.push(s.resource_mean);
        self.gap_to_driver.push(s.gap_to_driver);
        self.coupling.push(s.coupling);
        self.noise.push(s.noise);
    }

    pub fn len(&self) -> usize {
        self.step.len()
    }

    pub fn is_empty(&self) -> bool {
        self.step.is_empty()
    }
}

/// Tail-averaged summary of a completed run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunSummary {
    pub r_tail_mean: f64,
    pub gap_tail_mean: f64,
    pub anchors_tail_mean: f64,
    pub resource_tail_mean: f64,
    pub edges_birthed: u32,
}

/// One detected coherence event: an upward crossing that held.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Event time in seconds.
    pub t_sec: f64,
    /// Step index of the crossing.
    pub step: u64,
    /// Order parameter at the crossing.
    pub r: f64,
    /// Effective coupling at the crossing.
    pub coupling: f64,
}

/// Per-gate outcome of the multi-gate verdict detector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateReport {
    pub coherence_rising: bool,
    pub gap_narrowing: bool,
    pub anchor_persistence: bool,
    pub birth_clustering: bool,
    pub sovereignty_ok: bool,
    /// Conjunction of all five gates.
    pub verdict: bool,

    // Underlying measurements for dashboards and tuning.
    pub r_last: f64,
    pub r_slope: Option<f64>,
    pub gap_slope: Option<f64>,
    pub anchor_fraction_mean: f64,
    pub births: u32,
    pub births_clustered: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(step: u64) -> StepSample {
        StepSample {
            step,
            time: step as f64 * 0.05,
            r_global: 0.5,
            mean_phase: 1.0,
            cross_sync: 0.6,
            drift: 0.1,
            local_coherence: 0.55,
            diversity: 0.8,
            smoothness: 0.9,
            anchor_count: 3,
            anchor_fraction: 0.1,
            resource_mean: 0.5,
            gap_to_driver: 0.4,
            coupling: 0.8,
            noise: 0.03,
        }
    }

    #[test]
    fn test_series_push_keeps_columns_aligned() {
        let mut series = RunSeries::with_capacity(4);
        for t in 0..4 {
            series.push(&sample(t));
        }
        assert_eq!(series.len(), 4);
        assert_eq!(series.step.len(), series.noise.len());
        assert_eq!(series.step[3], 3);
        assert!((series.time[2] - 0.10).abs() < 1e-12);
    }

    #[test]
    fn test_series_empty() {
        let series = RunSeries::default();
        assert!(series.is_empty());
        assert_eq!(series.len(), 0);
    }

    #[test]
    fn test_event_record_roundtrip() {
        let ev = EventRecord {
            t_sec: 2.0,
            step: 100,
            r: 0.95,
            coupling: 0.8,
        };
        let json = serde_json::to_string(&ev).unwrap();
        let back: EventRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ev);
    }
}
