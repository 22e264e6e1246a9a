// ─────────────────────────────────────────────────────────────────────
// Coherence Kernel — Anchor Crystallisation
// ─────────────────────────────────────────────────────────────────────
//! Resource tank and anchor state per node.
//!
//! Promotion needs a full crystallisation window of local coherence at
//! or above threshold plus sufficient resource; once promoted, a node
//! stays an anchor until starvation decay drops it. The anchor set
//! feeds back into the field through coupling and noise profiles.

use rand::Rng;
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};

use coherence_physics::Adjacency;

/// Crystallisation parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrystalConfig {
    /// Sliding-window length W for local coherence, in steps.
    pub window: usize,
    /// Windowed mean local coherence required for promotion.
    pub coherence_threshold: f64,
    /// Resource level required for promotion.
    pub resource_threshold: f64,
    /// Absolute coupling increment for anchors and their neighbours.
    pub anchor_boost: f64,
    /// Noise reduction applied to anchor nodes (floored at zero).
    pub anchor_noise_drop: f64,
    /// Half-life, in steps, of a starved anchor.
    pub half_life: u32,
    /// Resource level below which an anchor starves.
    pub starve_threshold: f64,
    /// Resource gain rate from above-midpoint local coherence.
    pub resource_gain: f64,
    /// Resource leak rate back toward the midpoint.
    pub resource_leak: f64,
    /// Multiplicative resource noise level.
    pub resource_noise: f64,
    /// Initial resource level (perturbed at seeding).
    pub resource_init: f64,
}

impl Default for CrystalConfig {
    fn default() -> Self {
        Self {
            window: 80,
            coherence_threshold: 0.84,
            resource_threshold: 0.55,
            anchor_boost: 0.6,
            anchor_noise_drop: 0.02,
            half_life: 700,
            starve_threshold: 0.35,
            resource_gain: 0.33,
            resource_leak: 0.20,
            resource_noise: 0.02,
            resource_init: 0.55,
        }
    }
}

/// Probability that a starved anchor of the given age drops this step:
/// 1 - 0.5^(age / half_life).
pub fn drop_probability(age: u32, half_life: u32) -> f64 {
    let hl = half_life.max(1) as f64;
    1.0 - 0.5f64.powf(age as f64 / hl)
}

/// Per-node resource and anchor state with the crystallisation window.
#[derive(Debug, Clone)]
pub struct CrystalField {
    cfg: CrystalConfig,
    n: usize,
    pub resource: Vec<f64>,
    pub is_anchor: Vec<bool>,
    anchor_age: Vec<u32>,
    // Circular window buffer, window rows of n local-coherence samples.
    window_buf: Vec<f64>,
    wptr: usize,
    warm: usize,
}

impl CrystalField {
    /// Seed resources around `resource_init` with a small perturbation.
    pub fn seeded(n: usize, cfg: CrystalConfig, rng: &mut impl Rng) -> Self {
        let mut resource = vec![0.0; n];
        for r in resource.iter_mut() {
            let g: f64 = rng.sample(StandardNormal);
            *r = (cfg.resource_init + 0.05 * g).clamp(0.0, 1.0);
        }
        let window = cfg.window.max(1);
        Self {
            window_buf: vec![0.0; window * n],
            wptr: 0,
            warm: 0,
            resource,
            is_anchor: vec![false; n],
            anchor_age: vec![0; n],
            n,
            cfg,
        }
    }

    pub fn n(&self) -> usize {
        self.n
    }

    pub fn config(&self) -> &CrystalConfig {
        &self.cfg
    }

    /// Record one step of per-node local coherence into the window.
    pub fn observe(&mut self, local_r: &[f64]) -> Result<(), &'static str> {
        if local_r.len() != self.n {
            return Err("local coherence length mismatch");
        }
        let window = self.cfg.window.max(1);
        let row = self.wptr * self.n;
        self.window_buf[row..row + self.n].copy_from_slice(local_r);
        self.wptr = (self.wptr + 1) % window;
        self.warm = (self.warm + 1).min(window);
        Ok(())
    }

    /// True once W consecutive samples have been recorded.
    pub fn is_warm(&self) -> bool {
        self.warm == self.cfg.window.max(1)
    }

    /// Windowed mean local coherence per node; None until warm.
    pub fn windowed_coherence(&self) -> Option<Vec<f64>> {
        if !self.is_warm() {
            return None;
        }
        let window = self.cfg.window.max(1);
        let mut mean = vec![0.0; self.n];
        for row in 0..window {
            let base = row * self.n;
            for (i, m) in mean.iter_mut().enumerate() {
                *m += self.window_buf[base + i];
            }
        }
        for m in mean.iter_mut() {
            *m /= window as f64;
        }
        Some(mean)
    }

    /// Promote qualifying nodes. Runs every step once warm; a node must
    /// not already be an anchor, and must clear both thresholds.
    pub fn promote(&mut self) -> Vec<usize> {
        let mut promoted = Vec::new();
        let Some(windowed) = self.windowed_coherence() else {
            return promoted;
        };
        for i in 0..self.n {
            if !self.is_anchor[i]
                && windowed[i] >= self.cfg.coherence_threshold
                && self.resource[i] >= self.cfg.resource_threshold
            {
                self.is_anchor[i] = true;
                self.anchor_age[i] = 0;
                promoted.push(i);
            }
        }
        promoted
    }

    /// Age anchors and drop starved ones by the half-life law.
    pub fn decay(&mut self, rng: &mut impl Rng) -> Vec<usize> {
        let mut dropped = Vec::new();
        for i in 0..self.n {
            if !self.is_anchor[i] {
                continue;
            }
            self.anchor_age[i] = self.anchor_age[i].saturating_add(1);
            if self.resource[i] >= self.cfg.starve_threshold {
                continue;
            }
            let p = drop_probability(self.anchor_age[i], self.cfg.half_life);
            if rng.gen::<f64>() < p {
                self.is_anchor[i] = false;
                self.anchor_age[i] = 0;
                dropped.push(i);
            }
        }
        dropped
    }

    /// Coupling multipliers: nodes that are anchors or touch one get
    /// 1 + boost / K_base, so the boost reads as an absolute increment.
    pub fn coupling_profile(&self, adj: &Adjacency, k_base: f64) -> Vec<f64> {
        let bonus = self.cfg.anchor_boost / k_base.max(1e-6);
        let mut scale = vec![1.0; self.n];
        for i in 0..self.n {
            if self.is_anchor[i] || adj.neighbors(i).any(|j| self.is_anchor[j]) {
                scale[i] += bonus;
            }
        }
        scale
    }

    /// Per-node noise levels: anchors run quieter, floored at zero.
    pub fn noise_profile(&self, base_noise: f64) -> Vec<f64> {
        self.is_anchor
            .iter()
            .map(|&anchor| {
                if anchor {
                    (base_noise - self.cfg.anchor_noise_drop).max(0.0)
                } else {
                    base_noise
                }
            })
            .collect()
    }

    /// Resource tank update from the current local coherence.
    ///
    /// r rises when local coherence exceeds the 0.5 midpoint, leaks back
    /// toward 0.5 otherwise, plus independent noise; clipped to [0, 1].
    pub fn update_resources(
        &mut self,
        local_r: &[f64],
        dt: f64,
        rng: &mut impl Rng,
    ) -> Result<(), &'static str> {
        if local_r.len() != self.n {
            return Err("local coherence length mismatch");
        }
        let sqrt_dt = dt.sqrt();
        for (r, &lr) in self.resource.iter_mut().zip(local_r.iter()) {
            let gain = self.cfg.resource_gain * (lr - 0.5);
            let leak = self.cfg.resource_leak * (*r - 0.5);
            let g: f64 = rng.sample(StandardNormal);
            *r = (*r + (gain - leak) * dt + self.cfg.resource_noise * sqrt_dt * g).clamp(0.0, 1.0);
        }
        Ok(())
    }

    pub fn anchor_count(&self) -> u32 {
        self.is_anchor.iter().filter(|&&a| a).count() as u32
    }

    pub fn anchor_fraction(&self) -> f64 {
        if self.n == 0 {
            return 0.0;
        }
        self.anchor_count() as f64 / self.n as f64
    }

    pub fn resource_mean(&self) -> f64 {
        if self.n == 0 {
            return 0.0;
        }
        self.resource.iter().sum::<f64>() / self.n as f64
    }

    #[cfg(test)]
    pub(crate) fn force_anchor(&mut self, i: usize, age: u32) {
        self.is_anchor[i] = true;
        self.anchor_age[i] = age;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coherence_physics::TopologyShape;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn rng(seed: u64) -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(seed)
    }

    fn small_cfg() -> CrystalConfig {
        CrystalConfig {
            window: 5,
            ..CrystalConfig::default()
        }
    }

    #[test]
    fn test_drop_probability_shape() {
        assert_eq!(drop_probability(0, 700), 0.0);
        assert!((drop_probability(700, 700) - 0.5).abs() < 1e-12);
        // strictly increasing in age
        let mut prev = -1.0;
        for age in 0..2000 {
            let p = drop_probability(age, 700);
            assert!(p > prev, "p must grow with age");
            assert!((0.0..1.0).contains(&p));
            prev = p;
        }
    }

    #[test]
    fn test_no_promotion_before_window_full() {
        let mut field = CrystalField::seeded(10, small_cfg(), &mut rng(1));
        field.resource = vec![1.0; 10];
        let high = vec![0.99; 10];
        for _ in 0..4 {
            field.observe(&high).unwrap();
            assert!(
                field.promote().is_empty(),
                "promotion must wait for a full window"
            );
        }
        field.observe(&high).unwrap();
        assert_eq!(field.promote().len(), 10);
    }

    #[test]
    fn test_promotion_requires_both_thresholds() {
        let mut field = CrystalField::seeded(2, small_cfg(), &mut rng(2));
        field.resource = vec![0.9, 0.1]; // node 1 under-resourced
        for _ in 0..5 {
            field.observe(&[0.95, 0.95]).unwrap();
        }
        let promoted = field.promote();
        assert_eq!(promoted, vec![0]);
        assert!(field.is_anchor[0]);
        assert!(!field.is_anchor[1]);
    }

    #[test]
    fn test_promotion_runs_every_step_after_warmup() {
        let mut field = CrystalField::seeded(1, small_cfg(), &mut rng(3));
        field.resource = vec![0.2];
        for _ in 0..5 {
            field.observe(&[0.95]).unwrap();
        }
        assert!(field.promote().is_empty(), "resource still too low");
        field.resource = vec![0.9];
        field.observe(&[0.95]).unwrap();
        assert_eq!(field.promote(), vec![0], "check re-runs once conditions hold");
    }

    #[test]
    fn test_fed_anchor_never_decays() {
        let mut field = CrystalField::seeded(1, small_cfg(), &mut rng(4));
        field.force_anchor(0, 0);
        field.resource = vec![0.8];
        let mut r = rng(5);
        for _ in 0..5000 {
            assert!(field.decay(&mut r).is_empty());
        }
        assert!(field.is_anchor[0]);
    }

    #[test]
    fn test_starved_anchor_eventually_drops() {
        let cfg = CrystalConfig {
            half_life: 50,
            ..small_cfg()
        };
        let mut field = CrystalField::seeded(1, cfg, &mut rng(6));
        field.force_anchor(0, 0);
        field.resource = vec![0.1];
        let mut r = rng(7);
        let mut dropped_at = None;
        for step in 0..5000 {
            if !field.decay(&mut r).is_empty() {
                dropped_at = Some(step);
                break;
            }
        }
        assert!(dropped_at.is_some(), "starved anchor must decay");
        assert!(!field.is_anchor[0]);
    }

    #[test]
    fn test_coupling_profile_reaches_neighbours() {
        let adj = Adjacency::build(&TopologyShape::Ring { nodes: 5 }, &mut rng(0));
        let mut field = CrystalField::seeded(5, small_cfg(), &mut rng(8));
        field.force_anchor(0, 0);
        let scale = field.coupling_profile(&adj, 0.6);
        let bonus = 0.6 / 0.6;
        assert!((scale[0] - (1.0 + bonus)).abs() < 1e-12, "anchor itself");
        assert!((scale[1] - (1.0 + bonus)).abs() < 1e-12, "ring neighbour");
        assert!((scale[4] - (1.0 + bonus)).abs() < 1e-12, "other ring neighbour");
        assert!((scale[2] - 1.0).abs() < 1e-12, "two hops away is untouched");
    }

    #[test]
    fn test_noise_profile_floored_at_zero() {
        let mut field = CrystalField::seeded(2, small_cfg(), &mut rng(9));
        field.force_anchor(0, 0);
        let profile = field.noise_profile(0.01);
        assert_eq!(profile[0], 0.0, "0.01 - 0.02 floors at zero");
        assert!((profile[1] - 0.01).abs() < 1e-12);
    }

    #[test]
    fn test_resources_stay_clipped() {
        let mut field = CrystalField::seeded(20, small_cfg(), &mut rng(10));
        let mut r = rng(11);
        for _ in 0..2000 {
            field.update_resources(&vec![1.0; 20], 0.05, &mut r).unwrap();
        }
        assert!(field.resource.iter().all(|&v| (0.0..=1.0).contains(&v)));
        // sustained high coherence should have filled the tanks
        assert!(field.resource_mean() > 0.8, "mean {}", field.resource_mean());
    }

    #[test]
    fn test_resources_leak_toward_midpoint() {
        let cfg = CrystalConfig {
            resource_noise: 0.0,
            ..small_cfg()
        };
        let mut field = CrystalField::seeded(1, cfg, &mut rng(12));
        field.resource = vec![1.0];
        let mut r = rng(13);
        for _ in 0..4000 {
            field.update_resources(&[0.5], 0.05, &mut r).unwrap();
        }
        assert!(
            (field.resource[0] - 0.5).abs() < 0.02,
            "neutral coherence settles at the midpoint, got {}",
            field.resource[0]
        );
    }

    #[test]
    fn test_observe_length_checked() {
        let mut field = CrystalField::seeded(4, small_cfg(), &mut rng(14));
        assert!(field.observe(&[0.5; 3]).is_err());
    }
}
