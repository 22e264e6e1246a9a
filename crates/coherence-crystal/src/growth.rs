// ─────────────────────────────────────────────────────────────────────
// Coherence Kernel — Edge Birth
// ─────────────────────────────────────────────────────────────────────
//! Creation events: coherent, resourced nodes permanently gain new
//! long-range edges, under a finite total budget. This is the only
//! place the adjacency mutates after construction — edges are only
//! ever added, never removed, and never duplicate an existing pair.

use rand::Rng;
use serde::{Deserialize, Serialize};

use coherence_physics::Adjacency;

/// Edge-birth parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrowthConfig {
    /// Steps between growth checks.
    pub every: u64,
    /// Total edges that may be birthed over the whole run.
    pub budget: u32,
    /// Batch size bounds per growth check (inclusive).
    pub batch_min: u32,
    pub batch_max: u32,
    /// Windowed local coherence required for eligibility.
    pub require_coherence: f64,
    /// Resource level required for eligibility.
    pub require_resource: f64,
}

impl Default for GrowthConfig {
    fn default() -> Self {
        Self {
            every: 200,
            budget: 80,
            batch_min: 3,
            batch_max: 8,
            require_coherence: 0.80,
            require_resource: 0.55,
        }
    }
}

/// One permanent edge added during the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeBirth {
    pub step: u64,
    pub source: usize,
    pub target: usize,
}

/// Budgeted edge-birth process.
#[derive(Debug, Clone)]
pub struct EdgeGrowth {
    cfg: GrowthConfig,
    remaining: u32,
}

impl EdgeGrowth {
    pub fn new(cfg: GrowthConfig) -> Self {
        let remaining = cfg.budget;
        Self { cfg, remaining }
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    /// Attempt a growth batch at this step.
    ///
    /// Fires only on the configured cadence, with budget left and a warm
    /// crystallisation window (`windowed_coherence` is None before that).
    /// Eligible nodes clear both thresholds; each batch member gains one
    /// edge to a uniformly chosen non-neighbour, skipping nodes with no
    /// valid target.
    pub fn try_grow(
        &mut self,
        step: u64,
        windowed_coherence: Option<&[f64]>,
        resource: &[f64],
        adj: &mut Adjacency,
        rng: &mut impl Rng,
    ) -> Vec<EdgeBirth> {
        let mut births = Vec::new();
        if self.remaining == 0 || self.cfg.every == 0 || step % self.cfg.every != 0 {
            return births;
        }
        let Some(windowed) = windowed_coherence else {
            return births;
        };
        let n = adj.n();
        let eligible: Vec<usize> = (0..n)
            .filter(|&i| {
                windowed[i] >= self.cfg.require_coherence && resource[i] >= self.cfg.require_resource
            })
            .collect();
        if eligible.len() < 2 {
            return births;
        }

        let hi = self.cfg.batch_max.max(self.cfg.batch_min);
        let batch = rng.gen_range(self.cfg.batch_min..=hi).min(self.remaining);
        for _ in 0..batch {
            let u = eligible[rng.gen_range(0..eligible.len())];
            let pool: Vec<usize> = (0..n).filter(|&v| v != u && !adj.has_edge(u, v)).collect();
            if pool.is_empty() {
                continue;
            }
            let v = pool[rng.gen_range(0..pool.len())];
            if adj.add_edge(u, v, 1.0).is_ok() {
                births.push(EdgeBirth { step, source: u, target: v });
                self.remaining -= 1;
                if self.remaining == 0 {
                    break;
                }
            }
        }
        births
    }
}
