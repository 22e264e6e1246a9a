// ─────────────────────────────────────────────────────────────────────
// Coherence Kernel — Multi-Layer Field
// ─────────────────────────────────────────────────────────────────────
//! L coupled layers over the same node population. Each layer carries
//! its own adjacency and phase vector; an inter-layer term pulls every
//! node's phase in layer l toward the circular mean of that node's own
//! phases across all layers, scaled by the permeability γ_x.
//!
//! The cross-layer means are taken from the pre-step snapshot for all
//! layers, never layer-by-layer within a step, so the update carries no
//! order-dependent bias.

use rand::Rng;
use rand_distr::StandardNormal;

use crate::phase::{order_parameter, wrap_phase};
use crate::topology::Adjacency;

/// One layer: its adjacency and its phase vector.
#[derive(Debug, Clone)]
pub struct Layer {
    pub adjacency: Adjacency,
    pub theta: Vec<f64>,
}

/// Multi-layer phase field with shared natural frequencies.
#[derive(Debug, Clone)]
pub struct MultilayerField {
    pub layers: Vec<Layer>,
    pub omega: Vec<f64>,
    pub dt: f64,
    // Pre-allocated scratch, one row per layer
    dtheta: Vec<Vec<f64>>,
}

impl MultilayerField {
    /// Build from per-layer adjacencies; all must share the node count.
    pub fn new(adjacencies: Vec<Adjacency>, dt: f64) -> Result<Self, &'static str> {
        if adjacencies.is_empty() {
            return Err("at least one layer required");
        }
        let n = adjacencies[0].n();
        if adjacencies.iter().any(|a| a.n() != n) {
            return Err("all layers must share the node count");
        }
        let layer_count = adjacencies.len();
        Ok(Self {
            layers: adjacencies
                .into_iter()
                .map(|adjacency| Layer { adjacency, theta: vec![0.0; n] })
                .collect(),
            omega: vec![0.0; n],
            dt,
            dtheta: vec![vec![0.0; n]; layer_count],
        })
    }

    /// Random phases per layer and Gaussian shared frequencies.
    pub fn seeded(
        adjacencies: Vec<Adjacency>,
        dt: f64,
        omega_mean: f64,
        omega_std: f64,
        rng: &mut impl Rng,
    ) -> Result<Self, &'static str> {
        let mut field = Self::new(adjacencies, dt)?;
        for layer in field.layers.iter_mut() {
            for th in layer.theta.iter_mut() {
                *th = rng.gen::<f64>() * std::f64::consts::TAU;
            }
        }
        for om in field.omega.iter_mut() {
            let g: f64 = rng.sample(StandardNormal);
            *om = omega_mean + omega_std * g;
        }
        Ok(field)
    }

    pub fn n(&self) -> usize {
        self.omega.len()
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    /// Nudge one layer toward an external driver phase.
    pub fn entrain_layer(&mut self, layer: usize, driver_phase: f64, gain: f64) {
        if let Some(l) = self.layers.get_mut(layer) {
            for th in l.theta.iter_mut() {
                *th = wrap_phase(*th + gain * (driver_phase - *th).sin());
            }
        }
    }

    /// Advance every layer by one timestep.
    ///
    /// `k_node` is the per-node effective coupling (resource-modulated);
    /// `permeability` scales the inter-layer alignment term.
    pub fn step(
        &mut self,
        k_node: &[f64],
        permeability: f64,
        noise_std: f64,
        rng: &mut impl Rng,
    ) -> Result<(), &'static str> {
        let n = self.n();
        if k_node.len() != n {
            return Err("k_node length mismatch");
        }
        for layer in &self.layers {
            for &th in &layer.theta {
                if !th.is_finite() {
                    return Err("input theta contains NaN or Inf");
                }
            }
        }

        // Cross-layer circular mean per node, from the pre-step snapshot.
        let layer_count = self.layers.len() as f64;
        let mut mu = vec![0.0; n];
        for (i, m) in mu.iter_mut().enumerate() {
            let (mut s, mut c) = (0.0, 0.0);
            for layer in &self.layers {
                s += layer.theta[i].sin();
                c += layer.theta[i].cos();
            }
            *m = (s / layer_count).atan2(c / layer_count);
        }

        let sqrt_dt = self.dt.sqrt();
        for (l, layer) in self.layers.iter().enumerate() {
            let adj = &layer.adjacency;
            for i in 0..n {
                let mut coupling = 0.0;
                for j in 0..n {
                    let w = adj.weight(i, j);
                    if w > 0.0 {
                        coupling += w * (layer.theta[j] - layer.theta[i]).sin();
                    }
                }
                coupling *= k_node[i] / adj.weighted_degree(i).max(1.0);

                let mut drift = self.omega[i] + coupling;
                drift += permeability * (mu[i] - layer.theta[i]).sin();

                let noise = if noise_std > 0.0 {
                    let g: f64 = rng.sample(StandardNormal);
                    noise_std * sqrt_dt * g
                } else {
                    0.0
                };
                self.dtheta[l][i] = drift * self.dt + noise;
            }
        }

        for (l, layer) in self.layers.iter_mut().enumerate() {
            for i in 0..n {
                layer.theta[i] = wrap_phase(layer.theta[i] + self.dtheta[l][i]);
            }
        }
        Ok(())
    }

    /// Order parameter (R, ψ) of one layer.
    pub fn layer_order_parameter(&self, layer: usize) -> (f64, f64) {
        self.layers
            .get(layer)
            .map_or((0.0, 0.0), |l| order_parameter(&l.theta))
    }

    /// Mean cross-layer spread: average |wrapped(θ_{l,i} - μ_i)|.
    pub fn cross_layer_spread(&self) -> f64 {
        let n = self.n();
        if n == 0 || self.layers.len() < 2 {
            return 0.0;
        }
        let layer_count = self.layers.len() as f64;
        let mut total = 0.0;
        for i in 0..n {
            let (mut s, mut c) = (0.0, 0.0);
            for layer in &self.layers {
                s += layer.theta[i].sin();
                c += layer.theta[i].cos();
            }
            let mu = s.atan2(c);
            for layer in &self.layers {
                total += crate::phase::angle_diff(layer.theta[i], mu).abs();
            }
        }
        total / (n as f64 * layer_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::TopologyShape;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn two_rings(n: usize) -> Vec<Adjacency> {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        vec![
            Adjacency::build(&TopologyShape::Ring { nodes: n }, &mut rng),
            Adjacency::build(&TopologyShape::Ring { nodes: n }, &mut rng),
        ]
    }

    #[test]
    fn test_layer_count_mismatch_rejected() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let a = Adjacency::build(&TopologyShape::Ring { nodes: 5 }, &mut rng);
        let b = Adjacency::build(&TopologyShape::Ring { nodes: 6 }, &mut rng);
        assert!(MultilayerField::new(vec![a, b], 0.05).is_err());
    }

    #[test]
    fn test_permeability_pulls_layers_together() {
        let mut rng = ChaCha8Rng::seed_from_u64(21);
        let mut field = MultilayerField::seeded(two_rings(24), 0.05, 0.0, 0.0, &mut rng).unwrap();
        let k = vec![0.5; 24];
        let before = field.cross_layer_spread();
        for _ in 0..2000 {
            field.step(&k, 0.8, 0.0, &mut rng).unwrap();
        }
        let after = field.cross_layer_spread();
        assert!(
            after < before * 0.5,
            "permeability should shrink the cross-layer spread: {before:.3} → {after:.3}"
        );
    }

    #[test]
    fn test_zero_permeability_keeps_layers_independent() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let mut field = MultilayerField::seeded(two_rings(12), 0.05, 0.0, 0.0, &mut rng).unwrap();
        // identical ring + identical ω: layer 1 evolution never reads layer 0
        let reference = field.layers[1].theta.clone();
        let mut solo = OscillatorSolo::from(&field, 1);
        let k = vec![0.7; 12];
        for _ in 0..50 {
            field.step(&k, 0.0, 0.0, &mut rng).unwrap();
            solo.step(&k);
        }
        assert!(field.layers[1]
            .theta
            .iter()
            .zip(solo.theta.iter())
            .all(|(a, b)| (a - b).abs() < 1e-9));
        assert!(reference != field.layers[1].theta, "phases did evolve");
    }

    #[test]
    fn test_entrain_layer_moves_only_that_layer() {
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let mut field = MultilayerField::seeded(two_rings(8), 0.05, 0.0, 0.0, &mut rng).unwrap();
        let other = field.layers[1].theta.clone();
        field.entrain_layer(0, 1.0, 0.3);
        assert_eq!(field.layers[1].theta, other);
    }

    #[test]
    fn test_k_node_length_checked() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut field = MultilayerField::seeded(two_rings(6), 0.05, 0.0, 0.1, &mut rng).unwrap();
        assert!(field.step(&[1.0; 5], 0.2, 0.0, &mut rng).is_err());
    }

    /// Single-layer reference integrator used to check layer independence.
    struct OscillatorSolo {
        adjacency: Adjacency,
        theta: Vec<f64>,
        omega: Vec<f64>,
        dt: f64,
    }

    impl OscillatorSolo {
        fn from(field: &MultilayerField, layer: usize) -> Self {
            Self {
                adjacency: field.layers[layer].adjacency.clone(),
                theta: field.layers[layer].theta.clone(),
                omega: field.omega.clone(),
                dt: field.dt,
            }
        }

        fn step(&mut self, k_node: &[f64]) {
            let n = self.theta.len();
            let mut dtheta = vec![0.0; n];
            for i in 0..n {
                let mut coupling = 0.0;
                for j in 0..n {
                    let w = self.adjacency.weight(i, j);
                    if w > 0.0 {
                        coupling += w * (self.theta[j] - self.theta[i]).sin();
                    }
                }
                coupling *= k_node[i] / self.adjacency.weighted_degree(i).max(1.0);
                dtheta[i] = (self.omega[i] + coupling) * self.dt;
            }
            for i in 0..n {
                self.theta[i] = wrap_phase(self.theta[i] + dtheta[i]);
            }
        }
    }
}
