// ─────────────────────────────────────────────────────────────────────
// Coherence Kernel — Oscillator Field Integrator
// ─────────────────────────────────────────────────────────────────────
//! Euler-Maruyama integrator for the graph-coupled phase field:
//!
//!   dθ_i/dt = ω_i + m_i · K Σ_j A_ij sin(θ_j - θ_i) / max(deg_i, 1)
//!           + γ sin(φ_drv - θ_i)        (external driver)
//!           + g sin(ψ - θ_i)            (mirror toward the population mean)
//!           + σ_i η_i                    (per-node Gaussian noise)
//!
//! Increments are computed from the pre-step snapshot, then applied and
//! wrapped with a continuous modulo. Pre-allocated scratch keeps the
//! hot path allocation-free.

use rand::Rng;
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};

use crate::phase::{angle_diff, circular_mean, order_parameter, wrap_phase};
use crate::topology::Adjacency;

/// Uniform step parameters for the field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldParams {
    /// Base coupling strength K.
    pub coupling: f64,
    /// Gain γ of the external-driver term.
    pub driver_gain: f64,
    /// Gain g of the mirror term; small by contract (≤ 0.2) so it never
    /// dominates the primary coupling.
    pub mirror_gain: f64,
    /// Base standard deviation of the injected noise; 0 disables.
    pub noise_std: f64,
}

impl Default for FieldParams {
    fn default() -> Self {
        Self {
            coupling: 1.0,
            driver_gain: 0.0,
            mirror_gain: 0.0,
            noise_std: 0.0,
        }
    }
}

/// Optional per-node overrides for one step (anchor feedback).
#[derive(Debug, Clone, Copy, Default)]
pub struct StepProfile<'a> {
    /// Multiplier on the coupling term per node; None = all ones.
    pub coupling_scale: Option<&'a [f64]>,
    /// Noise standard deviation per node; None = the uniform base value.
    pub noise: Option<&'a [f64]>,
}

/// Phase field state: θ, ω, and the timestep.
#[derive(Debug, Clone)]
pub struct OscillatorField {
    pub theta: Vec<f64>,
    pub omega: Vec<f64>,
    pub dt: f64,
    // Pre-allocated scratch
    dtheta: Vec<f64>,
}

impl OscillatorField {
    pub fn new(n: usize, dt: f64) -> Self {
        Self {
            theta: vec![0.0; n],
            omega: vec![0.0; n],
            dt,
            dtheta: vec![0.0; n],
        }
    }

    /// Random phases in [0, 2π) and Gaussian natural frequencies.
    pub fn seeded(n: usize, dt: f64, omega_mean: f64, omega_std: f64, rng: &mut impl Rng) -> Self {
        let mut field = Self::new(n, dt);
        for th in field.theta.iter_mut() {
            *th = rng.gen::<f64>() * std::f64::consts::TAU;
        }
        for om in field.omega.iter_mut() {
            let g: f64 = rng.sample(StandardNormal);
            *om = omega_mean + omega_std * g;
        }
        field
    }

    pub fn n(&self) -> usize {
        self.theta.len()
    }

    /// Advance the field by one timestep.
    ///
    /// Fails fast on shape mismatches and non-finite input phases.
    pub fn step(
        &mut self,
        adj: &Adjacency,
        params: &FieldParams,
        driver_phase: Option<f64>,
        profile: StepProfile,
        rng: &mut impl Rng,
    ) -> Result<(), &'static str> {
        let n = self.theta.len();
        if adj.n() != n {
            return Err("adjacency size mismatch");
        }
        if let Some(scale) = profile.coupling_scale {
            if scale.len() != n {
                return Err("coupling profile length mismatch");
            }
        }
        if let Some(noise) = profile.noise {
            if noise.len() != n {
                return Err("noise profile length mismatch");
            }
        }
        for &th in &self.theta {
            if !th.is_finite() {
                return Err("input theta contains NaN or Inf");
            }
        }

        let psi = if params.mirror_gain != 0.0 {
            circular_mean(&self.theta)
        } else {
            0.0
        };
        let sqrt_dt = self.dt.sqrt();

        for i in 0..n {
            let mut coupling = 0.0;
            for j in 0..n {
                let w = adj.weight(i, j);
                if w > 0.0 {
                    coupling += w * (self.theta[j] - self.theta[i]).sin();
                }
            }
            // zero-degree nodes contribute exactly zero coupling
            coupling *= params.coupling / adj.weighted_degree(i).max(1.0);
            let scale = profile.coupling_scale.map_or(1.0, |s| s[i]);

            let mut drift = self.omega[i] + scale * coupling;
            if let Some(phi) = driver_phase {
                drift += params.driver_gain * (phi - self.theta[i]).sin();
            }
            if params.mirror_gain != 0.0 {
                drift += params.mirror_gain * (psi - self.theta[i]).sin();
            }

            let sigma = profile.noise.map_or(params.noise_std, |s| s[i]);
            let noise = if sigma > 0.0 {
                let g: f64 = rng.sample(StandardNormal);
                sigma * sqrt_dt * g
            } else {
                0.0
            };

            self.dtheta[i] = drift * self.dt + noise;
        }

        for i in 0..n {
            self.theta[i] = wrap_phase(self.theta[i] + self.dtheta[i]);
        }
        Ok(())
    }

    /// Drift natural frequencies toward the population circular mean.
    ///
    /// ω_i += α · wrapped(ψ - θ_i) · dt. No-op at rate 0.
    pub fn adapt_frequencies(&mut self, rate: f64) {
        if rate == 0.0 {
            return;
        }
        let psi = circular_mean(&self.theta);
        for (om, &th) in self.omega.iter_mut().zip(self.theta.iter()) {
            *om += rate * angle_diff(psi, th) * self.dt;
        }
    }

    /// Global order parameter (R, ψ) of the current phases.
    pub fn order_parameter(&self) -> (f64, f64) {
        order_parameter(&self.theta)
    }
}
