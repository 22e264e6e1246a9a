// ─────────────────────────────────────────────────────────────────────
// Coherence Kernel — Phase Arithmetic
// ─────────────────────────────────────────────────────────────────────
//! Canonical angle operations shared by every other module.
//!
//! Phases live in [0, 2π); signed differences in (-π, π]. Both use a
//! continuous modulo so downstream differences stay correct across the
//! branch cut.

use std::f64::consts::{PI, TAU};

/// Wrap an angle into the canonical interval [0, 2π).
pub fn wrap_phase(x: f64) -> f64 {
    x.rem_euclid(TAU)
}

/// Wrapped difference a - b in (-π, π].
pub fn angle_diff(a: f64, b: f64) -> f64 {
    let d = (a - b).rem_euclid(TAU);
    if d > PI {
        d - TAU
    } else {
        d
    }
}

/// Kuramoto order parameter (R, ψ) of a phase population.
///
/// R = |⟨e^{iθ}⟩| ∈ [0, 1], ψ = arg⟨e^{iθ}⟩ wrapped to [0, 2π).
/// An empty population reports (0, 0).
pub fn order_parameter(theta: &[f64]) -> (f64, f64) {
    if theta.is_empty() {
        return (0.0, 0.0);
    }
    let n = theta.len() as f64;
    let (sum_sin, sum_cos) = theta
        .iter()
        .fold((0.0, 0.0), |(s, c), &th| (s + th.sin(), c + th.cos()));
    let (ms, mc) = (sum_sin / n, sum_cos / n);
    let r = (ms * ms + mc * mc).sqrt().clamp(0.0, 1.0);
    (r, wrap_phase(ms.atan2(mc)))
}

/// Circular mean ψ of a phase population, in [0, 2π).
pub fn circular_mean(theta: &[f64]) -> f64 {
    order_parameter(theta).1
}
