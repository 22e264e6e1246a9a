// ─────────────────────────────────────────────────────────────────────
// Coherence Kernel — External Driver
// ─────────────────────────────────────────────────────────────────────
//! Composable external reference signal sampled on the simulation grid.
//!
//! A composite of sinusoidal components combines as phasors, not as a
//! sum of angles, so a larger-amplitude component dominates when the
//! components disagree. The composite instantaneous frequency is the
//! amplitude-weighted mean of the component frequencies (a controlled
//! approximation, not an exact derivative).

use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;

use crate::phase::wrap_phase;

/// One sinusoidal driver component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriverComponent {
    /// Frequency in driver-time hertz.
    pub freq_hz: f64,
    /// Phasor weight of this component.
    pub amplitude: f64,
    /// Phase offset at t = 0, radians.
    pub phase: f64,
}

impl DriverComponent {
    pub fn new(freq_hz: f64, amplitude: f64, phase: f64) -> Self {
        Self { freq_hz, amplitude, phase }
    }

    /// Component phase at a step index: 2π f t + phase0, wrapped.
    pub fn phase_at(&self, step: u64, dt: f64, time_scale: f64) -> f64 {
        let t = step as f64 * dt * time_scale;
        wrap_phase(TAU * self.freq_hz * t + self.phase)
    }

    /// Constant angular frequency, rad/s.
    pub fn omega(&self) -> f64 {
        TAU * self.freq_hz
    }
}

/// Phasor-composited external driver.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Driver {
    components: Vec<DriverComponent>,
    dt: f64,
    time_scale: f64,
}

impl Driver {
    pub fn new(components: Vec<DriverComponent>, dt: f64) -> Self {
        Self { components, dt, time_scale: 1.0 }
    }

    /// Stretch or compress driver time relative to simulation time.
    pub fn with_time_scale(mut self, time_scale: f64) -> Self {
        self.time_scale = time_scale;
        self
    }

    pub fn components(&self) -> &[DriverComponent] {
        &self.components
    }

    /// Composite phase at a step index, in [0, 2π).
    ///
    /// angle(Σ_k amp_k · e^{iφ_k}); defaults to 0 when the resultant
    /// phasor magnitude is numerically zero.
    pub fn phase_at(&self, step: u64) -> f64 {
        let (mut sum_sin, mut sum_cos) = (0.0, 0.0);
        for c in &self.components {
            let phi = c.phase_at(step, self.dt, self.time_scale);
            sum_sin += c.amplitude * phi.sin();
            sum_cos += c.amplitude * phi.cos();
        }
        if (sum_sin * sum_sin + sum_cos * sum_cos).sqrt() < 1e-12 {
            return 0.0;
        }
        wrap_phase(sum_sin.atan2(sum_cos))
    }

    /// Composite instantaneous angular frequency, rad/s.
    pub fn omega_at(&self, _step: u64) -> f64 {
        let (mut num, mut den) = (0.0, 0.0);
        for c in &self.components {
            num += c.amplitude * c.omega();
            den += c.amplitude;
        }
        num / den.max(1e-12)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::phase::angle_diff;

    #[test]
    fn test_single_component_phase_linear() {
        let drv = Driver::new(vec![DriverComponent::new(0.5, 1.0, 0.0)], 0.01);
        // phase advances by 2π·f·dt per step
        let expected = TAU * 0.5 * 0.01;
        let d01 = angle_diff(drv.phase_at(1), drv.phase_at(0));
        let d12 = angle_diff(drv.phase_at(2), drv.phase_at(1));
        assert!((d01 - expected).abs() < 1e-9, "got {d01}");
        assert!((d12 - expected).abs() < 1e-9, "got {d12}");
    }

    #[test]
    fn test_single_component_constant_omega() {
        let drv = Driver::new(vec![DriverComponent::new(7.83, 1.0, 0.0)], 0.02);
        assert!((drv.omega_at(0) - TAU * 7.83).abs() < 1e-9);
        assert!((drv.omega_at(1000) - TAU * 7.83).abs() < 1e-9);
    }

    #[test]
    fn test_phase_in_canonical_interval() {
        let drv = Driver::new(
            vec![
                DriverComponent::new(7.83, 1.0, 0.0),
                DriverComponent::new(14.3, 0.6, 0.3),
            ],
            0.02,
        );
        for step in 0..500 {
            let p = drv.phase_at(step);
            assert!((0.0..TAU).contains(&p), "phase {p} at step {step}");
        }
    }

    #[test]
    fn test_dominant_amplitude_wins_on_disagreement() {
        // Two DC-like components π apart: the heavy one sets the angle.
        let drv = Driver::new(
            vec![
                DriverComponent::new(0.0, 2.0, 0.3),
                DriverComponent::new(0.0, 0.5, 0.3 + std::f64::consts::PI),
            ],
            0.01,
        );
        let p = drv.phase_at(0);
        assert!(angle_diff(p, 0.3).abs() < 1e-9, "composite {p} should follow amp 2.0");
    }

    #[test]
    fn test_cancelled_phasor_defaults_to_zero() {
        let drv = Driver::new(
            vec![
                DriverComponent::new(0.0, 1.0, 0.0),
                DriverComponent::new(0.0, 1.0, std::f64::consts::PI),
            ],
            0.01,
        );
        assert_eq!(drv.phase_at(0), 0.0);
    }

    #[test]
    fn test_omega_amplitude_weighted() {
        let drv = Driver::new(
            vec![
                DriverComponent::new(1.0, 3.0, 0.0),
                DriverComponent::new(2.0, 1.0, 0.0),
            ],
            0.01,
        );
        let expected = (3.0 * TAU * 1.0 + 1.0 * TAU * 2.0) / 4.0;
        assert!((drv.omega_at(0) - expected).abs() < 1e-9);
    }

    #[test]
    fn test_time_scale_stretches_phase() {
        let fast = Driver::new(vec![DriverComponent::new(1.0, 1.0, 0.0)], 0.01);
        let slow = Driver::new(vec![DriverComponent::new(1.0, 1.0, 0.0)], 0.01).with_time_scale(0.5);
        let df = angle_diff(fast.phase_at(1), fast.phase_at(0));
        let ds = angle_diff(slow.phase_at(1), slow.phase_at(0));
        assert!((df - 2.0 * ds).abs() < 1e-9);
    }
}
