// ─────────────────────────────────────────────────────────────────────
// Coherence Kernel — Simulation Engine
// ─────────────────────────────────────────────────────────────────────
//! Step-indexed orchestration of the oscillator field, the external
//! driver, and the crystallisation model.
//!
//! Per step, in order: evaluate the coupling/noise schedule → snapshot
//! local coherence → crystal promote/decay → record metrics → integrate
//! the field with anchor feedback → update resources → attempt edge
//! birth. All shared mutable state lives here; observers and detectors
//! only ever see recorded arrays.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use coherence_crystal::{CrystalConfig, CrystalField, EdgeBirth, EdgeGrowth, GrowthConfig};
use coherence_observers::{
    coupling_breath, cross_edge_sync, lag1_smoothness, local_coherence, mean_drift, phase_entropy,
    tail_mean, LockTracker, MetricsConfig,
};
use coherence_physics::{
    angle_diff, circular_mean, order_parameter, Adjacency, Driver, DriverComponent, FieldParams,
    MultilayerField, OscillatorField, StepProfile, TopologyShape,
};
use coherence_types::{
    CoherenceError, CoherenceResult, RunSeries, RunSummary, StepSample,
};

fn lerp(a: f64, b: f64, x: f64) -> f64 {
    (1.0 - x) * a + x * b
}

/// Ritual openness cycle: a sinusoidal 0..1 cycle modulating the
/// cross-population pull toward the global mean phase, with annealed
/// base and amplitude and a noise dip at the cycle peak.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RitualConfig {
    pub period: u64,
    pub cross_base_start: f64,
    pub cross_base_end: f64,
    pub cross_amp_start: f64,
    pub cross_amp_end: f64,
    pub noise_dip: f64,
}

impl Default for RitualConfig {
    fn default() -> Self {
        Self {
            period: 600,
            cross_base_start: 0.0,
            cross_base_end: 0.02,
            cross_amp_start: 0.0,
            cross_amp_end: 0.08,
            noise_dip: 0.02,
        }
    }
}

/// Breath-modulated coupling band; overrides the linear anneal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BreathConfig {
    /// Breath period in simulated seconds.
    pub period: f64,
    /// Fraction of the period spent inhaling.
    pub inhale_ratio: f64,
    pub k_min: f64,
    pub k_max: f64,
}

/// Explicit layer-mode variant: present or absent, never probed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum LayerMode {
    Single,
    Multi { layers: usize, permeability: f64 },
}

/// Time-bounded run modification.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Intervention {
    pub t_start: u64,
    pub t_end: u64,
    pub kind: InterventionKind,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InterventionKind {
    /// Multiply the scheduled coupling while the window is active.
    CouplingFactor { factor: f64 },
    /// Replace the scheduled noise while the window is active.
    NoiseOverride { noise_std: f64 },
    /// Permanently bridge two nodes when the window opens.
    Bridge { i: usize, j: usize, weight: f64 },
}

/// Complete numeric run configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimConfig {
    pub n: usize,
    pub steps: u64,
    pub dt: f64,
    pub seed: u64,
    pub topology: TopologyShape,

    // Annealing schedules (start cold, warm up).
    pub coupling_start: f64,
    pub coupling_end: f64,
    pub noise_start: f64,
    pub noise_end: f64,

    pub omega_mean: f64,
    pub omega_std: f64,

    pub driver: Vec<DriverComponent>,
    pub driver_gain: f64,
    pub driver_time_scale: f64,

    /// Constant pull toward the population mean; the ritual cycle adds
    /// on top. Capped small so it never dominates the graph coupling.
    pub mirror_gain: f64,

    pub ritual: Option<RitualConfig>,
    pub breath: Option<BreathConfig>,
    pub layer_mode: LayerMode,

    /// Natural-frequency adaptation rate toward the mean phase; 0 off.
    pub adaptation_rate: f64,

    pub crystal: CrystalConfig,
    pub growth: Option<GrowthConfig>,
    pub interventions: Vec<Intervention>,
    pub metrics: MetricsConfig,

    /// Trailing fraction of the run used for summary means.
    pub tail_frac: f64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            n: 180,
            steps: 4000,
            dt: 0.02,
            seed: 108,
            topology: TopologyShape::SmallWorld {
                nodes: 180,
                ring_degree: 4,
                rewire_p: 0.02,
            },
            coupling_start: 0.6,
            coupling_end: 1.0,
            noise_start: 0.06,
            noise_end: 0.03,
            omega_mean: 0.0,
            omega_std: 0.25,
            driver: vec![
                DriverComponent::new(7.83, 1.0, 0.0),
                DriverComponent::new(14.3, 0.6, 0.0),
                DriverComponent::new(20.8, 0.4, 0.0),
            ],
            driver_gain: 0.28,
            driver_time_scale: 1.0,
            mirror_gain: 0.0,
            ritual: Some(RitualConfig::default()),
            breath: None,
            layer_mode: LayerMode::Single,
            adaptation_rate: 0.0,
            crystal: CrystalConfig::default(),
            growth: Some(GrowthConfig::default()),
            interventions: Vec::new(),
            metrics: MetricsConfig::default(),
            tail_frac: 0.5,
        }
    }
}

impl SimConfig {
    /// Fail fast on out-of-range parameters; the engine assumes a
    /// validated configuration from here on.
    pub fn validate(&self) -> CoherenceResult<()> {
        if self.n == 0 {
            return Err(CoherenceError::Config("n must be > 0".to_string()));
        }
        if self.steps == 0 {
            return Err(CoherenceError::Config("steps must be > 0".to_string()));
        }
        if self.dt <= 0.0 {
            return Err(CoherenceError::Config(format!("dt must be > 0, got {}", self.dt)));
        }
        if self.topology.node_count() != self.n {
            return Err(CoherenceError::Config(format!(
                "topology yields {} nodes but n = {}",
                self.topology.node_count(),
                self.n
            )));
        }
        for (name, v) in [
            ("coupling_start", self.coupling_start),
            ("coupling_end", self.coupling_end),
            ("noise_start", self.noise_start),
            ("noise_end", self.noise_end),
            ("omega_std", self.omega_std),
            ("driver_gain", self.driver_gain),
            ("adaptation_rate", self.adaptation_rate),
        ] {
            if v < 0.0 {
                return Err(CoherenceError::Config(format!("{name} must be >= 0, got {v}")));
            }
        }
        let cross_max = self.ritual.as_ref().map_or(0.0, |r| {
            r.cross_base_start.max(r.cross_base_end) + r.cross_amp_start.max(r.cross_amp_end)
        });
        if self.mirror_gain < 0.0 || self.mirror_gain + cross_max > 0.2 + 1e-12 {
            return Err(CoherenceError::Config(format!(
                "mirror gain plus ritual cross peak must stay within 0.2, got {}",
                self.mirror_gain + cross_max
            )));
        }
        if let Some(rit) = &self.ritual {
            if rit.period == 0 {
                return Err(CoherenceError::Config("ritual period must be > 0".to_string()));
            }
        }
        if let Some(b) = &self.breath {
            if b.period <= 0.0 || !(0.0..1.0).contains(&b.inhale_ratio) || b.inhale_ratio == 0.0 {
                return Err(CoherenceError::Config(
                    "breath period must be > 0 and inhale_ratio in (0, 1)".to_string(),
                ));
            }
            if b.k_min > b.k_max || b.k_min < 0.0 {
                return Err(CoherenceError::Config(format!(
                    "breath band invalid: k_min {} k_max {}",
                    b.k_min, b.k_max
                )));
            }
        }
        if let LayerMode::Multi { layers, permeability } = &self.layer_mode {
            if *layers < 2 {
                return Err(CoherenceError::Config(format!(
                    "multi-layer mode needs >= 2 layers, got {layers}"
                )));
            }
            if *permeability < 0.0 {
                return Err(CoherenceError::Config("permeability must be >= 0".to_string()));
            }
        }
        let c = &self.crystal;
        if c.window == 0 || c.half_life == 0 {
            return Err(CoherenceError::Config(
                "crystal window and half_life must be >= 1".to_string(),
            ));
        }
        for (name, v) in [
            ("coherence_threshold", c.coherence_threshold),
            ("resource_threshold", c.resource_threshold),
            ("starve_threshold", c.starve_threshold),
            ("resource_init", c.resource_init),
        ] {
            if !(0.0..=1.0).contains(&v) {
                return Err(CoherenceError::Config(format!(
                    "crystal {name} must be in [0, 1], got {v}"
                )));
            }
        }
        if let Some(g) = &self.growth {
            if g.every == 0 {
                return Err(CoherenceError::Config("growth cadence must be >= 1".to_string()));
            }
            if g.batch_min == 0 || g.batch_min > g.batch_max {
                return Err(CoherenceError::Config(format!(
                    "growth batch bounds invalid: {}..{}",
                    g.batch_min, g.batch_max
                )));
            }
            if !(0.0..=1.0).contains(&g.require_coherence)
                || !(0.0..=1.0).contains(&g.require_resource)
            {
                return Err(CoherenceError::Config(
                    "growth thresholds must be in [0, 1]".to_string(),
                ));
            }
        }
        if !(self.tail_frac > 0.0 && self.tail_frac <= 1.0) {
            return Err(CoherenceError::Config(format!(
                "tail_frac must be in (0, 1], got {}",
                self.tail_frac
            )));
        }
        Ok(())
    }

    /// Load from JSON string.
    pub fn from_json(json: &str) -> CoherenceResult<Self> {
        let cfg: Self = serde_json::from_str(json)
            .map_err(|e| CoherenceError::Config(format!("JSON parse error: {e}")))?;
        cfg.validate()?;
        Ok(cfg)
    }
}

/// Everything a run hands to external consumers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunOutput {
    pub series: RunSeries,
    pub summary: RunSummary,
    pub births: Vec<EdgeBirth>,
}

enum FieldState {
    Single {
        field: OscillatorField,
        adjacency: Adjacency,
    },
    Multi {
        field: MultilayerField,
        permeability: f64,
    },
}

impl FieldState {
    /// Adjacency and phases the observers and the crystal model read.
    /// In multi-layer mode this is layer 0.
    fn metrics_view(&self) -> (&Adjacency, &[f64]) {
        match self {
            FieldState::Single { field, adjacency } => (adjacency, &field.theta),
            FieldState::Multi { field, .. } => {
                (&field.layers[0].adjacency, &field.layers[0].theta)
            }
        }
    }

    fn adjacency_mut(&mut self) -> &mut Adjacency {
        match self {
            FieldState::Single { adjacency, .. } => adjacency,
            FieldState::Multi { field, .. } => &mut field.layers[0].adjacency,
        }
    }
}

/// The simulation loop. Owns every piece of mutable run state.
pub struct Engine {
    cfg: SimConfig,
    rng: ChaCha8Rng,
    state: FieldState,
    driver: Option<Driver>,
    crystal: CrystalField,
    growth: Option<EdgeGrowth>,
    lock: LockTracker,
    series: RunSeries,
    births: Vec<EdgeBirth>,
    bridges_applied: Vec<bool>,
    prev_theta: Vec<f64>,
    step_count: u64,
}

impl Engine {
    pub fn new(cfg: SimConfig) -> CoherenceResult<Self> {
        cfg.validate()?;
        let mut rng = ChaCha8Rng::seed_from_u64(cfg.seed);

        let state = match &cfg.layer_mode {
            LayerMode::Single => {
                let adjacency = Adjacency::build(&cfg.topology, &mut rng);
                let field =
                    OscillatorField::seeded(cfg.n, cfg.dt, cfg.omega_mean, cfg.omega_std, &mut rng);
                FieldState::Single { field, adjacency }
            }
            LayerMode::Multi { layers, permeability } => {
                let adjacencies: Vec<Adjacency> = (0..*layers)
                    .map(|_| Adjacency::build(&cfg.topology, &mut rng))
                    .collect();
                let field = MultilayerField::seeded(
                    adjacencies,
                    cfg.dt,
                    cfg.omega_mean,
                    cfg.omega_std,
                    &mut rng,
                )
                .map_err(|e| CoherenceError::Config(e.to_string()))?;
                FieldState::Multi { field, permeability: *permeability }
            }
        };

        let crystal = CrystalField::seeded(cfg.n, cfg.crystal.clone(), &mut rng);
        let growth = cfg.growth.clone().map(EdgeGrowth::new);
        let driver = if cfg.driver.is_empty() {
            None
        } else {
            Some(Driver::new(cfg.driver.clone(), cfg.dt).with_time_scale(cfg.driver_time_scale))
        };
        let lock = LockTracker::new(cfg.n, cfg.metrics.anchor_window);
        let prev_theta = state.metrics_view().1.to_vec();
        let series = RunSeries::with_capacity(cfg.steps as usize);
        let bridges_applied = vec![false; cfg.interventions.len()];

        info!(n = cfg.n, steps = cfg.steps, seed = cfg.seed, "engine initialised");
        Ok(Self {
            rng,
            state,
            driver,
            crystal,
            growth,
            lock,
            series,
            births: Vec::new(),
            bridges_applied,
            prev_theta,
            step_count: 0,
            cfg,
        })
    }

    /// Scheduled (coupling, noise, ritual cross gain) at a step.
    fn schedule_at(&self, step: u64) -> (f64, f64, f64) {
        let x = if self.cfg.steps <= 1 {
            0.0
        } else {
            (step as f64 / (self.cfg.steps - 1) as f64).min(1.0)
        };
        let mut coupling = lerp(self.cfg.coupling_start, self.cfg.coupling_end, x);
        if let Some(b) = &self.cfg.breath {
            let t = step as f64 * self.cfg.dt;
            coupling = coupling_breath(b.k_min, b.k_max, t, b.period, b.inhale_ratio);
        }
        let mut noise = lerp(self.cfg.noise_start, self.cfg.noise_end, x);
        let mut cross = 0.0;
        if let Some(rit) = &self.cfg.ritual {
            let cyc = (std::f64::consts::TAU * step as f64 / rit.period.max(1) as f64).sin() * 0.5
                + 0.5;
            cross = lerp(rit.cross_base_start, rit.cross_base_end, x)
                + lerp(rit.cross_amp_start, rit.cross_amp_end, x) * cyc;
            noise -= rit.noise_dip * cyc;
        }
        for iv in &self.cfg.interventions {
            if step >= iv.t_start && step < iv.t_end {
                match iv.kind {
                    InterventionKind::CouplingFactor { factor } => coupling *= factor,
                    InterventionKind::NoiseOverride { noise_std } => noise = noise_std,
                    InterventionKind::Bridge { .. } => {}
                }
            }
        }
        (coupling, noise.max(0.0), cross)
    }

    /// Apply bridge interventions whose window opens at this step.
    fn apply_bridges(&mut self, step: u64) {
        for idx in 0..self.cfg.interventions.len() {
            let iv = self.cfg.interventions[idx];
            if let InterventionKind::Bridge { i, j, weight } = iv.kind {
                if step == iv.t_start && !self.bridges_applied[idx] {
                    self.bridges_applied[idx] = true;
                    match self.state.adjacency_mut().add_edge(i, j, weight) {
                        Ok(()) => debug!(step, i, j, "bridge inserted"),
                        Err(reason) => debug!(step, i, j, reason, "bridge skipped"),
                    }
                }
            }
        }
    }

    /// Advance the simulation one step and return the recorded sample.
    pub fn step(&mut self) -> CoherenceResult<StepSample> {
        let t = self.step_count;
        let (k_base, noise_base, cross_gain) = self.schedule_at(t);
        self.apply_bridges(t);

        let local_r = {
            let (adj, theta) = self.state.metrics_view();
            local_coherence(adj, theta)
        };
        self.crystal
            .observe(&local_r)
            .map_err(|e| CoherenceError::Shape(e.to_string()))?;
        let promoted = self.crystal.promote();
        if !promoted.is_empty() {
            debug!(step = t, count = promoted.len(), "anchors promoted");
        }
        let dropped = self.crystal.decay(&mut self.rng);
        if !dropped.is_empty() {
            debug!(step = t, count = dropped.len(), "anchors decayed");
        }

        let driver_phase = self.driver.as_ref().map(|d| d.phase_at(t));

        let sample = {
            let (adj, theta) = self.state.metrics_view();
            let (r, psi) = order_parameter(theta);
            let local_mean = if local_r.is_empty() {
                0.0
            } else {
                local_r.iter().sum::<f64>() / local_r.len() as f64
            };
            let anchor_fraction = self.lock.update(theta, psi, self.cfg.metrics.anchor_eps);
            let gap = driver_phase.map_or(0.0, |phi| angle_diff(psi, phi).abs());
            StepSample {
                step: t,
                time: t as f64 * self.cfg.dt,
                r_global: r,
                mean_phase: psi,
                cross_sync: cross_edge_sync(adj, theta),
                drift: mean_drift(theta, &self.prev_theta),
                local_coherence: local_mean,
                diversity: phase_entropy(theta, self.cfg.metrics.entropy_bins),
                smoothness: lag1_smoothness(theta, &self.prev_theta),
                anchor_count: self.crystal.anchor_count(),
                anchor_fraction,
                resource_mean: self.crystal.resource_mean(),
                gap_to_driver: gap,
                coupling: k_base,
                noise: noise_base,
            }
        };
        self.series.push(&sample);
        self.prev_theta = self.state.metrics_view().1.to_vec();

        match &mut self.state {
            FieldState::Single { field, adjacency } => {
                let coupling_scale = self.crystal.coupling_profile(adjacency, k_base);
                let noise_profile = self.crystal.noise_profile(noise_base);
                let params = FieldParams {
                    coupling: k_base,
                    driver_gain: self.cfg.driver_gain,
                    mirror_gain: self.cfg.mirror_gain + cross_gain,
                    noise_std: noise_base,
                };
                field
                    .step(
                        adjacency,
                        &params,
                        driver_phase,
                        StepProfile {
                            coupling_scale: Some(&coupling_scale),
                            noise: Some(&noise_profile),
                        },
                        &mut self.rng,
                    )
                    .map_err(|e| CoherenceError::Shape(e.to_string()))?;
                field.adapt_frequencies(self.cfg.adaptation_rate);
            }
            FieldState::Multi { field, permeability } => {
                let perm = *permeability;
                let anchor_scale =
                    self.crystal.coupling_profile(&field.layers[0].adjacency, k_base);
                // resources throttle coupling between a 0.2 K floor and K
                let k_node: Vec<f64> = self
                    .crystal
                    .resource
                    .iter()
                    .zip(anchor_scale.iter())
                    .map(|(&r, &s)| k_base * (0.2 + 0.8 * r) * s)
                    .collect();
                if let Some(phi) = driver_phase {
                    field.entrain_layer(0, phi, self.cfg.driver_gain);
                }
                field
                    .step(&k_node, perm, noise_base, &mut self.rng)
                    .map_err(|e| CoherenceError::Shape(e.to_string()))?;
                if self.cfg.adaptation_rate > 0.0 {
                    let theta0 = field.layers[0].theta.clone();
                    let psi = circular_mean(&theta0);
                    for (om, &th) in field.omega.iter_mut().zip(theta0.iter()) {
                        *om += self.cfg.adaptation_rate * angle_diff(psi, th) * self.cfg.dt;
                    }
                }
            }
        }

        self.crystal
            .update_resources(&local_r, self.cfg.dt, &mut self.rng)
            .map_err(|e| CoherenceError::Shape(e.to_string()))?;

        if let Some(growth) = self.growth.as_mut() {
            let windowed = self.crystal.windowed_coherence();
            let births = growth.try_grow(
                t,
                windowed.as_deref(),
                &self.crystal.resource,
                self.state.adjacency_mut(),
                &mut self.rng,
            );
            for b in &births {
                debug!(step = b.step, source = b.source, target = b.target, "edge birthed");
            }
            self.births.extend(births);
        }

        self.step_count += 1;
        Ok(sample)
    }

    /// Run the configured step count to completion.
    pub fn run(&mut self) -> CoherenceResult<RunOutput> {
        info!(steps = self.cfg.steps, "run started");
        while self.step_count < self.cfg.steps {
            self.step()?;
        }
        let summary = self.summary();
        info!(
            r_tail = summary.r_tail_mean,
            anchors_tail = summary.anchors_tail_mean,
            edges_birthed = summary.edges_birthed,
            "run complete"
        );
        Ok(RunOutput {
            series: self.series.clone(),
            summary,
            births: self.births.clone(),
        })
    }

    /// Tail summary over the configured trailing fraction.
    pub fn summary(&self) -> RunSummary {
        let frac = self.cfg.tail_frac;
        let anchors: Vec<f64> = self.series.anchor_count.iter().map(|&c| c as f64).collect();
        RunSummary {
            r_tail_mean: tail_mean(&self.series.r_global, frac),
            gap_tail_mean: tail_mean(&self.series.gap_to_driver, frac),
            anchors_tail_mean: tail_mean(&anchors, frac),
            resource_tail_mean: tail_mean(&self.series.resource_mean, frac),
            edges_birthed: self.births.len() as u32,
        }
    }

    pub fn config(&self) -> &SimConfig {
        &self.cfg
    }

    pub fn series(&self) -> &RunSeries {
        &self.series
    }

    pub fn births(&self) -> &[EdgeBirth] {
        &self.births
    }

    pub fn step_count(&self) -> u64 {
        self.step_count
    }

    /// Phases of the metrics layer.
    pub fn phases(&self) -> &[f64] {
        self.state.metrics_view().1
    }

    /// Adjacency of the metrics layer.
    pub fn adjacency(&self) -> &Adjacency {
        self.state.metrics_view().0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quick_cfg() -> SimConfig {
        SimConfig {
            n: 30,
            steps: 300,
            dt: 0.05,
            seed: 9,
            topology: TopologyShape::SmallWorld {
                nodes: 30,
                ring_degree: 4,
                rewire_p: 0.05,
            },
            coupling_start: 0.8,
            coupling_end: 1.2,
            noise_start: 0.02,
            noise_end: 0.01,
            omega_std: 0.2,
            driver: vec![DriverComponent::new(0.05, 1.0, 0.0)],
            driver_gain: 0.2,
            ritual: None,
            crystal: CrystalConfig {
                window: 20,
                ..CrystalConfig::default()
            },
            growth: Some(GrowthConfig {
                every: 50,
                budget: 10,
                ..GrowthConfig::default()
            }),
            ..SimConfig::default()
        }
    }

    #[test]
    fn test_default_config_valid() {
        assert!(SimConfig::default().validate().is_ok());
    }

    #[test]
    fn test_topology_size_mismatch_rejected() {
        let cfg = SimConfig {
            n: 10,
            topology: TopologyShape::Ring { nodes: 20 },
            ..quick_cfg()
        };
        assert!(cfg.validate().is_err());
        assert!(Engine::new(cfg).is_err());
    }

    #[test]
    fn test_mirror_cap_enforced() {
        let cfg = SimConfig {
            mirror_gain: 0.5,
            ..quick_cfg()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_run_records_every_step() {
        let mut engine = Engine::new(quick_cfg()).unwrap();
        let out = engine.run().unwrap();
        assert_eq!(out.series.len(), 300);
        assert!(out.series.r_global.iter().all(|&r| (0.0..=1.0).contains(&r)));
        assert!(out.series.diversity.iter().all(|&d| (0.0..=1.0).contains(&d)));
        assert!(out
            .series
            .drift
            .iter()
            .all(|&d| (0.0..=std::f64::consts::PI).contains(&d)));
        assert!(out.series.time.last().copied().unwrap() > 14.9);
    }

    #[test]
    fn test_equal_seeds_reproduce() {
        let a = Engine::new(quick_cfg()).unwrap().run().unwrap();
        let b = Engine::new(quick_cfg()).unwrap().run().unwrap();
        assert_eq!(a.series.r_global, b.series.r_global);
        assert_eq!(a.births, b.births);
    }

    #[test]
    fn test_growth_budget_respected_end_to_end() {
        let mut cfg = quick_cfg();
        cfg.growth = Some(GrowthConfig {
            every: 10,
            budget: 4,
            require_coherence: 0.0,
            require_resource: 0.0,
            ..GrowthConfig::default()
        });
        let mut engine = Engine::new(cfg).unwrap();
        let out = engine.run().unwrap();
        assert!(out.births.len() as u32 <= 4);
        assert_eq!(out.summary.edges_birthed as usize, out.births.len());
    }

    #[test]
    fn test_higher_coupling_does_not_lower_tail_r() {
        let base = SimConfig {
            driver: Vec::new(),
            growth: None,
            steps: 1500,
            ..quick_cfg()
        };
        let low = {
            let mut engine = Engine::new(SimConfig {
                coupling_start: 0.3,
                coupling_end: 0.3,
                ..base.clone()
            })
            .unwrap();
            engine.run().unwrap().summary.r_tail_mean
        };
        let high = {
            let mut engine = Engine::new(SimConfig {
                coupling_start: 2.5,
                coupling_end: 2.5,
                ..base
            })
            .unwrap();
            engine.run().unwrap().summary.r_tail_mean
        };
        assert!(
            high + 1e-6 >= low,
            "tail R must not drop as K grows: {low:.3} vs {high:.3}"
        );
    }

    #[test]
    fn test_multi_layer_mode_runs() {
        let cfg = SimConfig {
            layer_mode: LayerMode::Multi {
                layers: 2,
                permeability: 0.4,
            },
            steps: 120,
            ..quick_cfg()
        };
        let mut engine = Engine::new(cfg).unwrap();
        let out = engine.run().unwrap();
        assert_eq!(out.series.len(), 120);
        assert!(out.series.r_global.iter().all(|&r| (0.0..=1.0).contains(&r)));
    }

    #[test]
    fn test_schedule_anneal_endpoints() {
        let engine = Engine::new(SimConfig {
            ritual: None,
            ..quick_cfg()
        })
        .unwrap();
        let (k0, n0, c0) = engine.schedule_at(0);
        let (k_end, n_end, _) = engine.schedule_at(299);
        assert!((k0 - 0.8).abs() < 1e-12);
        assert!((n0 - 0.02).abs() < 1e-12);
        assert_eq!(c0, 0.0);
        assert!((k_end - 1.2).abs() < 1e-12);
        assert!((n_end - 0.01).abs() < 1e-12);
    }

    #[test]
    fn test_ritual_cycle_modulates_cross_gain() {
        let engine = Engine::new(SimConfig {
            ritual: Some(RitualConfig {
                period: 100,
                cross_base_start: 0.01,
                cross_base_end: 0.01,
                cross_amp_start: 0.05,
                cross_amp_end: 0.05,
                noise_dip: 0.0,
            }),
            ..quick_cfg()
        })
        .unwrap();
        // quarter period: sin peaks, cycle = 1
        let (_, _, peak) = engine.schedule_at(25);
        // three-quarter period: sin bottoms, cycle = 0
        let (_, _, trough) = engine.schedule_at(75);
        assert!((peak - 0.06).abs() < 1e-9, "got {peak}");
        assert!((trough - 0.01).abs() < 1e-9, "got {trough}");
    }

    #[test]
    fn test_interventions_modify_schedule() {
        let engine = Engine::new(SimConfig {
            ritual: None,
            coupling_start: 1.0,
            coupling_end: 1.0,
            noise_start: 0.05,
            noise_end: 0.05,
            interventions: vec![
                Intervention {
                    t_start: 10,
                    t_end: 20,
                    kind: InterventionKind::CouplingFactor { factor: 2.0 },
                },
                Intervention {
                    t_start: 10,
                    t_end: 20,
                    kind: InterventionKind::NoiseOverride { noise_std: 0.0 },
                },
            ],
            ..quick_cfg()
        })
        .unwrap();
        let (k_in, n_in, _) = engine.schedule_at(15);
        let (k_out, n_out, _) = engine.schedule_at(25);
        assert!((k_in - 2.0).abs() < 1e-12);
        assert_eq!(n_in, 0.0);
        assert!((k_out - 1.0).abs() < 1e-12);
        assert!((n_out - 0.05).abs() < 1e-12);
    }

    #[test]
    fn test_bridge_intervention_adds_permanent_edge() {
        let cfg = SimConfig {
            topology: TopologyShape::Ring { nodes: 30 },
            growth: None,
            interventions: vec![Intervention {
                t_start: 5,
                t_end: 6,
                kind: InterventionKind::Bridge {
                    i: 0,
                    j: 15,
                    weight: 1.0,
                },
            }],
            steps: 20,
            ..quick_cfg()
        };
        let mut engine = Engine::new(cfg).unwrap();
        engine.run().unwrap();
        assert!(engine.adjacency().has_edge(0, 15));
    }

    #[test]
    fn test_breath_overrides_anneal() {
        let engine = Engine::new(SimConfig {
            ritual: None,
            breath: Some(BreathConfig {
                period: 20.0,
                inhale_ratio: 0.5,
                k_min: 0.4,
                k_max: 0.8,
            }),
            ..quick_cfg()
        })
        .unwrap();
        let (k0, _, _) = engine.schedule_at(0);
        // half period = 10 s = 200 steps at dt 0.05
        let (k_peak, _, _) = engine.schedule_at(200);
        assert!((k0 - 0.4).abs() < 1e-9);
        assert!((k_peak - 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_config_json_roundtrip() {
        let json = serde_json::to_string(&quick_cfg()).unwrap();
        let cfg = SimConfig::from_json(&json).unwrap();
        assert_eq!(cfg.n, 30);
        assert_eq!(cfg.steps, 300);
    }
}
