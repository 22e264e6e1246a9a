// ─────────────────────────────────────────────────────────────────────
// Coherence Kernel — Observers
// (C) 1998-2026 Miroslav Sotek. All rights reserved.
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
#![deny(unsafe_code)]
//! Read-only coherence metrics over phase snapshots and histories.
//!
//! One canonical definition per metric; the engine and the event
//! detectors both read from here. Windowed variants report an explicit
//! insufficient-data marker before the first full window.

pub mod flow;
pub mod metrics;
pub mod pairwise;
pub mod windows;

pub use flow::{
    breath_envelope, clamp_risk, cosine_ease01, coupling_breath, hum_index, metrics_bundle,
    turbulence, FlowBundle,
};
pub use metrics::{
    anchor_fraction, cross_edge_sync, lag1_smoothness, local_coherence, mean_drift,
    phase_coherence, phase_entropy, LockTracker, MetricsConfig,
};
pub use pairwise::{phase_diffusion, phase_diffusion_windowed, plv_matrix, plv_pair, ppc_pair};
pub use windows::{poly_slope, sliding_entropy, sliding_plv, tail_mean};
