// ─────────────────────────────────────────────────────────────────────
// Coherence Kernel — Core Engine
// (C) 1998-2026 Miroslav Sotek. All rights reserved.
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
#![deny(unsafe_code)]
//! Single-threaded simulation loop over the oscillator field, the
//! crystallisation model, and the external driver, plus the two
//! creation-event detectors that scan the recorded series.

pub mod detector;
pub mod engine;

pub use detector::{detect_events, evaluate_gates, tuning_recommendations, GateInputs};
pub use engine::{
    BreathConfig, Engine, Intervention, InterventionKind, LayerMode, RitualConfig, RunOutput,
    SimConfig,
};
