// ─────────────────────────────────────────────────────────────────────
// Coherence Kernel — Types
// (C) 1998-2026 Miroslav Sotek. All rights reserved.
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
#![deny(unsafe_code)]
//! Type definitions, configuration, and error hierarchy for the
//! Coherence Kernel — the coupled-phase-oscillator simulation engine.

pub mod config;
pub mod error;
pub mod record;

pub use config::{EventConfig, GateConfig};
pub use error::{CoherenceError, CoherenceResult};
pub use record::{EventRecord, GateReport, RunSeries, RunSummary, StepSample};
