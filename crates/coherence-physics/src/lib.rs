// ─────────────────────────────────────────────────────────────────────
// Coherence Kernel — Physics
// (C) 1998-2026 Miroslav Sotek. All rights reserved.
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
#![deny(unsafe_code)]
//! Phase arithmetic, graph topologies, external drivers, and the
//! Euler-Maruyama oscillator field integrator (single and multi-layer).

pub mod driver;
pub mod field;
pub mod multilayer;
pub mod phase;
pub mod topology;

pub use driver::{Driver, DriverComponent};
pub use field::{FieldParams, OscillatorField, StepProfile};
pub use multilayer::{Layer, MultilayerField};
pub use phase::{angle_diff, circular_mean, order_parameter, wrap_phase};
pub use topology::{Adjacency, TopologyShape};
