// ─────────────────────────────────────────────────────────────────────
// Coherence Kernel — Crystallisation
// (C) 1998-2026 Miroslav Sotek. All rights reserved.
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
#![deny(unsafe_code)]
//! Per-node resource dynamics and anchor crystallisation.
//!
//! Nodes with sustained local coherence and a resource surplus lock in
//! as anchors (boosted coupling, reduced noise); starved anchors decay
//! on an exponential half-life. A finite edge-birth budget lets fully
//! crystallised regions grow permanent long-range structure.

pub mod anchors;
pub mod growth;

pub use anchors::{drop_probability, CrystalConfig, CrystalField};
pub use growth::{EdgeBirth, EdgeGrowth, GrowthConfig};
