// ─────────────────────────────────────────────────────────────────────
// Coherence Kernel — Creation-Event Detection
// ─────────────────────────────────────────────────────────────────────
//! Testable criteria for flagging an emergence ("creation") event.
//!
//! Two models:
//!   1. Upward crossing of R(t) through `r_event`, held for `t_hold`
//!      seconds, with coupling and anchor-fraction guards at the
//!      crossing index.
//!   2. A five-gate verdict over full recorded series; the verdict is
//!      the conjunction of all gates and the sovereignty gate is
//!      pierced through from the caller, never computed here.
//!
//! This module asserts only what the traces show: a computational
//! detection of abrupt coherence, nothing more.

use tracing::debug;

use coherence_observers::poly_slope;
use coherence_types::{
    CoherenceError, CoherenceResult, EventConfig, EventRecord, GateConfig, GateReport,
};

/// Scan for upward crossings of `r_event` that hold.
///
/// Emits one event per sustained crossing — the scan jumps past each
/// plateau so a single long hold is never double-counted. A crossing
/// too close to the end of the record to fill the hold window does not
/// qualify. No qualifying crossing is an empty result, not an error.
pub fn detect_events(
    r: &[f64],
    coupling: &[f64],
    anchors: &[f64],
    dt: f64,
    cfg: &EventConfig,
) -> CoherenceResult<Vec<EventRecord>> {
    if r.len() != coupling.len() || r.len() != anchors.len() {
        return Err(CoherenceError::Shape(format!(
            "series lengths differ: R={}, K={}, anchors={}",
            r.len(),
            coupling.len(),
            anchors.len()
        )));
    }
    if dt <= 0.0 {
        return Err(CoherenceError::Detector(format!("dt must be > 0, got {dt}")));
    }
    cfg.validate()?;

    let t_len = r.len();
    let hold_steps = ((cfg.t_hold / dt).round() as usize).max(1);
    let mut events = Vec::new();

    let mut i = 1;
    while i < t_len {
        let rising = r[i - 1] < cfg.r_event && r[i] >= cfg.r_event;
        if rising && i + hold_steps <= t_len {
            let held = r[i..i + hold_steps].iter().all(|&v| v >= cfg.r_event);
            if held && coupling[i] >= cfg.k_min && anchors[i] >= cfg.anchors_min {
                events.push(EventRecord {
                    t_sec: i as f64 * dt,
                    step: i as u64,
                    r: r[i],
                    coupling: coupling[i],
                });
                debug!(step = i, r = r[i], "creation event detected");
                i += hold_steps;
                continue;
            }
        }
        i += 1;
    }
    Ok(events)
}

/// Recorded series the multi-gate detector consumes.
#[derive(Debug, Clone, Copy)]
pub struct GateInputs<'a> {
    /// Global order parameter per step.
    pub r: &'a [f64],
    /// |wrapped gap| to the reference/driver per step.
    pub gap_abs: &'a [f64],
    /// Sustained anchor fraction per step.
    pub anchor_fraction: &'a [f64],
    /// Externally supplied; pierced through verbatim.
    pub sovereignty_ok: bool,
}

/// Evaluate the five gates. Undefined measurements (series too short
/// for a window) fail their gate rather than erroring.
pub fn evaluate_gates(inputs: &GateInputs, cfg: &GateConfig) -> GateReport {
    let r_last = inputs.r.last().copied().unwrap_or(0.0);
    let r_slope = poly_slope(inputs.r, cfg.trend_window);
    let coherence_rising =
        matches!(r_slope, Some(s) if s >= cfg.min_r_slope) && r_last >= cfg.r_floor;

    let gap_slope = poly_slope(inputs.gap_abs, cfg.gap_window);
    let gap_narrowing = matches!(gap_slope, Some(s) if s <= cfg.max_gap_slope);

    let have_anchor_window = inputs.anchor_fraction.len() >= cfg.anchor_window;
    let anchor_tail = if inputs.anchor_fraction.is_empty() {
        &[][..]
    } else {
        let take = cfg.anchor_window.min(inputs.anchor_fraction.len());
        &inputs.anchor_fraction[inputs.anchor_fraction.len() - take..]
    };
    let anchor_fraction_mean = if anchor_tail.is_empty() {
        0.0
    } else {
        anchor_tail.iter().sum::<f64>() / anchor_tail.len() as f64
    };
    let anchor_persistence =
        have_anchor_window && anchor_fraction_mean >= cfg.min_anchor_fraction;

    let births = birth_intervals(inputs.r, cfg.birth_threshold, cfg.birth_min_len);
    let births_clustered = clustered(&births, cfg.min_births);
    let birth_clustering = births_clustered;

    let verdict = coherence_rising
        && gap_narrowing
        && anchor_persistence
        && birth_clustering
        && inputs.sovereignty_ok;

    GateReport {
        coherence_rising,
        gap_narrowing,
        anchor_persistence,
        birth_clustering,
        sovereignty_ok: inputs.sovereignty_ok,
        verdict,
        r_last,
        r_slope,
        gap_slope,
        anchor_fraction_mean,
        births: births.len() as u32,
        births_clustered,
    }
}

/// Maximal runs where R stays at or above the threshold for at least
/// `min_len` steps, as (start, len) pairs.
fn birth_intervals(r: &[f64], threshold: f64, min_len: usize) -> Vec<(usize, usize)> {
    let mut out = Vec::new();
    let mut start = None;
    for (i, &v) in r.iter().enumerate() {
        match (start, v >= threshold) {
            (None, true) => start = Some(i),
            (Some(s), false) => {
                if i - s >= min_len {
                    out.push((s, i - s));
                }
                start = None;
            }
            _ => {}
        }
    }
    if let Some(s) = start {
        if r.len() - s >= min_len {
            out.push((s, r.len() - s));
        }
    }
    out
}

/// Births are "clustered" when there are at least `min_births` of them
/// AND either strictly more than half the inter-birth gaps fall below
/// their own median, or there are at least three births.
fn clustered(births: &[(usize, usize)], min_births: usize) -> bool {
    if births.len() < min_births.max(1) {
        return false;
    }
    if births.len() >= 3 {
        return true;
    }
    let mut gaps: Vec<usize> = births
        .windows(2)
        .map(|pair| pair[1].0 - (pair[0].0 + pair[0].1))
        .collect();
    if gaps.is_empty() {
        return false;
    }
    gaps.sort_unstable();
    let median = if gaps.len() % 2 == 1 {
        gaps[gaps.len() / 2] as f64
    } else {
        (gaps[gaps.len() / 2 - 1] + gaps[gaps.len() / 2]) as f64 / 2.0
    };
    let below = gaps.iter().filter(|&&g| (g as f64) < median).count();
    below * 2 > gaps.len()
}

/// One human-readable suggestion per failing gate; a single no-op
/// confirmation when every gate passes.
pub fn tuning_recommendations(report: &GateReport) -> Vec<String> {
    let mut out = Vec::new();
    if !report.coherence_rising {
        out.push(format!(
            "coherence not rising (slope {:?}, last R {:.3}): raise coupling, \
             extend the run, or lower the noise schedule",
            report.r_slope, report.r_last
        ));
    }
    if !report.gap_narrowing {
        out.push(format!(
            "gap to the reference not narrowing (slope {:?}): increase driver \
             gain or slow the driver so the field can track it",
            report.gap_slope
        ));
    }
    if !report.anchor_persistence {
        out.push(format!(
            "sustained lock fraction {:.3} under target: feed resources or \
             widen the lock tolerance before asking for persistence",
            report.anchor_fraction_mean
        ));
    }
    if !report.birth_clustering {
        out.push(format!(
            "{} qualifying births, clustering not established: lower the birth \
             threshold or lengthen the record",
            report.births
        ));
    }
    if !report.sovereignty_ok {
        out.push(
            "sovereignty hold is external: do not force it here; revisit consent \
             and rerun"
                .to_string(),
        );
    }
    if out.is_empty() {
        out.push("all gates pass: confirmed — hold, no tuning needed".to_string());
    }
    out
}
