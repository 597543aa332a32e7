//! Transition timing for viewport moves.

use crate::geom::{DiagramBox, edge_distance};
use std::time::Duration;

/// Scale (in diagram units) at which the sigmoid starts to saturate.
const DISTANCE_SCALE: f64 = 1000.0;
/// Upper bound of the transition duration in milliseconds.
const MAX_DURATION_MS: f64 = 1000.0;

/// Duration of a move between two framed rectangles.
///
/// `1000 * e^(d/1000) / (e^(d/1000) + 1)` milliseconds, where `d` is the distance over the four
/// edges. Evaluated as `1000 / (1 + e^(-d/1000))`, which is the same curve but does not overflow
/// for very long jumps: 500ms for a zero-length move, approaching 1000ms as `d` grows.
pub fn sigmoid_duration(from: &DiagramBox, to: &DiagramBox) -> Duration {
    let d = edge_distance(from, to);
    let d = if d.is_finite() { d } else { f64::MAX };
    let ms = MAX_DURATION_MS / (1.0 + (-d / DISTANCE_SCALE).exp());
    Duration::from_secs_f64(ms / 1000.0)
}

/// Progress curve used when sampling a transition (`t` in `[0, 1]`).
pub fn ease_out(t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0);
    1.0 - (1.0 - t).powi(3)
}
