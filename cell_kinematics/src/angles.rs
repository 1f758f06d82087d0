use std::f64::consts::{PI, TAU};

use cell_model::Joint;

/// Wraps an angle into `(-PI, PI]`.
pub fn normalize(angle: f64) -> f64 {
    let mut a = angle % TAU;
    if a <= -PI {
        a += TAU;
    } else if a > PI {
        a -= TAU;
    }
    a
}

/// The representation of `angle` closest to `reference`.
pub fn unwrap(angle: f64, reference: f64) -> f64 {
    angle - ((angle - reference) / TAU).round() * TAU
}

/// Shortest distance between two angles, in `[0, PI]`.
pub fn angular_distance(a: f64, b: f64) -> f64 {
    let d = (a - b).abs() % TAU;
    d.min(TAU - d)
}

/// Unwraps every revolute joint value onto the previous joints. Prismatic
/// values pass through.
pub fn absolute_joints(values: &mut [f64], previous: &[f64], joints: &[Joint]) {
    for ((value, &prev), joint) in values.iter_mut().zip(previous).zip(joints) {
        if joint.is_revolute() {
            *value = unwrap(*value, prev);
        }
    }
}

/// Sum of squared wrap-aware differences.
pub fn squared_difference(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(&x, &y)| angular_distance(x, y).powi(2))
        .sum()
}
