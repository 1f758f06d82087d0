//! Damped Newton iteration shared by the iterative solvers.

use cell_model::{pose, Pose};
use nalgebra::{DMatrix, DVector, Vector3, Vector6};
use tracing::{trace, warn};

use crate::chain::ArmChain;
use crate::config::NumericalConfig;

/// Keeps one redundant axis near `value` through the Jacobian null space.
#[derive(Debug, Clone, Copy)]
pub(crate) struct NullSpaceTarget {
    pub axis: usize,
    pub value: f64,
}

#[derive(Debug, Clone)]
pub(crate) struct NewtonOutcome {
    pub joints: Vec<f64>,
    pub iterations: usize,
    pub converged: bool,
    pub singular: bool,
}

/// Position and orientation error taking `current` onto `target`.
///
/// The orientation part is half the sum of the cross products of matching
/// axes. Near a half turn those cross products vanish, so the error is
/// rebuilt from the rotation angle about the best available axis.
pub(crate) fn pose_error(current: &Pose, target: &Pose) -> Vector6<f64> {
    let dp = target.translation.vector - current.translation.vector;
    let axes = |p: &Pose| [pose::x_axis(p), pose::y_axis(p), pose::z_axis(p)];
    let (c, t) = (axes(current), axes(target));

    let mut dr: Vector3<f64> = (0..3).map(|i| c[i].cross(&t[i])).sum::<Vector3<f64>>() * 0.5;
    let trace: f64 = (0..3).map(|i| c[i].dot(&t[i])).sum();
    if trace < 0.0 {
        let angle = ((trace - 1.0) / 2.0).clamp(-1.0, 1.0).acos();
        let axis = if dr.norm() > 1e-9 {
            dr.normalize()
        } else {
            // half turn: columns of R + I are parallel to the rotation axis
            let sums = [c[0] + t[0], c[1] + t[1], c[2] + t[2]];
            let best = sums
                .iter()
                .copied()
                .fold(Vector3::zeros(), |a: Vector3<f64>, b| if b.norm() > a.norm() { b } else { a });
            if best.norm() > 1e-12 {
                best.normalize()
            } else {
                Vector3::z()
            }
        };
        dr = axis * angle;
    }
    Vector6::new(dp.x, dp.y, dp.z, dr.x, dr.y, dr.z)
}

/// Finite difference Jacobian of the flange pose over the `free` joints,
/// rotation rows scaled by `weight`.
pub(crate) fn jacobian(chain: &ArmChain, joints: &[f64], free: &[usize], step: f64, weight: f64) -> DMatrix<f64> {
    let current = chain.flange(joints);
    let axes = [pose::x_axis(&current), pose::y_axis(&current), pose::z_axis(&current)];
    let mut j = DMatrix::zeros(6, free.len());
    let mut probe = joints.to_vec();
    for (col, &axis) in free.iter().enumerate() {
        probe[axis] = joints[axis] + step;
        let moved = chain.flange(&probe);
        probe[axis] = joints[axis];

        let dp = (moved.translation.vector - current.translation.vector) / step;
        let moved_axes = [pose::x_axis(&moved), pose::y_axis(&moved), pose::z_axis(&moved)];
        let dr = (0..3).map(|i| axes[i].cross(&moved_axes[i])).sum::<Vector3<f64>>() * (0.5 * weight / step);
        for r in 0..3 {
            j[(r, col)] = dp[r];
            j[(r + 3, col)] = dr[r];
        }
    }
    j
}

/// Solves `m x = b` by LU decomposition, `None` when `m` is numerically
/// singular.
fn solve_lu(m: DMatrix<f64>, b: &DVector<f64>) -> Option<DVector<f64>> {
    let lu = m.lu();
    let diagonal = lu.u().diagonal();
    let largest = diagonal.iter().fold(0.0_f64, |a, v| a.max(v.abs()));
    let smallest = diagonal.iter().fold(f64::INFINITY, |a, v| a.min(v.abs()));
    if largest == 0.0 || smallest / largest < 1e-14 {
        return None;
    }
    lu.solve(b).filter(|x| x.iter().all(|v| v.is_finite()))
}

/// Applies the Moore-Penrose pseudo-inverse of `j` to `v`, through the left
/// normal equations for tall or square `j` and the right ones for wide `j`.
pub(crate) fn pseudo_inverse_apply(j: &DMatrix<f64>, v: &DVector<f64>) -> Option<DVector<f64>> {
    if j.nrows() >= j.ncols() {
        solve_lu(j.transpose() * j, &(j.transpose() * v))
    } else {
        let y = solve_lu(j * j.transpose(), v)?;
        Some(j.transpose() * y)
    }
}

fn weighted(error: &Vector6<f64>, weight: f64) -> DVector<f64> {
    DVector::from_iterator(
        6,
        error
            .iter()
            .enumerate()
            .map(|(i, v)| if i < 3 { *v } else { v * weight }),
    )
}

fn error_norms(error: &Vector6<f64>) -> (f64, f64) {
    (error.fixed_rows::<3>(0).norm(), error.fixed_rows::<3>(3).norm())
}

fn merit(error: &Vector6<f64>, weight: f64) -> f64 {
    let (p, r) = error_norms(error);
    (p * p + weight * weight * r * r).sqrt()
}

/// Newton iteration with a finite difference Jacobian, step clamping and a
/// line search over `step_scale * i`. Joints outside `free` keep their seed
/// values.
pub(crate) fn newton(
    chain: &ArmChain,
    target: &Pose,
    seed: &[f64],
    free: &[usize],
    null_space: Option<NullSpaceTarget>,
    config: &NumericalConfig,
) -> NewtonOutcome {
    let weight = config.orientation_weight;
    let mut q = seed.to_vec();
    let mut singular = false;
    let mut iterations = 0;

    let converged_at = |q: &[f64]| {
        let (p, r) = error_norms(&pose_error(&chain.flange(q), target));
        p < config.position_tolerance && r < config.angle_tolerance
    };

    while iterations < config.max_iterations {
        let error = pose_error(&chain.flange(&q), target);
        let (p, r) = error_norms(&error);
        let task_done = p < config.position_tolerance && r < config.angle_tolerance;
        if task_done && null_space.is_none() {
            break;
        }

        let e = weighted(&error, weight);
        let mut solved = None;
        for attempt in 0..=config.singular_retries {
            let j = jacobian(chain, &q, free, config.finite_difference_step, weight);
            if let Some(dq) = pseudo_inverse_apply(&j, &e) {
                solved = Some((j, dq));
                break;
            }
            if attempt < config.singular_retries {
                let nudge = 0.05 * (attempt + 1) as f64;
                warn!(iteration = iterations, nudge, "singular jacobian, perturbing joints");
                for (k, &axis) in free.iter().enumerate() {
                    q[axis] += if k % 2 == 0 { nudge } else { -nudge };
                }
            }
        }
        let Some((j, mut dq)) = solved else {
            warn!(iteration = iterations, "jacobian stayed singular");
            singular = true;
            break;
        };

        let mut nz = DVector::zeros(free.len());
        if let Some(ns) = null_space {
            if let Some(col) = free.iter().position(|&a| a == ns.axis) {
                let mut unit = DVector::zeros(free.len());
                unit[col] = 1.0;
                if let Some(projected) = pseudo_inverse_apply(&j, &(&j * &unit)) {
                    let direction = unit - projected;
                    if direction[col] > 1e-6 {
                        let scale = config.null_space_gain * (ns.value - q[ns.axis]) / direction[col];
                        nz = direction * scale;
                    }
                }
            }
            if task_done && nz.amax() < config.angle_tolerance {
                break;
            }
        }

        let largest = dq.amax();
        if largest > config.max_step {
            dq *= config.max_step / largest;
        }
        let largest = nz.amax();
        if largest > config.max_step {
            nz *= config.max_step / largest;
        }

        let mut best: Option<(f64, Vec<f64>, f64)> = None;
        for i in 1..=config.line_search_steps {
            let s = config.step_scale * i as f64;
            let mut candidate = q.clone();
            for (k, &axis) in free.iter().enumerate() {
                candidate[axis] += s * dq[k] + nz[k];
            }
            let value = merit(&pose_error(&chain.flange(&candidate), target), weight);
            if best.as_ref().map_or(true, |(b, _, _)| value < *b) {
                best = Some((value, candidate, s));
            }
        }
        iterations += 1;
        let Some((value, candidate, s)) = best else {
            break;
        };
        let update = (0..free.len()).fold(0.0_f64, |a, k| a.max((s * dq[k] + nz[k]).abs()));
        trace!(iteration = iterations, merit = value, step = s, update, "newton step");
        q = candidate;
        if update < config.update_tolerance {
            break;
        }
    }

    let converged = !singular && converged_at(&q);
    NewtonOutcome {
        joints: q,
        iterations,
        converged,
        singular,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn test_pose_error_small_rotation() {
        let current = pose::identity();
        let target = pose::translation(1.0, 2.0, 3.0) * pose::rot_z(0.01);
        let e = pose_error(&current, &target);
        assert!((e[0] - 1.0).abs() < 1e-12 && (e[2] - 3.0).abs() < 1e-12);
        assert!((e[5] - 0.01).abs() < 1e-5, "rotation error about z: {}", e[5]);
    }

    #[test]
    fn test_pose_error_half_turn_is_not_zero() {
        let e = pose_error(&pose::identity(), &pose::rot_x(PI));
        let r = Vector3::new(e[3], e[4], e[5]);
        assert!((r.norm() - PI).abs() < 1e-6, "half turn should keep its magnitude");
        assert!(r.normalize().x.abs() > 0.999);
    }

    #[test]
    fn test_pseudo_inverse_shapes() {
        let tall = DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 0.0, 1.0, 0.0, 0.0]);
        let x = pseudo_inverse_apply(&tall, &DVector::from_vec(vec![2.0, 3.0, 4.0])).unwrap();
        assert!((x[0] - 2.0).abs() < 1e-12 && (x[1] - 3.0).abs() < 1e-12);

        let wide = DMatrix::from_row_slice(1, 2, &[1.0, 1.0]);
        let x = pseudo_inverse_apply(&wide, &DVector::from_vec(vec![2.0])).unwrap();
        assert!((x[0] - 1.0).abs() < 1e-12 && (x[1] - 1.0).abs() < 1e-12);

        let singular = DMatrix::from_row_slice(2, 2, &[1.0, 1.0, 1.0, 1.0]);
        assert!(pseudo_inverse_apply(&singular, &DVector::from_vec(vec![1.0, 1.0])).is_none());
    }
}
