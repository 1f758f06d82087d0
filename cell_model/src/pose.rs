//! Pose helpers over nalgebra's `Isometry3`.
//!
//! Poses are right-handed rigid transforms, lengths in millimetres and angles
//! in radians. Composition follows the column-vector convention of the DH
//! formulas: `a * b` applies `b` first, expressed in the frame of `a`.
//!
//! # Examples
//!
//! ```rust
//! use cell_model::pose::{self, Pose};
//!
//! let p: Pose = pose::from_xyz_wpr(100.0, 0.0, 50.0, 0.0, 0.0, std::f64::consts::FRAC_PI_2);
//! let [x, _, z, _, _, r] = pose::to_xyz_wpr(&p);
//! assert!((x - 100.0).abs() < 1e-9 && (z - 50.0).abs() < 1e-9);
//! assert!((r - std::f64::consts::FRAC_PI_2).abs() < 1e-9);
//! ```

use nalgebra::{Isometry3, Translation3, UnitQuaternion, Vector3};

pub type Pose = Isometry3<f64>;

pub fn identity() -> Pose {
    Pose::identity()
}

pub fn translation(x: f64, y: f64, z: f64) -> Pose {
    Pose::from_parts(Translation3::new(x, y, z), UnitQuaternion::identity())
}

pub fn rot_x(angle: f64) -> Pose {
    Pose::from_parts(
        Translation3::identity(),
        UnitQuaternion::from_axis_angle(&Vector3::x_axis(), angle),
    )
}

pub fn rot_y(angle: f64) -> Pose {
    Pose::from_parts(
        Translation3::identity(),
        UnitQuaternion::from_axis_angle(&Vector3::y_axis(), angle),
    )
}

pub fn rot_z(angle: f64) -> Pose {
    Pose::from_parts(
        Translation3::identity(),
        UnitQuaternion::from_axis_angle(&Vector3::z_axis(), angle),
    )
}

/// Builds a pose from a position and W-P-R angles, `R = Rz(r)·Ry(p)·Rx(w)`.
pub fn from_xyz_wpr(x: f64, y: f64, z: f64, w: f64, p: f64, r: f64) -> Pose {
    Pose::from_parts(
        Translation3::new(x, y, z),
        UnitQuaternion::from_euler_angles(w, p, r),
    )
}

/// Inverse of [`from_xyz_wpr`].
pub fn to_xyz_wpr(pose: &Pose) -> [f64; 6] {
    let (w, p, r) = pose.rotation.euler_angles();
    let t = &pose.translation.vector;
    [t.x, t.y, t.z, w, p, r]
}

/// Transform that maps poses expressed relative to `from` onto `to`.
pub fn plane_to_plane(from: &Pose, to: &Pose) -> Pose {
    to * from.inverse()
}

/// Re-expresses `pose` so that it keeps its placement relative to `to`
/// instead of `from`.
pub fn orient(pose: &Pose, from: &Pose, to: &Pose) -> Pose {
    plane_to_plane(from, to) * pose
}

pub fn x_axis(pose: &Pose) -> Vector3<f64> {
    pose.rotation * Vector3::x()
}

pub fn y_axis(pose: &Pose) -> Vector3<f64> {
    pose.rotation * Vector3::y()
}

pub fn z_axis(pose: &Pose) -> Vector3<f64> {
    pose.rotation * Vector3::z()
}

/// True when both poses agree within a position and an angle tolerance.
pub fn approx_eq(a: &Pose, b: &Pose, position_tolerance: f64, angle_tolerance: f64) -> bool {
    let dp = (a.translation.vector - b.translation.vector).norm();
    dp <= position_tolerance && rotation_angle(a, b) <= angle_tolerance
}

/// Angle of the rotation taking `a` onto `b`, accurate near zero.
pub fn rotation_angle(a: &Pose, b: &Pose) -> f64 {
    let q = a.rotation.inverse() * b.rotation;
    2.0 * q.imag().norm().atan2(q.w.abs())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn test_wpr_matches_rz_ry_rx() {
        let (w, p, r) = (0.3, -0.2, 1.1);
        let pose = from_xyz_wpr(1.0, 2.0, 3.0, w, p, r);
        let expected = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), r)
            * UnitQuaternion::from_axis_angle(&Vector3::y_axis(), p)
            * UnitQuaternion::from_axis_angle(&Vector3::x_axis(), w);
        let expected = Pose::from_parts(Translation3::new(1.0, 2.0, 3.0), expected);
        assert!(approx_eq(&pose, &expected, 1e-12, 1e-12));

        let back = to_xyz_wpr(&pose);
        for (a, b) in back.iter().zip([1.0, 2.0, 3.0, w, p, r]) {
            assert!((a - b).abs() < 1e-9, "{} != {}", a, b);
        }
    }

    #[test]
    fn test_orient_keeps_relative_placement() {
        let from = translation(100.0, 0.0, 0.0);
        let to = translation(0.0, 200.0, 0.0) * rot_z(FRAC_PI_2);
        let pose = translation(110.0, 0.0, 0.0);

        let moved = orient(&pose, &from, &to);
        let rel_before = from.inverse() * pose;
        let rel_after = to.inverse() * moved;
        assert!(approx_eq(&rel_before, &rel_after, 1e-9, 1e-12));
        assert!((moved.translation.y - 210.0).abs() < 1e-9);
    }

    #[test]
    fn test_axes() {
        let pose = rot_x(FRAC_PI_2);
        assert!((z_axis(&pose) - Vector3::new(0.0, -1.0, 0.0)).norm() < 1e-12);
        assert!((y_axis(&pose) - Vector3::new(0.0, 0.0, 1.0)).norm() < 1e-12);
        assert!((x_axis(&pose) - Vector3::x()).norm() < 1e-12);
    }
}
