//! Ready-made mechanism definitions for common robots and external axes.
//!
//! The FANUC CRX tables use the Modified Denavit-Hartenberg (DHm) parameters
//! of Abbes and Poisson, "Geometric Approach for Inverse Kinematics of the
//! FANUC CRX Collaborative Robot" (Robotics 2024, 13, 91). The CRX-30iA is
//! the CRX-10iA scaled by the reach ratio.
use std::f64::consts::{FRAC_PI_2, PI, TAU};

use cell_model::{
    pose, ArmSolverKind, DhConvention, Joint, Manufacturer, Mechanism, MechanismKind, Range, RobotArm,
};
use serde::{Deserialize, Serialize};

/// Scale from the CRX-10iA to the CRX-30iA (1756 mm / 1070 mm reach).
const CRX_30IA_SCALE: f64 = 1.641121495327103;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RobotModel {
    #[default]
    Crx10iA,
    Crx30iA,
    /// Six axis arm with a spherical wrist and no offsets besides the upper
    /// arm and the flange.
    GenericSpherical,
    Ur5,
    Ur10,
    FrankaPanda,
    /// Geometry only, inverse kinematics is not available.
    DoosanM1013,
}

fn revolute(a: f64, d: f64, alpha: f64, theta: f64, limit_deg: (f64, f64)) -> Joint {
    Joint::revolute(a, d, alpha, theta, Range::new(limit_deg.0.to_radians(), limit_deg.1.to_radians()))
}

fn arm(name: &str, arm: RobotArm, joints: Vec<Joint>) -> Mechanism {
    Mechanism::new(name, MechanismKind::RobotArm(arm), joints, pose::identity())
}

/// FANUC CRX arm scaled by `scale`. Axis 3 is measured from the horizontal,
/// so its DH angle also contains axis 2.
fn crx(name: &str, scale: f64) -> Mechanism {
    let joints = vec![
        revolute(0.0, 0.0, 0.0, 0.0, (-180.0, 180.0)),
        revolute(0.0, 0.0, -FRAC_PI_2, -FRAC_PI_2, (-180.0, 180.0)),
        revolute(540.0 * scale, 0.0, PI, 0.0, (-270.0, 270.0)),
        revolute(0.0, -540.0 * scale, -FRAC_PI_2, 0.0, (-190.0, 190.0)),
        revolute(0.0, 150.0 * scale, FRAC_PI_2, 0.0, (-180.0, 180.0)),
        revolute(0.0, -160.0 * scale, -FRAC_PI_2, 0.0, (-225.0, 225.0)),
    ];
    let kind = RobotArm {
        manufacturer: Manufacturer::Fanuc,
        convention: DhConvention::Modified,
        solver: ArmSolverKind::Numerical { redundant: None },
        flange: pose::rot_x(PI),
        j2_j3_coupled: true,
    };
    arm(name, kind, joints)
}

/// Six axis standard DH arm, every axis limited to one turn either way.
fn standard_arm(name: &str, manufacturer: Manufacturer, solver: ArmSolverKind, a: [f64; 6], d: [f64; 6], alpha: [f64; 6]) -> Mechanism {
    let joints = (0..6)
        .map(|i| Joint::revolute(a[i], d[i], alpha[i], 0.0, Range::new(-TAU, TAU)))
        .collect();
    let kind = RobotArm {
        manufacturer,
        convention: DhConvention::Standard,
        solver,
        flange: pose::identity(),
        j2_j3_coupled: false,
    };
    arm(name, kind, joints)
}

fn ur(name: &str, a: [f64; 6], d: [f64; 6]) -> Mechanism {
    let alpha = [FRAC_PI_2, 0.0, 0.0, FRAC_PI_2, -FRAC_PI_2, 0.0];
    standard_arm(name, Manufacturer::UniversalRobots, ArmSolverKind::OffsetWrist, a, d, alpha)
}

/// Franka Emika Panda with the given solver. The flange sits 107 mm past
/// the last DH frame.
pub fn franka_panda(solver: ArmSolverKind) -> Mechanism {
    let a = [0.0, 0.0, 0.0, 82.5, -82.5, 0.0, 88.0];
    let d = [333.0, 0.0, 316.0, 0.0, 384.0, 0.0, 0.0];
    let alpha = [0.0, -FRAC_PI_2, FRAC_PI_2, FRAC_PI_2, -FRAC_PI_2, FRAC_PI_2, FRAC_PI_2];
    let limits = [
        (-2.8973, 2.8973),
        (-1.7628, 1.7628),
        (-2.8973, 2.8973),
        (-3.0718, -0.0698),
        (-2.8973, 2.8973),
        (-0.0175, 3.7525),
        (-2.8973, 2.8973),
    ];
    let joints = (0..7)
        .map(|i| Joint::revolute(a[i], d[i], alpha[i], 0.0, Range::new(limits[i].0, limits[i].1)))
        .collect();
    let kind = RobotArm {
        manufacturer: Manufacturer::Franka,
        convention: DhConvention::Modified,
        solver,
        flange: pose::translation(0.0, 0.0, 107.0),
        j2_j3_coupled: false,
    };
    arm("Franka Panda", kind, joints)
}

/// Mechanism definition of a robot model.
pub fn robot(model: RobotModel) -> Mechanism {
    match model {
        RobotModel::Crx10iA => crx("CRX-10iA", 1.0),
        RobotModel::Crx30iA => crx("CRX-30iA", CRX_30IA_SCALE),
        RobotModel::GenericSpherical => standard_arm(
            "generic spherical wrist",
            Manufacturer::Other,
            ArmSolverKind::SphericalWrist,
            [0.0, -300.0, 0.0, 0.0, 0.0, 0.0],
            [400.0, 0.0, 0.0, 300.0, 0.0, 100.0],
            [FRAC_PI_2, 0.0, FRAC_PI_2, -FRAC_PI_2, FRAC_PI_2, 0.0],
        ),
        RobotModel::Ur5 => ur(
            "UR5",
            [0.0, -425.0, -392.25, 0.0, 0.0, 0.0],
            [89.16, 0.0, 0.0, 109.15, 94.65, 82.3],
        ),
        RobotModel::Ur10 => ur(
            "UR10",
            [0.0, -612.0, -572.3, 0.0, 0.0, 0.0],
            [127.3, 0.0, 0.0, 163.941, 115.7, 92.2],
        ),
        RobotModel::FrankaPanda => franka_panda(ArmSolverKind::FrankaNumerical),
        // nominal geometry
        RobotModel::DoosanM1013 => standard_arm(
            "Doosan M1013",
            Manufacturer::Doosan,
            ArmSolverKind::NotImplemented,
            [0.0, 620.0, 0.0, 0.0, 0.0, 0.0],
            [152.5, 0.0, 0.0, 559.0, 0.0, 121.0],
            [-FRAC_PI_2, 0.0, FRAC_PI_2, -FRAC_PI_2, FRAC_PI_2, 0.0],
        ),
    }
}

/// Linear track along the cell X axis carrying a robot.
pub fn track(length: f64) -> Mechanism {
    let joint = Joint::prismatic(0.0, 0.0, 0.0, 0.0, Range::new(0.0, length)).with_plane(pose::rot_y(FRAC_PI_2));
    Mechanism::new("track", MechanismKind::Track, vec![joint], pose::identity()).moving_robot()
}

/// Two axis tilt and turn positioner. Axis 1 tilts about X at `height`,
/// axis 2 turns about the table normal.
pub fn positioner(height: f64) -> Mechanism {
    let tilt = Joint::revolute(0.0, 0.0, 0.0, 0.0, Range::new(-FRAC_PI_2, FRAC_PI_2))
        .with_plane(pose::translation(0.0, 0.0, height) * pose::rot_y(FRAC_PI_2));
    let turn = Joint::revolute(0.0, 0.0, 0.0, 0.0, Range::new(-TAU, TAU))
        .with_plane(pose::translation(0.0, 0.0, height + 100.0));
    Mechanism::new("positioner", MechanismKind::Positioner, vec![tilt, turn], pose::identity())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::ArmChain;

    #[test]
    fn test_presets_are_valid() {
        for model in [
            RobotModel::Crx10iA,
            RobotModel::Crx30iA,
            RobotModel::GenericSpherical,
            RobotModel::Ur5,
            RobotModel::Ur10,
            RobotModel::FrankaPanda,
            RobotModel::DoosanM1013,
        ] {
            let mechanism = robot(model);
            assert!(mechanism.validate().is_ok(), "{:?} should validate", model);
        }
        assert!(track(4000.0).validate().is_ok());
        assert!(positioner(800.0).validate().is_ok());
    }

    #[test]
    fn test_crx_30ia_scaled() {
        let small = ArmChain::from_mechanism(&robot(RobotModel::Crx10iA)).unwrap();
        let large = ArmChain::from_mechanism(&robot(RobotModel::Crx30iA)).unwrap();
        let p10 = small.flange(&[0.0; 6]).translation.vector;
        let p30 = large.flange(&[0.0; 6]).translation.vector;

        println!("CRX-10iA zero: {:?}, CRX-30iA zero: {:?}", p10, p30);
        assert!((p10.x - 700.0).abs() < 1e-6);
        assert!((p30.x - 700.0 * CRX_30IA_SCALE).abs() < 1e-6);
        assert!((p30.z - 540.0 * CRX_30IA_SCALE).abs() < 1e-6);
    }

    #[test]
    fn test_default_model() {
        assert_eq!(RobotModel::default(), RobotModel::Crx10iA);
    }
}
