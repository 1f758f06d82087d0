use std::f64::consts::{FRAC_PI_2, PI};

use cell_model::{pose, DhConvention, Diagnostic, Pose, Result};
use nalgebra::Vector3;

use super::{clamp_unit, expect_param, unsupported, ArmKinematics, IkRequest, IkSolution};
use crate::angles;
use crate::chain::{dh, ArmChain};
use crate::config::KinematicsConfig;

const NAME: &str = "offset wrist";

/// Closed-form solver for UR style arms, where the wrist axes are offset
/// instead of intersecting.
///
/// Standard DH with `alpha = [90°, 0, 0, 90°, -90°, 0]`, `a` only on axes 2
/// and 3 and `d` only on axes 1, 4, 5 and 6.
#[derive(Debug, Clone)]
pub struct OffsetWristKinematics {
    chain: ArmChain,
    singularity_threshold: f64,
}

impl OffsetWristKinematics {
    pub fn new(chain: ArmChain, config: &KinematicsConfig) -> Result<Self> {
        if chain.len() != 6 {
            return Err(unsupported(NAME, format!("{} axes", chain.len())));
        }
        if chain.convention() != DhConvention::Standard {
            return Err(unsupported(NAME, "requires standard DH parameters"));
        }
        let j = chain.joints();
        if j.iter().any(|joint| !joint.is_revolute()) {
            return Err(unsupported(NAME, "all axes must be revolute"));
        }
        for (axis, alpha) in [FRAC_PI_2, 0.0, 0.0, FRAC_PI_2, -FRAC_PI_2, 0.0].into_iter().enumerate() {
            expect_param(NAME, "alpha", axis, j[axis].alpha, alpha)?;
        }
        for axis in [0, 3, 4, 5] {
            expect_param(NAME, "a", axis, j[axis].a, 0.0)?;
        }
        for axis in [1, 2] {
            expect_param(NAME, "d", axis, j[axis].d, 0.0)?;
        }
        if j[1].a == 0.0 || j[2].a == 0.0 || j[5].d == 0.0 {
            return Err(unsupported(NAME, "zero link length"));
        }
        Ok(Self {
            chain,
            singularity_threshold: config.singularity_threshold,
        })
    }
}

impl ArmKinematics for OffsetWristKinematics {
    fn chain(&self) -> &ArmChain {
        &self.chain
    }

    fn inverse(&self, flange: &Pose, request: &IkRequest) -> IkSolution {
        let j = self.chain.joints();
        let mut solution = IkSolution {
            joints: vec![0.0; 6],
            errors: Vec::new(),
        };
        let shoulder = request.configuration.shoulder();
        let elbow = request.configuration.elbow() != shoulder;
        let wrist = request.configuration.wrist();

        let (a2, a3) = (j[1].a, j[2].a);
        let (d1, d4, d6) = (j[0].d, j[3].d, j[5].d);
        let reach = a2.abs() + a3.abs() + j[4].d.abs() + d6.abs();

        let t6_pose = flange * self.chain.flange_offset().inverse();
        let p6 = t6_pose.translation.vector;
        let p5 = p6 - pose::z_axis(&t6_pose) * d6;

        // axis 1: the wrist must sit on a line at distance d4 from the axis
        let radius = p5.x.hypot(p5.y);
        let psi = p5.y.atan2(p5.x);
        let lateral = (radius * radius - d4 * d4).max(0.0).sqrt();
        if lateral < self.singularity_threshold * reach {
            solution.push_once(Diagnostic::NearOverheadSingularity);
        }
        let u = if radius > 0.0 { d4 / radius } else { 2.0 };
        let asin_u = clamp_unit(u, &mut solution).asin();
        let t1 = if shoulder { psi + PI - asin_u } else { psi + asin_u };
        let (s1, c1) = t1.sin_cos();

        // axis 5 from the flange position along the axis 1 normal
        let c5 = clamp_unit((s1 * p6.x - c1 * p6.y - d4) / d6, &mut solution);
        let t5 = if wrist { -c5.acos() } else { c5.acos() };
        let s5 = t5.sin();

        // axis 6 from the axis 1 normal seen from the flange
        let t6 = if s5.abs() < self.singularity_threshold {
            solution.push_once(Diagnostic::NearWristSingularity);
            0.0
        } else {
            let n = t6_pose.rotation.inverse() * Vector3::new(s1, -c1, 0.0);
            (-n.y / s5).atan2(n.x / s5)
        };

        // planar subproblem for axes 2, 3 and 4
        let t01 = dh(j[0].a, d1, j[0].alpha, t1);
        let t46 = dh(0.0, j[4].d, j[4].alpha, t5) * dh(0.0, d6, j[5].alpha, t6);
        let t14 = t01.inverse() * t6_pose * t46.inverse();
        let (x, y) = (t14.translation.x, t14.translation.y);

        let c3 = clamp_unit((x * x + y * y - a2 * a2 - a3 * a3) / (2.0 * a2 * a3), &mut solution);
        let t3 = if elbow { -c3.acos() } else { c3.acos() };
        let t2 = y.atan2(x) - (a3 * t3.sin()).atan2(a2 + a3 * t3.cos());

        let planar = t14 * pose::rot_x(-FRAC_PI_2);
        let x_axis = pose::x_axis(&planar);
        let t4 = x_axis.y.atan2(x_axis.x) - t2 - t3;

        for (i, theta) in [t1, t2, t3, t4, t5, t6].into_iter().enumerate() {
            solution.joints[i] = angles::normalize(j[i].joint_value(theta));
        }
        solution
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::presets::{self, RobotModel};
    use cell_model::RobotConfigurations;

    fn solver(model: RobotModel) -> OffsetWristKinematics {
        let chain = ArmChain::from_mechanism(&presets::robot(model)).unwrap();
        OffsetWristKinematics::new(chain, &KinematicsConfig::default()).unwrap()
    }

    fn matches(a: &[f64], b: &[f64]) -> bool {
        a.iter().zip(b).all(|(x, y)| angles::angular_distance(*x, *y) < 1e-6)
    }

    #[test]
    fn test_exactly_one_branch_reproduces_joints() {
        for model in [RobotModel::Ur5, RobotModel::Ur10] {
            let kin = solver(model);
            for joints in [[0.3, -1.2, 1.5, -0.8, 1.1, 0.4], [-1.0, -2.0, -1.0, 0.5, -1.2, 2.0]] {
                let flange = kin.chain().flange(&joints);
                let mut found = 0;
                for configuration in RobotConfigurations::branches() {
                    let solution = kin.inverse(&flange, &IkRequest::new(configuration));
                    if solution.errors.is_empty() {
                        let pose = kin.chain().flange(&solution.joints);
                        assert!(pose::approx_eq(&pose, &flange, 1e-6, 1e-9), "{:?} branch {}", model, configuration);
                    }
                    if matches(&solution.joints, &joints) {
                        found += 1;
                    }
                }
                assert_eq!(found, 1, "{:?} joints {:?}", model, joints);
            }
        }
    }

    #[test]
    fn test_known_branch() {
        let kin = solver(RobotModel::Ur5);
        let joints = [-1.0, -2.0, -1.0, 0.5, -1.2, 2.0];
        let flange = kin.chain().flange(&joints);
        let configuration = RobotConfigurations::ELBOW | RobotConfigurations::WRIST;
        let solution = kin.inverse(&flange, &IkRequest::new(configuration));
        assert!(matches(&solution.joints, &joints), "got {:?}", solution.joints);
    }

    #[test]
    fn test_far_target_is_out_of_reach() {
        let kin = solver(RobotModel::Ur5);
        let solution = kin.inverse(&pose::translation(3000.0, 0.0, 0.0), &IkRequest::new(RobotConfigurations::NONE));
        assert!(solution.has(&Diagnostic::OutOfReach));
    }

    #[test]
    fn test_wrist_above_axis_1_is_overhead() {
        let kin = solver(RobotModel::Ur5);
        let d4 = kin.chain().joints()[3].d;
        // axis 6 vertical, so the wrist point sits exactly d4 from axis 1
        let flange = pose::translation(d4, 0.0, 600.0) * *kin.chain().flange_offset();
        for configuration in RobotConfigurations::branches() {
            let solution = kin.inverse(&flange, &IkRequest::new(configuration));
            assert!(
                solution.has(&Diagnostic::NearOverheadSingularity),
                "branch {} errors {:?}",
                configuration,
                solution.errors
            );
        }
    }

    #[test]
    fn test_straight_wrist_is_singular() {
        let kin = solver(RobotModel::Ur5);
        let joints = [0.3, -1.2, 1.5, -0.8, 0.0, 0.4];
        let flange = kin.chain().flange(&joints);
        let singular = RobotConfigurations::branches()
            .into_iter()
            .map(|configuration| kin.inverse(&flange, &IkRequest::new(configuration)))
            .filter(|solution| solution.has(&Diagnostic::NearWristSingularity))
            .inspect(|solution| assert_eq!(solution.joints[5], 0.0))
            .count();
        assert!(singular > 0);
    }

    #[test]
    fn test_rejects_spherical_geometry() {
        let chain = ArmChain::from_mechanism(&presets::robot(RobotModel::GenericSpherical)).unwrap();
        assert!(OffsetWristKinematics::new(chain, &KinematicsConfig::default()).is_err());
    }
}
