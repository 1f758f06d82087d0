use std::f64::consts::{FRAC_PI_2, PI};

use cell_model::{pose, DhConvention, Diagnostic, Pose, Result};
use nalgebra::Matrix3;

use super::{clamp_unit, expect_param, unsupported, ArmKinematics, IkRequest, IkSolution};
use crate::angles;
use crate::chain::{dh, ArmChain};
use crate::config::KinematicsConfig;

const NAME: &str = "spherical wrist";

/// Closed-form solver for six axis arms whose last three axes intersect.
///
/// Standard DH with `alpha = [90°, 0, 90°, -90°, 90°, *]`, no offsets on
/// axes 2, 3 and 5 and no link lengths on axes 4 and 5. Shoulder offsets
/// (`a1`), elbow offsets (`a3`) and a flange offset (`a6`) are supported.
#[derive(Debug, Clone)]
pub struct SphericalWristKinematics {
    chain: ArmChain,
    singularity_threshold: f64,
}

impl SphericalWristKinematics {
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
        for (axis, alpha) in [FRAC_PI_2, 0.0, FRAC_PI_2, -FRAC_PI_2, FRAC_PI_2].into_iter().enumerate() {
            expect_param(NAME, "alpha", axis, j[axis].alpha, alpha)?;
        }
        for axis in [1, 2, 4] {
            expect_param(NAME, "d", axis, j[axis].d, 0.0)?;
        }
        for axis in [3, 4] {
            expect_param(NAME, "a", axis, j[axis].a, 0.0)?;
        }
        if j[1].a == 0.0 {
            return Err(unsupported(NAME, "upper arm length a of axis 2 is zero"));
        }
        Ok(Self {
            chain,
            singularity_threshold: config.singularity_threshold,
        })
    }
}

impl ArmKinematics for SphericalWristKinematics {
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

        // frame 6 without the constant twist of the last link
        let t6 = flange * self.chain.flange_offset().inverse() * pose::rot_x(-j[5].alpha);
        let wc = t6.translation.vector - pose::z_axis(&t6) * j[5].d - pose::x_axis(&t6) * j[5].a;

        let (a1, a2, a3) = (j[0].a, j[1].a, j[2].a);
        let (d1, d4) = (j[0].d, j[3].d);
        let reach = a1.abs() + a2.abs() + a3.hypot(d4);
        if wc.x.hypot(wc.y) < self.singularity_threshold * reach {
            solution.push_once(Diagnostic::NearOverheadSingularity);
        }

        let mut t1 = wc.y.atan2(wc.x);
        if shoulder {
            t1 += PI;
        }
        let (s1, c1) = t1.sin_cos();
        let r = c1 * wc.x + s1 * wc.y - a1;
        let h = wc.z - d1;
        let l2 = a3.hypot(d4);
        let phi = d4.atan2(a3);

        let cb = clamp_unit((r * r + h * h - a2 * a2 - l2 * l2) / (2.0 * a2 * l2), &mut solution);
        let b = if elbow { -cb.acos() } else { cb.acos() };
        let t2 = h.atan2(r) - (l2 * b.sin()).atan2(a2 + l2 * b.cos());
        let t3 = b + phi;

        let t03 = dh(a1, d1, j[0].alpha, t1) * dh(a2, 0.0, j[1].alpha, t2) * dh(a3, 0.0, j[2].alpha, t3);
        let r03: Matrix3<f64> = t03.rotation.to_rotation_matrix().into_inner();
        let r06: Matrix3<f64> = t6.rotation.to_rotation_matrix().into_inner();
        let m = r03.transpose() * r06;

        let s5 = m[(0, 2)].hypot(m[(1, 2)]);
        let (t4, t5, t6_angle) = if s5 < self.singularity_threshold {
            solution.push_once(Diagnostic::NearWristSingularity);
            let t5 = (if wrist { -s5 } else { s5 }).atan2(m[(2, 2)]);
            let t6 = if m[(2, 2)] > 0.0 {
                m[(1, 0)].atan2(m[(0, 0)])
            } else {
                m[(1, 0)].atan2(m[(1, 1)])
            };
            (0.0, t5, t6)
        } else if wrist {
            (
                (-m[(1, 2)]).atan2(-m[(0, 2)]),
                (-s5).atan2(m[(2, 2)]),
                (-m[(2, 1)]).atan2(m[(2, 0)]),
            )
        } else {
            (
                m[(1, 2)].atan2(m[(0, 2)]),
                s5.atan2(m[(2, 2)]),
                m[(2, 1)].atan2(-m[(2, 0)]),
            )
        };

        for (i, theta) in [t1, t2, t3, t4, t5, t6_angle].into_iter().enumerate() {
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

    fn solver() -> SphericalWristKinematics {
        let mechanism = presets::robot(RobotModel::GenericSpherical);
        let chain = ArmChain::from_mechanism(&mechanism).unwrap();
        SphericalWristKinematics::new(chain, &KinematicsConfig::default()).unwrap()
    }

    fn matches(a: &[f64], b: &[f64]) -> bool {
        a.iter().zip(b).all(|(x, y)| angles::angular_distance(*x, *y) < 1e-6)
    }

    #[test]
    fn test_inverse_kinematics_roundtrip() {
        let kin = solver();
        let joints = [0.1, -0.2, 0.3, 0.0, 0.5, 0.0];
        let flange = kin.chain().flange(&joints);

        let solution = kin.inverse(&flange, &IkRequest::new(RobotConfigurations::SHOULDER));
        println!("IK result: {:?}", solution.joints);
        assert!(solution.errors.is_empty(), "unexpected errors {:?}", solution.errors);
        assert!(matches(&solution.joints, &joints), "branch should reproduce the joints");
    }

    #[test]
    fn test_exactly_one_branch_reproduces_joints() {
        let kin = solver();
        for joints in [[0.4, -0.9, 0.7, 1.2, -0.8, 2.0], [-2.0, 0.3, -1.1, -0.4, 1.3, -0.6]] {
            let flange = kin.chain().flange(&joints);
            let mut found = 0;
            for configuration in RobotConfigurations::branches() {
                let solution = kin.inverse(&flange, &IkRequest::new(configuration));
                if solution.errors.is_empty() {
                    let pose = kin.chain().flange(&solution.joints);
                    assert!(pose::approx_eq(&pose, &flange, 1e-6, 1e-9), "branch {} misses the pose", configuration);
                }
                if matches(&solution.joints, &joints) {
                    found += 1;
                }
            }
            assert_eq!(found, 1, "joints {:?}", joints);
        }
    }

    #[test]
    fn test_wrist_singularity_is_reported() {
        let kin = solver();
        let joints = [0.1, -0.2, 0.3, 0.7, 0.0, 0.4];
        let flange = kin.chain().flange(&joints);
        let solution = kin.inverse(&flange, &IkRequest::new(RobotConfigurations::SHOULDER));
        assert!(solution.has(&Diagnostic::NearWristSingularity));
        assert_eq!(solution.joints[3], 0.0);
        let pose = kin.chain().flange(&solution.joints);
        assert!(pose::approx_eq(&pose, &flange, 1e-6, 1e-9), "axis 6 should absorb axis 4");
    }

    #[test]
    fn test_far_target_is_out_of_reach() {
        let kin = solver();
        let flange = pose::translation(5000.0, 0.0, 400.0);
        let solution = kin.inverse(&flange, &IkRequest::new(RobotConfigurations::NONE));
        assert!(solution.has(&Diagnostic::OutOfReach));
        assert_eq!(solution.joints.len(), 6);
    }

    #[test]
    fn test_rejects_other_geometry() {
        let mechanism = presets::robot(RobotModel::Ur5);
        let chain = ArmChain::from_mechanism(&mechanism).unwrap();
        assert!(SphericalWristKinematics::new(chain, &KinematicsConfig::default()).is_err());
    }
}
