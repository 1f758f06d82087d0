//! Solvers for seven axis Franka arms.
//!
//! The analytical solver follows He and Liu, "Analytical Inverse Kinematics
//! for Franka Emika Panda", with axis 7 as the free parameter. Only arms
//! whose axis 4 stays bent beyond the straight-elbow angle are covered,
//! which holds over the Panda's axis 4 range below about -0.47 rad.

use std::f64::consts::{FRAC_PI_2, PI};

use cell_model::{DhConvention, Diagnostic, Pose, Result};
use nalgebra::{Matrix3, Vector3};
use tracing::debug;

use super::jacobian::{newton, NullSpaceTarget};
use super::numerical::NumericalKinematics;
use super::{clamp_unit, expect_param, unsupported, ArmKinematics, IkRequest, IkSolution};
use crate::angles;
use crate::chain::ArmChain;
use crate::config::{KinematicsConfig, NumericalConfig};

const REDUNDANT_AXIS: usize = 6;

/// Checks the Panda style modified DH structure.
fn check_geometry(name: &str, chain: &ArmChain) -> Result<()> {
    if chain.len() != 7 {
        return Err(unsupported(name, format!("{} axes", chain.len())));
    }
    if chain.convention() != DhConvention::Modified {
        return Err(unsupported(name, "requires modified DH parameters"));
    }
    let j = chain.joints();
    let alphas = [0.0, -FRAC_PI_2, FRAC_PI_2, FRAC_PI_2, -FRAC_PI_2, FRAC_PI_2, FRAC_PI_2];
    for (axis, alpha) in alphas.into_iter().enumerate() {
        expect_param(name, "alpha", axis, j[axis].alpha, alpha)?;
    }
    for axis in [0, 1, 2, 5] {
        expect_param(name, "a", axis, j[axis].a, 0.0)?;
    }
    expect_param(name, "a", 4, j[4].a, -j[3].a)?;
    for axis in [1, 3, 5, 6] {
        expect_param(name, "d", axis, j[axis].d, 0.0)?;
    }
    Ok(())
}

/// Closed-form solver parameterised by the value of axis 7.
///
/// The shoulder flag picks the axis 1 branch and the wrist flag the axis 6
/// branch. The elbow flag has no effect: axis 4 has a single solution.
#[derive(Debug, Clone)]
pub struct FrankaAnalyticalKinematics {
    chain: ArmChain,
}

impl FrankaAnalyticalKinematics {
    pub fn new(chain: ArmChain, _config: &KinematicsConfig) -> Result<Self> {
        check_geometry("Franka analytical", &chain)?;
        Ok(Self { chain })
    }
}

impl ArmKinematics for FrankaAnalyticalKinematics {
    fn chain(&self) -> &ArmChain {
        &self.chain
    }

    fn inverse(&self, flange: &Pose, request: &IkRequest) -> IkSolution {
        let j = self.chain.joints();
        let mut solution = IkSolution {
            joints: vec![0.0; 7],
            errors: Vec::new(),
        };
        let q7 = request.redundancy.unwrap_or_else(|| j[REDUNDANT_AXIS].range.mid());

        let (d1, d3, d5) = (j[0].d, j[2].d, j[4].d);
        let (a4, a7) = (j[3].a, j[6].a);
        let ll24 = a4 * a4 + d3 * d3;
        let ll46 = a4 * a4 + d5 * d5;
        let (l24, l46) = (ll24.sqrt(), ll46.sqrt());
        let theta_h46 = d5.atan2(a4);
        let theta_342 = d3.atan2(a4);
        let theta_46h = a4.atan2(d5);

        // frame 7 and the origin of frame 6
        let t7 = flange * self.chain.flange_offset().inverse();
        let r7: Matrix3<f64> = t7.rotation.to_rotation_matrix().into_inner();
        let (s7, c7) = q7.sin_cos();
        let x6 = (r7 * Vector3::new(c7, -s7, 0.0)).normalize();
        let p6 = t7.translation.vector - x6 * a7;

        // axis 4 from the triangle between the shoulder, elbow and wrist
        let p2 = Vector3::new(0.0, 0.0, d1);
        let v26 = p6 - p2;
        let ll26 = v26.norm_squared();
        let l26 = ll26.sqrt();
        if l24 + l46 < l26 || l24 + l26 < l46 || l26 + l46 < l24 {
            solution.push_once(Diagnostic::OutOfReach);
        }
        let theta_246 = clamp_unit((ll24 + ll46 - ll26) / (2.0 * l24 * l46), &mut solution).acos();
        let q4 = theta_246 + theta_h46 + theta_342 - 2.0 * PI;

        // axis 6
        let theta_462 = clamp_unit((ll26 + ll46 - ll24) / (2.0 * l26 * l46), &mut solution).acos();
        let theta_26h = theta_46h + theta_462;
        let d26 = -l26 * theta_26h.cos();

        let z7 = r7.column(2).into_owned();
        let z6 = z7.cross(&x6);
        let y6 = z6.cross(&x6);
        let r6 = Matrix3::from_columns(&[x6, y6.normalize(), z6.normalize()]);
        let v6_62 = r6.transpose() * (-v26);
        let phi6 = v6_62.y.atan2(v6_62.x);
        let theta6 = clamp_unit(d26 / v6_62.x.hypot(v6_62.y), &mut solution).asin();
        let mut q6 = if request.configuration.wrist() {
            theta6 - phi6
        } else {
            PI - theta6 - phi6
        };
        let range6 = j[5].range;
        if q6 <= range6.min {
            q6 += 2.0 * PI;
        } else if q6 >= range6.max {
            q6 -= 2.0 * PI;
        }

        // axes 1 and 2 from the direction of the upper arm
        let theta_p26 = 3.0 * FRAC_PI_2 - theta_462 - theta_246 - theta_342;
        let theta_p = PI - theta_p26 - theta_26h;
        let lp6 = l26 * theta_p26.sin() / theta_p.sin();
        let (s6, c6) = q6.sin_cos();
        let z5 = r6 * Vector3::new(s6, c6, 0.0);
        let v2p = p6 - z5 * lp6 - p2;
        let l2p = v2p.norm();

        let (mut q1, mut q2) = if (v2p.z / l2p).abs() > 0.999 {
            solution.push_once(Diagnostic::NearOverheadSingularity);
            let q1 = request.seed.and_then(|seed| seed.first().copied()).unwrap_or(0.0);
            (q1, 0.0)
        } else {
            (v2p.y.atan2(v2p.x), (v2p.z / l2p).acos())
        };
        if request.configuration.shoulder() {
            q1 = if q1 < 0.0 { q1 + PI } else { q1 - PI };
            q2 = -q2;
        }

        // axis 3
        let z3 = v2p / l2p;
        let y3 = (-v26.cross(&v2p)).normalize();
        let x3 = y3.cross(&z3);
        let (s1, c1) = q1.sin_cos();
        let (s2, c2) = q2.sin_cos();
        let r1 = Matrix3::new(c1, -s1, 0.0, s1, c1, 0.0, 0.0, 0.0, 1.0);
        let r12 = Matrix3::new(c2, -s2, 0.0, 0.0, 0.0, 1.0, -s2, -c2, 0.0);
        let x2_3 = (r1 * r12).transpose() * x3;
        let q3 = x2_3.z.atan2(x2_3.x);

        // axis 5
        let vh4 = p2 + z3 * d3 + x3 * a4 - p6 + z5 * d5;
        let r56 = Matrix3::new(c6, -s6, 0.0, 0.0, 0.0, -1.0, s6, c6, 0.0);
        let r5 = r6 * r56.transpose();
        let v5_h4 = r5.transpose() * vh4;
        let q5 = -v5_h4.y.atan2(v5_h4.x);

        for (i, theta) in [q1, q2, q3, q4, q5, q6, q7].into_iter().enumerate() {
            let value = j[i].joint_value(theta);
            solution.joints[i] = if i == 5 || i == REDUNDANT_AXIS { value } else { angles::normalize(value) };
        }
        solution
    }
}

/// Newton solver over all seven axes. Axis 7 is pulled towards its
/// requested value through the null space of the Jacobian.
#[derive(Debug, Clone)]
pub struct FrankaNumericalKinematics {
    chain: ArmChain,
    config: NumericalConfig,
}

impl FrankaNumericalKinematics {
    pub fn new(chain: ArmChain, config: &KinematicsConfig) -> Result<Self> {
        check_geometry("Franka numerical", &chain)?;
        Ok(Self {
            chain,
            config: config.numerical.clone(),
        })
    }
}

impl ArmKinematics for FrankaNumericalKinematics {
    fn chain(&self) -> &ArmChain {
        &self.chain
    }

    fn inverse(&self, flange: &Pose, request: &IkRequest) -> IkSolution {
        let mut seed = NumericalKinematics::seed(&self.chain, request);
        let value = request
            .redundancy
            .unwrap_or_else(|| self.chain.joints()[REDUNDANT_AXIS].range.mid());
        if request.seed.is_none() {
            seed[REDUNDANT_AXIS] = value;
        }
        let free: Vec<usize> = (0..self.chain.len()).collect();
        let null_space = NullSpaceTarget {
            axis: REDUNDANT_AXIS,
            value,
        };

        let outcome = newton(&self.chain, flange, &seed, &free, Some(null_space), &self.config);
        debug!(
            iterations = outcome.iterations,
            converged = outcome.converged,
            redundancy = outcome.joints[REDUNDANT_AXIS],
            "franka numerical inverse kinematics"
        );
        NumericalKinematics::into_solution(&self.chain, outcome)
    }

    fn has_branches(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::presets::{self, RobotModel};
    use cell_model::{pose, RobotConfigurations};

    fn chain() -> ArmChain {
        ArmChain::from_mechanism(&presets::robot(RobotModel::FrankaPanda)).unwrap()
    }

    fn matches(a: &[f64], b: &[f64]) -> bool {
        a.iter().zip(b).all(|(x, y)| angles::angular_distance(*x, *y) < 1e-6)
    }

    #[test]
    fn test_home_pose() {
        let joints = [0.0, -0.785, 0.0, -2.356, 0.0, 1.571, 0.785];
        let flange = chain().flange(&joints);
        let t = flange.translation.vector;
        println!("Panda home flange: [{:.2}, {:.2}, {:.2}]", t.x, t.y, t.z);
        assert!((t.x - 307.0).abs() < 0.5 && t.y.abs() < 1e-6 && (t.z - 590.3).abs() < 0.5);
    }

    #[test]
    fn test_analytical_branches() {
        let kin = FrankaAnalyticalKinematics::new(chain(), &KinematicsConfig::default()).unwrap();
        for joints in [
            [0.3, -0.4, 0.2, -2.0, 0.3, 1.8, 0.5],
            [-0.5, 0.6, -0.3, -1.5, -0.8, 2.2, -0.4],
        ] {
            let flange = kin.chain().flange(&joints);
            let mut found = Vec::new();
            for configuration in RobotConfigurations::branches() {
                let mut request = IkRequest::new(configuration);
                request.redundancy = Some(joints[6]);
                let solution = kin.inverse(&flange, &request);
                assert_eq!(solution.joints[6], joints[6], "axis 7 is the free parameter");
                if solution.errors.is_empty() {
                    let pose = kin.chain().flange(&solution.joints);
                    assert!(pose::approx_eq(&pose, &flange, 1e-6, 1e-9), "branch {} misses the pose", configuration);
                }
                if matches(&solution.joints, &joints) {
                    found.push(configuration.index());
                }
            }
            // elbow has no effect, so the matching branch shows up twice
            assert_eq!(found.len(), 2, "joints {:?} matched {:?}", joints, found);
            assert_eq!(found[0] & !2, found[1] & !2);
        }
    }

    #[test]
    fn test_overhead_pose_with_empty_seed() {
        let kin = FrankaAnalyticalKinematics::new(chain(), &KinematicsConfig::default()).unwrap();
        // upper arm straight up
        let flange = kin.chain().flange(&[0.0, 0.0, 0.0, -1.5, 0.0, 1.5, 0.5]);
        let mut overhead = 0;
        for configuration in RobotConfigurations::branches() {
            let mut request = IkRequest::new(configuration);
            request.redundancy = Some(0.5);
            request.seed = Some(&[]);
            let solution = kin.inverse(&flange, &request);
            assert_eq!(solution.joints.len(), 7);
            if solution.has(&Diagnostic::NearOverheadSingularity) {
                overhead += 1;
            }
        }
        assert!(overhead > 0, "no branch reported the overhead singularity");
    }

    #[test]
    fn test_numerical_pulls_axis_7_from_a_distant_seed() {
        let kin = FrankaNumericalKinematics::new(chain(), &KinematicsConfig::default()).unwrap();
        let joints = [0.3, -0.4, 0.2, -2.0, 0.3, 1.8, 0.5];
        let flange = kin.chain().flange(&joints);

        for start in [-0.3, 1.2] {
            let seed = [0.25, -0.3, 0.1, -1.9, 0.4, 1.7, start];
            let mut request = IkRequest::new(RobotConfigurations::UNDEFINED);
            request.redundancy = Some(0.5);
            request.seed = Some(&seed);
            let solution = kin.inverse(&flange, &request);
            assert!(solution.errors.is_empty(), "seed {}: unexpected errors {:?}", start, solution.errors);
            assert!((solution.joints[6] - 0.5).abs() < 1e-4, "seed {}: axis 7 at {}", start, solution.joints[6]);
            let reached = kin.chain().flange(&solution.joints);
            assert!(pose::approx_eq(&reached, &flange, 1e-3, 1e-5));
        }
    }

    #[test]
    fn test_numerical_keeps_redundant_axis() {
        let kin = FrankaNumericalKinematics::new(chain(), &KinematicsConfig::default()).unwrap();
        let joints = [0.3, -0.4, 0.2, -2.0, 0.3, 1.8, 0.5];
        let flange = kin.chain().flange(&joints);
        let seed = [0.25, -0.3, 0.1, -1.9, 0.4, 1.7, 0.6];

        for wanted in [0.5, 0.7] {
            let mut request = IkRequest::new(RobotConfigurations::UNDEFINED);
            request.redundancy = Some(wanted);
            request.seed = Some(&seed);
            let solution = kin.inverse(&flange, &request);
            assert!(solution.errors.is_empty(), "unexpected errors {:?}", solution.errors);
            assert!((solution.joints[6] - wanted).abs() < 1e-4, "axis 7 at {}", solution.joints[6]);
            let pose = kin.chain().flange(&solution.joints);
            assert!(pose::approx_eq(&pose, &flange, 1e-3, 1e-5));
        }
    }
}
