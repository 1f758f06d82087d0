//! Franka solver backed by the `k` kinematics crate.

use cell_model::{DhConvention, Diagnostic, Pose, Result};
use k::nalgebra as kna;
use k::InverseKinematicsSolver;
use tracing::debug;

use super::numerical::NumericalKinematics;
use super::{unsupported, ArmKinematics, IkRequest, IkSolution};
use crate::angles;
use crate::chain::{dh, modified_dh, ArmChain};
use crate::config::{KinematicsConfig, NumericalConfig};

const NAME: &str = "Franka library";
const REDUNDANT_AXIS: usize = 6;

fn to_k(pose: &Pose) -> (kna::Translation3<f64>, kna::UnitQuaternion<f64>) {
    let t = pose.translation.vector;
    let q = pose.rotation.quaternion();
    (
        kna::Translation3::new(t.x, t.y, t.z),
        kna::UnitQuaternion::from_quaternion(kna::Quaternion::new(q.w, q.i, q.j, q.k)),
    )
}

fn axis_name(index: usize) -> String {
    format!("axis{}", index + 1)
}

/// Jacobian solver from `k` run on a node tree built from the DH table.
/// Axis 7 is excluded from the solve and held at the requested value.
#[derive(Debug, Clone)]
pub struct FrankaLibraryKinematics {
    chain: ArmChain,
    config: NumericalConfig,
}

impl FrankaLibraryKinematics {
    pub fn new(chain: ArmChain, config: &KinematicsConfig) -> Result<Self> {
        if chain.len() != 7 {
            return Err(unsupported(NAME, format!("{} axes", chain.len())));
        }
        if chain.joints().iter().any(|j| !j.is_revolute()) {
            return Err(unsupported(NAME, "all axes must be revolute"));
        }
        Ok(Self {
            chain,
            config: config.numerical.clone(),
        })
    }

    /// Node origins: the constant part of each link placed before the joint
    /// rotation, then a fixed flange node.
    fn node_origins(&self) -> Vec<Pose> {
        let joints = self.chain.joints();
        let mut origins = Vec::with_capacity(joints.len() + 1);
        match self.chain.convention() {
            DhConvention::Modified => {
                for j in joints {
                    origins.push(modified_dh(j.a, j.d, j.alpha, j.theta));
                }
                origins.push(*self.chain.flange_offset());
            }
            DhConvention::Standard => {
                let mut previous = Pose::identity();
                for j in joints {
                    origins.push(previous * dh(0.0, 0.0, 0.0, j.theta));
                    previous = dh(j.a, j.d, j.alpha, 0.0);
                }
                origins.push(previous * self.chain.flange_offset());
            }
        }
        origins
    }

    fn build(&self) -> k::SerialChain<f64> {
        let origins = self.node_origins();
        let mut nodes: Vec<k::Node<f64>> = Vec::with_capacity(origins.len());
        for (i, origin) in origins.iter().enumerate() {
            let (translation, rotation) = to_k(origin);
            let builder = k::NodeBuilder::new().translation(translation).rotation(rotation);
            let node = match self.chain.joints().get(i) {
                Some(joint) => builder
                    .name(&axis_name(i))
                    .joint_type(k::JointType::Rotational {
                        axis: kna::Unit::new_normalize(kna::Vector3::new(0.0, 0.0, joint.sign.signum())),
                    })
                    .limits(Some(k::joint::Range::new(joint.range.min, joint.range.max)))
                    .into_node(),
                None => builder.name("flange").joint_type(k::JointType::Fixed).into_node(),
            };
            if let Some(parent) = nodes.last() {
                node.set_parent(parent);
            }
            nodes.push(node);
        }
        match nodes.last() {
            Some(end) => k::SerialChain::from_end(end),
            None => k::SerialChain::from_end(&k::NodeBuilder::new().into_node()),
        }
    }
}

impl ArmKinematics for FrankaLibraryKinematics {
    fn chain(&self) -> &ArmChain {
        &self.chain
    }

    fn inverse(&self, flange: &Pose, request: &IkRequest) -> IkSolution {
        let mut seed = NumericalKinematics::seed(&self.chain, request);
        if let Some(value) = request.redundancy {
            seed[REDUNDANT_AXIS] = value;
        }
        let arm = self.build();
        arm.set_joint_positions_clamped(&seed);
        arm.update_transforms();

        let (translation, rotation) = to_k(flange);
        let target = kna::Isometry3::from_parts(translation, rotation);
        let solver = k::JacobianIkSolver::new(
            self.config.position_tolerance,
            self.config.angle_tolerance,
            0.5,
            self.config.max_iterations,
        );
        let mut constraints = k::Constraints::default();
        constraints.ignored_joint_names = vec![axis_name(REDUNDANT_AXIS)];

        let mut errors = Vec::new();
        if let Err(e) = solver.solve_with_constraints(&arm, &target, &constraints) {
            debug!(error = %e, "k solver did not converge");
            errors.push(Diagnostic::OutOfReach);
        }

        let mut joints = arm.joint_positions();
        for (value, joint) in joints.iter_mut().zip(self.chain.joints()) {
            if joint.is_revolute() {
                *value = angles::normalize(*value);
            }
        }
        IkSolution { joints, errors }
    }

    fn has_branches(&self) -> bool {
        false
    }
}
