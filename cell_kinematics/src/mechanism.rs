//! Resolution steps shared by every mechanism.

use cell_model::{
    pose, Diagnostic, Joint, KinematicSolution, Mechanism, Pose, Result, SolutionBuilder, Target,
};

use crate::config::KinematicsConfig;
use crate::external::ExternalKinematics;
use crate::robot::RobotKinematics;

/// Kinematics of one mechanism: an arm or an external axis set.
///
/// [`resolve`](MechanismKinematics::resolve) runs the shared skeleton:
/// place the base, compute joint values, check ranges, compute joint
/// planes and move them into the cell frame.
pub trait MechanismKinematics {
    fn mechanism(&self) -> &Mechanism;

    /// Writes the joint values (and the configuration, for arms) for
    /// `target`. `base` is the mechanism base in the cell frame.
    fn set_joints(&self, target: &Target, prev: Option<&[f64]>, base: &Pose, builder: &mut SolutionBuilder);

    /// One plane per joint, relative to the mechanism base.
    fn joint_planes(&self, joints: &[f64]) -> Vec<Pose>;

    fn resolve(&self, target: &Target, prev: Option<&[f64]>, base_plane: Option<&Pose>) -> KinematicSolution {
        let mechanism = self.mechanism();
        let base = base_pose(mechanism, base_plane);

        let mut builder = SolutionBuilder::with_joint_count(mechanism.joints.len());
        builder.push_plane(base);
        self.set_joints(target, prev, &base, &mut builder);

        for diagnostic in range_violations(&mechanism.joints, builder.joints()) {
            builder.push_error(diagnostic);
        }

        let planes = self.joint_planes(builder.joints());
        builder.extend_planes(planes.into_iter().map(|plane| base * plane));
        builder.build()
    }
}

/// Mechanism base in the cell frame, carried by `base_plane` when given.
pub fn base_pose(mechanism: &Mechanism, base_plane: Option<&Pose>) -> Pose {
    match base_plane {
        Some(plane) => pose::orient(&mechanism.base, &pose::identity(), plane),
        None => mechanism.base,
    }
}

/// One diagnostic per joint outside its travel, numbered from 1.
pub fn range_violations(joints: &[Joint], values: &[f64]) -> Vec<Diagnostic> {
    joints
        .iter()
        .zip(values)
        .filter(|(joint, &value)| !joint.range.contains(value))
        .map(|(joint, _)| Diagnostic::OutOfRange { axis: joint.number + 1 })
        .collect()
}

/// Previous joints when their length matches, otherwise `None` plus a
/// diagnostic.
pub(crate) fn checked_prev<'a>(prev: Option<&'a [f64]>, count: usize, builder: &mut SolutionBuilder) -> Option<&'a [f64]> {
    match prev {
        Some(values) if values.len() == count => Some(values),
        Some(_) => {
            builder.push_error(Diagnostic::PrevJointsMismatch);
            None
        }
        None => None,
    }
}

/// The solver of any mechanism.
#[derive(Debug, Clone)]
pub enum MechanismSolver {
    Robot(RobotKinematics),
    External(ExternalKinematics),
}

impl MechanismSolver {
    /// Picks the solver from the mechanism kind. External joints are read
    /// from `target.external` starting at index 0.
    pub fn new(mechanism: &Mechanism, config: &KinematicsConfig) -> Result<Self> {
        if mechanism.is_robot() {
            Ok(Self::Robot(RobotKinematics::with_config(mechanism, config.clone())?))
        } else {
            Ok(Self::External(ExternalKinematics::new(mechanism, 0)?))
        }
    }

    fn inner(&self) -> &dyn MechanismKinematics {
        match self {
            Self::Robot(k) => k,
            Self::External(k) => k,
        }
    }
}

impl MechanismKinematics for MechanismSolver {
    fn mechanism(&self) -> &Mechanism {
        self.inner().mechanism()
    }

    fn set_joints(&self, target: &Target, prev: Option<&[f64]>, base: &Pose, builder: &mut SolutionBuilder) {
        self.inner().set_joints(target, prev, base, builder)
    }

    fn joint_planes(&self, joints: &[f64]) -> Vec<Pose> {
        self.inner().joint_planes(joints)
    }
}
