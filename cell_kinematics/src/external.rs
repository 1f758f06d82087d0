//! External axes: positioners, tracks and custom mechanisms.
//!
//! External joints are described by rest planes instead of DH parameters.
//! Each solution plane is the mechanism base as moved by the joints up to
//! and including that one, so the last plane is what the mechanism carries.

use cell_model::{
    pose, Diagnostic, Joint, KinematicsError, Mechanism, MechanismKind, Pose, Result, SolutionBuilder,
    Target,
};
use tracing::trace;

use crate::angles;
use crate::mechanism::{checked_prev, MechanismKinematics};

#[derive(Debug, Clone)]
pub struct ExternalKinematics {
    mechanism: Mechanism,
    /// Joint number of the first entry of `target.external`.
    first_number: usize,
}

impl ExternalKinematics {
    /// `first_number` is the joint number read from `target.external[0]`,
    /// the arm joint count inside a mechanical group.
    pub fn new(mechanism: &Mechanism, first_number: usize) -> Result<Self> {
        if mechanism.is_robot() {
            return Err(KinematicsError::InvalidMechanism {
                name: mechanism.name.clone(),
                reason: "robot arms are not external mechanisms".to_string(),
            });
        }
        mechanism.validate()?;
        Ok(Self {
            mechanism: mechanism.clone(),
            first_number,
        })
    }

    /// Independent joints move the base on their own; the others chain.
    fn chained(&self) -> bool {
        !matches!(self.mechanism.kind, MechanismKind::Custom)
    }
}

/// Motion of one joint about (or along) the Z axis of its rest plane,
/// expressed in the mechanism base frame.
fn joint_motion(joint: &Joint, value: f64) -> Pose {
    let (theta, d) = joint.dh_values(value);
    joint.plane * pose::translation(0.0, 0.0, d) * pose::rot_z(theta) * joint.plane.inverse()
}

impl MechanismKinematics for ExternalKinematics {
    fn mechanism(&self) -> &Mechanism {
        &self.mechanism
    }

    fn set_joints(&self, target: &Target, prev: Option<&[f64]>, _base: &Pose, builder: &mut SolutionBuilder) {
        let prev = checked_prev(prev, self.mechanism.joints.len(), builder);
        let mut values = Vec::with_capacity(self.mechanism.joints.len());
        for (i, joint) in self.mechanism.joints.iter().enumerate() {
            let slot = joint.number.checked_sub(self.first_number);
            let mut value = match slot.and_then(|s| target.external.get(s)) {
                Some(&value) => value,
                None => {
                    builder.push_error(Diagnostic::MissingExternal { axis: joint.number + 1 });
                    0.0
                }
            };
            if let Some(prev) = prev.filter(|_| joint.is_revolute()) {
                value = angles::unwrap(value, prev[i]);
            }
            values.push(value);
        }
        trace!(mechanism = %self.mechanism.name, ?values, "external joints");
        builder.set_joints(values);
    }

    fn joint_planes(&self, joints: &[f64]) -> Vec<Pose> {
        let mut moved = pose::identity();
        self.mechanism
            .joints
            .iter()
            .zip(joints)
            .map(|(joint, &value)| {
                let motion = joint_motion(joint, value);
                if self.chained() {
                    moved *= motion;
                    moved
                } else {
                    motion
                }
            })
            .collect()
    }
}
