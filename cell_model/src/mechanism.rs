use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::{KinematicsError, Result};
use crate::joint::{Joint, JointKind};
use crate::pose::{self, Pose};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Manufacturer {
    Fanuc,
    UniversalRobots,
    Franka,
    Doosan,
    Abb,
    Kuka,
    Other,
}

impl fmt::Display for Manufacturer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Manufacturer::Fanuc => "FANUC",
            Manufacturer::UniversalRobots => "Universal Robots",
            Manufacturer::Franka => "Franka",
            Manufacturer::Doosan => "Doosan",
            Manufacturer::Abb => "ABB",
            Manufacturer::Kuka => "KUKA",
            Manufacturer::Other => "generic",
        };
        write!(f, "{}", name)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DhConvention {
    /// `Rz(theta)·Tz(d)·Tx(a)·Rx(alpha)`
    #[default]
    Standard,
    /// Craig ordering, `Rx(alpha)·Tx(a)·Rz(theta)·Tz(d)`
    Modified,
}

/// Inverse kinematics strategy of a robot arm.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArmSolverKind {
    SphericalWrist,
    OffsetWrist,
    /// Iterative solver for any serial chain. `redundant` names the axis held
    /// at its requested value on arms with more than six axes.
    Numerical { redundant: Option<usize> },
    FrankaAnalytical,
    FrankaNumerical,
    /// Backed by the `k` kinematics crate, needs the `k-solver` feature.
    FrankaLibrary,
    NotImplemented,
}

impl ArmSolverKind {
    pub fn is_franka(&self) -> bool {
        matches!(
            self,
            ArmSolverKind::FrankaAnalytical
                | ArmSolverKind::FrankaNumerical
                | ArmSolverKind::FrankaLibrary
        )
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RobotArm {
    pub manufacturer: Manufacturer,
    #[serde(default)]
    pub convention: DhConvention,
    pub solver: ArmSolverKind,
    /// Constant transform from the last DH frame to the mounting flange.
    #[serde(default = "pose::identity")]
    pub flange: Pose,
    /// FANUC axis interaction: the DH angle of axis 3 also contains axis 2.
    #[serde(default)]
    pub j2_j3_coupled: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum MechanismKind {
    RobotArm(RobotArm),
    Positioner,
    Track,
    Custom,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Mechanism {
    pub name: String,
    pub kind: MechanismKind,
    pub joints: Vec<Joint>,
    /// Placement of the mechanism in its parent frame.
    #[serde(default = "pose::identity")]
    pub base: Pose,
    /// The last plane of this mechanism carries the robot base.
    #[serde(default)]
    pub moves_robot: bool,
}

impl Mechanism {
    /// Builds a mechanism, assigning joint indices in list order. Joint
    /// numbers start out equal to the indices until a group renumbers them.
    pub fn new(name: impl Into<String>, kind: MechanismKind, mut joints: Vec<Joint>, base: Pose) -> Self {
        for (index, joint) in joints.iter_mut().enumerate() {
            joint.index = index;
            joint.number = index;
        }
        Self {
            name: name.into(),
            kind,
            joints,
            base,
            moves_robot: false,
        }
    }

    pub fn moving_robot(mut self) -> Self {
        self.moves_robot = true;
        self
    }

    pub fn robot_arm(&self) -> Option<&RobotArm> {
        match &self.kind {
            MechanismKind::RobotArm(arm) => Some(arm),
            _ => None,
        }
    }

    pub fn is_robot(&self) -> bool {
        self.robot_arm().is_some()
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |reason: String| KinematicsError::InvalidMechanism {
            name: self.name.clone(),
            reason,
        };

        if self.joints.is_empty() {
            return Err(invalid("mechanism has no joints".to_string()));
        }
        for (i, joint) in self.joints.iter().enumerate() {
            if joint.index != i {
                return Err(invalid(format!("joint {} has local index {}", i, joint.index)));
            }
            if !joint.range.is_valid() {
                return Err(invalid(format!(
                    "joint {} range [{}, {}] is inverted",
                    i, joint.range.min, joint.range.max
                )));
            }
            if joint.sign == 0.0 {
                return Err(invalid(format!("joint {} has a zero sign", i)));
            }
        }

        let all = |kind: JointKind| self.joints.iter().all(|j| j.kind == kind);
        match &self.kind {
            MechanismKind::RobotArm(arm) => {
                let count = self.joints.len();
                let expected = if arm.solver.is_franka() { count == 7 } else { count == 6 || count == 7 };
                if !expected {
                    return Err(invalid(format!("robot arm with {} joints", count)));
                }
                if !all(JointKind::Revolute) {
                    return Err(invalid("robot arm joints must be revolute".to_string()));
                }
                if let ArmSolverKind::Numerical { redundant: Some(axis) } = arm.solver {
                    if axis >= count {
                        return Err(invalid(format!("redundant axis {} does not exist", axis)));
                    }
                }
                if count == 7 && matches!(arm.solver, ArmSolverKind::SphericalWrist | ArmSolverKind::OffsetWrist) {
                    return Err(invalid("closed-form six axis solver on a seven axis arm".to_string()));
                }
            }
            MechanismKind::Positioner => {
                if !all(JointKind::Revolute) {
                    return Err(invalid("positioner joints must be revolute".to_string()));
                }
            }
            MechanismKind::Track => {
                if !all(JointKind::Prismatic) {
                    return Err(invalid("track joints must be prismatic".to_string()));
                }
            }
            MechanismKind::Custom => {}
        }
        Ok(())
    }
}
