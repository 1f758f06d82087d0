use serde::{Deserialize, Serialize};

use crate::errors::{KinematicsError, Result};
use crate::joint::Joint;
use crate::mechanism::Mechanism;

/// A robot arm together with the external mechanisms that share its
/// program.
///
/// Joint numbers are assigned on construction: the arm gets
/// `0..arm_len`, external joints continue in mechanism order.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(try_from = "GroupDefinition")]
pub struct MechanicalGroup {
    pub index: usize,
    pub name: String,
    robot: Mechanism,
    externals: Vec<Mechanism>,
    #[serde(skip_serializing)]
    external_numbers: Vec<Vec<usize>>,
}

#[derive(Deserialize)]
struct GroupDefinition {
    index: usize,
    name: String,
    robot: Mechanism,
    #[serde(default)]
    externals: Vec<Mechanism>,
}

impl TryFrom<GroupDefinition> for MechanicalGroup {
    type Error = KinematicsError;

    fn try_from(def: GroupDefinition) -> Result<Self> {
        MechanicalGroup::new(def.index, def.name, def.robot, def.externals)
    }
}

impl MechanicalGroup {
    pub fn new(
        index: usize,
        name: impl Into<String>,
        mut robot: Mechanism,
        mut externals: Vec<Mechanism>,
    ) -> Result<Self> {
        let name = name.into();
        if !robot.is_robot() {
            return Err(KinematicsError::InvalidGroup {
                index,
                reason: format!("'{}' is not a robot arm", robot.name),
            });
        }
        if let Some(m) = externals.iter().find(|m| m.is_robot()) {
            return Err(KinematicsError::InvalidGroup {
                index,
                reason: format!("external mechanism '{}' is a robot arm", m.name),
            });
        }
        if externals.iter().filter(|m| m.moves_robot).count() > 1 {
            return Err(KinematicsError::InvalidGroup {
                index,
                reason: "more than one mechanism moves the robot".to_string(),
            });
        }

        robot.validate()?;
        for (number, joint) in robot.joints.iter_mut().enumerate() {
            joint.number = number;
        }

        let mut next = robot.joints.len();
        let mut external_numbers = Vec::with_capacity(externals.len());
        for mechanism in externals.iter_mut() {
            mechanism.validate()?;
            let mut numbers = Vec::with_capacity(mechanism.joints.len());
            for joint in mechanism.joints.iter_mut() {
                joint.number = next;
                numbers.push(next);
                next += 1;
            }
            external_numbers.push(numbers);
        }

        Ok(Self {
            index,
            name,
            robot,
            externals,
            external_numbers,
        })
    }

    pub fn robot(&self) -> &Mechanism {
        &self.robot
    }

    pub fn externals(&self) -> &[Mechanism] {
        &self.externals
    }

    pub fn robot_joint_count(&self) -> usize {
        self.robot.joints.len()
    }

    pub fn external_joint_count(&self) -> usize {
        self.external_numbers.iter().map(|n| n.len()).sum()
    }

    pub fn joint_count(&self) -> usize {
        self.robot_joint_count() + self.external_joint_count()
    }

    /// Global joint numbers of external mechanism `mechanism`.
    pub fn external_numbers(&self, mechanism: usize) -> &[usize] {
        self.external_numbers
            .get(mechanism)
            .map(|n| n.as_slice())
            .unwrap_or(&[])
    }

    /// All joints of the group ordered by number.
    pub fn joints(&self) -> Vec<&Joint> {
        self.robot
            .joints
            .iter()
            .chain(self.externals.iter().flat_map(|m| m.joints.iter()))
            .collect()
    }
}

/// Every mechanical group of a work cell. Group `index` equals its
/// position in `groups`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(try_from = "CellDefinition")]
pub struct RobotCell {
    pub groups: Vec<MechanicalGroup>,
}

#[derive(Deserialize)]
struct CellDefinition {
    groups: Vec<MechanicalGroup>,
}

impl TryFrom<CellDefinition> for RobotCell {
    type Error = KinematicsError;

    fn try_from(def: CellDefinition) -> Result<Self> {
        RobotCell::new(def.groups)
    }
}

impl RobotCell {
    pub fn new(groups: Vec<MechanicalGroup>) -> Result<Self> {
        if let Some((position, group)) = groups.iter().enumerate().find(|(i, g)| g.index != *i) {
            return Err(KinematicsError::InvalidGroup {
                index: group.index,
                reason: format!("group listed at position {}", position),
            });
        }
        Ok(Self { groups })
    }
}
