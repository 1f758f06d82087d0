use serde::{Deserialize, Serialize};

use crate::configuration::RobotConfigurations;
use crate::pose::{self, Pose};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Tool {
    pub name: String,
    /// Tool centre point relative to the flange.
    pub tcp: Pose,
}

impl Tool {
    pub fn new(name: impl Into<String>, tcp: Pose) -> Self {
        Self { name: name.into(), tcp }
    }
}

impl Default for Tool {
    fn default() -> Self {
        Self::new("flange", pose::identity())
    }
}

/// Reference to the mechanism a frame moves with. `mechanism: None` is the
/// robot of `group`, `Some(i)` its external mechanism `i`.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Coupling {
    pub group: usize,
    #[serde(default)]
    pub mechanism: Option<usize>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Frame {
    pub name: String,
    /// Work offset. Relative to the coupled mechanism when coupled, to the
    /// cell origin otherwise.
    pub plane: Pose,
    #[serde(default)]
    pub coupling: Option<Coupling>,
}

impl Frame {
    pub fn new(name: impl Into<String>, plane: Pose) -> Self {
        Self {
            name: name.into(),
            plane,
            coupling: None,
        }
    }

    pub fn coupled_to(mut self, group: usize, mechanism: Option<usize>) -> Self {
        self.coupling = Some(Coupling { group, mechanism });
        self
    }
}

impl Default for Frame {
    fn default() -> Self {
        Self::new("world", pose::identity())
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Motion {
    #[default]
    Joint,
    Linear,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum TargetKind {
    Joint {
        joints: Vec<f64>,
    },
    Cartesian {
        pose: Pose,
        #[serde(default)]
        configuration: Option<RobotConfigurations>,
        #[serde(default)]
        motion: Motion,
        /// Value of the redundant axis on arms with more than six axes.
        #[serde(default)]
        redundancy: Option<f64>,
    },
}

/// Where a mechanical group should go at one instant.
///
/// `external` holds the values of the axes beyond the robot arm, indexed by
/// `number - arm_len`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Target {
    pub kind: TargetKind,
    #[serde(default)]
    pub tool: Tool,
    #[serde(default)]
    pub frame: Frame,
    #[serde(default)]
    pub external: Vec<f64>,
}

impl Target {
    pub fn joint(joints: Vec<f64>) -> Self {
        Self {
            kind: TargetKind::Joint { joints },
            tool: Tool::default(),
            frame: Frame::default(),
            external: Vec::new(),
        }
    }

    pub fn cartesian(pose: Pose) -> Self {
        Self {
            kind: TargetKind::Cartesian {
                pose,
                configuration: None,
                motion: Motion::Joint,
                redundancy: None,
            },
            tool: Tool::default(),
            frame: Frame::default(),
            external: Vec::new(),
        }
    }

    pub fn with_tool(mut self, tool: Tool) -> Self {
        self.tool = tool;
        self
    }

    pub fn with_frame(mut self, frame: Frame) -> Self {
        self.frame = frame;
        self
    }

    pub fn with_external(mut self, external: Vec<f64>) -> Self {
        self.external = external;
        self
    }

    /// No effect on joint targets.
    pub fn with_configuration(mut self, value: RobotConfigurations) -> Self {
        if let TargetKind::Cartesian { configuration, .. } = &mut self.kind {
            *configuration = Some(value);
        }
        self
    }

    /// No effect on joint targets.
    pub fn with_redundancy(mut self, value: f64) -> Self {
        if let TargetKind::Cartesian { redundancy, .. } = &mut self.kind {
            *redundancy = Some(value);
        }
        self
    }

    pub fn with_motion(mut self, value: Motion) -> Self {
        if let TargetKind::Cartesian { motion, .. } = &mut self.kind {
            *motion = value;
        }
        self
    }

    pub fn configuration(&self) -> Option<RobotConfigurations> {
        match &self.kind {
            TargetKind::Cartesian { configuration, .. } => *configuration,
            TargetKind::Joint { .. } => None,
        }
    }

    pub fn redundancy(&self) -> Option<f64> {
        match &self.kind {
            TargetKind::Cartesian { redundancy, .. } => *redundancy,
            TargetKind::Joint { .. } => None,
        }
    }

    /// Flange pose in the frame's reference (cell origin or coupled plane):
    /// `frame · pose · tcp⁻¹`. `None` for joint targets.
    pub fn flange_pose(&self) -> Option<Pose> {
        match &self.kind {
            TargetKind::Cartesian { pose, .. } => {
                Some(self.frame.plane * pose * self.tool.tcp.inverse())
            }
            TargetKind::Joint { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flange_pose_removes_tool_and_frame() {
        let target = Target::cartesian(pose::translation(10.0, 0.0, 0.0))
            .with_tool(Tool::new("gripper", pose::translation(0.0, 0.0, 100.0)))
            .with_frame(Frame::new("table", pose::translation(500.0, 0.0, 0.0)));

        let flange = target.flange_pose().unwrap();
        let t = flange.translation.vector;
        assert!((t.x - 510.0).abs() < 1e-9 && t.y.abs() < 1e-9 && (t.z + 100.0).abs() < 1e-9);

        let tcp = flange * target.tool.tcp;
        let expected = target.frame.plane * pose::translation(10.0, 0.0, 0.0);
        assert!(pose::approx_eq(&tcp, &expected, 1e-9, 1e-12));
    }

    #[test]
    fn test_builders_ignore_joint_targets() {
        let target = Target::joint(vec![0.0; 6])
            .with_configuration(RobotConfigurations::ELBOW)
            .with_redundancy(0.3);
        assert_eq!(target.configuration(), None);
        assert_eq!(target.redundancy(), None);
        assert!(target.flange_pose().is_none());

        let target = Target::cartesian(pose::identity())
            .with_configuration(RobotConfigurations::ELBOW)
            .with_redundancy(0.3);
        assert_eq!(target.configuration(), Some(RobotConfigurations::ELBOW));
        assert_eq!(target.redundancy(), Some(0.3));
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let json = r#"{ "kind": { "Joint": { "joints": [0.0, 1.0] } } }"#;
        let target: Target = serde_json::from_str(json).unwrap();
        assert_eq!(target.tool, Tool::default());
        assert!(target.frame.coupling.is_none());
        assert!(target.external.is_empty());
    }
}
