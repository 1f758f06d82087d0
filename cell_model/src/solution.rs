use serde::{Deserialize, Serialize};

use crate::configuration::RobotConfigurations;
use crate::errors::Diagnostic;
use crate::pose::Pose;

/// Result of resolving one target.
///
/// `errors` lists soft problems (out of range, out of reach, singularities)
/// rendered as text; a solution is always returned alongside them.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct KinematicSolution {
    joints: Vec<f64>,
    planes: Vec<Pose>,
    errors: Vec<String>,
    configuration: RobotConfigurations,
}

impl KinematicSolution {
    pub fn builder() -> SolutionBuilder {
        SolutionBuilder::default()
    }

    pub fn joints(&self) -> &[f64] {
        &self.joints
    }

    pub fn planes(&self) -> &[Pose] {
        &self.planes
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn configuration(&self) -> RobotConfigurations {
        self.configuration
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn has_error(&self, diagnostic: &Diagnostic) -> bool {
        let text = diagnostic.to_string();
        self.errors.iter().any(|e| *e == text)
    }

    pub fn last_plane(&self) -> Option<&Pose> {
        self.planes.last()
    }
}

/// Accumulates the parts of a [`KinematicSolution`] during a resolve call.
#[derive(Debug, Clone)]
pub struct SolutionBuilder {
    joints: Vec<f64>,
    planes: Vec<Pose>,
    errors: Vec<String>,
    configuration: RobotConfigurations,
}

impl Default for SolutionBuilder {
    fn default() -> Self {
        Self {
            joints: Vec::new(),
            planes: Vec::new(),
            errors: Vec::new(),
            configuration: RobotConfigurations::UNDEFINED,
        }
    }
}

impl SolutionBuilder {
    pub fn with_joint_count(count: usize) -> Self {
        Self {
            joints: vec![0.0; count],
            ..Self::default()
        }
    }

    pub fn joints(&self) -> &[f64] {
        &self.joints
    }

    pub fn planes(&self) -> &[Pose] {
        &self.planes
    }

    pub fn set_joints(&mut self, joints: Vec<f64>) {
        self.joints = joints;
    }

    /// Writes `values` into the joint slots named by `numbers`, growing the
    /// joint list when needed.
    pub fn splice_joints(&mut self, numbers: &[usize], values: &[f64]) {
        for (&number, &value) in numbers.iter().zip(values) {
            if number >= self.joints.len() {
                self.joints.resize(number + 1, 0.0);
            }
            self.joints[number] = value;
        }
    }

    pub fn push_plane(&mut self, plane: Pose) {
        self.planes.push(plane);
    }

    pub fn extend_planes(&mut self, planes: impl IntoIterator<Item = Pose>) {
        self.planes.extend(planes);
    }

    pub fn push_error(&mut self, diagnostic: Diagnostic) {
        self.errors.push(diagnostic.to_string());
    }

    pub fn extend_errors(&mut self, errors: impl IntoIterator<Item = String>) {
        self.errors.extend(errors);
    }

    pub fn set_configuration(&mut self, configuration: RobotConfigurations) {
        self.configuration = configuration;
    }

    pub fn build(self) -> KinematicSolution {
        KinematicSolution {
            joints: self.joints,
            planes: self.planes,
            errors: self.errors,
            configuration: self.configuration,
        }
    }
}
