//! Definitions shared by the kinematics engine: mechanisms, mechanical
//! groups, targets and the solutions produced for them.
//!
//! Everything here is plain data with serde support, so definitions can be
//! loaded by an external library loader and solutions can be shipped to a
//! post-processor unchanged.

pub mod configuration;
pub mod errors;
pub mod group;
pub mod joint;
pub mod mechanism;
pub mod pose;
pub mod solution;
pub mod target;

pub use configuration::RobotConfigurations;
pub use errors::{Diagnostic, KinematicsError, Result};
pub use group::{MechanicalGroup, RobotCell};
pub use joint::{Joint, JointKind, Range};
pub use mechanism::{ArmSolverKind, DhConvention, Manufacturer, Mechanism, MechanismKind, RobotArm};
pub use pose::Pose;
pub use solution::{KinematicSolution, SolutionBuilder};
pub use target::{Coupling, Frame, Motion, Target, TargetKind, Tool};
