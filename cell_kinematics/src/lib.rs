//! Forward and inverse kinematics for robot work cells.
//!
//! A [`RobotCellKinematics`] resolves one [`Target`](cell_model::Target) per
//! mechanical group. Each group resolves its external mechanisms first, so
//! tracks can carry the robot base and positioners can carry work frames,
//! then solves the arm with the closest-solution search of
//! [`RobotKinematics`].
//!
//! ```rust
//! use cell_kinematics::presets::{self, RobotModel};
//! use cell_kinematics::{MechanismKinematics, RobotKinematics};
//! use cell_model::Target;
//!
//! let robot = RobotKinematics::new(&presets::robot(RobotModel::Ur5)).unwrap();
//! let joints = [0.3, -1.2, 1.5, -0.8, 1.1, 0.4];
//! let target = Target::cartesian(robot.forward(&joints));
//! let solution = robot.resolve(&target, Some(&joints[..]), None);
//! assert!(!solution.has_errors());
//! ```

pub mod angles;
pub mod cell;
pub mod chain;
pub mod config;
pub mod external;
pub mod group;
pub mod mechanism;
pub mod presets;
pub mod robot;
pub mod solvers;

pub use cell::RobotCellKinematics;
pub use chain::ArmChain;
pub use config::{KinematicsConfig, NumericalConfig};
pub use external::ExternalKinematics;
pub use group::MechanicalGroupKinematics;
pub use mechanism::{MechanismKinematics, MechanismSolver};
pub use robot::RobotKinematics;
pub use solvers::{ArmKinematics, ArmSolver, IkRequest, IkSolution};
