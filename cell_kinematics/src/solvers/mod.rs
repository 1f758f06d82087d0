//! Inverse kinematics strategies for robot arms.
//!
//! Every solver works in the arm base frame on flange poses; tool, frame and
//! base offsets are removed by [`RobotKinematics`](crate::RobotKinematics)
//! before a solver is called.

mod franka;
#[cfg(feature = "k-solver")]
mod franka_k;
mod jacobian;
mod not_implemented;
mod numerical;
mod offset_wrist;
mod spherical_wrist;

pub use franka::{FrankaAnalyticalKinematics, FrankaNumericalKinematics};
#[cfg(feature = "k-solver")]
pub use franka_k::FrankaLibraryKinematics;
pub use not_implemented::NotImplementedKinematics;
pub use numerical::NumericalKinematics;
pub use offset_wrist::OffsetWristKinematics;
pub use spherical_wrist::SphericalWristKinematics;

use cell_model::{ArmSolverKind, Diagnostic, KinematicsError, Mechanism, Pose, Result, RobotConfigurations};

use crate::chain::ArmChain;
use crate::config::KinematicsConfig;

/// Per-call inputs of an inverse kinematics solve besides the pose.
#[derive(Debug, Clone, Copy)]
pub struct IkRequest<'a> {
    pub configuration: RobotConfigurations,
    /// Value of the redundant axis on seven axis arms, already resolved
    /// from the target, the previous joints or the axis range.
    pub redundancy: Option<f64>,
    /// Starting point of iterative solvers.
    pub seed: Option<&'a [f64]>,
}

impl<'a> IkRequest<'a> {
    pub fn new(configuration: RobotConfigurations) -> Self {
        Self {
            configuration,
            redundancy: None,
            seed: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IkSolution {
    pub joints: Vec<f64>,
    pub errors: Vec<Diagnostic>,
}

impl IkSolution {
    pub fn has(&self, diagnostic: &Diagnostic) -> bool {
        self.errors.contains(diagnostic)
    }

    fn push_once(&mut self, diagnostic: Diagnostic) {
        if !self.has(&diagnostic) {
            self.errors.push(diagnostic);
        }
    }
}

/// Forward and inverse kinematics of one arm architecture.
pub trait ArmKinematics {
    fn chain(&self) -> &ArmChain;

    fn inverse(&self, flange: &Pose, request: &IkRequest) -> IkSolution;

    /// Joint poses relative to the arm base.
    fn forward(&self, joints: &[f64]) -> Vec<Pose> {
        self.chain().forward(joints)
    }

    /// Closed-form solvers enumerate eight discrete branches; iterative
    /// ones do not.
    fn has_branches(&self) -> bool {
        true
    }
}

/// The solver selected for one robot arm.
#[derive(Debug, Clone)]
pub enum ArmSolver {
    SphericalWrist(SphericalWristKinematics),
    OffsetWrist(OffsetWristKinematics),
    Numerical(NumericalKinematics),
    FrankaAnalytical(FrankaAnalyticalKinematics),
    FrankaNumerical(FrankaNumericalKinematics),
    #[cfg(feature = "k-solver")]
    FrankaLibrary(FrankaLibraryKinematics),
    NotImplemented(NotImplementedKinematics),
}

impl ArmSolver {
    pub fn new(mechanism: &Mechanism, config: &KinematicsConfig) -> Result<Self> {
        let arm = mechanism.robot_arm().ok_or_else(|| KinematicsError::InvalidMechanism {
            name: mechanism.name.clone(),
            reason: "not a robot arm".to_string(),
        })?;
        let chain = ArmChain::from_mechanism(mechanism).ok_or_else(|| KinematicsError::InvalidMechanism {
            name: mechanism.name.clone(),
            reason: "not a robot arm".to_string(),
        })?;

        let solver = match arm.solver {
            ArmSolverKind::SphericalWrist => Self::SphericalWrist(SphericalWristKinematics::new(chain, config)?),
            ArmSolverKind::OffsetWrist => Self::OffsetWrist(OffsetWristKinematics::new(chain, config)?),
            ArmSolverKind::Numerical { redundant } => {
                Self::Numerical(NumericalKinematics::new(chain, redundant, config.numerical.clone()))
            }
            ArmSolverKind::FrankaAnalytical => Self::FrankaAnalytical(FrankaAnalyticalKinematics::new(chain, config)?),
            ArmSolverKind::FrankaNumerical => Self::FrankaNumerical(FrankaNumericalKinematics::new(chain, config)?),
            #[cfg(feature = "k-solver")]
            ArmSolverKind::FrankaLibrary => Self::FrankaLibrary(FrankaLibraryKinematics::new(chain, config)?),
            #[cfg(not(feature = "k-solver"))]
            ArmSolverKind::FrankaLibrary => {
                return Err(unsupported("Franka library", "built without the k-solver feature"))
            }
            ArmSolverKind::NotImplemented => {
                Self::NotImplemented(NotImplementedKinematics::new(chain, arm.manufacturer))
            }
        };
        Ok(solver)
    }

    fn inner(&self) -> &dyn ArmKinematics {
        match self {
            Self::SphericalWrist(s) => s,
            Self::OffsetWrist(s) => s,
            Self::Numerical(s) => s,
            Self::FrankaAnalytical(s) => s,
            Self::FrankaNumerical(s) => s,
            #[cfg(feature = "k-solver")]
            Self::FrankaLibrary(s) => s,
            Self::NotImplemented(s) => s,
        }
    }

    /// Index of the axis whose value is chosen by the caller on redundant
    /// arms.
    pub fn redundant_axis(&self) -> Option<usize> {
        match self {
            Self::Numerical(s) => s.redundant_axis(),
            Self::FrankaAnalytical(_) | Self::FrankaNumerical(_) => Some(6),
            #[cfg(feature = "k-solver")]
            Self::FrankaLibrary(_) => Some(6),
            _ => None,
        }
    }
}

impl ArmKinematics for ArmSolver {
    fn chain(&self) -> &ArmChain {
        self.inner().chain()
    }

    fn inverse(&self, flange: &Pose, request: &IkRequest) -> IkSolution {
        self.inner().inverse(flange, request)
    }

    fn forward(&self, joints: &[f64]) -> Vec<Pose> {
        self.inner().forward(joints)
    }

    fn has_branches(&self) -> bool {
        self.inner().has_branches()
    }
}

pub(crate) fn unsupported(solver: &str, reason: impl Into<String>) -> KinematicsError {
    KinematicsError::UnsupportedGeometry {
        solver: solver.to_string(),
        reason: reason.into(),
    }
}

/// Checks one DH parameter of a closed-form geometry.
pub(crate) fn expect_param(solver: &str, name: &str, axis: usize, value: f64, expected: f64) -> Result<()> {
    if (value - expected).abs() > 1e-9 {
        return Err(unsupported(
            solver,
            format!("{} of axis {} is {}, expected {}", name, axis + 1, value, expected),
        ));
    }
    Ok(())
}

/// Clamps a cosine or sine into `[-1, 1]`, reporting when it was outside.
pub(crate) fn clamp_unit(value: f64, solution: &mut IkSolution) -> f64 {
    if value.abs() > 1.0 + 1e-12 {
        solution.push_once(Diagnostic::OutOfReach);
    }
    value.clamp(-1.0, 1.0)
}
