//! Six and seven axis robot arms: configuration handling and the
//! closest-solution search around the arm solvers.

use cell_model::{
    Diagnostic, KinematicsError, Mechanism, Pose, Result, RobotConfigurations, SolutionBuilder, Target,
    TargetKind,
};
use tracing::{debug, trace};

use crate::angles;
use crate::config::KinematicsConfig;
use crate::mechanism::{checked_prev, MechanismKinematics};
use crate::solvers::{ArmKinematics, ArmSolver, IkRequest, IkSolution};

#[derive(Debug, Clone)]
pub struct RobotKinematics {
    mechanism: Mechanism,
    solver: ArmSolver,
    config: KinematicsConfig,
}

impl RobotKinematics {
    pub fn new(mechanism: &Mechanism) -> Result<Self> {
        Self::with_config(mechanism, KinematicsConfig::default())
    }

    pub fn with_config(mechanism: &Mechanism, config: KinematicsConfig) -> Result<Self> {
        config.validate().map_err(KinematicsError::InvalidConfig)?;
        mechanism.validate()?;
        let solver = ArmSolver::new(mechanism, &config)?;
        Ok(Self {
            mechanism: mechanism.clone(),
            solver,
            config,
        })
    }

    pub fn solver(&self) -> &ArmSolver {
        &self.solver
    }

    /// Flange pose relative to the arm base for `joints`.
    pub fn forward(&self, joints: &[f64]) -> Pose {
        self.solver.chain().flange(joints)
    }

    /// Single inverse kinematics call on a flange pose relative to the arm
    /// base.
    pub fn inverse(&self, flange: &Pose, request: &IkRequest) -> IkSolution {
        self.solver.inverse(flange, request)
    }

    /// Closed-form branch that reproduces `joints`, or `UNDEFINED`.
    pub fn classify(&self, joints: &[f64]) -> RobotConfigurations {
        if !self.solver.has_branches() {
            return RobotConfigurations::UNDEFINED;
        }
        let flange = self.forward(joints);
        let mut request = IkRequest::new(RobotConfigurations::NONE);
        if let Some(axis) = self.solver.redundant_axis() {
            request.redundancy = joints.get(axis).copied();
        }
        RobotConfigurations::branches()
            .find(|&configuration| {
                request.configuration = configuration;
                let solution = self.solver.inverse(&flange, &request);
                solution.errors.is_empty()
                    && solution
                        .joints
                        .iter()
                        .zip(joints)
                        .all(|(a, b)| angles::angular_distance(*a, *b) <= self.config.configuration_tolerance)
            })
            .unwrap_or(RobotConfigurations::UNDEFINED)
    }

    /// Value of the redundant axis: from the target, then the previous
    /// joints, then the middle of the axis range.
    fn redundancy(&self, target: &Target, prev: Option<&[f64]>) -> Option<f64> {
        let axis = self.solver.redundant_axis()?;
        target
            .redundancy()
            .or_else(|| prev.and_then(|p| p.get(axis).copied()))
            .or_else(|| self.mechanism.joints.get(axis).map(|j| j.range.mid()))
    }

    fn solve_cartesian(
        &self,
        flange: &Pose,
        configuration: Option<RobotConfigurations>,
        redundancy: Option<f64>,
        prev: Option<&[f64]>,
    ) -> (IkSolution, RobotConfigurations) {
        let mut request = IkRequest::new(RobotConfigurations::NONE);
        request.redundancy = redundancy;
        request.seed = prev;

        if !self.solver.has_branches() {
            request.configuration = RobotConfigurations::UNDEFINED;
            let mut solution = self.solver.inverse(flange, &request);
            if let Some(prev) = prev {
                angles::absolute_joints(&mut solution.joints, prev, &self.mechanism.joints);
            }
            return (solution, RobotConfigurations::UNDEFINED);
        }

        let configuration = match (configuration, prev) {
            (None, Some(prev)) => return self.closest(flange, request, prev),
            (configuration, _) => configuration.unwrap_or(RobotConfigurations::NONE),
        };
        request.configuration = configuration;
        let mut solution = self.solver.inverse(flange, &request);
        if let Some(prev) = prev {
            angles::absolute_joints(&mut solution.joints, prev, &self.mechanism.joints);
        }
        (solution, configuration)
    }

    /// Solves every branch and keeps the one nearest to `prev`. Reachable
    /// branches win over unreachable ones; ties go to the lowest index.
    fn closest(&self, flange: &Pose, mut request: IkRequest, prev: &[f64]) -> (IkSolution, RobotConfigurations) {
        let mut best: Option<((bool, f64), IkSolution, RobotConfigurations)> = None;
        for configuration in RobotConfigurations::branches() {
            request.configuration = configuration;
            let mut solution = self.solver.inverse(flange, &request);
            angles::absolute_joints(&mut solution.joints, prev, &self.mechanism.joints);
            let score = (
                solution.has(&Diagnostic::OutOfReach),
                angles::squared_difference(&solution.joints, prev),
            );
            trace!(%configuration, distance = score.1, unreachable = score.0, "branch");
            let better = match &best {
                Some((best_score, _, _)) => score < *best_score,
                None => true,
            };
            if better {
                best = Some((score, solution, configuration));
            }
        }
        match best {
            Some((_, solution, configuration)) => (solution, configuration),
            None => (
                IkSolution {
                    joints: prev.to_vec(),
                    errors: vec![Diagnostic::OutOfReach],
                },
                RobotConfigurations::UNDEFINED,
            ),
        }
    }
}

impl MechanismKinematics for RobotKinematics {
    fn mechanism(&self) -> &Mechanism {
        &self.mechanism
    }

    fn set_joints(&self, target: &Target, prev: Option<&[f64]>, base: &Pose, builder: &mut SolutionBuilder) {
        let count = self.mechanism.joints.len();
        let prev = checked_prev(prev, count, builder);

        match &target.kind {
            TargetKind::Joint { joints } => {
                let mut joints = joints.clone();
                if joints.len() != count {
                    builder.push_error(Diagnostic::JointCountMismatch {
                        expected: count,
                        found: joints.len(),
                    });
                    joints.resize(count, 0.0);
                }
                let configuration = self.classify(&joints);
                debug!(mechanism = %self.mechanism.name, %configuration, "joint target");
                builder.set_joints(joints);
                builder.set_configuration(configuration);
            }
            TargetKind::Cartesian {
                pose, configuration, ..
            } => {
                let world = target.frame.plane * pose * target.tool.tcp.inverse();
                let flange = base.inverse() * world;
                let redundancy = self.redundancy(target, prev);
                let (solution, configuration) = self.solve_cartesian(&flange, *configuration, redundancy, prev);
                debug!(
                    mechanism = %self.mechanism.name,
                    %configuration,
                    errors = solution.errors.len(),
                    "cartesian target"
                );
                for diagnostic in solution.errors {
                    builder.push_error(diagnostic);
                }
                builder.set_joints(solution.joints);
                builder.set_configuration(configuration);
            }
        }
    }

    /// Arm joint planes; the last one is the flange.
    fn joint_planes(&self, joints: &[f64]) -> Vec<Pose> {
        let chain = self.solver.chain();
        let mut planes = self.solver.forward(joints);
        if let Some(last) = planes.last_mut() {
            *last *= chain.flange_offset();
        }
        planes
    }
}
