use cell_model::{
    Diagnostic, KinematicSolution, KinematicsError, MechanicalGroup, Pose, Result, SolutionBuilder, Target,
};
use tracing::debug;

use crate::config::KinematicsConfig;
use crate::external::ExternalKinematics;
use crate::mechanism::MechanismKinematics;
use crate::robot::RobotKinematics;

/// Kinematics of a robot arm together with its external mechanisms.
///
/// Solution planes are laid out as `[arm base, arm joints…, ext0 base,
/// ext0 joints…, …, tool]`.
#[derive(Debug, Clone)]
pub struct MechanicalGroupKinematics {
    group: MechanicalGroup,
    robot: RobotKinematics,
    externals: Vec<ExternalKinematics>,
}

impl MechanicalGroupKinematics {
    pub fn new(group: &MechanicalGroup) -> Result<Self> {
        Self::with_config(group, &KinematicsConfig::default())
    }

    pub fn with_config(group: &MechanicalGroup, config: &KinematicsConfig) -> Result<Self> {
        let robot = RobotKinematics::with_config(group.robot(), config.clone())?;
        let first_external = group.robot_joint_count();
        let externals = group
            .externals()
            .iter()
            .map(|mechanism| ExternalKinematics::new(mechanism, first_external))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            group: group.clone(),
            robot,
            externals,
        })
    }

    pub fn group(&self) -> &MechanicalGroup {
        &self.group
    }

    pub fn robot(&self) -> &RobotKinematics {
        &self.robot
    }

    /// Index into the solution planes of the last plane of external
    /// `mechanism`.
    pub fn external_plane_index(&self, mechanism: usize) -> Option<usize> {
        if mechanism >= self.externals.len() {
            return None;
        }
        let arm = 1 + self.group.robot_joint_count();
        let before: usize = self.group.externals()[..=mechanism]
            .iter()
            .map(|m| 1 + m.joints.len())
            .sum();
        Some(arm + before - 1)
    }

    /// Plane another group may couple its frame to: the tool plane for the
    /// robot, the last plane of an external mechanism otherwise.
    pub fn coupling_plane(&self, solution: &KinematicSolution, mechanism: Option<usize>) -> Option<Pose> {
        match mechanism {
            None => solution.last_plane().copied(),
            Some(i) => self
                .external_plane_index(i)
                .and_then(|index| solution.planes().get(index).copied()),
        }
    }

    /// Resolves `target` for the whole group.
    ///
    /// `coupled` is the plane of another group's mechanism when the target
    /// frame is coupled to it. Couplings to this group's own externals are
    /// resolved here.
    pub fn resolve(&self, target: &Target, prev: Option<&[f64]>, coupled: Option<&Pose>) -> Result<KinematicSolution> {
        let index = self.group.index;
        let joint_count = self.group.joint_count();
        let mut builder = SolutionBuilder::with_joint_count(joint_count);

        let prev = match prev {
            Some(values) if values.len() == joint_count => Some(values),
            Some(_) => {
                builder.push_error(Diagnostic::PrevJointsMismatch);
                None
            }
            None => None,
        };

        let own_external = match target.frame.coupling {
            Some(c) if c.group == index => match c.mechanism {
                None => return Err(KinematicsError::SelfCoupling { group: index }),
                Some(i) if i < self.externals.len() => Some(i),
                Some(i) => {
                    return Err(KinematicsError::UnknownCoupling {
                        group: index,
                        target: index,
                        mechanism: Some(i),
                    })
                }
            },
            Some(c) if coupled.is_none() => {
                return Err(KinematicsError::UnknownCoupling {
                    group: index,
                    target: c.group,
                    mechanism: c.mechanism,
                })
            }
            _ => None,
        };

        let mut robot_base = None;
        let mut coupled_plane = target.frame.coupling.and(coupled.copied());
        let mut external_planes = Vec::new();
        for (i, kin) in self.externals.iter().enumerate() {
            let numbers = self.group.external_numbers(i);
            let slice: Option<Vec<f64>> = prev.map(|p| numbers.iter().map(|&n| p[n]).collect());
            let solution = kin.resolve(target, slice.as_deref(), None);

            builder.splice_joints(numbers, solution.joints());
            builder.extend_errors(solution.errors().iter().cloned());
            if let Some(last) = solution.last_plane() {
                if kin.mechanism().moves_robot {
                    robot_base = Some(*last);
                }
                if own_external == Some(i) {
                    coupled_plane = Some(*last);
                }
            }
            external_planes.extend_from_slice(solution.planes());
        }

        let arm_target;
        let target = match coupled_plane {
            Some(plane) => {
                let mut relocated = target.clone();
                relocated.frame.plane = plane * target.frame.plane;
                arm_target = relocated;
                &arm_target
            }
            None => target,
        };

        let arm_count = self.group.robot_joint_count();
        let arm_prev = prev.map(|p| &p[..arm_count]);
        let arm = self.robot.resolve(target, arm_prev, robot_base.as_ref());
        let numbers: Vec<usize> = (0..arm_count).collect();
        builder.splice_joints(&numbers, arm.joints());
        builder.extend_errors(arm.errors().iter().cloned());
        builder.set_configuration(arm.configuration());
        builder.extend_planes(arm.planes().iter().copied());
        builder.extend_planes(external_planes);

        if let Some(flange) = arm.last_plane() {
            builder.push_plane(flange * target.tool.tcp);
        }

        let solution = builder.build();
        debug!(
            group = index,
            configuration = %solution.configuration(),
            errors = solution.errors().len(),
            "resolved group"
        );
        Ok(solution)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::presets::{self, RobotModel};
    use cell_model::{pose, Frame, RobotConfigurations, Tool};

    fn track_group() -> MechanicalGroupKinematics {
        let mut robot = presets::robot(RobotModel::GenericSpherical);
        robot.base = pose::translation(0.0, 0.0, 200.0);
        let group = MechanicalGroup::new(0, "track cell", robot, vec![presets::track(4000.0), presets::positioner(700.0)]).unwrap();
        MechanicalGroupKinematics::new(&group).unwrap()
    }

    #[test]
    fn test_plane_layout() {
        let kin = track_group();
        let target = Target::joint(vec![0.1, -0.2, 0.3, 0.0, 0.5, 0.0]).with_external(vec![1000.0, 0.2, 0.4]);
        let solution = kin.resolve(&target, None, None).unwrap();

        // arm base + 6 + track base + 1 + positioner base + 2 + tool
        assert_eq!(solution.planes().len(), 13);
        assert_eq!(solution.joints().len(), 9);
        assert_eq!(&solution.joints()[6..], &[1000.0, 0.2, 0.4]);
        assert_eq!(kin.external_plane_index(0), Some(8));
        assert_eq!(kin.external_plane_index(1), Some(11));
        assert_eq!(kin.external_plane_index(2), None);
        assert_eq!(solution.configuration(), RobotConfigurations::SHOULDER);
    }

    #[test]
    fn test_track_carries_robot_base() {
        let kin = track_group();
        let joints = [0.1, -0.2, 0.3, 0.0, 0.5, 0.0];
        let target = Target::joint(joints.to_vec()).with_external(vec![1000.0, 0.0, 0.0]);
        let solution = kin.resolve(&target, None, None).unwrap();

        let base = solution.planes()[0].translation.vector;
        assert!((base.x - 1000.0).abs() < 1e-9 && (base.z - 200.0).abs() < 1e-9, "base at {:?}", base);

        // the same tool pose reached from the moved base
        let tool = solution.last_plane().unwrap();
        let cartesian = Target::cartesian(*tool)
            .with_configuration(RobotConfigurations::SHOULDER)
            .with_external(vec![1000.0, 0.0, 0.0]);
        let back = kin.resolve(&cartesian, None, None).unwrap();
        assert!(!back.has_errors(), "errors {:?}", back.errors());
        for (a, b) in back.joints().iter().zip(joints) {
            assert!((a - b).abs() < 1e-6, "{} != {}", a, b);
        }
    }

    #[test]
    fn test_frame_coupled_to_positioner() {
        let kin = track_group();
        let part = pose::translation(300.0, 200.0, 700.0);
        let frame = Frame::new("fixture", part).coupled_to(0, Some(1));

        let still = Target::cartesian(pose::identity()).with_frame(frame.clone()).with_external(vec![0.0, 0.0, 0.0]);
        let turned = Target::cartesian(pose::identity()).with_frame(frame).with_external(vec![0.0, 0.0, 0.3]);
        let a = kin.resolve(&still, None, None).unwrap();
        let b = kin.resolve(&turned, None, None).unwrap();

        let ta = a.last_plane().unwrap().translation.vector;
        let tb = b.last_plane().unwrap().translation.vector;
        println!("tool with table still: {:?}, turned: {:?}", ta, tb);
        assert!(!a.has_error(&Diagnostic::OutOfReach) && !b.has_error(&Diagnostic::OutOfReach));
        assert!((ta - part.translation.vector).norm() < 1e-6);
        assert!((ta - tb).norm() > 1.0, "turning the table moves the target");
    }

    #[test]
    fn test_tool_plane_is_last() {
        let kin = track_group();
        let tool = Tool::new("torch", pose::translation(0.0, 0.0, 150.0));
        let target = Target::joint(vec![0.1, -0.2, 0.3, 0.0, 0.5, 0.0])
            .with_tool(tool.clone())
            .with_external(vec![0.0, 0.0, 0.0]);
        let solution = kin.resolve(&target, None, None).unwrap();
        let flange = solution.planes()[6];
        assert!(pose::approx_eq(solution.last_plane().unwrap(), &(flange * tool.tcp), 1e-9, 1e-12));
    }

    #[test]
    fn test_self_and_unknown_couplings_fail() {
        let kin = track_group();
        let own_robot = Target::cartesian(pose::identity()).with_frame(Frame::new("f", pose::identity()).coupled_to(0, None));
        assert_eq!(
            kin.resolve(&own_robot, None, None),
            Err(KinematicsError::SelfCoupling { group: 0 })
        );

        let missing = Target::cartesian(pose::identity()).with_frame(Frame::new("f", pose::identity()).coupled_to(0, Some(5)));
        assert!(matches!(kin.resolve(&missing, None, None), Err(KinematicsError::UnknownCoupling { .. })));

        let other = Target::cartesian(pose::identity()).with_frame(Frame::new("f", pose::identity()).coupled_to(3, None));
        assert!(matches!(kin.resolve(&other, None, None), Err(KinematicsError::UnknownCoupling { target: 3, .. })));
    }

    #[test]
    fn test_previous_joints_are_sliced_by_number() {
        let kin = track_group();
        let prev = [0.1, -0.2, 0.3, 0.0, 0.5, 0.0, 1000.0, 0.2, 3.0];
        let target = Target::joint(prev[..6].to_vec()).with_external(vec![1000.0, 0.2, -3.0]);
        let solution = kin.resolve(&target, Some(&prev[..]), None).unwrap();
        assert!((solution.joints()[8] - (-3.0 + std::f64::consts::TAU)).abs() < 1e-12);

        let solution = kin.resolve(&target, Some(&prev[..4]), None).unwrap();
        assert!(solution.has_error(&Diagnostic::PrevJointsMismatch));
    }
}
