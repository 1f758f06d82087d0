//! Denavit-Hartenberg chain builders.

use cell_model::{DhConvention, Joint, Mechanism, Pose};
use nalgebra::{Translation3, UnitQuaternion, Vector3};

/// Standard DH link transform `Rz(theta)·Tz(d)·Tx(a)·Rx(alpha)`.
pub fn dh(a: f64, d: f64, alpha: f64, theta: f64) -> Pose {
    let (st, ct) = theta.sin_cos();
    Pose::from_parts(
        Translation3::new(a * ct, a * st, d),
        UnitQuaternion::from_axis_angle(&Vector3::z_axis(), theta)
            * UnitQuaternion::from_axis_angle(&Vector3::x_axis(), alpha),
    )
}

/// Modified (Craig) DH link transform `Rx(alpha)·Tx(a)·Rz(theta)·Tz(d)`.
pub fn modified_dh(a: f64, d: f64, alpha: f64, theta: f64) -> Pose {
    let (sa, ca) = alpha.sin_cos();
    Pose::from_parts(
        Translation3::new(a, -d * sa, d * ca),
        UnitQuaternion::from_axis_angle(&Vector3::x_axis(), alpha)
            * UnitQuaternion::from_axis_angle(&Vector3::z_axis(), theta),
    )
}

/// Cumulative standard DH transforms, one per joint.
pub fn dh_chain(joints: &[Joint], values: &[f64]) -> Vec<Pose> {
    chain(joints, values, DhConvention::Standard)
}

/// Cumulative modified DH transforms, one per joint.
pub fn modified_dh_chain(joints: &[Joint], values: &[f64]) -> Vec<Pose> {
    chain(joints, values, DhConvention::Modified)
}

fn chain(joints: &[Joint], values: &[f64], convention: DhConvention) -> Vec<Pose> {
    let link = match convention {
        DhConvention::Standard => dh,
        DhConvention::Modified => modified_dh,
    };
    let mut current = Pose::identity();
    joints
        .iter()
        .zip(values)
        .map(|(joint, &q)| {
            let (theta, d) = joint.dh_values(q);
            current *= link(joint.a, d, joint.alpha, theta);
            current
        })
        .collect()
}

/// Serial chain of a robot arm, relative to the arm base.
#[derive(Debug, Clone)]
pub struct ArmChain {
    joints: Vec<Joint>,
    convention: DhConvention,
    flange: Pose,
    j2_j3_coupled: bool,
}

impl ArmChain {
    pub fn new(joints: Vec<Joint>, convention: DhConvention, flange: Pose, j2_j3_coupled: bool) -> Self {
        Self {
            joints,
            convention,
            flange,
            j2_j3_coupled,
        }
    }

    /// `None` when `mechanism` is not a robot arm.
    pub fn from_mechanism(mechanism: &Mechanism) -> Option<Self> {
        let arm = mechanism.robot_arm()?;
        Some(Self::new(
            mechanism.joints.clone(),
            arm.convention,
            arm.flange,
            arm.j2_j3_coupled,
        ))
    }

    pub fn len(&self) -> usize {
        self.joints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.joints.is_empty()
    }

    pub fn joints(&self) -> &[Joint] {
        &self.joints
    }

    pub fn convention(&self) -> DhConvention {
        self.convention
    }

    pub fn flange_offset(&self) -> &Pose {
        &self.flange
    }

    /// Joint values as seen by the DH table, with the axis 2/3 interaction
    /// folded in.
    fn chain_values(&self, values: &[f64]) -> Vec<f64> {
        let mut values = values.to_vec();
        if self.j2_j3_coupled && values.len() > 2 {
            let (s2, s3) = (self.joints[1].sign, self.joints[2].sign);
            values[2] += s2 * values[1] / s3;
        }
        values
    }

    /// Joint poses for `values`, one per joint.
    pub fn forward(&self, values: &[f64]) -> Vec<Pose> {
        chain(&self.joints, &self.chain_values(values), self.convention)
    }

    /// Flange pose for `values`.
    pub fn flange(&self, values: &[f64]) -> Pose {
        match self.forward(values).last() {
            Some(last) => last * self.flange,
            None => self.flange,
        }
    }
}
