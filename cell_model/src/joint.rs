use serde::{Deserialize, Serialize};

use crate::pose::{self, Pose};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum JointKind {
    Revolute,
    Prismatic,
}

/// Travel limits of a joint, radians for revolute joints and millimetres
/// for prismatic ones.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct Range {
    pub min: f64,
    pub max: f64,
}

impl Range {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    pub fn mid(&self) -> f64 {
        0.5 * (self.min + self.max)
    }

    pub fn is_valid(&self) -> bool {
        self.min <= self.max
    }
}

/// One axis of a mechanism.
///
/// `a`, `d`, `alpha` and `theta` are the DH parameters of the link the
/// joint drives. The joint value `q` enters the chain as
/// `theta + sign * q` for revolute joints and `d + sign * q` for prismatic
/// ones. External mechanisms that are not described by DH parameters use
/// `plane` instead: the pose of the joint axis (its Z axis) at zero travel,
/// relative to the mechanism base.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Joint {
    pub kind: JointKind,
    pub a: f64,
    pub d: f64,
    pub alpha: f64,
    pub theta: f64,
    pub sign: f64,
    pub range: Range,
    pub max_speed: f64,
    /// Position within the owning mechanism.
    pub index: usize,
    /// Position within the owning mechanical group, assigned by the group.
    pub number: usize,
    #[serde(default = "pose::identity")]
    pub plane: Pose,
    #[serde(default)]
    pub mesh: Option<String>,
}

impl Joint {
    pub fn revolute(a: f64, d: f64, alpha: f64, theta: f64, range: Range) -> Self {
        Self {
            kind: JointKind::Revolute,
            a,
            d,
            alpha,
            theta,
            sign: 1.0,
            range,
            max_speed: std::f64::consts::PI,
            index: 0,
            number: 0,
            plane: pose::identity(),
            mesh: None,
        }
    }

    pub fn prismatic(a: f64, d: f64, alpha: f64, theta: f64, range: Range) -> Self {
        Self {
            kind: JointKind::Prismatic,
            max_speed: 1000.0,
            ..Self::revolute(a, d, alpha, theta, range)
        }
    }

    /// Rest plane for joints that are not placed through DH parameters.
    pub fn with_plane(mut self, plane: Pose) -> Self {
        self.plane = plane;
        self
    }

    pub fn with_sign(mut self, sign: f64) -> Self {
        self.sign = sign;
        self
    }

    pub fn with_max_speed(mut self, max_speed: f64) -> Self {
        self.max_speed = max_speed;
        self
    }

    pub fn is_revolute(&self) -> bool {
        self.kind == JointKind::Revolute
    }

    /// DH `(theta, d)` pair for the joint value `q`.
    pub fn dh_values(&self, q: f64) -> (f64, f64) {
        match self.kind {
            JointKind::Revolute => (self.theta + self.sign * q, self.d),
            JointKind::Prismatic => (self.theta, self.d + self.sign * q),
        }
    }

    /// Joint value that produces the DH angle `theta`.
    pub fn joint_value(&self, theta: f64) -> f64 {
        (theta - self.theta) / self.sign
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dh_values() {
        let j = Joint::revolute(0.0, 400.0, 0.0, -0.5, Range::new(-3.0, 3.0)).with_sign(-1.0);
        let (theta, d) = j.dh_values(0.25);
        assert!((theta + 0.75).abs() < 1e-12);
        assert_eq!(d, 400.0);
        assert!((j.joint_value(theta) - 0.25).abs() < 1e-12);

        let p = Joint::prismatic(0.0, 10.0, 0.0, 0.0, Range::new(0.0, 2000.0));
        let (theta, d) = p.dh_values(150.0);
        assert_eq!(theta, 0.0);
        assert!((d - 160.0).abs() < 1e-12);
    }

    #[test]
    fn test_range() {
        let r = Range::new(-1.0, 2.0);
        assert!(r.contains(-1.0) && r.contains(2.0) && !r.contains(2.0001));
        assert!((r.mid() - 0.5).abs() < 1e-12);
        assert!(!Range::new(1.0, 0.0).is_valid());
    }
}
