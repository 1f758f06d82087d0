use std::fmt;
use std::ops::{BitAnd, BitOr};

use serde::{Deserialize, Serialize};

/// Inverse kinematics branch of a six or seven axis arm.
///
/// Three independent flags select one of eight branches. `UNDEFINED` marks
/// a solution whose branch could not be identified.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[serde(transparent)]
pub struct RobotConfigurations(u8);

impl RobotConfigurations {
    pub const NONE: Self = Self(0);
    pub const SHOULDER: Self = Self(1);
    pub const ELBOW: Self = Self(2);
    pub const WRIST: Self = Self(4);
    pub const UNDEFINED: Self = Self(8);

    /// Branch with index `index` in `0..8`, bit 0 shoulder, bit 1 elbow,
    /// bit 2 wrist.
    pub fn from_index(index: usize) -> Self {
        Self((index & 7) as u8)
    }

    pub fn index(self) -> usize {
        (self.0 & 7) as usize
    }

    /// All eight branches in index order.
    pub fn branches() -> impl Iterator<Item = Self> {
        (0..8).map(Self::from_index)
    }

    pub fn contains(self, other: Self) -> bool {
        other.0 != 0 && self.0 & other.0 == other.0
    }

    pub fn shoulder(self) -> bool {
        self.contains(Self::SHOULDER)
    }

    pub fn elbow(self) -> bool {
        self.contains(Self::ELBOW)
    }

    pub fn wrist(self) -> bool {
        self.contains(Self::WRIST)
    }

    pub fn is_undefined(self) -> bool {
        self.contains(Self::UNDEFINED)
    }

    pub fn bits(self) -> u8 {
        self.0
    }
}

impl BitOr for RobotConfigurations {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitAnd for RobotConfigurations {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

impl fmt::Display for RobotConfigurations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_undefined() {
            return write!(f, "Undefined");
        }
        if *self == Self::NONE {
            return write!(f, "None");
        }
        let names: Vec<&str> = [(Self::SHOULDER, "Shoulder"), (Self::ELBOW, "Elbow"), (Self::WRIST, "Wrist")]
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, name)| *name)
            .collect();
        write!(f, "{}", names.join(", "))
    }
}
