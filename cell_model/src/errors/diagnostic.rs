use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::mechanism::Manufacturer;

/// Soft problem attached to a solution. Resolution never stops on one of
/// these; the text is stored in the solution's error list.
#[derive(Error, Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum Diagnostic {
    /// `axis` is the 1-based joint number within the mechanical group.
    #[error("Axis {axis} is outside the permitted range.")]
    OutOfRange { axis: usize },

    #[error("Target out of reach.")]
    OutOfReach,

    #[error("Near wrist singularity.")]
    NearWristSingularity,

    #[error("Near overhead singularity.")]
    NearOverheadSingularity,

    #[error("Near singularity.")]
    NearSingularity,

    #[error("Previous joints length mismatch, ignoring them.")]
    PrevJointsMismatch,

    #[error("Target joint count {found} does not match the {expected} axes of the robot.")]
    JointCountMismatch { expected: usize, found: usize },

    /// `axis` is the 1-based joint number within the mechanical group.
    #[error("External axis {axis} not configured on this target.")]
    MissingExternal { axis: usize },

    #[error("Inverse kinematics not implemented for {0} robots.")]
    NotImplemented(Manufacturer),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        assert_eq!(
            Diagnostic::OutOfRange { axis: 3 }.to_string(),
            "Axis 3 is outside the permitted range."
        );
        assert_eq!(Diagnostic::OutOfReach.to_string(), "Target out of reach.");
        assert_eq!(
            Diagnostic::NotImplemented(Manufacturer::Doosan).to_string(),
            "Inverse kinematics not implemented for Doosan robots."
        );
        assert_eq!(
            Diagnostic::MissingExternal { axis: 8 }.to_string(),
            "External axis 8 not configured on this target."
        );
    }
}
