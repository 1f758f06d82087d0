use thiserror::Error;

/// Failures that prevent any solution from being produced.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum KinematicsError {
    #[error("Expected {expected} targets, one per group, got {found}")]
    TargetCountMismatch { expected: usize, found: usize },

    #[error("Expected {expected} previous joint sets, one per group, got {found}")]
    PrevJointsCountMismatch { expected: usize, found: usize },

    #[error("Group {group} has a frame coupled to its own robot")]
    SelfCoupling { group: usize },

    #[error("Group {group} is coupled to unknown group {target} mechanism {mechanism:?}")]
    UnknownCoupling {
        group: usize,
        target: usize,
        mechanism: Option<usize>,
    },

    #[error("Frame couplings form a cycle through group {group}")]
    CyclicCoupling { group: usize },

    #[error("Unsupported geometry for {solver} solver: {reason}")]
    UnsupportedGeometry { solver: String, reason: String },

    #[error("Invalid mechanism '{name}': {reason}")]
    InvalidMechanism { name: String, reason: String },

    #[error("Invalid mechanical group {index}: {reason}")]
    InvalidGroup { index: usize, reason: String },

    #[error("Invalid kinematics configuration: {0}")]
    InvalidConfig(String),
}
