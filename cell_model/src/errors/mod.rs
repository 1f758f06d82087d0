mod diagnostic;
mod kinematics_error;

pub use diagnostic::Diagnostic;
pub use kinematics_error::KinematicsError;

pub type Result<T> = std::result::Result<T, KinematicsError>;
