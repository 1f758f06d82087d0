use serde::{Deserialize, Serialize};

/// Tuning of the iterative solvers.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct NumericalConfig {
    pub max_iterations: usize,
    pub line_search_steps: usize,
    /// The line search tries `step_scale * i` for `i` in `1..=line_search_steps`.
    pub step_scale: f64,
    /// Largest change of any joint in one Newton step, radians.
    pub max_step: f64,
    pub finite_difference_step: f64,
    /// Millimetres.
    pub position_tolerance: f64,
    /// Radians.
    pub angle_tolerance: f64,
    pub update_tolerance: f64,
    /// Millimetres per radian when ranking line search candidates.
    pub orientation_weight: f64,
    pub singular_retries: usize,
    pub null_space_gain: f64,
}

impl Default for NumericalConfig {
    fn default() -> Self {
        Self {
            max_iterations: 400,
            line_search_steps: 20,
            step_scale: 0.1,
            max_step: 0.5,
            finite_difference_step: 1e-6,
            position_tolerance: 1e-4,
            angle_tolerance: 1e-6,
            update_tolerance: 1e-12,
            orientation_weight: 100.0,
            singular_retries: 3,
            null_space_gain: 0.5,
        }
    }
}

impl NumericalConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.max_iterations == 0 {
            return Err("Maximum iterations must be greater than 0.".to_string());
        }
        if self.line_search_steps == 0 {
            return Err("Line search steps must be greater than 0.".to_string());
        }
        if self.step_scale <= 0.0 || self.max_step <= 0.0 {
            return Err("Step scale and maximum step must be positive.".to_string());
        }
        if self.finite_difference_step <= 0.0 {
            return Err("Finite difference step must be positive.".to_string());
        }
        if self.position_tolerance <= 0.0 || self.angle_tolerance <= 0.0 {
            return Err("Convergence tolerances must be positive.".to_string());
        }
        if !(0.0..=1.0).contains(&self.null_space_gain) {
            return Err("Null space gain must be within [0, 1].".to_string());
        }
        Ok(())
    }
}

/// Solver settings shared by every mechanism of a cell.
///
/// ```rust,ignore
/// let config = KinematicsConfig::from_json(r#"{ "singularity_threshold": 1e-3 }"#)?;
/// let robot = RobotKinematics::with_config(&mechanism, config)?;
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct KinematicsConfig {
    /// Largest joint difference, radians, for which a joint target is still
    /// classified as one of the closed-form branches.
    pub configuration_tolerance: f64,
    /// `|sin|` below which wrist and overhead singularities are reported.
    pub singularity_threshold: f64,
    pub numerical: NumericalConfig,
}

impl Default for KinematicsConfig {
    fn default() -> Self {
        Self {
            configuration_tolerance: 1e-3,
            singularity_threshold: 1e-4,
            numerical: NumericalConfig::default(),
        }
    }
}

impl KinematicsConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.configuration_tolerance <= 0.0 {
            return Err("Configuration tolerance must be positive.".to_string());
        }
        if self.singularity_threshold < 0.0 {
            return Err("Singularity threshold cannot be negative.".to_string());
        }
        self.numerical.validate()
    }

    /// Parses and validates a configuration. Missing fields take their
    /// defaults.
    pub fn from_json(json: &str) -> Result<Self, String> {
        let config: Self = serde_json::from_str(json).map_err(|e| format!("Invalid configuration: {}", e))?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = KinematicsConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.numerical.max_iterations, 400);
        assert_eq!(config.numerical.line_search_steps, 20);
        assert!((config.numerical.step_scale - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_from_json_fills_defaults() {
        let config = KinematicsConfig::from_json(r#"{ "numerical": { "max_iterations": 50 } }"#).unwrap();
        assert_eq!(config.numerical.max_iterations, 50);
        assert_eq!(config.numerical.line_search_steps, 20);
        assert_eq!(config.singularity_threshold, 1e-4);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let err = KinematicsConfig::from_json(r#"{ "numerical": { "max_iterations": 0 } }"#).unwrap_err();
        assert!(err.contains("Maximum iterations"));

        let mut config = KinematicsConfig::default();
        config.numerical.null_space_gain = 2.0;
        assert!(config.validate().is_err());

        assert!(KinematicsConfig::from_json("not json").is_err());
    }
}
