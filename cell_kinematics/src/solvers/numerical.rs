use cell_model::{Diagnostic, Pose};
use tracing::debug;

use super::jacobian::{newton, NewtonOutcome};
use super::{ArmKinematics, IkRequest, IkSolution};
use crate::angles;
use crate::chain::ArmChain;
use crate::config::NumericalConfig;

/// Iterative solver for any serial chain.
///
/// On arms with a redundant axis that axis is held at the requested value
/// and the remaining axes are solved.
#[derive(Debug, Clone)]
pub struct NumericalKinematics {
    chain: ArmChain,
    redundant: Option<usize>,
    config: NumericalConfig,
}

impl NumericalKinematics {
    pub fn new(chain: ArmChain, redundant: Option<usize>, config: NumericalConfig) -> Self {
        Self {
            chain,
            redundant,
            config,
        }
    }

    pub fn redundant_axis(&self) -> Option<usize> {
        self.redundant
    }

    /// Seed for the iteration: the request seed, otherwise each axis' range
    /// midpoint.
    pub(crate) fn seed(chain: &ArmChain, request: &IkRequest) -> Vec<f64> {
        match request.seed {
            Some(seed) if seed.len() == chain.len() => seed.to_vec(),
            _ => chain.joints().iter().map(|j| j.range.mid()).collect(),
        }
    }

    pub(crate) fn into_solution(chain: &ArmChain, outcome: NewtonOutcome) -> IkSolution {
        let mut joints = outcome.joints;
        for (value, joint) in joints.iter_mut().zip(chain.joints()) {
            if joint.is_revolute() {
                *value = angles::normalize(*value);
            }
        }
        let mut errors = Vec::new();
        if outcome.singular {
            errors.push(Diagnostic::NearSingularity);
        }
        if !outcome.converged {
            errors.push(Diagnostic::OutOfReach);
        }
        IkSolution { joints, errors }
    }
}

impl ArmKinematics for NumericalKinematics {
    fn chain(&self) -> &ArmChain {
        &self.chain
    }

    fn inverse(&self, flange: &Pose, request: &IkRequest) -> IkSolution {
        let mut seed = Self::seed(&self.chain, request);
        if let (Some(axis), Some(value)) = (self.redundant, request.redundancy) {
            seed[axis] = value;
        }
        let free: Vec<usize> = (0..self.chain.len()).filter(|&i| Some(i) != self.redundant).collect();

        let outcome = newton(&self.chain, flange, &seed, &free, None, &self.config);
        debug!(
            iterations = outcome.iterations,
            converged = outcome.converged,
            singular = outcome.singular,
            "numerical inverse kinematics"
        );
        Self::into_solution(&self.chain, outcome)
    }

    fn has_branches(&self) -> bool {
        false
    }
}
