use cell_model::{Diagnostic, Manufacturer, Pose};

use super::{ArmKinematics, IkRequest, IkSolution};
use crate::chain::ArmChain;

/// Placeholder for arms without an inverse kinematics solution. Forward
/// kinematics still works through the DH chain.
#[derive(Debug, Clone)]
pub struct NotImplementedKinematics {
    chain: ArmChain,
    manufacturer: Manufacturer,
}

impl NotImplementedKinematics {
    pub fn new(chain: ArmChain, manufacturer: Manufacturer) -> Self {
        Self { chain, manufacturer }
    }
}

impl ArmKinematics for NotImplementedKinematics {
    fn chain(&self) -> &ArmChain {
        &self.chain
    }

    fn inverse(&self, _flange: &Pose, _request: &IkRequest) -> IkSolution {
        IkSolution {
            joints: vec![0.0; self.chain.len()],
            errors: vec![Diagnostic::NotImplemented(self.manufacturer)],
        }
    }

    fn has_branches(&self) -> bool {
        false
    }
}
