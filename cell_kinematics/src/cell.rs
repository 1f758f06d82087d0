//! Resolution of every mechanical group of a cell for one instant.

use cell_model::{KinematicSolution, KinematicsError, Result, RobotCell, Target};
use tracing::debug;

use crate::config::KinematicsConfig;
use crate::group::MechanicalGroupKinematics;

#[derive(Debug, Clone)]
pub struct RobotCellKinematics {
    groups: Vec<MechanicalGroupKinematics>,
}

impl RobotCellKinematics {
    pub fn new(cell: &RobotCell) -> Result<Self> {
        Self::with_config(cell, &KinematicsConfig::default())
    }

    pub fn with_config(cell: &RobotCell, config: &KinematicsConfig) -> Result<Self> {
        let groups = cell
            .groups
            .iter()
            .map(|group| MechanicalGroupKinematics::with_config(group, config))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { groups })
    }

    pub fn groups(&self) -> &[MechanicalGroupKinematics] {
        &self.groups
    }

    /// The group each target's frame is coupled to, if it is another group.
    /// Fails on couplings that can never be resolved.
    fn providers(&self, targets: &[Target]) -> Result<Vec<Option<usize>>> {
        targets
            .iter()
            .enumerate()
            .map(|(index, target)| {
                let Some(coupling) = target.frame.coupling else {
                    return Ok(None);
                };
                let unknown = KinematicsError::UnknownCoupling {
                    group: index,
                    target: coupling.group,
                    mechanism: coupling.mechanism,
                };
                let provider = self.groups.get(coupling.group).ok_or_else(|| unknown.clone())?;
                if let Some(mechanism) = coupling.mechanism {
                    if mechanism >= provider.group().externals().len() {
                        return Err(unknown);
                    }
                }
                if coupling.group != index {
                    Ok(Some(coupling.group))
                } else if coupling.mechanism.is_none() {
                    Err(KinematicsError::SelfCoupling { group: index })
                } else {
                    Ok(None)
                }
            })
            .collect()
    }

    /// Group indices in resolution order: providers before the groups
    /// coupled to them, otherwise lowest index first.
    fn order(providers: &[Option<usize>]) -> Result<Vec<usize>> {
        let mut done = vec![false; providers.len()];
        let mut order = Vec::with_capacity(providers.len());
        while order.len() < providers.len() {
            let next = (0..providers.len())
                .find(|&i| !done[i] && providers[i].map_or(true, |p| done[p]));
            match next {
                Some(i) => {
                    done[i] = true;
                    order.push(i);
                }
                None => {
                    let group = (0..providers.len()).find(|&i| !done[i]).unwrap_or(0);
                    return Err(KinematicsError::CyclicCoupling { group });
                }
            }
        }
        Ok(order)
    }

    /// Resolves one target per group, returning the solutions in group
    /// order.
    ///
    /// `prev`, when given, holds one previous joint set per group.
    pub fn resolve(&self, targets: &[Target], prev: Option<&[Vec<f64>]>) -> Result<Vec<KinematicSolution>> {
        if targets.len() != self.groups.len() {
            return Err(KinematicsError::TargetCountMismatch {
                expected: self.groups.len(),
                found: targets.len(),
            });
        }
        if let Some(prev) = prev {
            if prev.len() != self.groups.len() {
                return Err(KinematicsError::PrevJointsCountMismatch {
                    expected: self.groups.len(),
                    found: prev.len(),
                });
            }
        }

        let providers = self.providers(targets)?;
        let order = Self::order(&providers)?;
        debug!(?order, "cell resolution order");

        let mut solutions: Vec<Option<KinematicSolution>> = vec![None; self.groups.len()];
        for index in order {
            let coupled = match (providers[index], targets[index].frame.coupling) {
                (Some(provider), Some(coupling)) => solutions[provider]
                    .as_ref()
                    .and_then(|solution| self.groups[provider].coupling_plane(solution, coupling.mechanism)),
                _ => None,
            };
            let group_prev = prev.map(|p| p[index].as_slice());
            let solution = self.groups[index].resolve(&targets[index], group_prev, coupled.as_ref())?;
            solutions[index] = Some(solution);
        }

        solutions
            .into_iter()
            .enumerate()
            .map(|(index, solution)| solution.ok_or(KinematicsError::CyclicCoupling { group: index }))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_puts_providers_first() {
        let order = RobotCellKinematics::order(&[Some(2), None, Some(1)]).unwrap();
        assert_eq!(order, vec![1, 2, 0]);
        assert_eq!(RobotCellKinematics::order(&[None, None]).unwrap(), vec![0, 1]);
    }

    #[test]
    fn test_order_detects_cycles() {
        assert_eq!(
            RobotCellKinematics::order(&[Some(1), Some(0), None]),
            Err(KinematicsError::CyclicCoupling { group: 0 })
        );
    }
}
