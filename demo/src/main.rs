use std::f64::consts::PI;

use cell_kinematics::presets::{self, RobotModel};
use cell_kinematics::{KinematicsConfig, RobotCellKinematics};
use cell_model::{pose, Frame, KinematicsError, MechanicalGroup, RobotCell, Target, Tool};
use tracing::{error, info, warn};

const STEPS: usize = 8;

/// Group 0 is a spherical wrist arm on a track. Group 1 is a UR5 across
/// the table and owns the two axis positioner group 0 welds on.
fn build_cell() -> Result<RobotCell, KinematicsError> {
    let mut welder = presets::robot(RobotModel::GenericSpherical);
    welder.base = pose::translation(0.0, 0.0, 200.0);
    let welding = MechanicalGroup::new(0, "welding", welder, vec![presets::track(4000.0)])?;

    let mut handler = presets::robot(RobotModel::Ur5);
    handler.base = pose::translation(900.0, 0.0, 0.0) * pose::rot_z(PI);
    let handling = MechanicalGroup::new(1, "handling", handler, vec![presets::positioner(700.0)])?;

    RobotCell::new(vec![welding, handling])
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = match std::env::var("CELL_KINEMATICS_CONFIG") {
        Ok(path) => match std::fs::read_to_string(&path)
            .map_err(|e| e.to_string())
            .and_then(|json| KinematicsConfig::from_json(&json))
        {
            Ok(config) => {
                info!("Loaded kinematics configuration from {}", path);
                config
            }
            Err(e) => {
                error!("Failed to load {}: {}", path, e);
                return;
            }
        },
        Err(_) => KinematicsConfig::default(),
    };

    let kinematics = match build_cell().and_then(|cell| RobotCellKinematics::with_config(&cell, &config)) {
        Ok(kinematics) => kinematics,
        Err(e) => {
            error!("Invalid cell: {}", e);
            return;
        }
    };

    // seam on a fixture bolted to the table of group 1's positioner
    let fixture = Frame::new("fixture", pose::translation(300.0, 200.0, 700.0)).coupled_to(1, Some(0));
    let torch = Tool::new("torch", pose::translation(0.0, 0.0, 50.0));
    let handler_joints = vec![0.3, -1.2, 1.5, -0.8, 1.1, 0.4];

    let mut prev: Option<Vec<Vec<f64>>> = None;
    for step in 0..STEPS {
        let turn = 0.05 * step as f64;
        let targets = [
            Target::cartesian(pose::translation(0.0, 20.0 * step as f64, -50.0))
                .with_frame(fixture.clone())
                .with_tool(torch.clone())
                .with_external(vec![0.0]),
            Target::joint(handler_joints.clone()).with_external(vec![0.0, turn]),
        ];

        let solutions = match kinematics.resolve(&targets, prev.as_deref()) {
            Ok(solutions) => solutions,
            Err(e) => {
                error!("Step {} failed: {}", step, e);
                return;
            }
        };

        for (group, solution) in solutions.iter().enumerate() {
            info!(
                step,
                group,
                configuration = %solution.configuration(),
                joints = ?solution.joints(),
                "resolved"
            );
            for message in solution.errors() {
                warn!(step, group, "{}", message);
            }
        }
        if step + 1 == STEPS {
            match serde_json::to_string_pretty(&solutions) {
                Ok(json) => println!("{}", json),
                Err(e) => error!("Failed to serialize solutions: {}", e),
            }
        }
        prev = Some(solutions.iter().map(|s| s.joints().to_vec()).collect());
    }
}
