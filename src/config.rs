use std::path::Path;

use config_file::FromConfigFile;
use serde::Deserialize;

use crate::error::{ConfigError, ObavoidError, Result};
use crate::grid::GridState;

/// Hold information read from the TOML configuration file.
///
/// Every table and field is optional; anything missing falls back to the
/// values in the `Default` implementations below.
#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct SimConfig {
    pub sensor: SensorConfig,
    pub robot: RobotConfig,
    pub frame: FrameConfig,
    pub learning: LearningConfig,
}

/// Sonar array parameters.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct SensorConfig {
    /// Number of sensors in the fan. Must be even: half look left, half right.
    pub count: u8,
    /// Angular spacing between neighbouring sensors, in degrees.
    pub fov_deg: f64,
    /// Farthest range any sensor reports.
    pub max_range: f64,
    /// Sensor outputs below this range raise an alert.
    pub alert_range: f64,
    /// Subtracted from every qualifying echo before it is reported.
    pub safety_distance: f64,
    /// Scales the weighted-sum index before it is rounded up.
    pub turn_scale: f64,
    /// Bound on the relative bearing, read as radians, for an obstacle to
    /// count as in front of a sensor or the goal line. 1.0 reproduces the
    /// observed behaviour, pi/2 is the geometrically corrected mode.
    pub angular_gate_rad: f64,
}

impl Default for SensorConfig {
    fn default() -> Self {
        SensorConfig {
            count: 16,
            fov_deg: 10.0,
            max_range: 100.0,
            alert_range: 50.0,
            safety_distance: 50.0,
            turn_scale: 2.0,
            angular_gate_rad: 1.0,
        }
    }
}

/// Robot body and obstacle geometry.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct RobotConfig {
    /// Distance travelled per tick.
    pub speed: f64,
    pub robot_radius: f64,
    pub obstacle_radius: f64,
    /// A position closer than this to an obstacle is a hit, closer than this
    /// to the goal counts as arrival.
    pub contact_radius: f64,
    /// Ticks after which an episode is reported as failed.
    pub step_budget: u32,
}

impl RobotConfig {
    /// Lateral separation below which an obstacle blocks a line of sight.
    pub fn clearance(&self) -> f64 {
        self.obstacle_radius + self.robot_radius
    }
}

impl Default for RobotConfig {
    fn default() -> Self {
        RobotConfig {
            speed: 10.0,
            robot_radius: 30.0,
            obstacle_radius: 20.0,
            contact_radius: 20.0,
            step_budget: 200,
        }
    }
}

/// Partition of the field into map cells, each subdivided into the learning
/// grid.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct FrameConfig {
    /// Side length of one square map cell.
    pub map_cell_size: f64,
    pub rows: u8,
    pub cols: u8,
}

impl Default for FrameConfig {
    fn default() -> Self {
        FrameConfig {
            map_cell_size: 50.0,
            rows: 4,
            cols: 4,
        }
    }
}

/// Monte Carlo control hyperparameters and the grid reward layout.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct LearningConfig {
    /// Discount rate
    pub gamma: f64,
    /// Exploration rate of the epsilon-soft policy
    pub epsilon: f64,
    pub episodes: u32,
    /// Episodes running longer than this are abandoned.
    pub max_episode_steps: u32,
    pub step_cost: f64,
    pub obstacle_penalty: f64,
    /// Initial (pessimistic) action value.
    pub q_init: f64,
    pub start_row: u8,
    pub start_col: u8,
    pub end_row: u8,
    pub end_col: u8,
    /// Seed for the learner's random number generator.
    pub seed: u64,
}

impl LearningConfig {
    pub fn start(&self) -> GridState {
        GridState { row: self.start_row, col: self.start_col }
    }

    pub fn end(&self) -> GridState {
        GridState { row: self.end_row, col: self.end_col }
    }
}

impl Default for LearningConfig {
    fn default() -> Self {
        LearningConfig {
            gamma: 0.6,
            epsilon: 0.4,
            episodes: 1000,
            max_episode_steps: 200,
            step_cost: -1.0,
            obstacle_penalty: -5.0,
            q_init: -10.0,
            start_row: 2,
            start_col: 0,
            end_row: 3,
            end_col: 3,
            seed: 3547,
        }
    }
}

impl SimConfig {
    /// Read and validate a configuration file.
    pub fn load(path: &Path) -> Result<SimConfig> {
        log::info!("Reading config file: {}", path.display());
        let config = SimConfig::from_config_file(path)
            .map_err(|e| ObavoidError::ConfigFile(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the simulation cannot run with.
    pub fn validate(&self) -> Result<()> {
        let frame = &self.frame;
        if frame.rows == 0 || frame.cols == 0 {
            return Err(ConfigError::EmptyGrid { rows: frame.rows, cols: frame.cols }.into());
        }
        if self.sensor.count == 0 || self.sensor.count % 2 != 0 {
            return Err(ConfigError::SensorCount(self.sensor.count).into());
        }
        for (name, value) in [
            ("learning.gamma", self.learning.gamma),
            ("learning.epsilon", self.learning.epsilon),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::OutOfUnitRange { name, value }.into());
            }
        }
        for (name, value) in [
            ("frame.map_cell_size", frame.map_cell_size),
            ("sensor.fov_deg", self.sensor.fov_deg),
            ("sensor.max_range", self.sensor.max_range),
            ("sensor.angular_gate_rad", self.sensor.angular_gate_rad),
            ("robot.speed", self.robot.speed),
            ("robot.contact_radius", self.robot.contact_radius),
        ] {
            if value <= 0.0 {
                return Err(ConfigError::NotPositive { name, value }.into());
            }
        }
        for cell in [self.learning.start(), self.learning.end()] {
            if cell.row >= frame.rows || cell.col >= frame.cols {
                return Err(ObavoidError::InvalidCell { cell, rows: frame.rows, cols: frame.cols });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn defaults_are_valid() {
        // Act
        let config = SimConfig::default();
        // Assert
        assert!(config.validate().is_ok());
        assert_eq!(config.sensor.count, 16);
        assert_eq!(config.robot.clearance(), 50.0);
        assert_eq!(config.learning.start(), GridState { row: 2, col: 0 });
        assert_eq!(config.learning.end(), GridState { row: 3, col: 3 });
    }

    #[test_case(0; "No sensors")]
    #[test_case(7; "Odd sensor count")]
    fn bad_sensor_count(count: u8) {
        // Arrange
        let mut config = SimConfig::default();
        config.sensor.count = count;
        // Act
        let result = config.validate();
        // Assert
        assert!(matches!(result, Err(ObavoidError::Config(ConfigError::SensorCount(c))) if c == count));
    }

    #[test_case(1.5, 0.4; "Gamma too large")]
    #[test_case(0.6, -0.1; "Negative epsilon")]
    fn out_of_unit_range(gamma: f64, epsilon: f64) {
        let mut config = SimConfig::default();
        config.learning.gamma = gamma;
        config.learning.epsilon = epsilon;
        assert!(matches!(
            config.validate(),
            Err(ObavoidError::Config(ConfigError::OutOfUnitRange { .. }))
        ));
    }

    #[test]
    fn end_state_outside_grid() {
        // Arrange
        let mut config = SimConfig::default();
        config.learning.end_row = 4;
        // Act
        let result = config.validate();
        // Assert
        assert!(matches!(
            result,
            Err(ObavoidError::InvalidCell { cell: GridState { row: 4, col: 3 }, .. })
        ));
    }

    #[test]
    fn empty_grid_rejected() {
        let mut config = SimConfig::default();
        config.frame.cols = 0;
        assert!(matches!(
            config.validate(),
            Err(ObavoidError::Config(ConfigError::EmptyGrid { rows: 4, cols: 0 }))
        ));
    }

    #[test]
    fn missing_file_is_reported() {
        let result = SimConfig::load(Path::new("does/not/exist.toml"));
        assert!(matches!(result, Err(ObavoidError::ConfigFile(_))));
    }
}
