//! Error types for configuration, scenario loading and grid setup.

use thiserror::Error;

use crate::grid::GridState;

/// A configuration value that cannot drive a simulation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("learning grid must have at least one row and one column, got {rows}x{cols}")]
    EmptyGrid { rows: u8, cols: u8 },

    #[error("{name} must be within [0, 1], got {value}")]
    OutOfUnitRange { name: &'static str, value: f64 },

    #[error("{name} must be positive, got {value}")]
    NotPositive { name: &'static str, value: f64 },

    #[error("sensor count must be a non-zero even number, got {0}")]
    SensorCount(u8),
}

/// Errors surfaced by the library.
#[derive(Debug, Error)]
pub enum ObavoidError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("unable to read configuration file: {0}")]
    ConfigFile(String),

    #[error("cell {cell} lies outside the {rows}x{cols} learning grid")]
    InvalidCell { cell: GridState, rows: u8, cols: u8 },

    #[error("unable to read scenario: {0}")]
    Scenario(#[from] csv::Error),
}

pub type Result<T> = std::result::Result<T, ObavoidError>;
