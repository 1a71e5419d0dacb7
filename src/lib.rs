//! Local obstacle avoidance for a simulated point robot.
//!
//! A sonar fan watches the space ahead of the robot. When something comes
//! close, the robot's surroundings are mapped onto a small grid and a Monte
//! Carlo control learner supplies an escape action for that grid layout.
//! Learned policies are cached by layout so each one is learned only once.

pub mod cache;
pub mod config;
pub mod error;
pub mod frame;
pub mod geometry;
pub mod grid;
pub mod monte_carlo;
pub mod navigation;
pub mod policy;
pub mod robot;
pub mod scenario;
pub mod sonar;

pub use cache::{PolicyCache, Signature};
pub use config::SimConfig;
pub use error::{ObavoidError, Result};
pub use geometry::Point;
pub use grid::{Action, GridState};
pub use navigation::{run_episode, Decision, EpisodeOutcome, NavigationEngine, TickReport};
pub use policy::Policy;
