//! Per-tick steering for the robot.
//!
//! Each tick the engine refreshes what the robot can see, runs the sonar
//! array, and on an alert asks the policy cache for a learned escape action
//! in the robot's local frame. The resulting recommendation competes with
//! the direct goal bearing:
//!
//! 1. An obstacle shares the robot's map cell: follow the recommendation if
//!    there is one, otherwise head for the goal.
//! 2. The straight line to the goal is clear: head for the goal.
//! 3. A turn was recommended: take it.
//! 4. Otherwise keep the current heading.
//!
//! The robot then moves one step and the tick reports whether it hit an
//! obstacle or reached the goal.

use std::fmt;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::cache::{PolicyCache, Signature};
use crate::config::SimConfig;
use crate::error::Result;
use crate::frame::FrameMapper;
use crate::geometry::{self, Point};
use crate::grid::Action;
use crate::monte_carlo::learn_policy;
use crate::robot::Robot;
use crate::sonar::SonarReading;

/// Branch of the steering rule taken on a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// An obstacle shares the robot's map cell.
    Obstructed,
    DirectToGoal,
    /// The path is blocked and the recommended turn was taken.
    Recommendation,
    Hold,
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            Decision::Obstructed => "obstructed",
            Decision::DirectToGoal => "direct",
            Decision::Recommendation => "recommendation",
            Decision::Hold => "hold",
        };
        write!(f, "{}", name)
    }
}

/// What happened on one tick.
#[derive(Debug, Clone, PartialEq)]
pub struct TickReport {
    pub decision: Decision,
    pub reading: SonarReading,
    /// Action the learned policy supplied, if one was consulted and had an
    /// action for the robot's grid cell.
    pub learned_action: Option<Action>,
    /// Heading the robot moved along.
    pub heading: f64,
    /// Position after the move.
    pub position: Point,
    pub hit: bool,
    pub reached: bool,
}

#[derive(Debug)]
pub struct NavigationEngine {
    config: SimConfig,
    robot: Robot,
    mapper: FrameMapper,
    cache: PolicyCache,
    rng: ChaCha8Rng,
}

impl NavigationEngine {
    pub fn new(config: SimConfig, start: Point, heading: f64, goal: Point) -> Result<NavigationEngine> {
        NavigationEngine::with_cache(config, start, heading, goal, PolicyCache::new())
    }

    /// Engine that starts from policies learned in earlier episodes.
    pub fn with_cache(
        config: SimConfig, start: Point, heading: f64, goal: Point, cache: PolicyCache,
    ) -> Result<NavigationEngine> {
        config.validate()?;
        let robot = Robot::new(start, heading, goal, &config);
        let mapper = FrameMapper::new(&config.frame);
        let rng = ChaCha8Rng::seed_from_u64(config.learning.seed);
        Ok(NavigationEngine { config, robot, mapper, cache, rng })
    }

    /// Hand the learned policies on to the next engine.
    pub fn into_cache(self) -> PolicyCache {
        self.cache
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn robot(&self) -> &Robot {
        &self.robot
    }

    pub fn cache(&self) -> &PolicyCache {
        &self.cache
    }

    pub fn mapper(&self) -> &FrameMapper {
        &self.mapper
    }

    pub fn position(&self) -> Point {
        self.robot.position()
    }

    pub fn heading(&self) -> f64 {
        self.robot.heading()
    }

    pub fn goal_vector(&self) -> [f64; 2] {
        self.robot.goal_vector()
    }

    pub fn sensor_vectors(&self) -> Vec<Point> {
        self.robot.sensor_vectors(self.config.robot.robot_radius)
    }

    pub fn obstacles_in_view(&self) -> &[Point] {
        self.robot.obstacles_in_view()
    }

    pub fn history(&self) -> &[Point] {
        self.robot.history()
    }

    pub fn set_position(&mut self, position: Point) {
        self.robot.set_position(position);
    }

    pub fn set_heading(&mut self, heading: f64) {
        self.robot.set_heading(heading);
    }

    pub fn clear_history(&mut self) {
        self.robot.clear_history();
    }

    /// Advance the robot by one tick.
    pub fn update(&mut self, obstacles: &[Point], goal: Point) -> Result<TickReport> {
        self.robot.refresh_view(obstacles, self.config.sensor.max_range);
        let goal_bearing = self.robot.aim_at(goal);
        let reading = self.robot.sense();
        let heading = self.robot.heading();

        let mut learned_action = None;
        let mut recommended = None;
        if reading.alert {
            learned_action = self.learned_action()?;
            let offset = match learned_action {
                Some(action) => action.heading_offset(),
                None => reading.offset_deg(self.config.sensor.fov_deg),
            };
            recommended = Some(geometry::wrap_heading(heading + offset));
        }

        let here = self.mapper.locate(self.robot.position()).map_cell;
        let obstructed = obstacles
            .iter()
            .any(|obs| self.mapper.locate(*obs).map_cell == here);
        let (decision, next_heading) = if obstructed {
            (Decision::Obstructed, recommended.unwrap_or(goal_bearing))
        } else if self.path_is_clear(goal) {
            (Decision::DirectToGoal, goal_bearing)
        } else if let Some(h) = recommended {
            (Decision::Recommendation, h)
        } else {
            (Decision::Hold, heading)
        };

        self.robot.set_heading(next_heading);
        let position = self.robot.advance();
        let contact = self.config.robot.contact_radius;
        let hit = obstacles.iter().any(|obs| geometry::distance(position, *obs) < contact);
        let reached = geometry::distance(position, goal) < contact;
        log::debug!(
            "tick {}: {} alert={} rec={} learned={:?} heading={:.1} pos={}",
            self.robot.steps(), decision, reading.alert, reading.recommended_index,
            learned_action, self.robot.heading(), position
        );
        Ok(TickReport {
            decision,
            reading,
            learned_action,
            heading: self.robot.heading(),
            position,
            hit,
            reached,
        })
    }

    /// True when no in-view obstacle nearer than the goal lies across the
    /// straight line to it.
    pub fn path_is_clear(&self, goal: Point) -> bool {
        let position = self.robot.position();
        let (goal_dist, goal_brg) = geometry::distance_and_bearing(position, goal);
        let gate = self.config.sensor.angular_gate_rad;
        let clearance = self.config.robot.clearance();
        for obs in self.robot.obstacles_in_view() {
            let (dist, brg) = geometry::distance_and_bearing(position, *obs);
            if dist >= goal_dist {
                continue;
            }
            let rel_brg = geometry::relative_bearing(goal_brg, brg);
            if !geometry::within_angular_gate(rel_brg, gate) {
                continue;
            }
            if geometry::lateral_offset(dist, rel_brg) < clearance {
                return false;
            }
        }
        true
    }

    /// Ask the learned policy what to do in the robot's grid cell.
    ///
    /// Uses the nearest obstacle that shares the robot's map cell and that at
    /// least one sonar saw on the last ping. Returns None when there is no
    /// such obstacle or the policy has no action for the robot's cell.
    pub fn learned_action(&mut self) -> Result<Option<Action>> {
        let position = self.robot.position();
        let here = self.mapper.locate(position);
        let nearest = self
            .robot
            .obstacles_in_view()
            .iter()
            .copied()
            .filter(|obs| self.mapper.locate(*obs).map_cell == here.map_cell)
            .filter(|obs| self.robot.sonars().sees(*obs))
            .min_by(|a, b| {
                geometry::distance(position, *a).total_cmp(&geometry::distance(position, *b))
            });
        let Some(obstacle) = nearest else {
            return Ok(None);
        };

        let rows = self.mapper.rows();
        let cols = self.mapper.cols();
        let obstacle_cell = self.mapper.locate(obstacle).grid_cell;
        let signature = Signature::new(self.config.learning.end(), obstacle_cell, rows, cols);
        let params = &self.config.learning;
        let rng = &mut self.rng;
        let policy = self.cache.get_or_compute(signature, |sig| {
            learn_policy(rows, cols, params, sig.end, &[sig.obstacle], rng)
                .map(|(policy, _)| policy)
        })?;
        Ok(policy.get(&here.grid_cell))
    }
}

/// How an episode ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EpisodeOutcome {
    pub steps: u32,
    pub hit: bool,
    pub reached: bool,
}

impl EpisodeOutcome {
    /// Reached the goal without hitting anything.
    pub fn success(&self) -> bool {
        self.reached && !self.hit
    }
}

/// Tick `engine` until it hits an obstacle, reaches the goal, or spends
/// `budget` ticks. Running out of budget counts as a failed episode.
pub fn run_episode(
    engine: &mut NavigationEngine, obstacles: &[Point], goal: Point, budget: u32,
) -> Result<EpisodeOutcome> {
    for step in 1..=budget {
        let report = engine.update(obstacles, goal)?;
        if report.hit || report.reached {
            log::info!(
                "Episode over after {} steps: hit={} reached={}",
                step, report.hit, report.reached
            );
            return Ok(EpisodeOutcome { steps: step, hit: report.hit, reached: report.reached });
        }
    }
    log::warn!("Step budget of {} exhausted at {}", budget, engine.position());
    Ok(EpisodeOutcome { steps: budget, hit: false, reached: false })
}
