use crate::config::SimConfig;
use crate::geometry::{self, Point};
use crate::sonar::{SonarArray, SonarReading};

/// Point robot with a fixed speed and a sonar fan.
#[derive(Debug, Clone)]
pub struct Robot {
    position: Point,
    heading: f64,
    speed: f64,
    goal_bearing: f64,
    history: Vec<Point>,
    obstacles_in_view: Vec<Point>,
    steps: u32,
    sonars: SonarArray,
}

impl Robot {
    pub fn new(start: Point, heading: f64, goal: Point, config: &SimConfig) -> Robot {
        let heading = geometry::wrap_heading(heading);
        Robot {
            position: start,
            heading,
            speed: config.robot.speed,
            goal_bearing: geometry::bearing(start, goal),
            history: vec![start],
            obstacles_in_view: Vec::new(),
            steps: 0,
            sonars: SonarArray::new(&config.sensor, config.robot.clearance(), heading),
        }
    }

    pub fn position(&self) -> Point {
        self.position
    }

    pub fn heading(&self) -> f64 {
        self.heading
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    pub fn goal_bearing(&self) -> f64 {
        self.goal_bearing
    }

    /// Unit (cos, sin) components of the goal bearing.
    pub fn goal_vector(&self) -> [f64; 2] {
        geometry::angle_to_vector(self.goal_bearing)
    }

    /// Every position the robot has occupied, oldest first.
    pub fn history(&self) -> &[Point] {
        &self.history
    }

    pub fn obstacles_in_view(&self) -> &[Point] {
        &self.obstacles_in_view
    }

    /// Ticks advanced so far.
    pub fn steps(&self) -> u32 {
        self.steps
    }

    pub fn sonars(&self) -> &SonarArray {
        &self.sonars
    }

    pub fn set_position(&mut self, position: Point) {
        self.position = position;
    }

    pub fn set_heading(&mut self, heading: f64) {
        self.heading = geometry::wrap_heading(heading);
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    /// Keep only the obstacles closer than `max_range`.
    pub fn refresh_view(&mut self, obstacles: &[Point], max_range: f64) {
        let position = self.position;
        self.obstacles_in_view = obstacles
            .iter()
            .copied()
            .filter(|obs| geometry::distance(position, *obs) < max_range)
            .collect();
    }

    pub fn aim_at(&mut self, goal: Point) -> f64 {
        self.goal_bearing = geometry::bearing(self.position, goal);
        self.goal_bearing
    }

    /// Ping the in-view obstacles along the current heading.
    pub fn sense(&mut self) -> SonarReading {
        self.sonars.update(self.position, self.heading, &self.obstacles_in_view)
    }

    /// Move one tick along the current heading.
    pub fn advance(&mut self) -> Point {
        self.position = geometry::project(self.position, self.speed, self.heading);
        self.history.push(self.position);
        self.steps += 1;
        self.position
    }

    /// End points of the sensor outputs, for drawing.
    pub fn sensor_vectors(&self, robot_radius: f64) -> Vec<Point> {
        self.sonars.output_vectors(robot_radius)
    }
}
