use crate::config::SensorConfig;
use crate::geometry::{self, Point};

/// A simulated range sensor fixed to the robot at `offset` degrees from its
/// heading.
#[derive(Debug, Clone)]
pub struct Sonar {
    /// Signed position in the fan; positive sensors look clockwise.
    pub index: i32,
    /// Angle from the robot's heading to this sensor's line of sight.
    pub offset: f64,
    pub max_range: f64,
    /// True bearing of the line of sight.
    pub look_bearing: f64,
    /// Range reported by the last update.
    pub output: f64,
    /// Whether the last update found a qualifying obstacle.
    pub has_valid_echo: bool,
    position: Point,
}

impl Sonar {
    pub fn new(index: i32, fov_deg: f64, max_range: f64, heading: f64) -> Sonar {
        let offset = index as f64 * fov_deg;
        Sonar {
            index,
            offset,
            max_range,
            look_bearing: geometry::wrap_heading(heading + offset),
            output: max_range,
            has_valid_echo: false,
            position: Point::new(0.0, 0.0),
        }
    }

    /// Distance to `obstacle` if this sensor can see it.
    ///
    /// An obstacle is seen when it is inside `max_range`, its bearing off the
    /// line of sight passes the angular gate, and it sits closer to the line
    /// of sight than `clearance`.
    pub fn can_observe(&self, obstacle: Point, clearance: f64, gate_rad: f64) -> Option<f64> {
        let (dist, brg) = geometry::distance_and_bearing(self.position, obstacle);
        if dist >= self.max_range {
            return None;
        }
        let rel_brg = geometry::relative_bearing(self.look_bearing, brg);
        log::trace!("sonar {} dist={:.2} rel_brg={:.2}", self.index, dist, rel_brg);
        if !geometry::within_angular_gate(rel_brg, gate_rad) {
            return None;
        }
        if geometry::lateral_offset(dist, rel_brg) < clearance {
            Some(dist)
        } else {
            None
        }
    }

    /// Move the sensor with the robot and ping `obstacles`.
    pub fn update(&mut self, position: Point, heading: f64, obstacles: &[Point], config: &SensorConfig, clearance: f64) {
        self.position = position;
        self.look_bearing = geometry::wrap_heading(heading + self.offset);
        let nearest = obstacles
            .iter()
            .filter_map(|obs| self.can_observe(*obs, clearance, config.angular_gate_rad))
            .fold(None, |acc: Option<f64>, d| Some(acc.map_or(d, |a| a.min(d))));
        self.has_valid_echo = nearest.is_some();
        self.output = match nearest {
            Some(d) => d - config.safety_distance,
            None => self.max_range,
        };
    }

    /// End point of the reported range, for drawing.
    pub fn output_vector(&self, robot_radius: f64) -> Point {
        geometry::project(self.position, self.output + robot_radius, self.look_bearing)
    }
}

/// Outcome of the weighted-sum method.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SonarReading {
    /// Some sensor reported a range under the alert range.
    pub alert: bool,
    /// Sensor index the robot should turn towards; 0 means straight on.
    pub recommended_index: i32,
}

impl SonarReading {
    /// Heading change, in degrees, that turns onto the recommended sensor.
    pub fn offset_deg(&self, fov_deg: f64) -> f64 {
        self.recommended_index as f64 * fov_deg
    }
}

/// Fan of sonars spread symmetrically around the robot's heading.
#[derive(Debug, Clone)]
pub struct SonarArray {
    pub sonars: Vec<Sonar>,
    config: SensorConfig,
    clearance: f64,
}

impl SonarArray {
    /// `clearance` is the combined obstacle and robot radius.
    pub fn new(config: &SensorConfig, clearance: f64, heading: f64) -> SonarArray {
        let sonars = SonarArray::sensor_indices(config.count)
            .into_iter()
            .map(|i| Sonar::new(i, config.fov_deg, config.max_range, heading))
            .collect();
        SonarArray { sonars, config: config.clone(), clearance }
    }

    /// Indices n/2 down to 1, then -1 down to -n/2.
    pub fn sensor_indices(count: u8) -> Vec<i32> {
        let half = (count / 2) as i32;
        (1..=half).rev().chain((-half..=-1).rev()).collect()
    }

    pub fn config(&self) -> &SensorConfig {
        &self.config
    }

    /// Ping every sensor from `position`, looking around `heading`.
    pub fn update(&mut self, position: Point, heading: f64, obstacles: &[Point]) -> SonarReading {
        for sonar in self.sonars.iter_mut() {
            sonar.update(position, heading, obstacles, &self.config, self.clearance);
        }
        let outputs: Vec<(i32, f64)> = self.sonars.iter().map(|s| (s.index, s.output)).collect();
        weighted_sum(&outputs, &self.config)
    }

    /// True when at least one sensor can see `obstacle` from where the
    /// array was last updated.
    pub fn sees(&self, obstacle: Point) -> bool {
        self.sonars.iter().any(|s| {
            s.can_observe(obstacle, self.clearance, self.config.angular_gate_rad).is_some()
        })
    }

    /// Current outputs as (index, range) pairs.
    pub fn outputs(&self) -> Vec<(i32, f64)> {
        self.sonars.iter().map(|s| (s.index, s.output)).collect()
    }

    pub fn output_vectors(&self, robot_radius: f64) -> Vec<Point> {
        self.sonars.iter().map(|s| s.output_vector(robot_radius)).collect()
    }
}

/// Weighted-sum method over (sensor index, range) pairs.
///
/// When any range is under the alert range every range is truncated to an
/// integer, weighted by its sensor index, and the weighted mean index times
/// the turn scale is rounded up. The result is clamped to the outermost
/// sensor on that side. Without an alert the recommendation is 0.
pub fn weighted_sum(outputs: &[(i32, f64)], config: &SensorConfig) -> SonarReading {
    let alert = outputs.iter().any(|(_, range)| *range < config.alert_range);
    if !alert {
        return SonarReading { alert: false, recommended_index: 0 };
    }
    let mut sum_d: i64 = 0;
    let mut sum_wt: i64 = 0;
    for (index, range) in outputs {
        let d = range.trunc() as i64;
        sum_d += d;
        sum_wt += *index as i64 * d;
    }
    if sum_d == 0 {
        return SonarReading { alert, recommended_index: 0 };
    }
    let half = (config.count / 2) as i32;
    let raw = (config.turn_scale * sum_wt as f64 / sum_d as f64).ceil() as i32;
    let recommended_index = raw.clamp(-half, half);
    log::debug!("weighted sum: sum_d={} sum_wt={} rec_index={}", sum_d, sum_wt, recommended_index);
    SonarReading { alert, recommended_index }
}
