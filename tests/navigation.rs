use approx::assert_abs_diff_eq;

use obavoid::geometry::wrap_heading;
use obavoid::{run_episode, Decision, NavigationEngine, Point, SimConfig};

const START: Point = Point { x: 10.0, y: 10.0 };
const GOAL: Point = Point { x: 500.0, y: 500.0 };

#[test]
fn open_field_heads_straight_for_goal() {
    // Arrange
    let mut engine = NavigationEngine::new(SimConfig::default(), START, 1.0, GOAL).unwrap();
    let mut reached_at = None;
    // Act
    for step in 1..=200 {
        let report = engine.update(&[], GOAL).unwrap();
        // Assert
        assert_eq!(report.decision, Decision::DirectToGoal);
        assert!(!report.hit);
        if report.reached {
            reached_at = Some(step);
            break;
        }
    }
    assert_eq!(reached_at, Some(68));
    assert_eq!(engine.history().len(), 69);
}

#[test]
fn obstacle_on_goal_line_is_never_hit() {
    // Arrange
    let obstacles = [Point::new(200.0, 200.0)];
    let mut engine = NavigationEngine::new(SimConfig::default(), START, 1.0, GOAL).unwrap();
    let mut first_sighting = None;
    let mut reached = false;
    // Act
    for _ in 0..200 {
        let report = engine.update(&obstacles, GOAL).unwrap();
        if first_sighting.is_none() && !engine.obstacles_in_view().is_empty() {
            first_sighting = Some((report.clone(), engine.robot().goal_bearing()));
        }
        // Assert
        assert!(!report.hit, "hit the obstacle at {}", report.position);
        if report.reached {
            reached = true;
            break;
        }
    }
    // The obstacle comes into view straight ahead from the neighbouring map
    // cell, so the echoes cancel and no learned action applies: the heading
    // is held on that tick.
    let (first, goal_bearing) = first_sighting.expect("obstacle never came into view");
    assert!(first.reading.alert);
    assert_eq!(first.reading.recommended_index, 0);
    assert_eq!(first.decision, Decision::Recommendation);
    assert_eq!(first.learned_action, None);
    assert_abs_diff_eq!(first.heading, goal_bearing, epsilon = 1e-6);
    assert!(!reached);
    assert_eq!(engine.history().len(), 201);
}

#[test]
fn obstacle_in_start_cell_turns_on_first_tick() {
    // Arrange
    let obstacles = [Point::new(40.0, 40.0)];
    let mut engine = NavigationEngine::new(SimConfig::default(), START, 1.0, GOAL).unwrap();
    // Act
    let report = engine.update(&obstacles, GOAL).unwrap();
    // Assert
    assert!(report.reading.alert);
    assert_eq!(report.decision, Decision::Obstructed);
    let action = report.learned_action.expect("learned action for the start cell");
    let expected = wrap_heading(1.0 + action.heading_offset());
    assert_abs_diff_eq!(report.heading, expected, epsilon = 1e-9);
    assert!((report.heading - engine.robot().goal_bearing()).abs() > 0.5);
    assert!(!report.hit);
}

#[test]
fn learned_policies_carry_over_between_engines() {
    // Arrange: robot and obstacle share map cell (3, 3).
    let obstacles = [Point::new(185.0, 185.0)];
    let start = Point::new(151.4, 151.4);
    let mut first = NavigationEngine::new(SimConfig::default(), start, 135.0, GOAL).unwrap();
    let report = first.update(&obstacles, GOAL).unwrap();
    assert!(report.reading.alert);
    assert!(report.learned_action.is_some());
    assert_eq!(first.cache().learning_runs(), 1);
    // Act
    let cache = first.into_cache();
    let mut second =
        NavigationEngine::with_cache(SimConfig::default(), start, 135.0, GOAL, cache).unwrap();
    let repeat = second.update(&obstacles, GOAL).unwrap();
    // Assert
    assert_eq!(repeat.learned_action, report.learned_action);
    assert_eq!(second.cache().learning_runs(), 1);
    assert_eq!(second.cache().len(), 1);
}

#[test]
fn episode_budget_is_respected() {
    let mut engine = NavigationEngine::new(SimConfig::default(), START, 1.0, GOAL).unwrap();
    let outcome = run_episode(&mut engine, &[Point::new(200.0, 200.0)], GOAL, 200).unwrap();
    assert!(!outcome.hit);
    assert!(outcome.steps <= 200);
    assert_eq!(engine.history().len() as u32, outcome.steps + 1);
}
