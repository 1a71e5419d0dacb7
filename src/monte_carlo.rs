//! First-visit, on-policy Monte Carlo control with an epsilon-soft policy.
//!
//! Episodes always start from the configured start cell. Actions are drawn
//! from the soft policy, Q(s, a) is the mean of every return observed for
//! the pair, and after each update the soft policy is pulled towards the
//! greedy action of the updated state. Once the episode budget is spent the
//! greedy action of every non-terminal state becomes the learned policy.

use std::collections::{HashMap, HashSet};

use rand::Rng;
use statrs::statistics::Statistics;

use crate::config::LearningConfig;
use crate::error::Result;
use crate::grid::{Action, Grid, GridState};
use crate::policy::{ActionValues, Policy, SoftPolicy};

/// One entry of an episode trajectory.
///
/// `reward` was paid for arriving in `state`; `action` is what was taken
/// from it, None for the terminal entry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Step {
    pub state: GridState,
    pub action: Option<Action>,
    pub reward: f64,
}

/// A state-action pair and the discounted return that followed it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Visit {
    pub state: GridState,
    pub action: Action,
    pub ret: f64,
}

/// Diagnostics collected while learning.
#[derive(Debug, Clone)]
pub struct LearningReport {
    /// Largest |change in Q| of each completed episode.
    pub deltas: Vec<f64>,
    /// Episodes dropped for running past the step cap.
    pub abandoned: u32,
    /// V(s) = max_a Q(s, a); zero for terminal states.
    pub values: ndarray::Array2<f64>,
}

impl LearningReport {
    /// Print the state values, one grid row per line.
    pub fn render_values(&self) -> String {
        let mut out = String::new();
        for row in self.values.rows() {
            out.push_str(&"-".repeat(7 * row.len()));
            out.push('\n');
            for v in row.iter() {
                out.push_str(&format!("{:>6.2}|", v));
            }
            out.push('\n');
        }
        out
    }
}

/// Discounted return of every state-action pair in `trajectory`, in the
/// order the pairs were visited.
///
/// The terminal entry only contributes its reward.
pub fn discounted_returns(trajectory: &[Step], gamma: f64) -> Vec<Visit> {
    let mut g = 0.0;
    let mut visits = Vec::with_capacity(trajectory.len());
    for (i, step) in trajectory.iter().rev().enumerate() {
        if i > 0 {
            if let Some(action) = step.action {
                visits.push(Visit { state: step.state, action, ret: g });
            }
        }
        g = step.reward + gamma * g;
    }
    visits.reverse();
    visits
}

pub struct MonteCarloControl {
    params: LearningConfig,
    grid: Grid,
    q: ActionValues,
    pi: SoftPolicy,
    returns: HashMap<(GridState, Action), Vec<f64>>,
}

impl MonteCarloControl {
    pub fn new(grid: Grid, params: LearningConfig) -> MonteCarloControl {
        let q = ActionValues::new(grid.rows, grid.cols, params.q_init);
        let pi = SoftPolicy::new(grid.rows, grid.cols);
        MonteCarloControl { params, grid, q, pi, returns: HashMap::new() }
    }

    pub fn action_values(&self) -> &ActionValues {
        &self.q
    }

    pub fn soft_policy(&self) -> &SoftPolicy {
        &self.pi
    }

    /// Play one episode from the start cell with the soft policy.
    ///
    /// Returns None if the episode ran past the step cap.
    pub fn play_episode<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<Vec<Step>> {
        let mut s = self.params.start();
        self.grid.set_state(s);
        let mut a = self.pi.choose(&s, rng.gen());
        let mut trajectory = vec![Step { state: s, action: Some(a), reward: 0.0 }];
        let mut steps = 0;
        loop {
            steps += 1;
            let r = self.grid.make_move(a);
            s = self.grid.current_state();
            if self.grid.game_over() {
                trajectory.push(Step { state: s, action: None, reward: r });
                return Some(trajectory);
            }
            a = self.pi.choose(&s, rng.gen());
            trajectory.push(Step { state: s, action: Some(a), reward: r });
            if steps > self.params.max_episode_steps {
                log::warn!(
                    "Monte Carlo episode took more than {} steps. It will be skipped.",
                    self.params.max_episode_steps
                );
                return None;
            }
        }
    }

    /// First-visit update of Q and pi from one episode's returns.
    ///
    /// Returns the largest absolute change made to any Q value.
    pub fn update(&mut self, visits: &[Visit]) -> f64 {
        let mut seen: HashSet<(GridState, Action)> = HashSet::new();
        let mut biggest_change: f64 = 0.0;
        for v in visits {
            if !seen.insert((v.state, v.action)) {
                continue;
            }
            let old_q = self.q.get(&v.state, v.action);
            let logged = self.returns.entry((v.state, v.action)).or_default();
            logged.push(v.ret);
            let new_q = logged.iter().mean();
            self.q.set(&v.state, v.action, new_q);
            biggest_change = biggest_change.max((old_q - new_q).abs());

            let (greedy, _) = self.q.greedy(&v.state);
            self.pi.make_soft_greedy(&v.state, greedy, self.params.epsilon);
        }
        biggest_change
    }

    /// Greedy action for every non-terminal state.
    pub fn greedy_policy(&self) -> Policy {
        let mut policy = Policy::new(self.grid.rows, self.grid.cols);
        for s in self.grid.non_terminal_states() {
            policy.set(s, self.q.greedy(s).0);
        }
        policy
    }

    /// Run the whole episode budget and extract the deterministic policy.
    pub fn run<R: Rng + ?Sized>(mut self, rng: &mut R) -> (Policy, LearningReport) {
        let mut deltas = Vec::with_capacity(self.params.episodes as usize);
        let mut abandoned = 0;
        if self.grid.is_terminal(&self.params.start()) {
            log::warn!(
                "Start cell {} is terminal, nothing to learn.",
                self.params.start()
            );
        } else {
            for _ in 0..self.params.episodes {
                match self.play_episode(rng) {
                    Some(trajectory) => {
                        let visits = discounted_returns(&trajectory, self.params.gamma);
                        deltas.push(self.update(&visits));
                    }
                    None => abandoned += 1,
                }
            }
        }

        let policy = self.greedy_policy();
        let mut values = ndarray::Array2::<f64>::zeros(
            (self.grid.rows as usize, self.grid.cols as usize));
        for s in self.grid.non_terminal_states() {
            values[[s.row as usize, s.col as usize]] = self.q.greedy(s).1;
        }
        log::debug!(
            "Learned policy over {} episodes ({} abandoned), final largest change {:.4}",
            deltas.len(),
            abandoned,
            deltas.last().copied().unwrap_or(0.0)
        );
        (policy, LearningReport { deltas, abandoned, values })
    }
}

/// Learn a policy for a grid whose terminal cell is `end` and whose
/// `obstacles` cells carry the obstacle penalty.
pub fn learn_policy<R: Rng + ?Sized>(
    rows: u8, cols: u8, params: &LearningConfig, end: GridState,
    obstacles: &[GridState], rng: &mut R,
) -> Result<(Policy, LearningReport)> {
    let grid = Grid::configure(
        rows, cols, params.start(), end, obstacles,
        params.step_cost, params.obstacle_penalty,
    )?;
    log::info!(
        "Learning policy: end {} obstacles {:?} over {} episodes",
        end, obstacles, params.episodes
    );
    Ok(MonteCarloControl::new(grid, params.clone()).run(rng))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use test_case::test_case;

    fn standard_params() -> LearningConfig {
        LearningConfig::default()
    }

    /// Follow the policy greedily from the start cell; None if it loops.
    fn greedy_path_length(policy: &Policy, end: GridState) -> Option<u32> {
        let mut grid = Grid::configure(
            4, 4, GridState::new(2, 0), end, &[], -1.0, -5.0).unwrap();
        for steps in 0..16 {
            if grid.game_over() {
                return Some(steps);
            }
            let a = policy.get(&grid.current_state())?;
            grid.make_move(a);
        }
        None
    }

    #[test]
    fn returns_are_discounted_backwards() {
        // Arrange
        let s0 = GridState::new(2, 0);
        let s1 = GridState::new(3, 0);
        let s2 = GridState::new(3, 1);
        let trajectory = vec![
            Step { state: s0, action: Some(Action::Down), reward: 0.0 },
            Step { state: s1, action: Some(Action::Right), reward: -1.0 },
            Step { state: s2, action: None, reward: -5.0 },
        ];
        // Act
        let visits = discounted_returns(&trajectory, 0.5);
        // Assert
        assert_eq!(visits.len(), 2);
        assert_eq!(visits[0].state, s0);
        assert_eq!(visits[0].action, Action::Down);
        assert_abs_diff_eq!(visits[0].ret, -1.0 + 0.5 * -5.0);
        assert_eq!(visits[1].state, s1);
        assert_abs_diff_eq!(visits[1].ret, -5.0);
    }

    #[test]
    fn update_counts_first_visit_only() {
        // Arrange
        let grid = Grid::configure(
            4, 4, GridState::new(2, 0), GridState::new(3, 3), &[], -1.0, -5.0).unwrap();
        let mut mc = MonteCarloControl::new(grid, standard_params());
        let s = GridState::new(2, 0);
        let visits = vec![
            Visit { state: s, action: Action::Right, ret: -2.0 },
            Visit { state: s, action: Action::Right, ret: -8.0 },
        ];
        // Act
        let change = mc.update(&visits);
        mc.update(&[Visit { state: s, action: Action::Right, ret: -4.0 }]);
        // Assert
        assert_abs_diff_eq!(change, 8.0);
        assert_abs_diff_eq!(mc.action_values().get(&s, Action::Right), -3.0);
        assert_abs_diff_eq!(mc.soft_policy().prob(&s, Action::Right), 0.7, epsilon = 1e-12);
        assert_abs_diff_eq!(mc.soft_policy().prob(&s, Action::Up), 0.1, epsilon = 1e-12);
    }

    #[test]
    fn episode_ends_in_terminal_state() {
        // Arrange
        let grid = Grid::configure(
            4, 4, GridState::new(2, 0), GridState::new(3, 3), &[], -1.0, -5.0).unwrap();
        let mut mc = MonteCarloControl::new(grid, standard_params());
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        // Act
        let trajectory = mc.play_episode(&mut rng).expect("episode within the step cap");
        // Assert
        assert_eq!(trajectory[0].state, GridState::new(2, 0));
        assert_eq!(trajectory[0].reward, 0.0);
        let last = trajectory.last().unwrap();
        assert_eq!(last.state, GridState::new(3, 3));
        assert_eq!(last.action, None);
        assert!(trajectory[..trajectory.len() - 1].iter().all(|s| s.action.is_some()));
    }

    #[test]
    fn tiny_step_cap_abandons_episodes() {
        // Arrange
        let mut params = standard_params();
        params.max_episode_steps = 0;
        params.episodes = 50;
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        // Act
        let (policy, report) = learn_policy(
            4, 4, &params, GridState::new(3, 3), &[], &mut rng).unwrap();
        // Assert
        assert_eq!(report.abandoned as usize + report.deltas.len(), 50);
        assert!(report.abandoned > 0);
        assert_eq!(policy.len(), 15);
    }

    #[test_case(3, 3, &[], 1; "Open grid")]
    #[test_case(3, 3, &[GridState { row: 2, col: 1 }], 2; "Obstacle next to start")]
    #[test_case(3, 2, &[GridState { row: 3, col: 3 }], 3; "Obstacle in the corner")]
    #[test_case(0, 0, &[GridState { row: 1, col: 1 }], 4; "End in the far corner")]
    fn policy_covers_every_non_terminal_state(
        end_row: u8, end_col: u8, obstacles: &[GridState], seed: u64,
    ) {
        // Arrange
        let end = GridState::new(end_row, end_col);
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        // Act
        let (policy, report) = learn_policy(
            4, 4, &standard_params(), end, obstacles, &mut rng).unwrap();
        // Assert
        assert_eq!(policy.len(), 15);
        assert_eq!(policy.get(&end), None);
        assert_eq!(report.values[[end_row as usize, end_col as usize]], 0.0);
    }

    #[test_case(1; "Seed 1")]
    #[test_case(2; "Seed 2")]
    #[test_case(3547; "Seed 3547")]
    fn open_grid_policy_reaches_end_quickly(seed: u64) {
        // Arrange
        let end = GridState::new(3, 3);
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        // Act
        let (policy, report) = learn_policy(
            4, 4, &standard_params(), end, &[], &mut rng).unwrap();
        // Assert
        let steps = greedy_path_length(&policy, end).expect("greedy policy reaches the end");
        assert!(steps <= 6, "took {} steps", steps);
        assert_eq!(report.deltas.len() + report.abandoned as usize, 1000);
    }

    #[test]
    fn start_on_end_state_learns_nothing() {
        // Arrange
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        // Act
        let (policy, report) = learn_policy(
            4, 4, &standard_params(), GridState::new(2, 0), &[], &mut rng).unwrap();
        // Assert
        assert!(report.deltas.is_empty());
        assert_eq!(policy.len(), 15);
        assert_eq!(policy.get(&GridState::new(2, 0)), None);
    }

    #[test]
    fn values_render_as_grid() {
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let (_, report) = learn_policy(
            4, 4, &standard_params(), GridState::new(3, 3), &[], &mut rng).unwrap();
        assert_eq!(report.render_values().lines().count(), 8);
    }
}
