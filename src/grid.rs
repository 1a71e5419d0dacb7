use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::iter::Iterator;

use crate::error::{ObavoidError, Result};

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct GridState {
    pub row: u8,  // Quantized along the field's x axis
    pub col: u8,  // Quantized along the field's y axis
}

impl GridState {
    pub fn new(row: u8, col: u8) -> GridState {
        GridState { row, col }
    }

    /// Cell reached by taking `action`, or None when it would leave the
    /// first quadrant.
    fn neighbour(&self, action: Action) -> Option<GridState> {
        let (row, col) = match action {
            Action::Up => (self.row.checked_sub(1)?, self.col),
            Action::Down => (self.row.checked_add(1)?, self.col),
            Action::Left => (self.row, self.col.checked_sub(1)?),
            Action::Right => (self.row, self.col.checked_add(1)?),
        };
        Some(GridState { row, col })
    }
}

impl fmt::Display for GridState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// Iterate row by row over every cell of a rows x cols grid.
pub struct GridStateIterator {
    row: u8,
    col: u8,
    rows: u8,
    cols: u8,
}

impl GridStateIterator {
    pub fn new(rows: u8, cols: u8) -> GridStateIterator {
        GridStateIterator { row: 0, col: 0, rows, cols }
    }
}

impl Iterator for GridStateIterator {
    type Item = GridState;

    fn next(&mut self) -> Option<Self::Item> {
        if self.row >= self.rows || self.cols == 0 {
            return None;
        }
        let state = GridState { row: self.row, col: self.col };
        if self.col + 1 < self.cols {
            self.col += 1;
        } else {
            self.col = 0;
            self.row += 1;
        }
        Some(state)
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub enum Action {
    Up,
    Down,
    Left,
    Right,
}

impl Action {
    /// Every action, in the order ties are broken.
    pub const ALL: [Action; 4] = [Action::Up, Action::Down, Action::Left, Action::Right];

    /// Position of the action in `Action::ALL`.
    pub fn index(&self) -> usize {
        match self {
            Action::Up => 0,
            Action::Down => 1,
            Action::Left => 2,
            Action::Right => 3,
        }
    }

    pub fn opposite(&self) -> Action {
        match self {
            Action::Up => Action::Down,
            Action::Down => Action::Up,
            Action::Left => Action::Right,
            Action::Right => Action::Left,
        }
    }

    /// Turn, in degrees relative to the current heading, that the navigation
    /// engine applies when a learned policy recommends this action.
    pub fn heading_offset(&self) -> f64 {
        match self {
            Action::Right => 90.0,
            Action::Down => 180.0,
            Action::Left => 270.0,
            Action::Up => 359.0,
        }
    }

    pub fn symbol(&self) -> char {
        match self {
            Action::Up => 'U',
            Action::Down => 'D',
            Action::Left => 'L',
            Action::Right => 'R',
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// Discrete grid world the learner plays episodes in.
///
/// States with an action list are playable; a state without one is
/// terminal. Rewards are paid for arriving in a state and default to zero.
#[derive(Debug, Clone)]
pub struct Grid {
    pub rows: u8,
    pub cols: u8,
    position: GridState,
    rewards: BTreeMap<GridState, f64>,
    actions: BTreeMap<GridState, Vec<Action>>,
}

impl Grid {
    /// Base layout: every cell may move to each in-bounds neighbour and no
    /// rewards are defined yet.
    pub fn new(rows: u8, cols: u8, start: GridState) -> Grid {
        let actions = GridStateIterator::new(rows, cols)
            .map(|s| {
                let legal = Action::ALL
                    .iter()
                    .copied()
                    .filter(|a| {
                        s.neighbour(*a)
                            .map_or(false, |n| n.row < rows && n.col < cols)
                    })
                    .collect();
                (s, legal)
            })
            .collect();
        Grid { rows, cols, position: start, rewards: BTreeMap::new(), actions }
    }

    /// Build the layout the learner is trained on.
    ///
    /// Every actionable cell costs `step_cost`, the `obstacles` cells cost
    /// `obstacle_penalty`, and `end` becomes the terminal state. Callers must
    /// not pass an `end` that is also an obstacle cell.
    pub fn configure(
        rows: u8, cols: u8, start: GridState, end: GridState,
        obstacles: &[GridState], step_cost: f64, obstacle_penalty: f64,
    ) -> Result<Grid> {
        for cell in [start, end].iter().chain(obstacles.iter()) {
            if cell.row >= rows || cell.col >= cols {
                return Err(ObavoidError::InvalidCell { cell: *cell, rows, cols });
            }
        }
        let mut grid = Grid::new(rows, cols, start);
        let actionable: Vec<GridState> = grid.actions.keys().copied().collect();
        grid.update_rewards(&actionable, step_cost);
        grid.update_rewards(obstacles, obstacle_penalty);
        grid.set_end_state(end);
        Ok(grid)
    }

    pub fn update_rewards(&mut self, states: &[GridState], reward: f64) {
        for s in states {
            self.rewards.insert(*s, reward);
        }
    }

    /// Make `state` terminal: zero reward and no outgoing actions.
    pub fn set_end_state(&mut self, state: GridState) {
        self.rewards.insert(state, 0.0);
        self.actions.remove(&state);
    }

    pub fn set_state(&mut self, state: GridState) {
        self.position = state;
    }

    pub fn current_state(&self) -> GridState {
        self.position
    }

    pub fn is_terminal(&self, state: &GridState) -> bool {
        !self.actions.contains_key(state)
    }

    /// Legal actions for `state`; empty for terminal states.
    pub fn actions(&self, state: &GridState) -> &[Action] {
        self.actions.get(state).map(|a| a.as_slice()).unwrap_or(&[])
    }

    pub fn reward(&self, state: &GridState) -> f64 {
        self.rewards.get(state).copied().unwrap_or(0.0)
    }

    /// Take `action` if it is legal here and return the reward of the state
    /// the agent ends up in. Illegal actions leave the agent in place.
    pub fn make_move(&mut self, action: Action) -> f64 {
        if self.actions(&self.position).contains(&action) {
            if let Some(next) = self.position.neighbour(action) {
                self.position = next;
            }
        }
        self.reward(&self.position)
    }

    /// Reverse a move made with `action`.
    ///
    /// Panics if the reversed move leaves the known state set; that can only
    /// happen when the caller undoes a move that was never made.
    pub fn undo_move(&mut self, action: Action) {
        let back = self.position.neighbour(action.opposite());
        match back {
            Some(state) if self.all_states().contains(&state) => self.position = state,
            _ => panic!(
                "Undoing {} from {} leaves the {}x{} grid.",
                action, self.position, self.rows, self.cols
            ),
        }
    }

    /// True once no action is defined for the current state.
    pub fn game_over(&self) -> bool {
        self.is_terminal(&self.position)
    }

    /// Every state with legal actions or a defined reward.
    pub fn all_states(&self) -> BTreeSet<GridState> {
        self.actions.keys().chain(self.rewards.keys()).copied().collect()
    }

    /// States the learner must produce an action for.
    pub fn non_terminal_states(&self) -> impl Iterator<Item = &GridState> {
        self.actions.keys()
    }

    /// Print the reward of each cell, one grid row per line.
    pub fn render_rewards(&self) -> String {
        let mut out = String::new();
        for row in 0..self.rows {
            out.push_str(&"-".repeat(7 * self.cols as usize));
            out.push('\n');
            for col in 0..self.cols {
                let r = self.reward(&GridState { row, col });
                out.push_str(&format!("{:>6.2}|", r));
            }
            out.push('\n');
        }
        out
    }
}
