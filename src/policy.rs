use crate::grid::{Action, GridState};

/// Action values Q(s, a). Indexes: row, col, action.
#[derive(Debug, Clone)]
pub struct ActionValues {
    pub values: ndarray::Array3<f64>,
}

impl ActionValues {
    pub fn new(rows: u8, cols: u8, q_init: f64) -> ActionValues {
        let dimensions = (rows as usize, cols as usize, Action::ALL.len());
        ActionValues { values: ndarray::Array3::<f64>::from_elem(dimensions, q_init) }
    }

    pub fn get(&self, s: &GridState, a: Action) -> f64 {
        self.values[[s.row as usize, s.col as usize, a.index()]]
    }

    pub fn set(&mut self, s: &GridState, a: Action, value: f64) {
        self.values[[s.row as usize, s.col as usize, a.index()]] = value;
    }

    /// Best action and its value. Ties go to the action listed first in
    /// `Action::ALL`.
    pub fn greedy(&self, s: &GridState) -> (Action, f64) {
        let mut best = (Action::ALL[0], self.get(s, Action::ALL[0]));
        for a in Action::ALL.iter().skip(1) {
            let q = self.get(s, *a);
            if q > best.1 {
                best = (*a, q);
            }
        }
        best
    }
}

/// Epsilon-soft behaviour policy pi(a | s). Indexes: row, col, action.
#[derive(Debug, Clone)]
pub struct SoftPolicy {
    pub probs: ndarray::Array3<f64>,
}

impl SoftPolicy {
    /// Start out uniformly random.
    pub fn new(rows: u8, cols: u8) -> SoftPolicy {
        let n = Action::ALL.len();
        let dimensions = (rows as usize, cols as usize, n);
        SoftPolicy { probs: ndarray::Array3::<f64>::from_elem(dimensions, 1.0 / n as f64) }
    }

    pub fn prob(&self, s: &GridState, a: Action) -> f64 {
        self.probs[[s.row as usize, s.col as usize, a.index()]]
    }

    /// Give `greedy` probability 1 - eps + eps/|A| and every other action
    /// eps/|A|.
    pub fn make_soft_greedy(&mut self, s: &GridState, greedy: Action, epsilon: f64) {
        let share = epsilon / Action::ALL.len() as f64;
        for a in Action::ALL {
            let p = if a == greedy { 1.0 - epsilon + share } else { share };
            self.probs[[s.row as usize, s.col as usize, a.index()]] = p;
        }
    }

    /// Pick an action for `s` given a uniform draw in [0, 1).
    pub fn choose(&self, s: &GridState, draw: f64) -> Action {
        let mut cumulative = 0.0;
        for a in Action::ALL {
            cumulative += self.prob(s, a);
            if draw < cumulative {
                return a;
            }
        }
        // Rounding can leave the cumulative sum a hair below 1.
        Action::ALL[Action::ALL.len() - 1]
    }
}

/// Deterministic policy: one action per non-terminal state.
#[derive(Debug, Clone, PartialEq)]
pub struct Policy {
    pub rows: u8,
    pub cols: u8,
    pub policy: ndarray::Array2<Option<Action>>,
}

impl Policy {
    pub fn new(rows: u8, cols: u8) -> Policy {
        let policy = ndarray::Array2::<Option<Action>>::from_elem(
            (rows as usize, cols as usize), None);
        Policy { rows, cols, policy }
    }

    /// Action for `s`, or None when `s` is terminal or off the grid.
    pub fn get(&self, s: &GridState) -> Option<Action> {
        self.policy.get((s.row as usize, s.col as usize)).copied().flatten()
    }

    pub fn set(&mut self, s: &GridState, a: Action) {
        self.policy[[s.row as usize, s.col as usize]] = Some(a);
    }

    /// Number of states with an action.
    pub fn len(&self) -> usize {
        self.policy.iter().filter(|a| a.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Print the policy as a grid of action symbols; terminal cells are blank.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for row in self.policy.rows() {
            out.push_str(&"-".repeat(6 * self.cols as usize));
            out.push('\n');
            for a in row.iter() {
                let symbol = a.map_or(' ', |a| a.symbol());
                out.push_str(&format!("  {}  |", symbol));
            }
            out.push('\n');
        }
        out
    }
}
