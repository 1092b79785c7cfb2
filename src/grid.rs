//! Deterministic gridworld construction
//!
//! Builds the transition and reward tables for a rectangular grid with trap
//! cells and a goal cell. The planning core never assumes states are 2-D;
//! coordinates exist only here and in whatever layer draws the results.

use std::collections::HashMap;

use crate::model::{RewardModel, TransitionModel};

/// A grid coordinate
pub type Cell = (i32, i32);

/// A displacement action; `(0, 0)` is staying put
pub type Move = (i32, i32);

/// The four cardinal moves plus staying put
pub const MOVES: [Move; 5] = [(1, 0), (0, 1), (-1, 0), (0, -1), (0, 0)];

/// Builder for a deterministic edge-clamped gridworld
///
/// Moving off the edge leaves the agent in place. Every step pays a small
/// cost, staying pays less, trap cells pay a flat penalty regardless of the
/// action, and every action taken at the goal cell earns a bonus on top of
/// its base cost.
#[derive(Debug, Clone)]
pub struct GridWorld {
    pub width: i32,
    pub height: i32,
    pub traps: Vec<Cell>,
    /// Reward for a cardinal move at an ordinary cell
    pub step_cost: f64,
    /// Reward for staying put at an ordinary cell
    pub stay_cost: f64,
    /// Flat reward for any action at a trap cell
    pub trap_cost: f64,
    /// Added to the base cost for any action at the goal cell
    pub goal_bonus: f64,
}

impl GridWorld {
    /// Initialize a grid with the customary costs (-1 per step, -0.1 to stay,
    /// -100 in a trap, +10 at the goal)
    pub fn new(width: i32, height: i32) -> Self {
        Self {
            width,
            height,
            traps: vec![],
            step_cost: -1.0,
            stay_cost: -0.1,
            trap_cost: -100.0,
            goal_bonus: 10.0,
        }
    }

    /// Add trap cells
    pub fn with_traps(mut self, traps: impl IntoIterator<Item = Cell>) -> Self {
        self.traps.extend(traps);
        self
    }

    fn cells(&self) -> impl Iterator<Item = Cell> + '_ {
        (0..self.width).flat_map(move |x| (0..self.height).map(move |y| (x, y)))
    }

    fn clamp(&self, (x, y): Cell) -> Cell {
        (x.clamp(0, self.width - 1), y.clamp(0, self.height - 1))
    }

    /// Build the transition model: every move deterministically reaches its
    /// edge-clamped destination
    pub fn transitions(&self) -> TransitionModel<Cell, Move> {
        self.cells()
            .map(|(x, y)| {
                let actions = MOVES
                    .iter()
                    .map(|&(dx, dy)| {
                        let dest = self.clamp((x + dx, y + dy));
                        ((dx, dy), HashMap::from([(dest, 1.0)]))
                    })
                    .collect();
                ((x, y), actions)
            })
            .collect()
    }

    /// Build the reward model for one goal cell, keyed exactly like
    /// [`transitions`](GridWorld::transitions)
    pub fn rewards(&self, goal: Cell) -> RewardModel<Cell, Move> {
        self.cells()
            .map(|cell| {
                let actions = MOVES
                    .iter()
                    .map(|&(dx, dy)| {
                        let dest = self.clamp((cell.0 + dx, cell.1 + dy));
                        let r = if self.traps.contains(&cell) {
                            self.trap_cost
                        } else {
                            let base = if (dx, dy) == (0, 0) {
                                self.stay_cost
                            } else {
                                self.step_cost
                            };
                            if cell == goal {
                                base + self.goal_bonus
                            } else {
                                base
                            }
                        };
                        ((dx, dy), HashMap::from([(dest, r)]))
                    })
                    .collect();
                (cell, actions)
            })
            .collect()
    }
}
