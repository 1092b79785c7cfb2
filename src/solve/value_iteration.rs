use std::{collections::HashMap, fmt::Debug, hash::Hash};

use log::{debug, trace};

use crate::{
    error::{Error, Result},
    model::{self, Policy, RewardModel, TransitionModel, ValueFunction},
};

/// Number of decimal digits two expected backups are rounded to before they
/// are compared for tie-breaking
const TIE_DECIMALS: i32 = 3;

/// Fallback sweep cap used by [`ValueIteration::new`]
const DEFAULT_MAX_SWEEPS: u32 = 10_000;

fn round_for_tie(x: f64) -> f64 {
    let scale = 10f64.powi(TIE_DECIMALS);
    (x * scale).round() / scale
}

/// Result of a converged value iteration run
#[derive(Debug, Clone)]
pub struct Solution<S, A> {
    /// Optimal state values, within the configured tolerance
    pub values: ValueFunction<S>,
    /// Greedy policy: uniform over the actions whose backups tie for the
    /// maximum after rounding
    ///
    /// A state whose maximizing value is exactly zero has no entry here.
    pub policy: Policy<S, A>,
    /// Number of sweeps it took to converge
    pub sweeps: u32,
}

/// Value iteration solver for a finite MDP
///
/// Runs synchronous Bellman backups: each sweep computes every state's new
/// value from the previous sweep's value function only, and stops once the
/// largest per-state change falls below `tolerance`.
///
/// ### Example
/// ```
/// use std::collections::HashMap;
/// use signal_mdp::solve::ValueIteration;
///
/// // Two states, the second absorbing and rewarding to enter
/// let transitions = HashMap::from([
///     (0, HashMap::from([('g', HashMap::from([(1, 1.0)])), ('s', HashMap::from([(0, 1.0)]))])),
///     (1, HashMap::from([('g', HashMap::from([(1, 1.0)])), ('s', HashMap::from([(1, 1.0)]))])),
/// ]);
/// let rewards = HashMap::from([
///     (0, HashMap::from([('g', HashMap::from([(1, 1.0)])), ('s', HashMap::from([(0, 0.0)]))])),
///     (1, HashMap::from([('g', HashMap::from([(1, 0.0)])), ('s', HashMap::from([(1, 0.0)]))])),
/// ]);
///
/// let solver = ValueIteration::new(1e-6, 0.9).unwrap();
/// let solution = solver.solve(&transitions, &rewards).unwrap();
/// assert_eq!(solution.policy[&0], HashMap::from([('g', 1.0)]));
/// ```
#[derive(Debug, Clone)]
pub struct ValueIteration {
    tolerance: f64,
    gamma: f64,
    max_sweeps: u32,
}

impl ValueIteration {
    /// Initialize a solver with a convergence tolerance and discount factor
    ///
    /// Fails with [`Error::InvalidParameter`] unless `tolerance > 0` and
    /// `gamma` is in `[0, 1)`.
    pub fn new(tolerance: f64, gamma: f64) -> Result<Self> {
        Self::with_max_sweeps(tolerance, gamma, DEFAULT_MAX_SWEEPS)
    }

    /// Initialize a solver with an explicit sweep cap
    pub fn with_max_sweeps(tolerance: f64, gamma: f64, max_sweeps: u32) -> Result<Self> {
        if !(tolerance > 0.0) {
            return Err(Error::InvalidParameter {
                name: "tolerance",
                reason: format!("must be positive, got {tolerance}"),
            });
        }
        if !(0.0..1.0).contains(&gamma) {
            return Err(Error::InvalidParameter {
                name: "gamma",
                reason: format!("must be in [0, 1), got {gamma}"),
            });
        }
        if max_sweeps == 0 {
            return Err(Error::InvalidParameter {
                name: "max_sweeps",
                reason: "must be at least 1".into(),
            });
        }

        Ok(Self {
            tolerance,
            gamma,
            max_sweeps,
        })
    }

    /// Solve the MDP described by a transition and reward model
    ///
    /// Returns the converged value function and the greedy policy over it, or
    /// [`Error::ModelMismatch`] if the two models' key sets diverge and
    /// [`Error::NoConvergence`] if the sweep cap is hit first.
    pub fn solve<S, A>(
        &self,
        transitions: &TransitionModel<S, A>,
        rewards: &RewardModel<S, A>,
    ) -> Result<Solution<S, A>>
    where
        S: Copy + Eq + Hash + Debug,
        A: Copy + Eq + Hash + Debug,
    {
        model::check_models(transitions, rewards)?;

        let mut values: ValueFunction<S> = transitions.keys().map(|&s| (s, 0.0)).collect();
        let mut policy = Policy::new();
        let mut delta = f64::INFINITY;

        for sweep in 1..=self.max_sweeps {
            let mut next_values = HashMap::with_capacity(values.len());
            let mut next_policy = HashMap::with_capacity(values.len());
            delta = 0.0;

            for (&s, actions) in transitions {
                let mut best = f64::NEG_INFINITY;
                let mut tied: Vec<A> = vec![];

                for (&a, outcomes) in actions {
                    let mut backup = 0.0;
                    for (&snew, &p) in outcomes {
                        let r = rewards[&s][&a][&snew];
                        backup += p * (r + self.gamma * values[&snew]);
                    }

                    if round_for_tie(backup) > round_for_tie(best) {
                        best = backup;
                        tied.clear();
                        tied.push(a);
                    } else if round_for_tie(backup) == round_for_tie(best) {
                        tied.push(a);
                    }
                }

                // A maximizing value of exactly zero leaves the state out of
                // the greedy policy.
                if best != 0.0 {
                    let p = 1.0 / tied.len() as f64;
                    next_policy.insert(s, tied.into_iter().map(|a| (a, p)).collect());
                }

                delta = f64::max(delta, (values[&s] - best).abs());
                next_values.insert(s, best);
            }

            values = next_values;
            policy = next_policy;
            trace!("sweep {sweep}: delta = {delta:e}");

            if delta < self.tolerance {
                debug!("value iteration converged after {sweep} sweeps (delta {delta:e})");
                return Ok(Solution {
                    values,
                    policy,
                    sweeps: sweep,
                });
            }
        }

        Err(Error::NoConvergence {
            max_sweeps: self.max_sweeps,
            delta,
        })
    }
}
