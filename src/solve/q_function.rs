use std::{collections::HashMap, fmt::Debug, hash::Hash};

use crate::{
    error::{Error, Result},
    model::{self, QFunction, RewardModel, TransitionModel, ValueFunction},
};

/// Derives action values from a converged value function in a single
/// non-iterative backup pass
///
/// For every (state, action) pair of the transition model:
/// `Q(s, a) = Σ_s' P(s'|s, a) * (R(s, a, s') + γ * V(s'))`
///
/// No maximization is applied; the raw value per action is kept.
pub fn q_values<S, A>(
    transitions: &TransitionModel<S, A>,
    rewards: &RewardModel<S, A>,
    values: &ValueFunction<S>,
    gamma: f64,
) -> Result<QFunction<S, A>>
where
    S: Copy + Eq + Hash + Debug,
    A: Copy + Eq + Hash + Debug,
{
    if !(0.0..1.0).contains(&gamma) {
        return Err(Error::InvalidParameter {
            name: "gamma",
            reason: format!("must be in [0, 1), got {gamma}"),
        });
    }
    model::check_models(transitions, rewards)?;
    for s in transitions.keys() {
        if !values.contains_key(s) {
            return Err(Error::ModelMismatch(format!(
                "state {s:?} has no entry in the value function"
            )));
        }
    }

    let mut q_table = HashMap::with_capacity(transitions.len());
    for (&s, actions) in transitions {
        let mut row = HashMap::with_capacity(actions.len());
        for (&a, outcomes) in actions {
            let q = outcomes
                .iter()
                .map(|(snew, p)| p * (rewards[&s][&a][snew] + gamma * values[snew]))
                .sum::<f64>();
            row.insert(a, q);
        }
        q_table.insert(s, row);
    }

    Ok(q_table)
}
