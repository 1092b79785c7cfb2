use std::{collections::HashMap, fmt::Debug, hash::Hash};

use crate::{
    error::{Error, Result},
    model::{Policy, RewardModel, TransitionModel, ValueFunction},
    solve::q_values,
};

/// Converts action values into a stochastic policy via a temperature-scaled
/// exponential (Boltzmann distribution)
///
/// Per state, each action's probability is
/// `exp(β·Q(s,a)) / Σ_a' exp(β·Q(s,a'))`. The exponentials are shifted by the
/// row maximum before exponentiation so large `β·Q` cannot overflow; the
/// quotient is unchanged.
///
/// Every available action receives strictly positive probability and each
/// row sums to 1 within floating tolerance.
pub fn softmax_policy<S, A>(
    transitions: &TransitionModel<S, A>,
    rewards: &RewardModel<S, A>,
    values: &ValueFunction<S>,
    gamma: f64,
    beta: f64,
) -> Result<Policy<S, A>>
where
    S: Copy + Eq + Hash + Debug,
    A: Copy + Eq + Hash + Debug,
{
    if !(beta > 0.0) {
        return Err(Error::InvalidParameter {
            name: "beta",
            reason: format!("must be positive, got {beta}"),
        });
    }

    let q_table = q_values(transitions, rewards, values, gamma)?;

    let mut policy = HashMap::with_capacity(q_table.len());
    for (s, row) in q_table {
        let max_q = row.values().copied().fold(f64::NEG_INFINITY, f64::max);
        let exponentials: HashMap<A, f64> = row
            .into_iter()
            .map(|(a, q)| (a, (beta * (q - max_q)).exp()))
            .collect();
        let sum: f64 = exponentials.values().sum();
        policy.insert(s, exponentials.into_iter().map(|(a, e)| (a, e / sum)).collect());
    }

    Ok(policy)
}
