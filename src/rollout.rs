//! Sampling trajectories from a solved policy
//!
//! The planners output distributions; actually walking the MDP means drawing
//! actions and next states from them.

use std::{fmt::Debug, hash::Hash};

use rand::{distributions::WeightedIndex, prelude::Distribution, Rng};

use crate::{
    error::{Error, Result},
    model::{Policy, TransitionModel},
};

/// One step of a sampled trajectory
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Step<S, A> {
    pub state: S,
    pub action: A,
    pub next_state: S,
}

fn sample_weighted<T: Copy, R: Rng>(
    items: &[(T, f64)],
    rng: &mut R,
    context: &str,
) -> Result<T> {
    let dist = WeightedIndex::new(items.iter().map(|&(_, w)| w))
        .map_err(|_| Error::DegenerateSignal(format!("no positive weight among {context}")))?;
    Ok(items[dist.sample(rng)].0)
}

/// Draw one action from a policy's distribution at a state
pub fn sample_action<S, A, R>(policy: &Policy<S, A>, state: S, rng: &mut R) -> Result<A>
where
    S: Copy + Eq + Hash + Debug,
    A: Copy + Eq + Hash + Debug,
    R: Rng,
{
    let row = policy.get(&state).ok_or_else(|| {
        Error::ModelMismatch(format!("policy has no entry for state {state:?}"))
    })?;
    let items: Vec<(A, f64)> = row.iter().map(|(&a, &p)| (a, p)).collect();
    sample_weighted(&items, rng, "action probabilities")
}

/// Simulate a bounded trajectory through the transition model under a policy
///
/// Starts at `start` and draws `max_steps` (state, action, next state) steps.
/// There is no terminal-state notion in the model, so the bound is the only
/// stop condition.
pub fn rollout<S, A, R>(
    transitions: &TransitionModel<S, A>,
    policy: &Policy<S, A>,
    start: S,
    max_steps: usize,
    rng: &mut R,
) -> Result<Vec<Step<S, A>>>
where
    S: Copy + Eq + Hash + Debug,
    A: Copy + Eq + Hash + Debug,
    R: Rng,
{
    let mut trajectory = Vec::with_capacity(max_steps);
    let mut state = start;

    for _ in 0..max_steps {
        let action = sample_action(policy, state, rng)?;
        let outcomes = transitions
            .get(&state)
            .and_then(|actions| actions.get(&action))
            .ok_or_else(|| {
                Error::ModelMismatch(format!(
                    "transition model has no outcomes for ({state:?}, {action:?})"
                ))
            })?;

        let items: Vec<(S, f64)> = outcomes.iter().map(|(&snew, &p)| (snew, p)).collect();
        let next_state = sample_weighted(&items, rng, "next-state probabilities")?;

        trajectory.push(Step {
            state,
            action,
            next_state,
        });
        state = next_state;
    }

    Ok(trajectory)
}
