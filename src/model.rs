use std::{collections::HashMap, fmt::Debug, hash::Hash};

use crate::error::{Error, Result};

/// Transition dynamics of a finite MDP: state -> action -> next state -> probability
///
/// For every (state, action) pair present, the probabilities over next states
/// must sum to 1 within floating tolerance. Every next state must itself be a
/// key of the outer map so the value function covers it.
pub type TransitionModel<S, A> = HashMap<S, HashMap<A, HashMap<S, f64>>>;

/// Reward signal keyed exactly like the [`TransitionModel`] it is used with:
/// state -> action -> next state -> reward
pub type RewardModel<S, A> = HashMap<S, HashMap<A, HashMap<S, f64>>>;

/// State values produced by a value iteration run
pub type ValueFunction<S> = HashMap<S, f64>;

/// Stochastic policy: state -> action -> probability
///
/// Action probabilities at a state sum to 1. A greedy policy from raw value
/// iteration is uniform over the value-maximizing actions; a softmax policy
/// puts strictly positive probability on every available action.
pub type Policy<S, A> = HashMap<S, HashMap<A, f64>>;

/// Action values derived from a converged value function: state -> action -> Q
pub type QFunction<S, A> = HashMap<S, HashMap<A, f64>>;

/// One policy per candidate goal label
pub type GoalPolicySet<G, S, A> = HashMap<G, Policy<S, A>>;

/// Tolerance used when checking that a probability distribution sums to 1
pub const DISTRIBUTION_TOLERANCE: f64 = 1e-9;

/// Checks that a transition model and a reward model cover exactly the same
/// (state, action, next_state) keys, and that every reachable next state is a
/// state of the model.
///
/// The planning routines call this before touching either map, so lookups
/// inside their hot loops cannot miss.
pub fn check_models<S, A>(
    transitions: &TransitionModel<S, A>,
    rewards: &RewardModel<S, A>,
) -> Result<()>
where
    S: Copy + Eq + Hash + Debug,
    A: Copy + Eq + Hash + Debug,
{
    for s in rewards.keys() {
        if !transitions.contains_key(s) {
            return Err(Error::ModelMismatch(format!(
                "state {s:?} is in the reward model but not the transition model"
            )));
        }
    }

    for (s, actions) in transitions {
        let Some(reward_actions) = rewards.get(s) else {
            return Err(Error::ModelMismatch(format!(
                "state {s:?} is in the transition model but not the reward model"
            )));
        };

        if actions.is_empty() {
            return Err(Error::ModelMismatch(format!(
                "state {s:?} has no available actions"
            )));
        }

        for a in reward_actions.keys() {
            if !actions.contains_key(a) {
                return Err(Error::ModelMismatch(format!(
                    "action {a:?} at state {s:?} is in the reward model but not the transition model"
                )));
            }
        }

        for (a, outcomes) in actions {
            let Some(reward_outcomes) = reward_actions.get(a) else {
                return Err(Error::ModelMismatch(format!(
                    "action {a:?} at state {s:?} has no reward entry"
                )));
            };

            for snew in reward_outcomes.keys() {
                if !outcomes.contains_key(snew) {
                    return Err(Error::ModelMismatch(format!(
                        "next state {snew:?} for ({s:?}, {a:?}) is in the reward model but not the transition model"
                    )));
                }
            }

            for snew in outcomes.keys() {
                if !reward_outcomes.contains_key(snew) {
                    return Err(Error::ModelMismatch(format!(
                        "next state {snew:?} for ({s:?}, {a:?}) has no reward entry"
                    )));
                }
                if !transitions.contains_key(snew) {
                    return Err(Error::ModelMismatch(format!(
                        "next state {snew:?} for ({s:?}, {a:?}) is not a state of the model"
                    )));
                }
            }
        }
    }

    Ok(())
}

/// Checks that every (state, action) row of a transition model is a proper
/// probability distribution over next states.
///
/// The planners assume this invariant rather than re-checking it each sweep;
/// call this once when a model is built by hand.
pub fn check_distributions<S, A>(transitions: &TransitionModel<S, A>) -> Result<()>
where
    S: Copy + Eq + Hash + Debug,
    A: Copy + Eq + Hash + Debug,
{
    for (s, actions) in transitions {
        for (a, outcomes) in actions {
            let total: f64 = outcomes.values().sum();
            if (total - 1.0).abs() > DISTRIBUTION_TOLERANCE {
                return Err(Error::ModelMismatch(format!(
                    "probabilities for ({s:?}, {a:?}) sum to {total}, expected 1"
                )));
            }
            if outcomes.values().any(|&p| !(0.0..=1.0).contains(&p)) {
                return Err(Error::ModelMismatch(format!(
                    "({s:?}, {a:?}) has a probability outside [0, 1]"
                )));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toy_transitions() -> TransitionModel<u8, char> {
        HashMap::from([
            (0, HashMap::from([('g', HashMap::from([(1, 1.0)]))])),
            (1, HashMap::from([('g', HashMap::from([(1, 1.0)]))])),
        ])
    }

    fn toy_rewards() -> RewardModel<u8, char> {
        HashMap::from([
            (0, HashMap::from([('g', HashMap::from([(1, 1.0)]))])),
            (1, HashMap::from([('g', HashMap::from([(1, 0.0)]))])),
        ])
    }

    #[test]
    fn matching_models_pass() {
        assert!(check_models(&toy_transitions(), &toy_rewards()).is_ok());
    }

    #[test]
    fn missing_reward_state_is_mismatch() {
        let mut rewards = toy_rewards();
        rewards.remove(&1);
        let err = check_models(&toy_transitions(), &rewards).unwrap_err();
        assert!(matches!(err, Error::ModelMismatch(_)));
    }

    #[test]
    fn extra_reward_action_is_mismatch() {
        let mut rewards = toy_rewards();
        rewards
            .get_mut(&0)
            .unwrap()
            .insert('x', HashMap::from([(1, 0.0)]));
        let err = check_models(&toy_transitions(), &rewards).unwrap_err();
        assert!(matches!(err, Error::ModelMismatch(_)));
    }

    #[test]
    fn unreachable_next_state_is_mismatch() {
        let mut transitions = toy_transitions();
        let mut rewards = toy_rewards();
        transitions
            .get_mut(&0)
            .unwrap()
            .insert('x', HashMap::from([(7, 1.0)]));
        rewards
            .get_mut(&0)
            .unwrap()
            .insert('x', HashMap::from([(7, 0.0)]));
        let err = check_models(&transitions, &rewards).unwrap_err();
        assert!(matches!(err, Error::ModelMismatch(_)));
    }

    #[test]
    fn empty_action_set_is_mismatch() {
        let mut transitions = toy_transitions();
        let mut rewards = toy_rewards();
        transitions.get_mut(&1).unwrap().clear();
        rewards.get_mut(&1).unwrap().clear();
        let err = check_models(&transitions, &rewards).unwrap_err();
        assert!(matches!(err, Error::ModelMismatch(_)));
    }

    #[test]
    fn unnormalized_distribution_is_caught() {
        let mut transitions = toy_transitions();
        transitions
            .get_mut(&0)
            .unwrap()
            .get_mut(&'g')
            .unwrap()
            .insert(0, 0.5);
        assert!(check_distributions(&transitions).is_err());

        let transitions = toy_transitions();
        assert!(check_distributions(&transitions).is_ok());
    }
}
