//! Goal-signaling reward shaping
//!
//! An observer watching an agent move can compare the agent's transitions
//! against the policies it would expect under each candidate goal. Shaping the
//! reward with the relative likelihood that a transition reveals the true goal
//! makes the replanned agent pick paths that are informative as well as
//! efficient.

use std::{collections::HashMap, fmt::Debug, hash::Hash};

use log::info;

use crate::{
    error::{Error, Result},
    model::{self, GoalPolicySet, Policy, RewardModel, TransitionModel},
    solve::{softmax_policy, Solution, ValueIteration},
};

/// Marginal probability of reaching each next state from each state under one
/// goal's policy
type ConnectionProbs<S> = HashMap<S, HashMap<S, f64>>;

/// Reward shaper that blends goal-signaling informativeness into a reward
/// model
///
/// Holds a transition model and one (typically softmax) policy per candidate
/// goal. [`shape`](LikelihoodReward::shape) then produces, for a chosen true
/// goal, a reward model whose transitions additionally pay out in proportion
/// to how distinctively they point at that goal.
pub struct LikelihoodReward<'a, G, S, A> {
    transitions: &'a TransitionModel<S, A>,
    goal_policies: &'a GoalPolicySet<G, S, A>,
}

impl<'a, G, S, A> LikelihoodReward<'a, G, S, A>
where
    G: Copy + Eq + Hash + Debug,
    S: Copy + Eq + Hash + Debug,
    A: Copy + Eq + Hash + Debug,
{
    /// Initialize a shaper over a fixed set of candidate goals
    ///
    /// Fails with [`Error::InvalidParameter`] if fewer than 2 goals are
    /// supplied; with a single candidate every transition trivially signals
    /// it.
    pub fn new(
        transitions: &'a TransitionModel<S, A>,
        goal_policies: &'a GoalPolicySet<G, S, A>,
    ) -> Result<Self> {
        if goal_policies.len() < 2 {
            return Err(Error::InvalidParameter {
                name: "goal_policies",
                reason: format!("need at least 2 candidate goals, got {}", goal_policies.len()),
            });
        }

        Ok(Self {
            transitions,
            goal_policies,
        })
    }

    /// Computes, for one goal, the probability of each (state, next state)
    /// connection appearing in the reward model.
    ///
    /// Probabilities of distinct actions that reach the same next state are
    /// summed, so the result is the policy's marginal next-state distribution
    /// restricted to the modeled connections.
    fn connection_probs(
        &self,
        policy: &Policy<S, A>,
        goal: G,
        rewards: &RewardModel<S, A>,
    ) -> Result<ConnectionProbs<S>> {
        let mut probs: ConnectionProbs<S> = HashMap::with_capacity(rewards.len());

        for (&s, actions) in rewards {
            let policy_row = policy.get(&s).ok_or_else(|| {
                Error::ModelMismatch(format!("policy for goal {goal:?} has no entry for state {s:?}"))
            })?;

            let row = probs.entry(s).or_default();
            for (&a, outcomes) in actions {
                let &p = policy_row.get(&a).ok_or_else(|| {
                    Error::ModelMismatch(format!(
                        "policy for goal {goal:?} has no probability for action {a:?} at state {s:?}"
                    ))
                })?;

                for &snew in outcomes.keys() {
                    *row.entry(snew).or_insert(0.0) += p;
                }
            }
        }

        Ok(probs)
    }

    /// Produce a new reward model signaling `true_goal` to an observer
    ///
    /// For every (s, a, s') of `original`, the new reward is
    /// `R(s, a, s') + α · P(s'|s, true goal) / Σ_g P(s'|s, g)`. The bonus
    /// depends only on the (s, s') connection, so every action reaching the
    /// same next state earns the same bonus.
    ///
    /// Fails with [`Error::DegenerateSignal`] if every candidate goal's policy
    /// assigns zero probability to some modeled connection.
    pub fn shape(
        &self,
        true_goal: G,
        original: &RewardModel<S, A>,
        alpha: f64,
    ) -> Result<RewardModel<S, A>> {
        if !self.goal_policies.contains_key(&true_goal) {
            return Err(Error::InvalidParameter {
                name: "true_goal",
                reason: format!("goal {true_goal:?} is not among the candidate goals"),
            });
        }
        model::check_models(self.transitions, original)?;

        let connection_probs = self
            .goal_policies
            .iter()
            .map(|(&g, policy)| Ok((g, self.connection_probs(policy, g, original)?)))
            .collect::<Result<HashMap<G, ConnectionProbs<S>>>>()?;

        let mut shaped = HashMap::with_capacity(original.len());
        for (&s, actions) in original {
            let mut shaped_actions = HashMap::with_capacity(actions.len());
            for (&a, outcomes) in actions {
                let mut shaped_outcomes = HashMap::with_capacity(outcomes.len());
                for (&snew, &r) in outcomes {
                    let evidence: f64 = connection_probs.values().map(|probs| probs[&s][&snew]).sum();
                    if evidence == 0.0 {
                        return Err(Error::DegenerateSignal(format!(
                            "no candidate goal's policy reaches {snew:?} from {s:?}"
                        )));
                    }

                    let informativeness = connection_probs[&true_goal][&s][&snew] / evidence;
                    shaped_outcomes.insert(snew, r + alpha * informativeness);
                }
                shaped_actions.insert(a, shaped_outcomes);
            }
            shaped.insert(s, shaped_actions);
        }

        Ok(shaped)
    }
}

/// Everything the pipeline produces for one goal
#[derive(Debug, Clone)]
pub struct GoalPlan<S, A> {
    /// Value iteration result under the goal's original reward model
    pub base: Solution<S, A>,
    /// Softmax policy derived from the base values; this is what the observer
    /// compares against
    pub goal_policy: Policy<S, A>,
    /// The goal's reward model with the signaling bonus blended in
    pub shaped_rewards: RewardModel<S, A>,
    /// Value iteration result under the shaped rewards; its greedy policy is
    /// the signaling policy
    pub signaling: Solution<S, A>,
}

/// Parameters for the plan → reshape → replan pipeline
///
/// All values are caller-supplied; each stage validates its own parameters
/// eagerly.
#[derive(Debug, Clone)]
pub struct SignalingPlannerConfig {
    /// Value iteration convergence tolerance (ε > 0)
    pub tolerance: f64,
    /// Discount factor (γ ∈ [0, 1))
    pub gamma: f64,
    /// Softmax inverse temperature (β > 0)
    pub beta: f64,
    /// Weight of the signaling bonus
    pub alpha: f64,
    /// Sweep cap per value iteration run
    pub max_sweeps: u32,
}

/// Closed-loop planner: solve each goal, derive the observer's goal policies,
/// shape each goal's reward, and re-solve for the signaling policies
///
/// Runs are independent per goal; nothing mutable is shared between them.
pub struct SignalingPlanner {
    solver: ValueIteration,
    config: SignalingPlannerConfig,
}

impl SignalingPlanner {
    pub fn new(config: SignalingPlannerConfig) -> Result<Self> {
        let solver = ValueIteration::with_max_sweeps(config.tolerance, config.gamma, config.max_sweeps)?;
        if !(config.beta > 0.0) {
            return Err(Error::InvalidParameter {
                name: "beta",
                reason: format!("must be positive, got {}", config.beta),
            });
        }

        Ok(Self { solver, config })
    }

    /// Run the full pipeline over one reward model per candidate goal
    pub fn plan<G, S, A>(
        &self,
        transitions: &TransitionModel<S, A>,
        goal_rewards: &HashMap<G, RewardModel<S, A>>,
    ) -> Result<HashMap<G, GoalPlan<S, A>>>
    where
        G: Copy + Eq + Hash + Debug,
        S: Copy + Eq + Hash + Debug,
        A: Copy + Eq + Hash + Debug,
    {
        if goal_rewards.len() < 2 {
            return Err(Error::InvalidParameter {
                name: "goal_rewards",
                reason: format!("need at least 2 candidate goals, got {}", goal_rewards.len()),
            });
        }

        let mut bases = HashMap::with_capacity(goal_rewards.len());
        let mut goal_policies: GoalPolicySet<G, S, A> = HashMap::with_capacity(goal_rewards.len());
        for (&goal, rewards) in goal_rewards {
            let base = self.solver.solve(transitions, rewards)?;
            info!("goal {goal:?}: base solution converged in {} sweeps", base.sweeps);
            let policy = softmax_policy(
                transitions,
                rewards,
                &base.values,
                self.config.gamma,
                self.config.beta,
            )?;
            bases.insert(goal, base);
            goal_policies.insert(goal, policy);
        }

        let shaper = LikelihoodReward::new(transitions, &goal_policies)?;

        let mut plans = HashMap::with_capacity(goal_rewards.len());
        for (&goal, rewards) in goal_rewards {
            let shaped_rewards = shaper.shape(goal, rewards, self.config.alpha)?;
            let signaling = self.solver.solve(transitions, &shaped_rewards)?;
            info!(
                "goal {goal:?}: signaling solution converged in {} sweeps",
                signaling.sweeps
            );

            plans.insert(
                goal,
                GoalPlan {
                    base: bases.remove(&goal).expect("solved above"),
                    goal_policy: goal_policies[&goal].clone(),
                    shaped_rewards,
                    signaling,
                },
            );
        }

        Ok(plans)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type Transitions = TransitionModel<u8, char>;
    type Rewards = RewardModel<u8, char>;

    /// Three states in a line; from the middle the agent can go left, right,
    /// or stay. The ends are absorbing.
    fn line_transitions() -> Transitions {
        HashMap::from([
            (0, HashMap::from([('.', HashMap::from([(0, 1.0)]))])),
            (
                1,
                HashMap::from([
                    ('l', HashMap::from([(0, 1.0)])),
                    ('r', HashMap::from([(2, 1.0)])),
                    ('.', HashMap::from([(1, 1.0)])),
                ]),
            ),
            (2, HashMap::from([('.', HashMap::from([(2, 1.0)]))])),
        ])
    }

    fn line_rewards(goal: u8) -> Rewards {
        let mut rewards: Rewards = HashMap::from([
            (0, HashMap::from([('.', HashMap::from([(0, 0.0)]))])),
            (
                1,
                HashMap::from([
                    ('l', HashMap::from([(0, -1.0)])),
                    ('r', HashMap::from([(2, -1.0)])),
                    ('.', HashMap::from([(1, -0.1)])),
                ]),
            ),
            (2, HashMap::from([('.', HashMap::from([(2, 0.0)]))])),
        ]);
        *rewards
            .get_mut(&1)
            .unwrap()
            .get_mut(if goal == 0 { &'l' } else { &'r' })
            .unwrap()
            .get_mut(&goal)
            .unwrap() = 10.0;
        rewards
    }

    fn uniform_policies() -> GoalPolicySet<u8, u8, char> {
        let policy: Policy<u8, char> = HashMap::from([
            (0, HashMap::from([('.', 1.0)])),
            (1, HashMap::from([('l', 0.25), ('r', 0.25), ('.', 0.5)])),
            (2, HashMap::from([('.', 1.0)])),
        ]);
        HashMap::from([(0, policy.clone()), (2, policy)])
    }

    #[test]
    fn fewer_than_two_goals_is_rejected() {
        let transitions = line_transitions();
        let mut policies = uniform_policies();
        policies.remove(&2);
        assert!(matches!(
            LikelihoodReward::new(&transitions, &policies),
            Err(Error::InvalidParameter { .. })
        ));
    }

    #[test]
    fn unknown_true_goal_is_rejected() {
        let transitions = line_transitions();
        let policies = uniform_policies();
        let shaper = LikelihoodReward::new(&transitions, &policies).unwrap();
        assert!(matches!(
            shaper.shape(7, &line_rewards(0), 1.0),
            Err(Error::InvalidParameter { .. })
        ));
    }

    #[test]
    fn zero_alpha_preserves_rewards() {
        let transitions = line_transitions();
        let policies = uniform_policies();
        let shaper = LikelihoodReward::new(&transitions, &policies).unwrap();

        let original = line_rewards(0);
        let shaped = shaper.shape(0, &original, 0.0).unwrap();

        for (s, actions) in &original {
            for (a, outcomes) in actions {
                for (snew, r) in outcomes {
                    assert!((shaped[s][a][snew] - r).abs() < 1e-12);
                }
            }
        }
    }

    #[test]
    fn identical_policies_share_the_bonus_evenly() {
        let transitions = line_transitions();
        let policies = uniform_policies();
        let shaper = LikelihoodReward::new(&transitions, &policies).unwrap();

        let original = line_rewards(0);
        let alpha = 4.0;
        let shaped = shaper.shape(0, &original, alpha).unwrap();

        // Both candidates assign identical connection probabilities, so the
        // informativeness is 1/2 everywhere
        for (s, actions) in &original {
            for (a, outcomes) in actions {
                for (snew, r) in outcomes {
                    assert!((shaped[s][a][snew] - (r + alpha / 2.0)).abs() < 1e-12);
                }
            }
        }
    }

    #[test]
    fn all_zero_connection_is_degenerate() {
        let transitions = line_transitions();
        let mut policies = uniform_policies();
        for policy in policies.values_mut() {
            policy.insert(1, HashMap::from([('l', 0.5), ('r', 0.5), ('.', 0.0)]));
        }

        let shaper = LikelihoodReward::new(&transitions, &policies).unwrap();
        let err = shaper.shape(0, &line_rewards(0), 1.0).unwrap_err();
        assert!(matches!(err, Error::DegenerateSignal(_)));
    }

    #[test]
    fn pipeline_produces_signaling_plans() {
        let transitions = line_transitions();
        let goal_rewards = HashMap::from([(0u8, line_rewards(0)), (2u8, line_rewards(2))]);

        let planner = SignalingPlanner::new(SignalingPlannerConfig {
            tolerance: 1e-6,
            gamma: 0.9,
            beta: 2.0,
            alpha: 5.0,
            max_sweeps: 10_000,
        })
        .unwrap();

        let plans = planner.plan(&transitions, &goal_rewards).unwrap();
        assert_eq!(plans.len(), 2);

        for (goal, plan) in &plans {
            // Base plan heads straight for the goal
            let toward = if *goal == 0 { 'l' } else { 'r' };
            assert_eq!(plan.base.policy[&1], HashMap::from([(toward, 1.0)]));

            // Signaling bonus never exceeds alpha and never goes negative
            for (s, actions) in &goal_rewards[goal] {
                for (a, outcomes) in actions {
                    for (snew, r) in outcomes {
                        let bonus = plan.shaped_rewards[s][a][snew] - r;
                        assert!((0.0..=5.0 + 1e-12).contains(&bonus));
                    }
                }
            }

            // The signaling plan still reaches the goal from the middle
            assert_eq!(plan.signaling.policy[&1], HashMap::from([(toward, 1.0)]));

            let row: f64 = plan.goal_policy[&1].values().sum();
            assert!((row - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn planner_rejects_bad_config() {
        let config = SignalingPlannerConfig {
            tolerance: 1e-6,
            gamma: 0.9,
            beta: 0.0,
            alpha: 5.0,
            max_sweeps: 100,
        };
        assert!(matches!(
            SignalingPlanner::new(config),
            Err(Error::InvalidParameter { name: "beta", .. })
        ));
    }
}
