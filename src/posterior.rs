//! Single-shot Bayesian update over two independent latent variables
//!
//! Isolated from the planning loop: it consumes a joint likelihood table for
//! one fixed observation, not a sequence.

use std::{collections::HashMap, fmt::Debug, hash::Hash};

use crate::error::{Error, Result};

/// Joint and marginal posteriors over two latent variables
#[derive(Debug, Clone)]
pub struct Posterior<A, B> {
    /// Normalized joint posterior `P(a, b | data)`
    pub joint: HashMap<(A, B), f64>,
    /// Marginal posterior `P(a | data)`
    pub marginal_a: HashMap<A, f64>,
    /// Marginal posterior `P(b | data)`
    pub marginal_b: HashMap<B, f64>,
    /// Normalizing constant `Σ likelihood(a, b)·prior(a)·prior(b)`
    pub evidence: f64,
}

/// Computes the posterior over two independent discrete variables given their
/// priors and a joint likelihood table keyed by (a, b)
///
/// The joint unnormalized weight is `likelihood(a, b)·prior(a)·prior(b)`;
/// dividing by its total yields the joint posterior, and summing rows and
/// columns yields the marginals.
///
/// Fails with [`Error::ModelMismatch`] if a likelihood key has no prior and
/// [`Error::DegenerateSignal`] if the evidence is zero.
pub fn posterior<A, B>(
    prior_a: &HashMap<A, f64>,
    prior_b: &HashMap<B, f64>,
    likelihood: &HashMap<(A, B), f64>,
) -> Result<Posterior<A, B>>
where
    A: Copy + Eq + Hash + Debug,
    B: Copy + Eq + Hash + Debug,
{
    let mut joint = HashMap::with_capacity(likelihood.len());
    for (&(a, b), &l) in likelihood {
        let &pa = prior_a.get(&a).ok_or_else(|| {
            Error::ModelMismatch(format!("likelihood key {a:?} has no prior over A"))
        })?;
        let &pb = prior_b.get(&b).ok_or_else(|| {
            Error::ModelMismatch(format!("likelihood key {b:?} has no prior over B"))
        })?;
        joint.insert((a, b), l * pa * pb);
    }

    let evidence: f64 = joint.values().sum();
    if evidence == 0.0 {
        return Err(Error::DegenerateSignal(
            "all joint weights are zero, the observation rules out every hypothesis".into(),
        ));
    }

    for w in joint.values_mut() {
        *w /= evidence;
    }

    let mut marginal_a: HashMap<A, f64> = HashMap::with_capacity(prior_a.len());
    let mut marginal_b: HashMap<B, f64> = HashMap::with_capacity(prior_b.len());
    for (&(a, b), &p) in &joint {
        *marginal_a.entry(a).or_insert(0.0) += p;
        *marginal_b.entry(b).or_insert(0.0) += p;
    }

    Ok(Posterior {
        joint,
        marginal_a,
        marginal_b,
        evidence,
    })
}
