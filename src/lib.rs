//! Planning for discrete MDPs whose policies double as a signal: solve each
//! candidate goal with value iteration, derive softmax goal policies, then
//! reshape the true goal's reward so replanned behavior also tells an
//! observer which goal is being pursued.

/// Error types
pub mod error;

/// Gridworld construction for tests and demos
pub mod grid;

/// MDP model types and validation
pub mod model;

/// Single-shot posterior updater
pub mod posterior;

/// Trajectory sampling
pub mod rollout;

/// Goal-signaling reward shaping and the plan/reshape/replan pipeline
pub mod signal;

/// Value iteration, Q-values, and softmax policies
pub mod solve;

pub use error::{Error, Result};
