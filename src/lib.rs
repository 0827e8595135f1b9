//! Policy-gradient agents for small discrete-action environments, built on
//! burn with functional parameter/optimizer-state handling.
//!
//! The trainer collaborator drives the loop: `init_state` once, then
//! repeated `sample_action` calls, then one `update` per collected batch of
//! transitions. Every state value is immutable; updates consume the old
//! state and return a new one.

pub mod error;
pub mod math;
pub mod metrics;
pub mod model;
pub mod network;
pub mod policy;
pub mod transition;

pub use crate::error::PolicyError;
pub use crate::math::{discounted_returns, discounted_returns_tensor, masked_softmax};
pub use crate::metrics::{
    ACTOR_LOSS, CRITIC_LOSS, MemoryLogger, MetricLogger, MetricRecord, VALUE_NETWORK_LOSS,
};
pub use crate::model::{DEFAULT_HIDDEN, DEFAULT_STACK, Identity, Mlp, Model};
pub use crate::network::{
    GRADIENT_CLIP_NORM, LEARNING_RATE_FLOOR, Network, NetworkState,
};
pub use crate::policy::{
    ActorCriticPolicy, ActorCriticState, ActorPolicyState, Policy, RandomPolicy,
    ReinforceBaselinePolicy, ReinforcePolicy,
};
pub use crate::transition::{Transition, TransitionBatch};
