//! Policy contract and its implementors.
//!
//! A policy owns its networks, discount factor and logger binding, but no
//! numeric state: that lives in the state value threaded through
//! [`Policy::update`], which consumes the old state and returns a new one.

mod actor_critic;
mod random;
mod reinforce;
mod reinforce_baseline;

pub use actor_critic::ActorCriticPolicy;
pub use random::RandomPolicy;
pub use reinforce::ReinforcePolicy;
pub use reinforce_baseline::ReinforceBaselinePolicy;

use burn::tensor::Tensor;
use burn::tensor::backend::AutodiffBackend;
use rand::Rng;
use rand::distributions::{Distribution, WeightedIndex};

use crate::error::PolicyError;
use crate::math::masked_softmax;
use crate::metrics::{MetricLogger, MetricRecord};
use crate::model::Model;
use crate::network::NetworkState;
use crate::transition::TransitionBatch;

/// State of a single-network policy: the actor network only.
pub struct ActorPolicyState<B, A>
where
    B: AutodiffBackend,
    A: Model<B>,
{
    pub actor: NetworkState<B, A>,
}

/// State of a two-network policy: actor plus critic (or value) network.
pub struct ActorCriticState<B, A, C>
where
    B: AutodiffBackend,
    A: Model<B>,
    C: Model<B>,
{
    pub actor: NetworkState<B, A>,
    pub critic: NetworkState<B, C>,
}

/// Common contract of every policy.
///
/// `Params` is whatever the loss is differentiated against: the actor model
/// alone, or an actor/critic pair.
pub trait Policy<B>
where
    B: AutodiffBackend,
    B::Device: Default,
{
    type Actor: Model<B>;
    type Params;
    type State;

    /// Metric keys this policy may emit, declared upfront so sinks can
    /// pre-register columns.
    fn logger_entries(&self) -> &'static [&'static str];

    /// Fresh initial state for the trainer.
    fn init_state(&self) -> Self::State;

    /// The actor model inside `state`, used by the default sampling path.
    fn actor_model<'a>(&self, state: &'a Self::State) -> &'a Self::Actor;

    /// Probability of every action for one unbatched observation.
    ///
    /// Entries where `action_mask` is 0 are exactly 0; the legal entries sum
    /// to 1. Precondition: at least one legal action, otherwise the result
    /// is NaN (see [`Policy::sample_action`] for the checked path).
    fn action_probabilities(
        &self,
        actor: &Self::Actor,
        observation: Tensor<B, 1>,
        action_mask: Tensor<B, 1>,
    ) -> Tensor<B, 1>;

    /// The optimization objective over one batch, plus the metrics to log.
    /// Metrics are informational only and never differentiated.
    fn compute_loss(
        &self,
        params: &Self::Params,
        batch: &TransitionBatch<B>,
    ) -> (Tensor<B, 1>, MetricRecord);

    /// Differentiates [`Policy::compute_loss`], applies one optimizer step
    /// per owned network, emits the metrics and returns the successor state.
    fn update(
        &mut self,
        state: Self::State,
        batch: &TransitionBatch<B>,
    ) -> Result<Self::State, PolicyError>;

    /// Binds the logging collaborator used by [`Policy::update`].
    fn set_logger(&mut self, logger: Box<dyn MetricLogger>);

    /// Draws one action from the masked categorical distribution.
    ///
    /// Deterministic for a fixed `rng` seed. The probabilities are
    /// renormalized by their masked sum before sampling, so the draw stays
    /// correct even if [`Policy::action_probabilities`] returned
    /// unnormalized values. A mask with no legal action is reported as
    /// [`PolicyError::InvalidMask`].
    fn sample_action<R: Rng>(
        &self,
        rng: &mut R,
        state: &Self::State,
        observation: Tensor<B, 1>,
        action_mask: Tensor<B, 1>,
    ) -> Result<usize, PolicyError> {
        let probabilities =
            self.action_probabilities(self.actor_model(state), observation, action_mask);
        let weights = probabilities
            .into_data()
            .convert::<f32>()
            .to_vec::<f32>()
            .unwrap_or_default();
        let total: f32 = weights.iter().sum();
        if !total.is_finite() || total <= 0.0 {
            return Err(PolicyError::InvalidMask);
        }
        let normalized: Vec<f32> = weights.iter().map(|weight| weight / total).collect();
        let distribution =
            WeightedIndex::new(&normalized).map_err(|_| PolicyError::InvalidMask)?;
        Ok(distribution.sample(rng))
    }

    /// Probability of each taken action in its own row, `[batch]`-aligned.
    ///
    /// Vectorized over the batch but numerically identical to evaluating
    /// [`Policy::action_probabilities`] row by row and selecting the taken
    /// action.
    fn actions_to_probabilities(
        &self,
        actor: &Self::Actor,
        batch: &TransitionBatch<B>,
    ) -> Tensor<B, 1> {
        let probabilities =
            masked_softmax(actor.forward(batch.observations()), batch.action_masks());
        let indices = batch.actions().unsqueeze_dim::<2>(1);
        let length = batch.len();
        probabilities.gather(1, indices).reshape([length])
    }
}
