use burn::tensor::backend::AutodiffBackend;
use burn::tensor::{ElementConversion, Tensor};

use crate::error::PolicyError;
use crate::metrics::{MetricLogger, MetricRecord};
use crate::model::Identity;
use crate::network::Network;
use crate::policy::{ActorPolicyState, Policy};
use crate::transition::TransitionBatch;

/// Uniform-over-legal-actions baseline.
///
/// Holds an identity network purely for API compatibility with the trainer;
/// nothing is learned and `update` returns the input state unchanged.
pub struct RandomPolicy<B>
where
    B: AutodiffBackend,
    B::Device: Default,
{
    network: Network<B, Identity>,
}

impl<B> RandomPolicy<B>
where
    B: AutodiffBackend,
    B::Device: Default,
{
    pub fn new() -> Self {
        Self {
            network: Network::new(Identity, 1.0e-3, None),
        }
    }
}

impl<B> Default for RandomPolicy<B>
where
    B: AutodiffBackend,
    B::Device: Default,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<B> Policy<B> for RandomPolicy<B>
where
    B: AutodiffBackend,
    B::Device: Default,
{
    type Actor = Identity;
    type Params = Identity;
    type State = ActorPolicyState<B, Identity>;

    fn logger_entries(&self) -> &'static [&'static str] {
        &[]
    }

    fn init_state(&self) -> Self::State {
        ActorPolicyState {
            actor: self.network.init_state(),
        }
    }

    fn actor_model<'a>(&self, state: &'a Self::State) -> &'a Self::Actor {
        &state.actor.model
    }

    /// The mask normalized to a uniform distribution over legal actions.
    fn action_probabilities(
        &self,
        _actor: &Self::Actor,
        _observation: Tensor<B, 1>,
        action_mask: Tensor<B, 1>,
    ) -> Tensor<B, 1> {
        let legal_count = action_mask.clone().sum().into_scalar().elem::<f32>();
        action_mask.div_scalar(legal_count)
    }

    fn actions_to_probabilities(
        &self,
        _actor: &Self::Actor,
        batch: &TransitionBatch<B>,
    ) -> Tensor<B, 1> {
        let masks = batch.action_masks();
        let legal_counts = masks.clone().sum_dim(1);
        let probabilities = masks / legal_counts;
        let indices = batch.actions().unsqueeze_dim::<2>(1);
        let length = batch.len();
        probabilities.gather(1, indices).reshape([length])
    }

    fn compute_loss(
        &self,
        _params: &Self::Params,
        batch: &TransitionBatch<B>,
    ) -> (Tensor<B, 1>, MetricRecord) {
        (Tensor::zeros([1], &batch.device()), Vec::new())
    }

    fn update(
        &mut self,
        state: Self::State,
        _batch: &TransitionBatch<B>,
    ) -> Result<Self::State, PolicyError> {
        Ok(state)
    }

    fn set_logger(&mut self, _logger: Box<dyn MetricLogger>) {
        // Declares no entries and emits nothing.
    }
}
