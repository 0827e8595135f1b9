use burn::optim::GradientsParams;
use burn::tensor::backend::AutodiffBackend;
use burn::tensor::{ElementConversion, Tensor};

use crate::error::PolicyError;
use crate::math::{discounted_returns_tensor, masked_softmax};
use crate::metrics::{ACTOR_LOSS, MetricLogger, MetricRecord};
use crate::model::Model;
use crate::network::Network;
use crate::policy::{ActorPolicyState, Policy};
use crate::transition::TransitionBatch;

const LOGGER_ENTRIES: &[&str] = &[ACTOR_LOSS];

/// REINFORCE: single-network Monte-Carlo policy gradient.
///
/// Loss is the negative mean of `G * log pi(a | s)` where `G` is the
/// discounted return of each visited step.
pub struct ReinforcePolicy<B, A>
where
    B: AutodiffBackend,
    B::Device: Default,
    A: Model<B>,
{
    actor: Network<B, A>,
    discount_factor: f32,
    logger: Option<Box<dyn MetricLogger>>,
}

impl<B, A> ReinforcePolicy<B, A>
where
    B: AutodiffBackend,
    B::Device: Default,
    A: Model<B>,
{
    pub fn new(actor: Network<B, A>, discount_factor: f32) -> Self {
        Self {
            actor,
            discount_factor,
            logger: None,
        }
    }
}

impl<B, A> Policy<B> for ReinforcePolicy<B, A>
where
    B: AutodiffBackend,
    B::Device: Default,
    A: Model<B>,
{
    type Actor = A;
    type Params = A;
    type State = ActorPolicyState<B, A>;

    fn logger_entries(&self) -> &'static [&'static str] {
        LOGGER_ENTRIES
    }

    fn init_state(&self) -> Self::State {
        ActorPolicyState {
            actor: self.actor.init_state(),
        }
    }

    fn actor_model<'a>(&self, state: &'a Self::State) -> &'a Self::Actor {
        &state.actor.model
    }

    fn action_probabilities(
        &self,
        actor: &Self::Actor,
        observation: Tensor<B, 1>,
        action_mask: Tensor<B, 1>,
    ) -> Tensor<B, 1> {
        masked_softmax(self.actor.logits(actor, observation), action_mask)
    }

    fn compute_loss(
        &self,
        params: &Self::Params,
        batch: &TransitionBatch<B>,
    ) -> (Tensor<B, 1>, MetricRecord) {
        let returns = discounted_returns_tensor::<B>(
            batch.rewards(),
            batch.dones(),
            self.discount_factor,
            &batch.device(),
        );
        let log_probabilities = self.actions_to_probabilities(params, batch).log();
        let loss = (log_probabilities * returns).mean().neg();
        let actor_loss = loss.clone().into_scalar().elem::<f32>();
        (loss, vec![(ACTOR_LOSS, actor_loss)])
    }

    fn update(
        &mut self,
        state: Self::State,
        batch: &TransitionBatch<B>,
    ) -> Result<Self::State, PolicyError> {
        let (loss, metrics) = self.compute_loss(&state.actor.model, batch);
        let gradients = GradientsParams::from_grads(loss.backward(), &state.actor.model);
        let actor = self.actor.update(state.actor, gradients)?;
        if let Some(logger) = self.logger.as_mut() {
            logger.record(&metrics);
        }
        Ok(ActorPolicyState { actor })
    }

    fn set_logger(&mut self, logger: Box<dyn MetricLogger>) {
        self.logger = Some(logger);
    }
}
