use burn::optim::GradientsParams;
use burn::tensor::backend::AutodiffBackend;
use burn::tensor::{ElementConversion, Tensor};

use crate::error::PolicyError;
use crate::math::masked_softmax;
use crate::metrics::{ACTOR_LOSS, CRITIC_LOSS, MetricLogger, MetricRecord};
use crate::model::Model;
use crate::network::Network;
use crate::policy::{ActorCriticState, Policy};
use crate::transition::TransitionBatch;

const LOGGER_ENTRIES: &[&str] = &[ACTOR_LOSS, CRITIC_LOSS];

/// One-step bootstrapped actor-critic.
///
/// The critic regresses onto the TD target `r + gamma * V(s') * (1 - done)`;
/// the actor follows the advantage of that target over the critic's own
/// estimate. The target is detached on both terms, while the critic's own
/// prediction stays differentiable: standard TD regression.
pub struct ActorCriticPolicy<B, A, C>
where
    B: AutodiffBackend,
    B::Device: Default,
    A: Model<B>,
    C: Model<B>,
{
    actor: Network<B, A>,
    critic: Network<B, C>,
    discount_factor: f32,
    logger: Option<Box<dyn MetricLogger>>,
}

impl<B, A, C> ActorCriticPolicy<B, A, C>
where
    B: AutodiffBackend,
    B::Device: Default,
    A: Model<B>,
    C: Model<B>,
{
    pub fn new(actor: Network<B, A>, critic: Network<B, C>, discount_factor: f32) -> Self {
        Self {
            actor,
            critic,
            discount_factor,
            logger: None,
        }
    }
}

impl<B, A, C> Policy<B> for ActorCriticPolicy<B, A, C>
where
    B: AutodiffBackend,
    B::Device: Default,
    A: Model<B>,
    C: Model<B>,
{
    type Actor = A;
    type Params = (A, C);
    type State = ActorCriticState<B, A, C>;

    fn logger_entries(&self) -> &'static [&'static str] {
        LOGGER_ENTRIES
    }

    fn init_state(&self) -> Self::State {
        ActorCriticState {
            actor: self.actor.init_state(),
            critic: self.critic.init_state(),
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
        let (actor, critic) = params;
        let length = batch.len();

        let values = self
            .critic
            .batch_logits(critic, batch.observations())
            .reshape([length]);
        let next_values = self
            .critic
            .batch_logits(critic, batch.next_observations())
            .reshape([length]);

        let continues = batch.dones_tensor().ones_like() - batch.dones_tensor();
        let target =
            batch.rewards_tensor() + next_values * continues * self.discount_factor;

        // The bootstrap half is a constant of the regression; the critic's
        // own prediction is the quantity being fitted.
        let actor_advantage = target.clone().detach() - values.clone().detach();
        let critic_error = values - target.detach();

        let log_probabilities = self.actions_to_probabilities(actor, batch).log();
        let actor_loss = (log_probabilities * actor_advantage).mean().neg();
        let critic_loss = critic_error.powf_scalar(2.0).mean() * 0.5;
        let loss = actor_loss.clone() + critic_loss.clone();

        let metrics = vec![
            (ACTOR_LOSS, actor_loss.into_scalar().elem::<f32>()),
            (CRITIC_LOSS, critic_loss.into_scalar().elem::<f32>()),
        ];
        (loss, metrics)
    }

    fn update(
        &mut self,
        state: Self::State,
        batch: &TransitionBatch<B>,
    ) -> Result<Self::State, PolicyError> {
        let params = (state.actor.model.clone(), state.critic.model.clone());
        let (loss, metrics) = self.compute_loss(&params, batch);

        // One differentiation pass; the gradients are then split per network
        // for two independent optimizer steps.
        let mut gradients = loss.backward();
        let actor_gradients = GradientsParams::from_module(&mut gradients, &params.0);
        let critic_gradients = GradientsParams::from_module(&mut gradients, &params.1);

        let actor = self.actor.update(state.actor, actor_gradients)?;
        let critic = self.critic.update(state.critic, critic_gradients)?;
        if let Some(logger) = self.logger.as_mut() {
            logger.record(&metrics);
        }
        Ok(ActorCriticState { actor, critic })
    }

    fn set_logger(&mut self, logger: Box<dyn MetricLogger>) {
        self.logger = Some(logger);
    }
}
