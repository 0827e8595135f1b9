use burn::optim::GradientsParams;
use burn::tensor::backend::AutodiffBackend;
use burn::tensor::{ElementConversion, Tensor};

use crate::error::PolicyError;
use crate::math::{discounted_returns_tensor, masked_softmax};
use crate::metrics::{ACTOR_LOSS, MetricLogger, MetricRecord, VALUE_NETWORK_LOSS};
use crate::model::Model;
use crate::network::Network;
use crate::policy::{ActorCriticState, Policy};
use crate::transition::TransitionBatch;

const LOGGER_ENTRIES: &[&str] = &[ACTOR_LOSS, VALUE_NETWORK_LOSS];

/// REINFORCE with a learned baseline.
///
/// Same two-network shape as the actor-critic policy, but the advantage is
/// the Monte-Carlo return `G` minus the value estimate instead of a
/// bootstrapped target: it composes the masked-softmax forward pass with the
/// reverse-scan return computation rather than re-deriving either.
pub struct ReinforceBaselinePolicy<B, A, C>
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

impl<B, A, C> ReinforceBaselinePolicy<B, A, C>
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

impl<B, A, C> Policy<B> for ReinforceBaselinePolicy<B, A, C>
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

        let returns = discounted_returns_tensor::<B>(
            batch.rewards(),
            batch.dones(),
            self.discount_factor,
            &batch.device(),
        );
        let values = self
            .critic
            .batch_logits(critic, batch.observations())
            .reshape([length]);

        // The baseline is a constant for the actor; the value network itself
        // regresses onto G with its prediction left differentiable.
        let advantage = returns.clone() - values.clone().detach();
        let log_probabilities = self.actions_to_probabilities(actor, batch).log();
        let actor_loss = (log_probabilities * advantage).mean().neg();
        let value_loss = (returns - values).powf_scalar(2.0).mean();
        let loss = actor_loss.clone() + value_loss.clone();

        let metrics = vec![
            (ACTOR_LOSS, actor_loss.into_scalar().elem::<f32>()),
            (VALUE_NETWORK_LOSS, value_loss.into_scalar().elem::<f32>()),
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

#[cfg(test)]
mod tests {
    use super::*;
    use burn_autodiff::Autodiff;
    use burn_ndarray::NdArray;

    use crate::metrics::MemoryLogger;
    use crate::model::Mlp;
    use crate::transition::Transition;

    type Backend = Autodiff<NdArray<f32>>;

    const FEATURES: usize = 4;
    const ACTIONS: usize = 3;

    fn policy() -> ReinforceBaselinePolicy<Backend, Mlp<Backend>, Mlp<Backend>> {
        let actor = Network::new(Mlp::actor(FEATURES, ACTIONS), 1.0e-2, None);
        let critic = Network::new(Mlp::critic(FEATURES), 1.0e-2, None);
        ReinforceBaselinePolicy::new(actor, critic, 0.5)
    }

    fn two_episode_batch() -> TransitionBatch<Backend> {
        let rewards = [1.0, 1.0, 0.0, 2.0];
        let dones = [false, true, false, true];
        let steps: Vec<Transition> = rewards
            .iter()
            .zip(dones)
            .enumerate()
            .map(|(i, (&reward, done))| Transition {
                observation: vec![i as f32 * 0.25; FEATURES],
                action: i % ACTIONS,
                action_mask: vec![1.0; ACTIONS],
                reward,
                done,
                next_observation: vec![(i + 1) as f32 * 0.25; FEATURES],
            })
            .collect();
        TransitionBatch::from_steps(&steps).expect("batch")
    }

    #[test]
    fn loss_is_finite_across_episode_boundaries() {
        let policy = policy();
        let state = policy.init_state();
        let params = (state.actor.model.clone(), state.critic.model.clone());
        let (loss, metrics) = policy.compute_loss(&params, &two_episode_batch());
        assert!(loss.into_scalar().is_finite());
        assert_eq!(metrics[0].0, ACTOR_LOSS);
        assert_eq!(metrics[1].0, VALUE_NETWORK_LOSS);
    }

    #[test]
    fn update_steps_actor_and_value_network() {
        let mut policy = policy();
        let shared = std::sync::Arc::new(std::sync::Mutex::new(MemoryLogger::new()));
        policy.set_logger(Box::new(shared.clone()));
        let state = policy.init_state();
        let state = policy.update(state, &two_episode_batch()).expect("update");
        assert_eq!(state.actor.step, 1);
        assert_eq!(state.critic.step, 1);
        assert!(shared.lock().unwrap().last_value(VALUE_NETWORK_LOSS).is_some());
    }
}
