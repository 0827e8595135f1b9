//! Network/optimizer wrapper with functional state handling.
//!
//! The wrapper itself is immutable after construction: it owns the cached
//! initial model and the optimizer *configuration*. Everything that changes
//! while training lives in [`NetworkState`], which is consumed and replaced
//! wholesale by every [`Network::update`] call.

use std::marker::PhantomData;

use burn::grad_clipping::GradientClippingConfig;
use burn::optim::adaptor::OptimizerAdaptor;
use burn::optim::{Adam, AdamConfig, GradientsParams, LearningRate, Optimizer};
use burn::tensor::Tensor;
use burn::tensor::backend::AutodiffBackend;

use crate::error::PolicyError;
use crate::model::Model;

/// Global-norm bound applied to every gradient step before Adam.
pub const GRADIENT_CLIP_NORM: f32 = 10.0;
/// Lower bound of the decayed learning rate (never above the nominal rate).
pub const LEARNING_RATE_FLOOR: LearningRate = 1.0e-5;

/// Adam state for one network, keyed by parameter id.
pub type AdamState<M, B> = <OptimizerAdaptor<Adam, M, B> as Optimizer<M, B>>::Record;

/// Numeric state of one network: the parameters, the optimizer accumulators
/// and the schedule step counter. One [`Network`] owns one lineage of these;
/// values are never mutated in place.
pub struct NetworkState<B, M>
where
    B: AutodiffBackend,
    M: Model<B>,
{
    pub model: M,
    pub optimizer: AdamState<M, B>,
    pub step: usize,
}

/// Owns a model's static structure and its optimizer definition, and exposes
/// pure forward-pass and update operations over [`NetworkState`] values.
pub struct Network<B, M>
where
    B: AutodiffBackend,
    M: Model<B>,
{
    init_model: M,
    optimizer: AdamConfig,
    learning_rate: LearningRate,
    lr_decay: Option<usize>,
    backend: PhantomData<B>,
}

impl<B, M> Network<B, M>
where
    B: AutodiffBackend,
    M: Model<B>,
{
    /// Wraps `model` with a clip-then-Adam optimizer chain.
    ///
    /// When `lr_decay` is given, the learning rate halves every `lr_decay`
    /// optimizer steps, floored at `min(learning_rate, 1e-5)`; otherwise it
    /// stays constant.
    pub fn new(model: M, learning_rate: LearningRate, lr_decay: Option<usize>) -> Self {
        let optimizer = AdamConfig::new()
            .with_grad_clipping(Some(GradientClippingConfig::Norm(GRADIENT_CLIP_NORM)));
        Self {
            init_model: model,
            optimizer,
            learning_rate,
            lr_decay,
            backend: PhantomData,
        }
    }

    /// Fresh initial state. Repeated calls return equivalent values with
    /// independent lineages; updating one never affects another.
    pub fn init_state(&self) -> NetworkState<B, M> {
        let optimizer: OptimizerAdaptor<Adam, M, B> = self.optimizer.init();
        NetworkState {
            model: self.init_model.clone(),
            optimizer: optimizer.to_record(),
            step: 0,
        }
    }

    /// Evaluates the model on one unbatched input.
    pub fn logits(&self, model: &M, input: Tensor<B, 1>) -> Tensor<B, 1> {
        let output = model.forward(input.unsqueeze_dim::<2>(0));
        let [_, width] = output.dims();
        output.reshape([width])
    }

    /// Evaluates the model on a `[batch, features]` input. Rows are
    /// independent: the result equals calling [`Self::logits`] per row.
    pub fn batch_logits(&self, model: &M, inputs: Tensor<B, 2>) -> Tensor<B, 2> {
        model.forward(inputs)
    }

    /// Learning rate in effect at schedule step `step`.
    pub fn learning_rate_at(&self, step: usize) -> LearningRate {
        match self.lr_decay {
            None => self.learning_rate,
            Some(decay_steps) => {
                let floor = self.learning_rate.min(LEARNING_RATE_FLOOR);
                let decayed =
                    self.learning_rate * 0.5f64.powf(step as f64 / decay_steps as f64);
                decayed.max(floor)
            }
        }
    }

    /// Applies one optimizer step to `gradients`, producing the successor
    /// state. `state` is consumed, never mutated: the previous value stays
    /// valid wherever the caller kept a copy of it.
    pub fn update(
        &self,
        state: NetworkState<B, M>,
        gradients: GradientsParams,
    ) -> Result<NetworkState<B, M>, PolicyError> {
        if gradients.len() == 0 && state.model.num_params() > 0 {
            return Err(PolicyError::StructureMismatch);
        }
        let optimizer: OptimizerAdaptor<Adam, M, B> = self.optimizer.init();
        let mut optimizer = optimizer.load_record(state.optimizer);
        let learning_rate = self.learning_rate_at(state.step);
        let model = optimizer.step(learning_rate, state.model, gradients);
        Ok(NetworkState {
            model,
            optimizer: optimizer.to_record(),
            step: state.step + 1,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::tensor::TensorData;
    use burn_autodiff::Autodiff;
    use burn_ndarray::NdArray;

    use crate::model::Mlp;

    type Backend = Autodiff<NdArray<f32>>;

    fn probe(network: &Network<Backend, Mlp<Backend>>, model: &Mlp<Backend>) -> Vec<f32> {
        let input = Tensor::<Backend, 1>::from_data(
            TensorData::from([0.3f32, -0.7, 0.1, 0.9]),
            &Default::default(),
        );
        network
            .logits(model, input)
            .into_data()
            .to_vec::<f32>()
            .expect("logits")
    }

    fn step_once(
        network: &Network<Backend, Mlp<Backend>>,
        state: NetworkState<Backend, Mlp<Backend>>,
    ) -> NetworkState<Backend, Mlp<Backend>> {
        let inputs = Tensor::<Backend, 2>::ones([2, 4], &Default::default());
        let loss = network.batch_logits(&state.model, inputs).sum();
        let gradients = GradientsParams::from_grads(loss.backward(), &state.model);
        network.update(state, gradients).expect("update")
    }

    #[test]
    fn init_states_are_equivalent_but_independent() {
        let network = Network::<Backend, _>::new(Mlp::actor(4, 3), 1.0e-2, None);
        let first = network.init_state();
        let second = network.init_state();
        assert_eq!(probe(&network, &first.model), probe(&network, &second.model));

        let before = probe(&network, &second.model);
        let updated_first = step_once(&network, first);
        assert_ne!(probe(&network, &updated_first.model), before);
        // The sibling lineage is untouched by the other lineage's update.
        assert_eq!(probe(&network, &second.model), before);
    }

    #[test]
    fn update_advances_step_and_changes_parameters() {
        let network = Network::<Backend, _>::new(Mlp::actor(4, 3), 1.0e-2, None);
        let state = network.init_state();
        let before = probe(&network, &state.model);
        let updated = step_once(&network, state);
        assert_eq!(updated.step, 1);
        assert_ne!(probe(&network, &updated.model), before);
    }

    #[test]
    fn empty_gradients_are_a_structure_mismatch() {
        let network = Network::<Backend, _>::new(Mlp::actor(4, 3), 1.0e-2, None);
        let state = network.init_state();
        let result = network.update(state, GradientsParams::new());
        assert!(matches!(result, Err(PolicyError::StructureMismatch)));
    }

    #[test]
    fn constant_rate_without_decay() {
        let network = Network::<Backend, _>::new(Mlp::actor(4, 3), 3.0e-4, None);
        assert_eq!(network.learning_rate_at(0), 3.0e-4);
        assert_eq!(network.learning_rate_at(10_000), 3.0e-4);
    }

    #[test]
    fn decay_halves_over_the_decay_interval_and_hits_the_floor() {
        let network = Network::<Backend, _>::new(Mlp::actor(4, 3), 1.0e-3, Some(100));
        assert_eq!(network.learning_rate_at(0), 1.0e-3);
        let halved = network.learning_rate_at(100);
        assert!((halved - 5.0e-4).abs() < 1.0e-12);
        // After enough halvings the schedule bottoms out at the floor.
        assert_eq!(network.learning_rate_at(100_000), LEARNING_RATE_FLOOR);
    }

    #[test]
    fn floor_never_exceeds_the_nominal_rate() {
        let network = Network::<Backend, _>::new(Mlp::actor(4, 3), 1.0e-6, Some(10));
        assert_eq!(network.learning_rate_at(1_000_000), 1.0e-6);
    }
}
