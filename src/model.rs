//! The opaque model capability consumed by [`crate::network::Network`].

use burn::module::Module;
use burn::nn::{Linear, LinearConfig};
use burn::tensor::activation::relu;
use burn::tensor::backend::{AutodiffBackend, Backend};
use burn::tensor::Tensor;

/// A differentiable architecture evaluated one batch at a time.
///
/// `forward` maps `[batch, features]` to `[batch, outputs]` with no coupling
/// between rows: the output must be identical to evaluating each row on its
/// own. Actor models emit one logit per action, critic models a single
/// scalar per row.
pub trait Model<B: AutodiffBackend>: burn::module::AutodiffModule<B> {
    fn forward(&self, input: Tensor<B, 2>) -> Tensor<B, 2>;
}

/// Parameterless pass-through model backing [`crate::policy::RandomPolicy`].
#[derive(Module, Clone, Debug, Default)]
pub struct Identity;

impl<B: AutodiffBackend> Model<B> for Identity {
    fn forward(&self, input: Tensor<B, 2>) -> Tensor<B, 2> {
        input
    }
}

pub const DEFAULT_HIDDEN: usize = 64;
pub const DEFAULT_STACK: usize = 2;

/// Stacked `Linear`/ReLU reference architecture.
///
/// Concrete architectures are a collaborator concern; this one exists so the
/// crate can be exercised end to end without an external model.
#[derive(Module, Debug)]
pub struct Mlp<B: Backend> {
    stack: Vec<Linear<B>>,
    output: Linear<B>,
}

impl<B> Mlp<B>
where
    B: Backend,
    B::Device: Default,
{
    pub fn new(inputs: usize, hidden: usize, stack_depth: usize, outputs: usize) -> Self {
        assert!(stack_depth > 0, "stack depth must be positive");
        let device = B::Device::default();
        let mut stack = Vec::with_capacity(stack_depth);
        let mut input_size = inputs;
        for _ in 0..stack_depth {
            stack.push(LinearConfig::new(input_size, hidden).init(&device));
            input_size = hidden;
        }
        let output = LinearConfig::new(input_size, outputs).init(&device);
        Self { stack, output }
    }

    /// Actor-shaped network: one logit per action.
    pub fn actor(inputs: usize, actions: usize) -> Self {
        Self::new(inputs, DEFAULT_HIDDEN, DEFAULT_STACK, actions)
    }

    /// Critic-shaped network: a single state-value output.
    pub fn critic(inputs: usize) -> Self {
        Self::new(inputs, DEFAULT_HIDDEN, DEFAULT_STACK, 1)
    }
}

impl<B: AutodiffBackend> Model<B> for Mlp<B> {
    fn forward(&self, input: Tensor<B, 2>) -> Tensor<B, 2> {
        let mut activations = input;
        for layer in &self.stack {
            activations = relu(layer.forward(activations));
        }
        self.output.forward(activations)
    }
}
