//! Numeric building blocks shared by the concrete policies.
//!
//! Both algorithms here are deliberately standalone functions so that the
//! REINFORCE-with-baseline policy can compose the actor-critic forward pass
//! with the Monte-Carlo return scan without duplicating either.

use burn::tensor::activation::softmax;
use burn::tensor::{Tensor, TensorData, backend::Backend};

/// Softmax restricted to the legal entries of `mask` (1 = legal, 0 = forbidden).
///
/// Forbidden logits are set to negative infinity before the softmax, and the
/// corresponding probabilities are forced back to exactly zero afterwards so
/// that floating-point rounding of `exp(-inf)` terms can never leak a tiny
/// probability onto a forbidden action.
///
/// Operates over the last dimension, so it accepts both a single `[actions]`
/// row and a `[batch, actions]` matrix. Rows whose mask is all zero produce
/// NaNs; callers must guarantee at least one legal action per row.
pub fn masked_softmax<B: Backend, const D: usize>(
    logits: Tensor<B, D>,
    mask: Tensor<B, D>,
) -> Tensor<B, D> {
    let forbidden = mask.equal_elem(0.0);
    let masked = logits.mask_fill(forbidden.clone(), f32::NEG_INFINITY);
    softmax(masked, D - 1).mask_fill(forbidden, 0.0)
}

/// Discounted return of every step of a trajectory batch.
///
/// The batch may concatenate several episodes back to back; `dones[i]` marks
/// the last step of an episode. The scan runs strictly from the last step to
/// the first, `G[i] = r[i] + discount * G[i+1] * (1 - done[i])`, with the
/// return past the end of the batch treated as zero. Resetting the running
/// return at every terminal step keeps value from one episode from leaking
/// into the previous one.
pub fn discounted_returns(rewards: &[f32], dones: &[bool], discount_factor: f32) -> Vec<f32> {
    let mut returns = vec![0.0; rewards.len()];
    let mut running = 0.0f32;
    for i in (0..rewards.len()).rev() {
        if dones[i] {
            running = 0.0;
        }
        running = rewards[i] + discount_factor * running;
        returns[i] = running;
    }
    returns
}

/// [`discounted_returns`] lifted to a rank-one tensor on `device`.
///
/// The result is a constant of the loss computation, never a function of the
/// parameters, so it carries no gradient.
pub fn discounted_returns_tensor<B: Backend>(
    rewards: &[f32],
    dones: &[bool],
    discount_factor: f32,
    device: &B::Device,
) -> Tensor<B, 1> {
    let returns = discounted_returns(rewards, dones, discount_factor);
    let length = returns.len();
    Tensor::from_data(TensorData::new(returns, [length]), device)
}
