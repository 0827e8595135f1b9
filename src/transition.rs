//! Trajectory steps as produced by the environment/trainer collaborator.

use burn::tensor::{Int, Tensor, TensorData, backend::Backend};

use crate::error::PolicyError;

/// One recorded environment step.
///
/// `action_mask` marks the actions that were legal in `observation`
/// (1 = legal, 0 = forbidden). `done` marks the last step of an episode.
#[derive(Clone, Debug, PartialEq)]
pub struct Transition {
    pub observation: Vec<f32>,
    pub action: usize,
    pub action_mask: Vec<f32>,
    pub reward: f32,
    pub done: bool,
    pub next_observation: Vec<f32>,
}

/// A validated batch of steps, temporal within each episode; several
/// episodes may follow each other back to back.
///
/// All shape checking happens here, before any numeric computation: the loss
/// code downstream can assume aligned, non-empty fields.
pub struct TransitionBatch<B: Backend> {
    observations: Tensor<B, 2>,
    actions: Tensor<B, 1, Int>,
    action_masks: Tensor<B, 2>,
    rewards: Tensor<B, 1>,
    dones: Tensor<B, 1>,
    next_observations: Tensor<B, 2>,
    rewards_raw: Vec<f32>,
    dones_raw: Vec<bool>,
    action_count: usize,
}

impl<B> TransitionBatch<B>
where
    B: Backend,
    B::Device: Default,
{
    pub fn from_steps(steps: &[Transition]) -> Result<Self, PolicyError> {
        let first = steps.first().ok_or(PolicyError::EmptyBatch)?;
        let feature_count = first.observation.len();
        let action_count = first.action_mask.len();

        let batch_size = steps.len();
        let mut observations = Vec::with_capacity(batch_size * feature_count);
        let mut actions = Vec::with_capacity(batch_size);
        let mut action_masks = Vec::with_capacity(batch_size * action_count);
        let mut rewards = Vec::with_capacity(batch_size);
        let mut dones = Vec::with_capacity(batch_size);
        let mut next_observations = Vec::with_capacity(batch_size * feature_count);

        for step in steps {
            Self::check_len("observation", feature_count, step.observation.len())?;
            Self::check_len("next_observation", feature_count, step.next_observation.len())?;
            Self::check_len("action_mask", action_count, step.action_mask.len())?;
            if step.action >= action_count {
                return Err(PolicyError::ShapeMismatch {
                    field: "action",
                    expected: action_count,
                    found: step.action,
                });
            }
            observations.extend_from_slice(&step.observation);
            actions.push(step.action as i32);
            action_masks.extend_from_slice(&step.action_mask);
            rewards.push(step.reward);
            dones.push(step.done);
            next_observations.extend_from_slice(&step.next_observation);
        }

        let device = B::Device::default();
        let done_flags: Vec<f32> = dones.iter().map(|&done| if done { 1.0 } else { 0.0 }).collect();
        Ok(Self {
            observations: Tensor::from_data(
                TensorData::new(observations, [batch_size, feature_count]),
                &device,
            ),
            actions: Tensor::from_data(
                TensorData::from(actions.as_slice()).convert::<B::IntElem>(),
                &device,
            ),
            action_masks: Tensor::from_data(
                TensorData::new(action_masks, [batch_size, action_count]),
                &device,
            ),
            rewards: Tensor::from_data(TensorData::new(rewards.clone(), [batch_size]), &device),
            dones: Tensor::from_data(TensorData::new(done_flags, [batch_size]), &device),
            next_observations: Tensor::from_data(
                TensorData::new(next_observations, [batch_size, feature_count]),
                &device,
            ),
            rewards_raw: rewards,
            dones_raw: dones,
            action_count,
        })
    }

    fn check_len(
        field: &'static str,
        expected: usize,
        found: usize,
    ) -> Result<(), PolicyError> {
        if expected == found {
            Ok(())
        } else {
            Err(PolicyError::ShapeMismatch {
                field,
                expected,
                found,
            })
        }
    }

    pub fn len(&self) -> usize {
        self.rewards_raw.len()
    }

    pub fn is_empty(&self) -> bool {
        // Always false: construction rejects empty batches.
        self.rewards_raw.is_empty()
    }

    pub fn action_count(&self) -> usize {
        self.action_count
    }

    pub fn device(&self) -> B::Device {
        self.observations.device()
    }

    /// `[batch, features]` observations.
    pub fn observations(&self) -> Tensor<B, 2> {
        self.observations.clone()
    }

    /// `[batch]` taken action indices.
    pub fn actions(&self) -> Tensor<B, 1, Int> {
        self.actions.clone()
    }

    /// `[batch, actions]` legality masks.
    pub fn action_masks(&self) -> Tensor<B, 2> {
        self.action_masks.clone()
    }

    /// `[batch]` rewards.
    pub fn rewards_tensor(&self) -> Tensor<B, 1> {
        self.rewards.clone()
    }

    /// `[batch]` termination flags as 0.0/1.0.
    pub fn dones_tensor(&self) -> Tensor<B, 1> {
        self.dones.clone()
    }

    /// `[batch, features]` successor observations.
    pub fn next_observations(&self) -> Tensor<B, 2> {
        self.next_observations.clone()
    }

    /// Raw rewards for the sequential return scan.
    pub fn rewards(&self) -> &[f32] {
        &self.rewards_raw
    }

    /// Raw termination flags for the sequential return scan.
    pub fn dones(&self) -> &[bool] {
        &self.dones_raw
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::NdArray;

    type Backend = NdArray<f32>;

    fn step(reward: f32, done: bool) -> Transition {
        Transition {
            observation: vec![0.0, 1.0, 2.0],
            action: 1,
            action_mask: vec![1.0, 1.0],
            reward,
            done,
            next_observation: vec![1.0, 2.0, 3.0],
        }
    }

    #[test]
    fn batch_exposes_aligned_tensors() {
        let steps = vec![step(1.0, false), step(-0.5, true)];
        let batch = TransitionBatch::<Backend>::from_steps(&steps).expect("batch");
        assert_eq!(batch.len(), 2);
        assert_eq!(batch.action_count(), 2);
        assert_eq!(batch.observations().shape().dims, [2, 3]);
        assert_eq!(batch.action_masks().shape().dims, [2, 2]);
        assert_eq!(batch.rewards(), &[1.0, -0.5]);
        assert_eq!(batch.dones(), &[false, true]);
        let dones = batch
            .dones_tensor()
            .into_data()
            .to_vec::<f32>()
            .expect("dones");
        assert_eq!(dones, vec![0.0, 1.0]);
    }

    #[test]
    fn empty_batch_is_rejected() {
        let result = TransitionBatch::<Backend>::from_steps(&[]);
        assert!(matches!(result, Err(PolicyError::EmptyBatch)));
    }

    #[test]
    fn ragged_observations_are_rejected() {
        let mut bad = step(0.0, false);
        bad.observation = vec![0.0; 5];
        let result = TransitionBatch::<Backend>::from_steps(&[step(0.0, false), bad]);
        assert!(matches!(
            result,
            Err(PolicyError::ShapeMismatch {
                field: "observation",
                expected: 3,
                found: 5,
            })
        ));
    }

    #[test]
    fn out_of_range_action_is_rejected() {
        let mut bad = step(0.0, false);
        bad.action = 7;
        let result = TransitionBatch::<Backend>::from_steps(&[bad]);
        assert!(matches!(
            result,
            Err(PolicyError::ShapeMismatch { field: "action", .. })
        ));
    }
}
