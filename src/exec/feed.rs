use crate::data::RolloutBatch;
use crate::error::{Result, TemporaError};

/// Named flat arrays handed to the execution session for one train step.
#[derive(Debug, Clone)]
pub struct TrainFeed {
    /// Row-major observations, `len * obs_dim`
    pub observations: Vec<f32>,
    pub obs_dim: usize,
    pub actions: Vec<usize>,
    pub rewards: Vec<f32>,
    /// 1.0 where the step is terminal
    pub terminal_mask: Vec<f32>,
    pub is_train: bool,
}

impl TrainFeed {
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn observation(&self, index: usize) -> &[f32] {
        &self.observations[index * self.obs_dim..(index + 1) * self.obs_dim]
    }
}

/// Converts a raw rollout batch into a tensor-shaped feed.
pub trait FeedBuilder {
    fn build(&self, batch: &RolloutBatch, is_train: bool) -> Result<TrainFeed>;
}

pub struct StandardFeedBuilder {
    obs_dim: usize,
}

impl StandardFeedBuilder {
    pub fn new(obs_dim: usize) -> Self {
        Self { obs_dim }
    }
}

impl FeedBuilder for StandardFeedBuilder {
    fn build(&self, batch: &RolloutBatch, is_train: bool) -> Result<TrainFeed> {
        if batch.is_empty() {
            return Err(TemporaError::EmptyBatch);
        }

        let mut observations = Vec::with_capacity(batch.len() * self.obs_dim);
        let mut actions = Vec::with_capacity(batch.len());
        let mut rewards = Vec::with_capacity(batch.len());

        for step in &batch.on_policy {
            if step.observation.len() != self.obs_dim {
                return Err(TemporaError::Provider(format!(
                    "step observation has {} values, feed expects {}",
                    step.observation.len(),
                    self.obs_dim
                )));
            }
            observations.extend_from_slice(&step.observation);
            actions.push(step.action);
            rewards.push(step.reward);
        }

        let terminal_mask = batch
            .terminal
            .iter()
            .map(|t| if *t { 1.0 } else { 0.0 })
            .collect();

        Ok(TrainFeed {
            observations,
            obs_dim: self.obs_dim,
            actions,
            rewards,
            terminal_mask,
            is_train,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{BrokerState, RolloutStep, StepMetadata};
    use crate::schedule::SampleKind;
    use chrono::DateTime;

    fn batch_of(observations: Vec<Vec<f32>>, terminal: Vec<bool>) -> RolloutBatch {
        let on_policy = observations
            .into_iter()
            .enumerate()
            .map(|(i, observation)| RolloutStep {
                observation,
                action: i % 3,
                reward: i as f32,
                metadata: StepMetadata {
                    timestamp: 100 + i as i64,
                    trial_kind: SampleKind::Train,
                    episode_kind: SampleKind::Test,
                },
                broker: BrokerState {
                    value: 10_000.0,
                    step: i + 1,
                    time: DateTime::UNIX_EPOCH,
                },
            })
            .collect();
        RolloutBatch {
            on_policy,
            terminal,
        }
    }

    #[test]
    fn test_build_flattens_batch() {
        let batch = batch_of(
            vec![vec![1.0, 2.0], vec![3.0, 4.0], vec![5.0, 6.0]],
            vec![false, false, true],
        );
        let feed = StandardFeedBuilder::new(2).build(&batch, true).unwrap();

        assert_eq!(feed.len(), 3);
        assert!(feed.is_train);
        assert_eq!(feed.observations, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        assert_eq!(feed.observation(1), &[3.0, 4.0]);
        assert_eq!(feed.actions, vec![0, 1, 2]);
        assert_eq!(feed.terminal_mask, vec![0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_build_rejects_empty_and_misshapen_batches() {
        let builder = StandardFeedBuilder::new(2);
        assert!(matches!(
            builder.build(&RolloutBatch::default(), true),
            Err(TemporaError::EmptyBatch)
        ));

        let batch = batch_of(vec![vec![1.0, 2.0, 3.0]], vec![false]);
        assert!(builder.build(&batch, true).is_err());
    }
}
