use std::sync::Arc;

use crate::config::SessionConfig;
use crate::error::{Result, TemporaError};
use crate::exec::feed::TrainFeed;
use crate::exec::policy::{LinearPolicy, Policy};
use crate::exec::store::ParameterStore;
use crate::summary::ModelSummary;

/// Outcome of one gradient-update step.
#[derive(Debug, Clone)]
pub struct TrainStepOutput {
    pub global_step: u64,
    pub model_summary: Option<ModelSummary>,
}

/// Executes weight synchronization and gradient updates against the
/// shared parameters.
pub trait ExecutionSession {
    /// Pull the latest shared weights into the local policy.
    fn sync_policy(&mut self) -> Result<()>;

    /// Apply one update from the feed, optionally also fetching a
    /// model-level summary.
    fn run_train_step(&mut self, feed: &TrainFeed, with_model_summary: bool)
        -> Result<TrainStepOutput>;

    fn global_step(&self) -> u64;

    fn policy(&self) -> &dyn Policy;
}

/// Store-backed session for in-process worker clusters.
///
/// The update rule is a reward-weighted score ascent on the linear policy;
/// the actual RL objective lives outside this crate, this session only has
/// to move weights and publish versions the way a real one would.
pub struct InProcessSession {
    store: Arc<ParameterStore>,
    policy: LinearPolicy,
    learning_rate: f32,
}

impl InProcessSession {
    pub fn new(config: &SessionConfig, store: Arc<ParameterStore>) -> Result<Self> {
        let policy = LinearPolicy::new(config.obs_dim, config.num_actions);
        if store.dim() != policy.weight_dim() {
            return Err(TemporaError::Session(format!(
                "store holds {} weights, session expects {}",
                store.dim(),
                policy.weight_dim()
            )));
        }
        Ok(Self {
            store,
            policy,
            learning_rate: config.learning_rate,
        })
    }
}

impl ExecutionSession for InProcessSession {
    fn sync_policy(&mut self) -> Result<()> {
        if self.policy.version() != self.store.version() {
            self.policy.load(&self.store.snapshot())?;
        }
        Ok(())
    }

    fn run_train_step(
        &mut self,
        feed: &TrainFeed,
        with_model_summary: bool,
    ) -> Result<TrainStepOutput> {
        if feed.is_empty() {
            return Err(TemporaError::EmptyBatch);
        }

        let mut delta = vec![0.0f32; self.policy.weight_dim()];
        let scale = self.learning_rate / feed.len() as f32;
        for i in 0..feed.len() {
            let action = feed.actions[i];
            let row = action * feed.obs_dim;
            if row + feed.obs_dim > delta.len() {
                return Err(TemporaError::Session(format!(
                    "action {action} out of range for {} weight rows",
                    delta.len() / feed.obs_dim
                )));
            }
            let reward = feed.rewards[i];
            for (j, x) in feed.observation(i).iter().enumerate() {
                delta[row + j] += scale * reward * x;
            }
        }

        let version = self.store.publish_delta(&delta)?;
        let global_step = self.store.increment_step();

        let model_summary = if with_model_summary {
            let delta_norm = delta.iter().map(|d| (*d as f64).powi(2)).sum::<f64>().sqrt();
            let reward_mean =
                feed.rewards.iter().map(|r| *r as f64).sum::<f64>() / feed.len() as f64;
            let mut summary = ModelSummary::new(global_step);
            summary.scalar("delta_norm", delta_norm);
            summary.scalar("reward_mean", reward_mean);
            summary.scalar("weights_version", version as f64);
            Some(summary)
        } else {
            None
        };

        Ok(TrainStepOutput {
            global_step,
            model_summary,
        })
    }

    fn global_step(&self) -> u64 {
        self.store.global_step()
    }

    fn policy(&self) -> &dyn Policy {
        &self.policy
    }
}
