use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, TemporaError};
use crate::schedule::SampleKind;

/// Sampling provenance stamped on every step by the data provider.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct StepMetadata {
    /// Market time of this step, epoch seconds
    pub timestamp: i64,
    pub trial_kind: SampleKind,
    pub episode_kind: SampleKind,
}

/// Broker account snapshot after a step.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BrokerState {
    /// Account value
    pub value: f64,
    /// Step index within the episode
    pub step: usize,
    /// Wall-aligned market time of the step
    pub time: DateTime<Utc>,
}

/// One environment step generated under the current policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RolloutStep {
    pub observation: Vec<f32>,
    pub action: usize,
    pub reward: f32,
    pub metadata: StepMetadata,
    pub broker: BrokerState,
}

/// A window of consecutive on-policy steps plus per-step terminal flags.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RolloutBatch {
    pub on_policy: Vec<RolloutStep>,
    pub terminal: Vec<bool>,
}

impl RolloutBatch {
    pub fn len(&self) -> usize {
        self.on_policy.len()
    }

    pub fn is_empty(&self) -> bool {
        self.on_policy.is_empty()
    }

    /// The episode is done when any flag in the batch is set.
    pub fn is_terminal(&self) -> bool {
        self.terminal.iter().any(|t| *t)
    }

    pub fn total_reward(&self) -> f32 {
        self.on_policy.iter().map(|s| s.reward).sum()
    }

    /// Market time of the last step. An empty batch is a provider
    /// contract violation.
    pub fn last_timestamp(&self) -> Result<i64> {
        self.on_policy
            .last()
            .map(|s| s.metadata.timestamp)
            .ok_or(TemporaError::EmptyBatch)
    }

    pub fn final_broker(&self) -> Result<&BrokerState> {
        self.on_policy
            .last()
            .map(|s| &s.broker)
            .ok_or(TemporaError::EmptyBatch)
    }
}
