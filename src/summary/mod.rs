//! Rollout and model summaries.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::data::RolloutBatch;
use crate::error::Result;
use crate::schedule::SampleKind;

/// Per-rollout metrics derived from a batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RolloutSummary {
    pub kind: SampleKind,
    pub steps: usize,
    pub reward_sum: f32,
    pub final_value: f64,
    pub final_step: usize,
    pub final_time: DateTime<Utc>,
    pub last_timestamp: i64,
    pub terminal: bool,
}

impl RolloutSummary {
    pub fn from_batch(batch: &RolloutBatch) -> Result<Self> {
        let broker = batch.final_broker()?;
        let last = batch.last_timestamp()?;
        let kind = batch
            .on_policy
            .last()
            .map(|s| s.metadata.trial_kind)
            .unwrap_or(SampleKind::Train);
        Ok(Self {
            kind,
            steps: batch.len(),
            reward_sum: batch.total_reward(),
            final_value: broker.value,
            final_step: broker.step,
            final_time: broker.time,
            last_timestamp: last,
            terminal: batch.is_terminal(),
        })
    }
}

/// Model-level scalars fetched alongside a train step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSummary {
    pub global_step: u64,
    pub scalars: BTreeMap<String, f64>,
}

impl ModelSummary {
    pub fn new(global_step: u64) -> Self {
        Self {
            global_step,
            scalars: BTreeMap::new(),
        }
    }

    pub fn scalar(&mut self, name: &str, value: f64) {
        self.scalars.insert(name.to_string(), value);
    }
}

/// Records rollout-level (always) and model-level (on cadence) summaries.
pub trait SummarySink {
    fn record_rollout(&self, batch: &RolloutBatch, model: Option<&ModelSummary>) -> Result<()>;
}

/// Sink that writes summaries to the log stream.
pub struct LogSink;

impl SummarySink for LogSink {
    fn record_rollout(&self, batch: &RolloutBatch, model: Option<&ModelSummary>) -> Result<()> {
        let summary = RolloutSummary::from_batch(batch)?;
        info!(
            kind = ?summary.kind,
            steps = summary.steps,
            reward_sum = summary.reward_sum,
            final_value = summary.final_value,
            terminal = summary.terminal,
            "rollout summary"
        );
        if let Some(model) = model {
            let scalars = serde_json::to_string(&model.scalars)?;
            info!(
                global_step = model.global_step,
                scalars = %scalars,
                "model summary"
            );
        }
        Ok(())
    }
}

/// One recorded summary entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryRecord {
    pub rollout: RolloutSummary,
    pub model: Option<ModelSummary>,
}

/// Introspectable sink backed by shared memory, for tests and reports.
#[derive(Clone, Default)]
pub struct MemorySink {
    records: Arc<Mutex<Vec<SummaryRecord>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<SummaryRecord> {
        match self.records.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn len(&self) -> usize {
        match self.records.lock() {
            Ok(guard) => guard.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SummarySink for MemorySink {
    fn record_rollout(&self, batch: &RolloutBatch, model: Option<&ModelSummary>) -> Result<()> {
        let record = SummaryRecord {
            rollout: RolloutSummary::from_batch(batch)?,
            model: model.cloned(),
        };
        match self.records.lock() {
            Ok(mut guard) => guard.push(record),
            Err(poisoned) => poisoned.into_inner().push(record),
        }
        Ok(())
    }
}
