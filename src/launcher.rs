//! In-process worker cluster around one shared parameter store.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::task::JoinSet;
use tracing::{error, info};
use uuid::Uuid;

use crate::config::AppConfig;
use crate::controller::{Dispatch, TemporalController};
use crate::data::SimulatedFeed;
use crate::error::{Result, TemporaError};
use crate::exec::{InProcessSession, ParameterStore, StandardFeedBuilder};
use crate::summary::LogSink;

/// Per-worker tally of one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerReport {
    pub task: usize,
    pub processed: usize,
    pub trained: usize,
    pub evaluated: usize,
    pub skipped: usize,
    pub train_batches: usize,
    pub reward_sum: f32,
    pub last_global_timestamp: i64,
}

impl WorkerReport {
    fn new(task: usize) -> Self {
        Self {
            task,
            processed: 0,
            trained: 0,
            evaluated: 0,
            skipped: 0,
            train_batches: 0,
            reward_sum: 0.0,
            last_global_timestamp: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub global_step: u64,
    pub workers: Vec<WorkerReport>,
}

/// Spawns N workers (task 0 is the chief) over a shared parameter store
/// and joins them. Each worker owns an independent controller; the store
/// is the only coordination point.
pub struct Launcher {
    config: AppConfig,
}

impl Launcher {
    pub fn new(config: AppConfig) -> Result<Self> {
        config
            .validate()
            .map_err(|errors| TemporaError::InvalidConfig(errors.join("; ")))?;
        Ok(Self { config })
    }

    pub async fn run(&self) -> Result<RunReport> {
        let run_id = Uuid::new_v4();
        let dim = self.config.session.obs_dim * self.config.session.num_actions;
        let store = Arc::new(ParameterStore::new(dim));

        info!(
            %run_id,
            workers = self.config.launcher.num_workers,
            episodes_per_worker = self.config.launcher.episodes_per_worker,
            "launching in-process training cluster"
        );

        let mut set: JoinSet<Result<WorkerReport>> = JoinSet::new();
        for task in 0..self.config.launcher.num_workers {
            let config = self.config.clone();
            let store = store.clone();
            set.spawn_blocking(move || run_worker(task, &config, store));
        }

        let mut workers = Vec::new();
        while let Some(joined) = set.join_next().await {
            let report = joined.map_err(|e| TemporaError::Worker(e.to_string()))??;
            workers.push(report);
        }
        workers.sort_by_key(|w| w.task);

        let report = RunReport {
            run_id,
            global_step: store.global_step(),
            workers,
        };
        info!(%run_id, global_step = report.global_step, "training cluster finished");
        Ok(report)
    }
}

/// Blocking worker loop: build a controller over the shared store and run
/// the configured number of `process()` calls.
fn run_worker(task: usize, config: &AppConfig, store: Arc<ParameterStore>) -> Result<WorkerReport> {
    let mut sim = config.sim.clone();
    sim.seed = sim.seed.wrapping_add(task as u64);

    let session = InProcessSession::new(&config.session, store)?;
    let provider = SimulatedFeed::new(sim);
    let mut controller = TemporalController::new(
        task,
        &config.controller,
        Box::new(session),
        Box::new(provider),
        Box::new(StandardFeedBuilder::new(config.session.obs_dim)),
        Box::new(LogSink),
    )?;

    let mut report = WorkerReport::new(task);
    for _ in 0..config.launcher.episodes_per_worker {
        match controller.process() {
            Ok(Dispatch::Trained(train)) => {
                report.trained += 1;
                report.train_batches += train.batches;
                report.reward_sum += train.reward_sum;
            }
            Ok(Dispatch::Evaluated(test)) => {
                report.evaluated += 1;
                report.last_global_timestamp = test.global_timestamp;
            }
            Ok(Dispatch::Skipped) => report.skipped += 1,
            Err(e) => {
                error!(task, error = %e, "worker aborting");
                return Err(e);
            }
        }
        report.processed += 1;
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SourceTargetCycle;

    fn small_config(workers: usize) -> AppConfig {
        let mut config = AppConfig::default();
        config.controller.trial_cycle = SourceTargetCycle {
            source: 2,
            target: 1,
        };
        config.sim.episode_len = 10;
        config.sim.rollout_len = 5;
        config.launcher.num_workers = workers;
        config.launcher.episodes_per_worker = 6;
        config
    }

    #[tokio::test]
    async fn test_cluster_roles_and_global_step() {
        let launcher = Launcher::new(small_config(3)).unwrap();
        let report = launcher.run().await.unwrap();

        assert_eq!(report.workers.len(), 3);
        let chief = &report.workers[0];
        assert_eq!(chief.task, 0);
        assert_eq!(chief.evaluated, 6);
        assert_eq!(chief.trained, 0);
        assert!(chief.last_global_timestamp > 0);

        let mut train_batches = 0;
        for worker in &report.workers[1..] {
            assert_eq!(worker.evaluated, 0);
            assert!(worker.trained > 0);
            assert!(worker.skipped > 0);
            assert_eq!(
                worker.trained + worker.skipped,
                worker.processed
            );
            train_batches += worker.train_batches;
        }

        // One gradient update per train batch, counted on the shared store.
        assert_eq!(report.global_step, train_batches as u64);
    }

    #[tokio::test]
    async fn test_launcher_rejects_invalid_config() {
        let mut config = small_config(1);
        config.launcher.num_workers = 0;
        assert!(Launcher::new(config).is_err());
    }
}
