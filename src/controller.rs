//! Rollout dispatcher and train/test rollout loops.

use std::time::Instant;

use chrono::DateTime;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::ControllerConfig;
use crate::data::DataProvider;
use crate::error::{Result, TemporaError};
use crate::exec::{ExecutionSession, FeedBuilder};
use crate::schedule::{SamplePlan, TrialScheduler};
use crate::summary::SummarySink;

/// Outcome of one `process()` call.
#[derive(Debug, Clone)]
pub enum Dispatch {
    Trained(TrainReport),
    Evaluated(TestReport),
    /// Non-chief workers have no evaluation role; a test-typed plan is a
    /// no-op for them.
    Skipped,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestReport {
    pub batches: usize,
    pub final_value: f64,
    pub final_step: usize,
    pub wall_secs: f64,
    pub global_timestamp: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainReport {
    pub batches: usize,
    pub reward_sum: f32,
    pub global_step: u64,
}

/// Training-loop controller for one worker.
///
/// Decides what to sample next via the [`TrialScheduler`], drives the
/// rollout loop against the data provider until a terminal flag is
/// observed, and applies one gradient update per batch (training) or just
/// tracks metrics (testing). Any fault during construction or `process()`
/// is wrapped into [`TemporaError::Fatal`]; recovery is left to the
/// external process supervisor.
pub struct TemporalController {
    task: usize,
    scheduler: TrialScheduler,
    session: Box<dyn ExecutionSession + Send>,
    provider: Box<dyn DataProvider + Send>,
    feed_builder: Box<dyn FeedBuilder + Send>,
    summary: Box<dyn SummarySink + Send>,
    model_summary_freq: u64,
    local_steps: u64,
}

impl std::fmt::Debug for TemporalController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemporalController")
            .field("task", &self.task)
            .field("model_summary_freq", &self.model_summary_freq)
            .field("local_steps", &self.local_steps)
            .finish_non_exhaustive()
    }
}

impl TemporalController {
    pub fn new(
        task: usize,
        config: &ControllerConfig,
        session: Box<dyn ExecutionSession + Send>,
        provider: Box<dyn DataProvider + Send>,
        feed_builder: Box<dyn FeedBuilder + Send>,
        summary: Box<dyn SummarySink + Send>,
    ) -> Result<Self> {
        Self::build(task, config, session, provider, feed_builder, summary)
            .map_err(|e| e.into_fatal(format!("controller construction fault in worker {task}")))
    }

    fn build(
        task: usize,
        config: &ControllerConfig,
        session: Box<dyn ExecutionSession + Send>,
        provider: Box<dyn DataProvider + Send>,
        feed_builder: Box<dyn FeedBuilder + Send>,
        summary: Box<dyn SummarySink + Send>,
    ) -> Result<Self> {
        if config.episodes_per_trial == 0 {
            return Err(TemporaError::InvalidConfig(
                "episodes_per_trial must be at least 1".to_string(),
            ));
        }
        if config.model_summary_freq == 0 {
            return Err(TemporaError::InvalidConfig(
                "model_summary_freq must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            task,
            scheduler: TrialScheduler::new(task, config),
            session,
            provider,
            feed_builder,
            summary,
            model_summary_freq: config.model_summary_freq,
            local_steps: 0,
        })
    }

    pub fn task(&self) -> usize {
        self.task
    }

    pub fn is_chief(&self) -> bool {
        self.task == 0
    }

    pub fn global_timestamp(&self) -> i64 {
        self.scheduler.global_timestamp()
    }

    pub fn local_steps(&self) -> u64 {
        self.local_steps
    }

    pub fn scheduler(&self) -> &TrialScheduler {
        &self.scheduler
    }

    /// One dispatch step: sync weights, advance the schedule, run either a
    /// test or a train rollout.
    pub fn process(&mut self) -> Result<Dispatch> {
        let task = self.task;
        self.process_inner()
            .map_err(|e| e.into_fatal(format!("process() fault in worker {task}")))
    }

    fn process_inner(&mut self) -> Result<Dispatch> {
        self.session.sync_policy()?;
        let plan = self.scheduler.next_plan();

        if plan.is_test() {
            if self.is_chief() {
                Ok(Dispatch::Evaluated(self.process_test(plan)?))
            } else {
                Ok(Dispatch::Skipped)
            }
        } else {
            Ok(Dispatch::Trained(self.process_train(plan)?))
        }
    }

    /// One full evaluation episode: metrics only, no gradient updates.
    fn process_test(&mut self, mut plan: SamplePlan) -> Result<TestReport> {
        // Continuation semantics: pick up exactly where the previous test
        // episode left off in time.
        plan.trial.align_left = true;

        info!(task = self.task, "test episode started");
        let started = Instant::now();
        let mut batches = 0usize;

        let batch = loop {
            self.session.sync_policy()?;
            let batch = self.provider.get_data(self.session.policy(), &plan)?;
            let done = batch.is_terminal();
            self.scheduler.observe_timestamp(batch.last_timestamp()?);
            batches += 1;
            info!(
                task = self.task,
                global_time = %format_timestamp(self.scheduler.global_timestamp()),
                global_step = self.session.global_step(),
                "test episode rollout done"
            );
            if done {
                break batch;
            }
        };

        let wall_secs = started.elapsed().as_secs_f64();
        let (final_value, final_step, final_time) = {
            let broker = batch.final_broker()?;
            (broker.value, broker.step, broker.time)
        };
        info!(
            task = self.task,
            global_time = %format_timestamp(self.scheduler.global_timestamp()),
            "test episode finished"
        );
        info!(
            task = self.task,
            final_value,
            steps = final_step,
            time = %final_time,
            wall_secs,
            "final value"
        );

        self.summary.record_rollout(&batch, None)?;

        Ok(TestReport {
            batches,
            final_value,
            final_step,
            wall_secs,
            global_timestamp: self.scheduler.global_timestamp(),
        })
    }

    /// One training episode: one gradient update per batch. The terminal
    /// batch still gets a full update; there is no end-of-episode value
    /// logging here.
    fn process_train(&mut self, mut plan: SamplePlan) -> Result<TrainReport> {
        // Resample the episode start uniformly; training should not always
        // begin at a fixed point in the interval.
        plan.trial.align_left = false;

        let mut batches = 0usize;
        let mut reward_sum = 0.0f32;
        let mut global_step = self.session.global_step();

        loop {
            self.session.sync_policy()?;
            let with_model_summary = self.local_steps % self.model_summary_freq == 0;

            let batch = self.provider.get_data(self.session.policy(), &plan)?;
            let done = batch.is_terminal();

            let feed = self.feed_builder.build(&batch, true)?;
            let out = self.session.run_train_step(&feed, with_model_summary)?;
            self.summary
                .record_rollout(&batch, out.model_summary.as_ref())?;

            self.local_steps += 1;
            batches += 1;
            reward_sum += batch.total_reward();
            global_step = out.global_step;

            if done {
                break;
            }
        }

        Ok(TrainReport {
            batches,
            reward_sum,
            global_step,
        })
    }
}

fn format_timestamp(timestamp: i64) -> String {
    DateTime::from_timestamp(timestamp, 0)
        .map(|t| t.to_rfc3339())
        .unwrap_or_else(|| timestamp.to_string())
}
