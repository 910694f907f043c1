//! Simulated two-domain market feed.
//!
//! Generates on-policy rollout data for the controller: a source domain
//! window followed in time by a target domain window with its own price
//! regime. Honors the plan's `get_new`, `align_left`, timestamp and
//! terminal semantics.

use chrono::DateTime;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::{RegimeConfig, SimFeedConfig};
use crate::data::batch::{BrokerState, RolloutBatch, RolloutStep, StepMetadata};
use crate::data::provider::DataProvider;
use crate::error::{Result, TemporaError};
use crate::exec::Policy;
use crate::schedule::{SampleKind, SamplePlan};

/// Observation layout: [price relative to episode open, last step return,
/// fraction of episode elapsed].
pub const OBS_DIM: usize = 3;

#[derive(Debug, Clone, Copy)]
struct TrialWindow {
    start: i64,
    end: i64,
    kind: SampleKind,
}

#[derive(Debug, Clone)]
struct ActiveEpisode {
    kind: SampleKind,
    episode_kind: SampleKind,
    steps_done: usize,
    cursor: i64,
    price: f64,
    last_return: f64,
    broker_value: f64,
}

/// In-memory time-domain market feed with distinct source/target regimes.
pub struct SimulatedFeed {
    config: SimFeedConfig,
    rng: StdRng,
    trial: Option<TrialWindow>,
    episode: Option<ActiveEpisode>,
}

impl SimulatedFeed {
    pub fn new(config: SimFeedConfig) -> Self {
        let rng = StdRng::seed_from_u64(config.seed);
        Self {
            config,
            rng,
            trial: None,
            episode: None,
        }
    }

    /// Domain window for a sample kind: test data comes from the target
    /// domain, train data from the source domain.
    fn domain_window(&self, kind: SampleKind) -> (i64, i64) {
        let source_end = self.config.start_timestamp + self.config.source_span_secs;
        if kind.is_test() {
            (source_end, source_end + self.config.target_span_secs)
        } else {
            (self.config.start_timestamp, source_end)
        }
    }

    fn regime(&self, kind: SampleKind) -> RegimeConfig {
        if kind.is_test() {
            self.config.target
        } else {
            self.config.source
        }
    }

    fn episode_span(&self) -> i64 {
        self.config.episode_len as i64 * self.config.step_secs
    }

    /// Standard normal draw via Box-Muller.
    fn sample_normal(&mut self) -> f64 {
        let u1: f64 = self.rng.gen_range(0.0001..1.0);
        let u2: f64 = self.rng.gen();
        (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
    }

    fn draw_start(&mut self, earliest: i64, latest: i64, aligned: bool, anchor: i64) -> i64 {
        if aligned {
            anchor.clamp(earliest, latest)
        } else if latest > earliest {
            self.rng.gen_range(earliest..=latest)
        } else {
            earliest
        }
    }

    fn begin_episode(&mut self, plan: &SamplePlan) -> Result<()> {
        let span = self.episode_span();

        let need_trial = plan.trial.get_new
            || self
                .trial
                .map(|t| t.kind != plan.trial.kind)
                .unwrap_or(true);
        if need_trial {
            let (window_start, window_end) = self.domain_window(plan.trial.kind);
            let latest = window_end - self.config.trial_span_secs;
            if latest < window_start {
                return Err(TemporaError::Provider(format!(
                    "domain window [{window_start}, {window_end}] shorter than trial span"
                )));
            }
            let start = self.draw_start(
                window_start,
                latest,
                plan.trial.align_left,
                plan.trial.timestamp,
            );
            self.trial = Some(TrialWindow {
                start,
                end: start + self.config.trial_span_secs,
                kind: plan.trial.kind,
            });
        }

        let trial = self
            .trial
            .ok_or_else(|| TemporaError::Provider("no trial sampled".to_string()))?;
        let latest = trial.end - span;
        if latest < trial.start {
            return Err(TemporaError::Provider(format!(
                "trial span {} shorter than one episode ({span}s)",
                trial.end - trial.start
            )));
        }
        let start = self.draw_start(
            trial.start,
            latest,
            plan.trial.align_left,
            plan.trial.timestamp.max(trial.start),
        );

        self.episode = Some(ActiveEpisode {
            kind: trial.kind,
            episode_kind: plan.episode.kind,
            steps_done: 0,
            cursor: start,
            price: 1.0,
            last_return: 0.0,
            broker_value: self.config.initial_value,
        });
        Ok(())
    }
}

impl DataProvider for SimulatedFeed {
    fn get_data(&mut self, policy: &dyn Policy, plan: &SamplePlan) -> Result<RolloutBatch> {
        if self.episode.is_none() {
            self.begin_episode(plan)?;
        }
        let mut episode = self
            .episode
            .take()
            .ok_or_else(|| TemporaError::Provider("no active episode".to_string()))?;

        let regime = self.regime(episode.kind);
        let mut batch = RolloutBatch::default();
        let mut done = false;

        for _ in 0..self.config.rollout_len {
            let observation = vec![
                (episode.price - 1.0) as f32,
                episode.last_return as f32,
                episode.steps_done as f32 / self.config.episode_len as f32,
            ];
            let action = policy.act(&observation);
            let position = match action {
                1 => 1.0,
                2 => -1.0,
                _ => 0.0,
            };

            let step_return = regime.drift + regime.volatility * self.sample_normal();
            episode.price *= 1.0 + step_return;
            episode.last_return = step_return;
            episode.broker_value *= 1.0 + position * step_return;

            let timestamp = episode.cursor;
            episode.cursor += self.config.step_secs;
            episode.steps_done += 1;
            done = episode.steps_done >= self.config.episode_len;

            batch.on_policy.push(RolloutStep {
                observation,
                action,
                reward: (position * step_return) as f32,
                metadata: StepMetadata {
                    timestamp,
                    trial_kind: episode.kind,
                    episode_kind: episode.episode_kind,
                },
                broker: BrokerState {
                    value: episode.broker_value,
                    step: episode.steps_done,
                    time: DateTime::from_timestamp(timestamp, 0)
                        .unwrap_or(DateTime::UNIX_EPOCH),
                },
            });
            batch.terminal.push(done);

            if done {
                break;
            }
        }

        if !done {
            self.episode = Some(episode);
        }

        // Let trainer threads interleave with long evaluation rollouts.
        if plan.trial.kind.is_test() {
            for _ in 0..self.config.test_slowdown_steps {
                std::thread::yield_now();
            }
        }

        Ok(batch)
    }
}
