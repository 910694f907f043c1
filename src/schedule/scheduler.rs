use serde::{Deserialize, Serialize};

use crate::config::{BlendParams, ControllerConfig};
use crate::schedule::plan::{SampleKind, SamplePlan, SliceRequest};

/// Which data domain the current trial is drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrialMode {
    Source,
    Target,
}

impl TrialMode {
    /// Source trials are training data, target trials evaluation data.
    pub fn sample_kind(&self) -> SampleKind {
        match self {
            TrialMode::Source => SampleKind::Train,
            TrialMode::Target => SampleKind::Test,
        }
    }
}

/// Trial/episode counter state machine deciding what to sample next.
///
/// Owns all mutable schedule state for one worker; `next_plan` is the only
/// mutation point besides `observe_timestamp`. Deterministic given prior
/// state.
#[derive(Debug, Clone)]
pub struct TrialScheduler {
    task: usize,
    source_trials: u32,
    target_trials: u32,
    episodes_per_trial: u32,
    episode_blend: BlendParams,
    trial_blend: BlendParams,

    current_source_trial: u32,
    current_target_trial: u32,
    mode: TrialMode,
    current_episode: u32,
    global_timestamp: i64,
}

impl TrialScheduler {
    pub fn new(task: usize, config: &ControllerConfig) -> Self {
        Self {
            task,
            source_trials: config.trial_cycle.source,
            target_trials: config.trial_cycle.target,
            episodes_per_trial: config.episodes_per_trial,
            episode_blend: config.episode_sample_params,
            trial_blend: config.trial_sample_params,
            current_source_trial: 0,
            current_target_trial: 0,
            mode: TrialMode::Source,
            // Start saturated so the first call always requests a trial;
            // the provider never samples one implicitly.
            current_episode: config.episodes_per_trial,
            global_timestamp: 0,
        }
    }

    /// Advance the counters and describe the next sample to request.
    pub fn next_plan(&mut self) -> SamplePlan {
        let mut new_trial = false;
        if self.current_episode >= self.episodes_per_trial {
            self.current_episode = 0;
            new_trial = true;

            // Decide on trial domain. The two checks are sequential and
            // non-exclusive on purpose: when both counters are over their
            // thresholds in the same call, the second one wins. A (n, 0)
            // cycle stays pinned to Source exactly because of this.
            if self.current_source_trial >= self.source_trials {
                self.mode = TrialMode::Target;
                self.current_source_trial = 0;
                self.current_target_trial = 0;
            }
            if self.current_target_trial >= self.target_trials {
                self.mode = TrialMode::Source;
                self.current_source_trial = 0;
                self.current_target_trial = 0;
            }

            match self.mode {
                TrialMode::Source => self.current_source_trial += 1,
                TrialMode::Target => self.current_target_trial += 1,
            }
        }

        self.current_episode += 1;

        // The chief worker is pinned to evaluation traffic.
        let trial_kind = if self.is_chief() {
            SampleKind::Test
        } else {
            self.mode.sample_kind()
        };

        SamplePlan {
            episode: SliceRequest {
                get_new: true,
                kind: SampleKind::Test,
                timestamp: self.global_timestamp,
                blend: self.episode_blend,
                align_left: false,
            },
            trial: SliceRequest {
                get_new: new_trial,
                kind: trial_kind,
                timestamp: self.global_timestamp,
                blend: self.trial_blend,
                align_left: false,
            },
        }
    }

    /// Record the last timestamp seen in consumed test data.
    pub fn observe_timestamp(&mut self, timestamp: i64) {
        self.global_timestamp = timestamp;
    }

    pub fn global_timestamp(&self) -> i64 {
        self.global_timestamp
    }

    pub fn mode(&self) -> TrialMode {
        self.mode
    }

    pub fn current_episode(&self) -> u32 {
        self.current_episode
    }

    pub fn task(&self) -> usize {
        self.task
    }

    pub fn is_chief(&self) -> bool {
        self.task == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SourceTargetCycle;

    fn config(source: u32, target: u32, episodes: u32) -> ControllerConfig {
        ControllerConfig {
            trial_cycle: SourceTargetCycle { source, target },
            episodes_per_trial: episodes,
            ..ControllerConfig::default()
        }
    }

    fn trial_modes(scheduler: &mut TrialScheduler, calls: usize) -> Vec<TrialMode> {
        (0..calls)
            .map(|_| {
                scheduler.next_plan();
                scheduler.mode()
            })
            .collect()
    }

    #[test]
    fn test_two_one_cycle_is_source_source_target() {
        let mut scheduler = TrialScheduler::new(1, &config(2, 1, 1));
        let modes = trial_modes(&mut scheduler, 9);
        let expected = [
            TrialMode::Source,
            TrialMode::Source,
            TrialMode::Target,
            TrialMode::Source,
            TrialMode::Source,
            TrialMode::Target,
            TrialMode::Source,
            TrialMode::Source,
            TrialMode::Target,
        ];
        assert_eq!(modes, expected);
    }

    #[test]
    fn test_cycle_period_with_multiple_episodes() {
        let source = 3;
        let target = 2;
        let episodes = 4;
        let mut scheduler = TrialScheduler::new(1, &config(source, target, episodes));

        let mut trials = Vec::new();
        for _ in 0..(source + target) * 2 {
            for episode in 0..episodes {
                let plan = scheduler.next_plan();
                // A trial is requested only on its first episode.
                assert_eq!(plan.trial.get_new, episode == 0);
            }
            trials.push(scheduler.mode());
        }

        let source_count = trials
            .iter()
            .take((source + target) as usize)
            .filter(|m| **m == TrialMode::Source)
            .count();
        assert_eq!(source_count, source as usize);
        // Second period repeats the first.
        assert_eq!(
            trials[..(source + target) as usize],
            trials[(source + target) as usize..]
        );
    }

    #[test]
    fn test_episode_counter_never_exceeds_limit() {
        let episodes = 3;
        let mut scheduler = TrialScheduler::new(1, &config(2, 2, episodes));
        for _ in 0..50 {
            scheduler.next_plan();
            assert!(scheduler.current_episode() <= episodes);
        }
    }

    #[test]
    fn test_source_only_cycle_never_switches() {
        // With a zero target count the second domain check fires on every
        // trial boundary and overrides any switch to Target.
        let mut scheduler = TrialScheduler::new(1, &config(1, 0, 1));
        for mode in trial_modes(&mut scheduler, 20) {
            assert_eq!(mode, TrialMode::Source);
        }
    }

    #[test]
    fn test_chief_always_gets_test_trials() {
        let mut scheduler = TrialScheduler::new(0, &config(2, 1, 1));
        for _ in 0..10 {
            let plan = scheduler.next_plan();
            assert_eq!(plan.trial.kind, SampleKind::Test);
            assert_eq!(plan.episode.kind, SampleKind::Test);
        }
    }

    #[test]
    fn test_non_chief_trial_kind_follows_mode() {
        let mut scheduler = TrialScheduler::new(3, &config(2, 1, 1));
        let kinds: Vec<SampleKind> = (0..6).map(|_| scheduler.next_plan().trial.kind).collect();
        assert_eq!(
            kinds,
            vec![
                SampleKind::Train,
                SampleKind::Train,
                SampleKind::Test,
                SampleKind::Train,
                SampleKind::Train,
                SampleKind::Test,
            ]
        );
    }

    #[test]
    fn test_plans_carry_observed_timestamp() {
        let mut scheduler = TrialScheduler::new(1, &config(1, 0, 1));
        assert_eq!(scheduler.next_plan().trial.timestamp, 0);

        scheduler.observe_timestamp(1_500_000_600);
        let plan = scheduler.next_plan();
        assert_eq!(plan.trial.timestamp, 1_500_000_600);
        assert_eq!(plan.episode.timestamp, 1_500_000_600);
    }
}
