//! End-to-end checks of the sampling schedule and the in-process cluster.

use std::sync::Arc;

use tempora::config::{AppConfig, SourceTargetCycle};
use tempora::{
    ControllerConfig, Dispatch, InProcessSession, Launcher, MemorySink, ParameterStore,
    SampleKind, SimulatedFeed, StandardFeedBuilder, TemporalController, TrialMode,
    TrialScheduler,
};

fn small_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.controller.trial_cycle = SourceTargetCycle {
        source: 2,
        target: 1,
    };
    config.sim.episode_len = 12;
    config.sim.rollout_len = 5;
    config.launcher.num_workers = 3;
    config.launcher.episodes_per_worker = 9;
    config
}

#[tokio::test]
async fn cluster_separates_evaluation_from_training() {
    let launcher = Launcher::new(small_config()).unwrap();
    let report = launcher.run().await.unwrap();

    let chief = &report.workers[0];
    assert_eq!(chief.evaluated, chief.processed);
    assert_eq!(chief.trained, 0);
    assert_eq!(chief.train_batches, 0);

    let mut total_train_batches = 0;
    for worker in &report.workers[1..] {
        assert_eq!(worker.evaluated, 0);
        // Cycle (2, 1) over 9 episodes: 6 source trials trained, 3 target
        // trials skipped.
        assert_eq!(worker.trained, 6);
        assert_eq!(worker.skipped, 3);
        total_train_batches += worker.train_batches;
    }

    assert_eq!(report.global_step, total_train_batches as u64);
}

#[test]
fn chief_evaluation_clock_is_non_decreasing() {
    let config = small_config();
    let store = Arc::new(ParameterStore::new(
        config.session.obs_dim * config.session.num_actions,
    ));
    let sink = MemorySink::new();

    let mut controller = TemporalController::new(
        0,
        &config.controller,
        Box::new(InProcessSession::new(&config.session, store).unwrap()),
        Box::new(SimulatedFeed::new(config.sim.clone())),
        Box::new(StandardFeedBuilder::new(config.session.obs_dim)),
        Box::new(sink.clone()),
    )
    .unwrap();

    let mut timestamps = Vec::new();
    for _ in 0..5 {
        match controller.process().unwrap() {
            Dispatch::Evaluated(report) => timestamps.push(report.global_timestamp),
            other => panic!("chief must evaluate, got {other:?}"),
        }
    }

    assert!(timestamps.windows(2).all(|w| w[1] >= w[0]));
    // One summary per test episode.
    assert_eq!(sink.len(), 5);
    for record in sink.records() {
        assert_eq!(record.rollout.kind, SampleKind::Test);
        assert!(record.rollout.terminal);
    }
}

#[test]
fn trial_mode_sequence_cycles_with_configured_period() {
    for (source, target, episodes) in [(1u32, 1u32, 1u32), (2, 1, 1), (3, 2, 4), (1, 3, 2)] {
        let config = ControllerConfig {
            trial_cycle: SourceTargetCycle { source, target },
            episodes_per_trial: episodes,
            ..ControllerConfig::default()
        };
        let mut scheduler = TrialScheduler::new(1, &config);

        let period = (source + target) as usize;
        let mut trials = Vec::new();
        for _ in 0..period * 3 {
            for episode in 0..episodes {
                let plan = scheduler.next_plan();
                assert_eq!(plan.trial.get_new, episode == 0, "cycle ({source},{target})");
            }
            trials.push(scheduler.mode());
        }

        for window in trials.chunks(period) {
            let sources = window.iter().filter(|m| **m == TrialMode::Source).count();
            assert_eq!(sources, source as usize, "cycle ({source},{target})");
            assert_eq!(window, &trials[..period], "cycle ({source},{target})");
        }
    }
}
