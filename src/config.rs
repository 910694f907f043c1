use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub controller: ControllerConfig,
    #[serde(default)]
    pub sim: SimFeedConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub launcher: LauncherConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Beta-distribution shape parameters forwarded to the data provider to
/// control where in an interval episodes/trials are drawn from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BlendParams {
    pub alpha: f64,
    pub beta: f64,
}

impl Default for BlendParams {
    fn default() -> Self {
        // (1, 1) is uniform
        Self {
            alpha: 1.0,
            beta: 1.0,
        }
    }
}

/// How many consecutive trials to draw from each data domain before
/// switching to the other.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SourceTargetCycle {
    pub source: u32,
    pub target: u32,
}

impl Default for SourceTargetCycle {
    fn default() -> Self {
        // Source-only: one source trial, never switch to target.
        Self {
            source: 1,
            target: 0,
        }
    }
}

/// Sampling-schedule and rollout-loop configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControllerConfig {
    /// Source/target trial cycle lengths
    #[serde(default)]
    pub trial_cycle: SourceTargetCycle,
    /// Episodes drawn from each trial before a new trial is requested
    #[serde(default = "default_episodes_per_trial")]
    pub episodes_per_trial: u32,
    /// Emit a model-level summary every this many local train steps
    #[serde(default = "default_model_summary_freq")]
    pub model_summary_freq: u64,
    /// Blend parameters for episode sampling within a trial
    #[serde(default)]
    pub episode_sample_params: BlendParams,
    /// Blend parameters for trial sampling within a domain
    #[serde(default)]
    pub trial_sample_params: BlendParams,
}

fn default_episodes_per_trial() -> u32 {
    1
}

fn default_model_summary_freq() -> u64 {
    10
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            trial_cycle: SourceTargetCycle::default(),
            episodes_per_trial: default_episodes_per_trial(),
            model_summary_freq: default_model_summary_freq(),
            episode_sample_params: BlendParams::default(),
            trial_sample_params: BlendParams::default(),
        }
    }
}

/// Price-path regime for one data domain
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RegimeConfig {
    /// Per-step log drift
    pub drift: f64,
    /// Per-step return volatility (std dev)
    pub volatility: f64,
}

/// Simulated data-feed configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimFeedConfig {
    /// Epoch seconds at which the source domain window opens
    pub start_timestamp: i64,
    /// Seconds of market time per environment step
    pub step_secs: i64,
    /// Steps per rollout batch handed to the controller
    pub rollout_len: usize,
    /// Steps per episode; the terminal flag is raised on the last one
    pub episode_len: usize,
    /// Span of one trial window in seconds
    pub trial_span_secs: i64,
    /// Total span of the source domain in seconds
    pub source_span_secs: i64,
    /// Total span of the target domain (begins where source ends)
    pub target_span_secs: i64,
    /// Initial broker account value
    pub initial_value: f64,
    pub source: RegimeConfig,
    pub target: RegimeConfig,
    /// Times to yield the OS thread between test batches so trainer
    /// threads can interleave
    pub test_slowdown_steps: usize,
    /// RNG seed; the launcher offsets it per worker
    pub seed: u64,
}

impl Default for SimFeedConfig {
    fn default() -> Self {
        Self {
            start_timestamp: 1_500_000_000,
            step_secs: 60,
            rollout_len: 20,
            episode_len: 100,
            trial_span_secs: 5 * 86_400,
            source_span_secs: 30 * 86_400,
            target_span_secs: 10 * 86_400,
            initial_value: 10_000.0,
            source: RegimeConfig {
                drift: 0.0,
                volatility: 0.002,
            },
            target: RegimeConfig {
                drift: -0.0001,
                volatility: 0.004,
            },
            test_slowdown_steps: 1,
            seed: 42,
        }
    }
}

/// In-process execution-session configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Observation vector length fed to the policy
    pub obs_dim: usize,
    /// Discrete action count
    pub num_actions: usize,
    /// Step size applied to published weight deltas
    pub learning_rate: f32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            obs_dim: crate::data::OBS_DIM,
            num_actions: crate::exec::NUM_ACTIONS,
            learning_rate: 0.01,
        }
    }
}

/// In-process cluster configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LauncherConfig {
    /// Worker count; task id 0 is the chief (evaluation-only)
    pub num_workers: usize,
    /// `process()` invocations per worker
    pub episodes_per_worker: usize,
}

impl Default for LauncherConfig {
    fn default() -> Self {
        Self {
            num_workers: 2,
            episodes_per_worker: 8,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl AppConfig {
    /// Load configuration from files and environment
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from("config")
    }

    /// Load configuration from a specific directory
    pub fn load_from<P: AsRef<Path>>(config_dir: P) -> Result<Self, ConfigError> {
        let config_dir = config_dir.as_ref();

        let builder = Config::builder()
            // Load default config file
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            // Load environment-specific config (e.g. config/production.toml)
            .add_source(
                File::from(config_dir.join(
                    std::env::var("TEMPORA_ENV").unwrap_or_else(|_| "development".to_string()),
                ))
                .required(false),
            )
            // Override with environment variables (TEMPORA_SIM__SEED, etc.)
            .add_source(
                Environment::with_prefix("TEMPORA")
                    .separator("__")
                    .try_parsing(true),
            );

        builder.build()?.try_deserialize()
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.controller.episodes_per_trial == 0 {
            errors.push("controller.episodes_per_trial must be at least 1".to_string());
        }

        if self.controller.model_summary_freq == 0 {
            errors.push("controller.model_summary_freq must be at least 1".to_string());
        }

        let cycle = self.controller.trial_cycle;
        if cycle.source == 0 && cycle.target == 0 {
            errors.push("controller.trial_cycle must name at least one trial".to_string());
        }

        for (name, blend) in [
            ("episode_sample_params", self.controller.episode_sample_params),
            ("trial_sample_params", self.controller.trial_sample_params),
        ] {
            if blend.alpha <= 0.0 || blend.beta <= 0.0 {
                errors.push(format!("controller.{name} alpha/beta must be positive"));
            }
        }

        if self.sim.rollout_len == 0 || self.sim.episode_len == 0 {
            errors.push("sim.rollout_len and sim.episode_len must be positive".to_string());
        }

        if self.sim.step_secs <= 0 {
            errors.push("sim.step_secs must be positive".to_string());
        }

        let episode_span = self.sim.episode_len as i64 * self.sim.step_secs;
        if episode_span > self.sim.trial_span_secs {
            errors.push(format!(
                "sim.trial_span_secs ({}) too short for one episode ({episode_span}s)",
                self.sim.trial_span_secs
            ));
        }

        if self.sim.trial_span_secs > self.sim.source_span_secs
            || self.sim.trial_span_secs > self.sim.target_span_secs
        {
            errors.push("sim domain spans must cover at least one trial span".to_string());
        }

        if self.session.obs_dim == 0 || self.session.num_actions == 0 {
            errors.push("session.obs_dim and session.num_actions must be positive".to_string());
        }

        if self.session.learning_rate <= 0.0 {
            errors.push("session.learning_rate must be positive".to_string());
        }

        if self.launcher.num_workers == 0 {
            errors.push("launcher.num_workers must be at least 1".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_flags_zero_episodes() {
        let mut config = AppConfig::default();
        config.controller.episodes_per_trial = 0;
        config.controller.model_summary_freq = 0;

        let errors = config.validate().unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(errors[0].contains("episodes_per_trial"));
    }

    #[test]
    fn test_load_from_toml_file() {
        let dir = std::env::temp_dir().join(format!("tempora-config-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();

        let mut on_disk = AppConfig::default();
        on_disk.controller.trial_cycle = SourceTargetCycle {
            source: 3,
            target: 2,
        };
        on_disk.launcher.num_workers = 5;
        std::fs::write(dir.join("default.toml"), toml::to_string(&on_disk).unwrap()).unwrap();

        let loaded = AppConfig::load_from(&dir).unwrap();
        assert_eq!(loaded.controller.trial_cycle.source, 3);
        assert_eq!(loaded.controller.trial_cycle.target, 2);
        assert_eq!(loaded.launcher.num_workers, 5);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_missing_config_dir_yields_defaults() {
        let loaded = AppConfig::load_from("/nonexistent/tempora-config").unwrap();
        assert_eq!(loaded.controller.episodes_per_trial, 1);
        assert_eq!(loaded.controller.trial_cycle.source, 1);
    }
}
