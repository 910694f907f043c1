pub mod config;
pub mod controller;
pub mod data;
pub mod error;
pub mod exec;
pub mod launcher;
pub mod schedule;
pub mod summary;

pub use config::{AppConfig, BlendParams, ControllerConfig, SourceTargetCycle};
pub use controller::{Dispatch, TemporalController, TestReport, TrainReport};
pub use data::{DataProvider, RolloutBatch, RolloutStep, SimulatedFeed};
pub use error::{Result, TemporaError};
pub use exec::{
    ExecutionSession, FeedBuilder, InProcessSession, LinearPolicy, ParameterStore, Policy,
    StandardFeedBuilder, TrainFeed,
};
pub use launcher::{Launcher, RunReport, WorkerReport};
pub use schedule::{SampleKind, SamplePlan, SliceRequest, TrialMode, TrialScheduler};
pub use summary::{LogSink, MemorySink, ModelSummary, RolloutSummary, SummarySink};
