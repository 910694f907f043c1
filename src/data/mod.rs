//! On-policy rollout data: batch model, provider seam, simulated feed.

pub mod batch;
pub mod provider;
pub mod sim;

pub use batch::{BrokerState, RolloutBatch, RolloutStep, StepMetadata};
pub use provider::DataProvider;
pub use sim::{SimulatedFeed, OBS_DIM};
