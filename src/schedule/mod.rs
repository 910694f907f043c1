//! Sampling schedule: which episode/trial to request next.

pub mod plan;
pub mod scheduler;

pub use plan::{SampleKind, SamplePlan, SliceRequest};
pub use scheduler::{TrialMode, TrialScheduler};
