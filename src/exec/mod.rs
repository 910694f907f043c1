//! Execution seam: policy, shared parameter store, train sessions, feeds.

pub mod feed;
pub mod policy;
pub mod session;
pub mod store;

pub use feed::{FeedBuilder, StandardFeedBuilder, TrainFeed};
pub use policy::{LinearPolicy, Policy};
pub use session::{ExecutionSession, InProcessSession, TrainStepOutput};
pub use store::{ParameterStore, PolicyWeights};

/// Discrete action set: 0 = flat, 1 = long, 2 = short.
pub const NUM_ACTIONS: usize = 3;
