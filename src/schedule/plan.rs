use serde::{Deserialize, Serialize};

pub use crate::config::BlendParams;

/// Whether a sampled slice is drawn as training or evaluation data.
///
/// On the wire to the data provider this is the 0/1 sample-type flag:
/// 0 = train, 1 = test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SampleKind {
    Train,
    Test,
}

impl SampleKind {
    pub fn is_test(&self) -> bool {
        matches!(self, SampleKind::Test)
    }

    pub fn as_flag(&self) -> u8 {
        match self {
            SampleKind::Train => 0,
            SampleKind::Test => 1,
        }
    }
}

/// Request for one sampled slice (an episode or a trial) of the data stream.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SliceRequest {
    /// Draw a fresh slice instead of continuing the current one
    pub get_new: bool,
    pub kind: SampleKind,
    /// Last observed global timestamp, epoch seconds
    pub timestamp: i64,
    /// Sampling-distribution shape forwarded to the provider
    pub blend: BlendParams,
    /// Left-align the slice at `timestamp` (continuation) instead of
    /// resampling its start. Set by the rollout loops, not the scheduler.
    pub align_left: bool,
}

/// Full sampling instruction for the next episode, consumed by the data
/// provider. Built fresh per `next_plan` call; immutable once handed over
/// apart from the loop-owned `align_left` flags.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SamplePlan {
    pub episode: SliceRequest,
    pub trial: SliceRequest,
}

impl SamplePlan {
    /// A rollout counts as evaluation only when both slices are test-typed.
    pub fn is_test(&self) -> bool {
        self.trial.kind.is_test() && self.episode.kind.is_test()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_kind_flags() {
        assert_eq!(SampleKind::Train.as_flag(), 0);
        assert_eq!(SampleKind::Test.as_flag(), 1);
        assert!(!SampleKind::Train.is_test());
        assert!(SampleKind::Test.is_test());
    }

    #[test]
    fn test_plan_is_test_requires_both_slices() {
        let slice = |kind| SliceRequest {
            get_new: true,
            kind,
            timestamp: 0,
            blend: BlendParams::default(),
            align_left: false,
        };

        let plan = SamplePlan {
            episode: slice(SampleKind::Test),
            trial: slice(SampleKind::Train),
        };
        assert!(!plan.is_test());

        let plan = SamplePlan {
            episode: slice(SampleKind::Test),
            trial: slice(SampleKind::Test),
        };
        assert!(plan.is_test());
    }
}
