use crate::data::batch::RolloutBatch;
use crate::error::Result;
use crate::exec::Policy;
use crate::schedule::SamplePlan;

/// Source of on-policy rollout data.
///
/// Successive calls within one episode return consecutive windows of the
/// same episode; the provider starts a fresh episode per the plan once the
/// previous one has raised its terminal flag.
pub trait DataProvider {
    fn get_data(&mut self, policy: &dyn Policy, plan: &SamplePlan) -> Result<RolloutBatch>;
}
