use crate::error::{Result, TemporaError};
use crate::exec::store::PolicyWeights;

/// The seam the data provider uses to generate on-policy actions.
/// Network internals stay behind this trait.
pub trait Policy {
    fn act(&self, observation: &[f32]) -> usize;
    /// Version of the shared weights this policy was last synced to.
    fn version(&self) -> u64;
}

/// Linear scoring policy over flat weights, one row per action.
#[derive(Debug, Clone)]
pub struct LinearPolicy {
    weights: Vec<f32>,
    obs_dim: usize,
    num_actions: usize,
    version: u64,
}

impl LinearPolicy {
    pub fn new(obs_dim: usize, num_actions: usize) -> Self {
        Self {
            weights: vec![0.0; obs_dim * num_actions],
            obs_dim,
            num_actions,
            version: 0,
        }
    }

    pub fn weight_dim(&self) -> usize {
        self.obs_dim * self.num_actions
    }

    /// Replace local weights with a snapshot pulled from the store.
    pub fn load(&mut self, snapshot: &PolicyWeights) -> Result<()> {
        if snapshot.values.len() != self.weights.len() {
            return Err(TemporaError::Session(format!(
                "weight snapshot has {} values, policy expects {}",
                snapshot.values.len(),
                self.weights.len()
            )));
        }
        self.weights.copy_from_slice(&snapshot.values);
        self.version = snapshot.version;
        Ok(())
    }
}

impl Policy for LinearPolicy {
    fn act(&self, observation: &[f32]) -> usize {
        let mut best = 0;
        let mut best_score = f32::NEG_INFINITY;
        for action in 0..self.num_actions {
            let row = &self.weights[action * self.obs_dim..(action + 1) * self.obs_dim];
            let score: f32 = row
                .iter()
                .zip(observation.iter())
                .map(|(w, x)| w * x)
                .sum();
            if score > best_score {
                best_score = score;
                best = action;
            }
        }
        best
    }

    fn version(&self) -> u64 {
        self.version
    }
}
