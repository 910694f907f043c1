use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Serialize};

use crate::error::{Result, TemporaError};

/// Versioned flat weight vector shared across workers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyWeights {
    pub values: Vec<f32>,
    pub version: u64,
}

/// Shared parameter store workers coordinate through.
///
/// Readers pull snapshots (a barrier against the latest published update,
/// not a lock held across rollouts); writers publish deltas asynchronously
/// and bump the version. Also owns the global train-step counter.
pub struct ParameterStore {
    weights: RwLock<PolicyWeights>,
    global_step: AtomicU64,
}

impl ParameterStore {
    pub fn new(dim: usize) -> Self {
        Self {
            weights: RwLock::new(PolicyWeights {
                values: vec![0.0; dim],
                version: 0,
            }),
            global_step: AtomicU64::new(0),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, PolicyWeights> {
        match self.weights.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, PolicyWeights> {
        match self.weights.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn dim(&self) -> usize {
        self.read().values.len()
    }

    pub fn version(&self) -> u64 {
        self.read().version
    }

    pub fn snapshot(&self) -> PolicyWeights {
        self.read().clone()
    }

    /// Apply a weight delta and publish a new version.
    pub fn publish_delta(&self, delta: &[f32]) -> Result<u64> {
        let mut weights = self.write();
        if delta.len() != weights.values.len() {
            return Err(TemporaError::Session(format!(
                "delta has {} values, store holds {}",
                delta.len(),
                weights.values.len()
            )));
        }
        for (w, d) in weights.values.iter_mut().zip(delta.iter()) {
            *w += d;
        }
        weights.version += 1;
        Ok(weights.version)
    }

    pub fn global_step(&self) -> u64 {
        self.global_step.load(Ordering::SeqCst)
    }

    /// Increment the global step counter, returning the new value.
    pub fn increment_step(&self) -> u64 {
        self.global_step.fetch_add(1, Ordering::SeqCst) + 1
    }
}
