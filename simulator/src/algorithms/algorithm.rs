use crate::cluster::Cluster;
use crate::error::{Result, SimError};
use crate::job::Job;
use crate::{HostId, JobId};

use super::default::{BestFit, FcfsFirstFit, PriorityFirstFit};

/// A pluggable dispatching policy. Algorithms are stateless across calls;
/// everything they observe comes in through the arguments, which is what
/// keeps a dispatch pass deterministic.
pub trait QueueAlgorithm {
    fn name(&self) -> &'static str;

    /// Reorder the pending list before a pass. The default keeps submission
    /// order (FCFS).
    fn order_pending(&self, _pending: &mut [JobId], _jobs: &[Job]) {}

    /// Pick a host for the job among candidates that can run it right now.
    /// Candidates arrive sorted by host id.
    fn select_host(&self, job: &Job, cluster: &Cluster, candidates: &[HostId]) -> Option<HostId>;
}

/// Resolve an algorithm by its configuration name.
pub fn algorithm_resolver(name: &str) -> Result<Box<dyn QueueAlgorithm>> {
    match name {
        "fcfs" => Ok(Box::new(FcfsFirstFit)),
        "best-fit" => Ok(Box::new(BestFit)),
        "priority" => Ok(Box::new(PriorityFirstFit)),
        other => Err(SimError::Config(format!(
            "unknown queue algorithm {other}"
        ))),
    }
}
