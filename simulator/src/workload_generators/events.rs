use serde::{Deserialize, Serialize};

use crate::Ms;

/// One submission record of a scenario trace.
///
/// Entries are plain data; the simulation turns each one into a future
/// submission event at startup.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ScenarioEntry {
    /// Submission time, ms since epoch.
    pub submit_time: Ms,
    pub queue_name: String,
    pub slot_required: u32,
    pub mem_required: u64,
    /// Estimated CPU time, scaled by the chosen host's speed factor.
    pub cpu_time: Ms,
    /// Estimated non-CPU time, independent of the host.
    pub non_cpu_time: Ms,
    #[serde(default)]
    pub priority: i64,
}
