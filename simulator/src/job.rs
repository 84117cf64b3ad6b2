use serde::Serialize;

use crate::workload_generators::events::ScenarioEntry;
use crate::{HostId, JobId, Ms};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum JobState {
    /// Created but not yet enrolled in a queue.
    Wait,
    /// Enrolled in a queue, waiting for a host.
    Pend,
    Run,
    Done,
    /// Finished on a host that went down mid-run.
    Exit,
}

/// A unit of work replayed from the scenario.
#[derive(Debug, Clone, Serialize)]
pub struct Job {
    pub id: JobId,
    pub slot_required: u32,
    pub mem_required: u64,
    pub cpu_time: Ms,
    pub non_cpu_time: Ms,
    pub submit_time: Ms,
    pub priority: i64,
    pub queue_id: usize,

    pub state: JobState,
    /// Estimated run time, computed against the chosen host at bind time.
    pub run_time: Ms,
    pub start_time: Option<Ms>,
    pub finish_time: Option<Ms>,
    pub total_pending_duration: Ms,
    /// Host the job runs on while RUN; retained afterwards for the record.
    pub run_host: Option<HostId>,
    /// Host holding a future-capacity claim for this job, if any.
    pub reservation: Option<HostId>,

    pend_start_time: Option<Ms>,
}

impl Job {
    pub fn from_entry(id: JobId, queue_id: usize, entry: &ScenarioEntry) -> Self {
        Job {
            id,
            slot_required: entry.slot_required,
            mem_required: entry.mem_required,
            cpu_time: entry.cpu_time,
            non_cpu_time: entry.non_cpu_time,
            submit_time: entry.submit_time,
            priority: entry.priority,
            queue_id,
            state: JobState::Wait,
            run_time: 0,
            start_time: None,
            finish_time: None,
            total_pending_duration: 0,
            run_host: None,
            reservation: None,
            pend_start_time: None,
        }
    }

    pub fn set_pending(&mut self, now: Ms) {
        self.state = JobState::Pend;
        if self.pend_start_time.is_none() {
            self.pend_start_time = Some(now);
        }
    }

    pub fn update_total_pending_duration(&mut self, now: Ms) {
        if let Some(pend_start) = self.pend_start_time {
            self.total_pending_duration = now - pend_start;
        }
    }

    /// Estimated run time on a host with the given speed factor:
    /// `(cpu_time / factor + non_cpu_time) * multiplier`, rounded to ms.
    pub fn estimate_run_time(&self, host_factor: f64, multiplier: f64) -> Ms {
        let run = (self.cpu_time as f64 / host_factor + self.non_cpu_time as f64) * multiplier;
        run.round() as Ms
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.state, JobState::Done | JobState::Exit)
    }
}
