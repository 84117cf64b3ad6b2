use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

use crate::config::sim_config::HostConfig;
use crate::job::Job;
use crate::{HostId, JobId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HostStatus {
    Ok,
    Closed,
    Unreachable,
}

/// One machine of the modeled cluster.
///
/// Capacity is accounted in two buckets: `used` (jobs currently running) and
/// `reserved` (future-capacity claims placed via reservations). A host with a
/// non-OK status accepts no new jobs but keeps running the ones it has.
#[derive(Debug)]
pub struct Host {
    pub id: HostId,
    pub name: String,
    pub max_slots: u32,
    pub max_mem: u64,
    pub cpu_factor: f64,
    pub status: HostStatus,

    used_slots: u32,
    used_mem: u64,
    reserved_slots: u32,
    reserved_mem: u64,
    running_jobs: FxHashSet<JobId>,
}

impl Host {
    pub fn from_config(id: HostId, config: &HostConfig) -> Self {
        Host {
            id,
            name: config.name.clone(),
            max_slots: config.slots,
            max_mem: config.memory,
            cpu_factor: config.cpu_factor,
            status: config.status,
            used_slots: 0,
            used_mem: 0,
            reserved_slots: 0,
            reserved_mem: 0,
            running_jobs: FxHashSet::default(),
        }
    }

    pub fn used_slots(&self) -> u32 {
        self.used_slots
    }

    pub fn available_slots(&self) -> u32 {
        self.max_slots
            .saturating_sub(self.used_slots + self.reserved_slots)
    }

    pub fn available_mem(&self) -> u64 {
        self.max_mem.saturating_sub(self.used_mem + self.reserved_mem)
    }

    pub fn num_running_jobs(&self) -> usize {
        self.running_jobs.len()
    }

    /// Whether this host could accept the job right now.
    pub fn can_run(&self, job: &Job) -> bool {
        self.status == HostStatus::Ok
            && self.available_slots() >= job.slot_required
            && self.available_mem() >= job.mem_required
    }

    /// Check-and-reserve. Returning false is the normal negative outcome;
    /// the caller bumps the cluster version on success.
    pub fn try_assign(&mut self, job: &Job) -> bool {
        if !self.can_run(job) {
            return false;
        }
        self.used_slots += job.slot_required;
        self.used_mem += job.mem_required;
        self.running_jobs.insert(job.id);
        true
    }

    /// Return a finished job's resources. Releasing more than is in use is an
    /// accounting bug, not a recoverable error.
    pub fn release(&mut self, job: &Job) {
        assert!(
            self.used_slots >= job.slot_required && self.used_mem >= job.mem_required,
            "host {}: releasing more than in use (job {})",
            self.name,
            job.id
        );
        self.used_slots -= job.slot_required;
        self.used_mem -= job.mem_required;
        self.running_jobs.remove(&job.id);
    }

    /// Claim future capacity for a job. The claim may exceed what is free
    /// right now (the capacity is expected to exist at the reservation's
    /// bind time), but never the host's total capacity.
    pub fn reserve(&mut self, job: &Job) -> bool {
        if self.reserved_slots + job.slot_required > self.max_slots
            || self.reserved_mem + job.mem_required > self.max_mem
        {
            return false;
        }
        self.reserved_slots += job.slot_required;
        self.reserved_mem += job.mem_required;
        true
    }

    /// Convert a reservation into an actual assignment.
    pub fn take_reservation(&mut self, job: &Job) {
        self.release_reservation(job);
        self.used_slots += job.slot_required;
        self.used_mem += job.mem_required;
        assert!(
            self.used_slots <= self.max_slots && self.used_mem <= self.max_mem,
            "host {}: reservation for job {} over-commits the host",
            self.name,
            job.id
        );
        self.running_jobs.insert(job.id);
    }

    /// Drop a reservation without binding it.
    pub fn release_reservation(&mut self, job: &Job) {
        assert!(
            self.reserved_slots >= job.slot_required && self.reserved_mem >= job.mem_required,
            "host {}: no reservation to release for job {}",
            self.name,
            job.id
        );
        self.reserved_slots -= job.slot_required;
        self.reserved_mem -= job.mem_required;
    }

    /// Host-preference metric for best-fit selection: slot load scaled down
    /// by CPU speed, lower is better. Ties are broken by host id at the
    /// selection site.
    pub fn score(&self) -> f64 {
        let load = (self.used_slots + self.reserved_slots) as f64 / self.max_slots as f64;
        load / self.cpu_factor
    }
}
