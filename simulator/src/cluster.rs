use rustc_hash::FxHashMap;

use crate::config::sim_config::HostConfig;
use crate::host::{Host, HostStatus};
use crate::job::Job;
use crate::HostId;

/// The aggregate of all hosts, with a monotonic version counter.
///
/// Every host-state mutation goes through the cluster so the version bump
/// cannot be skipped: the version is the only signal the dispatcher uses to
/// decide whether a pass is worth running.
pub struct Cluster {
    hosts: Vec<Host>,
    name_index: FxHashMap<String, HostId>,
    version: u64,
}

impl Cluster {
    pub fn new(host_configs: &[HostConfig]) -> Self {
        let mut cluster = Cluster {
            hosts: Vec::with_capacity(host_configs.len()),
            name_index: FxHashMap::default(),
            version: 0,
        };
        for config in host_configs {
            cluster.add_host(config);
        }
        cluster
    }

    pub fn add_host(&mut self, config: &HostConfig) -> HostId {
        let id = self.hosts.len();
        self.name_index.insert(config.name.clone(), id);
        self.hosts.push(Host::from_config(id, config));
        self.version += 1;
        id
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn num_hosts(&self) -> usize {
        self.hosts.len()
    }

    pub fn host(&self, id: HostId) -> &Host {
        &self.hosts[id]
    }

    pub fn hosts(&self) -> &[Host] {
        &self.hosts
    }

    pub fn find_host(&self, name: &str) -> Option<HostId> {
        self.name_index.get(name).copied()
    }

    /// Slots currently occupied by running jobs, across all hosts.
    pub fn used_slots(&self) -> u32 {
        self.hosts.iter().map(|h| h.used_slots()).sum()
    }

    pub fn total_slots(&self) -> u32 {
        self.hosts.iter().map(|h| h.max_slots).sum()
    }

    pub fn try_assign(&mut self, host_id: HostId, job: &Job) -> bool {
        if self.hosts[host_id].try_assign(job) {
            self.version += 1;
            return true;
        }
        false
    }

    pub fn release(&mut self, host_id: HostId, job: &Job) {
        self.hosts[host_id].release(job);
        self.version += 1;
    }

    pub fn reserve(&mut self, host_id: HostId, job: &Job) -> bool {
        if self.hosts[host_id].reserve(job) {
            self.version += 1;
            return true;
        }
        false
    }

    pub fn take_reservation(&mut self, host_id: HostId, job: &Job) {
        self.hosts[host_id].take_reservation(job);
        self.version += 1;
    }

    pub fn release_reservation(&mut self, host_id: HostId, job: &Job) {
        self.hosts[host_id].release_reservation(job);
        self.version += 1;
    }

    pub fn set_host_status(&mut self, host_id: HostId, status: HostStatus) {
        if self.hosts[host_id].status != status {
            self.hosts[host_id].status = status;
            self.version += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::Job;
    use crate::workload_generators::events::ScenarioEntry;

    fn two_host_cluster() -> Cluster {
        Cluster::new(&[
            HostConfig {
                name: "h0".to_string(),
                slots: 2,
                memory: 1024,
                cpu_factor: 1.0,
                status: HostStatus::Ok,
            },
            HostConfig {
                name: "h1".to_string(),
                slots: 4,
                memory: 2048,
                cpu_factor: 2.0,
                status: HostStatus::Ok,
            },
        ])
    }

    fn job(slots: u32) -> Job {
        Job::from_entry(
            0,
            0,
            &ScenarioEntry {
                submit_time: 0,
                queue_name: "normal".to_string(),
                slot_required: slots,
                mem_required: 64,
                cpu_time: 1000,
                non_cpu_time: 0,
                priority: 0,
            },
        )
    }

    #[test]
    fn version_strictly_increases_on_every_state_change() {
        let mut cluster = two_host_cluster();
        let mut seen = cluster.version();
        assert_eq!(seen, 2);

        assert!(cluster.try_assign(0, &job(1)));
        assert!(cluster.version() > seen);
        seen = cluster.version();

        cluster.release(0, &job(1));
        assert!(cluster.version() > seen);
        seen = cluster.version();

        cluster.set_host_status(1, HostStatus::Closed);
        assert!(cluster.version() > seen);
        seen = cluster.version();

        // Setting the same status again is not a state change.
        cluster.set_host_status(1, HostStatus::Closed);
        assert_eq!(cluster.version(), seen);
    }

    #[test]
    fn failed_assignment_leaves_version_untouched() {
        let mut cluster = two_host_cluster();
        let seen = cluster.version();
        assert!(!cluster.try_assign(0, &job(3)));
        assert_eq!(cluster.version(), seen);
    }

    #[test]
    fn host_lookup_by_name() {
        let cluster = two_host_cluster();
        assert_eq!(cluster.find_host("h1"), Some(1));
        assert_eq!(cluster.find_host("h9"), None);
        assert_eq!(cluster.total_slots(), 6);
    }
}
