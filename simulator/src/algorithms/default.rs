use crate::cluster::Cluster;
use crate::job::Job;
use crate::{HostId, JobId};

use super::algorithm::QueueAlgorithm;

/// First-come-first-served with first-fit host selection: pending jobs stay
/// in submission order and each takes the lowest-id host that fits.
pub struct FcfsFirstFit;

impl QueueAlgorithm for FcfsFirstFit {
    fn name(&self) -> &'static str {
        "fcfs"
    }

    fn select_host(&self, _job: &Job, _cluster: &Cluster, candidates: &[HostId]) -> Option<HostId> {
        candidates.first().copied()
    }
}

/// Picks the host with the best score: least loaded first, faster CPU as the
/// second criterion, lowest id as the final tie-break.
pub struct BestFit;

impl QueueAlgorithm for BestFit {
    fn name(&self) -> &'static str {
        "best-fit"
    }

    fn select_host(&self, _job: &Job, cluster: &Cluster, candidates: &[HostId]) -> Option<HostId> {
        candidates.iter().copied().min_by(|&a, &b| {
            cluster
                .host(a)
                .score()
                .total_cmp(&cluster.host(b).score())
                .then(a.cmp(&b))
        })
    }
}

/// Orders pending jobs by priority (higher first), submit time and id as
/// tie-breaks; host selection is first-fit.
pub struct PriorityFirstFit;

impl QueueAlgorithm for PriorityFirstFit {
    fn name(&self) -> &'static str {
        "priority"
    }

    fn order_pending(&self, pending: &mut [JobId], jobs: &[Job]) {
        pending.sort_by(|&a, &b| {
            jobs[b]
                .priority
                .cmp(&jobs[a].priority)
                .then(jobs[a].submit_time.cmp(&jobs[b].submit_time))
                .then(a.cmp(&b))
        });
    }

    fn select_host(&self, _job: &Job, _cluster: &Cluster, candidates: &[HostId]) -> Option<HostId> {
        candidates.first().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::sim_config::HostConfig;
    use crate::host::HostStatus;
    use crate::workload_generators::events::ScenarioEntry;

    fn cluster() -> Cluster {
        Cluster::new(&[
            HostConfig {
                name: "slow".to_string(),
                slots: 4,
                memory: 4096,
                cpu_factor: 1.0,
                status: HostStatus::Ok,
            },
            HostConfig {
                name: "fast".to_string(),
                slots: 4,
                memory: 4096,
                cpu_factor: 2.0,
                status: HostStatus::Ok,
            },
        ])
    }

    fn job_with(id: JobId, priority: i64, submit_time: u64) -> Job {
        Job::from_entry(
            id,
            0,
            &ScenarioEntry {
                submit_time,
                queue_name: "normal".to_string(),
                slot_required: 1,
                mem_required: 64,
                cpu_time: 1000,
                non_cpu_time: 0,
                priority,
            },
        )
    }

    #[test]
    fn fcfs_takes_the_first_candidate() {
        let cluster = cluster();
        let job = job_with(0, 0, 0);
        assert_eq!(FcfsFirstFit.select_host(&job, &cluster, &[0, 1]), Some(0));
        assert_eq!(FcfsFirstFit.select_host(&job, &cluster, &[]), None);
    }

    #[test]
    fn best_fit_prefers_the_idle_faster_host() {
        let mut cluster = cluster();
        let job = job_with(0, 0, 0);
        // Both idle: equal load, the faster host scores lower.
        assert_eq!(BestFit.select_host(&job, &cluster, &[0, 1]), Some(1));

        // Load the fast host; the idle slow one wins.
        assert!(cluster.try_assign(1, &job_with(9, 0, 0)));
        assert_eq!(BestFit.select_host(&job, &cluster, &[0, 1]), Some(0));
    }

    #[test]
    fn priority_ordering_is_stable_and_deterministic() {
        let jobs = vec![
            job_with(0, 1, 0),
            job_with(1, 5, 200),
            job_with(2, 5, 100),
            job_with(3, 0, 50),
        ];
        let mut pending: Vec<JobId> = vec![0, 1, 2, 3];
        PriorityFirstFit.order_pending(&mut pending, &jobs);
        assert_eq!(pending, vec![2, 1, 0, 3]);
    }
}
