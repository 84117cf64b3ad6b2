use rustc_hash::FxHashSet;

use crate::algorithms::QueueAlgorithm;
use crate::cluster::Cluster;
use crate::job::{Job, JobState};
use crate::{HostId, JobId, Ms};

/// Inputs a dispatch pass needs besides the queue itself.
pub struct DispatchContext {
    pub now: Ms,
    pub runtime_multiplier: f64,
}

/// A binding produced by a dispatch pass; the simulation schedules the
/// finish event and writes the log row.
#[derive(Debug, Clone, Copy)]
pub struct StartedJob {
    pub job_id: JobId,
    pub host_id: HostId,
    pub finish_time: Ms,
}

/// A named admission class binding a dispatching algorithm to a set of
/// eligible hosts.
pub struct Queue {
    pub id: usize,
    pub name: String,
    pub priority: i64,
    /// Precomputed eligible host set; `None` means every host.
    eligible: Option<FxHashSet<HostId>>,
    algorithm: Box<dyn QueueAlgorithm>,
    pending: Vec<JobId>,
}

impl Queue {
    pub fn new(
        id: usize,
        name: String,
        priority: i64,
        eligible: Option<FxHashSet<HostId>>,
        algorithm: Box<dyn QueueAlgorithm>,
    ) -> Self {
        Queue {
            id,
            name,
            priority,
            eligible,
            algorithm,
            pending: Vec::new(),
        }
    }

    pub fn algorithm_name(&self) -> &'static str {
        self.algorithm.name()
    }

    pub fn num_pending(&self) -> usize {
        self.pending.len()
    }

    pub fn pending(&self) -> &[JobId] {
        &self.pending
    }

    /// Append to the pending list and mark the job PEND.
    pub fn enqueue(&mut self, job: &mut Job, now: Ms) {
        debug_assert_eq!(job.queue_id, self.id);
        job.set_pending(now);
        self.pending.push(job.id);
    }

    /// Take a job out of the pending list (reservation bind path).
    pub fn remove_pending(&mut self, job_id: JobId) {
        self.pending.retain(|&id| id != job_id);
    }

    pub fn is_host_eligible(&self, host_id: HostId) -> bool {
        self.eligible.as_ref().map_or(true, |set| set.contains(&host_id))
    }

    /// One dispatch pass: walk the pending list in algorithm order and bind
    /// every job some eligible host can take. Jobs holding a reservation are
    /// skipped; their capacity claim is already accounted on the host.
    ///
    /// Returns the bindings made and whether jobs remain pending.
    pub fn dispatch(
        &mut self,
        jobs: &mut [Job],
        cluster: &mut Cluster,
        ctx: &DispatchContext,
    ) -> (Vec<StartedJob>, bool) {
        self.algorithm.order_pending(&mut self.pending, jobs);

        let mut started = Vec::new();
        let mut left_pending = Vec::new();

        for &job_id in &self.pending {
            let job = &jobs[job_id];
            debug_assert_eq!(job.state, JobState::Pend);

            if job.reservation.is_some() {
                left_pending.push(job_id);
                continue;
            }

            let candidates: Vec<HostId> = cluster
                .hosts()
                .iter()
                .filter(|host| self.is_host_eligible(host.id) && host.can_run(job))
                .map(|host| host.id)
                .collect();

            let chosen = self.algorithm.select_host(job, cluster, &candidates);
            let Some(host_id) = chosen else {
                left_pending.push(job_id);
                continue;
            };

            if !cluster.try_assign(host_id, job) {
                left_pending.push(job_id);
                continue;
            }

            let job = &mut jobs[job_id];
            let host_factor = cluster.host(host_id).cpu_factor;
            job.state = JobState::Run;
            job.start_time = Some(ctx.now);
            job.run_host = Some(host_id);
            job.run_time = job.estimate_run_time(host_factor, ctx.runtime_multiplier);
            job.update_total_pending_duration(ctx.now);

            started.push(StartedJob {
                job_id,
                host_id,
                finish_time: ctx.now + job.run_time,
            });
        }

        let still_pending = !left_pending.is_empty();
        self.pending = left_pending;
        (started, still_pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::algorithm_resolver;
    use crate::config::sim_config::HostConfig;
    use crate::host::HostStatus;
    use crate::workload_generators::events::ScenarioEntry;

    fn cluster(slots_per_host: &[u32]) -> Cluster {
        let configs: Vec<HostConfig> = slots_per_host
            .iter()
            .enumerate()
            .map(|(i, &slots)| HostConfig {
                name: format!("h{i}"),
                slots,
                memory: 4096,
                cpu_factor: 1.0,
                status: HostStatus::Ok,
            })
            .collect();
        Cluster::new(&configs)
    }

    fn fcfs_queue() -> Queue {
        Queue::new(
            0,
            "normal".to_string(),
            0,
            None,
            algorithm_resolver("fcfs").unwrap(),
        )
    }

    fn make_job(id: JobId, slots: u32, submit_time: Ms) -> Job {
        Job::from_entry(
            id,
            0,
            &ScenarioEntry {
                submit_time,
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
    fn pass_binds_what_fits_and_keeps_the_rest() {
        let mut cluster = cluster(&[1, 1]);
        let mut jobs = vec![make_job(0, 1, 0), make_job(1, 1, 0), make_job(2, 1, 0)];
        let mut queue = fcfs_queue();
        for job in jobs.iter_mut() {
            queue.enqueue(job, 0);
        }

        let ctx = DispatchContext {
            now: 0,
            runtime_multiplier: 1.0,
        };
        let (started, still_pending) = queue.dispatch(&mut jobs, &mut cluster, &ctx);

        assert_eq!(started.len(), 2);
        assert!(still_pending);
        assert_eq!(queue.pending(), &[2]);
        assert_eq!(jobs[0].state, JobState::Run);
        assert_eq!(jobs[0].run_host, Some(0));
        assert_eq!(jobs[1].run_host, Some(1));
        assert_eq!(jobs[2].state, JobState::Pend);
        assert_eq!(started[0].finish_time, 1000);
    }

    #[test]
    fn later_jobs_pass_a_stuck_head() {
        let mut cluster = cluster(&[1]);
        // Head wants 2 slots and can never fit on this pass; the next job can.
        let mut jobs = vec![make_job(0, 2, 0), make_job(1, 1, 0)];
        let mut queue = fcfs_queue();
        for job in jobs.iter_mut() {
            queue.enqueue(job, 0);
        }

        let ctx = DispatchContext {
            now: 0,
            runtime_multiplier: 1.0,
        };
        let (started, still_pending) = queue.dispatch(&mut jobs, &mut cluster, &ctx);
        assert_eq!(started.len(), 1);
        assert_eq!(started[0].job_id, 1);
        assert!(still_pending);
    }

    #[test]
    fn eligible_set_restricts_placement() {
        let mut cluster = cluster(&[1, 1]);
        let mut eligible = FxHashSet::default();
        eligible.insert(1);
        let mut queue = Queue::new(
            0,
            "restricted".to_string(),
            0,
            Some(eligible),
            algorithm_resolver("fcfs").unwrap(),
        );

        let mut jobs = vec![make_job(0, 1, 0)];
        queue.enqueue(&mut jobs[0], 0);

        let ctx = DispatchContext {
            now: 0,
            runtime_multiplier: 1.0,
        };
        let (started, _) = queue.dispatch(&mut jobs, &mut cluster, &ctx);
        assert_eq!(started[0].host_id, 1);
    }

    #[test]
    fn reserved_jobs_are_skipped() {
        let mut cluster = cluster(&[2]);
        let mut jobs = vec![make_job(0, 1, 0)];
        let mut queue = fcfs_queue();
        queue.enqueue(&mut jobs[0], 0);
        jobs[0].reservation = Some(0);

        let ctx = DispatchContext {
            now: 0,
            runtime_multiplier: 1.0,
        };
        let (started, still_pending) = queue.dispatch(&mut jobs, &mut cluster, &ctx);
        assert!(started.is_empty());
        assert!(still_pending);
        assert_eq!(jobs[0].state, JobState::Pend);
    }
}
