use std::time::Instant;

use log::Level;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::algorithms::algorithm_resolver;
use crate::cluster::Cluster;
use crate::config::sim_config::SimulationConfig;
use crate::dispatcher::{dispatch_pass, queue_order, Dispatcher};
use crate::error::{Result, SimError};
use crate::event_queue::{EventItem, EventPayload, EventQueue};
use crate::host::HostStatus;
use crate::job::{Job, JobState};
use crate::monitoring::{JobmartRecord, Monitoring};
use crate::queue::{DispatchContext, Queue, StartedJob};
use crate::workload_generators::events::ScenarioEntry;
use crate::{EventId, HostId, JobId, Ms};

const DISPATCH_PRIORITY: u8 = 1;

/// End-of-run totals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulationSummary {
    pub num_submitted: usize,
    pub num_successful: usize,
    pub num_failed: usize,
    pub num_pending_at_end: usize,
    pub latest_finish_time: Ms,
    pub total_pending_duration: Ms,
    pub total_queuing_time: Ms,
    pub dispatch_passes: usize,
    pub processed_events: u64,
}

/// The event-driven simulator: virtual clock, event queue, cluster, queues,
/// job table, statistics and log sinks.
///
/// Ownership is hierarchical: the simulation owns everything, and jobs refer
/// to their queue and host by id, never by live handle.
pub struct ClusterSimulation {
    config: SimulationConfig,

    current_time: Ms,
    events: EventQueue,
    started: bool,

    cluster: Cluster,
    queues: Vec<Queue>,
    queue_order: Vec<usize>,
    queue_index: FxHashMap<String, usize>,
    jobs: Vec<Job>,

    scenario: Vec<ScenarioEntry>,
    remaining_scenario: usize,

    dispatcher: Dispatcher,
    next_dispatch_reserved: bool,
    next_dispatch_event: EventId,

    monitoring: Monitoring,

    num_submitted: usize,
    newly_submitted: usize,
    num_successful: usize,
    num_failed: usize,
    num_running: usize,
    latest_finish_time: Ms,
    total_pending_duration: Ms,
    total_queuing_time: Ms,
    dispatch_passes: usize,
    processed_events: u64,
}

impl ClusterSimulation {
    pub fn new(config: SimulationConfig, scenario: Vec<ScenarioEntry>) -> Result<Self> {
        config.validate()?;

        let cluster = Cluster::new(&config.hosts);

        let mut queues = Vec::with_capacity(config.queues.len());
        let mut queue_index = FxHashMap::default();
        for (id, queue_config) in config.queues.iter().enumerate() {
            let eligible = match &queue_config.hosts {
                Some(names) => {
                    let mut set = FxHashSet::default();
                    for name in names {
                        // Already checked by config validation.
                        let host_id = cluster.find_host(name).ok_or_else(|| {
                            SimError::Config(format!("unknown host {name}"))
                        })?;
                        set.insert(host_id);
                    }
                    Some(set)
                }
                None => None,
            };
            let algorithm = algorithm_resolver(&queue_config.algorithm)?;
            queue_index.insert(queue_config.name.clone(), id);
            queues.push(Queue::new(
                id,
                queue_config.name.clone(),
                queue_config.priority,
                eligible,
                algorithm,
            ));
        }

        for (index, entry) in scenario.iter().enumerate() {
            if entry.slot_required == 0 {
                return Err(SimError::Config(format!(
                    "scenario entry {index} requires zero slots"
                )));
            }
            if !config.use_only_default_queue && !queue_index.contains_key(&entry.queue_name) {
                return Err(SimError::Config(format!(
                    "scenario entry {index} references unknown queue {}",
                    entry.queue_name
                )));
            }
        }

        let monitoring = Monitoring::new(&config.output)?;
        let queue_order = queue_order(&queues);
        let remaining_scenario = scenario.len();

        Ok(ClusterSimulation {
            config,
            current_time: 0,
            events: EventQueue::new(),
            started: false,
            cluster,
            queues,
            queue_order,
            queue_index,
            jobs: Vec::new(),
            scenario,
            remaining_scenario,
            dispatcher: Dispatcher::new(),
            next_dispatch_reserved: false,
            next_dispatch_event: 0,
            monitoring,
            num_submitted: 0,
            newly_submitted: 0,
            num_successful: 0,
            num_failed: 0,
            num_running: 0,
            latest_finish_time: 0,
            total_pending_duration: 0,
            total_queuing_time: 0,
            dispatch_passes: 0,
            processed_events: 0,
        })
    }

    pub fn current_time(&self) -> Ms {
        self.current_time
    }

    pub fn cluster(&self) -> &Cluster {
        &self.cluster
    }

    pub fn jobs(&self) -> &[Job] {
        &self.jobs
    }

    pub fn monitoring(&self) -> &Monitoring {
        &self.monitoring
    }

    pub fn default_queue(&self) -> &Queue {
        &self.queues[0]
    }

    pub fn find_queue(&self, name: &str) -> Option<&Queue> {
        self.queue_index.get(name).map(|&id| &self.queues[id])
    }

    pub fn event_count(&self) -> usize {
        self.events.len()
    }

    /// Schedule an event after a delay. Returns the event's identity.
    pub fn after_delay(&mut self, delay: Ms, payload: EventPayload, priority: u8) -> EventId {
        let time = self.current_time + delay;
        log::trace!(
            "event [{}] scheduled at {} ms for {} ms",
            payload.kind().as_str(),
            self.current_time,
            time
        );
        self.events.push(time, priority, payload)
    }

    pub fn erase_event(&mut self, event_id: EventId) {
        if self.events.erase(event_id) {
            log::trace!("event {event_id} erased");
        }
    }

    pub fn add_delay(&mut self, event_id: EventId, delay: Ms) {
        if self.events.add_delay(event_id, delay) {
            log::trace!("event {event_id} delayed by {delay} ms");
        }
    }

    /// Make sure a dispatch pass happens at the current time. If the chain is
    /// armed for a later time it is pulled back to now; if it is armed for
    /// now already, nothing happens.
    pub fn reserve_dispatch_event(&mut self) {
        if self.next_dispatch_reserved {
            match self.events.find(self.next_dispatch_event) {
                Some(event) if event.time <= self.current_time => return,
                Some(_) => {
                    self.events.erase(self.next_dispatch_event);
                }
                None => {}
            }
        }
        self.next_dispatch_event =
            self.events
                .push(self.current_time, DISPATCH_PRIORITY, EventPayload::Dispatch);
        self.next_dispatch_reserved = true;
    }

    /// Place a future-capacity claim: the job will be bound to the host at
    /// time `at`, and until then dispatch passes will not hand the claimed
    /// capacity to anyone else.
    pub fn reserve_job(&mut self, job_id: JobId, host_id: HostId, at: Ms) -> bool {
        let job = &self.jobs[job_id];
        if job.state != JobState::Pend || job.reservation.is_some() || at < self.current_time {
            return false;
        }
        if !self.queues[job.queue_id].is_host_eligible(host_id) {
            return false;
        }
        if !self.cluster.reserve(host_id, job) {
            return false;
        }
        self.jobs[job_id].reservation = Some(host_id);
        self.events
            .push(at, 0, EventPayload::JobReserved { job_id, host_id });
        self.monitoring.log(
            Level::Info,
            format_args!(
                "job {job_id} reserved on host {} for {at} ms",
                self.cluster.host(host_id).name
            ),
        );
        true
    }

    pub fn set_host_status(&mut self, host_name: &str, status: HostStatus) -> bool {
        match self.cluster.find_host(host_name) {
            Some(host_id) => {
                self.cluster.set_host_status(host_id, status);
                self.monitoring.log(
                    Level::Info,
                    format_args!("host {host_name} status set to {status:?}"),
                );
                true
            }
            None => false,
        }
    }

    /// Drive the loop until the event queue is empty.
    pub fn run(&mut self) -> SimulationSummary {
        self.start();
        let wall_clock = Instant::now();

        while let Some(event) = self.events.pop() {
            self.execute(event);
        }

        let elapsed = wall_clock.elapsed();
        self.print_summary();
        log::info!(
            "processed {} events in {:.3} s ({:.0} events/s)",
            self.processed_events,
            elapsed.as_secs_f64(),
            self.processed_events as f64 / elapsed.as_secs_f64().max(f64::EPSILON)
        );
        self.monitoring.finalize();
        self.summary()
    }

    /// Drive the loop through every event scheduled up to and including
    /// `until`, then advance the clock to `until`.
    pub fn run_until(&mut self, until: Ms) {
        self.start();
        while let Some(event) = self.events.peek() {
            if event.time > until {
                break;
            }
            let event = self.events.pop().expect("peeked event is there");
            self.execute(event);
        }
        if self.current_time < until {
            self.current_time = until;
        }
    }

    /// Execute a single event; false when the queue is drained.
    pub fn step(&mut self) -> bool {
        self.start();
        match self.events.pop() {
            Some(event) => {
                self.execute(event);
                true
            }
            None => false,
        }
    }

    pub fn summary(&self) -> SimulationSummary {
        SimulationSummary {
            num_submitted: self.num_submitted,
            num_successful: self.num_successful,
            num_failed: self.num_failed,
            num_pending_at_end: self.total_pending(),
            latest_finish_time: self.latest_finish_time,
            total_pending_duration: self.total_pending_duration,
            total_queuing_time: self.total_queuing_time,
            dispatch_passes: self.dispatch_passes,
            processed_events: self.processed_events,
        }
    }

    /// Schedule the initial events: the periodic log and counting ticks, one
    /// submission event per scenario entry and the first dispatch.
    fn start(&mut self) {
        if self.started {
            return;
        }
        self.started = true;

        self.monitoring.log(
            Level::Info,
            format_args!(
                "simulation started: {} hosts, {} queues, {} scenario entries",
                self.cluster.num_hosts(),
                self.queues.len(),
                self.scenario.len()
            ),
        );

        self.after_delay(self.config.timing.logging_frequency, EventPayload::LogTick, 0);
        self.after_delay(
            self.config.timing.counting_frequency,
            EventPayload::CountTick,
            0,
        );
        for entry_index in 0..self.scenario.len() {
            let time = self.scenario[entry_index].submit_time.max(self.current_time);
            self.events
                .push(time, 0, EventPayload::JobSubmission { entry_index });
        }
        self.reserve_dispatch_event();
    }

    fn execute(&mut self, event: EventItem) {
        assert!(
            event.time >= self.current_time,
            "event {} would move time backwards ({} < {})",
            event.id,
            event.time,
            self.current_time
        );
        self.current_time = event.time;
        self.processed_events += 1;
        log::trace!(
            "event [{}] fires at {} ms",
            event.payload.kind().as_str(),
            event.time
        );

        match event.payload {
            EventPayload::JobSubmission { entry_index } => self.handle_submission(entry_index),
            EventPayload::JobFinished { job_id } => self.handle_job_finished(job_id),
            EventPayload::JobReserved { job_id, host_id } => {
                self.handle_job_reserved(job_id, host_id)
            }
            EventPayload::Dispatch => self.handle_dispatch(),
            EventPayload::LogTick => self.handle_log_tick(),
            EventPayload::CountTick => self.handle_count_tick(),
        }
    }

    fn handle_submission(&mut self, entry_index: usize) {
        let entry = self.scenario[entry_index].clone();
        self.remaining_scenario -= 1;

        let queue_id = if self.config.use_only_default_queue {
            0
        } else {
            // Validated at setup.
            self.queue_index[&entry.queue_name]
        };

        let job_id = self.jobs.len();
        let mut job = Job::from_entry(job_id, queue_id, &entry);
        self.queues[queue_id].enqueue(&mut job, self.current_time);
        self.jobs.push(job);

        self.num_submitted += 1;
        self.newly_submitted += 1;

        if log::log_enabled!(log::Level::Debug) {
            log::debug!(
                "submission: {}",
                serde_json::to_string(&entry).unwrap_or_default()
            );
        }
        self.monitoring
            .log_job_submit(self.current_time, job_id, &entry.queue_name, entry.slot_required);
        self.monitoring.log(
            Level::Info,
            format_args!(
                "job {job_id} submitted to queue {}",
                self.queues[queue_id].name
            ),
        );

        self.reserve_dispatch_event();
    }

    fn handle_dispatch(&mut self) {
        self.next_dispatch_reserved = false;
        self.dispatch_passes += 1;

        let version = self.cluster.version();
        if self.dispatcher.is_current(version) {
            // Nothing changed since the last pass. Keep polling while an
            // in-flight job can still move the version; otherwise the chain
            // ends here and a later submission or finish re-arms it.
            let drained = self.remaining_scenario == 0;
            if drained && (self.total_pending() == 0 || self.num_running == 0) {
                let stuck = self
                    .jobs
                    .iter()
                    .filter(|j| j.state == JobState::Pend && j.reservation.is_none())
                    .count();
                if stuck > 0 {
                    self.monitoring.log(
                        Level::Warn,
                        format_args!(
                            "{stuck} pending jobs cannot be dispatched on any eligible host"
                        ),
                    );
                }
                return;
            }
            self.rearm_dispatch();
            return;
        }
        self.dispatcher.observe(version);

        let ctx = DispatchContext {
            now: self.current_time,
            runtime_multiplier: self.config.runtime_multiplier,
        };
        let (started, still_pending) = dispatch_pass(
            &mut self.queues,
            &self.queue_order,
            &mut self.jobs,
            &mut self.cluster,
            &ctx,
        );

        for binding in started {
            self.on_job_started(binding);
        }

        if still_pending {
            self.rearm_dispatch();
        } else {
            self.dispatcher.reset();
        }

        self.monitoring.record_dispatch_sample(
            self.current_time,
            self.cluster.used_slots(),
            self.total_pending(),
        );
    }

    fn on_job_started(&mut self, binding: StartedJob) {
        let job = &self.jobs[binding.job_id];
        self.total_pending_duration += job.total_pending_duration;
        self.num_running += 1;
        self.after_delay(
            binding.finish_time - self.current_time,
            EventPayload::JobFinished {
                job_id: binding.job_id,
            },
            0,
        );
        self.monitoring.log(
            Level::Info,
            format_args!(
                "job {} started on host {} (runs {} ms)",
                binding.job_id,
                self.cluster.host(binding.host_id).name,
                self.jobs[binding.job_id].run_time
            ),
        );
    }

    fn handle_job_finished(&mut self, job_id: JobId) {
        let job = &self.jobs[job_id];
        debug_assert_eq!(job.state, JobState::Run);
        let host_id = job.run_host.expect("running job is bound to a host");
        let failed = self.cluster.host(host_id).status != HostStatus::Ok;

        self.cluster.release(host_id, job);

        let job = &mut self.jobs[job_id];
        job.finish_time = Some(self.current_time);
        job.state = if failed { JobState::Exit } else { JobState::Done };
        let start_time = job.start_time.expect("finished job has a start time");
        let pend_time = job.total_pending_duration;
        let queue_id = job.queue_id;

        self.num_running -= 1;
        if failed {
            self.num_failed += 1;
            self.monitoring.log(
                Level::Warn,
                format_args!(
                    "job {job_id} failed: host {} became unavailable mid-run",
                    self.cluster.host(host_id).name
                ),
            );
        } else {
            self.num_successful += 1;
            self.monitoring
                .log(Level::Info, format_args!("job {job_id} finished"));
        }
        self.latest_finish_time = self.current_time;
        self.total_queuing_time += pend_time;

        let record = JobmartRecord {
            start_time,
            finish_time: self.current_time,
            queue_name: self.queues[queue_id].name.clone(),
            run_host_name: self.cluster.host(host_id).name.clone(),
            slot_required: self.jobs[job_id].slot_required,
            job_id,
            pend_time,
            run_time: self.current_time - start_time,
        };
        self.monitoring.log_jobmart(record);

        self.reserve_dispatch_event();
    }

    fn handle_job_reserved(&mut self, job_id: JobId, host_id: HostId) {
        let job = &self.jobs[job_id];
        debug_assert_eq!(job.state, JobState::Pend);
        debug_assert_eq!(job.reservation, Some(host_id));

        if self.cluster.host(host_id).status != HostStatus::Ok {
            // The claimed host went away; give the claim up and let the
            // dispatcher find another home.
            self.cluster.release_reservation(host_id, job);
            self.jobs[job_id].reservation = None;
            self.monitoring.log(
                Level::Warn,
                format_args!(
                    "reservation for job {job_id} abandoned: host {} is unavailable",
                    self.cluster.host(host_id).name
                ),
            );
            self.reserve_dispatch_event();
            return;
        }

        self.cluster.take_reservation(host_id, job);
        let host_factor = self.cluster.host(host_id).cpu_factor;

        let job = &mut self.jobs[job_id];
        job.reservation = None;
        job.state = JobState::Run;
        job.start_time = Some(self.current_time);
        job.run_host = Some(host_id);
        job.run_time = job.estimate_run_time(host_factor, self.config.runtime_multiplier);
        job.update_total_pending_duration(self.current_time);
        let run_time = job.run_time;
        let queue_id = job.queue_id;

        self.queues[queue_id].remove_pending(job_id);
        self.on_job_started(StartedJob {
            job_id,
            host_id,
            finish_time: self.current_time + run_time,
        });
    }

    fn handle_log_tick(&mut self) {
        self.monitoring.log(
            Level::Info,
            format_args!(
                "time {} ms: {} pending, {} running, {} finished, {} slots in use",
                self.current_time,
                self.total_pending(),
                self.num_running,
                self.num_successful + self.num_failed,
                self.cluster.used_slots()
            ),
        );
        if self.has_outstanding_work() {
            self.after_delay(self.config.timing.logging_frequency, EventPayload::LogTick, 0);
        }
    }

    fn handle_count_tick(&mut self) {
        let count = std::mem::take(&mut self.newly_submitted);
        self.monitoring.log(
            Level::Info,
            format_args!("{count} jobs submitted in the last counting window"),
        );
        if self.has_outstanding_work() {
            self.after_delay(
                self.config.timing.counting_frequency,
                EventPayload::CountTick,
                0,
            );
        }
    }

    fn rearm_dispatch(&mut self) {
        self.next_dispatch_event = self.after_delay(
            self.config.timing.dispatch_frequency,
            EventPayload::Dispatch,
            DISPATCH_PRIORITY,
        );
        self.next_dispatch_reserved = true;
    }

    fn total_pending(&self) -> usize {
        self.queues.iter().map(|q| q.num_pending()).sum()
    }

    /// Whether the run can still make progress. Pending jobs alone do not
    /// count: once the dispatch chain has given up on them, keeping periodic
    /// ticks alive would stop the event queue from ever draining.
    fn has_outstanding_work(&self) -> bool {
        self.remaining_scenario > 0 || self.num_running > 0 || self.next_dispatch_reserved
    }

    fn print_summary(&mut self) {
        let finished = self.num_successful + self.num_failed;
        self.monitoring.log(
            Level::Info,
            format_args!(
                "simulation finished at {} ms: {} submitted, {} successful, {} failed, {} still pending",
                self.current_time,
                self.num_submitted,
                self.num_successful,
                self.num_failed,
                self.total_pending()
            ),
        );
        self.monitoring.log(
            Level::Info,
            format_args!(
                "latest finish time {} ms, mean pending duration {} ms, total queuing time {} ms",
                self.latest_finish_time,
                self.total_queuing_time / finished.max(1) as Ms,
                self.total_queuing_time
            ),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::sim_config::{HostConfig, OutputConfig, QueueConfig, TimingConfig};

    fn config() -> SimulationConfig {
        SimulationConfig {
            hosts: vec![HostConfig {
                name: "h0".to_string(),
                slots: 1,
                memory: 1024,
                cpu_factor: 1.0,
                status: HostStatus::Ok,
            }],
            queues: vec![QueueConfig {
                name: "normal".to_string(),
                priority: 0,
                hosts: None,
                algorithm: "fcfs".to_string(),
            }],
            output: OutputConfig::disabled(),
            timing: TimingConfig::default(),
            use_only_default_queue: false,
            runtime_multiplier: 1.0,
        }
    }

    fn entry(queue_name: &str) -> ScenarioEntry {
        ScenarioEntry {
            submit_time: 0,
            queue_name: queue_name.to_string(),
            slot_required: 1,
            mem_required: 64,
            cpu_time: 500,
            non_cpu_time: 500,
            priority: 0,
        }
    }

    #[test]
    fn unknown_scenario_queue_is_a_setup_error() {
        let result = ClusterSimulation::new(config(), vec![entry("missing")]);
        assert!(matches!(result, Err(SimError::Config(_))));
    }

    #[test]
    fn unknown_queue_is_fine_when_collapsed_to_default() {
        let mut cfg = config();
        cfg.use_only_default_queue = true;
        let mut sim = ClusterSimulation::new(cfg, vec![entry("missing")]).unwrap();
        let summary = sim.run();
        assert_eq!(summary.num_successful, 1);
    }

    #[test]
    fn reserve_dispatch_event_never_arms_twice_for_the_same_time() {
        let mut sim = ClusterSimulation::new(config(), vec![]).unwrap();
        sim.reserve_dispatch_event();
        let events_after_first = sim.event_count();
        sim.reserve_dispatch_event();
        assert_eq!(sim.event_count(), events_after_first);
    }
}
