use crate::cluster::Cluster;
use crate::job::Job;
use crate::queue::{DispatchContext, Queue, StartedJob};

/// Version-tracking state of the dispatch control loop.
///
/// The dispatcher only scans the pending queues when the cluster version
/// moved since its last pass; otherwise the pass is known to be idempotent
/// and is skipped. `reset` drops the observation to zero so the next
/// host-state change is guaranteed to look fresh.
pub struct Dispatcher {
    latest_observed_version: u64,
}

impl Dispatcher {
    pub fn new() -> Self {
        Dispatcher {
            latest_observed_version: 0,
        }
    }

    pub fn is_current(&self, version: u64) -> bool {
        version == self.latest_observed_version
    }

    pub fn observe(&mut self, version: u64) {
        self.latest_observed_version = version;
    }

    pub fn reset(&mut self) {
        self.latest_observed_version = 0;
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

/// Run one dispatch pass over every queue, in (queue priority desc, id asc)
/// order. Returns all bindings made plus whether any job is still pending.
pub fn dispatch_pass(
    queues: &mut [Queue],
    order: &[usize],
    jobs: &mut [Job],
    cluster: &mut Cluster,
    ctx: &DispatchContext,
) -> (Vec<StartedJob>, bool) {
    let mut started = Vec::new();
    let mut still_pending = false;

    for &queue_id in order {
        let (queue_started, queue_pending) = queues[queue_id].dispatch(jobs, cluster, ctx);
        started.extend(queue_started);
        still_pending |= queue_pending;
    }

    (started, still_pending)
}

/// Queue evaluation order: higher priority first, id as the tie-break.
pub fn queue_order(queues: &[Queue]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..queues.len()).collect();
    order.sort_by(|&a, &b| {
        queues[b]
            .priority
            .cmp(&queues[a].priority)
            .then(a.cmp(&b))
    });
    order
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::algorithm_resolver;

    fn queue(id: usize, priority: i64) -> Queue {
        Queue::new(
            id,
            format!("q{id}"),
            priority,
            None,
            algorithm_resolver("fcfs").unwrap(),
        )
    }

    #[test]
    fn higher_priority_queues_dispatch_first() {
        let queues = vec![queue(0, 10), queue(1, 30), queue(2, 10)];
        assert_eq!(queue_order(&queues), vec![1, 0, 2]);
    }

    #[test]
    fn version_observation() {
        let mut dispatcher = Dispatcher::new();
        assert!(dispatcher.is_current(0));
        assert!(!dispatcher.is_current(3));

        dispatcher.observe(3);
        assert!(dispatcher.is_current(3));

        dispatcher.reset();
        assert!(!dispatcher.is_current(3));
    }
}
