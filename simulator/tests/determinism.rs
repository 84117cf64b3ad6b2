use cluster_replay::config::sim_config::{
    HostConfig, OutputConfig, QueueConfig, SimulationConfig, TimingConfig,
};
use cluster_replay::workload_generators::random::RandomScenarioGenerator;
use cluster_replay::{ClusterSimulation, HostStatus, ScenarioSource};

fn build() -> ClusterSimulation {
    let config = SimulationConfig {
        hosts: vec![
            HostConfig {
                name: "small".to_string(),
                slots: 4,
                memory: 4096,
                cpu_factor: 1.0,
                status: HostStatus::Ok,
            },
            HostConfig {
                name: "big".to_string(),
                slots: 16,
                memory: 16384,
                cpu_factor: 1.5,
                status: HostStatus::Ok,
            },
            HostConfig {
                name: "fast".to_string(),
                slots: 8,
                memory: 8192,
                cpu_factor: 2.0,
                status: HostStatus::Ok,
            },
        ],
        queues: vec![
            QueueConfig {
                name: "normal".to_string(),
                priority: 10,
                hosts: None,
                algorithm: "fcfs".to_string(),
            },
            QueueConfig {
                name: "urgent".to_string(),
                priority: 20,
                hosts: None,
                algorithm: "priority".to_string(),
            },
            QueueConfig {
                name: "batch".to_string(),
                priority: 5,
                hosts: Some(vec!["big".to_string(), "fast".to_string()]),
                algorithm: "best-fit".to_string(),
            },
        ],
        output: OutputConfig::disabled(),
        timing: TimingConfig::default(),
        use_only_default_queue: false,
        runtime_multiplier: 1.0,
    };

    let mut generator = RandomScenarioGenerator {
        jobs_count: 60,
        queue_names: vec![
            "normal".to_string(),
            "urgent".to_string(),
            "batch".to_string(),
        ],
        slots_min: 1,
        slots_max: 4,
        mem_min: 64,
        mem_max: 1024,
        cpu_time_mean: 2000.0,
        cpu_time_dev: 600.0,
        non_cpu_time_mean: 100.0,
        non_cpu_time_dev: 30.0,
        delay_min: 0,
        delay_max: 400,
        seed: 7,
    };
    let scenario = generator.entries().unwrap();

    ClusterSimulation::new(config, scenario).unwrap()
}

#[test]
fn identical_runs_produce_identical_output() {
    let mut first = build();
    let first_summary = first.run();

    let mut second = build();
    let second_summary = second.run();

    assert_eq!(first_summary, second_summary);
    assert_eq!(first_summary.num_submitted, 60);
    assert_eq!(
        first_summary.num_submitted,
        first_summary.num_successful
            + first_summary.num_failed
            + first_summary.num_pending_at_end
    );

    let first_records = first.monitoring().jobmart_records();
    let second_records = second.monitoring().jobmart_records();
    assert!(!first_records.is_empty());
    assert_eq!(first_records, second_records);
}
