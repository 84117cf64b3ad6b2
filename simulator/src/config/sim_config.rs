use serde::{Deserialize, Serialize};

use crate::error::{Result, SimError};
use crate::host::HostStatus;
use crate::Ms;

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct HostConfig {
    pub name: String,
    pub slots: u32,
    pub memory: u64,
    #[serde(default = "default_cpu_factor")]
    pub cpu_factor: f64,
    #[serde(default = "default_host_status")]
    pub status: HostStatus,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct QueueConfig {
    pub name: String,
    #[serde(default)]
    pub priority: i64,
    /// Eligible host names; absent means every host is eligible.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hosts: Option<Vec<String>>,
    #[serde(default = "default_algorithm")]
    pub algorithm: String,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(default)]
pub struct OutputConfig {
    pub log_directory: String,
    pub console_output: bool,
    pub log_file_output: bool,
    pub jobmart_file_output: bool,
    pub slots_file_output: bool,
    pub job_submit_file_output: bool,
    pub log_output_file_name: String,
    pub jobmart_file_name: String,
    pub performance_file_name: String,
    pub pending_file_name: String,
    pub job_submit_file_name: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        OutputConfig {
            log_directory: "logs".to_string(),
            console_output: false,
            log_file_output: true,
            jobmart_file_output: true,
            slots_file_output: true,
            job_submit_file_output: true,
            log_output_file_name: "log_output.txt".to_string(),
            jobmart_file_name: "jobmart_raw_replica.txt".to_string(),
            performance_file_name: "performance.txt".to_string(),
            pending_file_name: "pending.txt".to_string(),
            job_submit_file_name: "job_submit.txt".to_string(),
        }
    }
}

impl OutputConfig {
    /// All sinks off; used by tests and library consumers that only want the
    /// in-memory records.
    pub fn disabled() -> Self {
        OutputConfig {
            console_output: false,
            log_file_output: false,
            jobmart_file_output: false,
            slots_file_output: false,
            job_submit_file_output: false,
            ..OutputConfig::default()
        }
    }

    pub fn any_file_output(&self) -> bool {
        self.log_file_output
            || self.jobmart_file_output
            || self.slots_file_output
            || self.job_submit_file_output
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(default)]
pub struct TimingConfig {
    pub dispatch_frequency: Ms,
    pub logging_frequency: Ms,
    pub counting_frequency: Ms,
}

impl Default for TimingConfig {
    fn default() -> Self {
        TimingConfig {
            dispatch_frequency: 1000,
            logging_frequency: 10000,
            counting_frequency: 10000,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct SimulationConfig {
    pub hosts: Vec<HostConfig>,
    /// The first queue is the default queue.
    pub queues: Vec<QueueConfig>,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub timing: TimingConfig,
    #[serde(default)]
    pub use_only_default_queue: bool,
    #[serde(default = "default_runtime_multiplier")]
    pub runtime_multiplier: f64,
}

fn default_cpu_factor() -> f64 {
    1.0
}

fn default_host_status() -> HostStatus {
    HostStatus::Ok
}

fn default_algorithm() -> String {
    "fcfs".to_string()
}

fn default_runtime_multiplier() -> f64 {
    1.0
}

impl SimulationConfig {
    pub fn from_file(path: &str) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| SimError::Config(format!("can't read config file {path}: {e}")))?;
        let config: SimulationConfig = serde_yaml::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.hosts.is_empty() {
            return Err(SimError::Config("no hosts defined".to_string()));
        }
        if self.queues.is_empty() {
            return Err(SimError::Config("no queues defined".to_string()));
        }
        if self.runtime_multiplier <= 0.0 {
            return Err(SimError::Config(format!(
                "runtime_multiplier must be positive, got {}",
                self.runtime_multiplier
            )));
        }

        let mut host_names = std::collections::BTreeSet::new();
        for host in &self.hosts {
            if host.slots == 0 {
                return Err(SimError::Config(format!(
                    "host {} has zero slots",
                    host.name
                )));
            }
            if host.cpu_factor <= 0.0 {
                return Err(SimError::Config(format!(
                    "host {} has non-positive cpu factor",
                    host.name
                )));
            }
            if !host_names.insert(host.name.as_str()) {
                return Err(SimError::Config(format!(
                    "duplicate host name {}",
                    host.name
                )));
            }
        }

        let mut queue_names = std::collections::BTreeSet::new();
        for queue in &self.queues {
            if !queue_names.insert(queue.name.as_str()) {
                return Err(SimError::Config(format!(
                    "duplicate queue name {}",
                    queue.name
                )));
            }
            if let Some(hosts) = &queue.hosts {
                for name in hosts {
                    if !host_names.contains(name.as_str()) {
                        return Err(SimError::Config(format!(
                            "queue {} references unknown host {}",
                            queue.name, name
                        )));
                    }
                }
            }
        }
        Ok(())
    }
}
