#![doc = include_str!("../readme.md")]

pub mod algorithms;
pub mod cluster;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod event_queue;
pub mod host;
pub mod job;
pub mod monitoring;
pub mod queue;
pub mod simulation;
pub mod workload_generators;

/// Simulated time, milliseconds since epoch.
pub type Ms = u64;
pub type EventId = u64;
pub type JobId = usize;
pub type HostId = usize;

pub use config::sim_config::SimulationConfig;
pub use error::{Result, SimError};
pub use event_queue::{EventPayload, EventQueue};
pub use host::HostStatus;
pub use job::{Job, JobState};
pub use simulation::{ClusterSimulation, SimulationSummary};
pub use workload_generators::events::ScenarioEntry;
pub use workload_generators::generator::ScenarioSource;
