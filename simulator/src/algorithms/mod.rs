pub mod algorithm;
pub mod default;

pub use algorithm::{algorithm_resolver, QueueAlgorithm};
