use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use rand_pcg::Pcg64;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SimError};
use crate::Ms;

use super::{events::ScenarioEntry, generator::ScenarioSource};

/// Synthetic scenario generator. Deterministic for a fixed seed, so runs
/// built from it stay reproducible.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct RandomScenarioGenerator {
    pub jobs_count: u32,
    pub queue_names: Vec<String>,
    pub slots_min: u32,
    pub slots_max: u32,
    pub mem_min: u64,
    pub mem_max: u64,
    pub cpu_time_mean: f64,
    pub cpu_time_dev: f64,
    pub non_cpu_time_mean: f64,
    pub non_cpu_time_dev: f64,
    /// Gap between consecutive submissions, ms.
    pub delay_min: Ms,
    pub delay_max: Ms,
    pub seed: u64,
}

impl RandomScenarioGenerator {
    pub fn from_options(options: &serde_yaml::Value) -> Result<Self> {
        Ok(serde_yaml::from_value(options.clone())?)
    }

    fn sample_duration(rng: &mut Pcg64, normal: &Normal<f64>) -> Ms {
        let sampled = normal.sample(rng);
        if sampled < 1.0 {
            1
        } else {
            sampled.round() as Ms
        }
    }
}

impl ScenarioSource for RandomScenarioGenerator {
    fn entries(&mut self) -> Result<Vec<ScenarioEntry>> {
        if self.queue_names.is_empty() {
            return Err(SimError::Config(
                "random scenario needs at least one queue name".to_string(),
            ));
        }

        let cpu_distribution = Normal::new(self.cpu_time_mean, self.cpu_time_dev)
            .map_err(|e| SimError::Config(format!("bad cpu time distribution: {e}")))?;
        let non_cpu_distribution = Normal::new(self.non_cpu_time_mean, self.non_cpu_time_dev)
            .map_err(|e| SimError::Config(format!("bad non-cpu time distribution: {e}")))?;

        let mut rng = Pcg64::seed_from_u64(self.seed);
        let mut entries = Vec::with_capacity(self.jobs_count as usize);
        let mut time: Ms = 0;

        for i in 0..self.jobs_count {
            entries.push(ScenarioEntry {
                submit_time: time,
                queue_name: self.queue_names[i as usize % self.queue_names.len()].clone(),
                slot_required: rng.gen_range(self.slots_min..=self.slots_max),
                mem_required: rng.gen_range(self.mem_min..=self.mem_max),
                cpu_time: Self::sample_duration(&mut rng, &cpu_distribution),
                non_cpu_time: Self::sample_duration(&mut rng, &non_cpu_distribution),
                priority: 0,
            });
            time += rng.gen_range(self.delay_min..=self.delay_max);
        }

        Ok(entries)
    }

    fn size_hint(&self) -> Option<u64> {
        Some(self.jobs_count as u64)
    }
}
