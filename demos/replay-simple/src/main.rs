use std::io::Write;

use env_logger::Builder;

use cluster_replay::workload_generators::native::NativeScenarioReader;
use cluster_replay::{ClusterSimulation, Result, ScenarioSource, SimulationConfig};

fn run() -> Result<()> {
    let mut args = std::env::args().skip(1);
    let config_path = args.next().unwrap_or_else(|| "configs/config.yaml".to_string());
    let scenario_path = args
        .next()
        .unwrap_or_else(|| "configs/scenario.yaml".to_string());

    let config = SimulationConfig::from_file(&config_path)?;
    let scenario = NativeScenarioReader::new(scenario_path).entries()?;

    let mut simulation = ClusterSimulation::new(config, scenario)?;
    let summary = simulation.run();

    log::info!(
        "{} submitted / {} successful / {} failed / {} still pending",
        summary.num_submitted,
        summary.num_successful,
        summary.num_failed,
        summary.num_pending_at_end
    );
    Ok(())
}

fn main() {
    Builder::from_default_env()
        .format(|buf, record| writeln!(buf, "{}", record.args()))
        .init();

    if let Err(e) = run() {
        log::error!("{e}");
        std::process::exit(1);
    }
}
