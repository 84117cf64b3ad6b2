use std::path::Path;

use crate::error::{Result, SimError};

use super::{events::ScenarioEntry, generator::ScenarioSource};

/// Reads a scenario written in this crate's own format: a YAML or JSON list
/// of entries. The format is picked from the file extension.
pub struct NativeScenarioReader {
    path: String,
}

impl NativeScenarioReader {
    pub fn new(path: impl Into<String>) -> Self {
        NativeScenarioReader { path: path.into() }
    }
}

impl ScenarioSource for NativeScenarioReader {
    fn entries(&mut self) -> Result<Vec<ScenarioEntry>> {
        let raw = std::fs::read_to_string(&self.path)
            .map_err(|e| SimError::Config(format!("can't read scenario file {}: {e}", self.path)))?;

        let is_json = Path::new(&self.path)
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

        let entries: Vec<ScenarioEntry> = if is_json {
            serde_json::from_str(&raw)?
        } else {
            serde_yaml::from_str(&raw)?
        };
        Ok(entries)
    }
}
