use csv::ReaderBuilder;
use serde::Deserialize;

use crate::error::Result;
use crate::Ms;

use super::{events::ScenarioEntry, generator::ScenarioSource};

/// Reads a scenario from a CSV trace with a header row. Records missing
/// required fields are skipped; the result is sorted by submit time with the
/// record index as a stable tie-break.
pub struct CsvTraceReader {
    path: String,
    limit: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct TraceRecord {
    submit_time: Option<Ms>,
    queue_name: Option<String>,
    slot_required: Option<u32>,
    mem_required: Option<u64>,
    cpu_time: Option<Ms>,
    non_cpu_time: Option<Ms>,
    priority: Option<i64>,
}

impl CsvTraceReader {
    pub fn new(path: impl Into<String>) -> Self {
        CsvTraceReader {
            path: path.into(),
            limit: None,
        }
    }

    pub fn with_limit(path: impl Into<String>, limit: u64) -> Self {
        CsvTraceReader {
            path: path.into(),
            limit: Some(limit),
        }
    }

    fn collect(&self, mut reader: csv::Reader<impl std::io::Read>) -> Result<Vec<ScenarioEntry>> {
        let mut entries = Vec::new();
        let mut skipped = 0u64;

        for record in reader.deserialize() {
            let record: TraceRecord = record?;

            let (Some(submit_time), Some(slot_required), Some(cpu_time)) =
                (record.submit_time, record.slot_required, record.cpu_time)
            else {
                skipped += 1;
                continue;
            };

            entries.push(ScenarioEntry {
                submit_time,
                queue_name: record.queue_name.unwrap_or_default(),
                slot_required,
                mem_required: record.mem_required.unwrap_or(0),
                cpu_time,
                non_cpu_time: record.non_cpu_time.unwrap_or(0),
                priority: record.priority.unwrap_or(0),
            });

            if let Some(limit) = self.limit {
                if entries.len() as u64 >= limit {
                    break;
                }
            }
        }

        if skipped > 0 {
            log::warn!("trace {}: skipped {} incomplete records", self.path, skipped);
        }

        entries.sort_by(|a, b| a.submit_time.cmp(&b.submit_time));
        Ok(entries)
    }
}

impl ScenarioSource for CsvTraceReader {
    fn entries(&mut self) -> Result<Vec<ScenarioEntry>> {
        let reader = ReaderBuilder::new()
            .has_headers(true)
            .from_path(&self.path)?;
        self.collect(reader)
    }

    fn size_hint(&self) -> Option<u64> {
        self.limit
    }
}
