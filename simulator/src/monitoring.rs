use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};

use log::Level;

use crate::config::sim_config::OutputConfig;
use crate::error::Result;
use crate::{JobId, Ms};

/// One row of the per-completed-job table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobmartRecord {
    pub start_time: Ms,
    pub finish_time: Ms,
    pub queue_name: String,
    pub run_host_name: String,
    pub slot_required: u32,
    pub job_id: JobId,
    pub pend_time: Ms,
    pub run_time: Ms,
}

/// An append-only text sink. The first write error is logged and every
/// further write is suppressed; losing a sink never stops the run.
struct Sink {
    name: String,
    writer: BufWriter<File>,
    failed: bool,
}

impl Sink {
    fn create(directory: &str, file_name: &str) -> Result<Sink> {
        let path = Path::new(directory).join(file_name);
        let file = File::create(&path)?;
        Ok(Sink {
            name: file_name.to_string(),
            writer: BufWriter::new(file),
            failed: false,
        })
    }

    fn write_line(&mut self, line: std::fmt::Arguments) {
        if self.failed {
            return;
        }
        if let Err(e) = writeln!(self.writer, "{line}") {
            log::warn!("sink {}: write failed, output suppressed: {e}", self.name);
            self.failed = true;
        }
    }

    fn flush(&mut self) {
        if self.failed {
            return;
        }
        if let Err(e) = self.writer.flush() {
            log::warn!("sink {}: flush failed: {e}", self.name);
            self.failed = true;
        }
    }
}

/// Owns the output sinks and the in-memory time series.
///
/// Time series accumulate in append-only vectors and are written out once at
/// the end of the run; jobmart rows are kept in memory as well so callers can
/// inspect them without re-reading files.
pub struct Monitoring {
    console: bool,
    log_file: Option<Sink>,
    jobmart_file: Option<Sink>,
    job_submit_file: Option<Sink>,
    slots_output: bool,

    performance_path: Option<std::path::PathBuf>,
    pending_path: Option<std::path::PathBuf>,

    jobmart_records: Vec<JobmartRecord>,
    slots_series: Vec<(Ms, u32)>,
    pending_series: Vec<(Ms, usize)>,
}

impl Monitoring {
    pub fn new(config: &OutputConfig) -> Result<Monitoring> {
        if config.any_file_output() {
            std::fs::create_dir_all(&config.log_directory)?;
        }

        let log_file = if config.log_file_output {
            Some(Sink::create(
                &config.log_directory,
                &config.log_output_file_name,
            )?)
        } else {
            None
        };

        let jobmart_file = if config.jobmart_file_output {
            let mut sink = Sink::create(&config.log_directory, &config.jobmart_file_name)?;
            sink.write_line(format_args!(
                "start_time\tfinish_time\tqueue_name\texec_hostname\tnum_slots\tjob_id\tjob_pend_time\tjob_run_time"
            ));
            Some(sink)
        } else {
            None
        };

        let job_submit_file = if config.job_submit_file_output {
            Some(Sink::create(
                &config.log_directory,
                &config.job_submit_file_name,
            )?)
        } else {
            None
        };

        let (performance_path, pending_path) = if config.slots_file_output {
            (
                Some(Path::new(&config.log_directory).join(&config.performance_file_name)),
                Some(Path::new(&config.log_directory).join(&config.pending_file_name)),
            )
        } else {
            (None, None)
        };

        Ok(Monitoring {
            console: config.console_output,
            log_file,
            jobmart_file,
            job_submit_file,
            slots_output: config.slots_file_output,
            performance_path,
            pending_path,
            jobmart_records: Vec::new(),
            slots_series: Vec::new(),
            pending_series: Vec::new(),
        })
    }

    /// Simulation-level message: mirrored to the `log` facade when console
    /// output is on, written to `log_output.txt` when the file sink is on.
    pub fn log(&mut self, level: Level, message: std::fmt::Arguments) {
        if self.console {
            log::log!(level, "{message}");
        }
        if let Some(sink) = &mut self.log_file {
            sink.write_line(format_args!("[{}] {message}", level.as_str().to_lowercase()));
        }
    }

    pub fn log_jobmart(&mut self, record: JobmartRecord) {
        if let Some(sink) = &mut self.jobmart_file {
            sink.write_line(format_args!(
                "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
                record.start_time,
                record.finish_time,
                record.queue_name,
                record.run_host_name,
                record.slot_required,
                record.job_id,
                record.pend_time,
                record.run_time
            ));
        }
        self.jobmart_records.push(record);
    }

    pub fn log_job_submit(&mut self, time: Ms, job_id: JobId, queue_name: &str, slots: u32) {
        if let Some(sink) = &mut self.job_submit_file {
            sink.write_line(format_args!("{time}\t{job_id}\t{queue_name}\t{slots}"));
        }
    }

    /// Snapshot taken after every dispatch pass.
    pub fn record_dispatch_sample(&mut self, time: Ms, used_slots: u32, pending_jobs: usize) {
        if !self.slots_output {
            return;
        }
        self.slots_series.push((time, used_slots));
        self.pending_series.push((time, pending_jobs));
    }

    pub fn jobmart_records(&self) -> &[JobmartRecord] {
        &self.jobmart_records
    }

    /// Flush the sinks and write the accumulated time series.
    pub fn finalize(&mut self) {
        if let Some(path) = self.performance_path.take() {
            Self::write_series(&path, self.slots_series.iter().map(|&(t, v)| (t, v as u64)));
        }
        if let Some(path) = self.pending_path.take() {
            Self::write_series(&path, self.pending_series.iter().map(|&(t, v)| (t, v as u64)));
        }
        for sink in [
            self.log_file.as_mut(),
            self.jobmart_file.as_mut(),
            self.job_submit_file.as_mut(),
        ]
        .into_iter()
        .flatten()
        {
            sink.flush();
        }
    }

    fn write_series(path: &Path, points: impl Iterator<Item = (Ms, u64)>) {
        let file = match File::create(path) {
            Ok(file) => file,
            Err(e) => {
                log::warn!("can't create {}: {e}", path.display());
                return;
            }
        };
        let mut writer = BufWriter::new(file);
        for (time, value) in points {
            if let Err(e) = writeln!(writer, "{time}\t{value}") {
                log::warn!("can't write {}: {e}", path.display());
                return;
            }
        }
        if let Err(e) = writer.flush() {
            log::warn!("can't flush {}: {e}", path.display());
        }
    }
}
