//! JSONL telemetry file writer with rotation and retention.

use std::fs::{self, File};
use std::io::{LineWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::TelemetryConfig;
use crate::error::Result;

const FILE_PREFIX: &str = "telemetry_";
const FILE_EXTENSION: &str = "jsonl";

/// One analog reading as written to disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryRecord {
    /// RFC 3339, UTC, millisecond precision
    pub timestamp: String,
    pub port: usize,
    pub value: u16,
}

impl TelemetryRecord {
    pub fn now(port: usize, value: u16) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            port,
            value,
        }
    }
}

/// Appends records to rotating JSONL files.
///
/// A new file is started after `max_records_per_file` records; only the
/// newest `max_files_to_keep` files are left in the directory.
pub struct TelemetryLogger {
    log_dir: PathBuf,
    max_records_per_file: usize,
    max_files_to_keep: usize,
    session: String,
    file_index: u32,
    records_in_file: usize,
    writer: Option<LineWriter<File>>,
}

impl TelemetryLogger {
    /// Creates the log directory if needed. No file is opened until the
    /// first record.
    pub fn new(config: &TelemetryConfig) -> Result<Self> {
        let log_dir = PathBuf::from(&config.log_dir);
        fs::create_dir_all(&log_dir)?;
        info!("Recording telemetry to {}", log_dir.display());

        Ok(Self {
            log_dir,
            max_records_per_file: config.max_records_per_file,
            max_files_to_keep: config.max_files_to_keep,
            session: Utc::now().format("%Y%m%d_%H%M%S").to_string(),
            file_index: 0,
            records_in_file: 0,
            writer: None,
        })
    }

    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }

    /// Writes one analog reading, rotating first if the current file is full.
    pub fn record(&mut self, port: usize, value: u16) -> Result<()> {
        self.write(&TelemetryRecord::now(port, value))
    }

    pub fn write(&mut self, record: &TelemetryRecord) -> Result<()> {
        if self.writer.is_none() || self.records_in_file >= self.max_records_per_file {
            self.rotate()?;
        }

        if let Some(writer) = self.writer.as_mut() {
            serde_json::to_writer(&mut *writer, record)?;
            writer.write_all(b"\n")?;
            self.records_in_file += 1;
        }
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        if let Some(writer) = self.writer.as_mut() {
            writer.flush()?;
        }
        Ok(())
    }

    fn rotate(&mut self) -> Result<()> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush()?;
        }

        self.file_index += 1;
        let path = self.log_dir.join(format!(
            "{}{}_{:04}.{}",
            FILE_PREFIX, self.session, self.file_index, FILE_EXTENSION
        ));
        debug!("Opening telemetry file {}", path.display());

        self.writer = Some(LineWriter::new(File::create(&path)?));
        self.records_in_file = 0;
        self.prune()
    }

    /// Deletes the oldest telemetry files beyond the retention limit.
    fn prune(&self) -> Result<()> {
        let mut files = telemetry_files(&self.log_dir)?;
        if files.len() <= self.max_files_to_keep {
            return Ok(());
        }

        files.sort();
        let excess = files.len() - self.max_files_to_keep;
        for path in files.into_iter().take(excess) {
            debug!("Removing old telemetry file {}", path.display());
            if let Err(e) = fs::remove_file(&path) {
                warn!("Failed to remove {}: {}", path.display(), e);
            }
        }
        Ok(())
    }
}

/// Telemetry files in `dir`, unsorted.
pub fn telemetry_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let is_telemetry = path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.starts_with(FILE_PREFIX))
            && path.extension().and_then(|ext| ext.to_str()) == Some(FILE_EXTENSION);
        if is_telemetry {
            files.push(path);
        }
    }
    Ok(files)
}
