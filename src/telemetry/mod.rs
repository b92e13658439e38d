//! # Telemetry Module
//!
//! Records analog readings to JSONL files with rotation.
//!
//! This module handles:
//! - Formatting readings as JSONL (JSON Lines)
//! - Writing to rotating log files (max N records per file)
//! - Retaining only the last M files
//! - Hooking the recorder onto a controller as an event listener

pub mod logger;

pub use logger::{TelemetryLogger, TelemetryRecord};

use tracing::warn;

use crate::controller::events::{ControllerEvent, Listener};

/// Wraps `logger` in a listener that records every analog read.
pub fn analog_recorder(mut logger: TelemetryLogger) -> Listener {
    Box::new(move |event: &ControllerEvent| {
        if let ControllerEvent::AnalogRead { port, value } = *event {
            if let Err(e) = logger.record(port, value) {
                warn!("Failed to record telemetry: {}", e);
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TelemetryConfig;
    use tempfile::TempDir;

    #[test]
    fn test_recorder_only_writes_analog_reads() {
        let dir = TempDir::new().unwrap();
        let config = TelemetryConfig {
            enabled: true,
            log_dir: dir.path().to_string_lossy().into_owned(),
            ..TelemetryConfig::default()
        };
        let mut listener = analog_recorder(TelemetryLogger::new(&config).unwrap());

        listener(&ControllerEvent::Ready);
        listener(&ControllerEvent::AnalogRead { port: 3, value: 700 });
        drop(listener);

        let files = logger::telemetry_files(dir.path()).unwrap();
        assert_eq!(files.len(), 1);
        let contents = std::fs::read_to_string(&files[0]).unwrap();
        let records: Vec<TelemetryRecord> = contents
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(records.len(), 1);
        assert_eq!((records[0].port, records[0].value), (3, 700));
    }
}
