//! Debug records of raw gateway traffic.
//!
//! Written only when the carrier `debug` flag is set. Raw status codes, bodies
//! and transport errors end up here and nowhere user facing.

use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

use serde::Serialize;
use time::{format_description::well_known::Rfc3339, OffsetDateTime};
use uuid::Uuid;

pub const DEBUG_LOG_FILENAME: &str = "shipping_parcify.log";

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TransportFailure {
    pub error: String,
    pub code: String,
}

/// Raw outcome of one gateway call, before normalization.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DebugRecord {
    pub request_id: Uuid,
    pub recorded_at: String,
    pub url: String,
    pub code: Option<u16>,
    pub body: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<TransportFailure>,
}

impl DebugRecord {
    pub fn new(url: impl Into<String>) -> Self {
        let recorded_at = OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .unwrap_or_default();
        Self {
            request_id: Uuid::new_v4(),
            recorded_at,
            url: url.into(),
            code: None,
            body: None,
            failure: None,
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|err| format!("{{\"error\":\"{err}\"}}"))
    }
}

pub trait DebugSink: Send + Sync {
    fn record(&self, record: &DebugRecord);
}

/// Emits each record as a `debug` tracing event.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingDebugSink;

impl DebugSink for TracingDebugSink {
    fn record(&self, record: &DebugRecord) {
        tracing::debug!(
            request_id = %record.request_id,
            code = ?record.code,
            record = %record.to_json(),
            "Parcify gateway exchange"
        );
    }
}

/// Appends JSON lines to `shipping_parcify.log`.
#[derive(Clone, Debug)]
pub struct FileDebugSink {
    path: PathBuf,
}

impl FileDebugSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Log file inside the platform data directory.
    pub fn in_data_dir() -> Self {
        let base = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("parcify-carrier");
        Self::new(base.join(DEBUG_LOG_FILENAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn append(&self, line: &str) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{line}")
    }
}

impl DebugSink for FileDebugSink {
    fn record(&self, record: &DebugRecord) {
        if let Err(err) = self.append(&record.to_json()) {
            tracing::warn!(path = %self.path.display(), "Failed to write debug record: {err}");
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    pub struct MemoryDebugSink {
        records: Mutex<Vec<DebugRecord>>,
    }

    impl MemoryDebugSink {
        pub fn records(&self) -> Vec<DebugRecord> {
            self.records.lock().unwrap().clone()
        }
    }

    impl DebugSink for MemoryDebugSink {
        fn record(&self, record: &DebugRecord) {
            self.records.lock().unwrap().push(record.clone());
        }
    }
}
