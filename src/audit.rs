//! Audit log: persisted `[timestamp] [LEVEL] message` lines
//!
//! Every deletion attempt (success or failure) must appear both on the
//! console and in the audit file. Console output goes through `tracing`
//! like everything else; the file is written here so the audit trail
//! survives independent of subscriber configuration.

use chrono::Local;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;
use tracing::{error, info, warn};

/// Log levels of the audit stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditLevel {
    Info,
    Warning,
    Error,
    Success,
}

impl AuditLevel {
    fn as_str(self) -> &'static str {
        match self {
            AuditLevel::Info => "INFO",
            AuditLevel::Warning => "WARNING",
            AuditLevel::Error => "ERROR",
            AuditLevel::Success => "SUCCESS",
        }
    }
}

/// Append-only audit log writer
pub struct AuditLog {
    file: Option<Mutex<File>>,
}

impl AuditLog {
    /// Open (or create) the audit file at `path`
    pub fn open(path: &Path) -> std::io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Some(Mutex::new(file)),
        })
    }

    /// File-less audit log; events still reach the console via tracing
    pub fn disabled() -> Self {
        Self { file: None }
    }

    /// Default file name: timestamped, in the working directory
    pub fn default_path() -> std::path::PathBuf {
        format!("aws-sweep-{}.log", Local::now().format("%Y%m%d-%H%M%S")).into()
    }

    pub fn log(&self, level: AuditLevel, message: &str) {
        match level {
            AuditLevel::Info | AuditLevel::Success => info!("{message}"),
            AuditLevel::Warning => warn!("{message}"),
            AuditLevel::Error => error!("{message}"),
        }

        if let Some(file) = &self.file {
            let line = format!(
                "[{}] [{}] {}\n",
                Local::now().format("%Y-%m-%d %H:%M:%S"),
                level.as_str(),
                message
            );
            if let Ok(mut f) = file.lock() {
                // An unwritable audit file must not abort the run
                let _ = f.write_all(line.as_bytes());
            }
        }
    }

    pub fn info(&self, message: &str) {
        self.log(AuditLevel::Info, message);
    }

    pub fn warning(&self, message: &str) {
        self.log(AuditLevel::Warning, message);
    }

    pub fn error(&self, message: &str) {
        self.log(AuditLevel::Error, message);
    }

    pub fn success(&self, message: &str) {
        self.log(AuditLevel::Success, message);
    }
}
