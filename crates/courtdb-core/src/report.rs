//! Run artifacts for the validate and repair jobs.
//!
//! Reports are append-only: every run writes a new file and never touches
//! one written earlier.

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Result of resolving one stored booking URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationOutcome {
    /// Store id, or `row:<n>` for tabular input.
    pub record_id: String,
    pub name: String,
    pub city: String,
    pub original_url: String,
    pub normalized_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_status: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub changed: bool,
}

impl ValidationOutcome {
    #[must_use]
    pub fn is_failure(&self) -> bool {
        self.error.is_some()
    }

    /// The URL to store after validation, when it differs from the original.
    #[must_use]
    pub fn corrected_url(&self) -> Option<&str> {
        if self.is_failure() || !self.changed {
            return None;
        }
        self.resolved_url
            .as_deref()
            .or(Some(self.normalized_url.as_str()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub total: usize,
    pub failed_count: usize,
    pub failures: Vec<ValidationOutcome>,
}

impl ValidationReport {
    /// Build a report from every outcome of a run, keeping only failures.
    #[must_use]
    pub fn from_outcomes(outcomes: &[ValidationOutcome]) -> Self {
        let failures: Vec<ValidationOutcome> = outcomes
            .iter()
            .filter(|o| o.is_failure())
            .cloned()
            .collect();
        Self {
            total: outcomes.len(),
            failed_count: failures.len(),
            failures,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepairedLink {
    pub record_id: String,
    pub name: String,
    pub city: String,
    pub original_url: String,
    pub new_url: String,
    pub method: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepairReport {
    pub fixed_count: usize,
    pub attempted: usize,
    pub updated: Vec<RepairedLink>,
}

impl RepairReport {
    #[must_use]
    pub fn new(attempted: usize, updated: Vec<RepairedLink>) -> Self {
        Self {
            fixed_count: updated.len(),
            attempted,
            updated,
        }
    }
}

/// Write `report` as pretty JSON to a new timestamped file under `dir`.
///
/// The file name is `<prefix>-<UTC timestamp>.json`; if that exists a
/// numeric suffix is appended. Existing files are never overwritten.
///
/// # Errors
///
/// Returns an I/O error if the directory cannot be created or the file
/// cannot be written.
pub fn write_report<T: Serialize>(dir: &Path, prefix: &str, report: &T) -> io::Result<PathBuf> {
    let body = serde_json::to_vec_pretty(report).map_err(io::Error::other)?;
    write_new_file(dir, prefix, "json", &body)
}

/// Write `body` to a new timestamped file under `dir`.
///
/// # Errors
///
/// Returns an I/O error if the directory cannot be created or the file
/// cannot be written.
pub fn write_new_file(dir: &Path, prefix: &str, extension: &str, body: &[u8]) -> io::Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let stamp = chrono::Utc::now().format("%Y%m%dT%H%M%SZ");

    for attempt in 0u32.. {
        let name = if attempt == 0 {
            format!("{prefix}-{stamp}.{extension}")
        } else {
            format!("{prefix}-{stamp}-{attempt}.{extension}")
        };
        let path = dir.join(name);

        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(mut file) => {
                file.write_all(body)?;
                file.flush()?;
                return Ok(path);
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {}
            Err(e) => return Err(e),
        }
    }

    Err(io::Error::other("exhausted report file names"))
}
