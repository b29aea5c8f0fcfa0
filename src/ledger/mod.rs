//! Durable append-only decision ledger.
//!
//! One JSON object per line. Appends are fsynced before returning and
//! serialized by a mutex so manual and scheduled triggers cannot interleave
//! a record. Reads do not take the lock; they see either the pre- or
//! post-append file, and a torn final line is skipped like any other
//! malformed line.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{Days, NaiveDate, Utc};
use tracing::{debug, info, warn};

use crate::error::LedgerError;
use crate::models::Decision;

pub struct DecisionLedger {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl DecisionLedger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one record. Durable before returning: the line is written and
    /// fsynced under the writer lock.
    pub fn append(&self, decision: &Decision) -> Result<(), LedgerError> {
        let mut line = serde_json::to_string(decision)?;
        line.push('\n');

        let _guard = self.write_lock.lock().expect("ledger lock poisoned");

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(line.as_bytes())?;
        file.sync_all()?;

        debug!(ticker = %decision.ticker, action = %decision.action, "Decision appended");
        Ok(())
    }

    /// Up to `limit` most-recent records, returned oldest-to-newest.
    /// Malformed lines are skipped, never fail the read. `since` filters on
    /// the date portion of the timestamp.
    pub fn recent(
        &self,
        limit: usize,
        since: Option<NaiveDate>,
    ) -> Result<Vec<Decision>, LedgerError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let contents = fs::read_to_string(&self.path)?;
        let mut records: Vec<Decision> = contents
            .lines()
            .filter(|l| !l.trim().is_empty())
            .filter_map(|l| match serde_json::from_str::<Decision>(l) {
                Ok(d) => Some(d),
                Err(e) => {
                    warn!(error = %e, "Skipping malformed ledger line");
                    None
                }
            })
            .filter(|d| match since {
                Some(date) => d.timestamp.date_naive() >= date,
                None => true,
            })
            .collect();

        if records.len() > limit {
            records.drain(..records.len() - limit);
        }
        Ok(records)
    }

    /// Remove records older than `now - retention_days`. No-op when retention
    /// is disabled or the ledger is empty. Runs under the writer lock, so an
    /// append racing a rotation still lands and stays visible. Returns how
    /// many records were dropped.
    ///
    /// Lines that do not parse are kept: rotation only removes records it can
    /// prove are past retention.
    pub fn rotate(&self, retention_days: Option<u32>) -> Result<usize, LedgerError> {
        let Some(days) = retention_days else {
            return Ok(0);
        };

        let _guard = self.write_lock.lock().expect("ledger lock poisoned");

        if !self.path.exists() {
            return Ok(0);
        }

        let cutoff = Utc::now()
            .date_naive()
            .checked_sub_days(Days::new(u64::from(days)))
            .unwrap_or(NaiveDate::MIN);

        let contents = fs::read_to_string(&self.path)?;
        let lines: Vec<&str> = contents.lines().filter(|l| !l.trim().is_empty()).collect();

        let kept: Vec<&str> = lines
            .iter()
            .copied()
            .filter(|l| match serde_json::from_str::<Decision>(l) {
                Ok(d) => d.timestamp.date_naive() >= cutoff,
                Err(_) => true,
            })
            .collect();

        let removed = lines.len() - kept.len();
        if removed == 0 {
            return Ok(0);
        }

        // Atomic rewrite: the temp file is synced and renamed into place, so
        // readers never observe a half-written ledger.
        let tmp_path = self.path.with_extension("jsonl.tmp");
        {
            let mut tmp = File::create(&tmp_path)?;
            for line in &kept {
                tmp.write_all(line.as_bytes())?;
                tmp.write_all(b"\n")?;
            }
            tmp.sync_all()?;
        }
        fs::rename(&tmp_path, &self.path)?;

        info!(removed, kept = kept.len(), %cutoff, "Rotated decision ledger");
        Ok(removed)
    }
}
