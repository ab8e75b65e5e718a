use crate::sample::Sample;
use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use std::fs::{self, OpenOptions};
use std::path::PathBuf;

/// Append-only CSV copy of every cycle, in the column layout of a ThingSpeak
/// channel export so the dashboard scripts can read either source.
#[derive(Debug, Clone)]
pub struct Journal {
    path: PathBuf,
}

#[derive(Debug, Serialize)]
struct JournalRow<'a> {
    created_at: String,
    entry_id: &'a str,
    #[serde(rename = "Temperature")]
    temperature: f64,
    #[serde(rename = "Humidity")]
    humidity: f64,
    #[serde(rename = "DisconnectedTotal")]
    disconnected_total: f64,
    #[serde(rename = "RSL_in")]
    rsl_in: i64,
    #[serde(rename = "RSL_out")]
    rsl_out: i64,
    #[serde(rename = "RPL_rank")]
    rpl_rank: u64,
    #[serde(rename = "Hopcount")]
    hopcount: u64,
    #[serde(rename = "ConnectedTotal")]
    connected_total: f64,
}

impl Journal {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[cfg(test)]
    pub(crate) fn path(&self) -> &std::path::Path {
        &self.path
    }

    /// Writes one row; the header goes out only when the file is empty.
    /// `entry_id` is `None` for samples the endpoint did not accept.
    pub fn append(
        &self,
        recorded_at: DateTime<Utc>,
        sample: &Sample,
        entry_id: Option<&str>,
    ) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("create {}", parent.display()))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("open {}", self.path.display()))?;
        let needs_header = file
            .metadata()
            .with_context(|| format!("stat {}", self.path.display()))?
            .len()
            == 0;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(needs_header)
            .from_writer(file);
        writer
            .serialize(JournalRow {
                created_at: recorded_at.to_rfc3339_opts(SecondsFormat::Secs, true),
                entry_id: entry_id.unwrap_or_default(),
                temperature: sample.temperature,
                humidity: sample.humidity,
                disconnected_total: sample.disconnected_total,
                rsl_in: sample.rsl_in,
                rsl_out: sample.rsl_out,
                rpl_rank: sample.rpl_rank,
                hopcount: sample.hopcount,
                connected_total: sample.connected_total,
            })
            .with_context(|| format!("write {}", self.path.display()))?;
        writer
            .flush()
            .with_context(|| format!("flush {}", self.path.display()))?;
        Ok(())
    }
}
