use crate::collector::Collector;
use crate::journal::Journal;
use crate::publish::SampleSink;
use crate::sample::Sample;
use crate::transport::CoapTransport;
use anyhow::{Context, Result};
use chrono::Utc;
use futures::FutureExt;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::Duration;

/// Outcome of one collect + publish pass.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    pub sample: Sample,
    /// Ingestion entry id, `None` when the publish failed.
    pub entry_id: Option<String>,
}

/// Drives `collect → publish → sleep` until shut down.
///
/// The interval is measured from the end of one cycle to the start of the
/// next, so a slow node delays cycles rather than skipping them.
pub struct Runner<T, S> {
    collector: Collector<T>,
    sink: S,
    journal: Option<Journal>,
    interval: Duration,
}

impl<T, S> Runner<T, S>
where
    T: CoapTransport,
    S: SampleSink,
{
    pub fn new(collector: Collector<T>, sink: S, interval: Duration) -> Self {
        Self {
            collector,
            sink,
            journal: None,
            interval,
        }
    }

    pub fn with_journal(mut self, journal: Option<Journal>) -> Self {
        self.journal = journal;
        self
    }

    pub async fn run_cycle(&self) -> Result<CycleReport> {
        let sample = self.collector.collect_sample().await;
        let entry_id = self.sink.publish(&sample).await;

        if let Some(journal) = self.journal.clone() {
            let recorded_at = Utc::now();
            let journal_entry = entry_id.clone();
            tokio::task::spawn_blocking(move || {
                journal.append(recorded_at, &sample, journal_entry.as_deref())
            })
            .await
            .context("journal write task failed")??;
        }

        Ok(CycleReport { sample, entry_id })
    }

    /// Runs one cycle, absorbing errors and panics so the loop survives.
    async fn guarded_cycle(&self) -> Option<CycleReport> {
        match AssertUnwindSafe(self.run_cycle()).catch_unwind().await {
            Ok(Ok(report)) => Some(report),
            Ok(Err(err)) => {
                tracing::error!(error = %format!("{err:#}"), "unexpected error during collection cycle");
                None
            }
            Err(panic) => {
                tracing::error!(panic = %panic_message(panic.as_ref()), "collection cycle panicked");
                None
            }
        }
    }

    /// Loops until `shutdown` resolves and returns the number of cycles that
    /// ran to completion. A cycle in flight is abandoned on shutdown.
    pub async fn run_until<F>(&self, shutdown: F) -> u64
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut completed: u64 = 0;

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!(completed, "shutdown requested during collection");
                    return completed;
                }
                report = self.guarded_cycle() => {
                    completed += 1;
                    if let Some(report) = report {
                        tracing::debug!(entry_id = ?report.entry_id, "cycle finished");
                    }
                }
            }

            tracing::info!(interval_secs = self.interval.as_secs_f64(), "waiting before next update");
            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!(completed, "shutdown requested; collector stopped");
                    return completed;
                }
                _ = tokio::time::sleep(self.interval) => {}
            }
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
