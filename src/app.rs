use std::collections::BTreeSet;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::info;

use crate::config::IngestConfig;
use crate::domain::MultiverseId;
use crate::error::IngestError;
use crate::fetch::RecordFetcher;
use crate::partition::partition;
use crate::pipeline::{CancelFlag, Coordinator, PersistenceSink};
use crate::store::CardStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Operation {
    UpdateIds,
    UpdateOne,
    UpdateKnown,
    Populate,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub operation: Operation,
    pub requested: usize,
    pub batches: usize,
    pub written: usize,
    pub no_card: usize,
    pub failed: usize,
    pub skipped: usize,
    pub started_at: String,
    pub elapsed_ms: u64,
}

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub message: String,
    pub completed: usize,
    pub total: usize,
    pub elapsed: Option<Duration>,
}

pub trait ProgressSink {
    fn event(&self, event: ProgressEvent);
}

pub struct App<F: RecordFetcher, S: CardStore> {
    fetcher: F,
    sink: PersistenceSink<S>,
    config: IngestConfig,
    cancel: CancelFlag,
}

impl<F: RecordFetcher, S: CardStore> App<F, S> {
    pub fn new(fetcher: F, store: S, config: IngestConfig) -> Self {
        Self {
            fetcher,
            sink: PersistenceSink::new(store),
            config,
            cancel: CancelFlag::new(),
        }
    }

    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    pub fn sink(&self) -> &PersistenceSink<S> {
        &self.sink
    }

    /// Setting the returned flag stops every worker before its next identifier.
    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    /// Ingests `ids`, overwriting cards that are already stored.
    pub fn update_ids(
        &self,
        ids: &[u32],
        progress: &dyn ProgressSink,
    ) -> Result<RunSummary, IngestError> {
        if let Some(zero) = ids.iter().find(|id| **id == 0) {
            return Err(IngestError::InvalidIdentifier(zero.to_string()));
        }
        Ok(self.run(Operation::UpdateIds, ids, progress))
    }

    pub fn update_one(
        &self,
        id: MultiverseId,
        progress: &dyn ProgressSink,
    ) -> Result<RunSummary, IngestError> {
        Ok(self.run(Operation::UpdateOne, &[id.get()], progress))
    }

    /// Re-ingests every identifier the store already holds.
    pub fn update_known(&self, progress: &dyn ProgressSink) -> Result<RunSummary, IngestError> {
        let ids = self.sink.store().list_known_identifiers()?;
        Ok(self.run(Operation::UpdateKnown, &ids, progress))
    }

    /// Ingests every identifier below `max_identifier` the store does not know yet.
    pub fn populate(&self, progress: &dyn ProgressSink) -> Result<RunSummary, IngestError> {
        let ids = self.missing_identifiers()?;
        info!(count = ids.len(), "identifiers missing from store");
        Ok(self.run(Operation::Populate, &ids, progress))
    }

    pub fn missing_identifiers(&self) -> Result<Vec<u32>, IngestError> {
        let known = self
            .sink
            .store()
            .list_known_identifiers()?
            .into_iter()
            .collect::<BTreeSet<_>>();
        Ok((1..self.config.max_identifier)
            .filter(|id| !known.contains(id))
            .collect())
    }

    fn run(&self, operation: Operation, ids: &[u32], progress: &dyn ProgressSink) -> RunSummary {
        let started_at = chrono::Utc::now().to_rfc3339();
        let started = Instant::now();
        let batches = partition(ids, self.config.batch_size);
        info!(
            ?operation,
            requested = ids.len(),
            batches = batches.len(),
            "starting ingestion"
        );

        progress.event(ProgressEvent {
            message: format!("fetching {} identifiers", ids.len()),
            completed: 0,
            total: batches.len(),
            elapsed: None,
        });

        let report = Coordinator::new(&self.fetcher, &self.sink, &self.config.urls)
            .with_channel_capacity(self.config.channel_capacity)
            .with_cancel(self.cancel.clone())
            .run(&batches, progress);

        let summary = RunSummary {
            operation,
            requested: ids.len(),
            batches: batches.len(),
            written: report.written(),
            no_card: report.no_card(),
            failed: report.failed(),
            skipped: report.skipped(),
            started_at,
            elapsed_ms: started.elapsed().as_millis() as u64,
        };
        info!(
            ?operation,
            written = summary.written,
            no_card = summary.no_card,
            failed = summary.failed,
            skipped = summary.skipped,
            elapsed_ms = summary.elapsed_ms,
            "ingestion finished"
        );
        summary
    }
}
