use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, Sender, SyncSender};
use std::thread;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{debug, error, info, trace, warn};

use crate::app::{ProgressEvent, ProgressSink};
use crate::card::{CardRecord, RawCardBundle};
use crate::fetch::{CatalogUrls, RecordFetcher};
use crate::parser::CardParser;
use crate::store::CardStore;

pub const DEFAULT_CHANNEL_CAPACITY: usize = 16;

/// Bridges parse threads to the store and counts successful writes.
#[derive(Debug)]
pub struct PersistenceSink<S: CardStore> {
    store: S,
    written: AtomicUsize,
}

impl<S: CardStore> PersistenceSink<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            written: AtomicUsize::new(0),
        }
    }

    /// Upserts `card`; `false` means it was not stored and the failure is logged.
    pub fn persist(&self, card: &CardRecord) -> bool {
        match self.store.upsert(card) {
            Ok(()) => {
                self.written.fetch_add(1, Ordering::Relaxed);
                true
            }
            Err(err) => {
                error!(id = card.id, name = %card.name, error = %err, "failed to store card");
                false
            }
        }
    }

    /// Records written since this sink was created.
    pub fn written(&self) -> usize {
        self.written.load(Ordering::Relaxed)
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Fetch side of a worker: produces one bundle per identifier, in order.
pub struct FetchWorker<'a, F: RecordFetcher> {
    fetcher: &'a F,
    urls: &'a CatalogUrls,
    cancel: &'a CancelFlag,
}

impl<'a, F: RecordFetcher> FetchWorker<'a, F> {
    pub fn new(fetcher: &'a F, urls: &'a CatalogUrls, cancel: &'a CancelFlag) -> Self {
        Self {
            fetcher,
            urls,
            cancel,
        }
    }

    /// A failed fetch yields an empty payload rather than an error.
    pub fn fetch_bundle(&self, id: u32) -> RawCardBundle {
        let detail = self.fetch_or_empty(&self.urls.detail_url(id), id, "detail");
        let image = self.fetch_or_empty(&self.urls.image_url(id), id, "image");
        let language = self.fetch_or_empty(&self.urls.language_url(id), id, "language");
        RawCardBundle::new(id, detail, image, language)
    }

    /// Sends a bundle per identifier. A panic while fetching one identifier
    /// skips it and the batch carries on. Dropping `sender` on return closes
    /// the batch.
    pub fn run(&self, batch: &[u32], sender: SyncSender<RawCardBundle>) -> FetchSummary {
        let mut summary = FetchSummary::default();
        for &id in batch {
            if self.cancel.is_cancelled() {
                debug!(id, "cancelled, stopping fetch worker");
                break;
            }
            let bundle = match panic::catch_unwind(AssertUnwindSafe(|| self.fetch_bundle(id))) {
                Ok(bundle) => bundle,
                Err(_) => {
                    error!(id, "fetch panicked, skipping identifier");
                    summary.failed += 1;
                    continue;
                }
            };
            trace!(id, bytes = bundle.detail.len(), "bundle fetched");
            if sender.send(bundle).is_err() {
                warn!(id, "parser side gone, stopping fetch worker");
                break;
            }
            summary.sent += 1;
        }
        summary
    }

    fn fetch_or_empty(&self, url: &str, id: u32, resource: &'static str) -> Vec<u8> {
        match self.fetcher.fetch(url) {
            Ok(bytes) => bytes,
            Err(err) => {
                debug!(id, resource, error = %err, "resource unavailable");
                Vec::new()
            }
        }
    }
}

/// What the fetch side of a worker did with its batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchSummary {
    /// Bundles handed to the parse side.
    pub sent: usize,
    /// Identifiers dropped because fetching them panicked.
    pub failed: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub index: usize,
    pub requested: usize,
    pub parsed: usize,
    pub written: usize,
    pub no_card: usize,
    pub failed: usize,
    /// Identifiers never fetched because the run was cancelled.
    pub skipped: usize,
}

/// Parse side of a worker: drains `receiver` until the fetch side hangs up.
pub fn parse_batch<S: CardStore>(
    index: usize,
    requested: usize,
    receiver: Receiver<RawCardBundle>,
    sink: &PersistenceSink<S>,
) -> BatchReport {
    let mut parser = CardParser::new();
    let mut report = BatchReport {
        index,
        requested,
        ..BatchReport::default()
    };
    for bundle in receiver {
        let id = bundle.id;
        report.parsed += 1;
        match parser.parse(bundle) {
            Ok(Some(card)) => {
                if sink.persist(&card) {
                    report.written += 1;
                } else {
                    report.failed += 1;
                }
            }
            Ok(None) => report.no_card += 1,
            Err(err) => {
                error!(id, error = %err, "failed to parse card");
                report.failed += 1;
            }
        }
    }
    report
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    pub batches: Vec<BatchReport>,
    /// Batches whose worker panicked before reporting.
    pub lost_batches: usize,
    pub lost_identifiers: usize,
}

impl RunReport {
    pub fn written(&self) -> usize {
        self.batches.iter().map(|batch| batch.written).sum()
    }

    pub fn no_card(&self) -> usize {
        self.batches.iter().map(|batch| batch.no_card).sum()
    }

    pub fn failed(&self) -> usize {
        self.batches.iter().map(|batch| batch.failed).sum::<usize>() + self.lost_identifiers
    }

    pub fn skipped(&self) -> usize {
        self.batches.iter().map(|batch| batch.skipped).sum()
    }
}

/// Runs one worker per batch and waits until every batch has reported.
pub struct Coordinator<'a, F: RecordFetcher, S: CardStore> {
    fetcher: &'a F,
    sink: &'a PersistenceSink<S>,
    urls: &'a CatalogUrls,
    channel_capacity: usize,
    cancel: CancelFlag,
}

impl<'a, F: RecordFetcher, S: CardStore> Coordinator<'a, F, S> {
    pub fn new(fetcher: &'a F, sink: &'a PersistenceSink<S>, urls: &'a CatalogUrls) -> Self {
        Self {
            fetcher,
            sink,
            urls,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            cancel: CancelFlag::new(),
        }
    }

    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity.max(1);
        self
    }

    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn run(&self, batches: &[Vec<u32>], progress: &dyn ProgressSink) -> RunReport {
        let started = Instant::now();
        let total = batches.len();
        info!(batches = total, "starting workers");

        let mut report = RunReport::default();
        let (done_tx, done_rx) = mpsc::channel::<BatchReport>();

        thread::scope(|scope| {
            let mut handles = Vec::with_capacity(total);
            for (index, batch) in batches.iter().enumerate() {
                let (sender, receiver) = mpsc::sync_channel(self.channel_capacity);
                let parse = self.spawn_parse(scope, index, batch.len(), receiver, done_tx.clone());
                let worker = FetchWorker::new(self.fetcher, self.urls, &self.cancel);
                let fetch = thread::Builder::new()
                    .name(format!("fetch-{index}"))
                    .spawn_scoped(scope, move || worker.run(batch, sender));
                if let Err(err) = &fetch {
                    error!(batch = index, error = %err, "failed to start fetch thread");
                }
                handles.push((index, fetch.ok(), parse));
            }
            drop(done_tx);

            // Every parse thread holds a sender, so this ends once all have
            // reported or died.
            for batch in done_rx.iter() {
                debug!(
                    batch = batch.index,
                    written = batch.written,
                    no_card = batch.no_card,
                    failed = batch.failed,
                    "batch finished"
                );
                report.batches.push(batch);
                progress.event(ProgressEvent {
                    message: format!("batch {} of {total} finished", report.batches.len()),
                    completed: report.batches.len(),
                    total,
                    elapsed: Some(started.elapsed()),
                });
            }

            for (index, fetch, parse) in handles {
                let fetched = fetch.and_then(|fetch| match fetch.join() {
                    Ok(fetched) => Some(fetched),
                    Err(_) => {
                        error!(batch = index, "fetch worker panicked");
                        None
                    }
                });
                if let Some(parse) = parse
                    && parse.join().is_err()
                {
                    error!(batch = index, "parse worker panicked");
                }
                if let Some(batch) = report.batches.iter_mut().find(|batch| batch.index == index) {
                    settle_batch(batch, fetched);
                }
            }
        });

        let reported = report
            .batches
            .iter()
            .map(|batch| batch.index)
            .collect::<Vec<_>>();
        for (index, batch) in batches.iter().enumerate() {
            if !reported.contains(&index) {
                report.lost_batches += 1;
                report.lost_identifiers += batch.len();
            }
        }
        report.batches.sort_by_key(|batch| batch.index);

        log_elapsed(started.elapsed(), &report);
        report
    }

    fn spawn_parse<'scope>(
        &'scope self,
        scope: &'scope thread::Scope<'scope, '_>,
        index: usize,
        requested: usize,
        receiver: Receiver<RawCardBundle>,
        done: Sender<BatchReport>,
    ) -> Option<thread::ScopedJoinHandle<'scope, ()>> {
        let sink = self.sink;
        let spawned = thread::Builder::new()
            .name(format!("parse-{index}"))
            .spawn_scoped(scope, move || {
                let report = parse_batch(index, requested, receiver, sink);
                if done.send(report).is_err() {
                    warn!(batch = index, "coordinator gone before batch report");
                }
            });
        match spawned {
            Ok(handle) => Some(handle),
            Err(err) => {
                error!(batch = index, error = %err, "failed to start parse thread");
                None
            }
        }
    }
}

/// Accounts for identifiers the parse side never saw so that
/// `written + no_card + failed + skipped == requested`.
fn settle_batch(batch: &mut BatchReport, fetched: Option<FetchSummary>) {
    match fetched {
        Some(fetched) => {
            batch.failed += fetched.failed;
            batch.skipped = batch
                .requested
                .saturating_sub(batch.parsed + fetched.failed);
        }
        None => batch.failed += batch.requested.saturating_sub(batch.parsed),
    }
}

fn log_elapsed(elapsed: Duration, report: &RunReport) {
    info!(
        elapsed_ms = elapsed.as_millis() as u64,
        written = report.written(),
        no_card = report.no_card(),
        failed = report.failed(),
        skipped = report.skipped(),
        "all workers finished"
    );
    if report.lost_batches > 0 {
        error!(lost = report.lost_batches, "batches lost to panicking workers");
    }
}
