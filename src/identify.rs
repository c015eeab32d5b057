//! Identification Coordinator.
//!
//! Runs discovery, then fans out one [`CandidateWorker`] task per candidate.
//! Tasks live in a [`JoinSet`] and each holds a semaphore permit, so at most
//! `max_concurrent_workers` candidate pages are in flight at once. Spawns
//! are staggered by `spawn_stagger_ms` as a politeness throttle.
//!
//! # Cancellation
//!
//! The abort signal is a [`CancellationToken`] threaded into discovery, the
//! stagger sleep, permit acquisition, every fetch, and the wait loop. When it
//! fires the coordinator stops waiting and detaches whatever is still
//! running; those tasks observe the token themselves and never publish.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::cache::CoverUrlCache;
use crate::config::ConnectorConfig;
use crate::discovery::discover;
use crate::extract::PageExtractor;
use crate::fetch::PageFetcher;
use crate::record::{ExtractedRecord, Query};
use crate::worker::{CandidateError, CandidateWorker};

/// Counters from one identify run. Purely observational.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IdentifyStats {
    /// Candidates produced by discovery.
    pub candidates: usize,
    /// Worker tasks actually started.
    pub spawned: usize,
    /// Records sent to the output channel.
    pub published: usize,
    /// Workers stopped by the abort signal, including detached ones.
    pub abandoned: usize,
    /// Workers that finished without a record for any other reason.
    pub failed: usize,
}

/// Shared collaborators for identify runs.
#[derive(Clone)]
pub struct Coordinator {
    fetcher: Arc<dyn PageFetcher>,
    extractor: Arc<PageExtractor>,
    cache: Arc<dyn CoverUrlCache>,
    config: Arc<ConnectorConfig>,
}

impl std::fmt::Debug for Coordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Coordinator")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Coordinator {
    #[must_use]
    pub fn new(
        fetcher: Arc<dyn PageFetcher>,
        extractor: Arc<PageExtractor>,
        cache: Arc<dyn CoverUrlCache>,
        config: Arc<ConnectorConfig>,
    ) -> Self {
        Self {
            fetcher,
            extractor,
            cache,
            config,
        }
    }

    #[must_use]
    pub fn config(&self) -> &ConnectorConfig {
        &self.config
    }

    #[must_use]
    pub fn fetcher(&self) -> &dyn PageFetcher {
        self.fetcher.as_ref()
    }

    #[must_use]
    pub fn cache(&self) -> &dyn CoverUrlCache {
        self.cache.as_ref()
    }

    /// Discovers candidates for `query` and extracts each into `sink`.
    ///
    /// Returns once every worker has finished or `cancel` fires. Records are
    /// delivered only through `sink`, in completion order; consumers needing
    /// ranked output should sort by relevance (see [`collect_ranked`]).
    #[instrument(skip_all, fields(title = ?query.search_title()))]
    pub async fn identify(
        &self,
        query: &Query,
        sink: &UnboundedSender<ExtractedRecord>,
        cancel: &CancellationToken,
    ) -> IdentifyStats {
        let candidates = discover(
            self.fetcher.as_ref(),
            &self.extractor,
            &self.config,
            query,
            cancel,
        )
        .await;
        let mut stats = IdentifyStats {
            candidates: candidates.len(),
            ..IdentifyStats::default()
        };

        if cancel.is_cancelled() {
            debug!("abort set after discovery; no workers spawned");
            return stats;
        }

        let worker = CandidateWorker::new(
            Arc::clone(&self.fetcher),
            Arc::clone(&self.extractor),
            Arc::clone(&self.cache),
            self.config.page_timeout(),
        );
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent_workers));
        let stagger = self.config.spawn_stagger();
        let mut tasks = JoinSet::new();

        for candidate in candidates {
            if stats.spawned > 0 && !stagger.is_zero() {
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => break,
                    () = tokio::time::sleep(stagger) => {}
                }
            }

            let permit = tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                permit = Arc::clone(&semaphore).acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };

            debug!(url = %candidate.url, relevance = candidate.relevance, "spawning worker");
            let worker = worker.clone();
            let sink = sink.clone();
            let cancel = cancel.clone();
            tasks.spawn(async move {
                let _permit = permit;
                worker.run(candidate, &sink, &cancel).await
            });
            stats.spawned += 1;
        }

        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    stats.abandoned += tasks.len();
                    debug!(detached = tasks.len(), "abort set; detaching workers");
                    tasks.detach_all();
                    break;
                }
                joined = tasks.join_next() => match joined {
                    None => break,
                    Some(Ok(Ok(()))) => stats.published += 1,
                    Some(Ok(Err(e))) => record_failure(&mut stats, &e),
                    Some(Err(e)) => {
                        warn!(error = %e, "worker task panicked");
                        stats.failed += 1;
                    }
                },
            }
        }

        info!(
            candidates = stats.candidates,
            spawned = stats.spawned,
            published = stats.published,
            abandoned = stats.abandoned,
            failed = stats.failed,
            "identify complete"
        );
        stats
    }
}

fn record_failure(stats: &mut IdentifyStats, error: &CandidateError) {
    if error.is_abandoned() {
        debug!(error = %error, "worker abandoned");
        stats.abandoned += 1;
    } else {
        warn!(error = %error, "worker finished without a record");
        stats.failed += 1;
    }
}

/// Drains every record currently queued in `receiver`, sorted by relevance.
///
/// Does not wait for more; call it after [`Coordinator::identify`] returns.
pub fn collect_ranked(receiver: &mut UnboundedReceiver<ExtractedRecord>) -> Vec<ExtractedRecord> {
    let mut records = Vec::new();
    while let Ok(record) = receiver.try_recv() {
        records.push(record);
    }
    records.sort_by_key(|record| record.relevance);
    records
}
