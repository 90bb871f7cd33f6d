//! Scan orchestration
//!
//! The engine expands targets × wordlist into tasks, fans them out over a
//! worker pool, aggregates deduplicated findings, and re-expands discovered
//! directories onto the task queue. Completion is gated by a single
//! outstanding-task counter: it is incremented before any enqueue and
//! decremented after each task's final disposition, and the task channel
//! closes only when it reaches zero. Cancellation never closes a channel a
//! producer still owns; producers subtract unsent work and consumers drain.

use crate::detection::{calibration, CalibrationCache};
use crate::error::{Result, TalosError};
use crate::http::Transport;
use crate::models::{Finding, ScanConfig};
use crate::scanner::dedup::Deduplicator;
use crate::scanner::events::ScanEvent;
use crate::scanner::stats::Stats;
use crate::scanner::tracker::OutstandingTasks;
use crate::scanner::worker::{run_worker, WorkerContext};
use crate::scanner::Task;
use crate::wordlist;
use rand::rngs::SmallRng;
use rand::SeedableRng;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

pub struct Engine {
    config: Arc<ScanConfig>,
    transport: Arc<Transport>,
    calibration: Arc<CalibrationCache>,
    stats_tx: watch::Sender<Option<Arc<Stats>>>,
}

impl Engine {
    pub fn new(config: ScanConfig) -> Result<Self> {
        let transport = Arc::new(Transport::new(
            config.timeout_secs,
            config.rate_limit,
            config.retry_attempts,
            config.max_response_mb,
        )?);
        let (stats_tx, _) = watch::channel(None);

        Ok(Self {
            config: Arc::new(config),
            transport,
            calibration: Arc::new(CalibrationCache::new()),
            stats_tx,
        })
    }

    /// Readiness signal for observers: the receiver yields `Some(stats)`
    /// once the scan has initialized, before any worker runs.
    pub fn stats_handle(&self) -> watch::Receiver<Option<Arc<Stats>>> {
        self.stats_tx.subscribe()
    }

    /// Runs a scan to completion without an event observer.
    pub async fn run(&self, targets: &[String]) -> Result<(Vec<Finding>, Arc<Stats>)> {
        self.run_with_events(targets, CancellationToken::new(), None)
            .await
    }

    /// Runs a scan, streaming live events to `events` if attached.
    ///
    /// Cancellation mid-scan is clean: partial findings are returned.
    /// Cancellation before workers start returns [`TalosError::Cancelled`].
    pub async fn run_with_events(
        &self,
        targets: &[String],
        cancel: CancellationToken,
        events: Option<mpsc::Sender<ScanEvent>>,
    ) -> Result<(Vec<Finding>, Arc<Stats>)> {
        let words = Arc::new(wordlist::load(&self.config.wordlist)?);
        let per_word = 1 + self.config.extensions.len();
        let initial_total = (targets.len() * words.len() * per_word) as u64;

        let stats = Arc::new(Stats::new(initial_total));
        let _ = self.stats_tx.send(Some(Arc::clone(&stats)));

        for target in targets {
            if cancel.is_cancelled() {
                return Err(TalosError::Cancelled);
            }
            info!("calibrating {target}");
            calibration::calibrate(
                &self.transport,
                target,
                &self.config.custom_headers,
                self.config.calibration_probes,
                &self.config.extensions,
                &self.calibration,
                &cancel,
            )
            .await;
        }

        let outstanding = Arc::new(OutstandingTasks::new(initial_total as i64));
        let capacity = (self.config.threads * 2).max(2);

        let (task_tx, task_rx) = async_channel::bounded::<Task>(capacity);
        let (result_tx, result_rx) = mpsc::channel::<Finding>(capacity);
        let (recursion_tx, recursion_rx) = mpsc::unbounded_channel::<Task>();

        let aggregator = tokio::spawn(aggregate(
            result_rx,
            events.clone(),
            Arc::clone(&stats),
            cancel.clone(),
        ));

        let expander = if self.config.max_depth > 0 {
            Some(tokio::spawn(expand_recursion(
                recursion_rx,
                task_tx.clone(),
                Arc::clone(&words),
                self.config.extensions.clone(),
                self.config.max_depth,
                Arc::clone(&stats),
                Arc::clone(&outstanding),
                cancel.clone(),
            )))
        } else {
            drop(recursion_rx);
            None
        };

        let mut workers = Vec::with_capacity(self.config.threads);
        for _ in 0..self.config.threads {
            let ctx = WorkerContext {
                config: Arc::clone(&self.config),
                transport: Arc::clone(&self.transport),
                stats: Arc::clone(&stats),
                calibration: Arc::clone(&self.calibration),
                results: result_tx.clone(),
                recursion: (self.config.max_depth > 0).then(|| recursion_tx.clone()),
                outstanding: Arc::clone(&outstanding),
                cancel: cancel.clone(),
                events: events.clone(),
            };
            workers.push(tokio::spawn(run_worker(
                ctx,
                task_rx.clone(),
                SmallRng::from_entropy(),
            )));
        }
        drop(result_tx);
        drop(recursion_tx);
        drop(task_rx);

        let producer = tokio::spawn(produce_initial(
            targets.to_vec(),
            Arc::clone(&words),
            self.config.extensions.clone(),
            task_tx.clone(),
            Arc::clone(&outstanding),
            initial_total as i64,
            cancel.clone(),
        ));

        // Closer: the only place the task channel is closed.
        let closer = {
            let outstanding = Arc::clone(&outstanding);
            let task_tx = task_tx.clone();
            tokio::spawn(async move {
                outstanding.wait().await;
                task_tx.close();
            })
        };
        drop(task_tx);

        let _ = producer.await;
        for worker in workers {
            let _ = worker.await;
        }
        if let Some(expander) = expander {
            let _ = expander.await;
        }
        let _ = closer.await;

        let findings = aggregator.await.unwrap_or_default();

        if let Some(events) = events {
            let _ = events.send(ScanEvent::ScanComplete).await;
        }

        Ok((findings, stats))
    }
}

/// Enqueues the initial `targets × words × (1 + extensions)` tasks. On
/// cancellation the unsent remainder is subtracted from the counter so the
/// closer can still observe completion.
async fn produce_initial(
    targets: Vec<String>,
    words: Arc<Vec<String>>,
    extensions: Vec<String>,
    task_tx: async_channel::Sender<Task>,
    outstanding: Arc<OutstandingTasks>,
    initial_total: i64,
    cancel: CancellationToken,
) {
    let mut sent: i64 = 0;
    for target in &targets {
        for word in words.iter() {
            for path in path_variants(word, "", &extensions) {
                let task = Task {
                    target: target.clone(),
                    path,
                    depth: 1,
                };
                tokio::select! {
                    res = task_tx.send(task) => {
                        if res.is_err() {
                            outstanding.add(-(initial_total - sent));
                            return;
                        }
                        sent += 1;
                    }
                    _ = cancel.cancelled() => {
                        outstanding.add(-(initial_total - sent));
                        return;
                    }
                }
            }
        }
    }
}

/// Consumes directory-discovery events and re-expands each new directory
/// into per-word tasks. Each directory is admitted at most once per target
/// across all depths.
#[allow(clippy::too_many_arguments)]
async fn expand_recursion(
    mut recursion_rx: mpsc::UnboundedReceiver<Task>,
    task_tx: async_channel::Sender<Task>,
    words: Arc<Vec<String>>,
    extensions: Vec<String>,
    max_depth: u32,
    stats: Arc<Stats>,
    outstanding: Arc<OutstandingTasks>,
    cancel: CancellationToken,
) {
    let mut seen: HashMap<String, HashSet<String>> = HashMap::new();

    while let Some(event) = recursion_rx.recv().await {
        if cancel.is_cancelled() {
            outstanding.done();
            continue;
        }

        let dirs = seen.entry(event.target.clone()).or_default();
        if event.depth > max_depth || !dirs.insert(event.path.clone()) {
            outstanding.done();
            continue;
        }

        debug!("recursing into {} (depth {})", event.path, event.depth);
        let base = event.path.trim_end_matches('/').to_string();

        'expand: for word in words.iter() {
            for path in path_variants(word, &base, &extensions) {
                outstanding.add(1);
                let task = Task {
                    target: event.target.clone(),
                    path,
                    depth: event.depth,
                };
                tokio::select! {
                    res = task_tx.send(task) => {
                        if res.is_err() {
                            outstanding.done();
                            break 'expand;
                        }
                        stats.add_total(1);
                    }
                    _ = cancel.cancelled() => {
                        outstanding.done();
                        break 'expand;
                    }
                }
            }
        }

        // The recursion event itself.
        outstanding.done();
    }
}

/// The plain word followed by one variant per extension, under `base`.
fn path_variants(word: &str, base: &str, extensions: &[String]) -> Vec<String> {
    let mut paths = Vec::with_capacity(1 + extensions.len());
    let prefix = if base.is_empty() {
        String::new()
    } else {
        format!("{base}/")
    };
    paths.push(format!("{prefix}{word}"));
    for ext in extensions {
        paths.push(format!("{prefix}{word}{ext}"));
    }
    paths
}

/// Consumes worker results: deduplicates, counts WAF sightings, and
/// forwards accepted findings to the live observer. Returns the final
/// deduplicated set when the result channel closes.
async fn aggregate(
    mut result_rx: mpsc::Receiver<Finding>,
    events: Option<mpsc::Sender<ScanEvent>>,
    stats: Arc<Stats>,
    cancel: CancellationToken,
) -> Vec<Finding> {
    let dedup = Deduplicator::new();

    while let Some(finding) = result_rx.recv().await {
        if !finding.waf_detected.is_empty() {
            stats.incr_waf_hits();
        }
        if dedup.add(&finding) {
            if let Some(events) = &events {
                tokio::select! {
                    _ = events.send(ScanEvent::ResultFound(Box::new(finding))) => {}
                    _ = cancel.cancelled() => {}
                }
            }
        }
    }

    dedup.results()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_variants_cover_extensions() {
        let exts = vec![".php".to_string(), ".bak".to_string()];
        assert_eq!(
            path_variants("admin", "", &exts),
            vec!["admin", "admin.php", "admin.bak"]
        );
        assert_eq!(
            path_variants("users", "/api", &exts),
            vec!["/api/users", "/api/users.php", "/api/users.bak"]
        );
    }
}
