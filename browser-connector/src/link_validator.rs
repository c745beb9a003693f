//! Link Validator
//!
//! Probes bookmark URLs and reports the ones that are broken. Records are
//! checked in fixed-size batches: every probe of a batch is in flight at
//! once, the next batch starts only after the whole batch settled, and
//! consecutive batches are separated by a pause. Each probe is bounded by
//! its own timeout, so one hung host delays its batch by at most that long.
//!
//! Probe failures are never errors here: every probe ends in a
//! [`LinkOutcome`], and a failing probe cannot affect its siblings.

use vbookmarks_core::*;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_util::stream::{FuturesUnordered, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{watch, Notify};
use tracing::{debug, info};
use uuid::Uuid;

/// Default number of probes in flight at once
pub const DEFAULT_BATCH_SIZE: usize = 5;

/// Default per-probe timeout
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Default pause between two batches
pub const DEFAULT_BATCH_PAUSE: Duration = Duration::from_secs(1);

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (compatible; VBookmarks link checker)";

/// Why a probe produced no HTTP status
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProbeError {
    #[error("request timed out")]
    Timeout,

    #[error("{0}")]
    Network(String),
}

/// Issues one bounded network request against a URL
#[async_trait]
pub trait LinkProbe: Send + Sync {
    /// Return the HTTP status of a HEAD request to `url`
    async fn head(&self, url: &str) -> std::result::Result<u16, ProbeError>;
}

/// Settings for the HTTP probe
#[derive(Debug, Clone)]
pub struct HttpProbeConfig {
    pub request_timeout: Duration,
    pub user_agent: String,
    pub max_redirects: usize,
}

impl Default for HttpProbeConfig {
    fn default() -> Self {
        Self {
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            max_redirects: 5,
        }
    }
}

/// `LinkProbe` backed by a reqwest client issuing HEAD requests
pub struct HttpLinkProbe {
    client: reqwest::Client,
}

impl HttpLinkProbe {
    pub fn new() -> Self {
        Self::with_config(HttpProbeConfig::default())
    }

    pub fn with_config(config: HttpProbeConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .user_agent(&config.user_agent)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self { client }
    }

    /// Only absolute http(s) URLs are probed
    fn is_probeable(url: &str) -> bool {
        url::Url::parse(url)
            .map(|u| matches!(u.scheme(), "http" | "https"))
            .unwrap_or(false)
    }
}

impl Default for HttpLinkProbe {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LinkProbe for HttpLinkProbe {
    async fn head(&self, url: &str) -> std::result::Result<u16, ProbeError> {
        if !Self::is_probeable(url) {
            return Err(ProbeError::Network("Invalid URL scheme".to_string()));
        }

        match self.client.head(url).send().await {
            Ok(response) => Ok(response.status().as_u16()),
            Err(e) if e.is_timeout() => Err(ProbeError::Timeout),
            Err(e) => Err(ProbeError::Network(e.to_string())),
        }
    }
}

/// Batching and timing of a link scan
#[derive(Debug, Clone)]
pub struct LinkValidatorConfig {
    pub batch_size: usize,
    pub request_timeout: Duration,
    pub batch_pause: Duration,
}

impl Default for LinkValidatorConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            batch_pause: DEFAULT_BATCH_PAUSE,
        }
    }
}

impl LinkValidatorConfig {
    pub fn validate(&self) -> std::result::Result<(), ValidationError> {
        if self.batch_size == 0 {
            return Err(ValidationError::InvalidValue {
                field: "batch_size".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if self.request_timeout.is_zero() {
            return Err(ValidationError::InvalidValue {
                field: "request_timeout".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

/// Progress of the current or last scan, updated once per settled batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum ScanState {
    Idle,
    Scanning { scan_id: Uuid, total: usize, completed: usize },
    Completed { scan_id: Uuid, total: usize, broken: usize },
    Cancelled { scan_id: Uuid, total: usize, completed: usize },
}

impl ScanState {
    pub fn scan_id(&self) -> Option<Uuid> {
        match self {
            ScanState::Idle => None,
            ScanState::Scanning { scan_id, .. }
            | ScanState::Completed { scan_id, .. }
            | ScanState::Cancelled { scan_id, .. } => Some(*scan_id),
        }
    }
}

/// Cancellation handle for a running scan.
///
/// Cancelling drops the probes still in flight and stops the scan before
/// its next batch; every probe that already settled is still reported.
#[derive(Debug, Clone, Default)]
pub struct ScanCancel {
    inner: Arc<CancelInner>,
}

#[derive(Debug, Default)]
struct CancelInner {
    cancelled: AtomicBool,
    notify: Notify,
}

impl ScanCancel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::SeqCst);
        self.inner.notify.notify_waiters();
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Resolves once `cancel` has been called
    pub async fn cancelled(&self) {
        loop {
            let notified = self.inner.notify.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}

/// Summary of one scan
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub scan_id: Uuid,
    pub total_bookmarks: usize,
    pub checked: usize,
    pub reachable: usize,
    pub http_errors: usize,
    pub network_failures: usize,
    pub timeouts: usize,
    pub cancelled: bool,
    /// Every record whose outcome is not `Reachable`
    pub broken: Vec<LinkCheckResult>,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
}

impl ValidationReport {
    fn new(scan_id: Uuid, total_bookmarks: usize) -> Self {
        Self {
            scan_id,
            total_bookmarks,
            checked: 0,
            reachable: 0,
            http_errors: 0,
            network_failures: 0,
            timeouts: 0,
            cancelled: false,
            broken: Vec::new(),
            started_at: Utc::now(),
            duration_ms: 0,
        }
    }

    fn record(&mut self, result: LinkCheckResult) {
        self.checked += 1;
        match result.outcome {
            LinkOutcome::Reachable => {
                self.reachable += 1;
                return;
            }
            LinkOutcome::HttpError(_) => self.http_errors += 1,
            LinkOutcome::NetworkFailure => self.network_failures += 1,
            LinkOutcome::Timeout => self.timeouts += 1,
        }
        self.broken.push(result);
    }
}

/// Batched, bounded-concurrency link checker
pub struct LinkValidator {
    probe: Arc<dyn LinkProbe>,
    config: LinkValidatorConfig,
    state: watch::Sender<ScanState>,
}

impl LinkValidator {
    /// Create a validator with the default batching
    pub fn new(probe: Arc<dyn LinkProbe>) -> Self {
        let (state, _) = watch::channel(ScanState::Idle);
        Self {
            probe,
            config: LinkValidatorConfig::default(),
            state,
        }
    }

    /// Create a validator with custom batching
    pub fn with_config(probe: Arc<dyn LinkProbe>, config: LinkValidatorConfig) -> Result<Self> {
        config.validate()?;
        let (state, _) = watch::channel(ScanState::Idle);
        Ok(Self { probe, config, state })
    }

    /// Validator probing over HTTP with default settings
    pub fn http() -> Self {
        Self::new(Arc::new(HttpLinkProbe::new()))
    }

    pub fn config(&self) -> &LinkValidatorConfig {
        &self.config
    }

    /// Watch scan progress
    pub fn subscribe(&self) -> watch::Receiver<ScanState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> ScanState {
        self.state.borrow().clone()
    }

    /// Probe a single record and classify the outcome
    pub async fn check_link(&self, record: &BookmarkRecord) -> LinkCheckResult {
        let probe = self.probe.head(&record.url);
        let (outcome, detail) = match tokio::time::timeout(self.config.request_timeout, probe).await {
            Ok(Ok(status)) => (LinkOutcome::from_status(status), format!("HTTP {}", status)),
            Ok(Err(ProbeError::Network(message))) => (LinkOutcome::NetworkFailure, message),
            Ok(Err(ProbeError::Timeout)) | Err(_) => (
                LinkOutcome::Timeout,
                format!("No response within {}s", self.config.request_timeout.as_secs_f32()),
            ),
        };

        debug!("Probed {} -> {:?}", record.url, outcome);
        LinkCheckResult {
            record: record.clone(),
            outcome,
            detail,
        }
    }

    /// Check every record and return the broken ones
    pub async fn check_links(&self, records: &[BookmarkRecord]) -> Result<Vec<LinkCheckResult>> {
        let report = self.check_links_report(records, &ScanCancel::new()).await?;
        Ok(report.broken)
    }

    /// Check every record, stopping early if `cancel` fires
    pub async fn check_links_report(
        &self,
        records: &[BookmarkRecord],
        cancel: &ScanCancel,
    ) -> Result<ValidationReport> {
        ensure_unique_ids(records)?;

        let scan_id = Uuid::new_v4();
        let total = records.len();
        let start = tokio::time::Instant::now();
        let mut report = ValidationReport::new(scan_id, total);

        info!(
            "Link check {} started: {} bookmarks in batches of {}",
            scan_id, total, self.config.batch_size
        );
        self.state.send_replace(ScanState::Scanning {
            scan_id,
            total,
            completed: 0,
        });

        for (batch_index, batch) in records.chunks(self.config.batch_size).enumerate() {
            if batch_index > 0 {
                tokio::select! {
                    _ = tokio::time::sleep(self.config.batch_pause) => {}
                    _ = cancel.cancelled() => {}
                }
            }
            if cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }

            let mut pending: FuturesUnordered<_> = batch
                .iter()
                .enumerate()
                .map(|(position, record)| async move { (position, self.check_link(record).await) })
                .collect();
            let mut settled: Vec<Option<LinkCheckResult>> = batch.iter().map(|_| None).collect();

            while !pending.is_empty() {
                tokio::select! {
                    Some((position, result)) = pending.next() => settled[position] = Some(result),
                    _ = cancel.cancelled() => {
                        report.cancelled = true;
                        break;
                    }
                }
            }
            drop(pending);

            // Input order, whatever order the probes settled in
            for result in settled.into_iter().flatten() {
                report.record(result);
            }
            if report.cancelled {
                break;
            }

            debug!(
                "Link check {}: batch {} settled ({}/{})",
                scan_id,
                batch_index + 1,
                report.checked,
                total
            );
            self.publish(ScanState::Scanning {
                scan_id,
                total,
                completed: report.checked,
            });
        }

        report.duration_ms = start.elapsed().as_millis() as u64;

        if report.cancelled {
            info!(
                "Link check {} cancelled after {}/{} bookmarks",
                scan_id, report.checked, total
            );
            self.publish(ScanState::Cancelled {
                scan_id,
                total,
                completed: report.checked,
            });
        } else {
            info!(
                "Link check {} completed: {}/{} broken in {}ms",
                scan_id,
                report.broken.len(),
                total,
                report.duration_ms
            );
            self.publish(ScanState::Completed {
                scan_id,
                total,
                broken: report.broken.len(),
            });
        }

        Ok(report)
    }

    /// Publish an update of a running scan, unless a newer scan has
    /// taken over the channel since it started
    fn publish(&self, next: ScanState) {
        self.state.send_if_modified(|current| {
            if current.scan_id() != next.scan_id() {
                debug!("Dropping state update of superseded scan {:?}", next.scan_id());
                return false;
            }
            *current = next;
            true
        });
    }
}
