//! Pipeline orchestrator: fetch → parse → extract → validate per unit of work.
//!
//! ## Unit state machine
//!
//! `Fetching → Parsing → Extracting → Validating → Done`, where any stage can
//! end in `Failed` with the matching [`FailureKind`]. Partial row failures and
//! (in lenient mode) schema violations ride along with a `Done` unit.
//!
//! ## Batches
//!
//! `run_batch()` drives every unit independently and never aborts on one
//! unit's failure. With `concurrency = 1` (default) units run strictly one
//! after another; higher values fan out over a semaphore. Cancellation is
//! checked between units only, so finished outcomes are always kept.
//!
//! Each unit runs in its own task. A task that panics is reported as an
//! aborted unit, apart from the units that failed or were cancelled.

use crate::config::{FetcherConfig, PipelineConfig};
use crate::error::{FailureKind, FetchError, UnitError};
use crate::extract::table::{build_table, RowFailure, RowTolerance};
use crate::models::{RawDocument, Table, TableType, Unit};
use crate::schema::{validate, Schema, ValidationResult, Violation};
use crate::scraper::parsers::HtmlDocument;
use crate::scraper::PageFetcher;
use crate::specs::shifts::ShiftChart;
use crate::specs::TableSource;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinHandle};
use tokio_retry::strategy::{jitter, FibonacciBackoff};
use tokio_retry::RetryIf;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Fetching,
    Parsing,
    Extracting,
    Validating,
    Done,
}

/// What one batch extracts: where the records come from and the schema they
/// must meet.
pub struct TableJob {
    pub source: TableSource,
    pub schema: Schema,
}

impl TableJob {
    pub fn table_type(&self) -> TableType {
        self.schema.table_type
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_ms: u64,
}

impl From<&FetcherConfig> for RetryPolicy {
    fn from(cfg: &FetcherConfig) -> Self {
        Self {
            max_retries: cfg.max_retries,
            base_ms: cfg.retry_base_ms,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct UnitPolicy {
    pub strict: bool,
    pub tolerance: RowTolerance,
}

impl From<&PipelineConfig> for UnitPolicy {
    fn from(cfg: &PipelineConfig) -> Self {
        Self {
            strict: cfg.strict,
            tolerance: RowTolerance {
                max_failed_ratio: cfg.max_row_failure_ratio,
            },
        }
    }
}

// ── Outcomes ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct UnitReport {
    pub table: Table,
    pub extraction_failures: Vec<RowFailure>,
    pub violations: Vec<Violation>,
}

impl UnitReport {
    pub fn is_partial(&self) -> bool {
        !self.extraction_failures.is_empty() || !self.violations.is_empty()
    }
}

#[derive(Debug)]
pub struct UnitOutcome {
    pub unit: Unit,
    pub result: Result<UnitReport, UnitError>,
}

impl UnitOutcome {
    pub fn stage(&self) -> Stage {
        match &self.result {
            Ok(_) => Stage::Done,
            Err(e) => match e.kind() {
                FailureKind::Fetch => Stage::Fetching,
                FailureKind::Parse => Stage::Parsing,
                FailureKind::Extract => Stage::Extracting,
                FailureKind::Validate => Stage::Validating,
            },
        }
    }
}

/// A unit whose task panicked before producing an outcome.
#[derive(Debug, Clone, PartialEq)]
pub struct AbortedUnit {
    pub unit: Unit,
    pub message: String,
}

#[derive(Debug, Default)]
pub struct BatchReport {
    /// In input order.
    pub outcomes: Vec<UnitOutcome>,
    /// Units never started because the batch was cancelled.
    pub cancelled: Vec<Unit>,
    pub aborted: Vec<AbortedUnit>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FailedUnit {
    pub unit_id: String,
    pub url: String,
    pub kind: FailureKind,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchSummary {
    pub succeeded: usize,
    pub partial: usize,
    pub failed: usize,
    pub cancelled: usize,
    pub aborted: usize,
    pub failures: Vec<FailedUnit>,
}

impl BatchReport {
    pub fn summary(&self) -> BatchSummary {
        let mut summary = BatchSummary {
            cancelled: self.cancelled.len(),
            aborted: self.aborted.len(),
            ..Default::default()
        };
        for outcome in &self.outcomes {
            match &outcome.result {
                Ok(report) if report.is_partial() => summary.partial += 1,
                Ok(_) => summary.succeeded += 1,
                Err(e) => {
                    summary.failed += 1;
                    summary.failures.push(FailedUnit {
                        unit_id: outcome.unit.id.clone(),
                        url: outcome.unit.url.clone(),
                        kind: e.kind(),
                        message: e.to_string(),
                    });
                }
            }
        }
        summary
    }

    pub fn reports(&self) -> impl Iterator<Item = (&Unit, &UnitReport)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().ok().map(|r| (&o.unit, r)))
    }
}

// ── Orchestrator ──────────────────────────────────────────────────────────────

pub struct Pipeline {
    fetcher: Arc<dyn PageFetcher>,
    concurrency: usize,
    retry: RetryPolicy,
    policy: UnitPolicy,
}

impl Pipeline {
    pub fn new(fetcher: Arc<dyn PageFetcher>, config: &PipelineConfig, retry: RetryPolicy) -> Self {
        Self {
            fetcher,
            concurrency: config.concurrency.max(1),
            retry,
            policy: UnitPolicy::from(config),
        }
    }

    pub async fn run_batch(
        &self,
        job: Arc<TableJob>,
        units: Vec<Unit>,
        cancel: &CancellationToken,
    ) -> BatchReport {
        let table_type = job.table_type();
        info!(
            "=== {}: {} unit(s), concurrency {} ===",
            table_type,
            units.len(),
            self.concurrency
        );

        let report = if self.concurrency == 1 {
            self.run_sequential(&job, units, cancel).await
        } else {
            self.run_concurrent(job, units, cancel).await
        };

        let s = report.summary();
        info!(
            "=== {}: {} succeeded | {} partial | {} failed | {} cancelled | {} aborted ===",
            table_type, s.succeeded, s.partial, s.failed, s.cancelled, s.aborted
        );
        report
    }

    fn spawn_unit(&self, job: &Arc<TableJob>, unit: Unit) -> JoinHandle<UnitOutcome> {
        let fetcher = Arc::clone(&self.fetcher);
        let job = Arc::clone(job);
        let (retry, policy) = (self.retry, self.policy);
        tokio::spawn(async move { run_unit(fetcher.as_ref(), &job, unit, retry, policy).await })
    }

    async fn run_sequential(
        &self,
        job: &Arc<TableJob>,
        units: Vec<Unit>,
        cancel: &CancellationToken,
    ) -> BatchReport {
        let mut report = BatchReport::default();
        let mut pending = units.into_iter();

        while let Some(unit) = pending.next() {
            if cancel.is_cancelled() {
                warn!("Batch cancelled, {} unit(s) not started", pending.len() + 1);
                report.cancelled.push(unit);
                report.cancelled.extend(pending);
                break;
            }
            match self.spawn_unit(job, unit.clone()).await {
                Ok(outcome) => report.outcomes.push(outcome),
                Err(e) => report.aborted.push(aborted(unit, e)),
            }
        }

        report
    }

    async fn run_concurrent(
        &self,
        job: Arc<TableJob>,
        units: Vec<Unit>,
        cancel: &CancellationToken,
    ) -> BatchReport {
        let sem = Arc::new(Semaphore::new(self.concurrency));
        let mut handles = Vec::with_capacity(units.len());

        for unit in units {
            let fetcher = Arc::clone(&self.fetcher);
            let job = Arc::clone(&job);
            let sem = Arc::clone(&sem);
            let cancel = cancel.clone();
            let (retry, policy) = (self.retry, self.policy);
            let task_unit = unit.clone();

            let handle = tokio::spawn(async move {
                let Ok(_permit) = sem.acquire_owned().await else {
                    return None;
                };
                if cancel.is_cancelled() {
                    return None;
                }
                Some(run_unit(fetcher.as_ref(), &job, task_unit, retry, policy).await)
            });

            handles.push((unit, handle));
        }

        let mut report = BatchReport::default();
        for (unit, handle) in handles {
            match handle.await {
                Ok(Some(outcome)) => report.outcomes.push(outcome),
                Ok(None) => report.cancelled.push(unit),
                Err(e) => report.aborted.push(aborted(unit, e)),
            }
        }

        if !report.cancelled.is_empty() {
            warn!("Batch cancelled, {} unit(s) not started", report.cancelled.len());
        }
        report
    }
}

fn aborted(unit: Unit, err: JoinError) -> AbortedUnit {
    let message = match err.try_into_panic() {
        Ok(payload) => payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "panic with a non-string payload".to_string()),
        Err(err) => err.to_string(),
    };
    error!("{}: task aborted: {}", unit.id, message);
    AbortedUnit { unit, message }
}

async fn run_unit(
    fetcher: &dyn PageFetcher,
    job: &TableJob,
    unit: Unit,
    retry: RetryPolicy,
    policy: UnitPolicy,
) -> UnitOutcome {
    debug!(unit = %unit.id, stage = ?Stage::Fetching, "{}", unit.url);

    let result = match fetch_with_retry(fetcher, &unit.url, retry).await {
        Ok(raw) => process_document(raw, &unit.id, job, policy),
        Err(e) => Err(UnitError::from(e)),
    };

    match &result {
        Ok(report) if report.is_partial() => warn!(
            "{}: {} rows, {} row failure(s), {} violation(s)",
            unit.id,
            report.table.len(),
            report.extraction_failures.len(),
            report.violations.len()
        ),
        Ok(report) => info!("{}: {} rows", unit.id, report.table.len()),
        Err(e) => warn!("{}: failed ({}): {}", unit.id, e.kind(), e),
    }

    UnitOutcome { unit, result }
}

async fn fetch_with_retry(
    fetcher: &dyn PageFetcher,
    url: &str,
    retry: RetryPolicy,
) -> Result<RawDocument, FetchError> {
    let strategy = FibonacciBackoff::from_millis(retry.base_ms)
        .map(jitter)
        .take(retry.max_retries as usize);

    RetryIf::spawn(
        strategy,
        || fetcher.fetch(url),
        |e: &FetchError| {
            let transient = e.is_transient();
            if transient {
                warn!("Retrying after transient failure: {}", e);
            }
            transient
        },
    )
    .await
}

/// Synchronous half of a unit: the parsed document never crosses an await.
pub fn process_document(
    raw: RawDocument,
    unit_id: &str,
    job: &TableJob,
    policy: UnitPolicy,
) -> Result<UnitReport, UnitError> {
    let built = match &job.source {
        TableSource::Html(def) => {
            debug!(unit = %unit_id, stage = ?Stage::Parsing);
            let doc = HtmlDocument::parse(raw)?;
            debug!(unit = %unit_id, stage = ?Stage::Extracting);
            build_table(&doc, def, unit_id, policy.tolerance)?
        }
        TableSource::ShiftChart => {
            debug!(unit = %unit_id, stage = ?Stage::Parsing);
            let chart = ShiftChart::parse(&raw)?;
            debug!(unit = %unit_id, stage = ?Stage::Extracting);
            chart.build_table(unit_id, policy.tolerance)?
        }
    };

    debug!(unit = %unit_id, stage = ?Stage::Validating);
    let (table, violations) = match validate(built.table, &job.schema) {
        ValidationResult::Conforming(table) => (table, Vec::new()),
        ValidationResult::NonConforming {
            violations,
            description,
            ..
        } if policy.strict => {
            return Err(UnitError::Validate {
                violations,
                description,
            });
        }
        ValidationResult::NonConforming {
            table,
            violations,
            description,
        } => {
            debug!("{}", description);
            (table, violations)
        }
    };

    debug!(unit = %unit_id, stage = ?Stage::Done);
    Ok(UnitReport {
        table,
        extraction_failures: built.failures,
        violations,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::specs::{fixtures, Catalog};
    use async_trait::async_trait;
    use std::collections::{HashMap, VecDeque};
    use std::sync::Mutex;
    use tokio_test::{assert_err, assert_ok};

    /// Serves canned responses per URL; the last response repeats.
    #[derive(Default)]
    struct StubFetcher {
        responses: Mutex<HashMap<String, VecDeque<Result<String, FetchError>>>>,
        calls: Mutex<Vec<String>>,
        cancel_on_fetch: Option<CancellationToken>,
        panic_on: Option<&'static str>,
    }

    impl StubFetcher {
        fn with(mut self, url: &str, responses: Vec<Result<String, FetchError>>) -> Self {
            self.responses
                .get_mut()
                .unwrap()
                .insert(url.to_string(), responses.into());
            self
        }

        fn calls_to(&self, url: &str) -> usize {
            self.calls.lock().unwrap().iter().filter(|u| *u == url).count()
        }
    }

    #[async_trait]
    impl PageFetcher for StubFetcher {
        async fn fetch(&self, url: &str) -> Result<RawDocument, FetchError> {
            self.calls.lock().unwrap().push(url.to_string());
            if let Some(token) = &self.cancel_on_fetch {
                token.cancel();
            }
            if self.panic_on == Some(url) {
                panic!("stub fetcher blew up on {}", url);
            }
            let mut responses = self.responses.lock().unwrap();
            let queue = responses.get_mut(url).expect("unexpected url");
            let next = if queue.len() > 1 {
                queue.pop_front().unwrap()
            } else {
                queue.front().cloned().unwrap()
            };
            next.map(|body| RawDocument::new(url, body))
        }
    }

    fn status(url: &str, code: u16) -> Result<String, FetchError> {
        Err(FetchError::HttpStatus {
            url: url.to_string(),
            status: code,
        })
    }

    fn job(table_type: TableType) -> Arc<TableJob> {
        let catalog = Catalog::standard().unwrap();
        Arc::new(TableJob {
            source: catalog.source(table_type).unwrap().clone(),
            schema: catalog.schema(table_type).unwrap().clone(),
        })
    }

    fn pipeline(fetcher: StubFetcher, strict: bool, concurrency: usize) -> (Pipeline, Arc<StubFetcher>) {
        let fetcher = Arc::new(fetcher);
        let config = PipelineConfig {
            strict,
            concurrency,
            ..Default::default()
        };
        let retry = RetryPolicy {
            max_retries: 2,
            base_ms: 0,
        };
        (Pipeline::new(fetcher.clone(), &config, retry), fetcher)
    }

    fn units(urls: &[&str]) -> Vec<Unit> {
        urls.iter()
            .enumerate()
            .map(|(i, url)| Unit::new(format!("20210200{:02}", i + 1), *url))
            .collect()
    }

    #[tokio::test]
    async fn test_well_formed_page_is_done() {
        let stub = StubFetcher::default().with("u1", vec![Ok(fixtures::skaters_page_with(20))]);
        let (pipeline, _) = pipeline(stub, false, 1);

        let report = pipeline
            .run_batch(job(TableType::Skaters), units(&["u1"]), &CancellationToken::new())
            .await;

        let outcome = &report.outcomes[0];
        assert_eq!(outcome.stage(), Stage::Done);
        let unit = assert_ok!(outcome.result.as_ref());
        assert_eq!(unit.table.len(), 20);
        assert!(unit.extraction_failures.is_empty());
        assert!(unit.violations.is_empty());
        assert_eq!(report.summary().succeeded, 1);
    }

    #[tokio::test]
    async fn test_http_error_fails_unit_and_batch_continues() {
        let stub = StubFetcher::default()
            .with("u1", vec![status("u1", 404)])
            .with("u2", vec![Ok(fixtures::skaters_page_with(3))]);
        let (pipeline, fetcher) = pipeline(stub, false, 1);

        let report = pipeline
            .run_batch(job(TableType::Skaters), units(&["u1", "u2"]), &CancellationToken::new())
            .await;

        let err = assert_err!(report.outcomes[0].result.as_ref());
        assert_eq!(err.kind(), FailureKind::Fetch);
        assert_eq!(report.outcomes[0].stage(), Stage::Fetching);
        assert!(report.outcomes[1].result.is_ok());
        // 404 is not transient: no retry.
        assert_eq!(fetcher.calls_to("u1"), 1);

        let summary = report.summary();
        assert_eq!((summary.succeeded, summary.partial, summary.failed), (1, 0, 1));
        assert_eq!(summary.failures[0].unit_id, "2021020001");
        assert_eq!(summary.failures[0].kind, FailureKind::Fetch);
    }

    #[tokio::test]
    async fn test_transient_errors_are_retried() {
        let stub = StubFetcher::default()
            .with("u1", vec![status("u1", 503), Ok(fixtures::skaters_page_with(2))])
            .with("u2", vec![status("u2", 503)]);
        let (pipeline, fetcher) = pipeline(stub, false, 1);

        let report = pipeline
            .run_batch(job(TableType::Skaters), units(&["u1", "u2"]), &CancellationToken::new())
            .await;

        assert!(report.outcomes[0].result.is_ok());
        assert_eq!(fetcher.calls_to("u1"), 2);
        assert!(report.outcomes[1].result.is_err());
        // One attempt plus two retries.
        assert_eq!(fetcher.calls_to("u2"), 3);
    }

    #[tokio::test]
    async fn test_parse_and_extract_failures() {
        let stub = StubFetcher::default()
            .with("u1", vec![Ok("   ".to_string())])
            .with("u2", vec![Ok(fixtures::skaters_page(&[fixtures::skater_row(0, "x")]))])
            .with("u3", vec![Ok(fixtures::skaters_page(&[]))]);
        let (pipeline, _) = pipeline(stub, false, 1);

        let report = pipeline
            .run_batch(job(TableType::Skaters), units(&["u1", "u2", "u3"]), &CancellationToken::new())
            .await;

        let kinds: Vec<FailureKind> = report.summary().failures.iter().map(|f| f.kind).collect();
        assert_eq!(kinds, vec![FailureKind::Parse, FailureKind::Extract, FailureKind::Extract]);
    }

    #[tokio::test]
    async fn test_partial_rows_proceed_to_validation() {
        let rows = vec![
            fixtures::skater_row(0, "1"),
            fixtures::skater_row(1, "—"),
            fixtures::skater_row(2, "0"),
        ];
        let stub = StubFetcher::default().with("u1", vec![Ok(fixtures::skaters_page(&rows))]);
        let (pipeline, _) = pipeline(stub, true, 1);

        let report = pipeline
            .run_batch(job(TableType::Skaters), units(&["u1"]), &CancellationToken::new())
            .await;

        let unit = assert_ok!(report.outcomes[0].result.as_ref());
        assert_eq!(unit.table.len(), 2);
        assert_eq!(unit.extraction_failures.len(), 1);
        assert_eq!(unit.extraction_failures[0].row_index, 1);
        assert_eq!(report.summary().partial, 1);
    }

    #[tokio::test]
    async fn test_negative_goals_strict_vs_lenient() {
        let page = fixtures::skaters_page(&[fixtures::skater_row(0, "2"), fixtures::skater_row(1, "-1")]);

        let stub = StubFetcher::default().with("u1", vec![Ok(page.clone())]);
        let (lenient, _) = pipeline(stub, false, 1);
        let report = lenient
            .run_batch(job(TableType::Skaters), units(&["u1"]), &CancellationToken::new())
            .await;
        let unit = assert_ok!(report.outcomes[0].result.as_ref());
        assert_eq!(unit.violations.len(), 1);
        assert_eq!(unit.violations[0].column, "goals");
        assert_eq!(unit.violations[0].row_index, Some(1));
        assert_eq!(unit.violations[0].actual, "-1 (integer)");

        let stub = StubFetcher::default().with("u1", vec![Ok(page)]);
        let (strict, _) = pipeline(stub, true, 1);
        let report = strict
            .run_batch(job(TableType::Skaters), units(&["u1"]), &CancellationToken::new())
            .await;
        match assert_err!(report.outcomes[0].result.as_ref()) {
            UnitError::Validate { violations, .. } => assert_eq!(violations.len(), 1),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_cancellation_keeps_finished_units() {
        let cancel = CancellationToken::new();
        let stub = StubFetcher {
            cancel_on_fetch: Some(cancel.clone()),
            ..Default::default()
        }
        .with("u1", vec![Ok(fixtures::skaters_page_with(2))])
        .with("u2", vec![Ok(fixtures::skaters_page_with(2))])
        .with("u3", vec![Ok(fixtures::skaters_page_with(2))]);
        let (pipeline, fetcher) = pipeline(stub, false, 1);

        let report = pipeline
            .run_batch(job(TableType::Skaters), units(&["u1", "u2", "u3"]), &cancel)
            .await;

        assert_eq!(report.outcomes.len(), 1);
        assert!(report.outcomes[0].result.is_ok());
        let cancelled: Vec<&str> = report.cancelled.iter().map(|u| u.url.as_str()).collect();
        assert_eq!(cancelled, vec!["u2", "u3"]);
        assert_eq!(fetcher.calls_to("u2"), 0);
        assert_eq!(report.summary().cancelled, 2);
    }

    #[tokio::test]
    async fn test_concurrent_cancellation_keeps_finished_units() {
        let cancel = CancellationToken::new();
        let mut stub = StubFetcher {
            cancel_on_fetch: Some(cancel.clone()),
            ..Default::default()
        };
        let urls = ["u1", "u2", "u3", "u4"];
        for url in urls {
            stub = stub.with(url, vec![Ok(fixtures::skaters_page_with(2))]);
        }
        let (pipeline, _) = pipeline(stub, false, 2);

        let report = pipeline.run_batch(job(TableType::Skaters), units(&urls), &cancel).await;

        assert_eq!(report.outcomes[0].unit.url, "u1");
        assert!(report.outcomes.iter().all(|o| o.result.is_ok()));
        assert!(!report.cancelled.is_empty());
        assert_eq!(report.outcomes.len() + report.cancelled.len(), 4);
        assert!(report.aborted.is_empty());
        assert_eq!(report.summary().cancelled, report.cancelled.len());
    }

    #[tokio::test]
    async fn test_panicking_unit_is_aborted_not_cancelled() {
        for concurrency in [1, 2] {
            let stub = StubFetcher {
                panic_on: Some("u2"),
                ..Default::default()
            }
            .with("u1", vec![Ok(fixtures::skaters_page_with(2))])
            .with("u2", vec![Ok(fixtures::skaters_page_with(2))])
            .with("u3", vec![Ok(fixtures::skaters_page_with(3))]);
            let (pipeline, fetcher) = pipeline(stub, false, concurrency);

            let report = pipeline
                .run_batch(job(TableType::Skaters), units(&["u1", "u2", "u3"]), &CancellationToken::new())
                .await;

            let done: Vec<&str> = report.outcomes.iter().map(|o| o.unit.url.as_str()).collect();
            assert_eq!(done, vec!["u1", "u3"], "concurrency {}", concurrency);
            assert!(report.cancelled.is_empty());
            assert_eq!(report.aborted.len(), 1);
            assert_eq!(report.aborted[0].unit.url, "u2");
            assert_eq!(report.aborted[0].message, "stub fetcher blew up on u2");
            assert_eq!(fetcher.calls_to("u3"), 1);

            let summary = report.summary();
            assert_eq!((summary.succeeded, summary.failed, summary.cancelled, summary.aborted), (2, 0, 0, 1));
        }
    }

    #[tokio::test]
    async fn test_concurrent_batch_preserves_order() {
        let urls = ["u1", "u2", "u3", "u4", "u5"];
        let mut stub = StubFetcher::default();
        for (i, url) in urls.iter().enumerate() {
            stub = if i == 2 {
                stub.with(url, vec![status(url, 410)])
            } else {
                stub.with(url, vec![Ok(fixtures::skaters_page_with(i + 1))])
            };
        }
        let (pipeline, _) = pipeline(stub, false, 3);

        let report = pipeline
            .run_batch(job(TableType::Skaters), units(&urls), &CancellationToken::new())
            .await;

        let order: Vec<&str> = report.outcomes.iter().map(|o| o.unit.url.as_str()).collect();
        assert_eq!(order, urls);
        let sizes: Vec<Option<usize>> = report
            .outcomes
            .iter()
            .map(|o| o.result.as_ref().ok().map(|r| r.table.len()))
            .collect();
        assert_eq!(sizes, vec![Some(1), Some(2), None, Some(4), Some(5)]);
    }

    #[test]
    fn test_process_document_roster() {
        let raw = RawDocument::new("https://example.test/RO020001.HTM", fixtures::roster_page());
        let policy = UnitPolicy {
            strict: true,
            tolerance: RowTolerance::default(),
        };
        let report = process_document(raw, "2021020001", &job(TableType::Roster), policy).unwrap();
        assert_eq!(report.table.table_type, TableType::Roster);
        assert_eq!(report.table.unit_id, "2021020001");
        assert_eq!(report.table.len(), 4);
    }

    #[test]
    fn test_process_document_shift_chart() {
        let policy = UnitPolicy {
            strict: true,
            tolerance: RowTolerance::default(),
        };
        let raw = RawDocument::new("https://api.test/shiftcharts", fixtures::shift_chart());
        let report = process_document(raw, "2021020001", &job(TableType::Shifts), policy).unwrap();
        assert_eq!(report.table.table_type, TableType::Shifts);
        assert_eq!(report.table.len(), 6);
        assert_eq!(report.extraction_failures.len(), 1);
        assert!(report.is_partial());

        let raw = RawDocument::new("https://api.test/shiftcharts", "<html>502 Bad Gateway</html>");
        let err = process_document(raw, "2021020001", &job(TableType::Shifts), policy).unwrap_err();
        assert_eq!(err.kind(), FailureKind::Parse);
    }
}
