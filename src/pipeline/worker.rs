//! Batch processing across worker threads.
//!
//! [`WorkerPool::run_batch`] pulls jobs from a shared counter, one
//! document per worker at a time. Each worker opens its own handle
//! through the caller's opener, so no PDF state crosses a thread
//! boundary; the OCR engine and Bates collaborator are shared by
//! reference and must be `Sync` (the traits require it).
//!
//! Cancellation is cooperative: the shared [`CancelFlag`] is checked
//! between documents and between pages, never mid-operation. Jobs not
//! yet started when the flag goes up report [`Error::Cancelled`] in
//! their slot; results for documents already saved are unaffected.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc;
use std::time::Duration;
use std::{fs, thread};

use log::{debug, info, warn};

use crate::error::{Error, Result};
use crate::handle::DocumentHandle;
use crate::ocr::OcrEngine;

use super::config::PipelineConfig;
use super::{
    BatesStamper, DocumentOutcome, DocumentPipeline, FailureReport, PipelineOutcome,
    ProcessRequest,
};

/// Worker threads used when [`BatchOptions`] does not say otherwise.
pub const DEFAULT_WORKERS: usize = 4;

/// Most admission retries before a job is given up on.
pub const ADMISSION_RETRY_LIMIT: usize = 20;

const ADMISSION_RETRY_START: Duration = Duration::from_millis(10);
const ADMISSION_RETRY_CAP: Duration = Duration::from_millis(200);

/// Admission hook consulted with `(source, estimated_peak_memory)` before
/// a document is opened. Returning false delays the job.
pub type AdmissionFn<'a> = dyn Fn(&Path, u64) -> bool + Send + Sync + 'a;

/// Callback receiving [`ProgressEvent`]s; shared by every worker.
pub type ProgressFn<'a> = dyn Fn(ProgressEvent) + Send + Sync + 'a;

/// Peak memory estimate for processing a file of `file_len` bytes.
///
/// Parsed objects, the rewritten page copies, and raster buffers track
/// roughly three times the input size.
pub fn estimated_peak_memory(file_len: u64) -> u64 {
    file_len.saturating_mul(3)
}

/// Cooperative stop signal shared between a controller and the workers.
#[derive(Debug, Default)]
pub struct CancelFlag {
    cancelled: AtomicBool,
}

impl CancelFlag {
    /// Create an unset flag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a stop.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Whether a stop was requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Batch progress notifications.
///
/// `sequence` is the job's batch position, the same number prefixing its
/// output file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressEvent {
    /// A worker claimed the document
    DocumentStarted {
        /// Batch position
        sequence: usize,
    },
    /// One page was numbered
    PageNumbered {
        /// Batch position
        sequence: usize,
        /// Page index (0-based)
        page: usize,
        /// Numbers placed on the page
        count: usize,
    },
    /// The document was numbered and saved
    DocumentFinished {
        /// Batch position
        sequence: usize,
    },
    /// The document was routed to the failure sink
    DocumentDiverted {
        /// Batch position
        sequence: usize,
    },
    /// The document failed; its error is in the batch report
    DocumentFailed {
        /// Batch position
        sequence: usize,
    },
}

/// One document submitted to a batch.
#[derive(Debug, Clone)]
pub struct DocumentJob {
    /// Source path, handed to the opener
    pub source: PathBuf,
    /// First Bates number for this document when stamping is wired.
    ///
    /// Parallel workers cannot chain numbers across documents, so every
    /// job carries its own pre-allocated range start.
    pub bates_start: u64,
}

impl DocumentJob {
    /// Job with Bates numbering starting at 1.
    pub fn new(source: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            bates_start: 1,
        }
    }

    /// Set the document's first Bates number.
    pub fn with_bates_start(mut self, start: u64) -> Self {
        self.bates_start = start;
        self
    }
}

/// Settings for one batch run.
#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Worker thread count.
    ///
    /// Default: 4
    pub workers: usize,
    /// Directory numbered output (and `Failures/`) is written under.
    pub output_dir: PathBuf,
    /// Sequence number of the first job; later jobs count up from it.
    ///
    /// Default: 1
    pub first_sequence: usize,
    /// Pipeline thresholds shared by every document.
    pub config: PipelineConfig,
}

impl BatchOptions {
    /// Options writing under `output_dir`, defaults everywhere else.
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            output_dir: output_dir.into(),
            first_sequence: 1,
            config: PipelineConfig::default(),
        }
    }

    /// Set the worker count.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Set the first sequence number.
    pub fn with_first_sequence(mut self, sequence: usize) -> Self {
        self.first_sequence = sequence;
        self
    }

    /// Set the pipeline configuration.
    pub fn with_config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }
}

/// Terminal state of one job, held in the job's submission slot.
#[derive(Debug)]
pub enum JobResult {
    /// Numbered and saved
    Completed(DocumentOutcome),
    /// Routed to the failure sink
    Diverted(FailureReport),
    /// Failed with the given error (cancellation included)
    Failed(Error),
}

impl JobResult {
    /// Whether the job produced a numbered output.
    pub fn is_completed(&self) -> bool {
        matches!(self, JobResult::Completed(_))
    }
}

/// Results of one batch; slots are 1:1 with the submitted jobs.
#[derive(Debug)]
pub struct BatchReport {
    /// Per-job results in submission order
    pub results: Vec<JobResult>,
}

impl BatchReport {
    /// Jobs that produced a numbered output.
    pub fn completed(&self) -> usize {
        self.results.iter().filter(|r| r.is_completed()).count()
    }

    /// Jobs routed to the failure sink.
    pub fn diverted(&self) -> usize {
        self.results
            .iter()
            .filter(|r| matches!(r, JobResult::Diverted(_)))
            .count()
    }

    /// Jobs that failed outright.
    pub fn failed(&self) -> usize {
        self.results
            .iter()
            .filter(|r| matches!(r, JobResult::Failed(_)))
            .count()
    }
}

/// Runs a batch of documents across worker threads.
pub struct WorkerPool<'a> {
    options: BatchOptions,
    ocr: Option<&'a dyn OcrEngine>,
    bates: Option<&'a dyn BatesStamper>,
    admission: Option<&'a AdmissionFn<'a>>,
    progress: Option<&'a ProgressFn<'a>>,
}

impl<'a> WorkerPool<'a> {
    /// Create a pool with the given options and no collaborators.
    pub fn new(options: BatchOptions) -> Self {
        Self {
            options,
            ocr: None,
            bates: None,
            admission: None,
            progress: None,
        }
    }

    /// Wire an OCR engine, shared by every worker.
    pub fn with_ocr(mut self, ocr: &'a dyn OcrEngine) -> Self {
        self.ocr = Some(ocr);
        self
    }

    /// Wire the Bates collaborator, shared by every worker.
    pub fn with_bates(mut self, bates: &'a dyn BatesStamper) -> Self {
        self.bates = Some(bates);
        self
    }

    /// Consult an admission hook before each document is opened.
    pub fn with_admission(mut self, admission: &'a AdmissionFn<'a>) -> Self {
        self.admission = Some(admission);
        self
    }

    /// Emit progress events through the given callback.
    pub fn with_progress(mut self, progress: &'a ProgressFn<'a>) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Process every job; returns once every slot is terminal.
    ///
    /// A failed document never aborts the batch: its error fills that
    /// job's slot and the workers move on. After cancellation, unstarted
    /// jobs report [`Error::Cancelled`] without being opened.
    pub fn run_batch<O>(&self, jobs: &[DocumentJob], opener: O, cancel: &CancelFlag) -> BatchReport
    where
        O: Fn(&Path) -> Result<Box<dyn DocumentHandle>> + Send + Sync,
    {
        let workers = self.options.workers.clamp(1, jobs.len().max(1));
        info!("batch of {} jobs across {} workers", jobs.len(), workers);

        let next_job = AtomicUsize::new(0);
        let (tx, rx) = mpsc::channel();

        thread::scope(|scope| {
            let next_job = &next_job;
            let opener = &opener;
            for _ in 0..workers {
                let tx = tx.clone();
                scope.spawn(move || loop {
                    let index = next_job.fetch_add(1, Ordering::SeqCst);
                    if index >= jobs.len() {
                        break;
                    }
                    let sequence = self.options.first_sequence + index;

                    let result = if cancel.is_cancelled() {
                        debug!("job {sequence} skipped: batch cancelled");
                        JobResult::Failed(Error::Cancelled)
                    } else {
                        self.emit(ProgressEvent::DocumentStarted { sequence });
                        self.run_job(&jobs[index], sequence, opener, cancel)
                    };

                    match &result {
                        JobResult::Completed(_) => {
                            self.emit(ProgressEvent::DocumentFinished { sequence })
                        }
                        JobResult::Diverted(_) => {
                            self.emit(ProgressEvent::DocumentDiverted { sequence })
                        }
                        JobResult::Failed(_) => {
                            self.emit(ProgressEvent::DocumentFailed { sequence })
                        }
                    }

                    if tx.send((index, result)).is_err() {
                        break;
                    }
                });
            }
        });
        drop(tx);

        let mut slots: Vec<Option<JobResult>> = Vec::new();
        slots.resize_with(jobs.len(), || None);
        for (index, result) in rx {
            if index < slots.len() {
                slots[index] = Some(result);
            }
        }

        let results = slots
            .into_iter()
            .map(|slot| {
                slot.unwrap_or_else(|| {
                    JobResult::Failed(Error::Handle(
                        "worker exited before reporting".to_string(),
                    ))
                })
            })
            .collect();
        BatchReport { results }
    }

    fn run_job<O>(
        &self,
        job: &DocumentJob,
        sequence: usize,
        opener: &O,
        cancel: &CancelFlag,
    ) -> JobResult
    where
        O: Fn(&Path) -> Result<Box<dyn DocumentHandle>> + Send + Sync,
    {
        if let Some(admission) = self.admission {
            let estimate = estimated_peak_memory(file_len(&job.source));
            if !self.wait_for_admission(admission, &job.source, estimate, cancel) {
                let error = if cancel.is_cancelled() {
                    Error::Cancelled
                } else {
                    Error::Handle(format!(
                        "admission denied after {ADMISSION_RETRY_LIMIT} attempts"
                    ))
                };
                return JobResult::Failed(error);
            }
        }

        let mut handle = match opener(&job.source) {
            Ok(handle) => handle,
            Err(err) => {
                warn!("could not open {}: {err}", job.source.display());
                return JobResult::Failed(err);
            }
        };

        let request = ProcessRequest::new(&job.source, &self.options.output_dir)
            .with_sequence(sequence)
            .with_bates_start(job.bates_start);

        let mut pipeline =
            DocumentPipeline::new(self.options.config.clone()).with_cancel(cancel);
        if let Some(ocr) = self.ocr {
            pipeline = pipeline.with_ocr(ocr);
        }
        if let Some(bates) = self.bates {
            pipeline = pipeline.with_bates(bates);
        }
        if let Some(progress) = self.progress {
            pipeline = pipeline.with_progress(progress);
        }

        match pipeline.process(handle.as_mut(), &request) {
            Ok(PipelineOutcome::Completed(outcome)) => JobResult::Completed(outcome),
            Ok(PipelineOutcome::Diverted(report)) => JobResult::Diverted(report),
            Err(err) => JobResult::Failed(err),
        }
    }

    /// Wait until the admission hook lets the job through.
    ///
    /// Doubling delay, capped, bounded attempt count; a raised cancel
    /// flag ends the wait immediately.
    fn wait_for_admission(
        &self,
        admission: &AdmissionFn<'_>,
        source: &Path,
        estimate: u64,
        cancel: &CancelFlag,
    ) -> bool {
        let mut delay = ADMISSION_RETRY_START;
        for attempt in 0..ADMISSION_RETRY_LIMIT {
            if cancel.is_cancelled() {
                return false;
            }
            if admission(source, estimate) {
                if attempt > 0 {
                    debug!(
                        "{} admitted after {} retries",
                        source.display(),
                        attempt
                    );
                }
                return true;
            }
            debug!(
                "admission denied for {} (estimate {} bytes), retry in {:?}",
                source.display(),
                estimate,
                delay
            );
            thread::sleep(delay);
            delay = (delay * 2).min(ADMISSION_RETRY_CAP);
        }
        warn!(
            "{} never admitted after {} attempts",
            source.display(),
            ADMISSION_RETRY_LIMIT
        );
        false
    }

    fn emit(&self, event: ProgressEvent) {
        if let Some(progress) = self.progress {
            progress(event);
        }
    }
}

/// Size of a source file, zero when it cannot be read.
///
/// Synthetic documents have no backing file; the admission hook still
/// runs, with a zero estimate.
fn file_len(path: &Path) -> u64 {
    fs::metadata(path).map(|meta| meta.len()).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Rect;
    use crate::handle::{MemoryDocument, MemoryPage};
    use std::sync::Mutex;

    const SENTENCE: &str = "The witness was sworn in and testimony began promptly.";

    fn prose_doc() -> MemoryDocument {
        let mut page = MemoryPage::letter();
        for row in 0..5 {
            let y = 100.0 + row as f32 * 24.0;
            page = page.with_span(SENTENCE, Rect::new(72.0, y, 380.0, 12.0), 11.0);
        }
        MemoryDocument::single(page)
    }

    fn open_prose(_: &Path) -> Result<Box<dyn DocumentHandle>> {
        Ok(Box::new(prose_doc()))
    }

    fn jobs(dir: &Path, count: usize) -> Vec<DocumentJob> {
        (0..count)
            .map(|i| DocumentJob::new(dir.join(format!("doc{i}.pdf"))))
            .collect()
    }

    #[test]
    fn test_estimated_peak_memory_is_three_times_the_file() {
        assert_eq!(estimated_peak_memory(1000), 3000);
        assert_eq!(estimated_peak_memory(0), 0);
        assert_eq!(estimated_peak_memory(u64::MAX), u64::MAX);
    }

    #[test]
    fn test_cancel_flag_round_trip() {
        let cancel = CancelFlag::new();
        assert!(!cancel.is_cancelled());
        cancel.cancel();
        assert!(cancel.is_cancelled());
    }

    #[test]
    fn test_batch_slots_match_submission_order() {
        let dir = tempfile::tempdir().unwrap();
        let options = BatchOptions::new(dir.path().join("out")).with_workers(2);
        let pool = WorkerPool::new(options);
        let cancel = CancelFlag::new();

        let report = pool.run_batch(&jobs(dir.path(), 3), open_prose, &cancel);
        assert_eq!(report.results.len(), 3);
        assert_eq!(report.completed(), 3);

        for (i, result) in report.results.iter().enumerate() {
            match result {
                JobResult::Completed(outcome) => {
                    let name = format!("{:04}_doc{}_NativePDF.pdf", i + 1, i);
                    assert!(outcome.output_path.ends_with(&name));
                    assert!(outcome.output_path.exists());
                }
                other => panic!("job {i}: expected completion, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_failed_document_never_aborts_the_batch() {
        let dir = tempfile::tempdir().unwrap();
        let options = BatchOptions::new(dir.path().join("out")).with_workers(1);
        let pool = WorkerPool::new(options);
        let cancel = CancelFlag::new();

        let opener = |path: &Path| -> Result<Box<dyn DocumentHandle>> {
            if path.to_string_lossy().contains("doc1") {
                Err(Error::Handle("corrupt xref".to_string()))
            } else {
                open_prose(path)
            }
        };

        let report = pool.run_batch(&jobs(dir.path(), 3), opener, &cancel);
        assert_eq!(report.completed(), 2);
        assert_eq!(report.failed(), 1);
        assert!(matches!(report.results[1], JobResult::Failed(_)));
        assert!(report.results[0].is_completed());
        assert!(report.results[2].is_completed());
    }

    #[test]
    fn test_preset_cancellation_fails_every_slot_without_opening() {
        let dir = tempfile::tempdir().unwrap();
        let opened = AtomicUsize::new(0);
        let opener = |path: &Path| {
            opened.fetch_add(1, Ordering::SeqCst);
            open_prose(path)
        };

        let options = BatchOptions::new(dir.path().join("out")).with_workers(2);
        let pool = WorkerPool::new(options);
        let cancel = CancelFlag::new();
        cancel.cancel();

        let report = pool.run_batch(&jobs(dir.path(), 4), opener, &cancel);
        assert_eq!(report.results.len(), 4);
        assert_eq!(report.failed(), 4);
        assert!(report
            .results
            .iter()
            .all(|r| matches!(r, JobResult::Failed(Error::Cancelled))));
        assert_eq!(opened.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_admission_denial_delays_without_dropping() {
        let dir = tempfile::tempdir().unwrap();
        let checks = AtomicUsize::new(0);
        let admission = |_: &Path, _: u64| checks.fetch_add(1, Ordering::SeqCst) >= 2;

        let options = BatchOptions::new(dir.path().join("out")).with_workers(1);
        let pool = WorkerPool::new(options).with_admission(&admission);
        let cancel = CancelFlag::new();

        let report = pool.run_batch(&jobs(dir.path(), 1), open_prose, &cancel);
        assert_eq!(report.completed(), 1);
        assert_eq!(checks.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_progress_events_cover_every_document() {
        let dir = tempfile::tempdir().unwrap();
        let events: Mutex<Vec<ProgressEvent>> = Mutex::new(Vec::new());
        let progress = |event: ProgressEvent| events.lock().unwrap().push(event);

        let options = BatchOptions::new(dir.path().join("out"))
            .with_workers(1)
            .with_first_sequence(10);
        let pool = WorkerPool::new(options).with_progress(&progress);
        let cancel = CancelFlag::new();

        let report = pool.run_batch(&jobs(dir.path(), 2), open_prose, &cancel);
        assert_eq!(report.completed(), 2);

        let events = events.into_inner().unwrap();
        for sequence in [10, 11] {
            assert!(events.contains(&ProgressEvent::DocumentStarted { sequence }));
            assert!(events.contains(&ProgressEvent::DocumentFinished { sequence }));
            assert!(events.contains(&ProgressEvent::PageNumbered {
                sequence,
                page: 0,
                count: 5
            }));
        }
    }

    #[test]
    fn test_batch_report_counters() {
        let report = BatchReport {
            results: vec![
                JobResult::Failed(Error::Cancelled),
                JobResult::Diverted(FailureReport {
                    source: "a.pdf".to_string(),
                    reason: "landscape".to_string(),
                    category_hint: "ScanImage".to_string(),
                    rejected_at: "2024-01-01T00:00:00Z".to_string(),
                }),
            ],
        };
        assert_eq!(report.completed(), 0);
        assert_eq!(report.diverted(), 1);
        assert_eq!(report.failed(), 1);
    }

    #[test]
    fn test_empty_batch_reports_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let pool = WorkerPool::new(BatchOptions::new(dir.path().join("out")));
        let cancel = CancelFlag::new();
        let report = pool.run_batch(&[], open_prose, &cancel);
        assert!(report.results.is_empty());
    }
}
