//! Per-document orchestration.
//!
//! [`DocumentPipeline`] owns one document end to end:
//!
//! ```text
//! DocumentHandle
//!     ↓
//! [PageContentProbe]      (sampled pages → PageFacts)
//!     ↓
//! [DocumentClassifier]    (verdict, or divert to Failures/)
//!     ↓
//! per page, strictly in order:
//!     [OrientationNormalizer]  (page rewritten upright)
//!     [LineLayoutEngine]       (sidecar positions or extraction)
//!     [GutterAnnotator]        (strip widened, numbers placed)
//!     ↓
//! save → Bates stamp → sidecar cleanup → DocumentOutcome
//! ```
//!
//! The verdict selects the placement strategy: `TextFlow` consumes the
//! linemap sidecar, `NativeLayout` extracts baselines from geometry, and
//! `ScanImage` goes straight to grid mode. Classification reads only
//! sampled pages and completes before any page is mutated, so the gutter
//! transform on page N is never visible to the probe.
//!
//! Majority-landscape documents never get numbered: they are copied into
//! a `Failures/` subdirectory of the output directory together with a
//! JSON [`FailureReport`], and the batch moves on.

pub mod config;
pub mod worker;

use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::classifier::{self, DocumentCategory, DocumentVerdict};
use crate::error::{Error, Result, Warning, WarningKind};
use crate::gutter::{GutterAnnotator, LineNumberPlacement};
use crate::handle::DocumentHandle;
use crate::layout::LineLayoutEngine;
use crate::ocr::OcrEngine;
use crate::orientation::{OrientationDecision, OrientationNormalizer};
use crate::probe::{self, PageFacts};
use crate::sidecar;

pub use config::PipelineConfig;
pub use worker::{
    BatchOptions, BatchReport, CancelFlag, DocumentJob, JobResult, ProgressEvent, WorkerPool,
};

/// Subdirectory of the output directory that diverted documents land in.
pub const FAILURES_DIR: &str = "Failures";

/// Applies Bates footers to a finalized numbered PDF.
///
/// Stamping is an external capability: the collaborator receives the
/// saved output path and the document's first number, writes its
/// per-page footers, and reports the next unused number. A stamping
/// failure downgrades to a [`WarningKind::BatesFailed`] warning; the
/// numbered output already exists and stays valid.
pub trait BatesStamper: Send + Sync {
    /// Stamp the document at `path` beginning at `start`; returns the
    /// first number not consumed.
    fn stamp(&self, path: &Path, start: u64) -> Result<u64>;
}

/// Everything the pipeline needs to know about one document besides its
/// open handle.
#[derive(Debug, Clone)]
pub struct ProcessRequest {
    /// Original source path. Names the output and locates the sidecar.
    pub source: PathBuf,
    /// Directory the numbered output (and `Failures/`) is written under.
    pub output_dir: PathBuf,
    /// 1-based batch position; prefixes the output name.
    ///
    /// Default: 1
    pub sequence: usize,
    /// First Bates number for this document when a stamper is wired.
    ///
    /// Default: 1
    pub bates_start: u64,
}

impl ProcessRequest {
    /// Request for a single document with default sequencing.
    pub fn new(source: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            output_dir: output_dir.into(),
            sequence: 1,
            bates_start: 1,
        }
    }

    /// Set the batch position.
    pub fn with_sequence(mut self, sequence: usize) -> Self {
        self.sequence = sequence;
        self
    }

    /// Set the document's first Bates number.
    pub fn with_bates_start(mut self, start: u64) -> Self {
        self.bates_start = start;
        self
    }
}

/// How one document left the pipeline.
///
/// A divert is a terminal outcome, not an error: the batch layer records
/// it and keeps going.
#[derive(Debug)]
pub enum PipelineOutcome {
    /// Numbered, saved, and accounted for
    Completed(DocumentOutcome),
    /// Routed to the failure sink with the attached report
    Diverted(FailureReport),
}

/// Full account of a completed document.
#[derive(Debug)]
pub struct DocumentOutcome {
    /// Classification the strategies followed
    pub verdict: DocumentVerdict,
    /// One orientation decision per page, in page order
    pub decisions: Vec<OrientationDecision>,
    /// Number placements per page, in page order
    pub placements: IndexMap<usize, Vec<LineNumberPlacement>>,
    /// Non-fatal conditions, in occurrence order
    pub warnings: Vec<Warning>,
    /// Where the numbered document was saved
    pub output_path: PathBuf,
    /// Next unused Bates number, when stamping ran
    pub bates_next: Option<u64>,
}

impl DocumentOutcome {
    /// Numbers placed across all pages.
    pub fn total_placements(&self) -> usize {
        self.placements.values().map(Vec::len).sum()
    }
}

/// Rejection record written next to a diverted document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureReport {
    /// Original source path
    pub source: String,
    /// Why the document was rejected
    pub reason: String,
    /// Category the classification rules would have picked
    pub category_hint: String,
    /// UTC rejection time
    pub rejected_at: String,
}

/// Orchestrates one document end to end.
///
/// Collaborators are wired by reference and shared freely across
/// pipelines; the pipeline itself holds no document state and one
/// instance can process documents back to back.
///
/// # Examples
///
/// ```no_run
/// use pdf_gutter::handle::{MemoryDocument, MemoryPage};
/// use pdf_gutter::pipeline::{DocumentPipeline, PipelineConfig, ProcessRequest};
///
/// let pipeline = DocumentPipeline::new(PipelineConfig::default());
/// let mut doc = MemoryDocument::single(MemoryPage::letter());
/// let request = ProcessRequest::new("in/deposition.pdf", "out");
/// let outcome = pipeline.process(&mut doc, &request).unwrap();
/// ```
pub struct DocumentPipeline<'a> {
    config: PipelineConfig,
    ocr: Option<&'a dyn OcrEngine>,
    bates: Option<&'a dyn BatesStamper>,
    cancel: Option<&'a CancelFlag>,
    progress: Option<&'a worker::ProgressFn<'a>>,
}

impl<'a> DocumentPipeline<'a> {
    /// Create a pipeline with the given thresholds and no collaborators.
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            ocr: None,
            bates: None,
            cancel: None,
            progress: None,
        }
    }

    /// Wire an OCR engine for the orientation vote on scanned pages.
    pub fn with_ocr(mut self, ocr: &'a dyn OcrEngine) -> Self {
        self.ocr = Some(ocr);
        self
    }

    /// Wire the Bates collaborator, run over each saved output.
    pub fn with_bates(mut self, bates: &'a dyn BatesStamper) -> Self {
        self.bates = Some(bates);
        self
    }

    /// Honor a cancellation flag between pages.
    pub fn with_cancel(mut self, cancel: &'a CancelFlag) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Emit [`ProgressEvent::PageNumbered`] while numbering.
    pub fn with_progress(mut self, progress: &'a worker::ProgressFn<'a>) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Process one document: probe, classify, normalize, number, save.
    ///
    /// Returns [`PipelineOutcome::Diverted`] for unsupported layouts and
    /// `Err` only for structural failures ([`Error::Io`],
    /// [`Error::Handle`], [`Error::Cancelled`]). Every survivable
    /// degradation lands in the outcome's warning list instead.
    pub fn process(
        &self,
        handle: &mut dyn DocumentHandle,
        request: &ProcessRequest,
    ) -> Result<PipelineOutcome> {
        let page_count = handle.page_count();
        info!(
            "processing {} ({} pages)",
            request.source.display(),
            page_count
        );

        let mut warnings = Vec::new();

        let mut sample = Vec::new();
        for page in probe::sample_indices(page_count) {
            sample.push(probe::probe_page(handle, page, &mut warnings)?);
        }

        let verdict = match classifier::classify(&sample) {
            Ok(verdict) => verdict,
            Err(Error::UnsupportedLayout(reason)) => {
                let report = self.divert(handle, request, &sample, reason)?;
                return Ok(PipelineOutcome::Diverted(report));
            }
            Err(err) => return Err(err),
        };

        let linemap = sidecar::load(&request.source, &mut warnings);
        let verdict = if linemap.is_some() {
            verdict.promote_to_text_flow()
        } else {
            verdict
        };
        debug!(
            "{}: {:?} ({})",
            request.source.display(),
            verdict.category,
            verdict.rationale
        );

        let normalizer = OrientationNormalizer::new(self.config.orientation.clone(), self.ocr);
        let engine = LineLayoutEngine::new(self.config.layout.clone());
        let mut annotator = GutterAnnotator::new(self.config.gutter.clone());
        // Sidecar positions take precedence over the category: a linemap
        // means the document came from our own converter and its recorded
        // geometry beats anything re-derived from the page.
        let positions = linemap.as_ref().map(|map| map.positions_per_page(page_count));

        let mut decisions = Vec::with_capacity(page_count);
        let mut placements = IndexMap::new();
        for page in 0..page_count {
            self.check_cancelled()?;

            decisions.push(normalizer.normalize_page(handle, page, &mut warnings)?);

            let lines = match &positions {
                Some(pages) => engine.lines_from_positions(&pages[page]),
                None if verdict.category == DocumentCategory::ScanImage => Vec::new(),
                None => engine.extract_lines(handle, page, &mut warnings)?,
            };

            let placed = annotator.annotate_page(handle, page, &lines, &mut warnings)?;
            self.emit(ProgressEvent::PageNumbered {
                sequence: request.sequence,
                page,
                count: placed.len(),
            });
            placements.insert(page, placed);
        }

        fs::create_dir_all(&request.output_dir)?;
        let output_path = request.output_dir.join(output_file_name(
            request.sequence,
            &request.source,
            verdict.category,
        ));
        handle.save(&output_path)?;
        info!(
            "saved {} ({} numbers over {} pages, {} warnings)",
            output_path.display(),
            placements.values().map(Vec::len).sum::<usize>(),
            page_count,
            warnings.len()
        );

        let bates_next = match self.bates {
            Some(stamper) => match stamper.stamp(&output_path, request.bates_start) {
                Ok(next) => Some(next),
                Err(err) => {
                    warn!("bates stamping failed for {}: {err}", output_path.display());
                    warnings.push(Warning::document(WarningKind::BatesFailed, err.to_string()));
                    None
                }
            },
            None => None,
        };

        // The sidecar is single-use; it survives until its positions are
        // safely inside a saved output.
        if linemap.is_some() {
            sidecar::cleanup(&request.source);
        }

        Ok(PipelineOutcome::Completed(DocumentOutcome {
            verdict,
            decisions,
            placements,
            warnings,
            output_path,
            bates_next,
        }))
    }

    /// Route an unsupported document to the failure sink.
    ///
    /// Nothing has been mutated when a divert fires, so saving the handle
    /// writes the document as it arrived.
    fn divert(
        &self,
        handle: &mut dyn DocumentHandle,
        request: &ProcessRequest,
        sample: &[PageFacts],
        reason: String,
    ) -> Result<FailureReport> {
        let sink = request.output_dir.join(FAILURES_DIR);
        fs::create_dir_all(&sink)?;

        let name = source_file_name(&request.source, request.sequence);
        let copy_path = sink.join(format!("{:04}_{}", request.sequence, name));
        handle.save(&copy_path)?;

        let report = FailureReport {
            source: request.source.display().to_string(),
            reason,
            category_hint: classifier::category_hint(sample).label().to_string(),
            rejected_at: utc_timestamp(),
        };
        let body = serde_json::to_string_pretty(&report).map_err(std::io::Error::from)?;
        fs::write(sink.join(format!("{name}.reason.json")), body)?;

        warn!(
            "diverted {} to {}: {}",
            request.source.display(),
            copy_path.display(),
            report.reason
        );
        Ok(report)
    }

    fn check_cancelled(&self) -> Result<()> {
        match self.cancel {
            Some(cancel) if cancel.is_cancelled() => Err(Error::Cancelled),
            _ => Ok(()),
        }
    }

    fn emit(&self, event: ProgressEvent) {
        if let Some(progress) = self.progress {
            progress(event);
        }
    }
}

/// Output name for a numbered document: `<seq:04>_<stem>_<label>.pdf`.
fn output_file_name(sequence: usize, source: &Path, category: DocumentCategory) -> String {
    let stem = match source.file_stem() {
        Some(stem) => stem.to_string_lossy().into_owned(),
        None => "document".to_string(),
    };
    format!("{:04}_{}_{}.pdf", sequence, stem, category.label())
}

fn source_file_name(source: &Path, sequence: usize) -> String {
    match source.file_name() {
        Some(name) => name.to_string_lossy().into_owned(),
        None => format!("document_{sequence:04}.pdf"),
    }
}

fn utc_timestamp() -> String {
    chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string()
}
