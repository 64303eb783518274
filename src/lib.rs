// Allow some clippy lints that are too pedantic for this project
#![allow(clippy::type_complexity)]
#![allow(clippy::too_many_arguments)]
#![allow(clippy::needless_range_loop)]
#![allow(clippy::match_like_matches_macro)]
// Allow unused for tests
#![cfg_attr(test, allow(dead_code))]
#![cfg_attr(test, allow(unused_variables))]

//! # PDF Gutter
//!
//! Deposition-style line numbering for legal discovery PDF productions.
//!
//! Every page of a produced document gets a numbered left gutter: an 18pt
//! reserved strip with red serif numerals, one per content line, restarting
//! at 1 on each page. Documents arrive in whatever state a collection
//! yields, so the crate classifies, repairs, and lays out before it numbers.
//!
//! ## Core Features
//!
//! ### Classification & Repair
//! - **Document Classification**: samples page facts and sorts each PDF
//!   into a Text / NativePDF / ScanImage handling category
//! - **Orientation Normalization**: text-stream heuristics with an
//!   optional OCR vote for scanned pages
//! - **Failure Routing**: unsupported layouts are copied to `Failures/`
//!   with a machine-readable reason report instead of aborting the batch
//!
//! ### Numbering
//! - **Line Layout**: clusters spans into baseline-ordered lines, detects
//!   side-by-side columns, falls back to a fixed 28-row grid on pages with
//!   no extractable text
//! - **Gutter Numbering**: per-page restart, existing-gutter detection so
//!   reruns never double-number
//! - **Converter Sidecars**: `<stem>.linemap.json` positions recorded by an
//!   upstream converter override re-derived layout
//!
//! ### Batch Processing
//! - **Worker Pool**: scoped threads, one document per worker, results in
//!   submission order
//! - **Admission Control**: a caller hook can delay documents until memory
//!   headroom exists
//! - **Cooperative Cancellation**: checked between documents and pages,
//!   never mid-operation
//!
//! ## Architecture
//! - **Trait Seams**: [`handle::DocumentHandle`] abstracts the PDF backend;
//!   [`ocr::OcrEngine`] and [`pipeline::BatesStamper`] are optional
//!   collaborators supplied by the caller
//! - **Strict Ordering**: classification finishes before any page mutates,
//!   and pages mutate front to back
//!
//! ## Quick Start - Single Document
//!
//! ```ignore
//! use pdf_gutter::pipeline::{DocumentPipeline, PipelineConfig, PipelineOutcome, ProcessRequest};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Open through whatever backend implements DocumentHandle
//! let mut doc = my_backend::open("deposition.pdf")?;
//!
//! let pipeline = DocumentPipeline::new(PipelineConfig::default());
//! let request = ProcessRequest::new("deposition.pdf", "production/");
//! match pipeline.process(&mut doc, &request)? {
//!     PipelineOutcome::Completed(outcome) => {
//!         println!(
//!             "numbered {} lines into {}",
//!             outcome.total_placements(),
//!             outcome.output_path.display()
//!         );
//!     },
//!     PipelineOutcome::Diverted(report) => println!("rejected: {}", report.reason),
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Quick Start - Batch
//!
//! ```ignore
//! use pdf_gutter::pipeline::{BatchOptions, CancelFlag, DocumentJob, WorkerPool};
//!
//! let jobs: Vec<DocumentJob> = sources.iter().map(DocumentJob::new).collect();
//! let pool = WorkerPool::new(BatchOptions::new("production/"));
//! let cancel = CancelFlag::new();
//! let report = pool.run_batch(&jobs, |path| my_backend::open(path), &cancel);
//! println!(
//!     "{} completed, {} diverted, {} failed",
//!     report.completed(),
//!     report.diverted(),
//!     report.failed()
//! );
//! ```
//!
//! ## License
//!
//! Licensed under either of:
//!
//! * Apache License, Version 2.0 (<http://www.apache.org/licenses/LICENSE-2.0>)
//! * MIT license (<http://opensource.org/licenses/MIT>)
//!
//! at your option.

#![warn(missing_docs)]

// Error handling
pub mod error;

// Geometry primitives
pub mod geometry;

// Document backend seam
pub mod handle;

// OCR collaborator seam
pub mod ocr;

// Page fact sampling
pub mod probe;

// Category rules
pub mod classifier;

// Rotation repair
pub mod orientation;

// Line extraction and ordering
pub mod layout;

// Gutter numbering
pub mod gutter;

// Converter linemap sidecars
pub mod sidecar;

// Orchestration and batch workers
pub mod pipeline;

// Re-exports
pub use classifier::{DocumentCategory, DocumentVerdict};
pub use error::{Error, Result, Warning, WarningKind};
pub use gutter::{GutterAnnotator, LineNumberPlacement};
pub use handle::{DocumentHandle, DocumentId};
pub use layout::{LineLayoutEngine, TextLine, TextSpan};
pub use orientation::{OrientationDecision, OrientationNormalizer};
pub use pipeline::{
    BatchOptions, BatchReport, BatesStamper, CancelFlag, DocumentJob, DocumentOutcome,
    DocumentPipeline, FailureReport, JobResult, PipelineConfig, PipelineOutcome, ProcessRequest,
    ProgressEvent, WorkerPool,
};

// Internal utilities
pub(crate) mod utils {
    //! Internal utility functions for the library.

    use std::cmp::Ordering;

    /// Safely compare two floating point numbers, handling NaN cases.
    ///
    /// NaN values are treated as equal to each other and greater than all other values.
    /// This ensures that sorting operations never panic due to NaN comparisons.
    ///
    /// # Examples
    ///
    /// ```ignore
    /// # use std::cmp::Ordering;
    /// # use pdf_gutter::utils::safe_float_cmp;
    /// assert_eq!(safe_float_cmp(1.0, 2.0), Ordering::Less);
    /// assert_eq!(safe_float_cmp(2.0, 1.0), Ordering::Greater);
    /// assert_eq!(safe_float_cmp(1.0, 1.0), Ordering::Equal);
    ///
    /// // NaN handling
    /// assert_eq!(safe_float_cmp(f32::NAN, f32::NAN), Ordering::Equal);
    /// assert_eq!(safe_float_cmp(f32::NAN, 1.0), Ordering::Greater);
    /// assert_eq!(safe_float_cmp(1.0, f32::NAN), Ordering::Less);
    /// ```
    #[inline]
    pub fn safe_float_cmp(a: f32, b: f32) -> Ordering {
        match (a.is_nan(), b.is_nan()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Greater, // NaN > all numbers
            (false, true) => Ordering::Less,    // all numbers < NaN
            (false, false) => {
                // Both are normal numbers, safe to unwrap
                a.partial_cmp(&b).unwrap()
            },
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_safe_float_cmp_normal() {
            assert_eq!(safe_float_cmp(1.0, 2.0), Ordering::Less);
            assert_eq!(safe_float_cmp(2.0, 1.0), Ordering::Greater);
            assert_eq!(safe_float_cmp(1.5, 1.5), Ordering::Equal);
        }

        #[test]
        fn test_safe_float_cmp_nan() {
            assert_eq!(safe_float_cmp(f32::NAN, f32::NAN), Ordering::Equal);
            assert_eq!(safe_float_cmp(f32::NAN, 0.0), Ordering::Greater);
            assert_eq!(safe_float_cmp(0.0, f32::NAN), Ordering::Less);
        }

        #[test]
        fn test_safe_float_cmp_infinity() {
            assert_eq!(safe_float_cmp(f32::INFINITY, f32::INFINITY), Ordering::Equal);
            assert_eq!(safe_float_cmp(f32::INFINITY, 1.0), Ordering::Greater);
            assert_eq!(safe_float_cmp(f32::NEG_INFINITY, f32::INFINITY), Ordering::Less);
        }
    }
}

// Version info
/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
