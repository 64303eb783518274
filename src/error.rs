//! Error types for the annotation core.
//!
//! This module defines the fatal error type plus the non-fatal warning
//! records that accumulate per document. Only structural open/save failures
//! are fatal to a single document; nothing here aborts a batch.

/// Result type alias for annotation operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while preparing a document.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// IO error (structural open/save failure)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The PDF backend reported a structural failure
    #[error("Document handle error: {0}")]
    Handle(String),

    /// Page index outside the document
    #[error("Page {page} out of range (document has {count} pages)")]
    PageOutOfRange {
        /// Requested page index (0-based)
        page: usize,
        /// Number of pages in the document
        count: usize,
    },

    /// Document diverted to the failure sink (e.g. majority-landscape)
    #[error("Unsupported layout: {0}")]
    UnsupportedLayout(String),

    /// Page-to-raster rendering failed
    #[error("Render failed: {0}")]
    RenderFailed(String),

    /// A single line-number insert failed
    #[error("Failed to place line number {line} on page {page}")]
    PlacementFailed {
        /// Page index (0-based)
        page: usize,
        /// 1-based line number that could not be placed
        line: usize,
    },

    /// Linemap sidecar present but unparseable
    #[error("Malformed linemap sidecar: {0}")]
    SidecarMalformed(String),

    /// Cooperative cancellation between pages or documents
    #[error("Processing cancelled")]
    Cancelled,
}

/// Non-fatal condition kinds surfaced in the per-document warning list.
///
/// Every degradation the pipeline survives is recorded under one of these
/// kinds so the caller can audit what happened to each document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningKind {
    /// Page facts could not be read; degraded to all-zero facts
    ProbeFailure,
    /// Orientation could not be resolved; rotation left unchanged
    OrientationUncertain,
    /// No text lines were extracted; grid-mode fallback used
    LineExtractionEmpty,
    /// Gutter guard hit; the page was already widened and numbered
    GutterAlreadyExists,
    /// One line number could not be inserted and was skipped
    NumberPlacementFailure,
    /// Linemap sidecar was unparseable; geometry extraction used instead
    SidecarMalformed,
    /// Bates collaborator returned an error after save
    BatesFailed,
}

impl std::fmt::Display for WarningKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            WarningKind::ProbeFailure => "probe failure",
            WarningKind::OrientationUncertain => "orientation uncertain",
            WarningKind::LineExtractionEmpty => "line extraction empty",
            WarningKind::GutterAlreadyExists => "gutter already exists",
            WarningKind::NumberPlacementFailure => "number placement failure",
            WarningKind::SidecarMalformed => "sidecar malformed",
            WarningKind::BatesFailed => "bates failed",
        };
        f.write_str(name)
    }
}

/// A non-fatal condition recorded while processing one document.
#[derive(Debug, Clone)]
pub struct Warning {
    /// Page the condition occurred on, if page-scoped
    pub page: Option<usize>,
    /// Condition kind
    pub kind: WarningKind,
    /// Human-readable detail
    pub detail: String,
}

impl Warning {
    /// Create a document-scoped warning.
    pub fn document(kind: WarningKind, detail: impl Into<String>) -> Self {
        Self {
            page: None,
            kind,
            detail: detail.into(),
        }
    }

    /// Create a page-scoped warning.
    pub fn page(page: usize, kind: WarningKind, detail: impl Into<String>) -> Self {
        Self {
            page: Some(page),
            kind,
            detail: detail.into(),
        }
    }
}

impl std::fmt::Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.page {
            Some(page) => write!(f, "page {}: {}: {}", page, self.kind, self.detail),
            None => write!(f, "{}: {}", self.kind, self.detail),
        }
    }
}
