//! Per-page content probing.
//!
//! The probe turns one page into an immutable [`PageFacts`] record: how
//! much text it carries, how image- or vector-heavy it is, whether form
//! widgets are present, and how it is sized and rotated as displayed.
//! Classification consumes a sample of these records and never re-reads
//! the page, so facts are computed exactly once.
//!
//! An unreadable content stream is not an abort: the probe degrades to
//! all-zero content facts and records a [`WarningKind::ProbeFailure`],
//! which biases classification toward the scanned strategy.

use log::{debug, warn};

use crate::error::{Result, Warning, WarningKind};
use crate::geometry::Rotation;
use crate::handle::DocumentHandle;

/// Chars above which a page counts as carrying substantial text.
pub const SUBSTANTIAL_TEXT_CHARS: usize = 200;

/// Chars below which a page counts as effectively text-free.
pub const MINIMAL_TEXT_CHARS: usize = 50;

/// Drawing count above which a page counts as dense vector art.
pub const DENSE_VECTOR_DRAWINGS: usize = 10;

/// Most pages ever probed for one document.
pub const MAX_SAMPLE_PAGES: usize = 5;

/// What one page contains, computed once and never mutated.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageFacts {
    /// Which page these facts describe
    pub page_index: usize,
    /// Extractable text length in chars, whitespace-trimmed
    pub text_char_count: usize,
    /// Placed images
    pub image_count: usize,
    /// Vector drawing objects
    pub drawing_count: usize,
    /// Form-field widgets
    pub form_field_count: usize,
    /// Rotation declared in page metadata
    pub declared_rotation: Rotation,
    /// Displayed width in points (declared rotation applied)
    pub width_pt: f32,
    /// Displayed height in points (declared rotation applied)
    pub height_pt: f32,
    /// Text span groups reported by the handle
    pub text_block_count: usize,
}

impl PageFacts {
    /// Whether the page displays wider than tall.
    pub fn is_landscape(&self) -> bool {
        self.width_pt > self.height_pt
    }

    /// More than [`SUBSTANTIAL_TEXT_CHARS`] chars of extractable text.
    pub fn has_substantial_text(&self) -> bool {
        self.text_char_count > SUBSTANTIAL_TEXT_CHARS
    }

    /// Fewer than [`MINIMAL_TEXT_CHARS`] chars of extractable text.
    pub fn has_minimal_text(&self) -> bool {
        self.text_char_count < MINIMAL_TEXT_CHARS
    }

    /// Whether the page has any form-field widgets.
    pub fn has_form_fields(&self) -> bool {
        self.form_field_count > 0
    }

    /// Image-dominant or dense-vector page with near-zero text, the
    /// signature of a scan or a rasterized fax.
    pub fn looks_scanned(&self) -> bool {
        (self.image_count > 0 || self.drawing_count > DENSE_VECTOR_DRAWINGS)
            && self.has_minimal_text()
    }
}

/// Pages to probe for a document of `page_count` pages.
///
/// At most [`MAX_SAMPLE_PAGES`] indices, spread evenly from the first page
/// to the last, deterministic for a given count.
///
/// # Examples
///
/// ```
/// use pdf_gutter::probe::sample_indices;
///
/// assert_eq!(sample_indices(3), vec![0, 1, 2]);
/// assert_eq!(sample_indices(100), vec![0, 24, 49, 74, 99]);
/// ```
pub fn sample_indices(page_count: usize) -> Vec<usize> {
    if page_count <= MAX_SAMPLE_PAGES {
        return (0..page_count).collect();
    }
    (0..MAX_SAMPLE_PAGES)
        .map(|i| i * (page_count - 1) / (MAX_SAMPLE_PAGES - 1))
        .collect()
}

/// Probe one page.
///
/// Fails only on structural errors (page out of range, geometry
/// unavailable). Content extraction failures degrade to all-zero content
/// facts with a warning pushed onto `warnings`.
pub fn probe_page(
    handle: &dyn DocumentHandle,
    page: usize,
    warnings: &mut Vec<Warning>,
) -> Result<PageFacts> {
    let geometry = handle.geometry(page)?;
    let (width_pt, height_pt) = geometry.display_size();

    let (text_char_count, text_block_count, image_count, drawing_count, form_field_count) =
        match content_facts(handle, page) {
            Ok(counts) => counts,
            Err(err) => {
                warn!("page {page}: content probe failed, degrading to zero facts: {err}");
                warnings.push(Warning::page(
                    page,
                    WarningKind::ProbeFailure,
                    format!("content unreadable: {err}"),
                ));
                (0, 0, 0, 0, 0)
            }
        };

    let facts = PageFacts {
        page_index: page,
        text_char_count,
        image_count,
        drawing_count,
        form_field_count,
        declared_rotation: geometry.rotation,
        width_pt,
        height_pt,
        text_block_count,
    };
    debug!(
        "page {page}: {} chars, {} images, {} drawings, {} fields, rotation {}",
        facts.text_char_count,
        facts.image_count,
        facts.drawing_count,
        facts.form_field_count,
        facts.declared_rotation.degrees()
    );
    Ok(facts)
}

fn content_facts(
    handle: &dyn DocumentHandle,
    page: usize,
) -> Result<(usize, usize, usize, usize, usize)> {
    let text = handle.plain_text(page)?;
    let spans = handle.text_spans(page)?;
    let images = handle.image_count(page)?;
    let drawings = handle.drawing_count(page)?;
    let fields = handle.form_field_rects(page)?;
    Ok((
        text.trim().chars().count(),
        spans.len(),
        images,
        drawings,
        fields.len(),
    ))
}
