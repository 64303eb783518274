//! Text-line extraction for number placement.
//!
//! This module turns raw span geometry into ordered [`TextLine`]s:
//! - overlay and form-field exclusion (text that must not attract numbers)
//! - proximity grouping (spans on one visual line become one TextLine)
//! - column detection and column-major ordering
//!
//! A page that yields no lines is not an error; the annotator falls back to
//! grid-mode placement.

pub mod columns;
pub mod exclusion;
pub mod lines;

use crate::error::{Result, Warning, WarningKind};
use crate::geometry::Rect;
use crate::handle::DocumentHandle;
use crate::pipeline::config::LayoutConfig;
use crate::utils::safe_float_cmp;

pub use lines::baseline_of;

/// A text span as the document handle reports it: one run of text with a
/// single font size, in content space.
#[derive(Debug, Clone, PartialEq)]
pub struct TextSpan {
    /// The text run
    pub text: String,
    /// Bounding box in page points (top-left origin)
    pub bbox: Rect,
    /// Font size in points
    pub font_size: f32,
    /// Column assignment, recorded once a column divide is detected
    pub column_hint: Option<usize>,
}

impl TextSpan {
    /// Create a span with no column assignment.
    pub fn new(text: impl Into<String>, bbox: Rect, font_size: f32) -> Self {
        Self {
            text: text.into(),
            bbox,
            font_size,
            column_hint: None,
        }
    }
}

/// One visual line of text, ready to receive a gutter number.
#[derive(Debug, Clone, PartialEq)]
pub struct TextLine {
    /// Member text, joined left to right
    pub text: String,
    /// Reference box: the leftmost member span's bounding box
    pub bbox: Rect,
    /// Y position the number aligns to
    pub baseline_y: f32,
    /// Average font size across member spans
    pub font_size: f32,
}

/// Extracts ordered text lines from a page.
///
/// The engine owns no document state; one instance serves every page of a
/// document in sequence.
///
/// # Examples
///
/// ```
/// use pdf_gutter::geometry::Rect;
/// use pdf_gutter::handle::{MemoryDocument, MemoryPage};
/// use pdf_gutter::layout::LineLayoutEngine;
/// use pdf_gutter::pipeline::config::LayoutConfig;
///
/// let page = MemoryPage::letter()
///     .with_span("First line of the deposition", Rect::new(72.0, 100.0, 300.0, 12.0), 11.0)
///     .with_span("Second line follows below it", Rect::new(72.0, 118.0, 300.0, 12.0), 11.0);
/// let doc = MemoryDocument::single(page);
///
/// let engine = LineLayoutEngine::new(LayoutConfig::default());
/// let mut warnings = Vec::new();
/// let lines = engine.extract_lines(&doc, 0, &mut warnings).unwrap();
/// assert_eq!(lines.len(), 2);
/// assert!(lines[0].baseline_y < lines[1].baseline_y);
/// ```
pub struct LineLayoutEngine {
    config: LayoutConfig,
}

impl LineLayoutEngine {
    /// Create an engine with the given thresholds.
    pub fn new(config: LayoutConfig) -> Self {
        Self { config }
    }

    /// Extract ordered text lines from one page.
    ///
    /// Lines come back in reading order: top to bottom, and on two-column
    /// pages the whole left column before the right column. An empty list
    /// is a valid outcome (scanned page, or everything excluded) and
    /// selects grid-mode placement upstream; it is recorded as a
    /// [`WarningKind::LineExtractionEmpty`] warning, never an error.
    ///
    /// Only a failed geometry read is structural enough to propagate.
    pub fn extract_lines(
        &self,
        handle: &dyn DocumentHandle,
        page: usize,
        warnings: &mut Vec<Warning>,
    ) -> Result<Vec<TextLine>> {
        let geometry = handle.geometry(page)?;
        let (display_width, _) = geometry.display_size();

        let spans = match handle.text_spans(page) {
            Ok(spans) => spans,
            Err(err) => {
                log::warn!("page {}: span extraction failed: {}", page, err);
                warnings.push(Warning::page(
                    page,
                    WarningKind::LineExtractionEmpty,
                    format!("span extraction failed: {err}"),
                ));
                return Ok(Vec::new());
            },
        };

        let zones = self.exclusion_zones(handle, page);
        let mut kept = exclusion::filter_spans(spans, &zones, display_width, &self.config);
        if kept.is_empty() {
            log::debug!("page {}: no spans survived exclusion, grid fallback", page);
            warnings.push(Warning::page(
                page,
                WarningKind::LineExtractionEmpty,
                "no usable text lines",
            ));
            return Ok(Vec::new());
        }

        // The divide is measured before grouping: a merged line anchors at
        // its leftmost member, which hides the right column whenever the
        // two columns share baselines.
        let ordered = match columns::detect_split(&kept, display_width, &self.config) {
            Some(split_x) => {
                columns::assign_columns(&mut kept, split_x);
                let (left, right): (Vec<TextSpan>, Vec<TextSpan>) =
                    kept.into_iter().partition(|s| s.column_hint == Some(0));

                let mut ordered = lines::group_into_lines(&left, &self.config);
                ordered.sort_by(|a, b| safe_float_cmp(a.baseline_y, b.baseline_y));

                let mut right_lines = lines::group_into_lines(&right, &self.config);
                right_lines.sort_by(|a, b| safe_float_cmp(a.baseline_y, b.baseline_y));

                ordered.extend(right_lines);
                ordered
            },
            None => {
                let mut ordered = lines::group_into_lines(&kept, &self.config);
                ordered.sort_by(|a, b| {
                    safe_float_cmp(a.baseline_y, b.baseline_y)
                        .then(safe_float_cmp(a.bbox.x, b.bbox.x))
                });
                ordered
            },
        };

        log::debug!("page {}: {} text lines extracted", page, ordered.len());
        Ok(ordered)
    }

    /// Synthesize lines from sidecar baseline positions.
    ///
    /// Used when an upstream converter shipped a linemap: positions are
    /// exact, so no geometry extraction runs. Positions are sorted
    /// ascending; each becomes an empty-text line with a nominal 10pt box
    /// whose baseline lands exactly on the recorded position.
    pub fn lines_from_positions(&self, positions: &[f32]) -> Vec<TextLine> {
        const SIDECAR_FONT_SIZE_PT: f32 = 10.0;

        let mut sorted = positions.to_vec();
        sorted.sort_by(|a, b| safe_float_cmp(*a, *b));

        sorted
            .into_iter()
            .map(|y| {
                // Box placed so that baseline_of(bbox) == y.
                let height = SIDECAR_FONT_SIZE_PT;
                let bbox = Rect::new(0.0, y - 0.85 * height, 0.0, height);
                TextLine {
                    text: String::new(),
                    bbox,
                    baseline_y: y,
                    font_size: SIDECAR_FONT_SIZE_PT,
                }
            })
            .collect()
    }

    /// Rectangles no line may overlap: form-field widgets plus annotations.
    ///
    /// Enumeration failures degrade to an empty list; a page we cannot
    /// inspect for fields still gets its prose numbered.
    fn exclusion_zones(&self, handle: &dyn DocumentHandle, page: usize) -> Vec<Rect> {
        let mut zones = handle.form_field_rects(page).unwrap_or_default();
        zones.extend(handle.annotation_rects(page).unwrap_or_default());
        zones
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handle::{MemoryDocument, MemoryPage};

    fn engine() -> LineLayoutEngine {
        LineLayoutEngine::new(LayoutConfig::default())
    }

    #[test]
    fn test_extract_lines_orders_top_to_bottom() {
        let page = MemoryPage::letter()
            .with_span("further down the page", Rect::new(72.0, 300.0, 200.0, 12.0), 11.0)
            .with_span("nearer the top", Rect::new(72.0, 100.0, 200.0, 12.0), 11.0);
        let doc = MemoryDocument::single(page);

        let mut warnings = Vec::new();
        let lines = engine().extract_lines(&doc, 0, &mut warnings).unwrap();

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].text, "nearer the top");
        assert_eq!(lines[1].text, "further down the page");
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_extract_lines_emits_left_column_before_right() {
        // Rows share baselines across the columns, the layout most likely
        // to tempt grouping into welding the page back into single lines.
        let mut page = MemoryPage::letter();
        for row in 0..4 {
            let y = 100.0 + row as f32 * 20.0;
            page = page
                .with_span(format!("left {row}"), Rect::new(40.0, y, 180.0, 12.0), 11.0)
                .with_span(format!("right {row}"), Rect::new(430.0, y, 150.0, 12.0), 11.0);
        }
        let doc = MemoryDocument::single(page);

        let mut warnings = Vec::new();
        let lines = engine().extract_lines(&doc, 0, &mut warnings).unwrap();

        assert_eq!(lines.len(), 8);
        for (i, line) in lines.iter().enumerate() {
            let expected = if i < 4 {
                format!("left {i}")
            } else {
                format!("right {}", i - 4)
            };
            assert_eq!(line.text, expected);
        }
    }

    #[test]
    fn test_extract_lines_empty_page_warns_and_returns_empty() {
        let doc = MemoryDocument::single(MemoryPage::letter());

        let mut warnings = Vec::new();
        let lines = engine().extract_lines(&doc, 0, &mut warnings).unwrap();

        assert!(lines.is_empty());
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].kind, WarningKind::LineExtractionEmpty);
        assert_eq!(warnings[0].page, Some(0));
    }

    #[test]
    fn test_extract_lines_survives_span_read_failure() {
        let doc = MemoryDocument::single(MemoryPage::letter().unreadable());

        let mut warnings = Vec::new();
        let lines = engine().extract_lines(&doc, 0, &mut warnings).unwrap();

        assert!(lines.is_empty());
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].kind, WarningKind::LineExtractionEmpty);
    }

    #[test]
    fn test_lines_from_positions_sorts_and_hits_baselines() {
        let lines = engine().lines_from_positions(&[300.0, 100.0, 200.0]);

        let baselines: Vec<f32> = lines.iter().map(|l| l.baseline_y).collect();
        assert_eq!(baselines, vec![100.0, 200.0, 300.0]);
        for line in &lines {
            assert!((baseline_of(&line.bbox) - line.baseline_y).abs() < 1e-4);
            assert!(line.text.is_empty());
        }
    }

    #[test]
    fn test_span_constructor_has_no_column_hint() {
        let span = TextSpan::new("text", Rect::new(0.0, 0.0, 10.0, 10.0), 12.0);
        assert_eq!(span.column_hint, None);
    }
}
