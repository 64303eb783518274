//! Gutter creation and line-number placement.
//!
//! The annotator widens each page by a fixed left strip, fills the strip
//! opaque, and writes per-page line numbers into it: at extracted text
//! baselines when lines are available, on a fixed evenly spaced grid when
//! they are not. Both the widening and the numbering are guarded so a
//! repeat invocation on the same page is a no-op success.

use indexmap::IndexMap;
use log::{debug, warn};

use crate::error::{Result, Warning, WarningKind};
use crate::geometry::{Rect, Transform};
use crate::handle::{Color, DocumentHandle, DocumentId};
use crate::layout::TextLine;
use crate::pipeline::config::GutterConfig;

/// Production target page width. A page already wider than this plus the
/// gutter is a previously widened artifact and is not re-widened.
const EXPECTED_PAGE_WIDTH_PT: f32 = 612.0;

/// Stable identity of one page across a run.
///
/// Runtime page objects move when a document is rewritten, so the guard
/// side-table keys on document id plus index instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PageKey {
    /// Owning document
    pub document_id: DocumentId,
    /// Zero-based page index
    pub page_index: usize,
}

impl PageKey {
    /// Key for a page of a document.
    pub fn new(document_id: DocumentId, page_index: usize) -> Self {
        Self {
            document_id,
            page_index,
        }
    }
}

/// What the annotator did to a page's geometry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GutterState {
    /// Whether the gutter pass completed for this page
    pub created: bool,
    /// Strip width that was reserved
    pub width_pt: f32,
    /// Page width after widening (or the untouched width when the page
    /// arrived pre-widened)
    pub new_page_width_pt: f32,
}

/// One number written into the gutter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineNumberPlacement {
    /// 1-based number, restarting on every page
    pub line_number: usize,
    /// Baseline origin x in points
    pub x_pt: f32,
    /// Baseline origin y in points
    pub y_pt: f32,
}

/// Widens pages and places line numbers.
///
/// One annotator serves a whole run; the guard table inside it is what
/// makes repeat calls per page idempotent, so callers must reuse the
/// instance across retries rather than constructing a fresh one.
pub struct GutterAnnotator {
    config: GutterConfig,
    states: IndexMap<PageKey, GutterState>,
}

impl GutterAnnotator {
    /// Create an annotator with the given geometry and styles.
    pub fn new(config: GutterConfig) -> Self {
        Self {
            config,
            states: IndexMap::new(),
        }
    }

    /// Guard-table entry for a page, if the annotator has touched it.
    pub fn state(&self, key: &PageKey) -> Option<GutterState> {
        self.states.get(key).copied()
    }

    /// Widen one page and number it.
    ///
    /// `lines` drives content-aligned placement; an empty slice selects
    /// grid mode (the scanned-page strategy and the no-lines fallback).
    /// A page already annotated in this run is left untouched and reported
    /// as a [`WarningKind::GutterAlreadyExists`] warning with no new
    /// placements.
    pub fn annotate_page(
        &mut self,
        handle: &mut dyn DocumentHandle,
        page: usize,
        lines: &[TextLine],
        warnings: &mut Vec<Warning>,
    ) -> Result<Vec<LineNumberPlacement>> {
        let key = PageKey::new(handle.id(), page);
        if self.states.get(&key).map(|s| s.created).unwrap_or(false) {
            debug!("page {}: gutter already created, skipping", page);
            warnings.push(Warning::page(
                page,
                WarningKind::GutterAlreadyExists,
                "gutter already created, page left as-is",
            ));
            return Ok(Vec::new());
        }

        self.create_gutter(handle, page, key, warnings)?;

        if lines.is_empty() {
            self.place_grid(handle, page, warnings)
        } else {
            self.place_content_aligned(handle, page, lines, warnings)
        }
    }

    /// Expand the page left by the strip width and fill the strip.
    ///
    /// Composes the upright transform with the shift, so a page that still
    /// carries a declared rotation (orientation fallback) comes out both
    /// upright and widened in one rewrite. The stored width is checked
    /// against the production target first: wider pages are previously
    /// widened artifacts and keep their geometry.
    fn create_gutter(
        &mut self,
        handle: &mut dyn DocumentHandle,
        page: usize,
        key: PageKey,
        warnings: &mut Vec<Warning>,
    ) -> Result<()> {
        let geometry = handle.geometry(page)?;
        let gutter = self.config.width_pt;

        if geometry.width_pt > EXPECTED_PAGE_WIDTH_PT + gutter - 1.0 {
            debug!(
                "page {}: {:.0}pt wide, treating as already widened",
                page, geometry.width_pt
            );
            warnings.push(Warning::page(
                page,
                WarningKind::GutterAlreadyExists,
                format!("page is {:.0}pt wide, not re-widened", geometry.width_pt),
            ));
            self.states.insert(
                key,
                GutterState {
                    created: true,
                    width_pt: gutter,
                    new_page_width_pt: geometry.width_pt,
                },
            );
            return Ok(());
        }

        let (display_width, display_height) = geometry.display_size();
        let transform =
            Transform::upright_from(geometry.rotation, geometry.width_pt, geometry.height_pt)
                .then(Transform::translation(gutter, 0.0));
        let new_width = display_width + gutter;

        handle.replace_page_transformed(page, transform, new_width, display_height)?;
        handle.fill_rect(
            page,
            Rect::new(0.0, 0.0, gutter, display_height),
            Color::gray(self.config.fill_gray),
        )?;

        self.states.insert(
            key,
            GutterState {
                created: true,
                width_pt: gutter,
                new_page_width_pt: new_width,
            },
        );
        debug!(
            "page {}: gutter created, page now {:.0}x{:.0}pt",
            page, new_width, display_height
        );
        Ok(())
    }

    /// Write numbers at extracted baselines, deduplicating near-coincident
    /// ones.
    fn place_content_aligned(
        &self,
        handle: &mut dyn DocumentHandle,
        page: usize,
        lines: &[TextLine],
        warnings: &mut Vec<Warning>,
    ) -> Result<Vec<LineNumberPlacement>> {
        let style = self.config.content_style.clone();
        let dedupe_distance = self.config.dedupe_factor * self.config.nominal_line_height_pt;

        let mut placements = Vec::with_capacity(lines.len());
        let mut last_numbered_y: Option<f32> = None;
        let mut number = 0usize;

        for line in lines {
            if let Some(prev) = last_numbered_y {
                if (line.baseline_y - prev).abs() < dedupe_distance {
                    debug!(
                        "page {}: baseline {:.1} within {:.1}pt of {:.1}, skipping duplicate",
                        page, line.baseline_y, dedupe_distance, prev
                    );
                    warnings.push(Warning::page(
                        page,
                        WarningKind::NumberPlacementFailure,
                        format!(
                            "baseline {:.1} duplicates {:.1}, number skipped",
                            line.baseline_y, prev
                        ),
                    ));
                    continue;
                }
            }

            number += 1;
            let label = number.to_string();
            let x = self.centered_x(label.len(), style.font_size);
            match handle.draw_text(page, &label, x, line.baseline_y, &style) {
                Ok(()) => {
                    placements.push(LineNumberPlacement {
                        line_number: number,
                        x_pt: x,
                        y_pt: line.baseline_y,
                    });
                }
                Err(err) => {
                    warn!("page {}: failed to place number {}: {}", page, number, err);
                    warnings.push(Warning::page(
                        page,
                        WarningKind::NumberPlacementFailure,
                        format!("number {number}: {err}"),
                    ));
                }
            }
            // The baseline consumed its slot even if the ink failed.
            last_numbered_y = Some(line.baseline_y);
        }

        debug!(
            "page {}: {} content-aligned numbers placed",
            page,
            placements.len()
        );
        Ok(placements)
    }

    /// Write a fixed count of evenly spaced numbers, centered vertically.
    fn place_grid(
        &self,
        handle: &mut dyn DocumentHandle,
        page: usize,
        warnings: &mut Vec<Warning>,
    ) -> Result<Vec<LineNumberPlacement>> {
        let geometry = handle.geometry(page)?;
        let (_, display_height) = geometry.display_size();

        let grid = &self.config.grid;
        if grid.rows == 0 {
            return Ok(Vec::new());
        }
        let start_y = ((display_height - grid.span_pt) / 2.0).max(0.0);
        let row_height = grid.span_pt / grid.rows as f32;
        // Symmetric margins: rows falling through the bottom one are cut
        // off instead of drawn past the page edge.
        let bottom_limit = display_height - start_y;

        let mut placements = Vec::with_capacity(grid.rows);
        for number in 1..=grid.rows {
            let y = start_y + (number as f32 - 0.5) * row_height;
            if y > bottom_limit {
                debug!(
                    "page {}: grid truncated at row {} ({:.1}pt past the bottom margin)",
                    page, number, y - bottom_limit
                );
                break;
            }
            let label = number.to_string();
            let x = self.centered_x(label.len(), grid.style.font_size);
            match handle.draw_text(page, &label, x, y, &grid.style) {
                Ok(()) => {
                    placements.push(LineNumberPlacement {
                        line_number: number,
                        x_pt: x,
                        y_pt: y,
                    });
                }
                Err(err) => {
                    warn!("page {}: failed to place number {}: {}", page, number, err);
                    warnings.push(Warning::page(
                        page,
                        WarningKind::NumberPlacementFailure,
                        format!("number {number}: {err}"),
                    ));
                }
            }
        }

        debug!("page {}: {} grid numbers placed", page, placements.len());
        Ok(placements)
    }

    /// Horizontal origin that centers `digits` digits in the strip.
    ///
    /// Clamped to keep the configured minimum margin on both edges; when
    /// the label is too wide for both, the left margin wins.
    fn centered_x(&self, digits: usize, font_size: f32) -> f32 {
        let text_width = digits as f32 * font_size * self.config.char_width_factor;
        let centered = (self.config.width_pt - text_width) / 2.0;
        let right_limit = self.config.width_pt - self.config.min_margin_pt - text_width;
        centered.min(right_limit).max(self.config.min_margin_pt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Rotation;
    use crate::handle::{DocumentHandle, MemoryDocument, MemoryPage};
    use crate::layout::baseline_of;

    fn annotator() -> GutterAnnotator {
        GutterAnnotator::new(GutterConfig::default())
    }

    fn line_at(baseline_y: f32) -> TextLine {
        let bbox = Rect::new(72.0, baseline_y - 10.2, 200.0, 12.0);
        TextLine {
            text: "deposition text".to_string(),
            baseline_y: baseline_of(&bbox),
            bbox,
            font_size: 11.0,
        }
    }

    #[test]
    fn test_gutter_widens_page_and_shifts_content() {
        let mut doc = MemoryDocument::single(
            MemoryPage::letter().with_span(
                "body",
                Rect::new(72.0, 100.0, 200.0, 12.0),
                11.0,
            ),
        );
        let mut warnings = Vec::new();

        let placements = annotator()
            .annotate_page(&mut doc, 0, &[line_at(110.0)], &mut warnings)
            .unwrap();

        let page = doc.page(0);
        assert_eq!((page.width_pt, page.height_pt), (630.0, 792.0));
        assert_eq!(page.rewrites, 1);
        assert!((page.spans[0].bbox.x - 90.0).abs() < 1e-4);

        // Strip fill covers exactly the new left band.
        assert_eq!(page.fills.len(), 1);
        let (strip, color) = &page.fills[0];
        assert_eq!(*strip, Rect::new(0.0, 0.0, 18.0, 792.0));
        assert_eq!(*color, Color::gray(0.95));

        // One red 7pt number, centered for a single digit.
        assert_eq!(placements.len(), 1);
        assert_eq!(placements[0].line_number, 1);
        assert!((placements[0].x_pt - 6.9).abs() < 1e-4);
        assert_eq!(page.texts[0].text, "1");
        assert_eq!(page.texts[0].style.font_size, 7.0);
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_second_invocation_is_a_noop() {
        let mut doc = MemoryDocument::single(MemoryPage::letter());
        let mut annotator = annotator();
        let lines = [line_at(110.0), line_at(130.0)];
        let mut warnings = Vec::new();

        let first = annotator
            .annotate_page(&mut doc, 0, &lines, &mut warnings)
            .unwrap();
        let second = annotator
            .annotate_page(&mut doc, 0, &lines, &mut warnings)
            .unwrap();

        assert_eq!(first.len(), 2);
        assert!(second.is_empty());
        let page = doc.page(0);
        assert_eq!(page.rewrites, 1);
        assert_eq!(page.fills.len(), 1);
        assert_eq!(page.texts.len(), 2);
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].kind, WarningKind::GutterAlreadyExists);
    }

    #[test]
    fn test_wide_page_is_not_rewidened() {
        // 700pt stored width: a previously widened artifact.
        let mut doc = MemoryDocument::single(MemoryPage::new(700.0, 792.0));
        let mut warnings = Vec::new();

        let placements = annotator()
            .annotate_page(&mut doc, 0, &[line_at(110.0)], &mut warnings)
            .unwrap();

        let page = doc.page(0);
        assert_eq!(page.rewrites, 0);
        assert!(page.fills.is_empty());
        assert_eq!(page.width_pt, 700.0);
        // Numbering still runs over the existing strip.
        assert_eq!(placements.len(), 1);
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].kind, WarningKind::GutterAlreadyExists);
    }

    #[test]
    fn test_rotated_page_is_uprighted_while_widening() {
        let mut doc =
            MemoryDocument::single(MemoryPage::letter().with_rotation(Rotation::R90));
        let mut warnings = Vec::new();

        annotator()
            .annotate_page(&mut doc, 0, &[], &mut warnings)
            .unwrap();

        let page = doc.page(0);
        assert_eq!(page.rotation, Rotation::R0);
        // Display size 792x612, plus the 18pt strip.
        assert_eq!((page.width_pt, page.height_pt), (810.0, 612.0));
    }

    #[test]
    fn test_grid_mode_places_fixed_rows() {
        let mut doc = MemoryDocument::single(MemoryPage::letter());
        let mut warnings = Vec::new();

        let placements = annotator()
            .annotate_page(&mut doc, 0, &[], &mut warnings)
            .unwrap();

        assert_eq!(placements.len(), 28);
        assert_eq!(placements[0].line_number, 1);
        assert_eq!(placements[27].line_number, 28);

        // 720pt span centered on a 792pt page: rows start at 36pt.
        let row_height = 720.0 / 28.0;
        assert!((placements[0].y_pt - (36.0 + 0.5 * row_height)).abs() < 1e-3);
        assert!((placements[27].y_pt - (36.0 + 27.5 * row_height)).abs() < 1e-3);

        // Grid numbers use the gray 8pt style.
        let page = doc.page(0);
        assert_eq!(page.texts[0].style.font_size, 8.0);
        assert_eq!(page.texts[0].style.color, Color::gray(0.5));

        // Two-digit labels sit nearer the left edge than one-digit ones.
        assert!(page.texts[9].x < page.texts[0].x);
        assert!(page.texts[9].x >= 2.0);
    }

    #[test]
    fn test_grid_rows_truncate_on_short_pages() {
        // A square page is shorter than the 720pt grid span; rows that
        // would land past the bottom are dropped, not drawn off-page.
        let mut doc = MemoryDocument::single(MemoryPage::new(612.0, 612.0));
        let mut warnings = Vec::new();

        let placements = annotator()
            .annotate_page(&mut doc, 0, &[], &mut warnings)
            .unwrap();

        assert_eq!(placements.len(), 24);
        assert!(placements.iter().all(|p| p.y_pt <= 612.0));
    }

    #[test]
    fn test_duplicate_baselines_are_numbered_once() {
        let mut doc = MemoryDocument::single(MemoryPage::letter());
        let mut warnings = Vec::new();

        // 104.0 is within 6pt of 100.0; 120.0 is clear.
        let lines = [line_at(100.0), line_at(104.0), line_at(120.0)];
        let placements = annotator()
            .annotate_page(&mut doc, 0, &lines, &mut warnings)
            .unwrap();

        assert_eq!(placements.len(), 2);
        assert_eq!(placements[0].line_number, 1);
        assert!((placements[0].y_pt - 100.0).abs() < 1e-4);
        assert_eq!(placements[1].line_number, 2);
        assert!((placements[1].y_pt - 120.0).abs() < 1e-4);

        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].kind, WarningKind::NumberPlacementFailure);
    }

    #[test]
    fn test_failed_insert_skips_one_number() {
        // Document-wide draw call 1 is the second number.
        let mut doc = MemoryDocument::single(MemoryPage::letter()).fail_draw_call(1);
        let mut warnings = Vec::new();

        let lines = [line_at(100.0), line_at(120.0), line_at(140.0)];
        let placements = annotator()
            .annotate_page(&mut doc, 0, &lines, &mut warnings)
            .unwrap();

        // Number 2 is lost, numbers 1 and 3 land.
        let numbers: Vec<usize> = placements.iter().map(|p| p.line_number).collect();
        assert_eq!(numbers, vec![1, 3]);
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].kind, WarningKind::NumberPlacementFailure);

        let texts: Vec<&str> = doc.page(0).texts.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["1", "3"]);
    }

    #[test]
    fn test_numbers_restart_on_every_page() {
        let mut doc = MemoryDocument::new(vec![MemoryPage::letter(), MemoryPage::letter()]);
        let mut annotator = annotator();
        let mut warnings = Vec::new();

        let first = annotator
            .annotate_page(
                &mut doc,
                0,
                &[line_at(100.0), line_at(120.0), line_at(140.0)],
                &mut warnings,
            )
            .unwrap();
        let second = annotator
            .annotate_page(&mut doc, 1, &[line_at(100.0), line_at(120.0)], &mut warnings)
            .unwrap();

        assert_eq!(first.last().unwrap().line_number, 3);
        assert_eq!(second[0].line_number, 1);
        assert_eq!(second.last().unwrap().line_number, 2);
    }

    #[test]
    fn test_state_table_records_widening() {
        let mut doc = MemoryDocument::single(MemoryPage::letter());
        let mut annotator = annotator();
        let mut warnings = Vec::new();
        let key = PageKey::new(doc.id(), 0);

        assert!(annotator.state(&key).is_none());
        annotator
            .annotate_page(&mut doc, 0, &[], &mut warnings)
            .unwrap();

        let state = annotator.state(&key).unwrap();
        assert!(state.created);
        assert_eq!(state.width_pt, 18.0);
        assert_eq!(state.new_page_width_pt, 630.0);
    }
}
