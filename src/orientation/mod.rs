//! Orientation detection and correction.
//!
//! Every page leaves this module either physically upright (content
//! re-rendered, rotation flag cleared) or deliberately untouched with an
//! [`WarningKind::OrientationUncertain`] warning on record. The decision
//! cascade, strongest signal first:
//!
//! 1. plausible extracted text: span-direction statistics confirm or
//!    override the declared rotation
//! 2. declared rotation metadata, baked in as-is
//! 3. OCR confidence vote across the four quarter turns
//! 4. no signal: leave the page alone
//!
//! The correction policy prefers upright aggressively. A genuinely
//! sideways exhibit with readable horizontal labels can be mis-corrected;
//! that trade is accepted because inverted or sideways prose is far more
//! common in scanned productions than intentional rotation.

use log::{debug, warn};

use crate::error::{Result, Warning, WarningKind};
use crate::geometry::{Rotation, Transform};
use crate::handle::{DocumentHandle, PageGeometry};
use crate::layout::TextSpan;
use crate::ocr::{rotation_scores, OcrEngine};
use crate::pipeline::config::OrientationConfig;

/// Votes below this at every quarter turn mean OCR saw nothing usable.
const NEAR_ZERO_SCORE: f32 = 0.05;

/// How a page's upright rotation was decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrientationMethod {
    /// Declared rotation metadata was trusted and baked in
    Metadata,
    /// Span-direction statistics overrode or confirmed the metadata
    TextHeuristic,
    /// OCR confidence vote across the four quarter turns
    OcrVote,
    /// No usable signal; the page was left unchanged
    Fallback,
}

/// Per-page normalization outcome.
///
/// By the time a decision is returned the page has already been corrected;
/// the record is historical. `chosen_rotation` is the turn the content was
/// judged to carry before correction, so `R0` means the page was already
/// upright (or had a wrong rotation flag cleared).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrientationDecision {
    /// Page the decision applies to
    pub page_index: usize,
    /// Rotation the content carried before correction
    pub chosen_rotation: Rotation,
    /// Signal that produced the decision
    pub method: OrientationMethod,
    /// Strength of that signal, 0.0 to 1.0
    pub confidence: f32,
}

/// Fraction of spans that are wider than tall.
///
/// Horizontal prose dominates upright pages; a portrait page where almost
/// every span is taller than wide is carrying sideways text.
pub fn horizontal_ratio(spans: &[TextSpan]) -> f32 {
    if spans.is_empty() {
        return 0.0;
    }
    let horizontal = spans
        .iter()
        .filter(|span| span.bbox.width > span.bbox.height)
        .count();
    horizontal as f32 / spans.len() as f32
}

/// Plausibility score for extracted page text, 0.0 to 1.0.
///
/// Sums four capped signals: length (`len/1000`, max 0.3), word count
/// (`words/200`, max 0.3), the share of alphanumeric-or-whitespace
/// characters (`× 0.2`), and line structure (`lines/50`, max 0.2, only
/// when line breaks exist). Garbage from a sideways or damaged extraction
/// scores low on all four.
pub fn text_confidence(text: &str) -> f32 {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return 0.0;
    }

    let mut confidence = (trimmed.chars().count() as f32 / 1000.0).min(0.3);
    confidence += (text.split_whitespace().count() as f32 / 200.0).min(0.3);

    let total = text.chars().count() as f32;
    let clean = text
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .count() as f32;
    confidence += clean / total * 0.2;

    let line_breaks = text.matches('\n').count();
    if line_breaks > 0 {
        confidence += ((line_breaks + 1) as f32 / 50.0).min(0.2);
    }

    confidence.min(1.0)
}

/// Decides and applies the upright rotation for each page.
///
/// The normalizer holds no per-document state; one instance serves a whole
/// batch. The OCR engine is optional, and without one scanned pages fall
/// back to declared metadata or to no correction at all.
pub struct OrientationNormalizer<'a> {
    config: OrientationConfig,
    ocr: Option<&'a dyn OcrEngine>,
}

impl<'a> OrientationNormalizer<'a> {
    /// Create a normalizer with the given thresholds and optional engine.
    pub fn new(config: OrientationConfig, ocr: Option<&'a dyn OcrEngine>) -> Self {
        Self { config, ocr }
    }

    /// Normalize one page to upright and report how.
    ///
    /// Extraction failures degrade to the OCR path rather than erroring;
    /// only geometry reads and the rewrite itself can fail the call.
    pub fn normalize_page(
        &self,
        handle: &mut dyn DocumentHandle,
        page: usize,
        warnings: &mut Vec<Warning>,
    ) -> Result<OrientationDecision> {
        let geometry = handle.geometry(page)?;

        let text = handle.plain_text(page).unwrap_or_default();
        let spans = handle.text_spans(page).unwrap_or_default();

        if text_confidence(&text) >= self.config.ocr_gate_confidence && !spans.is_empty() {
            self.decide_from_text(handle, page, &geometry, &spans)
        } else {
            self.decide_from_ocr(handle, page, &geometry, warnings)
        }
    }

    /// Text is plausible: let span direction confirm or veto the metadata.
    fn decide_from_text(
        &self,
        handle: &mut dyn DocumentHandle,
        page: usize,
        geometry: &PageGeometry,
        spans: &[TextSpan],
    ) -> Result<OrientationDecision> {
        let ratio = horizontal_ratio(spans);
        let declared = geometry.rotation;

        match declared {
            Rotation::R0 => {
                let portrait = geometry.height_pt > geometry.width_pt;
                if portrait && ratio < self.config.portrait_suggest_ratio {
                    debug!(
                        "page {}: portrait with {:.0}% horizontal spans, turning 90°",
                        page,
                        ratio * 100.0
                    );
                    self.bake(handle, page, geometry, Rotation::R90)?;
                    return Ok(OrientationDecision {
                        page_index: page,
                        chosen_rotation: Rotation::R90,
                        method: OrientationMethod::TextHeuristic,
                        confidence: self.config.portrait_suggest_ratio - ratio,
                    });
                }
                Ok(OrientationDecision {
                    page_index: page,
                    chosen_rotation: Rotation::R0,
                    method: OrientationMethod::Metadata,
                    confidence: 1.0,
                })
            }
            Rotation::R90 | Rotation::R270 => {
                if ratio > self.config.sideways_reset_ratio {
                    // The flag says sideways but the stored text already
                    // reads horizontally; the flag is wrong, not the page.
                    debug!(
                        "page {}: declared {}° but {:.0}% horizontal spans, clearing flag",
                        page,
                        declared.degrees(),
                        ratio * 100.0
                    );
                    handle.set_rotation(page, Rotation::R0)?;
                    return Ok(OrientationDecision {
                        page_index: page,
                        chosen_rotation: Rotation::R0,
                        method: OrientationMethod::TextHeuristic,
                        confidence: ratio - self.config.sideways_reset_ratio,
                    });
                }
                self.bake(handle, page, geometry, declared)?;
                Ok(OrientationDecision {
                    page_index: page,
                    chosen_rotation: declared,
                    method: OrientationMethod::Metadata,
                    confidence: 1.0,
                })
            }
            Rotation::R180 => {
                // A lower bar than 90/270: upside-down prose is rarely real.
                if ratio > self.config.inverted_reset_ratio {
                    debug!(
                        "page {}: declared 180° but {:.0}% horizontal spans, clearing flag",
                        page,
                        ratio * 100.0
                    );
                    handle.set_rotation(page, Rotation::R0)?;
                    return Ok(OrientationDecision {
                        page_index: page,
                        chosen_rotation: Rotation::R0,
                        method: OrientationMethod::TextHeuristic,
                        confidence: ratio - self.config.inverted_reset_ratio,
                    });
                }
                self.bake(handle, page, geometry, Rotation::R180)?;
                Ok(OrientationDecision {
                    page_index: page,
                    chosen_rotation: Rotation::R180,
                    method: OrientationMethod::Metadata,
                    confidence: 1.0,
                })
            }
        }
    }

    /// No plausible text: render and let the OCR engine vote.
    fn decide_from_ocr(
        &self,
        handle: &mut dyn DocumentHandle,
        page: usize,
        geometry: &PageGeometry,
        warnings: &mut Vec<Warning>,
    ) -> Result<OrientationDecision> {
        let declared = geometry.rotation;

        let Some(ocr) = self.ocr else {
            return self.metadata_or_fallback(
                handle,
                page,
                geometry,
                warnings,
                "no usable text and no OCR engine",
            );
        };

        let raster = match handle.render(page, self.config.ocr_render_scale) {
            Ok(raster) => raster,
            Err(err) => {
                warn!("page {}: render for orientation vote failed: {}", page, err);
                return self.metadata_or_fallback(
                    handle,
                    page,
                    geometry,
                    warnings,
                    &format!("render failed: {err}"),
                );
            }
        };

        let scores = rotation_scores(ocr, &raster);
        debug!("page {}: orientation vote scores {:?}", page, scores);

        if scores.iter().all(|score| *score < NEAR_ZERO_SCORE) {
            warnings.push(Warning::page(
                page,
                WarningKind::OrientationUncertain,
                "ocr recognized nothing at any rotation",
            ));
            return Ok(OrientationDecision {
                page_index: page,
                chosen_rotation: declared,
                method: OrientationMethod::Fallback,
                confidence: 0.0,
            });
        }

        let mut best = Rotation::R0;
        let mut best_score = f32::MIN;
        for (rotation, score) in Rotation::ALL.iter().zip(scores.iter()) {
            if *score > best_score {
                best = *rotation;
                best_score = *score;
            }
        }
        let current_score = scores[0];

        if !best.is_upright()
            && best_score > self.config.ocr_adopt_score
            && best_score > self.config.ocr_adopt_margin * current_score
        {
            // The vote is on top of the displayed page, so the content
            // carries the declared turn plus the voted one.
            let chosen = declared.compose(best);
            debug!(
                "page {}: ocr vote adopts {}° (score {:.2} vs current {:.2})",
                page,
                best.degrees(),
                best_score,
                current_score
            );
            self.bake(handle, page, geometry, chosen)?;
            return Ok(OrientationDecision {
                page_index: page,
                chosen_rotation: chosen,
                method: OrientationMethod::OcrVote,
                confidence: best_score.min(1.0),
            });
        }

        // The vote confirms the display orientation; make it physical.
        self.bake(handle, page, geometry, declared)?;
        Ok(OrientationDecision {
            page_index: page,
            chosen_rotation: declared,
            method: OrientationMethod::OcrVote,
            confidence: current_score.min(1.0),
        })
    }

    /// OCR unavailable: bake declared metadata, or give up with a warning.
    fn metadata_or_fallback(
        &self,
        handle: &mut dyn DocumentHandle,
        page: usize,
        geometry: &PageGeometry,
        warnings: &mut Vec<Warning>,
        detail: &str,
    ) -> Result<OrientationDecision> {
        let declared = geometry.rotation;
        if !declared.is_upright() {
            self.bake(handle, page, geometry, declared)?;
            return Ok(OrientationDecision {
                page_index: page,
                chosen_rotation: declared,
                method: OrientationMethod::Metadata,
                confidence: 1.0,
            });
        }
        warnings.push(Warning::page(
            page,
            WarningKind::OrientationUncertain,
            detail,
        ));
        Ok(OrientationDecision {
            page_index: page,
            chosen_rotation: Rotation::R0,
            method: OrientationMethod::Fallback,
            confidence: 0.0,
        })
    }

    /// Re-render the page upright from `rotation`. Upright input is a no-op.
    fn bake(
        &self,
        handle: &mut dyn DocumentHandle,
        page: usize,
        geometry: &PageGeometry,
        rotation: Rotation,
    ) -> Result<()> {
        if rotation.is_upright() {
            return Ok(());
        }
        let transform = Transform::upright_from(rotation, geometry.width_pt, geometry.height_pt);
        let (width, height) = if rotation.swaps_axes() {
            (geometry.height_pt, geometry.width_pt)
        } else {
            (geometry.width_pt, geometry.height_pt)
        };
        handle.replace_page_transformed(page, transform, width, height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Rect;
    use crate::handle::{MemoryDocument, MemoryPage};
    use crate::ocr::ScriptedOcr;

    const SENTENCE: &str = "the quick brown fox jumps over the lazy dog";

    /// Letter page with `count` horizontal prose spans, enough text to
    /// pass the plausibility gate.
    fn prose_page(count: usize) -> MemoryPage {
        let mut page = MemoryPage::letter();
        for i in 0..count {
            page = page.with_span(
                SENTENCE,
                Rect::new(72.0, 100.0 + i as f32 * 20.0, 300.0, 12.0),
                11.0,
            );
        }
        page
    }

    /// Letter page with `count` vertical (taller than wide) spans.
    fn sideways_page(count: usize) -> MemoryPage {
        let mut page = MemoryPage::letter();
        for i in 0..count {
            page = page.with_span(
                SENTENCE,
                Rect::new(100.0 + i as f32 * 30.0, 100.0, 12.0, 300.0),
                11.0,
            );
        }
        page
    }

    fn normalizer<'a>(ocr: Option<&'a dyn OcrEngine>) -> OrientationNormalizer<'a> {
        OrientationNormalizer::new(OrientationConfig::default(), ocr)
    }

    #[test]
    fn test_upright_prose_is_untouched() {
        let mut doc = MemoryDocument::single(prose_page(6));
        let mut warnings = Vec::new();

        let decision = normalizer(None)
            .normalize_page(&mut doc, 0, &mut warnings)
            .unwrap();

        assert_eq!(decision.chosen_rotation, Rotation::R0);
        assert_eq!(decision.method, OrientationMethod::Metadata);
        assert_eq!(doc.page(0).rewrites, 0);
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_portrait_page_with_vertical_text_turns_90() {
        let mut doc = MemoryDocument::single(sideways_page(6));
        let mut warnings = Vec::new();

        let decision = normalizer(None)
            .normalize_page(&mut doc, 0, &mut warnings)
            .unwrap();

        assert_eq!(decision.chosen_rotation, Rotation::R90);
        assert_eq!(decision.method, OrientationMethod::TextHeuristic);
        let page = doc.page(0);
        assert_eq!(page.rewrites, 1);
        assert_eq!((page.width_pt, page.height_pt), (792.0, 612.0));
        assert_eq!(page.rotation, Rotation::R0);
    }

    #[test]
    fn test_declared_90_with_vertical_text_is_baked() {
        // Vertical stored spans are exactly what a correct 90° flag makes
        // upright, so the metadata is trusted and made physical.
        let mut doc = MemoryDocument::single(sideways_page(6).with_rotation(Rotation::R90));
        let mut warnings = Vec::new();

        let decision = normalizer(None)
            .normalize_page(&mut doc, 0, &mut warnings)
            .unwrap();

        assert_eq!(decision.chosen_rotation, Rotation::R90);
        assert_eq!(decision.method, OrientationMethod::Metadata);
        assert_eq!(decision.confidence, 1.0);
        let page = doc.page(0);
        assert_eq!(page.rewrites, 1);
        assert_eq!((page.width_pt, page.height_pt), (792.0, 612.0));
        assert_eq!(page.rotation, Rotation::R0);
    }

    #[test]
    fn test_declared_90_with_horizontal_text_clears_flag() {
        let mut doc = MemoryDocument::single(prose_page(6).with_rotation(Rotation::R90));
        let mut warnings = Vec::new();

        let decision = normalizer(None)
            .normalize_page(&mut doc, 0, &mut warnings)
            .unwrap();

        assert_eq!(decision.chosen_rotation, Rotation::R0);
        assert_eq!(decision.method, OrientationMethod::TextHeuristic);
        let page = doc.page(0);
        assert_eq!(page.rewrites, 0);
        assert_eq!(page.rotation, Rotation::R0);
        assert_eq!((page.width_pt, page.height_pt), (612.0, 792.0));
    }

    #[test]
    fn test_declared_180_with_horizontal_text_clears_flag() {
        let mut doc = MemoryDocument::single(prose_page(6).with_rotation(Rotation::R180));
        let mut warnings = Vec::new();

        let decision = normalizer(None)
            .normalize_page(&mut doc, 0, &mut warnings)
            .unwrap();

        assert_eq!(decision.chosen_rotation, Rotation::R0);
        assert_eq!(decision.method, OrientationMethod::TextHeuristic);
        assert_eq!(doc.page(0).rewrites, 0);
    }

    #[test]
    fn test_scan_confirms_declared_rotation_by_ocr() {
        // No text at all; the vote likes the page as displayed, so the
        // declared 90° is baked rather than second-guessed.
        let ocr = ScriptedOcr::new()
            .then_uniform(30, 0.8)
            .then_words(vec![])
            .then_words(vec![])
            .then_words(vec![]);
        let mut doc = MemoryDocument::single(
            MemoryPage::letter()
                .with_rotation(Rotation::R90)
                .with_images(1),
        );
        let mut warnings = Vec::new();

        let decision = normalizer(Some(&ocr))
            .normalize_page(&mut doc, 0, &mut warnings)
            .unwrap();

        assert_eq!(decision.method, OrientationMethod::OcrVote);
        assert_eq!(decision.chosen_rotation, Rotation::R90);
        let page = doc.page(0);
        assert_eq!(page.rewrites, 1);
        assert_eq!((page.width_pt, page.height_pt), (792.0, 612.0));
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_scan_adopts_winning_ocr_rotation() {
        // Nothing reads at 0°, everything reads at 90°.
        let ocr = ScriptedOcr::new()
            .then_words(vec![])
            .then_uniform(40, 0.9)
            .then_words(vec![])
            .then_words(vec![]);
        let mut doc = MemoryDocument::single(MemoryPage::letter().with_images(1));
        let mut warnings = Vec::new();

        let decision = normalizer(Some(&ocr))
            .normalize_page(&mut doc, 0, &mut warnings)
            .unwrap();

        assert_eq!(decision.method, OrientationMethod::OcrVote);
        assert_eq!(decision.chosen_rotation, Rotation::R90);
        let page = doc.page(0);
        assert_eq!(page.rewrites, 1);
        assert_eq!((page.width_pt, page.height_pt), (792.0, 612.0));
    }

    #[test]
    fn test_ocr_margin_blocks_marginal_flips() {
        // 90° reads a little better than 0°, but not 1.5× better.
        let ocr = ScriptedOcr::new()
            .then_uniform(10, 0.6)
            .then_uniform(10, 0.8)
            .then_words(vec![])
            .then_words(vec![]);
        let mut doc = MemoryDocument::single(MemoryPage::letter().with_images(1));
        let mut warnings = Vec::new();

        let decision = normalizer(Some(&ocr))
            .normalize_page(&mut doc, 0, &mut warnings)
            .unwrap();

        assert_eq!(decision.chosen_rotation, Rotation::R0);
        assert_eq!(doc.page(0).rewrites, 0);
    }

    #[test]
    fn test_near_zero_scores_leave_page_alone() {
        let ocr = ScriptedOcr::new();
        let mut doc = MemoryDocument::single(
            MemoryPage::letter()
                .with_rotation(Rotation::R90)
                .with_images(1),
        );
        let mut warnings = Vec::new();

        let decision = normalizer(Some(&ocr))
            .normalize_page(&mut doc, 0, &mut warnings)
            .unwrap();

        assert_eq!(decision.method, OrientationMethod::Fallback);
        assert_eq!(decision.confidence, 0.0);
        assert_eq!(doc.page(0).rotation, Rotation::R90);
        assert_eq!(doc.page(0).rewrites, 0);
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].kind, WarningKind::OrientationUncertain);
    }

    #[test]
    fn test_no_ocr_trusts_metadata() {
        let mut doc = MemoryDocument::single(
            MemoryPage::letter()
                .with_rotation(Rotation::R180)
                .with_images(1),
        );
        let mut warnings = Vec::new();

        let decision = normalizer(None)
            .normalize_page(&mut doc, 0, &mut warnings)
            .unwrap();

        assert_eq!(decision.method, OrientationMethod::Metadata);
        assert_eq!(decision.chosen_rotation, Rotation::R180);
        let page = doc.page(0);
        assert_eq!(page.rewrites, 1);
        assert_eq!((page.width_pt, page.height_pt), (612.0, 792.0));
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_no_ocr_no_signal_warns_and_leaves_upright() {
        let mut doc = MemoryDocument::single(MemoryPage::letter().with_images(1));
        let mut warnings = Vec::new();

        let decision = normalizer(None)
            .normalize_page(&mut doc, 0, &mut warnings)
            .unwrap();

        assert_eq!(decision.method, OrientationMethod::Fallback);
        assert_eq!(doc.page(0).rewrites, 0);
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].kind, WarningKind::OrientationUncertain);
    }

    #[test]
    fn test_horizontal_ratio_counts_wide_spans() {
        assert_eq!(horizontal_ratio(&[]), 0.0);

        let spans = vec![
            TextSpan::new("wide", Rect::new(0.0, 0.0, 100.0, 10.0), 10.0),
            TextSpan::new("wide", Rect::new(0.0, 20.0, 100.0, 10.0), 10.0),
            TextSpan::new("tall", Rect::new(0.0, 40.0, 10.0, 100.0), 10.0),
            TextSpan::new("tall", Rect::new(20.0, 40.0, 10.0, 100.0), 10.0),
        ];
        assert!((horizontal_ratio(&spans) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_text_confidence_scores() {
        assert_eq!(text_confidence(""), 0.0);
        assert_eq!(text_confidence("   \n  "), 0.0);

        // Short fragments stay under the OCR gate.
        assert!(text_confidence("hi") < 0.3);

        // A page of structured prose scores high.
        let prose = vec![SENTENCE; 12].join("\n");
        assert!(text_confidence(&prose) > 0.8);
    }
}
