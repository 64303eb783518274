//! Document classification.
//!
//! Aggregates sampled [`PageFacts`] into a [`DocumentVerdict`] that selects
//! the numbering strategy. Policy is an explicit ordered rule list: each
//! rule is a named function from sample statistics to an optional verdict,
//! evaluated in sequence, first hit wins. Thresholds live in one place and
//! every rule is testable on its own.
//!
//! A verdict is derived from at most five sampled pages, never from a
//! single page unless the document has one. Majority-landscape documents
//! never reach the rules; they are diverted before classification because
//! the fixed portrait gutter cannot serve wide exhibits.

use log::debug;

use crate::error::{Error, Result};
use crate::probe::PageFacts;

/// Fraction of sampled landscape pages above which a document is diverted.
pub const LANDSCAPE_GATE: f32 = 0.75;

/// Fraction of substantial-text pages above which a document is native.
pub const TEXT_MAJORITY: f32 = 0.5;

/// Fraction of scanned-look pages above which a document is a scan.
pub const SCANNED_MAJORITY: f32 = 0.7;

/// The numbering strategy a document resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentCategory {
    /// Born from upstream conversion; exact line geometry arrives in a
    /// sidecar linemap
    TextFlow,
    /// Native PDF with extractable text; numbers align to text baselines
    NativeLayout,
    /// Scanned or image-based; numbers fall on a fixed grid
    ScanImage,
}

impl DocumentCategory {
    /// Label used in output filenames.
    pub fn label(&self) -> &'static str {
        match self {
            DocumentCategory::TextFlow => "Text",
            DocumentCategory::NativeLayout => "NativePDF",
            DocumentCategory::ScanImage => "ScanImage",
        }
    }
}

/// The classification outcome for one document.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentVerdict {
    /// Resolved category
    pub category: DocumentCategory,
    /// Fraction of sampled pages consistent with the winning rule
    pub confidence: f32,
    /// Human-readable rule name plus counts
    pub rationale: String,
}

impl DocumentVerdict {
    /// Promote a native verdict to [`DocumentCategory::TextFlow`].
    ///
    /// Called when a linemap sidecar exists next to the source, which
    /// marks the PDF as the product of upstream conversion. Other
    /// categories are left alone.
    pub fn promote_to_text_flow(mut self) -> Self {
        if self.category == DocumentCategory::NativeLayout {
            self.category = DocumentCategory::TextFlow;
            self.rationale.push_str(", linemap sidecar present");
        }
        self
    }
}

/// Aggregate counts over the sampled pages.
#[derive(Debug, Default)]
struct SampleStats {
    total: usize,
    /// Pages with substantial text
    text_pages: usize,
    /// Pages with at least one image
    image_pages: usize,
    /// Pages with form-field widgets
    form_pages: usize,
    /// Pages that look scanned
    scanned_pages: usize,
    /// Pages displaying wider than tall
    landscape_pages: usize,
    /// Pages with a nonzero declared rotation
    rotated_pages: Vec<usize>,
}

impl SampleStats {
    fn gather(sample: &[PageFacts]) -> Self {
        let mut stats = SampleStats {
            total: sample.len(),
            ..SampleStats::default()
        };
        for facts in sample {
            if facts.has_substantial_text() {
                stats.text_pages += 1;
            }
            if facts.image_count > 0 {
                stats.image_pages += 1;
            }
            if facts.has_form_fields() {
                stats.form_pages += 1;
            }
            if facts.looks_scanned() {
                stats.scanned_pages += 1;
            }
            if facts.is_landscape() {
                stats.landscape_pages += 1;
            }
            if !facts.declared_rotation.is_upright() {
                stats.rotated_pages.push(facts.page_index);
            }
        }
        stats
    }

    fn fraction(&self, count: usize) -> f32 {
        if self.total == 0 {
            0.0
        } else {
            count as f32 / self.total as f32
        }
    }
}

/// One rule's verdict: category, consistent-page fraction, detail text.
type RuleHit = (DocumentCategory, f32, String);

type RuleFn = fn(&SampleStats) -> Option<RuleHit>;

/// The classification policy, evaluated in order. First hit wins.
const RULES: [(&str, RuleFn); 5] = [
    ("form-fields", rule_form_fields),
    ("text-majority", rule_text_majority),
    ("scanned-majority", rule_scanned_majority),
    ("any-substantial-text", rule_any_substantial_text),
    ("default-scan", rule_default),
];

/// Form fields force an early decision: a text-heavy form document is
/// numbered natively, an image-heavy one as a scan.
fn rule_form_fields(s: &SampleStats) -> Option<RuleHit> {
    if s.form_pages == 0 {
        return None;
    }
    if s.text_pages > s.image_pages {
        Some((
            DocumentCategory::NativeLayout,
            s.fraction(s.text_pages),
            format!(
                "forms with text majority ({} form pages, {} text pages)",
                s.form_pages, s.text_pages
            ),
        ))
    } else {
        Some((
            DocumentCategory::ScanImage,
            s.fraction(s.total - s.text_pages),
            format!(
                "forms with image majority ({} form pages, {} image pages)",
                s.form_pages, s.image_pages
            ),
        ))
    }
}

fn rule_text_majority(s: &SampleStats) -> Option<RuleHit> {
    if s.fraction(s.text_pages) > TEXT_MAJORITY {
        Some((
            DocumentCategory::NativeLayout,
            s.fraction(s.text_pages),
            format!(
                "text-based document ({}/{} pages with substantial text)",
                s.text_pages, s.total
            ),
        ))
    } else {
        None
    }
}

fn rule_scanned_majority(s: &SampleStats) -> Option<RuleHit> {
    if s.fraction(s.scanned_pages) > SCANNED_MAJORITY {
        Some((
            DocumentCategory::ScanImage,
            s.fraction(s.scanned_pages),
            format!(
                "scanned document ({}/{} scanned-look pages)",
                s.scanned_pages, s.total
            ),
        ))
    } else {
        None
    }
}

/// Any substantial text at all biases toward preserving it, even without
/// a majority.
fn rule_any_substantial_text(s: &SampleStats) -> Option<RuleHit> {
    if s.text_pages > 0 {
        Some((
            DocumentCategory::NativeLayout,
            s.fraction(s.text_pages),
            format!(
                "substantial text on {} of {} sampled pages",
                s.text_pages, s.total
            ),
        ))
    } else {
        None
    }
}

fn rule_default(s: &SampleStats) -> Option<RuleHit> {
    Some((
        DocumentCategory::ScanImage,
        s.fraction(s.total - s.text_pages),
        format!(
            "no extractable text ({} image pages, {} scanned-look pages)",
            s.image_pages, s.scanned_pages
        ),
    ))
}

fn winning_rule(stats: &SampleStats) -> (&'static str, RuleHit) {
    RULES
        .iter()
        .find_map(|(name, rule)| rule(stats).map(|hit| (*name, hit)))
        .unwrap_or_else(|| {
            (
                "default-scan",
                (
                    DocumentCategory::ScanImage,
                    0.0,
                    "no rule matched".to_string(),
                ),
            )
        })
}

/// Classify a document from its sampled page facts.
///
/// Returns [`Error::UnsupportedLayout`] when more than
/// [`LANDSCAPE_GATE`] of the sampled pages display landscape; the caller
/// routes such documents to the failure sink instead of numbering them.
///
/// Identical input always yields the identical verdict.
pub fn classify(sample: &[PageFacts]) -> Result<DocumentVerdict> {
    let stats = SampleStats::gather(sample);
    if stats.total == 0 {
        return Ok(DocumentVerdict {
            category: DocumentCategory::ScanImage,
            confidence: 0.0,
            rationale: "no pages sampled".to_string(),
        });
    }

    if stats.fraction(stats.landscape_pages) > LANDSCAPE_GATE {
        return Err(Error::UnsupportedLayout(format!(
            "majority landscape: {}/{} sampled pages are wider than tall",
            stats.landscape_pages, stats.total
        )));
    }

    let (name, (category, confidence, mut rationale)) = winning_rule(&stats);

    if !stats.rotated_pages.is_empty() {
        let n = stats.rotated_pages.len();
        rationale.push_str(&format!(
            ", {} rotated page{}",
            n,
            if n == 1 { "" } else { "s" }
        ));
    }

    debug!("classifier rule '{name}': {category:?} ({rationale})");
    Ok(DocumentVerdict {
        category,
        confidence,
        rationale,
    })
}

/// Category the rules would pick, ignoring the landscape gate.
///
/// Diverted documents carry this as the hint in their failure report;
/// it never selects a numbering strategy.
pub fn category_hint(sample: &[PageFacts]) -> DocumentCategory {
    let stats = SampleStats::gather(sample);
    if stats.total == 0 {
        return DocumentCategory::ScanImage;
    }
    let (_, (category, _, _)) = winning_rule(&stats);
    category
}

/// Sampled pages whose declared rotation is nonzero.
///
/// These need the orientation pass before numbering regardless of the
/// category the rules pick.
pub fn rotated_pages(sample: &[PageFacts]) -> Vec<usize> {
    sample
        .iter()
        .filter(|f| !f.declared_rotation.is_upright())
        .map(|f| f.page_index)
        .collect()
}
