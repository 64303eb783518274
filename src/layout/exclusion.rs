//! Span exclusion: overlaid text that must not attract line numbers.
//!
//! Fill & Sign entries, stamped amounts, contact details, and form-field
//! content read as spans just like body prose. Numbering them produces
//! phantom lines between real ones, so they are filtered before grouping.

use lazy_static::lazy_static;
use regex::Regex;

use crate::geometry::Rect;
use crate::layout::TextSpan;
use crate::pipeline::config::LayoutConfig;

/// US letter width, the reference for right-margin scaling.
const LETTER_WIDTH_PT: f32 = 612.0;

/// Amounts left of this x and above this y are body prose, not stamps.
const AMOUNT_X_MIN_PT: f32 = 350.0;
const AMOUNT_Y_MIN_PT: f32 = 500.0;

/// Text fully inside the left margin is stale numbering from an earlier
/// tool, never body prose.
const LEFT_MARGIN_X_PT: f32 = 50.0;
const LEFT_MARGIN_RIGHT_PT: f32 = 100.0;

lazy_static! {
    /// Monetary amounts: symbol-prefixed ("£12", "$99.95") or bare decimals ("1234.56")
    static ref RE_AMOUNT: Regex = Regex::new(r"[£$€]\s*\d+(?:\.\d+)?|\d+\.\d{2}").unwrap();
    /// UK phone numbers: five digits, optional space, six digits
    static ref RE_PHONE_UK: Regex = Regex::new(r"\d{5}\s?\d{6}").unwrap();
    /// US phone numbers: 3-3-4 digit groups with ., - or space separators
    static ref RE_PHONE_US: Regex = Regex::new(r"\d{3}[-.\s]?\d{3}[-.\s]?\d{4}").unwrap();
    /// Email addresses
    static ref RE_EMAIL: Regex = Regex::new(r"[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}").unwrap();
    /// VAT registration references ("VAT No. 123456")
    static ref RE_VAT_NO: Regex = Regex::new(r"(?i)vat\s+no\.?\s*\d+").unwrap();
    /// Company registration references ("Company No. 0123")
    static ref RE_COMPANY_NO: Regex = Regex::new(r"(?i)company\s+no\.?\s*\d+").unwrap();
    /// UK postcodes ("SW1A 1AA")
    static ref RE_POSTCODE_UK: Regex = Regex::new(r"\b[A-Z]{1,2}\d{1,2}[A-Z]?\s+\d[A-Z]{2}\b").unwrap();
}

/// Drop spans that must not produce numbered lines.
///
/// Removes, in order: spans too short to be prose, spans overlapping a
/// form-field or annotation rectangle (each inflated by the configured
/// tolerance), and spans matching the overlay heuristics in
/// [`is_overlay_text`].
pub fn filter_spans(
    spans: Vec<TextSpan>,
    zones: &[Rect],
    page_width: f32,
    config: &LayoutConfig,
) -> Vec<TextSpan> {
    let inflated: Vec<Rect> = zones
        .iter()
        .map(|zone| zone.inflate(config.exclusion_tolerance_pt))
        .collect();

    spans
        .into_iter()
        .filter(|span| {
            let text = span.text.trim();
            if text.chars().count() < config.min_span_chars {
                return false;
            }
            if inflated.iter().any(|zone| zone.intersects(&span.bbox)) {
                log::debug!("excluded (field/annotation zone): {:?}", text);
                return false;
            }
            if is_overlay_text(text, &span.bbox, page_width, config) {
                log::debug!("excluded (overlay heuristic): {:?}", text);
                return false;
            }
            true
        })
        .collect()
}

/// Whether a span reads as manually overlaid rather than body prose.
///
/// Contact details and postcodes count anywhere on the page. Amounts count
/// only toward the right edge or bottom, where stamped totals live; an
/// amount quoted mid-paragraph stays. Short mixed-case text starting in
/// the right margin is a Fill & Sign entry; all-caps short text there is
/// kept (exhibit stamps read as prose headings). Text fully inside the
/// left margin is numbering residue from an earlier tool.
pub fn is_overlay_text(text: &str, bbox: &Rect, page_width: f32, config: &LayoutConfig) -> bool {
    if RE_PHONE_UK.is_match(text)
        || RE_PHONE_US.is_match(text)
        || RE_EMAIL.is_match(text)
        || RE_VAT_NO.is_match(text)
        || RE_COMPANY_NO.is_match(text)
        || RE_POSTCODE_UK.is_match(text)
    {
        return true;
    }

    if RE_AMOUNT.is_match(text) && (bbox.x > AMOUNT_X_MIN_PT || bbox.y > AMOUNT_Y_MIN_PT) {
        return true;
    }

    let right_margin_x = page_width * (config.right_margin_x_pt / LETTER_WIDTH_PT);
    if bbox.x > right_margin_x
        && text.chars().count() < config.right_margin_max_chars
        && !is_all_caps(text)
    {
        return true;
    }

    bbox.x < LEFT_MARGIN_X_PT && bbox.right() < LEFT_MARGIN_RIGHT_PT
}

/// At least one cased character and no lowercase ones.
fn is_all_caps(text: &str) -> bool {
    let mut has_cased = false;
    for c in text.chars() {
        if c.is_lowercase() {
            return false;
        }
        if c.is_uppercase() {
            has_cased = true;
        }
    }
    has_cased
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body_span(text: &str) -> TextSpan {
        TextSpan::new(text, Rect::new(72.0, 100.0, 300.0, 12.0), 11.0)
    }

    fn span_at(text: &str, x: f32, y: f32) -> TextSpan {
        TextSpan::new(text, Rect::new(x, y, 80.0, 12.0), 11.0)
    }

    fn filter(spans: Vec<TextSpan>, zones: &[Rect]) -> Vec<TextSpan> {
        filter_spans(spans, zones, 612.0, &LayoutConfig::default())
    }

    #[test]
    fn test_body_prose_is_kept() {
        let kept = filter(vec![body_span("The witness testified at length")], &[]);
        assert_eq!(kept.len(), 1);
    }

    #[test]
    fn test_short_noise_is_dropped() {
        let kept = filter(vec![body_span("a)"), body_span("ok")], &[]);
        assert!(kept.is_empty());
    }

    #[test]
    fn test_span_in_form_field_zone_is_dropped() {
        let zone = Rect::new(70.0, 95.0, 310.0, 20.0);
        let kept = filter(vec![body_span("typed into a field")], &[zone]);
        assert!(kept.is_empty());
    }

    #[test]
    fn test_zone_tolerance_extends_two_points() {
        // Zone ends at x=70; span starts at x=71.5, inside the 2pt inflation.
        let zone = Rect::new(20.0, 100.0, 50.0, 12.0);
        let near = TextSpan::new("adjacent text", Rect::new(71.5, 100.0, 100.0, 12.0), 11.0);
        assert!(filter(vec![near], &[zone]).is_empty());

        let clear = TextSpan::new("adjacent text", Rect::new(73.0, 100.0, 100.0, 12.0), 11.0);
        assert_eq!(filter(vec![clear], &[zone]).len(), 1);
    }

    #[test]
    fn test_contact_details_excluded_anywhere() {
        let spans = vec![
            body_span("call 01234 567890 today"),
            body_span("or 555-123-4567 collect"),
            body_span("write to counsel@firm.co.uk"),
            body_span("VAT No. 998877"),
            body_span("Company No. 0042"),
        ];
        assert!(filter(spans, &[]).is_empty());
    }

    #[test]
    fn test_postcode_excluded() {
        let kept = filter(vec![body_span("London SW1A 1AA")], &[]);
        assert!(kept.is_empty());
    }

    #[test]
    fn test_amount_in_body_is_kept_but_stamped_total_is_not() {
        let in_body = body_span("damages of 1,234.56 were sought");
        assert_eq!(filter(vec![in_body], &[]).len(), 1);

        let stamped = span_at("Total: £1,234.56", 420.0, 700.0);
        assert!(filter(vec![stamped], &[]).is_empty());

        let bottom = span_at("paid 99.95 in cash", 72.0, 710.0);
        assert!(filter(vec![bottom], &[]).is_empty());
    }

    #[test]
    fn test_right_margin_short_text_excluded_unless_all_caps() {
        let filled_in = span_at("John Smith", 450.0, 300.0);
        assert!(filter(vec![filled_in], &[]).is_empty());

        let stamp = span_at("EXHIBIT A", 450.0, 300.0);
        assert_eq!(filter(vec![stamp], &[]).len(), 1);

        // Long right-side text is prose in a wide layout, not an entry.
        let long = span_at("continuation of the indented quotation", 450.0, 300.0);
        assert_eq!(filter(vec![long], &[]).len(), 1);
    }

    #[test]
    fn test_right_margin_scales_with_page_width() {
        // On an A3-width page the 400pt rule scales out past 550pt.
        let config = LayoutConfig::default();
        let span = span_at("John Smith", 450.0, 300.0);
        let kept = filter_spans(vec![span], &[], 842.0, &config);
        assert_eq!(kept.len(), 1);
    }

    #[test]
    fn test_left_margin_residue_excluded() {
        let residue = TextSpan::new("14", Rect::new(8.0, 200.0, 12.0, 10.0), 8.0);
        // Too short anyway; use a three-char form to hit the margin rule.
        let residue_long = TextSpan::new("142", Rect::new(8.0, 200.0, 12.0, 10.0), 8.0);
        assert!(filter(vec![residue, residue_long], &[]).is_empty());

        // Body text starting at the 1in margin is untouched.
        assert_eq!(filter(vec![body_span("normal paragraph text")], &[]).len(), 1);
    }

    #[test]
    fn test_is_all_caps() {
        assert!(is_all_caps("EXHIBIT A"));
        assert!(is_all_caps("CONFIDENTIAL"));
        assert!(!is_all_caps("Exhibit A"));
        assert!(!is_all_caps("12345"));
        assert!(!is_all_caps(""));
    }
}
