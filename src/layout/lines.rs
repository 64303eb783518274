//! Proximity grouping: spans into visual lines.
//!
//! Extraction reports one span per text run, so a single printed line often
//! arrives as several fragments (tab stops, font changes, justified gaps).
//! Grouping walks the spans top to bottom and merges fragments whose
//! vertical centers sit within an adaptive distance of each other.

use crate::geometry::Rect;
use crate::layout::{TextLine, TextSpan};
use crate::pipeline::config::LayoutConfig;
use crate::utils::safe_float_cmp;

/// The baseline sits this fraction of the box height above the bottom edge.
const BASELINE_DESCENT_FACTOR: f32 = 0.15;

/// Baseline position for a text box.
///
/// # Examples
///
/// ```
/// use pdf_gutter::geometry::Rect;
/// use pdf_gutter::layout::baseline_of;
///
/// let bbox = Rect::new(72.0, 100.0, 200.0, 10.0);
/// assert_eq!(baseline_of(&bbox), 108.5);
/// ```
pub fn baseline_of(bbox: &Rect) -> f32 {
    bbox.bottom() - BASELINE_DESCENT_FACTOR * bbox.height
}

/// Group spans into visual lines, walking top to bottom.
///
/// Spans are sorted by vertical center and merged while consecutive
/// centers stay within `max(merge_distance_pt, merge_font_factor ×
/// avg_font_size)`, the average taken over the two spans being compared.
/// Larger fonts tolerate larger offsets; the floor keeps small fonts from
/// splitting on sub-point jitter.
pub fn group_into_lines(spans: &[TextSpan], config: &LayoutConfig) -> Vec<TextLine> {
    if spans.is_empty() {
        return Vec::new();
    }

    let mut ordered: Vec<&TextSpan> = spans.iter().collect();
    ordered.sort_by(|a, b| safe_float_cmp(a.bbox.center().y, b.bbox.center().y));

    let mut lines = Vec::new();
    let mut group = vec![ordered[0]];
    for span in ordered.into_iter().skip(1) {
        let last = group[group.len() - 1];
        let avg_font = (span.font_size + last.font_size) / 2.0;
        let max_spacing = config.merge_distance_pt.max(config.merge_font_factor * avg_font);

        if (span.bbox.center().y - last.bbox.center().y).abs() <= max_spacing {
            group.push(span);
        } else {
            lines.push(build_line(&group));
            group = vec![span];
        }
    }
    lines.push(build_line(&group));

    lines
}

/// Collapse one group of same-line fragments into a [`TextLine`].
///
/// Text joins left to right. The leftmost fragment's box is the line's
/// reference geometry: its baseline stays put however many fragments
/// follow it on the right.
fn build_line(group: &[&TextSpan]) -> TextLine {
    let mut members = group.to_vec();
    members.sort_by(|a, b| safe_float_cmp(a.bbox.x, b.bbox.x));

    let text = members
        .iter()
        .map(|span| span.text.trim())
        .collect::<Vec<_>>()
        .join(" ");
    let bbox = members[0].bbox;
    let font_size = members.iter().map(|span| span.font_size).sum::<f32>() / members.len() as f32;

    TextLine {
        text,
        bbox,
        baseline_y: baseline_of(&bbox),
        font_size,
    }
}
