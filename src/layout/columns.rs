//! Two-column detection.
//!
//! Interleaving the lines of a two-column page numbers them in zigzag
//! order. The divide is measured on the raw span edges, before grouping:
//! grouping anchors a merged line at its leftmost fragment, which would
//! hide the right column whenever rows align. Once a divide is found the
//! spans are regrouped per column and emitted column-major.
//!
//! Detection is deliberately conservative: most legal material is single
//! column, and a false split scrambles the numbering worse than a missed
//! one.

use crate::layout::TextSpan;
use crate::pipeline::config::LayoutConfig;
use crate::utils::safe_float_cmp;

/// Find the x position of a column divide, if the page has one.
///
/// Requires both trigger conditions before looking for a gap: some span
/// starts past `column_edge_ratio` of the page width, and the left edges
/// spread over more than `column_spread_ratio` of it. The divide is the
/// midpoint of the largest gap wider than `column_gap_pt` between sorted
/// distinct left edges. Returns `None` for single-column pages.
pub fn detect_split(spans: &[TextSpan], page_width: f32, config: &LayoutConfig) -> Option<f32> {
    if spans.len() < 2 || page_width <= 0.0 {
        return None;
    }

    let mut edges: Vec<f32> = spans.iter().map(|span| span.bbox.x).collect();
    edges.sort_by(|a, b| safe_float_cmp(*a, *b));
    edges.dedup();

    let min_x = edges[0];
    let max_x = edges[edges.len() - 1];
    if max_x < page_width * config.column_edge_ratio {
        return None;
    }
    if max_x - min_x < page_width * config.column_spread_ratio {
        return None;
    }

    let mut best: Option<(f32, f32)> = None;
    for pair in edges.windows(2) {
        let gap = pair[1] - pair[0];
        if gap > config.column_gap_pt && best.is_none_or(|(size, _)| gap > size) {
            best = Some((gap, (pair[0] + pair[1]) / 2.0));
        }
    }

    let (gap, divide) = best?;
    log::debug!("column divide at x={:.1} (gap {:.1}pt)", divide, gap);
    Some(divide)
}

/// Record which side of the divide each span falls on (0 = left).
pub fn assign_columns(spans: &mut [TextSpan], split_x: f32) {
    for span in spans.iter_mut() {
        span.column_hint = Some(if span.bbox.x < split_x { 0 } else { 1 });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Rect;

    fn spans_two_columns() -> Vec<TextSpan> {
        let mut spans = Vec::new();
        for row in 0..4 {
            let y = 100.0 + row as f32 * 20.0;
            spans.push(TextSpan::new(
                format!("left column row {row}"),
                Rect::new(40.0, y, 200.0, 12.0),
                11.0,
            ));
            spans.push(TextSpan::new(
                format!("right column row {row}"),
                Rect::new(430.0, y, 150.0, 12.0),
                11.0,
            ));
        }
        spans
    }

    #[test]
    fn test_two_column_page_splits_at_gap_midpoint() {
        let spans = spans_two_columns();
        let split = detect_split(&spans, 612.0, &LayoutConfig::default()).unwrap();
        assert_eq!(split, 235.0);
    }

    #[test]
    fn test_single_column_page_does_not_split() {
        let spans: Vec<TextSpan> = (0..5)
            .map(|row| {
                TextSpan::new(
                    format!("row {row}"),
                    Rect::new(72.0, 100.0 + row as f32 * 20.0, 380.0, 12.0),
                    11.0,
                )
            })
            .collect();
        assert_eq!(detect_split(&spans, 612.0, &LayoutConfig::default()), None);
    }

    #[test]
    fn test_indented_block_does_not_split() {
        // Indentation spreads left edges, but nothing starts past 70%.
        let spans = vec![
            TextSpan::new(
                "body text at the margin",
                Rect::new(72.0, 100.0, 380.0, 12.0),
                11.0,
            ),
            TextSpan::new(
                "quoted material indented",
                Rect::new(144.0, 130.0, 300.0, 12.0),
                11.0,
            ),
        ];
        assert_eq!(detect_split(&spans, 612.0, &LayoutConfig::default()), None);
    }

    #[test]
    fn test_wide_spread_without_gap_does_not_split() {
        // Left edges march across the page in 45pt steps: spread is wide
        // but no single gap exceeds 50pt.
        let spans: Vec<TextSpan> = (0..10)
            .map(|i| {
                TextSpan::new(
                    format!("stair step {i}"),
                    Rect::new(40.0 + i as f32 * 45.0, 100.0 + i as f32 * 20.0, 60.0, 12.0),
                    11.0,
                )
            })
            .collect();
        assert_eq!(detect_split(&spans, 612.0, &LayoutConfig::default()), None);
    }

    #[test]
    fn test_largest_gap_wins() {
        // Two qualifying gaps: 60pt (100 -> 160) and 240pt (220 -> 460).
        let spans: Vec<TextSpan> = [40.0, 100.0, 160.0, 220.0, 460.0]
            .iter()
            .enumerate()
            .map(|(i, &x)| {
                TextSpan::new(
                    format!("fragment {i}"),
                    Rect::new(x, 100.0 + i as f32 * 20.0, 60.0, 12.0),
                    11.0,
                )
            })
            .collect();
        let split = detect_split(&spans, 612.0, &LayoutConfig::default()).unwrap();
        assert_eq!(split, 340.0);
    }

    #[test]
    fn test_assign_columns_by_left_edge() {
        let mut spans = spans_two_columns();
        assign_columns(&mut spans, 235.0);

        for span in &spans {
            let expected = if span.bbox.x < 235.0 { Some(0) } else { Some(1) };
            assert_eq!(span.column_hint, expected, "span at x={}", span.bbox.x);
        }
    }
}
