//! Tunable configuration for the annotation pipeline.
//!
//! Every threshold the heuristics use lives here, in plain structs with
//! `Default` implementations:
//! - [`OrientationConfig`]: text-ratio thresholds and OCR vote gates
//! - [`LayoutConfig`]: exclusion, grouping, and column detection
//! - [`GutterConfig`] / [`GridConfig`]: strip geometry and number styling
//!
//! [`PipelineConfig`] composes them for a whole document and carries
//! per-category presets.

use crate::classifier::DocumentCategory;
use crate::handle::{Color, NumberStyle};

/// Thresholds for the orientation normalizer.
#[derive(Debug, Clone)]
pub struct OrientationConfig {
    /// A portrait page whose horizontal-span ratio falls below this is
    /// treated as carrying sideways text.
    ///
    /// Default: 0.3
    pub portrait_suggest_ratio: f32,

    /// A page declared at 90/270 degrees whose ratio exceeds this already
    /// reads horizontally and has its rotation flag cleared instead of baked.
    ///
    /// Default: 0.7
    pub sideways_reset_ratio: f32,

    /// A page declared at 180 degrees whose ratio exceeds this has its
    /// rotation flag cleared. Lower than the 90/270 bar; 180 is rarely
    /// legitimate for prose.
    ///
    /// Default: 0.4
    pub inverted_reset_ratio: f32,

    /// Text-plausibility score below which extracted text is ignored and
    /// the OCR vote runs instead.
    ///
    /// Default: 0.3
    pub ocr_gate_confidence: f32,

    /// Minimum vote score a challenger rotation must reach before it can
    /// displace the current one.
    ///
    /// Default: 0.5
    pub ocr_adopt_score: f32,

    /// A challenger must also beat the current rotation's score by this
    /// factor. Keeps noisy near-ties from flip-flopping pages.
    ///
    /// Default: 1.5
    pub ocr_adopt_margin: f32,

    /// Render scale (pixels per point) for the vote rasters.
    ///
    /// Default: 2.0
    pub ocr_render_scale: f32,
}

impl Default for OrientationConfig {
    fn default() -> Self {
        Self {
            portrait_suggest_ratio: 0.3,
            sideways_reset_ratio: 0.7,
            inverted_reset_ratio: 0.4,
            ocr_gate_confidence: 0.3,
            ocr_adopt_score: 0.5,
            ocr_adopt_margin: 1.5,
            ocr_render_scale: 2.0,
        }
    }
}

/// Thresholds for text-line extraction.
#[derive(Debug, Clone)]
pub struct LayoutConfig {
    /// Spans with fewer trimmed characters than this are discarded as
    /// noise (stray punctuation, page furniture).
    ///
    /// Default: 3
    pub min_span_chars: usize,

    /// Form-field and annotation rectangles grow by this much on every
    /// side before overlap tests.
    ///
    /// Default: 2pt
    pub exclusion_tolerance_pt: f32,

    /// Left edge, on a US-letter page, past which short spans count as
    /// overlaid entries. Scaled proportionally for other page widths.
    ///
    /// Default: 400pt
    pub right_margin_x_pt: f32,

    /// Maximum character count for the right-margin overlay rule.
    ///
    /// Default: 20
    pub right_margin_max_chars: usize,

    /// Floor for the vertical merge distance between same-line spans.
    ///
    /// Default: 8pt
    pub merge_distance_pt: f32,

    /// The merge distance grows to this fraction of the average font size
    /// of the two spans being compared.
    ///
    /// Default: 0.8
    pub merge_font_factor: f32,

    /// Column detection requires some line to start past this fraction of
    /// the page width.
    ///
    /// Default: 0.7
    pub column_edge_ratio: f32,

    /// Column detection also requires left edges spread over more than
    /// this fraction of the page width.
    ///
    /// Default: 0.4
    pub column_spread_ratio: f32,

    /// Minimum horizontal gap between sorted left edges accepted as a
    /// column divide.
    ///
    /// Default: 50pt
    pub column_gap_pt: f32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            min_span_chars: 3,
            exclusion_tolerance_pt: 2.0,
            right_margin_x_pt: 400.0,
            right_margin_max_chars: 20,
            merge_distance_pt: 8.0,
            merge_font_factor: 0.8,
            column_edge_ratio: 0.7,
            column_spread_ratio: 0.4,
            column_gap_pt: 50.0,
        }
    }
}

/// Geometry and styling for the gutter strip and its numbers.
#[derive(Debug, Clone)]
pub struct GutterConfig {
    /// Width of the reserved strip.
    ///
    /// Default: 18pt (0.25in, the legal production standard)
    pub width_pt: f32,

    /// Gray level the strip is filled with to prevent ghosting.
    ///
    /// Default: 0.95
    pub fill_gray: f32,

    /// Style for content-aligned numbers.
    ///
    /// Default: 7pt Times-Roman, red
    pub content_style: NumberStyle,

    /// Horizontal space assumed per digit, as a fraction of the font size.
    /// Drives the centering of 1- vs 2-digit numbers.
    ///
    /// Default: 0.6
    pub char_width_factor: f32,

    /// Minimum margin kept between a number and either strip edge.
    ///
    /// Default: 2pt
    pub min_margin_pt: f32,

    /// Consecutive baselines closer than this fraction of the nominal
    /// line height are duplicates; the later one is skipped.
    ///
    /// Default: 0.5
    pub dedupe_factor: f32,

    /// Nominal line height for the duplicate-baseline distance.
    ///
    /// Default: 12pt
    pub nominal_line_height_pt: f32,

    /// Grid-mode placement parameters.
    pub grid: GridConfig,
}

impl Default for GutterConfig {
    fn default() -> Self {
        Self {
            width_pt: 18.0,
            fill_gray: 0.95,
            content_style: NumberStyle::new("Times-Roman", 7.0, Color::new(1.0, 0.0, 0.0)),
            char_width_factor: 0.6,
            min_margin_pt: 2.0,
            dedupe_factor: 0.5,
            nominal_line_height_pt: 12.0,
            grid: GridConfig::default(),
        }
    }
}

/// Fixed-row grid numbering parameters.
///
/// Grid mode serves scanned documents and any page that yields no text
/// lines: a constant row count at constant spacing, independent of content.
#[derive(Debug, Clone)]
pub struct GridConfig {
    /// Rows per page.
    ///
    /// Default: 28 (legal industry standard)
    pub rows: usize,

    /// Vertical span the rows are distributed across, centered on the
    /// page.
    ///
    /// Default: 720pt (10in)
    pub span_pt: f32,

    /// Style for grid numbers.
    ///
    /// Default: 8pt Times-Roman, gray
    pub style: NumberStyle,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            rows: 28,
            span_pt: 720.0,
            style: NumberStyle::new("Times-Roman", 8.0, Color::gray(0.5)),
        }
    }
}

/// Top-level configuration for one document's pipeline run.
#[derive(Debug, Clone, Default)]
pub struct PipelineConfig {
    /// Orientation normalizer thresholds.
    pub orientation: OrientationConfig,

    /// Text-line extraction thresholds.
    pub layout: LayoutConfig,

    /// Gutter geometry and number styling.
    pub gutter: GutterConfig,
}

impl PipelineConfig {
    /// Preset for a classified document category.
    ///
    /// Categories currently share one threshold set; the preset exists so
    /// callers tune per-category behavior in one place.
    ///
    /// # Examples
    ///
    /// ```
    /// use pdf_gutter::classifier::DocumentCategory;
    /// use pdf_gutter::pipeline::config::PipelineConfig;
    ///
    /// let config = PipelineConfig::for_category(DocumentCategory::ScanImage);
    /// assert_eq!(config.gutter.grid.rows, 28);
    /// ```
    pub fn for_category(category: DocumentCategory) -> Self {
        match category {
            DocumentCategory::TextFlow
            | DocumentCategory::NativeLayout
            | DocumentCategory::ScanImage => Self::default(),
        }
    }

    /// Set the gutter strip width.
    pub fn with_gutter_width(mut self, width_pt: f32) -> Self {
        self.gutter.width_pt = width_pt;
        self
    }

    /// Set the grid row count.
    pub fn with_grid_rows(mut self, rows: usize) -> Self {
        self.gutter.grid.rows = rows;
        self
    }

    /// Set the render scale used for OCR vote rasters.
    pub fn with_ocr_render_scale(mut self, scale: f32) -> Self {
        self.orientation.ocr_render_scale = scale;
        self
    }
}
