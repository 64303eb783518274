//! The PDF boundary.
//!
//! All PDF manipulation goes through the [`DocumentHandle`] trait: an opaque
//! surface over whatever backend owns parsing, rendering, and writing. The
//! annotation core never touches PDF objects directly, which keeps every
//! component testable against the in-memory implementation in
//! [`memory`] and lets parallel workers own independent handles without
//! cross-talk.
//!
//! Coordinates are top-left origin, y down, in points. Span geometry is
//! reported in the page's stored (unrotated) content space; the declared
//! rotation is carried separately in [`PageGeometry`].

pub mod memory;

use std::path::Path;

use crate::error::Result;
use crate::geometry::{Rect, Rotation, Transform};
use crate::layout::TextSpan;

pub use memory::{MemoryDocument, MemoryPage};

/// Stable identity of an open document for the run's lifetime.
///
/// Minted when a handle is opened; together with a page index it keys the
/// gutter guard side-table, so two documents with equal page indices never
/// collide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DocumentId(uuid::Uuid);

impl DocumentId {
    /// Mint a fresh document id.
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for DocumentId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for DocumentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// RGB color with components in 0.0 to 1.0.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    /// Red channel
    pub r: f32,
    /// Green channel
    pub g: f32,
    /// Blue channel
    pub b: f32,
}

impl Color {
    /// Create a new color.
    pub fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    /// Create a neutral gray of the given level.
    pub fn gray(level: f32) -> Self {
        Self::new(level, level, level)
    }
}

/// Text style for gutter number inserts.
#[derive(Debug, Clone, PartialEq)]
pub struct NumberStyle {
    /// Font name (base-14 names are always available to backends)
    pub font_name: String,
    /// Font size in points
    pub font_size: f32,
    /// Fill color
    pub color: Color,
}

impl NumberStyle {
    /// Create a new style.
    pub fn new(font_name: impl Into<String>, font_size: f32, color: Color) -> Self {
        Self {
            font_name: font_name.into(),
            font_size,
            color,
        }
    }
}

/// Page dimensions and declared rotation as stored in the document.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageGeometry {
    /// Stored (unrotated) page width in points
    pub width_pt: f32,
    /// Stored (unrotated) page height in points
    pub height_pt: f32,
    /// Declared rotation applied at display time
    pub rotation: Rotation,
}

impl PageGeometry {
    /// Page size as displayed, with the declared rotation applied.
    pub fn display_size(&self) -> (f32, f32) {
        if self.rotation.swaps_axes() {
            (self.height_pt, self.width_pt)
        } else {
            (self.width_pt, self.height_pt)
        }
    }

    /// Whether the page displays wider than tall.
    pub fn is_landscape(&self) -> bool {
        let (w, h) = self.display_size();
        w > h
    }
}

/// A page rendered to a raster surface.
///
/// Produced by [`DocumentHandle::render`] and consumed by the OCR
/// collaborator. The orientation vote rotates copies of one raster in
/// memory rather than re-rendering four times.
#[derive(Clone)]
pub struct PageRaster {
    /// Pixel data
    pub image: image::DynamicImage,
    /// Points-to-pixels scale the page was rendered at
    pub scale: f32,
}

impl PageRaster {
    /// Raster width in pixels.
    pub fn width(&self) -> u32 {
        image::GenericImageView::dimensions(&self.image).0
    }

    /// Raster height in pixels.
    pub fn height(&self) -> u32 {
        image::GenericImageView::dimensions(&self.image).1
    }

    /// A copy rotated clockwise by the given quarter turn.
    pub fn rotated(&self, rotation: Rotation) -> PageRaster {
        let image = match rotation {
            Rotation::R0 => self.image.clone(),
            Rotation::R90 => self.image.rotate90(),
            Rotation::R180 => self.image.rotate180(),
            Rotation::R270 => self.image.rotate270(),
        };
        PageRaster {
            image,
            scale: self.scale,
        }
    }
}

impl std::fmt::Debug for PageRaster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageRaster")
            .field("width", &self.width())
            .field("height", &self.height())
            .field("scale", &self.scale)
            .finish()
    }
}

/// The opaque document surface the annotation core operates through.
///
/// One handle per document, owned end-to-end by one worker. Read methods
/// take `&self`; the three mutators (`set_rotation`,
/// `replace_page_transformed`, the drawing calls) and `save` take
/// `&mut self`, which statically prevents mutating a page while another
/// page's extraction borrows the handle.
pub trait DocumentHandle: Send {
    /// Stable identity for the run's lifetime.
    fn id(&self) -> DocumentId;

    /// Number of pages.
    fn page_count(&self) -> usize;

    /// Stored dimensions and declared rotation of a page.
    fn geometry(&self, page: usize) -> Result<PageGeometry>;

    /// Plain text of a page, empty for text-free pages.
    fn plain_text(&self, page: usize) -> Result<String>;

    /// Text spans with geometry and font size, in content space.
    fn text_spans(&self, page: usize) -> Result<Vec<TextSpan>>;

    /// Number of placed images on a page.
    fn image_count(&self, page: usize) -> Result<usize>;

    /// Number of vector drawing objects on a page.
    fn drawing_count(&self, page: usize) -> Result<usize>;

    /// Form-field widget rectangles on a page.
    fn form_field_rects(&self, page: usize) -> Result<Vec<Rect>>;

    /// Non-widget annotation rectangles on a page.
    fn annotation_rects(&self, page: usize) -> Result<Vec<Rect>>;

    /// Render a page to a raster at `scale` pixels per point.
    fn render(&self, page: usize, scale: f32) -> Result<PageRaster>;

    /// Rewrite the declared rotation without touching content.
    fn set_rotation(&mut self, page: usize, rotation: Rotation) -> Result<()>;

    /// Losslessly re-render the page's content under `transform` into a
    /// fresh page of the given dimensions, replacing the original.
    ///
    /// The replacement page has rotation 0. This is the single primitive
    /// behind both upright normalization and the gutter shift.
    fn replace_page_transformed(
        &mut self,
        page: usize,
        transform: Transform,
        width_pt: f32,
        height_pt: f32,
    ) -> Result<()>;

    /// Fill a rectangle with an opaque color.
    fn fill_rect(&mut self, page: usize, rect: Rect, color: Color) -> Result<()>;

    /// Draw a short text run with its baseline origin at `(x, y)`.
    fn draw_text(&mut self, page: usize, text: &str, x: f32, y: f32, style: &NumberStyle)
        -> Result<()>;

    /// Write the document to disk.
    fn save(&mut self, path: &Path) -> Result<()>;
}
