//! In-memory [`DocumentHandle`] backend.
//!
//! [`MemoryDocument`] implements the full handle contract over plain
//! structs: spans are declared in content space, mutations are recorded
//! for inspection, and `save` writes a small placeholder file so that
//! path-level behavior (output naming, failure routing) can be exercised
//! against a real filesystem. Unit and integration tests build pages with
//! the `with_*` constructors instead of shipping PDF fixtures.

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::geometry::{Point, Rect, Rotation, Transform};
use crate::handle::{Color, DocumentHandle, DocumentId, NumberStyle, PageGeometry, PageRaster};
use crate::layout::TextSpan;

/// A text run drawn onto a page, recorded verbatim for assertions.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawnText {
    /// The drawn string
    pub text: String,
    /// Baseline origin x in points
    pub x: f32,
    /// Baseline origin y in points
    pub y: f32,
    /// Style the run was drawn with
    pub style: NumberStyle,
}

/// One synthetic page.
#[derive(Debug, Clone)]
pub struct MemoryPage {
    /// Stored width in points
    pub width_pt: f32,
    /// Stored height in points
    pub height_pt: f32,
    /// Declared rotation
    pub rotation: Rotation,
    /// Text spans in content space
    pub spans: Vec<TextSpan>,
    /// Placed image count
    pub image_count: usize,
    /// Vector drawing count
    pub drawing_count: usize,
    /// Form-field widget rectangles
    pub form_fields: Vec<Rect>,
    /// Non-widget annotation rectangles
    pub annotations: Vec<Rect>,
    /// When false, text extraction fails like a damaged content stream
    pub readable: bool,
    /// Rectangles filled since construction
    pub fills: Vec<(Rect, Color)>,
    /// Text runs drawn since construction
    pub texts: Vec<DrawnText>,
    /// How many times the page content was re-rendered under a transform
    pub rewrites: usize,
}

impl MemoryPage {
    /// Create an empty page of the given stored size.
    pub fn new(width_pt: f32, height_pt: f32) -> Self {
        Self {
            width_pt,
            height_pt,
            rotation: Rotation::R0,
            spans: Vec::new(),
            image_count: 0,
            drawing_count: 0,
            form_fields: Vec::new(),
            annotations: Vec::new(),
            readable: true,
            fills: Vec::new(),
            texts: Vec::new(),
            rewrites: 0,
        }
    }

    /// US Letter portrait, the common fixture size.
    pub fn letter() -> Self {
        Self::new(612.0, 792.0)
    }

    /// Set the declared rotation.
    pub fn with_rotation(mut self, rotation: Rotation) -> Self {
        self.rotation = rotation;
        self
    }

    /// Add a text span in content space.
    pub fn with_span(mut self, text: impl Into<String>, bbox: Rect, font_size: f32) -> Self {
        self.spans.push(TextSpan {
            text: text.into(),
            bbox,
            font_size,
            column_hint: None,
        });
        self
    }

    /// Set the placed image count.
    pub fn with_images(mut self, count: usize) -> Self {
        self.image_count = count;
        self
    }

    /// Set the vector drawing count.
    pub fn with_drawings(mut self, count: usize) -> Self {
        self.drawing_count = count;
        self
    }

    /// Add a form-field widget rectangle.
    pub fn with_form_field(mut self, rect: Rect) -> Self {
        self.form_fields.push(rect);
        self
    }

    /// Add a non-widget annotation rectangle.
    pub fn with_annotation(mut self, rect: Rect) -> Self {
        self.annotations.push(rect);
        self
    }

    /// Make text extraction fail like a damaged content stream.
    pub fn unreadable(mut self) -> Self {
        self.readable = false;
        self
    }

    fn geometry(&self) -> PageGeometry {
        PageGeometry {
            width_pt: self.width_pt,
            height_pt: self.height_pt,
            rotation: self.rotation,
        }
    }
}

/// In-memory document handle.
#[derive(Debug)]
pub struct MemoryDocument {
    id: DocumentId,
    pages: Vec<MemoryPage>,
    /// Indices of `draw_text` calls (document-wide, 0-based) that fail
    fail_draw_calls: Vec<usize>,
    draw_calls: usize,
    /// Where the document was last saved, if anywhere
    pub saved_to: Option<PathBuf>,
}

impl MemoryDocument {
    /// Create a document from pages.
    pub fn new(pages: Vec<MemoryPage>) -> Self {
        Self {
            id: DocumentId::new(),
            pages,
            fail_draw_calls: Vec::new(),
            draw_calls: 0,
            saved_to: None,
        }
    }

    /// Create a one-page document.
    pub fn single(page: MemoryPage) -> Self {
        Self::new(vec![page])
    }

    /// Make the n-th `draw_text` call across the document fail.
    pub fn fail_draw_call(mut self, index: usize) -> Self {
        self.fail_draw_calls.push(index);
        self
    }

    /// Inspect a page.
    pub fn page(&self, index: usize) -> &MemoryPage {
        &self.pages[index]
    }

    fn get(&self, page: usize) -> Result<&MemoryPage> {
        self.pages.get(page).ok_or(Error::PageOutOfRange {
            page,
            count: self.pages.len(),
        })
    }

    fn get_mut(&mut self, page: usize) -> Result<&mut MemoryPage> {
        let count = self.pages.len();
        self.pages
            .get_mut(page)
            .ok_or(Error::PageOutOfRange { page, count })
    }
}

impl DocumentHandle for MemoryDocument {
    fn id(&self) -> DocumentId {
        self.id
    }

    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn geometry(&self, page: usize) -> Result<PageGeometry> {
        Ok(self.get(page)?.geometry())
    }

    fn plain_text(&self, page: usize) -> Result<String> {
        let p = self.get(page)?;
        if !p.readable {
            return Err(Error::Handle(format!("page {page} content is unreadable")));
        }
        Ok(p.spans
            .iter()
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join("\n"))
    }

    fn text_spans(&self, page: usize) -> Result<Vec<TextSpan>> {
        let p = self.get(page)?;
        if !p.readable {
            return Err(Error::Handle(format!("page {page} content is unreadable")));
        }
        Ok(p.spans.clone())
    }

    fn image_count(&self, page: usize) -> Result<usize> {
        Ok(self.get(page)?.image_count)
    }

    fn drawing_count(&self, page: usize) -> Result<usize> {
        Ok(self.get(page)?.drawing_count)
    }

    fn form_field_rects(&self, page: usize) -> Result<Vec<Rect>> {
        Ok(self.get(page)?.form_fields.clone())
    }

    fn annotation_rects(&self, page: usize) -> Result<Vec<Rect>> {
        Ok(self.get(page)?.annotations.clone())
    }

    fn render(&self, page: usize, scale: f32) -> Result<PageRaster> {
        let p = self.get(page)?;
        let (w, h) = p.geometry().display_size();
        let width = (w * scale).round().max(1.0) as u32;
        let height = (h * scale).round().max(1.0) as u32;
        Ok(PageRaster {
            image: image::DynamicImage::new_rgb8(width, height),
            scale,
        })
    }

    fn set_rotation(&mut self, page: usize, rotation: Rotation) -> Result<()> {
        self.get_mut(page)?.rotation = rotation;
        Ok(())
    }

    fn replace_page_transformed(
        &mut self,
        page: usize,
        transform: Transform,
        width_pt: f32,
        height_pt: f32,
    ) -> Result<()> {
        let p = self.get_mut(page)?;
        for span in &mut p.spans {
            span.bbox = transform.apply_rect(&span.bbox);
        }
        for rect in &mut p.form_fields {
            *rect = transform.apply_rect(rect);
        }
        for rect in &mut p.annotations {
            *rect = transform.apply_rect(rect);
        }
        for (rect, _) in &mut p.fills {
            *rect = transform.apply_rect(rect);
        }
        for text in &mut p.texts {
            let moved = transform.apply(Point::new(text.x, text.y));
            text.x = moved.x;
            text.y = moved.y;
        }
        p.width_pt = width_pt;
        p.height_pt = height_pt;
        p.rotation = Rotation::R0;
        p.rewrites += 1;
        Ok(())
    }

    fn fill_rect(&mut self, page: usize, rect: Rect, color: Color) -> Result<()> {
        self.get_mut(page)?.fills.push((rect, color));
        Ok(())
    }

    fn draw_text(
        &mut self,
        page: usize,
        text: &str,
        x: f32,
        y: f32,
        style: &NumberStyle,
    ) -> Result<()> {
        let call = self.draw_calls;
        self.draw_calls += 1;
        if self.fail_draw_calls.contains(&call) {
            return Err(Error::Handle(format!(
                "simulated draw failure on call {call}"
            )));
        }
        self.get_mut(page)?.texts.push(DrawnText {
            text: text.to_string(),
            x,
            y,
            style: style.clone(),
        });
        Ok(())
    }

    fn save(&mut self, path: &Path) -> Result<()> {
        let body = format!("%MEM-PDF {} pages\n", self.pages.len());
        std::fs::write(path, body)?;
        self.saved_to = Some(path.to_path_buf());
        Ok(())
    }
}
