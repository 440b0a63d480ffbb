//! A [plotters](https://crates.io/crates/plotters) drawing backend that
//! produces a single-page vector PDF.
//!
//! Drawing commands are buffered as PDF content-stream operators and the
//! document is written out on [`DrawingBackend::present`], or when the
//! backend is dropped without having been presented.

use pdf_writer::{Content, Name, Pdf, Rect, Ref, Str};
use plotters_backend::text_anchor::{HPos, VPos};
use plotters_backend::{
    BackendColor, BackendCoord, BackendStyle, BackendTextStyle, DrawingBackend, DrawingErrorKind,
    FontFamily, FontStyle, FontTransform,
};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PdfBackendError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// A single-page vector PDF backend
///
/// One backend unit maps to one PDF point. The coordinate origin follows the
/// plotters convention (top-left, y down) and is flipped to the PDF page
/// space (bottom-left, y up) as commands are recorded.
pub struct PdfBackend<'a> {
    path: &'a Path,
    size: (u32, u32),
    ops: Content,
    fonts: Vec<&'static str>,
    saved: bool,
}

impl<'a> PdfBackend<'a> {
    /// Create a backend writing to `path` with a page of `size` points
    pub fn new<P: AsRef<Path> + ?Sized>(path: &'a P, size: (u32, u32)) -> Self {
        Self {
            path: path.as_ref(),
            size,
            ops: Content::new(),
            fonts: Vec::new(),
            saved: true,
        }
    }

    fn flip_y(&self, y: i32) -> f32 {
        self.size.1 as f32 - y as f32
    }

    fn set_stroke<S: BackendStyle>(&mut self, style: &S) {
        let (r, g, b) = blend_on_white(style.color());
        self.ops.set_stroke_rgb(r, g, b);
        self.ops.set_line_width(style.stroke_width().max(1) as f32);
    }

    fn set_fill(&mut self, color: BackendColor) {
        let (r, g, b) = blend_on_white(color);
        self.ops.set_fill_rgb(r, g, b);
    }

    fn font_index(&mut self, base: &'static str) -> usize {
        match self.fonts.iter().position(|&f| f == base) {
            Some(index) => index,
            None => {
                self.fonts.push(base);
                self.fonts.len() - 1
            }
        }
    }

    fn write_document(&mut self) -> Result<(), std::io::Error> {
        let content = std::mem::replace(&mut self.ops, Content::new());
        let data = content.finish();

        let catalog_id = Ref::new(1);
        let page_tree_id = Ref::new(2);
        let page_id = Ref::new(3);
        let content_id = Ref::new(4);
        let font_id = |index: usize| Ref::new(5 + index as i32);

        let mut pdf = Pdf::new();
        pdf.catalog(catalog_id).pages(page_tree_id);
        pdf.pages(page_tree_id).kids([page_id]).count(1);

        let font_names = (0..self.fonts.len())
            .map(|index| format!("F{index}"))
            .collect::<Vec<_>>();
        {
            let mut page = pdf.page(page_id);
            page.media_box(Rect::new(
                0.0,
                0.0,
                self.size.0 as f32,
                self.size.1 as f32,
            ));
            page.parent(page_tree_id);
            page.contents(content_id);
            let mut resources = page.resources();
            let mut fonts = resources.fonts();
            for (index, name) in font_names.iter().enumerate() {
                fonts.pair(Name(name.as_bytes()), font_id(index));
            }
        }

        pdf.stream(content_id, &data);
        for (index, base) in self.fonts.iter().enumerate() {
            pdf.type1_font(font_id(index))
                .base_font(Name(base.as_bytes()));
        }

        std::fs::write(self.path, pdf.finish())
    }
}

impl DrawingBackend for PdfBackend<'_> {
    type ErrorType = PdfBackendError;

    fn get_size(&self) -> (u32, u32) {
        self.size
    }

    fn ensure_prepared(&mut self) -> Result<(), DrawingErrorKind<PdfBackendError>> {
        self.saved = false;
        Ok(())
    }

    fn present(&mut self) -> Result<(), DrawingErrorKind<PdfBackendError>> {
        self.write_document()
            .map_err(|e| DrawingErrorKind::DrawingError(e.into()))?;
        self.saved = true;
        Ok(())
    }

    fn draw_pixel(
        &mut self,
        point: BackendCoord,
        color: BackendColor,
    ) -> Result<(), DrawingErrorKind<PdfBackendError>> {
        if color.alpha == 0.0 {
            return Ok(());
        }
        self.set_fill(color);
        let y = self.flip_y(point.1 + 1);
        self.ops.rect(point.0 as f32, y, 1.0, 1.0);
        self.ops.fill_nonzero();
        Ok(())
    }

    fn draw_line<S: BackendStyle>(
        &mut self,
        from: BackendCoord,
        to: BackendCoord,
        style: &S,
    ) -> Result<(), DrawingErrorKind<PdfBackendError>> {
        if style.color().alpha == 0.0 {
            return Ok(());
        }
        self.set_stroke(style);
        let (fy, ty) = (self.flip_y(from.1), self.flip_y(to.1));
        self.ops.move_to(from.0 as f32, fy);
        self.ops.line_to(to.0 as f32, ty);
        self.ops.stroke();
        Ok(())
    }

    fn draw_rect<S: BackendStyle>(
        &mut self,
        upper_left: BackendCoord,
        bottom_right: BackendCoord,
        style: &S,
        fill: bool,
    ) -> Result<(), DrawingErrorKind<PdfBackendError>> {
        if style.color().alpha == 0.0 {
            return Ok(());
        }
        let width = (bottom_right.0 - upper_left.0) as f32;
        let height = (bottom_right.1 - upper_left.1) as f32;
        let bottom = self.flip_y(bottom_right.1);
        if fill {
            self.set_fill(style.color());
            self.ops.rect(upper_left.0 as f32, bottom, width, height);
            self.ops.fill_nonzero();
        } else {
            self.set_stroke(style);
            self.ops.rect(upper_left.0 as f32, bottom, width, height);
            self.ops.stroke();
        }
        Ok(())
    }

    fn draw_path<S: BackendStyle, I: IntoIterator<Item = BackendCoord>>(
        &mut self,
        path: I,
        style: &S,
    ) -> Result<(), DrawingErrorKind<PdfBackendError>> {
        if style.color().alpha == 0.0 {
            return Ok(());
        }
        self.set_stroke(style);
        let mut any = false;
        for (index, (x, y)) in path.into_iter().enumerate() {
            let y = self.flip_y(y);
            if index == 0 {
                self.ops.move_to(x as f32, y);
            } else {
                self.ops.line_to(x as f32, y);
            }
            any = true;
        }
        if any {
            self.ops.stroke();
        }
        Ok(())
    }

    fn draw_circle<S: BackendStyle>(
        &mut self,
        center: BackendCoord,
        radius: u32,
        style: &S,
        fill: bool,
    ) -> Result<(), DrawingErrorKind<PdfBackendError>> {
        if style.color().alpha == 0.0 {
            return Ok(());
        }
        let (cx, cy) = (center.0 as f32, self.flip_y(center.1));
        let r = radius as f32;
        // Cubic Bezier quarter-arc approximation
        let k = 0.552_284_8 * r;
        self.ops.move_to(cx + r, cy);
        self.ops.cubic_to(cx + r, cy + k, cx + k, cy + r, cx, cy + r);
        self.ops.cubic_to(cx - k, cy + r, cx - r, cy + k, cx - r, cy);
        self.ops.cubic_to(cx - r, cy - k, cx - k, cy - r, cx, cy - r);
        self.ops.cubic_to(cx + k, cy - r, cx + r, cy - k, cx + r, cy);
        self.ops.close_path();
        if fill {
            self.set_fill(style.color());
            self.ops.fill_nonzero();
        } else {
            self.set_stroke(style);
            self.ops.stroke();
        }
        Ok(())
    }

    fn fill_polygon<S: BackendStyle, I: IntoIterator<Item = BackendCoord>>(
        &mut self,
        vert: I,
        style: &S,
    ) -> Result<(), DrawingErrorKind<PdfBackendError>> {
        if style.color().alpha == 0.0 {
            return Ok(());
        }
        self.set_fill(style.color());
        let mut any = false;
        for (index, (x, y)) in vert.into_iter().enumerate() {
            let y = self.flip_y(y);
            if index == 0 {
                self.ops.move_to(x as f32, y);
            } else {
                self.ops.line_to(x as f32, y);
            }
            any = true;
        }
        if any {
            self.ops.close_path();
            self.ops.fill_nonzero();
        }
        Ok(())
    }

    fn draw_text<TStyle: BackendTextStyle>(
        &mut self,
        text: &str,
        style: &TStyle,
        pos: BackendCoord,
    ) -> Result<(), DrawingErrorKind<PdfBackendError>> {
        let color = style.color();
        if color.alpha == 0.0 || text.is_empty() {
            return Ok(());
        }

        let size = style.size() as f32;
        let width = text_width(text, size);
        let base = base_font(style.family(), style.style());
        let font_index = self.font_index(base);
        let font_name = format!("F{font_index}");

        // Offset from the anchor point to the baseline origin, in the
        // unrotated text frame (screen orientation, y down).
        let dx = match style.anchor().h_pos {
            HPos::Left => 0.0,
            HPos::Center => -width / 2.0,
            HPos::Right => -width,
        };
        let dy = match style.anchor().v_pos {
            VPos::Top => 0.0,
            VPos::Center => -size / 2.0,
            VPos::Bottom => -size,
        } + ASCENT * size;

        // Rotate the offset the same way the glyphs are rotated, then flip
        // into page space.
        let transform = style.transform();
        let (ox, oy) = rotate(transform.clone(), dx, dy);
        let ex = pos.0 as f32 + ox;
        let ey = self.flip_y(pos.1) - oy;
        let [a, b, c, d] = text_matrix(transform);

        self.set_fill(color);
        self.ops.begin_text();
        self.ops.set_font(Name(font_name.as_bytes()), size);
        self.ops.set_text_matrix([a, b, c, d, ex, ey]);
        let encoded = text
            .chars()
            .map(|ch| if ch.is_ascii_graphic() || ch == ' ' { ch as u8 } else { b'?' })
            .collect::<Vec<_>>();
        self.ops.show(Str(&encoded));
        self.ops.end_text();
        Ok(())
    }

    fn estimate_text_size<TStyle: BackendTextStyle>(
        &self,
        text: &str,
        style: &TStyle,
    ) -> Result<(u32, u32), DrawingErrorKind<PdfBackendError>> {
        let size = style.size() as f32;
        Ok((text_width(text, size).ceil() as u32, size.ceil() as u32))
    }
}

impl Drop for PdfBackend<'_> {
    fn drop(&mut self) {
        if !self.saved {
            let _ = self.write_document();
        }
    }
}

/// Baseline offset from the top of the em box, as a fraction of the size
const ASCENT: f32 = 0.8;

/// Composite a translucent color onto the white page
fn blend_on_white(color: BackendColor) -> (f32, f32, f32) {
    let alpha = color.alpha.clamp(0.0, 1.0) as f32;
    let channel = |c: u8| 1.0 - alpha * (1.0 - c as f32 / 255.0);
    (channel(color.rgb.0), channel(color.rgb.1), channel(color.rgb.2))
}

fn base_font(family: FontFamily, style: FontStyle) -> &'static str {
    match family {
        FontFamily::Serif => match style {
            FontStyle::Bold => "Times-Bold",
            FontStyle::Italic | FontStyle::Oblique => "Times-Italic",
            FontStyle::Normal => "Times-Roman",
        },
        FontFamily::Monospace => match style {
            FontStyle::Bold => "Courier-Bold",
            FontStyle::Italic | FontStyle::Oblique => "Courier-Oblique",
            FontStyle::Normal => "Courier",
        },
        FontFamily::SansSerif | FontFamily::Name(_) => match style {
            FontStyle::Bold => "Helvetica-Bold",
            FontStyle::Italic | FontStyle::Oblique => "Helvetica-Oblique",
            FontStyle::Normal => "Helvetica",
        },
    }
}

/// Map an offset in the unrotated text frame through the glyph rotation
/// (screen orientation, y down)
fn rotate(transform: FontTransform, x: f32, y: f32) -> (f32, f32) {
    match transform {
        FontTransform::None => (x, y),
        FontTransform::Rotate90 => (-y, x),
        FontTransform::Rotate180 => (-x, -y),
        FontTransform::Rotate270 => (y, -x),
    }
}

/// Text matrix for the glyph rotation, in page space (y up)
fn text_matrix(transform: FontTransform) -> [f32; 4] {
    match transform {
        FontTransform::None => [1.0, 0.0, 0.0, 1.0],
        FontTransform::Rotate90 => [0.0, -1.0, 1.0, 0.0],
        FontTransform::Rotate180 => [-1.0, 0.0, 0.0, -1.0],
        FontTransform::Rotate270 => [0.0, 1.0, -1.0, 0.0],
    }
}

/// Approximate Helvetica advance widths, in points
fn text_width(text: &str, size: f32) -> f32 {
    text.chars().map(|ch| char_em(ch) * size).sum()
}

fn char_em(ch: char) -> f32 {
    match ch {
        'i' | 'l' | 'j' | '.' | ',' | ':' | ';' | '!' | '\'' | '|' => 0.28,
        'f' | 't' | 'r' | 'I' | '(' | ')' | '[' | ']' | '-' | ' ' => 0.35,
        'm' | 'w' | 'M' | 'W' | '@' | '%' => 0.85,
        ch if ch.is_ascii_uppercase() => 0.67,
        ch if ch.is_ascii_digit() => 0.556,
        _ => 0.52,
    }
}
