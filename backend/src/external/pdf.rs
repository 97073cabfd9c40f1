//! PDF output of a render plan
//!
//! Plans use top-left coordinates in the page unit; PDF user space starts
//! bottom-left, so every element is flipped and converted to millimetres
//! here.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use printpdf::image_crate;
use printpdf::{
    BuiltinFont, Color, Image, ImageTransform, IndirectFontRef, Line, Mm, PdfDocument,
    PdfLayerReference, Point, Pt,
};
use thiserror::Error;

use crate::services::layout::Unit;
use crate::services::rendering::{Align, Element, Font, RenderPlan, Rgb, TextElement};

/// Resolution pictures are scaled from when no size is requested
const IMAGE_DPI: f32 = 72.0;

/// Baseline sits this fraction of the font size below the cell top
const ASCENT: f32 = 0.8;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("PDF error: {0}")]
    Pdf(String),

    #[error("Image {path}: {message}")]
    Image { path: String, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Read every picture a plan refers to
pub async fn load_images(plan: &RenderPlan) -> Result<HashMap<PathBuf, Vec<u8>>, RenderError> {
    let mut images = HashMap::new();
    for element in &plan.elements {
        if let Element::Image { path, .. } = element {
            if !images.contains_key(path) {
                let bytes = tokio::fs::read(path).await?;
                images.insert(path.clone(), bytes);
            }
        }
    }
    Ok(images)
}

/// Render a plan to PDF bytes
///
/// Picture decoding and PDF encoding run on the blocking pool.
pub async fn render_pdf(plan: &RenderPlan) -> Result<Vec<u8>, RenderError> {
    let images = load_images(plan).await?;
    let plan = plan.clone();
    tokio::task::spawn_blocking(move || write_pdf(&plan, &images))
        .await
        .map_err(|e| RenderError::Pdf(format!("PDF writer task failed: {}", e)))?
}

struct Fonts {
    helvetica: IndirectFontRef,
    times: IndirectFontRef,
}

impl Fonts {
    fn get(&self, font: Font) -> &IndirectFontRef {
        match font {
            Font::Helvetica => &self.helvetica,
            Font::Times => &self.times,
        }
    }
}

struct Page {
    unit: Unit,
    height_mm: f32,
}

impl Page {
    fn mm(&self, value: f32) -> f32 {
        self.unit.to_mm(value)
    }

    /// PDF y of the bottom edge of a box whose top is at `y`
    fn flip(&self, y: f32, height_mm: f32) -> f32 {
        self.height_mm - self.mm(y) - height_mm
    }
}

fn color(rgb: Rgb) -> Color {
    Color::Rgb(printpdf::Rgb::new(
        f32::from(rgb.0) / 255.0,
        f32::from(rgb.1) / 255.0,
        f32::from(rgb.2) / 255.0,
        None,
    ))
}

fn pdf_error(e: impl std::fmt::Display) -> RenderError {
    RenderError::Pdf(e.to_string())
}

/// Approximate advance width of a string in millimetres
///
/// Builtin fonts carry no metrics here, so glyphs are bucketed into narrow,
/// regular and wide classes.
fn text_width_mm(text: &str, size_pt: f32, font: Font) -> f32 {
    let em: f32 = text
        .chars()
        .map(|c| match c {
            'i' | 'j' | 'l' | '.' | ',' | '\'' | '!' | '|' | ':' | ';' => 0.28,
            'f' | 't' | 'r' | 'I' | ' ' | '(' | ')' | '-' => 0.33,
            'm' | 'w' | 'M' | 'W' => 0.85,
            c if c.is_uppercase() => 0.68,
            _ => 0.52,
        })
        .sum();
    let factor = match font {
        Font::Helvetica => 1.0,
        Font::Times => 0.92,
    };
    em * factor * size_pt * 25.4 / 72.0
}

fn draw_text(layer: &PdfLayerReference, page: &Page, fonts: &Fonts, text: &TextElement) {
    let size_mm = text.size * 25.4 / 72.0;
    let mut x_mm = page.mm(text.x);
    if let (Align::Center, Some(width)) = (text.align, text.width) {
        let cell = page.mm(width);
        let advance = text_width_mm(&text.text, text.size, text.font);
        x_mm += ((cell - advance) / 2.0).max(0.0);
    }
    let baseline = page.flip(text.y, size_mm * ASCENT);

    layer.set_fill_color(color(text.color));
    layer.use_text(
        text.text.as_str(),
        text.size,
        Mm(x_mm),
        Mm(baseline),
        fonts.get(text.font),
    );
}

fn draw_frame(layer: &PdfLayerReference, page: &Page, rect: (f32, f32, f32, f32), stroke: f32, rgb: Rgb) {
    let (x, y, w, h) = rect;
    let left = page.mm(x);
    let right = page.mm(x + w);
    let bottom = page.flip(y, page.mm(h));
    let top = bottom + page.mm(h);

    // Frame widths are given in the page unit
    let thickness = match page.unit {
        Unit::Point => stroke,
        Unit::Millimetre => Pt::from(Mm(stroke)).0,
    };
    layer.set_outline_color(color(rgb));
    layer.set_outline_thickness(thickness);
    layer.add_line(Line {
        points: vec![
            (Point::new(Mm(left), Mm(bottom)), false),
            (Point::new(Mm(right), Mm(bottom)), false),
            (Point::new(Mm(right), Mm(top)), false),
            (Point::new(Mm(left), Mm(top)), false),
        ],
        is_closed: true,
    });
}

#[allow(clippy::too_many_arguments)]
fn draw_image(
    layer: &PdfLayerReference,
    page: &Page,
    path: &Path,
    bytes: &[u8],
    x: f32,
    y: f32,
    width: Option<f32>,
    height: Option<f32>,
) -> Result<(), RenderError> {
    let decoded = image_crate::load_from_memory(bytes).map_err(|e| RenderError::Image {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    let natural_w = decoded.width() as f32 / IMAGE_DPI * 25.4;
    let natural_h = decoded.height() as f32 / IMAGE_DPI * 25.4;
    if natural_w <= 0.0 || natural_h <= 0.0 {
        return Ok(());
    }

    let target_w = width.map(|w| page.mm(w)).unwrap_or(natural_w);
    let target_h = height.map(|h| page.mm(h)).unwrap_or(natural_h);

    Image::from_dynamic_image(&decoded).add_to_layer(
        layer.clone(),
        ImageTransform {
            translate_x: Some(Mm(page.mm(x))),
            translate_y: Some(Mm(page.flip(y, target_h))),
            scale_x: Some(target_w / natural_w),
            scale_y: Some(target_h / natural_h),
            dpi: Some(IMAGE_DPI),
            ..Default::default()
        },
    );
    Ok(())
}

/// Write a plan to PDF bytes using preloaded picture contents
pub fn write_pdf(
    plan: &RenderPlan,
    images: &HashMap<PathBuf, Vec<u8>>,
) -> Result<Vec<u8>, RenderError> {
    let page = Page {
        unit: plan.unit,
        height_mm: plan.unit.to_mm(plan.page_height),
    };
    let width_mm = plan.unit.to_mm(plan.page_width);

    let (doc, page_index, layer_index) =
        PdfDocument::new(plan.title.as_str(), Mm(width_mm), Mm(page.height_mm), "Certificate");
    let layer = doc.get_page(page_index).get_layer(layer_index);
    let fonts = Fonts {
        helvetica: doc.add_builtin_font(BuiltinFont::Helvetica).map_err(pdf_error)?,
        times: doc.add_builtin_font(BuiltinFont::TimesRoman).map_err(pdf_error)?,
    };

    for element in &plan.elements {
        match element {
            Element::Image {
                path,
                x,
                y,
                width,
                height,
                ..
            } => {
                let bytes = images.get(path).ok_or_else(|| RenderError::Image {
                    path: path.display().to_string(),
                    message: "not loaded".to_string(),
                })?;
                draw_image(&layer, &page, path, bytes, *x, *y, *width, *height)?;
            }
            Element::Frame {
                x,
                y,
                w,
                h,
                stroke,
                color,
            } => draw_frame(&layer, &page, (*x, *y, *w, *h), *stroke, *color),
            Element::Text(text) => draw_text(&layer, &page, &fonts, text),
        }
    }

    doc.save_to_bytes().map_err(pdf_error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::rendering::{Field, TextElement};

    fn plan_with_text() -> RenderPlan {
        RenderPlan {
            title: "Intro".to_string(),
            unit: Unit::Millimetre,
            page_width: 297.0,
            page_height: 210.0,
            elements: vec![
                Element::Frame {
                    x: 10.0,
                    y: 10.0,
                    w: 277.0,
                    h: 190.0,
                    stroke: 1.5,
                    color: (0, 0, 0),
                },
                Element::Text(TextElement {
                    field: Field::Title,
                    text: "CERTIFICATE of ACHIEVEMENT".to_string(),
                    x: 10.0,
                    y: 30.0,
                    width: Some(277.0),
                    align: Align::Center,
                    font: Font::Helvetica,
                    size: 30.0,
                    color: (0, 0, 120),
                }),
            ],
        }
    }

    #[test]
    fn writes_a_pdf_document() {
        let bytes = write_pdf(&plan_with_text(), &HashMap::new()).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[tokio::test]
    async fn renders_off_the_async_worker() {
        let bytes = render_pdf(&plan_with_text()).await.unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn missing_picture_is_an_error() {
        let mut plan = plan_with_text();
        plan.elements.push(Element::Image {
            kind: crate::services::rendering::ImageKind::Seal,
            path: PathBuf::from("seals/none.png"),
            x: 0.0,
            y: 0.0,
            width: None,
            height: None,
        });
        assert!(matches!(
            write_pdf(&plan, &HashMap::new()),
            Err(RenderError::Image { .. })
        ));
    }

    #[test]
    fn wider_glyphs_take_more_room() {
        assert!(text_width_mm("WWW", 12.0, Font::Helvetica) > text_width_mm("iii", 12.0, Font::Helvetica));
    }
}
