//! Certificate layout as a list of drawing elements
//!
//! [`plan`] is a pure function from a definition, its resolved visual slots
//! and the printed values to a [`RenderPlan`]. Writing the plan to PDF is
//! left to [`crate::external::pdf`].

use std::path::PathBuf;

use serde::Serialize;

use super::layout::{FrameLine, Layout, Unit};
use crate::models::{CertificateDefinition, CertificateStrings};

pub type Rgb = (u8, u8, u8);

const BLACK: Rgb = (0, 0, 0);
const TITLE_BLUE: Rgb = (0, 0, 120);

/// How an optional picture slot resolved
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum VisualSlot {
    None,
    Image(PathBuf),
    /// Typed names instead of a picture, used for signatures
    Fallback(Vec<String>),
}

/// The four picture slots of a certificate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisualSlots {
    pub border: VisualSlot,
    pub watermark: VisualSlot,
    pub seal: VisualSlot,
    pub signature: VisualSlot,
}

impl VisualSlots {
    pub fn none() -> Self {
        Self {
            border: VisualSlot::None,
            watermark: VisualSlot::None,
            seal: VisualSlot::None,
            signature: VisualSlot::None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageKind {
    Border,
    Watermark,
    Seal,
    Signature,
}

/// Meaning of a text element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Title,
    CertifyPhrase,
    StudentName,
    ClassName,
    Date,
    Grade,
    Outcome,
    CreditHours,
    Code,
    SignerName,
    CustomText,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Align {
    Left,
    Center,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Font {
    Helvetica,
    Times,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextElement {
    pub field: Field,
    pub text: String,
    pub x: f32,
    pub y: f32,
    /// Cell width for centered text, `None` for free-running text
    pub width: Option<f32>,
    pub align: Align,
    pub font: Font,
    /// Font size in points, whatever the page unit
    pub size: f32,
    pub color: Rgb,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "element", rename_all = "snake_case")]
pub enum Element {
    Image {
        kind: ImageKind,
        path: PathBuf,
        x: f32,
        y: f32,
        /// `None` keeps the picture's natural size
        width: Option<f32>,
        height: Option<f32>,
    },
    Frame {
        x: f32,
        y: f32,
        w: f32,
        h: f32,
        stroke: f32,
        color: Rgb,
    },
    Text(TextElement),
}

/// Everything needed to draw one certificate page
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderPlan {
    pub title: String,
    #[serde(skip)]
    pub unit: Unit,
    pub page_width: f32,
    pub page_height: f32,
    pub elements: Vec<Element>,
}

impl RenderPlan {
    /// Text fields in drawing order
    pub fn fields(&self) -> Vec<Field> {
        self.texts().map(|t| t.field).collect()
    }

    /// Image kinds in drawing order
    pub fn images(&self) -> Vec<ImageKind> {
        self.elements
            .iter()
            .filter_map(|e| match e {
                Element::Image { kind, .. } => Some(*kind),
                _ => None,
            })
            .collect()
    }

    pub fn texts(&self) -> impl Iterator<Item = &TextElement> {
        self.elements.iter().filter_map(|e| match e {
            Element::Text(text) => Some(text),
            _ => None,
        })
    }

    /// Texts of a field in drawing order
    pub fn text_of(&self, field: Field) -> Vec<&str> {
        self.texts()
            .filter(|t| t.field == field)
            .map(|t| t.text.as_str())
            .collect()
    }
}

/// Values printed on one certificate, already formatted
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CertificateContent {
    pub student_name: String,
    pub class_name: String,
    pub date: String,
    /// Complete grade line, e.g. `Course Grade:  85.00`
    pub grade: Option<String>,
    pub outcome: Option<String>,
    pub credit_hours: Option<String>,
    pub code: Option<String>,
    pub custom_text: Option<String>,
}

struct Builder<'a> {
    layout: &'a Layout,
    elements: Vec<Element>,
}

impl<'a> Builder<'a> {
    fn image(&mut self, kind: ImageKind, slot: &VisualSlot, at: (f32, f32), size: Option<(f32, f32)>) {
        if let VisualSlot::Image(path) = slot {
            self.elements.push(Element::Image {
                kind,
                path: path.clone(),
                x: at.0,
                y: at.1,
                width: size.map(|s| s.0),
                height: size.map(|s| s.1),
            });
        }
    }

    fn frame(&mut self, line: &FrameLine, color: Rgb) {
        self.elements.push(Element::Frame {
            x: line.rect.x,
            y: line.rect.y,
            w: line.rect.w,
            h: line.rect.h,
            stroke: line.width,
            color,
        });
    }

    fn centered(&mut self, field: Field, text: &str, dy: f32, font: Font, size: f32, color: Rgb) {
        let x = self.layout.x;
        self.elements.push(Element::Text(TextElement {
            field,
            text: text.to_string(),
            x,
            y: self.layout.y + dy,
            width: Some(self.layout.cell_width(x)),
            align: Align::Center,
            font,
            size,
            color,
        }));
    }

    fn left(&mut self, field: Field, text: &str, at: (f32, f32), font: Font, size: f32) {
        self.elements.push(Element::Text(TextElement {
            field,
            text: text.to_string(),
            x: at.0,
            y: at.1,
            width: None,
            align: Align::Left,
            font,
            size,
            color: BLACK,
        }));
    }
}

/// Lay out a certificate page
pub fn plan(
    definition: &CertificateDefinition,
    slots: &VisualSlots,
    content: &CertificateContent,
    strings: &CertificateStrings,
) -> RenderPlan {
    let layout = Layout::for_page(definition.template, definition.orientation);
    let offsets = layout.offsets;
    let mut b = Builder {
        layout,
        elements: Vec::new(),
    };

    // Pictures and frame
    let border = layout.border;
    b.image(
        ImageKind::Border,
        &slots.border,
        (border.x, border.y),
        Some((border.w, border.h)),
    );
    if let Some(color) = definition.border_color.rgb() {
        for line in &layout.frame {
            b.frame(line, color);
        }
    }
    let watermark = layout.watermark;
    b.image(
        ImageKind::Watermark,
        &slots.watermark,
        (watermark.x, watermark.y),
        Some((watermark.w, watermark.h)),
    );
    b.image(ImageKind::Seal, &slots.seal, layout.seal, None);
    match &slots.signature {
        VisualSlot::Image(_) => {
            b.image(ImageKind::Signature, &slots.signature, layout.signature, None)
        }
        VisualSlot::Fallback(names) => {
            let (sx, sy) = layout.signature;
            for (i, name) in names.iter().enumerate() {
                let dy = (i as f32 + 1.0) * layout.signer_step;
                b.left(Field::SignerName, name, (sx, sy + dy), Font::Times, 12.0);
            }
        }
        VisualSlot::None => {}
    }

    // Always-present text
    b.centered(Field::Title, &strings.title, 0.0, Font::Helvetica, 30.0, TITLE_BLUE);
    b.centered(
        Field::CertifyPhrase,
        &strings.certify,
        offsets.certify,
        Font::Times,
        20.0,
        BLACK,
    );
    b.centered(
        Field::StudentName,
        &content.student_name,
        offsets.name,
        Font::Helvetica,
        30.0,
        BLACK,
    );
    b.centered(
        Field::CertifyPhrase,
        &strings.statement,
        offsets.statement,
        Font::Helvetica,
        20.0,
        BLACK,
    );
    b.centered(
        Field::ClassName,
        &content.class_name,
        offsets.class,
        Font::Helvetica,
        20.0,
        BLACK,
    );
    b.centered(Field::Date, &content.date, offsets.date, Font::Helvetica, 14.0, BLACK);

    // Optional lines
    let optional = [
        (Field::Grade, &content.grade, offsets.grade),
        (Field::Outcome, &content.outcome, offsets.outcome),
        (Field::CreditHours, &content.credit_hours, offsets.hours),
    ];
    for (field, text, dy) in optional {
        if let Some(text) = text.as_deref().filter(|t| !t.is_empty()) {
            b.centered(field, text, dy, Font::Times, 10.0, BLACK);
        }
    }
    if let Some(code) = content.code.as_deref().filter(|c| !c.is_empty()) {
        b.centered(Field::Code, code, layout.code_y - layout.y, Font::Times, 10.0, BLACK);
    }
    if let Some(custom) = content.custom_text.as_deref().filter(|c| !c.is_empty()) {
        b.left(Field::CustomText, custom, layout.custom, Font::Times, 10.0);
    }

    RenderPlan {
        title: definition.name.clone(),
        unit: layout.unit,
        page_width: layout.page_width,
        page_height: layout.page_height,
        elements: b.elements,
    }
}
