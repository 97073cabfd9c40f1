//! Page geometry of the four certificate page variants
//!
//! Letter pages are measured in points, A4 pages in millimetres. Every
//! coordinate is from the top-left corner of the page.

use crate::models::{Orientation, PageTemplate};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unit {
    Point,
    Millimetre,
}

impl Unit {
    pub fn to_mm(self, value: f32) -> f32 {
        match self {
            Unit::Point => value * 25.4 / 72.0,
            Unit::Millimetre => value,
        }
    }

    /// Right-hand margin of centered text cells
    pub fn centimetre(self) -> f32 {
        match self {
            Unit::Point => 28.35,
            Unit::Millimetre => 10.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

const fn rect(x: f32, y: f32, w: f32, h: f32) -> Rect {
    Rect { x, y, w, h }
}

/// One stroked rectangle of the vector frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameLine {
    pub rect: Rect,
    pub width: f32,
}

const fn line(x: f32, y: f32, w: f32, h: f32, width: f32) -> FrameLine {
    FrameLine {
        rect: rect(x, y, w, h),
        width,
    }
}

/// Vertical offsets of the text block below the title
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextOffsets {
    pub certify: f32,
    pub name: f32,
    pub statement: f32,
    pub class: f32,
    pub date: f32,
    pub grade: f32,
    pub outcome: f32,
    pub hours: f32,
}

const LETTER_OFFSETS: TextOffsets = TextOffsets {
    certify: 55.0,
    name: 105.0,
    statement: 155.0,
    class: 205.0,
    date: 255.0,
    grade: 283.0,
    outcome: 311.0,
    hours: 339.0,
};

const A4_OFFSETS: TextOffsets = TextOffsets {
    certify: 20.0,
    name: 36.0,
    statement: 55.0,
    class: 72.0,
    date: 92.0,
    grade: 102.0,
    outcome: 112.0,
    hours: 122.0,
};

#[derive(Debug, Clone, PartialEq)]
pub struct Layout {
    pub unit: Unit,
    pub page_width: f32,
    pub page_height: f32,
    /// Origin of the text block
    pub x: f32,
    pub y: f32,
    pub seal: (f32, f32),
    pub signature: (f32, f32),
    pub custom: (f32, f32),
    pub watermark: Rect,
    pub border: Rect,
    pub code_y: f32,
    pub offsets: TextOffsets,
    /// Distance between typed signer names
    pub signer_step: f32,
    /// Outer, middle and inner frame lines
    pub frame: [FrameLine; 3],
}

static LETTER_LANDSCAPE: Layout = Layout {
    unit: Unit::Point,
    page_width: 792.0,
    page_height: 612.0,
    x: 28.0,
    y: 125.0,
    seal: (590.0, 425.0),
    signature: (130.0, 440.0),
    custom: (133.0, 440.0),
    watermark: rect(100.0, 90.0, 600.0, 420.0),
    border: rect(0.0, 0.0, 792.0, 612.0),
    code_y: 505.0,
    offsets: LETTER_OFFSETS,
    signer_step: 12.0,
    frame: [
        line(28.0, 28.0, 736.0, 556.0, 4.25),
        line(37.0, 37.0, 718.0, 538.0, 0.2),
        line(46.0, 46.0, 700.0, 520.0, 2.8),
    ],
};

static LETTER_PORTRAIT: Layout = Layout {
    unit: Unit::Point,
    page_width: 612.0,
    page_height: 792.0,
    x: 28.0,
    y: 170.0,
    seal: (440.0, 590.0),
    signature: (85.0, 580.0),
    custom: (88.0, 580.0),
    watermark: rect(78.0, 130.0, 450.0, 480.0),
    border: rect(10.0, 10.0, 594.0, 771.0),
    code_y: 660.0,
    offsets: LETTER_OFFSETS,
    signer_step: 12.0,
    frame: [
        line(25.0, 20.0, 561.0, 751.0, 1.5),
        line(40.0, 35.0, 531.0, 721.0, 0.2),
        line(51.0, 46.0, 509.0, 699.0, 1.0),
    ],
};

static A4_LANDSCAPE: Layout = Layout {
    unit: Unit::Millimetre,
    page_width: 297.0,
    page_height: 210.0,
    x: 10.0,
    y: 30.0,
    seal: (230.0, 150.0),
    signature: (47.0, 155.0),
    custom: (47.0, 155.0),
    watermark: rect(40.0, 31.0, 212.0, 148.0),
    border: rect(0.0, 0.0, 297.0, 210.0),
    code_y: 175.0,
    offsets: A4_OFFSETS,
    signer_step: 4.0,
    frame: [
        line(10.0, 10.0, 277.0, 190.0, 1.5),
        line(13.0, 13.0, 271.0, 184.0, 0.2),
        line(16.0, 16.0, 265.0, 178.0, 1.0),
    ],
};

static A4_PORTRAIT: Layout = Layout {
    unit: Unit::Millimetre,
    page_width: 210.0,
    page_height: 297.0,
    x: 10.0,
    y: 40.0,
    seal: (150.0, 220.0),
    signature: (30.0, 230.0),
    custom: (30.0, 230.0),
    watermark: rect(26.0, 58.0, 158.0, 170.0),
    border: rect(0.0, 0.0, 210.0, 297.0),
    code_y: 250.0,
    offsets: A4_OFFSETS,
    signer_step: 4.0,
    frame: [
        line(10.0, 10.0, 190.0, 277.0, 1.5),
        line(13.0, 13.0, 184.0, 271.0, 0.2),
        line(16.0, 16.0, 178.0, 265.0, 1.0),
    ],
};

impl Layout {
    pub fn for_page(template: PageTemplate, orientation: Orientation) -> &'static Layout {
        match (template, orientation) {
            (PageTemplate::Letter, Orientation::Landscape) => &LETTER_LANDSCAPE,
            (PageTemplate::Letter, Orientation::Portrait) => &LETTER_PORTRAIT,
            (PageTemplate::A4, Orientation::Landscape) => &A4_LANDSCAPE,
            (PageTemplate::A4, Orientation::Portrait) => &A4_PORTRAIT,
        }
    }

    /// Width of a text cell starting at `x` and ending at the right margin
    pub fn cell_width(&self, x: f32) -> f32 {
        (self.page_width - self.unit.centimetre() - x).max(0.0)
    }
}
