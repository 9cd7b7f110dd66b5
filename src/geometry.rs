//! Page geometry – nominal paper sizes, orientation swap, margin box and
//! bleed box. All lengths are millimetres.

use serde::{Deserialize, Serialize};

/// Millimetres → PDF points.
pub const PT_PER_MM: f32 = 72.0 / 25.4;

/// Supported paper sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PageSize {
    A4,
    A5,
    B5,
    B6,
}

impl PageSize {
    pub fn parse(code: &str) -> Option<Self> {
        match code {
            "A4" => Some(Self::A4),
            "A5" => Some(Self::A5),
            "B5" => Some(Self::B5),
            "B6" => Some(Self::B6),
            _ => None,
        }
    }

    /// Lenient lookup: unrecognised codes resolve to A4 rather than failing.
    pub fn from_code_or_a4(code: &str) -> Self {
        Self::parse(code).unwrap_or_else(|| {
            log::debug!("unknown page size {code:?}, using A4");
            Self::A4
        })
    }

    pub fn code(self) -> &'static str {
        match self {
            Self::A4 => "A4",
            Self::A5 => "A5",
            Self::B5 => "B5",
            Self::B6 => "B6",
        }
    }

    /// Portrait width × height in millimetres (JIS B series for B5/B6).
    pub fn dimensions_mm(self) -> (f32, f32) {
        match self {
            Self::A4 => (210.0, 297.0),
            Self::A5 => (148.0, 210.0),
            Self::B5 => (182.0, 257.0),
            Self::B6 => (128.0, 182.0),
        }
    }
}

/// Page orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    /// Height > width (default).
    #[default]
    Portrait,
    /// Width and height swapped.
    Landscape,
}

impl Orientation {
    pub fn parse(code: &str) -> Option<Self> {
        match code {
            "portrait" => Some(Self::Portrait),
            "landscape" => Some(Self::Landscape),
            _ => None,
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Self::Portrait => "portrait",
            Self::Landscape => "landscape",
        }
    }
}

/// Four-sided offsets from the trim edge.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Margins {
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
    pub left: f32,
}

impl Margins {
    pub fn uniform(mm: f32) -> Self {
        Self {
            top: mm,
            right: mm,
            bottom: mm,
            left: mm,
        }
    }
}

/// Axis-aligned rectangle; origin at the trim box's top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Resolved physical page.
///
/// `width_mm`/`height_mm` are already orientation-swapped; consumers never
/// swap them again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageGeometry {
    pub width_mm: f32,
    pub height_mm: f32,
    pub margins: Margins,
    /// Text area: the trim box inset by `margins`.
    pub content: Rect,
    /// Trim box grown by the bleed on every side; only with crop marks.
    pub bleed_box: Option<Rect>,
}

impl PageGeometry {
    /// Resolve geometry for a paper size, orientation, margins and bleed.
    ///
    /// `bleed_mm` is ignored unless `crop_marks` is set.
    pub fn resolve(
        size: PageSize,
        orientation: Orientation,
        margins: Margins,
        bleed_mm: f32,
        crop_marks: bool,
    ) -> Self {
        let (w, h) = size.dimensions_mm();
        let (width_mm, height_mm) = match orientation {
            Orientation::Portrait => (w, h),
            Orientation::Landscape => (h, w),
        };

        let content = Rect {
            x: margins.left,
            y: margins.top,
            width: width_mm - margins.left - margins.right,
            height: height_mm - margins.top - margins.bottom,
        };

        let bleed_box = crop_marks.then(|| Rect {
            x: -bleed_mm,
            y: -bleed_mm,
            width: width_mm + 2.0 * bleed_mm,
            height: height_mm + 2.0 * bleed_mm,
        });

        log::debug!(
            "page {} {}: {width_mm}x{height_mm}mm, content {:.1}x{:.1}mm",
            size.code(),
            orientation.code(),
            content.width,
            content.height
        );

        Self {
            width_mm,
            height_mm,
            margins,
            content,
            bleed_box,
        }
    }

    /// Like [`PageGeometry::resolve`], taking the paper size as a raw code.
    pub fn resolve_code(
        code: &str,
        orientation: Orientation,
        margins: Margins,
        bleed_mm: f32,
        crop_marks: bool,
    ) -> Self {
        Self::resolve(
            PageSize::from_code_or_a4(code),
            orientation,
            margins,
            bleed_mm,
            crop_marks,
        )
    }

    /// The media box the PDF page must have: the bleed box when present,
    /// otherwise the trim box.
    pub fn media_mm(&self) -> (f32, f32) {
        match &self.bleed_box {
            Some(b) => (b.width, b.height),
            None => (self.width_mm, self.height_mm),
        }
    }

    /// Offset of the trim box inside the media box.
    pub fn trim_offset_mm(&self) -> f32 {
        self.bleed_box.map(|b| -b.x).unwrap_or(0.0)
    }
}
