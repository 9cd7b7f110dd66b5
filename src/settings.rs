//! Manuscript settings as they arrive from a request, and the validator that
//! turns them into [`ValidatedSettings`].
//!
//! Enum-valued settings are kept as strings in [`ManuscriptSettings`] so an
//! unknown value reaches the validator and is reported against its field,
//! instead of failing deserialisation of the whole request.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::geometry::{Margins, Orientation, PageSize};

pub const FONT_SIZE_MIN: f64 = 6.0;
pub const FONT_SIZE_MAX: f64 = 72.0;
pub const FONT_SIZE_STEP: f64 = 0.5;
pub const LINE_HEIGHT_MIN: f64 = 1.0;
pub const LINE_HEIGHT_MAX: f64 = 3.0;
pub const MARGIN_MAX_MM: f64 = 50.0;
pub const COLUMN_GAP_MAX_MM: f64 = 20.0;

/// Raw typographic and page settings, camelCase on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ManuscriptSettings {
    pub title: String,
    pub author: String,
    pub content: String,

    /// Points.
    pub font_size: f64,
    /// Multiplier of the font size.
    pub line_height: f64,
    /// Millimetres.
    pub margin_top: f64,
    pub margin_bottom: f64,
    pub margin_left: f64,
    pub margin_right: f64,

    pub writing_mode: String,
    pub font_family: String,

    pub columns: i64,
    /// Millimetres.
    pub column_gap: f64,

    pub page_size: String,
    pub orientation: String,

    /// Millimetres of print bleed.
    pub bleed: f64,
    pub crop_marks: bool,
    pub color_mode: String,
}

impl Default for ManuscriptSettings {
    fn default() -> Self {
        Self {
            title: String::new(),
            author: String::new(),
            content: String::new(),
            font_size: 10.5,
            line_height: 1.8,
            margin_top: 20.0,
            margin_bottom: 20.0,
            margin_left: 20.0,
            margin_right: 20.0,
            writing_mode: WritingMode::Vertical.code().to_string(),
            font_family: FontFamily::Mincho.code().to_string(),
            columns: 1,
            column_gap: 10.0,
            page_size: PageSize::A4.code().to_string(),
            orientation: Orientation::Portrait.code().to_string(),
            bleed: 3.0,
            crop_marks: false,
            color_mode: ColorMode::Cmyk.code().to_string(),
        }
    }
}

impl ManuscriptSettings {
    /// Default settings carrying the given body text.
    pub fn with_content(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Self::default()
        }
    }

    /// Check every setting and return the typed form.
    pub fn validate(&self) -> Result<ValidatedSettings> {
        validate(self)
    }
}

/// Text flow direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WritingMode {
    /// Top to bottom, lines progressing right to left.
    Vertical,
    /// Left to right, lines progressing top to bottom.
    Horizontal,
}

impl WritingMode {
    pub fn parse(code: &str) -> Option<Self> {
        match code {
            "vertical" => Some(Self::Vertical),
            "horizontal" => Some(Self::Horizontal),
            _ => None,
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Self::Vertical => "vertical",
            Self::Horizontal => "horizontal",
        }
    }

    pub fn is_vertical(self) -> bool {
        self == Self::Vertical
    }
}

/// Typeface class; mapped to concrete font stacks by [`crate::fonts`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontFamily {
    Mincho,
    Gothic,
    Mono,
}

impl FontFamily {
    pub fn parse(code: &str) -> Option<Self> {
        match code {
            "mincho" => Some(Self::Mincho),
            "gothic" => Some(Self::Gothic),
            "mono" => Some(Self::Mono),
            _ => None,
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Self::Mincho => "mincho",
            Self::Gothic => "gothic",
            Self::Mono => "mono",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColorMode {
    #[serde(rename = "CMYK")]
    Cmyk,
    #[serde(rename = "RGB")]
    Rgb,
    Grayscale,
}

impl ColorMode {
    pub fn parse(code: &str) -> Option<Self> {
        match code {
            "CMYK" => Some(Self::Cmyk),
            "RGB" => Some(Self::Rgb),
            "Grayscale" => Some(Self::Grayscale),
            _ => None,
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Self::Cmyk => "CMYK",
            Self::Rgb => "RGB",
            Self::Grayscale => "Grayscale",
        }
    }
}

/// Settings that passed [`validate`]. Content is already trimmed.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedSettings {
    pub title: Option<String>,
    pub author: Option<String>,
    pub content: String,
    pub font_size: f32,
    pub line_height: f32,
    pub margins: Margins,
    pub writing_mode: WritingMode,
    pub font_family: FontFamily,
    pub columns: u8,
    pub column_gap_mm: f32,
    pub page_size: PageSize,
    pub orientation: Orientation,
    pub bleed_mm: f32,
    pub crop_marks: bool,
    pub color_mode: ColorMode,
}

/// Validate raw settings, reporting the first offending field.
pub fn validate(raw: &ManuscriptSettings) -> Result<ValidatedSettings> {
    let content = raw.content.trim();
    if content.is_empty() {
        return Err(Error::EmptyContent);
    }

    let page_size = parse_enum("pageSize", &raw.page_size, PageSize::parse, "A4, A5, B5, B6")?;
    let orientation = parse_enum(
        "orientation",
        &raw.orientation,
        Orientation::parse,
        "portrait, landscape",
    )?;
    let writing_mode = parse_enum(
        "writingMode",
        &raw.writing_mode,
        WritingMode::parse,
        "vertical, horizontal",
    )?;
    let font_family = parse_enum(
        "fontFamily",
        &raw.font_family,
        FontFamily::parse,
        "mincho, gothic, mono",
    )?;
    let color_mode = parse_enum(
        "colorMode",
        &raw.color_mode,
        ColorMode::parse,
        "CMYK, RGB, Grayscale",
    )?;

    check_range("fontSize", raw.font_size, FONT_SIZE_MIN, FONT_SIZE_MAX)?;
    if !is_multiple_of(raw.font_size, FONT_SIZE_STEP) {
        return Err(Error::invalid(
            "fontSize",
            format!("{} is not a multiple of {FONT_SIZE_STEP}pt", raw.font_size),
        ));
    }
    check_range("lineHeight", raw.line_height, LINE_HEIGHT_MIN, LINE_HEIGHT_MAX)?;

    for (field, value) in [
        ("marginTop", raw.margin_top),
        ("marginBottom", raw.margin_bottom),
        ("marginLeft", raw.margin_left),
        ("marginRight", raw.margin_right),
    ] {
        check_range(field, value, 0.0, MARGIN_MAX_MM)?;
        if value.fract() != 0.0 {
            return Err(Error::invalid(
                field,
                format!("{value} is not a whole number of millimetres"),
            ));
        }
    }

    let columns = match raw.columns {
        1..=3 => raw.columns as u8,
        other => {
            return Err(Error::invalid(
                "columns",
                format!("{other} is not one of 1, 2, 3"),
            ))
        }
    };
    check_range("columnGap", raw.column_gap, 0.0, COLUMN_GAP_MAX_MM)?;

    if !raw.bleed.is_finite() || raw.bleed < 0.0 {
        return Err(Error::invalid(
            "bleed",
            format!("{} must be zero or more", raw.bleed),
        ));
    }

    Ok(ValidatedSettings {
        title: non_blank(&raw.title),
        author: non_blank(&raw.author),
        content: content.to_string(),
        font_size: raw.font_size as f32,
        line_height: raw.line_height as f32,
        margins: Margins {
            top: raw.margin_top as f32,
            right: raw.margin_right as f32,
            bottom: raw.margin_bottom as f32,
            left: raw.margin_left as f32,
        },
        writing_mode,
        font_family,
        columns,
        column_gap_mm: raw.column_gap as f32,
        page_size,
        orientation,
        bleed_mm: raw.bleed as f32,
        crop_marks: raw.crop_marks,
        color_mode,
    })
}

fn parse_enum<T>(
    field: &'static str,
    value: &str,
    parse: impl Fn(&str) -> Option<T>,
    allowed: &str,
) -> Result<T> {
    parse(value).ok_or_else(|| Error::invalid(field, format!("{value:?} is not one of {allowed}")))
}

fn check_range(field: &'static str, value: f64, min: f64, max: f64) -> Result<()> {
    // NaN fails `contains`, so non-finite input is rejected here too.
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(Error::invalid(
            field,
            format!("{value} must be between {min} and {max}"),
        ))
    }
}

fn is_multiple_of(value: f64, step: f64) -> bool {
    let n = value / step;
    (n - n.round()).abs() < 1e-9
}

fn non_blank(s: &str) -> Option<String> {
    let t = s.trim();
    (!t.is_empty()).then(|| t.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field_of(err: Error) -> &'static str {
        match err {
            Error::Validation { field, .. } => field,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn defaults_with_content_are_valid() {
        let v = ManuscriptSettings::with_content("  本文  ").validate().unwrap();
        assert_eq!(v.content, "本文");
        assert_eq!(v.page_size, PageSize::A4);
        assert_eq!(v.writing_mode, WritingMode::Vertical);
        assert_eq!(v.color_mode, ColorMode::Cmyk);
        assert_eq!(v.title, None);
    }

    #[test]
    fn whitespace_content_is_empty_content() {
        let err = ManuscriptSettings::with_content(" \n\t ").validate().unwrap_err();
        assert!(matches!(err, Error::EmptyContent));
    }

    #[test]
    fn empty_content_wins_over_bad_enums() {
        let mut s = ManuscriptSettings::default();
        s.page_size = "Letter".into();
        assert!(matches!(s.validate().unwrap_err(), Error::EmptyContent));
    }

    #[test]
    fn check_order_reports_first_field() {
        let mut s = ManuscriptSettings::with_content("x");
        s.orientation = "sideways".into();
        s.font_size = 100.0;
        s.columns = 7;
        assert_eq!(field_of(s.validate().unwrap_err()), "orientation");

        s.orientation = "landscape".into();
        assert_eq!(field_of(s.validate().unwrap_err()), "fontSize");

        s.font_size = 12.0;
        assert_eq!(field_of(s.validate().unwrap_err()), "columns");
    }

    #[test]
    fn unknown_enum_values() {
        let cases: [(&str, fn(&mut ManuscriptSettings)); 5] = [
            ("pageSize", |s| s.page_size = "Letter".into()),
            ("orientation", |s| s.orientation = "Portrait".into()),
            ("writingMode", |s| s.writing_mode = "diagonal".into()),
            ("fontFamily", |s| s.font_family = "serif".into()),
            ("colorMode", |s| s.color_mode = "cmyk".into()),
        ];
        for (field, mutate) in cases {
            let mut s = ManuscriptSettings::with_content("x");
            mutate(&mut s);
            assert_eq!(field_of(s.validate().unwrap_err()), field);
        }
    }

    #[test]
    fn numeric_bounds_are_inclusive() {
        let mut s = ManuscriptSettings::with_content("x");
        s.font_size = 6.0;
        s.line_height = 3.0;
        s.margin_top = 0.0;
        s.margin_right = 50.0;
        s.column_gap = 20.0;
        s.bleed = 0.0;
        s.columns = 3;
        assert!(s.validate().is_ok());

        s.line_height = 3.01;
        assert_eq!(field_of(s.validate().unwrap_err()), "lineHeight");
    }

    #[test]
    fn font_size_step() {
        let mut s = ManuscriptSettings::with_content("x");
        s.font_size = 10.5;
        assert!(s.validate().is_ok());
        s.font_size = 10.3;
        assert_eq!(field_of(s.validate().unwrap_err()), "fontSize");
    }

    #[test]
    fn margins_checked_in_order_and_whole() {
        let mut s = ManuscriptSettings::with_content("x");
        s.margin_left = 51.0;
        s.margin_right = -1.0;
        assert_eq!(field_of(s.validate().unwrap_err()), "marginLeft");

        s.margin_left = 12.5;
        assert_eq!(field_of(s.validate().unwrap_err()), "marginLeft");
    }

    #[test]
    fn nan_and_negative_bleed() {
        let mut s = ManuscriptSettings::with_content("x");
        s.column_gap = f64::NAN;
        assert_eq!(field_of(s.validate().unwrap_err()), "columnGap");

        s.column_gap = 5.0;
        s.bleed = -0.5;
        assert_eq!(field_of(s.validate().unwrap_err()), "bleed");
    }

    #[test]
    fn camel_case_wire_format_with_defaults() {
        let json = r#"{"content":"本文","fontSize":12,"marginTop":15,"cropMarks":true,"colorMode":"Grayscale"}"#;
        let s: ManuscriptSettings = serde_json::from_str(json).unwrap();
        assert_eq!(s.font_size, 12.0);
        assert_eq!(s.margin_top, 15.0);
        assert_eq!(s.margin_bottom, 20.0);
        assert!(s.crop_marks);
        let v = s.validate().unwrap();
        assert_eq!(v.color_mode, ColorMode::Grayscale);
    }

    #[test]
    fn blank_title_becomes_none() {
        let mut s = ManuscriptSettings::with_content("x");
        s.title = "  ".into();
        s.author = " 夏目漱石 ".into();
        let v = s.validate().unwrap();
        assert_eq!(v.title, None);
        assert_eq!(v.author.as_deref(), Some("夏目漱石"));
    }
}
