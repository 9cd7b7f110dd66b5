//! Layout document – the frozen structure handed to a renderer, and the
//! builder that assembles it from validated settings.
//!
//! Building runs the pure stages in order: geometry → segmentation →
//! numeral combining per line → column plan → page estimate. Nothing here
//! touches a renderer or the file system.

use serde::{Deserialize, Serialize};

use crate::columns::{plan_columns, ColumnSpec, ColumnWarning};
use crate::error::Result;
use crate::estimate::estimate_content_pages;
use crate::fonts::font_stack;
use crate::geometry::{Margins, PageGeometry, Rect};
use crate::numerals::combine_numerals;
use crate::segment::segment;
use crate::settings::{ColorMode, FontFamily, ManuscriptSettings, ValidatedSettings, WritingMode};

/// PDF title used when the manuscript has none.
pub const UNTITLED: &str = "原稿";

/// One inline run of a line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "text", rename_all = "lowercase")]
pub enum InlineRun {
    /// Ordinary text.
    Text(String),
    /// Digits set upright in a single cell.
    Combined(String),
}

impl InlineRun {
    pub fn text(&self) -> &str {
        match self {
            InlineRun::Text(s) | InlineRun::Combined(s) => s,
        }
    }

    pub fn is_combined(&self) -> bool {
        matches!(self, InlineRun::Combined(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Line {
    pub runs: Vec<InlineRun>,
}

impl Line {
    pub fn from_text(text: &str) -> Self {
        Self {
            runs: combine_numerals(text),
        }
    }

    pub fn text(&self) -> String {
        self.runs.iter().map(InlineRun::text).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Paragraph {
    pub lines: Vec<Line>,
}

impl Paragraph {
    pub fn text(&self) -> String {
        self.lines
            .iter()
            .map(Line::text)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// A complete manuscript layout ready for rendering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutDocument {
    pub title: Option<String>,
    pub author: Option<String>,
    pub paragraphs: Vec<Paragraph>,
    pub geometry: PageGeometry,
    pub columns: ColumnSpec,
    pub writing_mode: WritingMode,
    pub font_family: FontFamily,
    /// Points.
    pub font_size: f32,
    /// Multiplier of the font size.
    pub line_height: f32,
}

/// Page box, column plan and mode flags for the renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderDirective {
    /// PDF metadata title.
    pub title: String,
    pub page_width_mm: f32,
    pub page_height_mm: f32,
    pub margins: Margins,
    pub bleed_box: Option<Rect>,
    pub columns: ColumnSpec,
    /// Vertical-rl writing with mixed text orientation.
    pub vertical: bool,
    pub font_stack: String,
    pub color_mode: ColorMode,
    pub crop_marks: bool,
    pub print_background: bool,
}

/// Everything the builder produces for one request.
#[derive(Debug, Clone, PartialEq)]
pub struct Layout {
    pub document: LayoutDocument,
    pub directive: RenderDirective,
    pub estimated_pages: u32,
    pub warnings: Vec<ColumnWarning>,
}

impl LayoutDocument {
    /// Serialise to JSON.
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }

    /// Deserialise from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Number of combined-numeral runs.
    pub fn combined_count(&self) -> usize {
        self.paragraphs
            .iter()
            .flat_map(|p| &p.lines)
            .flat_map(|l| &l.runs)
            .filter(|r| r.is_combined())
            .count()
    }
}

/// Validate raw settings and build the layout.
pub fn build_layout(settings: &ManuscriptSettings) -> Result<Layout> {
    let validated = settings.validate()?;
    Ok(build_validated(&validated))
}

/// Build the layout from already-validated settings. Infallible.
pub fn build_validated(s: &ValidatedSettings) -> Layout {
    let geometry = PageGeometry::resolve(
        s.page_size,
        s.orientation,
        s.margins,
        s.bleed_mm,
        s.crop_marks,
    );

    let paragraphs: Vec<Paragraph> = segment(&s.content)
        .iter()
        .map(|raw| Paragraph {
            lines: raw.lines.iter().map(|l| Line::from_text(l)).collect(),
        })
        .collect();

    let plan = plan_columns(&geometry, s.writing_mode, s.columns, s.column_gap_mm);
    let estimated_pages = estimate_content_pages(&s.content, s.page_size, s.columns);

    let directive = RenderDirective {
        title: s.title.clone().unwrap_or_else(|| UNTITLED.to_string()),
        page_width_mm: geometry.width_mm,
        page_height_mm: geometry.height_mm,
        margins: geometry.margins,
        bleed_box: geometry.bleed_box,
        columns: plan.spec.clone(),
        vertical: s.writing_mode.is_vertical(),
        font_stack: font_stack(s.font_family).to_string(),
        color_mode: s.color_mode,
        crop_marks: s.crop_marks,
        print_background: true,
    };

    let document = LayoutDocument {
        title: s.title.clone(),
        author: s.author.clone(),
        paragraphs,
        geometry,
        columns: plan.spec,
        writing_mode: s.writing_mode,
        font_family: s.font_family,
        font_size: s.font_size,
        line_height: s.line_height,
    };

    log::debug!(
        "built layout: {} paragraphs, {} combined numerals, ~{} pages",
        document.paragraphs.len(),
        document.combined_count(),
        estimated_pages
    );

    Layout {
        document,
        directive,
        estimated_pages,
        warnings: plan.warning.into_iter().collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn settings(content: &str) -> ManuscriptSettings {
        ManuscriptSettings::with_content(content)
    }

    #[test]
    fn builds_paragraphs_with_combined_numerals() {
        let layout = build_layout(&settings(
            "第1章\n\n吾輩は猫である12345。\n\n吾輩は猫である。",
        ))
        .unwrap();
        let doc = &layout.document;
        assert_eq!(doc.paragraphs.len(), 3);
        assert_eq!(
            doc.paragraphs[1].lines[0].runs,
            vec![
                InlineRun::Text("吾輩は猫である".into()),
                InlineRun::Text("12345".into()),
                InlineRun::Text("。".into()),
            ]
        );
        assert_eq!(doc.combined_count(), 1);
    }

    #[test]
    fn directive_mirrors_geometry() {
        let mut s = settings("本文");
        s.orientation = "landscape".into();
        s.crop_marks = true;
        s.writing_mode = "horizontal".into();
        let layout = build_layout(&s).unwrap();
        let d = &layout.directive;
        assert_eq!((d.page_width_mm, d.page_height_mm), (297.0, 210.0));
        assert!(d.bleed_box.is_some());
        assert!(!d.vertical);
        assert_eq!(d.title, UNTITLED);
        assert_eq!(layout.document.geometry.width_mm, 297.0);
    }

    #[test]
    fn propagates_validation_errors() {
        assert!(matches!(
            build_layout(&settings("   ")).unwrap_err(),
            Error::EmptyContent
        ));
        let mut s = settings("x");
        s.columns = 4;
        assert!(matches!(
            build_layout(&s).unwrap_err(),
            Error::Validation { field: "columns", .. }
        ));
    }

    #[test]
    fn column_warning_is_collected() {
        let mut s = settings("x");
        s.page_size = "B6".into();
        s.margin_left = 50.0;
        s.margin_right = 50.0;
        s.writing_mode = "horizontal".into();
        s.columns = 3;
        s.column_gap = 20.0;
        let layout = build_layout(&s).unwrap();
        assert_eq!(layout.warnings.len(), 1);
        assert_eq!(layout.document.columns.width_mm, 0.0);
    }

    #[test]
    fn json_roundtrip() {
        let layout = build_layout(&settings("今日は5月3日です。\n二行目")).unwrap();
        let json = layout.document.to_json();
        assert!(json.contains(r#""kind": "combined""#));
        assert!(json.contains(r#""writingMode": "vertical""#));
        let parsed = LayoutDocument::from_json(&json).unwrap();
        assert_eq!(parsed, layout.document);
    }

    #[test]
    fn estimate_uses_trimmed_content() {
        let body = format!("\n\n{}\n\n", "あ".repeat(2500));
        let layout = build_layout(&settings(&body)).unwrap();
        assert_eq!(layout.estimated_pages, 3);
    }
}
