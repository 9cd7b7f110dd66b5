//! Grid flow – places a [`LayoutDocument`] onto pages for the bundled
//! printpdf backend.
//!
//! This is deliberately simple typesetting: every character occupies one
//! cell (a full em along the line in vertical text, its measured advance in
//! horizontal text), lines wrap at the column length, and columns fill in
//! order with the last page balanced across columns. There is no shaping,
//! kerning or hyphenation.
//!
//! Coordinates are points with the origin at the top-left of the *media*
//! box (the bleed box when crop marks are on).

use crate::document::{InlineRun, LayoutDocument};
use crate::fonts::FontManager;
use crate::geometry::PT_PER_MM;
use crate::settings::WritingMode;

const TITLE_SCALE: f32 = 1.4;
const AUTHOR_SCALE: f32 = 1.1;

/// Characters that must not start a line; they hang on the previous one.
const NO_LINE_START: &[char] = &[
    '。', '、', '，', '．', '」', '』', '）', '】', '〕', '！', '？', 'ー', 'っ', 'ゃ', 'ゅ', 'ょ',
    ',', '.', ')', '!', '?',
];

/// One drawn glyph cell.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedGlyph {
    /// Left edge of the text.
    pub x: f32,
    /// Top edge of the text's em box.
    pub y: f32,
    pub size: f32,
    pub text: String,
    /// Combined numeral drawn horizontally inside a vertical cell.
    pub combined: bool,
}

/// Glyphs of one physical page.
#[derive(Debug, Clone, PartialEq)]
pub struct PagePlan {
    pub page_index: usize,
    pub glyphs: Vec<PlacedGlyph>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Align {
    Start,
    Center,
}

#[derive(Debug, Clone)]
struct Cell {
    text: String,
    /// Extent along the line, in points.
    advance: f32,
    combined: bool,
}

/// A line after wrapping to the column length.
#[derive(Debug, Clone)]
struct VisualLine {
    cells: Vec<Cell>,
    size: f32,
    /// Extent across the line, in points.
    pitch: f32,
    indent: f32,
    align: Align,
}

impl VisualLine {
    fn blank(size: f32, pitch: f32) -> Self {
        Self {
            cells: Vec::new(),
            size,
            pitch,
            indent: 0.0,
            align: Align::Start,
        }
    }

    fn length(&self) -> f32 {
        self.indent + self.cells.iter().map(|c| c.advance).sum::<f32>()
    }
}

/// Paginate the document into glyph placements.
pub fn flow_document(doc: &LayoutDocument, fonts: &FontManager) -> Vec<PagePlan> {
    let frame = Frame::new(doc);
    let lines = build_lines(doc, fonts, frame.column_length);
    let columns = split_columns(&lines, frame.column_breadth, usize::from(frame.count));

    let mut pages: Vec<PagePlan> = Vec::new();
    for (i, column) in columns.iter().enumerate() {
        let page_index = i / usize::from(frame.count);
        let slot = i % usize::from(frame.count);
        if pages.len() <= page_index {
            pages.push(PagePlan {
                page_index,
                glyphs: Vec::new(),
            });
        }
        let page = &mut pages[page_index];
        frame.place_column(doc.writing_mode, slot, &lines[column.clone()], fonts, doc, &mut page.glyphs);
    }

    if pages.is_empty() {
        pages.push(PagePlan {
            page_index: 0,
            glyphs: Vec::new(),
        });
    }
    log::debug!("flowed {} visual lines onto {} pages", lines.len(), pages.len());
    pages
}

/// Text-area frame in media-box points.
struct Frame {
    /// Content box origin.
    x: f32,
    y: f32,
    width: f32,
    count: u8,
    /// Along-line extent of one column.
    column_length: f32,
    /// Across-line extent available for stacking lines.
    column_breadth: f32,
    gap: f32,
}

impl Frame {
    fn new(doc: &LayoutDocument) -> Self {
        let g = &doc.geometry;
        let offset = g.trim_offset_mm();
        let width = g.content.width.max(0.0) * PT_PER_MM;
        let height = g.content.height.max(0.0) * PT_PER_MM;
        let column_breadth = match doc.writing_mode {
            WritingMode::Horizontal => height,
            WritingMode::Vertical => width,
        };
        Self {
            x: (g.content.x + offset) * PT_PER_MM,
            y: (g.content.y + offset) * PT_PER_MM,
            width,
            count: doc.columns.count.max(1),
            column_length: doc.columns.width_mm * PT_PER_MM,
            column_breadth,
            gap: doc.columns.gap_mm * PT_PER_MM,
        }
    }

    fn place_column(
        &self,
        mode: WritingMode,
        slot: usize,
        lines: &[VisualLine],
        fonts: &FontManager,
        doc: &LayoutDocument,
        out: &mut Vec<PlacedGlyph>,
    ) {
        let column_start = slot as f32 * (self.column_length + self.gap);
        let mut across = 0.0f32;
        for line in lines {
            let mut along = line.indent
                + match line.align {
                    Align::Start => 0.0,
                    Align::Center => ((self.column_length - line.length()) / 2.0).max(0.0),
                };
            let inset = (line.pitch - line.size) / 2.0;
            for cell in &line.cells {
                let (x, y) = match mode {
                    WritingMode::Horizontal => {
                        (self.x + column_start + along, self.y + across + inset)
                    }
                    WritingMode::Vertical => (
                        self.x + self.width - across - line.pitch + inset,
                        self.y + column_start + along,
                    ),
                };
                out.push(place_cell(cell, x, y, line.size, mode, fonts, doc));
                along += cell.advance;
            }
            across += line.pitch;
        }
    }
}

fn place_cell(
    cell: &Cell,
    x: f32,
    y: f32,
    size: f32,
    mode: WritingMode,
    fonts: &FontManager,
    doc: &LayoutDocument,
) -> PlacedGlyph {
    if cell.combined && mode.is_vertical() {
        // Squeeze the digits into one em, centred in the cell.
        let natural = fonts.measure_text_width(&cell.text, size, doc.font_family);
        let fitted = if natural > size { size * size / natural } else { size };
        let width = fonts.measure_text_width(&cell.text, fitted, doc.font_family);
        return PlacedGlyph {
            x: x + (size - width) / 2.0,
            y: y + (size - fitted) / 2.0,
            size: fitted,
            text: cell.text.clone(),
            combined: true,
        };
    }
    PlacedGlyph {
        x,
        y,
        size,
        text: cell.text.clone(),
        combined: false,
    }
}

/// Turn title, author and paragraphs into wrapped visual lines.
fn build_lines(doc: &LayoutDocument, fonts: &FontManager, column_length: f32) -> Vec<VisualLine> {
    let size = doc.font_size;
    let pitch = fonts.line_pitch(size, doc.line_height);
    let vertical = doc.writing_mode.is_vertical();
    let mut lines = Vec::new();

    let heading = |text: &str, scale: f32, lines: &mut Vec<VisualLine>| {
        let s = size * scale;
        let cells = plain_cells(text, s, vertical, fonts, doc);
        wrap(cells, s, fonts.line_pitch(s, doc.line_height), 0.0, Align::Center, column_length, lines);
    };
    if let Some(title) = &doc.title {
        heading(title, TITLE_SCALE, &mut lines);
    }
    if let Some(author) = &doc.author {
        heading(author, AUTHOR_SCALE, &mut lines);
    }
    if doc.title.is_some() || doc.author.is_some() {
        lines.push(VisualLine::blank(size, pitch));
    }

    // Horizontal paragraphs get a one-em first-line indent.
    let indent = if vertical { 0.0 } else { size };
    for paragraph in &doc.paragraphs {
        for (i, line) in paragraph.lines.iter().enumerate() {
            let mut cells = Vec::new();
            for run in &line.runs {
                match run {
                    InlineRun::Combined(digits) if vertical => cells.push(Cell {
                        text: digits.clone(),
                        advance: size,
                        combined: true,
                    }),
                    other => cells.extend(plain_cells(other.text(), size, vertical, fonts, doc)),
                }
            }
            let first_indent = if i == 0 { indent } else { 0.0 };
            if cells.is_empty() {
                lines.push(VisualLine::blank(size, pitch));
            } else {
                wrap(cells, size, pitch, first_indent, Align::Start, column_length, &mut lines);
            }
        }
    }
    lines
}

fn plain_cells(
    text: &str,
    size: f32,
    vertical: bool,
    fonts: &FontManager,
    doc: &LayoutDocument,
) -> Vec<Cell> {
    text.chars()
        .map(|ch| Cell {
            text: ch.to_string(),
            advance: if vertical {
                size
            } else {
                fonts.advance_em(ch, doc.font_family) * size
            },
            combined: false,
        })
        .collect()
}

/// Greedy wrap. Every visual line takes at least one cell, so a zero-length
/// column still makes progress (and the renderer clips).
fn wrap(
    cells: Vec<Cell>,
    size: f32,
    pitch: f32,
    first_indent: f32,
    align: Align,
    column_length: f32,
    out: &mut Vec<VisualLine>,
) {
    let mut current = VisualLine {
        cells: Vec::new(),
        size,
        pitch,
        indent: first_indent,
        align,
    };
    for cell in cells {
        let fits = current.length() + cell.advance <= column_length + 0.01;
        let hangs = current
            .cells
            .last()
            .is_some()
            && cell.text.chars().all(|c| NO_LINE_START.contains(&c));
        if fits || current.cells.is_empty() || hangs {
            current.cells.push(cell);
            continue;
        }
        let next = VisualLine {
            cells: vec![cell],
            size,
            pitch,
            indent: 0.0,
            align,
        };
        out.push(std::mem::replace(&mut current, next));
    }
    out.push(current);
}

/// Assign lines to columns. Returns one index range per column, in page
/// order. Full pages fill column by column; the final page is balanced so
/// its columns hold nearly equal line counts.
fn split_columns(lines: &[VisualLine], breadth: f32, count: usize) -> Vec<std::ops::Range<usize>> {
    let mut columns = Vec::new();
    let mut pos = 0;
    while pos < lines.len() {
        let page_end = fill_page(lines, pos, breadth, count);
        if page_end == lines.len() && count > 1 {
            let target = (lines.len() - pos).div_ceil(count);
            for _ in 0..count {
                let end = fill_column(lines, pos, breadth, target);
                columns.push(pos..end);
                pos = end;
            }
            // Balanced columns can overflow the breadth on tall lines; any
            // leftovers continue on a new page.
            continue;
        }
        for _ in 0..count {
            let end = fill_column(lines, pos, breadth, usize::MAX);
            columns.push(pos..end);
            pos = end;
        }
    }
    columns
}

fn fill_page(lines: &[VisualLine], start: usize, breadth: f32, count: usize) -> usize {
    (0..count).fold(start, |pos, _| fill_column(lines, pos, breadth, usize::MAX))
}

fn fill_column(lines: &[VisualLine], start: usize, breadth: f32, max_lines: usize) -> usize {
    let mut used = 0.0f32;
    let mut end = start;
    while end < lines.len() && end - start < max_lines {
        let pitch = lines[end].pitch;
        if end > start && used + pitch > breadth + 0.01 {
            break;
        }
        used += pitch;
        end += 1;
    }
    end
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::build_layout;
    use crate::settings::ManuscriptSettings;

    fn layout(content: &str, edit: impl FnOnce(&mut ManuscriptSettings)) -> LayoutDocument {
        let mut s = ManuscriptSettings::with_content(content);
        edit(&mut s);
        build_layout(&s).unwrap().document
    }

    #[test]
    fn short_text_is_one_page() {
        let doc = layout("吾輩は猫である。", |_| {});
        let pages = flow_document(&doc, &FontManager::default());
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].glyphs.len(), 8);
    }

    #[test]
    fn vertical_text_runs_top_to_bottom_right_to_left() {
        let doc = layout("あい\nう", |_| {});
        let pages = flow_document(&doc, &FontManager::default());
        let g = &pages[0].glyphs;
        assert_eq!(g[0].x, g[1].x);
        assert!(g[1].y > g[0].y);
        // Second line sits to the left of the first.
        assert!(g[2].x < g[0].x);
    }

    #[test]
    fn combined_numeral_takes_one_cell() {
        let doc = layout("5月12日", |_| {});
        let pages = flow_document(&doc, &FontManager::default());
        let g = &pages[0].glyphs;
        assert_eq!(g.len(), 4);
        assert!(g[0].combined && g[2].combined);
        assert_eq!(g[2].text, "12");
        // Two half-width digits fit a full em without shrinking.
        assert_eq!(g[2].size, doc.font_size);
    }

    #[test]
    fn long_content_spans_pages() {
        let text = "猫".repeat(5000);
        let doc = layout(&text, |s| s.font_size = 12.0);
        let pages = flow_document(&doc, &FontManager::default());
        assert!(pages.len() > 1);
        let total: usize = pages.iter().map(|p| p.glyphs.len()).sum();
        assert_eq!(total, 5000);
    }

    #[test]
    fn glyphs_stay_inside_the_media_box() {
        let text = "吾輩は猫である。名前はまだ無い。".repeat(200);
        for mode in ["vertical", "horizontal"] {
            let doc = layout(&text, |s| {
                s.writing_mode = mode.into();
                s.columns = 2;
                s.crop_marks = true;
            });
            let (w, h) = doc.geometry.media_mm();
            for page in flow_document(&doc, &FontManager::default()) {
                for g in &page.glyphs {
                    assert!(g.x >= 0.0 && g.x + g.size <= w * PT_PER_MM + 0.5, "{mode} {g:?}");
                    assert!(g.y >= 0.0 && g.y + g.size <= h * PT_PER_MM + 0.5, "{mode} {g:?}");
                }
            }
        }
    }

    #[test]
    fn last_page_is_balanced() {
        let lines: Vec<VisualLine> = (0..10).map(|_| VisualLine::blank(10.0, 10.0)).collect();
        let cols = split_columns(&lines, 1000.0, 2);
        assert_eq!(cols, vec![0..5, 5..10]);
    }

    #[test]
    fn closing_punctuation_hangs() {
        let doc = layout("あいう。", |s| {
            s.writing_mode = "horizontal".into();
        });
        let fonts = FontManager::default();
        // Column exactly three cells long: "。" hangs instead of wrapping.
        let mut out = Vec::new();
        let size = doc.font_size;
        let cells = plain_cells("あいう。", size, false, &fonts, &doc);
        wrap(cells, size, size, 0.0, Align::Start, size * 3.0, &mut out);
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn zero_width_columns_still_progress() {
        let out = {
            let doc = layout("abc", |_| {});
            let fonts = FontManager::default();
            let cells = plain_cells("abc", 10.0, true, &fonts, &doc);
            let mut out = Vec::new();
            wrap(cells, 10.0, 10.0, 0.0, Align::Start, 0.0, &mut out);
            out
        };
        assert_eq!(out.len(), 3);
    }
}
