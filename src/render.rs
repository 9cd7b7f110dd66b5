//! Rendering – the renderer capability, its scoped session, stage timeouts,
//! and the bundled `printpdf` backend.
//!
//! A renderer is anything that can open a session, accept a
//! [`LayoutDocument`] and print it under a [`RenderDirective`]. Sessions are
//! always released through [`SessionGuard`], whichever way the render ends.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_channel::RecvTimeoutError;
use printpdf::*;

use crate::document::{LayoutDocument, RenderDirective};
use crate::error::{Error, RenderStage, Result};
use crate::flow::{flow_document, PagePlan};
use crate::fonts::FontManager;
use crate::geometry::PT_PER_MM;
use crate::settings::{ColorMode, FontFamily};

/// Default bound on acquiring a session.
pub const DEFAULT_LAUNCH_TIMEOUT: Duration = Duration::from_secs(15);
/// Default bound on content hand-over plus PDF output.
pub const DEFAULT_CONVERSION_TIMEOUT: Duration = Duration::from_secs(10);

/// A rendering backend.
pub trait Renderer: Send + Sync + 'static {
    type Session: RenderSession + 'static;

    /// Acquire a session. May block.
    fn launch(&self) -> Result<Self::Session>;
}

/// An acquired renderer session.
pub trait RenderSession: Send {
    /// Hand the layout document to the renderer.
    fn set_content(&mut self, doc: &LayoutDocument) -> Result<()>;

    /// Produce PDF bytes for the document set last.
    fn print(&mut self, directive: &RenderDirective) -> Result<Vec<u8>>;

    /// Release the session. Called exactly once, by [`SessionGuard`].
    fn close(&mut self);
}

/// Owns a session and closes it on drop.
pub struct SessionGuard<S: RenderSession> {
    session: S,
}

impl<S: RenderSession> SessionGuard<S> {
    pub fn new(session: S) -> Self {
        Self { session }
    }

    /// Set content and print in one step.
    pub fn render(&mut self, doc: &LayoutDocument, directive: &RenderDirective) -> Result<Vec<u8>> {
        self.session.set_content(doc)?;
        self.session.print(directive)
    }
}

impl<S: RenderSession> Drop for SessionGuard<S> {
    fn drop(&mut self) {
        self.session.close();
    }
}

/// Per-stage time bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderTimeouts {
    pub launch: Duration,
    pub conversion: Duration,
}

impl Default for RenderTimeouts {
    fn default() -> Self {
        Self {
            launch: DEFAULT_LAUNCH_TIMEOUT,
            conversion: DEFAULT_CONVERSION_TIMEOUT,
        }
    }
}

enum StageEvent {
    Launched,
    LaunchFailed(Error),
    Output(Result<Vec<u8>>),
}

/// Render once, bounding launch and conversion independently.
///
/// The backend runs on a worker thread that owns the session guard, and the
/// session is closed before a result is sent back. On a timeout the caller
/// gets [`Error::RendererTimeout`] at once; the worker is told to abandon
/// the job and its guard closes the session as soon as the blocked backend
/// call returns. No retry is attempted.
pub fn render_with_timeouts<R: Renderer>(
    renderer: Arc<R>,
    doc: LayoutDocument,
    directive: RenderDirective,
    timeouts: RenderTimeouts,
) -> Result<Vec<u8>> {
    let (tx, rx) = crossbeam_channel::bounded::<StageEvent>(2);
    let abandoned = Arc::new(AtomicBool::new(false));
    let worker_abandoned = Arc::clone(&abandoned);

    thread::Builder::new()
        .name("mforge-render".to_string())
        .spawn(move || {
            let session = match renderer.launch() {
                Ok(s) => s,
                Err(e) => {
                    let _ = tx.send(StageEvent::LaunchFailed(e));
                    return;
                }
            };
            let mut guard = SessionGuard::new(session);
            if worker_abandoned.load(Ordering::SeqCst) {
                log::debug!("render abandoned after launch; releasing session");
                return;
            }
            if tx.send(StageEvent::Launched).is_err() {
                return;
            }
            let result = guard.render(&doc, &directive);
            // Release before the result is observable.
            drop(guard);
            if worker_abandoned.load(Ordering::SeqCst) {
                log::debug!("render abandoned during conversion; session released");
                return;
            }
            let _ = tx.send(StageEvent::Output(result));
        })
        .map_err(|e| Error::RendererLaunch(format!("failed to spawn render worker: {e}")))?;

    match rx.recv_timeout(timeouts.launch) {
        Ok(StageEvent::Launched) => {}
        Ok(StageEvent::LaunchFailed(e)) => return Err(e),
        Ok(StageEvent::Output(result)) => return result,
        Err(RecvTimeoutError::Timeout) => {
            abandoned.store(true, Ordering::SeqCst);
            log::error!("renderer launch exceeded {:?}", timeouts.launch);
            return Err(Error::RendererTimeout {
                stage: RenderStage::Launch,
                timeout: timeouts.launch,
            });
        }
        Err(RecvTimeoutError::Disconnected) => {
            return Err(Error::RendererLaunch("render worker exited during launch".into()))
        }
    }

    match rx.recv_timeout(timeouts.conversion) {
        Ok(StageEvent::Output(result)) => result,
        Ok(_) => Err(Error::Unknown("unexpected renderer event".into())),
        Err(RecvTimeoutError::Timeout) => {
            abandoned.store(true, Ordering::SeqCst);
            log::error!("renderer conversion exceeded {:?}", timeouts.conversion);
            Err(Error::RendererTimeout {
                stage: RenderStage::Conversion,
                timeout: timeouts.conversion,
            })
        }
        Err(RecvTimeoutError::Disconnected) => {
            Err(Error::Render("render worker exited during conversion".into()))
        }
    }
}

// ---------------------------------------------------------------------------
// printpdf backend
// ---------------------------------------------------------------------------

/// Native PDF renderer built on `printpdf` and the grid flow in
/// [`crate::flow`].
///
/// Without a loaded font file it falls back to the PDF base-14 fonts, which
/// only cover Latin-1; other characters are written as `?`.
#[derive(Clone, Default)]
pub struct PdfRenderer {
    fonts: Arc<FontManager>,
}

impl PdfRenderer {
    pub fn new(fonts: FontManager) -> Self {
        Self {
            fonts: Arc::new(fonts),
        }
    }
}

impl Renderer for PdfRenderer {
    type Session = PdfSession;

    fn launch(&self) -> Result<PdfSession> {
        log::debug!("opening printpdf session");
        Ok(PdfSession {
            fonts: Arc::clone(&self.fonts),
            doc: None,
        })
    }
}

/// Session of [`PdfRenderer`].
pub struct PdfSession {
    fonts: Arc<FontManager>,
    doc: Option<LayoutDocument>,
}

impl RenderSession for PdfSession {
    fn set_content(&mut self, doc: &LayoutDocument) -> Result<()> {
        if doc.paragraphs.is_empty() {
            return Err(Error::Render("layout document has no paragraphs".into()));
        }
        self.doc = Some(doc.clone());
        Ok(())
    }

    fn print(&mut self, directive: &RenderDirective) -> Result<Vec<u8>> {
        let doc = self
            .doc
            .as_ref()
            .ok_or_else(|| Error::Render("print called before set_content".into()))?;
        let pages = flow_document(doc, &self.fonts);
        Ok(render_pdf(doc, directive, &pages, &self.fonts))
    }

    fn close(&mut self) {
        self.doc = None;
        log::debug!("closed printpdf session");
    }
}

#[derive(Clone)]
enum PdfFont {
    Builtin(BuiltinFont),
    External(FontId),
}

/// Write flowed pages to PDF bytes.
pub fn render_pdf(
    doc: &LayoutDocument,
    directive: &RenderDirective,
    pages: &[PagePlan],
    fonts: &FontManager,
) -> Vec<u8> {
    let (media_w, media_h) = doc.geometry.media_mm();
    let media_h_pt = media_h * PT_PER_MM;
    let mut pdf = PdfDocument::new(&directive.title);

    let font = embed_font(&mut pdf, doc.font_family, fonts);
    let ink = ink_color(directive.color_mode);
    let mut substituted = 0usize;

    let mut pdf_pages = Vec::with_capacity(pages.len());
    for plan in pages {
        let mut ops = Vec::new();
        for glyph in &plan.glyphs {
            let baseline = media_h_pt - glyph.y - fonts.ascender_pt(glyph.size, doc.font_family);
            ops.push(Op::StartTextSection);
            ops.push(Op::SetTextCursor {
                pos: Point {
                    x: Pt(glyph.x),
                    y: Pt(baseline),
                },
            });
            ops.push(Op::SetFillColor { col: ink.clone() });
            match &font {
                PdfFont::External(id) => {
                    ops.push(Op::SetFontSize {
                        size: Pt(glyph.size),
                        font: id.clone(),
                    });
                    ops.push(Op::WriteText {
                        items: vec![TextItem::Text(glyph.text.clone())],
                        font: id.clone(),
                    });
                }
                PdfFont::Builtin(builtin) => {
                    substituted += builtin_text_ops(&mut ops, &glyph.text, *builtin, glyph.size);
                }
            }
            ops.push(Op::EndTextSection);
        }

        if directive.crop_marks {
            crop_mark_ops(&mut ops, doc, &ink);
        }
        pdf_pages.push(PdfPage::new(Mm(media_w), Mm(media_h), ops));
    }

    if substituted > 0 {
        log::warn!(
            "{substituted} glyphs are outside the built-in font and were replaced; load a CJK font file to render them"
        );
    }

    pdf.with_pages(pdf_pages);
    let mut warnings = Vec::new();
    // Built-in glyphs are written as raw `Tj` operators.
    let options = PdfSaveOptions {
        secure: false,
        ..PdfSaveOptions::default()
    };
    let bytes = pdf.save(&options, &mut warnings);
    log::debug!(
        "rendered {} pages, {} bytes, {} printpdf warnings",
        pages.len(),
        bytes.len(),
        warnings.len()
    );
    bytes
}

fn embed_font(pdf: &mut PdfDocument, family: FontFamily, fonts: &FontManager) -> PdfFont {
    if let Some(data) = fonts.get(family) {
        let mut warnings: Vec<PdfWarnMsg> = Vec::new();
        match ParsedFont::from_bytes(&data.bytes, 0, &mut warnings) {
            Some(parsed) => return PdfFont::External(pdf.add_font(&parsed)),
            None => log::warn!("font for {} could not be embedded; using built-in", family.code()),
        }
    }
    PdfFont::Builtin(match family {
        FontFamily::Mincho => BuiltinFont::TimesRoman,
        FontFamily::Gothic => BuiltinFont::Helvetica,
        FontFamily::Mono => BuiltinFont::Courier,
    })
}

fn ink_color(mode: ColorMode) -> Color {
    match mode {
        ColorMode::Cmyk => Color::Cmyk(Cmyk {
            c: 0.0,
            m: 0.0,
            y: 0.0,
            k: 1.0,
            icc_profile: None,
        }),
        ColorMode::Rgb => Color::Rgb(Rgb {
            r: 0.0,
            g: 0.0,
            b: 0.0,
            icc_profile: None,
        }),
        ColorMode::Grayscale => Color::Greyscale(Greyscale {
            percent: 0.0,
            icc_profile: None,
        }),
    }
}

/// Emit `text` in a base-14 font. Returns the number of characters that had
/// no WinAnsi code and were written as `?`.
///
/// printpdf passes built-in text through as UTF-8, so the WinAnsi bytes go
/// out in a raw `Tj`; the empty `WriteTextBuiltinFont` only registers the
/// font resource.
fn builtin_text_ops(ops: &mut Vec<Op>, text: &str, font: BuiltinFont, size: f32) -> usize {
    let (bytes, missing) = to_winansi(text);
    ops.push(Op::SetFontSizeBuiltinFont {
        size: Pt(size),
        font,
    });
    ops.push(Op::WriteTextBuiltinFont {
        items: Vec::new(),
        font,
    });
    ops.push(Op::Unknown {
        key: "Tj".to_string(),
        value: vec![DictItem::String {
            data: bytes,
            literal: false,
        }],
    });
    missing
}

/// Encode `s` as Windows-1252 bytes for WinAnsiEncoding.
fn to_winansi(s: &str) -> (Vec<u8>, usize) {
    let mut missing = 0;
    let bytes = s
        .chars()
        .map(|c| match c {
            '\u{20AC}' => 0x80,
            '\u{201A}' => 0x82,
            '\u{0192}' => 0x83,
            '\u{201E}' => 0x84,
            '\u{2026}' => 0x85,
            '\u{2020}' => 0x86,
            '\u{2021}' => 0x87,
            '\u{02C6}' => 0x88,
            '\u{2030}' => 0x89,
            '\u{0160}' => 0x8A,
            '\u{2039}' => 0x8B,
            '\u{0152}' => 0x8C,
            '\u{017D}' => 0x8E,
            '\u{2018}' => 0x91,
            '\u{2019}' => 0x92,
            '\u{201C}' => 0x93,
            '\u{201D}' => 0x94,
            '\u{2022}' => 0x95,
            '\u{2013}' => 0x96,
            '\u{2014}' => 0x97,
            '\u{02DC}' => 0x98,
            '\u{2122}' => 0x99,
            '\u{0161}' => 0x9A,
            '\u{203A}' => 0x9B,
            '\u{0153}' => 0x9C,
            '\u{017E}' => 0x9E,
            '\u{0178}' => 0x9F,
            '\u{00A0}' => b' ',
            c if (c as u32) < 0x80 || (0xA0..=0xFF).contains(&(c as u32)) => c as u8,
            _ => {
                missing += 1;
                b'?'
            }
        })
        .collect();
    (bytes, missing)
}

/// Corner marks in the bleed area, one horizontal and one vertical stroke
/// per trim corner.
fn crop_mark_ops(ops: &mut Vec<Op>, doc: &LayoutDocument, ink: &Color) {
    let bleed = doc.geometry.trim_offset_mm() * PT_PER_MM;
    if bleed <= 0.0 {
        return;
    }
    let (_, media_h) = doc.geometry.media_mm();
    let media_h = media_h * PT_PER_MM;
    let left = bleed;
    let right = bleed + doc.geometry.width_mm * PT_PER_MM;
    // PDF y grows upwards.
    let top = media_h - bleed;
    let bottom = bleed;

    ops.push(Op::SetOutlineColor { col: ink.clone() });
    ops.push(Op::SetOutlineThickness { pt: Pt(0.25) });

    for (cx, cy, dx, dy) in [
        (left, top, -1.0, 1.0),
        (right, top, 1.0, 1.0),
        (left, bottom, -1.0, -1.0),
        (right, bottom, 1.0, -1.0),
    ] {
        ops.push(stroke((cx, cy), (cx + dx * bleed, cy)));
        ops.push(stroke((cx, cy), (cx, cy + dy * bleed)));
    }
}

fn stroke(from: (f32, f32), to: (f32, f32)) -> Op {
    let point = |(x, y): (f32, f32)| LinePoint {
        p: Point { x: Pt(x), y: Pt(y) },
        bezier: false,
    };
    Op::DrawLine {
        line: Line {
            points: vec![point(from), point(to)],
            is_closed: false,
        },
    }
}
