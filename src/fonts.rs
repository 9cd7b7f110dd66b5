//! Font stacks and glyph metrics.
//!
//! Without a loaded font file, advances come from a width-class heuristic:
//! CJK ideographs, kana and full-width forms take a full em, everything else
//! half an em. With a TTF/OTF loaded through `ttf-parser`, real horizontal
//! advances are used.

use std::collections::HashMap;
use std::path::Path;

use crate::error::{Error, Result};
use crate::settings::FontFamily;

/// CSS-style font stack for a family, for renderers that resolve fonts by
/// name.
pub fn font_stack(family: FontFamily) -> &'static str {
    match family {
        FontFamily::Mincho => {
            r#""Noto Serif JP", "Yu Mincho", "YuMincho", "Hiragino Mincho Pro", serif"#
        }
        FontFamily::Gothic => {
            r#""Noto Sans JP", "Yu Gothic", "YuGothic", "Hiragino Kaku Gothic Pro", sans-serif"#
        }
        FontFamily::Mono => r#""Noto Sans Mono", "Osaka-Mono", "MS Gothic", monospace"#,
    }
}

/// A loaded font face with metrics.
#[derive(Clone)]
pub struct FontData {
    /// Raw font bytes (kept alive for ttf-parser's zero-copy API and for
    /// embedding).
    pub bytes: Vec<u8>,
    pub units_per_em: f32,
    pub ascender: f32,
    pub descender: f32,
}

/// Fonts available to the renderer, keyed by family.
#[derive(Default)]
pub struct FontManager {
    fonts: HashMap<FontFamily, FontData>,
    /// Face used for families without their own file.
    fallback: Option<FontData>,
}

impl FontManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a TTF/OTF face from bytes.
    pub fn parse_font(bytes: Vec<u8>) -> Result<FontData> {
        let face = ttf_parser::Face::parse(&bytes, 0)
            .map_err(|e| Error::RendererLaunch(format!("failed to parse font: {e}")))?;
        Ok(FontData {
            units_per_em: f32::from(face.units_per_em()),
            ascender: f32::from(face.ascender()),
            descender: f32::from(face.descender()),
            bytes,
        })
    }

    /// Load a font for one family.
    pub fn load_font(&mut self, family: FontFamily, bytes: Vec<u8>) -> Result<()> {
        let data = Self::parse_font(bytes)?;
        if self.fallback.is_none() {
            self.fallback = Some(data.clone());
        }
        self.fonts.insert(family, data);
        Ok(())
    }

    /// Load a font file used for every family.
    pub fn load_fallback_file(&mut self, path: &Path) -> Result<()> {
        let bytes = std::fs::read(path).map_err(|e| Error::fs(path, e))?;
        self.fallback = Some(Self::parse_font(bytes)?);
        log::info!("loaded font {}", path.display());
        Ok(())
    }

    /// Font data for a family, if any real font applies.
    pub fn get(&self, family: FontFamily) -> Option<&FontData> {
        self.fonts.get(&family).or(self.fallback.as_ref())
    }

    /// Horizontal advance of `ch` in ems.
    pub fn advance_em(&self, ch: char, family: FontFamily) -> f32 {
        if let Some(data) = self.get(family) {
            if let Ok(face) = ttf_parser::Face::parse(&data.bytes, 0) {
                if let Some(adv) = face
                    .glyph_index(ch)
                    .and_then(|gid| face.glyph_hor_advance(gid))
                {
                    return f32::from(adv) / data.units_per_em;
                }
            }
        }
        heuristic_advance_em(ch, family)
    }

    /// Width of `text` in points at `font_size` points.
    pub fn measure_text_width(&self, text: &str, font_size: f32, family: FontFamily) -> f32 {
        text.chars()
            .map(|c| self.advance_em(c, family))
            .sum::<f32>()
            * font_size
    }

    /// Distance between successive lines in points.
    pub fn line_pitch(&self, font_size: f32, line_height_factor: f32) -> f32 {
        font_size * line_height_factor
    }

    /// Ascender in points, 0.88 em when no font is loaded.
    pub fn ascender_pt(&self, font_size: f32, family: FontFamily) -> f32 {
        match self.get(family) {
            Some(d) => d.ascender / d.units_per_em * font_size,
            None => 0.88 * font_size,
        }
    }
}

/// True for characters that occupy a full em in Japanese typesetting.
pub fn is_full_width(ch: char) -> bool {
    matches!(ch as u32,
        0x1100..=0x115F        // Hangul Jamo
        | 0x2E80..=0x303E      // CJK radicals, punctuation
        | 0x3041..=0x33FF      // kana, CJK symbols
        | 0x3400..=0x4DBF      // CJK ext A
        | 0x4E00..=0x9FFF      // CJK unified
        | 0xA000..=0xA4CF
        | 0xAC00..=0xD7A3      // Hangul syllables
        | 0xF900..=0xFAFF      // CJK compatibility
        | 0xFE30..=0xFE4F
        | 0xFF00..=0xFF60      // full-width forms
        | 0xFFE0..=0xFFE6
        | 0x20000..=0x3FFFD)
}

fn heuristic_advance_em(ch: char, family: FontFamily) -> f32 {
    if is_full_width(ch) {
        1.0
    } else if family == FontFamily::Mono {
        0.6
    } else {
        0.5
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heuristic_widths() {
        let mgr = FontManager::default();
        // 2 full-width + 2 half-width at 10pt
        let w = mgr.measure_text_width("猫ab。", 10.0, FontFamily::Mincho);
        assert!((w - 30.0).abs() < 1e-4);
        let w = mgr.measure_text_width("ab", 10.0, FontFamily::Mono);
        assert!((w - 12.0).abs() < 1e-4);
    }

    #[test]
    fn full_width_classes() {
        assert!(is_full_width('あ'));
        assert!(is_full_width('漢'));
        assert!(is_full_width('１'));
        assert!(is_full_width('。'));
        assert!(!is_full_width('1'));
        assert!(!is_full_width('a'));
    }

    #[test]
    fn stacks_per_family() {
        assert!(font_stack(FontFamily::Mincho).ends_with("serif"));
        assert!(font_stack(FontFamily::Gothic).contains("Noto Sans JP"));
        assert!(font_stack(FontFamily::Mono).ends_with("monospace"));
    }

    #[test]
    fn rejects_garbage_font_bytes() {
        let mut mgr = FontManager::new();
        assert!(mgr.load_font(FontFamily::Gothic, vec![0, 1, 2, 3]).is_err());
        assert!(mgr.get(FontFamily::Gothic).is_none());
    }
}
