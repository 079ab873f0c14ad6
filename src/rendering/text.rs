//! Font selection, shaping and line breaking for the raster backend.

use rustybuzz::UnicodeBuffer;
use textwrap::core::Fragment;
use textwrap::wrap_algorithms::wrap_first_fit;
use textwrap::WordSeparator;
use ttf_parser::{Face, GlyphId};

use super::layout::{FontFamily, TextStyle, WrapPolicy};
use crate::fonts::FontAsset;
use crate::{Error, Result};

/// One face parsed twice: ttf-parser for outlines and metrics, rustybuzz for
/// shaping.
pub struct LoadedFace<'a> {
    pub outlines: Face<'a>,
    shaper: rustybuzz::Face<'a>,
}

impl<'a> LoadedFace<'a> {
    pub fn parse(data: &'a [u8]) -> std::result::Result<Self, String> {
        let outlines = Face::parse(data, 0).map_err(|e| e.to_string())?;
        let shaper = rustybuzz::Face::from_slice(data, 0)
            .ok_or_else(|| "no usable shaping tables".to_string())?;
        Ok(Self { outlines, shaper })
    }
}

/// Parsed faces available to one rasterization.
///
/// Named families resolve only to supplied assets with the exact weight;
/// nothing is substituted. The generic sans-serif family resolves to the
/// backend's own face, when it has one.
pub struct FontBook<'a> {
    named: Vec<(&'a str, u16, LoadedFace<'a>)>,
    sans_serif: Option<LoadedFace<'a>>,
}

impl<'a> FontBook<'a> {
    pub fn new(assets: &'a [FontAsset], sans_serif: Option<&'a [u8]>) -> Result<Self> {
        let mut named = Vec::with_capacity(assets.len());
        for asset in assets {
            let face = LoadedFace::parse(&asset.data).map_err(|e| {
                Error::RenderError(format!(
                    "font {} {} could not be parsed: {}",
                    asset.face_name, asset.weight, e
                ))
            })?;
            named.push((asset.face_name.as_str(), asset.weight, face));
        }

        let sans_serif = match sans_serif {
            Some(data) => Some(LoadedFace::parse(data).map_err(|e| {
                Error::RenderError(format!("sans-serif face could not be parsed: {}", e))
            })?),
            None => None,
        };

        Ok(Self { named, sans_serif })
    }

    pub fn face_for(&self, family: &FontFamily, weight: u16) -> Result<&LoadedFace<'a>> {
        match family {
            FontFamily::Named(name) => self
                .named
                .iter()
                .find(|(n, w, _)| *n == name.as_str() && *w == weight)
                .map(|(_, _, face)| face)
                .ok_or_else(|| {
                    Error::RenderError(format!("font {} {} was not supplied", name, weight))
                }),
            FontFamily::SansSerif => self
                .sans_serif
                .as_ref()
                .ok_or_else(|| Error::RenderError("no sans-serif face is configured".into())),
        }
    }
}

/// A glyph of a shaped run, in pixels from the run's pen origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlacedGlyph {
    pub id: GlyphId,
    pub x: f32,
    /// Upward offset from the baseline
    pub y: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ShapedRun {
    pub glyphs: Vec<PlacedGlyph>,
    /// Sum of the shaped advances
    pub width: f32,
}

/// A face at a pixel size.
pub struct ScaledFace<'f, 'a> {
    pub face: &'f LoadedFace<'a>,
    pub scale: f32,
    shape_scale: f32,
}

impl<'f, 'a> ScaledFace<'f, 'a> {
    pub fn new(face: &'f LoadedFace<'a>, size: f32) -> Self {
        let upem = face.outlines.units_per_em().max(1) as f32;
        let hb_upem = face.shaper.units_per_em().max(1) as f32;
        Self {
            face,
            scale: size / upem,
            shape_scale: size / hb_upem,
        }
    }

    /// Shape `text` as one run. Kerning, ligatures and marks come from the
    /// face's layout tables.
    pub fn shape(&self, text: &str) -> ShapedRun {
        let mut buffer = UnicodeBuffer::new();
        buffer.push_str(text);
        buffer.guess_segment_properties();
        let output = rustybuzz::shape(&self.face.shaper, &[], buffer);

        let mut pen_x = 0.0;
        let mut glyphs = Vec::with_capacity(output.len());
        for (info, pos) in output.glyph_infos().iter().zip(output.glyph_positions()) {
            glyphs.push(PlacedGlyph {
                id: GlyphId(info.glyph_id as u16),
                x: pen_x + pos.x_offset as f32 * self.shape_scale,
                y: pos.y_offset as f32 * self.shape_scale,
            });
            pen_x += pos.x_advance as f32 * self.shape_scale;
        }
        ShapedRun {
            glyphs,
            width: pen_x,
        }
    }

    pub fn width(&self, text: &str) -> f32 {
        self.shape(text).width
    }

    /// Visible characters of `text` the face has no glyph for, in order of
    /// first appearance.
    pub fn missing_chars(&self, text: &str) -> Vec<char> {
        let mut missing = Vec::new();
        for ch in text.chars() {
            if ch.is_whitespace() || ch.is_control() || missing.contains(&ch) {
                continue;
            }
            if self.face.outlines.glyph_index(ch).is_none() {
                missing.push(ch);
            }
        }
        missing
    }

    pub fn ascent(&self) -> f32 {
        self.face.outlines.ascender() as f32 * self.scale
    }

    pub fn descent(&self) -> f32 {
        -(self.face.outlines.descender() as f32) * self.scale
    }
}

/// Text broken into lines for a given width
#[derive(Debug, Clone, PartialEq)]
pub struct TextBlock {
    pub lines: Vec<String>,
    pub line_widths: Vec<f32>,
    pub line_height: f32,
    pub width: f32,
    pub height: f32,
}

/// Break and measure `content` for at most `available` pixels of width.
pub fn layout_text<F>(content: &str, style: &TextStyle, available: f32, measure: F) -> TextBlock
where
    F: Fn(&str) -> f32,
{
    let limit = match style.wrap {
        WrapPolicy::None => None,
        _ => Some(style.max_width.map_or(available, |m| m.min(available))),
    };
    let lines = break_lines(content, style.wrap, limit, &measure);
    let line_widths: Vec<f32> = lines.iter().map(|l| measure(l)).collect();
    let line_height = style.size * style.line_height;
    TextBlock {
        width: line_widths.iter().cloned().fold(0.0, f32::max),
        height: line_height * lines.len() as f32,
        lines,
        line_widths,
        line_height,
    }
}

/// A word measured in pixels, for textwrap's wrapping algorithms.
#[derive(Debug)]
struct MeasuredWord<'s> {
    word: &'s str,
    whitespace: &'s str,
    width: f64,
    whitespace_width: f64,
}

impl<'s> MeasuredWord<'s> {
    fn new<F: Fn(&str) -> f32>(word: &'s str, whitespace: &'s str, measure: &F) -> Self {
        Self {
            word,
            whitespace,
            width: measure(word) as f64,
            whitespace_width: if whitespace.is_empty() {
                0.0
            } else {
                measure(whitespace) as f64
            },
        }
    }
}

impl Fragment for MeasuredWord<'_> {
    fn width(&self) -> f64 {
        self.width
    }

    fn whitespace_width(&self) -> f64 {
        self.whitespace_width
    }

    fn penalty_width(&self) -> f64 {
        0.0
    }
}

/// Split a word wider than `limit` between characters. Only the last piece
/// keeps the trailing whitespace.
fn push_broken<'s, F: Fn(&str) -> f32>(
    word: &'s str,
    whitespace: &'s str,
    limit: f32,
    measure: &F,
    out: &mut Vec<MeasuredWord<'s>>,
) {
    let (mut start, mut end) = (0, 0);
    for (idx, ch) in word.char_indices() {
        let next = idx + ch.len_utf8();
        if end > start && measure(&word[start..next]) > limit {
            out.push(MeasuredWord::new(&word[start..end], "", measure));
            start = end;
        }
        end = next;
    }
    out.push(MeasuredWord::new(&word[start..end], whitespace, measure));
}

/// Greedy line breaking.
///
/// Explicit newlines always break. With a width limit, `KeepAll` breaks only
/// at spaces and `Normal` at Unicode line-break opportunities, which include
/// the gaps between CJK characters. A word wider than the limit on its own
/// is broken between characters.
pub fn break_lines<F>(content: &str, policy: WrapPolicy, limit: Option<f32>, measure: F) -> Vec<String>
where
    F: Fn(&str) -> f32,
{
    let mut lines = Vec::new();
    for paragraph in content.split('\n') {
        let paragraph = paragraph.trim();
        let (separator, limit) = match (policy, limit) {
            (WrapPolicy::None, _) | (_, None) => {
                lines.push(paragraph.to_string());
                continue;
            }
            (WrapPolicy::KeepAll, Some(limit)) => (WordSeparator::AsciiSpace, limit),
            (WrapPolicy::Normal, Some(limit)) => (WordSeparator::UnicodeBreakProperties, limit),
        };

        let mut words = Vec::new();
        for word in separator.find_words(paragraph) {
            if word.word.is_empty() {
                continue;
            }
            if measure(word.word) > limit {
                push_broken(word.word, word.whitespace, limit, &measure, &mut words);
            } else {
                words.push(MeasuredWord::new(word.word, word.whitespace, &measure));
            }
        }
        if words.is_empty() {
            lines.push(String::new());
            continue;
        }

        for line in wrap_first_fit(&words, &[limit as f64]) {
            let mut text = String::new();
            for (i, word) in line.iter().enumerate() {
                text.push_str(word.word);
                if i + 1 < line.len() {
                    text.push_str(word.whitespace);
                }
            }
            lines.push(text);
        }
    }
    lines
}
