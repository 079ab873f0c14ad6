//! Raster adapter: turns a layout tree plus font assets into a PNG.
//!
//! [`Rasterizer`] is the seam to the image-compositing engine. The bundled
//! [`PixmapRasterizer`] paints with tiny-skia, shapes text with rustybuzz and
//! fills glyph outlines read through ttf-parser. Containers are placed by
//! [`super::flow`]. It understands the node kinds the card templates emit and
//! nothing more.

use std::path::Path;

use tiny_skia as sk;

use super::flow::{arrange, Slot, TextMeasure};
use super::layout::{Flex, Glyph, LayoutNode, LayoutTree, NodeKind, Paint, Rect, TextAlign, TextStyle};
use super::text::{layout_text, FontBook, ScaledFace, TextBlock};
use super::RenderedImage;
use crate::fonts::FontAsset;
use crate::theme::Color;
use crate::{Error, Result};

/// Image-compositing backend.
pub trait Rasterizer: Send + Sync {
    /// Produce a PNG of `tree`. Every named face the tree uses must be in
    /// `fonts`; a missing face is an error, never a substitution.
    fn rasterize(&self, tree: &LayoutTree, fonts: &[FontAsset]) -> Result<RenderedImage>;
}

/// tiny-skia backend
#[derive(Default)]
pub struct PixmapRasterizer {
    sans_serif: Option<Vec<u8>>,
}

impl PixmapRasterizer {
    /// Backend without a sans-serif face; only cards set entirely in
    /// supplied faces can be drawn.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sans_serif(data: Vec<u8>) -> Self {
        Self { sans_serif: Some(data) }
    }

    /// Read the sans-serif face from `path`. A missing or unreadable file
    /// leaves the backend without one.
    pub fn from_fallback_path(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::new();
        };
        match std::fs::read(path) {
            Ok(data) => {
                log::debug!("loaded sans-serif face from {}", path.display());
                Self::with_sans_serif(data)
            }
            Err(e) => {
                log::warn!(
                    "sans-serif face {} unavailable ({}); themed cards without a custom face will fail",
                    path.display(),
                    e
                );
                Self::new()
            }
        }
    }

    pub fn has_sans_serif(&self) -> bool {
        self.sans_serif.is_some()
    }
}

impl Rasterizer for PixmapRasterizer {
    fn rasterize(&self, tree: &LayoutTree, fonts: &[FontAsset]) -> Result<RenderedImage> {
        let book = FontBook::new(fonts, self.sans_serif.as_deref())?;
        let mut pixmap = sk::Pixmap::new(tree.width, tree.height).ok_or_else(|| {
            Error::RenderError(format!("invalid canvas size {}x{}", tree.width, tree.height))
        })?;
        pixmap.fill(sk::Color::WHITE);

        let canvas = Rect::new(0.0, 0.0, tree.width as f32, tree.height as f32);
        let mut painter = Painter {
            pixmap: &mut pixmap,
            book: &book,
        };
        painter.draw(&tree.root, canvas)?;

        let png_data = pixmap
            .encode_png()
            .map_err(|e| Error::RenderError(format!("png encode failed: {}", e)))?;
        Ok(RenderedImage {
            width: tree.width,
            height: tree.height,
            png_data,
        })
    }
}

struct Painter<'p, 'a> {
    pixmap: &'p mut sk::Pixmap,
    book: &'p FontBook<'a>,
}

impl TextMeasure for Painter<'_, '_> {
    fn text_block(&self, content: &str, style: &TextStyle, available: f32) -> Result<TextBlock> {
        let face = self.book.face_for(&style.family, style.weight)?;
        let scaled = ScaledFace::new(face, style.size);
        Ok(layout_text(content, style, available, |s| scaled.width(s)))
    }
}

impl<'p, 'a> Painter<'p, 'a> {
    fn draw(&mut self, node: &LayoutNode, slot: Rect) -> Result<()> {
        match &node.kind {
            NodeKind::Fill { rect, paint, opacity } => {
                self.fill_rect(*rect, paint, *opacity)
            }
            NodeKind::Circle {
                cx,
                cy,
                radius,
                color,
                opacity,
            } => {
                if let Some(path) = sk::PathBuilder::from_circle(*cx, *cy, *radius) {
                    let paint = solid_paint(*color, *opacity);
                    self.pixmap
                        .fill_path(&path, &paint, sk::FillRule::Winding, sk::Transform::identity(), None);
                }
                Ok(())
            }
            NodeKind::Text { content, style } => {
                let block = self.text_block(content, style, slot.width + 0.5)?;
                self.draw_text(&block, style, slot)
            }
            NodeKind::Icon {
                glyph,
                size,
                color,
                stroke_width,
            } => {
                self.draw_icon(*glyph, *size, *color, *stroke_width, slot);
                Ok(())
            }
            NodeKind::Flex(flex) => {
                let frame = flex.frame.unwrap_or(slot);
                self.draw_flex(flex, frame)
            }
        }
    }

    fn draw_flex(&mut self, flex: &Flex, frame: Rect) -> Result<()> {
        let slots = arrange(&*self, flex, frame)?;
        for (child, slot) in flex.children.iter().zip(slots) {
            match slot {
                Slot::Absolute => self.draw(child, frame)?,
                Slot::Flow(rect) => self.draw(child, rect)?,
                Slot::Clipped => log::debug!("{:?} does not fit its row; clipped", child.elem_type),
            }
        }
        Ok(())
    }

    fn fill_rect(&mut self, rect: Rect, paint: &Paint, opacity: f32) -> Result<()> {
        let Some(sk_rect) = sk::Rect::from_xywh(rect.x, rect.y, rect.width, rect.height) else {
            return Ok(());
        };
        let sk_paint = match paint {
            Paint::Solid { color } => solid_paint(*color, opacity),
            Paint::LinearGradient { angle_deg, stops } => {
                let angle = angle_deg.to_radians();
                let (dx, dy) = (angle.sin(), -angle.cos());
                let half = ((rect.width * dx).abs() + (rect.height * dy).abs()) / 2.0;
                let (cx, cy) = (rect.x + rect.width / 2.0, rect.y + rect.height / 2.0);
                let sk_stops = stops
                    .iter()
                    .map(|s| sk::GradientStop::new(s.offset, sk_color(s.color, opacity)))
                    .collect();
                let shader = sk::LinearGradient::new(
                    sk::Point::from_xy(cx - dx * half, cy - dy * half),
                    sk::Point::from_xy(cx + dx * half, cy + dy * half),
                    sk_stops,
                    sk::SpreadMode::Pad,
                    sk::Transform::identity(),
                )
                .ok_or_else(|| Error::RenderError("invalid gradient".into()))?;
                let mut p = sk::Paint::default();
                p.shader = shader;
                p.anti_alias = true;
                p
            }
        };
        self.pixmap
            .fill_rect(sk_rect, &sk_paint, sk::Transform::identity(), None);
        Ok(())
    }

    fn draw_text(&mut self, block: &TextBlock, style: &TextStyle, slot: Rect) -> Result<()> {
        let book = self.book;
        let face = book.face_for(&style.family, style.weight)?;
        let scaled = ScaledFace::new(face, style.size);
        let paint = solid_paint(style.color, 1.0);
        let glyph_height = scaled.ascent() + scaled.descent();

        let missing = scaled.missing_chars(&block.lines.concat());
        if !missing.is_empty() {
            log::warn!(
                "{:?} {} has no glyph for {:?}; drawing the face's missing-glyph box",
                style.family,
                style.weight,
                missing
            );
        }

        for (i, (line, width)) in block.lines.iter().zip(&block.line_widths).enumerate() {
            let top = slot.y + block.line_height * i as f32;
            let baseline = top + (block.line_height - glyph_height) / 2.0 + scaled.ascent();
            let origin = match style.align {
                TextAlign::Start => slot.x,
                TextAlign::Center => slot.x + (slot.width - width) / 2.0,
                TextAlign::End => slot.right() - width,
            };
            for glyph in scaled.shape(line).glyphs {
                let mut builder = GlyphPathBuilder::new();
                if face.outlines.outline_glyph(glyph.id, &mut builder).is_none() {
                    continue;
                }
                if let Some(path) = builder.finish() {
                    let transform = sk::Transform::from_row(
                        scaled.scale,
                        0.0,
                        0.0,
                        -scaled.scale,
                        origin + glyph.x,
                        baseline - glyph.y,
                    );
                    self.pixmap
                        .fill_path(&path, &paint, sk::FillRule::Winding, transform, None);
                }
            }
        }
        Ok(())
    }

    fn draw_icon(&mut self, glyph: Glyph, size: f32, color: Color, stroke_width: f32, slot: Rect) {
        let path = match glyph {
            Glyph::Pin => pin_path(),
        };
        let Some(path) = path else {
            return;
        };
        let scale = size / 24.0;
        let transform = sk::Transform::from_row(scale, 0.0, 0.0, scale, slot.x, slot.y);
        let stroke = sk::Stroke {
            width: stroke_width,
            line_cap: sk::LineCap::Round,
            line_join: sk::LineJoin::Round,
            ..sk::Stroke::default()
        };
        let paint = solid_paint(color, 1.0);
        self.pixmap.stroke_path(&path, &paint, &stroke, transform, None);
    }
}

/// Map pin on a 24-unit grid: a teardrop with a ring at (12, 10).
fn pin_path() -> Option<sk::Path> {
    // Cubic approximation of a quarter circle of radius 9.
    const K: f32 = 9.0 * 0.552_284_8;
    let mut pb = sk::PathBuilder::new();
    pb.move_to(21.0, 10.0);
    pb.cubic_to(21.0, 17.0, 12.0, 23.0, 12.0, 23.0);
    pb.cubic_to(12.0, 23.0, 3.0, 17.0, 3.0, 10.0);
    pb.cubic_to(3.0, 10.0 - K, 12.0 - K, 1.0, 12.0, 1.0);
    pb.cubic_to(12.0 + K, 1.0, 21.0, 10.0 - K, 21.0, 10.0);
    pb.close();
    pb.push_circle(12.0, 10.0, 3.0);
    pb.finish()
}

fn sk_color(color: Color, opacity: f32) -> sk::Color {
    let alpha = (opacity.clamp(0.0, 1.0) * 255.0).round() as u8;
    sk::Color::from_rgba8(color.r, color.g, color.b, alpha)
}

fn solid_paint(color: Color, opacity: f32) -> sk::Paint<'static> {
    let mut paint = sk::Paint::default();
    paint.set_color(sk_color(color, opacity));
    paint.anti_alias = true;
    paint
}

/// Collects glyph outlines in font units; the caller's transform scales and
/// flips them onto the baseline.
struct GlyphPathBuilder {
    builder: sk::PathBuilder,
}

impl GlyphPathBuilder {
    fn new() -> Self {
        Self {
            builder: sk::PathBuilder::new(),
        }
    }

    fn finish(self) -> Option<sk::Path> {
        self.builder.finish()
    }
}

impl ttf_parser::OutlineBuilder for GlyphPathBuilder {
    fn move_to(&mut self, x: f32, y: f32) {
        self.builder.move_to(x, y);
    }

    fn line_to(&mut self, x: f32, y: f32) {
        self.builder.line_to(x, y);
    }

    fn quad_to(&mut self, x1: f32, y1: f32, x: f32, y: f32) {
        self.builder.quad_to(x1, y1, x, y);
    }

    fn curve_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x: f32, y: f32) {
        self.builder.cubic_to(x1, y1, x2, y2, x, y);
    }

    fn close(&mut self) {
        self.builder.close();
    }
}
