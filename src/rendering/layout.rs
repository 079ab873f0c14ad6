//! Layout tree handed from the templates to the rasterizer.
//!
//! The tree is a declarative description: absolute nodes (fills, circles and
//! framed containers) carry their own geometry, while flow nodes (text, icons
//! and unframed containers) are placed by their parent container with simple
//! flexbox rules. Text measurement and line breaking are left to the
//! rasterizer; templates only choose the wrap policy.
//!
//! Trees are plain data. The same parameters always produce the same tree, so
//! [`LayoutTree::digest`] doubles as a cache key.

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::fonts::FontRequest;
use crate::theme::{Background, Color, GradientStop};
use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    /// Shrink by `insets`, never below zero size.
    pub fn inset(&self, insets: &Insets) -> Rect {
        Rect {
            x: self.x + insets.left,
            y: self.y + insets.top,
            width: (self.width - insets.left - insets.right).max(0.0),
            height: (self.height - insets.top - insets.bottom).max(0.0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Insets {
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
    pub left: f32,
}

impl Insets {
    pub const ZERO: Insets = Insets::new(0.0, 0.0, 0.0, 0.0);

    pub const fn new(top: f32, right: f32, bottom: f32, left: f32) -> Self {
        Self { top, right, bottom, left }
    }

    pub const fn symmetric(vertical: f32, horizontal: f32) -> Self {
        Self::new(vertical, horizontal, vertical, horizontal)
    }

    pub fn horizontal(&self) -> f32 {
        self.left + self.right
    }

    pub fn vertical(&self) -> f32 {
        self.top + self.bottom
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Paint {
    Solid { color: Color },
    LinearGradient { angle_deg: f32, stops: Vec<GradientStop> },
}

impl From<&Background> for Paint {
    fn from(bg: &Background) -> Self {
        match bg {
            Background::Solid(color) => Paint::Solid { color: *color },
            Background::LinearGradient { angle_deg, stops } => Paint::LinearGradient {
                angle_deg: *angle_deg,
                stops: stops.to_vec(),
            },
        }
    }
}

impl From<Color> for Paint {
    fn from(color: Color) -> Self {
        Paint::Solid { color }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FontFamily {
    /// A face that must be supplied as a font asset
    Named(String),
    /// Any sans-serif face the rasterizer has at hand
    SansSerif,
}

/// Where the rasterizer may break lines of a text node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WrapPolicy {
    /// Single line
    None,
    /// Break at whitespace and between CJK characters
    Normal,
    /// Break at whitespace only; CJK runs stay together
    KeepAll,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TextAlign {
    Start,
    Center,
    End,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextStyle {
    pub family: FontFamily,
    pub size: f32,
    pub weight: u16,
    pub color: Color,
    /// Multiple of `size`
    pub line_height: f32,
    pub align: TextAlign,
    pub wrap: WrapPolicy,
    pub max_width: Option<f32>,
}

impl TextStyle {
    /// Single-line, start-aligned text.
    pub fn new(family: FontFamily, size: f32, weight: u16, color: Color) -> Self {
        Self {
            family,
            size,
            weight,
            color,
            line_height: 1.2,
            align: TextAlign::Start,
            wrap: WrapPolicy::None,
            max_width: None,
        }
    }

    pub fn with_line_height(mut self, line_height: f32) -> Self {
        self.line_height = line_height;
        self
    }

    pub fn with_align(mut self, align: TextAlign) -> Self {
        self.align = align;
        self
    }

    pub fn with_wrap(mut self, wrap: WrapPolicy) -> Self {
        self.wrap = wrap;
        self
    }

    pub fn with_max_width(mut self, max_width: f32) -> Self {
        self.max_width = Some(max_width);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Row,
    Column,
}

/// Main-axis distribution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Justify {
    Start,
    Center,
    End,
    SpaceBetween,
}

/// Cross-axis placement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Align {
    Start,
    Center,
    End,
    /// Fill the container's cross size
    Stretch,
}

/// Container that places its flow children along one axis.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Flex {
    /// Absolute frame; `None` means the parent places this container
    pub frame: Option<Rect>,
    pub direction: Direction,
    pub justify: Justify,
    pub align: Align,
    pub gap: f32,
    pub padding: Insets,
    /// Share of the parent's spare main-axis space this container takes
    pub grow: f32,
    pub children: Vec<LayoutNode>,
}

impl Flex {
    fn new(direction: Direction) -> Self {
        Self {
            frame: None,
            direction,
            justify: Justify::Start,
            align: Align::Start,
            gap: 0.0,
            padding: Insets::ZERO,
            grow: 0.0,
            children: Vec::new(),
        }
    }

    pub fn row() -> Self {
        Self::new(Direction::Row)
    }

    pub fn column() -> Self {
        Self::new(Direction::Column)
    }

    pub fn with_frame(mut self, frame: Rect) -> Self {
        self.frame = Some(frame);
        self
    }

    pub fn with_justify(mut self, justify: Justify) -> Self {
        self.justify = justify;
        self
    }

    pub fn with_align(mut self, align: Align) -> Self {
        self.align = align;
        self
    }

    pub fn with_gap(mut self, gap: f32) -> Self {
        self.gap = gap;
        self
    }

    pub fn with_padding(mut self, padding: Insets) -> Self {
        self.padding = padding;
        self
    }

    pub fn with_grow(mut self, grow: f32) -> Self {
        self.grow = grow;
        self
    }

    pub fn child(mut self, node: LayoutNode) -> Self {
        self.children.push(node);
        self
    }

    /// Append `node` when present.
    pub fn child_opt(mut self, node: Option<LayoutNode>) -> Self {
        self.children.extend(node);
        self
    }

    pub fn children(mut self, nodes: impl IntoIterator<Item = LayoutNode>) -> Self {
        self.children.extend(nodes);
        self
    }

    pub fn into_node(self, elem_type: ElementType) -> LayoutNode {
        LayoutNode {
            elem_type,
            kind: NodeKind::Flex(self),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Glyph {
    /// Map pin outline, drawn on a 24-unit grid
    Pin,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NodeKind {
    Fill {
        rect: Rect,
        paint: Paint,
        opacity: f32,
    },
    Circle {
        cx: f32,
        cy: f32,
        radius: f32,
        color: Color,
        opacity: f32,
    },
    Text {
        content: String,
        style: TextStyle,
    },
    Icon {
        glyph: Glyph,
        size: f32,
        color: Color,
        stroke_width: f32,
    },
    Flex(Flex),
}

/// What a node means on the card, independent of how it is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementType {
    Background,
    Rule,
    Circle,
    AccentBar,
    Title,
    Subtitle,
    Author,
    Date,
    Location,
    Tag,
    Pin,
    Group,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayoutNode {
    pub elem_type: ElementType,
    #[serde(flatten)]
    pub kind: NodeKind,
}

impl LayoutNode {
    pub fn fill(elem_type: ElementType, rect: Rect, paint: impl Into<Paint>, opacity: f32) -> Self {
        Self {
            elem_type,
            kind: NodeKind::Fill {
                rect,
                paint: paint.into(),
                opacity,
            },
        }
    }

    pub fn circle(elem_type: ElementType, cx: f32, cy: f32, radius: f32, color: Color, opacity: f32) -> Self {
        Self {
            elem_type,
            kind: NodeKind::Circle {
                cx,
                cy,
                radius,
                color,
                opacity,
            },
        }
    }

    pub fn text(elem_type: ElementType, content: impl Into<String>, style: TextStyle) -> Self {
        Self {
            elem_type,
            kind: NodeKind::Text {
                content: content.into(),
                style,
            },
        }
    }

    pub fn icon(elem_type: ElementType, glyph: Glyph, size: f32, color: Color, stroke_width: f32) -> Self {
        Self {
            elem_type,
            kind: NodeKind::Icon {
                glyph,
                size,
                color,
                stroke_width,
            },
        }
    }

    /// Absolute nodes are drawn at their own geometry and take no flow space.
    pub fn is_absolute(&self) -> bool {
        match &self.kind {
            NodeKind::Fill { .. } | NodeKind::Circle { .. } => true,
            NodeKind::Flex(flex) => flex.frame.is_some(),
            NodeKind::Text { .. } | NodeKind::Icon { .. } => false,
        }
    }

    pub fn children(&self) -> &[LayoutNode] {
        match &self.kind {
            NodeKind::Flex(flex) => &flex.children,
            _ => &[],
        }
    }

    pub fn text_content(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Text { content, .. } => Some(content),
            _ => None,
        }
    }

    pub fn text_style(&self) -> Option<&TextStyle> {
        match &self.kind {
            NodeKind::Text { style, .. } => Some(style),
            _ => None,
        }
    }

    fn walk<'a>(&'a self, out: &mut Vec<&'a LayoutNode>) {
        out.push(self);
        for child in self.children() {
            child.walk(out);
        }
    }
}

/// A complete card: canvas size, node tree, and the fonts it needs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayoutTree {
    pub width: u32,
    pub height: u32,
    pub root: LayoutNode,
    pub fonts: Vec<FontRequest>,
}

impl LayoutTree {
    /// All nodes in paint order (depth-first, pre-order).
    pub fn nodes(&self) -> Vec<&LayoutNode> {
        let mut out = Vec::new();
        self.root.walk(&mut out);
        out
    }

    pub fn find_all(&self, elem_type: ElementType) -> Vec<&LayoutNode> {
        self.nodes()
            .into_iter()
            .filter(|n| n.elem_type == elem_type)
            .collect()
    }

    pub fn find(&self, elem_type: ElementType) -> Option<&LayoutNode> {
        self.nodes().into_iter().find(|n| n.elem_type == elem_type)
    }

    pub fn count(&self, elem_type: ElementType) -> usize {
        self.find_all(elem_type).len()
    }

    /// Compact JSON in declaration order.
    pub fn to_canonical_json(&self) -> Result<String> {
        serde_json::to_string(self)
            .map_err(|e| Error::RenderError(format!("Failed to serialize layout: {}", e)))
    }

    /// Lowercase hex SHA-256 of [`Self::to_canonical_json`].
    pub fn digest(&self) -> Result<String> {
        let json = self.to_canonical_json()?;
        Ok(hex::encode(Sha256::digest(json.as_bytes())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> LayoutTree {
        let style = TextStyle::new(FontFamily::SansSerif, 32.0, 700, Color::hex(0x111111));
        let root = Flex::column()
            .with_frame(Rect::new(0.0, 0.0, 200.0, 100.0))
            .child(LayoutNode::fill(
                ElementType::Background,
                Rect::new(0.0, 0.0, 200.0, 100.0),
                Color::hex(0xffffff),
                1.0,
            ))
            .child(
                Flex::row()
                    .child(LayoutNode::text(ElementType::Tag, "#a", style.clone()))
                    .child(LayoutNode::text(ElementType::Tag, "#b", style.clone()))
                    .into_node(ElementType::Group),
            )
            .child(LayoutNode::text(ElementType::Title, "Hi", style))
            .into_node(ElementType::Group);
        LayoutTree {
            width: 200,
            height: 100,
            root,
            fonts: Vec::new(),
        }
    }

    #[test]
    fn nodes_are_walked_in_paint_order() {
        let tree = sample();
        let types: Vec<ElementType> = tree.nodes().iter().map(|n| n.elem_type).collect();
        assert_eq!(
            types,
            vec![
                ElementType::Group,
                ElementType::Background,
                ElementType::Group,
                ElementType::Tag,
                ElementType::Tag,
                ElementType::Title,
            ]
        );
        let tags: Vec<&str> = tree
            .find_all(ElementType::Tag)
            .iter()
            .filter_map(|n| n.text_content())
            .collect();
        assert_eq!(tags, vec!["#a", "#b"]);
        assert_eq!(tree.count(ElementType::Rule), 0);
    }

    #[test]
    fn absolute_nodes_are_fills_circles_and_framed_containers() {
        let tree = sample();
        assert!(tree.root.is_absolute());
        assert!(tree.root.children()[0].is_absolute());
        assert!(!tree.root.children()[1].is_absolute());
        assert!(!tree.root.children()[2].is_absolute());
    }

    #[test]
    fn canonical_json_is_tagged_and_stable() {
        let tree = sample();
        let json = tree.to_canonical_json().unwrap();
        assert!(json.contains("\"elem_type\":\"background\""));
        assert!(json.contains("\"type\":\"fill\""));
        assert!(json.contains("\"color\":\"#ffffff\""));
        assert_eq!(json, sample().to_canonical_json().unwrap());
        let digest = tree.digest().unwrap();
        assert_eq!(digest.len(), 64);
        assert_eq!(digest, sample().digest().unwrap());
    }

    #[test]
    fn inset_clamps_at_zero() {
        let r = Rect::new(10.0, 10.0, 100.0, 50.0).inset(&Insets::symmetric(30.0, 60.0));
        assert_eq!(r, Rect::new(70.0, 40.0, 0.0, 0.0));
    }
}
