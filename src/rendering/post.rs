//! Post metadata card.
//!
//! A bottom-anchored title over a footer with date, location and tags on the
//! left and the author on the right. Colors and sizes are fixed; the card has
//! no theme.

use crate::fonts::{FontRequest, PRETENDARD, PRETENDARD_BOLD_URL, PRETENDARD_MEDIUM_URL};
use crate::params::PostParams;
use crate::theme::Color;

use super::layout::{
    Align, ElementType, Flex, FontFamily, Glyph, Insets, Justify, LayoutNode, LayoutTree, Rect,
    TextStyle, WrapPolicy,
};
use super::{OG_HEIGHT, OG_WIDTH};

const BACKGROUND: Color = Color::hex(0xfafaf8);
const TITLE_COLOR: Color = Color::hex(0x1a1a1a);
const META_COLOR: Color = Color::hex(0x999999);
const TAG_COLOR: Color = Color::hex(0xb33a3a);
const AUTHOR_COLOR: Color = Color::hex(0x333333);

const PADDING: Insets = Insets::symmetric(60.0, 80.0);
const TITLE_SIZE: f32 = 64.0;
const META_SIZE: f32 = 28.0;
const TAG_SIZE: f32 = 24.0;
const AUTHOR_SIZE: f32 = 28.0;
const PIN_SIZE: f32 = 22.0;

const BOLD: u16 = 700;
const MEDIUM: u16 = 500;

fn face() -> FontFamily {
    FontFamily::Named(PRETENDARD.to_string())
}

/// Lay out the post card.
pub fn render(params: &PostParams) -> LayoutTree {
    let canvas = Rect::new(0.0, 0.0, OG_WIDTH as f32, OG_HEIGHT as f32);

    let title = LayoutNode::text(
        ElementType::Title,
        params.title.as_str(),
        TextStyle::new(face(), TITLE_SIZE, BOLD, TITLE_COLOR)
            .with_line_height(1.3)
            .with_wrap(WrapPolicy::KeepAll),
    );
    let title_region = Flex::column()
        .with_grow(1.0)
        .with_justify(Justify::End)
        .with_padding(Insets::new(0.0, 0.0, 40.0, 0.0))
        .child(title)
        .into_node(ElementType::Group);

    let left = Flex::column()
        .with_gap(12.0)
        .child_opt(meta_line(params))
        .child_opt(tags_line(&params.tags))
        .into_node(ElementType::Group);

    let author = LayoutNode::text(
        ElementType::Author,
        params.author.as_str(),
        TextStyle::new(face(), AUTHOR_SIZE, BOLD, AUTHOR_COLOR),
    );

    let footer = Flex::row()
        .with_justify(Justify::SpaceBetween)
        .with_align(Align::End)
        .child(left)
        .child(author)
        .into_node(ElementType::Group);

    let root = Flex::column()
        .with_frame(canvas)
        .with_padding(PADDING)
        .with_justify(Justify::SpaceBetween)
        .with_align(Align::Stretch)
        .child(LayoutNode::fill(ElementType::Background, canvas, BACKGROUND, 1.0))
        .child(title_region)
        .child(footer)
        .into_node(ElementType::Group);

    LayoutTree {
        width: OG_WIDTH,
        height: OG_HEIGHT,
        root,
        fonts: vec![
            FontRequest::new(PRETENDARD, PRETENDARD_BOLD_URL, BOLD),
            FontRequest::new(PRETENDARD, PRETENDARD_MEDIUM_URL, MEDIUM),
        ],
    }
}

fn meta_style() -> TextStyle {
    TextStyle::new(face(), META_SIZE, MEDIUM, META_COLOR)
}

/// Date and pinned location; `None` when both are absent.
fn meta_line(params: &PostParams) -> Option<LayoutNode> {
    if params.date.is_none() && params.location.is_none() {
        return None;
    }

    let date = params
        .date
        .as_deref()
        .map(|d| LayoutNode::text(ElementType::Date, d, meta_style()));

    let location = params.location.as_deref().map(|loc| {
        Flex::row()
            .with_align(Align::Center)
            .with_gap(6.0)
            .child(LayoutNode::icon(ElementType::Pin, Glyph::Pin, PIN_SIZE, META_COLOR, 2.0))
            .child(LayoutNode::text(ElementType::Location, loc, meta_style()))
            .into_node(ElementType::Group)
    });

    Some(
        Flex::row()
            .with_align(Align::Center)
            .with_gap(16.0)
            .child_opt(date)
            .child_opt(location)
            .into_node(ElementType::Group),
    )
}

fn tags_line(tags: &[String]) -> Option<LayoutNode> {
    if tags.is_empty() {
        return None;
    }
    let style = TextStyle::new(face(), TAG_SIZE, MEDIUM, TAG_COLOR);
    Some(
        Flex::row()
            .with_gap(12.0)
            .children(
                tags.iter()
                    .map(|t| LayoutNode::text(ElementType::Tag, format!("#{}", t), style.clone())),
            )
            .into_node(ElementType::Group),
    )
}
