//! Themed title card.
//!
//! Centered title and subtitle over a theme background, with theme-dependent
//! decoration:
//!
//! | theme      | decoration         | accent bar | face          |
//! |------------|--------------------|------------|---------------|
//! | `gradient` | none               | yes        | sans-serif    |
//! | `blog`     | two rule lines     | no         | serif display |
//! | others     | top-right circle   | yes        | sans-serif    |

use crate::fonts::{FontRequest, SERIF_BOLD_URL, SERIF_DISPLAY, SERIF_LIGHT_URL};
use crate::params::ThemedParams;
use crate::theme::{self, Theme};

use super::layout::{
    Align, ElementType, Flex, FontFamily, Insets, Justify, LayoutNode, LayoutTree, Rect, TextAlign,
    TextStyle, WrapPolicy,
};
use super::{OG_HEIGHT, OG_WIDTH};

const PADDING: Insets = Insets::symmetric(60.0, 80.0);
const CONTENT_MAX_WIDTH: f32 = 1000.0;
const SUBTITLE_SIZE: f32 = 28.0;
const SUBTITLE_GAP: f32 = 24.0;
const AUTHOR_SIZE: f32 = 24.0;
const AUTHOR_BAND_HEIGHT: f32 = 40.0;
const AUTHOR_BOTTOM: f32 = 60.0;

const RULE_INSET: f32 = 80.0;
const RULE_OPACITY: f32 = 0.3;
const CIRCLE_RADIUS: f32 = 200.0;
const CIRCLE_OPACITY: f32 = 0.1;
const ACCENT_BAR_HEIGHT: f32 = 6.0;

const BOLD: u16 = 700;
const REGULAR: u16 = 400;
const LIGHT: u16 = 300;

/// Lay out the themed card.
pub fn render(params: &ThemedParams) -> LayoutTree {
    let width = OG_WIDTH as f32;
    let height = OG_HEIGHT as f32;
    let canvas = Rect::new(0.0, 0.0, width, height);
    let profile = theme::lookup(params.theme);
    let is_blog = params.theme == Theme::Blog;

    let family = if is_blog {
        FontFamily::Named(SERIF_DISPLAY.to_string())
    } else {
        FontFamily::SansSerif
    };
    let body_weight = if is_blog { LIGHT } else { REGULAR };

    let mut root = Flex::column()
        .with_frame(canvas)
        .with_padding(PADDING)
        .with_justify(Justify::Center)
        .with_align(Align::Center)
        .child(LayoutNode::fill(
            ElementType::Background,
            canvas,
            &profile.background,
            1.0,
        ));

    match params.theme {
        Theme::Blog => {
            let accent = profile.accent_or_secondary();
            let rule_width = width - 2.0 * RULE_INSET;
            for y in [RULE_INSET, height - RULE_INSET] {
                root = root.child(LayoutNode::fill(
                    ElementType::Rule,
                    Rect::new(RULE_INSET, y, rule_width, 1.0),
                    accent,
                    RULE_OPACITY,
                ));
            }
        }
        Theme::Gradient => {}
        Theme::Light | Theme::Dark | Theme::Minimal => {
            root = root.child(LayoutNode::circle(
                ElementType::Circle,
                width + 100.0 - CIRCLE_RADIUS,
                CIRCLE_RADIUS - 100.0,
                CIRCLE_RADIUS,
                profile.accent_or_secondary(),
                CIRCLE_OPACITY,
            ));
        }
    }

    let title = LayoutNode::text(
        ElementType::Title,
        params.title.as_str(),
        TextStyle::new(
            family.clone(),
            theme::lookup_size(params.font_size) as f32,
            BOLD,
            profile.text_color,
        )
        .with_line_height(1.2)
        .with_align(TextAlign::Center)
        .with_wrap(WrapPolicy::Normal)
        .with_max_width(CONTENT_MAX_WIDTH),
    );

    let subtitle = params.subtitle.as_deref().map(|s| {
        LayoutNode::text(
            ElementType::Subtitle,
            s,
            TextStyle::new(family.clone(), SUBTITLE_SIZE, body_weight, profile.secondary_color)
                .with_line_height(1.4)
                .with_align(TextAlign::Center)
                .with_wrap(WrapPolicy::Normal)
                .with_max_width(CONTENT_MAX_WIDTH),
        )
    });

    let content = Flex::column()
        .with_align(Align::Center)
        .with_gap(SUBTITLE_GAP)
        .child(title)
        .child_opt(subtitle)
        .into_node(ElementType::Group);
    root = root.child(content);

    if let Some(author) = params.author.as_deref() {
        let band = Rect::new(
            PADDING.left,
            height - AUTHOR_BOTTOM - AUTHOR_BAND_HEIGHT,
            width - PADDING.horizontal(),
            AUTHOR_BAND_HEIGHT,
        );
        root = root.child(
            Flex::row()
                .with_frame(band)
                .with_justify(Justify::Center)
                .with_align(Align::Center)
                .child(LayoutNode::text(
                    ElementType::Author,
                    author,
                    TextStyle::new(family.clone(), AUTHOR_SIZE, body_weight, profile.secondary_color),
                ))
                .into_node(ElementType::Group),
        );
    }

    if !is_blog {
        root = root.child(LayoutNode::fill(
            ElementType::AccentBar,
            Rect::new(0.0, height - ACCENT_BAR_HEIGHT, width, ACCENT_BAR_HEIGHT),
            profile.accent_or_text(),
            1.0,
        ));
    }

    let fonts = if is_blog {
        vec![
            FontRequest::new(SERIF_DISPLAY, SERIF_BOLD_URL, BOLD),
            FontRequest::new(SERIF_DISPLAY, SERIF_LIGHT_URL, LIGHT),
        ]
    } else {
        Vec::new()
    };

    LayoutTree {
        width: OG_WIDTH,
        height: OG_HEIGHT,
        root: root.into_node(ElementType::Group),
        fonts,
    }
}
