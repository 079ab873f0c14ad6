//! Card templates, the layout tree they produce, and the raster adapter.

pub mod flow;
pub mod layout;
pub mod post;
pub mod raster;
pub mod text;
pub mod themed;

use crate::params::ImageParams;
use layout::LayoutTree;

/// Fixed card width in pixels
pub const OG_WIDTH: u32 = 1200;
/// Fixed card height in pixels
pub const OG_HEIGHT: u32 = 630;

/// A rasterized card
#[derive(Debug, Clone)]
pub struct RenderedImage {
    pub width: u32,
    pub height: u32,
    pub png_data: Vec<u8>,
}

impl RenderedImage {
    pub fn empty(width: u32, height: u32) -> Self {
        Self { width, height, png_data: Vec::new() }
    }
}

/// Lay out the card selected by the parameter variant.
pub fn render(params: &ImageParams) -> LayoutTree {
    match params {
        ImageParams::Post(p) => post::render(p),
        ImageParams::Themed(p) => themed::render(p),
    }
}
