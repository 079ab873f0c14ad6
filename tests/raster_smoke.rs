//! Full cards through the tiny-skia backend.
//!
//! Needs a real face on disk; uses DejaVu Sans when it is installed and skips
//! otherwise.

use std::path::Path;

use ogcard::fonts::FontAsset;
use ogcard::params::{decode, QueryParams};
use ogcard::rendering::raster::{PixmapRasterizer, Rasterizer};
use ogcard::rendering::{self, RenderedImage};
use ogcard::{LayoutTree, TemplateMode};

const DEJAVU: &str = "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf";

fn face_bytes() -> Option<Vec<u8>> {
    if !Path::new(DEJAVU).exists() {
        println!("{} not installed; skipping", DEJAVU);
        return None;
    }
    std::fs::read(DEJAVU).ok()
}

fn png_size(image: &RenderedImage) -> (u32, u32) {
    let ihdr = &image.png_data[16..24];
    (
        u32::from_be_bytes([ihdr[0], ihdr[1], ihdr[2], ihdr[3]]),
        u32::from_be_bytes([ihdr[4], ihdr[5], ihdr[6], ihdr[7]]),
    )
}

#[test]
fn themed_cards_render_with_the_sans_serif_face() {
    let Some(data) = face_bytes() else { return };
    let rasterizer = PixmapRasterizer::with_sans_serif(data);

    for q in [
        "title=Hello+World&subtitle=A+test&author=me&theme=gradient",
        "title=A+much+longer+title+that+has+to+wrap+over+more+than+one+line+of+the+card&theme=light&fontSize=xl",
        "theme=minimal",
    ] {
        let tree = rendering::render(&decode(&QueryParams::parse(q), TemplateMode::Themed));
        let image = rasterizer.rasterize(&tree, &[]).expect("rasterize");
        assert!(image.png_data.starts_with(b"\x89PNG\r\n\x1a\n"));
        assert_eq!(png_size(&image), (1200, 630));
    }
}

/// Stand the installed face in for every face `tree` requests.
fn stand_in_fonts(tree: &LayoutTree, data: &[u8]) -> Vec<FontAsset> {
    tree.fonts
        .iter()
        .map(|req| FontAsset {
            face_name: req.face_name.clone(),
            weight: req.weight,
            data: data.to_vec(),
        })
        .collect()
}

fn render_post(query: &str, data: &[u8]) -> RenderedImage {
    let tree = rendering::render(&decode(&QueryParams::parse(query), TemplateMode::Post));
    PixmapRasterizer::new()
        .rasterize(&tree, &stand_in_fonts(&tree, data))
        .expect("rasterize")
}

/// Opaque pixels of exactly `rgb` inside the `x0..`, `y0..` corner.
fn count_color(image: &RenderedImage, rgb: (u8, u8, u8), x0: u32, y0: u32) -> usize {
    let pixmap = tiny_skia::Pixmap::decode_png(&image.png_data).expect("decode png");
    let width = pixmap.width();
    pixmap
        .pixels()
        .iter()
        .enumerate()
        .filter(|(i, _)| *i as u32 % width >= x0 && *i as u32 / width >= y0)
        .filter(|(_, p)| p.alpha() == 255 && (p.red(), p.green(), p.blue()) == rgb)
        .count()
}

const AUTHOR: (u8, u8, u8) = (0x33, 0x33, 0x33);

#[test]
fn author_stays_visible_next_to_many_tags() {
    let Some(data) = face_bytes() else { return };
    let few = render_post("title=Hello&tags=rust,og", &data);
    let many = render_post(
        "title=Hello&tags=rust,webdevelopment,opengraph,typography,rendering,tinyskia,layout,images",
        &data,
    );
    let few_pixels = count_color(&few, AUTHOR, 900, 480);
    let many_pixels = count_color(&many, AUTHOR, 900, 480);
    assert!(few_pixels > 0, "author missing from the plain card");
    // Same glyphs at the same place, give or take sub-pixel placement.
    let diff = (many_pixels as f32 - few_pixels as f32).abs();
    assert!(
        diff <= few_pixels as f32 * 0.1,
        "author pixels: few tags {} many tags {}",
        few_pixels,
        many_pixels
    );
}

#[test]
fn long_title_leaves_the_footer_on_the_canvas() {
    let Some(data) = face_bytes() else { return };
    let title = "word+".repeat(60);
    let image = render_post(&format!("title={}&tags=rust", title), &data);
    assert!(count_color(&image, AUTHOR, 900, 480) > 0);
    assert!(count_color(&image, (0xb3, 0x3a, 0x3a), 0, 480) > 0, "tags missing");
}

#[test]
fn post_card_renders_with_supplied_faces() {
    let Some(data) = face_bytes() else { return };
    let tree = rendering::render(&decode(
        &QueryParams::parse("title=Hello&date=2025-03-01&location=Seoul&tags=rust,og"),
        TemplateMode::Post,
    ));
    let fonts = stand_in_fonts(&tree, &data);

    let image = PixmapRasterizer::new().rasterize(&tree, &fonts).expect("rasterize");
    assert_eq!(png_size(&image), (1200, 630));

    // Dropping one weight must fail instead of substituting the other.
    let err = PixmapRasterizer::new()
        .rasterize(&tree, &fonts[..1])
        .unwrap_err();
    assert!(matches!(err, ogcard::Error::RenderError(_)));
}
