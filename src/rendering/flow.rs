//! Flex placement for the raster backend.
//!
//! Containers place their flow children along the main axis:
//!
//! - In a row, text and icons keep their measured width; nested containers
//!   share the width that is left and are clamped to it.
//! - Free space goes to children with a positive `grow`. On overflow, those
//!   same children give space back first, so fixed siblings such as a footer
//!   stay where `justify` puts them.
//! - Remaining overflow under `Center`/`End` spills past the start edge;
//!   row items that would end past the inner edge are clipped whole.

use super::layout::{Align, Direction, ElementType, Flex, Justify, LayoutNode, LayoutTree, NodeKind, Rect, TextStyle};
use super::text::TextBlock;
use crate::Result;

/// Tolerance for sub-pixel rounding when deciding whether a row item fits.
const FIT_EPSILON: f32 = 0.5;

/// Source of text metrics; the painter measures with real faces.
pub trait TextMeasure {
    fn text_block(&self, content: &str, style: &TextStyle, available: f32) -> Result<TextBlock>;
}

/// Where a child of a container goes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Slot {
    /// Absolute child; it is drawn against the container frame.
    Absolute,
    Flow(Rect),
    /// Row item that did not fit; it is not drawn.
    Clipped,
}

fn is_container(node: &LayoutNode) -> bool {
    matches!(node.kind, NodeKind::Flex(_))
}

fn grow_of(node: &LayoutNode) -> f32 {
    match &node.kind {
        NodeKind::Flex(flex) => flex.grow.max(0.0),
        _ => 0.0,
    }
}

/// Flow size of `node` given `available` width; absolute nodes take none.
pub fn measure<M: TextMeasure + ?Sized>(m: &M, node: &LayoutNode, available: f32) -> Result<(f32, f32)> {
    if node.is_absolute() {
        return Ok((0.0, 0.0));
    }
    match &node.kind {
        NodeKind::Text { content, style } => {
            let block = m.text_block(content, style, available)?;
            Ok((block.width, block.height))
        }
        NodeKind::Icon { size, .. } => Ok((*size, *size)),
        NodeKind::Flex(flex) => {
            let inner = (available - flex.padding.horizontal()).max(0.0);
            let mut sizes = Vec::new();
            for child in flex.children.iter().filter(|c| !c.is_absolute()) {
                sizes.push(measure(m, child, inner)?);
            }
            let gaps = flex.gap * sizes.len().saturating_sub(1) as f32;
            let (w, h) = match flex.direction {
                Direction::Row => (
                    sizes.iter().map(|s| s.0).sum::<f32>() + gaps,
                    sizes.iter().map(|s| s.1).fold(0.0, f32::max),
                ),
                Direction::Column => (
                    sizes.iter().map(|s| s.0).fold(0.0, f32::max),
                    sizes.iter().map(|s| s.1).sum::<f32>() + gaps,
                ),
            };
            Ok((w + flex.padding.horizontal(), h + flex.padding.vertical()))
        }
        NodeKind::Fill { .. } | NodeKind::Circle { .. } => Ok((0.0, 0.0)),
    }
}

struct Item {
    index: usize,
    main: f32,
    cross: f32,
    grow: f32,
}

/// Take up to `overflow` pixels from the items `pick` selects, in
/// proportion to their size. Returns what could not be taken.
fn absorb(items: &mut [Item], overflow: f32, pick: impl Fn(&Item) -> bool) -> f32 {
    let total: f32 = items.iter().filter(|i| pick(i)).map(|i| i.main).sum();
    if total <= 0.0 {
        return overflow;
    }
    let taken = overflow.min(total);
    for item in items.iter_mut().filter(|i| pick(i)) {
        item.main -= taken * item.main / total;
    }
    overflow - taken
}

/// Slots for every child of `flex` placed in `frame`, in child order.
pub fn arrange<M: TextMeasure + ?Sized>(m: &M, flex: &Flex, frame: Rect) -> Result<Vec<Slot>> {
    let inner = frame.inset(&flex.padding);
    let row = flex.direction == Direction::Row;
    let (inner_main, inner_cross) = if row {
        (inner.width, inner.height)
    } else {
        (inner.height, inner.width)
    };

    let flow: Vec<usize> = flex
        .children
        .iter()
        .enumerate()
        .filter(|(_, c)| !c.is_absolute())
        .map(|(i, _)| i)
        .collect();
    let gaps = flex.gap * flow.len().saturating_sub(1) as f32;

    let mut sizes = vec![(0.0, 0.0); flow.len()];
    if row {
        let mut rigid = 0.0;
        let mut containers = 0usize;
        for (k, &i) in flow.iter().enumerate() {
            let child = &flex.children[i];
            if is_container(child) {
                containers += 1;
            } else {
                sizes[k] = measure(m, child, inner.width)?;
                rigid += sizes[k].0;
            }
        }
        let share = (inner_main - rigid - gaps).max(0.0) / containers.max(1) as f32;
        for (k, &i) in flow.iter().enumerate() {
            let child = &flex.children[i];
            if is_container(child) {
                let (w, h) = measure(m, child, share)?;
                sizes[k] = (w.min(share), h);
            }
        }
    } else {
        for (k, &i) in flow.iter().enumerate() {
            sizes[k] = measure(m, &flex.children[i], inner.width)?;
        }
    }

    let mut items: Vec<Item> = flow
        .iter()
        .zip(sizes)
        .map(|(&index, (w, h))| {
            let (main, cross) = if row { (w, h) } else { (h, w) };
            let cross = if flex.align == Align::Stretch {
                inner_cross
            } else {
                cross.min(inner_cross)
            };
            Item {
                index,
                main,
                cross,
                grow: grow_of(&flex.children[index]),
            }
        })
        .collect();

    let used: f32 = items.iter().map(|i| i.main).sum::<f32>() + gaps;
    let mut free = inner_main - used;
    let total_grow: f32 = items.iter().map(|i| i.grow).sum();
    if free > 0.0 && total_grow > 0.0 {
        for item in items.iter_mut() {
            item.main += free * item.grow / total_grow;
        }
        free = 0.0;
    } else if free < 0.0 {
        free = -absorb(&mut items, -free, |i| i.grow > 0.0);
    }

    let (mut cursor, spacing) = match flex.justify {
        Justify::Start => (0.0, flex.gap),
        Justify::Center => (free / 2.0, flex.gap),
        Justify::End => (free, flex.gap),
        Justify::SpaceBetween if items.len() > 1 => {
            (0.0, flex.gap + free.max(0.0) / (items.len() - 1) as f32)
        }
        Justify::SpaceBetween => (0.0, flex.gap),
    };

    let mut slots = vec![Slot::Absolute; flex.children.len()];
    for item in &items {
        let cross_offset = match flex.align {
            Align::Start | Align::Stretch => 0.0,
            Align::Center => (inner_cross - item.cross) / 2.0,
            Align::End => inner_cross - item.cross,
        };
        slots[item.index] = if row {
            let rect = Rect::new(inner.x + cursor, inner.y + cross_offset, item.main, item.cross);
            if rect.right() > inner.right() + FIT_EPSILON {
                Slot::Clipped
            } else {
                Slot::Flow(rect)
            }
        } else {
            Slot::Flow(Rect::new(inner.x + cross_offset, inner.y + cursor, item.cross, item.main))
        };
        cursor += item.main + spacing;
    }
    Ok(slots)
}

/// Every flow-placed node of `tree` with its slot, in paint order. Absolute
/// and clipped nodes are left out.
pub fn placements<M: TextMeasure + ?Sized>(m: &M, tree: &LayoutTree) -> Result<Vec<(ElementType, Rect)>> {
    let canvas = Rect::new(0.0, 0.0, tree.width as f32, tree.height as f32);
    let mut out = Vec::new();
    collect(m, &tree.root, canvas, &mut out)?;
    Ok(out)
}

fn collect<M: TextMeasure + ?Sized>(
    m: &M,
    node: &LayoutNode,
    slot: Rect,
    out: &mut Vec<(ElementType, Rect)>,
) -> Result<()> {
    let NodeKind::Flex(flex) = &node.kind else {
        return Ok(());
    };
    let frame = flex.frame.unwrap_or(slot);
    for (child, slot) in flex.children.iter().zip(arrange(m, flex, frame)?) {
        if let Slot::Flow(rect) = slot {
            out.push((child.elem_type, rect));
            collect(m, child, rect, out)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::{decode, QueryParams, TemplateMode};
    use crate::rendering::layout::Insets;
    use crate::rendering::text::layout_text;
    use crate::rendering::{self, OG_HEIGHT, OG_WIDTH};

    /// Every character is `size * 0.6` wide.
    struct Monospace;

    impl TextMeasure for Monospace {
        fn text_block(&self, content: &str, style: &TextStyle, available: f32) -> Result<TextBlock> {
            let advance = style.size * 0.6;
            Ok(layout_text(content, style, available, |s| s.chars().count() as f32 * advance))
        }
    }

    fn card(q: &str, mode: TemplateMode) -> Vec<(ElementType, Rect)> {
        let tree = rendering::render(&decode(&QueryParams::parse(q), mode));
        placements(&Monospace, &tree).unwrap()
    }

    fn find(placed: &[(ElementType, Rect)], ty: ElementType) -> Vec<Rect> {
        placed.iter().filter(|(t, _)| *t == ty).map(|(_, r)| *r).collect()
    }

    fn on_canvas(r: &Rect) -> bool {
        r.x >= 0.0 && r.y >= 0.0 && r.right() <= OG_WIDTH as f32 && r.bottom() <= OG_HEIGHT as f32
    }

    #[test]
    fn many_tags_keep_the_author_on_the_canvas() {
        let placed = card(
            "title=Hello&author=Someone&tags=rust,webdevelopment,opengraph,typography,rendering,tinyskia,layout,images",
            TemplateMode::Post,
        );
        let author = find(&placed, ElementType::Author);
        assert_eq!(author.len(), 1);
        assert!(on_canvas(&author[0]), "author at {:?}", author[0]);
        assert!((author[0].right() - (OG_WIDTH as f32 - 80.0)).abs() < 0.01);

        let tags = find(&placed, ElementType::Tag);
        assert!(!tags.is_empty() && tags.len() < 8, "{} tags placed", tags.len());
        for tag in &tags {
            assert!(tag.right() <= author[0].x, "tag {:?} runs into the author", tag);
        }
    }

    #[test]
    fn few_tags_are_all_placed() {
        let placed = card("title=Hello&tags=rust,web", TemplateMode::Post);
        assert_eq!(find(&placed, ElementType::Tag).len(), 2);
        let author = find(&placed, ElementType::Author)[0];
        assert!((author.right() - (OG_WIDTH as f32 - 80.0)).abs() < 0.01);
    }

    #[test]
    fn long_title_keeps_the_footer_anchored() {
        let long = "word ".repeat(80);
        let placed = card(&format!("title={}&date=2025-01-01&tags=a", long), TemplateMode::Post);
        let short = card("title=Hi&date=2025-01-01&tags=a", TemplateMode::Post);

        for ty in [ElementType::Author, ElementType::Date, ElementType::Tag] {
            let a = find(&placed, ty)[0];
            let b = find(&short, ty)[0];
            assert!(
                (a.x - b.x).abs() < 0.01 && (a.y - b.y).abs() < 0.01,
                "{:?} moved from {:?} to {:?}",
                ty,
                b,
                a
            );
            assert!(on_canvas(&a));
        }

        let title = find(&placed, ElementType::Title)[0];
        let date = find(&placed, ElementType::Date)[0];
        assert!(title.bottom() <= date.y, "title {:?} overlaps the footer", title);
    }

    #[test]
    fn grow_fills_free_space() {
        let child = Flex::column().with_grow(1.0).into_node(ElementType::Group);
        let fixed = Flex::column()
            .with_padding(Insets::new(50.0, 0.0, 0.0, 0.0))
            .into_node(ElementType::Group);
        let flex = Flex::column().child(child).child(fixed);
        let slots = arrange(&Monospace, &flex, Rect::new(0.0, 0.0, 100.0, 200.0)).unwrap();
        assert_eq!(slots[0], Slot::Flow(Rect::new(0.0, 0.0, 0.0, 150.0)));
        assert_eq!(slots[1], Slot::Flow(Rect::new(0.0, 150.0, 0.0, 50.0)));

        let stretched = flex.with_align(Align::Stretch);
        let slots = arrange(&Monospace, &stretched, Rect::new(0.0, 0.0, 100.0, 200.0)).unwrap();
        assert_eq!(slots[0], Slot::Flow(Rect::new(0.0, 0.0, 100.0, 150.0)));
    }

    #[test]
    fn row_containers_shrink_to_what_is_left() {
        let wide = Flex::row()
            .with_padding(Insets::new(0.0, 300.0, 10.0, 0.0))
            .into_node(ElementType::Group);
        let style = TextStyle::new(
            crate::rendering::layout::FontFamily::SansSerif,
            10.0,
            400,
            crate::theme::Color::hex(0),
        );
        let label = LayoutNode::text(ElementType::Author, "abcdefghij", style);
        let flex = Flex::row().with_justify(Justify::SpaceBetween).child(wide).child(label);

        let slots = arrange(&Monospace, &flex, Rect::new(0.0, 0.0, 200.0, 20.0)).unwrap();
        assert_eq!(slots[0], Slot::Flow(Rect::new(0.0, 0.0, 140.0, 10.0)));
        let Slot::Flow(label) = slots[1] else {
            panic!("label not placed: {:?}", slots[1]);
        };
        assert_eq!((label.x, label.width), (140.0, 60.0));
    }

    #[test]
    fn centered_themed_content_stays_centered_when_it_overflows() {
        let long = "word ".repeat(120);
        let placed = card(&format!("title={}&fontSize=xl", long), TemplateMode::Themed);
        let title = find(&placed, ElementType::Title)[0];
        let middle = title.y + title.height / 2.0;
        assert!((middle - OG_HEIGHT as f32 / 2.0).abs() < 1.0, "title {:?}", title);
    }
}
