//! Height measurement – the [`HeightProvider`] seam between the pagination
//! engine and whatever computes layout, plus the default taffy-backed
//! [`LayoutMeasurer`].
//!
//! The measurer lays out one element's subtree at a time. Block and table
//! boxes become flex columns, table rows become flex rows of equal-width
//! cells, and runs of inline content are wrapped with the [`fonts`] module
//! into a single text leaf.
//!
//! [`fonts`]: crate::fonts

use base64::{engine::general_purpose::STANDARD as BASE64_STD, Engine as _};
use taffy::{
    AvailableSpace, LengthPercentage, LengthPercentageAuto, Rect, Size, Style, TaffyError,
    TaffyTree,
};

use crate::dom::{Document, NodeId, Tag};
use crate::fonts::{FontBook, TextRun};
use crate::style::{
    resolve_style, ComputedStyle, Dimension, Display, Edges, FlexDirection, FontStyle,
    FontWeight, Position,
};

type LayoutNode = taffy::NodeId;

/// Containing width used when no ancestor declares a pixel width.
pub const DEFAULT_VIEWPORT_WIDTH: f32 = 750.0;

/// Inline overrides applied by [`HeightProvider::measure`] to get a reading
/// from an element that currently renders nothing.
const FORCED_VISIBLE: [(&str, &str); 3] = [
    ("display", "block"),
    ("visibility", "hidden"),
    ("position", "absolute"),
];

/// Round a height up to whole pixels, absorbing float noise. Negative and
/// non-finite values become 0.
pub fn normalize_height(value: f32) -> f32 {
    if !value.is_finite() {
        return 0.0;
    }
    let v = (value - 1e-6).ceil();
    if v > 0.0 {
        v
    } else {
        0.0
    }
}

/// Rendered element heights, the one capability the engine borrows from its host.
pub trait HeightProvider {
    /// Height of `id` in px including vertical margins. Never mutates the
    /// document. Returns 0 for detached or undisplayed elements.
    fn measure_raw(&self, doc: &Document, id: NodeId) -> f32;

    /// Normalized height. A zero reading is retried with the element forced
    /// visible; its inline `display`, `visibility` and `position` are
    /// restored before returning.
    fn measure(&self, doc: &mut Document, id: NodeId) -> f32 {
        let raw = self.measure_raw(doc, id);
        if raw > 0.0 {
            return normalize_height(raw);
        }
        let saved: Vec<Option<String>> = FORCED_VISIBLE
            .iter()
            .map(|(prop, _)| doc.style_property(id, prop))
            .collect();
        for (prop, value) in FORCED_VISIBLE {
            doc.set_style_property(id, prop, value);
        }
        let forced = self.measure_raw(doc, id);
        for ((prop, _), old) in FORCED_VISIBLE.iter().zip(saved) {
            match old {
                Some(v) => doc.set_style_property(id, prop, &v),
                None => doc.remove_style_property(id, prop),
            }
        }
        normalize_height(forced)
    }
}

// ---------------------------------------------------------------------------
// Default measurer
// ---------------------------------------------------------------------------

/// Measures elements by laying out their subtree with taffy.
pub struct LayoutMeasurer {
    fonts: FontBook,
    viewport_width: f32,
}

impl Default for LayoutMeasurer {
    fn default() -> Self {
        Self::new()
    }
}

impl LayoutMeasurer {
    pub fn new() -> Self {
        Self {
            fonts: FontBook::default(),
            viewport_width: DEFAULT_VIEWPORT_WIDTH,
        }
    }

    pub fn with_viewport_width(mut self, width: f32) -> Self {
        if width.is_finite() && width > 0.0 {
            self.viewport_width = width;
        }
        self
    }

    pub fn with_fonts(mut self, fonts: FontBook) -> Self {
        self.fonts = fonts;
        self
    }

    pub fn viewport_width(&self) -> f32 {
        self.viewport_width
    }

    /// Inherited style and containing width for `id`, or `None` when an
    /// ancestor is not displayed.
    fn context_of(&self, doc: &Document, id: NodeId) -> Option<(Option<ComputedStyle>, f32)> {
        let mut chain = doc.ancestors(id);
        chain.reverse();
        let mut parent: Option<ComputedStyle> = None;
        let mut width = self.viewport_width;
        for a in chain {
            if !doc.is_element(a) {
                continue;
            }
            let s = resolve_style(doc, a, parent.as_ref());
            if s.display == Display::None {
                return None;
            }
            if let Dimension::Px(w) = s.width {
                width = w.max(0.0);
            }
            parent = Some(s);
        }
        Some((parent, width))
    }

    fn layout_height(&self, doc: &Document, id: NodeId) -> Result<f32, TaffyError> {
        if !doc.is_element(id) || doc.ancestors(id).last() != Some(&doc.root()) {
            return Ok(0.0);
        }
        let Some((parent_style, containing)) = self.context_of(doc, id) else {
            return Ok(0.0);
        };
        let style = resolve_style(doc, id, parent_style.as_ref());
        let mut builder = LayoutBuilder {
            taffy: TaffyTree::new(),
            fonts: &self.fonts,
            doc,
        };
        let Some(node) = builder.build_element(id, &style, containing, ItemContext::Root)? else {
            return Ok(0.0);
        };

        let wrapper_style = Style {
            display: taffy::Display::Flex,
            flex_direction: taffy::FlexDirection::Column,
            size: Size {
                width: taffy::Dimension::Length(containing),
                height: taffy::Dimension::Auto,
            },
            ..Default::default()
        };
        let wrapper = builder.taffy.new_with_children(wrapper_style, &[node])?;
        builder.taffy.compute_layout(
            wrapper,
            Size {
                width: AvailableSpace::Definite(containing),
                height: AvailableSpace::MaxContent,
            },
        )?;
        let layout = builder.taffy.layout(node)?;
        Ok(layout.size.height + style.vertical_margins())
    }
}

impl HeightProvider for LayoutMeasurer {
    fn measure_raw(&self, doc: &Document, id: NodeId) -> f32 {
        match self.layout_height(doc, id) {
            Ok(h) if h.is_finite() => h.max(0.0),
            Ok(_) => 0.0,
            Err(e) => {
                log::warn!("layout failed for node {}: {e:?}", id.index());
                0.0
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Build a taffy tree from a DOM subtree
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ItemContext {
    Root,
    Column,
    Row,
}

struct LayoutBuilder<'a> {
    taffy: TaffyTree<()>,
    fonts: &'a FontBook,
    doc: &'a Document,
}

impl LayoutBuilder<'_> {
    fn build_element(
        &mut self,
        id: NodeId,
        style: &ComputedStyle,
        outer_width: f32,
        ctx: ItemContext,
    ) -> Result<Option<LayoutNode>, TaffyError> {
        if style.display == Display::None {
            return Ok(None);
        }
        let mut ts = to_taffy(style, ctx);

        if self.doc.tag(id) == Some(&Tag::Img) {
            let (w, h) = self.image_size(id, style, outer_width);
            ts.size = Size {
                width: taffy::Dimension::Length(w + horizontal_box(style)),
                height: taffy::Dimension::Length(h + vertical_box(style)),
            };
            return Ok(Some(self.taffy.new_leaf(ts)?));
        }

        let inner = content_width(style, outer_width);
        let children = self.build_children(id, style, inner)?;
        Ok(Some(self.taffy.new_with_children(ts, &children)?))
    }

    fn build_children(
        &mut self,
        id: NodeId,
        style: &ComputedStyle,
        inner_width: f32,
    ) -> Result<Vec<LayoutNode>, TaffyError> {
        let row_layout = style.display == Display::TableRow
            || (style.display == Display::Flex && style.flex_direction == FlexDirection::Row);
        let child_ctx = if row_layout {
            ItemContext::Row
        } else {
            ItemContext::Column
        };

        let visible: Vec<(NodeId, ComputedStyle)> = self
            .doc
            .children(id)
            .iter()
            .filter(|&&c| self.doc.is_element(c))
            .map(|&c| (c, resolve_style(self.doc, c, Some(style))))
            .filter(|(_, s)| s.display != Display::None)
            .collect();
        let column_width = if row_layout {
            inner_width / visible.len().max(1) as f32
        } else {
            inner_width
        };

        let mut nodes = Vec::new();
        let mut inline_run = String::new();
        for &c in self.doc.children(id) {
            if let Some(t) = self.doc.text(c) {
                inline_run.push_str(&collapse_source_breaks(t));
                continue;
            }
            let Some((_, cs)) = visible.iter().find(|(n, _)| *n == c) else {
                continue;
            };
            if self.is_inline_level(c, cs) {
                self.collect_inline_text(c, cs, &mut inline_run);
                continue;
            }
            self.flush_text(&mut inline_run, style, inner_width, &mut nodes)?;
            let child_width = match cs.width {
                Dimension::Px(w) if row_layout => w,
                _ => column_width,
            };
            if let Some(n) = self.build_element(c, cs, child_width, child_ctx)? {
                nodes.push(n);
            }
        }
        self.flush_text(&mut inline_run, style, inner_width, &mut nodes)?;
        Ok(nodes)
    }

    /// Inline or inline-block with nothing but inline content below it.
    fn is_inline_level(&self, id: NodeId, style: &ComputedStyle) -> bool {
        if self.doc.tag(id) == Some(&Tag::Img) {
            return false;
        }
        if !matches!(style.display, Display::Inline | Display::InlineBlock) {
            return false;
        }
        self.doc.children(id).iter().all(|&c| {
            if !self.doc.is_element(c) {
                return true;
            }
            let cs = resolve_style(self.doc, c, Some(style));
            cs.display == Display::None || self.is_inline_level(c, &cs)
        })
    }

    fn collect_inline_text(&self, id: NodeId, style: &ComputedStyle, out: &mut String) {
        if self.doc.tag(id) == Some(&Tag::Br) {
            out.push('\n');
            return;
        }
        for &c in self.doc.children(id) {
            if let Some(t) = self.doc.text(c) {
                out.push_str(&collapse_source_breaks(t));
            } else if self.doc.is_element(c) {
                let cs = resolve_style(self.doc, c, Some(style));
                if cs.display != Display::None {
                    self.collect_inline_text(c, &cs, out);
                }
            }
        }
    }

    /// Turn the pending inline run into a wrapped text leaf.
    fn flush_text(
        &mut self,
        run: &mut String,
        style: &ComputedStyle,
        width: f32,
        nodes: &mut Vec<LayoutNode>,
    ) -> Result<(), TaffyError> {
        let raw = std::mem::take(run);
        let has_break = raw.contains('\n');
        let visible = raw.chars().any(|c| !c.is_ascii_whitespace());
        if !has_break && !visible {
            return Ok(());
        }
        let trimmed = raw.trim_end_matches(' ');
        let body = trimmed.strip_suffix('\n').unwrap_or(trimmed);

        let run = TextRun::new(&style.font_family, style.font_size)
            .bold(style.font_weight == FontWeight::Bold)
            .italic(style.font_style == FontStyle::Italic);
        let lines = self.fonts.break_lines(&run, body, width);
        let text_width = lines
            .iter()
            .map(|l| self.fonts.width(&run, l))
            .fold(0.0f32, f32::max)
            .min(width.max(0.0));
        let text_height = lines.len() as f32 * style.line_height_px();

        let leaf = self.taffy.new_leaf(Style {
            size: Size {
                width: taffy::Dimension::Length(text_width),
                height: taffy::Dimension::Length(text_height),
            },
            flex_shrink: 0.0,
            ..Default::default()
        })?;
        nodes.push(leaf);
        Ok(())
    }

    /// Content size of an `<img>`: declared sizes first, else intrinsic
    /// pixels from a base64 data URI, scaled to keep the aspect ratio.
    fn image_size(&self, id: NodeId, style: &ComputedStyle, outer_width: f32) -> (f32, f32) {
        let known_w = match style.width {
            Dimension::Px(v) => Some(v),
            Dimension::Percent(p) => Some(outer_width * p / 100.0),
            Dimension::Auto => None,
        };
        let known_h = match style.height {
            Dimension::Px(v) => Some(v),
            _ => None,
        };
        if let (Some(w), Some(h)) = (known_w, known_h) {
            return (w, h);
        }
        let intrinsic = self
            .doc
            .attr(id, "src")
            .and_then(intrinsic_image_size);
        match (known_w, known_h, intrinsic) {
            (Some(w), None, Some((iw, ih))) => (w, (w * ih / iw).max(1.0)),
            (None, Some(h), Some((iw, ih))) => ((h * iw / ih).max(1.0), h),
            (None, None, Some((iw, ih))) => (iw, ih),
            (w, h, None) => (w.unwrap_or(0.0), h.unwrap_or(0.0)),
            (Some(w), Some(h), _) => (w, h),
        }
    }
}

/// Source newlines and tabs are ordinary collapsible spaces; only `<br>`
/// produces a hard break.
fn collapse_source_breaks(text: &str) -> String {
    text.replace(|c: char| c.is_ascii_whitespace(), " ")
}

/// Decode a base64 data-URI image and return its pixel dimensions.
fn intrinsic_image_size(src: &str) -> Option<(f32, f32)> {
    if !src.starts_with("data:") || !src.contains(";base64,") {
        return None;
    }
    let comma = src.find(',')?;
    let bytes = BASE64_STD.decode(src[comma + 1..].trim()).ok()?;
    let img = ::image::load_from_memory(&bytes).ok()?;
    let (w, h) = (img.width() as f32, img.height() as f32);
    if w == 0.0 || h == 0.0 {
        return None;
    }
    Some((w, h))
}

fn horizontal_box(s: &ComputedStyle) -> f32 {
    s.padding.horizontal() + s.border.horizontal()
}

fn vertical_box(s: &ComputedStyle) -> f32 {
    s.padding.vertical() + s.border.vertical()
}

/// Width available to the children of an element placed in `outer` px.
fn content_width(s: &ComputedStyle, outer: f32) -> f32 {
    let own = match s.width {
        Dimension::Px(w) => return w.max(0.0),
        Dimension::Percent(p) => outer * p / 100.0,
        Dimension::Auto => outer - s.margin.horizontal(),
    };
    (own - horizontal_box(s)).max(0.0)
}

/// Declared sizes are content-box; taffy sizes are border-box.
fn dim(d: Dimension, extra: f32) -> taffy::Dimension {
    match d {
        Dimension::Auto => taffy::Dimension::Auto,
        Dimension::Px(v) => taffy::Dimension::Length(v + extra),
        Dimension::Percent(v) => taffy::Dimension::Percent(v / 100.0),
    }
}

fn edge_lengths(e: Edges) -> Rect<LengthPercentage> {
    Rect {
        top: LengthPercentage::Length(e.top),
        right: LengthPercentage::Length(e.right),
        bottom: LengthPercentage::Length(e.bottom),
        left: LengthPercentage::Length(e.left),
    }
}

fn to_taffy(s: &ComputedStyle, ctx: ItemContext) -> Style {
    let mut ts = Style {
        display: taffy::Display::Flex,
        flex_direction: taffy::FlexDirection::Column,
        ..Default::default()
    };
    let h_box = horizontal_box(s);
    let v_box = vertical_box(s);

    match s.display {
        Display::Flex => {
            ts.flex_direction = match s.flex_direction {
                FlexDirection::Row => taffy::FlexDirection::Row,
                FlexDirection::Column => taffy::FlexDirection::Column,
            };
        }
        Display::TableRow => {
            ts.flex_direction = taffy::FlexDirection::Row;
            ts.align_items = Some(taffy::AlignItems::Stretch);
        }
        _ => {}
    }

    ts.size.width = dim(s.width, h_box);
    if s.display == Display::TableRow && s.width == Dimension::Auto {
        ts.size.width = taffy::Dimension::Percent(1.0);
    }

    // Table boxes grow to fit their content; a declared height is a minimum.
    if matches!(
        s.display,
        Display::Table | Display::TableRow | Display::TableCell
    ) {
        ts.min_size.height = match s.height {
            Dimension::Auto => dim(s.min_height, v_box),
            declared => dim(declared, v_box),
        };
    } else {
        ts.size.height = dim(s.height, v_box);
        ts.min_size.height = dim(s.min_height, v_box);
        ts.max_size.height = dim(s.max_height, v_box);
    }

    match ctx {
        ItemContext::Row => {
            ts.flex_shrink = 1.0;
            ts.min_size.width = taffy::Dimension::Length(0.0);
            if s.display == Display::TableCell && s.width == Dimension::Auto {
                ts.flex_grow = 1.0;
                ts.flex_basis = taffy::Dimension::Length(0.0);
            }
        }
        ItemContext::Column | ItemContext::Root => {
            ts.flex_shrink = 0.0;
        }
    }

    if s.position == Position::Absolute && ctx != ItemContext::Root {
        ts.position = taffy::Position::Absolute;
    }

    let m = s.margin;
    ts.margin = Rect {
        top: LengthPercentageAuto::Length(m.top),
        right: LengthPercentageAuto::Length(m.right),
        bottom: LengthPercentageAuto::Length(m.bottom),
        left: LengthPercentageAuto::Length(m.left),
    };
    ts.padding = edge_lengths(s.padding);
    ts.border = edge_lengths(s.border);
    ts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn measure_first(html: &str) -> f32 {
        let doc = Document::parse(html);
        let el = doc.element_children(doc.root())[0];
        LayoutMeasurer::new().measure_raw(&doc, el)
    }

    #[test]
    fn normalize_rounds_up_and_floors_at_zero() {
        assert_eq!(normalize_height(10.2), 11.0);
        assert_eq!(normalize_height(10.000_000_1), 10.0);
        assert_eq!(normalize_height(-3.0), 0.0);
        assert_eq!(normalize_height(f32::NAN), 0.0);
        assert_eq!(normalize_height(f32::INFINITY), 0.0);
    }

    #[test]
    fn explicit_height_includes_margins() {
        let h = measure_first(r#"<div style="height:40px;margin-top:5px;margin-bottom:5px"></div>"#);
        assert!((h - 50.0).abs() < 0.01, "got {h}");
    }

    #[test]
    fn block_children_stack() {
        let h = measure_first(
            r#"<div><div style="height:30px"></div><div style="height:20px"></div></div>"#,
        );
        assert!((h - 50.0).abs() < 0.01, "got {h}");
    }

    #[test]
    fn padding_and_border_add_to_declared_height() {
        let h = measure_first(r#"<div style="height:20px;padding:4px;border:1px solid black"></div>"#);
        assert!((h - 30.0).abs() < 0.01, "got {h}");
    }

    #[test]
    fn filler_table_measures_its_row_height() {
        let h = measure_first(
            r#"<table width="750px" cellspacing="0" cellpadding="0" style="border-collapse:collapse;margin:0;padding:0;line-height:0;font-size:0"><tr style="height:18px;"><td style="border:0px solid black;padding:0;margin:0;line-height:0;font-size:0;"></td></tr></table>"#,
        );
        assert!((h - 18.0).abs() < 0.01, "got {h}");
    }

    #[test]
    fn cells_in_a_row_take_the_tallest_height() {
        let h = measure_first(
            r#"<table><tr><td style="height:27px">&nbsp;</td><td style="height:12px">x</td></tr></table>"#,
        );
        assert!((h - 27.0).abs() < 0.01, "got {h}");
    }

    #[test]
    fn text_lines_use_line_height() {
        let h = measure_first(
            r#"<p style="margin:0;font-size:10px;line-height:20px">Hello <b>world</b><br>again</p>"#,
        );
        assert!((h - 40.0).abs() < 0.01, "got {h}");
    }

    #[test]
    fn empty_font_book_falls_back_to_average_widths() {
        let doc = Document::parse(
            r#"<div style="width:60px;font-size:10px;line-height:10px">aaaa bbbb cccc</div>"#,
        );
        let el = doc.element_children(doc.root())[0];
        let measurer = LayoutMeasurer::new().with_fonts(FontBook::new());
        // 5px per glyph: "aaaa bbbb" is 45px, adding " cccc" would be 70px.
        assert_eq!(measurer.measure_raw(&doc, el), 20.0);
    }

    #[test]
    fn whitespace_only_text_has_no_height() {
        let h = measure_first("<div>\n   \n</div>");
        assert_eq!(h, 0.0);
    }

    #[test]
    fn absolute_children_are_out_of_flow() {
        let h = measure_first(
            r#"<div><div style="position:absolute;height:100px"></div><div style="height:10px"></div></div>"#,
        );
        assert!((h - 10.0).abs() < 0.01, "got {h}");
    }

    #[test]
    fn hidden_ancestor_measures_zero() {
        let doc = Document::parse(r#"<div style="display:none"><div style="height:10px"></div></div>"#);
        let outer = doc.element_children(doc.root())[0];
        let inner = doc.element_children(outer)[0];
        assert_eq!(LayoutMeasurer::new().measure_raw(&doc, inner), 0.0);
    }

    #[test]
    fn safe_measure_forces_visibility_and_restores_style() {
        let mut doc = Document::parse(r#"<div style="display: none; height: 25px;"></div>"#);
        let el = doc.element_children(doc.root())[0];
        let m = LayoutMeasurer::new();
        assert_eq!(m.measure_raw(&doc, el), 0.0);
        assert_eq!(m.measure(&mut doc, el), 25.0);
        assert_eq!(doc.style_property(el, "display").as_deref(), Some("none"));
        assert_eq!(doc.style_property(el, "visibility"), None);
        assert_eq!(doc.style_property(el, "position"), None);
        assert_eq!(doc.attr(el, "style"), Some("display: none; height: 25px;"));
    }

    #[test]
    fn text_wraps_to_containing_width() {
        let narrow = Document::parse(
            r#"<div style="width:40px"><p style="margin:0;font-size:10px;line-height:10px">aaaa bbbb cccc dddd</p></div>"#,
        );
        let outer = narrow.element_children(narrow.root())[0];
        let p = narrow.element_children(outer)[0];
        let h = LayoutMeasurer::new().measure_raw(&narrow, p);
        // 0.5em per char: each 4-letter word is 20px, two fit per 40px line.
        assert!(h >= 20.0, "got {h}");
    }
}
