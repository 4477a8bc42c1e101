//! Style resolver – maps tag defaults, presentational attributes and inline
//! `style` declarations to a flat [`ComputedStyle`] consumed by the measurer.
//!
//! Only properties that influence block height are resolved. Colours,
//! backgrounds and alignment do not move anything vertically and are ignored.

use crate::dom::{parse_declarations, Document, NodeId, Tag};

/// Resolved style for a single element.
#[derive(Debug, Clone, PartialEq)]
pub struct ComputedStyle {
    // Display / layout
    pub display: Display,
    pub flex_direction: FlexDirection,
    pub position: Position,

    // Sizing
    pub width: Dimension,
    pub height: Dimension,
    pub min_height: Dimension,
    pub max_height: Dimension,

    // Box model (px)
    pub margin: Edges,
    pub padding: Edges,
    pub border: Edges,

    // Typography
    pub font_size: f32,
    pub font_weight: FontWeight,
    pub font_style: FontStyle,
    pub font_family: String,
    pub line_height: LineHeight,
}

impl Default for ComputedStyle {
    fn default() -> Self {
        Self {
            display: Display::Block,
            flex_direction: FlexDirection::Row,
            position: Position::Static,
            width: Dimension::Auto,
            height: Dimension::Auto,
            min_height: Dimension::Auto,
            max_height: Dimension::Auto,
            margin: Edges::ZERO,
            padding: Edges::ZERO,
            border: Edges::ZERO,
            font_size: 16.0,
            font_weight: FontWeight::Normal,
            font_style: FontStyle::Normal,
            font_family: "Helvetica".to_string(),
            line_height: LineHeight::Normal,
        }
    }
}

impl ComputedStyle {
    /// Line box height in px.
    pub fn line_height_px(&self) -> f32 {
        match self.line_height {
            LineHeight::Normal => self.font_size * 1.2,
            LineHeight::Factor(f) => self.font_size * f,
            LineHeight::Px(px) => px,
        }
    }

    pub fn vertical_margins(&self) -> f32 {
        self.margin.vertical()
    }

    fn inherit_text(&mut self, parent: &ComputedStyle) {
        self.font_size = parent.font_size;
        self.font_weight = parent.font_weight;
        self.font_style = parent.font_style;
        self.font_family = parent.font_family.clone();
        self.line_height = parent.line_height;
    }
}

/// Four side lengths of margin, padding or border, in px.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Edges {
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
    pub left: f32,
}

impl Edges {
    pub const ZERO: Edges = Edges::uniform(0.0);

    pub const fn uniform(v: f32) -> Self {
        Self {
            top: v,
            right: v,
            bottom: v,
            left: v,
        }
    }

    pub fn horizontal(&self) -> f32 {
        self.left + self.right
    }

    pub fn vertical(&self) -> f32 {
        self.top + self.bottom
    }
}

// ---------------------------------------------------------------------------
// Supporting enums
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Display {
    Block,
    Flex,
    Inline,
    InlineBlock,
    Table,
    TableRow,
    TableCell,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlexDirection {
    Row,
    Column,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Position {
    Static,
    Relative,
    Absolute,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontWeight {
    Normal,
    Bold,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontStyle {
    Normal,
    Italic,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Dimension {
    Auto,
    Px(f32),
    Percent(f32),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LineHeight {
    Normal,
    Factor(f32),
    Px(f32),
}

// ---------------------------------------------------------------------------
// Style resolution
// ---------------------------------------------------------------------------

/// Resolve the style of `id`, inheriting text properties from `parent`.
pub fn resolve_style(doc: &Document, id: NodeId, parent: Option<&ComputedStyle>) -> ComputedStyle {
    let Some(tag) = doc.tag(id) else {
        return parent.cloned().unwrap_or_default();
    };
    let mut style = base_style_for_tag(tag);
    if let Some(p) = parent {
        style.inherit_text(p);
        if matches!(tag, Tag::B | Tag::Strong | Tag::Th) {
            style.font_weight = FontWeight::Bold;
        }
        if matches!(tag, Tag::I | Tag::Em) {
            style.font_style = FontStyle::Italic;
        }
    }

    apply_presentational_attributes(doc, id, tag, &mut style);

    if let Some(inline) = doc.attr(id, "style") {
        for (prop, val) in parse_declarations(inline) {
            apply_css_property(&mut style, &prop, &val);
        }
    }
    style
}

/// Default styles based on tag semantics.
fn base_style_for_tag(tag: &Tag) -> ComputedStyle {
    let mut s = ComputedStyle::default();
    match tag {
        Tag::H1 => {
            s.font_size = 32.0;
            s.font_weight = FontWeight::Bold;
            s.margin.top = 16.0;
            s.margin.bottom = 12.0;
        }
        Tag::H2 => {
            s.font_size = 24.0;
            s.font_weight = FontWeight::Bold;
            s.margin.top = 14.0;
            s.margin.bottom = 10.0;
        }
        Tag::H3 => {
            s.font_size = 20.0;
            s.font_weight = FontWeight::Bold;
            s.margin.top = 12.0;
            s.margin.bottom = 8.0;
        }
        Tag::P => {
            s.margin.bottom = 10.0;
        }
        Tag::Ul | Tag::Ol => {
            s.margin.bottom = 10.0;
            s.padding.left = 24.0;
        }
        Tag::Li => {
            s.margin.bottom = 4.0;
        }
        Tag::Table => s.display = Display::Table,
        Tag::Thead | Tag::Tbody | Tag::Tfoot => s.display = Display::Table,
        Tag::Tr => s.display = Display::TableRow,
        Tag::Td | Tag::Th => s.display = Display::TableCell,
        Tag::Img => s.display = Display::InlineBlock,
        Tag::Template | Tag::Head => s.display = Display::None,
        Tag::Unknown(name) => match name.as_str() {
            "script" | "style" | "meta" | "link" | "title" | "noscript" => {
                s.display = Display::None;
            }
            _ if tag.is_inline() => s.display = Display::Inline,
            _ => {}
        },
        Tag::Span | Tag::B | Tag::Strong | Tag::I | Tag::Em | Tag::U | Tag::Br => {
            s.display = Display::Inline;
        }
        Tag::Div | Tag::Body | Tag::Html => {}
    }
    s
}

/// Legacy attributes (`width`, `height`, table `cellpadding`, `hidden`).
fn apply_presentational_attributes(doc: &Document, id: NodeId, tag: &Tag, s: &mut ComputedStyle) {
    if matches!(tag, Tag::Table | Tag::Td | Tag::Th | Tag::Img | Tag::Tr) {
        if let Some(w) = doc.attr(id, "width") {
            s.width = parse_dimension(w);
        }
        if let Some(h) = doc.attr(id, "height") {
            s.height = parse_dimension(h);
        }
    }
    if matches!(tag, Tag::Td | Tag::Th) {
        let table = doc
            .ancestors(id)
            .into_iter()
            .find(|&a| doc.tag(a) == Some(&Tag::Table));
        if let Some(pad) = table.and_then(|t| doc.attr(t, "cellpadding")).and_then(parse_px) {
            s.padding = Edges::uniform(pad);
        }
    }
    if doc.has_attr(id, "hidden") {
        s.display = Display::None;
    }
}

fn apply_css_property(s: &mut ComputedStyle, prop: &str, val: &str) {
    let val = val.trim_end_matches("!important").trim();
    match prop {
        "display" => {
            s.display = match val {
                "flex" | "inline-flex" => Display::Flex,
                "block" | "list-item" | "grid" => Display::Block,
                "inline" => Display::Inline,
                "inline-block" => Display::InlineBlock,
                "table" => Display::Table,
                "table-row" => Display::TableRow,
                "table-cell" => Display::TableCell,
                "none" => Display::None,
                _ => s.display,
            }
        }
        "flex-direction" => {
            s.flex_direction = match val {
                "row" | "row-reverse" => FlexDirection::Row,
                "column" | "column-reverse" => FlexDirection::Column,
                _ => s.flex_direction,
            }
        }
        "position" => {
            s.position = match val {
                "absolute" | "fixed" => Position::Absolute,
                "relative" => Position::Relative,
                _ => Position::Static,
            }
        }
        "font-size" => {
            if let Some(px) = parse_length(val, s.font_size) {
                s.font_size = px;
            }
        }
        "font-weight" => {
            s.font_weight = match val {
                "bold" | "bolder" | "600" | "700" | "800" | "900" => FontWeight::Bold,
                _ => FontWeight::Normal,
            }
        }
        "font-style" => {
            s.font_style = match val {
                "italic" | "oblique" => FontStyle::Italic,
                _ => FontStyle::Normal,
            }
        }
        "font-family" => {
            if let Some(first) = val.split(',').next() {
                let family = first.trim().trim_matches(|c| c == '"' || c == '\'');
                if !family.is_empty() {
                    s.font_family = family.to_string();
                }
            }
        }
        "line-height" => {
            if val == "normal" {
                s.line_height = LineHeight::Normal;
            } else if let Ok(v) = val.parse::<f32>() {
                s.line_height = LineHeight::Factor(v);
            } else if let Some(pct) = val.strip_suffix('%').and_then(|v| v.trim().parse::<f32>().ok()) {
                s.line_height = LineHeight::Factor(pct / 100.0);
            } else if let Some(px) = parse_length(val, s.font_size) {
                s.line_height = LineHeight::Px(px);
            }
        }
        "width" => s.width = parse_dimension(val),
        "height" => s.height = parse_dimension(val),
        "min-height" => s.min_height = parse_dimension(val),
        "max-height" => s.max_height = parse_dimension(val),
        "margin" => {
            if let Some(edges) = parse_edges(val, s.font_size) {
                s.margin = edges;
            }
        }
        "margin-top" => set_length(&mut s.margin.top, val, s.font_size),
        "margin-right" => set_length(&mut s.margin.right, val, s.font_size),
        "margin-bottom" => set_length(&mut s.margin.bottom, val, s.font_size),
        "margin-left" => set_length(&mut s.margin.left, val, s.font_size),
        "padding" => {
            if let Some(edges) = parse_edges(val, s.font_size) {
                s.padding = edges;
            }
        }
        "padding-top" => set_length(&mut s.padding.top, val, s.font_size),
        "padding-right" => set_length(&mut s.padding.right, val, s.font_size),
        "padding-bottom" => set_length(&mut s.padding.bottom, val, s.font_size),
        "padding-left" => set_length(&mut s.padding.left, val, s.font_size),
        "border" | "border-width" => {
            s.border = Edges::uniform(border_width(val));
        }
        "border-top" | "border-top-width" => s.border.top = border_width(val),
        "border-right" | "border-right-width" => s.border.right = border_width(val),
        "border-bottom" | "border-bottom-width" => s.border.bottom = border_width(val),
        "border-left" | "border-left-width" => s.border.left = border_width(val),
        _ => {}
    }
}

/// Parse a CSS length in px, em or pt. Unitless numbers are px.
pub fn parse_length(s: &str, font_size: f32) -> Option<f32> {
    let s = s.trim();
    let value = if let Some(v) = s.strip_suffix("px") {
        v.trim().parse::<f32>().ok()?
    } else if let Some(v) = s.strip_suffix("rem") {
        v.trim().parse::<f32>().ok()? * 16.0
    } else if let Some(v) = s.strip_suffix("em") {
        v.trim().parse::<f32>().ok()? * font_size
    } else if let Some(v) = s.strip_suffix("pt") {
        v.trim().parse::<f32>().ok()? * 96.0 / 72.0
    } else {
        s.parse::<f32>().ok()?
    };
    value.is_finite().then_some(value)
}

fn parse_px(s: &str) -> Option<f32> {
    parse_length(s, 16.0)
}

fn set_length(slot: &mut f32, val: &str, font_size: f32) {
    if let Some(px) = parse_length(val, font_size) {
        *slot = px;
    }
}

/// First token that parses as a length; `none` and `0` are zero.
fn border_width(val: &str) -> f32 {
    val.split_whitespace()
        .find_map(|tok| match tok {
            "thin" => Some(1.0),
            "medium" => Some(3.0),
            "thick" => Some(5.0),
            _ => parse_px(tok),
        })
        .unwrap_or(0.0)
        .max(0.0)
}

pub fn parse_dimension(s: &str) -> Dimension {
    let s = s.trim();
    if s == "auto" {
        Dimension::Auto
    } else if let Some(pct) = s.strip_suffix('%') {
        pct.trim()
            .parse::<f32>()
            .map(Dimension::Percent)
            .unwrap_or(Dimension::Auto)
    } else {
        parse_px(s).map(Dimension::Px).unwrap_or(Dimension::Auto)
    }
}

/// CSS 1-4 value box shorthand. Any unparsable token rejects the whole value.
fn parse_edges(val: &str, font_size: f32) -> Option<Edges> {
    let parts = val
        .split_whitespace()
        .map(|p| if p == "auto" { Some(0.0) } else { parse_length(p, font_size) })
        .collect::<Option<Vec<f32>>>()?;
    let (top, right, bottom, left) = match parts[..] {
        [a] => (a, a, a, a),
        [v, h] => (v, h, v, h),
        [t, h, b] => (t, h, b, h),
        [t, r, b, l] => (t, r, b, l),
        _ => return None,
    };
    Some(Edges {
        top,
        right,
        bottom,
        left,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn style_of(html: &str) -> ComputedStyle {
        let doc = Document::parse(html);
        let el = doc.children(doc.root())[0];
        resolve_style(&doc, el, None)
    }

    #[test]
    fn inline_height_and_margins() {
        let s = style_of(r#"<div style="height: 40px; margin: 2px 0 6px"></div>"#);
        assert_eq!(s.height, Dimension::Px(40.0));
        assert_eq!(s.margin.top, 2.0);
        assert_eq!(s.margin.bottom, 6.0);
        assert_eq!(s.vertical_margins(), 8.0);
    }

    #[test]
    fn malformed_box_shorthand_is_ignored() {
        let s = style_of(r#"<div style="padding: 4px; padding: 2px wide"></div>"#);
        assert_eq!(s.padding, Edges::uniform(4.0));
    }

    #[test]
    fn border_shorthand_takes_first_length() {
        let s = style_of(r#"<td style="border:1px solid black"></td>"#);
        assert_eq!(s.border.top, 1.0);
        let s = style_of(r#"<td style="border:0px solid black"></td>"#);
        assert_eq!(s.border.bottom, 0.0);
    }

    #[test]
    fn table_cells_default_to_zero_box() {
        let s = style_of("<td></td>");
        assert_eq!(s.display, Display::TableCell);
        assert_eq!(s.padding.top, 0.0);
        assert_eq!(s.border.top, 0.0);
    }

    #[test]
    fn cellpadding_applies_to_cells() {
        let doc = Document::parse(r#"<table cellpadding="3"><tr><td>x</td></tr></table>"#);
        let td = doc.find_first(doc.root(), |d, n| d.tag(n) == Some(&Tag::Td)).unwrap();
        let s = resolve_style(&doc, td, None);
        assert_eq!(s.padding.top, 3.0);
        assert_eq!(s.padding.left, 3.0);
    }

    #[test]
    fn line_height_forms() {
        let s = style_of(r#"<p style="font-size: 10px; line-height: 2"></p>"#);
        assert_eq!(s.line_height_px(), 20.0);
        let s = style_of(r#"<p style="line-height: 0"></p>"#);
        assert_eq!(s.line_height_px(), 0.0);
        let s = style_of(r#"<p style="line-height: 14px"></p>"#);
        assert_eq!(s.line_height_px(), 14.0);
    }

    #[test]
    fn template_and_hidden_are_not_displayed() {
        assert_eq!(style_of("<template></template>").display, Display::None);
        assert_eq!(style_of("<div hidden></div>").display, Display::None);
        assert_eq!(
            style_of(r#"<div style="display: none"></div>"#).display,
            Display::None
        );
    }
}
