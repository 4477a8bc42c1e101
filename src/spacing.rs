//! Filler content – dummy row tables, the footer spacer and the four
//! remainder-spacing steps run at every page boundary.
//!
//! Every step takes the page limit and the working content height and
//! returns the new working height. Steps never shrink a page.

use log::debug;

use crate::config::PrintFormConfig;
use crate::dom::{Document, NodeId};
use crate::measure::normalize_height;

/// Sizing reset shared by every filler table so it measures exactly its row height.
const FILLER_TABLE_STYLE: &str =
    "border-collapse:collapse; border-spacing:0; margin:0; padding:0; line-height:0; font-size:0";

/// Dummy height used before a keep-together pair when none is configured.
const FALLBACK_KEEP_TOGETHER_DUMMY_HEIGHT: f32 = 27.0;

/// Heights of the footer family: all of it, the per-page repeating part,
/// and the remainder shown only on a stream's last page.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FooterState {
    pub total_final: f32,
    pub repeating: f32,
    pub non_repeating: f32,
}

// ---------------------------------------------------------------------------
// Filler elements
// ---------------------------------------------------------------------------

fn filler_table(doc: &mut Document, config: &PrintFormConfig, class: &str) -> NodeId {
    let table = doc.create_element("table");
    doc.set_attr(table, "class", class);
    doc.set_attr(table, "width", &format!("{}px", config.papersize_width));
    doc.set_attr(table, "cellspacing", "0");
    doc.set_attr(table, "cellpadding", "0");
    doc.set_attr(table, "style", FILLER_TABLE_STYLE);
    table
}

fn filler_row_html(height: f32) -> String {
    format!(
        r#"<tr style="height:{}px;"><td style="border:0px solid black;"></td></tr>"#,
        normalize_height(height)
    )
}

/// `table.dummy_row` holding one row of `height` px.
pub fn dummy_row_table(doc: &mut Document, config: &PrintFormConfig, height: f32) -> NodeId {
    let table = filler_table(doc, config, "dummy_row");
    doc.set_inner_html(table, &filler_row_html(height));
    table
}

/// `table.dummy_row_item`: one fixed-height row, or the custom content.
pub fn dummy_row_item_table(doc: &mut Document, config: &PrintFormConfig) -> NodeId {
    let table = filler_table(doc, config, "dummy_row_item");
    if config.custom_dummy_row_item_content.is_empty() {
        doc.set_inner_html(table, &filler_row_html(config.height_of_dummy_row_item));
    } else {
        doc.set_inner_html(table, &config.custom_dummy_row_item_content);
    }
    table
}

/// Detached `div.pfooter_spacer.paper_width`, cloned for every spacer.
pub fn footer_spacer_template(doc: &mut Document) -> NodeId {
    let spacer = doc.create_element("div");
    doc.set_attr(spacer, "class", "pfooter_spacer paper_width");
    doc.set_attr(spacer, "style", "height: 0px;");
    spacer
}

/// Append as many `dummy_row_item` tables as fit in `diff` px.
fn append_dummy_row_items(doc: &mut Document, config: &PrintFormConfig, target: NodeId, diff: f32) {
    let item = normalize_height(config.height_of_dummy_row_item);
    let remaining = normalize_height(diff);
    if item <= 0.0 || remaining <= 0.0 {
        return;
    }
    let count = (remaining / item).floor() as usize;
    for _ in 0..count {
        let table = dummy_row_item_table(doc, config);
        doc.append_child(target, table);
    }
}

/// Height after filling `remaining` with dummy items: the page limit minus
/// whatever did not fit into a whole item.
fn height_after_items(config: &PrintFormConfig, limit: f32, remaining: f32) -> Option<f32> {
    let item = normalize_height(config.height_of_dummy_row_item);
    if item <= 0.0 {
        return None;
    }
    let leftover = normalize_height(remaining % item);
    Some(normalize_height(limit - leftover))
}

// ---------------------------------------------------------------------------
// Remainder steps
// ---------------------------------------------------------------------------

/// Step 1: fill the gap with fixed-height dummy row items.
pub fn apply_dummy_row_items_step(
    doc: &mut Document,
    config: &PrintFormConfig,
    container: NodeId,
    limit: f32,
    current: f32,
) -> f32 {
    if !config.insert_dummy_row_item_while_format_table {
        return normalize_height(current);
    }
    let remaining = normalize_height(limit - current);
    if remaining <= 0.0 {
        return normalize_height(current);
    }
    append_dummy_row_items(doc, config, container, remaining);
    let next = height_after_items(config, limit, remaining).unwrap_or(normalize_height(current));
    if config.debug {
        debug!("dummy row items: remaining {remaining}px, height now {next}px");
    }
    next
}

/// Step 2: one `dummy_row` covering whatever gap is left.
pub fn apply_dummy_row_step(
    doc: &mut Document,
    config: &PrintFormConfig,
    container: NodeId,
    limit: f32,
    current: f32,
) -> f32 {
    if !config.insert_dummy_row_while_format_table {
        return normalize_height(current);
    }
    let remaining = normalize_height(limit - current);
    if remaining <= 0.0 {
        return normalize_height(current);
    }
    let table = dummy_row_table(doc, config, remaining);
    doc.append_child(container, table);
    if config.debug {
        debug!("dummy row: {remaining}px");
    }
    normalize_height(current + remaining)
}

/// Step 3: dummy items in place of the footer spacer. Returns the new
/// height and whether the plain spacer step must be skipped.
pub fn apply_footer_spacer_with_dummy_step(
    doc: &mut Document,
    config: &PrintFormConfig,
    container: NodeId,
    limit: f32,
    current: f32,
    skip_dummy_row_items: bool,
) -> (f32, bool) {
    if !config.insert_footer_spacer_with_dummy_row_item_while_format_table || skip_dummy_row_items {
        return (normalize_height(current), false);
    }
    let remaining = normalize_height(limit - current);
    let mut working = normalize_height(current);
    if remaining > 0.0 {
        append_dummy_row_items(doc, config, container, remaining);
        if let Some(h) = height_after_items(config, limit, remaining) {
            working = h;
        }
        if config.debug {
            debug!("footer spacer dummy items: remaining {remaining}px, height now {working}px");
        }
    }
    (working, true)
}

/// Step 4: one spacer sized to the gap minus the final-page-only footers.
pub fn apply_footer_spacer_step(
    doc: &mut Document,
    config: &PrintFormConfig,
    container: NodeId,
    limit: f32,
    current: f32,
    footer_state: &FooterState,
    spacer_template: NodeId,
) {
    if !config.insert_footer_spacer_while_format_table {
        return;
    }
    let non_repeating = normalize_height(footer_state.non_repeating);
    let height = (normalize_height(limit - current) - non_repeating).max(0.0);
    let spacer = doc.deep_clone(spacer_template);
    doc.set_style_property(spacer, "height", &format!("{height}px"));
    doc.append_child(container, spacer);
    if config.debug {
        debug!("footer spacer: {height}px (reserved {non_repeating}px)");
    }
}

// ---------------------------------------------------------------------------
// Keep-together filler
// ---------------------------------------------------------------------------

/// Append dummy rows filling `available` px ahead of a subtotal/footer row.
/// Returns how many were inserted.
pub fn insert_keep_together_dummies(
    doc: &mut Document,
    config: &PrintFormConfig,
    container: NodeId,
    available: f32,
) -> usize {
    let height = if config.height_of_dummy_row_item > 0.0 {
        config.height_of_dummy_row_item
    } else {
        FALLBACK_KEEP_TOGETHER_DUMMY_HEIGHT
    };
    let count = (available / height).floor();
    if !count.is_finite() || count <= 0.0 {
        return 0;
    }
    let count = count as usize;
    let content = if config.custom_dummy_row_item_content.is_empty() {
        format!(
            r#"<table cellpadding="0" cellspacing="0" border="0" style="width:100%;table-layout:fixed;" class="prowitem_dummy"><tr><td style="height:{height}px;font-size:0;line-height:0;">&nbsp;</td></tr></table>"#
        )
    } else {
        config.custom_dummy_row_item_content.clone()
    };
    for _ in 0..count {
        let node = first_element_of(doc, &content).unwrap_or_else(|| {
            let fallback = format!(
                r#"<div style="height:{height}px" class="prowitem_dummy">&nbsp;</div>"#
            );
            first_element_of(doc, &fallback).unwrap_or_else(|| doc.create_element("div"))
        });
        doc.add_class(node, "prowitem_dummy");
        doc.append_child(container, node);
    }
    count
}

/// Parse `html` and return its first element, detached.
fn first_element_of(doc: &mut Document, html: &str) -> Option<NodeId> {
    let holder = doc.create_element("div");
    doc.set_inner_html(holder, html);
    let first = doc.element_children(holder).into_iter().next()?;
    doc.detach(first);
    Some(first)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::measure::{HeightProvider, LayoutMeasurer};

    fn page() -> (Document, NodeId) {
        let doc = Document::parse(r#"<div class="printform_page" style="width:750px"></div>"#);
        let page = doc.element_children(doc.root())[0];
        (doc, page)
    }

    #[test]
    fn dummy_row_table_measures_its_height() {
        let (mut doc, page) = page();
        let config = PrintFormConfig::default();
        let table = dummy_row_table(&mut doc, &config, 37.0);
        doc.append_child(page, table);
        assert!(doc.has_class(table, "dummy_row"));
        assert_eq!(doc.attr(table, "width"), Some("750px"));
        assert_eq!(LayoutMeasurer::default().measure_raw(&doc, table), 37.0);
    }

    #[test]
    fn items_step_rounds_up_to_the_limit_minus_leftover() {
        let (mut doc, page) = page();
        let config = PrintFormConfig::default(); // 18px items
        let h = apply_dummy_row_items_step(&mut doc, &config, page, 100.0, 40.0);
        // 60px gap: 3 items (54px), 6px leftover.
        assert_eq!(doc.all_by_class(page, "dummy_row_item").len(), 3);
        assert_eq!(h, 94.0);
    }

    #[test]
    fn items_step_respects_its_flag() {
        let (mut doc, page) = page();
        let config = PrintFormConfig {
            insert_dummy_row_item_while_format_table: false,
            ..PrintFormConfig::default()
        };
        assert_eq!(apply_dummy_row_items_step(&mut doc, &config, page, 100.0, 40.0), 40.0);
        assert!(doc.children(page).is_empty());
    }

    #[test]
    fn dummy_row_step_fills_exactly() {
        let (mut doc, page) = page();
        let config = PrintFormConfig {
            insert_dummy_row_while_format_table: true,
            ..PrintFormConfig::default()
        };
        assert_eq!(apply_dummy_row_step(&mut doc, &config, page, 100.0, 94.0), 100.0);
        assert_eq!(doc.all_by_class(page, "dummy_row").len(), 1);
    }

    #[test]
    fn spacer_with_dummy_suppresses_plain_spacer() {
        let (mut doc, page) = page();
        let config = PrintFormConfig::default();
        let (h, skip) = apply_footer_spacer_with_dummy_step(&mut doc, &config, page, 100.0, 100.0, false);
        assert_eq!((h, skip), (100.0, true));
        let (_, skip) = apply_footer_spacer_with_dummy_step(&mut doc, &config, page, 100.0, 50.0, true);
        assert!(!skip);
    }

    #[test]
    fn footer_spacer_reserves_final_footers() {
        let (mut doc, page) = page();
        let config = PrintFormConfig::default();
        let template = footer_spacer_template(&mut doc);
        let state = FooterState {
            total_final: 60.0,
            repeating: 0.0,
            non_repeating: 60.0,
        };
        apply_footer_spacer_step(&mut doc, &config, page, 500.0, 300.0, &state, template);
        apply_footer_spacer_step(&mut doc, &config, page, 500.0, 480.0, &state, template);
        let spacers = doc.all_by_class(page, "pfooter_spacer");
        assert_eq!(spacers.len(), 2);
        assert_eq!(doc.style_property(spacers[0], "height").as_deref(), Some("140px"));
        assert_eq!(doc.style_property(spacers[1], "height").as_deref(), Some("0px"));
    }

    #[test]
    fn keep_together_dummies_use_custom_content() {
        let (mut doc, page) = page();
        let config = PrintFormConfig {
            custom_dummy_row_item_content: r#"<div class="mine" style="height:18px"></div>"#.into(),
            ..PrintFormConfig::default()
        };
        assert_eq!(insert_keep_together_dummies(&mut doc, &config, page, 40.0), 2);
        let dummies = doc.all_by_class(page, "prowitem_dummy");
        assert_eq!(dummies.len(), 2);
        assert!(doc.has_class(dummies[0], "mine"));
        assert_eq!(insert_keep_together_dummies(&mut doc, &config, page, -5.0), 0);
    }
}
