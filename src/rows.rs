//! Row classification. Pure functions over a row element and the resolved
//! configuration.

use crate::config::{PaddtConfig, PrintFormConfig};
use crate::dom::{Document, NodeId};

pub const ROW_CLASS: &str = "prowitem";
pub const PTAC_ROW_CLASS: &str = "ptac-rowitem";
pub const PADDT_ROW_CLASS: &str = "paddt-rowitem";

const PADDT_MARKERS: [&str; 4] = [
    "paddt_segment",
    "paddt",
    "paddt-rowitem",
    "paddt-rowitem_processed",
];
const PTAC_MARKERS: [&str; 4] = ["ptac_segment", "ptac", "ptac-rowitem", "ptac-rowitem_processed"];

/// Whether `id` is a content row that has not been consumed yet.
pub fn is_row(doc: &Document, id: NodeId) -> bool {
    [ROW_CLASS, PTAC_ROW_CLASS, PADDT_ROW_CLASS]
        .iter()
        .any(|c| doc.has_class(id, c))
}

pub fn is_paddt_row(doc: &Document, row: NodeId) -> bool {
    PADDT_MARKERS.iter().any(|c| doc.has_class(row, c))
}

pub fn is_ptac_row(doc: &Document, row: NodeId) -> bool {
    PTAC_MARKERS.iter().any(|c| doc.has_class(row, c))
}

/// Class a row is filed under; its clone keeps the `_processed` form of it.
pub fn row_base_class(doc: &Document, row: NodeId) -> &'static str {
    if is_paddt_row(doc, row) {
        PADDT_ROW_CLASS
    } else if is_ptac_row(doc, row) {
        PTAC_ROW_CLASS
    } else {
        ROW_CLASS
    }
}

pub fn is_subtotal_row(doc: &Document, row: NodeId) -> bool {
    doc.has_class(row, "row_subtotal") || doc.attr(row, "data-row-type") == Some("subtotal")
}

pub fn is_footer_row(doc: &Document, row: NodeId) -> bool {
    doc.has_class(row, "row_footer") || doc.attr(row, "data-row-type") == Some("footer")
}

/// Row must start a new page.
pub fn has_forced_break(doc: &Document, row: NodeId) -> bool {
    doc.has_class(row, "tb_page_break_before") || doc.has_class(row, "page-break-before")
}

fn has_without_rowheader(doc: &Document, row: NodeId) -> bool {
    doc.has_class(row, "without_prowheader") || doc.has_class(row, "tb_without_rowheader")
}

/// Whether the page opened by `row` omits the row header.
pub fn should_skip_row_header(
    doc: &Document,
    row: NodeId,
    config: &PrintFormConfig,
    paddt: &PaddtConfig,
) -> bool {
    if !config.repeat_rowheader {
        return false;
    }
    if has_without_rowheader(doc, row) {
        return true;
    }
    if is_ptac_row(doc, row) {
        return !config.repeat_ptac_rowheader;
    }
    if is_paddt_row(doc, row) {
        return !paddt.repeat_paddt_rowheader;
    }
    false
}

/// Dummy row items are withheld from pages made only of PTAC (or PADDT)
/// rows when that stream's dummy insertion is disabled.
pub fn should_skip_dummy_row_items(
    ptac_page: bool,
    paddt_page: bool,
    config: &PrintFormConfig,
    paddt: &PaddtConfig,
) -> bool {
    (ptac_page && !config.insert_ptac_dummy_row_items)
        || (paddt_page && !paddt.insert_paddt_dummy_row_items)
}

/// Swap `base_class` for `{base_class}_processed`. No-op once processed.
pub fn mark_processed(doc: &mut Document, id: NodeId, base_class: &str) {
    let processed = format!("{base_class}_processed");
    if doc.has_class(id, &processed) {
        return;
    }
    doc.remove_class(id, base_class);
    doc.add_class(id, &processed);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn first(html: &str) -> (Document, NodeId) {
        let doc = Document::parse(html);
        let id = doc.element_children(doc.root())[0];
        (doc, id)
    }

    #[test]
    fn base_class_prefers_paddt_then_ptac() {
        let (doc, row) = first(r#"<div class="prowitem"></div>"#);
        assert_eq!(row_base_class(&doc, row), ROW_CLASS);
        let (doc, row) = first(r#"<div class="ptac-rowitem_processed"></div>"#);
        assert_eq!(row_base_class(&doc, row), PTAC_ROW_CLASS);
        let (doc, row) = first(r#"<div class="ptac paddt_segment"></div>"#);
        assert_eq!(row_base_class(&doc, row), PADDT_ROW_CLASS);
    }

    #[test]
    fn subtotal_and_footer_markers() {
        let (doc, row) = first(r#"<div class="prowitem row_subtotal"></div>"#);
        assert!(is_subtotal_row(&doc, row));
        assert!(!is_footer_row(&doc, row));
        let (doc, row) = first(r#"<div class="prowitem" data-row-type="footer"></div>"#);
        assert!(is_footer_row(&doc, row));
    }

    #[test]
    fn forced_break_aliases() {
        let (doc, row) = first(r#"<div class="prowitem tb_page_break_before"></div>"#);
        assert!(has_forced_break(&doc, row));
        let (doc, row) = first(r#"<div class="prowitem page-break-before"></div>"#);
        assert!(has_forced_break(&doc, row));
    }

    #[test]
    fn row_header_skip_rules() {
        let mut config = PrintFormConfig::default();
        let mut paddt = PaddtConfig::default();

        let (doc, plain) = first(r#"<div class="prowitem"></div>"#);
        assert!(!should_skip_row_header(&doc, plain, &config, &paddt));

        let (doc, marked) = first(r#"<div class="prowitem tb_without_rowheader"></div>"#);
        assert!(should_skip_row_header(&doc, marked, &config, &paddt));

        let (doc, ptac) = first(r#"<div class="ptac-rowitem"></div>"#);
        assert!(!should_skip_row_header(&doc, ptac, &config, &paddt));
        config.repeat_ptac_rowheader = false;
        assert!(should_skip_row_header(&doc, ptac, &config, &paddt));

        let (doc, paddt_row) = first(r#"<div class="paddt-rowitem"></div>"#);
        paddt.repeat_paddt_rowheader = false;
        assert!(should_skip_row_header(&doc, paddt_row, &config, &paddt));

        config.repeat_rowheader = false;
        assert!(!should_skip_row_header(&doc, paddt_row, &config, &paddt));
    }

    #[test]
    fn dummy_skip_needs_matching_page_kind() {
        let mut config = PrintFormConfig::default();
        let mut paddt = PaddtConfig::default();
        assert!(!should_skip_dummy_row_items(true, true, &config, &paddt));
        config.insert_ptac_dummy_row_items = false;
        assert!(should_skip_dummy_row_items(true, false, &config, &paddt));
        assert!(!should_skip_dummy_row_items(false, true, &config, &paddt));
        paddt.insert_paddt_dummy_row_items = false;
        assert!(should_skip_dummy_row_items(false, true, &config, &paddt));
    }

    #[test]
    fn mark_processed_is_idempotent() {
        let (mut doc, row) = first(r#"<div class="prowitem keep"></div>"#);
        mark_processed(&mut doc, row, ROW_CLASS);
        mark_processed(&mut doc, row, ROW_CLASS);
        assert_eq!(doc.classes(row), vec!["keep", "prowitem_processed"]);
        assert!(!is_row(&doc, row));
    }
}
