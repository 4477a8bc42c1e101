//! Section collection – finds the named zones of a form, expands long
//! PTAC/PADDT text blocks into standalone segment rows, and splits the row
//! set into the main stream and the trailing PADDT stream.

use log::debug;

use crate::config::PaddtConfig;
use crate::dom::{Document, NodeId, Tag};
use crate::measure::HeightProvider;
use crate::rows::{self, is_paddt_row};
use crate::text::split_paragraph;

/// PTAC paragraphs are always split at this many words.
pub const PTAC_MAX_WORDS_PER_SEGMENT: usize = 200;

const DOCINFO_CLASSES: [&str; 5] = [
    "pdocinfo",
    "pdocinfo002",
    "pdocinfo003",
    "pdocinfo004",
    "pdocinfo005",
];
const FOOTER_CLASSES: [&str; 5] = [
    "pfooter",
    "pfooter002",
    "pfooter003",
    "pfooter004",
    "pfooter005",
];

// ---------------------------------------------------------------------------
// Section model
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionKind {
    Header,
    /// Doc-info variant, 0-based (`pdocinfo` .. `pdocinfo005`).
    DocInfo(usize),
    RowHeader,
    /// Footer variant, 0-based (`pfooter` .. `pfooter005`).
    Footer(usize),
    FooterLogo,
    FooterPagenum,
}

impl SectionKind {
    /// Class that marks the section in source markup.
    pub fn class_name(self) -> &'static str {
        match self {
            SectionKind::Header => "pheader",
            SectionKind::DocInfo(i) => DOCINFO_CLASSES[i.min(4)],
            SectionKind::RowHeader => "prowheader",
            SectionKind::Footer(i) => FOOTER_CLASSES[i.min(4)],
            SectionKind::FooterLogo => "pfooter_logo",
            SectionKind::FooterPagenum => "pfooter_pagenum",
        }
    }

    /// Whether a clone of this section counts as a footer when padding a page.
    pub fn is_footer_family(self) -> bool {
        matches!(
            self,
            SectionKind::Footer(_) | SectionKind::FooterLogo | SectionKind::FooterPagenum
        )
    }

    /// Every kind in source lookup order.
    pub fn all() -> impl Iterator<Item = SectionKind> {
        std::iter::once(SectionKind::Header)
            .chain((0..5).map(SectionKind::DocInfo))
            .chain(std::iter::once(SectionKind::RowHeader))
            .chain((0..5).map(SectionKind::Footer))
            .chain([SectionKind::FooterLogo, SectionKind::FooterPagenum])
    }
}

/// A located section: the source element (cloned on every insertion) and
/// its height measured once before pagination.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Section {
    pub kind: SectionKind,
    pub element: NodeId,
    pub height: f32,
}

/// Everything the pagination engine consumes from one form.
#[derive(Debug, Clone, Default)]
pub struct Sections {
    pub header: Option<Section>,
    pub doc_infos: Vec<Section>,
    pub row_header: Option<Section>,
    pub footers: Vec<Section>,
    pub footer_logo: Option<Section>,
    pub footer_pagenum: Option<Section>,
    /// Main row stream, document order.
    pub rows: Vec<NodeId>,
    /// PADDT rows, paginated after the main stream.
    pub paddt_rows: Vec<NodeId>,
}

impl Sections {
    /// Expand segments, locate sections and rows under `form`, and measure
    /// every section with the safe measurement variant.
    pub fn collect(
        doc: &mut Document,
        form: NodeId,
        paddt: &PaddtConfig,
        measurer: &dyn HeightProvider,
    ) -> Self {
        expand_segments(doc, form, SegmentKind::Paddt, paddt.paddt_max_words_per_segment);
        expand_segments(doc, form, SegmentKind::Ptac, PTAC_MAX_WORDS_PER_SEGMENT);

        let mut locate = |kind: SectionKind| -> Option<Section> {
            let element = doc.first_by_class(form, kind.class_name())?;
            let height = measurer.measure(doc, element);
            Some(Section {
                kind,
                element,
                height,
            })
        };

        let header = locate(SectionKind::Header);
        let doc_infos = (0..5).filter_map(|i| locate(SectionKind::DocInfo(i))).collect();
        let row_header = locate(SectionKind::RowHeader);
        let footers = (0..5).filter_map(|i| locate(SectionKind::Footer(i))).collect();
        let footer_logo = locate(SectionKind::FooterLogo);
        let footer_pagenum = locate(SectionKind::FooterPagenum);

        let (paddt_rows, rows): (Vec<NodeId>, Vec<NodeId>) = doc
            .find_all(form, rows::is_row)
            .into_iter()
            .partition(|&r| is_paddt_row(doc, r));

        Self {
            header,
            doc_infos,
            row_header,
            footers,
            footer_logo,
            footer_pagenum,
            rows,
            paddt_rows,
        }
    }

    /// Iterate over every located section.
    pub fn iter(&self) -> impl Iterator<Item = &Section> {
        self.header
            .iter()
            .chain(self.doc_infos.iter())
            .chain(self.row_header.iter())
            .chain(self.footers.iter())
            .chain(self.footer_logo.iter())
            .chain(self.footer_pagenum.iter())
    }

    /// Rename every source section's class to its `_processed` form so that
    /// later scans skip it. Clones made afterwards carry the processed class.
    pub fn mark_processed(&self, doc: &mut Document) {
        for section in self.iter() {
            rows::mark_processed(doc, section.element, section.kind.class_name());
        }
    }

    pub fn row_header_height(&self) -> f32 {
        self.row_header.map_or(0.0, |s| s.height)
    }

    /// Section set for the PADDT stream: shared header and row header,
    /// doc-infos filtered by the PADDT repeat toggles, no footer variants,
    /// and the shared logo and page-number block.
    pub fn for_paddt(&self, paddt: &PaddtConfig) -> Sections {
        Sections {
            header: self.header,
            doc_infos: self
                .doc_infos
                .iter()
                .filter(|s| match s.kind {
                    SectionKind::DocInfo(i) => paddt.repeats_docinfo(i),
                    _ => true,
                })
                .copied()
                .collect(),
            row_header: self.row_header,
            footers: Vec::new(),
            footer_logo: self.footer_logo,
            footer_pagenum: self.footer_pagenum,
            rows: self.paddt_rows.clone(),
            paddt_rows: Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Segment expansion
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SegmentKind {
    Ptac,
    Paddt,
}

impl SegmentKind {
    fn root_class(self) -> &'static str {
        match self {
            SegmentKind::Ptac => "ptac",
            SegmentKind::Paddt => "paddt",
        }
    }

    fn row_class(self) -> &'static str {
        match self {
            SegmentKind::Ptac => rows::PTAC_ROW_CLASS,
            SegmentKind::Paddt => rows::PADDT_ROW_CLASS,
        }
    }

    fn segment_class(self) -> &'static str {
        match self {
            SegmentKind::Ptac => "ptac_segment",
            SegmentKind::Paddt => "paddt_segment",
        }
    }

    fn segment_attr(self) -> &'static str {
        match self {
            SegmentKind::Ptac => "data-ptac-segment",
            SegmentKind::Paddt => "data-paddt-segment",
        }
    }

    fn expanded_attr(self) -> &'static str {
        match self {
            SegmentKind::Ptac => "data-ptac-expanded",
            SegmentKind::Paddt => "data-paddt-expanded",
        }
    }
}

/// Split every long PTAC/PADDT block under `form` into one row per segment.
/// Runs once per form; the form is flagged afterwards.
fn expand_segments(doc: &mut Document, form: NodeId, kind: SegmentKind, max_words: usize) {
    if doc.attr(form, kind.expanded_attr()) == Some("true") {
        return;
    }
    for root in doc.all_by_class(form, kind.root_class()) {
        if doc.attr(root, kind.segment_attr()) == Some("true") {
            continue;
        }
        let segments = match doc.cell_content_wrapper(root) {
            Some(wrapper) => collect_segments(doc, wrapper, max_words),
            None => Vec::new(),
        };
        mark_segment(doc, root, kind);
        let Some(wrapper) = doc.cell_content_wrapper(root) else {
            continue;
        };
        let Some((first, rest)) = segments.split_first() else {
            continue;
        };
        doc.set_inner_html(wrapper, first);

        let mut last = root;
        for segment in rest {
            let clone = doc.deep_clone(root);
            if kind == SegmentKind::Ptac {
                doc.remove_class(clone, "tb_page_break_before");
            }
            doc.set_attr(clone, kind.segment_attr(), "true");
            if let Some(w) = doc.cell_content_wrapper(clone) {
                doc.set_inner_html(w, segment);
            }
            doc.insert_after(last, clone);
            last = clone;
        }
        debug!(
            "expanded {} block into {} segment(s)",
            kind.root_class(),
            segments.len()
        );
    }
    doc.set_attr(form, kind.expanded_attr(), "true");
}

/// HTML for each segment: paragraphs go through the splitter, any other
/// element child is kept whole.
fn collect_segments(doc: &Document, wrapper: NodeId, max_words: usize) -> Vec<String> {
    let mut segments = Vec::new();
    for child in doc.element_children(wrapper) {
        if doc.tag(child) == Some(&Tag::P) {
            segments.extend(split_paragraph(doc, child, max_words));
        } else {
            segments.push(doc.outer_html(child));
        }
    }
    segments
}

fn mark_segment(doc: &mut Document, root: NodeId, kind: SegmentKind) {
    doc.add_class(root, kind.row_class());
    doc.add_class(root, kind.segment_class());
    doc.set_attr(root, kind.segment_attr(), "true");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::measure::LayoutMeasurer;

    fn form_of(doc: &Document) -> NodeId {
        doc.first_by_class(doc.root(), "printform").unwrap()
    }

    fn words(n: usize) -> String {
        (0..n).map(|i| format!("w{i}")).collect::<Vec<_>>().join(" ")
    }

    #[test]
    fn collects_sections_in_variant_order() {
        let mut doc = Document::parse(
            r#"<div class="printform">
                <div class="pheader" style="height:40px"></div>
                <div class="pdocinfo003" style="height:10px"></div>
                <div class="pdocinfo" style="height:20px"></div>
                <div class="prowheader" style="height:30px"></div>
                <div class="prowitem" style="height:25px"></div>
                <div class="prowitem" style="height:25px"></div>
                <div class="pfooter002" style="height:15px"></div>
                <div class="pfooter_logo" style="height:12px"></div>
            </div>"#,
        );
        let form = form_of(&doc);
        let sections = Sections::collect(
            &mut doc,
            form,
            &PaddtConfig::default(),
            &LayoutMeasurer::default(),
        );
        assert_eq!(sections.header.map(|s| s.height), Some(40.0));
        let kinds: Vec<SectionKind> = sections.doc_infos.iter().map(|s| s.kind).collect();
        assert_eq!(kinds, vec![SectionKind::DocInfo(0), SectionKind::DocInfo(2)]);
        assert_eq!(sections.row_header_height(), 30.0);
        assert_eq!(sections.footers.len(), 1);
        assert_eq!(sections.footers[0].kind, SectionKind::Footer(1));
        assert!(sections.footer_pagenum.is_none());
        assert_eq!(sections.rows.len(), 2);
        assert!(sections.paddt_rows.is_empty());
    }

    #[test]
    fn mark_processed_renames_source_classes() {
        let mut doc = Document::parse(
            r#"<div class="printform"><div class="pheader"></div><div class="pfooter_logo"></div></div>"#,
        );
        let form = form_of(&doc);
        let sections = Sections::collect(
            &mut doc,
            form,
            &PaddtConfig::default(),
            &LayoutMeasurer::default(),
        );
        sections.mark_processed(&mut doc);
        assert!(doc.first_by_class(form, "pheader").is_none());
        assert!(doc.first_by_class(form, "pheader_processed").is_some());
        assert!(doc.first_by_class(form, "pfooter_logo_processed").is_some());
    }

    #[test]
    fn paddt_block_expands_into_segment_rows() {
        let html = format!(
            r#"<div class="printform"><div class="prowitem">a</div>
               <table class="paddt"><tr><td><div><p>{}</p></div></td></tr></table></div>"#,
            words(450)
        );
        let mut doc = Document::parse(&html);
        let form = form_of(&doc);
        let sections = Sections::collect(
            &mut doc,
            form,
            &PaddtConfig::default(),
            &LayoutMeasurer::default(),
        );
        assert_eq!(sections.rows.len(), 1);
        assert_eq!(sections.paddt_rows.len(), 3);
        let counts: Vec<usize> = sections
            .paddt_rows
            .iter()
            .map(|&r| doc.text_content(r).split_whitespace().count())
            .collect();
        assert_eq!(counts, vec![200, 200, 50]);
        assert_eq!(doc.attr(form, "data-paddt-expanded"), Some("true"));
    }

    #[test]
    fn expansion_is_idempotent() {
        let html = format!(
            r#"<div class="printform"><table class="ptac"><tr><td><p>{}</p></td></tr></table></div>"#,
            words(250)
        );
        let mut doc = Document::parse(&html);
        let form = form_of(&doc);
        expand_segments(&mut doc, form, SegmentKind::Ptac, PTAC_MAX_WORDS_PER_SEGMENT);
        let once = doc.all_by_class(form, "ptac-rowitem").len();
        expand_segments(&mut doc, form, SegmentKind::Ptac, PTAC_MAX_WORDS_PER_SEGMENT);
        doc.remove_attr(form, "data-ptac-expanded");
        expand_segments(&mut doc, form, SegmentKind::Ptac, PTAC_MAX_WORDS_PER_SEGMENT);
        assert_eq!(once, 2);
        assert_eq!(doc.all_by_class(form, "ptac-rowitem").len(), once);
    }

    #[test]
    fn ptac_clones_drop_forced_break() {
        let html = format!(
            r#"<div class="printform"><table class="ptac tb_page_break_before"><tr><td><p>{}</p></td></tr></table></div>"#,
            words(201)
        );
        let mut doc = Document::parse(&html);
        let form = form_of(&doc);
        expand_segments(&mut doc, form, SegmentKind::Ptac, PTAC_MAX_WORDS_PER_SEGMENT);
        let segments = doc.all_by_class(form, "ptac-rowitem");
        assert_eq!(segments.len(), 2);
        assert!(doc.has_class(segments[0], "tb_page_break_before"));
        assert!(!doc.has_class(segments[1], "tb_page_break_before"));
    }

    #[test]
    fn block_without_cell_is_only_marked() {
        let mut doc = Document::parse(
            r#"<div class="printform"><div class="paddt">plain text</div></div>"#,
        );
        let form = form_of(&doc);
        expand_segments(&mut doc, form, SegmentKind::Paddt, 200);
        let root = doc.first_by_class(form, "paddt").unwrap();
        assert!(doc.has_class(root, "paddt-rowitem"));
        assert!(doc.has_class(root, "paddt_segment"));
        assert_eq!(doc.attr(root, "data-paddt-segment"), Some("true"));
    }

    #[test]
    fn paddt_sections_drop_footers_and_filter_docinfo() {
        let mut doc = Document::parse(
            r#"<div class="printform">
                <div class="pdocinfo"></div><div class="pdocinfo002"></div>
                <div class="pfooter"></div><div class="pfooter_logo"></div>
            </div>"#,
        );
        let form = form_of(&doc);
        let mut paddt = PaddtConfig::default();
        let sections = Sections::collect(&mut doc, form, &paddt, &LayoutMeasurer::default());
        paddt.repeat_paddt_docinfo[1] = false;
        let trailing = sections.for_paddt(&paddt);
        assert_eq!(trailing.doc_infos.len(), 1);
        assert!(trailing.footers.is_empty());
        assert!(trailing.footer_logo.is_some());
    }
}
