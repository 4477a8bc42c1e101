//! Page/sheet manager – owns the output container and the two nested
//! levels of output: physical sheets (N-up wrappers) holding logical pages.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::config::PrintFormConfig;
use crate::dom::{Document, NodeId};
use crate::measure::HeightProvider;
use crate::sections::SectionKind;
use crate::spacing::dummy_row_table;

/// Which row stream a page was produced for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stream {
    Main,
    Paddt,
}

/// One produced logical page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRecord {
    pub node: NodeId,
    /// 1-based logical page number.
    pub number: usize,
    /// 1-based physical sheet number.
    pub sheet: usize,
    pub stream: Stream,
}

/// Hard page-break divider: `div.div_page_break_before` plus any extra
/// whitespace-separated classes.
pub fn page_break_divider(doc: &mut Document, extra_classes: &str) -> NodeId {
    let div = doc.create_element("div");
    doc.set_attr(div, "class", "div_page_break_before");
    doc.set_attr(div, "style", "page-break-before: always; font-size: 0pt; height: 0px;");
    for class in extra_classes.split_whitespace() {
        doc.add_class(div, class);
    }
    div
}

pub struct PageManager {
    output: NodeId,
    width: f32,
    n_up: usize,
    divider_classes: String,
    stream: Stream,
    current_page: usize,
    current_sheet: usize,
    pages_in_sheet: usize,
    sheet: Option<NodeId>,
    page: Option<NodeId>,
    records: Vec<PageRecord>,
}

impl PageManager {
    pub fn new(output: NodeId, config: &PrintFormConfig) -> Self {
        Self {
            output,
            width: config.papersize_width,
            n_up: config.n_up.max(1),
            divider_classes: config.div_page_break_before_class_append.clone(),
            stream: Stream::Main,
            current_page: 1,
            current_sheet: 0,
            pages_in_sheet: 0,
            sheet: None,
            page: None,
            records: Vec::new(),
        }
    }

    pub fn output(&self) -> NodeId {
        self.output
    }

    /// Logical page number currently being filled.
    pub fn current_page_number(&self) -> usize {
        self.current_page
    }

    pub fn current_sheet_number(&self) -> usize {
        self.current_sheet
    }

    /// Sheet holding logical page `page`, if it exists yet.
    pub fn sheet_of(&self, page: usize) -> Option<usize> {
        self.records.iter().find(|r| r.number == page).map(|r| r.sheet)
    }

    /// Every logical page produced so far, in order.
    pub fn records(&self) -> &[PageRecord] {
        &self.records
    }

    pub fn set_stream(&mut self, stream: Stream) {
        self.stream = stream;
    }

    /// Start a new physical sheet. Every sheet after the first is preceded
    /// by a hard page-break divider.
    pub fn new_sheet(&mut self, doc: &mut Document) -> NodeId {
        if self.sheet.is_some() {
            let divider = page_break_divider(doc, &self.divider_classes);
            doc.append_child(self.output, divider);
            self.current_sheet += 1;
        } else {
            self.current_sheet = 1;
        }
        let wrapper = doc.create_element("div");
        doc.set_attr(wrapper, "class", "physical_page_wrapper");
        doc.set_attr(
            wrapper,
            "style",
            &format!(
                "display: flex; flex-direction: column; align-items: flex-start; width: {}px;",
                self.width
            ),
        );
        doc.append_child(self.output, wrapper);
        self.sheet = Some(wrapper);
        self.pages_in_sheet = 0;
        wrapper
    }

    /// Append a logical page for the current page number, opening a new
    /// sheet first when the current one is missing or full.
    pub fn new_logical_page(&mut self, doc: &mut Document) -> NodeId {
        let sheet = match self.sheet {
            Some(s) if self.pages_in_sheet < self.n_up => s,
            _ => self.new_sheet(doc),
        };
        let page = doc.create_element("div");
        doc.set_attr(page, "class", "printform_page");
        doc.set_attr(page, "style", &format!("width: {}px;", self.width));
        doc.append_child(sheet, page);
        self.page = Some(page);
        self.pages_in_sheet += 1;
        self.records.push(PageRecord {
            node: page,
            number: self.current_page,
            sheet: self.current_sheet,
            stream: self.stream,
        });
        page
    }

    /// The page being filled, created on first use.
    pub fn current_page(&mut self, doc: &mut Document) -> NodeId {
        if self.sheet.is_none() {
            self.new_sheet(doc);
        }
        match self.page {
            Some(p) => p,
            None => self.new_logical_page(doc),
        }
    }

    /// Advance to the next logical page number and open its page.
    pub fn start_next_page(&mut self, doc: &mut Document) -> NodeId {
        self.current_page += 1;
        self.page = None;
        self.new_logical_page(doc)
    }

    /// Like [`start_next_page`](Self::start_next_page) but always on a
    /// fresh sheet.
    pub fn start_next_sheet(&mut self, doc: &mut Document) -> NodeId {
        self.current_page += 1;
        self.page = None;
        self.new_sheet(doc);
        self.new_logical_page(doc)
    }
}

/// Pad `page` up to the paper height with a `dummy_spacer` table placed
/// just before its first footer clone. Never shrinks an overflowing page.
pub fn finalize_page_height(
    doc: &mut Document,
    page: NodeId,
    config: &PrintFormConfig,
    measurer: &dyn HeightProvider,
) {
    let target = config.papersize_height;
    let mut appended = 0.0;
    if config.fill_page_height_after_footer {
        let current = measurer.measure(doc, page);
        let remaining = (target - current).max(0.0);
        if remaining > 0.0 {
            let spacer = dummy_row_table(doc, config, remaining);
            doc.add_class(spacer, "dummy_spacer");
            let footer_classes: Vec<String> = SectionKind::all()
                .filter(|k| k.is_footer_family())
                .map(|k| format!("{}_processed", k.class_name()))
                .collect();
            let first_footer = doc.find_first(page, |d, n| {
                footer_classes.iter().any(|c| d.has_class(n, c))
            });
            match first_footer {
                Some(f) if doc.parent(f) == Some(page) => doc.insert_before(page, spacer, Some(f)),
                _ => doc.append_child(page, spacer),
            }
            appended = remaining;
        }
    }

    if config.debug {
        debug!("page height: configured {target}px");
        let mut cumulative = 0.0;
        for (i, child) in doc.element_children(page).into_iter().enumerate() {
            let h = measurer.measure_raw(doc, child);
            cumulative += h;
            let tag = doc.tag(child).map(|t| t.name().to_string()).unwrap_or_default();
            let class = doc.attr(child, "class").unwrap_or("(no class)");
            debug!(
                "  {}. <{tag}.{class}> {h}px, cumulative {cumulative}px, remaining {}px",
                i + 1,
                (target - cumulative).max(0.0)
            );
            if h > target * 0.5 {
                debug!("     element is taller than half the page");
            }
        }
        if cumulative > target {
            debug!("content overflows by {}px", cumulative - target);
        }
        if appended > 0.0 {
            debug!("final spacer appended: {appended}px");
        }
    }
}
