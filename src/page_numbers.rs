//! Page-number registrar – fills page/sheet counters in inserted clones as
//! they are placed and back-fills the totals once the form is paginated.

use std::collections::HashMap;

use crate::config::PrintFormConfig;
use crate::dom::{Document, NodeId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Counter {
    Logical,
    Physical,
}

impl Counter {
    fn number_attr(self) -> &'static str {
        match self {
            Counter::Logical => "data-page-number",
            Counter::Physical => "data-physical-page-number",
        }
    }

    fn total_attr(self) -> &'static str {
        match self {
            Counter::Logical => "data-page-total",
            Counter::Physical => "data-physical-page-total",
        }
    }

    fn container_attr(self) -> &'static str {
        match self {
            Counter::Logical => "data-page-number-container",
            Counter::Physical => "data-physical-page-number-container",
        }
    }

    fn fallback_class(self) -> &'static str {
        match self {
            Counter::Logical => "printform_page_number_placeholder",
            Counter::Physical => "printform_physical_page_number_placeholder",
        }
    }

    fn label(self) -> &'static str {
        match self {
            Counter::Logical => "Page",
            Counter::Physical => "Sheet",
        }
    }
}

#[derive(Debug, Default)]
pub struct PageNumberRegistrar {
    show_logical: bool,
    show_physical: bool,
    entries: Vec<(Counter, NodeId, usize)>,
    fallbacks: HashMap<(Counter, NodeId), NodeId>,
}

impl PageNumberRegistrar {
    pub fn new(config: &PrintFormConfig) -> Self {
        Self {
            show_logical: config.show_logical_page_number,
            show_physical: config.show_physical_page_number,
            ..Self::default()
        }
    }

    /// Fill the counters in `clone` for logical page `page` on sheet
    /// `sheet` and remember it for the totals pass. Returns whether the
    /// clone holds any enabled placeholder.
    pub fn register(&mut self, doc: &mut Document, clone: NodeId, page: usize, sheet: usize) -> bool {
        let mut registered = false;
        for (counter, enabled, number) in [
            (Counter::Logical, self.show_logical, page),
            (Counter::Physical, self.show_physical, sheet),
        ] {
            if !enabled || !has_placeholder(doc, clone, counter) {
                continue;
            }
            self.write(doc, clone, counter, number, None);
            self.entries.push((counter, clone, number));
            registered = true;
        }
        registered
    }

    #[cfg(test)]
    fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Rewrite every registered clone with the final totals.
    pub fn finalize(&mut self, doc: &mut Document, total_pages: usize, total_sheets: usize) {
        let entries = std::mem::take(&mut self.entries);
        for &(counter, clone, number) in &entries {
            let total = match counter {
                Counter::Logical => total_pages,
                Counter::Physical => total_sheets.max(1),
            };
            self.write(doc, clone, counter, number, Some(total));
        }
        self.entries = entries;
    }

    fn write(
        &mut self,
        doc: &mut Document,
        clone: NodeId,
        counter: Counter,
        number: usize,
        total: Option<usize>,
    ) {
        let numbers = doc.all_with_attr(clone, counter.number_attr());
        let totals = doc.all_with_attr(clone, counter.total_attr());
        for &n in &numbers {
            doc.set_text_content(n, &number.to_string());
        }
        let total_text = total.map(|t| t.to_string()).unwrap_or_default();
        for &t in &totals {
            doc.set_text_content(t, &total_text);
        }
        if numbers.is_empty() && totals.is_empty() {
            let span = self.fallback_span(doc, clone, counter);
            let text = match total {
                Some(t) => format!("{} {number} of {t}", counter.label()),
                None => format!("{} {number}", counter.label()),
            };
            doc.set_text_content(span, &text);
        }
    }

    /// The clone's fallback span, created inside the designated container
    /// (else `td:last-child`, else the first `td`, else the clone) on first use.
    fn fallback_span(&mut self, doc: &mut Document, clone: NodeId, counter: Counter) -> NodeId {
        if let Some(&span) = self.fallbacks.get(&(counter, clone)) {
            return span;
        }
        let container = doc
            .first_with_any_attr(clone, &[counter.container_attr()])
            .or_else(|| doc.last_cell(clone))
            .unwrap_or(clone);
        let span = doc.create_element("span");
        doc.set_attr(span, "class", counter.fallback_class());
        doc.append_child(container, span);
        self.fallbacks.insert((counter, clone), span);
        span
    }
}

fn has_placeholder(doc: &Document, clone: NodeId, counter: Counter) -> bool {
    doc.first_with_any_attr(
        clone,
        &[
            counter.number_attr(),
            counter.total_attr(),
            counter.container_attr(),
        ],
    )
    .is_some()
}
