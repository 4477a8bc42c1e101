//! Section and row insertion into the page being filled.
//!
//! Sources are never moved: every insertion appends a deep clone. Section
//! clones are offered to the page-number registrar as they land.

use log::debug;

use crate::dom::NodeId;
use crate::formatter::Formatter;
use crate::sections::{Section, SectionKind, Sections};

impl Formatter<'_> {
    /// Append a clone of `element` to `container`.
    pub(crate) fn append_clone(&mut self, container: NodeId, element: NodeId) -> NodeId {
        let clone = self.doc.deep_clone(element);
        self.doc.append_child(container, clone);
        clone
    }

    /// Append a section clone and register its page-number placeholders.
    pub(crate) fn append_section(&mut self, container: NodeId, section: &Section) -> NodeId {
        let clone = self.append_clone(container, section.element);
        let page = self.pages.current_page_number();
        let sheet = self
            .pages
            .sheet_of(page)
            .unwrap_or(self.pages.current_sheet_number())
            .max(1);
        self.numbers.register(self.doc, clone, page, sheet);
        if self.debug {
            debug!("append {} (page {page})", section.kind.class_name());
        }
        clone
    }

    /// Append a row clone. The source row is already marked processed.
    pub(crate) fn append_row(&mut self, container: NodeId, row: NodeId, index: usize) -> NodeId {
        let clone = self.append_clone(container, row);
        if self.debug {
            debug!("append row {index} (page {})", self.pages.current_page_number());
        }
        clone
    }

    /// Sections that open a stream's first page: the header, every doc-info
    /// and the row header unless this page skips it.
    pub(crate) fn append_first_page_sections(
        &mut self,
        container: NodeId,
        sections: &Sections,
        skip_row_header: bool,
    ) {
        if let Some(header) = &sections.header {
            self.append_section(container, header);
        }
        for doc_info in &sections.doc_infos {
            self.append_section(container, doc_info);
        }
        if let Some(row_header) = &sections.row_header {
            if !skip_row_header {
                self.append_section(container, row_header);
            }
        }
    }

    /// Sections repeated at the top of every following page.
    pub(crate) fn append_repeating_sections(
        &mut self,
        container: NodeId,
        sections: &Sections,
        skip_row_header: bool,
    ) {
        if self.config.repeat_header {
            if let Some(header) = &sections.header {
                self.append_section(container, header);
            }
        }
        for doc_info in &sections.doc_infos {
            if self.repeats(doc_info.kind) {
                self.append_section(container, doc_info);
            }
        }
        if self.config.repeat_rowheader && !skip_row_header {
            if let Some(row_header) = &sections.row_header {
                self.append_section(container, row_header);
            }
        }
    }

    /// Footers closing every page but the stream's last.
    pub(crate) fn append_repeating_footers(&mut self, container: NodeId, sections: &Sections) {
        for footer in &sections.footers {
            if self.repeats(footer.kind) {
                self.append_section(container, footer);
            }
        }
        if self.config.repeat_footer_logo {
            if let Some(logo) = &sections.footer_logo {
                self.append_section(container, logo);
            }
        }
        if self.config.repeat_footer_pagenum {
            if let Some(pagenum) = &sections.footer_pagenum {
                self.append_section(container, pagenum);
            }
        }
    }

    /// The full footer set closing a stream's last page.
    pub(crate) fn append_final_footers(&mut self, container: NodeId, sections: &Sections) {
        let all = sections
            .footers
            .iter()
            .chain(sections.footer_logo.iter())
            .chain(sections.footer_pagenum.iter());
        for footer in all {
            self.append_section(container, footer);
        }
    }

    /// Whether a section of `kind` is repeated on every page.
    pub(crate) fn repeats(&self, kind: SectionKind) -> bool {
        match kind {
            SectionKind::Header => self.config.repeat_header,
            SectionKind::DocInfo(i) => self.config.repeats_docinfo(i),
            SectionKind::RowHeader => self.config.repeat_rowheader,
            SectionKind::Footer(i) => self.config.repeats_footer(i),
            SectionKind::FooterLogo => self.config.repeat_footer_logo,
            SectionKind::FooterPagenum => self.config.repeat_footer_pagenum,
        }
    }
}
