//! Per-form formatter – owns the output container and drives the main and
//! PADDT streams through pagination, then finalizes page heights and
//! page-number totals.
//!
//! The row loop lives in [`crate::pagination`] and section insertion in
//! [`crate::render`]; both are further `impl` blocks on [`Formatter`].

use log::debug;

use crate::config::{PaddtConfig, PrintFormConfig};
use crate::dom::{Document, NodeId};
use crate::error::PrintFormError;
use crate::measure::{normalize_height, HeightProvider};
use crate::page_numbers::PageNumberRegistrar;
use crate::pages::{finalize_page_height, PageManager, Stream};
use crate::pagination::{RemainderOptions, RenderState};
use crate::report::{FormReport, PageReport};
use crate::rows::{should_skip_dummy_row_items, PADDT_ROW_CLASS, PTAC_ROW_CLASS, ROW_CLASS};
use crate::sections::Sections;
use crate::spacing::{footer_spacer_template, FooterState};

/// Class of the output container while a form is being formatted.
pub const OUTPUT_CLASS: &str = "printform_formatter";
/// Class of the output container once formatting completed.
pub const OUTPUT_PROCESSED_CLASS: &str = "printform_formatter_processed";

pub struct Formatter<'a> {
    pub(crate) doc: &'a mut Document,
    pub(crate) form: NodeId,
    pub(crate) config: PrintFormConfig,
    pub(crate) paddt: PaddtConfig,
    pub(crate) measurer: &'a dyn HeightProvider,
    pub(crate) pages: PageManager,
    pub(crate) numbers: PageNumberRegistrar,
    /// Detached `div.div_footer_spacer` cloned by the footer spacer step.
    pub(crate) spacer_template: NodeId,
    pub(crate) debug: bool,
}

impl<'a> Formatter<'a> {
    /// Create the output container directly before `form`.
    pub fn new(
        doc: &'a mut Document,
        form: NodeId,
        config: PrintFormConfig,
        paddt: PaddtConfig,
        measurer: &'a dyn HeightProvider,
    ) -> Result<Self, PrintFormError> {
        let parent = doc.parent(form).ok_or(PrintFormError::Detached)?;
        let output = doc.create_element("div");
        doc.set_attr(output, "class", OUTPUT_CLASS);
        doc.insert_before(parent, output, Some(form));
        let spacer_template = footer_spacer_template(doc);
        let pages = PageManager::new(output, &config);
        let numbers = PageNumberRegistrar::new(&config);
        let debug = config.debug || paddt.paddt_debug;
        Ok(Self {
            doc,
            form,
            config,
            paddt,
            measurer,
            pages,
            numbers,
            spacer_template,
            debug,
        })
    }

    /// The output container.
    pub fn output(&self) -> NodeId {
        self.pages.output()
    }

    /// Paginate the form. On return the form is gone and its pages sit in
    /// `div.printform_formatter_processed` where the form was.
    pub fn format(mut self) -> FormReport {
        self.pages.current_page(self.doc);
        let sections = Sections::collect(self.doc, self.form, &self.paddt, self.measurer);
        sections.mark_processed(self.doc);
        if self.debug {
            debug!(
                "form: {} section(s), {} row(s), {} PADDT row(s)",
                sections.iter().count(),
                sections.rows.len(),
                sections.paddt_rows.len()
            );
        }

        let height_per_page = self.paginate_stream(&sections);

        if !sections.paddt_rows.is_empty() {
            self.pages.set_stream(Stream::Paddt);
            self.pages.start_next_sheet(self.doc);
            let paddt_sections = sections.for_paddt(&self.paddt);
            self.paginate_stream(&paddt_sections);
        }

        let total_pages = self.pages.current_page_number();
        let total_sheets = self.pages.current_sheet_number().max(1);
        self.numbers.finalize(self.doc, total_pages, total_sheets);

        for record in self.pages.records() {
            finalize_page_height(self.doc, record.node, &self.config, self.measurer);
        }

        let report = self.report(height_per_page, total_pages, total_sheets);
        let output = self.pages.output();
        self.doc.set_attr(output, "class", OUTPUT_PROCESSED_CLASS);
        self.doc.detach(self.form);
        report
    }

    /// Render, then finalize, one row stream. Returns its height per page.
    fn paginate_stream(&mut self, sections: &Sections) -> f32 {
        let footer = self.compute_footer_state(sections);
        let height_per_page = self.compute_height_per_page(sections);
        if self.debug {
            debug!(
                "stream: {height_per_page}px per page, footers {}px ({}px repeating)",
                footer.total_final, footer.repeating
            );
        }
        let mut state = self.render_rows(sections, &footer, height_per_page);
        if !state.started {
            state = self.render_empty_document(sections, height_per_page);
        }
        self.finalize_document(sections, &footer, height_per_page, &state);
        height_per_page
    }

    /// Paper height minus everything repeated on every page.
    pub(crate) fn compute_height_per_page(&self, sections: &Sections) -> f32 {
        let repeated: f32 = sections
            .iter()
            .filter(|s| self.repeats(s.kind))
            .map(|s| s.height)
            .sum();
        (self.config.papersize_height - repeated).max(0.0)
    }

    pub(crate) fn compute_footer_state(&self, sections: &Sections) -> FooterState {
        let family = sections
            .footers
            .iter()
            .chain(sections.footer_logo.iter())
            .chain(sections.footer_pagenum.iter());
        let mut state = FooterState::default();
        for footer in family {
            state.total_final += footer.height;
            if self.repeats(footer.kind) {
                state.repeating += footer.height;
            }
        }
        state.non_repeating = (state.total_final - state.repeating).max(0.0);
        state
    }

    /// A stream without placeable rows still gets one page with its
    /// first-page sections.
    pub(crate) fn render_empty_document(&mut self, sections: &Sections, height_per_page: f32) -> RenderState {
        let container = self.pages.current_page(self.doc);
        self.append_first_page_sections(container, sections, false);
        let repeating_height = self.repeating_height(sections, false);
        let current_height = self.measure_content(container, repeating_height);
        RenderState {
            current_height,
            page_limit: height_per_page,
            ptac_page: false,
            paddt_page: false,
            repeating_height,
            rows_placed: 0,
            started: true,
        }
    }

    /// Close the stream: pad the last page and append the full footer set,
    /// moving to a fresh page when the footers no longer fit.
    pub(crate) fn finalize_document(
        &mut self,
        sections: &Sections,
        footer: &FooterState,
        height_per_page: f32,
        state: &RenderState,
    ) {
        let limit = if state.page_limit > 0.0 {
            state.page_limit
        } else {
            height_per_page
        };
        let skip_dummy =
            should_skip_dummy_row_items(state.ptac_page, state.paddt_page, &self.config, &self.paddt);
        let allowance = normalize_height(footer.total_final - footer.repeating);
        let with_final = state.current_height + allowance;

        if with_final <= limit {
            let container = self.pages.current_page(self.doc);
            self.apply_remainder_spacing(
                container,
                limit,
                with_final,
                footer,
                RemainderOptions {
                    skip_dummy_row_items: skip_dummy,
                    repeating_height: Some(state.repeating_height),
                    use_current_height: true,
                },
            );
            self.append_final_footers(container, sections);
            return;
        }

        if self.debug {
            debug!("final footers need {allowance}px more than page {} has", self.pages.current_page_number());
        }
        self.prepare_next_page(
            sections,
            limit,
            state.current_height,
            footer,
            false,
            RemainderOptions {
                skip_dummy_row_items: skip_dummy,
                repeating_height: Some(state.repeating_height),
                use_current_height: false,
            },
        );
        let container = self.pages.current_page(self.doc);
        let repeating_height = self.repeating_height(sections, false);
        self.apply_remainder_spacing(
            container,
            height_per_page,
            allowance,
            footer,
            RemainderOptions {
                skip_dummy_row_items: false,
                repeating_height: Some(repeating_height),
                use_current_height: true,
            },
        );
        self.append_final_footers(container, sections);
    }

    fn report(&self, height_per_page: f32, total_pages: usize, total_sheets: usize) -> FormReport {
        let processed = [ROW_CLASS, PTAC_ROW_CLASS, PADDT_ROW_CLASS].map(|c| format!("{c}_processed"));
        let pages = self
            .pages
            .records()
            .iter()
            .map(|record| {
                let rows = self
                    .doc
                    .element_children(record.node)
                    .into_iter()
                    .filter(|&c| processed.iter().any(|p| self.doc.has_class(c, p)))
                    .count();
                PageReport {
                    number: record.number,
                    sheet: record.sheet,
                    stream: record.stream,
                    rows,
                    height: self.measurer.measure_raw(self.doc, record.node),
                }
            })
            .collect();
        FormReport {
            index: 0,
            papersize_width: self.config.papersize_width,
            papersize_height: self.config.papersize_height,
            n_up: self.config.n_up,
            height_per_page,
            total_pages,
            total_sheets,
            pages,
            error: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigLayers;
    use crate::measure::LayoutMeasurer;

    const FORM: &str = r#"<body><div class="printform">
        <div class="pheader" style="height:40px"></div>
        <div class="pdocinfo" style="height:30px"></div>
        <div class="prowheader" style="height:20px"></div>
        <div class="prowitem" style="height:50px"></div>
        <div class="pfooter" style="height:25px"></div>
        <div class="pfooter_logo" style="height:15px"></div>
        <div class="pfooter_pagenum" style="height:10px"></div>
    </div></body>"#;

    fn with_formatter<R>(layers: ConfigLayers, f: impl FnOnce(&mut Formatter<'_>, &Sections) -> R) -> R {
        let mut doc = Document::parse(FORM);
        let form = doc.first_by_class(doc.root(), "printform").unwrap();
        let config = PrintFormConfig::resolve(&doc, form, &layers);
        let paddt = PaddtConfig::resolve(&doc, form, &layers);
        let measurer = LayoutMeasurer::default();
        let mut formatter = Formatter::new(&mut doc, form, config, paddt, &measurer).unwrap();
        let sections = Sections::collect(formatter.doc, form, &formatter.paddt, formatter.measurer);
        f(&mut formatter, &sections)
    }

    #[test]
    fn height_per_page_subtracts_repeating_sections() {
        let mut layers = ConfigLayers::new();
        layers.set_override("papersizeHeight", 1000);
        with_formatter(layers, |f, s| {
            // footers repeat only when flagged
            assert_eq!(f.compute_height_per_page(s), 1000.0 - 40.0 - 30.0 - 20.0);
        });
    }

    #[test]
    fn footer_state_splits_repeating_part() {
        let mut layers = ConfigLayers::new();
        layers.set_override("repeatFooterLogo", true);
        with_formatter(layers, |f, s| {
            let state = f.compute_footer_state(s);
            assert_eq!(state.total_final, 50.0);
            assert_eq!(state.repeating, 15.0);
            assert_eq!(state.non_repeating, 35.0);
            assert_eq!(f.compute_height_per_page(s), 1050.0 - 90.0 - 15.0);
        });
    }

    #[test]
    fn detached_form_is_rejected() {
        let mut doc = Document::new();
        let form = doc.create_element("div");
        let measurer = LayoutMeasurer::default();
        let result = Formatter::new(
            &mut doc,
            form,
            PrintFormConfig::default(),
            PaddtConfig::default(),
            &measurer,
        );
        assert!(matches!(result, Err(PrintFormError::Detached)));
    }

    #[test]
    fn output_replaces_form() {
        let mut doc = Document::parse(FORM);
        let form = doc.first_by_class(doc.root(), "printform").unwrap();
        let layers = ConfigLayers::new();
        let config = PrintFormConfig::resolve(&doc, form, &layers);
        let paddt = PaddtConfig::resolve(&doc, form, &layers);
        let measurer = LayoutMeasurer::default();
        let report = Formatter::new(&mut doc, form, config, paddt, &measurer)
            .unwrap()
            .format();
        assert_eq!(report.total_pages, 1);
        assert_eq!(report.rows_placed(), 1);
        assert!(doc.first_by_class(doc.root(), "printform").is_none());
        assert!(doc.first_by_class(doc.root(), OUTPUT_PROCESSED_CLASS).is_some());
    }
}
