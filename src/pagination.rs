//! Pagination engine – places one row stream onto pages.
//!
//! Rows are processed once, in document order. For each row the engine
//! appends a clone to the current page, measures the page's content height
//! (raw page height minus the repeating sections already on it), and on
//! overflow removes the clone, closes the page (remainder spacing plus
//! repeating footers), opens the next one and places the row there.
//!
//! Three paths exist per row:
//! - forced break (`tb_page_break_before`): always starts a new page;
//! - keep-together (subtotal, footer row, or a subtotal directly followed by
//!   a footer row): measured speculatively as a unit, preceded by dummy
//!   rows that push it to the bottom of its page;
//! - normal: append, measure, move on overflow.
//!
//! Comparisons are inclusive: a row that exactly fills the page stays. A
//! page that holds no rows yet is never closed, so an oversized row ends up
//! alone on its page instead of leaving an empty page behind.

use log::{debug, warn};

use crate::dom::NodeId;
use crate::formatter::Formatter;
use crate::measure::normalize_height;
use crate::rows::{
    has_forced_break, is_footer_row, is_paddt_row, is_ptac_row, is_subtotal_row, mark_processed,
    row_base_class, should_skip_dummy_row_items, should_skip_row_header,
};
use crate::sections::Sections;
use crate::spacing::{
    apply_dummy_row_items_step, apply_dummy_row_step, apply_footer_spacer_step,
    apply_footer_spacer_with_dummy_step, insert_keep_together_dummies, FooterState,
};

/// Per-page state while a stream is being placed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageContext {
    /// Usable content height per page.
    pub base_limit: f32,
    /// `base_limit`, plus the row-header height when this page omits it.
    pub limit: f32,
    pub skip_row_header: bool,
    /// Page started with a PTAC row and has held nothing else since.
    pub ptac_page: bool,
    /// Page started with a PADDT row and has held nothing else since.
    pub paddt_page: bool,
    /// Height of the repeating sections on this page.
    pub repeating_height: f32,
    pub rows_on_page: usize,
}

impl PageContext {
    pub fn new(height_per_page: f32) -> Self {
        Self {
            base_limit: height_per_page,
            limit: height_per_page,
            skip_row_header: false,
            ptac_page: false,
            paddt_page: false,
            repeating_height: 0.0,
            rows_on_page: 0,
        }
    }
}

/// Where a stream left off, handed to finalization.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderState {
    pub current_height: f32,
    pub page_limit: f32,
    pub ptac_page: bool,
    pub paddt_page: bool,
    pub repeating_height: f32,
    pub rows_placed: usize,
    /// First-page sections have been placed.
    pub started: bool,
}

/// Options for [`Formatter::apply_remainder_spacing`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RemainderOptions {
    pub skip_dummy_row_items: bool,
    /// When set (and `use_current_height` is not), the working height is
    /// re-measured from the page minus this amount.
    pub repeating_height: Option<f32>,
    pub use_current_height: bool,
}

impl Formatter<'_> {
    /// Place every row of `sections.rows`. Returns the state of the last page.
    pub(crate) fn render_rows(
        &mut self,
        sections: &Sections,
        footer: &FooterState,
        height_per_page: f32,
    ) -> RenderState {
        let mut ctx = PageContext::new(height_per_page);
        let mut current = 0.0;
        let mut started = false;
        let mut placed = 0;
        let rows = &sections.rows;
        if self.debug {
            debug!(
                "render rows: {} row(s), {height_per_page}px per page",
                rows.len()
            );
        }

        let mut index = 0;
        while index < rows.len() {
            let row = rows[index];
            let row_height = self.measurer.measure(self.doc, row);
            let base_class = row_base_class(self.doc, row);
            let footer_row = if is_subtotal_row(self.doc, row) {
                rows.get(index + 1)
                    .copied()
                    .filter(|&next| is_footer_row(self.doc, next))
            } else {
                None
            };
            let footer_height = match footer_row {
                Some(f) => self.measurer.measure(self.doc, f),
                None => 0.0,
            };
            let consumed = 1 + usize::from(footer_row.is_some());

            if row_height <= 0.0 && footer_height <= 0.0 {
                mark_processed(self.doc, row, base_class);
                if let Some(f) = footer_row {
                    let class = row_base_class(self.doc, f);
                    mark_processed(self.doc, f, class);
                }
                index += consumed;
                continue;
            }

            if !started {
                self.refresh_page_context(&mut ctx, row, sections);
                let container = self.pages.current_page(self.doc);
                self.append_first_page_sections(container, sections, ctx.skip_row_header);
                ctx.repeating_height = self.repeating_height(sections, ctx.skip_row_header);
                current = self.measure_content(container, ctx.repeating_height);
                started = true;
                if self.debug {
                    debug!(
                        "page {} start: {current}px used, limit {}px",
                        self.pages.current_page_number(),
                        ctx.limit
                    );
                }
            }

            mark_processed(self.doc, row, base_class);
            if let Some(f) = footer_row {
                let class = row_base_class(self.doc, f);
                mark_processed(self.doc, f, class);
            }

            let keep_together = footer_row.is_some()
                || is_subtotal_row(self.doc, row)
                || is_footer_row(self.doc, row);
            current = if keep_together {
                self.place_keep_together(
                    &mut ctx,
                    sections,
                    footer,
                    current,
                    index,
                    (row, row_height),
                    footer_row.map(|f| (f, footer_height)),
                )
            } else {
                self.place_row(&mut ctx, sections, footer, current, index, row)
            };
            placed += consumed;
            index += consumed;
        }

        if self.debug {
            debug!(
                "render rows done: page {}, {current}px used",
                self.pages.current_page_number()
            );
        }
        RenderState {
            current_height: current,
            page_limit: ctx.limit,
            ptac_page: ctx.ptac_page,
            paddt_page: ctx.paddt_page,
            repeating_height: ctx.repeating_height,
            rows_placed: placed,
            started,
        }
    }

    /// Forced-break and normal rows.
    fn place_row(
        &mut self,
        ctx: &mut PageContext,
        sections: &Sections,
        footer: &FooterState,
        current: f32,
        index: usize,
        row: NodeId,
    ) -> f32 {
        let current = if has_forced_break(self.doc, row) {
            if ctx.rows_on_page > 0 {
                if self.debug {
                    debug!("forced break before row {index}");
                }
                self.break_page(ctx, sections, footer, current, row);
            }
            let container = self.pages.current_page(self.doc);
            self.append_row(container, row, index);
            self.measure_content(container, ctx.repeating_height)
        } else {
            let container = self.pages.current_page(self.doc);
            let clone = self.append_row(container, row, index);
            let measured = self.measure_content(container, ctx.repeating_height);
            if measured <= ctx.limit || ctx.rows_on_page == 0 {
                if measured > ctx.limit {
                    warn!(
                        "row {index} needs {measured}px but the page allows {}px; placing it alone",
                        ctx.limit
                    );
                }
                measured
            } else {
                self.doc.detach(clone);
                if self.debug {
                    debug!("overflow at row {index}: {measured}px > {}px", ctx.limit);
                }
                self.break_page(ctx, sections, footer, current, row);
                let container = self.pages.current_page(self.doc);
                self.append_row(container, row, index);
                self.measure_content(container, ctx.repeating_height)
            }
        };
        ctx.rows_on_page += 1;
        self.settle_page_kind(ctx, row, None);
        current
    }

    /// Subtotal and footer rows, alone or as a pair.
    #[allow(clippy::too_many_arguments)]
    fn place_keep_together(
        &mut self,
        ctx: &mut PageContext,
        sections: &Sections,
        footer: &FooterState,
        current: f32,
        index: usize,
        (row, row_height): (NodeId, f32),
        pair: Option<(NodeId, f32)>,
    ) -> f32 {
        let mut current = current;
        if has_forced_break(self.doc, row) && ctx.rows_on_page > 0 {
            current = self.break_page(ctx, sections, footer, current, row);
        }

        let container = self.pages.current_page(self.doc);
        let test_row = self.append_clone(container, row);
        let test_pair = pair.map(|(f, _)| self.append_clone(container, f));
        let test_height = self.measure_content(container, ctx.repeating_height);
        if let Some(t) = test_pair {
            self.doc.detach(t);
        }
        self.doc.detach(test_row);

        if test_height > ctx.limit && ctx.rows_on_page > 0 {
            if self.debug {
                debug!("keep-together group at row {index} moves to the next page");
            }
            current = self.break_page(ctx, sections, footer, current, row);
        }

        if !should_skip_dummy_row_items(ctx.ptac_page, ctx.paddt_page, &self.config, &self.paddt) {
            let container = self.pages.current_page(self.doc);
            let reserved = row_height + pair.map_or(0.0, |(_, h)| h);
            let inserted = insert_keep_together_dummies(
                self.doc,
                &self.config,
                container,
                ctx.limit - current - reserved,
            );
            if inserted > 0 && self.debug {
                debug!("{inserted} dummy row(s) before keep-together group at row {index}");
            }
        }

        let container = self.pages.current_page(self.doc);
        self.append_row(container, row, index);
        if let Some((f, _)) = pair {
            self.append_row(container, f, index + 1);
        }
        let current = self.measure_content(container, ctx.repeating_height);
        ctx.rows_on_page += 1 + usize::from(pair.is_some());
        self.settle_page_kind(ctx, row, pair.map(|(f, _)| f));
        current
    }

    /// Close the current page and open the next one for `row`. Returns the
    /// content height already used on the new page.
    fn break_page(
        &mut self,
        ctx: &mut PageContext,
        sections: &Sections,
        footer: &FooterState,
        current: f32,
        row: NodeId,
    ) -> f32 {
        let skip_dummy =
            should_skip_dummy_row_items(ctx.ptac_page, ctx.paddt_page, &self.config, &self.paddt);
        let next_skip_row_header = should_skip_row_header(self.doc, row, &self.config, &self.paddt);
        self.prepare_next_page(
            sections,
            ctx.limit,
            current,
            footer,
            next_skip_row_header,
            RemainderOptions {
                skip_dummy_row_items: skip_dummy,
                repeating_height: Some(ctx.repeating_height),
                use_current_height: false,
            },
        );
        self.refresh_page_context(ctx, row, sections);
        ctx.repeating_height = self.repeating_height(sections, ctx.skip_row_header);
        ctx.rows_on_page = 0;
        let container = self.pages.current_page(self.doc);
        self.measure_content(container, ctx.repeating_height)
    }

    /// Fill and close the current page, then open the next with its
    /// repeating sections. Returns the filled height of the closed page.
    pub(crate) fn prepare_next_page(
        &mut self,
        sections: &Sections,
        limit: f32,
        current: f32,
        footer: &FooterState,
        skip_row_header: bool,
        options: RemainderOptions,
    ) -> f32 {
        let container = self.pages.current_page(self.doc);
        let filled = self.apply_remainder_spacing(container, limit, current, footer, options);
        self.append_repeating_footers(container, sections);
        let next = self.pages.start_next_page(self.doc);
        self.append_repeating_sections(next, sections, skip_row_header);
        filled
    }

    /// Run the four remainder steps in order on `container`.
    pub(crate) fn apply_remainder_spacing(
        &mut self,
        container: NodeId,
        limit: f32,
        current: f32,
        footer: &FooterState,
        options: RemainderOptions,
    ) -> f32 {
        let mut working = normalize_height(current);
        if let Some(repeating) = options.repeating_height {
            if !options.use_current_height {
                working = normalize_height(self.measurer.measure_raw(self.doc, container) - repeating);
            }
        }
        if self.debug {
            debug!(
                "remainder spacing on page {}: {working}px of {limit}px, skip dummy items: {}",
                self.pages.current_page_number(),
                options.skip_dummy_row_items
            );
        }
        if !options.skip_dummy_row_items {
            working = apply_dummy_row_items_step(self.doc, &self.config, container, limit, working);
        }
        working = apply_dummy_row_step(self.doc, &self.config, container, limit, working);
        let (after, skip_spacer) = apply_footer_spacer_with_dummy_step(
            self.doc,
            &self.config,
            container,
            limit,
            working,
            options.skip_dummy_row_items,
        );
        working = after;
        if !skip_spacer {
            apply_footer_spacer_step(
                self.doc,
                &self.config,
                container,
                limit,
                working,
                footer,
                self.spacer_template,
            );
        }
        normalize_height(working)
    }

    /// Reclassify the page for the row that opens it.
    pub(crate) fn refresh_page_context(&self, ctx: &mut PageContext, row: NodeId, sections: &Sections) {
        ctx.skip_row_header = should_skip_row_header(self.doc, row, &self.config, &self.paddt);
        ctx.ptac_page = is_ptac_row(self.doc, row);
        ctx.paddt_page = is_paddt_row(self.doc, row);
        ctx.limit = ctx.base_limit
            + if ctx.skip_row_header {
                sections.row_header_height()
            } else {
                0.0
            };
    }

    /// Clear the PTAC/PADDT page flags once a row of another kind lands.
    fn settle_page_kind(&self, ctx: &mut PageContext, row: NodeId, pair: Option<NodeId>) {
        let pair_ptac = pair.is_some_and(|f| is_ptac_row(self.doc, f));
        let pair_paddt = pair.is_some_and(|f| is_paddt_row(self.doc, f));
        if !is_ptac_row(self.doc, row) && !pair_ptac {
            ctx.ptac_page = false;
        }
        if !is_paddt_row(self.doc, row) && !pair_paddt {
            ctx.paddt_page = false;
        }
    }

    /// Height of the sections repeated at the top of a page.
    pub(crate) fn repeating_height(&self, sections: &Sections, skip_row_header: bool) -> f32 {
        let mut total = 0.0;
        if self.config.repeat_header {
            total += sections.header.map_or(0.0, |s| s.height);
        }
        for doc_info in &sections.doc_infos {
            if self.repeats(doc_info.kind) {
                total += doc_info.height;
            }
        }
        if self.config.repeat_rowheader && !skip_row_header {
            total += sections.row_header_height();
        }
        normalize_height(total)
    }

    /// Page height minus its repeating sections.
    pub(crate) fn measure_content(&self, container: NodeId, repeating_height: f32) -> f32 {
        normalize_height(self.measurer.measure_raw(self.doc, container) - repeating_height)
    }
}
