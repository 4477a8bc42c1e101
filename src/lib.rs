//! # printform – measurement-driven pagination of HTML print forms
//!
//! A print form is a `.printform` element holding section blocks (header,
//! doc-infos, row header, footers) and a flat list of row items. This crate
//! lays those rows out onto fixed-height logical pages, grouped N-up onto
//! physical sheets, repeating sections where configured and padding every
//! page to the exact paper height. The pipeline stages are:
//!
//! 1. **Parse** – HTML string → mutable arena DOM ([`dom`])
//! 2. **Configure** – defaults, legacy globals, `data-*` attributes and
//!    caller overrides merged per form ([`config`])
//! 3. **Collect** – segment expansion, sections and rows ([`sections`], [`text`])
//! 4. **Measure** – element heights via Taffy layout ([`measure`], [`style`], [`fonts`])
//! 5. **Paginate** – the row loop, filler and page numbers ([`pagination`],
//!    [`spacing`], [`pages`], [`page_numbers`], [`formatter`])
//! 6. **Serialize** – formatted HTML plus a JSON report ([`pipeline`], [`report`])
//!
//! A C-compatible FFI surface is exposed via the [`ffi`] module.

pub mod config;
pub mod dom;
pub mod error;
pub mod ffi;
pub mod fonts;
pub mod formatter;
pub mod measure;
pub mod page_numbers;
pub mod pages;
pub mod pagination;
pub mod pipeline;
pub mod render;
pub mod report;
pub mod rows;
pub mod sections;
pub mod spacing;
pub mod style;
pub mod templates;
pub mod text;

// Re-exports for convenience
pub use config::{ConfigLayers, PaddtConfig, PrintFormConfig};
pub use dom::{Document, NodeId};
pub use error::PrintFormError;
pub use measure::{HeightProvider, LayoutMeasurer};
pub use pipeline::{format_all, format_document, format_form, format_html, format_html_with};
pub use report::{FormReport, FormatReport, PageReport};
