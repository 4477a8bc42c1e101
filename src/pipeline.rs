//! Pipeline – ties together configuration, measurement and the formatter
//! into single calls over a form, a document, or an HTML string.

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use log::{debug, error};

use crate::config::{ConfigLayers, PaddtConfig, PrintFormConfig};
use crate::dom::{Document, NodeId};
use crate::error::PrintFormError;
use crate::formatter::Formatter;
use crate::measure::{HeightProvider, LayoutMeasurer};
use crate::pages::page_break_divider;
use crate::report::{FormReport, FormatReport};

/// Class of the source fragments picked up by [`format_document`].
pub const FORM_CLASS: &str = "printform";

/// Cooperative pause before each form so a host can settle rendering.
const FORM_PAUSE: Duration = Duration::from_millis(1);

static PROCESSING: AtomicBool = AtomicBool::new(false);
static PROCESSED: AtomicBool = AtomicBool::new(false);

/// Format one source fragment in place.
pub fn format_form(
    doc: &mut Document,
    form: NodeId,
    layers: &ConfigLayers,
    measurer: &dyn HeightProvider,
) -> Result<FormReport, PrintFormError> {
    run_form(doc, form, layers, measurer).map(|(report, _, _)| report)
}

/// Returns the report, the output container and the divider classes.
fn run_form(
    doc: &mut Document,
    form: NodeId,
    layers: &ConfigLayers,
    measurer: &dyn HeightProvider,
) -> Result<(FormReport, NodeId, String), PrintFormError> {
    let config = PrintFormConfig::resolve(doc, form, layers);
    let paddt = PaddtConfig::resolve(doc, form, layers);
    let divider_classes = config.div_page_break_before_class_append.clone();
    let formatter = Formatter::new(doc, form, config, paddt, measurer)?;
    let output = formatter.output();
    Ok((formatter.format(), output, divider_classes))
}

/// Format every `.printform` element of `doc` in document order. A failing
/// form is logged, reported and left as it was; the batch continues.
pub fn format_document(
    doc: &mut Document,
    layers: &ConfigLayers,
    measurer: &dyn HeightProvider,
) -> FormatReport {
    let forms = doc.all_by_class(doc.root(), FORM_CLASS);
    debug!("format document: {} form(s)", forms.len());
    let mut report = FormatReport::default();
    for (index, form) in forms.into_iter().enumerate() {
        thread::sleep(FORM_PAUSE);
        match run_form(doc, form, layers, measurer) {
            Ok((mut form_report, output, divider_classes)) => {
                if index > 0 {
                    if let Some(parent) = doc.parent(output) {
                        let divider = page_break_divider(doc, &divider_classes);
                        doc.insert_before(parent, divider, Some(output));
                    }
                }
                form_report.index = index;
                report.forms.push(form_report);
            }
            Err(e) => {
                error!("printform: failed to format form {index}: {e}");
                report.forms.push(FormReport::failed(index, e.to_string()));
            }
        }
    }
    report
}

/// [`format_document`] guarded against re-entry and repetition. Returns
/// `None` when a batch is already running, or when one has completed and
/// `force` is not set.
pub fn format_all(
    doc: &mut Document,
    layers: &ConfigLayers,
    measurer: &dyn HeightProvider,
    force: bool,
) -> Option<FormatReport> {
    if PROCESSED.load(Ordering::SeqCst) && !force {
        debug!("format all: already processed");
        return None;
    }
    if PROCESSING
        .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
        .is_err()
    {
        debug!("format all: batch already running");
        return None;
    }
    let _running = BatchRunning;
    let report = format_document(doc, layers, measurer);
    PROCESSED.store(true, Ordering::SeqCst);
    Some(report)
}

/// Clears `PROCESSING` when a batch ends, including by unwinding.
struct BatchRunning;

impl Drop for BatchRunning {
    fn drop(&mut self) {
        PROCESSING.store(false, Ordering::SeqCst);
    }
}

/// Whether a [`format_all`] batch has completed in this process.
pub fn batch_processed() -> bool {
    PROCESSED.load(Ordering::SeqCst)
}

/// Parse, format and serialize with the default layout measurer.
pub fn format_html(html: &str, layers: &ConfigLayers) -> (String, FormatReport) {
    format_html_with(html, layers, &LayoutMeasurer::default())
}

pub fn format_html_with(
    html: &str,
    layers: &ConfigLayers,
    measurer: &dyn HeightProvider,
) -> (String, FormatReport) {
    let mut doc = Document::parse(html);
    let report = format_document(&mut doc, layers, measurer);
    (doc.to_html(), report)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_FORMS: &str = r#"<body>
        <div class="printform" data-div-page-break-before-class-append=" next-form "><div class="prowitem" style="height:30px">a</div></div>
        <div class="printform" data-div-page-break-before-class-append="next-form"><div class="prowitem" style="height:30px">b</div></div>
    </body>"#;

    #[test]
    fn forms_after_the_first_get_a_divider() {
        let mut doc = Document::parse(TWO_FORMS);
        let report = format_document(&mut doc, &ConfigLayers::new(), &LayoutMeasurer::default());
        assert_eq!(report.forms.len(), 2);
        assert_eq!(report.forms[1].index, 1);
        assert!(report.failures().next().is_none());

        let body = doc.body();
        let outputs = doc.all_by_class(body, "printform_formatter_processed");
        assert_eq!(outputs.len(), 2);
        let top: Vec<NodeId> = doc.element_children(body);
        assert_eq!(top.len(), 3);
        assert!(doc.has_class(top[1], "div_page_break_before"));
        assert!(doc.has_class(top[1], "next-form"));
    }

    struct PanickingMeasurer;

    impl HeightProvider for PanickingMeasurer {
        fn measure_raw(&self, _doc: &Document, _id: NodeId) -> f32 {
            panic!("measurement unavailable");
        }
    }

    // The only unit test that calls `format_all`, since its guards are process-wide.
    #[test]
    fn panicking_batch_releases_the_running_guard() {
        let mut doc = Document::parse(TWO_FORMS);
        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            format_all(&mut doc, &ConfigLayers::new(), &PanickingMeasurer, true)
        }));
        assert!(outcome.is_err());
        assert!(!PROCESSING.load(Ordering::SeqCst));
        assert!(!batch_processed());

        let mut doc = Document::parse(TWO_FORMS);
        let report = format_all(&mut doc, &ConfigLayers::new(), &LayoutMeasurer::default(), false)
            .expect("a new batch starts after the panic");
        assert_eq!(report.forms.len(), 2);
        assert!(batch_processed());
    }

    #[test]
    fn detached_form_is_reported_not_fatal() {
        let mut doc = Document::parse(r#"<div class="printform"></div>"#);
        let orphan = doc.create_element("div");
        let err = format_form(&mut doc, orphan, &ConfigLayers::new(), &LayoutMeasurer::default());
        assert!(matches!(err, Err(PrintFormError::Detached)));
    }

    #[test]
    fn html_round_trip() {
        let (html, report) = format_html(
            r#"<div class="printform"><div class="prowitem" style="height:30px">row</div></div>"#,
            &ConfigLayers::new(),
        );
        assert_eq!(report.total_pages(), 1);
        assert!(html.contains("printform_formatter_processed"));
        assert!(html.contains("prowitem_processed"));
        assert!(!html.contains(r#"class="printform""#));
    }

    #[test]
    fn documents_without_forms_are_untouched() {
        let source = "<p>nothing to do</p>";
        let (html, report) = format_html(source, &ConfigLayers::new());
        assert!(report.forms.is_empty());
        assert_eq!(html, source);
    }
}
