//! Sample print forms for testing and demonstration.
//!
//! Each sample exercises a different part of the engine. Section and row
//! heights are fixed inline so the default measurer gives exact readings.

/// Invoice with every section kind, a subtotal/footer pair and page-number
/// placeholders in the page-number footer.
pub fn invoice_form() -> &'static str {
    r##"<body>
<div class="printform" data-papersize-height="700" data-repeat-footer-logo="y">
    <div class="pheader" style="height:60px"><h1 style="margin:0">Invoice #2024-001</h1></div>
    <div class="pdocinfo" style="height:40px">Acme Corp, 123 Business St, New York</div>
    <div class="pdocinfo002" style="height:30px">Client Inc, 456 Client Ave, Los Angeles</div>
    <table class="prowheader" style="height:24px"><tr><th>Item</th><th>Qty</th><th>Price</th><th>Total</th></tr></table>
    <table class="prowitem" style="height:32px"><tr><td>Web Development</td><td>40</td><td>$150.00</td><td>$6,000.00</td></tr></table>
    <table class="prowitem" style="height:32px"><tr><td>Design Services</td><td>20</td><td>$125.00</td><td>$2,500.00</td></tr></table>
    <table class="prowitem" style="height:32px"><tr><td>Hosting (Annual)</td><td>1</td><td>$500.00</td><td>$500.00</td></tr></table>
    <table class="prowitem" style="height:32px"><tr><td>Support Retainer</td><td>12</td><td>$80.00</td><td>$960.00</td></tr></table>
    <table class="prowitem row_subtotal" style="height:32px"><tr><td>Subtotal</td><td></td><td></td><td>$9,960.00</td></tr></table>
    <table class="prowitem row_footer" style="height:32px"><tr><td>Total due</td><td></td><td></td><td>$9,960.00</td></tr></table>
    <div class="pfooter" style="height:50px">Payment within 30 days.</div>
    <div class="pfooter_logo" style="height:30px">ACME</div>
    <table class="pfooter_pagenum" style="height:20px"><tr><td>Invoice #2024-001</td><td data-page-number-container></td></tr></table>
</div>
</body>"##
}

/// Ten rows where the fifth forces a page break.
pub fn page_break_form() -> &'static str {
    r##"<body>
<div class="printform">
    <div class="pheader" style="height:50px">Packing list</div>
    <div class="prowitem" style="height:40px">1</div>
    <div class="prowitem" style="height:40px">2</div>
    <div class="prowitem" style="height:40px">3</div>
    <div class="prowitem" style="height:40px">4</div>
    <div class="prowitem page-break-before" style="height:40px">5</div>
    <div class="prowitem" style="height:40px">6</div>
    <div class="prowitem" style="height:40px">7</div>
    <div class="prowitem" style="height:40px">8</div>
    <div class="prowitem" style="height:40px">9</div>
    <div class="prowitem" style="height:40px">10</div>
    <div class="pfooter_pagenum" style="height:20px"><span data-page-number></span>/<span data-page-total></span></div>
</div>
</body>"##
}

/// Terms block (PTAC) after the rows and an appendix (PADDT) with a long
/// paragraph that is split into segments.
pub fn terms_and_appendix_form() -> &'static str {
    r##"<body>
<div class="printform" data-paddt-max-words-per-segment="12">
    <div class="pheader" style="height:50px">Service agreement</div>
    <div class="prowheader" style="height:24px">Line items</div>
    <div class="prowitem" style="height:30px">Consulting</div>
    <div class="prowitem" style="height:30px">Implementation</div>
    <table class="ptac"><tr><td><div><p>Terms apply to every order placed under this agreement.</p><p>Late payments accrue <b>interest</b> monthly.</p></div></td></tr></table>
    <table class="paddt"><tr><td><div><p>The appendix lists every deliverable together with its <i>acceptance criteria</i> and the named reviewer responsible for sign off on each milestone of the project plan.</p></div></td></tr></table>
    <div class="pfooter" style="height:40px">Signed on behalf of both parties.</div>
    <div class="pfooter_pagenum" style="height:20px"><span data-page-number></span></div>
</div>
</body>"##
}

/// A form with sections but no rows.
pub fn empty_form() -> &'static str {
    r##"<body>
<div class="printform">
    <div class="pheader" style="height:50px">Nothing to report</div>
    <div class="pdocinfo" style="height:30px">Period: Q4</div>
    <div class="prowheader" style="height:24px">Items</div>
    <div class="pfooter" style="height:40px">End of report</div>
</div>
</body>"##
}

/// The smallest useful form: one row, no sections.
pub fn minimal_form() -> &'static str {
    r##"<div class="printform"><div class="prowitem" style="height:30px">Only row</div></div>"##
}

/// A form with a repeating row header, `count` rows of `row_height` px and
/// a repeating logo footer.
pub fn rows_form(count: usize, row_height: u32) -> String {
    let mut html = String::from(
        r#"<body><div class="printform" data-repeat-footer-logo="true"><div class="prowheader" style="height:50px">Header</div>"#,
    );
    for i in 1..=count {
        html.push_str(&format!(
            r#"<div class="prowitem" style="height:{row_height}px">Row {i}</div>"#
        ));
    }
    html.push_str(r#"<div class="pfooter_logo" style="height:30px">Logo</div></div></body>"#);
    html
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Document;

    #[test]
    fn samples_hold_one_form_each() {
        let rows = rows_form(3, 20);
        let samples: Vec<(&str, &str)> = vec![
            ("invoice", invoice_form()),
            ("page_break", page_break_form()),
            ("terms_and_appendix", terms_and_appendix_form()),
            ("empty", empty_form()),
            ("minimal", minimal_form()),
            ("rows", &rows),
        ];

        for (name, html) in samples {
            let doc = Document::parse(html);
            let forms = doc.all_by_class(doc.root(), "printform");
            assert_eq!(forms.len(), 1, "sample '{name}' should hold one form");
        }
    }

    #[test]
    fn rows_form_counts() {
        let doc = Document::parse(&rows_form(7, 25));
        assert_eq!(doc.all_by_class(doc.root(), "prowitem").len(), 7);
    }
}
