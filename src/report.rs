//! Format report – a serializable summary of what pagination produced for
//! each form. Handy for tests and for callers that post-process output.

use serde::{Deserialize, Serialize};

use crate::pages::Stream;

/// Summary of one `format_document` run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FormatReport {
    /// One entry per `.printform` element, in document order.
    pub forms: Vec<FormReport>,
}

/// Result for one form.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FormReport {
    /// Position of the form among the document's `.printform` elements.
    pub index: usize,
    pub papersize_width: f32,
    pub papersize_height: f32,
    pub n_up: usize,
    /// Usable content height per page after repeating sections.
    pub height_per_page: f32,
    pub total_pages: usize,
    pub total_sheets: usize,
    pub pages: Vec<PageReport>,
    /// Set when formatting failed and the form was left untouched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageReport {
    /// 1-based logical page number.
    pub number: usize,
    /// 1-based physical sheet number.
    pub sheet: usize,
    pub stream: Stream,
    /// Row clones placed on the page.
    pub rows: usize,
    /// Final measured height in px.
    pub height: f32,
}

impl FormatReport {
    pub fn total_pages(&self) -> usize {
        self.forms.iter().map(|f| f.total_pages).sum()
    }

    pub fn failures(&self) -> impl Iterator<Item = &FormReport> {
        self.forms.iter().filter(|f| f.error.is_some())
    }

    /// Pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

impl FormReport {
    /// A report for a form that could not be formatted.
    pub fn failed(index: usize, message: impl Into<String>) -> Self {
        Self {
            index,
            error: Some(message.into()),
            ..Self::default()
        }
    }

    pub fn rows_placed(&self) -> usize {
        self.pages.iter().map(|p| p.rows).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_shape() {
        let report = FormatReport {
            forms: vec![FormReport {
                index: 0,
                papersize_width: 750.0,
                papersize_height: 1050.0,
                n_up: 1,
                height_per_page: 1000.0,
                total_pages: 1,
                total_sheets: 1,
                pages: vec![PageReport {
                    number: 1,
                    sheet: 1,
                    stream: Stream::Paddt,
                    rows: 3,
                    height: 1050.0,
                }],
                error: None,
            }],
        };
        let json = report.to_json().unwrap();
        assert!(json.contains("\"stream\": \"paddt\""));
        assert!(!json.contains("error"));
        assert_eq!(FormatReport::from_json(&json).unwrap(), report);
    }

    #[test]
    fn failures_are_listed() {
        let report = FormatReport {
            forms: vec![FormReport::default(), FormReport::failed(1, "boom")],
        };
        let failed: Vec<usize> = report.failures().map(|f| f.index).collect();
        assert_eq!(failed, vec![1]);
        assert_eq!(report.total_pages(), 0);
    }
}
