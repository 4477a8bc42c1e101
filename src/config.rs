//! Configuration – descriptor table, tier merging and the typed
//! [`PrintFormConfig`] / [`PaddtConfig`] the engine reads.
//!
//! Four tiers in ascending priority: descriptor defaults, legacy globals
//! (snake_case keys), `data-*` attributes on the form element (camelCase) and
//! caller overrides (camelCase). Invalid values never raise; they fall back to
//! the descriptor default.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::dom::{Document, NodeId, Tag};

// ---------------------------------------------------------------------------
// Descriptors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DefaultValue {
    Bool(bool),
    Number(f64),
    Str(&'static str),
}

/// One option: canonical (and dataset) key, legacy global key, default.
#[derive(Debug, Clone, Copy)]
pub struct ConfigDescriptor {
    pub key: &'static str,
    pub legacy_key: &'static str,
    pub default: DefaultValue,
}

const fn flag(key: &'static str, legacy_key: &'static str, default: bool) -> ConfigDescriptor {
    ConfigDescriptor {
        key,
        legacy_key,
        default: DefaultValue::Bool(default),
    }
}

const fn number(key: &'static str, legacy_key: &'static str, default: f64) -> ConfigDescriptor {
    ConfigDescriptor {
        key,
        legacy_key,
        default: DefaultValue::Number(default),
    }
}

const fn string(
    key: &'static str,
    legacy_key: &'static str,
    default: &'static str,
) -> ConfigDescriptor {
    ConfigDescriptor {
        key,
        legacy_key,
        default: DefaultValue::Str(default),
    }
}

pub const CONFIG_DESCRIPTORS: &[ConfigDescriptor] = &[
    number("papersizeWidth", "papersize_width", 750.0),
    number("papersizeHeight", "papersize_height", 1050.0),
    string("paperSize", "paper_size", ""),
    string("orientation", "orientation", "portrait"),
    number("dpi", "dpi", 96.0),
    number("nUp", "n_up", 1.0),
    flag("showLogicalPageNumber", "show_logical_page_number", true),
    flag("showPhysicalPageNumber", "show_physical_page_number", false),
    number("heightOfDummyRowItem", "height_of_dummy_row_item", 18.0),
    flag("repeatHeader", "repeat_header", true),
    flag("repeatDocinfo", "repeat_docinfo", true),
    flag("repeatDocinfo002", "repeat_docinfo002", true),
    flag("repeatDocinfo003", "repeat_docinfo003", true),
    flag("repeatDocinfo004", "repeat_docinfo004", true),
    flag("repeatDocinfo005", "repeat_docinfo005", true),
    flag("repeatRowheader", "repeat_rowheader", true),
    flag("repeatPtacRowheader", "repeat_ptac_rowheader", true),
    flag("repeatFooter", "repeat_footer", false),
    flag("repeatFooter002", "repeat_footer002", false),
    flag("repeatFooter003", "repeat_footer003", false),
    flag("repeatFooter004", "repeat_footer004", false),
    flag("repeatFooter005", "repeat_footer005", false),
    flag("repeatFooterLogo", "repeat_footer_logo", false),
    flag("repeatFooterPagenum", "repeat_footer_pagenum", false),
    flag("fillPageHeightAfterFooter", "fill_page_height_after_footer", true),
    flag(
        "insertDummyRowItemWhileFormatTable",
        "insert_dummy_row_item_while_format_table",
        true,
    ),
    flag("insertPtacDummyRowItems", "insert_ptac_dummy_row_items", true),
    flag(
        "insertDummyRowWhileFormatTable",
        "insert_dummy_row_while_format_table",
        false,
    ),
    flag(
        "insertFooterSpacerWhileFormatTable",
        "insert_footer_spacer_while_format_table",
        true,
    ),
    flag(
        "insertFooterSpacerWithDummyRowItemWhileFormatTable",
        "insert_footer_spacer_with_dummy_row_item_while_format_table",
        true,
    ),
    string("customDummyRowItemContent", "custom_dummy_row_item_content", ""),
    flag("debug", "debug_printform", false),
];

pub const PADDT_CONFIG_DESCRIPTORS: &[ConfigDescriptor] = &[
    flag("insertPaddtDummyRowItems", "insert_paddt_dummy_row_items", true),
    number("paddtMaxWordsPerSegment", "paddt_max_words_per_segment", 200.0),
    flag("repeatPaddtRowheader", "repeat_paddt_rowheader", true),
    flag("paddtDebug", "paddt_debug", false),
    flag("repeatPaddtDocinfo", "repeat_paddt_docinfo", true),
    flag("repeatPaddtDocinfo002", "repeat_paddt_docinfo002", true),
    flag("repeatPaddtDocinfo003", "repeat_paddt_docinfo003", true),
    flag("repeatPaddtDocinfo004", "repeat_paddt_docinfo004", true),
    flag("repeatPaddtDocinfo005", "repeat_paddt_docinfo005", true),
];

// ---------------------------------------------------------------------------
// Value parsers
// ---------------------------------------------------------------------------

const TRUE_TOKENS: &[&str] = &["y", "yes", "true", "1"];
const FALSE_TOKENS: &[&str] = &["n", "no", "false", "0"];

fn is_absent(value: &Value) -> bool {
    value.is_null() || value.as_str() == Some("")
}

pub fn parse_boolean_flag(value: &Value, fallback: bool) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(fallback),
        Value::String(s) => {
            let lowered = s.trim().to_ascii_lowercase();
            if TRUE_TOKENS.contains(&lowered.as_str()) {
                true
            } else if FALSE_TOKENS.contains(&lowered.as_str()) {
                false
            } else {
                fallback
            }
        }
        _ => fallback,
    }
}

pub fn parse_number(value: &Value, fallback: f64) -> f64 {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) if !s.is_empty() => {
            let t = s.trim();
            if t.is_empty() {
                Some(0.0)
            } else {
                t.parse::<f64>().ok()
            }
        }
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    };
    parsed.filter(|n| n.is_finite()).unwrap_or(fallback)
}

pub fn parse_string(value: &Value, fallback: &str) -> String {
    match value {
        Value::String(s) if !s.is_empty() => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => fallback.to_string(),
    }
}

/// A parsed option value.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValue {
    Bool(bool),
    Number(f64),
    Str(String),
}

impl ConfigValue {
    fn parse(desc: &ConfigDescriptor, value: &Value) -> Self {
        match desc.default {
            DefaultValue::Bool(d) => ConfigValue::Bool(parse_boolean_flag(value, d)),
            DefaultValue::Number(d) => ConfigValue::Number(parse_number(value, d)),
            DefaultValue::Str(d) => ConfigValue::Str(parse_string(value, d)),
        }
    }

    fn default_of(desc: &ConfigDescriptor) -> Self {
        match desc.default {
            DefaultValue::Bool(d) => ConfigValue::Bool(d),
            DefaultValue::Number(d) => ConfigValue::Number(d),
            DefaultValue::Str(d) => ConfigValue::Str(d.to_string()),
        }
    }
}

// ---------------------------------------------------------------------------
// Tiers
// ---------------------------------------------------------------------------

/// Caller-supplied configuration tiers.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigLayers {
    /// Legacy globals, keyed by snake_case legacy names.
    #[serde(default)]
    pub legacy: Map<String, Value>,
    /// Explicit caller overrides, keyed by camelCase names.
    #[serde(default)]
    pub overrides: Map<String, Value>,
}

impl ConfigLayers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_overrides(overrides: Map<String, Value>) -> Self {
        Self {
            legacy: Map::new(),
            overrides,
        }
    }

    /// Set one override, replacing any previous value.
    pub fn set_override(&mut self, key: &str, value: impl Into<Value>) {
        self.overrides.insert(key.to_string(), value.into());
    }

    pub fn set_legacy(&mut self, key: &str, value: impl Into<Value>) {
        self.legacy.insert(key.to_string(), value.into());
    }

    fn override_has(&self, key: &str) -> bool {
        self.overrides.get(key).map(|v| !is_absent(v)).unwrap_or(false)
    }
}

type Tier = HashMap<&'static str, ConfigValue>;

fn read_legacy(descriptors: &[ConfigDescriptor], legacy: &Map<String, Value>) -> Tier {
    descriptors
        .iter()
        .filter_map(|d| {
            let v = legacy.get(d.legacy_key)?;
            (!is_absent(v)).then(|| (d.key, ConfigValue::parse(d, v)))
        })
        .collect()
}

fn read_dataset(descriptors: &[ConfigDescriptor], dataset: &[(String, String)]) -> Tier {
    descriptors
        .iter()
        .filter_map(|d| {
            let (_, v) = dataset.iter().find(|(k, _)| k == d.key)?;
            (!v.is_empty()).then(|| (d.key, ConfigValue::parse(d, &Value::String(v.clone()))))
        })
        .collect()
}

fn read_overrides(descriptors: &[ConfigDescriptor], overrides: &Map<String, Value>) -> Tier {
    descriptors
        .iter()
        .filter_map(|d| overrides.get(d.key).map(|v| (d.key, ConfigValue::parse(d, v))))
        .collect()
}

/// Defaults overlaid with each tier in order.
struct Merged(Tier);

impl Merged {
    fn new(descriptors: &[ConfigDescriptor], tiers: &[&Tier]) -> Self {
        let mut merged: Tier = descriptors
            .iter()
            .map(|d| (d.key, ConfigValue::default_of(d)))
            .collect();
        for tier in tiers {
            for (k, v) in tier.iter() {
                merged.insert(k, v.clone());
            }
        }
        Merged(merged)
    }

    fn bool(&self, key: &str) -> bool {
        matches!(self.0.get(key), Some(ConfigValue::Bool(true)))
    }

    fn number(&self, key: &str) -> f64 {
        match self.0.get(key) {
            Some(ConfigValue::Number(n)) => *n,
            _ => 0.0,
        }
    }

    fn string(&self, key: &str) -> String {
        match self.0.get(key) {
            Some(ConfigValue::Str(s)) => s.clone(),
            _ => String::new(),
        }
    }

    fn flags<const N: usize>(&self, keys: [&str; N]) -> [bool; N] {
        keys.map(|k| self.bool(k))
    }
}

// ---------------------------------------------------------------------------
// Paper sizes
// ---------------------------------------------------------------------------

/// Named paper presets, dimensions in millimetres.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaperSize {
    A4,
    A5,
    Letter,
    Legal,
}

impl PaperSize {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_uppercase().as_str() {
            "A4" => Some(PaperSize::A4),
            "A5" => Some(PaperSize::A5),
            "LETTER" | "US_LETTER" | "USLETTER" => Some(PaperSize::Letter),
            "LEGAL" | "US_LEGAL" | "USLEGAL" => Some(PaperSize::Legal),
            _ => None,
        }
    }

    pub fn millimetres(self) -> (f64, f64) {
        match self {
            PaperSize::A4 => (210.0, 297.0),
            PaperSize::A5 => (148.0, 210.0),
            PaperSize::Letter => (215.9, 279.4),
            PaperSize::Legal => (215.9, 355.6),
        }
    }
}

fn mm_to_px(mm: f64, dpi: f64) -> f64 {
    if !dpi.is_finite() || dpi <= 0.0 {
        return 0.0;
    }
    (mm / 25.4 * dpi).round()
}

/// Pixel `(width, height)` for a named paper size, swapped for landscape.
pub fn resolve_paper_dimensions(paper_size: &str, orientation: &str, dpi: f64) -> Option<(f64, f64)> {
    let (w_mm, h_mm) = PaperSize::from_name(paper_size)?.millimetres();
    let width = mm_to_px(w_mm, dpi);
    let height = mm_to_px(h_mm, dpi);
    if width == 0.0 || height == 0.0 {
        return None;
    }
    if orientation.trim().eq_ignore_ascii_case("landscape") {
        Some((height, width))
    } else {
        Some((width, height))
    }
}

// ---------------------------------------------------------------------------
// Resolved configuration
// ---------------------------------------------------------------------------

/// Fully resolved options for one form. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrintFormConfig {
    pub papersize_width: f32,
    pub papersize_height: f32,
    pub paper_size: String,
    pub orientation: String,
    pub dpi: f32,
    pub n_up: usize,
    pub show_logical_page_number: bool,
    pub show_physical_page_number: bool,
    pub height_of_dummy_row_item: f32,
    pub repeat_header: bool,
    /// `repeatDocinfo`, `repeatDocinfo002` .. `repeatDocinfo005`.
    pub repeat_docinfo: [bool; 5],
    pub repeat_rowheader: bool,
    pub repeat_ptac_rowheader: bool,
    /// `repeatFooter`, `repeatFooter002` .. `repeatFooter005`.
    pub repeat_footer: [bool; 5],
    pub repeat_footer_logo: bool,
    pub repeat_footer_pagenum: bool,
    pub fill_page_height_after_footer: bool,
    pub insert_dummy_row_item_while_format_table: bool,
    pub insert_ptac_dummy_row_items: bool,
    pub insert_dummy_row_while_format_table: bool,
    pub insert_footer_spacer_while_format_table: bool,
    pub insert_footer_spacer_with_dummy_row_item_while_format_table: bool,
    pub custom_dummy_row_item_content: String,
    pub debug: bool,
    /// Extra classes for hard page-break dividers emitted for this form.
    pub div_page_break_before_class_append: String,
}

impl Default for PrintFormConfig {
    fn default() -> Self {
        Self::from_merged(&Merged::new(CONFIG_DESCRIPTORS, &[]))
    }
}

impl PrintFormConfig {
    fn from_merged(m: &Merged) -> Self {
        Self {
            papersize_width: m.number("papersizeWidth") as f32,
            papersize_height: m.number("papersizeHeight") as f32,
            paper_size: m.string("paperSize"),
            orientation: m.string("orientation"),
            dpi: m.number("dpi") as f32,
            n_up: m.number("nUp").max(1.0) as usize,
            show_logical_page_number: m.bool("showLogicalPageNumber"),
            show_physical_page_number: m.bool("showPhysicalPageNumber"),
            height_of_dummy_row_item: m.number("heightOfDummyRowItem") as f32,
            repeat_header: m.bool("repeatHeader"),
            repeat_docinfo: m.flags([
                "repeatDocinfo",
                "repeatDocinfo002",
                "repeatDocinfo003",
                "repeatDocinfo004",
                "repeatDocinfo005",
            ]),
            repeat_rowheader: m.bool("repeatRowheader"),
            repeat_ptac_rowheader: m.bool("repeatPtacRowheader"),
            repeat_footer: m.flags([
                "repeatFooter",
                "repeatFooter002",
                "repeatFooter003",
                "repeatFooter004",
                "repeatFooter005",
            ]),
            repeat_footer_logo: m.bool("repeatFooterLogo"),
            repeat_footer_pagenum: m.bool("repeatFooterPagenum"),
            fill_page_height_after_footer: m.bool("fillPageHeightAfterFooter"),
            insert_dummy_row_item_while_format_table: m.bool("insertDummyRowItemWhileFormatTable"),
            insert_ptac_dummy_row_items: m.bool("insertPtacDummyRowItems"),
            insert_dummy_row_while_format_table: m.bool("insertDummyRowWhileFormatTable"),
            insert_footer_spacer_while_format_table: m.bool("insertFooterSpacerWhileFormatTable"),
            insert_footer_spacer_with_dummy_row_item_while_format_table: m
                .bool("insertFooterSpacerWithDummyRowItemWhileFormatTable"),
            custom_dummy_row_item_content: m.string("customDummyRowItemContent"),
            debug: m.bool("debug"),
            div_page_break_before_class_append: String::new(),
        }
    }

    /// Resolve the configuration for the form rooted at `form`.
    pub fn resolve(doc: &Document, form: NodeId, layers: &ConfigLayers) -> Self {
        let dataset = doc.dataset(form);
        let legacy = read_legacy(CONFIG_DESCRIPTORS, &layers.legacy);
        let from_dataset = read_dataset(CONFIG_DESCRIPTORS, &dataset);
        let overrides = read_overrides(CONFIG_DESCRIPTORS, &layers.overrides);
        let merged = Merged::new(CONFIG_DESCRIPTORS, &[&legacy, &from_dataset, &overrides]);

        let mut config = Self::from_merged(&merged);

        if let Some(template) = doc.find_first(form, |d, n| {
            d.tag(n) == Some(&Tag::Template) && d.has_class(n, "custom-dummy-row-item-content")
        }) {
            config.custom_dummy_row_item_content = doc.inner_html(template).trim().to_string();
        }

        let n_up = merged.number("nUp");
        config.n_up = if !n_up.is_finite() || n_up < 1.0 {
            1
        } else {
            n_up.floor() as usize
        };

        let dpi = merged.number("dpi");
        config.dpi = if dpi.is_finite() && dpi > 0.0 { dpi as f32 } else { 96.0 };

        let manual_width = legacy.contains_key("papersizeWidth")
            || from_dataset.contains_key("papersizeWidth")
            || layers.override_has("papersizeWidth");
        let manual_height = legacy.contains_key("papersizeHeight")
            || from_dataset.contains_key("papersizeHeight")
            || layers.override_has("papersizeHeight");
        if !manual_width && !manual_height {
            if let Some((w, h)) =
                resolve_paper_dimensions(&config.paper_size, &config.orientation, config.dpi as f64)
            {
                config.papersize_width = w as f32;
                config.papersize_height = h as f32;
            }
        }
        config.papersize_width = config.papersize_width.max(0.0);
        config.papersize_height = config.papersize_height.max(0.0);

        config.div_page_break_before_class_append = match layers.overrides.get("divPageBreakBeforeClassAppend") {
            Some(Value::String(s)) => s.clone(),
            _ => dataset
                .iter()
                .find(|(k, _)| k == "divPageBreakBeforeClassAppend")
                .map(|(_, v)| v.trim().to_string())
                .unwrap_or_default(),
        };
        config
    }

    pub fn repeats_docinfo(&self, index: usize) -> bool {
        self.repeat_docinfo.get(index).copied().unwrap_or(false)
    }

    pub fn repeats_footer(&self, index: usize) -> bool {
        self.repeat_footer.get(index).copied().unwrap_or(false)
    }
}

/// Options for the trailing PADDT stream, merged independently.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaddtConfig {
    pub insert_paddt_dummy_row_items: bool,
    pub paddt_max_words_per_segment: usize,
    pub repeat_paddt_rowheader: bool,
    pub paddt_debug: bool,
    /// `repeatPaddtDocinfo`, `repeatPaddtDocinfo002` .. `repeatPaddtDocinfo005`.
    pub repeat_paddt_docinfo: [bool; 5],
}

const DEFAULT_PADDT_MAX_WORDS: usize = 200;

impl Default for PaddtConfig {
    fn default() -> Self {
        Self::from_merged(&Merged::new(PADDT_CONFIG_DESCRIPTORS, &[]))
    }
}

impl PaddtConfig {
    fn from_merged(m: &Merged) -> Self {
        let max_words = m.number("paddtMaxWordsPerSegment");
        Self {
            insert_paddt_dummy_row_items: m.bool("insertPaddtDummyRowItems"),
            paddt_max_words_per_segment: if max_words.is_finite() && max_words > 0.0 {
                // Fractional limits still allow at least one word.
                (max_words.floor() as usize).max(1)
            } else {
                DEFAULT_PADDT_MAX_WORDS
            },
            repeat_paddt_rowheader: m.bool("repeatPaddtRowheader"),
            paddt_debug: m.bool("paddtDebug"),
            repeat_paddt_docinfo: m.flags([
                "repeatPaddtDocinfo",
                "repeatPaddtDocinfo002",
                "repeatPaddtDocinfo003",
                "repeatPaddtDocinfo004",
                "repeatPaddtDocinfo005",
            ]),
        }
    }

    pub fn resolve(doc: &Document, form: NodeId, layers: &ConfigLayers) -> Self {
        let dataset = doc.dataset(form);
        let legacy = read_legacy(PADDT_CONFIG_DESCRIPTORS, &layers.legacy);
        let from_dataset = read_dataset(PADDT_CONFIG_DESCRIPTORS, &dataset);
        let overrides = read_overrides(PADDT_CONFIG_DESCRIPTORS, &layers.overrides);
        Self::from_merged(&Merged::new(
            PADDT_CONFIG_DESCRIPTORS,
            &[&legacy, &from_dataset, &overrides],
        ))
    }

    pub fn repeats_docinfo(&self, index: usize) -> bool {
        self.repeat_paddt_docinfo.get(index).copied().unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn form(html: &str) -> (Document, NodeId) {
        let doc = Document::parse(html);
        let form = doc.first_by_class(doc.root(), "printform").unwrap();
        (doc, form)
    }

    #[test]
    fn defaults_match_descriptors() {
        let c = PrintFormConfig::default();
        assert_eq!(c.papersize_width, 750.0);
        assert_eq!(c.papersize_height, 1050.0);
        assert_eq!(c.n_up, 1);
        assert_eq!(c.height_of_dummy_row_item, 18.0);
        assert!(c.repeat_header);
        assert_eq!(c.repeat_docinfo, [true; 5]);
        assert_eq!(c.repeat_footer, [false; 5]);
        assert!(c.fill_page_height_after_footer);
        assert!(!c.insert_dummy_row_while_format_table);
        let p = PaddtConfig::default();
        assert_eq!(p.paddt_max_words_per_segment, 200);
        assert!(p.insert_paddt_dummy_row_items);
    }

    #[test]
    fn boolean_tokens() {
        assert!(parse_boolean_flag(&json!(" YES "), false));
        assert!(!parse_boolean_flag(&json!("n"), true));
        assert!(parse_boolean_flag(&json!(2), false));
        assert!(!parse_boolean_flag(&json!(0), true));
        assert!(parse_boolean_flag(&json!("maybe"), true));
        assert!(!parse_boolean_flag(&json!(null), false));
    }

    #[test]
    fn number_parsing_falls_back() {
        assert_eq!(parse_number(&json!("12.5"), 1.0), 12.5);
        assert_eq!(parse_number(&json!("abc"), 7.0), 7.0);
        assert_eq!(parse_number(&json!(""), 7.0), 7.0);
        assert_eq!(parse_number(&json!(3), 7.0), 3.0);
    }

    #[test]
    fn tiers_apply_in_priority_order() {
        let (doc, f) = form(
            r#"<div class="printform" data-papersize-height="900" data-repeat-header="n"></div>"#,
        );
        let mut layers = ConfigLayers::new();
        layers.set_legacy("papersize_height", 800);
        layers.set_legacy("papersize_width", 600);
        layers.set_override("repeatHeader", true);
        let c = PrintFormConfig::resolve(&doc, f, &layers);
        assert_eq!(c.papersize_height, 900.0);
        assert_eq!(c.papersize_width, 600.0);
        assert!(c.repeat_header);
    }

    #[test]
    fn empty_dataset_values_are_absent() {
        let (doc, f) = form(r#"<div class="printform" data-papersize-height=""></div>"#);
        let c = PrintFormConfig::resolve(&doc, f, &ConfigLayers::new());
        assert_eq!(c.papersize_height, 1050.0);
    }

    #[test]
    fn n_up_and_dpi_are_coerced() {
        let (doc, f) = form(r#"<div class="printform" data-n-up="2.7" data-dpi="-5"></div>"#);
        let c = PrintFormConfig::resolve(&doc, f, &ConfigLayers::new());
        assert_eq!(c.n_up, 2);
        assert_eq!(c.dpi, 96.0);

        let (doc, f) = form(r#"<div class="printform" data-n-up="0"></div>"#);
        assert_eq!(PrintFormConfig::resolve(&doc, f, &ConfigLayers::new()).n_up, 1);
    }

    #[test]
    fn named_paper_size_when_no_manual_dimensions() {
        let (doc, f) = form(r#"<div class="printform" data-paper-size="a4"></div>"#);
        let c = PrintFormConfig::resolve(&doc, f, &ConfigLayers::new());
        assert_eq!(c.papersize_width, 794.0);
        assert_eq!(c.papersize_height, 1123.0);

        let (doc, f) = form(
            r#"<div class="printform" data-paper-size="US_LEGAL" data-orientation="landscape"></div>"#,
        );
        let c = PrintFormConfig::resolve(&doc, f, &ConfigLayers::new());
        assert_eq!(c.papersize_width, 1344.0);
        assert_eq!(c.papersize_height, 816.0);
    }

    #[test]
    fn manual_dimension_beats_paper_size() {
        let (doc, f) = form(
            r#"<div class="printform" data-paper-size="A4" data-papersize-height="500"></div>"#,
        );
        let c = PrintFormConfig::resolve(&doc, f, &ConfigLayers::new());
        assert_eq!(c.papersize_width, 750.0);
        assert_eq!(c.papersize_height, 500.0);
    }

    #[test]
    fn template_overrides_custom_dummy_content() {
        let (doc, f) = form(
            r#"<div class="printform"><template class="custom-dummy-row-item-content">
                <tr><td>x</td></tr>
            </template></div>"#,
        );
        let mut layers = ConfigLayers::new();
        layers.set_override("customDummyRowItemContent", "<tr><td>y</td></tr>");
        let c = PrintFormConfig::resolve(&doc, f, &layers);
        assert_eq!(c.custom_dummy_row_item_content, "<tr><td>x</td></tr>");
    }

    #[test]
    fn divider_class_append_from_dataset() {
        let (doc, f) = form(
            r#"<div class="printform" data-div-page-break-before-class-append="  extra more "></div>"#,
        );
        let c = PrintFormConfig::resolve(&doc, f, &ConfigLayers::new());
        assert_eq!(c.div_page_break_before_class_append, "extra more");
    }

    #[test]
    fn paddt_namespace_is_independent() {
        let (doc, f) = form(
            r#"<div class="printform" data-paddt-max-words-per-segment="-1" data-repeat-paddt-docinfo003="n"></div>"#,
        );
        let p = PaddtConfig::resolve(&doc, f, &ConfigLayers::new());
        assert_eq!(p.paddt_max_words_per_segment, 200);
        assert_eq!(p.repeat_paddt_docinfo, [true, true, false, true, true]);
    }
}
