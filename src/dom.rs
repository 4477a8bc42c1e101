//! Arena DOM – a small mutable document tree for print-form markup.
//!
//! Nodes are addressed by [`NodeId`] and live in a flat arena owned by
//! [`Document`]. Detaching a node never frees it, so ids held by the
//! pagination engine (source rows, section elements) stay valid after the
//! node leaves the tree.
//!
//! The parser accepts the controlled template subset:
//! - elements with quoted or unquoted attributes
//! - void elements (`br`, `img`, `hr`, `input`, ...)
//! - raw text inside `script` / `style`
//! - comments, doctype and processing instructions are skipped
//! - named and numeric character references

// ---------------------------------------------------------------------------
// DOM types
// ---------------------------------------------------------------------------

/// Index of a node inside its [`Document`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// The tag name of an element.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Tag {
    Div,
    P,
    H1,
    H2,
    H3,
    Ul,
    Ol,
    Li,
    Table,
    Thead,
    Tbody,
    Tfoot,
    Tr,
    Td,
    Th,
    Span,
    B,
    Strong,
    I,
    Em,
    U,
    Br,
    Img,
    Template,
    Body,
    Html,
    Head,
    /// Any other element, kept with its lowercased name.
    Unknown(String),
}

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

const INLINE_ELEMENTS: &[&str] = &[
    "a", "abbr", "code", "font", "label", "small", "sub", "sup", "s", "strike", "mark", "q",
];

impl Tag {
    pub fn from_name(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "div" => Tag::Div,
            "p" => Tag::P,
            "h1" => Tag::H1,
            "h2" => Tag::H2,
            "h3" => Tag::H3,
            "ul" => Tag::Ul,
            "ol" => Tag::Ol,
            "li" => Tag::Li,
            "table" => Tag::Table,
            "thead" => Tag::Thead,
            "tbody" => Tag::Tbody,
            "tfoot" => Tag::Tfoot,
            "tr" => Tag::Tr,
            "td" => Tag::Td,
            "th" => Tag::Th,
            "span" => Tag::Span,
            "b" => Tag::B,
            "strong" => Tag::Strong,
            "i" => Tag::I,
            "em" => Tag::Em,
            "u" => Tag::U,
            "br" => Tag::Br,
            "img" => Tag::Img,
            "template" => Tag::Template,
            "body" => Tag::Body,
            "html" => Tag::Html,
            "head" => Tag::Head,
            other => Tag::Unknown(other.to_string()),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Tag::Div => "div",
            Tag::P => "p",
            Tag::H1 => "h1",
            Tag::H2 => "h2",
            Tag::H3 => "h3",
            Tag::Ul => "ul",
            Tag::Ol => "ol",
            Tag::Li => "li",
            Tag::Table => "table",
            Tag::Thead => "thead",
            Tag::Tbody => "tbody",
            Tag::Tfoot => "tfoot",
            Tag::Tr => "tr",
            Tag::Td => "td",
            Tag::Th => "th",
            Tag::Span => "span",
            Tag::B => "b",
            Tag::Strong => "strong",
            Tag::I => "i",
            Tag::Em => "em",
            Tag::U => "u",
            Tag::Br => "br",
            Tag::Img => "img",
            Tag::Template => "template",
            Tag::Body => "body",
            Tag::Html => "html",
            Tag::Head => "head",
            Tag::Unknown(name) => name,
        }
    }

    pub fn is_void(&self) -> bool {
        match self {
            Tag::Br | Tag::Img => true,
            Tag::Unknown(name) => VOID_ELEMENTS.contains(&name.as_str()),
            _ => false,
        }
    }

    pub fn is_inline(&self) -> bool {
        match self {
            Tag::Span | Tag::B | Tag::Strong | Tag::I | Tag::Em | Tag::U | Tag::Br => true,
            Tag::Unknown(name) => INLINE_ELEMENTS.contains(&name.as_str()),
            _ => false,
        }
    }

    fn is_raw_text(&self) -> bool {
        matches!(self, Tag::Unknown(name) if name == "script" || name == "style")
    }
}

/// Payload of an arena node.
#[derive(Debug, Clone)]
pub enum NodeData {
    Document,
    Element(ElementData),
    Text(String),
}

/// An element: tag plus attributes in source order.
#[derive(Debug, Clone)]
pub struct ElementData {
    pub tag: Tag,
    pub attributes: Vec<(String, String)>,
}

#[derive(Debug, Clone)]
struct Node {
    data: NodeData,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// A mutable HTML document.
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
    root: NodeId,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// An empty document holding only its root node.
    pub fn new() -> Self {
        Self {
            nodes: vec![Node {
                data: NodeData::Document,
                parent: None,
                children: Vec::new(),
            }],
            root: NodeId(0),
        }
    }

    /// Parse an HTML string into a new document.
    pub fn parse(html: &str) -> Self {
        let mut doc = Self::new();
        let root = doc.root;
        Parser::new(html).parse_into(&mut doc, root, &mut Vec::new());
        doc
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// The `<body>` element, or the document root when there is none.
    pub fn body(&self) -> NodeId {
        self.find_first(self.root, |doc, id| doc.tag(id) == Some(&Tag::Body))
            .unwrap_or(self.root)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    // -----------------------------------------------------------------------
    // Node access
    // -----------------------------------------------------------------------

    pub fn data(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.0].data
    }

    pub fn element(&self, id: NodeId) -> Option<&ElementData> {
        match &self.nodes[id.0].data {
            NodeData::Element(e) => Some(e),
            _ => None,
        }
    }

    fn element_mut(&mut self, id: NodeId) -> Option<&mut ElementData> {
        match &mut self.nodes[id.0].data {
            NodeData::Element(e) => Some(e),
            _ => None,
        }
    }

    pub fn tag(&self, id: NodeId) -> Option<&Tag> {
        self.element(id).map(|e| &e.tag)
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        self.element(id).is_some()
    }

    pub fn text(&self, id: NodeId) -> Option<&str> {
        match &self.nodes[id.0].data {
            NodeData::Text(t) => Some(t.as_str()),
            _ => None,
        }
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    pub fn element_children(&self, id: NodeId) -> Vec<NodeId> {
        self.children(id)
            .iter()
            .copied()
            .filter(|&c| self.is_element(c))
            .collect()
    }

    /// Ancestors from the parent up to the root.
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut cur = self.parent(id);
        while let Some(p) = cur {
            out.push(p);
            cur = self.parent(p);
        }
        out
    }

    /// True when `node` is `ancestor` or lies below it.
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        node == ancestor || self.ancestors(node).contains(&ancestor)
    }

    fn is_last_element_child(&self, id: NodeId) -> bool {
        match self.parent(id) {
            Some(p) => self.element_children(p).last() == Some(&id),
            None => false,
        }
    }

    // -----------------------------------------------------------------------
    // Tree editing
    // -----------------------------------------------------------------------

    fn push_node(&mut self, data: NodeData) -> NodeId {
        self.nodes.push(Node {
            data,
            parent: None,
            children: Vec::new(),
        });
        NodeId(self.nodes.len() - 1)
    }

    /// Create a detached element.
    pub fn create_element(&mut self, name: &str) -> NodeId {
        self.push_node(NodeData::Element(ElementData {
            tag: Tag::from_name(name),
            attributes: Vec::new(),
        }))
    }

    /// Create a detached text node.
    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.push_node(NodeData::Text(text.to_string()))
    }

    /// Remove `id` from its parent. The node stays usable.
    pub fn detach(&mut self, id: NodeId) {
        if let Some(p) = self.nodes[id.0].parent.take() {
            self.nodes[p.0].children.retain(|&c| c != id);
        }
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.detach(child);
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
    }

    /// Insert `child` into `parent` before `reference`; appends when the
    /// reference is `None` or not a child of `parent`.
    pub fn insert_before(&mut self, parent: NodeId, child: NodeId, reference: Option<NodeId>) {
        self.detach(child);
        let pos = reference.and_then(|r| self.nodes[parent.0].children.iter().position(|&c| c == r));
        self.nodes[child.0].parent = Some(parent);
        match pos {
            Some(i) => self.nodes[parent.0].children.insert(i, child),
            None => self.nodes[parent.0].children.push(child),
        }
    }

    /// Insert `child` right after `reference`. No-op when `reference` is detached.
    pub fn insert_after(&mut self, reference: NodeId, child: NodeId) {
        let Some(parent) = self.parent(reference) else {
            return;
        };
        self.detach(child);
        let siblings = &self.nodes[parent.0].children;
        let pos = siblings.iter().position(|&c| c == reference).map_or(siblings.len(), |i| i + 1);
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.insert(pos, child);
    }

    /// Deep-copy a subtree; the copy is detached.
    pub fn deep_clone(&mut self, id: NodeId) -> NodeId {
        let data = self.nodes[id.0].data.clone();
        let copy = self.push_node(data);
        let children = self.nodes[id.0].children.clone();
        for child in children {
            let c = self.deep_clone(child);
            self.nodes[c.0].parent = Some(copy);
            self.nodes[copy.0].children.push(c);
        }
        copy
    }

    fn clear_children(&mut self, id: NodeId) {
        let children = std::mem::take(&mut self.nodes[id.0].children);
        for c in children {
            self.nodes[c.0].parent = None;
        }
    }

    // -----------------------------------------------------------------------
    // Attributes, classes, inline style
    // -----------------------------------------------------------------------

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id)?
            .attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn has_attr(&self, id: NodeId, name: &str) -> bool {
        self.attr(id, name).is_some()
    }

    pub fn set_attr(&mut self, id: NodeId, name: &str, value: &str) {
        if let Some(e) = self.element_mut(id) {
            match e.attributes.iter_mut().find(|(k, _)| k == name) {
                Some(slot) => slot.1 = value.to_string(),
                None => e.attributes.push((name.to_string(), value.to_string())),
            }
        }
    }

    pub fn remove_attr(&mut self, id: NodeId, name: &str) {
        if let Some(e) = self.element_mut(id) {
            e.attributes.retain(|(k, _)| k != name);
        }
    }

    pub fn classes(&self, id: NodeId) -> Vec<&str> {
        self.attr(id, "class")
            .map(|c| c.split_whitespace().collect())
            .unwrap_or_default()
    }

    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        self.classes(id).contains(&class)
    }

    pub fn add_class(&mut self, id: NodeId, class: &str) {
        if self.has_class(id, class) || !self.is_element(id) {
            return;
        }
        let mut list: Vec<String> = self.classes(id).into_iter().map(str::to_string).collect();
        list.push(class.to_string());
        self.set_attr(id, "class", &list.join(" "));
    }

    pub fn remove_class(&mut self, id: NodeId, class: &str) {
        if !self.has_class(id, class) {
            return;
        }
        let list: Vec<String> = self
            .classes(id)
            .into_iter()
            .filter(|c| *c != class)
            .map(str::to_string)
            .collect();
        self.set_attr(id, "class", &list.join(" "));
    }

    /// Value of one declaration in the inline `style` attribute.
    pub fn style_property(&self, id: NodeId, prop: &str) -> Option<String> {
        parse_declarations(self.attr(id, "style")?)
            .into_iter()
            .find(|(k, _)| k == prop)
            .map(|(_, v)| v)
    }

    pub fn set_style_property(&mut self, id: NodeId, prop: &str, value: &str) {
        let mut decls = self
            .attr(id, "style")
            .map(parse_declarations)
            .unwrap_or_default();
        match decls.iter_mut().find(|(k, _)| k == prop) {
            Some(slot) => slot.1 = value.to_string(),
            None => decls.push((prop.to_string(), value.to_string())),
        }
        self.set_attr(id, "style", &format_declarations(&decls));
    }

    pub fn remove_style_property(&mut self, id: NodeId, prop: &str) {
        let Some(style) = self.attr(id, "style") else {
            return;
        };
        let mut decls = parse_declarations(style);
        decls.retain(|(k, _)| k != prop);
        if decls.is_empty() {
            self.remove_attr(id, "style");
        } else {
            self.set_attr(id, "style", &format_declarations(&decls));
        }
    }

    /// `data-*` attributes as camelCase keys, in source order.
    pub fn dataset(&self, id: NodeId) -> Vec<(String, String)> {
        self.element(id)
            .map(|e| {
                e.attributes
                    .iter()
                    .filter_map(|(k, v)| {
                        k.strip_prefix("data-")
                            .map(|rest| (kebab_to_camel(rest), v.clone()))
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Descendants of `id` in document order, excluding `id` itself.
    ///
    /// Template content is inert: the walk never enters a `<template>`.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(n) = stack.pop() {
            out.push(n);
            if self.tag(n) == Some(&Tag::Template) {
                continue;
            }
            stack.extend(self.children(n).iter().rev().copied());
        }
        out
    }

    pub fn find_first<F>(&self, id: NodeId, pred: F) -> Option<NodeId>
    where
        F: Fn(&Document, NodeId) -> bool,
    {
        self.descendants(id)
            .into_iter()
            .find(|&n| self.is_element(n) && pred(self, n))
    }

    pub fn find_all<F>(&self, id: NodeId, pred: F) -> Vec<NodeId>
    where
        F: Fn(&Document, NodeId) -> bool,
    {
        self.descendants(id)
            .into_iter()
            .filter(|&n| self.is_element(n) && pred(self, n))
            .collect()
    }

    pub fn first_by_class(&self, id: NodeId, class: &str) -> Option<NodeId> {
        self.find_first(id, |doc, n| doc.has_class(n, class))
    }

    pub fn all_by_class(&self, id: NodeId, class: &str) -> Vec<NodeId> {
        self.find_all(id, |doc, n| doc.has_class(n, class))
    }

    /// First descendant carrying any of the given attributes.
    pub fn first_with_any_attr(&self, id: NodeId, names: &[&str]) -> Option<NodeId> {
        self.find_first(id, |doc, n| names.iter().any(|a| doc.has_attr(n, a)))
    }

    pub fn all_with_attr(&self, id: NodeId, name: &str) -> Vec<NodeId> {
        self.find_all(id, |doc, n| doc.has_attr(n, name))
    }

    /// First `td > div`, else the first `td`.
    pub fn cell_content_wrapper(&self, id: NodeId) -> Option<NodeId> {
        self.find_first(id, |doc, n| {
            doc.tag(n) == Some(&Tag::Div)
                && doc.parent(n).and_then(|p| doc.tag(p)) == Some(&Tag::Td)
        })
        .or_else(|| self.find_first(id, |doc, n| doc.tag(n) == Some(&Tag::Td)))
    }

    /// First `td:last-child`, else the first `td`.
    pub fn last_cell(&self, id: NodeId) -> Option<NodeId> {
        self.find_first(id, |doc, n| {
            doc.tag(n) == Some(&Tag::Td) && doc.is_last_element_child(n)
        })
        .or_else(|| self.find_first(id, |doc, n| doc.tag(n) == Some(&Tag::Td)))
    }

    pub fn text_content(&self, id: NodeId) -> String {
        if let Some(t) = self.text(id) {
            return t.to_string();
        }
        self.descendants(id)
            .into_iter()
            .filter_map(|n| self.text(n))
            .collect()
    }

    /// Replace all children with a single text node.
    pub fn set_text_content(&mut self, id: NodeId, text: &str) {
        self.clear_children(id);
        if !text.is_empty() {
            let t = self.create_text(text);
            self.append_child(id, t);
        }
    }

    // -----------------------------------------------------------------------
    // Serialization
    // -----------------------------------------------------------------------

    pub fn inner_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        let raw = self.tag(id).map(Tag::is_raw_text).unwrap_or(false);
        for &c in self.children(id) {
            self.write_node(c, raw, &mut out);
        }
        out
    }

    pub fn outer_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.write_node(id, false, &mut out);
        out
    }

    /// Serialize the whole document.
    pub fn to_html(&self) -> String {
        self.inner_html(self.root)
    }

    /// Replace the children of `id` with the parsed fragment.
    pub fn set_inner_html(&mut self, id: NodeId, html: &str) {
        self.clear_children(id);
        Parser::new(html).parse_into(self, id, &mut Vec::new());
    }

    fn write_node(&self, id: NodeId, raw: bool, out: &mut String) {
        match &self.nodes[id.0].data {
            NodeData::Document => {
                for &c in self.children(id) {
                    self.write_node(c, false, out);
                }
            }
            NodeData::Text(t) => {
                if raw {
                    out.push_str(t);
                } else {
                    escape_text(t, out);
                }
            }
            NodeData::Element(e) => {
                self.write_open_tag(id, out);
                if e.tag.is_void() {
                    return;
                }
                let raw_children = e.tag.is_raw_text();
                for &c in self.children(id) {
                    self.write_node(c, raw_children, out);
                }
                self.write_close_tag(id, out);
            }
        }
    }

    pub(crate) fn write_open_tag(&self, id: NodeId, out: &mut String) {
        let Some(e) = self.element(id) else {
            return;
        };
        out.push('<');
        out.push_str(e.tag.name());
        for (k, v) in &e.attributes {
            out.push(' ');
            out.push_str(k);
            out.push_str("=\"");
            escape_attr(v, out);
            out.push('"');
        }
        out.push('>');
    }

    pub(crate) fn write_close_tag(&self, id: NodeId, out: &mut String) {
        if let Some(e) = self.element(id) {
            if !e.tag.is_void() {
                out.push_str("</");
                out.push_str(e.tag.name());
                out.push('>');
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Inline style declarations
// ---------------------------------------------------------------------------

/// Split a `style` attribute into `(property, value)` pairs.
pub fn parse_declarations(style: &str) -> Vec<(String, String)> {
    style
        .split(';')
        .filter_map(|decl| {
            let mut parts = decl.splitn(2, ':');
            let prop = parts.next()?.trim();
            let val = parts.next()?.trim();
            if prop.is_empty() {
                None
            } else {
                Some((prop.to_ascii_lowercase(), val.to_string()))
            }
        })
        .collect()
}

fn format_declarations(decls: &[(String, String)]) -> String {
    decls
        .iter()
        .map(|(k, v)| format!("{k}: {v};"))
        .collect::<Vec<_>>()
        .join(" ")
}

/// `page-number` → `pageNumber`.
pub fn kebab_to_camel(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut upper = false;
    for c in s.chars() {
        if c == '-' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

pub(crate) fn escape_text(s: &str, out: &mut String) {
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\u{00A0}' => out.push_str("&nbsp;"),
            _ => out.push(c),
        }
    }
}

fn escape_attr(s: &str, out: &mut String) {
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\u{00A0}' => out.push_str("&nbsp;"),
            _ => out.push(c),
        }
    }
}

// ---------------------------------------------------------------------------
// Parser – recursive descent over HTML
// ---------------------------------------------------------------------------

struct Parser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    /// Parse nodes into `parent` until EOF or the closing tag of an open element.
    /// `open` holds the names of the elements being parsed, innermost last.
    fn parse_into(&mut self, doc: &mut Document, parent: NodeId, open: &mut Vec<String>) {
        while !self.eof() {
            if self.starts_with("</") {
                let save = self.pos;
                self.advance(2);
                let name = self.parse_name().to_ascii_lowercase();
                self.skip_past('>');
                if open.last() == Some(&name) {
                    return;
                }
                if open.iter().any(|n| *n == name) {
                    // Closes an ancestor: leave it for the ancestor to consume.
                    self.pos = save;
                    return;
                }
                continue;
            }
            if self.starts_with("<!--") {
                self.advance(4);
                self.skip_until("-->");
                continue;
            }
            if self.starts_with("<!") || self.starts_with("<?") {
                self.skip_past('>');
                continue;
            }
            if self.at_tag_open() {
                self.parse_element(doc, parent, open);
            } else {
                let text = self.parse_text();
                let node = doc.create_text(&text);
                doc.append_child(parent, node);
            }
        }
    }

    fn at_tag_open(&self) -> bool {
        let mut chars = self.input[self.pos..].chars();
        chars.next() == Some('<') && chars.next().map(|c| c.is_ascii_alphabetic()).unwrap_or(false)
    }

    fn parse_text(&mut self) -> String {
        let start = self.pos;
        // Always consume at least one char so a stray '<' cannot stall the parser.
        self.advance(1);
        while !self.eof() && !self.starts_with("<") {
            self.advance(1);
        }
        decode_entities(&self.input[start..self.pos])
    }

    fn parse_element(&mut self, doc: &mut Document, parent: NodeId, open: &mut Vec<String>) {
        self.advance(1); // '<'
        let name = self.parse_name().to_ascii_lowercase();
        let node = doc.create_element(&name);
        doc.append_child(parent, node);

        loop {
            self.skip_whitespace();
            if self.eof() || self.starts_with(">") || self.starts_with("/>") {
                break;
            }
            let (key, value) = self.parse_attribute();
            if key.is_empty() {
                self.advance(1);
                continue;
            }
            if !doc.has_attr(node, &key) {
                doc.set_attr(node, &key, &value);
            }
        }

        let tag = Tag::from_name(&name);
        if self.starts_with("/>") {
            self.advance(2);
            return;
        }
        if self.starts_with(">") {
            self.advance(1);
        }
        if tag.is_void() {
            return;
        }

        if tag.is_raw_text() {
            let close = format!("</{name}");
            let start = self.pos;
            while !self.eof() && !self.starts_with_ignore_case(&close) {
                self.advance(1);
            }
            let text = self.input[start..self.pos].to_string();
            if !text.is_empty() {
                let t = doc.create_text(&text);
                doc.append_child(node, t);
            }
            self.skip_past('>');
            return;
        }

        open.push(name);
        self.parse_into(doc, node, open);
        open.pop();
    }

    fn parse_name(&mut self) -> String {
        let start = self.pos;
        while !self.eof() {
            let c = self.current_char();
            if c.is_alphanumeric() || c == '-' || c == '_' || c == ':' || c == '.' {
                self.advance(1);
            } else {
                break;
            }
        }
        self.input[start..self.pos].to_string()
    }

    fn parse_attribute(&mut self) -> (String, String) {
        let key = self.parse_name().to_ascii_lowercase();
        self.skip_whitespace();
        if !self.starts_with("=") {
            return (key, String::new());
        }
        self.advance(1);
        self.skip_whitespace();
        let value = self.parse_attr_value();
        (key, value)
    }

    fn parse_attr_value(&mut self) -> String {
        for quote in ["\"", "'"] {
            if self.starts_with(quote) {
                self.advance(1);
                let start = self.pos;
                while !self.eof() && !self.starts_with(quote) {
                    self.advance(1);
                }
                let val = decode_entities(&self.input[start..self.pos]);
                if !self.eof() {
                    self.advance(1);
                }
                return val;
            }
        }
        let start = self.pos;
        while !self.eof() {
            let c = self.current_char();
            if c.is_whitespace() || c == '>' {
                break;
            }
            if c == '/' && self.input[self.pos..].starts_with("/>") {
                break;
            }
            self.advance(1);
        }
        decode_entities(&self.input[start..self.pos])
    }

    fn skip_whitespace(&mut self) {
        while !self.eof() && self.current_char().is_whitespace() {
            self.advance(1);
        }
    }

    fn skip_past(&mut self, c: char) {
        while !self.eof() && self.current_char() != c {
            self.advance(1);
        }
        if !self.eof() {
            self.advance(1);
        }
    }

    fn skip_until(&mut self, marker: &str) {
        while !self.eof() && !self.starts_with(marker) {
            self.advance(1);
        }
        if !self.eof() {
            self.pos += marker.len();
        }
    }

    fn starts_with(&self, s: &str) -> bool {
        self.input[self.pos..].starts_with(s)
    }

    fn starts_with_ignore_case(&self, s: &str) -> bool {
        self.input
            .get(self.pos..self.pos + s.len())
            .map(|head| head.eq_ignore_ascii_case(s))
            .unwrap_or(false)
    }

    fn eof(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn current_char(&self) -> char {
        self.input[self.pos..].chars().next().unwrap_or('\0')
    }

    fn advance(&mut self, n: usize) {
        for _ in 0..n {
            if let Some(c) = self.input[self.pos..].chars().next() {
                self.pos += c.len_utf8();
            }
        }
    }
}

fn decode_entities(s: &str) -> String {
    if !s.contains('&') {
        return s.to_string();
    }
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        let decoded = rest
            .find(';')
            .filter(|&semi| semi <= 10)
            .and_then(|semi| decode_entity(&rest[1..semi]).map(|c| (c, semi)));
        match decoded {
            Some((c, semi)) => {
                out.push(c);
                rest = &rest[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_entity(name: &str) -> Option<char> {
    match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some('\u{00A0}'),
        _ => {
            let num = name.strip_prefix('#')?;
            let code = match num.strip_prefix(|c| c == 'x' || c == 'X') {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => num.parse::<u32>().ok()?,
            };
            char::from_u32(code)
        }
    }
}
