//! Paragraph splitter – breaks a long rich-text paragraph into word-bounded
//! HTML chunks without losing inline markup.
//!
//! Offsets are byte positions into the paragraph's concatenated text. Every
//! node gets a `[start, end)` span; a chunk re-serializes exactly the nodes
//! whose span intersects its range, re-opening elements that straddle the
//! boundary.

use std::collections::HashMap;

use crate::dom::{escape_text, Document, NodeId, Tag};

/// Split `paragraph` into chunks of at most `max_words` words.
///
/// A paragraph that already fits yields its own outer HTML once. A limit of 0
/// is treated as 1.
pub fn split_paragraph(doc: &Document, paragraph: NodeId, max_words: usize) -> ChunkIter<'_> {
    let max_words = max_words.max(1);
    let mut spans = HashMap::new();
    let mut text = String::new();
    collect_spans(doc, paragraph, &mut text, &mut spans);

    let word_starts = word_starts(&text);
    let ranges = if word_starts.len() <= max_words {
        Vec::new()
    } else {
        let chunk_starts: Vec<usize> = word_starts
            .iter()
            .step_by(max_words)
            .enumerate()
            .map(|(i, &s)| if i == 0 { 0 } else { s })
            .collect();
        chunk_starts
            .iter()
            .enumerate()
            .map(|(i, &start)| {
                let end = chunk_starts.get(i + 1).copied().unwrap_or(text.len());
                (start, end)
            })
            .collect()
    };

    ChunkIter {
        doc,
        paragraph,
        spans,
        ranges,
        text_len: text.len(),
        next: 0,
        whole_pending: word_starts.len() <= max_words,
    }
}

/// Lazy sequence of HTML chunk strings. Finite and not restartable.
pub struct ChunkIter<'a> {
    doc: &'a Document,
    paragraph: NodeId,
    spans: HashMap<NodeId, (usize, usize)>,
    ranges: Vec<(usize, usize)>,
    text_len: usize,
    next: usize,
    whole_pending: bool,
}

impl Iterator for ChunkIter<'_> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        if self.whole_pending {
            self.whole_pending = false;
            return Some(self.doc.outer_html(self.paragraph));
        }
        let (start, end) = *self.ranges.get(self.next)?;
        self.next += 1;
        let last = end == self.text_len;
        let mut out = String::new();
        self.doc.write_open_tag(self.paragraph, &mut out);
        for &c in self.doc.children(self.paragraph) {
            self.write_range(c, start, end, last, &mut out);
        }
        self.doc.write_close_tag(self.paragraph, &mut out);
        Some(out)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = if self.whole_pending {
            1
        } else {
            self.ranges.len() - self.next
        };
        (n, Some(n))
    }
}

impl ChunkIter<'_> {
    fn write_range(&self, id: NodeId, start: usize, end: usize, last: bool, out: &mut String) {
        let Some(&(s, e)) = self.spans.get(&id) else {
            return;
        };
        if let Some(t) = self.doc.text(id) {
            let from = start.max(s);
            let to = end.min(e);
            if from < to {
                escape_text(&t[from - s..to - s], out);
            }
            return;
        }
        let included = if s == e {
            // Empty elements (<img>, <span></span>) belong to the chunk holding their position.
            (start <= s && s < end) || (last && s == end)
        } else {
            s < end && e > start
        };
        if !included {
            return;
        }
        self.doc.write_open_tag(id, out);
        for &c in self.doc.children(id) {
            self.write_range(c, start, end, last, out);
        }
        self.doc.write_close_tag(id, out);
    }
}

fn collect_spans(
    doc: &Document,
    id: NodeId,
    text: &mut String,
    spans: &mut HashMap<NodeId, (usize, usize)>,
) {
    let start = text.len();
    if let Some(t) = doc.text(id) {
        text.push_str(t);
    } else if doc.tag(id) == Some(&Tag::Br) {
        // A line break separates words like whitespace does.
        text.push('\n');
    } else {
        for &c in doc.children(id) {
            collect_spans(doc, c, text, spans);
        }
    }
    spans.insert(id, (start, text.len()));
}

/// Byte offsets where a run of non-whitespace begins.
fn word_starts(text: &str) -> Vec<usize> {
    let mut starts = Vec::new();
    let mut in_word = false;
    for (i, c) in text.char_indices() {
        if c.is_whitespace() {
            in_word = false;
        } else if !in_word {
            starts.push(i);
            in_word = true;
        }
    }
    starts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word_count(doc: &Document, id: NodeId) -> usize {
        let mut text = String::new();
        collect_spans(doc, id, &mut text, &mut HashMap::new());
        word_starts(&text).len()
    }

    fn paragraph(html: &str) -> (Document, NodeId) {
        let doc = Document::parse(html);
        let p = doc.element_children(doc.root())[0];
        (doc, p)
    }

    fn text_of(fragment: &str) -> String {
        let doc = Document::parse(fragment);
        doc.text_content(doc.root())
    }

    fn collapse(s: &str) -> String {
        s.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    #[test]
    fn short_paragraph_is_returned_whole() {
        let (doc, p) = paragraph(r#"<p class="x">a <b>b</b> c</p>"#);
        let chunks: Vec<String> = split_paragraph(&doc, p, 5).collect();
        assert_eq!(chunks, vec![r#"<p class="x">a <b>b</b> c</p>"#.to_string()]);
    }

    #[test]
    fn long_paragraph_chunks_by_word_count() {
        let words: Vec<String> = (0..450).map(|i| format!("w{i}")).collect();
        let (doc, p) = paragraph(&format!("<p>{}</p>", words.join(" ")));
        let chunks: Vec<String> = split_paragraph(&doc, p, 200).collect();
        assert_eq!(chunks.len(), 3);
        let counts: Vec<usize> = chunks
            .iter()
            .map(|c| text_of(c).split_whitespace().count())
            .collect();
        assert_eq!(counts, vec![200, 200, 50]);
    }

    #[test]
    fn inline_element_straddling_a_boundary_is_reopened() {
        let (doc, p) = paragraph("<p>one two <b>three four</b> five</p>");
        let chunks: Vec<String> = split_paragraph(&doc, p, 3).collect();
        assert_eq!(
            chunks,
            vec![
                "<p>one two <b>three </b></p>".to_string(),
                "<p><b>four</b> five</p>".to_string()
            ]
        );
    }

    #[test]
    fn nested_markup_survives_every_chunk() {
        let (doc, p) = paragraph("<p><i>a <b>b c d</b> e</i> f</p>");
        let chunks: Vec<String> = split_paragraph(&doc, p, 2).collect();
        assert_eq!(chunks.len(), 3);
        assert!(chunks[0].contains("<i>a <b>b </b></i>"), "{}", chunks[0]);
        assert!(chunks[1].contains("<i><b>c d</b> </i>"), "{}", chunks[1]);
        assert!(chunks[2].contains("<i>e</i> f"), "{}", chunks[2]);
    }

    #[test]
    fn round_trip_text_content() {
        let html = "<p>Lorem <em>ipsum dolor</em> sit amet, <b>consectetur <u>adipiscing</u> elit</b> sed do</p>";
        let (doc, p) = paragraph(html);
        let original = collapse(&doc.text_content(p));
        for limit in 1..=12 {
            let joined: String = split_paragraph(&doc, p, limit)
                .map(|c| text_of(&c))
                .collect();
            assert_eq!(collapse(&joined), original, "limit {limit}");
        }
    }

    #[test]
    fn zero_limit_behaves_like_one() {
        let (doc, p) = paragraph("<p>a b c</p>");
        assert_eq!(split_paragraph(&doc, p, 0).count(), 3);
    }

    #[test]
    fn line_break_stays_with_the_preceding_text() {
        let (doc, p) = paragraph("<p>a b<br>c d</p>");
        let chunks: Vec<String> = split_paragraph(&doc, p, 2).collect();
        assert_eq!(chunks, vec!["<p>a b<br></p>".to_string(), "<p>c d</p>".to_string()]);
    }

    #[test]
    fn word_count_counts_runs() {
        let (doc, p) = paragraph("<p>  a\u{00A0}b  c </p>");
        assert_eq!(word_count(&doc, p), 3);
    }
}
