//! Text widths for the measurer, backed by `ttf-parser`.
//!
//! Row and section text is broken into lines before layout, so only advance
//! widths matter here. When no face is registered the book falls back to an
//! average glyph width, which keeps measurements deterministic in tests.

use std::collections::HashMap;

use crate::error::PrintFormError;

const AVERAGE_ADVANCE: f32 = 0.5;
const AVERAGE_ADVANCE_BOLD: f32 = 0.55;

/// Font parameters of one run of inline text.
#[derive(Debug, Clone, Copy)]
pub struct TextRun<'a> {
    pub family: &'a str,
    pub size: f32,
    pub bold: bool,
    pub italic: bool,
}

impl<'a> TextRun<'a> {
    pub fn new(family: &'a str, size: f32) -> Self {
        Self {
            family,
            size,
            bold: false,
            italic: false,
        }
    }

    pub fn bold(mut self, bold: bool) -> Self {
        self.bold = bold;
        self
    }

    pub fn italic(mut self, italic: bool) -> Self {
        self.italic = italic;
        self
    }

    fn fallback_width(&self, text: &str) -> f32 {
        let em = if self.bold {
            AVERAGE_ADVANCE_BOLD
        } else {
            AVERAGE_ADVANCE
        };
        text.chars().count() as f32 * self.size * em
    }
}

#[derive(Debug, Clone, Hash, PartialEq, Eq)]
struct FaceKey {
    family: String,
    bold: bool,
    italic: bool,
}

impl FaceKey {
    fn of(run: &TextRun<'_>) -> Self {
        Self {
            family: run.family.trim().to_ascii_lowercase(),
            bold: run.bold,
            italic: run.italic,
        }
    }
}

/// A registered face. The bytes stay owned so a `ttf_parser::Face` can be
/// re-borrowed per measurement.
struct RegisteredFace {
    bytes: Vec<u8>,
    units_per_em: f32,
}

/// Faces available to the measurer, keyed by family and variant.
#[derive(Default)]
pub struct FontBook {
    faces: HashMap<FaceKey, RegisteredFace>,
    fallback: Option<FaceKey>,
}

impl FontBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a TTF/OTF face. The first face registered also answers for
    /// families that were never registered.
    pub fn register(
        &mut self,
        family: &str,
        bold: bool,
        italic: bool,
        bytes: Vec<u8>,
    ) -> Result<(), PrintFormError> {
        let units_per_em = ttf_parser::Face::parse(&bytes, 0)
            .map_err(|e| PrintFormError::Font(format!("cannot parse face '{family}': {e}")))?
            .units_per_em() as f32;

        let key = FaceKey::of(&TextRun::new(family, 0.0).bold(bold).italic(italic));
        self.fallback.get_or_insert_with(|| key.clone());
        self.faces.insert(key, RegisteredFace { bytes, units_per_em });
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }

    fn face_for(&self, run: &TextRun<'_>) -> Option<&RegisteredFace> {
        self.faces
            .get(&FaceKey::of(run))
            .or_else(|| self.fallback.as_ref().and_then(|k| self.faces.get(k)))
    }

    /// Advance width of `text` in px.
    pub fn width(&self, run: &TextRun<'_>, text: &str) -> f32 {
        let Some(registered) = self.face_for(run) else {
            return run.fallback_width(text);
        };
        let Ok(face) = ttf_parser::Face::parse(&registered.bytes, 0) else {
            return run.fallback_width(text);
        };
        let scale = run.size / registered.units_per_em;
        text.chars()
            .map(|ch| {
                face.glyph_index(ch)
                    .and_then(|gid| face.glyph_hor_advance(gid))
                    .map(|adv| adv as f32 * scale)
                    .unwrap_or(run.size * AVERAGE_ADVANCE)
            })
            .sum()
    }

    /// Greedy line breaking at ASCII whitespace. `\n` always ends a line and
    /// a word wider than `max_width` gets a line of its own. A non-positive
    /// `max_width` disables wrapping.
    pub fn break_lines(&self, run: &TextRun<'_>, text: &str, max_width: f32) -> Vec<String> {
        let mut lines = Vec::new();
        for hard_line in text.split('\n') {
            let mut line = String::new();
            for word in hard_line.split_ascii_whitespace() {
                if line.is_empty() {
                    line.push_str(word);
                    continue;
                }
                let grown = self.width(run, &line) + self.width(run, " ") + self.width(run, word);
                if max_width > 0.0 && grown > max_width {
                    lines.push(std::mem::take(&mut line));
                    line.push_str(word);
                } else {
                    line.push(' ');
                    line.push_str(word);
                }
            }
            lines.push(line);
        }
        lines
    }
}
