use std::fmt;

use serde::{Deserialize, Serialize};

/// Object-replacement character: how an inline reference reads back as text.
/// A reference always occupies exactly one logical character position.
pub const REF_CHAR: char = '\u{FFFC}';

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockId(String);

impl BlockId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BlockId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for BlockId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockType {
    Page,
    Heading,
    Paragraph,
    Group,
    Text,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RefKind {
    Link,
    Mention,
}

/// The structured node inserted in place of the trigger-and-query text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    pub kind: RefKind,
    pub target: BlockId,
}

/// A half-open char range `[start, end)` within a block's text content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}

/// One run of inline content: plain text or an embedded reference node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Inline {
    Text { text: String },
    Ref { reference: Reference },
}

/// Rich-text content of a block: an ordered sequence of inline runs.
///
/// Offsets are logical char positions; a reference counts as one char
/// ([`REF_CHAR`]). Only the operations the session core consumes live here;
/// general editing belongs to the host editor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RichText {
    runs: Vec<Inline>,
}

/// Flattened unit of content, one per logical char position.
enum Atom {
    Ch(char),
    Ref(Reference),
}

impl RichText {
    pub fn from_text(text: &str) -> Self {
        if text.is_empty() {
            return Self::default();
        }
        Self {
            runs: vec![Inline::Text {
                text: text.to_string(),
            }],
        }
    }

    pub fn runs(&self) -> &[Inline] {
        &self.runs
    }

    pub fn char_len(&self) -> usize {
        self.runs
            .iter()
            .map(|run| match run {
                Inline::Text { text } => text.chars().count(),
                Inline::Ref { .. } => 1,
            })
            .sum()
    }

    /// Text strictly before `offset`, with references rendered as [`REF_CHAR`]
    /// so they can never complete a trigger sequence.
    pub fn text_before(&self, offset: usize) -> String {
        self.atoms()
            .into_iter()
            .take(offset)
            .map(|a| match a {
                Atom::Ch(c) => c,
                Atom::Ref(_) => REF_CHAR,
            })
            .collect()
    }

    pub fn to_plain(&self) -> String {
        self.text_before(self.char_len())
    }

    pub fn references(&self) -> Vec<&Reference> {
        self.runs
            .iter()
            .filter_map(|run| match run {
                Inline::Ref { reference } => Some(reference),
                Inline::Text { .. } => None,
            })
            .collect()
    }

    /// Deletes `span` and inserts `reference` at `span.start` as a single
    /// indivisible splice. Returns false (content untouched) if the span is
    /// out of range.
    pub fn splice_reference(&mut self, span: Span, reference: Reference) -> bool {
        if span.start > span.end || span.end > self.char_len() {
            return false;
        }
        let mut atoms = self.atoms();
        atoms.splice(span.start..span.end, [Atom::Ref(reference)]);
        *self = Self::from_atoms(atoms);
        true
    }

    fn atoms(&self) -> Vec<Atom> {
        let mut out = Vec::new();
        for run in &self.runs {
            match run {
                Inline::Text { text } => out.extend(text.chars().map(Atom::Ch)),
                Inline::Ref { reference } => out.push(Atom::Ref(reference.clone())),
            }
        }
        out
    }

    fn from_atoms(atoms: Vec<Atom>) -> Self {
        let mut runs: Vec<Inline> = Vec::new();
        for atom in atoms {
            match atom {
                Atom::Ch(c) => {
                    if let Some(Inline::Text { text }) = runs.last_mut() {
                        text.push(c);
                    } else {
                        runs.push(Inline::Text {
                            text: c.to_string(),
                        });
                    }
                }
                Atom::Ref(reference) => runs.push(Inline::Ref { reference }),
            }
        }
        Self { runs }
    }

    /// Host-side editing shim: inserts plain text at a char offset. The core
    /// never calls this; it exists so embedders (and tests) can simulate the
    /// user typing into an in-memory document.
    pub fn insert_text(&mut self, offset: usize, text: &str) -> bool {
        if offset > self.char_len() {
            return false;
        }
        let mut atoms = self.atoms();
        atoms.splice(offset..offset, text.chars().map(Atom::Ch));
        *self = Self::from_atoms(atoms);
        true
    }

    /// Host-side editing shim: deletes the char range `[start, end)`.
    pub fn delete_range(&mut self, span: Span) -> bool {
        if span.start > span.end || span.end > self.char_len() {
            return false;
        }
        let mut atoms = self.atoms();
        atoms.splice(span.start..span.end, []);
        *self = Self::from_atoms(atoms);
        true
    }
}

/// A content block owned by the document store. The session core only reads
/// blocks and requests mutations through the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub id: BlockId,
    pub block_type: BlockType,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub children: Vec<BlockId>,
    #[serde(default)]
    pub content: RichText,
}

/// One row of a query result: enough to render a popup entry and commit a
/// reference against it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockDescriptor {
    pub id: BlockId,
    pub block_type: BlockType,
    pub preview: String,
}
