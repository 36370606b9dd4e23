//! Domain types for crowd-submitted asks.
//!
//! A [`Submission`] is the platform's NPF-style post record: an ordered list
//! of content blocks plus layout entries, where the layout entry of kind
//! `ask` names the blocks that form the question region. Submissions are
//! read-only to the answer pipeline.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Content block type for plain text.
pub const BLOCK_TEXT: &str = "text";
/// Content block type for images.
pub const BLOCK_IMAGE: &str = "image";
/// Layout entry type identifying the question region.
pub const LAYOUT_ASK: &str = "ask";

static WHITESPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

// ---------------------------------------------------------------------------
// Submission
// ---------------------------------------------------------------------------

/// A single content block within a submission.
///
/// Unknown fields (media payloads, formatting spans) are preserved verbatim
/// so a draft can be re-posted without loss.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentBlock {
    /// Block type: `text`, `image`, ...
    #[serde(rename = "type")]
    pub kind: String,

    /// Text payload for `text` blocks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    /// Everything else the platform sent (media objects, attribution, ...).
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl ContentBlock {
    /// Construct a plain text block.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            kind: BLOCK_TEXT.into(),
            text: Some(text.into()),
            extra: serde_json::Map::new(),
        }
    }
}

/// A layout entry grouping content blocks into a region.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutBlock {
    /// Layout type: `ask`, `rows`, ...
    #[serde(rename = "type")]
    pub kind: String,

    /// Indices into the submission's content list.
    #[serde(default)]
    pub blocks: Vec<usize>,

    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// A crowd-submitted post awaiting an answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Submission {
    /// Platform post identifier.
    pub id: u64,

    /// Unix timestamp of the submission, when the platform provides one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,

    /// Ordered content blocks.
    #[serde(default)]
    pub content: Vec<ContentBlock>,

    /// Layout entries; the `ask` entry names the question region.
    #[serde(default)]
    pub layout: Vec<LayoutBlock>,
}

impl Submission {
    /// The layout entry identifying the question region, if any.
    pub fn ask_layout(&self) -> Option<&LayoutBlock> {
        self.layout.iter().find(|l| l.kind == LAYOUT_ASK)
    }

    /// Content blocks inside the question region, in layout order.
    pub fn question_blocks(&self) -> Vec<&ContentBlock> {
        match self.ask_layout() {
            Some(ask) => ask
                .blocks
                .iter()
                .filter_map(|&i| self.content.get(i))
                .collect(),
            None => Vec::new(),
        }
    }

    /// Content blocks outside the question region (attachments, captions).
    pub fn rest_blocks(&self) -> Vec<&ContentBlock> {
        let ask_indices: Vec<usize> = self
            .ask_layout()
            .map(|l| l.blocks.clone())
            .unwrap_or_default();
        self.content
            .iter()
            .enumerate()
            .filter(|(i, _)| !ask_indices.contains(i))
            .map(|(_, b)| b)
            .collect()
    }

    /// Whether any content block is something other than plain text.
    pub fn has_media(&self) -> bool {
        self.content.iter().any(|b| b.kind != BLOCK_TEXT)
    }

    /// Derive the single-line question from the ask region's text blocks.
    ///
    /// Text blocks are concatenated in block order, whitespace runs collapsed
    /// to single spaces, trailing `.` `,` `?` `:` stripped, and one `?`
    /// appended. Pure and idempotent. `None` when the submission has no ask
    /// region or no usable text.
    pub fn question(&self) -> Option<String> {
        let parts: Vec<&str> = self
            .question_blocks()
            .into_iter()
            .filter(|b| b.kind == BLOCK_TEXT)
            .filter_map(|b| b.text.as_deref())
            .collect();

        if parts.is_empty() {
            return None;
        }

        let joined = parts.join(" ");
        let collapsed = WHITESPACE_RE.replace_all(&joined, " ");
        let stem = collapsed
            .trim()
            .trim_end_matches(['.', ',', '?', ':'])
            .trim_end();

        if stem.is_empty() {
            return None;
        }

        Some(format!("{stem}?"))
    }

    /// Caption texts from the non-ask region, with the platform's surrounding
    /// `[` `]` markers stripped.
    pub fn captions(&self) -> Vec<String> {
        self.rest_blocks()
            .into_iter()
            .filter(|b| b.kind == BLOCK_TEXT)
            .filter_map(|b| b.text.as_deref())
            .map(|t| {
                let t = t.strip_prefix('[').unwrap_or(t);
                let t = t.strip_suffix(']').unwrap_or(t);
                t.to_string()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ask_submission(texts: &[&str]) -> Submission {
        let content = texts.iter().map(|t| ContentBlock::text(*t)).collect();
        let layout = vec![LayoutBlock {
            kind: LAYOUT_ASK.into(),
            blocks: (0..texts.len()).collect(),
            extra: serde_json::Map::new(),
        }];
        Submission {
            id: 1,
            timestamp: None,
            content,
            layout,
        }
    }

    #[test]
    fn question_joins_blocks_and_appends_mark() {
        let sub = ask_submission(&["what is", "the capital,"]);
        assert_eq!(sub.question().as_deref(), Some("what is the capital?"));
    }

    #[test]
    fn question_collapses_whitespace() {
        let sub = ask_submission(&["where  do\nshearwaters", "  nest:"]);
        assert_eq!(
            sub.question().as_deref(),
            Some("where do shearwaters nest?")
        );
    }

    #[test]
    fn question_is_idempotent_on_derived_text() {
        let sub = ask_submission(&["what is", "the capital,"]);
        let first = sub.question().unwrap();
        let again = ask_submission(&[first.as_str()]);
        assert_eq!(again.question().unwrap(), first);
    }

    #[test]
    fn question_none_without_ask_layout() {
        let sub = Submission {
            id: 2,
            timestamp: None,
            content: vec![ContentBlock::text("hello")],
            layout: vec![],
        };
        assert!(sub.question().is_none());
    }

    #[test]
    fn question_none_for_punctuation_only_text() {
        let sub = ask_submission(&["???"]);
        assert!(sub.question().is_none());
    }

    #[test]
    fn rest_blocks_excludes_question_region() {
        let mut sub = ask_submission(&["who are you"]);
        sub.content.push(ContentBlock::text("[a caption]"));
        let rest = sub.rest_blocks();
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0].text.as_deref(), Some("[a caption]"));
        assert_eq!(sub.captions(), vec!["a caption".to_string()]);
    }

    #[test]
    fn has_media_flags_non_text_blocks() {
        let mut sub = ask_submission(&["who are you"]);
        assert!(!sub.has_media());
        sub.content.push(ContentBlock {
            kind: BLOCK_IMAGE.into(),
            text: None,
            extra: serde_json::Map::new(),
        });
        assert!(sub.has_media());
    }

    #[test]
    fn submission_roundtrips_unknown_fields() {
        let json = r#"{
            "id": 42,
            "timestamp": 1700000000,
            "content": [
                {"type": "text", "text": "hi", "subtype": "heading1"},
                {"type": "image", "media": [{"url": "https://example.com/i.png"}]}
            ],
            "layout": [{"type": "ask", "blocks": [0], "attribution": {"type": "blog"}}]
        }"#;
        let sub: Submission = serde_json::from_str(json).expect("deserialize");
        assert_eq!(sub.id, 42);
        assert!(sub.content[0].extra.contains_key("subtype"));
        assert!(sub.content[1].extra.contains_key("media"));

        let back = serde_json::to_value(&sub).expect("serialize");
        assert_eq!(back["content"][1]["media"][0]["url"], "https://example.com/i.png");
        assert_eq!(back["layout"][0]["attribution"]["type"], "blog");
    }
}
