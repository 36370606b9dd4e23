//! Answer normalization: heuristic span repair plus sentence casing.
//!
//! Each pass is a function `&str -> String` applied in sequence, and the
//! whole pipeline is total — empty in, empty out, never an error.

/// Delimiter pairs repaired by [`clean`] when a span was cut mid-pair.
const DELIMITER_PAIRS: [(char, char); 3] = [('\u{201c}', '\u{201d}'), ('(', ')'), ('[', ']')];

/// Normalize a raw answer span into presentable prose.
pub fn normalize(raw: &str) -> String {
    sentence_case(&clean(raw))
}

// ---------------------------------------------------------------------------
// Pass 1: repair truncated span boundaries
// ---------------------------------------------------------------------------

/// Strip lone delimiters left behind when the model's span cut a pair in
/// half.
///
/// For each of `“ ”`, `( )`, `[ ]`: when the text contains one side of the
/// pair and not the other, the first occurrence of the lone side is removed.
/// A straight `"` is removed (first occurrence) when its count is odd.
/// Nothing more: mismatched *nested* delimiters are left alone.
fn clean(text: &str) -> String {
    let mut out = text.to_string();

    for (open, close) in DELIMITER_PAIRS {
        let has_open = out.contains(open);
        let has_close = out.contains(close);
        if has_open != has_close {
            let lone = if has_open { open } else { close };
            remove_first(&mut out, lone);
        }
    }

    if out.matches('"').count() % 2 == 1 {
        remove_first(&mut out, '"');
    }

    out
}

fn remove_first(text: &mut String, c: char) {
    if let Some(idx) = text.find(c) {
        text.remove(idx);
    }
}

// ---------------------------------------------------------------------------
// Pass 2: sentence casing
// ---------------------------------------------------------------------------

/// Collapse all whitespace (newlines included) to single spaces, trim,
/// upper-case the first alphabetic character, and close with a period unless
/// the text already ends in `.`, `?`, or `!`.
fn sentence_case(text: &str) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        return String::new();
    }

    let mut out = String::with_capacity(collapsed.len() + 1);
    let mut cased = false;
    for ch in collapsed.chars() {
        if !cased && ch.is_alphabetic() {
            out.extend(ch.to_uppercase());
            cased = true;
        } else {
            out.push(ch);
        }
    }

    if !out.ends_with(['.', '?', '!']) {
        out.push('.');
    }

    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
