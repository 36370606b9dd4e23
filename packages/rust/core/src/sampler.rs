//! Corpus window sampling.
//!
//! Inference cost scales with window size, so a large corpus is cut down to a
//! bounded window before each attempt. The start offset is drawn uniformly,
//! which exposes different facets of the corpus across repeated attempts.

use rand::Rng;

/// Return a contiguous window of at most `max_chars` characters.
///
/// When `max_chars` is zero (unbounded) or the corpus already fits, the whole
/// corpus is returned verbatim. Otherwise the window is exactly `max_chars`
/// characters long, starting at a char offset drawn uniformly from
/// `[0, corpus_chars - max_chars]`. Offsets are char-based, never byte-based,
/// so a multibyte corpus cannot be split mid code point.
pub fn sample_window(corpus: &str, max_chars: usize) -> String {
    if max_chars == 0 {
        return corpus.to_string();
    }

    let total = corpus.chars().count();
    if total <= max_chars {
        return corpus.to_string();
    }

    let start = rand::thread_rng().gen_range(0..=total - max_chars);
    corpus.chars().skip(start).take(max_chars).collect()
}
