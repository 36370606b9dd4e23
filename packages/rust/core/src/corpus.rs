//! Knowledge corpus loading.
//!
//! The corpus is an immutable UTF-8 text file, loaded once per run and shared
//! read-only across window samples. Document extraction (PDF and friends)
//! happens outside this repository; whatever produced the file, this loader
//! only sees text.

use std::path::Path;

use tracing::info;

use shearwater_shared::{Result, ShearwaterError};

/// Read the corpus file, rejecting an empty one.
pub fn load_corpus(path: &Path) -> Result<String> {
    let text = std::fs::read_to_string(path).map_err(|e| ShearwaterError::io(path, e))?;

    if text.trim().is_empty() {
        return Err(ShearwaterError::validation(format!(
            "corpus file is empty: {}",
            path.display()
        )));
    }

    info!(path = %path.display(), chars = text.chars().count(), "corpus loaded");
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_file(name: &str, contents: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!("shearwater-{}-{name}", std::process::id()));
        std::fs::write(&path, contents).expect("write temp corpus");
        path
    }

    #[test]
    fn loads_text_corpus() {
        let path = temp_file("corpus.txt", "shearwaters are pelagic seabirds");
        let corpus = load_corpus(&path).unwrap();
        assert_eq!(corpus, "shearwaters are pelagic seabirds");
    }

    #[test]
    fn empty_corpus_is_rejected() {
        let path = temp_file("empty.txt", "  \n ");
        let err = load_corpus(&path).unwrap_err();
        assert!(err.to_string().contains("empty"));
    }

    #[test]
    fn missing_corpus_is_an_io_error() {
        let err = load_corpus(Path::new("/nonexistent/corpus.txt")).unwrap_err();
        assert!(matches!(err, ShearwaterError::Io { .. }));
    }
}
