//! Citation resolution for generated text
//!
//! Generated answers cite internal document filenames (e.g. `interp1.md`).
//! The resolver replaces each distinct filename token with a human-readable
//! source label: a special-cased label, a `Source:` line read from the
//! corresponding reference file, or the token itself when no source exists.

use regex::Regex;
use std::collections::HashMap;
use std::fs;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Pattern matching internal document filename tokens
const DOC_TOKEN_PATTERN: &str = r"\b[\w-]+\.md\b";

/// Lookup of a canonical source label for a document identifier
pub trait SourceLookup: Send + Sync {
    /// Return the source label for a document token, or None if unknown
    fn source_for(&self, token: &str) -> Option<String>;
}

/// File-backed source lookup
///
/// Reads the `Source:` marker line from the reference file, trying the
/// configured docs directory first and the bare path as a fallback.
pub struct FileSourceLookup {
    docs_dir: PathBuf,
}

impl FileSourceLookup {
    pub fn new(docs_dir: impl Into<PathBuf>) -> Self {
        Self {
            docs_dir: docs_dir.into(),
        }
    }

    fn read_source_line(path: &Path) -> Option<String> {
        let file = fs::File::open(path).ok()?;
        let reader = BufReader::new(file);
        for line in reader.lines() {
            let line = line.ok()?;
            if let Some(rest) = line.strip_prefix("Source:") {
                return Some(rest.trim().to_string());
            }
        }
        None
    }
}

impl SourceLookup for FileSourceLookup {
    fn source_for(&self, token: &str) -> Option<String> {
        let primary = self.docs_dir.join(token);
        if let Some(source) = Self::read_source_line(&primary) {
            return Some(source);
        }
        // Fallback: token as a bare path
        Self::read_source_line(Path::new(token))
    }
}

/// Citation resolver
pub struct CitationResolver {
    pattern: Regex,
    /// Directory prefix stripped from tokens before substitution
    strip_prefix: String,
    /// Fixed labels for special-cased identifiers
    special_cases: HashMap<String, String>,
    lookup: Arc<dyn SourceLookup>,
}

impl CitationResolver {
    pub fn new(docs_dir: &Path, lookup: Arc<dyn SourceLookup>) -> Self {
        let mut special_cases = HashMap::new();
        // The aggregated Stack Overflow dump has no per-file source header
        special_cases.insert(
            "cleaned_stack.md".to_string(),
            "Stack Overflow".to_string(),
        );

        Self {
            pattern: Regex::new(DOC_TOKEN_PATTERN).expect("valid citation pattern"),
            strip_prefix: format!("{}/", docs_dir.display()),
            special_cases,
            lookup,
        }
    }

    /// Add or override a special-cased identifier label
    pub fn with_special_case(mut self, token: impl Into<String>, label: impl Into<String>) -> Self {
        self.special_cases.insert(token.into(), label.into());
        self
    }

    /// Replace document filename tokens with source labels
    ///
    /// All substitutions are applied in one pass over the original token
    /// boundaries, so one substitution's output is never re-matched against
    /// another target. Text without matching tokens is returned unchanged
    /// with no lookup calls.
    pub fn resolve(&self, text: &str) -> String {
        if !self.pattern.is_match(text) {
            return text.to_string();
        }

        let stripped = text.replace(&self.strip_prefix, "");

        let mut replacements: HashMap<String, String> = HashMap::new();
        for token_match in self.pattern.find_iter(&stripped) {
            let token = token_match.as_str();
            if replacements.contains_key(token) {
                continue;
            }
            let label = if let Some(label) = self.special_cases.get(token) {
                label.clone()
            } else {
                self.lookup
                    .source_for(token)
                    .unwrap_or_else(|| token.to_string())
            };
            replacements.insert(token.to_string(), label);
        }

        self.pattern
            .replace_all(&stripped, |caps: &regex::Captures| {
                let token = &caps[0];
                replacements
                    .get(token)
                    .cloned()
                    .unwrap_or_else(|| token.to_string())
            })
            .into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    struct MapLookup {
        map: HashMap<String, String>,
        calls: AtomicUsize,
    }

    impl MapLookup {
        fn new(pairs: &[(&str, &str)]) -> Self {
            Self {
                map: pairs
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl SourceLookup for MapLookup {
        fn source_for(&self, token: &str) -> Option<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.map.get(token).cloned()
        }
    }

    fn resolver(lookup: Arc<dyn SourceLookup>) -> CitationResolver {
        CitationResolver::new(Path::new("knowledge-docs"), lookup)
    }

    #[test]
    fn test_no_tokens_returns_unchanged_without_lookup() {
        let lookup = Arc::new(MapLookup::new(&[]));
        let r = resolver(lookup.clone());

        let text = "Nothing to cite here, not even a markdown filename.";
        assert_eq!(r.resolve(text), text);
        assert_eq!(lookup.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_known_token_replaced_with_source_label() {
        let lookup = Arc::new(MapLookup::new(&[(
            "interp1.md",
            "MATLAB Documentation: interp1",
        )]));
        let r = resolver(lookup);

        let resolved = r.resolve("See interp1.md for details.");
        assert_eq!(resolved, "See MATLAB Documentation: interp1 for details.");
    }

    #[test]
    fn test_unknown_token_left_as_is() {
        let lookup = Arc::new(MapLookup::new(&[]));
        let r = resolver(lookup);

        let text = "Sources: [mystery-doc.md]";
        assert_eq!(r.resolve(text), text);
    }

    #[test]
    fn test_special_case_label() {
        let lookup = Arc::new(MapLookup::new(&[]));
        let r = resolver(lookup);

        let resolved = r.resolve("Sources: [cleaned_stack.md]");
        assert_eq!(resolved, "Sources: [Stack Overflow]");
    }

    #[test]
    fn test_prefix_stripped_before_substitution() {
        let lookup = Arc::new(MapLookup::new(&[("plot.md", "MATLAB: plot")]));
        let r = resolver(lookup);

        let resolved = r.resolve("From knowledge-docs/plot.md we learn this.");
        assert_eq!(resolved, "From MATLAB: plot we learn this.");
    }

    #[test]
    fn test_repeated_token_looked_up_once() {
        let lookup = Arc::new(MapLookup::new(&[("a.md", "Label A")]));
        let r = resolver(lookup.clone());

        let resolved = r.resolve("a.md then again a.md");
        assert_eq!(resolved, "Label A then again Label A");
        assert_eq!(lookup.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_no_cross_substitution() {
        // One token's label must not be rewritten by another's rule
        let lookup = Arc::new(MapLookup::new(&[
            ("first.md", "second.md"),
            ("second.md", "Second Label"),
        ]));
        let r = resolver(lookup);

        let resolved = r.resolve("first.md and second.md");
        assert_eq!(resolved, "second.md and Second Label");
    }

    #[test]
    fn test_resolution_idempotent() {
        let lookup = Arc::new(MapLookup::new(&[("guide.md", "The User Guide")]));
        let r = resolver(lookup);

        let once = r.resolve("Read guide.md and unknown.md together.");
        let twice = r.resolve(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_file_lookup_primary_then_fallback() {
        let dir = TempDir::new().unwrap();
        let docs = dir.path().join("docs");
        fs::create_dir_all(&docs).unwrap();
        fs::write(
            docs.join("known.md"),
            "Title\nSource: https://example.com/known\nBody text\n",
        )
        .unwrap();

        let lookup = FileSourceLookup::new(&docs);
        assert_eq!(
            lookup.source_for("known.md"),
            Some("https://example.com/known".to_string())
        );
        assert_eq!(lookup.source_for("absent.md"), None);
    }

    #[test]
    fn test_file_without_source_line() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("bare.md"), "No source header here\n").unwrap();

        let lookup = FileSourceLookup::new(dir.path());
        assert_eq!(lookup.source_for("bare.md"), None);
    }
}
