//! Fast Navigator
//!
//! Interprets simple paths (`$.a.b[0][*].c`) directly against a `serde_json::Value`,
//! without going through the general query engine.
//!
//! Evaluation keeps a working set of candidate values, starting with the document
//! itself, and rewrites it once per segment. Candidates that fail to navigate are
//! dropped; explicit `null` values are real matches and stay in the set.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

/// Grammar of a simple path: root followed by member access, fixed indices and `[*]`
static SIMPLE_PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\$(?:\.[A-Za-z_][A-Za-z0-9_]*|\[[0-9]+\]|\[\*\])+$").unwrap()
});

static SEGMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\.([A-Za-z_][A-Za-z0-9_]*)|\[([0-9]+)\]|\[\*\]").unwrap()
});

/// One step of a simple path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// `.name`
    Key(String),
    /// `[3]`
    Index(usize),
    /// `[*]`
    WildcardAll,
}

/// Compiled simple path
#[derive(Debug, Clone)]
pub struct FastNavigator {
    path: String,
    segments: Vec<Segment>,
}

impl FastNavigator {
    /// Whether `path` can be interpreted by the fast navigator
    pub fn is_simple(path: &str) -> bool {
        SIMPLE_PATH.is_match(path)
    }

    /// Tokenize a simple path. Returns `None` for anything outside the simple grammar,
    /// including indices too large to address.
    pub fn parse(path: &str) -> Option<Self> {
        if !Self::is_simple(path) {
            return None;
        }

        let segments = SEGMENT
            .captures_iter(path)
            .map(|caps| match (caps.get(1), caps.get(2)) {
                (Some(key), _) => Some(Segment::Key(key.as_str().to_string())),
                (None, Some(index)) => index.as_str().parse().ok().map(Segment::Index),
                (None, None) => Some(Segment::WildcardAll),
            })
            .collect::<Option<Vec<_>>>()?;

        Some(Self {
            path: path.to_string(),
            segments,
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// All values the path reaches in `document`, in document order
    pub fn on<'a>(&self, document: &'a Value) -> Vec<&'a Value> {
        let mut working = vec![document];

        for segment in &self.segments {
            let mut next = Vec::with_capacity(working.len());
            for candidate in working {
                match segment {
                    Segment::Key(name) => {
                        if let Some(found) = candidate.as_object().and_then(|o| o.get(name)) {
                            next.push(found);
                        }
                    }
                    Segment::Index(index) => {
                        if let Some(found) = candidate.as_array().and_then(|a| a.get(*index)) {
                            next.push(found);
                        }
                    }
                    Segment::WildcardAll => {
                        if let Some(items) = candidate.as_array() {
                            next.extend(items.iter());
                        }
                    }
                }
            }

            if next.is_empty() {
                return next;
            }
            working = next;
        }

        working
    }
}
