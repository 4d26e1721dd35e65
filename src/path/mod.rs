//! Path Compilation
//!
//! Chooses, per path expression, between the fast structural navigator and the general
//! query engine. Both produce the same thing: the list of values a path reaches.

pub mod fast;
pub mod query;

pub use fast::{FastNavigator, Segment};
pub use query::QueryNavigator;

use std::fmt;

use serde_json::Value;
use tracing::debug;

use crate::error::{ExtractError, Result};

/// Which evaluator a compiled path uses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathKind {
    Fast,
    Query,
}

impl fmt::Display for PathKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathKind::Fast => f.write_str("fast"),
            PathKind::Query => f.write_str("query"),
        }
    }
}

/// A path ready to run against documents
#[derive(Debug, Clone)]
pub enum CompiledPath {
    Fast(FastNavigator),
    Query(QueryNavigator),
}

impl CompiledPath {
    pub fn on<'a>(&self, document: &'a Value) -> Vec<&'a Value> {
        match self {
            CompiledPath::Fast(nav) => nav.on(document),
            CompiledPath::Query(nav) => nav.on(document),
        }
    }

    pub fn kind(&self) -> PathKind {
        match self {
            CompiledPath::Fast(_) => PathKind::Fast,
            CompiledPath::Query(_) => PathKind::Query,
        }
    }

    pub fn expression(&self) -> &str {
        match self {
            CompiledPath::Fast(nav) => nav.path(),
            CompiledPath::Query(nav) => nav.path(),
        }
    }
}

/// Compiles path expressions
#[derive(Debug, Clone, Copy, Default)]
pub struct PathCompiler;

impl PathCompiler {
    pub fn new() -> Self {
        Self
    }

    /// Compile an optional path; no path compiles to nothing
    pub fn compile(&self, path: Option<&str>) -> Result<Option<CompiledPath>> {
        path.map(|p| self.compile_path(p)).transpose()
    }

    pub fn compile_path(&self, path: &str) -> Result<CompiledPath> {
        if path.trim().is_empty() {
            return Err(ExtractError::InvalidPath {
                path: path.to_string(),
                reason: "path is empty".to_string(),
            });
        }

        let compiled = match FastNavigator::parse(path) {
            Some(nav) => CompiledPath::Fast(nav),
            None => CompiledPath::Query(QueryNavigator::parse(path)?),
        };

        debug!(path, kind = %compiled.kind(), "compiled path");
        Ok(compiled)
    }
}
