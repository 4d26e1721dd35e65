//! General query fallback
//!
//! Paths outside the simple grammar (recursive descent, filters, slices, unions,
//! bracketed names) are evaluated by `serde_json_path`, which queries the parsed
//! `serde_json::Value` directly.

use serde_json::Value;
use serde_json_path::JsonPath;

use crate::error::{ExtractError, Result};

/// Compiled general JSONPath query
#[derive(Debug, Clone)]
pub struct QueryNavigator {
    path: String,
    query: JsonPath,
}

impl QueryNavigator {
    pub fn parse(path: &str) -> Result<Self> {
        let query = JsonPath::parse(path).map_err(|e| ExtractError::InvalidPath {
            path: path.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            path: path.to_string(),
            query,
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// All nodes the query selects; an empty list when nothing matches
    pub fn on<'a>(&self, document: &'a Value) -> Vec<&'a Value> {
        self.query.query(document).all()
    }
}
