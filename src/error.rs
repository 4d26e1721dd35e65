//! Error types for schema compilation and extraction

use serde_json::Value;
use thiserror::Error;

/// Result type for extractor operations
pub type Result<T> = std::result::Result<T, ExtractError>;

/// Extractor errors
///
/// Everything except `UnresolvedModifier` and `AmbiguousCardinality` is raised while a
/// schema is compiled, before any document is touched.
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("Invalid schema definition for `{key}`: {reason}")]
    InvalidSchemaDefinition { key: String, reason: String },

    #[error("Invalid schema definition for `{key}`: either path or default must be present")]
    MissingPathOrDefault { key: String },

    #[error("Invalid modifier for `{key}`: {found}")]
    InvalidModifier { key: String, found: String },

    #[error("Invalid map for `{key}`: {found}")]
    InvalidMap { key: String, found: String },

    #[error("Invalid path expression `{path}`: {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("Schema for `{key}` nests deeper than the limit of {max_depth}")]
    SchemaTooDeep { key: String, max_depth: usize },

    #[error("Modifier `{name}` cannot be applied to value {value}")]
    UnresolvedModifier { name: String, value: Value },

    #[error("Field `{key}` matched {count} values but is not declared as an array")]
    AmbiguousCardinality { key: String, count: usize },

    #[error("No extraction plan compiled; call `compile` or use `Extractor::with_schema` first")]
    PlanNotCompiled,

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl ExtractError {
    /// Whether the error was raised while compiling a schema
    pub fn is_compile_error(&self) -> bool {
        matches!(
            self,
            ExtractError::InvalidSchemaDefinition { .. }
                | ExtractError::MissingPathOrDefault { .. }
                | ExtractError::InvalidModifier { .. }
                | ExtractError::InvalidMap { .. }
                | ExtractError::InvalidPath { .. }
                | ExtractError::SchemaTooDeep { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_path_reads_as_schema_error() {
        let err = ExtractError::MissingPathOrDefault { key: "user.name".to_string() };
        assert_eq!(
            err.to_string(),
            "Invalid schema definition for `user.name`: either path or default must be present"
        );
        assert!(err.is_compile_error());
    }

    #[test]
    fn test_unresolved_modifier_is_runtime_error() {
        let err = ExtractError::UnresolvedModifier {
            name: "downcase".to_string(),
            value: serde_json::json!(42),
        };
        assert_eq!(err.to_string(), "Modifier `downcase` cannot be applied to value 42");
        assert!(!err.is_compile_error());
    }
}
