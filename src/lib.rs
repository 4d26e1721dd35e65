//! JSON Extractor
//!
//! Extracts and reshapes values out of arbitrary JSON documents according to a
//! declarative schema: a mapping from output keys to extraction rules.
//!
//! ## Features
//!
//! - **Path Compilation**: Simple paths run on a structural fast navigator; everything
//!   else (recursive descent, filters, slices) falls back to a full JSONPath engine
//! - **Reusable Plans**: Schemas are validated and compiled once, then run against any
//!   number of documents
//! - **Value Pipeline**: Defaults, modifiers, value maps, array cardinality and nested
//!   sub-schemas, applied per matched element
//!
//! ## Pipeline
//!
//! ```text
//! Schema ──► SchemaAnalyzer ──► ExtractionPlan { instructions, result_template }
//!                                      │
//! document ──────────────────────────► Pipeline::run
//!                                      │  per instruction:
//!                                      │  navigate → default → modify → map → resolve
//!                                      ▼
//!                                    result
//! ```
//!
//! ## Example
//!
//! ```
//! use json_extractor::{extract, Schema};
//! use serde_json::json;
//!
//! let schema = Schema::from_json(&json!({
//!     "name": "$.user.name",
//!     "tags": {"path": "$.user.tags[*]", "type": "array"},
//!     "age": {"path": "$.user.age", "default": 0}
//! })).unwrap();
//!
//! let result = extract(&schema, &json!({"user": {"name": "Ada", "tags": ["x", "y"]}})).unwrap();
//! assert_eq!(result, json!({"name": "Ada", "tags": ["x", "y"], "age": 0}));
//! ```

pub mod capability;
pub mod config;
pub mod error;
pub mod extract;
pub mod field;
pub mod modifier;
pub mod path;
pub mod plan;
pub mod schema;

pub use capability::{CapabilityTable, ValueKind};
pub use config::{CardinalityPolicy, ExtractionConfig, ExtractorConfig};
pub use error::{ExtractError, Result};
pub use extract::{compile, extract, run, Extractor, Pipeline};
pub use field::{DefaultValue, FieldSpec, RuleRecord, ValueMap};
pub use modifier::{ModifierFn, ModifierRef, ModifierRegistry};
pub use path::{CompiledPath, PathCompiler, PathKind};
pub use plan::{ExtractionInstruction, ExtractionPlan, SchemaAnalyzer};
pub use schema::{Rule, Schema};
