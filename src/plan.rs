//! Extraction Plans
//!
//! The schema analyzer turns a [`Schema`] into an immutable [`ExtractionPlan`]: one
//! instruction per key, paths compiled, nested schemas compiled into their own plans,
//! and a result template holding each key's zero shape.
//!
//! Every schema error surfaces here, before any document is processed. A plan holds no
//! per-run state and can be shared (`Arc`) between any number of extraction runs.

use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::debug;

use crate::config::ExtractionConfig;
use crate::error::{ExtractError, Result};
use crate::field::FieldSpec;
use crate::path::{CompiledPath, PathCompiler};
use crate::schema::{scoped_key, Schema};

// =============================================================================
// Extraction Instruction
// =============================================================================

/// How to fill one key of the result
#[derive(Debug, Clone)]
pub struct ExtractionInstruction {
    key: String,
    /// Dotted key from the root schema, used to locate errors
    scoped_key: String,
    field: FieldSpec,
    /// `None` for default-only fields
    compiled_path: Option<CompiledPath>,
    nested: Option<Arc<ExtractionPlan>>,
}

impl ExtractionInstruction {
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn scoped_key(&self) -> &str {
        &self.scoped_key
    }

    pub fn field(&self) -> &FieldSpec {
        &self.field
    }

    pub fn compiled_path(&self) -> Option<&CompiledPath> {
        self.compiled_path.as_ref()
    }

    /// Plan for the nested schema, applied to every match
    pub fn nested(&self) -> Option<&Arc<ExtractionPlan>> {
        self.nested.as_ref()
    }
}

// =============================================================================
// Extraction Plan
// =============================================================================

/// Precompiled, reusable form of a schema
#[derive(Debug, Clone, Default)]
pub struct ExtractionPlan {
    instructions: Vec<ExtractionInstruction>,
    result_template: Map<String, Value>,
}

impl ExtractionPlan {
    /// Instructions in schema order
    pub fn instructions(&self) -> &[ExtractionInstruction] {
        &self.instructions
    }

    pub fn result_template(&self) -> &Map<String, Value> {
        &self.result_template
    }

    /// Fresh copy of the template for one run
    pub fn new_result(&self) -> Map<String, Value> {
        self.result_template.clone()
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }
}

// =============================================================================
// Schema Analyzer
// =============================================================================

/// Builds extraction plans from schemas
#[derive(Debug, Clone)]
pub struct SchemaAnalyzer {
    compiler: PathCompiler,
    max_depth: usize,
}

impl Default for SchemaAnalyzer {
    fn default() -> Self {
        Self::new(&ExtractionConfig::default())
    }
}

impl SchemaAnalyzer {
    pub fn new(config: &ExtractionConfig) -> Self {
        Self {
            compiler: PathCompiler::new(),
            max_depth: config.max_depth,
        }
    }

    /// Compile a schema into a plan
    pub fn analyze(&self, schema: &Schema) -> Result<ExtractionPlan> {
        let plan = self.analyze_scoped(schema, "", 0)?;
        debug!(fields = plan.len(), "analyzed schema");
        Ok(plan)
    }

    fn analyze_scoped(&self, schema: &Schema, scope: &str, depth: usize) -> Result<ExtractionPlan> {
        let mut plan = ExtractionPlan::default();

        for (key, rule) in schema.iter() {
            let scoped = scoped_key(scope, key);
            let field = FieldSpec::parse(&scoped, rule)?;

            // Pre-allocate result slot
            plan.result_template.insert(key.clone(), field.template_slot());

            let compiled_path = self.compiler.compile(field.path.as_deref())?;

            let nested = match &field.nested {
                Some(_) if depth + 1 > self.max_depth => {
                    return Err(ExtractError::SchemaTooDeep {
                        key: scoped,
                        max_depth: self.max_depth,
                    });
                }
                Some(nested) => Some(Arc::new(self.analyze_scoped(nested, &scoped, depth + 1)?)),
                None => None,
            };

            plan.instructions.push(ExtractionInstruction {
                key: key.clone(),
                scoped_key: scoped,
                field,
                compiled_path,
                nested,
            });
        }

        Ok(plan)
    }
}
