//! Extraction Pipeline
//!
//! Runs a compiled [`ExtractionPlan`] against a document. Per instruction:
//!
//! ```text
//! navigate -> default-fill -> modifiers -> maps -> nesting / cardinality -> write
//! ```
//!
//! Every run starts from its own copy of the plan's result template, so a plan can be
//! reused (and shared between threads) freely.

use std::sync::{Arc, LazyLock};

use serde_json::Value;
use tracing::trace;

use crate::config::{CardinalityPolicy, ExtractionConfig};
use crate::error::{ExtractError, Result};
use crate::field::FieldSpec;
use crate::modifier::{ModifierFn, ModifierRegistry};
use crate::plan::{ExtractionInstruction, ExtractionPlan, SchemaAnalyzer};
use crate::schema::Schema;

static DEFAULT_REGISTRY: LazyLock<ModifierRegistry> = LazyLock::new(ModifierRegistry::new);

// =============================================================================
// Entry Points
// =============================================================================

/// One-shot extraction with default settings and only the built-in capabilities
pub fn extract(schema: &Schema, document: &Value) -> Result<Value> {
    run(&compile(schema)?, document)
}

/// Compile a schema with default settings
pub fn compile(schema: &Schema) -> Result<ExtractionPlan> {
    SchemaAnalyzer::default().analyze(schema)
}

/// Run a compiled plan with default settings and only the built-in capabilities
pub fn run(plan: &ExtractionPlan, document: &Value) -> Result<Value> {
    Pipeline::new(&DEFAULT_REGISTRY, &ExtractionConfig::default()).run(plan, document)
}

// =============================================================================
// Pipeline
// =============================================================================

/// Executes plans with a given registry and settings
#[derive(Debug, Clone, Copy)]
pub struct Pipeline<'a> {
    registry: &'a ModifierRegistry,
    config: &'a ExtractionConfig,
}

impl<'a> Pipeline<'a> {
    pub fn new(registry: &'a ModifierRegistry, config: &'a ExtractionConfig) -> Self {
        Self { registry, config }
    }

    pub fn run(&self, plan: &ExtractionPlan, document: &Value) -> Result<Value> {
        let mut result = plan.new_result();

        for instruction in plan.instructions() {
            let value = self.evaluate(instruction, document)?;
            result.insert(instruction.key().to_string(), value);
        }

        Ok(Value::Object(result))
    }

    fn evaluate(&self, instruction: &ExtractionInstruction, document: &Value) -> Result<Value> {
        let field = instruction.field();
        let matches = instruction
            .compiled_path()
            .map(|path| path.on(document))
            .unwrap_or_default();

        trace!(key = instruction.key(), matches = matches.len(), "navigated");

        // Defaults stand in for the whole field and skip all further processing
        if matches.is_empty() {
            let fallback = field.fetch_default();
            return Ok(if fallback.is_null() { field.template_slot() } else { fallback });
        }

        let values = matches
            .into_iter()
            .map(|found| {
                let value = if found.is_null() { field.fetch_default() } else { found.clone() };
                self.transform(field, value)
            })
            .collect::<Result<Vec<_>>>()?;

        self.resolve(instruction, values)
    }

    /// Modifiers, then maps, each left to right
    fn transform(&self, field: &FieldSpec, value: Value) -> Result<Value> {
        let modified = self
            .registry
            .apply_all(&field.modifiers, value, self.config.strict_modifiers)?;
        Ok(field.maps.iter().fold(modified, |current, map| map.lookup(&current)))
    }

    fn resolve(&self, instruction: &ExtractionInstruction, mut values: Vec<Value>) -> Result<Value> {
        let field = instruction.field();

        if let Some(nested) = instruction.nested() {
            if field.array_type {
                let results = values
                    .iter()
                    .map(|item| self.run(nested, item))
                    .collect::<Result<Vec<_>>>()?;
                return Ok(Value::Array(results));
            }

            return match values.first() {
                Some(first) => self.run(nested, first),
                None => Ok(field.template_slot()),
            };
        }

        if field.array_type {
            return Ok(Value::Array(values));
        }

        if values.len() == 1 {
            return Ok(values.swap_remove(0));
        }

        match self.config.cardinality {
            CardinalityPolicy::Sequence => Ok(Value::Array(values)),
            CardinalityPolicy::Error => Err(ExtractError::AmbiguousCardinality {
                key: instruction.scoped_key().to_string(),
                count: values.len(),
            }),
        }
    }
}

// =============================================================================
// Extractor
// =============================================================================

/// Reusable extractor: a compiled plan, the caller's modifiers and settings.
///
/// ```
/// use json_extractor::{Extractor, ExtractionConfig, Schema};
/// use serde_json::json;
///
/// let schema = Schema::from_json(&json!({"name": "$.user.name"})).unwrap();
/// let extractor = Extractor::with_schema(&schema, ExtractionConfig::default()).unwrap();
/// let result = extractor.extract_from(&json!({"user": {"name": "Ada"}})).unwrap();
/// assert_eq!(result, json!({"name": "Ada"}));
/// ```
#[derive(Debug, Clone, Default)]
pub struct Extractor {
    registry: ModifierRegistry,
    config: ExtractionConfig,
    plan: Option<Arc<ExtractionPlan>>,
}

impl Extractor {
    /// Extractor without a plan; call [`Extractor::compile`] before `extract_from`
    pub fn new(config: ExtractionConfig) -> Self {
        Self::with_registry(config, ModifierRegistry::new())
    }

    pub fn with_registry(config: ExtractionConfig, registry: ModifierRegistry) -> Self {
        Self {
            registry,
            config,
            plan: None,
        }
    }

    /// Extractor with `schema` already compiled
    pub fn with_schema(schema: &Schema, config: ExtractionConfig) -> Result<Self> {
        let mut extractor = Self::new(config);
        extractor.compile(schema)?;
        Ok(extractor)
    }

    /// Compile `schema` and keep the plan for subsequent `extract_from` calls
    pub fn compile(&mut self, schema: &Schema) -> Result<Arc<ExtractionPlan>> {
        let plan = Arc::new(SchemaAnalyzer::new(&self.config).analyze(schema)?);
        self.plan = Some(Arc::clone(&plan));
        Ok(plan)
    }

    pub fn set_plan(&mut self, plan: Arc<ExtractionPlan>) {
        self.plan = Some(plan);
    }

    pub fn plan(&self) -> Option<&Arc<ExtractionPlan>> {
        self.plan.as_ref()
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    pub fn registry(&self) -> &ModifierRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut ModifierRegistry {
        &mut self.registry
    }

    /// Register a named modifier; it applies to plans already compiled
    pub fn add_modifier<F>(&mut self, name: impl Into<String>, modifier: F) -> Result<()>
    where
        F: Fn(&Value) -> Value + Send + Sync + 'static,
    {
        self.registry.register_fn(name, modifier)
    }

    pub fn add_modifier_fn(&mut self, name: impl Into<String>, modifier: ModifierFn) -> Result<()> {
        self.registry.register(name, modifier)
    }

    /// Extract from a parsed document using the compiled plan
    pub fn extract_from(&self, document: &Value) -> Result<Value> {
        let plan = self.plan.as_ref().ok_or(ExtractError::PlanNotCompiled)?;
        self.run(plan, document)
    }

    /// Extract from JSON text; the text is parsed once for the whole plan
    pub fn extract_from_str(&self, text: &str) -> Result<Value> {
        let plan = self.plan.as_ref().ok_or(ExtractError::PlanNotCompiled)?;
        let document: Value = serde_json::from_str(text)?;
        self.run(plan, &document)
    }

    /// One-shot extraction with this extractor's modifiers; the stored plan is untouched
    pub fn extract(&self, schema: &Schema, document: &Value) -> Result<Value> {
        let plan = SchemaAnalyzer::new(&self.config).analyze(schema)?;
        self.run(&plan, document)
    }

    /// Run any plan with this extractor's modifiers and settings
    pub fn run(&self, plan: &ExtractionPlan, document: &Value) -> Result<Value> {
        Pipeline::new(&self.registry, &self.config).run(plan, document)
    }
}
