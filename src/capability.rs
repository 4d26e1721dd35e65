//! Value Capabilities
//!
//! Operations a value "supports" by itself, keyed by the kind of JSON value. A modifier
//! name that is not in the modifier registry falls back to this table, so `downcase`
//! works on strings without anyone registering it, and fails (or passes through) on
//! numbers.
//!
//! Callers decide which operations are legal on which kinds by registering them.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::{Number, Value};

use crate::modifier::ModifierFn;

// =============================================================================
// Value Kind
// =============================================================================

/// The kind of a JSON value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Null,
    Bool,
    Number,
    String,
    Array,
    Object,
}

impl ValueKind {
    pub const ALL: [ValueKind; 6] = [
        ValueKind::Null,
        ValueKind::Bool,
        ValueKind::Number,
        ValueKind::String,
        ValueKind::Array,
        ValueKind::Object,
    ];

    pub fn of(value: &Value) -> Self {
        match value {
            Value::Null => ValueKind::Null,
            Value::Bool(_) => ValueKind::Bool,
            Value::Number(_) => ValueKind::Number,
            Value::String(_) => ValueKind::String,
            Value::Array(_) => ValueKind::Array,
            Value::Object(_) => ValueKind::Object,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ValueKind::Null => "null",
            ValueKind::Bool => "bool",
            ValueKind::Number => "number",
            ValueKind::String => "string",
            ValueKind::Array => "array",
            ValueKind::Object => "object",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Capability Table
// =============================================================================

/// Per-kind table of named operations
#[derive(Clone, Default)]
pub struct CapabilityTable {
    ops: HashMap<ValueKind, HashMap<String, ModifierFn>>,
}

impl fmt::Debug for CapabilityTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for kind in ValueKind::ALL {
            if let Some(ops) = self.ops.get(&kind) {
                let mut names: Vec<_> = ops.keys().collect();
                names.sort();
                map.entry(&kind.as_str(), &names);
            }
        }
        map.finish()
    }
}

impl CapabilityTable {
    /// An empty table: no value supports anything
    pub fn empty() -> Self {
        Self::default()
    }

    /// The built-in string, number and collection operations
    pub fn builtin() -> Self {
        let mut table = Self::empty();

        table.register_fn(ValueKind::String, "downcase", |v| map_str(v, |s| s.to_lowercase().into()));
        table.register_fn(ValueKind::String, "upcase", |v| map_str(v, |s| s.to_uppercase().into()));
        table.register_fn(ValueKind::String, "capitalize", |v| map_str(v, |s| capitalize(s).into()));
        table.register_fn(ValueKind::String, "strip", |v| map_str(v, |s| s.trim().into()));
        table.register_fn(ValueKind::String, "reverse", |v| {
            map_str(v, |s| s.chars().rev().collect::<String>().into())
        });
        table.register_fn(ValueKind::String, "to_i", |v| map_str(v, |s| parse_leading_int(s).into()));
        table.register_fn(ValueKind::String, "to_f", |v| map_str(v, |s| float_value(parse_leading_float(s))));
        for name in ["length", "size"] {
            table.register_fn(ValueKind::String, name, |v| map_str(v, |s| s.chars().count().into()));
            table.register_fn(ValueKind::Array, name, |v| map_array(v, |a| a.len().into()));
            table.register_fn(ValueKind::Object, name, |v| match v {
                Value::Object(o) => o.len().into(),
                other => other.clone(),
            });
        }

        table.register_fn(ValueKind::Number, "to_i", |v| map_number(v, number_to_int));
        table.register_fn(ValueKind::Number, "to_f", |v| {
            map_number(v, |n| float_value(n.as_f64().unwrap_or_default()))
        });
        table.register_fn(ValueKind::Number, "abs", |v| {
            map_number(v, |n| match n.as_i64() {
                Some(i) => i.checked_abs().map(Value::from).unwrap_or_else(|| float_value((i as f64).abs())),
                None if n.is_u64() => Value::Number(n.clone()),
                None => float_value(n.as_f64().unwrap_or_default().abs()),
            })
        });
        table.register_fn(ValueKind::Number, "round", |v| map_number(v, |n| round_with(n, f64::round)));
        table.register_fn(ValueKind::Number, "floor", |v| map_number(v, |n| round_with(n, f64::floor)));
        table.register_fn(ValueKind::Number, "ceil", |v| map_number(v, |n| round_with(n, f64::ceil)));

        table.register_fn(ValueKind::Null, "to_i", |_| Value::from(0));
        table.register_fn(ValueKind::Null, "to_a", |_| Value::Array(Vec::new()));

        // `to_s` is defined for every kind
        for kind in ValueKind::ALL {
            table.register_fn(kind, "to_s", to_s);
        }

        table.register_fn(ValueKind::String, "empty?", |v| map_str(v, |s| s.is_empty().into()));
        table.register_fn(ValueKind::Array, "empty?", |v| map_array(v, |a| a.is_empty().into()));
        table.register_fn(ValueKind::Object, "empty?", |v| match v {
            Value::Object(o) => o.is_empty().into(),
            other => other.clone(),
        });

        table.register_fn(ValueKind::Array, "first", |v| {
            map_array(v, |a| a.first().cloned().unwrap_or(Value::Null))
        });
        table.register_fn(ValueKind::Array, "last", |v| {
            map_array(v, |a| a.last().cloned().unwrap_or(Value::Null))
        });
        table.register_fn(ValueKind::Array, "reverse", |v| {
            map_array(v, |a| Value::Array(a.iter().rev().cloned().collect()))
        });
        table.register_fn(ValueKind::Array, "compact", |v| {
            map_array(v, |a| Value::Array(a.iter().filter(|x| !x.is_null()).cloned().collect()))
        });
        table.register_fn(ValueKind::Array, "uniq", |v| {
            map_array(v, |a| {
                let mut seen: Vec<Value> = Vec::with_capacity(a.len());
                for item in a {
                    if !seen.contains(item) {
                        seen.push(item.clone());
                    }
                }
                Value::Array(seen)
            })
        });
        table.register_fn(ValueKind::Array, "flatten", |v| {
            map_array(v, |a| {
                let mut out = Vec::new();
                flatten_into(a, &mut out);
                Value::Array(out)
            })
        });

        table.register_fn(ValueKind::Object, "keys", |v| match v {
            Value::Object(o) => Value::Array(o.keys().cloned().map(Value::String).collect()),
            other => other.clone(),
        });
        table.register_fn(ValueKind::Object, "values", |v| match v {
            Value::Object(o) => Value::Array(o.values().cloned().collect()),
            other => other.clone(),
        });

        table
    }

    /// Declare `name` as a legal operation on values of `kind`
    pub fn register(&mut self, kind: ValueKind, name: impl Into<String>, op: ModifierFn) {
        self.ops.entry(kind).or_default().insert(name.into(), op);
    }

    /// Convenience over `register` for plain closures
    pub fn register_fn<F>(&mut self, kind: ValueKind, name: impl Into<String>, op: F)
    where
        F: Fn(&Value) -> Value + Send + Sync + 'static,
    {
        self.register(kind, name, Arc::new(op));
    }

    /// Whether values of `kind` support `name`
    pub fn supports(&self, kind: ValueKind, name: &str) -> bool {
        self.ops.get(&kind).is_some_and(|ops| ops.contains_key(name))
    }

    /// Find the operation `name` for this particular value
    pub fn lookup(&self, name: &str, value: &Value) -> Option<&ModifierFn> {
        self.ops.get(&ValueKind::of(value)).and_then(|ops| ops.get(name))
    }
}

// --- helpers ---

fn map_str(value: &Value, f: impl FnOnce(&str) -> Value) -> Value {
    match value {
        Value::String(s) => f(s),
        other => other.clone(),
    }
}

fn map_array(value: &Value, f: impl FnOnce(&[Value]) -> Value) -> Value {
    match value {
        Value::Array(a) => f(a),
        other => other.clone(),
    }
}

fn map_number(value: &Value, f: impl FnOnce(&Number) -> Value) -> Value {
    match value {
        Value::Number(n) => f(n),
        other => other.clone(),
    }
}

fn to_s(value: &Value) -> Value {
    match value {
        Value::String(s) => Value::String(s.clone()),
        Value::Null => Value::String(String::new()),
        other => Value::String(other.to_string()),
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.as_str().to_lowercase().chars()).collect(),
        None => String::new(),
    }
}

/// Non-finite floats have no JSON representation and become null
fn float_value(f: f64) -> Value {
    Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null)
}

fn number_to_int(n: &Number) -> Value {
    if n.is_i64() || n.is_u64() {
        return Value::Number(n.clone());
    }
    let f = n.as_f64().unwrap_or_default().trunc();
    if f >= i64::MIN as f64 && f <= i64::MAX as f64 {
        Value::from(f as i64)
    } else {
        float_value(f)
    }
}

fn round_with(n: &Number, op: fn(f64) -> f64) -> Value {
    if n.is_i64() || n.is_u64() {
        return Value::Number(n.clone());
    }
    number_to_int(&Number::from_f64(op(n.as_f64().unwrap_or_default())).unwrap_or_else(|| Number::from(0)))
}

/// Leading integer of a string, 0 when there is none
fn parse_leading_int(s: &str) -> i64 {
    let s = s.trim_start();
    let end = s
        .char_indices()
        .take_while(|(i, c)| c.is_ascii_digit() || (*i == 0 && (*c == '-' || *c == '+')))
        .map(|(i, c)| i + c.len_utf8())
        .last()
        .unwrap_or(0);
    s[..end].parse().unwrap_or(0)
}

/// Leading decimal number of a string, 0.0 when there is none
fn parse_leading_float(s: &str) -> f64 {
    let s = s.trim_start();
    let mut seen_dot = false;
    let end = s
        .char_indices()
        .take_while(|(i, c)| {
            if c.is_ascii_digit() || (*i == 0 && (*c == '-' || *c == '+')) {
                true
            } else if *c == '.' && !seen_dot {
                seen_dot = true;
                true
            } else {
                false
            }
        })
        .map(|(i, c)| i + c.len_utf8())
        .last()
        .unwrap_or(0);
    s[..end].trim_end_matches('.').parse().unwrap_or(0.0)
}

fn flatten_into(items: &[Value], out: &mut Vec<Value>) {
    for item in items {
        match item {
            Value::Array(inner) => flatten_into(inner, out),
            other => out.push(other.clone()),
        }
    }
}
