//! Semantic comparison of object sections.
//!
//! Two values are equal when they would round-trip to the same typed object:
//! key order does not matter, zero values (`null`, missing, `{}`, `[]`)
//! are interchangeable and numbers compare by value. Array order matters.

use serde_json::{Map, Number, Value};
use vsync_core::Object;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aspect {
    Spec,
    Status,
}

impl Aspect {
    pub fn as_str(&self) -> &'static str {
        match self {
            Aspect::Spec => "spec",
            Aspect::Status => "status",
        }
    }

    pub fn section<'a>(&self, object: &'a Object) -> &'a Value {
        match self {
            Aspect::Spec => &object.spec,
            Aspect::Status => &object.status,
        }
    }
}

impl std::fmt::Display for Aspect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returns true when `aspect` of `source` and `target` is semantically different.
pub fn differs_on(aspect: Aspect, source: &Object, target: &Object) -> bool {
    !semantic_eq(aspect.section(source), aspect.section(target))
}

pub fn semantic_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Object(a), Value::Object(b)) => maps_eq(a, b),
        (Value::Array(a), Value::Array(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| semantic_eq(x, y))
        }
        (Value::Number(a), Value::Number(b)) => numbers_eq(a, b),
        (Value::String(a), Value::String(b)) => a == b,
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (a, b) => is_zero(a) && is_zero(b),
    }
}

fn maps_eq(a: &Map<String, Value>, b: &Map<String, Value>) -> bool {
    let missing = Value::Null;
    a.keys().chain(b.keys()).all(|key| {
        semantic_eq(
            a.get(key).unwrap_or(&missing),
            b.get(key).unwrap_or(&missing),
        )
    })
}

fn numbers_eq(a: &Number, b: &Number) -> bool {
    if let (Some(x), Some(y)) = (a.as_i64(), b.as_i64()) {
        return x == y;
    }
    if let (Some(x), Some(y)) = (a.as_u64(), b.as_u64()) {
        return x == y;
    }
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x == y,
        _ => false,
    }
}

fn is_zero(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.values().all(is_zero),
        _ => false,
    }
}
