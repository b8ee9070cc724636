//! Deprecation walker: a recursive descent over a resource value driven by
//! its schema, reporting every field whose schema description carries the
//! deprecation marker. Structural checking is a separate pass; the walker
//! only reads descriptions.

use serde_json::Value;

use crate::{
  finding::{Finding, join_path},
  openapi::{Document, Schema},
};

const DEPRECATION_MARKER: &str = "deprecated";

/// Nesting bound; Kubernetes objects are shallow, anything deeper is a
/// reference cycle the resolver missed.
const MAX_DEPTH: usize = 64;

/// Walk `value` against `schema`, collecting deprecation findings in
/// traversal order. `key` is the caller-supplied name for the root value,
/// conventionally the schema component key.
pub fn visit(document: &Document, key: &str, schema: &Schema, value: &Value) -> Vec<Finding> {
  let mut findings = Vec::new();
  let mut segments = Vec::new();
  walk(document, key, schema, value, &mut segments, &mut findings, 0);
  findings
}

fn walk(
  document: &Document,
  field: &str,
  schema: &Schema,
  value: &Value,
  segments: &mut Vec<String>,
  findings: &mut Vec<Finding>,
  depth: usize,
) {
  if depth > MAX_DEPTH {
    return;
  }
  let Ok(schema) = document.resolve(schema) else {
    return;
  };

  match value {
    Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_) => {
      if let Some(reason) = deprecation_of(schema) {
        findings.push(Finding::new(join_path(segments), field, reason));
      }
    }
    Value::Array(elements) => {
      let Some(items) = schema.items.as_deref() else {
        return;
      };
      for (index, element) in elements.iter().enumerate() {
        segments.push(format!("[{index}]"));
        walk(document, field, items, element, segments, findings, depth + 1);
        segments.pop();
      }
    }
    Value::Object(object) => {
      if let Some(reason) = deprecation_of(schema) {
        findings.push(Finding::new(join_path(segments), field, reason));
      }
      // properties the schema does not declare are the structural
      // validator's concern
      for (property, nested) in object {
        let Some(property_schema) = schema.properties.get(property) else {
          continue;
        };
        segments.push(property.clone());
        walk(document, property, property_schema, nested, segments, findings, depth + 1);
        segments.pop();
      }
    }
  }
}

fn deprecation_of(schema: &Schema) -> Option<String> {
  let description = schema.description.as_deref()?;
  if description.to_lowercase().contains(DEPRECATION_MARKER) {
    Some(description.to_string())
  } else {
    None
  }
}
