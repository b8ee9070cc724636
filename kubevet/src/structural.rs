//! Structural validation of a resource value against its schema, always in
//! multi-error mode: the walk continues past failures and reports every
//! violation it can reach.
//!
//! Formats (`int32`, `byte`, `date-time`, ...) are deliberately not
//! enforced; the int-or-string union is rewritten by the loader and the
//! remaining formats over-restrict real manifests.

use serde_json::Value;

use crate::{
  finding::{Finding, join_path},
  openapi::{AdditionalProperties, Document, Schema},
};

const MAX_DEPTH: usize = 64;

/// Validate `value` against `schema`, returning every structural violation.
pub fn validate(document: &Document, schema: &Schema, value: &Value) -> Vec<Finding> {
  let mut errors = Vec::new();
  let mut segments = Vec::new();
  check(document, schema, value, &mut segments, &mut errors, 0);
  errors
}

fn check(
  document: &Document,
  schema: &Schema,
  value: &Value,
  segments: &mut Vec<String>,
  errors: &mut Vec<Finding>,
  depth: usize,
) {
  if depth > MAX_DEPTH {
    errors.push(error_at(segments, "schema nesting exceeds the supported depth"));
    return;
  }
  let schema = match document.resolve(schema) {
    Ok(schema) => schema,
    Err(err) => {
      errors.push(error_at(segments, &format!("{err:#}")));
      return;
    }
  };

  if !schema.one_of.is_empty() {
    let matches = schema
      .one_of
      .iter()
      .filter(|alternative| validates_cleanly(document, alternative, value, depth))
      .count();
    if matches != 1 {
      errors.push(error_at(segments, "value does not match exactly one of the expected alternatives"));
    }
    return;
  }

  if value.is_null() {
    errors.push(error_at(segments, "value is not nullable"));
    return;
  }

  if let Some(expected) = schema.schema_type.as_deref() {
    let matched = match expected {
      "string" => value.is_string(),
      "integer" => value.as_i64().is_some() || value.as_u64().is_some(),
      "number" => value.is_number(),
      "boolean" => value.is_boolean(),
      "array" => value.is_array(),
      "object" => value.is_object(),
      _ => true,
    };
    if !matched {
      errors.push(error_at(
        segments,
        &format!("expected {expected}, found {}", type_name(value)),
      ));
      return;
    }
  }

  match value {
    Value::Array(elements) => {
      let Some(items) = schema.items.as_deref() else {
        return;
      };
      for (index, element) in elements.iter().enumerate() {
        segments.push(format!("[{index}]"));
        check(document, items, element, segments, errors, depth + 1);
        segments.pop();
      }
    }
    Value::Object(object) => {
      for required in &schema.required {
        if !object.contains_key(required) {
          errors.push(error_at(segments, &format!("missing required property \"{required}\"")));
        }
      }
      for (property, nested) in object {
        if let Some(property_schema) = schema.properties.get(property) {
          segments.push(property.clone());
          check(document, property_schema, nested, segments, errors, depth + 1);
          segments.pop();
          continue;
        }
        match schema.additional_properties.as_deref() {
          Some(AdditionalProperties::Allowed(false)) => {
            segments.push(property.clone());
            errors.push(error_at(segments, &format!("property \"{property}\" is unsupported")));
            segments.pop();
          }
          Some(AdditionalProperties::Schema(value_schema)) => {
            segments.push(property.clone());
            check(document, value_schema, nested, segments, errors, depth + 1);
            segments.pop();
          }
          Some(AdditionalProperties::Allowed(true)) | None => {}
        }
      }
    }
    _ => {}
  }
}

fn validates_cleanly(document: &Document, schema: &Schema, value: &Value, depth: usize) -> bool {
  let mut scratch = Vec::new();
  let mut segments = Vec::new();
  check(document, schema, value, &mut segments, &mut scratch, depth + 1);
  scratch.is_empty()
}

fn error_at(segments: &[String], reason: &str) -> Finding {
  let field = segments
    .iter()
    .rev()
    .find(|segment| !segment.starts_with('['))
    .cloned()
    .unwrap_or_default();
  Finding::new(join_path(segments), field, reason)
}

fn type_name(value: &Value) -> &'static str {
  match value {
    Value::Null => "null",
    Value::Bool(_) => "boolean",
    Value::Number(_) => "number",
    Value::String(_) => "string",
    Value::Array(_) => "array",
    Value::Object(_) => "object",
  }
}
