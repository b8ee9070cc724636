//! The dual-version validator: resolve the declared and the preferred-latest
//! schemas for a resource, run the deprecation walker and the structural
//! validator against both, and classify the declared version as supported,
//! deprecated or deleted.

use std::collections::HashMap;

use serde_json::{Map, Value};

use crate::{
  catalogue::{Catalogue, Gvk},
  finding::{Finding, SupportStatus, ValidationResult},
  structural, walker,
};

/// Namespace recorded when the manifest does not set one.
const UNDEFINED_NAMESPACE: &str = "undefined";

/// Validate one resource object against the release catalogue.
pub fn validate_object(catalogue: &Catalogue, object: &Map<String, Value>) -> ValidationResult {
  let mut result = ValidationResult::default();

  let kind = field_str(object, "kind");
  // a missing apiVersion resolves through the legacy core group
  let api_version = object
    .get("apiVersion")
    .and_then(Value::as_str)
    .unwrap_or("v1")
    .to_string();
  let metadata = object.get("metadata").and_then(Value::as_object);
  let name = metadata.map(|m| field_str(m, "name")).unwrap_or_default();
  let namespace = metadata
    .and_then(|m| m.get("namespace"))
    .and_then(Value::as_str)
    .unwrap_or(UNDEFINED_NAMESPACE)
    .to_string();

  result.kind = kind.clone();
  result.api_version = api_version.clone();
  result.resource_name = name.clone();
  result.resource_namespace = namespace;

  if kind.is_empty() {
    result
      .errors_for_original
      .push(Finding::new("", "kind", "missing kind"));
    return result;
  }
  if name.is_empty() {
    result
      .errors_for_original
      .push(Finding::new("metadata", "name", "missing resource name"));
    return result;
  }

  // the declared version only counts while the release still serves it
  let gvk_key = format!("{api_version}/{kind}").to_lowercase();
  let original = if catalogue.rest_path_for(&gvk_key).is_some() {
    catalogue.component_for(&gvk_key).unwrap_or_default().to_string()
  } else {
    String::new()
  };
  let latest = catalogue
    .latest_for_kind(&kind)
    .map(|info| info.component_key.clone())
    .unwrap_or_default();

  let value = Value::Object(object.clone());

  if !original.is_empty() {
    let (deprecations, errors) = apply_schema(catalogue, &original, &value);
    result.deprecated = !deprecations.is_empty();
    result.deprecation_for_original = deprecations;
    result.errors_for_original = errors;
    result.validated_against_schema = true;
  }

  if !latest.is_empty() && latest != original {
    let (deprecations, errors) = apply_schema(catalogue, &latest, &value);
    result.deprecation_for_latest = deprecations;
    result.errors_for_latest = errors;
    result.latest_api_version = api_version_of_component(catalogue, &latest);
    result.validated_against_schema = true;
  }

  if original.is_empty() {
    if latest.is_empty() {
      // unknown kind: nothing to validate against, the caller decides how
      // strict to be
      result.validated_against_schema = true;
    } else {
      result.deleted = true;
    }
  }

  result
}

/// Two-pass application of one component schema: deprecation findings first,
/// then structural errors.
fn apply_schema(
  catalogue: &Catalogue,
  component_key: &str,
  value: &Value,
) -> (Vec<Finding>, Vec<Finding>) {
  let document = catalogue.document();
  let Some(schema) = document.schema(component_key) else {
    // the indices promised this component; its absence is a loader bug
    let missing = Finding::new(
      "",
      component_key,
      format!("schema component '{component_key}' is missing from the release document"),
    );
    return (Vec::new(), vec![missing]);
  };

  let deprecations = walker::visit(document, component_key, schema, value);
  let errors = structural::validate(document, schema, value);
  (deprecations, errors)
}

/// `group/version` of a component schema, read from its GVK extension.
fn api_version_of_component(catalogue: &Catalogue, component_key: &str) -> String {
  catalogue
    .document()
    .schema(component_key)
    .and_then(|schema| schema.gvk.as_ref())
    .and_then(|extension| Gvk::from_extension(extension).ok())
    .map(|gvk| gvk.api_version())
    .unwrap_or_default()
}

/// Batch pass filling `is_version_supported` for every result, caching the
/// lookup per `apiVersion/kind` pair.
pub fn fill_support_status(catalogue: &Catalogue, results: &mut [ValidationResult]) {
  let mut cache: HashMap<String, bool> = HashMap::new();
  for result in results {
    if result.kind.is_empty() {
      continue;
    }
    let key = result.version_kind().to_lowercase();
    let supported = *cache
      .entry(key)
      .or_insert_with(|| catalogue.is_version_supported(&result.api_version, &result.kind));
    result.is_version_supported = if supported {
      SupportStatus::Supported
    } else {
      SupportStatus::Unsupported
    };
  }
}

fn field_str(object: &Map<String, Value>, field: &str) -> String {
  object
    .get(field)
    .and_then(Value::as_str)
    .unwrap_or_default()
    .to_string()
}
