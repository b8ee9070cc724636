//! Typed model of the release OpenAPI document and the normalisation
//! pipeline that prepares it for the catalogue.
//!
//! The upstream swagger document is OpenAPI v2. Loading converts it to the
//! v3 component layout and applies the Kubernetes fixups as operations on
//! the parsed structure: the `int-or-string` format annotation is dropped
//! before parsing-level validation, the IntOrString component is replaced
//! with a string/integer union, and every component schema is closed against
//! unknown fields (Kubernetes schemas list all valid fields explicitly).

use std::collections::BTreeMap;

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use serde_json::Value;

/// Component key of the Kubernetes int-or-string union type.
pub const INT_OR_STRING: &str = "io.k8s.apimachinery.pkg.util.intstr.IntOrString";

const DEFINITIONS_PREFIX: &str = "#/definitions/";
const COMPONENTS_PREFIX: &str = "#/components/schemas/";

/// References may chain component-to-component; anything deeper than this is
/// a cycle.
const MAX_REFERENCE_DEPTH: usize = 32;

/// The subset of an OpenAPI schema object the validator and walker consume.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct Schema {
  #[serde(rename = "$ref")]
  pub reference: Option<String>,
  #[serde(rename = "type")]
  pub schema_type: Option<String>,
  pub format: Option<String>,
  pub description: Option<String>,
  #[serde(default)]
  pub properties: BTreeMap<String, Schema>,
  pub items: Option<Box<Schema>>,
  #[serde(default)]
  pub required: Vec<String>,
  #[serde(rename = "additionalProperties")]
  pub additional_properties: Option<Box<AdditionalProperties>>,
  #[serde(rename = "oneOf", default)]
  pub one_of: Vec<Schema>,
  #[serde(rename = "x-kubernetes-group-version-kind")]
  pub gvk: Option<Value>,
}

impl Schema {
  pub fn typed(schema_type: &str) -> Self {
    Self {
      schema_type: Some(schema_type.to_string()),
      ..Self::default()
    }
  }
}

/// `additionalProperties` is either a boolean switch or a schema for the
/// map values.
#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
pub enum AdditionalProperties {
  Allowed(bool),
  Schema(Schema),
}

/// A REST operation; only the group/version/kind extension matters here.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct Operation {
  #[serde(rename = "x-kubernetes-group-version-kind")]
  pub gvk: Option<Value>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct PathItem {
  pub get: Option<Operation>,
  pub put: Option<Operation>,
  pub post: Option<Operation>,
}

/// The incoming OpenAPI v2 (swagger) document.
#[derive(Debug, Deserialize)]
struct SwaggerDocument {
  #[serde(default)]
  definitions: BTreeMap<String, Schema>,
  #[serde(default)]
  paths: BTreeMap<String, PathItem>,
}

#[derive(Debug, Default)]
pub struct Components {
  pub schemas: BTreeMap<String, Schema>,
}

/// The normalised document: v3 component layout, fixups applied.
#[derive(Debug, Default)]
pub struct Document {
  pub components: Components,
  pub paths: BTreeMap<String, PathItem>,
}

impl Document {
  /// Look up a component schema by its dotted key.
  pub fn schema(&self, component_key: &str) -> Option<&Schema> {
    self.components.schemas.get(component_key)
  }

  /// Follow `$ref` chains until an inline schema is reached.
  pub fn resolve<'a>(&'a self, schema: &'a Schema) -> Result<&'a Schema> {
    let mut current = schema;
    for _ in 0..MAX_REFERENCE_DEPTH {
      let Some(reference) = current.reference.as_deref() else {
        return Ok(current);
      };
      let Some(name) = reference.strip_prefix(COMPONENTS_PREFIX) else {
        bail!("unsupported reference '{reference}'");
      };
      current = self
        .schema(name)
        .with_context(|| format!("unresolvable reference '{reference}'"))?;
    }
    bail!("reference cycle while resolving schema");
  }

  /// Every reference in the document must point at an existing component.
  pub fn validate(&self) -> Result<()> {
    for (name, schema) in &self.components.schemas {
      self
        .validate_schema(schema)
        .with_context(|| format!("component schema '{name}'"))?;
    }
    Ok(())
  }

  fn validate_schema(&self, schema: &Schema) -> Result<()> {
    if let Some(reference) = schema.reference.as_deref() {
      let Some(name) = reference.strip_prefix(COMPONENTS_PREFIX) else {
        bail!("unsupported reference '{reference}'");
      };
      if self.schema(name).is_none() {
        bail!("unresolvable reference '{reference}'");
      }
    }
    for property in schema.properties.values() {
      self.validate_schema(property)?;
    }
    if let Some(items) = schema.items.as_deref() {
      self.validate_schema(items)?;
    }
    for alternative in &schema.one_of {
      self.validate_schema(alternative)?;
    }
    if let Some(additional) = schema.additional_properties.as_deref()
      && let AdditionalProperties::Schema(value_schema) = additional
    {
      self.validate_schema(value_schema)?;
    }
    Ok(())
  }
}

/// Run the full normalisation pipeline over raw swagger bytes.
pub fn load_document(data: &[u8]) -> Result<Document> {
  let mut swagger: SwaggerDocument =
    serde_json::from_slice(data).context("parsing OpenAPI v2 (swagger) document")?;
  if swagger.definitions.is_empty() {
    bail!("document contains no schema definitions");
  }

  // The int-or-string format annotation is rejected by strict loaders and
  // carries no information the replacement union does not.
  if let Some(int_or_string) = swagger.definitions.get_mut(INT_OR_STRING) {
    int_or_string.format = None;
  }

  let mut document = to_components_layout(swagger);
  document
    .validate()
    .context("converted document failed validation")?;

  document
    .components
    .schemas
    .insert(INT_OR_STRING.to_string(), int_or_string_schema());
  document
    .validate()
    .context("document failed validation after IntOrString rewrite")?;

  for schema in document.components.schemas.values_mut() {
    schema.additional_properties = Some(Box::new(AdditionalProperties::Allowed(false)));
  }

  Ok(document)
}

/// v2 -> v3: definitions become components and references are rewritten.
fn to_components_layout(swagger: SwaggerDocument) -> Document {
  let mut schemas = swagger.definitions;
  for schema in schemas.values_mut() {
    rewrite_references(schema);
  }
  Document {
    components: Components { schemas },
    paths: swagger.paths,
  }
}

fn rewrite_references(schema: &mut Schema) {
  if let Some(reference) = schema.reference.as_mut()
    && let Some(name) = reference.strip_prefix(DEFINITIONS_PREFIX)
  {
    *reference = format!("{COMPONENTS_PREFIX}{name}");
  }
  for property in schema.properties.values_mut() {
    rewrite_references(property);
  }
  if let Some(items) = schema.items.as_mut() {
    rewrite_references(items);
  }
  for alternative in schema.one_of.iter_mut() {
    rewrite_references(alternative);
  }
  if let Some(additional) = schema.additional_properties.as_mut()
    && let AdditionalProperties::Schema(value_schema) = additional.as_mut()
  {
    rewrite_references(value_schema);
  }
}

fn int_or_string_schema() -> Schema {
  Schema {
    one_of: vec![Schema::typed("string"), Schema::typed("integer")],
    ..Schema::default()
  }
}
