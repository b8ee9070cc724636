use serde::{Deserialize, Serialize};

/// A single validation or deprecation finding against one field.
///
/// `reason` carries the schema description or structural error text verbatim
/// so sinks can print it unmodified.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
  /// Dotted traversal path from the resource root, `[i]` for array indices.
  pub path: String,
  /// The field the finding anchors to.
  pub field: String,
  pub reason: String,
}

impl Finding {
  pub fn new(path: impl Into<String>, field: impl Into<String>, reason: impl Into<String>) -> Self {
    Self {
      path: path.into(),
      field: field.into(),
      reason: reason.into(),
    }
  }
}

/// Join traversal segments into a dotted path; `[i]` segments attach to the
/// preceding segment.
pub(crate) fn join_path(segments: &[String]) -> String {
  let mut joined = String::new();
  for segment in segments {
    if segment.starts_with('[') {
      joined.push_str(segment);
    } else {
      if !joined.is_empty() {
        joined.push('.');
      }
      joined.push_str(segment);
    }
  }
  joined
}

/// Whether the declared API version is still served by the target release.
/// `Unknown` until the batch support-status pass has run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SupportStatus {
  #[default]
  Unknown,
  Supported,
  Unsupported,
}

/// The validation verdict for a single resource.
///
/// Created by the validator and never mutated after being handed to a sink,
/// except for `is_version_supported` which the batch pass fills in.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
  pub file_name: String,
  pub kind: String,
  pub api_version: String,
  pub resource_name: String,
  pub resource_namespace: String,
  pub validated_against_schema: bool,
  pub deleted: bool,
  pub deprecated: bool,
  /// `group/version` of the preferred replacement, empty when the declared
  /// version already is the latest.
  pub latest_api_version: String,
  pub errors_for_original: Vec<Finding>,
  pub deprecation_for_original: Vec<Finding>,
  pub errors_for_latest: Vec<Finding>,
  pub deprecation_for_latest: Vec<Finding>,
  pub is_version_supported: SupportStatus,
}

impl ValidationResult {
  /// `apiVersion/kind` of this result
  pub fn version_kind(&self) -> String {
    format!("{}/{}", self.api_version, self.kind)
  }

  /// The `[namespace.]name` of the resource
  pub fn qualified_name(&self) -> String {
    if self.resource_name.is_empty() {
      "unknown".to_string()
    } else if self.resource_namespace.is_empty() {
      self.resource_name.clone()
    } else {
      format!("{}.{}", self.resource_namespace, self.resource_name)
    }
  }

  /// Structural errors in the original-version pass decide the exit code
  pub fn has_errors(&self) -> bool {
    !self.errors_for_original.is_empty()
  }

  /// Minimal result for a document that could not be parsed at all.
  pub fn parse_failure(file_name: &str, reason: &str) -> Self {
    Self {
      file_name: file_name.to_string(),
      errors_for_original: vec![Finding::new("", "", reason)],
      ..Self::default()
    }
  }
}
