//! Per-release catalogue of the loaded OpenAPI document and the process-wide
//! registry of catalogues.
//!
//! A catalogue is built in a single pass and immutable afterwards; the
//! registry publishes `Arc`s so readers never contend once a release is
//! loaded. Three views over the same schema set are kept: kind buckets
//! ordered by version (last entry is the preferred latest), component keys
//! by group/version/kind, and REST creation paths by group/version/kind.

use std::{
  cmp::Ordering,
  collections::{BTreeMap, HashMap},
  path::Path,
  sync::{Arc, RwLock},
  time::Duration,
};

use anyhow::{Context, Result, bail};
use serde::Serialize;
use serde_json::{Map, Value};
use tokio::sync::Mutex;

use crate::{
  finding::ValidationResult,
  manifest,
  openapi::{self, Document},
  validator, version,
};

/// Where a release's swagger document lives upstream.
pub fn swagger_url(release: &str) -> String {
  format!("https://raw.githubusercontent.com/kubernetes/kubernetes/release-{release}/api/openapi-spec/swagger.json")
}

const FETCH_TIMEOUT: Duration = Duration::from_secs(60);

/// A group/version/kind triple.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Gvk {
  pub group: String,
  pub version: String,
  pub kind: String,
}

impl Gvk {
  /// Canonical lower-cased lookup key: `group/version/kind`, or
  /// `version/kind` for the legacy core group.
  pub fn key(&self) -> String {
    self.api_version_of(&self.version).to_lowercase() + "/" + &self.kind.to_lowercase()
  }

  /// `group/version`, or bare `version` for the core group.
  pub fn api_version(&self) -> String {
    self.api_version_of(&self.version)
  }

  fn api_version_of(&self, version: &str) -> String {
    if self.group.is_empty() {
      version.to_string()
    } else {
      format!("{}/{}", self.group, version)
    }
  }

  /// Parse the `x-kubernetes-group-version-kind` extension value, which is
  /// either a single object or an array of them. More than one entry makes
  /// the carrier ambiguous and the caller skips it.
  pub(crate) fn from_extension(value: &Value) -> Result<Self> {
    let entry = match value {
      Value::Array(entries) => {
        if entries.len() > 1 {
          bail!("multiple x-kubernetes-group-version-kind entries");
        }
        entries.first().context("empty x-kubernetes-group-version-kind array")?
      }
      Value::Object(_) => value,
      _ => bail!("malformed x-kubernetes-group-version-kind value"),
    };
    let field = |name: &str| {
      entry
        .get(name)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
    };
    Ok(Self {
      group: field("group"),
      version: field("version"),
      kind: field("kind"),
    })
  }
}

/// One (kind, group, version) entry of the catalogue.
#[derive(Clone, Debug)]
pub struct KindInfo {
  pub group: String,
  pub version: String,
  /// Dotted key into the document's component schemas.
  pub component_key: String,
  /// Canonical creation path, `None` for schema-only entries with no write
  /// endpoint.
  pub rest_path: Option<String>,
  pub is_ga: bool,
}

impl KindInfo {
  fn gvk(&self, kind: &str) -> Gvk {
    Gvk {
      group: self.group.clone(),
      version: self.version.clone(),
      kind: kind.to_string(),
    }
  }
}

/// Indexed, immutable view of one release's OpenAPI document.
pub struct Catalogue {
  kind_index: BTreeMap<String, Vec<KindInfo>>,
  component_by_gvk: BTreeMap<String, String>,
  path_by_gvk: BTreeMap<String, String>,
  document: Document,
}

impl Catalogue {
  pub fn new(document: Document) -> Self {
    let path_by_gvk = build_path_index(&document);
    let component_by_gvk = build_component_index(&document);
    let kind_index = build_kind_index(&document, &path_by_gvk);
    Self {
      kind_index,
      component_by_gvk,
      path_by_gvk,
      document,
    }
  }

  pub fn document(&self) -> &Document {
    &self.document
  }

  /// Component key for a lower-cased `group/version/kind` key.
  pub fn component_for(&self, gvk_key: &str) -> Option<&str> {
    self.component_by_gvk.get(gvk_key).map(String::as_str)
  }

  /// Creation path for a lower-cased `group/version/kind` key.
  pub fn rest_path_for(&self, gvk_key: &str) -> Option<&str> {
    self.path_by_gvk.get(gvk_key).map(String::as_str)
  }

  /// All entries for a kind, oldest to newest.
  pub fn kind_entries(&self, kind: &str) -> Option<&[KindInfo]> {
    self.kind_index.get(&kind.to_lowercase()).map(Vec::as_slice)
  }

  /// The preferred (newest) entry for a kind.
  pub fn latest_for_kind(&self, kind: &str) -> Option<&KindInfo> {
    self.kind_entries(kind).and_then(<[KindInfo]>::last)
  }

  pub fn has_kind(&self, kind: &str) -> bool {
    self.kind_index.contains_key(&kind.to_lowercase())
  }

  /// Whether the release still serves a write endpoint for this version of
  /// the kind.
  pub fn is_version_supported(&self, api_version: &str, kind: &str) -> bool {
    let key = format!("{api_version}/{kind}").to_lowercase();
    self.path_by_gvk.contains_key(&key)
  }

  /// The latest group/version/kind of every kind in the release.
  pub fn kinds(&self) -> Vec<Gvk> {
    self
      .kind_index
      .iter()
      .filter_map(|(kind, bucket)| bucket.last().map(|info| info.gvk(kind)))
      .collect()
  }

  pub fn validate_yaml(&self, input: &str) -> Result<ValidationResult> {
    let object = manifest::parse_document(input)?.context("missing Kubernetes object")?;
    Ok(self.validate_object(&object))
  }

  pub fn validate_json(&self, input: &str) -> Result<ValidationResult> {
    let object: Map<String, Value> =
      serde_json::from_str(input).context("parsing JSON document")?;
    Ok(self.validate_object(&object))
  }

  pub fn validate_object(&self, object: &Map<String, Value>) -> ValidationResult {
    validator::validate_object(self, object)
  }
}

fn build_path_index(document: &Document) -> BTreeMap<String, String> {
  let mut paths = BTreeMap::new();
  for (path, item) in &document.paths {
    // creation endpoints always target a concrete kind; PUT only backstops
    // resources without one
    let Some(operation) = item.post.as_ref().or(item.put.as_ref()) else {
      continue;
    };
    let Some(extension) = operation.gvk.as_ref() else {
      continue;
    };
    let Ok(gvk) = Gvk::from_extension(extension) else {
      continue;
    };
    paths.insert(gvk.key(), path.clone());
  }
  paths
}

fn build_component_index(document: &Document) -> BTreeMap<String, String> {
  let mut components = BTreeMap::new();
  for (component, schema) in &document.components.schemas {
    let Some(extension) = schema.gvk.as_ref() else {
      continue;
    };
    let Ok(gvk) = Gvk::from_extension(extension) else {
      continue;
    };
    components.insert(gvk.key(), component.clone());
  }
  components
}

fn build_kind_index(
  document: &Document,
  path_by_gvk: &BTreeMap<String, String>,
) -> BTreeMap<String, Vec<KindInfo>> {
  let mut index: BTreeMap<String, Vec<KindInfo>> = BTreeMap::new();
  for (component, schema) in &document.components.schemas {
    let Some(extension) = schema.gvk.as_ref() else {
      continue;
    };
    let Ok(gvk) = Gvk::from_extension(extension) else {
      // ambiguous carriers (multi-entry extension) are skipped
      continue;
    };
    let info = KindInfo {
      group: gvk.group.clone(),
      version: gvk.version.clone(),
      component_key: component.clone(),
      rest_path: path_by_gvk.get(&gvk.key()).cloned(),
      is_ga: version::version_type(&gvk.version) == version::VersionType::Ga,
    };
    index.entry(gvk.kind.to_lowercase()).or_default().push(info);
  }
  for bucket in index.values_mut() {
    bucket.sort_by(cmp_kind_info);
  }
  index
}

/// Ordering for kind buckets: entries in the legacy `extensions` group sort
/// first (they always lose), then by version tuple. Equal tuples keep their
/// input order through the stable sort.
fn cmp_kind_info(lhs: &KindInfo, rhs: &KindInfo) -> Ordering {
  match (
    version::is_extension(&lhs.component_key),
    version::is_extension(&rhs.component_key),
  ) {
    (true, false) => Ordering::Less,
    (false, true) => Ordering::Greater,
    _ => version::cmp_version_token(&lhs.version, &rhs.version).unwrap_or(Ordering::Equal),
  }
}

/// Process-wide map of release to catalogue.
///
/// Loading is exclusive: a second loader for the same release waits for the
/// first and then reuses its result. Published catalogues are immutable;
/// `force` is the only replacement path.
pub struct Registry {
  catalogues: RwLock<HashMap<String, Arc<Catalogue>>>,
  load_lock: Mutex<()>,
  http: reqwest::Client,
}

impl Registry {
  pub fn new(insecure_skip_tls_verify: bool) -> Result<Self> {
    let http = reqwest::Client::builder()
      .timeout(FETCH_TIMEOUT)
      .danger_accept_invalid_certs(insecure_skip_tls_verify)
      .build()
      .context("building HTTP client")?;
    Ok(Self {
      catalogues: RwLock::new(HashMap::new()),
      load_lock: Mutex::new(()),
      http,
    })
  }

  /// The already-published catalogue for a release, if any.
  pub fn get(&self, release: &str) -> Option<Arc<Catalogue>> {
    self
      .catalogues
      .read()
      .expect("catalogue registry lock poisoned")
      .get(release)
      .cloned()
  }

  pub async fn load_from_url(&self, release: &str, force: bool) -> Result<Arc<Catalogue>> {
    if !force && let Some(existing) = self.get(release) {
      return Ok(existing);
    }
    let _exclusive = self.load_lock.lock().await;
    if !force && let Some(existing) = self.get(release) {
      return Ok(existing);
    }

    let url = swagger_url(release);
    tracing::info!("fetching OpenAPI document for release {release}");
    let data = self
      .http
      .get(&url)
      .send()
      .await
      .and_then(reqwest::Response::error_for_status)
      .with_context(|| format!("fetching {url}"))?
      .bytes()
      .await
      .with_context(|| format!("reading response body from {url}"))?;

    self.install(release, &data)
  }

  pub async fn load_from_path(&self, release: &str, path: &Path, force: bool) -> Result<Arc<Catalogue>> {
    if !force && let Some(existing) = self.get(release) {
      return Ok(existing);
    }
    let _exclusive = self.load_lock.lock().await;
    if !force && let Some(existing) = self.get(release) {
      return Ok(existing);
    }

    let data = std::fs::read(path)
      .with_context(|| format!("reading OpenAPI document from {}", path.display()))?;
    self.install(release, &data)
  }

  fn install(&self, release: &str, data: &[u8]) -> Result<Arc<Catalogue>> {
    let document = openapi::load_document(data)
      .with_context(|| format!("loading OpenAPI document for release {release}"))?;
    let catalogue = Arc::new(Catalogue::new(document));
    self
      .catalogues
      .write()
      .expect("catalogue registry lock poisoned")
      .insert(release.to_string(), Arc::clone(&catalogue));
    Ok(catalogue)
  }

  pub async fn validate_yaml(&self, input: &str, release: &str) -> Result<ValidationResult> {
    let catalogue = self.load_from_url(release, false).await?;
    catalogue.validate_yaml(input)
  }

  pub async fn validate_json(&self, input: &str, release: &str) -> Result<ValidationResult> {
    let catalogue = self.load_from_url(release, false).await?;
    catalogue.validate_json(input)
  }

  pub async fn validate_object(
    &self,
    object: &Map<String, Value>,
    release: &str,
  ) -> Result<ValidationResult> {
    let catalogue = self.load_from_url(release, false).await?;
    Ok(catalogue.validate_object(object))
  }

  /// The latest group/version/kind of every kind in the release.
  pub async fn get_kinds(&self, release: &str) -> Result<Vec<Gvk>> {
    let catalogue = self.load_from_url(release, false).await?;
    Ok(catalogue.kinds())
  }

  /// Whether the release still serves this version of the kind. `false`
  /// when the release is not loaded.
  pub fn is_version_supported(&self, release: &str, api_version: &str, kind: &str) -> bool {
    self
      .get(release)
      .map(|catalogue| catalogue.is_version_supported(api_version, kind))
      .unwrap_or(false)
  }
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;
  use crate::openapi::load_document;

  const DOCUMENT: &str = r##"{
    "definitions": {
      "io.k8s.api.apps.v1.Deployment": {
        "type": "object",
        "x-kubernetes-group-version-kind": [
          {"group": "apps", "version": "v1", "kind": "Deployment"}
        ]
      },
      "io.k8s.api.apps.v1beta2.Deployment": {
        "type": "object",
        "x-kubernetes-group-version-kind": [
          {"group": "apps", "version": "v1beta2", "kind": "Deployment"}
        ]
      },
      "io.k8s.api.extensions.v1beta1.Deployment": {
        "type": "object",
        "x-kubernetes-group-version-kind": [
          {"group": "extensions", "version": "v1beta1", "kind": "Deployment"}
        ]
      },
      "io.k8s.api.core.v1.Service": {
        "type": "object",
        "x-kubernetes-group-version-kind": [
          {"group": "", "version": "v1", "kind": "Service"}
        ]
      },
      "io.k8s.apimachinery.pkg.apis.meta.v1.WatchEvent": {
        "type": "object",
        "x-kubernetes-group-version-kind": [
          {"group": "", "version": "v1", "kind": "WatchEvent"},
          {"group": "apps", "version": "v1", "kind": "WatchEvent"}
        ]
      }
    },
    "paths": {
      "/apis/apps/v1/namespaces/{namespace}/deployments": {
        "post": {
          "x-kubernetes-group-version-kind": {"group": "apps", "version": "v1", "kind": "Deployment"}
        }
      },
      "/apis/extensions/v1beta1/namespaces/{namespace}/deployments": {
        "post": {
          "x-kubernetes-group-version-kind": {"group": "extensions", "version": "v1beta1", "kind": "Deployment"}
        },
        "put": {
          "x-kubernetes-group-version-kind": {"group": "extensions", "version": "v1beta1", "kind": "IgnoredWhenPostExists"}
        }
      },
      "/api/v1/namespaces/{namespace}/services": {
        "put": {
          "x-kubernetes-group-version-kind": {"group": "", "version": "v1", "kind": "Service"}
        }
      }
    }
  }"##;

  fn catalogue() -> Catalogue {
    Catalogue::new(load_document(DOCUMENT.as_bytes()).unwrap())
  }

  #[test]
  fn gvk_key_forms() {
    let core = Gvk {
      group: String::new(),
      version: "v1".to_string(),
      kind: "Pod".to_string(),
    };
    assert_eq!(core.key(), "v1/pod");
    assert_eq!(core.api_version(), "v1");

    let apps = Gvk {
      group: "apps".to_string(),
      version: "v1".to_string(),
      kind: "Deployment".to_string(),
    };
    assert_eq!(apps.key(), "apps/v1/deployment");
    assert_eq!(apps.api_version(), "apps/v1");
  }

  #[test]
  fn gvk_extension_object_and_single_array() {
    let object = json!({"group": "apps", "version": "v1", "kind": "Deployment"});
    assert_eq!(Gvk::from_extension(&object).unwrap().key(), "apps/v1/deployment");

    let array = json!([{"group": "", "version": "v1", "kind": "Service"}]);
    assert_eq!(Gvk::from_extension(&array).unwrap().key(), "v1/service");
  }

  #[test]
  fn gvk_extension_rejects_multiple_entries() {
    let value = json!([
      {"group": "", "version": "v1", "kind": "WatchEvent"},
      {"group": "apps", "version": "v1", "kind": "WatchEvent"}
    ]);
    assert!(Gvk::from_extension(&value).is_err());
  }

  #[test]
  fn post_wins_over_put() {
    let catalogue = catalogue();
    assert_eq!(
      catalogue.rest_path_for("extensions/v1beta1/deployment"),
      Some("/apis/extensions/v1beta1/namespaces/{namespace}/deployments")
    );
    // a PUT-only path still registers
    assert_eq!(
      catalogue.rest_path_for("v1/service"),
      Some("/api/v1/namespaces/{namespace}/services")
    );
  }

  #[test]
  fn kind_buckets_order_extensions_first_and_latest_last() {
    let catalogue = catalogue();
    let bucket = catalogue.kind_entries("Deployment").unwrap();
    let keys: Vec<&str> = bucket.iter().map(|info| info.component_key.as_str()).collect();
    assert_eq!(
      keys,
      vec![
        "io.k8s.api.extensions.v1beta1.Deployment",
        "io.k8s.api.apps.v1beta2.Deployment",
        "io.k8s.api.apps.v1.Deployment",
      ]
    );
    assert_eq!(
      catalogue.latest_for_kind("deployment").unwrap().component_key,
      "io.k8s.api.apps.v1.Deployment"
    );
  }

  #[test]
  fn last_entry_is_maximal_under_the_comparator() {
    let catalogue = catalogue();
    for bucket in catalogue.kind_index.values() {
      let last = bucket.last().unwrap();
      for other in bucket.iter() {
        assert_ne!(
          cmp_kind_info(last, other),
          Ordering::Less,
          "{} sorts below {}",
          last.component_key,
          other.component_key
        );
      }
    }
  }

  #[test]
  fn ambiguous_extension_carriers_are_skipped() {
    let catalogue = catalogue();
    assert!(!catalogue.has_kind("WatchEvent"));
  }

  #[test]
  fn path_index_is_subset_of_component_index() {
    let catalogue = catalogue();
    for key in catalogue.path_by_gvk.keys() {
      assert!(
        catalogue.component_by_gvk.contains_key(key),
        "{key} has a path but no component"
      );
    }
  }

  #[test]
  fn schema_only_entries_have_no_rest_path() {
    let catalogue = catalogue();
    let bucket = catalogue.kind_entries("deployment").unwrap();
    let v1beta2 = bucket
      .iter()
      .find(|info| info.version == "v1beta2")
      .unwrap();
    assert!(v1beta2.rest_path.is_none());
    let v1 = bucket.iter().find(|info| info.version == "v1").unwrap();
    assert!(v1.rest_path.is_some());
    assert!(v1.is_ga);
  }

  #[test]
  fn is_version_supported_uses_rest_paths() {
    let catalogue = catalogue();
    assert!(catalogue.is_version_supported("apps/v1", "Deployment"));
    assert!(catalogue.is_version_supported("extensions/v1beta1", "deployment"));
    // schema-only: no write endpoint in this release
    assert!(!catalogue.is_version_supported("apps/v1beta2", "Deployment"));
    assert!(!catalogue.is_version_supported("batch/v1", "Job"));
  }

  #[test]
  fn kinds_lists_latest_per_kind() {
    let catalogue = catalogue();
    let kinds = catalogue.kinds();
    let deployment = kinds.iter().find(|gvk| gvk.kind == "deployment").unwrap();
    assert_eq!(deployment.group, "apps");
    assert_eq!(deployment.version, "v1");
    assert!(kinds.iter().any(|gvk| gvk.kind == "service"));
  }
}
