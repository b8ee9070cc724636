//! Live-cluster collaborator: enumerate the cluster's resources for the
//! catalogue's kinds so they can be validated like file manifests.

use anyhow::{Context, Result};
use kube::{
  api::{Api, DynamicObject, ListParams},
  core::{ApiResource, GroupVersionKind},
};
use serde_json::{Map, Value};

use crate::{catalogue::Gvk, version};

/// Objects applied with kubectl carry the user's pre-defaulting intent here;
/// deprecation checks should run against that, not the server-rendered
/// object.
pub const LAST_APPLIED_ANNOTATION: &str = "kubectl.kubernetes.io/last-applied-configuration";

/// The cluster operations the validator needs.
pub trait ClusterClient {
  fn server_version(&self) -> impl std::future::Future<Output = Result<String>> + Send;
  fn list_objects(
    &self,
    kinds: &[Gvk],
  ) -> impl std::future::Future<Output = Result<Vec<Map<String, Value>>>> + Send;
}

/// Kube-backed implementation using the ambient kubeconfig.
pub struct KubeClusterClient {
  client: kube::Client,
}

impl KubeClusterClient {
  pub async fn try_default() -> Result<Self> {
    let client = kube::Client::try_default()
      .await
      .context("connecting to cluster; ensure a kubeconfig is present and current")?;
    Ok(Self { client })
  }
}

impl ClusterClient for KubeClusterClient {
  async fn server_version(&self) -> Result<String> {
    let info = self
      .client
      .apiserver_version()
      .await
      .context("reading apiserver version")?;
    // the reported minor may carry a vendor suffix, e.g. "21+"
    let minor: String = info.minor.chars().take_while(|c| c.is_ascii_digit()).collect();
    version::normalize(&format!("{}.{minor}", info.major))
  }

  async fn list_objects(&self, kinds: &[Gvk]) -> Result<Vec<Map<String, Value>>> {
    let mut objects = Vec::new();
    for gvk in kinds {
      let api_gvk = GroupVersionKind::gvk(&gvk.group, &gvk.version, &gvk.kind);
      let resource = ApiResource::from_gvk(&api_gvk);
      let api: Api<DynamicObject> = Api::all_with(self.client.clone(), &resource);
      let list = match api.list(&ListParams::default()).await {
        Ok(list) => list,
        Err(err) => {
          // some kinds are schema-only or access-restricted; keep going
          tracing::warn!("unable to list {}: {err}", gvk.key());
          continue;
        }
      };
      for item in list.items {
        match applied_intent(&item) {
          Ok(Some(object)) => objects.push(object),
          Ok(None) => {}
          Err(err) => tracing::warn!("skipping an object of {}: {err:#}", gvk.key()),
        }
      }
    }
    Ok(objects)
  }
}

/// The object as the user applied it when the annotation is present,
/// otherwise the server-rendered object.
fn applied_intent(object: &DynamicObject) -> Result<Option<Map<String, Value>>> {
  if let Some(applied) = object
    .metadata
    .annotations
    .as_ref()
    .and_then(|annotations| annotations.get(LAST_APPLIED_ANNOTATION))
  {
    let parsed = serde_json::from_str(applied)
      .context("parsing last-applied-configuration annotation")?;
    return Ok(Some(parsed));
  }
  match serde_json::to_value(object).context("serializing cluster object")? {
    Value::Object(map) => Ok(Some(map)),
    _ => Ok(None),
  }
}
