use anyhow::{Result, bail};
use kubevet::catalogue::Gvk;
use kubevet::cluster::ClusterClient;
use serde_json::{Map, Value};

/// In-memory stand-in for a running cluster.
#[derive(Default)]
pub struct MockClusterClient {
  /// `None` simulates an apiserver whose version endpoint is unreadable.
  pub version: Option<String>,
  pub objects: Vec<Map<String, Value>>,
}

impl ClusterClient for MockClusterClient {
  async fn server_version(&self) -> Result<String> {
    match &self.version {
      Some(version) => Ok(version.clone()),
      None => bail!("version endpoint unavailable"),
    }
  }

  async fn list_objects(&self, _kinds: &[Gvk]) -> Result<Vec<Map<String, Value>>> {
    Ok(self.objects.clone())
  }
}

pub fn object_from(json: &str) -> Map<String, Value> {
  serde_json::from_str(json).unwrap()
}
