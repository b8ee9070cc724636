use std::io::Write;

use kubevet::catalogue::Catalogue;
use kubevet::openapi;
use tempfile::NamedTempFile;

/// Miniature release OpenAPI document carrying the shapes the scenarios
/// need: a current and a legacy Deployment, core Service / ConfigMap /
/// Secret, and the IntOrString union.
pub const SWAGGER: &str = include_str!("../fixtures/swagger-mini.json");

/// Builds the fixture catalogue directly, without the registry.
pub fn catalogue() -> Catalogue {
  Catalogue::new(openapi::load_document(SWAGGER.as_bytes()).unwrap())
}

/// Writes the fixture document to disk for registry load-from-path tests.
pub fn swagger_file() -> NamedTempFile {
  let mut file = NamedTempFile::new().unwrap();
  file.write_all(SWAGGER.as_bytes()).unwrap();
  file
}

pub const DEPLOYMENT_WITH_TYPO: &str = r#"
{
  "apiVersion": "apps/v1",
  "kind": "Deployment",
  "metadata": {
    "name": "nginx-deployment",
    "labels": {
      "app": "nginx"
    }
  },
  "spec": {
    "replicas": 3,
    "selector": {
      "matchLabels": {
        "app": "nginx"
      }
    },
    "template": {
      "metadata": {
        "labels": {
          "app": "nginx"
        }
      },
      "spec": {
        "containers": [
          {
            "name": "nginx",
            "image": "nginx:1.14.2",
            "ports": [
              {
                "containerPort1": 80
              }
            ]
          }
        ]
      }
    }
  }
}"#;

pub const CORRECT_DEPLOYMENT: &str = r#"
{
  "apiVersion": "apps/v1",
  "kind": "Deployment",
  "metadata": {
    "name": "nginx-deployment",
    "labels": {
      "app": "nginx"
    }
  },
  "spec": {
    "replicas": 3,
    "selector": {
      "matchLabels": {
        "app": "nginx"
      }
    },
    "template": {
      "metadata": {
        "labels": {
          "app": "nginx"
        }
      },
      "spec": {
        "containers": [
          {
            "name": "nginx",
            "image": "nginx:1.14.2",
            "ports": [
              {
                "containerPort": 80
              }
            ]
          }
        ]
      }
    }
  }
}"#;

pub const EXTENSION_DEPLOYMENT: &str = r#"
{
  "apiVersion": "extensions/v1beta1",
  "kind": "Deployment",
  "metadata": {
    "name": "nginx-deployment",
    "labels": {
      "app": "nginx"
    }
  },
  "spec": {
    "replicas": 3,
    "selector": {
      "matchLabels": {
        "app": "nginx"
      }
    },
    "rollbackTo": {
      "revision": 12
    },
    "template": {
      "metadata": {
        "labels": {
          "app": "nginx"
        }
      },
      "spec": {
        "containers": [
          {
            "name": "nginx",
            "image": "nginx:1.14.2",
            "ports": [
              {
                "containerPort": 80
              }
            ]
          }
        ]
      }
    }
  }
}"#;

pub const SERVICE: &str = r#"
{
  "apiVersion": "v1",
  "kind": "Service",
  "metadata": {
    "name": "my-service"
  },
  "spec": {
    "selector": {
      "app": "MyApp"
    },
    "ports": [
      {
        "protocol": "TCP",
        "port": 80,
        "targetPort": 9376
      }
    ]
  }
}"#;

pub const CONFIG_MAP: &str = r#"
{
  "apiVersion": "v1",
  "kind": "ConfigMap",
  "metadata": {
    "name": "game-demo"
  },
  "data": {
    "player_initial_lives": "3",
    "ui_properties_file_name": "user-interface.properties",
    "game.properties": "enemy.types=aliens,monsters\nplayer.maximum-lives=5    \n",
    "user-interface.properties": "color.good=purple\ncolor.bad=yellow\nallow.textmode=true \n"
  }
}"#;

pub const SECRET: &str = r#"
{
  "apiVersion": "v1",
  "kind": "Secret",
  "metadata": {
    "name": "bootstrap-token-5emitj",
    "namespace": "kube-system"
  },
  "type": "bootstrap.kubernetes.io/token",
  "data": {
    "auth-extra-groups": "c3lzdGVtOmJvb3RzdHJhcHBlcnM6a3ViZWFkbTpkZWZhdWx0LW5vZGUtdG9rZW4=",
    "expiration": "MjAyMC0wOS0xM1QwNDozOToxMFo=",
    "token-id": "NWVtaXRq",
    "token-secret": "a3E0Z2lodnN6emduMXAwcg==",
    "usage-bootstrap-authentication": "dHJ1ZQ==",
    "usage-bootstrap-signing": "dHJ1ZQ=="
  }
}"#;

pub const SECRET_STRING_DATA: &str = r#"
{
  "apiVersion": "v1",
  "kind": "Secret",
  "metadata": {
    "name": "bootstrap-token-5emitj",
    "namespace": "kube-system"
  },
  "type": "bootstrap.kubernetes.io/token",
  "stringData": {
    "auth-extra-groups": "system:bootstrappers:kubeadm:default-node-token",
    "expiration": "2020-09-13T04:39:10Z",
    "token-id": "5emitj",
    "token-secret": "kq4gihvszzgn1p0r",
    "usage-bootstrap-authentication": "true",
    "usage-bootstrap-signing": "true"
  }
}"#;
