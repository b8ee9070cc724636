mod cli;

pub mod catalogue;
pub mod cluster;
pub mod config;
pub mod finding;
pub mod manifest;
pub mod openapi;
pub mod output;
pub mod structural;
pub mod validator;
pub mod version;
pub mod walker;

use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap_verbosity_flag::{InfoLevel, Verbosity};

pub use cli::{Cli, ClusterArgs, Commands, CommonArgs, ManifestArgs};

use crate::{
  catalogue::{Catalogue, Registry},
  cluster::ClusterClient,
  config::Config,
  finding::ValidationResult,
};

/// Route tracing through the -v/-q flags; RUST_LOG still wins when set.
pub fn init_tracing(verbosity: &Verbosity<InfoLevel>) {
  let level = verbosity.log_level_filter().to_string().to_lowercase();
  let filter = tracing_subscriber::EnvFilter::try_from_default_env()
    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_target(false)
    .init();
}

/// Run the parsed command. Returns whether the batch passed.
pub async fn run(cli: &Cli) -> Result<bool> {
  let quiet = cli.verbose.log_level_filter() < log::LevelFilter::Info;
  match &cli.command {
    Commands::Manifests(args) => {
      let config = Config::new(&args.common, quiet);
      validate_manifests(args, &config).await
    }
    Commands::Cluster(args) => {
      let config = Config::new(&args.common, quiet);
      validate_cluster(&config).await
    }
  }
}

/// Validate the given manifest files and directories.
pub async fn validate_manifests(args: &ManifestArgs, config: &Config) -> Result<bool> {
  let registry = Registry::new(config.insecure_skip_tls_verify)?;
  let catalogue = load_release(&registry, config).await?;

  let files = manifest::aggregate_files(&args.files, &args.directories, &args.ignored_path_patterns)?;
  if files.is_empty() {
    bail!("at least one file or one directory must be provided");
  }

  let mut sink = output::output_manager(&config.output_format, config.force_color, config.quiet);
  let mut success = true;
  for file in &files {
    let file_name = file.display().to_string();
    let contents = match std::fs::read_to_string(file) {
      Ok(contents) => contents,
      Err(err) => {
        tracing::error!("could not open file {file_name}: {err}");
        success = false;
        if config.exit_on_error {
          break;
        }
        continue;
      }
    };

    let mut results = validate_input(&catalogue, &contents, &file_name);
    validator::fill_support_status(&catalogue, &mut results);
    success &= assess(&catalogue, &results, config);
    sink.put_bulk(&results)?;

    if config.exit_on_error && !success {
      break;
    }
  }
  sink.flush()?;

  Ok(success)
}

/// Validate every resource of the connected cluster.
pub async fn validate_cluster(config: &Config) -> Result<bool> {
  let registry = Registry::new(config.insecure_skip_tls_verify)?;
  let target = load_release(&registry, config).await?;
  let client = cluster::KubeClusterClient::try_default().await?;
  validate_cluster_objects(&registry, &target, &client, config).await
}

/// Cluster validation against an injected client, so the pipeline is
/// exercisable without a cluster.
pub async fn validate_cluster_objects(
  registry: &Registry,
  target: &Arc<Catalogue>,
  client: &impl ClusterClient,
  config: &Config,
) -> Result<bool> {
  // validate against what the cluster actually runs where possible,
  // falling back to the configured target release
  let release = match client.server_version().await {
    Ok(version) => version,
    Err(err) => {
      tracing::debug!("unable to read the server version, using the target release: {err:#}");
      config.kubernetes_version.clone()
    }
  };
  if let (Ok(server_minor), Ok(target_minor)) = (
    version::parse_minor(&release),
    version::parse_minor(&config.kubernetes_version),
  ) && server_minor > target_minor
  {
    tracing::warn!(
      "cluster reports release {release}, newer than the target release {}",
      config.kubernetes_version
    );
  }
  let catalogue = if release == config.kubernetes_version {
    Arc::clone(target)
  } else {
    match registry.load_from_url(&release, false).await {
      Ok(catalogue) => catalogue,
      Err(err) => {
        tracing::debug!("unable to load release {release}, using the target release: {err:#}");
        Arc::clone(target)
      }
    }
  };

  let kinds = catalogue.kinds();
  let objects = client.list_objects(&kinds).await?;

  let mut results: Vec<ValidationResult> = objects
    .iter()
    .map(|object| catalogue.validate_object(object))
    .collect();
  validator::fill_support_status(target, &mut results);
  let success = assess(target, &results, config);

  let mut sink = output::output_manager(&config.output_format, config.force_color, config.quiet);
  sink.put_bulk(&results)?;
  sink.flush()?;

  Ok(success)
}

async fn load_release(registry: &Registry, config: &Config) -> Result<Arc<Catalogue>> {
  match &config.schema_location {
    Some(path) => registry
      .load_from_path(&config.kubernetes_version, path, false)
      .await
      .context("loading the OpenAPI document from --schema-location"),
    None => registry.load_from_url(&config.kubernetes_version, false).await,
  }
}

/// Split a manifest stream and validate each document; parse failures are
/// recorded against the file and the batch continues.
pub fn validate_input(catalogue: &Catalogue, input: &str, file_name: &str) -> Vec<ValidationResult> {
  let mut results = Vec::new();
  for document in manifest::split_documents(input) {
    match manifest::parse_document(document) {
      Ok(None) => {}
      Ok(Some(object)) => {
        let mut result = catalogue.validate_object(&object);
        result.file_name = file_name.to_string();
        results.push(result);
      }
      Err(err) => results.push(ValidationResult::parse_failure(file_name, &format!("{err:#}"))),
    }
  }
  results
}

/// Exit-code policy: structural errors in the declared-version pass fail the
/// batch, and unknown kinds fail it unless explicitly ignored.
fn assess(catalogue: &Catalogue, results: &[ValidationResult], config: &Config) -> bool {
  let mut success = true;
  for result in results {
    if result.has_errors() {
      success = false;
    }
    if !result.kind.is_empty() && !catalogue.has_kind(&result.kind) {
      tracing::warn!(
        "no schema found for {} in release {}; resource {}",
        result.version_kind(),
        config.kubernetes_version,
        result.qualified_name()
      );
      if !config.ignore_missing_schemas {
        success = false;
      }
    }
  }
  success
}
