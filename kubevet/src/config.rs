use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::{cli::CommonArgs, output::Format};

/// Effective run configuration, assembled from the command line.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
  /// Target release, e.g. `1.21`
  pub kubernetes_version: String,
  /// Local OpenAPI document used instead of the release URL
  pub schema_location: Option<PathBuf>,
  /// Unknown kinds do not fail the run
  pub ignore_missing_schemas: bool,
  /// Disable TLS certificate validation on the OpenAPI fetch
  pub insecure_skip_tls_verify: bool,
  pub output_format: Format,
  /// Abort the batch on the first failing file
  pub exit_on_error: bool,
  /// Suppress informational chrome around the reports
  pub quiet: bool,
  /// Color output even when stdout is not a TTY
  pub force_color: bool,
}

impl Config {
  pub fn new(common: &CommonArgs, quiet: bool) -> Self {
    Self {
      kubernetes_version: common.kubernetes_version.clone(),
      schema_location: common.schema_location.clone(),
      ignore_missing_schemas: common.ignore_missing_schemas,
      insecure_skip_tls_verify: common.insecure_skip_tls_verify,
      output_format: common.output,
      exit_on_error: common.exit_on_error,
      quiet,
      force_color: common.force_color,
    }
  }
}
