use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use clap_verbosity_flag::{InfoLevel, Verbosity};

use crate::output::Format;

fn get_styles() -> clap::builder::Styles {
  clap::builder::Styles::styled()
    .header(
      anstyle::Style::new()
        .bold()
        .underline()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Green))),
    )
    .literal(
      anstyle::Style::new()
        .bold()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::BrightCyan))),
    )
    .usage(
      anstyle::Style::new()
        .bold()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Green))),
    )
    .placeholder(
      anstyle::Style::new()
        .bold()
        .underline()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Yellow))),
    )
}

#[derive(Parser, Debug)]
#[command(author, about, version)]
#[command(propagate_version = true)]
#[command(styles = get_styles())]
pub struct Cli {
  #[command(subcommand)]
  pub command: Commands,

  #[command(flatten)]
  pub verbose: Verbosity<InfoLevel>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
  #[command(arg_required_else_help = true)]
  Manifests(ManifestArgs),
  Cluster(ClusterArgs),
}

/// Validate manifest files against a target Kubernetes release
#[derive(Args, Debug)]
pub struct ManifestArgs {
  /// Manifest files to validate
  #[arg(value_name = "FILE")]
  pub files: Vec<PathBuf>,

  /// Directories to recursively search for YAML documents
  #[arg(short, long, value_delimiter = ',')]
  pub directories: Vec<PathBuf>,

  /// Regular expressions of paths to skip while searching directories
  #[arg(short = 'i', long, value_delimiter = ',')]
  pub ignored_path_patterns: Vec<String>,

  #[command(flatten)]
  pub common: CommonArgs,
}

/// Validate the resources of a running cluster against a target release
#[derive(Args, Debug)]
pub struct ClusterArgs {
  #[command(flatten)]
  pub common: CommonArgs,
}

#[derive(Args, Debug)]
pub struct CommonArgs {
  /// The Kubernetes release to validate against, e.g. 1.21
  #[arg(short, long)]
  pub kubernetes_version: String,

  /// Local OpenAPI document to use instead of the release URL
  #[arg(short, long)]
  pub schema_location: Option<PathBuf>,

  /// Do not fail when a kind is absent from the release schemas
  #[arg(long)]
  pub ignore_missing_schemas: bool,

  /// Disable TLS certificate validation when fetching the OpenAPI document
  #[arg(long)]
  pub insecure_skip_tls_verify: bool,

  #[arg(short, long, value_enum, default_value_t)]
  pub output: Format,

  /// Abort the batch on the first failing file
  #[arg(long)]
  pub exit_on_error: bool,

  /// Force colored output even if stdout is not a TTY
  #[arg(long)]
  pub force_color: bool,
}
