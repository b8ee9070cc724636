//! Report sinks. The stdout sink renders grouped tables per batch; the JSON
//! and TAP sinks buffer evaluations and emit a single report at flush.

use std::io::IsTerminal;

use anyhow::Result;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use tabled::{Table, Tabled, settings::Style};

use crate::finding::{Finding, ValidationResult};

#[derive(Clone, Copy, Debug, Default, ValueEnum, Serialize, Deserialize)]
pub enum Format {
  /// Human-readable tables on stdout
  #[default]
  Stdout,
  /// JSON array, written at flush
  Json,
  /// Test Anything Protocol stream, written at flush
  Tap,
}

/// Where validation results are reported.
pub trait OutputManager {
  fn put(&mut self, result: &ValidationResult) -> Result<()>;

  fn put_bulk(&mut self, results: &[ValidationResult]) -> Result<()> {
    for result in results {
      self.put(result)?;
    }
    Ok(())
  }

  fn flush(&mut self) -> Result<()> {
    Ok(())
  }
}

pub fn output_manager(format: &Format, force_color: bool, quiet: bool) -> Box<dyn OutputManager> {
  match format {
    Format::Stdout => Box::new(StdOutputManager::new(force_color, quiet)),
    Format::Json => Box::new(JsonOutputManager::default()),
    Format::Tap => Box::new(TapOutputManager::default()),
  }
}

// ── stdout ───────────────────────────────────────────────────────────────

#[derive(Tabled)]
struct SummaryRow {
  #[tabled(rename = "NAMESPACE")]
  namespace: String,
  #[tabled(rename = "NAME")]
  name: String,
  #[tabled(rename = "KIND")]
  kind: String,
  #[tabled(rename = "API VERSION")]
  api_version: String,
  #[tabled(rename = "REPLACE WITH")]
  replace_with: String,
}

impl SummaryRow {
  fn from(result: &ValidationResult) -> Self {
    Self {
      namespace: result.resource_namespace.clone(),
      name: result.resource_name.clone(),
      kind: result.kind.clone(),
      api_version: result.api_version.clone(),
      replace_with: result.latest_api_version.clone(),
    }
  }
}

#[derive(Tabled)]
struct DetailRow {
  #[tabled(rename = "NAMESPACE")]
  namespace: String,
  #[tabled(rename = "NAME")]
  name: String,
  #[tabled(rename = "KIND")]
  kind: String,
  #[tabled(rename = "API VERSION")]
  api_version: String,
  #[tabled(rename = "FIELD")]
  field: String,
  #[tabled(rename = "REASON")]
  reason: String,
}

impl DetailRow {
  fn from(result: &ValidationResult, api_version: &str, finding: &Finding) -> Self {
    let field = if finding.path.is_empty() {
      finding.field.clone()
    } else {
      finding.path.clone()
    };
    Self {
      namespace: result.resource_namespace.clone(),
      name: result.resource_name.clone(),
      kind: result.kind.clone(),
      api_version: api_version.to_string(),
      field,
      reason: finding.reason.clone(),
    }
  }
}

/// Which validation pass a detail table reports on.
#[derive(Clone, Copy)]
enum Pass {
  Original,
  Latest,
}

pub struct StdOutputManager {
  color: bool,
  quiet: bool,
  pending: Vec<ValidationResult>,
}

impl StdOutputManager {
  pub fn new(force_color: bool, quiet: bool) -> Self {
    Self {
      color: force_color || std::io::stdout().is_terminal(),
      quiet,
      pending: Vec::new(),
    }
  }

  fn render(&self, results: &[ValidationResult]) {
    if results.is_empty() {
      return;
    }
    if !self.quiet
      && let Some(file) = results.iter().map(|r| r.file_name.as_str()).find(|f| !f.is_empty())
    {
      println!("{}", self.paint(&format!(">> results for {file}"), anstyle::AnsiColor::Green));
    }

    let mut deleted = Vec::new();
    let mut deprecated = Vec::new();
    let mut newer = Vec::new();
    let mut unchanged = Vec::new();
    for result in results {
      if result.kind.is_empty() {
        continue;
      } else if result.deleted {
        deleted.push(result);
      } else if result.deprecated && !result.latest_api_version.is_empty() {
        deprecated.push(result);
      } else if result.deprecated {
        // deprecated with nothing to move to: the detail tables carry it
      } else if !result.latest_api_version.is_empty() {
        newer.push(result);
      } else {
        unchanged.push(result);
      }
    }

    self.section("Removed API Versions", anstyle::AnsiColor::Red, &deleted);
    self.section("Deprecated API Versions", anstyle::AnsiColor::Yellow, &deprecated);
    self.section("Newer API Versions available", anstyle::AnsiColor::Cyan, &newer);
    self.section("Unchanged API Versions", anstyle::AnsiColor::Green, &unchanged);

    self.detail_table("Deprecations for the declared versions", results, Pass::Original, true);
    self.detail_table("Validation errors for the declared versions", results, Pass::Original, false);
    self.detail_table("Deprecations for the replacement versions", results, Pass::Latest, true);
    self.detail_table("Validation errors for the replacement versions", results, Pass::Latest, false);
  }

  fn section(&self, title: &str, color: anstyle::AnsiColor, results: &[&ValidationResult]) {
    if results.is_empty() {
      return;
    }
    println!("{}", self.paint(title, color));
    let rows: Vec<SummaryRow> = results.iter().map(|r| SummaryRow::from(r)).collect();
    let mut table = Table::new(rows);
    table.with(Style::sharp());
    println!("{table}\n");
  }

  fn detail_table(&self, title: &str, results: &[ValidationResult], pass: Pass, deprecations: bool) {
    let mut rows = Vec::new();
    for result in results {
      let (findings, api_version) = match (pass, deprecations) {
        (Pass::Original, true) => (&result.deprecation_for_original, result.api_version.as_str()),
        (Pass::Original, false) => (&result.errors_for_original, result.api_version.as_str()),
        (Pass::Latest, true) => (&result.deprecation_for_latest, result.latest_api_version.as_str()),
        (Pass::Latest, false) => (&result.errors_for_latest, result.latest_api_version.as_str()),
      };
      rows.extend(
        findings
          .iter()
          .map(|finding| DetailRow::from(result, api_version, finding)),
      );
    }
    if rows.is_empty() {
      return;
    }
    println!("{}", self.paint(title, anstyle::AnsiColor::Magenta));
    let mut table = Table::new(rows);
    table.with(Style::sharp());
    println!("{table}\n");
  }

  fn paint(&self, text: &str, color: anstyle::AnsiColor) -> String {
    if !self.color {
      return text.to_string();
    }
    let style = anstyle::Style::new()
      .bold()
      .fg_color(Some(anstyle::Color::Ansi(color)));
    format!("{style}{text}{style:#}")
  }
}

impl OutputManager for StdOutputManager {
  fn put(&mut self, result: &ValidationResult) -> Result<()> {
    self.pending.push(result.clone());
    Ok(())
  }

  fn put_bulk(&mut self, results: &[ValidationResult]) -> Result<()> {
    self.render(results);
    Ok(())
  }

  fn flush(&mut self) -> Result<()> {
    let pending = std::mem::take(&mut self.pending);
    self.render(&pending);
    Ok(())
  }
}

// ── json / tap ───────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
  Valid,
  Invalid,
  Skipped,
}

/// One line of the machine-readable reports.
#[derive(Clone, Debug, Serialize)]
pub struct Evaluation {
  pub filename: String,
  pub kind: String,
  pub status: Status,
  pub errors: Vec<String>,
}

impl Evaluation {
  fn from(result: &ValidationResult) -> Self {
    Self {
      filename: result.file_name.clone(),
      kind: result.kind.clone(),
      status: status_of(result),
      errors: result
        .errors_for_original
        .iter()
        .map(|finding| {
          if finding.path.is_empty() {
            finding.reason.clone()
          } else {
            format!("{}: {}", finding.path, finding.reason)
          }
        })
        .collect(),
    }
  }
}

pub(crate) fn status_of(result: &ValidationResult) -> Status {
  if result.kind.is_empty() {
    return Status::Skipped;
  }
  if !result.validated_against_schema {
    return Status::Skipped;
  }
  if result.has_errors() {
    return Status::Invalid;
  }
  Status::Valid
}

#[derive(Default)]
pub struct JsonOutputManager {
  evaluations: Vec<Evaluation>,
}

impl OutputManager for JsonOutputManager {
  fn put(&mut self, result: &ValidationResult) -> Result<()> {
    self.evaluations.push(Evaluation::from(result));
    Ok(())
  }

  fn flush(&mut self) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(&self.evaluations)?);
    Ok(())
  }
}

#[derive(Default)]
pub struct TapOutputManager {
  evaluations: Vec<Evaluation>,
}

impl OutputManager for TapOutputManager {
  fn put(&mut self, result: &ValidationResult) -> Result<()> {
    self.evaluations.push(Evaluation::from(result));
    Ok(())
  }

  fn flush(&mut self) -> Result<()> {
    if self.evaluations.is_empty() {
      return Ok(());
    }
    // a failing evaluation occupies one line per error
    let total: usize = self
      .evaluations
      .iter()
      .map(|evaluation| evaluation.errors.len().max(1))
      .sum();
    println!("1..{total}");

    let mut count = 0;
    for evaluation in &self.evaluations {
      count += 1;
      let kind_marker = if evaluation.kind.is_empty() {
        String::new()
      } else {
        format!(" ({})", evaluation.kind)
      };
      match evaluation.status {
        Status::Valid => println!("ok {count} - {}{kind_marker}", evaluation.filename),
        Status::Skipped => println!("ok {count} - {}{kind_marker} # SKIP", evaluation.filename),
        Status::Invalid => {
          for (index, error) in evaluation.errors.iter().enumerate() {
            println!("not ok {count} - {}{kind_marker} - {error}", evaluation.filename);
            if index + 1 != evaluation.errors.len() {
              count += 1;
            }
          }
        }
      }
    }
    Ok(())
  }
}
