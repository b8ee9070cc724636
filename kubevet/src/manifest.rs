//! Manifest ingestion: multi-document YAML splitting, tolerant per-document
//! parsing, and file aggregation for the CLI.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use regex::Regex;
use serde_json::{Map, Value};
use walkdir::WalkDir;

/// YAML streams are split on the line-delimited separator only; `---` inside
/// block scalars stays untouched.
pub const DOCUMENT_SEPARATOR: &str = "\n---\n";

/// Split a manifest stream into its documents.
pub fn split_documents(input: &str) -> impl Iterator<Item = &str> {
  input.split(DOCUMENT_SEPARATOR)
}

/// Parse one document into a resource object.
///
/// `Ok(None)` for documents with no content (empty, comments only, explicit
/// null); an error for unparseable text or a non-mapping document. JSON is a
/// subset of YAML, so both input formats land here.
pub fn parse_document(input: &str) -> Result<Option<Map<String, Value>>> {
  let blank = input
    .lines()
    .all(|line| line.trim().is_empty() || line.trim_start().starts_with('#'));
  if blank {
    return Ok(None);
  }
  let value: Value = serde_yaml::from_str(input).context("parsing YAML document")?;
  match value {
    Value::Null => Ok(None),
    Value::Object(object) => Ok(Some(object)),
    _ => bail!("document is not a mapping"),
  }
}

/// Collect the manifests to validate: explicit files plus every
/// `*.yaml`/`*.yml` under the given directories, minus ignored paths.
pub fn aggregate_files(
  files: &[PathBuf],
  directories: &[PathBuf],
  ignored_patterns: &[String],
) -> Result<Vec<PathBuf>> {
  let patterns = compile_patterns(ignored_patterns)?;

  let mut aggregated: Vec<PathBuf> = files.to_vec();
  for directory in directories {
    for entry in WalkDir::new(directory).follow_links(true) {
      let entry =
        entry.with_context(|| format!("walking directory {}", directory.display()))?;
      if !entry.file_type().is_file() {
        continue;
      }
      let name = entry.file_name().to_string_lossy();
      if !(name.ends_with(".yaml") || name.ends_with(".yml")) {
        continue;
      }
      if is_ignored(entry.path(), &patterns) {
        continue;
      }
      aggregated.push(entry.path().to_path_buf());
    }
  }

  Ok(aggregated)
}

fn compile_patterns(patterns: &[String]) -> Result<Vec<Regex>> {
  patterns
    .iter()
    .map(|pattern| {
      Regex::new(pattern).with_context(|| format!("invalid ignored-path pattern '{pattern}'"))
    })
    .collect()
}

fn is_ignored(path: &Path, patterns: &[Regex]) -> bool {
  let path = path.to_string_lossy();
  patterns.iter().any(|pattern| pattern.is_match(&path))
}

#[cfg(test)]
mod tests {
  use std::fs;

  use super::*;

  #[test]
  fn split_on_line_separator_only() {
    let stream = "a: 1\n---\nb: 2\n---\nc: --- not a separator\n";
    let documents: Vec<&str> = split_documents(stream).collect();
    assert_eq!(documents.len(), 3);
    assert_eq!(documents[0], "a: 1");
    assert_eq!(documents[2], "c: --- not a separator\n");
  }

  #[test]
  fn parse_yaml_and_json_documents() {
    let yaml = parse_document("kind: Pod\napiVersion: v1\n").unwrap().unwrap();
    assert_eq!(yaml.get("kind").unwrap(), "Pod");

    let json = parse_document(r#"{"kind": "Pod", "apiVersion": "v1"}"#)
      .unwrap()
      .unwrap();
    assert_eq!(json.get("kind").unwrap(), "Pod");
  }

  #[test]
  fn empty_and_comment_documents_are_skipped() {
    assert!(parse_document("").unwrap().is_none());
    assert!(parse_document("   \n").unwrap().is_none());
    assert!(parse_document("# just a comment\n").unwrap().is_none());
    assert!(parse_document("null").unwrap().is_none());
  }

  #[test]
  fn broken_documents_error() {
    assert!(parse_document("kind: [unclosed\n").is_err());
    assert!(parse_document("- just\n- a\n- list\n").is_err());
  }

  #[test]
  fn aggregate_walks_directories_and_filters() {
    let dir = tempfile::tempdir().unwrap();
    let nested = dir.path().join("nested");
    fs::create_dir(&nested).unwrap();
    fs::write(dir.path().join("a.yaml"), "kind: Pod").unwrap();
    fs::write(nested.join("b.yml"), "kind: Pod").unwrap();
    fs::write(nested.join("skip-me.yaml"), "kind: Pod").unwrap();
    fs::write(dir.path().join("notes.txt"), "not yaml").unwrap();

    let explicit = vec![PathBuf::from("explicit.yaml")];
    let files = aggregate_files(
      &explicit,
      &[dir.path().to_path_buf()],
      &["skip-me".to_string()],
    )
    .unwrap();

    assert!(files.contains(&PathBuf::from("explicit.yaml")));
    assert_eq!(files.iter().filter(|f| f.ends_with("a.yaml")).count(), 1);
    assert_eq!(files.iter().filter(|f| f.ends_with("b.yml")).count(), 1);
    assert!(!files.iter().any(|f| f.to_string_lossy().contains("skip-me")));
    assert!(!files.iter().any(|f| f.to_string_lossy().contains("notes.txt")));
  }

  #[test]
  fn aggregate_rejects_bad_patterns() {
    assert!(aggregate_files(&[], &[], &["[unclosed".to_string()]).is_err());
  }
}
