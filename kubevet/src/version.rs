use std::cmp::Ordering;

use anyhow::{Context, Result, bail};

/// Relative maturity of a Kubernetes API version token.
///
/// The discriminants give the ordering used throughout: a GA version of a
/// given major outranks any beta, which outranks any alpha.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum VersionType {
  Alpha = 1,
  Beta = 2,
  Ga = 3,
}

/// Classify a version token (`v1`, `v1beta2`, `v2alpha1`, ...)
pub fn version_type(version: &str) -> VersionType {
  let version = version.to_lowercase();
  if version.contains("alpha") {
    VersionType::Alpha
  } else if version.contains("beta") {
    VersionType::Beta
  } else {
    VersionType::Ga
  }
}

/// The `(major, type, minor)` tuple behind a version token.
///
/// A token with no trailing minor (`v1`, `v2`) is a settled release and
/// outranks any suffixed version of the same major, so the missing minor
/// counts as the maximum value. The same rule covers minors too large to
/// parse.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
struct VersionTuple {
  major: i64,
  version_type: VersionType,
  minor: i64,
}

fn parse_version_tuple(token: &str) -> Result<VersionTuple> {
  let token = token.to_lowercase();
  let rest = token.strip_prefix('v').unwrap_or(&token);

  let major_digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
  let major = major_digits
    .parse::<i64>()
    .with_context(|| format!("no major version in token '{token}'"))?;

  let suffix = &rest[major_digits.len()..];
  let minor: String = suffix
    .chars()
    .skip_while(|c| !c.is_ascii_digit())
    .take_while(|c| c.is_ascii_digit())
    .collect();
  let minor = minor.parse::<i64>().unwrap_or(i64::MAX);

  Ok(VersionTuple {
    major,
    version_type: version_type(&token),
    minor,
  })
}

/// Total order over two version tokens, used to sort kind buckets.
/// Equal tuples compare equal so a stable sort preserves input order.
pub fn cmp_version_token(lhs: &str, rhs: &str) -> Result<Ordering> {
  let lhs = parse_version_tuple(lhs)?;
  let rhs = parse_version_tuple(rhs)?;
  Ok(lhs.cmp(&rhs))
}

/// Whether `lhs` sorts at-or-below `rhs`.
///
/// Equal tuples report `true`: the upstream comparison is `<=` on the minor,
/// which makes `compare_version` hand the win to its second argument when the
/// tokens tie. Callers rely on that tie-break.
pub fn is_smaller_version(lhs: &str, rhs: &str) -> Result<bool> {
  Ok(cmp_version_token(lhs, rhs)? != Ordering::Greater)
}

/// The `extensions` API group is legacy regardless of its version suffix.
pub fn is_extension(component_key: &str) -> bool {
  component_key.contains("extensions")
}

/// Version token of a schema component key, the second-to-last dotted
/// segment of `io.k8s.api.<group...>.<version>.<Kind>`.
fn api_version_of(component_key: &str) -> Result<&str> {
  let parts: Vec<&str> = component_key.split('.').collect();
  if parts.len() < 2 {
    bail!("component key '{component_key}' has no version segment");
  }
  Ok(parts[parts.len() - 2])
}

/// Pick the newer of two schema component keys.
///
/// Rules, in order: equal keys return the first; a key in the `extensions`
/// group loses to any key outside it; otherwise the larger
/// `(major, type, minor)` tuple of the version segments wins, and a tie goes
/// to the second argument.
pub fn compare_version<'a>(lhs: &'a str, rhs: &'a str) -> Result<&'a str> {
  if lhs == rhs {
    return Ok(lhs);
  }
  if !is_extension(lhs) && is_extension(rhs) {
    return Ok(lhs);
  }
  if is_extension(lhs) && !is_extension(rhs) {
    return Ok(rhs);
  }

  if is_smaller_version(api_version_of(lhs)?, api_version_of(rhs)?)? {
    Ok(rhs)
  } else {
    Ok(lhs)
  }
}

/// Given a release tag, parse the minor version
///
/// For example, the format v1.20.7-eks-123456 returns 20
/// and the format 1.22 returns 22
pub fn parse_minor(version: &str) -> Result<i32> {
  let parts: Vec<&str> = version.split('.').collect();
  let minor_str = parts
    .get(1)
    .with_context(|| format!("Invalid version format '{version}', expected 'X.Y[.Z]'"))?;
  let minor = minor_str.parse::<i32>()?;

  Ok(minor)
}

/// Given a release tag, normalize to the `major.minor` form the registry keys
/// on (`v1.21.3-eks-123456` becomes `1.21`)
pub fn normalize(version: &str) -> Result<String> {
  let parts: Vec<&str> = version.split('.').collect();
  let major = parts
    .first()
    .with_context(|| format!("Invalid version format '{version}'"))?;
  let minor = parts
    .get(1)
    .with_context(|| format!("Invalid version format '{version}', expected 'X.Y[.Z]'"))?;

  Ok(format!("{}.{}", major.replace('v', ""), minor))
}
