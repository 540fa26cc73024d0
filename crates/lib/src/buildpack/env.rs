//! Environment handed to buildpack detect processes.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;

/// Host variables passed through to detect processes, besides the root-dir variables.
const ALLOWED_VARS: &[&str] = &[
  "CNB_STACK_ID",
  "CNB_ASSETS",
  "HOSTNAME",
  "HOME",
  "HTTPS_PROXY",
  "https_proxy",
  "HTTP_PROXY",
  "http_proxy",
  "NO_PROXY",
  "no_proxy",
];

/// Variables whose platform value is prepended to the existing value instead of replacing it.
const ROOT_DIR_VARS: &[&str] = &["PATH", "LD_LIBRARY_PATH", "LIBRARY_PATH", "CPATH", "PKG_CONFIG_PATH"];

#[cfg(unix)]
const PATH_LIST_SEPARATOR: &str = ":";

#[cfg(windows)]
const PATH_LIST_SEPARATOR: &str = ";";

/// The base environment for detect processes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildEnv {
  vars: BTreeMap<String, String>,
}

impl BuildEnv {
  pub fn new(vars: BTreeMap<String, String>) -> Self {
    Self { vars }
  }

  /// The allowed subset of the current process environment.
  pub fn from_os() -> Self {
    Self::from_vars(
      std::env::vars_os().filter_map(|(key, value)| Some((key.into_string().ok()?, value.into_string().ok()?))),
    )
  }

  /// Keep only the allowed variables of `vars`.
  pub fn from_vars(vars: impl IntoIterator<Item = (String, String)>) -> Self {
    Self {
      vars: vars
        .into_iter()
        .filter_map(|(key, value)| allowed_key(&key).map(|key| (key, value)))
        .collect(),
    }
  }

  /// The environment without platform overrides, for buildpacks that set `clear-env`.
  pub fn list(&self) -> Vec<(String, String)> {
    self.vars.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
  }

  /// The environment overlaid with `<platform_dir>/env/<NAME>` files.
  pub fn with_platform(&self, platform_dir: &Path) -> io::Result<Vec<(String, String)>> {
    let mut vars = self.vars.clone();
    let env_dir = platform_dir.join("env");

    let entries = match fs::read_dir(&env_dir) {
      Ok(entries) => entries,
      Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(self.list()),
      Err(e) => return Err(e),
    };

    for entry in entries {
      let entry = entry?;
      if entry.file_type()?.is_dir() {
        continue;
      }
      let name = entry.file_name().to_string_lossy().into_owned();
      let value = fs::read_to_string(entry.path())?;

      if ROOT_DIR_VARS.contains(&name.as_str()) {
        let merged = match vars.get(&name) {
          Some(existing) if !existing.is_empty() => format!("{}{}{}", value, PATH_LIST_SEPARATOR, existing),
          _ => value,
        };
        vars.insert(name, merged);
      } else {
        vars.insert(name, value);
      }
    }

    Ok(vars.into_iter().collect())
  }
}

/// The name under which `key` is passed through, if it is allowed at all.
///
/// Windows variable names are case-insensitive and are passed through uppercased.
fn allowed_key(key: &str) -> Option<String> {
  let mut allowed = ALLOWED_VARS.iter().chain(ROOT_DIR_VARS);
  if cfg!(windows) {
    let upper = key.to_uppercase();
    allowed.any(|k| k.to_uppercase() == upper).then_some(upper)
  } else {
    allowed.any(|k| *k == key).then(|| key.to_string())
  }
}
