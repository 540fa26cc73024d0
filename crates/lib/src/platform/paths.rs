//! Platform directories, overridable with `CNB_*` environment variables.

use std::path::PathBuf;

pub const ENV_APP_DIR: &str = "CNB_APP_DIR";
pub const ENV_BUILDPACKS_DIR: &str = "CNB_BUILDPACKS_DIR";
pub const ENV_EXTENSIONS_DIR: &str = "CNB_EXTENSIONS_DIR";
pub const ENV_LAYERS_DIR: &str = "CNB_LAYERS_DIR";
pub const ENV_ORDER_PATH: &str = "CNB_ORDER_PATH";
pub const ENV_PLATFORM_DIR: &str = "CNB_PLATFORM_DIR";
pub const ENV_LOG_LEVEL: &str = "CNB_LOG_LEVEL";

pub const DEFAULT_LOG_LEVEL: &str = "info";

fn env_or(var: &str, default: impl FnOnce() -> PathBuf) -> PathBuf {
  match std::env::var(var) {
    Ok(value) if !value.is_empty() => PathBuf::from(value),
    _ => default(),
  }
}

#[cfg(windows)]
fn root_dir() -> PathBuf {
  let drive = std::env::var("SYSTEMDRIVE").unwrap_or_else(|_| "C:".to_string());
  PathBuf::from(format!("{}\\", drive))
}

#[cfg(not(windows))]
fn root_dir() -> PathBuf {
  PathBuf::from("/")
}

/// Returns the application source directory
pub fn app_dir() -> PathBuf {
  env_or(ENV_APP_DIR, || root_dir().join("workspace"))
}

/// Returns the directory buildpacks are installed in
pub fn buildpacks_dir() -> PathBuf {
  env_or(ENV_BUILDPACKS_DIR, || root_dir().join("cnb").join("buildpacks"))
}

/// Returns the directory image extensions are installed in
pub fn extensions_dir() -> PathBuf {
  env_or(ENV_EXTENSIONS_DIR, || root_dir().join("cnb").join("extensions"))
}

/// Returns the layers directory
pub fn layers_dir() -> PathBuf {
  env_or(ENV_LAYERS_DIR, || root_dir().join("layers"))
}

/// Returns the platform directory
pub fn platform_dir() -> PathBuf {
  env_or(ENV_PLATFORM_DIR, || root_dir().join("platform"))
}

/// Returns the order file.
///
/// Without `CNB_ORDER_PATH`, an `order.toml` in the layers directory takes precedence
/// over the builder's `/cnb/order.toml`.
pub fn order_path() -> PathBuf {
  env_or(ENV_ORDER_PATH, || {
    let layers_order = layers_dir().join("order.toml");
    if layers_order.exists() {
      layers_order
    } else {
      root_dir().join("cnb").join("order.toml")
    }
  })
}

/// Returns the log level requested by the platform
pub fn log_level() -> String {
  std::env::var(ENV_LOG_LEVEL)
    .ok()
    .filter(|level| !level.is_empty())
    .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string())
}
