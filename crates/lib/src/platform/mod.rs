//! Inputs supplied by the platform: directories, the order file and the log level.

pub mod paths;

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::buildpack::Order;

/// Errors that can occur while reading platform inputs.
#[derive(Debug, Error)]
pub enum PlatformError {
  #[error("failed to read order file {path}: {source}")]
  ReadOrder {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to parse order file {path}: {source}")]
  ParseOrder {
    path: PathBuf,
    #[source]
    source: toml::de::Error,
  },

  /// A required directory does not exist.
  #[error("{what} directory not found: {path}")]
  MissingDir { what: &'static str, path: PathBuf },
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct OrderFile {
  #[serde(default)]
  order: Order,
  #[serde(default)]
  order_extensions: Order,
}

/// Read `order.toml`, returning the buildpack order and the extension order.
///
/// Elements of the extension order are marked as extensions.
pub fn read_order(path: &Path) -> Result<(Order, Order), PlatformError> {
  let text = fs::read_to_string(path).map_err(|source| PlatformError::ReadOrder {
    path: path.to_path_buf(),
    source,
  })?;
  let file: OrderFile = toml::from_str(&text).map_err(|source| PlatformError::ParseOrder {
    path: path.to_path_buf(),
    source,
  })?;

  let mut extensions = file.order_extensions;
  for group in &mut extensions {
    for el in &mut group.group {
      el.extension = true;
    }
  }

  Ok((file.order, extensions))
}

/// Everything the detect phase reads from the platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectInputs {
  pub app_dir: PathBuf,
  pub buildpacks_dir: PathBuf,
  pub extensions_dir: PathBuf,
  pub order_path: PathBuf,
  pub platform_dir: PathBuf,
}

impl DetectInputs {
  /// Inputs from `CNB_*` variables, falling back to the platform defaults.
  pub fn from_env() -> Self {
    Self {
      app_dir: paths::app_dir(),
      buildpacks_dir: paths::buildpacks_dir(),
      extensions_dir: paths::extensions_dir(),
      order_path: paths::order_path(),
      platform_dir: paths::platform_dir(),
    }
  }

  /// Check that the directories detection cannot run without exist.
  pub fn validate(&self) -> Result<(), PlatformError> {
    if !self.app_dir.is_dir() {
      return Err(PlatformError::MissingDir {
        what: "app",
        path: self.app_dir.clone(),
      });
    }
    if !self.buildpacks_dir.is_dir() {
      return Err(PlatformError::MissingDir {
        what: "buildpacks",
        path: self.buildpacks_dir.clone(),
      });
    }
    Ok(())
  }

  /// The extensions directory, if extensions are installed.
  pub fn installed_extensions_dir(&self) -> Option<PathBuf> {
    self.extensions_dir.is_dir().then(|| self.extensions_dir.clone())
  }
}
