//! Lookup of buildpack and extension descriptors.
//!
//! Buildpacks live at `<buildpacks_dir>/<escaped id>/<version>/buildpack.toml` and
//! extensions at `<extensions_dir>/<escaped id>/<version>/extension.toml`.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;
use thiserror::Error;
use tracing::trace;

use crate::consts::{BUILDPACK_DESCRIPTOR, EXTENSION_DESCRIPTOR};

use super::detect::{Buildable, DirBuildable};
use super::types::{Descriptor, Info, Kind, Order};

/// Errors that can occur while looking up a descriptor.
#[derive(Debug, Error)]
pub enum StoreError {
  /// An extension was requested but no extensions directory is configured.
  #[error("extensions directory not configured, cannot look up extension {id}@{version}")]
  MissingExtensionsDir { id: String, version: String },

  #[error("failed to read descriptor {path}: {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to parse descriptor {path}: {source}")]
  Parse {
    path: PathBuf,
    #[source]
    source: toml::de::Error,
  },

  /// The descriptor does not declare the table for its kind.
  #[error("descriptor {path} has no [{table}] table")]
  MissingInfo { path: PathBuf, table: &'static str },
}

/// Resolves references to buildables.
pub trait Store: Send + Sync {
  fn lookup(&self, kind: Kind, id: &str, version: &str) -> Result<Arc<dyn Buildable>, StoreError>;
}

/// Escape an ID for use as a single path component.
pub fn escape_id(id: &str) -> String {
  id.replace('/', "_")
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct DescriptorFile {
  #[serde(default)]
  api: String,
  buildpack: Option<Info>,
  extension: Option<Info>,
  #[serde(default)]
  order: Order,
}

/// Parse a descriptor file located in `dir`.
pub fn read_descriptor(kind: Kind, dir: &Path) -> Result<Descriptor, StoreError> {
  let (file_name, table) = match kind {
    Kind::Buildpack => (BUILDPACK_DESCRIPTOR, "buildpack"),
    Kind::Extension => (EXTENSION_DESCRIPTOR, "extension"),
  };
  let path = dir.join(file_name);

  let text = fs::read_to_string(&path).map_err(|source| StoreError::Read {
    path: path.clone(),
    source,
  })?;
  let file: DescriptorFile = toml::from_str(&text).map_err(|source| StoreError::Parse {
    path: path.clone(),
    source,
  })?;

  let info = match kind {
    Kind::Buildpack => file.buildpack,
    Kind::Extension => file.extension,
  }
  .ok_or(StoreError::MissingInfo { path, table })?;

  Ok(Descriptor {
    api: file.api,
    kind,
    info,
    order: file.order,
    dir: dir.to_path_buf(),
  })
}

/// A store backed by the buildpacks and extensions directories.
#[derive(Debug, Clone)]
pub struct DirStore {
  buildpacks_dir: PathBuf,
  extensions_dir: Option<PathBuf>,
}

impl DirStore {
  pub fn new(buildpacks_dir: impl Into<PathBuf>, extensions_dir: Option<PathBuf>) -> Self {
    Self {
      buildpacks_dir: buildpacks_dir.into(),
      extensions_dir,
    }
  }

  fn module_dir(&self, kind: Kind, id: &str, version: &str) -> Result<PathBuf, StoreError> {
    let root = match kind {
      Kind::Buildpack => &self.buildpacks_dir,
      Kind::Extension => self.extensions_dir.as_ref().ok_or_else(|| StoreError::MissingExtensionsDir {
        id: id.to_string(),
        version: version.to_string(),
      })?,
    };
    Ok(root.join(escape_id(id)).join(version))
  }
}

impl Store for DirStore {
  fn lookup(&self, kind: Kind, id: &str, version: &str) -> Result<Arc<dyn Buildable>, StoreError> {
    let dir = self.module_dir(kind, id, version)?;
    trace!(kind = %kind, id, version, dir = %dir.display(), "looking up descriptor");
    let descriptor = read_descriptor(kind, &dir)?;
    Ok(Arc::new(DirBuildable::new(descriptor)))
  }
}
