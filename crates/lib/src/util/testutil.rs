//! Test utilities for lifecycle-lib.
//!
//! In-memory buildables and stores for driving the detector without touching disk,
//! plus a helper for writing executable detect scripts.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::buildpack::{
  BuildEnv, BuildPlan, Buildable, Descriptor, DetectConfig, DetectRun, DetectRunError, Group, GroupElement, Info, Kind,
  Order, PlanSections, Provide, Require, Store, StoreError,
};

/// Write an executable `/bin/sh` script.
#[cfg(unix)]
pub fn write_script(path: &Path, body: &str) {
  use std::os::unix::fs::PermissionsExt;

  if let Some(parent) = path.parent() {
    std::fs::create_dir_all(parent).unwrap();
  }
  std::fs::write(path, format!("#!/bin/sh\n{}\n", body)).unwrap();
  std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).unwrap();
}

/// Shorthand for a required buildpack reference.
pub fn el(id: &str, version: &str) -> GroupElement {
  GroupElement::new(id, version)
}

pub fn group(elements: Vec<GroupElement>) -> Group {
  Group::new(elements)
}

/// Plan sections from `provides` and `requires` names.
pub fn sections(provides: &[&str], requires: &[&str]) -> PlanSections {
  PlanSections {
    provides: provides.iter().map(|n| Provide::new(*n)).collect(),
    requires: requires.iter().map(|n| Require::new(*n)).collect(),
  }
}

/// A passing run with a primary section and alternatives.
pub fn pass_with(primary: PlanSections, or: Vec<PlanSections>) -> DetectRun {
  DetectRun::pass(BuildPlan { sections: primary, or })
}

/// A run whose detect binary could not be executed.
pub fn errored(message: &str) -> DetectRun {
  DetectRun::error(DetectRunError::Spawn {
    path: PathBuf::from("/cnb/buildpacks/bin/detect"),
    source: std::io::Error::other(message.to_string()),
  })
}

/// A buildable that returns a canned run and counts invocations.
pub struct FakeBuildable {
  descriptor: Descriptor,
  run: DetectRun,
  calls: AtomicUsize,
}

impl FakeBuildable {
  pub fn calls(&self) -> usize {
    self.calls.load(Ordering::SeqCst)
  }
}

impl Buildable for FakeBuildable {
  fn descriptor(&self) -> &Descriptor {
    &self.descriptor
  }

  fn detect(&self, _config: &DetectConfig, _env: &BuildEnv) -> DetectRun {
    self.calls.fetch_add(1, Ordering::SeqCst);
    self.run.clone()
  }
}

type StoreKey = (Kind, String, String);

/// An in-memory store of fake buildables.
#[derive(Default)]
pub struct FakeStore {
  modules: HashMap<StoreKey, Arc<FakeBuildable>>,
  lookups: Mutex<Vec<String>>,
}

impl FakeStore {
  pub fn new() -> Self {
    Self::default()
  }

  fn insert(mut self, kind: Kind, id: &str, version: &str, order: Order, run: DetectRun) -> Self {
    let descriptor = Descriptor {
      api: "0.9".to_string(),
      kind,
      info: Info {
        id: id.to_string(),
        version: version.to_string(),
        homepage: format!("https://example.com/{}", id),
        ..Default::default()
      },
      order,
      dir: PathBuf::from("/cnb/buildpacks").join(id).join(version),
    };
    let fake = FakeBuildable {
      descriptor,
      run,
      calls: AtomicUsize::new(0),
    };
    self
      .modules
      .insert((kind, id.to_string(), version.to_string()), Arc::new(fake));
    self
  }

  pub fn buildpack(self, id: &str, version: &str, run: DetectRun) -> Self {
    self.insert(Kind::Buildpack, id, version, Vec::new(), run)
  }

  pub fn meta(self, id: &str, version: &str, order: Order) -> Self {
    self.insert(Kind::Buildpack, id, version, order, errored("meta-buildpacks are not detected"))
  }

  pub fn extension(self, id: &str, version: &str, run: DetectRun) -> Self {
    self.insert(Kind::Extension, id, version, Vec::new(), run)
  }

  /// An extension whose descriptor wrongly declares an order.
  pub fn extension_with_order(self, id: &str, version: &str, order: Order) -> Self {
    self.insert(Kind::Extension, id, version, order, DetectRun::pass(BuildPlan::default()))
  }

  /// How often the detect step of a buildable ran.
  pub fn calls(&self, kind: Kind, id: &str, version: &str) -> usize {
    self
      .modules
      .get(&(kind, id.to_string(), version.to_string()))
      .map(|m| m.calls())
      .unwrap_or(0)
  }

  pub fn lookups(&self) -> Vec<String> {
    self.lookups.lock().unwrap().clone()
  }
}

impl Store for FakeStore {
  fn lookup(&self, kind: Kind, id: &str, version: &str) -> Result<Arc<dyn Buildable>, StoreError> {
    self.lookups.lock().unwrap().push(format!("{}@{}", id, version));
    match self.modules.get(&(kind, id.to_string(), version.to_string())) {
      Some(module) => Ok(module.clone() as Arc<dyn Buildable>),
      None => Err(StoreError::Read {
        path: PathBuf::from(format!("/cnb/buildpacks/{}/{}", id, version)),
        source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
      }),
    }
  }
}
