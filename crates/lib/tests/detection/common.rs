//! Shared helpers for detection integration tests.

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use lifecycle_lib::buildpack::{BuildEnv, DetectConfig, DirStore, Order, escape_id};
use lifecycle_lib::detect::{DetectError, DetectOutput, Detector};
use tempfile::TempDir;

/// Isolated buildpacks, extensions, app and platform directories.
pub struct TestEnv {
  pub temp: TempDir,
}

impl TestEnv {
  pub fn new() -> Self {
    let temp = TempDir::new().unwrap();
    for dir in ["buildpacks", "extensions", "app", "platform", "calls"] {
      fs::create_dir_all(temp.path().join(dir)).unwrap();
    }
    Self { temp }
  }

  pub fn path(&self, name: &str) -> PathBuf {
    self.temp.path().join(name)
  }

  fn module_dir(&self, root: &str, id: &str, version: &str) -> PathBuf {
    let dir = self.path(root).join(escape_id(id)).join(version);
    fs::create_dir_all(&dir).unwrap();
    dir
  }

  /// Write a buildpack whose detect step writes `plan` and exits with `code`.
  ///
  /// Every invocation appends a line to `calls/<id>@<version>`.
  pub fn buildpack(&self, id: &str, version: &str, plan: &str, code: i32) -> &Self {
    let dir = self.module_dir("buildpacks", id, version);
    fs::write(
      dir.join("buildpack.toml"),
      format!("api = \"0.9\"\n\n[buildpack]\nid = \"{}\"\nversion = \"{}\"\n", id, version),
    )
    .unwrap();

    let calls = self.path("calls").join(format!("{}@{}", escape_id(id), version));
    let script = format!(
      "#!/bin/sh\necho detect >> '{}'\ncat > \"$2\" <<'PLAN'\n{}\nPLAN\nexit {}\n",
      calls.display(),
      plan,
      code
    );
    write_executable(&dir.join("bin").join("detect"), &script);
    self
  }

  /// Write a meta-buildpack with the given `[[order]]` TOML.
  pub fn meta(&self, id: &str, version: &str, order: &str) -> &Self {
    let dir = self.module_dir("buildpacks", id, version);
    fs::write(
      dir.join("buildpack.toml"),
      format!(
        "api = \"0.9\"\n\n[buildpack]\nid = \"{}\"\nversion = \"{}\"\n\n{}\n",
        id, version, order
      ),
    )
    .unwrap();
    self
  }

  /// Write an extension with a static plan and no detect binary.
  pub fn extension(&self, id: &str, version: &str, plan: &str) -> &Self {
    let dir = self.module_dir("extensions", id, version);
    fs::write(
      dir.join("extension.toml"),
      format!("api = \"0.9\"\n\n[extension]\nid = \"{}\"\nversion = \"{}\"\n", id, version),
    )
    .unwrap();
    fs::create_dir_all(dir.join("detect")).unwrap();
    fs::write(dir.join("detect").join("plan.toml"), plan).unwrap();
    self
  }

  /// How often the detect step of a buildpack ran.
  pub fn calls(&self, id: &str, version: &str) -> usize {
    let path = self.path("calls").join(format!("{}@{}", escape_id(id), version));
    fs::read_to_string(path).map(|s| s.lines().count()).unwrap_or(0)
  }

  pub fn detector(&self) -> Detector {
    let store = DirStore::new(self.path("buildpacks"), Some(self.path("extensions")));
    let config = DetectConfig {
      app_dir: self.path("app"),
      platform_dir: self.path("platform"),
    };
    Detector::new(config, BuildEnv::from_os(), Arc::new(store))
  }

  pub async fn detect(&self, order: &str) -> Result<DetectOutput, DetectError> {
    self.detector().detect_order(&parse_order(order)).await
  }
}

/// Parse `[[order]]` TOML.
pub fn parse_order(text: &str) -> Order {
  #[derive(serde::Deserialize)]
  struct File {
    order: Order,
  }
  toml::from_str::<File>(text).unwrap().order
}

fn write_executable(path: &Path, content: &str) {
  fs::create_dir_all(path.parent().unwrap()).unwrap();
  fs::write(path, content).unwrap();
  fs::set_permissions(path, fs::Permissions::from_mode(0o755)).unwrap();
}

/// `id@version` of each element of the resolved group.
pub fn ids(output: &DetectOutput) -> Vec<String> {
  output.group.group.iter().map(|e| e.to_string()).collect()
}
