//! Running a buildpack's detect step.
//!
//! The detector treats every buildpack as a [`Buildable`]: something with a static
//! [`Descriptor`] and a synchronous `detect` that reports a [`DetectRun`]. [`DirBuildable`]
//! is the on-disk implementation that executes `<dir>/bin/detect`.

use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, warn};

use crate::consts::APP_NAME;

use super::env::BuildEnv;
use super::plan::BuildPlan;
use super::types::{Descriptor, Kind};

/// The buildpack applies to the application.
pub const CODE_DETECT_PASS: i32 = 0;
/// The buildpack does not apply to the application.
pub const CODE_DETECT_FAIL: i32 = 100;
/// The detect step could not be executed or produced invalid output.
pub const CODE_DETECT_ERROR: i32 = -1;

/// Errors that can occur while running a detect step.
#[derive(Debug, Error)]
pub enum DetectRunError {
  #[error("failed to create plan directory: {0}")]
  PlanDir(#[source] io::Error),

  #[error("failed to read platform env: {0}")]
  PlatformEnv(#[source] io::Error),

  #[error("failed to run {path}: {source}")]
  Spawn {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to capture detect output: {0}")]
  Output(#[source] io::Error),

  #[error("detect terminated abnormally: {0}")]
  Terminated(ExitStatus),

  #[error("failed to read {path}: {source}")]
  ReadPlan {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to parse {path}: {source}")]
  ParsePlan {
    path: PathBuf,
    #[source]
    source: toml::de::Error,
  },

  /// Extensions may only provide.
  #[error(r#"extension {0} outputs "requires" which is not allowed"#)]
  ExtensionRequires(String),

  #[error(
    r#"{noun} {id} has a "version" key and a "metadata.version" which cannot be specified together. "metadata.version" should be used instead"#,
    noun = noun(.kind)
  )]
  DoublySpecifiedVersion { kind: Kind, id: String },
}

fn noun(kind: &Kind) -> &'static str {
  match kind {
    Kind::Buildpack => "buildpack",
    Kind::Extension => "extension",
  }
}

/// Outcome of one buildpack's detect step.
#[derive(Debug, Clone, Default)]
pub struct DetectRun {
  pub plan: BuildPlan,
  /// Stdout and stderr of the detect process, interleaved as written.
  pub output: Vec<u8>,
  pub code: i32,
  pub err: Option<Arc<DetectRunError>>,
}

impl DetectRun {
  pub fn pass(plan: BuildPlan) -> Self {
    Self {
      plan,
      ..Default::default()
    }
  }

  pub fn fail() -> Self {
    Self {
      code: CODE_DETECT_FAIL,
      ..Default::default()
    }
  }

  pub fn error(err: DetectRunError) -> Self {
    Self {
      code: CODE_DETECT_ERROR,
      err: Some(Arc::new(err)),
      ..Default::default()
    }
  }

  pub fn with_output(mut self, output: impl Into<Vec<u8>>) -> Self {
    self.output = output.into();
    self
  }
}

/// Directories a detect step runs against.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DetectConfig {
  pub app_dir: PathBuf,
  pub platform_dir: PathBuf,
}

/// A buildpack or extension that can be detected.
pub trait Buildable: Send + Sync {
  fn descriptor(&self) -> &Descriptor;

  /// Run the detect step. Blocks until the step finishes.
  fn detect(&self, config: &DetectConfig, env: &BuildEnv) -> DetectRun;
}

/// A buildpack or extension laid out on disk.
#[derive(Debug, Clone)]
pub struct DirBuildable {
  descriptor: Descriptor,
}

impl DirBuildable {
  pub fn new(descriptor: Descriptor) -> Self {
    Self { descriptor }
  }

  fn detect_path(&self) -> PathBuf {
    self.descriptor.dir.join("bin").join("detect")
  }

  fn dir_env_var(&self) -> &'static str {
    match self.descriptor.kind {
      Kind::Buildpack => "CNB_BUILDPACK_DIR",
      Kind::Extension => "CNB_EXTENSION_DIR",
    }
  }

  /// Extensions may skip `bin/detect` and ship a static `detect/plan.toml`.
  fn prebuilt_plan(&self) -> DetectRun {
    let id = &self.descriptor.info.id;
    debug!(extension = %id, "passing detect due to missing bin/detect");

    let plan_path = self.descriptor.dir.join("detect").join("plan.toml");
    if !plan_path.exists() {
      return DetectRun::pass(BuildPlan::default());
    }
    match read_plan(&plan_path) {
      Ok(plan) => self.validate(plan, Vec::new()),
      Err(err) => DetectRun::error(err),
    }
  }

  fn run_detect(&self, config: &DetectConfig, env: &BuildEnv) -> Result<DetectRun, DetectRunError> {
    let desc = &self.descriptor;

    let plan_dir = tempfile::Builder::new()
      .prefix(&format!("{}-plan-", APP_NAME))
      .tempdir()
      .map_err(DetectRunError::PlanDir)?;
    let plan_path = plan_dir.path().join("plan.toml");
    fs::write(&plan_path, "").map_err(DetectRunError::PlanDir)?;

    let vars = if desc.info.clear_env {
      env.list()
    } else {
      env
        .with_platform(&config.platform_dir)
        .map_err(DetectRunError::PlatformEnv)?
    };

    // One pipe for both streams keeps the output in the order it was written.
    let (mut reader, writer) = io::pipe().map_err(DetectRunError::Output)?;
    let stdout = writer.try_clone().map_err(DetectRunError::Output)?;

    let mut child = {
      let mut cmd = Command::new(self.detect_path());
      cmd
        .arg(&config.platform_dir)
        .arg(&plan_path)
        .current_dir(&config.app_dir)
        .env_clear()
        .envs(vars)
        .env(self.dir_env_var(), &desc.dir)
        .env("CNB_PLATFORM_DIR", &config.platform_dir)
        .env("CNB_BUILD_PLAN_PATH", &plan_path)
        .stdin(Stdio::null())
        .stdout(stdout)
        .stderr(writer);
      cmd.spawn().map_err(|source| DetectRunError::Spawn {
        path: self.detect_path(),
        source,
      })?
    };

    let mut captured = Vec::new();
    let read = reader.read_to_end(&mut captured);
    let status = child.wait().map_err(DetectRunError::Output)?;
    read.map_err(DetectRunError::Output)?;

    let Some(code) = status.code() else {
      return Ok(DetectRun::error(DetectRunError::Terminated(status)).with_output(captured));
    };
    if code != CODE_DETECT_PASS {
      return Ok(DetectRun {
        code,
        output: captured,
        ..Default::default()
      });
    }

    match read_plan(&plan_path) {
      Ok(plan) => Ok(self.validate(plan, captured)),
      Err(err) => Ok(DetectRun::error(err).with_output(captured)),
    }
  }

  fn validate(&self, plan: BuildPlan, output: Vec<u8>) -> DetectRun {
    let kind = self.descriptor.kind;
    let id = &self.descriptor.info.id;

    if kind == Kind::Extension && plan.has_requires() {
      return DetectRun::error(DetectRunError::ExtensionRequires(id.clone())).with_output(output);
    }
    if plan.has_doubly_specified_versions() {
      return DetectRun::error(DetectRunError::DoublySpecifiedVersion { kind, id: id.clone() }).with_output(output);
    }
    if plan.has_top_level_versions() {
      warn!(
        buildpack = %id,
        r#"buildpack has a "version" key; this key is deprecated in build plan requirements, "metadata.version" should be used instead"#
      );
    }

    DetectRun::pass(plan).with_output(output)
  }
}

impl Buildable for DirBuildable {
  fn descriptor(&self) -> &Descriptor {
    &self.descriptor
  }

  fn detect(&self, config: &DetectConfig, env: &BuildEnv) -> DetectRun {
    if self.descriptor.kind == Kind::Extension && !self.detect_path().exists() {
      return self.prebuilt_plan();
    }

    self.run_detect(config, env).unwrap_or_else(DetectRun::error)
  }
}

fn read_plan(path: &Path) -> Result<BuildPlan, DetectRunError> {
  let text = fs::read_to_string(path).map_err(|source| DetectRunError::ReadPlan {
    path: path.to_path_buf(),
    source,
  })?;
  toml::from_str(&text).map_err(|source| DetectRunError::ParsePlan {
    path: path.to_path_buf(),
    source,
  })
}
