//! Implementation of the `lifecycle detect` command.
//!
//! Reads the order file, runs detection against the app directory and prints the
//! selected group with its build plan.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use tracing::{info, warn};

use lifecycle_lib::buildpack::{BuildEnv, DetectConfig, DirStore};
use lifecycle_lib::detect::{DetectError, DetectOutput, Detector, ErrorType};
use lifecycle_lib::platform::{DetectInputs, read_order};

use crate::output::{OutputFormat, print_error, print_json};

/// Exit code when no group passes detection.
pub const EXIT_FAILED_DETECT: u8 = 20;
/// Exit code when a buildpack errored and no group passed.
pub const EXIT_FAILED_DETECT_WITH_ERRORS: u8 = 21;
/// Exit code for any other detection error.
pub const EXIT_DETECT_ERROR: u8 = 22;
/// Exit code for invalid inputs.
pub const EXIT_INVALID_INPUT: u8 = 1;

#[derive(Debug, Args)]
pub struct DetectArgs {
  /// Application directory (default: $CNB_APP_DIR or /workspace)
  #[arg(long = "app")]
  pub app_dir: Option<PathBuf>,

  /// Directory of installed buildpacks (default: $CNB_BUILDPACKS_DIR or /cnb/buildpacks)
  #[arg(long = "buildpacks")]
  pub buildpacks_dir: Option<PathBuf>,

  /// Directory of installed extensions (default: $CNB_EXTENSIONS_DIR or /cnb/extensions)
  #[arg(long = "extensions")]
  pub extensions_dir: Option<PathBuf>,

  /// Path to order.toml (default: $CNB_ORDER_PATH, <layers>/order.toml or /cnb/order.toml)
  #[arg(long = "order")]
  pub order_path: Option<PathBuf>,

  /// Platform directory (default: $CNB_PLATFORM_DIR or /platform)
  #[arg(long = "platform")]
  pub platform_dir: Option<PathBuf>,

  /// Output format
  #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
  pub output: OutputFormat,
}

impl DetectArgs {
  fn inputs(&self) -> DetectInputs {
    let mut inputs = DetectInputs::from_env();
    if let Some(dir) = &self.app_dir {
      inputs.app_dir = dir.clone();
    }
    if let Some(dir) = &self.buildpacks_dir {
      inputs.buildpacks_dir = dir.clone();
    }
    if let Some(dir) = &self.extensions_dir {
      inputs.extensions_dir = dir.clone();
    }
    if let Some(path) = &self.order_path {
      inputs.order_path = path.clone();
    }
    if let Some(dir) = &self.platform_dir {
      inputs.platform_dir = dir.clone();
    }
    inputs
  }
}

pub fn cmd_detect(args: &DetectArgs) -> Result<()> {
  let inputs = args.inputs();
  inputs.validate()?;

  let (order, extensions) = read_order(&inputs.order_path)?;
  let extensions_dir = inputs.installed_extensions_dir();
  if !extensions.is_empty() && extensions_dir.is_none() {
    warn!(
      path = %inputs.extensions_dir.display(),
      "order file lists extensions but no extensions directory exists"
    );
  }

  let app_dir = dunce::canonicalize(&inputs.app_dir)
    .with_context(|| format!("Failed to resolve app directory: {}", inputs.app_dir.display()))?;
  let platform_dir = dunce::canonicalize(&inputs.platform_dir).unwrap_or_else(|_| inputs.platform_dir.clone());

  info!(
    app = %app_dir.display(),
    order = %inputs.order_path.display(),
    groups = order.len(),
    "starting detection"
  );

  let store = DirStore::new(inputs.buildpacks_dir.clone(), extensions_dir);
  let detector = Detector::new(
    DetectConfig { app_dir, platform_dir },
    BuildEnv::from_os(),
    Arc::new(store),
  );

  let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;
  let output = match rt.block_on(detector.detect(&order, &extensions)) {
    Ok(output) => output,
    Err(err) => {
      report_failure(&err);
      return Err(err.into());
    }
  };

  match args.output {
    OutputFormat::Json => print_json(&output)?,
    OutputFormat::Text => print!("{}", render_text(&output)?),
  }

  Ok(())
}

fn report_failure(err: &DetectError) {
  match err.error_type() {
    Some(ErrorType::FailedDetection) => {
      print_error("No buildpack groups passed detection.");
      print_error("Please check that you are running against the correct path.");
    }
    Some(ErrorType::Buildpack) => print_error("No buildpack groups passed detection."),
    None => {}
  }
}

/// `group.toml` followed by `plan.toml`, each under a comment header.
fn render_text(output: &DetectOutput) -> Result<String> {
  let group = toml::to_string(&output.group).context("Failed to serialize group")?;
  let plan = toml::to_string(&output.plan).context("Failed to serialize plan")?;

  Ok(format!("# group.toml\n{}\n# plan.toml\n{}", group, plan))
}

/// Process exit code for an error returned by a command.
pub fn exit_code(err: &anyhow::Error) -> u8 {
  match err.downcast_ref::<DetectError>().map(DetectError::error_type) {
    Some(Some(ErrorType::FailedDetection)) => EXIT_FAILED_DETECT,
    Some(Some(ErrorType::Buildpack)) => EXIT_FAILED_DETECT_WITH_ERRORS,
    Some(None) => EXIT_DETECT_ERROR,
    None => EXIT_INVALID_INPUT,
  }
}
