//! Error and result types for detection.

use serde::Serialize;
use thiserror::Error;

use crate::buildpack::{BuildPlanEntry, Group, GroupElement, Plan, StoreError};

/// Category of a failed detection, used by callers to pick exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorType {
  /// At least one required buildpack errored.
  Buildpack,
  /// No group resolved, and every buildpack ran cleanly.
  FailedDetection,
}

/// Errors that can occur during detection.
#[derive(Debug, Error)]
pub enum DetectError {
  /// No combination of the group's buildpacks satisfied the plan.
  #[error("no buildpacks participating")]
  FailedDetection,

  /// A required buildpack exited with an unexpected code.
  #[error("buildpack(s) failed with err")]
  Buildpack,

  /// A group element reached resolution without a detect result.
  #[error("missing detection of '{0}'")]
  MissingDetection(String),

  #[error(r#"extension {0} contains an "order" definition which is not allowed"#)]
  ExtensionOrder(String),

  /// A meta-buildpack references itself through its nested orders.
  #[error("cyclical buildpack order: {0}")]
  OrderCycle(String),

  #[error(transparent)]
  Store(#[from] StoreError),
}

impl DetectError {
  pub fn error_type(&self) -> Option<ErrorType> {
    match self {
      DetectError::FailedDetection => Some(ErrorType::FailedDetection),
      DetectError::Buildpack => Some(ErrorType::Buildpack),
      _ => None,
    }
  }

  /// Whether the next alternative of an order should be tried after this error.
  pub(crate) fn is_retryable(&self) -> bool {
    self.error_type().is_some()
  }
}

/// Surviving group elements and their plan entries.
pub type Resolution = (Vec<GroupElement>, Vec<BuildPlanEntry>);

/// The outcome of a successful detection.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DetectOutput {
  pub group: Group,
  pub plan: Plan,
}
