//! Buildpack references, build plans and the collaborators the detector drives.

mod detect;
mod env;
mod plan;
mod store;
mod types;

pub use detect::{
  Buildable, CODE_DETECT_ERROR, CODE_DETECT_FAIL, CODE_DETECT_PASS, DetectConfig, DetectRun, DetectRunError,
  DirBuildable,
};
pub use env::BuildEnv;
pub use plan::{BuildPlan, BuildPlanEntry, Plan, PlanSections, Provide, Require};
pub use store::{DirStore, Store, StoreError, escape_id, read_descriptor};
pub use types::{Descriptor, Group, GroupElement, Info, Kind, Order, prepend_extensions};
