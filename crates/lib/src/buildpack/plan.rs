//! Build plan contributions and the resolved plan.
//!
//! During detection each buildpack writes a plan with a primary set of provides and
//! requires plus any number of `or` alternatives. Resolution picks exactly one of these
//! sections per buildpack and merges the result into [`BuildPlanEntry`] values.

use serde::{Deserialize, Serialize};

use super::types::GroupElement;

/// A dependency a buildpack needs from an earlier buildpack in the group.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Require {
  pub name: String,
  /// Deprecated in favour of `metadata.version`.
  #[serde(default, skip_serializing_if = "String::is_empty")]
  pub version: String,
  #[serde(default, skip_serializing_if = "toml::Table::is_empty")]
  pub metadata: toml::Table,
}

impl Require {
  pub fn new(name: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      ..Default::default()
    }
  }

  pub fn with_version(mut self, version: impl Into<String>) -> Self {
    self.version = version.into();
    self
  }

  /// Move a top-level version into `metadata.version`.
  pub fn convert_version_to_metadata(&mut self) {
    if !self.version.is_empty() {
      let version = std::mem::take(&mut self.version);
      self.metadata.insert("version".to_string(), toml::Value::String(version));
    }
  }

  pub fn has_doubly_specified_version(&self) -> bool {
    !self.version.is_empty() && self.metadata.contains_key("version")
  }
}

/// A dependency a buildpack offers to later buildpacks in the group.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provide {
  pub name: String,
}

impl Provide {
  pub fn new(name: impl Into<String>) -> Self {
    Self { name: name.into() }
  }
}

/// One mutually exclusive set of provides and requires.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanSections {
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub requires: Vec<Require>,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub provides: Vec<Provide>,
}

impl PlanSections {
  pub fn has_top_level_versions(&self) -> bool {
    self.requires.iter().any(|r| !r.version.is_empty())
  }

  pub fn has_doubly_specified_versions(&self) -> bool {
    self.requires.iter().any(Require::has_doubly_specified_version)
  }
}

/// The plan written by a buildpack's detect step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BuildPlan {
  #[serde(flatten)]
  pub sections: PlanSections,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub or: Vec<PlanSections>,
}

impl BuildPlan {
  /// The primary section followed by each alternative.
  pub fn options(&self) -> impl Iterator<Item = &PlanSections> {
    std::iter::once(&self.sections).chain(self.or.iter())
  }

  pub fn has_requires(&self) -> bool {
    self.options().any(|s| !s.requires.is_empty())
  }

  pub fn has_top_level_versions(&self) -> bool {
    self.options().any(PlanSections::has_top_level_versions)
  }

  pub fn has_doubly_specified_versions(&self) -> bool {
    self.options().any(PlanSections::has_doubly_specified_versions)
  }
}

/// Every provider and consumer of one dependency name in a resolved group.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BuildPlanEntry {
  pub providers: Vec<GroupElement>,
  pub requires: Vec<Require>,
}

impl BuildPlanEntry {
  /// Strip optional flags and descriptor details from the providers.
  pub fn no_opt(&self) -> Self {
    Self {
      providers: self
        .providers
        .iter()
        .map(|p| GroupElement {
          api: String::new(),
          homepage: String::new(),
          ..p.no_opt()
        })
        .collect(),
      requires: self.requires.clone(),
    }
  }
}

/// The merged build plan of a resolved group.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Plan {
  #[serde(default)]
  pub entries: Vec<BuildPlanEntry>,
}
