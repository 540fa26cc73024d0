//! Group, order and descriptor types shared by the store and the detector.
//!
//! A [`GroupElement`] references one buildpack or extension by `id@version`. Groups are
//! ordered lists of elements and an [`Order`] is a list of alternative groups, tried in
//! declaration order until one of them resolves.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Whether a reference points at a buildpack or an image extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Kind {
  Buildpack,
  Extension,
}

impl fmt::Display for Kind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Kind::Buildpack => write!(f, "Buildpack"),
      Kind::Extension => write!(f, "Extension"),
    }
  }
}

fn is_false(value: &bool) -> bool {
  !*value
}

/// A reference to a buildpack or extension inside a group.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct GroupElement {
  pub id: String,
  #[serde(default)]
  pub version: String,
  #[serde(default, skip_serializing_if = "String::is_empty")]
  pub api: String,
  #[serde(default, skip_serializing_if = "String::is_empty")]
  pub homepage: String,
  #[serde(default, skip_serializing_if = "is_false")]
  pub optional: bool,
  #[serde(default, skip_serializing_if = "is_false")]
  pub extension: bool,

  /// Set only on the synthetic element that carries the extension order of a group.
  #[serde(skip)]
  pub order_extensions: Order,
}

impl GroupElement {
  /// Create a required buildpack reference.
  pub fn new(id: impl Into<String>, version: impl Into<String>) -> Self {
    Self {
      id: id.into(),
      version: version.into(),
      ..Default::default()
    }
  }

  pub fn optional(mut self) -> Self {
    self.optional = true;
    self
  }

  pub fn extension(mut self) -> Self {
    self.extension = true;
    self
  }

  pub fn with_api(mut self, api: impl Into<String>) -> Self {
    self.api = api.into();
    self
  }

  pub fn with_homepage(mut self, homepage: impl Into<String>) -> Self {
    self.homepage = homepage.into();
    self
  }

  /// Copy of this element with the optional flag cleared.
  pub fn no_opt(&self) -> Self {
    Self {
      optional: false,
      ..self.clone()
    }
  }

  /// Copy of this element with the extension flag cleared.
  pub fn no_extension(&self) -> Self {
    Self {
      extension: false,
      ..self.clone()
    }
  }

  pub fn kind(&self) -> Kind {
    if self.extension { Kind::Extension } else { Kind::Buildpack }
  }

  pub fn is_extensions_order(&self) -> bool {
    !self.order_extensions.is_empty()
  }
}

impl fmt::Display for GroupElement {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if self.version.is_empty() {
      write!(f, "{}", self.id)
    } else {
      write!(f, "{}@{}", self.id, self.version)
    }
  }
}

/// An ordered list of buildpacks, plus the extensions that ran ahead of them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Group {
  #[serde(default)]
  pub group: Vec<GroupElement>,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub group_extensions: Vec<GroupElement>,
}

impl Group {
  pub fn new(group: Vec<GroupElement>) -> Self {
    Self {
      group,
      group_extensions: Vec::new(),
    }
  }
}

/// Alternative groups, tried in order.
pub type Order = Vec<Group>;

/// The `[buildpack]` or `[extension]` table of a descriptor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Info {
  pub id: String,
  #[serde(default)]
  pub name: String,
  #[serde(default)]
  pub version: String,
  #[serde(default)]
  pub homepage: String,
  #[serde(default)]
  pub clear_env: bool,
}

/// Static metadata for a buildpack or extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Descriptor {
  pub api: String,
  pub kind: Kind,
  pub info: Info,
  /// Non-empty for meta-buildpacks, whose nested order is spliced in place of the reference.
  pub order: Order,
  /// Directory the descriptor was loaded from.
  pub dir: PathBuf,
}

impl Descriptor {
  pub fn is_meta(&self) -> bool {
    !self.order.is_empty()
  }
}

/// Put the extension order in front of every buildpack group.
///
/// Every extension reference becomes optional, so a group whose extensions all fail
/// detection still resolves with buildpacks alone.
pub fn prepend_extensions(order: &Order, extensions: &Order) -> Order {
  if extensions.is_empty() {
    return order.clone();
  }

  let extensions: Order = extensions
    .iter()
    .map(|group| Group {
      group: group
        .group
        .iter()
        .map(|el| GroupElement {
          extension: true,
          optional: true,
          ..el.clone()
        })
        .collect(),
      group_extensions: Vec::new(),
    })
    .collect();

  order
    .iter()
    .map(|group| {
      let mut elements = Vec::with_capacity(group.group.len() + 1);
      elements.push(GroupElement {
        order_extensions: extensions.clone(),
        ..Default::default()
      });
      elements.extend(group.group.iter().cloned());
      Group::new(elements)
    })
    .collect()
}
