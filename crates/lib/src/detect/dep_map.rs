//! Provide/require bookkeeping for one trial.
//!
//! The map replays each option's provides and then its requires in group order. A require
//! binds to every provide of the same name seen since the previous require of that name.
//! A require seen before any provider is recorded as an early require. A provide that no
//! later require consumes is left over as an extra provide.

use std::collections::BTreeMap;

use crate::buildpack::{BuildPlanEntry, GroupElement, Require};

use super::trial::DetectTrial;

/// Bookkeeping for one dependency name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DepEntry {
  pub providers: Vec<GroupElement>,
  pub requires: Vec<Require>,
  pub early_requires: Vec<GroupElement>,
  pub extra_provides: Vec<GroupElement>,
}

impl DepEntry {
  pub fn plan_entry(&self) -> BuildPlanEntry {
    BuildPlanEntry {
      providers: self.providers.clone(),
      requires: self.requires.clone(),
    }
  }
}

/// Dependency names of a trial, iterated in sorted order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DepMap {
  entries: BTreeMap<String, DepEntry>,
}

impl DepMap {
  pub fn new(trial: &DetectTrial) -> Self {
    let mut entries: BTreeMap<String, DepEntry> = BTreeMap::new();

    for option in trial.iter() {
      for provide in &option.sections.provides {
        entries
          .entry(provide.name.clone())
          .or_default()
          .extra_provides
          .push(option.element.clone());
      }

      for require in &option.sections.requires {
        let entry = entries.entry(require.name.clone()).or_default();
        let pending = std::mem::take(&mut entry.extra_provides);
        entry.providers.extend(pending);

        if entry.providers.is_empty() {
          entry.early_requires.push(option.element.clone());
        } else {
          entry.requires.push(require.clone());
        }
      }
    }

    Self { entries }
  }

  pub fn get(&self, name: &str) -> Option<&DepEntry> {
    self.entries.get(name)
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  /// Elements that require a name before anything provides it.
  pub fn unmet_requires(&self) -> impl Iterator<Item = (&str, &GroupElement)> {
    self
      .entries
      .iter()
      .flat_map(|(name, entry)| entry.early_requires.iter().map(move |el| (name.as_str(), el)))
  }

  /// Elements that provide a name nothing later requires.
  pub fn unmet_provides(&self) -> impl Iterator<Item = (&str, &GroupElement)> {
    self
      .entries
      .iter()
      .flat_map(|(name, entry)| entry.extra_provides.iter().map(move |el| (name.as_str(), el)))
  }

  /// Plan entries with optional flags stripped from providers.
  pub fn plan_entries(&self) -> Vec<BuildPlanEntry> {
    self.entries.values().map(|entry| entry.plan_entry().no_opt()).collect()
  }
}
