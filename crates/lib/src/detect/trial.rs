//! Trials: one choice of plan section per passing buildpack.

use crate::buildpack::{BuildPlan, GroupElement, PlanSections};

use super::dep_map::DepMap;
use super::types::DetectError;

/// A buildpack paired with one of its plan sections.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectOption {
  pub element: GroupElement,
  pub sections: PlanSections,
}

/// Every option of a passing buildpack: the primary section first, then each alternative.
///
/// Only the last option keeps the element's optional flag. Picking an earlier
/// alternative commits the buildpack to the group.
pub fn options_for(element: &GroupElement, plan: &BuildPlan) -> Vec<DetectOption> {
  let last = plan.or.len();
  plan
    .options()
    .enumerate()
    .map(|(i, sections)| DetectOption {
      element: GroupElement {
        optional: element.optional && i == last,
        ..element.clone()
      },
      sections: sections.clone(),
    })
    .collect()
}

/// An ordered list of options, one per buildpack still participating.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetectTrial {
  options: Vec<DetectOption>,
}

impl DetectTrial {
  pub fn new(options: Vec<DetectOption>) -> Self {
    Self { options }
  }

  /// Copy of the trial without `element`.
  pub fn remove(&self, element: &GroupElement) -> Self {
    Self {
      options: self.options.iter().filter(|o| &o.element != element).cloned().collect(),
    }
  }

  pub fn iter(&self) -> std::slice::Iter<'_, DetectOption> {
    self.options.iter()
  }

  pub fn elements(&self) -> impl Iterator<Item = &GroupElement> {
    self.options.iter().map(|o| &o.element)
  }

  pub fn len(&self) -> usize {
    self.options.len()
  }

  pub fn is_empty(&self) -> bool {
    self.options.is_empty()
  }
}

impl FromIterator<DetectOption> for DetectTrial {
  fn from_iter<I: IntoIterator<Item = DetectOption>>(iter: I) -> Self {
    Self::new(iter.into_iter().collect())
  }
}

/// Run `f` on every combination of options, depth first, until one succeeds.
///
/// The first buildpack's options vary slowest. Returns the error of the last attempt
/// when no combination succeeds.
pub fn run_trials<F>(candidates: &[Vec<DetectOption>], mut f: F) -> Result<(DepMap, DetectTrial), DetectError>
where
  F: FnMut(DetectTrial) -> Result<(DepMap, DetectTrial), DetectError>,
{
  let mut prefix = Vec::with_capacity(candidates.len());
  run_trials_from(candidates, &mut prefix, &mut f)
}

fn run_trials_from<F>(
  candidates: &[Vec<DetectOption>],
  prefix: &mut Vec<DetectOption>,
  f: &mut F,
) -> Result<(DepMap, DetectTrial), DetectError>
where
  F: FnMut(DetectTrial) -> Result<(DepMap, DetectTrial), DetectError>,
{
  let Some((options, rest)) = candidates.split_first() else {
    return f(DetectTrial::new(prefix.clone()));
  };

  let mut last_err = DetectError::FailedDetection;
  for option in options {
    prefix.push(option.clone());
    let result = run_trials_from(rest, prefix, f);
    prefix.pop();

    match result {
      Ok(found) => return Ok(found),
      Err(err) => last_err = err,
    }
  }
  Err(last_err)
}
