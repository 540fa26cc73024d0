//! Resolution of a flat group into a consistent build plan.
//!
//! Resolution runs in two stages. First every element's detect result is logged and
//! classified. Failing required elements end resolution early. Then every combination
//! of plan sections is tried until one trial settles with each require bound to an
//! earlier provide and each provide consumed. Optional elements that break a trial are
//! dropped and the trial is re-checked.

use tracing::{debug, info};

use crate::buildpack::{CODE_DETECT_ERROR, CODE_DETECT_FAIL, CODE_DETECT_PASS, GroupElement};

use super::dep_map::DepMap;
use super::runs::{RunKey, Runs};
use super::trial::{DetectOption, DetectTrial, options_for, run_trials};
use super::types::{DetectError, Resolution};

/// Decides which elements of a detected group participate.
pub trait Resolver: Send + Sync {
  /// Resolve `done`, whose detect results are all present in `runs`.
  fn resolve(&self, done: &[GroupElement], runs: &Runs) -> Result<Resolution, DetectError>;
}

/// The standard provide/require resolver.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultResolver;

impl DefaultResolver {
  /// Settle one trial by dropping optional elements with unmet provides or requires.
  pub fn run_trial(&self, attempt: usize, trial: DetectTrial) -> Result<(DepMap, DetectTrial), DetectError> {
    debug!("Resolving plan... (try #{})", attempt);

    let mut trial = trial;
    let mut deps;
    loop {
      deps = DepMap::new(&trial);
      let mut retry = false;

      for (name, el) in deps.unmet_requires() {
        retry = true;
        if !el.optional {
          debug!("fail: {} requires {}", el, name);
          return Err(DetectError::FailedDetection);
        }
        debug!("skip: {} requires {}", el, name);
        trial = trial.remove(el);
      }

      for (name, el) in deps.unmet_provides() {
        retry = true;
        if !el.optional {
          debug!("fail: {} provides unused {}", el, name);
          return Err(DetectError::FailedDetection);
        }
        debug!("skip: {} provides unused {}", el, name);
        trial = trial.remove(el);
      }

      if !retry {
        break;
      }
    }

    if trial.is_empty() {
      debug!("fail: no viable buildpacks in group");
      return Err(DetectError::FailedDetection);
    }
    Ok((deps, trial))
  }
}

fn log_output(loud: bool, message: &str) {
  if loud {
    info!("{}", message);
  } else {
    debug!("{}", message);
  }
}

impl Resolver for DefaultResolver {
  fn resolve(&self, done: &[GroupElement], runs: &Runs) -> Result<Resolution, DetectError> {
    let mut detected = Vec::with_capacity(done.len());
    for el in done {
      let key = RunKey::from(el);
      let run = runs
        .load(&key)
        .ok_or_else(|| DetectError::MissingDetection(el.to_string()))?;

      let loud = run.code != CODE_DETECT_PASS && run.code != CODE_DETECT_FAIL;
      if !run.output.is_empty() {
        log_output(loud, &format!("======== Output: {} ========", el));
        log_output(loud, &String::from_utf8_lossy(&run.output));
      }
      if let Some(err) = &run.err {
        log_output(loud, &format!("======== Error: {} ========", el));
        log_output(loud, &err.to_string());
      }
      detected.push((el, run));
    }

    debug!("======== Results ========");

    let mut candidates: Vec<Vec<DetectOption>> = Vec::new();
    let mut all_required_passed = true;
    let mut any_buildpack_passed = false;
    let mut buildpack_err = false;
    for (el, run) in &detected {
      match run.code {
        CODE_DETECT_PASS => {
          debug!("pass: {}", el);
          candidates.push(options_for(el, &run.plan));
          if !el.extension {
            any_buildpack_passed = true;
          }
        }
        CODE_DETECT_FAIL => {
          if el.optional {
            debug!("skip: {}", el);
          } else {
            debug!("fail: {}", el);
          }
          all_required_passed &= el.optional;
        }
        CODE_DETECT_ERROR => {
          info!("err:  {}", el);
          buildpack_err = true;
          all_required_passed &= el.optional;
        }
        code => {
          info!("err:  {} ({})", el, code);
          buildpack_err = true;
          all_required_passed &= el.optional;
        }
      }
    }

    if !all_required_passed {
      return Err(if buildpack_err {
        DetectError::Buildpack
      } else {
        DetectError::FailedDetection
      });
    }
    if !any_buildpack_passed {
      debug!("fail: no viable buildpacks in group");
      return Err(DetectError::FailedDetection);
    }

    let mut attempt = 0;
    let (deps, trial) = run_trials(&candidates, |trial| {
      attempt += 1;
      self.run_trial(attempt, trial)
    })?;

    if trial.len() != done.len() {
      info!("{} of {} buildpacks participating", trial.len(), done.len());
    }

    let width = trial.elements().map(|el| el.id.len()).max().unwrap_or(0);
    for el in trial.elements() {
      info!("{:<width$} {}", el.id, el.version, width = width);
    }

    let found = trial.elements().map(GroupElement::no_opt).collect();
    Ok((found, deps.plan_entries()))
  }
}
