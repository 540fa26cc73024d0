//! Cache of detect results shared by every group tried in one detection.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::buildpack::{DetectRun, GroupElement, Kind};

/// Identifies one detect result.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RunKey {
  pub kind: Kind,
  pub id: String,
  pub version: String,
}

impl RunKey {
  pub fn new(kind: Kind, id: impl Into<String>, version: impl Into<String>) -> Self {
    Self {
      kind,
      id: id.into(),
      version: version.into(),
    }
  }
}

impl From<&GroupElement> for RunKey {
  fn from(el: &GroupElement) -> Self {
    Self::new(el.kind(), &el.id, &el.version)
  }
}

impl fmt::Display for RunKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{} {}@{}", self.kind, self.id, self.version)
  }
}

#[derive(Debug, Default)]
struct RunsState {
  results: HashMap<RunKey, DetectRun>,
  claimed: HashSet<RunKey>,
}

/// Thread-safe map of detect results.
///
/// A key is claimed with [`Runs::begin`] before its detect step is launched, so each
/// buildable is detected at most once no matter how many groups reference it.
#[derive(Debug, Clone, Default)]
pub struct Runs {
  state: Arc<Mutex<RunsState>>,
}

impl Runs {
  pub fn new() -> Self {
    Self::default()
  }

  fn lock(&self) -> MutexGuard<'_, RunsState> {
    self.state.lock().unwrap_or_else(PoisonError::into_inner)
  }

  /// Claim `key` for detection. Returns false if it was claimed before.
  pub fn begin(&self, key: &RunKey) -> bool {
    self.lock().claimed.insert(key.clone())
  }

  pub fn store(&self, key: RunKey, run: DetectRun) {
    let mut state = self.lock();
    state.claimed.insert(key.clone());
    state.results.insert(key, run);
  }

  pub fn load(&self, key: &RunKey) -> Option<DetectRun> {
    self.lock().results.get(key).cloned()
  }

  pub fn contains(&self, key: &RunKey) -> bool {
    self.lock().results.contains_key(key)
  }

  pub fn len(&self) -> usize {
    self.lock().results.len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }
}
