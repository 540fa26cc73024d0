//! Buildpack detection.
//!
//! The [`Detector`] walks an [`Order`] one alternative group at a time. References to
//! meta-buildpacks are replaced in place by their nested order. The remaining siblings
//! of the group carry on after each nested alternative. Every leaf that has not been
//! detected yet runs its detect step on the blocking pool, and the group waits for all
//! of them before handing the flattened list to the [`Resolver`]. The first group that
//! resolves wins.
//!
//! Detect results are cached per run key in [`Runs`], so a buildpack referenced by many
//! alternatives is detected once.

mod dep_map;
mod resolver;
mod runs;
mod trial;
mod types;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::{debug, error, trace};

use crate::buildpack::{BuildEnv, DetectConfig, Group, GroupElement, Kind, Order, Plan, Store, prepend_extensions};

pub use dep_map::{DepEntry, DepMap};
pub use resolver::{DefaultResolver, Resolver};
pub use runs::{RunKey, Runs};
pub use trial::{DetectOption, DetectTrial, options_for, run_trials};
pub use types::{DetectError, DetectOutput, ErrorType, Resolution};

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A group element waiting to be expanded, with the meta-buildpacks it was expanded from.
#[derive(Debug, Clone)]
struct Queued {
  element: GroupElement,
  parents: Arc<Vec<String>>,
}

/// Detects and resolves buildpack groups.
pub struct Detector {
  config: DetectConfig,
  env: BuildEnv,
  store: Arc<dyn Store>,
  resolver: Arc<dyn Resolver>,
  runs: Runs,
}

impl Detector {
  pub fn new(config: DetectConfig, env: BuildEnv, store: Arc<dyn Store>) -> Self {
    Self {
      config,
      env,
      store,
      resolver: Arc::new(DefaultResolver),
      runs: Runs::new(),
    }
  }

  pub fn with_resolver(mut self, resolver: Arc<dyn Resolver>) -> Self {
    self.resolver = resolver;
    self
  }

  /// Detect results gathered so far.
  pub fn runs(&self) -> &Runs {
    &self.runs
  }

  /// Detect the first group of `order` that resolves, running the extension order
  /// ahead of every group.
  pub async fn detect(&self, order: &Order, extensions: &Order) -> Result<DetectOutput, DetectError> {
    let order = prepend_extensions(order, extensions);
    self.detect_order(&order).await
  }

  /// Detect the first group of `order` that resolves.
  pub async fn detect_order(&self, order: &Order) -> Result<DetectOutput, DetectError> {
    let mut pending = JoinSet::new();
    let (found, entries) = self
      .expand_order(order.clone(), Vec::new(), Vec::new(), Vec::new(), false, &mut pending)
      .await?;

    let mut group = Group::default();
    for el in found {
      if el.extension {
        group.group_extensions.push(el.no_extension());
      } else {
        group.group.push(el);
      }
    }

    let mut plan = Plan { entries };
    for entry in &mut plan.entries {
      for require in &mut entry.requires {
        require.convert_version_to_metadata();
      }
    }

    Ok(DetectOutput { group, plan })
  }

  /// Try each group of `order`, followed by `next`, until one resolves.
  fn expand_order<'a>(
    &'a self,
    order: Order,
    parents: Vec<String>,
    done: Vec<GroupElement>,
    next: Vec<Queued>,
    optional: bool,
    pending: &'a mut JoinSet<()>,
  ) -> BoxFuture<'a, Result<Resolution, DetectError>> {
    Box::pin(async move {
      let parents = Arc::new(parents);
      let mut buildpack_err = false;

      for group in order {
        let mut queue: Vec<Queued> = group
          .group
          .into_iter()
          .map(|element| Queued {
            element,
            parents: parents.clone(),
          })
          .collect();
        queue.extend(next.iter().cloned());

        match self.detect_group(queue, done.clone(), &mut *pending).await {
          Err(err) if err.is_retryable() => buildpack_err |= err.error_type() == Some(ErrorType::Buildpack),
          result => return result,
        }
      }

      if optional {
        return self.detect_group(next, done, &mut *pending).await;
      }
      if buildpack_err {
        Err(DetectError::Buildpack)
      } else {
        Err(DetectError::FailedDetection)
      }
    })
  }

  /// Expand `group` into leaves, detect them and resolve.
  fn detect_group<'a>(
    &'a self,
    group: Vec<Queued>,
    mut done: Vec<GroupElement>,
    pending: &'a mut JoinSet<()>,
  ) -> BoxFuture<'a, Result<Resolution, DetectError>> {
    Box::pin(async move {
      for (i, queued) in group.iter().enumerate() {
        let el = &queued.element;
        let kind = el.kind();

        if done.iter().any(|d| d.kind() == kind && d.id == el.id) {
          trace!(element = %el, "already detected in this group");
          continue;
        }

        if el.is_extensions_order() {
          let rest = group[i + 1..].to_vec();
          return self
            .expand_order(
              el.order_extensions.clone(),
              queued.parents.to_vec(),
              done,
              rest,
              true,
              pending,
            )
            .await;
        }

        let buildable = self.store.lookup(kind, &el.id, &el.version)?;
        let descriptor = buildable.descriptor();

        if descriptor.is_meta() {
          if kind == Kind::Extension {
            return Err(DetectError::ExtensionOrder(el.id.clone()));
          }

          let key = el.to_string();
          if queued.parents.contains(&key) {
            let mut chain: Vec<String> = queued.parents.to_vec();
            chain.push(key);
            return Err(DetectError::OrderCycle(chain.join(" -> ")));
          }

          debug!(buildpack = %el, groups = descriptor.order.len(), "expanding meta-buildpack order");
          let mut parents = queued.parents.to_vec();
          parents.push(key);
          let rest = group[i + 1..].to_vec();
          return self
            .expand_order(descriptor.order.clone(), parents, done, rest, el.optional, pending)
            .await;
        }

        done.push(
          el.clone()
            .with_api(descriptor.api.clone())
            .with_homepage(descriptor.info.homepage.clone()),
        );

        let key = RunKey::from(el);
        if !self.runs.begin(&key) {
          continue;
        }
        trace!(run = %key, "launching detect");
        let config = self.config.clone();
        let env = self.env.clone();
        let runs = self.runs.clone();
        pending.spawn_blocking(move || {
          let run = buildable.detect(&config, &env);
          runs.store(key, run);
        });
      }

      while let Some(joined) = pending.join_next().await {
        if let Err(e) = joined {
          error!(error = %e, "detect task panicked");
        }
      }

      self.resolver.resolve(&done, &self.runs)
    })
  }
}
