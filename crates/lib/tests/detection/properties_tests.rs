//! Properties every detection must hold.

use lifecycle_lib::detect::{DetectError, ErrorType};

use crate::common::{TestEnv, ids};

const PROVIDES_X: &str = "[[provides]]\nname = \"x\"";
const REQUIRES_X: &str = "[[requires]]\nname = \"x\"";

const ORDER_AB: &str = r#"
[[order]]
[[order.group]]
id = "A"
version = "v1"

[[order.group]]
id = "B"
version = "v1"
"#;

#[tokio::test]
async fn repeated_detection_is_deterministic() {
  let env = TestEnv::new();
  env
    .buildpack("A", "v1", PROVIDES_X, 0)
    .buildpack("B", "v1", REQUIRES_X, 0);

  let first = env.detect(ORDER_AB).await.unwrap();
  for _ in 0..3 {
    assert_eq!(env.detect(ORDER_AB).await.unwrap(), first);
  }
}

#[tokio::test]
async fn first_satisfiable_group_wins() {
  let env = TestEnv::new();
  env
    .buildpack("A", "v1", PROVIDES_X, 0)
    .buildpack("B", "v1", REQUIRES_X, 0)
    .buildpack("C", "v1", PROVIDES_X, 0)
    .buildpack("D", "v1", REQUIRES_X, 0);

  let output = env
    .detect(
      r#"
[[order]]
[[order.group]]
id = "A"
version = "v1"

[[order.group]]
id = "B"
version = "v1"

[[order]]
[[order.group]]
id = "C"
version = "v1"

[[order.group]]
id = "D"
version = "v1"
"#,
    )
    .await
    .unwrap();

  assert_eq!(ids(&output), vec!["A@v1", "B@v1"]);
  assert_eq!(env.calls("C", "v1"), 0);
}

#[tokio::test]
async fn buildpacks_in_several_groups_detect_once() {
  let env = TestEnv::new();
  env
    .buildpack("A", "v1", "", 0)
    .buildpack("B", "v1", "", 100)
    .buildpack("C", "v1", "", 0);

  let output = env
    .detect(
      r#"
[[order]]
[[order.group]]
id = "A"
version = "v1"

[[order.group]]
id = "B"
version = "v1"

[[order]]
[[order.group]]
id = "A"
version = "v1"

[[order.group]]
id = "C"
version = "v1"
"#,
    )
    .await
    .unwrap();

  assert_eq!(ids(&output), vec!["A@v1", "C@v1"]);
  assert_eq!(env.calls("A", "v1"), 1);
  assert_eq!(env.calls("B", "v1"), 1);
  assert_eq!(env.calls("C", "v1"), 1);
}

#[tokio::test]
async fn requires_only_bind_to_earlier_providers() {
  let env = TestEnv::new();
  env
    .buildpack("A", "v1", PROVIDES_X, 0)
    .buildpack("B", "v1", REQUIRES_X, 0);

  let reversed = env
    .detect(
      r#"
[[order]]
[[order.group]]
id = "B"
version = "v1"

[[order.group]]
id = "A"
version = "v1"
"#,
    )
    .await
    .unwrap_err();
  assert!(matches!(reversed, DetectError::FailedDetection));

  let forward = env.detect(ORDER_AB).await.unwrap();
  assert_eq!(ids(&forward), vec!["A@v1", "B@v1"]);
  assert_eq!(forward.plan.entries.len(), 1);
}

#[tokio::test]
async fn optional_chains_are_elided_to_a_fixpoint() {
  let env = TestEnv::new();
  env
    .buildpack(
      "A",
      "v1",
      "[[provides]]\nname = \"a\"\n\n[[requires]]\nname = \"nobody-provides\"",
      0,
    )
    .buildpack("B", "v1", "[[requires]]\nname = \"a\"", 0)
    .buildpack(
      "C",
      "v1",
      "[[provides]]\nname = \"c\"\n\n[[requires]]\nname = \"c\"",
      0,
    );

  let output = env
    .detect(
      r#"
[[order]]
[[order.group]]
id = "A"
version = "v1"
optional = true

[[order.group]]
id = "B"
version = "v1"
optional = true

[[order.group]]
id = "C"
version = "v1"
"#,
    )
    .await
    .unwrap();

  assert_eq!(ids(&output), vec!["C@v1"]);
  assert_eq!(output.plan.entries.len(), 1);
  assert_eq!(output.plan.entries[0].requires[0].name, "c");
}

#[tokio::test]
async fn falls_back_to_satisfiable_alternative() {
  let env = TestEnv::new();
  env
    .buildpack(
      "A",
      "v1",
      "[[provides]]\nname = \"unused\"\n\n[[or]]\n[[or.provides]]\nname = \"x\"\n\n[[or]]\n[[or.provides]]\nname = \"y\"",
      0,
    )
    .buildpack("B", "v1", "[[requires]]\nname = \"y\"", 0);

  let output = env.detect(ORDER_AB).await.unwrap();

  assert_eq!(ids(&output), vec!["A@v1", "B@v1"]);
  assert_eq!(output.plan.entries.len(), 1);
  assert_eq!(output.plan.entries[0].requires[0].name, "y");
  assert_eq!(output.plan.entries[0].providers[0].id, "A");
}

#[tokio::test]
async fn require_versions_are_normalized_into_metadata() {
  let env = TestEnv::new();
  env
    .buildpack("A", "v1", PROVIDES_X, 0)
    .buildpack("B", "v1", "[[requires]]\nname = \"x\"\nversion = \"1.2.3\"", 0);

  let output = env.detect(ORDER_AB).await.unwrap();

  let require = &output.plan.entries[0].requires[0];
  assert_eq!(require.version, "");
  assert_eq!(require.metadata["version"].as_str(), Some("1.2.3"));
}

#[tokio::test]
async fn unexpected_exit_code_is_a_buildpack_error() {
  let env = TestEnv::new();
  env
    .buildpack("A", "v1", PROVIDES_X, 0)
    .buildpack("B", "v1", "", 127);

  let err = env.detect(ORDER_AB).await.unwrap_err();

  assert_eq!(err.error_type(), Some(ErrorType::Buildpack));
}
