//! lifecycle-lib: buildpack detection for the lifecycle
//!
//! This crate provides the detection half of a Cloud Native Buildpacks lifecycle:
//! - `buildpack`: group and order types, build plans, descriptor stores and detect execution
//! - `detect`: order expansion, the run cache and the dependency resolver
//! - `platform`: platform inputs read from the environment and `order.toml`

pub mod buildpack;
pub mod consts;
pub mod detect;
pub mod platform;
pub mod util;
