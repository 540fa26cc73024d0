//! Detection tests against buildpacks laid out on disk.

#![cfg(unix)]

mod common;
mod properties_tests;
