//! brtimg - base-runtime container image builder.
//!
//! Reconciles the package set in a mock chroot configuration against a
//! modulemd profile, builds the chroot, imports it as a docker base image,
//! and smoke-checks the result.
//!
//! Exposed as a library so integration tests can exercise the pipeline
//! stages without the binary.

pub mod chroot;
pub mod clean;
pub mod config;
pub mod dnfconf;
pub mod error;
pub mod image;
pub mod mockcfg;
pub mod modulemd;
pub mod pipeline;
pub mod preflight;
pub mod process;
pub mod smoke;
