//! Contop: an interactive terminal dashboard for Docker containers.
//!
//! This library exposes the core modules for use by the binary and by tests.

pub mod app;
pub mod docker;
pub mod metrics;
pub mod model;
pub mod registry;
pub mod runtime;
pub mod session;
pub mod view;

#[cfg(test)]
pub(crate) mod testutil;
