//! Shared test utilities for the flomod workspace.
//!
//! This crate provides standardised fixtures to eliminate duplication
//! across crate test suites. It is a dev-dependency only — never published.
//!
//! # Modules
//!
//! - [`model`] — [`TestModel`] builder writing model files into a temp dir

pub mod model;

pub use model::TestModel;
