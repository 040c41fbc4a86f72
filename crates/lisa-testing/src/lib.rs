//! Test utilities for Lisa services.
//!
//! Import from `[dev-dependencies]` only.

pub mod auth;
