//! Cross-cutting HTTP plumbing shared by Lisa services.

pub mod health;
pub mod middleware;
pub mod serde;
pub mod tracing;
