//! portal-core: shared infrastructure for the portal workspace.
pub mod error;
pub mod middleware;
pub mod observability;
