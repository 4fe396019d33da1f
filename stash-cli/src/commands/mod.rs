//! CLI command implementations.

pub mod delete;
pub mod import;
pub mod list;
pub mod pull;
pub mod purge;
pub mod sync;
pub mod watch;
