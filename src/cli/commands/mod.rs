//! Command implementations.

pub mod completions;
pub mod index;
pub mod init;
pub mod pattern;
pub mod plan;
pub mod search;
pub mod session;
pub mod version;
