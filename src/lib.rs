//! AIKnowSys CLI - Structured knowledge store for AI-assisted development
//!
//! This crate provides the core functionality for the `aks` CLI tool:
//! sessions, plans with a lifecycle state machine, learned patterns, and
//! ranked search over all of them, backed by either markdown files plus a
//! JSON index or a SQLite database.
//!
//! # Architecture
//!
//! - [`cli`] - Command-line interface using clap
//! - [`model`] - Data types (Session, Plan, LearnedPattern, pointer, index)
//! - [`frontmatter`] - YAML frontmatter parsing and rendering
//! - [`sections`] - Markdown section operations
//! - [`query`] - Filter, ordering, and search-ranking semantics
//! - [`mutation`] - The write path (idempotency, state machine, pointers)
//! - [`storage`] - Interchangeable JSON-index and SQLite backends
//! - [`config`] - Environment and config-file resolution
//! - [`error`] - Error types and handling

#![forbid(unsafe_code)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod cli;
pub mod config;
pub mod error;
pub mod frontmatter;
pub mod model;
pub mod mutation;
pub mod query;
pub mod sections;
pub mod storage;

pub use error::{Error, Result};
