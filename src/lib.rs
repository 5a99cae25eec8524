//! cp-link copies a JavaScript package's published files into another
//! project's `node_modules`, and can rebuild and re-copy on every change.
//!
//! A watch session runs events through three stages: the [`watcher`] filters
//! filesystem notifications with the project's ignore rules, the
//! [`watcher::debounce::Debouncer`] waits for a quiet period, and the
//! [`coordinator::RebuildCoordinator`] runs build-then-copy cycles one at a time.

pub mod build;
pub mod cli;
pub mod config;
pub mod coordinator;
pub mod copier;
pub mod enumerate;
pub mod error;
pub mod manifest;
pub mod paths;
pub mod pipeline;
pub mod session;
pub mod watcher;

pub use error::{CpLinkError, Result};
