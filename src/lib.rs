//! Coursesync Core Library
//!
//! This library mirrors a learning platform's hierarchical course content
//! into a local directory tree: it decides what changed since the last
//! pass, derives safe human-readable names for unreliable remote metadata,
//! streams downloads on a bounded worker pool, and classifies failures so
//! a pass can be repeated until the mirror converges.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`api`] - Platform API surface: trait, REST client, wire types, errors
//! - [`content`] - Per-node resolution and handler dispatch
//! - [`html`] - Link discovery and naming inside content bodies
//! - [`fetch`] - Direct-download artifacts with an acceptance gate
//! - [`writer`] - Bounded write pool with cleanup-on-failure
//! - [`report`] - Pass-level join and failure classification
//! - [`sync`] - Pass context and driver
//! - [`naming`] - Filesystem-safe names and header parsing

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod api;
pub mod content;
pub mod fetch;
pub mod html;
pub mod naming;
pub mod report;
pub mod sync;
pub mod writer;

// Re-export commonly used types
pub use api::{
    ApiError, AttachmentDescriptor, AttachmentFilter, ContentNode, ContentPath, CourseApi,
    DirectResponse, HandlerKind, RestClient,
};
pub use content::Content;
pub use html::{ContentParser, Link};
pub use report::{SyncPassResult, join_pass};
pub use sync::{SyncContext, SyncError, run_pass};
pub use writer::{DEFAULT_WORKERS, PoolError, TaskState, WriteError, WritePool, WriteTask};
