//! Domain types and pure rules for project membership.
//!
//! Nothing in this crate performs I/O. The engine crate drives the
//! collaborators; everything here is deterministic and synchronous:
//!
//! - [`project`] -- the persisted record, patch and roles payloads, and the
//!   expanded view.
//! - [`roles`] -- project roles and the default group address for each.
//! - [`query`] -- predicate builder and in-process evaluator.
//! - [`signature`] -- canonical record signatures for change detection.
//! - [`merge`] -- additive patch merge.
//! - [`index`] -- external project index generation.

pub mod error;
pub mod index;
pub mod merge;
pub mod principal;
pub mod project;
pub mod query;
pub mod roles;
pub mod signature;
pub mod types;
