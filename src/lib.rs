//! Manage, version, lint and bulk-translate a multilingual UI message catalog.
//!
//! All operations hang off [`Workspace`], which owns the catalog files, the
//! changelog, the snapshot archive and the locale settings.

pub mod catalog;
pub mod config;
pub mod coverage;
pub mod error;
pub mod exchange;
pub mod ledger;
pub mod lifecycle;
pub mod mutation;
pub mod quality;
pub mod rollback;
pub mod scheduler;
pub mod security;
pub mod server;
pub mod settings;
pub mod snapshot;
pub mod translation;
pub mod workspace;

pub use error::{CatalogError, CatalogResult};
pub use workspace::Workspace;
