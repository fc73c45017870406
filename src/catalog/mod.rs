//! Catalog data model and storage.
//!
//! # Architecture
//!
//! - `tree`: recursive string-leaf tree and the dot-path codec over it
//! - `model`: one locale's catalog (namespace -> key -> value)
//! - `locale`: BCP-47 shaped locale codes
//! - `store`: file-backed persistence with per-locale locking
//!
//! # Example
//!
//! ```rust,ignore
//! use catalog_admin::catalog::CatalogStore;
//!
//! let store = CatalogStore::open("messages")?;
//! store.update("es", |catalog| {
//!     catalog.set("Greeting", "hello", "¡Hola, {name}!");
//!     Ok(())
//! })?;
//! ```

mod locale;
mod model;
mod store;
pub mod tree;

pub use locale::LocaleCode;
pub use model::{Catalog, LeafEntry};
pub use store::CatalogStore;
pub(crate) use store::{parse_catalog, read_catalog, serialize, write_atomic};
