//! Download index: which remote files were already mirrored locally.
//!
//! - `model`: rows returned by the repository.
//! - `repo`: SQL-only functions over the sqlite pool.
//!
//! The index is a convenience for the sync CLI, never a source of truth; it
//! can be cleared at any time.

pub mod model;
pub mod repo;

pub use model::DownloadedFile;
pub use repo::*;
