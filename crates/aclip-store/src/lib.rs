//! On-disk project store.
//!
//! Owns the per-project directory tree, the global `projects.json` index and
//! every metadata write. All JSON writes are atomic (tmp file + rename);
//! same-project mutations are serialized by a per-project async lock, index
//! mutations by a process-wide lock held only for the write.

mod atomic;
mod error;
mod index;
mod logs;
mod paths;
mod store;

pub use atomic::{write_bytes_atomic, write_json_atomic};
pub use error::{StoreError, StoreResult};
pub use logs::ProjectLog;
pub use paths::ProjectPaths;
pub use store::ProjectStore;
