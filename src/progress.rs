// src/progress.rs
use std::path::Path;

/// Lightweight progress reporting for long-running operations (search, downloads).
/// Frontends implement this to surface status to users.
pub trait Progress {
    /// Called at the start with the total number of items (if known).
    fn begin(&mut self, _total: usize) {}

    /// Free-form status line for human eyes.
    fn log(&mut self, _msg: &str) {}

    /// One document saved to `path`.
    fn item_done(&mut self, _label: &str, _path: &Path) {}

    /// One document failed; the batch goes on.
    fn item_failed(&mut self, _label: &str, _error: &str) {}

    /// Called at the end, successful or not.
    fn finish(&mut self) {}
}

/// A no-op progress sink.
pub struct NullProgress;
impl Progress for NullProgress {}
