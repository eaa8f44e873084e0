use crate::error::Result;

/// Trait for reporting engine progress.
///
/// The CLI implements it with indicatif bars. All methods have default
/// no-op implementations.
pub trait ProgressReporter: Send + Sync {
    fn on_metadata_fetch(&self, _url: &str) {}
    fn on_plan_complete(&self, _items: usize, _files: usize) {}
    fn on_sync_start(&self, _total_files: usize) {}
    fn on_file_start(&self, _filepath: &str) {}
    fn on_file_complete(&self, _filepath: &str, _success: bool) {}
    fn on_sync_complete(&self, _downloaded: usize, _failed: usize, _duration_secs: f64) {}
}

/// No-op progress reporter for silent operation.
pub struct SilentReporter;

impl ProgressReporter for SilentReporter {}

/// Yes/no gate in front of large downloads and deletions.
pub trait Confirm {
    fn confirm(&self, prompt: &str) -> Result<bool>;
}

