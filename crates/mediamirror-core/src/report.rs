use crate::model::RemoteKind;
use std::path::Path;
use tracing::debug;
use walkdir::WalkDir;

const UNITS: [&str; 8] = ["", "Ki", "Mi", "Gi", "Ti", "Pi", "Ei", "Zi"];

/// Binary-prefixed size with one decimal place, e.g. `1.5KiB`.
pub fn human_readable_size(bytes: u64) -> String {
    let mut value = bytes as f64;
    for unit in UNITS {
        // Decide on the rounded figure so 1023.96KiB reads 1.0MiB.
        if (value * 10.0).round() < 10240.0 {
            return format!("{:.1}{}B", value, unit);
        }
        value /= 1024.0;
    }
    format!("{:.1}YiB", value)
}

/// Total size of regular files under `path`. Missing paths and unreadable
/// entries count as zero.
pub fn dir_size(path: &Path) -> u64 {
    let total = WalkDir::new(path)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| entry.metadata().ok())
        .map(|meta| meta.len())
        .sum();
    debug!("{} occupies {} bytes", path.display(), total);
    total
}

/// One row of `show`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShowEntry {
    pub kind: RemoteKind,
    pub id: String,
    pub name: String,
    pub url: String,
}
