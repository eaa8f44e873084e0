//! Collaborators the engine drives but does not implement: resolving remote
//! metadata and transferring bytes.

pub mod cache;
pub mod links;
pub mod ytdlp;

use crate::error::Result;
use crate::mirror_config::options::OptionSet;
use crate::model::{FileKind, RemoteKind};
use std::path::Path;

pub use cache::MetadataCache;

/// What a source knows about one remote entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteMetadata {
    pub id: String,
    pub kind: RemoteKind,
    pub name: String,
    /// Canonical link for the entity.
    pub url: String,
    pub available: bool,
    /// Links to child items. Always empty for singles.
    pub children: Vec<String>,
}

pub trait SourceProvider {
    /// Offline. Fails with `InvalidUrl`.
    fn classify(&self, url: &str) -> Result<RemoteKind> {
        links::classify_url(url)
    }

    /// Offline. Fails with `InvalidUrl`.
    fn derive_id(&self, url: &str) -> Result<String> {
        links::derive_id(url)
    }

    /// Network call. Failures surface as `RemoteFetch`.
    fn fetch_metadata(&self, url: &str) -> Result<RemoteMetadata>;
}

/// The item a file belongs to, as seen by a fetcher.
#[derive(Debug, Clone, Copy)]
pub struct ItemRef<'a> {
    pub id: &'a str,
    pub name: &'a str,
    pub url: &'a str,
}

/// One artifact to transfer.
#[derive(Debug, Clone, Copy)]
pub struct FileRequest<'a> {
    pub kind: FileKind,
    pub language: Option<&'a str>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchOutcome {
    pub size_bytes: u64,
}

pub trait Fetcher {
    /// Best guess at the transfer size in bytes. Zero when unknown.
    fn estimate_size(
        &self,
        item: &ItemRef<'_>,
        file: &FileRequest<'_>,
        options: &OptionSet,
    ) -> Result<u64>;

    /// Transfer one artifact to `dest`. The parent directory already exists.
    fn fetch(
        &self,
        item: &ItemRef<'_>,
        file: &FileRequest<'_>,
        dest: &Path,
        options: &OptionSet,
    ) -> Result<FetchOutcome>;
}
