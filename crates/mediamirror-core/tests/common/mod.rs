#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

use mediamirror_core::mirror_config::options::OptionSet;
use mediamirror_core::provider::{FetchOutcome, FileRequest, ItemRef, RemoteMetadata};
use mediamirror_core::{Confirm, Error, Fetcher, RemoteKind, Result, SourceProvider};

pub const FETCHED_BYTES: &[u8] = b"media bytes";
pub const ESTIMATE: u64 = 1024;

pub fn single_url(id: &str) -> String {
    format!("https://www.youtube.com/watch?v={}", id)
}

pub fn playlist_url(id: &str) -> String {
    format!("https://www.youtube.com/playlist?list={}", id)
}

pub fn single(id: &str, name: &str) -> RemoteMetadata {
    RemoteMetadata {
        id: id.to_string(),
        kind: RemoteKind::Single,
        name: name.to_string(),
        url: single_url(id),
        available: true,
        children: vec![],
    }
}

pub fn playlist(id: &str, name: &str, children: &[&str]) -> RemoteMetadata {
    RemoteMetadata {
        id: id.to_string(),
        kind: RemoteKind::Playlist,
        name: name.to_string(),
        url: playlist_url(id),
        available: true,
        children: children.iter().map(|c| single_url(c)).collect(),
    }
}

/// Serves metadata from a script keyed by URL.
#[derive(Default)]
pub struct FakeProvider {
    metadata: RefCell<HashMap<String, RemoteMetadata>>,
    failing: RefCell<HashSet<String>>,
    pub fetches: Cell<usize>,
}

impl FakeProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn serve(&self, metadata: RemoteMetadata) {
        self.metadata
            .borrow_mut()
            .insert(metadata.url.clone(), metadata);
    }

    /// A playlist plus one single per child, children named `Video <id>`.
    pub fn serve_playlist(&self, id: &str, name: &str, children: &[&str]) {
        self.serve(playlist(id, name, children));
        for child in children {
            self.serve(single(child, &format!("Video {}", child)));
        }
    }

    pub fn fail(&self, url: &str) {
        self.failing.borrow_mut().insert(url.to_string());
    }
}

impl SourceProvider for FakeProvider {
    fn fetch_metadata(&self, url: &str) -> Result<RemoteMetadata> {
        self.fetches.set(self.fetches.get() + 1);
        if self.failing.borrow().contains(url) {
            return Err(Error::RemoteFetch {
                url: url.to_string(),
                message: "scripted failure".to_string(),
            });
        }
        self.metadata
            .borrow()
            .get(url)
            .cloned()
            .ok_or_else(|| Error::RemoteFetch {
                url: url.to_string(),
                message: "not found".to_string(),
            })
    }
}

/// Writes a few bytes to each destination and records what it was asked for.
#[derive(Default)]
pub struct FakeFetcher {
    failing: RefCell<HashSet<String>>,
    pub fetched: RefCell<Vec<String>>,
    pub estimates: Cell<usize>,
}

impl FakeFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every fetch whose destination ends with `filepath`.
    pub fn fail(&self, filepath: &str) {
        self.failing.borrow_mut().insert(filepath.to_string());
    }

    pub fn heal(&self) {
        self.failing.borrow_mut().clear();
    }

    pub fn fetch_count(&self) -> usize {
        self.fetched.borrow().len()
    }
}

impl Fetcher for FakeFetcher {
    fn estimate_size(
        &self,
        _item: &ItemRef<'_>,
        _file: &FileRequest<'_>,
        _options: &OptionSet,
    ) -> Result<u64> {
        self.estimates.set(self.estimates.get() + 1);
        Ok(ESTIMATE)
    }

    fn fetch(
        &self,
        _item: &ItemRef<'_>,
        _file: &FileRequest<'_>,
        dest: &Path,
        _options: &OptionSet,
    ) -> Result<FetchOutcome> {
        let rel = dest.to_string_lossy().replace('\\', "/");
        self.fetched.borrow_mut().push(rel.clone());
        if self.failing.borrow().iter().any(|f| rel.ends_with(f.as_str())) {
            return Err(Error::Fetch {
                path: rel,
                message: "scripted failure".to_string(),
            });
        }
        fs::write(dest, FETCHED_BYTES)?;
        Ok(FetchOutcome {
            size_bytes: FETCHED_BYTES.len() as u64,
        })
    }
}

/// Answers prompts with a fixed value and remembers them.
pub struct ScriptedConfirm {
    answer: Cell<bool>,
    pub prompts: RefCell<Vec<String>>,
}

impl ScriptedConfirm {
    pub fn yes() -> Self {
        Self {
            answer: Cell::new(true),
            prompts: RefCell::new(Vec::new()),
        }
    }

    pub fn no() -> Self {
        Self {
            answer: Cell::new(false),
            prompts: RefCell::new(Vec::new()),
        }
    }

    pub fn asked(&self) -> usize {
        self.prompts.borrow().len()
    }
}

impl Confirm for ScriptedConfirm {
    fn confirm(&self, prompt: &str) -> Result<bool> {
        self.prompts.borrow_mut().push(prompt.to_string());
        Ok(self.answer.get())
    }
}
