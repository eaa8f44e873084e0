use super::{RemoteMetadata, SourceProvider};
use crate::error::Result;
use std::collections::HashMap;
use tracing::trace;

/// Metadata already resolved during this invocation, keyed by remote id.
#[derive(Debug, Default)]
pub struct MetadataCache {
    entries: HashMap<String, RemoteMetadata>,
}

impl MetadataCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &str) -> Option<&RemoteMetadata> {
        self.entries.get(id)
    }

    /// Keeps the existing entry if `id` is already cached.
    pub fn insert(&mut self, id: &str, metadata: RemoteMetadata) -> &RemoteMetadata {
        self.entries.entry(id.to_string()).or_insert(metadata)
    }

    pub fn get_or_fetch(
        &mut self,
        provider: &dyn SourceProvider,
        id: &str,
        url: &str,
    ) -> Result<&RemoteMetadata> {
        if self.entries.contains_key(id) {
            trace!("Metadata cache hit for {}", id);
        } else {
            let metadata = provider.fetch_metadata(url)?;
            self.entries.insert(id.to_string(), metadata);
        }
        Ok(&self.entries[id])
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RemoteKind;
    use std::cell::Cell;

    struct CountingProvider {
        calls: Cell<usize>,
    }

    impl SourceProvider for CountingProvider {
        fn fetch_metadata(&self, url: &str) -> Result<RemoteMetadata> {
            self.calls.set(self.calls.get() + 1);
            Ok(RemoteMetadata {
                id: "x".into(),
                kind: RemoteKind::Single,
                name: format!("fetched from {}", url),
                url: url.into(),
                available: true,
                children: vec![],
            })
        }
    }

    #[test]
    fn test_get_or_fetch_fetches_once() {
        let provider = CountingProvider { calls: Cell::new(0) };
        let mut cache = MetadataCache::new();

        cache.get_or_fetch(&provider, "x", "u1").unwrap();
        let second = cache.get_or_fetch(&provider, "x", "u2").unwrap();
        assert_eq!(second.name, "fetched from u1");
        assert_eq!(provider.calls.get(), 1);
    }

    #[test]
    fn test_insert_keeps_first_value() {
        let provider = CountingProvider { calls: Cell::new(0) };
        let mut cache = MetadataCache::new();
        let first = provider.fetch_metadata("a").unwrap();
        let second = provider.fetch_metadata("b").unwrap();
        cache.insert("x", first);
        assert_eq!(cache.insert("x", second).url, "a");
        assert_eq!(cache.len(), 1);
    }
}
