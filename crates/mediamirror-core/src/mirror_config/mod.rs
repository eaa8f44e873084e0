//! The per-mirror settings document (`mirror.toml`).
//!
//! Holds global option defaults under `[mirror]` and one entry per tracked
//! entity under `[channels]`, `[playlists]` and `[singles]`, keyed by remote id.

pub mod options;

use crate::error::{Error, Result};
use crate::model::RemoteKind;
use options::{merge, OptionOverlay, OptionSet};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::debug;

pub const CONFIG_FILE_NAME: &str = "mirror.toml";

/// One tracked entity as it appears in the document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityEntry {
    pub name: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "OptionOverlay::is_empty")]
    pub options: OptionOverlay,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MirrorConfig {
    #[serde(default)]
    pub mirror: OptionOverlay,
    #[serde(default)]
    pub channels: BTreeMap<String, EntityEntry>,
    #[serde(default)]
    pub playlists: BTreeMap<String, EntityEntry>,
    #[serde(default)]
    pub singles: BTreeMap<String, EntityEntry>,
}

impl MirrorConfig {
    fn section(&self, kind: RemoteKind) -> &BTreeMap<String, EntityEntry> {
        match kind {
            RemoteKind::Channel => &self.channels,
            RemoteKind::Playlist => &self.playlists,
            RemoteKind::Single => &self.singles,
        }
    }

    fn section_mut(&mut self, kind: RemoteKind) -> &mut BTreeMap<String, EntityEntry> {
        match kind {
            RemoteKind::Channel => &mut self.channels,
            RemoteKind::Playlist => &mut self.playlists,
            RemoteKind::Single => &mut self.singles,
        }
    }

    pub fn entity_exists(&self, kind: RemoteKind, id: &str) -> bool {
        self.section(kind).contains_key(id)
    }

    pub fn entity(&self, kind: RemoteKind, id: &str) -> Option<&EntityEntry> {
        self.section(kind).get(id)
    }

    pub fn set_entity(&mut self, kind: RemoteKind, id: &str, entry: EntityEntry) {
        self.section_mut(kind).insert(id.to_string(), entry);
    }

    pub fn remove_entity(&mut self, kind: RemoteKind, id: &str) -> Option<EntityEntry> {
        self.section_mut(kind).remove(id)
    }

    /// All tracked entities, channels first, then playlists, then singles.
    pub fn entities(&self) -> impl Iterator<Item = (RemoteKind, &String, &EntityEntry)> {
        RemoteKind::ALL
            .into_iter()
            .flat_map(move |kind| self.section(kind).iter().map(move |(id, e)| (kind, id, e)))
    }

    pub fn len(&self) -> usize {
        self.channels.len() + self.playlists.len() + self.singles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub fn load(path: &Path) -> Result<MirrorConfig> {
    let text = fs::read_to_string(path).map_err(|source| Error::ConfigIo {
        path: path.to_path_buf(),
        source,
    })?;
    let config: MirrorConfig = toml::from_str(&text).map_err(|source| Error::ConfigParse {
        path: path.to_path_buf(),
        source,
    })?;
    debug!("Loaded {} with {} tracked entities", path.display(), config.len());
    Ok(config)
}

/// Write the document next to its destination, then rename over it.
/// Fails if the destination directory does not exist.
pub fn save(path: &Path, config: &MirrorConfig) -> Result<()> {
    let text = toml::to_string_pretty(config)?;
    let tmp = path.with_extension("toml.tmp");
    let io_err = |source| Error::ConfigIo {
        path: path.to_path_buf(),
        source,
    };
    fs::write(&tmp, text).map_err(io_err)?;
    fs::rename(&tmp, path).map_err(io_err)?;
    debug!("Saved {}", path.display());
    Ok(())
}

/// Defaults, then the `[mirror]` table, then runtime overrides.
pub fn effective_options(config: &MirrorConfig, runtime: &OptionOverlay) -> Result<OptionSet> {
    let options = merge(merge(OptionSet::default(), &config.mirror), runtime);
    validate(&options)?;
    Ok(options)
}

/// Like [`effective_options`], with the entity's own overlay between the
/// global table and the runtime flags.
pub fn effective_options_for(
    config: &MirrorConfig,
    kind: RemoteKind,
    id: &str,
    runtime: &OptionOverlay,
) -> Result<OptionSet> {
    let mut options = merge(OptionSet::default(), &config.mirror);
    if let Some(entry) = config.entity(kind, id) {
        options = merge(options, &entry.options);
    }
    let options = merge(options, runtime);
    validate(&options)?;
    Ok(options)
}

fn validate(options: &OptionSet) -> Result<()> {
    if options.dl_captions && options.caption_languages.is_empty() {
        return Err(Error::InvalidOption(
            "captions enabled but caption_languages is empty".to_string(),
        ));
    }
    if let Some(bad) = options
        .caption_languages
        .iter()
        .find(|lang| {
            lang.is_empty() || !lang.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
        })
    {
        return Err(Error::InvalidOption(format!(
            "caption language '{}' is not a language code",
            bad
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::options::Resolution;
    use super::*;

    fn entry(name: &str) -> EntityEntry {
        EntityEntry {
            name: name.to_string(),
            url: format!("https://example.com/{}", name),
            options: OptionOverlay::default(),
        }
    }

    #[test]
    fn test_entity_accessors() {
        let mut config = MirrorConfig::default();
        assert!(!config.entity_exists(RemoteKind::Single, "abc"));

        config.set_entity(RemoteKind::Single, "abc", entry("a"));
        config.set_entity(RemoteKind::Channel, "chan", entry("c"));
        assert!(config.entity_exists(RemoteKind::Single, "abc"));
        assert!(!config.entity_exists(RemoteKind::Playlist, "abc"));

        let kinds: Vec<RemoteKind> = config.entities().map(|(k, _, _)| k).collect();
        assert_eq!(kinds, vec![RemoteKind::Channel, RemoteKind::Single]);

        assert!(config.remove_entity(RemoteKind::Single, "abc").is_some());
        assert!(config.remove_entity(RemoteKind::Single, "abc").is_none());
        assert_eq!(config.len(), 1);
    }

    #[test]
    fn test_effective_options_precedence() {
        let mut config = MirrorConfig::default();
        config.mirror.resolution = Some(Resolution::P480);
        config.mirror.dl_thumbnail = Some(true);
        let mut e = entry("x");
        e.options.resolution = Some(Resolution::P1080);
        config.set_entity(RemoteKind::Single, "x", e);

        let runtime = OptionOverlay {
            dl_thumbnail: Some(false),
            ..OptionOverlay::default()
        };

        let global = effective_options(&config, &runtime).unwrap();
        assert_eq!(global.resolution, Resolution::P480);
        assert!(!global.dl_thumbnail);

        let scoped = effective_options_for(&config, RemoteKind::Single, "x", &runtime).unwrap();
        assert_eq!(scoped.resolution, Resolution::P1080);
        assert!(!scoped.dl_thumbnail);
    }

    #[test]
    fn test_captions_without_languages_rejected() {
        let config = MirrorConfig::default();
        let runtime = OptionOverlay {
            dl_captions: Some(true),
            caption_languages: Some(vec![]),
            ..OptionOverlay::default()
        };
        assert!(matches!(
            effective_options(&config, &runtime),
            Err(Error::InvalidOption(_))
        ));
    }

    #[test]
    fn test_document_round_trips_case_sensitive_ids() {
        let mut config = MirrorConfig::default();
        config.set_entity(RemoteKind::Single, "AbC_12-x", entry("video"));
        let text = toml::to_string_pretty(&config).unwrap();
        let back: MirrorConfig = toml::from_str(&text).unwrap();
        assert!(back.entity_exists(RemoteKind::Single, "AbC_12-x"));
    }

    #[test]
    fn test_unknown_resolution_in_document_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(&path, "[mirror]\nresolution = \"9000p\"\n").unwrap();
        assert!(matches!(load(&path), Err(Error::ConfigParse { .. })));
    }

    #[test]
    fn test_save_into_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join(CONFIG_FILE_NAME);
        let result = save(&path, &MirrorConfig::default());
        assert!(matches!(result, Err(Error::ConfigIo { .. })));
    }
}
