use serde::{Deserialize, Serialize};
use std::fmt;

/// The three kinds of remote entity a mirror can track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RemoteKind {
    Channel,
    Playlist,
    Single,
}

/// Collections that own child items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupKind {
    Channel,
    Playlist,
}

/// Which record table an entity lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Group(GroupKind),
    Item,
}

impl RemoteKind {
    pub const ALL: [RemoteKind; 3] =
        [RemoteKind::Channel, RemoteKind::Playlist, RemoteKind::Single];

    pub fn entity_kind(self) -> EntityKind {
        match self {
            RemoteKind::Channel => EntityKind::Group(GroupKind::Channel),
            RemoteKind::Playlist => EntityKind::Group(GroupKind::Playlist),
            RemoteKind::Single => EntityKind::Item,
        }
    }

    /// Top-level directory name under the mirror root.
    pub fn plural(self) -> &'static str {
        match self {
            RemoteKind::Channel => "channels",
            RemoteKind::Playlist => "playlists",
            RemoteKind::Single => "singles",
        }
    }
}

impl From<GroupKind> for RemoteKind {
    fn from(kind: GroupKind) -> Self {
        match kind {
            GroupKind::Channel => RemoteKind::Channel,
            GroupKind::Playlist => RemoteKind::Playlist,
        }
    }
}

impl fmt::Display for RemoteKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RemoteKind::Channel => "channel",
            RemoteKind::Playlist => "playlist",
            RemoteKind::Single => "single",
        };
        f.write_str(s)
    }
}

/// A concrete downloadable artifact type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    Video,
    Audio,
    Caption,
    Thumbnail,
}

impl FileKind {
    pub fn extension(self) -> &'static str {
        match self {
            FileKind::Video | FileKind::Audio => "mp4",
            FileKind::Caption => "srt",
            FileKind::Thumbnail => "jpg",
        }
    }
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FileKind::Video => "video",
            FileKind::Audio => "audio",
            FileKind::Caption => "caption",
            FileKind::Thumbnail => "thumbnail",
        };
        f.write_str(s)
    }
}
