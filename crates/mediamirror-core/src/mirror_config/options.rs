use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Supported video resolutions, highest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Resolution {
    P2160,
    P1440,
    P1080,
    P720,
    P480,
    P360,
    P240,
    P144,
}

impl Resolution {
    pub const ALL: [Resolution; 8] = [
        Resolution::P2160,
        Resolution::P1440,
        Resolution::P1080,
        Resolution::P720,
        Resolution::P480,
        Resolution::P360,
        Resolution::P240,
        Resolution::P144,
    ];

    pub fn height(self) -> u32 {
        match self {
            Resolution::P2160 => 2160,
            Resolution::P1440 => 1440,
            Resolution::P1080 => 1080,
            Resolution::P720 => 720,
            Resolution::P480 => 480,
            Resolution::P360 => 360,
            Resolution::P240 => 240,
            Resolution::P144 => 144,
        }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}p", self.height())
    }
}

impl FromStr for Resolution {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Resolution::ALL
            .into_iter()
            .find(|r| r.to_string() == trimmed)
            .ok_or_else(|| {
                let known: Vec<String> = Resolution::ALL.iter().map(|r| r.to_string()).collect();
                format!(
                    "unsupported resolution '{}' (expected one of {})",
                    s,
                    known.join(", ")
                )
            })
    }
}

impl TryFrom<String> for Resolution {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Resolution> for String {
    fn from(value: Resolution) -> Self {
        value.to_string()
    }
}

/// Fully merged options used by one operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionSet {
    pub resolution: Resolution,
    pub dl_video: bool,
    pub dl_audio: bool,
    pub dl_captions: bool,
    pub dl_thumbnail: bool,
    pub caption_languages: Vec<String>,
    pub dry_run: bool,
    pub force: bool,
    pub no_dl: bool,
    pub no_rm: bool,
    pub sync: bool,
}

impl Default for OptionSet {
    fn default() -> Self {
        Self {
            resolution: Resolution::P720,
            dl_video: true,
            dl_audio: false,
            dl_captions: false,
            dl_thumbnail: false,
            caption_languages: vec!["en".to_string()],
            dry_run: false,
            force: false,
            no_dl: false,
            no_rm: false,
            sync: false,
        }
    }
}

impl OptionSet {
    /// True when the operation must not transfer any bytes.
    pub fn skips_download(&self) -> bool {
        self.dry_run || self.no_dl
    }
}

/// A partial option set. Unset fields fall through to the layer below.
///
/// Used for the `[mirror]` table, per-entity overrides and runtime flags.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OptionOverlay {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolution: Option<Resolution>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dl_video: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dl_audio: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dl_captions: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dl_thumbnail: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caption_languages: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dry_run: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub force: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub no_dl: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub no_rm: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sync: Option<bool>,
}

impl OptionOverlay {
    pub fn is_empty(&self) -> bool {
        *self == OptionOverlay::default()
    }

    /// The subset of this overlay that shapes which files an entity produces.
    /// This is what gets remembered per entity; one-shot flags are dropped.
    pub fn file_settings(&self) -> OptionOverlay {
        OptionOverlay {
            resolution: self.resolution,
            dl_video: self.dl_video,
            dl_audio: self.dl_audio,
            dl_captions: self.dl_captions,
            dl_thumbnail: self.dl_thumbnail,
            caption_languages: self.caption_languages.clone(),
            ..OptionOverlay::default()
        }
    }
}

/// Overlay `overlay` on top of `base`. Set fields win.
pub fn merge(base: OptionSet, overlay: &OptionOverlay) -> OptionSet {
    OptionSet {
        resolution: overlay.resolution.unwrap_or(base.resolution),
        dl_video: overlay.dl_video.unwrap_or(base.dl_video),
        dl_audio: overlay.dl_audio.unwrap_or(base.dl_audio),
        dl_captions: overlay.dl_captions.unwrap_or(base.dl_captions),
        dl_thumbnail: overlay.dl_thumbnail.unwrap_or(base.dl_thumbnail),
        caption_languages: overlay
            .caption_languages
            .clone()
            .unwrap_or(base.caption_languages),
        dry_run: overlay.dry_run.unwrap_or(base.dry_run),
        force: overlay.force.unwrap_or(base.force),
        no_dl: overlay.no_dl.unwrap_or(base.no_dl),
        no_rm: overlay.no_rm.unwrap_or(base.no_rm),
        sync: overlay.sync.unwrap_or(base.sync),
    }
}
