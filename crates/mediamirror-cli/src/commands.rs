use clap::{Args, Parser, Subcommand};
use mediamirror_core::{OptionOverlay, Resolution};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "mediamirror")]
#[command(about = "Mirror remote channels, playlists and videos to disk", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Args)]
pub struct RootArg {
    /// Mirror root (defaults to the configured root)
    #[arg(long)]
    pub root: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Create a mirror, or fill in whatever parts of one are missing
    Init {
        /// Directory to initialize
        path: Option<PathBuf>,
        #[command(flatten)]
        root: RootArg,
    },
    /// Start tracking a channel, playlist or video
    Add(AddArgs),
    /// Stop tracking an entity and delete its media
    Remove {
        url: String,
        /// Keep the media on disk
        #[arg(long)]
        no_rm: bool,
        /// Do not ask for confirmation
        #[arg(long)]
        force: bool,
        #[command(flatten)]
        root: RootArg,
    },
    /// Look for new items in one or every tracked group
    Update {
        url: Option<String>,
        /// Download new items afterwards
        #[arg(long)]
        sync: bool,
        #[command(flatten)]
        root: RootArg,
    },
    /// Download everything not yet on disk
    Sync {
        url: Option<String>,
        /// List what would be downloaded
        #[arg(long)]
        dry_run: bool,
        #[command(flatten)]
        root: RootArg,
    },
    /// List tracked entities
    Show {
        #[command(flatten)]
        root: RootArg,
    },
    /// Report divergence between config, records and disk
    Verify {
        #[command(flatten)]
        root: RootArg,
    },
}

#[derive(Debug, Args)]
pub struct AddArgs {
    pub url: String,
    /// Maximum video height, e.g. 1080p
    #[arg(long)]
    pub resolution: Option<Resolution>,
    /// Download captions
    #[arg(long)]
    pub captions: bool,
    /// Caption language, repeatable
    #[arg(long = "caption-lang")]
    pub caption_lang: Vec<String>,
    /// Skip the video stream
    #[arg(long)]
    pub no_video: bool,
    /// Download a separate audio track
    #[arg(long)]
    pub audio: bool,
    /// Download the thumbnail
    #[arg(long)]
    pub thumbnail: bool,
    /// Do not ask for confirmation
    #[arg(long)]
    pub force: bool,
    /// Record everything, download nothing
    #[arg(long)]
    pub dry_run: bool,
    /// Track without downloading
    #[arg(long)]
    pub no_dl: bool,
    #[command(flatten)]
    pub root: RootArg,
}

/// Only flags the user actually passed become overrides.
fn flag(set: bool) -> Option<bool> {
    set.then_some(true)
}

impl AddArgs {
    pub fn overlay(&self) -> OptionOverlay {
        OptionOverlay {
            resolution: self.resolution,
            dl_video: self.no_video.then_some(false),
            dl_audio: flag(self.audio),
            dl_captions: flag(self.captions || !self.caption_lang.is_empty()),
            dl_thumbnail: flag(self.thumbnail),
            caption_languages: (!self.caption_lang.is_empty()).then(|| self.caption_lang.clone()),
            dry_run: flag(self.dry_run),
            force: flag(self.force),
            no_dl: flag(self.no_dl),
            ..OptionOverlay::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_add(args: &[&str]) -> AddArgs {
        let mut argv = vec!["mediamirror", "add"];
        argv.extend_from_slice(args);
        match Cli::parse_from(argv).command {
            Some(Commands::Add(add)) => add,
            other => panic!("expected add, got {:?}", other),
        }
    }

    #[test]
    fn test_add_flags_become_overlay() {
        let add = parse_add(&[
            "https://youtu.be/abc",
            "--resolution",
            "1080p",
            "--no-video",
            "--caption-lang",
            "en",
            "--caption-lang",
            "de",
            "--force",
        ]);
        let overlay = add.overlay();
        assert_eq!(overlay.resolution, Some(Resolution::P1080));
        assert_eq!(overlay.dl_video, Some(false));
        assert_eq!(overlay.dl_captions, Some(true));
        assert_eq!(
            overlay.caption_languages,
            Some(vec!["en".to_string(), "de".to_string()])
        );
        assert_eq!(overlay.force, Some(true));
        assert_eq!(overlay.dl_audio, None);
    }

    #[test]
    fn test_unset_flags_leave_overlay_empty() {
        assert!(parse_add(&["https://youtu.be/abc"]).overlay().is_empty());
    }

    #[test]
    fn test_bad_resolution_is_rejected() {
        let result = Cli::try_parse_from(["mediamirror", "add", "u", "--resolution", "999p"]);
        assert!(result.is_err());
    }
}
