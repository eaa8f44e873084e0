//! Deterministic layout of the mirror tree.
//!
//! ```text
//! root/
//!   channels/<channel>/<video>/<files>
//!   playlists/<playlist>/<video>/<files>
//!   singles/<video>/<files>
//! ```
//!
//! Paths are kept as `/`-separated strings relative to the mirror root so
//! they can double as record keys. They are joined onto the root only at IO
//! time.

use crate::error::{Error, Result};
use crate::mirror_config::options::OptionSet;
use crate::model::{FileKind, RemoteKind};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use tracing::debug;

/// Longest path segment common filesystems accept.
const MAX_SEGMENT_BYTES: usize = 255;
/// Sanitized names leave headroom for file suffixes and `_<id>` disambiguation.
const MAX_NAME_BYTES: usize = 180;
const MAX_LANG_BYTES: usize = 32;
const UNSAFE_CHARS: &[char] = &[
    '"', '#', '$', '%', '\'', '*', ',', '.', '/', ':', ';', '<', '>', '?', '\\', '^', '|', '~',
];

/// Anything that can answer "is this path already allocated?".
pub trait PathLookup {
    fn is_taken(&self, path: &str) -> Result<bool>;
}

impl PathLookup for HashSet<String> {
    fn is_taken(&self, path: &str) -> Result<bool> {
        Ok(self.contains(path))
    }
}

impl PathLookup for BTreeSet<String> {
    fn is_taken(&self, path: &str) -> Result<bool> {
        Ok(self.contains(path))
    }
}

/// A planned file before it becomes a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileStub {
    pub kind: FileKind,
    pub language: Option<String>,
}

/// Make a remote title safe to use as a single path segment.
pub fn sanitize(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut pending_gap = false;

    for c in name.chars() {
        if c.is_whitespace() {
            pending_gap = !out.is_empty();
            continue;
        }
        if c.is_control() || UNSAFE_CHARS.contains(&c) {
            continue;
        }
        if pending_gap {
            out.push('_');
            pending_gap = false;
        }
        out.push(c);
    }

    truncate_bytes(&mut out, MAX_NAME_BYTES);
    if out.is_empty() {
        out.push_str("untitled");
    }
    out
}

/// `<plural>/<parent>/<own>` when a parent name is given, `<plural>/<own>` otherwise.
pub fn compute_path(kind: RemoteKind, parent_name: Option<&str>, own_name: &str) -> String {
    match parent_name {
        Some(parent) => format!("{}/{}/{}", kind.plural(), sanitize(parent), sanitize(own_name)),
        None => format!("{}/{}", kind.plural(), sanitize(own_name)),
    }
}

/// Path of a child item inside its group's already-resolved directory.
pub fn nest_path(parent_path: &str, own_name: &str) -> String {
    format!("{}/{}", parent_path, sanitize(own_name))
}

/// Return `candidate` unchanged if it is free, otherwise append `_<id>` before
/// the final segment's extension until it is free.
pub fn resolve_collision<L: PathLookup + ?Sized>(
    candidate: &str,
    table: &L,
    disambiguating_id: &str,
) -> Result<String> {
    let mut path = candidate.to_string();
    let mut attempt = 0;
    while table.is_taken(&path)? {
        debug!("Path {} already allocated, disambiguating", path);
        attempt += 1;
        path = with_suffix(candidate, disambiguating_id, attempt)?;
    }
    Ok(path)
}

/// `candidate` with `_<id>` repeated `times` times before the final segment's
/// extension. The stem is trimmed when the segment would outgrow
/// `MAX_SEGMENT_BYTES`.
fn with_suffix(candidate: &str, id: &str, times: usize) -> Result<String> {
    let segment_start = candidate.rfind('/').map_or(0, |i| i + 1);
    let (dir, segment) = candidate.split_at(segment_start);
    let (stem, ext) = match segment.rfind('.') {
        Some(dot) if dot > 0 => segment.split_at(dot),
        _ => (segment, ""),
    };
    let suffix = format!("_{}", id).repeat(times);
    let budget = MAX_SEGMENT_BYTES
        .checked_sub(suffix.len() + ext.len())
        .filter(|budget| *budget > 0)
        .ok_or_else(|| Error::Other(format!("no free path left for {} at {}", id, candidate)))?;

    let mut stem = stem.to_string();
    truncate_bytes(&mut stem, budget);
    Ok(format!("{}{}{}{}", dir, stem, suffix, ext))
}

fn truncate_bytes(s: &mut String, max: usize) {
    if s.len() > max {
        let mut end = max;
        while !s.is_char_boundary(end) {
            end -= 1;
        }
        s.truncate(end);
    }
}

fn file_name(kind: FileKind, name: &str, language: Option<&str>) -> String {
    let stem = sanitize(name);
    match (kind, language) {
        (FileKind::Audio, _) => format!("{}_audio.{}", stem, kind.extension()),
        (FileKind::Caption, Some(lang)) => {
            let mut lang = sanitize(lang);
            truncate_bytes(&mut lang, MAX_LANG_BYTES);
            format!("{}_{}.{}", stem, lang, kind.extension())
        }
        _ => format!("{}.{}", stem, kind.extension()),
    }
}

/// Every file the options ask for, keyed by its path under `path`.
pub fn compute_file_set(
    path: &str,
    name: &str,
    options: &OptionSet,
) -> BTreeMap<String, FileStub> {
    let mut files = BTreeMap::new();
    let mut add = |kind: FileKind, language: Option<&str>| {
        let filepath = format!("{}/{}", path, file_name(kind, name, language));
        files.insert(
            filepath,
            FileStub {
                kind,
                language: language.map(str::to_string),
            },
        );
    };

    if options.dl_video {
        add(FileKind::Video, None);
    }
    if options.dl_audio {
        add(FileKind::Audio, None);
    }
    if options.dl_captions {
        for lang in &options.caption_languages {
            add(FileKind::Caption, Some(lang.as_str()));
        }
    }
    if options.dl_thumbnail {
        add(FileKind::Thumbnail, None);
    }
    files
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_strips_unsafe_and_collapses_whitespace() {
        assert_eq!(sanitize("My Video"), "My_Video");
        assert_eq!(sanitize("  a \t\n b  "), "a_b");
        assert_eq!(sanitize("What? A/B: \"test\" v1.2"), "What_AB_test_v12");
        assert_eq!(sanitize("\u{0}\u{7}bell"), "bell");
    }

    #[test]
    fn test_sanitize_never_returns_empty() {
        assert_eq!(sanitize(""), "untitled");
        assert_eq!(sanitize("...///???"), "untitled");
    }

    #[test]
    fn test_sanitize_keeps_unicode_and_truncates_on_char_boundary() {
        assert_eq!(sanitize("日本語 の 動画"), "日本語_の_動画");
        let long = "é".repeat(300);
        let out = sanitize(&long);
        assert!(out.len() <= MAX_NAME_BYTES);
        assert!(out.chars().all(|c| c == 'é'));
    }

    #[test]
    fn test_compute_path() {
        assert_eq!(compute_path(RemoteKind::Single, None, "My Video"), "singles/My_Video");
        assert_eq!(
            compute_path(RemoteKind::Channel, Some("Some Channel"), "Clip #1"),
            "channels/Some_Channel/Clip_1"
        );
        assert_eq!(nest_path("playlists/Mix_UCx", "Song A"), "playlists/Mix_UCx/Song_A");
    }

    #[test]
    fn test_resolve_collision_appends_id() {
        let mut table = HashSet::new();
        assert_eq!(
            resolve_collision("singles/My_Video", &table, "id1").unwrap(),
            "singles/My_Video"
        );

        table.insert("singles/My_Video".to_string());
        assert_eq!(
            resolve_collision("singles/My_Video", &table, "id2").unwrap(),
            "singles/My_Video_id2"
        );
    }

    #[test]
    fn test_resolve_collision_keeps_extension() {
        let table: HashSet<String> = ["singles/x/My_Video.mp4".to_string()].into();
        assert_eq!(
            resolve_collision("singles/x/My_Video.mp4", &table, "abc").unwrap(),
            "singles/x/My_Video_abc.mp4"
        );
    }

    #[test]
    fn test_collision_sequence_is_unique_and_repeatable() {
        let inputs = [
            ("My Video", "a1"),
            ("My Video", "b2"),
            ("My  Video", "c3"),
            ("My_Video_b2", "d4"),
            ("Other", "e5"),
        ];

        let run = || {
            let mut table = BTreeSet::new();
            let mut out = Vec::new();
            for (name, id) in inputs {
                let candidate = compute_path(RemoteKind::Single, None, name);
                let path = resolve_collision(&candidate, &table, id).unwrap();
                table.insert(path.clone());
                out.push(path);
            }
            out
        };

        let first = run();
        let unique: BTreeSet<&String> = first.iter().collect();
        assert_eq!(unique.len(), inputs.len());
        assert_eq!(first, run());
        assert_eq!(first[1], "singles/My_Video_b2");
        assert_eq!(first[3], "singles/My_Video_b2_d4");
    }

    #[test]
    fn test_compute_file_set() {
        let options = OptionSet {
            dl_video: true,
            dl_audio: true,
            dl_captions: true,
            dl_thumbnail: true,
            caption_languages: vec!["en".into(), "pt-BR".into()],
            ..OptionSet::default()
        };
        let files = compute_file_set("singles/My_Video", "My Video", &options);
        let keys: Vec<&str> = files.keys().map(String::as_str).collect();
        assert_eq!(
            keys,
            vec![
                "singles/My_Video/My_Video.jpg",
                "singles/My_Video/My_Video.mp4",
                "singles/My_Video/My_Video_audio.mp4",
                "singles/My_Video/My_Video_en.srt",
                "singles/My_Video/My_Video_pt-BR.srt",
            ]
        );
        assert_eq!(
            files["singles/My_Video/My_Video_en.srt"].language.as_deref(),
            Some("en")
        );
        assert_eq!(files["singles/My_Video/My_Video.jpg"].kind, FileKind::Thumbnail);
    }

    #[test]
    fn test_long_titles_keep_every_segment_within_limit() {
        let name = "日".repeat(100);
        let id = "dQw4w9WgXcQ";
        let options = OptionSet {
            dl_video: true,
            dl_audio: true,
            dl_captions: true,
            dl_thumbnail: true,
            caption_languages: vec!["en".into(), "x".repeat(300)],
            ..OptionSet::default()
        };

        let mut taken = BTreeSet::new();
        let candidate = compute_path(RemoteKind::Single, None, &name);
        taken.insert(candidate.clone());
        let dir = resolve_collision(&candidate, &taken, id).unwrap();
        assert!(dir.ends_with("_dQw4w9WgXcQ"));

        let mut all = vec![dir.clone()];
        for (filepath, _) in compute_file_set(&dir, &name, &options) {
            all.push(filepath.clone());
            taken.insert(filepath.clone());
            // Force a second disambiguation round on every file as well.
            let once = resolve_collision(&filepath, &taken, id).unwrap();
            taken.insert(once.clone());
            all.push(once);
            all.push(resolve_collision(&filepath, &taken, id).unwrap());
        }

        for path in &all {
            for segment in path.split('/') {
                assert!(segment.len() <= MAX_SEGMENT_BYTES, "{} bytes: {}", segment.len(), path);
            }
        }
        assert!(all.iter().any(|p| p.ends_with("_audio_dQw4w9WgXcQ.mp4")));
        assert!(all.iter().any(|p| p.ends_with("_dQw4w9WgXcQ_dQw4w9WgXcQ.jpg")));
    }

    #[test]
    fn test_suffixes_trim_the_stem_instead_of_overflowing() {
        let stem = "a".repeat(MAX_SEGMENT_BYTES - 4);
        let candidate = format!("singles/x/{}.mp4", stem);
        let table: HashSet<String> = [candidate.clone()].into();

        let resolved = resolve_collision(&candidate, &table, "id9").unwrap();
        let segment = resolved.rsplit('/').next().unwrap();
        assert_eq!(segment.len(), MAX_SEGMENT_BYTES);
        assert!(segment.ends_with("a_id9.mp4"));
    }

    #[test]
    fn test_compute_file_set_respects_disabled_kinds() {
        let options = OptionSet {
            dl_video: false,
            ..OptionSet::default()
        };
        assert!(compute_file_set("singles/x", "x", &options).is_empty());
    }
}
