//! Source provider and fetcher backed by the `yt-dlp` executable.

use super::{links, FetchOutcome, FileRequest, Fetcher, ItemRef, RemoteMetadata, SourceProvider};
use crate::error::{Error, Result};
use crate::mirror_config::options::OptionSet;
use crate::model::{FileKind, RemoteKind};
use serde::Deserialize;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tracing::{debug, trace};

pub const DEFAULT_PROGRAM: &str = "yt-dlp";

#[derive(Debug, Deserialize)]
struct DumpedInfo {
    id: Option<String>,
    title: Option<String>,
    channel: Option<String>,
    uploader: Option<String>,
    webpage_url: Option<String>,
    availability: Option<String>,
    #[serde(default)]
    entries: Vec<DumpedEntry>,
    filesize: Option<u64>,
    filesize_approx: Option<u64>,
    #[serde(default)]
    requested_formats: Vec<DumpedFormat>,
}

#[derive(Debug, Deserialize)]
struct DumpedEntry {
    id: Option<String>,
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DumpedFormat {
    filesize: Option<u64>,
    filesize_approx: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct YtDlp {
    program: PathBuf,
}

impl Default for YtDlp {
    fn default() -> Self {
        Self::new(DEFAULT_PROGRAM)
    }
}

impl YtDlp {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn run(&self, args: Vec<OsString>) -> std::io::Result<Output> {
        trace!("Running {} {:?}", self.program.display(), args);
        Command::new(&self.program).args(args).output()
    }
}

fn last_stderr_line(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr)
        .lines()
        .rev()
        .find(|l| !l.trim().is_empty())
        .unwrap_or("no error output")
        .trim()
        .to_string()
}

/// Channel listings only enumerate uploads from the videos tab.
fn listing_url(kind: RemoteKind, url: &str) -> String {
    match kind {
        RemoteKind::Channel if !url.trim_end_matches('/').ends_with("/videos") => {
            format!("{}/videos", url.trim_end_matches('/'))
        }
        _ => url.to_string(),
    }
}

fn is_available(availability: Option<&str>) -> bool {
    !matches!(
        availability,
        Some("private" | "premium_only" | "subscriber_only" | "needs_auth")
    )
}

/// Turn a `--dump-single-json` document into metadata.
pub fn parse_metadata(kind: RemoteKind, requested_url: &str, json: &str) -> Result<RemoteMetadata> {
    let info: DumpedInfo = serde_json::from_str(json).map_err(|e| Error::RemoteFetch {
        url: requested_url.to_string(),
        message: format!("unreadable metadata: {}", e),
    })?;

    let id = match info.id {
        Some(id) => id,
        None => links::derive_id(requested_url)?,
    };
    let name = match kind {
        RemoteKind::Channel => info.channel.or(info.uploader).or(info.title),
        RemoteKind::Playlist | RemoteKind::Single => info.title,
    }
    .unwrap_or_else(|| id.clone());

    let children = match kind {
        RemoteKind::Single => Vec::new(),
        RemoteKind::Channel | RemoteKind::Playlist => info
            .entries
            .into_iter()
            .filter_map(|entry| match (entry.url, entry.id) {
                (Some(url), _) if url.starts_with("http") => Some(url),
                (_, Some(id)) => Some(format!("https://www.youtube.com/watch?v={}", id)),
                _ => None,
            })
            .collect(),
    };

    Ok(RemoteMetadata {
        id,
        kind,
        name,
        url: info.webpage_url.unwrap_or_else(|| requested_url.to_string()),
        available: is_available(info.availability.as_deref()),
        children,
    })
}

fn format_selector(kind: FileKind, options: &OptionSet) -> Option<String> {
    let height = options.resolution.height();
    match kind {
        FileKind::Video => Some(format!(
            "bv*[height<={h}][ext=mp4]+ba[ext=m4a]/b[height<={h}][ext=mp4]/b[height<={h}]",
            h = height
        )),
        FileKind::Audio => Some("ba[ext=m4a]/ba".to_string()),
        FileKind::Caption | FileKind::Thumbnail => None,
    }
}

impl SourceProvider for YtDlp {
    fn fetch_metadata(&self, url: &str) -> Result<RemoteMetadata> {
        let kind = links::classify_url(url)?;
        let target = listing_url(kind, url);
        let mut args: Vec<OsString> = vec!["--dump-single-json".into(), "--no-warnings".into()];
        if kind != RemoteKind::Single {
            args.push("--flat-playlist".into());
        }
        args.push(target.into());

        let output = self.run(args).map_err(|e| Error::RemoteFetch {
            url: url.to_string(),
            message: format!("could not run {}: {}", self.program.display(), e),
        })?;
        if !output.status.success() {
            return Err(Error::RemoteFetch {
                url: url.to_string(),
                message: last_stderr_line(&output),
            });
        }
        let metadata = parse_metadata(kind, url, &String::from_utf8_lossy(&output.stdout))?;
        debug!(
            "Resolved {} '{}' with {} children",
            metadata.kind,
            metadata.name,
            metadata.children.len()
        );
        Ok(metadata)
    }
}

impl Fetcher for YtDlp {
    fn estimate_size(
        &self,
        item: &ItemRef<'_>,
        file: &FileRequest<'_>,
        options: &OptionSet,
    ) -> Result<u64> {
        let Some(selector) = format_selector(file.kind, options) else {
            return Ok(0);
        };
        let args: Vec<OsString> = vec![
            "--dump-single-json".into(),
            "--no-warnings".into(),
            "-f".into(),
            selector.into(),
            item.url.into(),
        ];
        let output = self.run(args)?;
        if !output.status.success() {
            return Err(Error::RemoteFetch {
                url: item.url.to_string(),
                message: last_stderr_line(&output),
            });
        }
        let info: DumpedInfo =
            serde_json::from_slice(&output.stdout).map_err(|e| Error::RemoteFetch {
                url: item.url.to_string(),
                message: format!("unreadable metadata: {}", e),
            })?;
        let combined: u64 = info
            .requested_formats
            .iter()
            .filter_map(|f| f.filesize.or(f.filesize_approx))
            .sum();
        Ok(info.filesize.or(info.filesize_approx).unwrap_or(combined))
    }

    fn fetch(
        &self,
        item: &ItemRef<'_>,
        file: &FileRequest<'_>,
        dest: &Path,
        options: &OptionSet,
    ) -> Result<FetchOutcome> {
        let fail = |message: String| Error::Fetch {
            path: dest.display().to_string(),
            message,
        };
        // yt-dlp appends its own extension to side files, so hand it the stem.
        let stem = dest.with_extension("");
        let mut args: Vec<OsString> = Vec::new();
        let mut flags = |list: &[&str]| args.extend(list.iter().map(OsString::from));
        flags(&["--no-progress", "--no-warnings"]);
        let (output_template, produced) = match file.kind {
            FileKind::Video | FileKind::Audio => {
                let selector = format_selector(file.kind, options).unwrap_or_default();
                flags(&["-f", selector.as_str()]);
                if file.kind == FileKind::Video {
                    flags(&["--merge-output-format", "mp4"]);
                }
                (dest.to_path_buf(), dest.to_path_buf())
            }
            FileKind::Caption => {
                let lang = file
                    .language
                    .ok_or_else(|| fail("caption requested without a language".to_string()))?;
                flags(&[
                    "--skip-download",
                    "--write-subs",
                    "--write-auto-subs",
                    "--sub-langs",
                    lang,
                    "--convert-subs",
                    "srt",
                ]);
                let produced = PathBuf::from(format!("{}.{}.srt", stem.display(), lang));
                (stem.clone(), produced)
            }
            FileKind::Thumbnail => {
                flags(&[
                    "--skip-download",
                    "--write-thumbnail",
                    "--convert-thumbnails",
                    "jpg",
                ]);
                (stem.clone(), stem.with_extension("jpg"))
            }
        };
        args.push("-o".into());
        args.push(output_template.into_os_string());
        args.push(item.url.into());

        let output = self.run(args).map_err(|e| fail(e.to_string()))?;
        if !output.status.success() {
            return Err(fail(last_stderr_line(&output)));
        }
        if produced != dest {
            fs::rename(&produced, dest).map_err(|e| {
                fail(format!("expected output {} missing: {}", produced.display(), e))
            })?;
        }
        let size_bytes = fs::metadata(dest)
            .map_err(|e| fail(format!("output missing after download: {}", e)))?
            .len();
        Ok(FetchOutcome { size_bytes })
    }
}
