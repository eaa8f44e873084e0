//! Offline classification of remote links.

use crate::error::{Error, Result};
use crate::model::RemoteKind;
use url::Url;

const CHANNEL_MARKERS: [&str; 3] = ["channel", "c", "user"];

/// Classify `raw` and pull out its stable id in one pass.
pub fn parse_link(raw: &str) -> Result<(RemoteKind, String)> {
    let invalid = || Error::InvalidUrl(raw.to_string());
    let url = Url::parse(raw.trim()).map_err(|_| invalid())?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid());
    }

    let segments: Vec<&str> = url
        .path_segments()
        .map(|s| s.filter(|seg| !seg.is_empty()).collect())
        .unwrap_or_default();
    let query = |name: &str| {
        url.query_pairs()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.into_owned())
            .filter(|v| valid_id(v))
    };

    if let Some(pos) = segments.iter().position(|s| CHANNEL_MARKERS.contains(s)) {
        if let Some(id) = segments.get(pos + 1).filter(|s| valid_id(s)) {
            return Ok((RemoteKind::Channel, id.to_string()));
        }
    }
    if let Some(handle) = segments.iter().find(|s| s.starts_with('@') && s.len() > 1) {
        return Ok((RemoteKind::Channel, handle.to_string()));
    }

    match segments.last().copied() {
        Some("playlist") => query("list")
            .map(|id| (RemoteKind::Playlist, id))
            .ok_or_else(invalid),
        Some("watch") => query("v").map(|id| (RemoteKind::Single, id)).ok_or_else(invalid),
        _ => {
            let short_host = url.host_str().is_some_and(|h| h.ends_with("youtu.be"));
            let id = match segments.as_slice() {
                [id] if short_host => Some(*id),
                [.., "shorts", id] => Some(*id),
                _ => None,
            };
            id.filter(|id| valid_id(id))
                .map(|id| (RemoteKind::Single, id.to_string()))
                .ok_or_else(invalid)
        }
    }
}

pub fn classify_url(raw: &str) -> Result<RemoteKind> {
    parse_link(raw).map(|(kind, _)| kind)
}

pub fn derive_id(raw: &str) -> Result<String> {
    parse_link(raw).map(|(_, id)| id)
}

fn valid_id(id: &str) -> bool {
    !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '-' | '_' | '@' | '.'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_channels() {
        for url in [
            "https://www.youtube.com/channel/UC123abc",
            "https://www.youtube.com/c/SomeName",
            "https://www.youtube.com/user/someone/videos",
            "https://www.youtube.com/@handle",
        ] {
            assert_eq!(classify_url(url).unwrap(), RemoteKind::Channel, "{}", url);
        }
        assert_eq!(derive_id("https://www.youtube.com/channel/UC123abc").unwrap(), "UC123abc");
        assert_eq!(derive_id("https://www.youtube.com/user/someone/videos").unwrap(), "someone");
        assert_eq!(derive_id("https://www.youtube.com/@handle").unwrap(), "@handle");
    }

    #[test]
    fn test_classify_playlist_and_single() {
        let (kind, id) = parse_link("https://www.youtube.com/playlist?list=PLxyz_1").unwrap();
        assert_eq!((kind, id.as_str()), (RemoteKind::Playlist, "PLxyz_1"));

        let (kind, id) = parse_link("https://video/site/watch?v=ABC123").unwrap();
        assert_eq!((kind, id.as_str()), (RemoteKind::Single, "ABC123"));

        let (kind, id) = parse_link("https://www.youtube.com/watch?v=vid1&list=PLother").unwrap();
        assert_eq!((kind, id.as_str()), (RemoteKind::Single, "vid1"));

        assert_eq!(derive_id("https://youtu.be/short9").unwrap(), "short9");
        assert_eq!(derive_id("https://www.youtube.com/shorts/s_1").unwrap(), "s_1");
    }

    #[test]
    fn test_invalid_urls() {
        for url in [
            "JUNK",
            "https://github.com",
            "ftp://www.youtube.com/watch?v=abc",
            "https://www.youtube.com/watch",
            "https://www.youtube.com/watch?v=",
            "https://www.youtube.com/playlist",
            "https://www.youtube.com/watch?v=a/b",
        ] {
            assert!(matches!(classify_url(url), Err(Error::InvalidUrl(_))), "{}", url);
        }
    }
}
