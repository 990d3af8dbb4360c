use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use lofty::file::{AudioFile, TaggedFileExt};
use lofty::tag::Accessor;
use thiserror::Error;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::config::LibrarySettings;

use super::display::display_from_fields;
use super::model::Track;

/// Availability problems while enumerating the catalog.
///
/// The UI turns these into an empty list plus a notice; playback never sees them.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("music directory {0} does not exist")]
    NotFound(PathBuf),
    #[error("no permission to read {0}")]
    PermissionDenied(PathBuf),
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl CatalogError {
    fn from_io(path: &Path, err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => Self::NotFound(path.to_path_buf()),
            io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_path_buf()),
            _ => Self::Io {
                path: path.to_path_buf(),
                source: err,
            },
        }
    }
}

fn is_audio_file(path: &Path, settings: &LibrarySettings) -> bool {
    let exts: Vec<String> = settings
        .extensions
        .iter()
        .map(|e| e.trim().trim_start_matches('.').to_ascii_lowercase())
        .filter(|e| !e.is_empty())
        .collect();

    path.extension()
        .and_then(|s| s.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            exts.iter().any(|e| e == &ext)
        })
        .unwrap_or(false)
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|s| s.to_str())
        .map(|name| name.starts_with('.'))
        .unwrap_or(false)
}

struct Tags {
    title: Option<String>,
    artist: Option<String>,
    album: Option<String>,
    duration: Option<Duration>,
}

fn read_tags(path: &Path) -> Tags {
    let mut tags = Tags {
        title: None,
        artist: None,
        album: None,
        duration: None,
    };

    let tagged = match lofty::read_from_path(path) {
        Ok(t) => t,
        Err(e) => {
            debug!(path = %path.display(), error = %e, "no readable tags");
            return tags;
        }
    };

    tags.duration = Some(tagged.properties().duration());
    if let Some(tag) = tagged.primary_tag().or_else(|| tagged.first_tag()) {
        let clean = |v: Option<std::borrow::Cow<'_, str>>| {
            v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
        };
        tags.title = clean(tag.title());
        tags.artist = clean(tag.artist());
        tags.album = clean(tag.album());
    }
    tags
}

/// Enumerate audio files under `dir` into tracks sorted by display label.
///
/// Ids follow the sorted order, so they are stable for one scan of an
/// unchanged directory. Album ids are handed out per distinct album title.
pub fn scan(dir: &Path, settings: &LibrarySettings) -> Result<Vec<Track>, CatalogError> {
    // Surface availability problems for the root; unreadable children are skipped.
    fs::read_dir(dir).map_err(|e| CatalogError::from_io(dir, e))?;

    let mut walker = WalkDir::new(dir).follow_links(settings.follow_links);

    // Non-recursive = only the root directory.
    let depth_cap = if settings.recursive {
        settings.max_depth
    } else {
        Some(1)
    };
    if let Some(d) = depth_cap {
        walker = walker.max_depth(d);
    }

    let mut tracks: Vec<Track> = Vec::new();
    for entry in walker
        .into_iter()
        .filter_entry(|e| settings.include_hidden || e.depth() == 0 || !is_hidden(e.path()))
        .filter_map(Result::ok)
    {
        let path = entry.path();
        if !path.is_file() || !is_audio_file(path, settings) {
            continue;
        }
        // Locators are strings; a lossy one would name a file that isn't there.
        let Some(uri) = path.to_str() else {
            debug!(path = %path.display(), "skipping non UTF-8 path");
            continue;
        };

        let tags = read_tags(path);
        let display = display_from_fields(
            path,
            tags.title.as_deref(),
            tags.artist.as_deref(),
            tags.album.as_deref(),
            &settings.display_fields,
            &settings.display_separator,
        );

        tracks.push(Track {
            id: 0,
            title: tags.title,
            artist: tags.artist,
            album: tags.album,
            uri: uri.to_string(),
            album_id: None,
            duration: tags.duration,
            display,
        });
    }

    tracks.sort_by(|a, b| a.display.to_lowercase().cmp(&b.display.to_lowercase()));

    let mut albums: BTreeMap<String, u64> = BTreeMap::new();
    for (i, track) in tracks.iter_mut().enumerate() {
        track.id = i as u64;
        if let Some(album) = &track.album {
            let next = albums.len() as u64;
            track.album_id = Some(*albums.entry(album.to_lowercase()).or_insert(next));
        }
    }

    info!(root = %dir.display(), tracks = tracks.len(), "catalog scanned");
    Ok(tracks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TrackDisplayField;
    use tempfile::tempdir;

    #[test]
    fn is_audio_file_matches_configured_extensions_case_insensitive() {
        let settings = LibrarySettings::default();
        assert!(is_audio_file(Path::new("/tmp/a.mp3"), &settings));
        assert!(is_audio_file(Path::new("/tmp/a.MP3"), &settings));
        assert!(is_audio_file(Path::new("/tmp/a.flac"), &settings));
        assert!(!is_audio_file(Path::new("/tmp/a.txt"), &settings));
        assert!(!is_audio_file(Path::new("/tmp/a"), &settings));
    }

    #[test]
    fn scan_sorts_by_display_and_assigns_sequential_ids() {
        let dir = tempdir().unwrap();

        fs::write(dir.path().join("b.MP3"), b"not a real mp3").unwrap();
        fs::write(dir.path().join("A.ogg"), b"not a real ogg").unwrap();
        fs::write(dir.path().join("c.txt"), b"ignore me").unwrap();

        let settings = LibrarySettings {
            display_fields: vec![TrackDisplayField::Title],
            ..LibrarySettings::default()
        };
        let tracks = scan(dir.path(), &settings).unwrap();
        assert_eq!(tracks.len(), 2);
        assert_eq!(tracks[0].display, "A");
        assert_eq!(tracks[0].id, 0);
        assert_eq!(tracks[1].display, "b");
        assert_eq!(tracks[1].id, 1);
        // Untagged files have no title; the UI falls back to the stem.
        assert_eq!(tracks[0].title, None);
        assert_eq!(tracks[0].display_title(), "A");
        assert!(tracks[1].uri.ends_with("b.MP3"));
    }

    #[test]
    fn scan_respects_include_hidden_false() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(".hidden.mp3"), b"not real").unwrap();
        fs::write(dir.path().join("visible.mp3"), b"not real").unwrap();

        let settings = LibrarySettings {
            include_hidden: false,
            display_fields: vec![TrackDisplayField::Filename],
            ..LibrarySettings::default()
        };
        let tracks = scan(dir.path(), &settings).unwrap();

        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].display, "visible");
    }

    #[test]
    fn scan_respects_recursive_false() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("root.mp3"), b"not real").unwrap();
        let sub = dir.path().join("sub");
        fs::create_dir_all(&sub).unwrap();
        fs::write(sub.join("child.mp3"), b"not real").unwrap();

        let settings = LibrarySettings {
            recursive: false,
            display_fields: vec![TrackDisplayField::Filename],
            ..LibrarySettings::default()
        };
        let tracks = scan(dir.path(), &settings).unwrap();
        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].display, "root");
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn scan_skips_names_that_cannot_be_used_as_locators() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let dir = tempdir().unwrap();
        fs::write(dir.path().join(OsStr::from_bytes(b"caf\xe9.mp3")), b"not real").unwrap();
        fs::write(dir.path().join("cafe.mp3"), b"not real").unwrap();

        let settings = LibrarySettings {
            display_fields: vec![TrackDisplayField::Filename],
            ..LibrarySettings::default()
        };
        let tracks = scan(dir.path(), &settings).unwrap();

        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].display, "cafe");
        for track in &tracks {
            assert!(fs::File::open(&track.uri).is_ok(), "{} does not open", track.uri);
        }
    }

    #[test]
    fn scan_of_missing_directory_reports_not_found() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("nope");

        let err = scan(&missing, &LibrarySettings::default()).unwrap_err();
        assert!(matches!(err, CatalogError::NotFound(p) if p == missing));
    }
}
