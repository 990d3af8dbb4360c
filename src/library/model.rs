use std::path::Path;
use std::time::Duration;

/// A playable audio item as produced by the catalog reader.
///
/// Values are never mutated after `scan` builds them; lists hold clones.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Track {
    /// Stable numeric identifier for the lifetime of one scan.
    pub id: u64,
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    /// Content locator handed to the playback engine (a filesystem path).
    pub uri: String,
    /// Grouping identifier shared by tracks of the same album, used for artwork.
    pub album_id: Option<u64>,
    pub duration: Option<Duration>,
    pub display: String,
}

impl Track {
    /// Tag title, or the file stem when the file carries no title.
    pub fn display_title(&self) -> String {
        if let Some(t) = self.title.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            return t.to_string();
        }
        Path::new(&self.uri)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("UNKNOWN")
            .to_string()
    }

    /// Key used to look up album artwork, shared across an album.
    pub fn artwork_key(&self) -> Option<String> {
        self.album_id.map(|id| format!("album/{id}"))
    }
}
