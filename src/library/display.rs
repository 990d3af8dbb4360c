use std::path::Path;

use crate::config::TrackDisplayField;

/// Build the list label for a track from the configured `fields`.
///
/// Empty fields are skipped; when nothing is left the file stem is used.
pub fn display_from_fields(
    path: &Path,
    title: Option<&str>,
    artist: Option<&str>,
    album: Option<&str>,
    fields: &[TrackDisplayField],
    sep: &str,
) -> String {
    let non_empty = |v: Option<&str>| v.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string);
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string);

    let parts: Vec<String> = fields
        .iter()
        .filter_map(|f| match f {
            TrackDisplayField::Title => non_empty(title),
            TrackDisplayField::Artist => non_empty(artist),
            TrackDisplayField::Album => non_empty(album),
            TrackDisplayField::Filename => stem.clone(),
            TrackDisplayField::Path => Some(path.display().to_string()),
        })
        .collect();

    if parts.is_empty() {
        non_empty(title)
            .or(stem)
            .unwrap_or_else(|| "UNKNOWN".to_string())
    } else {
        parts.join(sep)
    }
}
