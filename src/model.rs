use serde::{Deserialize, Serialize};

pub const PLACEHOLDER_ALBUM_ART: &str = "images/album_art_placeholder.jpg";

/// One catalog entry as emitted by the site generator. External entries carry
/// no playable media and only link elsewhere.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Song {
    pub song_id: String,
    pub title: String,
    pub artist: String,
    pub audio_url: String,
    #[serde(default)]
    pub album_art_url: Option<String>,
    pub html_filename: String,
    #[serde(default)]
    pub is_external: bool,
}

impl Song {
    /// Filename-derived slug used by older share links and song page URLs.
    pub fn page_slug(&self) -> &str {
        self.html_filename
            .strip_suffix(".html")
            .unwrap_or(&self.html_filename)
    }

    pub fn album_art(&self) -> &str {
        self.album_art_url.as_deref().unwrap_or(PLACEHOLDER_ALBUM_ART)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub files: Vec<Song>,
}

impl Catalog {
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Which songs the user asked for, taken from the player page's query
/// parameters in the original site (`ids` / `id` / neither).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionRequest {
    Ids(Vec<String>),
    Single(String),
    Default,
}

/// Severity classes of the status region. These mirror the style classes the
/// site attaches to its status element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Severity {
    #[default]
    Neutral,
    Loading,
    Playing,
    Error,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Status {
    pub text: String,
    pub severity: Severity,
}

impl Status {
    pub fn new(text: impl Into<String>, severity: Severity) -> Self {
        Self {
            text: text.into(),
            severity,
        }
    }

    pub fn neutral(text: impl Into<String>) -> Self {
        Self::new(text, Severity::Neutral)
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self::new(text, Severity::Error)
    }
}

/// Format seconds as `m:ss` for the time display.
pub fn format_time(seconds: f64) -> String {
    if !seconds.is_finite() || seconds < 0.0 {
        return String::from("0:00");
    }
    let total = seconds as u64;
    format!("{}:{:02}", total / 60, total % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn song_json(extra: &str) -> String {
        format!(
            r#"{{"song_id":"s1","title":"First","artist":"A","audio_url":"audio/first.mp3","html_filename":"first.html"{extra}}}"#
        )
    }

    #[test]
    fn external_flag_defaults_to_false() {
        let song: Song = serde_json::from_str(&song_json("")).expect("parse");
        assert!(!song.is_external);
        assert_eq!(song.album_art(), PLACEHOLDER_ALBUM_ART);
    }

    #[test]
    fn explicit_fields_are_honored() {
        let song: Song = serde_json::from_str(&song_json(
            r#","is_external":true,"album_art_url":"art/cover.jpg""#,
        ))
        .expect("parse");
        assert!(song.is_external);
        assert_eq!(song.album_art(), "art/cover.jpg");
    }

    #[test]
    fn page_slug_strips_html_extension() {
        let song: Song = serde_json::from_str(&song_json("")).expect("parse");
        assert_eq!(song.page_slug(), "first");
    }

    #[test]
    fn page_slug_passes_through_other_names() {
        let mut song: Song = serde_json::from_str(&song_json("")).expect("parse");
        song.html_filename = String::from("plain-name");
        assert_eq!(song.page_slug(), "plain-name");
    }

    #[test]
    fn format_time_pads_seconds() {
        assert_eq!(format_time(0.0), "0:00");
        assert_eq!(format_time(61.4), "1:01");
        assert_eq!(format_time(600.0), "10:00");
        assert_eq!(format_time(f64::NAN), "0:00");
    }
}
