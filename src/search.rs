use crate::model::Song;
use unicode_normalization::UnicodeNormalization;

/// A listing-page section: a header plus the catalog indices rendered under
/// it. The site groups songs per album section; here sections are built from
/// the catalog but the filter works on any grouping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub header: String,
    pub songs: Vec<usize>,
}

/// Group the catalog under artist headers, preserving catalog order within
/// and across sections.
pub fn sections_by_artist(catalog: &[Song]) -> Vec<Section> {
    let mut sections: Vec<Section> = Vec::new();
    for (index, song) in catalog.iter().enumerate() {
        match sections.iter_mut().find(|s| s.header == song.artist) {
            Some(section) => section.songs.push(index),
            None => sections.push(Section {
                header: song.artist.clone(),
                songs: vec![index],
            }),
        }
    }
    sections
}

/// Visibility of every entry and section for one query, plus the no-results
/// notice when nothing matched a non-empty query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterResult {
    pub visible_songs: Vec<bool>,
    pub visible_sections: Vec<bool>,
    pub no_results: Option<String>,
}

impl FilterResult {
    pub fn any_visible(&self) -> bool {
        self.visible_songs.iter().any(|visible| *visible)
    }
}

fn fold(text: &str) -> String {
    text.nfc().collect::<String>().to_lowercase()
}

/// Title-substring filter over a sectioned listing. Matching is a trimmed,
/// case-insensitive containment test; the empty query matches everything. A
/// section stays visible iff at least one of its entries matched.
pub fn filter(catalog: &[Song], sections: &[Section], query: &str) -> FilterResult {
    let needle = fold(query.trim());

    let mut visible_songs = vec![false; catalog.len()];
    let mut visible_sections = vec![false; sections.len()];

    if needle.is_empty() {
        visible_songs.fill(true);
        visible_sections.fill(true);
        return FilterResult {
            visible_songs,
            visible_sections,
            no_results: None,
        };
    }

    let mut any = false;
    for (section_index, section) in sections.iter().enumerate() {
        for &song_index in &section.songs {
            let Some(song) = catalog.get(song_index) else {
                continue;
            };
            if fold(&song.title).contains(&needle) {
                visible_songs[song_index] = true;
                visible_sections[section_index] = true;
                any = true;
            }
        }
    }

    // the notice interpolates the query exactly as the user typed it
    let no_results = (!any).then(|| format!("No songs found for \"{query}\""));

    FilterResult {
        visible_songs,
        visible_sections,
        no_results,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn song(title: &str, artist: &str) -> Song {
        Song {
            song_id: title.to_lowercase(),
            title: title.to_string(),
            artist: artist.to_string(),
            audio_url: format!("audio/{title}.mp3"),
            album_art_url: None,
            html_filename: format!("{title}.html"),
            is_external: false,
        }
    }

    fn listing() -> (Vec<Song>, Vec<Section>) {
        let catalog = vec![
            song("Endless Love", "Karn"),
            song("Morning Rain", "Karn"),
            song("Night Drive", "Lada"),
        ];
        let sections = sections_by_artist(&catalog);
        (catalog, sections)
    }

    #[test]
    fn sections_group_by_artist_in_order() {
        let (_, sections) = listing();
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].header, "Karn");
        assert_eq!(sections[0].songs, vec![0, 1]);
        assert_eq!(sections[1].songs, vec![2]);
    }

    #[test]
    fn empty_query_shows_everything() {
        let (catalog, sections) = listing();
        let result = filter(&catalog, &sections, "");
        assert!(result.visible_songs.iter().all(|v| *v));
        assert!(result.visible_sections.iter().all(|v| *v));
        assert_eq!(result.no_results, None);
    }

    #[test]
    fn whitespace_query_counts_as_empty() {
        let (catalog, sections) = listing();
        let result = filter(&catalog, &sections, "   ");
        assert!(result.visible_songs.iter().all(|v| *v));
        assert_eq!(result.no_results, None);
    }

    #[test]
    fn matching_is_case_insensitive() {
        let (catalog, sections) = listing();
        let result = filter(&catalog, &sections, "love");
        assert_eq!(result.visible_songs, vec![true, false, false]);
        assert_eq!(result.visible_sections, vec![true, false]);
        assert_eq!(result.no_results, None);
    }

    #[test]
    fn section_hidden_when_no_entry_matches() {
        let (catalog, sections) = listing();
        let result = filter(&catalog, &sections, "night");
        assert_eq!(result.visible_sections, vec![false, true]);
    }

    #[test]
    fn no_results_notice_interpolates_the_literal_query() {
        let (catalog, sections) = listing();
        let result = filter(&catalog, &sections, "zzz");
        assert!(!result.any_visible());
        assert_eq!(
            result.no_results.as_deref(),
            Some("No songs found for \"zzz\"")
        );
    }

    #[test]
    fn combining_characters_still_match() {
        let catalog = vec![song("Cafe\u{0301} Nights", "Karn")];
        let sections = sections_by_artist(&catalog);
        let result = filter(&catalog, &sections, "caf\u{00e9}");
        assert_eq!(result.visible_songs, vec![true]);
    }
}
