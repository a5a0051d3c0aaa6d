use crate::model::{SelectionRequest, Song};

/// Resolve one requested identifier against the catalog.
///
/// Precedence is load-bearing for old share links and must not change:
/// exact `song_id`, then all-digits as a 1-based catalog position (out of
/// range falls back to the first entry), then `html_filename`, its slug, or
/// the display title. Anything else falls back to the first entry, so this
/// only returns `None` on an empty catalog.
pub fn select_song<'a>(catalog: &'a [Song], id: &str) -> Option<&'a Song> {
    if id.is_empty() {
        return catalog.first();
    }

    if let Some(song) = catalog.iter().find(|song| song.song_id == id) {
        return Some(song);
    }

    if id.bytes().all(|byte| byte.is_ascii_digit()) {
        let position = id.parse::<usize>().ok().and_then(|n| n.checked_sub(1));
        return position
            .and_then(|index| catalog.get(index))
            .or_else(|| catalog.first());
    }

    if let Some(song) = catalog
        .iter()
        .find(|song| song.html_filename == id || song.page_slug() == id || song.title == id)
    {
        return Some(song);
    }

    catalog.first()
}

/// Build the playback sequence for a selection request. An empty result is
/// the terminal "No songs to play" state and only occurs when the catalog
/// itself is empty.
pub fn build(catalog: &[Song], request: &SelectionRequest) -> Vec<Song> {
    match request {
        SelectionRequest::Ids(ids) => ids
            .iter()
            .filter_map(|id| select_song(catalog, id))
            .cloned()
            .collect(),
        SelectionRequest::Single(id) => {
            select_song(catalog, id).cloned().into_iter().collect()
        }
        SelectionRequest::Default => catalog.first().cloned().into_iter().collect(),
    }
}

/// Parse the comma-separated `ids` / single `id` query parameters into a
/// selection request. Both absent means the catalog's first entry.
pub fn request_from_params(ids: Option<&str>, id: Option<&str>) -> SelectionRequest {
    if let Some(ids) = ids {
        return SelectionRequest::Ids(ids.split(',').map(str::to_string).collect());
    }
    if let Some(id) = id {
        return SelectionRequest::Single(id.to_string());
    }
    SelectionRequest::Default
}

/// Lookahead result used by the next-up display and the preload policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextUp<'a> {
    Song(usize, &'a Song),
    LastSong,
}

/// First non-external entry after `from`. Never mutates anything; repeated
/// calls give the same answer until the playlist changes.
pub fn find_next_playable(playlist: &[Song], from: usize) -> NextUp<'_> {
    let mut index = from + 1;
    while index < playlist.len() {
        if !playlist[index].is_external {
            return NextUp::Song(index, &playlist[index]);
        }
        index += 1;
    }
    NextUp::LastSong
}
