use crate::catalog;
use crate::media::{MediaSource, NullMedia, RodioMedia};
use crate::model::{SelectionRequest, Song};
use crate::player::PlayerSession;
use crate::search::{self, Section};
use crate::share::{self, SystemClipboard};
use crate::ui::{self, ListingRow, ListingView, Page, QrPopup};
use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use std::io::stdout;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

pub struct AppOptions {
    pub catalog_path: PathBuf,
    pub request: SelectionRequest,
    pub base_url: String,
    pub no_audio: bool,
}

pub fn run(options: AppOptions) -> Result<()> {
    // a failed fetch surfaces as the "No files found" state, never a crash
    let catalog = catalog::load(&options.catalog_path).unwrap_or_default();
    let site_root = site_root_of(&options.catalog_path);

    let mut media: Box<dyn MediaSource> = if options.no_audio {
        Box::new(NullMedia::new())
    } else {
        match RodioMedia::new() {
            Ok(engine) => Box::new(engine),
            Err(_) => Box::new(NullMedia::new()),
        }
    };

    let mut session = PlayerSession::new(
        &catalog,
        &options.request,
        site_root,
        options.base_url.clone(),
    );

    enable_raw_mode()?;
    let mut out = stdout();
    execute!(out, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(out);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    session.begin(&mut *media, Instant::now());

    let sections = search::sections_by_artist(&catalog.files);
    let mut listing = ListingView::default();
    refresh_listing(&mut listing, &catalog.files, &sections);

    let mut page = Page::Player;
    let mut qr: Option<QrPopup> = None;
    let mut selected_entry = session.current_index;
    let mut dirty = true;
    let mut last_draw = Instant::now();

    let result: Result<()> = loop {
        session.tick(&mut *media, Instant::now());

        if dirty || session.dirty || last_draw.elapsed() > Duration::from_millis(250) {
            terminal.draw(|frame| {
                ui::draw(frame, page, &session, &*media, &listing, qr.as_ref())
            })?;
            dirty = false;
            session.dirty = false;
            last_draw = Instant::now();
        }

        if !event::poll(Duration::from_millis(33))? {
            continue;
        }

        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }

        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            break Ok(());
        }

        if qr.is_some() {
            if matches!(key.code, KeyCode::Esc | KeyCode::Char('r')) {
                qr = None;
                dirty = true;
            }
            continue;
        }

        if page == Page::Listing && listing.searching {
            match key.code {
                KeyCode::Esc => {
                    // clearing restores full visibility, input stays focused
                    listing.query.clear();
                    refresh_listing(&mut listing, &catalog.files, &sections);
                }
                KeyCode::Enter => listing.searching = false,
                KeyCode::Backspace => {
                    listing.query.pop();
                    refresh_listing(&mut listing, &catalog.files, &sections);
                }
                KeyCode::Char(ch) => {
                    listing.query.push(ch);
                    refresh_listing(&mut listing, &catalog.files, &sections);
                }
                _ => {}
            }
            dirty = true;
            continue;
        }

        match key.code {
            KeyCode::Char('q') => break Ok(()),
            KeyCode::Tab => {
                page = match page {
                    Page::Player => Page::Listing,
                    Page::Listing => Page::Player,
                };
                dirty = true;
            }
            _ => {}
        }

        match page {
            Page::Player => match key.code {
                KeyCode::Char(' ') => session.toggle_play_pause(&mut *media),
                KeyCode::Char('n') => session.play_next(&mut *media, Instant::now()),
                KeyCode::Down => {
                    if !session.playlist.is_empty() {
                        selected_entry = (selected_entry + 1).min(session.playlist.len() - 1);
                        dirty = true;
                    }
                }
                KeyCode::Up => {
                    selected_entry = selected_entry.saturating_sub(1);
                    dirty = true;
                }
                KeyCode::Left => session.scrub_by(-0.02, &*media),
                KeyCode::Right => session.scrub_by(0.02, &*media),
                KeyCode::Esc => session.cancel_scrub(),
                KeyCode::Enter => {
                    if session.is_scrubbing() {
                        session.commit_scrub(&mut *media);
                    } else {
                        session.select_song(selected_entry, &mut *media, Instant::now());
                    }
                }
                KeyCode::Char('s') => {
                    session.share_current(None, &mut SystemClipboard);
                }
                KeyCode::Char('r') => {
                    qr = session.share_request().map(|request| QrPopup {
                        title: request.title.clone(),
                        qr_url: share::qr_code_url(&request.url),
                        share_url: request.url,
                    });
                    dirty = true;
                }
                _ => {}
            },
            Page::Listing => match key.code {
                KeyCode::Char('/') => {
                    listing.searching = true;
                    dirty = true;
                }
                KeyCode::Down => {
                    listing.selected = next_song_row(&listing.rows, listing.selected, 1);
                    dirty = true;
                }
                KeyCode::Up => {
                    listing.selected = next_song_row(&listing.rows, listing.selected, -1);
                    dirty = true;
                }
                KeyCode::Enter => {
                    if let Some(ListingRow::Song { catalog_index, .. }) =
                        listing.rows.get(listing.selected)
                        && let Some(song) = catalog.files.get(*catalog_index)
                    {
                        // navigating to a song page: a fresh one-song session
                        session = PlayerSession::new(
                            &catalog,
                            &SelectionRequest::Single(song.song_id.clone()),
                            site_root_of(&options.catalog_path),
                            options.base_url.clone(),
                        );
                        session.begin(&mut *media, Instant::now());
                        selected_entry = 0;
                        page = Page::Player;
                        dirty = true;
                    }
                }
                _ => {}
            },
        }
    };

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    result
}

fn site_root_of(catalog_path: &Path) -> PathBuf {
    catalog_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default()
}

/// Rebuild the listing rows for the current query: visible sections with
/// their visible songs, or the no-results notice.
fn refresh_listing(listing: &mut ListingView, catalog: &[Song], sections: &[Section]) {
    let result = search::filter(catalog, sections, &listing.query);
    listing.no_results = result.no_results.clone();
    listing.rows = build_listing_rows(catalog, sections, &result);
    let clamped = listing.selected.min(listing.rows.len().saturating_sub(1));
    listing.selected = next_song_row(&listing.rows, clamped, 0);
}

fn build_listing_rows(
    catalog: &[Song],
    sections: &[Section],
    result: &search::FilterResult,
) -> Vec<ListingRow> {
    let mut rows = Vec::new();
    for (section_index, section) in sections.iter().enumerate() {
        if !result
            .visible_sections
            .get(section_index)
            .copied()
            .unwrap_or(false)
        {
            continue;
        }
        rows.push(ListingRow::Header(section.header.clone()));
        for &song_index in &section.songs {
            if result.visible_songs.get(song_index).copied().unwrap_or(false)
                && let Some(song) = catalog.get(song_index)
            {
                rows.push(ListingRow::Song {
                    catalog_index: song_index,
                    title: song.title.clone(),
                });
            }
        }
    }
    rows
}

/// Move the listing selection by `delta` rows, landing only on song rows.
/// `delta` 0 snaps the current selection onto the nearest song row.
fn next_song_row(rows: &[ListingRow], current: usize, delta: i64) -> usize {
    if rows.is_empty() {
        return 0;
    }

    let is_song = |index: usize| matches!(rows.get(index), Some(ListingRow::Song { .. }));
    let mut index = current.min(rows.len() - 1);

    if delta == 0 {
        let mut probe = index;
        loop {
            if is_song(probe) {
                return probe;
            }
            if probe + 1 >= rows.len() {
                break;
            }
            probe += 1;
        }
        return index;
    }

    let step = if delta > 0 { 1_i64 } else { -1 };
    let mut remaining = delta.abs();
    while remaining > 0 {
        let candidate = index as i64 + step;
        if candidate < 0 || candidate as usize >= rows.len() {
            break;
        }
        index = candidate as usize;
        if is_song(index) {
            remaining -= 1;
        } else {
            // keep walking through headers without consuming the step
            continue;
        }
    }

    if is_song(index) { index } else { next_song_row(rows, index, if step > 0 { -1 } else { 1 }) }
}
