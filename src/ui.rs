use crate::media::MediaSource;
use crate::model::{Severity, Song, format_time};
use crate::player::{PlaybackState, PlayerSession};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap};

const APP_TITLE: &str = "songdeck v0.1.0  ";

/// One rendered row of the listing page: a section header or a song under it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListingRow {
    Header(String),
    Song { catalog_index: usize, title: String },
}

#[derive(Debug, Clone, Default)]
pub struct ListingView {
    pub query: String,
    pub searching: bool,
    pub rows: Vec<ListingRow>,
    pub selected: usize,
    pub no_results: Option<String>,
}

#[derive(Debug, Clone)]
pub struct QrPopup {
    pub title: String,
    pub share_url: String,
    pub qr_url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Player,
    Listing,
}

#[derive(Clone, Copy)]
struct Palette {
    bg: Color,
    panel_bg: Color,
    panel_alt_bg: Color,
    border: Color,
    text: Color,
    muted: Color,
    accent: Color,
    alert: Color,
    error: Color,
    selected_bg: Color,
    popup_bg: Color,
}

fn palette() -> Palette {
    Palette {
        bg: Color::Rgb(10, 15, 24),
        panel_bg: Color::Rgb(19, 29, 43),
        panel_alt_bg: Color::Rgb(24, 38, 58),
        border: Color::Rgb(69, 121, 176),
        text: Color::Rgb(214, 228, 248),
        muted: Color::Rgb(149, 173, 204),
        accent: Color::Rgb(100, 203, 184),
        alert: Color::Rgb(249, 174, 88),
        error: Color::Rgb(240, 101, 101),
        selected_bg: Color::Rgb(34, 55, 82),
        popup_bg: Color::Rgb(22, 33, 51),
    }
}

fn severity_color(severity: Severity, colors: &Palette) -> Color {
    match severity {
        Severity::Neutral => colors.text,
        Severity::Loading => colors.alert,
        Severity::Playing => colors.accent,
        Severity::Error => colors.error,
    }
}

pub fn draw(
    frame: &mut Frame,
    page: Page,
    session: &PlayerSession,
    media: &dyn MediaSource,
    listing: &ListingView,
    qr: Option<&QrPopup>,
) {
    let colors = palette();
    frame.render_widget(
        Block::default().style(Style::default().bg(colors.bg)),
        frame.area(),
    );

    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(8),
            Constraint::Length(3),
            Constraint::Length(3),
        ])
        .split(frame.area());

    draw_header(frame, vertical[0], page, session, listing, &colors);

    match page {
        Page::Player => draw_player_body(frame, vertical[1], session, &colors),
        Page::Listing => draw_listing_body(frame, vertical[1], listing, &colors),
    }

    draw_timeline(frame, vertical[2], session, media, &colors);
    draw_footer(frame, vertical[3], page, listing, &colors);

    if let Some(popup) = qr {
        draw_qr_popup(frame, popup, &colors);
    }
}

fn draw_header(
    frame: &mut Frame,
    area: Rect,
    page: Page,
    session: &PlayerSession,
    listing: &ListingView,
    colors: &Palette,
) {
    frame.render_widget(
        panel_block("Status", colors.panel_bg, colors.text, colors.border),
        area,
    );

    let inner = area.inner(Margin {
        vertical: 1,
        horizontal: 1,
    });
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(20), Constraint::Min(10)])
        .split(inner);

    frame.render_widget(
        Paragraph::new(Span::styled(
            APP_TITLE,
            Style::default()
                .fg(colors.accent)
                .add_modifier(Modifier::BOLD),
        )),
        chunks[0],
    );

    let right = if page == Page::Listing && listing.searching {
        Line::from(vec![
            Span::styled("Search: ", Style::default().fg(colors.muted)),
            Span::styled(
                format!("{}_", listing.query),
                Style::default().fg(colors.text).add_modifier(Modifier::BOLD),
            ),
        ])
    } else {
        Line::from(Span::styled(
            session.status.text.as_str(),
            Style::default().fg(severity_color(session.status.severity, colors)),
        ))
    };
    frame.render_widget(Paragraph::new(right).alignment(Alignment::Right), chunks[1]);
}

fn playlist_item<'a>(
    index: usize,
    song: &'a Song,
    session: &PlayerSession,
    colors: &Palette,
) -> ListItem<'a> {
    let is_current = session.current.is_some() && index == session.current_index;
    let marker = if is_current {
        String::from("  ▶ ")
    } else {
        format!("{:>3} ", index + 1)
    };

    let mut title_style = Style::default().fg(colors.text);
    if is_current {
        title_style = title_style.add_modifier(Modifier::BOLD);
    }
    if song.is_external {
        title_style = Style::default().fg(colors.muted);
    }

    let mut spans = vec![
        Span::styled(marker, Style::default().fg(colors.muted)),
        Span::styled(song.title.as_str(), title_style),
    ];
    if song.is_external {
        spans.push(Span::styled(
            " [external link]",
            Style::default().fg(colors.alert),
        ));
    }
    ListItem::new(Line::from(spans))
}

fn draw_player_body(frame: &mut Frame, area: Rect, session: &PlayerSession, colors: &Palette) {
    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(area);

    let items: Vec<ListItem> = session
        .playlist
        .iter()
        .enumerate()
        .map(|(index, song)| playlist_item(index, song, session, colors))
        .collect();

    let mut state = ListState::default();
    state.select((!session.playlist.is_empty()).then_some(session.current_index));

    let list = List::new(items)
        .block(panel_block(
            "Playlist",
            colors.panel_bg,
            colors.text,
            colors.border,
        ))
        .highlight_style(Style::default().bg(colors.selected_bg));
    frame.render_stateful_widget(list, body[0], &mut state);

    let title = session
        .current
        .as_ref()
        .map(|song| song.title.as_str())
        .unwrap_or("-");
    let artist = session
        .current
        .as_ref()
        .map(|song| song.artist.as_str())
        .unwrap_or("-");
    let art = session
        .current
        .as_ref()
        .map(|song| song.album_art())
        .unwrap_or("-");

    let mut info = vec![
        Line::from(vec![
            Span::styled(
                "Now",
                Style::default()
                    .fg(colors.accent)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(format!("  {title}"), Style::default().fg(colors.text)),
        ]),
        Line::from(Span::styled(
            format!("Artist  {artist}"),
            Style::default().fg(colors.muted),
        )),
        Line::from(Span::styled(
            format!("Art     {art}"),
            Style::default().fg(colors.muted),
        )),
        Line::from(Span::styled(
            format!("State   {:?}", session.state),
            Style::default().fg(colors.alert),
        )),
    ];
    if let Some(next_up) = session.next_up_label() {
        info.push(Line::from(""));
        info.push(Line::from(Span::styled(
            next_up,
            Style::default().fg(colors.accent),
        )));
    }

    let info_block = Paragraph::new(info)
        .block(panel_block(
            "Song Info",
            colors.panel_alt_bg,
            colors.text,
            colors.border,
        ))
        .wrap(Wrap { trim: true });
    frame.render_widget(info_block, body[1]);
}

fn draw_listing_body(frame: &mut Frame, area: Rect, listing: &ListingView, colors: &Palette) {
    if let Some(message) = &listing.no_results {
        let notice = Paragraph::new(Span::styled(
            message.as_str(),
            Style::default().fg(colors.alert),
        ))
        .alignment(Alignment::Center)
        .block(panel_block(
            "Songs",
            colors.panel_bg,
            colors.text,
            colors.border,
        ));
        frame.render_widget(notice, area);
        return;
    }

    let items: Vec<ListItem> = listing
        .rows
        .iter()
        .map(|row| match row {
            ListingRow::Header(header) => ListItem::new(Span::styled(
                header.clone(),
                Style::default()
                    .fg(colors.accent)
                    .add_modifier(Modifier::BOLD),
            )),
            ListingRow::Song { title, .. } => ListItem::new(Line::from(vec![
                Span::styled("    ", Style::default().fg(colors.muted)),
                Span::styled(title.clone(), Style::default().fg(colors.text)),
            ])),
        })
        .collect();

    let mut state = ListState::default();
    state.select((!listing.rows.is_empty()).then_some(listing.selected));

    let list = List::new(items)
        .block(panel_block(
            "Songs",
            colors.panel_bg,
            colors.text,
            colors.border,
        ))
        .highlight_style(Style::default().bg(colors.selected_bg));
    frame.render_stateful_widget(list, area, &mut state);
}

fn draw_timeline(
    frame: &mut Frame,
    area: Rect,
    session: &PlayerSession,
    media: &dyn MediaSource,
    colors: &Palette,
) {
    let elapsed = session
        .displayed_position(media)
        .map(|position| format_time(position.as_secs_f64()))
        .unwrap_or_else(|| String::from("0:00"));
    let total = media
        .duration()
        .map(|duration| format_time(duration.as_secs_f64()))
        .unwrap_or_else(|| String::from("-:--"));

    let bar = progress_bar(session.displayed_fraction(media), 40);
    let mode = if session.is_scrubbing() {
        "  (seeking, Enter to jump, Esc to cancel)"
    } else {
        ""
    };

    let timeline = Paragraph::new(Span::styled(
        format!("{elapsed} / {total} {bar}{mode}"),
        Style::default().fg(colors.text),
    ))
    .block(panel_block(
        "Timeline",
        colors.panel_bg,
        colors.text,
        colors.border,
    ));
    frame.render_widget(timeline, area);
}

fn draw_footer(frame: &mut Frame, area: Rect, page: Page, listing: &ListingView, colors: &Palette) {
    let keys = match page {
        Page::Player => {
            "Keys: Space play/pause, n next, ↑/↓ select, Enter play selected, ←/→ seek, s share, r QR, Tab songs, q quit"
        }
        Page::Listing if listing.searching => "Type to filter, Enter keep, Esc clear",
        Page::Listing => "Keys: / search, ↑/↓ select, Enter play, Tab player, q quit",
    };
    let footer = Paragraph::new(Span::styled(keys, Style::default().fg(colors.muted))).block(
        panel_block("Help", colors.panel_bg, colors.text, colors.border),
    );
    frame.render_widget(footer, area);
}

fn draw_qr_popup(frame: &mut Frame, popup: &QrPopup, colors: &Palette) {
    let area = centered_rect(frame.area(), 62, 40);
    frame.render_widget(Clear, area);

    let lines = vec![
        Line::from(Span::styled(
            popup.title.as_str(),
            Style::default()
                .fg(colors.accent)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(Span::styled(
            popup.share_url.as_str(),
            Style::default().fg(colors.text),
        )),
        Line::from(""),
        Line::from(Span::styled(
            "QR image:",
            Style::default().fg(colors.muted),
        )),
        Line::from(Span::styled(
            popup.qr_url.as_str(),
            Style::default().fg(colors.muted),
        )),
        Line::from(""),
        Line::from(Span::styled(
            "Esc to close",
            Style::default().fg(colors.alert),
        )),
    ];

    let body = Paragraph::new(lines)
        .block(panel_block(
            "Share",
            colors.popup_bg,
            colors.text,
            colors.border,
        ))
        .wrap(Wrap { trim: true });
    frame.render_widget(body, area);
}

fn panel_block(title: &str, bg: Color, text: Color, border: Color) -> Block<'_> {
    Block::default()
        .borders(Borders::ALL)
        .title(Span::styled(
            format!(" {title} "),
            Style::default().fg(text).add_modifier(Modifier::BOLD),
        ))
        .border_style(Style::default().fg(border))
        .style(Style::default().bg(bg))
}

fn centered_rect(area: Rect, percent_x: u16, percent_y: u16) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1]);

    horizontal[1]
}

fn progress_bar(ratio: f64, width: usize) -> String {
    let clamped = ratio.clamp(0.0, 1.0);
    let filled = (clamped * width as f64).round() as usize;
    let mut bar = String::with_capacity(width + 2);
    bar.push('[');
    bar.push_str(&"#".repeat(filled));
    bar.push_str(&"-".repeat(width.saturating_sub(filled)));
    bar.push(']');
    bar
}
