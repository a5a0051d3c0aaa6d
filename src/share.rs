use crate::model::Song;

pub const DEFAULT_BASE_URL: &str = "https://songdeck.example/site";
const QR_SERVICE: &str = "https://api.qrserver.com/v1/create-qr-code/";
const QR_SIZE: u32 = 300;

/// Canonical share URL for a single song page.
pub fn song_share_url(base_url: &str, song: &Song) -> String {
    format!("{}/songs/{}.html", base_url.trim_end_matches('/'), song.page_slug())
}

/// Canonical share URL for an ordered playlist.
pub fn playlist_share_url(base_url: &str, songs: &[Song]) -> String {
    let ids: Vec<&str> = songs.iter().map(|song| song.song_id.as_str()).collect();
    format!(
        "{}/player.html?ids={}",
        base_url.trim_end_matches('/'),
        ids.join(",")
    )
}

/// URL of a QR code image for `url`, rendered by the free QR image service
/// the site uses.
pub fn qr_code_url(url: &str) -> String {
    format!(
        "{QR_SERVICE}?size={QR_SIZE}x{QR_SIZE}&data={}",
        urlencoding::encode(url)
    )
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareRequest {
    pub url: String,
    pub title: String,
    pub artist: String,
}

impl ShareRequest {
    pub fn for_song(base_url: &str, song: &Song) -> Self {
        Self {
            url: song_share_url(base_url, song),
            title: song.title.clone(),
            artist: song.artist.clone(),
        }
    }

    /// Message body a native share sheet would present.
    pub fn text(&self) -> String {
        format!("Listen to \"{}\" by {}", self.title, self.artist)
    }
}

/// One way of handing a link to the user, tried in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShareAttempt {
    Shared,
    /// The user dismissed the dialog. A neutral outcome, not an error.
    Cancelled,
    Unavailable,
}

pub trait ShareTarget {
    fn share(&mut self, request: &ShareRequest) -> ShareAttempt;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShareOutcome {
    SharedNatively,
    CopiedToClipboard,
    Cancelled,
    Unsupported,
}

/// Share `request` through the first mechanism that works: a native share
/// target when the platform offers one, otherwise the clipboard.
pub fn share_song(
    request: &ShareRequest,
    native: Option<&mut dyn ShareTarget>,
    clipboard: &mut dyn ShareTarget,
) -> ShareOutcome {
    if let Some(native) = native {
        match native.share(request) {
            ShareAttempt::Shared => return ShareOutcome::SharedNatively,
            ShareAttempt::Cancelled => return ShareOutcome::Cancelled,
            ShareAttempt::Unavailable => {}
        }
    }

    match clipboard.share(request) {
        ShareAttempt::Shared => ShareOutcome::CopiedToClipboard,
        ShareAttempt::Cancelled | ShareAttempt::Unavailable => ShareOutcome::Unsupported,
    }
}

/// Clipboard share backed by the system clipboard.
#[derive(Default)]
pub struct SystemClipboard;

impl ShareTarget for SystemClipboard {
    fn share(&mut self, request: &ShareRequest) -> ShareAttempt {
        let Ok(mut clipboard) = arboard::Clipboard::new() else {
            return ShareAttempt::Unavailable;
        };
        match clipboard.set_text(request.url.clone()) {
            Ok(()) => ShareAttempt::Shared,
            Err(_) => ShareAttempt::Unavailable,
        }
    }
}
