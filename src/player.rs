use crate::media::{MediaEvent, MediaSource};
use crate::model::{Catalog, SelectionRequest, Severity, Song, Status};
use crate::playlist::{self, NextUp};
use crate::share::{self, ShareOutcome, ShareRequest, ShareTarget};
use std::path::PathBuf;
use std::time::{Duration, Instant};

/// Remaining-time threshold below which the next playable entry is preloaded.
pub const PRELOAD_WINDOW: Duration = Duration::from_secs(15);
/// Pause between consecutive external-link skips, so each one shows a notice.
pub const SKIP_DELAY: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Idle,
    Loading,
    Ready,
    Playing,
    Paused,
    Ended,
    Error,
}

#[derive(Debug, Clone, Copy)]
struct PendingSkip {
    next_index: usize,
    due: Instant,
}

/// All mutable playback state of one player page load: the resolved
/// playlist, the cursor into it, the pending skip timer and the scrub state.
/// The single preload handle lives in the media engine.
pub struct PlayerSession {
    pub playlist: Vec<Song>,
    pub current_index: usize,
    pub current: Option<Song>,
    pub state: PlaybackState,
    pub status: Status,
    pub base_url: String,
    site_root: PathBuf,
    pending_skip: Option<PendingSkip>,
    scrub: Option<f64>,
    skip_delay: Duration,
    pub dirty: bool,
}

impl PlayerSession {
    pub fn new(
        catalog: &Catalog,
        request: &SelectionRequest,
        site_root: PathBuf,
        base_url: String,
    ) -> Self {
        let mut session = Self {
            playlist: Vec::new(),
            current_index: 0,
            current: None,
            state: PlaybackState::Idle,
            status: Status::default(),
            base_url,
            site_root,
            pending_skip: None,
            scrub: None,
            skip_delay: SKIP_DELAY,
            dirty: true,
        };

        if catalog.is_empty() {
            session.status = Status::error("No files found");
            return session;
        }

        session.playlist = playlist::build(&catalog.files, request);
        if session.playlist.is_empty() {
            session.status = Status::error("No songs to play");
        }
        session
    }

    #[cfg(test)]
    fn with_skip_delay(mut self, delay: Duration) -> Self {
        self.skip_delay = delay;
        self
    }

    /// Terminal page state: nothing resolved, nothing will ever play.
    pub fn is_terminal(&self) -> bool {
        self.playlist.is_empty()
    }

    /// Load the first entry and make the best-effort autoplay attempt.
    pub fn begin(&mut self, media: &mut dyn MediaSource, now: Instant) {
        if self.is_terminal() {
            return;
        }
        if self.load_song(0, media, now) {
            self.try_autoplay(media, "Click play to start");
        }
    }

    /// Make the entry at `index` current. Out of bounds ends the playlist;
    /// an external entry shows a skip notice and schedules the next position
    /// after the skip delay. Returns whether a playable source was bound,
    /// the only case where a play attempt makes sense.
    pub fn load_song(&mut self, index: usize, media: &mut dyn MediaSource, now: Instant) -> bool {
        self.pending_skip = None;
        self.dirty = true;

        if index >= self.playlist.len() {
            self.state = PlaybackState::Ended;
            self.status = Status::neutral("End of playlist");
            return false;
        }

        let song = self.playlist[index].clone();
        if song.is_external {
            self.status = Status::error(format!("Skipping external link: {}", song.title));
            self.pending_skip = Some(PendingSkip {
                next_index: index + 1,
                due: now + self.skip_delay,
            });
            return false;
        }

        self.current_index = index;
        self.scrub = None;
        let locator = self.audio_path(&song);
        self.current = Some(song);

        if let Err(err) = media.load(&locator) {
            // flush whatever the engine queued before it failed, then record
            // the failure so a later poll cannot resurrect a stale state
            for event in media.poll_events() {
                self.apply_event(event);
            }
            self.apply_event(MediaEvent::LoadFailed(format!("{err:#}")));
            media.clear_preload();
            return false;
        }
        media.clear_preload();
        true
    }

    /// Advance to the entry after the current one. Idempotent once past the
    /// end: the index never moves again and the status stays "End of
    /// playlist".
    pub fn play_next(&mut self, media: &mut dyn MediaSource, now: Instant) {
        if self.load_song(self.current_index + 1, media, now) {
            self.try_autoplay(media, "Click play to continue");
        }
    }

    /// Explicit user selection of a playlist entry. External entries are not
    /// selectable; any pending preload is invalidated immediately.
    pub fn select_song(&mut self, index: usize, media: &mut dyn MediaSource, now: Instant) {
        if self
            .playlist
            .get(index)
            .is_none_or(|song| song.is_external)
        {
            return;
        }
        media.clear_preload();
        if self.load_song(index, media, now) {
            self.try_autoplay(media, "Click play to continue");
        }
    }

    pub fn toggle_play_pause(&mut self, media: &mut dyn MediaSource) {
        if self.current.is_none() {
            return;
        }
        if media.is_paused() {
            if media.start().is_err() {
                self.status = Status::neutral("Click play to start");
                self.dirty = true;
            }
        } else {
            media.pause();
        }
    }

    /// One pass of the cooperative loop: fire a due skip, run the preload
    /// policy, then mirror media events in delivery order.
    pub fn tick(&mut self, media: &mut dyn MediaSource, now: Instant) {
        if let Some(skip) = self.pending_skip
            && now >= skip.due
        {
            self.pending_skip = None;
            if self.load_song(skip.next_index, media, now) {
                self.try_autoplay(media, "Click play to continue");
            }
        }

        self.maybe_preload(media);

        for event in media.poll_events() {
            self.handle_media_event(event, media, now);
        }
    }

    pub fn handle_media_event(
        &mut self,
        event: MediaEvent,
        media: &mut dyn MediaSource,
        now: Instant,
    ) {
        let ended = event == MediaEvent::Ended;
        self.apply_event(event);
        if ended {
            self.play_next(media, now);
        }
    }

    fn apply_event(&mut self, event: MediaEvent) {
        match event {
            MediaEvent::LoadStarted => {
                self.state = PlaybackState::Loading;
                self.status = Status::new("Loading audio...", Severity::Loading);
            }
            MediaEvent::CanPlay => {
                self.state = PlaybackState::Ready;
                self.status = Status::neutral("Ready to play");
            }
            MediaEvent::Playing => {
                self.state = PlaybackState::Playing;
                self.status = Status::new("Now playing", Severity::Playing);
            }
            MediaEvent::Paused => {
                self.state = PlaybackState::Paused;
                self.status = Status::neutral("Paused");
            }
            MediaEvent::Ended => {
                self.state = PlaybackState::Ended;
                self.status = Status::neutral("Song ended");
            }
            MediaEvent::LoadFailed(_) => {
                self.state = PlaybackState::Error;
                self.status = Status::error("Error loading audio");
            }
        }
        self.dirty = true;
    }

    fn try_autoplay(&mut self, media: &mut dyn MediaSource, prompt: &str) {
        if self.current.is_none() || self.pending_skip.is_some() {
            return;
        }
        if media.start().is_err() {
            self.status = Status::neutral(prompt);
            self.dirty = true;
        }
    }

    fn maybe_preload(&mut self, media: &mut dyn MediaSource) {
        if self.current.is_none() || media.preloaded().is_some() {
            return;
        }
        let (Some(duration), Some(position)) = (media.duration(), media.position()) else {
            return;
        };
        if duration.saturating_sub(position) > PRELOAD_WINDOW {
            return;
        }
        if let NextUp::Song(_, song) = playlist::find_next_playable(&self.playlist, self.current_index)
        {
            let locator = self.audio_path(song);
            media.preload(&locator);
        }
    }

    /// Resolve a catalog locator against the site root. Non-file locators are
    /// passed through and surface as the ordinary media load error.
    fn audio_path(&self, song: &Song) -> PathBuf {
        if song.audio_url.contains("://") {
            return PathBuf::from(&song.audio_url);
        }
        self.site_root.join(&song.audio_url)
    }

    /// Next-up indicator text for the current position.
    pub fn next_up_label(&self) -> Option<String> {
        self.current.as_ref()?;
        match playlist::find_next_playable(&self.playlist, self.current_index) {
            NextUp::Song(_, song) => Some(format!("Next: {}", song.title)),
            NextUp::LastSong => Some(String::from("Last song in playlist")),
        }
    }

    pub fn is_scrubbing(&self) -> bool {
        self.scrub.is_some()
    }

    /// Move the scrub position by a fraction of the track, starting from the
    /// real position on the first nudge. The media position is untouched
    /// until commit.
    pub fn scrub_by(&mut self, delta: f64, media: &dyn MediaSource) {
        let base = match self.scrub {
            Some(fraction) => fraction,
            None => self.playback_fraction(media).unwrap_or(0.0),
        };
        self.scrub = Some((base + delta).clamp(0.0, 1.0));
        self.dirty = true;
    }

    /// Seek to the scrubbed position and clear the drag state.
    pub fn commit_scrub(&mut self, media: &mut dyn MediaSource) {
        let Some(fraction) = self.scrub.take() else {
            return;
        };
        self.dirty = true;
        let Some(duration) = media.duration() else {
            return;
        };
        if media.seek_to(duration.mul_f64(fraction)).is_err() {
            self.status = Status::error("Could not seek");
        }
    }

    pub fn cancel_scrub(&mut self) {
        if self.scrub.take().is_some() {
            self.dirty = true;
        }
    }

    /// Time shown to the user: the drag position while scrubbing, otherwise
    /// the media's real position.
    pub fn displayed_position(&self, media: &dyn MediaSource) -> Option<Duration> {
        if let (Some(fraction), Some(duration)) = (self.scrub, media.duration()) {
            return Some(duration.mul_f64(fraction));
        }
        media.position()
    }

    pub fn displayed_fraction(&self, media: &dyn MediaSource) -> f64 {
        self.scrub
            .or_else(|| self.playback_fraction(media))
            .unwrap_or(0.0)
    }

    fn playback_fraction(&self, media: &dyn MediaSource) -> Option<f64> {
        let duration = media.duration()?;
        if duration.is_zero() {
            return None;
        }
        let position = media.position()?;
        Some((position.as_secs_f64() / duration.as_secs_f64()).clamp(0.0, 1.0))
    }

    pub fn share_request(&self) -> Option<ShareRequest> {
        self.current
            .as_ref()
            .map(|song| ShareRequest::for_song(&self.base_url, song))
    }

    pub fn playlist_share_url(&self) -> String {
        share::playlist_share_url(&self.base_url, &self.playlist)
    }

    /// Share the current song through the fallback chain and report the
    /// outcome in the status region. Cancellation is neutral.
    pub fn share_current(
        &mut self,
        native: Option<&mut dyn ShareTarget>,
        clipboard: &mut dyn ShareTarget,
    ) {
        let Some(request) = self.share_request() else {
            return;
        };
        self.status = match share::share_song(&request, native, clipboard) {
            ShareOutcome::SharedNatively => Status::new("Shared successfully!", Severity::Playing),
            ShareOutcome::CopiedToClipboard => {
                Status::new("Link copied to clipboard!", Severity::Playing)
            }
            ShareOutcome::Cancelled => Status::neutral("Share cancelled"),
            ShareOutcome::Unsupported => Status::error("Sharing not supported"),
        };
        self.dirty = true;
    }
}
