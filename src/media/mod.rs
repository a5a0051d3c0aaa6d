use anyhow::{Context, Result};
use rodio::Source;
use rodio::cpal::traits::{DeviceTrait, HostTrait};
use rodio::{Decoder, OutputStream, OutputStreamBuilder, Sink};
#[cfg(unix)]
use std::ffi::CString;
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::time::Duration;
use std::time::Instant;

/// Events the media layer reports back, in delivery order. These are the
/// media-element callbacks of the player page; the controller mirrors them
/// into status text and the play/pause affordance without reordering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaEvent {
    LoadStarted,
    CanPlay,
    Playing,
    Paused,
    Ended,
    LoadFailed(String),
}

/// The single media element of the player page. At most one preload handle
/// exists at a time; preloading is a hint with no correctness dependency.
pub trait MediaSource {
    /// Bind a new source and begin loading it, paused.
    fn load(&mut self, locator: &Path) -> Result<()>;
    /// Begin or resume playback. May be refused (the autoplay-blocked case).
    fn start(&mut self) -> Result<()>;
    fn pause(&mut self);
    fn stop(&mut self);
    fn is_paused(&self) -> bool;
    fn position(&self) -> Option<Duration>;
    fn duration(&self) -> Option<Duration>;
    fn seek_to(&mut self, position: Duration) -> Result<()>;
    /// Fire-and-forget preload hint for an upcoming source.
    fn preload(&mut self, locator: &Path);
    fn clear_preload(&mut self);
    fn preloaded(&self) -> Option<&Path>;
    /// Drain pending events in the order the engine produced them.
    fn poll_events(&mut self) -> Vec<MediaEvent>;
}

/// Byte buffer for the single preload handle. A failed read leaves a marker
/// so the same missing file is not re-read on every tick of the
/// approach-to-end window.
#[derive(Default)]
struct PreloadCache {
    slot: Option<(PathBuf, Vec<u8>)>,
    attempted: Option<PathBuf>,
}

impl PreloadCache {
    fn request(&mut self, locator: &Path) {
        if self.slot.is_some() || self.attempted.as_deref() == Some(locator) {
            return;
        }
        self.attempted = Some(locator.to_path_buf());
        if let Ok(bytes) = fs::read(locator) {
            self.slot = Some((locator.to_path_buf(), bytes));
        }
    }

    fn take(&mut self, locator: &Path) -> Option<Vec<u8>> {
        if self.slot.as_ref().is_some_and(|(path, _)| path == locator)
            && let Some((_, bytes)) = self.slot.take()
        {
            self.attempted = None;
            return Some(bytes);
        }
        None
    }

    fn clear(&mut self) {
        self.slot = None;
        self.attempted = None;
    }

    fn path(&self) -> Option<&Path> {
        self.slot.as_ref().map(|(path, _)| path.as_path())
    }
}

pub struct RodioMedia {
    stream: OutputStream,
    sink: Sink,
    current: Option<PathBuf>,
    track_duration: Option<Duration>,
    preload: PreloadCache,
    events: Vec<MediaEvent>,
    ended_reported: bool,
}

impl RodioMedia {
    pub fn new() -> Result<Self> {
        let (stream, sink) = Self::open_output_stream()?;
        Ok(Self {
            stream,
            sink,
            current: None,
            track_duration: None,
            preload: PreloadCache::default(),
            events: Vec::new(),
            ended_reported: false,
        })
    }

    fn open_output_stream() -> Result<(OutputStream, Sink)> {
        let mut stream = with_silenced_stderr(|| {
            match OutputStreamBuilder::from_default_device()
                .context("failed to open default system output stream")
                .and_then(|builder| {
                    builder
                        .with_error_callback(|_| {})
                        .open_stream_or_fallback()
                        .context("failed to start default output stream")
                }) {
                Ok(stream) => Ok(stream),
                Err(default_err) => {
                    let host = rodio::cpal::default_host();
                    let mut candidates: Vec<String> = host
                        .output_devices()
                        .ok()
                        .into_iter()
                        .flatten()
                        .filter_map(|device| device.name().ok())
                        .collect();
                    candidates.sort_by_cached_key(|name| name.to_ascii_lowercase());
                    candidates.dedup();

                    let mut started: Option<OutputStream> = None;
                    for candidate in candidates {
                        let device = match host
                            .output_devices()
                            .ok()
                            .into_iter()
                            .flatten()
                            .find(|entry| entry.name().ok().as_deref() == Some(candidate.as_str()))
                        {
                            Some(device) => device,
                            None => continue,
                        };
                        let opened = OutputStreamBuilder::from_device(device)
                            .context("failed to open fallback output device")
                            .and_then(|builder| {
                                builder
                                    .with_error_callback(|_| {})
                                    .open_stream_or_fallback()
                                    .context("failed to start fallback output stream")
                            });
                        if let Ok(stream) = opened {
                            started = Some(stream);
                            break;
                        }
                    }

                    started.with_context(|| {
                        format!(
                            "unable to start any audio output stream after default failed: {default_err:#}"
                        )
                    })
                }
            }
        })?;
        stream.log_on_drop(false);
        let sink = Sink::connect_new(stream.mixer());
        Ok((stream, sink))
    }

    fn take_bytes(&mut self, locator: &Path) -> Result<Vec<u8>> {
        if let Some(bytes) = self.preload.take(locator) {
            return Ok(bytes);
        }
        fs::read(locator).with_context(|| format!("failed to open media {}", locator.display()))
    }
}

impl MediaSource for RodioMedia {
    fn load(&mut self, locator: &Path) -> Result<()> {
        self.events.push(MediaEvent::LoadStarted);
        self.sink.stop();
        self.sink = Sink::connect_new(self.stream.mixer());
        self.current = None;
        self.track_duration = None;
        self.ended_reported = false;

        let bytes = self.take_bytes(locator)?;
        let source = Decoder::new(Cursor::new(bytes))
            .with_context(|| format!("failed to decode {}", locator.display()))?;
        self.track_duration = source.total_duration();
        self.sink.append(source);
        self.sink.pause();
        self.current = Some(locator.to_path_buf());
        self.events.push(MediaEvent::CanPlay);
        Ok(())
    }

    fn start(&mut self) -> Result<()> {
        if self.current.is_none() {
            return Err(anyhow::anyhow!("no media source bound"));
        }
        self.sink.play();
        self.events.push(MediaEvent::Playing);
        Ok(())
    }

    fn pause(&mut self) {
        if self.current.is_some() && !self.sink.is_paused() {
            self.sink.pause();
            self.events.push(MediaEvent::Paused);
        }
    }

    fn stop(&mut self) {
        self.sink.stop();
        self.current = None;
        self.track_duration = None;
        self.ended_reported = false;
    }

    fn is_paused(&self) -> bool {
        self.sink.is_paused()
    }

    fn position(&self) -> Option<Duration> {
        self.current.as_ref()?;
        Some(self.sink.get_pos())
    }

    fn duration(&self) -> Option<Duration> {
        self.track_duration
    }

    fn seek_to(&mut self, position: Duration) -> Result<()> {
        if self.current.is_none() {
            return Err(anyhow::anyhow!("no media source bound"));
        }
        self.sink
            .try_seek(position)
            .map_err(|err| anyhow::anyhow!("failed to seek current media: {err:?}"))?;
        Ok(())
    }

    fn preload(&mut self, locator: &Path) {
        self.preload.request(locator);
    }

    fn clear_preload(&mut self) {
        self.preload.clear();
    }

    fn preloaded(&self) -> Option<&Path> {
        self.preload.path()
    }

    fn poll_events(&mut self) -> Vec<MediaEvent> {
        if self.current.is_some()
            && !self.sink.is_paused()
            && self.sink.empty()
            && !self.ended_reported
        {
            self.events.push(MediaEvent::Ended);
            self.ended_reported = true;
        }
        std::mem::take(&mut self.events)
    }
}

#[cfg(unix)]
fn with_silenced_stderr<T>(operation: impl FnOnce() -> T) -> T {
    let saved = unsafe { libc::dup(libc::STDERR_FILENO) };
    if saved < 0 {
        return operation();
    }

    let devnull = CString::new("/dev/null")
        .ok()
        .map(|path| unsafe { libc::open(path.as_ptr(), libc::O_WRONLY) })
        .unwrap_or(-1);

    if devnull >= 0 {
        unsafe {
            libc::dup2(devnull, libc::STDERR_FILENO);
            libc::close(devnull);
        }
    }

    let result = operation();

    unsafe {
        libc::dup2(saved, libc::STDERR_FILENO);
        libc::close(saved);
    }

    result
}

#[cfg(not(unix))]
fn with_silenced_stderr<T>(operation: impl FnOnce() -> T) -> T {
    operation()
}

/// Headless engine used when no audio device is available and in tests.
/// Keeps a logical playback clock so the session's time-driven behavior
/// (preload window, auto-advance) still runs.
pub struct NullMedia {
    paused: bool,
    current: Option<PathBuf>,
    started_at: Option<Instant>,
    position_offset: Duration,
    track_duration: Option<Duration>,
    assumed_duration: Option<Duration>,
    preload: Option<PathBuf>,
    events: Vec<MediaEvent>,
    block_start: bool,
    ended_reported: bool,
}

impl NullMedia {
    pub fn new() -> Self {
        Self {
            paused: true,
            current: None,
            started_at: None,
            position_offset: Duration::ZERO,
            track_duration: None,
            assumed_duration: None,
            preload: None,
            events: Vec::new(),
            block_start: false,
            ended_reported: false,
        }
    }

    /// Pretend every loaded source has this duration. Lets tests exercise the
    /// end-of-track path without real audio files.
    pub fn with_assumed_duration(duration: Duration) -> Self {
        Self {
            assumed_duration: Some(duration),
            ..Self::new()
        }
    }

    /// Refuse `start` until allowed, imitating an autoplay policy block.
    pub fn set_block_start(&mut self, blocked: bool) {
        self.block_start = blocked;
    }

    fn current_position(&self) -> Duration {
        let mut position = self.position_offset;
        if !self.paused
            && self.current.is_some()
            && let Some(started_at) = self.started_at
        {
            position = position.saturating_add(started_at.elapsed());
        }
        if let Some(duration) = self.track_duration {
            return position.min(duration);
        }
        position
    }
}

impl Default for NullMedia {
    fn default() -> Self {
        Self::new()
    }
}

impl MediaSource for NullMedia {
    fn load(&mut self, locator: &Path) -> Result<()> {
        self.events.push(MediaEvent::LoadStarted);
        self.paused = true;
        self.current = Some(locator.to_path_buf());
        self.started_at = None;
        self.position_offset = Duration::ZERO;
        self.track_duration = self.assumed_duration;
        self.ended_reported = false;
        self.events.push(MediaEvent::CanPlay);
        Ok(())
    }

    fn start(&mut self) -> Result<()> {
        if self.block_start {
            return Err(anyhow::anyhow!("playback start refused"));
        }
        if self.current.is_none() {
            return Err(anyhow::anyhow!("no media source bound"));
        }
        self.paused = false;
        self.started_at = Some(Instant::now());
        self.events.push(MediaEvent::Playing);
        Ok(())
    }

    fn pause(&mut self) {
        if self.current.is_some() && !self.paused {
            self.position_offset = self.current_position();
            self.started_at = None;
            self.paused = true;
            self.events.push(MediaEvent::Paused);
        }
    }

    fn stop(&mut self) {
        self.current = None;
        self.paused = true;
        self.started_at = None;
        self.position_offset = Duration::ZERO;
        self.track_duration = None;
        self.ended_reported = false;
    }

    fn is_paused(&self) -> bool {
        self.paused
    }

    fn position(&self) -> Option<Duration> {
        self.current.as_ref()?;
        Some(self.current_position())
    }

    fn duration(&self) -> Option<Duration> {
        self.track_duration
    }

    fn seek_to(&mut self, position: Duration) -> Result<()> {
        if self.current.is_none() {
            return Err(anyhow::anyhow!("no media source bound"));
        }
        self.position_offset = self
            .track_duration
            .map_or(position, |duration| position.min(duration));
        self.started_at = if self.paused {
            None
        } else {
            Some(Instant::now())
        };
        Ok(())
    }

    fn preload(&mut self, locator: &Path) {
        if self.preload.is_none() {
            self.preload = Some(locator.to_path_buf());
        }
    }

    fn clear_preload(&mut self) {
        self.preload = None;
    }

    fn preloaded(&self) -> Option<&Path> {
        self.preload.as_deref()
    }

    fn poll_events(&mut self) -> Vec<MediaEvent> {
        if let Some(duration) = self.track_duration
            && self.current.is_some()
            && !self.paused
            && !self.ended_reported
            && self.current_position() >= duration
        {
            self.events.push(MediaEvent::Ended);
            self.ended_reported = true;
        }
        std::mem::take(&mut self.events)
    }
}

#[cfg(test)]
mod tests {
    use super::{MediaEvent, MediaSource, NullMedia, PreloadCache};
    use std::fs;
    use std::path::Path;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn null_media_reports_load_events_in_order() {
        let mut media = NullMedia::new();
        media.load(Path::new("a.mp3")).expect("load");
        assert_eq!(
            media.poll_events(),
            vec![MediaEvent::LoadStarted, MediaEvent::CanPlay]
        );
    }

    #[test]
    fn null_media_position_advances_while_playing() {
        let mut media = NullMedia::new();
        media.load(Path::new("a.mp3")).expect("load");
        media.start().expect("start");
        let before = media.position().expect("position");
        thread::sleep(Duration::from_millis(20));
        let after = media.position().expect("position");
        assert!(after > before, "position should advance while playing");
    }

    #[test]
    fn null_media_position_freezes_while_paused() {
        let mut media = NullMedia::new();
        media.load(Path::new("a.mp3")).expect("load");
        media.start().expect("start");
        thread::sleep(Duration::from_millis(20));

        media.pause();
        let paused = media.position().expect("position");
        thread::sleep(Duration::from_millis(20));
        assert_eq!(media.position().expect("position"), paused);
    }

    #[test]
    fn null_media_ends_after_assumed_duration() {
        let mut media = NullMedia::with_assumed_duration(Duration::from_millis(15));
        media.load(Path::new("a.mp3")).expect("load");
        media.start().expect("start");
        media.poll_events();

        thread::sleep(Duration::from_millis(40));
        let events = media.poll_events();
        assert_eq!(events, vec![MediaEvent::Ended]);
        // ended fires once per binding
        assert!(media.poll_events().is_empty());
    }

    #[test]
    fn blocked_start_is_refused_without_state_change() {
        let mut media = NullMedia::new();
        media.load(Path::new("a.mp3")).expect("load");
        media.set_block_start(true);
        assert!(media.start().is_err());
        assert!(media.is_paused());
    }

    #[test]
    fn preload_handle_is_single_and_clearable() {
        let mut media = NullMedia::new();
        media.preload(Path::new("next.mp3"));
        media.preload(Path::new("other.mp3"));
        assert_eq!(media.preloaded(), Some(Path::new("next.mp3")));

        media.clear_preload();
        assert_eq!(media.preloaded(), None);
    }

    #[test]
    fn preload_cache_serves_buffered_bytes_once() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("next.mp3");
        fs::write(&path, b"bytes").expect("write");

        let mut cache = PreloadCache::default();
        cache.request(&path);
        assert_eq!(cache.path(), Some(path.as_path()));

        assert_eq!(cache.take(&path).as_deref(), Some(b"bytes".as_slice()));
        assert_eq!(cache.path(), None);

        // consuming releases the slot for the next window
        cache.request(&path);
        assert_eq!(cache.path(), Some(path.as_path()));
    }

    #[test]
    fn preload_cache_ignores_mismatched_take() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("next.mp3");
        fs::write(&path, b"bytes").expect("write");

        let mut cache = PreloadCache::default();
        cache.request(&path);
        assert_eq!(cache.take(Path::new("other.mp3")), None);
        assert_eq!(cache.path(), Some(path.as_path()));
    }

    #[test]
    fn failed_preload_read_is_not_retried_until_cleared() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("missing.mp3");

        let mut cache = PreloadCache::default();
        cache.request(&path);
        assert_eq!(cache.path(), None);

        // the file appearing later changes nothing while the marker holds
        fs::write(&path, b"bytes").expect("write");
        cache.request(&path);
        assert_eq!(cache.path(), None);

        cache.clear();
        cache.request(&path);
        assert_eq!(cache.path(), Some(path.as_path()));
    }

    #[test]
    fn seek_moves_logical_position() {
        let mut media = NullMedia::new();
        media.load(Path::new("a.mp3")).expect("load");
        media.seek_to(Duration::from_secs(30)).expect("seek");
        assert_eq!(media.position(), Some(Duration::from_secs(30)));
    }
}
