#![no_main]

use libfuzzer_sys::fuzz_target;
use songdeck::media::{MediaSource, NullMedia};
use songdeck::model::{Catalog, SelectionRequest, Song};
use songdeck::player::PlayerSession;
use std::path::PathBuf;
use std::time::{Duration, Instant};

fuzz_target!(|data: &[u8]| {
    let len = (data.len() % 16).max(1);
    let files: Vec<Song> = (0..len)
        .map(|idx| Song {
            song_id: format!("s{idx}"),
            title: format!("Song {idx}"),
            artist: String::from("artist"),
            audio_url: format!("audio/s{idx}.mp3"),
            album_art_url: None,
            html_filename: format!("s{idx}.html"),
            is_external: idx % 3 == 1,
        })
        .collect();
    let catalog = Catalog { files };
    let ids: Vec<String> = catalog
        .files
        .iter()
        .map(|song| song.song_id.clone())
        .collect();

    let mut media = NullMedia::new();
    let mut session = PlayerSession::new(
        &catalog,
        &SelectionRequest::Ids(ids),
        PathBuf::from("site"),
        String::from("https://host/site"),
    );
    let now = Instant::now();
    session.begin(&mut media, now);

    for (step, byte) in data.iter().enumerate() {
        let later = now + Duration::from_secs(step as u64 + 2);
        match byte % 7 {
            0 => session.play_next(&mut media, later),
            1 => session.select_song((*byte as usize) % (len + 1), &mut media, later),
            2 => session.toggle_play_pause(&mut media),
            3 => session.scrub_by(f64::from(*byte) / 255.0 - 0.5, &media),
            4 => session.commit_scrub(&mut media),
            5 => session.cancel_scrub(),
            _ => session.tick(&mut media, later),
        }
        assert!(session.current_index < session.playlist.len());
        let _ = session.next_up_label();
    }
});
