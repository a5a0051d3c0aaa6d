use songdeck::catalog;
use songdeck::media::{MediaSource, NullMedia};
use songdeck::model::SelectionRequest;
use songdeck::player::PlayerSession;
use songdeck::playlist::{self, NextUp};
use std::io::Write;
use std::path::PathBuf;
use std::time::{Duration, Instant};

const CATALOG_JSON: &str = r#"{
  "files": [
    {
      "song_id": "a",
      "title": "Alpha",
      "artist": "Karn",
      "audio_url": "audio/a.mp3",
      "html_filename": "alpha.html"
    },
    {
      "song_id": "b",
      "title": "Bravo Link",
      "artist": "Karn",
      "audio_url": "https://elsewhere.example/b",
      "html_filename": "bravo.html",
      "is_external": true
    },
    {
      "song_id": "c",
      "title": "Charlie",
      "artist": "Lada",
      "audio_url": "audio/c.mp3",
      "html_filename": "charlie.html"
    }
  ]
}"#;

fn write_catalog() -> (tempfile::TempDir, PathBuf) {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("catalog.json");
    let mut file = std::fs::File::create(&path).expect("create catalog");
    file.write_all(CATALOG_JSON.as_bytes()).expect("write catalog");
    (dir, path)
}

fn drive(session: &mut PlayerSession, media: &mut NullMedia, now: Instant) {
    for event in media.poll_events() {
        session.handle_media_event(event, media, now);
    }
}

#[test]
fn ordered_playlist_skips_the_external_entry() {
    let (dir, path) = write_catalog();
    let catalog = catalog::load(&path).expect("load catalog");

    let request = playlist::request_from_params(Some("a,b,c"), None);
    assert_eq!(
        request,
        SelectionRequest::Ids(vec![
            String::from("a"),
            String::from("b"),
            String::from("c"),
        ])
    );

    let mut media = NullMedia::new();
    let mut session = PlayerSession::new(
        &catalog,
        &request,
        dir.path().to_path_buf(),
        String::from("https://host/site"),
    );
    assert_eq!(session.playlist.len(), 3);

    let now = Instant::now();
    session.begin(&mut media, now);
    drive(&mut session, &mut media, now);
    assert_eq!(
        session.current.as_ref().map(|song| song.song_id.as_str()),
        Some("a")
    );

    // the entry after the current one resolves past the external link
    match playlist::find_next_playable(&session.playlist, 0) {
        NextUp::Song(index, song) => {
            assert_eq!(index, 2);
            assert_eq!(song.song_id, "c");
        }
        NextUp::LastSong => panic!("expected a playable successor"),
    }

    session.play_next(&mut media, now);
    assert_eq!(session.status.text, "Skipping external link: Bravo Link");
    assert_eq!(
        session.current.as_ref().map(|song| song.song_id.as_str()),
        Some("a"),
        "current song unchanged while the skip is pending"
    );

    session.tick(&mut media, now + Duration::from_secs(2));
    drive(&mut session, &mut media, now);
    assert_eq!(
        session.current.as_ref().map(|song| song.song_id.as_str()),
        Some("c")
    );
    assert_eq!(session.current_index, 2);
}

#[test]
fn default_request_plays_the_first_song_alone() {
    let (dir, path) = write_catalog();
    let catalog = catalog::load(&path).expect("load catalog");

    let mut media = NullMedia::new();
    let mut session = PlayerSession::new(
        &catalog,
        &playlist::request_from_params(None, None),
        dir.path().to_path_buf(),
        String::from("https://host/site"),
    );
    assert_eq!(session.playlist.len(), 1);

    let now = Instant::now();
    session.begin(&mut media, now);
    drive(&mut session, &mut media, now);
    assert_eq!(
        session.current.as_ref().map(|song| song.song_id.as_str()),
        Some("a")
    );
    assert_eq!(
        session.next_up_label().as_deref(),
        Some("Last song in playlist")
    );

    // a single-song playlist ends rather than wrapping
    session.play_next(&mut media, now);
    assert_eq!(session.status.text, "End of playlist");
}

#[test]
fn numeric_identifier_selects_by_position() {
    let (dir, path) = write_catalog();
    let catalog = catalog::load(&path).expect("load catalog");

    let mut media = NullMedia::new();
    let mut session = PlayerSession::new(
        &catalog,
        &playlist::request_from_params(None, Some("3")),
        dir.path().to_path_buf(),
        String::from("https://host/site"),
    );

    let now = Instant::now();
    session.begin(&mut media, now);
    drive(&mut session, &mut media, now);
    assert_eq!(
        session.current.as_ref().map(|song| song.song_id.as_str()),
        Some("c")
    );
}

#[test]
fn track_end_advances_to_the_next_song() {
    let (dir, path) = write_catalog();
    let catalog = catalog::load(&path).expect("load catalog");

    let mut media = NullMedia::with_assumed_duration(Duration::from_millis(10));
    let mut session = PlayerSession::new(
        &catalog,
        &playlist::request_from_params(Some("a,c"), None),
        dir.path().to_path_buf(),
        String::from("https://host/site"),
    );

    let now = Instant::now();
    session.begin(&mut media, now);
    drive(&mut session, &mut media, now);

    std::thread::sleep(Duration::from_millis(30));
    session.tick(&mut media, Instant::now());
    assert_eq!(
        session.current.as_ref().map(|song| song.song_id.as_str()),
        Some("c")
    );
    assert!(
        !media.is_paused(),
        "the next track keeps playing without a user gesture"
    );

    drive(&mut session, &mut media, Instant::now());
    assert_eq!(session.status.text, "Now playing");
}

#[test]
fn share_urls_use_page_slugs_and_playlist_ids() {
    let (dir, path) = write_catalog();
    let catalog = catalog::load(&path).expect("load catalog");

    let mut media = NullMedia::new();
    let mut session = PlayerSession::new(
        &catalog,
        &playlist::request_from_params(Some("a,c"), None),
        dir.path().to_path_buf(),
        String::from("https://host/site/"),
    );
    session.begin(&mut media, Instant::now());

    let request = session.share_request().expect("share request");
    assert_eq!(request.url, "https://host/site/songs/alpha.html");
    assert_eq!(
        session.playlist_share_url(),
        "https://host/site/player.html?ids=a,c"
    );
}
