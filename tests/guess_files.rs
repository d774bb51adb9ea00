use std::{fs, path::PathBuf};

use pretty_assertions::assert_eq;
use songchart::prelude::*;

fn song_in(files: &[&str]) -> (tempfile::TempDir, Song) {
    let dir = tempfile::tempdir().unwrap();
    for name in files {
        fs::write(dir.path().join(name), b"").unwrap();
    }
    let song = Song::new(dir.path().join("song.txt"));
    (dir, song)
}

#[test]
fn single_audio_file_is_the_background() {
    let (dir, mut song) = song_in(&["song.txt", "song.mp3"]);
    let warnings = guess_files(&mut song);
    assert_eq!(
        song.music.get(&StemRole::Background),
        Some(&dir.path().join("song.mp3"))
    );
    assert_eq!(song.music.get(&StemRole::Preview), None);
    assert_eq!(song.cover, None);
    assert_eq!(
        warnings,
        vec![ResolveWarning::Autodetected(vec![(
            FileRole::Stem(StemRole::Background),
            dir.path().join("song.mp3"),
        )])]
    );
}

#[test]
fn preview_is_never_assigned() {
    let (dir, mut song) = song_in(&["preview.mp3", "track.ogg"]);
    guess_files(&mut song);
    assert_eq!(song.music.get(&StemRole::Preview), None);
    assert_eq!(
        song.music.get(&StemRole::Background),
        Some(&dir.path().join("track.ogg"))
    );
}

#[test]
fn named_images_win() {
    let (dir, mut song) = song_in(&["a.png", "bg.jpg", "Cover.PNG"]);
    guess_files(&mut song);
    assert_eq!(song.cover, Some(dir.path().join("Cover.PNG")));
    assert_eq!(song.background, Some(dir.path().join("bg.jpg")));
}

#[test]
fn preset_missing_file_is_replaced() {
    let (dir, mut song) = song_in(&["cover.jpg"]);
    song.cover = Some(dir.path().join("gone.png"));
    let warnings = guess_files(&mut song);
    assert_eq!(song.cover, Some(dir.path().join("cover.jpg")));
    assert!(
        !warnings
            .iter()
            .any(|warning| matches!(warning, ResolveWarning::NotFound(_)))
    );
}

#[test]
fn only_dangling_presets_are_reported() {
    let (dir, mut song) = song_in(&["song.txt", "song.mp3"]);
    song.video = Some(dir.path().join("clip.mp4"));
    song.music
        .insert(StemRole::Guitar, dir.path().join("guitar.ogg"));
    let warnings = guess_files(&mut song);
    assert_eq!(song.video, None);
    assert_eq!(song.music.get(&StemRole::Guitar), None);
    assert_eq!(
        warnings.first(),
        Some(&ResolveWarning::NotFound(vec![
            FileRole::Video,
            FileRole::Stem(StemRole::Guitar),
        ]))
    );
}

#[test]
fn karaoke_media_is_left_alone() {
    let (dir, mut song) = song_in(&["song.ass", "clip.mp4", "other.mp3", "cover.png"]);
    song.dialect = Some(Dialect::Ass);
    let media = dir.path().join("medias").join("video.mp4");
    song.video = Some(media.clone());
    song.music.insert(StemRole::Background, media.clone());
    let warnings = guess_files(&mut song);
    assert_eq!(song.video, Some(media.clone()));
    assert_eq!(song.music.get(&StemRole::Background), Some(&media));
    assert_eq!(song.cover, Some(dir.path().join("cover.png")));
    assert_eq!(
        warnings,
        vec![ResolveWarning::Autodetected(vec![(
            FileRole::Cover,
            dir.path().join("cover.png"),
        )])]
    );
}

#[test]
fn preset_file_is_not_reused() {
    let (dir, mut song) = song_in(&["cover.jpg", "photo.png"]);
    song.background = Some(dir.path().join("cover.jpg"));
    guess_files(&mut song);
    assert_eq!(song.background, Some(dir.path().join("cover.jpg")));
    assert_eq!(song.cover, Some(dir.path().join("photo.png")));
}

#[test]
fn stems_by_name() {
    let (dir, mut song) = song_in(&[
        "guitar.ogg",
        "drums_2.ogg",
        "vocals.ogg",
        "song.ogg",
        "notes.mid",
        "video.mp4",
    ]);
    guess_files(&mut song);
    let expected: Vec<(StemRole, PathBuf)> = [
        (StemRole::Background, "song.ogg"),
        (StemRole::Guitar, "guitar.ogg"),
        (StemRole::DrumsSnare, "drums_2.ogg"),
        (StemRole::VocalLead, "vocals.ogg"),
    ]
    .into_iter()
    .map(|(role, name)| (role, dir.path().join(name)))
    .collect();
    let actual: Vec<(StemRole, PathBuf)> = song.music.clone().into_iter().collect();
    assert_eq!(actual, expected);
    assert_eq!(song.midi_file, Some(dir.path().join("notes.mid")));
    assert_eq!(song.video, Some(dir.path().join("video.mp4")));
}

#[test]
fn unreadable_directory_is_empty() {
    let mut song = Song::new("/nonexistent/songs/A - B/song.txt");
    let warnings = guess_files(&mut song);
    assert_eq!(warnings, vec![]);
    assert!(song.music.is_empty());
}
