use std::{fs, path::Path};

use pretty_assertions::assert_eq;
use songchart::prelude::*;

const LYRICS: &str = r"[Script Info]
Title: Song
ScriptType: v4.00+

[V4+ Styles]
Format: Name, Fontname, Fontsize, PrimaryColour, SecondaryColour, OutlineColour, BackColour, Bold, Italic, Underline, StrikeOut, ScaleX, ScaleY, Spacing, Angle, BorderStyle, Outline, Shadow, Alignment, MarginL, MarginR, MarginV, Encoding
Style: Default,Arial,24,&H00FFFFFF,&H000088EF,&H00000000,&H00666666,-1,0,0,0,100,100,0,0,1,3,0,8,10,10,10,1

[Events]
Format: Layer, Start, End, Style, Name, MarginL, MarginR, MarginV, Effect, Text
Comment: 0,0:00:00.00,0:00:05.00,Default,,0,0,0,template pre-line,{\k50}
Dialogue: 0,0:00:01.00,0:00:02.00,Default,,0,0,0,,{\k50}Hel{\k50}lo
Dialogue: 0,0:00:03.00,0:00:04.00,Duet,,0,0,0,,{\kf100}World
";

const KARA: &str = r#"{
  "medias": [{ "filename": "video.mp4", "size": 1234 }],
  "data": {
    "titles": { "jpn": "Uta", "eng": "Song" },
    "titles_default_language": "eng",
    "tags": {
      "singergroups": ["ffffffff-0000-0000-0000-000000000000"],
      "singers": ["aaaaaaaa-1111-1111-1111-111111111111"],
      "series": ["bbbbbbbb-2222-2222-2222-222222222222"],
      "langs": ["cccccccc-3333-3333-3333-333333333333"],
      "authors": ["dddddddd-4444-4444-4444-444444444444"],
      "versions": ["eeeeeeee-5555-5555-5555-555555555555"]
    },
    "year": 2020
  }
}"#;

const TAGS: &[(&str, &str, &str)] = &[
    (
        "tags",
        "Aimer.aaaaaaaa-1111.tag.json",
        r#"{ "tag": { "name": "Aimer", "i18n": { "eng": "Aimer (EN)", "jpn": "エメ" } } }"#,
    ),
    (
        "tags",
        "Anime.bbbbbbbb-2222.tag.json",
        r#"{ "tag": { "name": "Anime X", "i18n": {} } }"#,
    ),
    (
        "language-tags",
        "jpn.cccccccc-3333.tag.json",
        r#"{ "tag": { "name": "jpn", "i18n": { "eng": "Japanese" } } }"#,
    ),
    (
        "tags",
        "Karaoker.dddddddd-4444.tag.json",
        r#"{ "tag": { "name": "Karaoker" } }"#,
    ),
    (
        "system-tags",
        "Full.eeeeeeee-5555.tag.json",
        r#"{ "tag": { "name": "Full" } }"#,
    ),
];

fn approx(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-9,
        "{actual} is not {expected}"
    );
}

fn karaoke_base(kara: &str, with_media: bool) -> tempfile::TempDir {
    let base = tempfile::tempdir().unwrap();
    let write = |dir: &str, name: &str, content: &[u8]| {
        let dir = base.path().join(dir);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(name), content).unwrap();
    };
    write("lyrics", "song.ass", LYRICS.as_bytes());
    write("karaokes", "song.kara.json", kara.as_bytes());
    for &(dir, name, content) in TAGS {
        write(dir, name, content.as_bytes());
    }
    if with_media {
        write("medias", "video.mp4", b"");
    }
    base
}

fn chart(base: &Path) -> std::path::PathBuf {
    base.join("lyrics").join("song.ass")
}

#[test]
fn metadata_from_sidecar_and_tags() {
    let base = karaoke_base(KARA, true);
    let mut parser = SongParser::new(chart(base.path()), default_config());
    let warnings = parser.load_header().unwrap();
    let song = parser.song();

    assert_eq!(song.load_status, LoadStatus::Header);
    assert_eq!(song.dialect, Some(Dialect::Ass));
    assert_eq!(song.title, "Song (Full Size)");
    assert_eq!(song.artist, "Aimer (EN)");
    assert_eq!(song.language, "Japanese");
    assert_eq!(song.creator, "Karaoker");
    assert_eq!(song.tags, "Anime X");
    assert_eq!(song.year, Some(2020));
    assert_eq!(song.provided_by, "Kara.Moe");
    let media = base.path().join("medias").join("video.mp4");
    assert_eq!(song.video.as_ref(), Some(&media));
    assert_eq!(song.music.get(&StemRole::Background), Some(&media));
    assert!(
        !warnings
            .iter()
            .any(|warning| matches!(warning, LoadWarning::Chart(ChartWarning::TagNotFound(_))))
    );
}

#[test]
fn singer_wins_over_group() {
    let base = karaoke_base(KARA, true);
    fs::write(
        base.path().join("tags").join("Band.ffffffff-0000.tag.json"),
        r#"{ "tag": { "name": "The Band", "i18n": {} } }"#,
    )
    .unwrap();
    let mut parser = SongParser::new(chart(base.path()), default_config());
    let warnings = parser.load_header().unwrap();
    assert_eq!(parser.song().artist, "Aimer (EN)");
    assert!(
        !warnings
            .iter()
            .any(|warning| matches!(warning, LoadWarning::Chart(ChartWarning::TagNotFound(_))))
    );
}

#[test]
fn group_when_no_singer_resolves() {
    let kara = KARA.replace(
        "aaaaaaaa-1111-1111-1111-111111111111",
        "99999999-0000-0000-0000-000000000000",
    );
    let base = karaoke_base(&kara, true);
    fs::write(
        base.path().join("tags").join("Band.ffffffff-0000.tag.json"),
        r#"{ "tag": { "name": "The Band", "i18n": {} } }"#,
    )
    .unwrap();
    let mut parser = SongParser::new(chart(base.path()), default_config());
    let warnings = parser.load_header().unwrap();
    assert_eq!(parser.song().artist, "The Band");
    assert!(warnings.contains(&LoadWarning::Chart(ChartWarning::TagNotFound(
        "99999999-0000-0000-0000-000000000000".to_string()
    ))));
}

#[test]
fn styles_become_duet_tracks() {
    let base = karaoke_base(KARA, true);
    let LoadOutput { song, warnings } = load_song(chart(base.path()), default_config()).unwrap();
    assert_eq!(song.load_status, LoadStatus::Full);

    let lead = &song.vocal_tracks[track_name::LEAD];
    assert_eq!(lead.singer.as_deref(), Some("Default"));
    let spans: Vec<(&str, NoteType)> = lead
        .notes
        .iter()
        .map(|note| (note.syllable.as_str(), note.note_type))
        .collect();
    assert_eq!(
        spans,
        vec![
            ("Hel", NoteType::Normal),
            ("lo", NoteType::Normal),
            ("", NoteType::Sleep),
        ]
    );
    approx(lead.notes[0].begin, 1.0);
    approx(lead.notes[0].end, 1.49);
    approx(lead.notes[1].begin, 1.5);
    approx(lead.notes[2].begin, 2.0);

    let second = &song.vocal_tracks[track_name::DUET_SECOND];
    assert_eq!(second.singer.as_deref(), Some("Duet"));
    approx(second.notes[0].begin, 3.0);
    approx(second.notes[0].end, 3.99);

    assert_eq!(song.vocal_tracks[track_name::TOGETHER].notes.len(), 5);
    assert!(
        !warnings
            .iter()
            .any(|warning| matches!(warning, LoadWarning::Source(_)))
    );
}

#[test]
fn missing_media_fails_the_song() {
    let base = karaoke_base(KARA, false);
    fs::write(base.path().join("lyrics").join("stray.mp4"), b"").unwrap();
    fs::write(base.path().join("lyrics").join("stray.mp3"), b"").unwrap();
    let LoadOutput { song, warnings } = load_song(chart(base.path()), default_config()).unwrap();
    assert_eq!(song.load_status, LoadStatus::Error);
    let media = base.path().join("medias").join("video.mp4");
    assert!(warnings.contains(&LoadWarning::Chart(ChartWarning::ResourceMissing(
        media.clone()
    ))));
    assert_eq!(song.video.as_ref(), Some(&media));
    assert_eq!(song.music.get(&StemRole::Background), Some(&media));
}

#[test]
fn sidecar_without_data() {
    let base = karaoke_base(r#"{ "medias": [] }"#, true);
    let err = load_song(chart(base.path()), default_config()).unwrap_err();
    assert!(matches!(err.kind, ChartError::Metadata { .. }));
}

#[test]
fn tag_index_over_base() {
    let base = karaoke_base(KARA, true);
    let index = songchart::parse::ass::TagIndex::build(base.path());
    assert_eq!(index.len(), 5);
    assert_eq!(
        index.path("cccccccc-3333-3333-3333-333333333333"),
        Some(
            base.path()
                .join("language-tags")
                .join("jpn.cccccccc-3333.tag.json")
                .as_path()
        )
    );
    assert_eq!(index.path("ffffffff"), None);
}
