//! Guessing media files that a chart does not name.
//!
//! Each unresolved role is matched against the files of the song directory with a table of
//! patterns in priority order. A file is given to at most one role.

use std::{collections::BTreeSet, path::PathBuf};

use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};
use thiserror::Error;

use crate::model::{Dialect, Song, StemRole};

/// A media slot of a [`Song`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum FileRole {
    /// [`Song::cover`].
    Cover,
    /// [`Song::background`].
    Background,
    /// [`Song::video`].
    Video,
    /// [`Song::midi_file`].
    Midi,
    /// An entry of [`Song::music`].
    Stem(StemRole),
}

impl std::fmt::Display for FileRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cover => f.write_str("cover"),
            Self::Background => f.write_str("background"),
            Self::Video => f.write_str("video"),
            Self::Midi => f.write_str("MIDI"),
            Self::Stem(role) => write!(f, "{role:?}"),
        }
    }
}

/// Outcome of guessing files, reported once per song.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Hash, Error)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum ResolveWarning {
    /// Roles set to a file that does not exist, with no replacement found.
    #[error("not found: {}", describe_missing(.0))]
    NotFound(Vec<FileRole>),
    /// Roles filled from the directory listing.
    #[error("autodetected: {}", describe_found(.0))]
    Autodetected(Vec<(FileRole, PathBuf)>),
}

fn describe_missing(missing: &[FileRole]) -> String {
    missing.iter().join(", ")
}

fn describe_found(found: &[(FileRole, PathBuf)]) -> String {
    found
        .iter()
        .map(|(role, file)| format!("{role}={}", file.display()))
        .join(", ")
}

const IMAGE: &str = r"\.(png|jpeg|jpg|svg)$";
const AUDIO: &str = r"\.(mp3|m4a|ogg|opus|aac)$";

/// Role and file-name pattern pairs, in priority order.
pub const FILE_PATTERNS: &[(FileRole, &str)] = &[
    (FileRole::Cover, r"(cover|album|label|banner|bn|\[co\])\.(png|jpeg|jpg|svg)$"),
    (FileRole::Background, r"(background|bg|\[bg\])\.(png|jpeg|jpg|svg)$"),
    (FileRole::Cover, IMAGE),
    (FileRole::Background, IMAGE),
    (FileRole::Video, r"\.(avi|mpg|mpeg|flv|mov|mp4|mkv|m4v|webm)$"),
    (FileRole::Midi, r"^notes\.mid$"),
    (FileRole::Midi, r"\.mid$"),
    (FileRole::Stem(StemRole::Preview), r"^preview\.(mp3|m4a|ogg|opus|aac)$"),
    (FileRole::Stem(StemRole::Guitar), r"^guitar\.(mp3|m4a|ogg|opus|aac)$"),
    (FileRole::Stem(StemRole::Bass), r"^(bass|rhythm)\.(mp3|m4a|ogg|opus|aac)$"),
    (FileRole::Stem(StemRole::Drums), r"^drums(_1)?\.(mp3|m4a|ogg|opus|aac)$"),
    (FileRole::Stem(StemRole::DrumsSnare), r"^drums_2\.(mp3|m4a|ogg|opus|aac)$"),
    (FileRole::Stem(StemRole::DrumsCymbals), r"^drums_3\.(mp3|m4a|ogg|opus|aac)$"),
    (FileRole::Stem(StemRole::DrumsToms), r"^drums_4\.(mp3|m4a|ogg|opus|aac)$"),
    (FileRole::Stem(StemRole::Keyboard), r"^key(board|s)\.(mp3|m4a|ogg|opus|aac)$"),
    (FileRole::Stem(StemRole::GuitarCoop), r"^guitar_coop\.(mp3|m4a|ogg|opus|aac)$"),
    (FileRole::Stem(StemRole::GuitarRhythm), r"^guitar_rhythm\.(mp3|m4a|ogg|opus|aac)$"),
    (FileRole::Stem(StemRole::VocalLead), r"^vocals_1\.(mp3|m4a|ogg|opus|aac)$"),
    (FileRole::Stem(StemRole::VocalLead), r"^vocals\.(mp3|m4a|ogg|opus|aac)$"),
    (FileRole::Stem(StemRole::VocalBacking), r"^vocals_2\.(mp3|m4a|ogg|opus|aac)$"),
    (FileRole::Stem(StemRole::Background), r"^song(s)?\.(mp3|m4a|ogg|opus|aac)$"),
    (FileRole::Stem(StemRole::Background), AUDIO),
];

static COMPILED: Lazy<Vec<(FileRole, Regex)>> = Lazy::new(|| {
    FILE_PATTERNS
        .iter()
        .filter_map(|&(role, pattern)| {
            RegexBuilder::new(pattern)
                .case_insensitive(true)
                .build()
                .ok()
                .map(|re| (role, re))
        })
        .collect()
});

fn current(song: &Song, role: FileRole) -> Option<&PathBuf> {
    match role {
        FileRole::Cover => song.cover.as_ref(),
        FileRole::Background => song.background.as_ref(),
        FileRole::Video => song.video.as_ref(),
        FileRole::Midi => song.midi_file.as_ref(),
        FileRole::Stem(stem) => song.music.get(&stem),
    }
}

fn clear(song: &mut Song, role: FileRole) {
    match role {
        FileRole::Cover => song.cover = None,
        FileRole::Background => song.background = None,
        FileRole::Video => song.video = None,
        FileRole::Midi => song.midi_file = None,
        FileRole::Stem(stem) => {
            song.music.remove(&stem);
        }
    }
}

fn assign(song: &mut Song, role: FileRole, path: PathBuf) {
    match role {
        FileRole::Cover => song.cover = Some(path),
        FileRole::Background => song.background = Some(path),
        FileRole::Video => song.video = Some(path),
        FileRole::Midi => song.midi_file = Some(path),
        FileRole::Stem(stem) => {
            song.music.insert(stem, path);
        }
    }
}

/// Lists the file names of the song directory, sorted. Unreadable directories are empty.
fn list_files(song: &Song) -> BTreeSet<String> {
    let Ok(entries) = std::fs::read_dir(&song.path) else {
        log::debug!("cannot list {}", song.path.display());
        return BTreeSet::new();
    };
    entries
        .filter_map(core::result::Result::ok)
        .filter(|entry| entry.file_type().is_ok_and(|t| t.is_file()))
        .filter_map(|entry| entry.file_name().into_string().ok())
        .collect()
}

/// Fills unset media roles of `song` from its directory. Never fails.
///
/// Paths already set to an existing file are kept, and that file is not handed to any other
/// role. Paths pointing to missing files are treated as unset. The preview stem is always
/// left unset. Media named by a karaoke sidecar lives outside the chart directory, so for
/// [`Dialect::Ass`] songs the background stem and the video are left as they are.
pub fn guess_files(song: &mut Song) -> Vec<ResolveWarning> {
    let mut pool = list_files(song);
    let fixed: &[FileRole] = if song.dialect == Some(Dialect::Ass) {
        &[FileRole::Stem(StemRole::Background), FileRole::Video]
    } else {
        &[]
    };
    let mut resolved: BTreeSet<FileRole> = fixed.iter().copied().collect();
    let mut dangling = Vec::new();
    for &(role, _) in FILE_PATTERNS {
        if resolved.contains(&role) && !fixed.contains(&role) {
            continue;
        }
        let existing = current(song, role).cloned();
        match existing {
            Some(path) if path.is_file() => {
                if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                    if path.parent() == Some(song.path.as_path()) {
                        pool.remove(name);
                    }
                }
                resolved.insert(role);
            }
            Some(_) if fixed.contains(&role) => {}
            Some(_) => {
                clear(song, role);
                dangling.push(role);
            }
            None => {}
        }
    }

    let mut found = Vec::new();
    for (role, re) in COMPILED.iter() {
        if resolved.contains(role) {
            continue;
        }
        let Some(name) = pool.iter().find(|name| re.is_match(name)).cloned() else {
            continue;
        };
        pool.remove(&name);
        let path = song.path.join(&name);
        assign(song, *role, path.clone());
        resolved.insert(*role);
        found.push((*role, path));
    }
    clear(song, FileRole::Stem(StemRole::Preview));

    let missing: Vec<FileRole> = dangling
        .into_iter()
        .filter(|role| !resolved.contains(role) && *role != FileRole::Stem(StemRole::Preview))
        .unique()
        .collect();

    let mut warnings = Vec::new();
    if !missing.is_empty() {
        warnings.push(ResolveWarning::NotFound(missing));
    }
    if !found.is_empty() {
        warnings.push(ResolveWarning::Autodetected(found));
    }
    warnings
}
