//! Hand separation and the token language: pitch names, duration codes,
//! chord grouping. Every call site renders through here so the duration
//! tables exist exactly once.

use crate::ingest::ResolvedNote;

const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Token rendered for a hand with no notes in a measure.
pub const REST_TOKEN: &str = "R:w";

/// Notes whose start ticks lie within this window of the group anchor
/// are treated as one chord.
pub const CHORD_TOLERANCE_TICKS: u64 = 10;

/// Simple durations in beats, longest first.
const SIMPLE_DURATIONS: [(f64, &str); 8] = [
    (4.0, "w"),
    (3.0, "h."),
    (2.0, "h"),
    (1.5, "q."),
    (1.0, "q"),
    (0.75, "e."),
    (0.5, "e"),
    (0.25, "s"),
];

/// Triplet durations in beats. 2/3 and 1/3 sit within 0.1 beat of the
/// dotted-eighth and sixteenth rows, so these are matched first, inside
/// a tighter window, before the simple table gets a look.
const TRIPLET_DURATIONS: [(f64, &str); 3] = [
    (4.0 / 3.0, "ht"),
    (2.0 / 3.0, "qt"),
    (1.0 / 3.0, "et"),
];

const SIMPLE_TOLERANCE: f64 = 0.1;
const TRIPLET_TOLERANCE: f64 = 0.05;

/// Convert a MIDI note number to scientific pitch notation.
/// 60 -> "C4", 69 -> "A4", 48 -> "C3".
pub fn midi_note_to_scientific(note_number: u8) -> String {
    let octave = i32::from(note_number / 12) - 1;
    let name = NOTE_NAMES[usize::from(note_number % 12)];
    format!("{name}{octave}")
}

/// Quantize a tick duration into a symbolic duration code.
///
/// Durations that miss every tolerance window fall back to the nearest
/// coarse bucket, biased long.
pub fn ticks_to_duration(duration_ticks: u64, ticks_per_beat: u64) -> &'static str {
    let ratio = duration_ticks as f64 / ticks_per_beat as f64;

    for (beats, code) in TRIPLET_DURATIONS {
        if (ratio - beats).abs() < TRIPLET_TOLERANCE {
            return code;
        }
    }
    for (beats, code) in SIMPLE_DURATIONS {
        if (ratio - beats).abs() < SIMPLE_TOLERANCE {
            return code;
        }
    }

    if ratio >= 3.0 {
        "w"
    } else if ratio >= 1.5 {
        "h"
    } else if ratio >= 0.75 {
        "q"
    } else if ratio >= 0.375 {
        "e"
    } else {
        "s"
    }
}

/// Partition notes into (right hand, left hand) by the split point.
/// Notes at or above the split point go right.
pub fn separate_hands(
    notes: &[ResolvedNote],
    split_point: u8,
) -> (Vec<ResolvedNote>, Vec<ResolvedNote>) {
    notes
        .iter()
        .copied()
        .partition(|n| n.note_number >= split_point)
}

/// Cluster near-simultaneous notes into chord groups.
///
/// Notes must already be sorted by start tick. Each group is anchored at
/// its first note: a note joins the current group only while its start
/// tick is within `tolerance_ticks` of the anchor, so tolerance never
/// chains across a drifting run of notes.
pub fn group_into_chords(notes: &[ResolvedNote], tolerance_ticks: u64) -> Vec<Vec<ResolvedNote>> {
    let Some((first, rest)) = notes.split_first() else {
        return Vec::new();
    };

    let mut groups: Vec<Vec<ResolvedNote>> = Vec::new();
    let mut current: Vec<ResolvedNote> = vec![*first];

    for note in rest {
        if note.start_tick - current[0].start_tick <= tolerance_ticks {
            current.push(*note);
        } else {
            groups.push(current);
            current = vec![*note];
        }
    }

    groups.push(current);
    groups
}

pub fn is_chord(group: &[ResolvedNote]) -> bool {
    group.len() >= 2
}

/// Format a single note as `<pitch>:<duration>`.
pub fn format_note(note: &ResolvedNote, ticks_per_beat: u64) -> String {
    let name = midi_note_to_scientific(note.note_number);
    let dur = ticks_to_duration(note.duration_ticks, ticks_per_beat);
    format!("{name}:{dur}")
}

/// Format a chord group. Pitches are sorted low to high and the duration
/// code comes from the longest note in the group.
pub fn chord_to_string(chord: &[ResolvedNote], ticks_per_beat: u64) -> String {
    if chord.len() == 1 {
        return format_note(&chord[0], ticks_per_beat);
    }

    let max_dur = chord.iter().map(|n| n.duration_ticks).max().unwrap_or(0);
    let dur = ticks_to_duration(max_dur, ticks_per_beat);

    let mut sorted: Vec<&ResolvedNote> = chord.iter().collect();
    sorted.sort_by_key(|n| n.note_number);
    let names = sorted
        .iter()
        .map(|n| midi_note_to_scientific(n.note_number))
        .collect::<Vec<_>>()
        .join(" ");

    format!("{names}:{dur}")
}

/// Render one hand's notes for a measure as a token string, or the rest
/// token when the hand is silent.
pub fn format_hand(notes: &[ResolvedNote], ticks_per_beat: u64) -> String {
    let groups = group_into_chords(notes, CHORD_TOLERANCE_TICKS);
    if groups.is_empty() {
        return REST_TOKEN.to_string();
    }

    groups
        .iter()
        .map(|group| chord_to_string(group, ticks_per_beat))
        .collect::<Vec<_>>()
        .join(" ")
}
