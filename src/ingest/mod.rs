//! MIDI -> SongEntry ingest pipeline.
//!
//! The MIDI provides notes, timing, duration, and structure; the
//! [`SongConfig`] provides metadata, musical language, teaching notes,
//! and fingering. Everything here is a pure function over the decoded
//! event stream: decoding itself belongs to `midly`, and decode errors
//! pass through [`import_song_file`] untouched.

use crate::model::config::SongConfig;
use crate::model::song::SongEntry;
use anyhow::{Result, anyhow};
use log::{debug, warn};
use midly::{MetaMessage, MidiMessage, Smf, Timing, TrackEventKind};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

pub mod hands;
pub mod measures;

use measures::{build_measures, compute_total_measures, resolve_time_signature, ticks_per_measure};

pub const DEFAULT_TICKS_PER_BEAT: u64 = 480;
pub const DEFAULT_SPLIT_POINT: u8 = 60; // middle C
pub const DEFAULT_TEMPO_BPM: f64 = 120.0;
const DEFAULT_MPQN: u32 = 500_000;
const MICROSECONDS_PER_MINUTE: f64 = 60_000_000.0;

/// A note with absolute timing, reconstructed from a note-on/note-off pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedNote {
    /// MIDI note number 0-127.
    pub note_number: u8,
    /// Start time in ticks from the beginning.
    pub start_tick: u64,
    pub duration_ticks: u64,
    /// Velocity 0-127.
    pub velocity: u8,
    pub channel: u8,
}

/// A tempo change with absolute tick position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TempoEvent {
    pub tick: u64,
    pub microseconds_per_beat: u32,
}

/// A time signature change with absolute tick position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeSigEvent {
    pub tick: u64,
    pub numerator: u32,
    /// Literal denominator (the raw stream carries a power-of-two exponent).
    pub denominator: u32,
}

/// An unmatched note-on waiting for its note-off.
#[derive(Debug, Clone, Copy)]
struct PendingNote {
    start_tick: u64,
    velocity: u8,
}

/// Read and decode a MIDI file, then merge it with `config` into a
/// complete [`SongEntry`].
pub fn import_song_file<P: AsRef<Path>>(path: P, config: &SongConfig) -> Result<SongEntry> {
    let bytes = fs::read(path.as_ref()).map_err(|e| {
        anyhow!(
            "Failed to read MIDI file {}: {}",
            path.as_ref().display(),
            e
        )
    })?;
    let smf = Smf::parse(&bytes).map_err(|e| anyhow!("Failed to parse MIDI: {:?}", e))?;

    Ok(midi_to_song_entry(&smf, config))
}

/// Merge a decoded MIDI stream with a pre-validated config into a
/// complete [`SongEntry`]. Deterministic: identical inputs produce
/// bit-identical output.
pub fn midi_to_song_entry(smf: &Smf, config: &SongConfig) -> SongEntry {
    let ticks_per_beat = ticks_per_beat_of(smf);
    let split_point = config.split_point.unwrap_or(DEFAULT_SPLIT_POINT);

    let tempo_events = extract_tempo_events(smf);
    let time_sig_events = extract_time_sig_events(smf);
    let notes = resolve_notes(smf);

    let tempo = config
        .tempo
        .unwrap_or_else(|| tempo_from_events(&tempo_events));
    let time_sig = resolve_time_signature(&time_sig_events, config.time_signature.as_deref());
    let tpm = ticks_per_measure(ticks_per_beat, time_sig);

    let last_tick = notes
        .iter()
        .map(|n| n.start_tick + n.duration_ticks)
        .max()
        .unwrap_or(0);
    let total_measures = compute_total_measures(&notes, tpm);

    debug!(
        "Resolved {} notes across {} measures ({}/{} at {} ticks/beat)",
        notes.len(),
        total_measures,
        time_sig.numerator,
        time_sig.denominator,
        ticks_per_beat
    );

    let measures = build_measures(
        &notes,
        total_measures,
        tpm,
        ticks_per_beat,
        split_point,
        config.measure_overrides.as_deref().unwrap_or(&[]),
    );

    let duration_seconds = ticks_to_seconds(last_tick, &tempo_events, ticks_per_beat);

    SongEntry {
        id: config.id.clone(),
        title: config.title.clone(),
        genre: config.genre,
        composer: config.composer.clone(),
        arranger: config.arranger.clone(),
        difficulty: config.difficulty,
        key: config.key.clone(),
        tempo,
        time_signature: format!("{}/{}", time_sig.numerator, time_sig.denominator),
        duration_seconds: duration_seconds.round() as u32,
        musical_language: config.musical_language.clone(),
        measures,
        tags: config.tags.clone(),
        source: config.source.clone(),
    }
}

fn ticks_per_beat_of(smf: &Smf) -> u64 {
    match smf.header.timing {
        Timing::Metrical(t) => u64::from(t.as_int()),
        Timing::Timecode(..) => {
            warn!(
                "SMPTE timecode header carries no ticks-per-beat, assuming {}..!",
                DEFAULT_TICKS_PER_BEAT
            );
            DEFAULT_TICKS_PER_BEAT
        }
    }
}

/// Flatten all tracks into resolved notes with absolute tick positions,
/// sorted by `(start_tick, note_number)`.
///
/// Pairing is a per-key state machine, keyed `(channel, note_number)`:
/// a note-on opens the pending slot, the next note-off (or velocity-0
/// note-on) closes it. Retriggering an already-pending key overwrites
/// the slot and the earlier note-on is never emitted.
pub fn resolve_notes(smf: &Smf) -> Vec<ResolvedNote> {
    let mut notes: Vec<ResolvedNote> = Vec::new();

    for (track_idx, track) in smf.tracks.iter().enumerate() {
        let mut abs_tick: u64 = 0;
        let mut pending: HashMap<(u8, u8), PendingNote> = HashMap::new();

        for event in track.iter() {
            abs_tick = abs_tick.saturating_add(u64::from(event.delta.as_int()));

            if let TrackEventKind::Midi { channel, message } = &event.kind {
                let ch = channel.as_int();
                match message {
                    MidiMessage::NoteOn { key, vel } if vel.as_int() > 0 => {
                        let opened = PendingNote {
                            start_tick: abs_tick,
                            velocity: vel.as_int(),
                        };
                        if let Some(lost) = pending.insert((ch, key.as_int()), opened) {
                            debug!(
                                "Retriggered note {} ch{} at tick {}: dropping unmatched note-on from tick {}..!",
                                key.as_int(),
                                ch,
                                abs_tick,
                                lost.start_tick
                            );
                        }
                    }
                    MidiMessage::NoteOn { key, .. } | MidiMessage::NoteOff { key, .. } => {
                        match pending.remove(&(ch, key.as_int())) {
                            Some(open) => notes.push(ResolvedNote {
                                note_number: key.as_int(),
                                start_tick: open.start_tick,
                                duration_ticks: abs_tick - open.start_tick,
                                velocity: open.velocity,
                                channel: ch,
                            }),
                            None => debug!(
                                "Orphaned note-off for {} ch{} at tick {}..!",
                                key.as_int(),
                                ch,
                                abs_tick
                            ),
                        }
                    }
                    _ => {}
                }
            }
        }

        if !pending.is_empty() {
            debug!(
                "{} unmatched note-on(s) left open at end of track {}..!",
                pending.len(),
                track_idx
            );
        }
    }

    notes.sort_by_key(|n| (n.start_tick, n.note_number));
    notes
}

/// Collect tempo changes across all tracks, ascending by tick. The sort
/// is stable so same-tick events keep their encounter order.
pub fn extract_tempo_events(smf: &Smf) -> Vec<TempoEvent> {
    let mut events: Vec<TempoEvent> = Vec::new();

    for track in smf.tracks.iter() {
        let mut abs_tick: u64 = 0;
        for event in track.iter() {
            abs_tick = abs_tick.saturating_add(u64::from(event.delta.as_int()));
            if let TrackEventKind::Meta(MetaMessage::Tempo(mpqn)) = &event.kind {
                events.push(TempoEvent {
                    tick: abs_tick,
                    microseconds_per_beat: mpqn.as_int(),
                });
            }
        }
    }

    events.sort_by_key(|e| e.tick);
    events
}

/// Collect time signature changes across all tracks, ascending by tick,
/// converting the stream's power-of-two exponent to the literal denominator.
pub fn extract_time_sig_events(smf: &Smf) -> Vec<TimeSigEvent> {
    let mut events: Vec<TimeSigEvent> = Vec::new();

    for track in smf.tracks.iter() {
        let mut abs_tick: u64 = 0;
        for event in track.iter() {
            abs_tick = abs_tick.saturating_add(u64::from(event.delta.as_int()));
            if let TrackEventKind::Meta(MetaMessage::TimeSignature(numerator, denom_exp, _, _)) =
                &event.kind
            {
                events.push(TimeSigEvent {
                    tick: abs_tick,
                    numerator: u32::from(*numerator),
                    denominator: 2u32.saturating_pow(u32::from(*denom_exp)),
                });
            }
        }
    }

    events.sort_by_key(|e| e.tick);
    events
}

/// BPM implied by the first tempo event, or 120 when the stream has none.
pub fn tempo_from_events(events: &[TempoEvent]) -> f64 {
    match events.first() {
        Some(first) => (MICROSECONDS_PER_MINUTE / f64::from(first.microseconds_per_beat)).round(),
        None => DEFAULT_TEMPO_BPM,
    }
}

/// Elapsed seconds from tick 0 to `target_tick`, integrating over the
/// piecewise-constant tempo timeline.
pub fn ticks_to_seconds(target_tick: u64, tempo_events: &[TempoEvent], ticks_per_beat: u64) -> f64 {
    let mut seconds = 0.0;
    let mut current_tick: u64 = 0;
    let mut mpqn = tempo_events
        .first()
        .map(|e| e.microseconds_per_beat)
        .unwrap_or(DEFAULT_MPQN);

    for event in tempo_events {
        if event.tick >= target_tick {
            break;
        }
        if event.tick > current_tick {
            let delta_ticks = (event.tick - current_tick) as f64;
            seconds += delta_ticks / ticks_per_beat as f64 * (f64::from(mpqn) / 1_000_000.0);
            current_tick = event.tick;
        }
        mpqn = event.microseconds_per_beat;
    }

    if current_tick < target_tick {
        let delta_ticks = (target_tick - current_tick) as f64;
        seconds += delta_ticks / ticks_per_beat as f64 * (f64::from(mpqn) / 1_000_000.0);
    }

    seconds
}
