//! Measure geometry and assembly: how many measures a note stream spans,
//! which notes land in which measure, and the per-measure override merge.

use crate::ingest::hands::{format_hand, separate_hands};
use crate::ingest::{ResolvedNote, TimeSigEvent};
use crate::model::config::MeasureOverride;
use crate::model::song::Measure;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeSignature {
    pub numerator: u32,
    pub denominator: u32,
}

pub const DEFAULT_TIME_SIGNATURE: TimeSignature = TimeSignature {
    numerator: 4,
    denominator: 4,
};

/// Length of one measure in ticks. Real-valued: 6/8 at 480 ticks/beat
/// gives 1440.0, but odd signatures against coarse headers can land
/// between ticks.
pub fn ticks_per_measure(ticks_per_beat: u64, time_sig: TimeSignature) -> f64 {
    ticks_per_beat as f64 * time_sig.numerator as f64 * (4.0 / time_sig.denominator as f64)
}

/// Number of measures the notes span, counted by note *end* position so a
/// note held across a barline still claims the measure it rings into.
/// Always at least 1, even with no notes at all.
pub fn compute_total_measures(notes: &[ResolvedNote], ticks_per_measure: f64) -> usize {
    let last_end = notes
        .iter()
        .map(|n| n.start_tick + n.duration_ticks)
        .max()
        .unwrap_or(0);

    ((last_end as f64 / ticks_per_measure).ceil() as usize).max(1)
}

/// One measure's half-open tick window plus the notes starting inside it.
#[derive(Debug, Clone)]
pub struct MeasureSlice {
    /// 1-based measure number.
    pub number: u32,
    pub start_tick: f64,
    /// Exclusive.
    pub end_tick: f64,
    pub notes: Vec<ResolvedNote>,
}

/// Bucket notes into `total_measures` windows by start tick. A note's
/// duration never moves it: a note ringing past the barline stays in the
/// measure it started in, with its full duration.
pub fn slice_into_measures(
    notes: &[ResolvedNote],
    total_measures: usize,
    ticks_per_measure: f64,
) -> Vec<MeasureSlice> {
    (0..total_measures)
        .map(|m| {
            let start_tick = m as f64 * ticks_per_measure;
            let end_tick = (m + 1) as f64 * ticks_per_measure;
            let bucket = notes
                .iter()
                .filter(|n| {
                    let tick = n.start_tick as f64;
                    tick >= start_tick && tick < end_tick
                })
                .copied()
                .collect();

            MeasureSlice {
                number: (m + 1) as u32,
                start_tick,
                end_tick,
                notes: bucket,
            }
        })
        .collect()
}

pub(crate) fn try_parse_time_signature(value: &str) -> Option<TimeSignature> {
    let mut parts = value.split('/');
    let numerator = parts.next()?.trim().parse::<u32>().ok()?;
    let denominator = parts.next()?.trim().parse::<u32>().ok()?;
    if parts.next().is_some() || numerator == 0 || denominator == 0 {
        return None;
    }

    Some(TimeSignature {
        numerator,
        denominator,
    })
}

/// Parse a "n/d" string, defaulting to 4/4 when absent or malformed.
pub fn parse_time_signature(value: Option<&str>) -> TimeSignature {
    value
        .and_then(try_parse_time_signature)
        .unwrap_or(DEFAULT_TIME_SIGNATURE)
}

/// Pick the effective time signature: a parseable config string wins,
/// then the first MIDI event, then 4/4. A malformed config string never
/// errors, it just falls through.
pub fn resolve_time_signature(
    events: &[TimeSigEvent],
    config_value: Option<&str>,
) -> TimeSignature {
    if let Some(sig) = config_value.and_then(try_parse_time_signature) {
        return sig;
    }
    if let Some(first) = events.first() {
        return TimeSignature {
            numerator: first.numerator,
            denominator: first.denominator,
        };
    }

    DEFAULT_TIME_SIGNATURE
}

/// Render every measure: split by hand, format each hand, then copy any
/// per-measure override fields that are actually set (empty strings in an
/// override are treated as unset).
pub fn build_measures(
    notes: &[ResolvedNote],
    total_measures: usize,
    ticks_per_measure: f64,
    ticks_per_beat: u64,
    split_point: u8,
    overrides: &[MeasureOverride],
) -> Vec<Measure> {
    let by_number: HashMap<u32, &MeasureOverride> =
        overrides.iter().map(|ov| (ov.measure, ov)).collect();

    slice_into_measures(notes, total_measures, ticks_per_measure)
        .into_iter()
        .map(|slice| {
            let (right, left) = separate_hands(&slice.notes, split_point);

            let mut measure = Measure {
                number: slice.number,
                right_hand: format_hand(&right, ticks_per_beat),
                left_hand: format_hand(&left, ticks_per_beat),
                fingering: None,
                teaching_note: None,
                dynamics: None,
                tempo_override: None,
            };

            if let Some(ov) = by_number.get(&slice.number) {
                measure.fingering = ov.fingering.clone().filter(|s| !s.is_empty());
                measure.teaching_note = ov.teaching_note.clone().filter(|s| !s.is_empty());
                measure.dynamics = ov.dynamics.clone().filter(|s| !s.is_empty());
                measure.tempo_override = ov.tempo_override;
            }

            measure
        })
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;

    fn make_note(start_tick: u64, duration_ticks: u64, note_number: u8) -> ResolvedNote {
        ResolvedNote {
            note_number,
            start_tick,
            duration_ticks,
            velocity: 80,
            channel: 0,
        }
    }

    fn sig(numerator: u32, denominator: u32) -> TimeSignature {
        TimeSignature {
            numerator,
            denominator,
        }
    }

    #[test]
    fn measure_lengths() {
        assert_eq!(ticks_per_measure(480, sig(4, 4)), 1920.0);
        assert_eq!(ticks_per_measure(480, sig(3, 4)), 1440.0);
        assert_eq!(ticks_per_measure(480, sig(6, 8)), 1440.0);
        assert_eq!(ticks_per_measure(480, sig(2, 4)), 960.0);
    }

    #[test]
    fn one_measure_for_no_notes() {
        assert_eq!(compute_total_measures(&[], 1920.0), 1);
    }

    #[test]
    fn one_measure_for_notes_inside_it() {
        assert_eq!(compute_total_measures(&[make_note(0, 480, 60)], 1920.0), 1);
    }

    #[test]
    fn long_note_extends_measure_count() {
        assert_eq!(compute_total_measures(&[make_note(0, 2400, 60)], 1920.0), 2);
    }

    #[test]
    fn counts_by_note_end_not_start() {
        // starts inside measure 1, rings into measure 2
        assert_eq!(
            compute_total_measures(&[make_note(1800, 480, 60)], 1920.0),
            2
        );
    }

    #[test]
    fn buckets_notes_by_start_tick() {
        let notes = [
            make_note(0, 480, 60),
            make_note(480, 480, 60),
            make_note(1920, 480, 60),
            make_note(3840, 480, 60),
        ];
        let buckets = slice_into_measures(&notes, 3, 1920.0);

        assert_eq!(buckets.len(), 3);
        assert_eq!(buckets[0].notes.len(), 2);
        assert_eq!(buckets[1].notes.len(), 1);
        assert_eq!(buckets[2].notes.len(), 1);
        assert_eq!(buckets[0].number, 1);
        assert_eq!(buckets[1].number, 2);
        assert_eq!(buckets[2].number, 3);
    }

    #[test]
    fn keeps_empty_buckets_for_silent_measures() {
        let notes = [make_note(3840, 480, 60)];
        let buckets = slice_into_measures(&notes, 3, 1920.0);

        assert!(buckets[0].notes.is_empty());
        assert!(buckets[1].notes.is_empty());
        assert_eq!(buckets[2].notes.len(), 1);
    }

    #[test]
    fn windows_are_half_open_multiples() {
        let buckets = slice_into_measures(&[], 2, 1920.0);
        assert_eq!(buckets[0].start_tick, 0.0);
        assert_eq!(buckets[0].end_tick, 1920.0);
        assert_eq!(buckets[1].start_tick, 1920.0);
        assert_eq!(buckets[1].end_tick, 3840.0);
    }

    #[test]
    fn parses_time_signatures() {
        assert_eq!(parse_time_signature(Some("4/4")), sig(4, 4));
        assert_eq!(parse_time_signature(Some("3/4")), sig(3, 4));
        assert_eq!(parse_time_signature(Some("6/8")), sig(6, 8));
    }

    #[test]
    fn time_signature_defaults_to_common_time() {
        assert_eq!(parse_time_signature(None), sig(4, 4));
        assert_eq!(parse_time_signature(Some("nope")), sig(4, 4));
        assert_eq!(parse_time_signature(Some("4/4/4")), sig(4, 4));
        assert_eq!(parse_time_signature(Some("0/4")), sig(4, 4));
    }

    #[test]
    fn config_time_signature_wins() {
        let events = [TimeSigEvent {
            tick: 0,
            numerator: 3,
            denominator: 4,
        }];
        assert_eq!(resolve_time_signature(&events, Some("6/8")), sig(6, 8));
    }

    #[test]
    fn midi_time_signature_used_without_config() {
        let events = [TimeSigEvent {
            tick: 0,
            numerator: 3,
            denominator: 4,
        }];
        assert_eq!(resolve_time_signature(&events, None), sig(3, 4));
    }

    #[test]
    fn malformed_config_time_signature_falls_through() {
        let events = [TimeSigEvent {
            tick: 0,
            numerator: 3,
            denominator: 4,
        }];
        assert_eq!(resolve_time_signature(&events, Some("waltz")), sig(3, 4));
    }

    #[test]
    fn time_signature_defaults_when_nothing_available() {
        assert_eq!(resolve_time_signature(&[], None), sig(4, 4));
    }

    #[test]
    fn builds_measures_with_overrides() {
        let notes = [make_note(0, 480, 72), make_note(0, 480, 48)];
        let overrides = [MeasureOverride {
            measure: 1,
            fingering: Some("RH: 1-3-5".into()),
            teaching_note: Some("Start gently".into()),
            dynamics: Some(String::new()),
            tempo_override: Some(60.0),
        }];
        let measures = build_measures(&notes, 1, 1920.0, 480, 60, &overrides);

        assert_eq!(measures.len(), 1);
        assert_eq!(measures[0].right_hand, "C5:q");
        assert_eq!(measures[0].left_hand, "C3:q");
        assert_eq!(measures[0].fingering.as_deref(), Some("RH: 1-3-5"));
        assert_eq!(measures[0].teaching_note.as_deref(), Some("Start gently"));
        // empty override strings stay unset
        assert_eq!(measures[0].dynamics, None);
        assert_eq!(measures[0].tempo_override, Some(60.0));
    }

    #[test]
    fn overrides_for_other_measures_are_ignored() {
        let overrides = [MeasureOverride {
            measure: 7,
            fingering: Some("RH: 1".into()),
            teaching_note: None,
            dynamics: None,
            tempo_override: None,
        }];
        let measures = build_measures(&[], 1, 1920.0, 480, 60, &overrides);
        assert_eq!(measures[0].fingering, None);
        assert_eq!(measures[0].right_hand, "R:w");
        assert_eq!(measures[0].left_hand, "R:w");
    }
}
