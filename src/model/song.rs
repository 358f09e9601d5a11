use serde::{Deserialize, Serialize};
use std::fmt;

/// The ten canonical genres a song can be filed under.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum Genre {
    Classical,
    Jazz,
    Pop,
    Blues,
    Rock,
    Rnb,
    Latin,
    Film,
    Ragtime,
    NewAge,
}

impl Genre {
    pub const ALL: [Genre; 10] = [
        Genre::Classical,
        Genre::Jazz,
        Genre::Pop,
        Genre::Blues,
        Genre::Rock,
        Genre::Rnb,
        Genre::Latin,
        Genre::Film,
        Genre::Ragtime,
        Genre::NewAge,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Genre::Classical => "classical",
            Genre::Jazz => "jazz",
            Genre::Pop => "pop",
            Genre::Blues => "blues",
            Genre::Rock => "rock",
            Genre::Rnb => "rnb",
            Genre::Latin => "latin",
            Genre::Film => "film",
            Genre::Ragtime => "ragtime",
            Genre::NewAge => "new-age",
        }
    }
}

impl fmt::Display for Genre {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum Difficulty {
    Beginner,
    Intermediate,
    Advanced,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [
        Difficulty::Beginner,
        Difficulty::Intermediate,
        Difficulty::Advanced,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Beginner => "beginner",
            Difficulty::Intermediate => "intermediate",
            Difficulty::Advanced => "advanced",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Freeform prose layer an LLM reads alongside the notation when teaching.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct MusicalLanguage {
    /// 1-3 sentence overview of the piece.
    pub description: String,
    /// Musical structure: "ABA", "Verse-Chorus-Verse", etc.
    pub structure: String,
    /// Notable moments worth referencing while teaching.
    pub key_moments: Vec<String>,
    /// What the student will learn from this piece.
    pub teaching_goals: Vec<String>,
    /// Style/feel hints for performance.
    pub style_tips: Vec<String>,
}

/// One measure of notation, both hands rendered as token strings.
///
/// `right_hand`/`left_hand` are never empty; a silent hand holds the
/// literal rest token `R:w`.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Measure {
    /// 1-based measure number.
    pub number: u32,
    pub right_hand: String,
    pub left_hand: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fingering: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub teaching_note: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dynamics: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tempo_override: Option<f64>,
}

/// A complete song: config metadata merged with notation extracted from MIDI.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SongEntry {
    pub id: String,
    pub title: String,
    pub genre: Genre,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub composer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arranger: Option<String>,
    pub difficulty: Difficulty,
    /// Key signature, e.g. "C major".
    pub key: String,
    /// Effective tempo in BPM.
    pub tempo: f64,
    /// Rendered as "<numerator>/<denominator>", e.g. "4/4".
    pub time_signature: String,
    /// Playing time at the notated tempo, rounded to whole seconds.
    pub duration_seconds: u32,
    pub musical_language: MusicalLanguage,
    pub measures: Vec<Measure>,
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}
