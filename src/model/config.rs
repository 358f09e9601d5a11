use crate::model::song::{Difficulty, Genre, MusicalLanguage};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;

/// Per-measure annotations a human author layers on top of the extracted notation.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct MeasureOverride {
    /// 1-based measure number this override applies to.
    pub measure: u32,
    /// Suggested fingering, e.g. "RH: 1-3-5, LH: 5-3-1".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fingering: Option<String>,
    /// Teaching note an LLM can read aloud for this measure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub teaching_note: Option<String>,
    /// Dynamics marking: "pp", "p", "mp", "mf", "f", "ff", "crescendo", "decrescendo".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dynamics: Option<String>,
    /// Tempo override for rubato/ritardando.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tempo_override: Option<f64>,
}

/// Human-authored config that accompanies each .mid file.
///
/// Carries everything the MIDI doesn't: metadata, musical language,
/// teaching notes, fingering, and per-measure overrides. The ingest
/// pipeline merges it with extracted note data into a [`SongEntry`].
///
/// [`SongEntry`]: crate::model::song::SongEntry
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SongConfig {
    /// Unique kebab-case slug.
    pub id: String,
    pub title: String,
    pub genre: Genre,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub composer: Option<String>,
    /// Arranger (if simplified/adapted).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arranger: Option<String>,
    pub difficulty: Difficulty,
    /// Key signature, e.g. "C major", "A minor".
    pub key: String,
    /// Default tempo in BPM; overrides any tempo found in the MIDI.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tempo: Option<f64>,
    /// Time signature string, e.g. "4/4"; overrides any found in the MIDI.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_signature: Option<String>,
    /// Freeform tags for search/filtering.
    pub tags: Vec<String>,
    /// Source/attribution for the arrangement.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    pub musical_language: MusicalLanguage,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub measure_overrides: Option<Vec<MeasureOverride>>,
    /// MIDI note number separating the hands: notes at or above it go to
    /// the right hand. Default 60 (middle C).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub split_point: Option<u8>,
}

/// A single field-level validation failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError {
    pub field: String,
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

fn error(field: impl Into<String>, message: impl Into<String>) -> ConfigError {
    ConfigError {
        field: field.into(),
        message: message.into(),
    }
}

pub(crate) fn is_kebab_case(s: &str) -> bool {
    !s.is_empty()
        && s.split('-').all(|part| {
            !part.is_empty()
                && part
                    .chars()
                    .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        })
}

/// Check a [`SongConfig`] for field-level problems.
///
/// Returns an empty vec when the config is valid. The ingest pipeline
/// assumes its input passed this check and never re-validates.
pub fn validate_config(config: &SongConfig) -> Vec<ConfigError> {
    let mut errors = Vec::new();

    if !is_kebab_case(&config.id) {
        errors.push(error("id", "must be kebab-case"));
    }
    if config.title.is_empty() {
        errors.push(error("title", "must not be empty"));
    }
    if config.key.is_empty() {
        errors.push(error("key", "must not be empty"));
    }
    if let Some(tempo) = config.tempo
        && !(10.0..=400.0).contains(&tempo)
    {
        errors.push(error("tempo", "must be between 10 and 400"));
    }
    if let Some(split) = config.split_point
        && split > 127
    {
        errors.push(error("splitPoint", "must be at most 127"));
    }
    if config.musical_language.description.is_empty() {
        errors.push(error("musicalLanguage.description", "must not be empty"));
    }
    if config.musical_language.structure.is_empty() {
        errors.push(error("musicalLanguage.structure", "must not be empty"));
    }

    if let Some(overrides) = &config.measure_overrides {
        for (i, ov) in overrides.iter().enumerate() {
            if ov.measure < 1 {
                errors.push(error(
                    format!("measureOverrides[{i}].measure"),
                    "must be at least 1",
                ));
            }
            if let Some(tempo) = ov.tempo_override
                && !(10.0..=400.0).contains(&tempo)
            {
                errors.push(error(
                    format!("measureOverrides[{i}].tempoOverride"),
                    "must be between 10 and 400",
                ));
            }
        }
    }

    errors
}

/// Load a [`SongConfig`] from a JSON file.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<SongConfig> {
    let raw = fs::read_to_string(path.as_ref())
        .with_context(|| format!("Failed to read config file {}", path.as_ref().display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse config file {}", path.as_ref().display()))
}
