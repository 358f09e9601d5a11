//! In-memory song catalog. A [`SongRegistry`] is a plain owned value the
//! caller constructs and threads around; nothing here is process-global.
//! Entries are validated on register so bad data never gets in.

use crate::ingest::measures::try_parse_time_signature;
use crate::model::config::is_kebab_case;
use crate::model::song::{Difficulty, Genre, SongEntry};
use anyhow::{Result, bail};
use log::debug;
use std::collections::{BTreeMap, HashMap};

/// Filters for [`SongRegistry::search`]. Unset fields don't constrain.
#[derive(Debug, Default, Clone)]
pub struct SearchOptions {
    pub genre: Option<Genre>,
    pub difficulty: Option<Difficulty>,
    /// Case-insensitive substring match over title, composer, and tags.
    pub query: Option<String>,
    /// Every listed tag must be present on the song (case-insensitive).
    pub tags: Vec<String>,
    /// Maximum duration in seconds, inclusive.
    pub max_duration: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct RegistryStats {
    pub total_songs: usize,
    pub total_measures: usize,
    pub by_genre: BTreeMap<Genre, usize>,
    pub by_difficulty: BTreeMap<Difficulty, usize>,
}

#[derive(Debug, Default)]
pub struct SongRegistry {
    songs: Vec<SongEntry>,
    index: HashMap<String, usize>,
}

impl SongRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and add a song. Rejects invalid entries and duplicate ids.
    pub fn register(&mut self, song: SongEntry) -> Result<()> {
        let errors = validate_song(&song);
        if !errors.is_empty() {
            bail!("Invalid song '{}': {}", song.id, errors.join("; "));
        }
        if self.index.contains_key(&song.id) {
            bail!("Duplicate song id '{}'..!", song.id);
        }

        debug!(
            "Registered song '{}' ({} measures)..!",
            song.id,
            song.measures.len()
        );
        self.index.insert(song.id.clone(), self.songs.len());
        self.songs.push(song);
        Ok(())
    }

    pub fn register_all(&mut self, songs: impl IntoIterator<Item = SongEntry>) -> Result<()> {
        for song in songs {
            self.register(song)?;
        }
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&SongEntry> {
        self.index.get(id).map(|&i| &self.songs[i])
    }

    /// All songs, in registration order.
    pub fn all(&self) -> &[SongEntry] {
        &self.songs
    }

    pub fn by_genre(&self, genre: Genre) -> Vec<&SongEntry> {
        self.songs.iter().filter(|s| s.genre == genre).collect()
    }

    pub fn by_difficulty(&self, difficulty: Difficulty) -> Vec<&SongEntry> {
        self.songs
            .iter()
            .filter(|s| s.difficulty == difficulty)
            .collect()
    }

    pub fn search(&self, options: &SearchOptions) -> Vec<&SongEntry> {
        self.songs
            .iter()
            .filter(|s| matches_search(s, options))
            .collect()
    }

    /// Aggregate counts. Every genre and difficulty appears in the maps,
    /// zero-count buckets included.
    pub fn stats(&self) -> RegistryStats {
        let mut by_genre: BTreeMap<Genre, usize> =
            Genre::ALL.iter().map(|&g| (g, 0)).collect();
        let mut by_difficulty: BTreeMap<Difficulty, usize> =
            Difficulty::ALL.iter().map(|&d| (d, 0)).collect();

        for song in &self.songs {
            *by_genre.entry(song.genre).or_default() += 1;
            *by_difficulty.entry(song.difficulty).or_default() += 1;
        }

        RegistryStats {
            total_songs: self.songs.len(),
            total_measures: self.songs.iter().map(|s| s.measures.len()).sum(),
            by_genre,
            by_difficulty,
        }
    }
}

fn matches_search(song: &SongEntry, options: &SearchOptions) -> bool {
    if let Some(genre) = options.genre
        && song.genre != genre
    {
        return false;
    }
    if let Some(difficulty) = options.difficulty
        && song.difficulty != difficulty
    {
        return false;
    }
    if let Some(max) = options.max_duration
        && song.duration_seconds > max
    {
        return false;
    }
    if let Some(query) = &options.query {
        let q = query.to_lowercase();
        let hit = song.title.to_lowercase().contains(&q)
            || song
                .composer
                .as_deref()
                .is_some_and(|c| c.to_lowercase().contains(&q))
            || song.tags.iter().any(|t| t.to_lowercase().contains(&q));
        if !hit {
            return false;
        }
    }

    options.tags.iter().all(|tag| {
        let t = tag.to_lowercase();
        song.tags.iter().any(|have| have.to_lowercase() == t)
    })
}

/// Check a [`SongEntry`] against the catalog's schema. Returns one
/// message per problem; empty means the entry is accepted.
pub fn validate_song(song: &SongEntry) -> Vec<String> {
    let mut errors = Vec::new();

    if !is_kebab_case(&song.id) {
        errors.push(format!("id '{}' must be kebab-case", song.id));
    }
    if song.title.is_empty() {
        errors.push("title must not be empty".to_string());
    }
    if song.key.is_empty() {
        errors.push("key must not be empty".to_string());
    }
    if !(10.0..=400.0).contains(&song.tempo) {
        errors.push(format!("tempo {} out of range [10, 400]", song.tempo));
    }
    if try_parse_time_signature(&song.time_signature).is_none() {
        errors.push(format!(
            "timeSignature '{}' must be <numerator>/<denominator>",
            song.time_signature
        ));
    }
    if song.measures.is_empty() {
        errors.push("measures must not be empty".to_string());
    }
    for (i, measure) in song.measures.iter().enumerate() {
        let expected = (i + 1) as u32;
        if measure.number != expected {
            errors.push(format!(
                "measure[{}] has number {}, expected {}",
                i, measure.number, expected
            ));
        }
    }

    errors
}
