//! Per-letter mastery and recent attempt history
//!
//! Both feed the policy service's `next` request. Mutation goes only through
//! [`MasteryTracker::apply_outcome`].

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use std::fmt;

use crate::types::Letter;

/// Letters kept in [`RecentHistory`]
pub const HISTORY_CAPACITY: usize = 8;

/// Letters of history sent with a `next` request
pub const HISTORY_SENT: usize = 5;

/// Proficiency with one letter
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum MasteryLevel {
    #[default]
    Unseen = 0,
    Practicing = 1,
    Mastered = 2,
}

impl MasteryLevel {
    /// One step up, saturating at [`MasteryLevel::Mastered`]
    pub fn promoted(self) -> Self {
        match self {
            MasteryLevel::Unseen => MasteryLevel::Practicing,
            MasteryLevel::Practicing | MasteryLevel::Mastered => MasteryLevel::Mastered,
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

impl From<MasteryLevel> for u8 {
    fn from(level: MasteryLevel) -> u8 {
        level.as_u8()
    }
}

impl TryFrom<u8> for MasteryLevel {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(MasteryLevel::Unseen),
            1 => Ok(MasteryLevel::Practicing),
            2 => Ok(MasteryLevel::Mastered),
            other => Err(format!("mastery level out of range: {}", other)),
        }
    }
}

impl fmt::Display for MasteryLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MasteryLevel::Unseen => write!(f, "unseen"),
            MasteryLevel::Practicing => write!(f, "practicing"),
            MasteryLevel::Mastered => write!(f, "mastered"),
        }
    }
}

/// Mastery for every letter A..Z; serialized as `{"A": 0, ..., "Z": 0}`
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(into = "BTreeMap<Letter, MasteryLevel>", from = "BTreeMap<Letter, MasteryLevel>")]
pub struct MasteryMap {
    levels: [MasteryLevel; Letter::COUNT],
}

impl MasteryMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, letter: Letter) -> MasteryLevel {
        self.levels[letter.index()]
    }

    fn set(&mut self, letter: Letter, level: MasteryLevel) {
        self.levels[letter.index()] = level;
    }

    pub fn iter(&self) -> impl Iterator<Item = (Letter, MasteryLevel)> + '_ {
        Letter::all().zip(self.levels.iter().copied())
    }

    /// Letters at [`MasteryLevel::Mastered`]
    pub fn mastered_count(&self) -> usize {
        self.levels.iter().filter(|&&l| l == MasteryLevel::Mastered).count()
    }
}

impl From<MasteryMap> for BTreeMap<Letter, MasteryLevel> {
    fn from(map: MasteryMap) -> Self {
        map.iter().collect()
    }
}

impl From<BTreeMap<Letter, MasteryLevel>> for MasteryMap {
    /// Letters missing from the source map are unseen
    fn from(source: BTreeMap<Letter, MasteryLevel>) -> Self {
        let mut map = MasteryMap::new();
        for (letter, level) in source {
            map.set(letter, level);
        }
        map
    }
}

/// The last [`HISTORY_CAPACITY`] attempted letters, oldest first
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RecentHistory {
    entries: VecDeque<Letter>,
}

impl RecentHistory {
    pub fn new() -> Self {
        Self {
            entries: VecDeque::with_capacity(HISTORY_CAPACITY),
        }
    }

    pub fn push(&mut self, letter: Letter) {
        if self.entries.len() == HISTORY_CAPACITY {
            self.entries.pop_front();
        }
        self.entries.push_back(letter);
    }

    /// The newest `n` entries, oldest first
    pub fn recent(&self, n: usize) -> Vec<Letter> {
        let skip = self.entries.len().saturating_sub(n);
        self.entries.iter().skip(skip).copied().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Letter> {
        self.entries.iter()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Result of one attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttemptOutcome {
    pub is_correct: bool,
    pub reward: i8,
}

impl AttemptOutcome {
    pub fn new(is_correct: bool) -> Self {
        Self {
            is_correct,
            reward: if is_correct { 1 } else { -1 },
        }
    }
}

/// Client-held learner model: mastery map plus recent history
#[derive(Debug, Clone, Default)]
pub struct MasteryTracker {
    mastery: MasteryMap,
    history: RecentHistory,
}

impl MasteryTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an attempt on `letter`; returns its mastery afterwards
    pub fn apply_outcome(&mut self, letter: Letter, is_correct: bool) -> MasteryLevel {
        if is_correct {
            let promoted = self.mastery.get(letter).promoted();
            self.mastery.set(letter, promoted);
        }
        self.history.push(letter);
        self.mastery.get(letter)
    }

    pub fn mastery(&self) -> &MasteryMap {
        &self.mastery
    }

    pub fn history(&self) -> &RecentHistory {
        &self.history
    }

    /// Everything back to unseen, history emptied
    pub fn reset(&mut self) {
        self.mastery = MasteryMap::new();
        self.history.clear();
    }
}
