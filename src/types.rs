//! Core value types shared across the practice loop
//!
//! Letters, hand landmarks, and recognition results.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Number of tracked points in one hand pose
pub const LANDMARK_COUNT: usize = 21;

/// Highest confidence the recognition service can report
pub const MAX_CONFIDENCE: f32 = 100.0;

/// A single uppercase letter of the fingerspelling alphabet
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Letter(u8);

impl Letter {
    pub const A: Letter = Letter(b'A');
    pub const Z: Letter = Letter(b'Z');

    /// Number of letters in the alphabet
    pub const COUNT: usize = 26;

    /// Build a letter from a char, accepting either case
    pub fn new(c: char) -> Option<Self> {
        let upper = c.to_ascii_uppercase();
        if upper.is_ascii_uppercase() {
            Some(Letter(upper as u8))
        } else {
            None
        }
    }

    /// Zero-based position in the alphabet (A = 0)
    pub fn index(self) -> usize {
        (self.0 - b'A') as usize
    }

    /// Letter at a zero-based alphabet position
    pub fn from_index(index: usize) -> Option<Self> {
        if index < Self::COUNT {
            Some(Letter(b'A' + index as u8))
        } else {
            None
        }
    }

    /// Alphabetically next letter, `None` after Z
    pub fn next(self) -> Option<Self> {
        Self::from_index(self.index() + 1)
    }

    pub fn as_char(self) -> char {
        self.0 as char
    }

    /// Iterate A through Z
    pub fn all() -> impl Iterator<Item = Letter> {
        (b'A'..=b'Z').map(Letter)
    }
}

impl fmt::Display for Letter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// Error returned when a string is not a single alphabet letter
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("not a letter: {0:?}")]
pub struct InvalidLetter(pub String);

impl FromStr for Letter {
    type Err = InvalidLetter;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let mut chars = trimmed.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Letter::new(c).ok_or_else(|| InvalidLetter(s.to_string())),
            _ => Err(InvalidLetter(s.to_string())),
        }
    }
}

impl TryFrom<String> for Letter {
    type Error = InvalidLetter;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Letter> for String {
    fn from(letter: Letter) -> Self {
        letter.to_string()
    }
}

/// One tracked 3-D point, serialized as an `[x, y, z]` triple
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "[f32; 3]", into = "[f32; 3]")]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Landmark {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

impl From<[f32; 3]> for Landmark {
    fn from([x, y, z]: [f32; 3]) -> Self {
        Self { x, y, z }
    }
}

impl From<Landmark> for [f32; 3] {
    fn from(l: Landmark) -> Self {
        [l.x, l.y, l.z]
    }
}

/// The 21 landmarks of one detected hand
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Landmark>", into = "Vec<Landmark>")]
pub struct LandmarkSnapshot {
    points: Vec<Landmark>,
}

/// Error returned when a landmark list does not describe a full hand
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("expected 21 landmarks, got {0}")]
pub struct IncompleteHand(pub usize);

impl LandmarkSnapshot {
    pub fn new(points: Vec<Landmark>) -> Result<Self, IncompleteHand> {
        if points.len() != LANDMARK_COUNT {
            return Err(IncompleteHand(points.len()));
        }
        Ok(Self { points })
    }

    /// Build from a flat `[x0, y0, z0, x1, ...]` buffer
    pub fn from_flat(values: &[f32]) -> Result<Self, IncompleteHand> {
        if values.len() != LANDMARK_COUNT * 3 {
            return Err(IncompleteHand(values.len() / 3));
        }
        let points = values
            .chunks_exact(3)
            .map(|c| Landmark::new(c[0], c[1], c[2]))
            .collect();
        Ok(Self { points })
    }

    pub fn points(&self) -> &[Landmark] {
        &self.points
    }
}

impl TryFrom<Vec<Landmark>> for LandmarkSnapshot {
    type Error = IncompleteHand;

    fn try_from(points: Vec<Landmark>) -> Result<Self, Self::Error> {
        Self::new(points)
    }
}

impl From<LandmarkSnapshot> for Vec<Landmark> {
    fn from(snapshot: LandmarkSnapshot) -> Self {
        snapshot.points
    }
}

/// Letter recognized from a snapshot with its confidence (0-100)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecognitionResult {
    pub label: Letter,
    pub confidence: f32,
}

impl RecognitionResult {
    pub fn new(label: Letter, confidence: f32) -> Self {
        Self {
            label,
            confidence: confidence.clamp(0.0, MAX_CONFIDENCE),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_letter_parse() {
        assert_eq!("a".parse::<Letter>().unwrap(), Letter::A);
        assert_eq!(" Z ".parse::<Letter>().unwrap(), Letter::Z);
        assert!("AB".parse::<Letter>().is_err());
        assert!("".parse::<Letter>().is_err());
        assert!("1".parse::<Letter>().is_err());
    }

    #[test]
    fn test_letter_next_stops_at_z() {
        assert_eq!(Letter::A.next(), Letter::new('B'));
        assert_eq!(Letter::Z.next(), None);
        assert_eq!(Letter::all().count(), Letter::COUNT);
    }

    #[test]
    fn test_letter_serde_as_string() {
        let json = serde_json::to_string(&Letter::new('q').unwrap()).unwrap();
        assert_eq!(json, "\"Q\"");
        let back: Letter = serde_json::from_str("\"m\"").unwrap();
        assert_eq!(back.as_char(), 'M');
        assert!(serde_json::from_str::<Letter>("\"?\"").is_err());
    }

    #[test]
    fn test_snapshot_requires_full_hand() {
        assert!(LandmarkSnapshot::new(vec![Landmark::default(); 20]).is_err());
        let snapshot = LandmarkSnapshot::new(vec![Landmark::new(0.1, 0.2, 0.3); 21]).unwrap();
        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json.as_array().unwrap().len(), 21);
        assert_eq!(json[0], serde_json::json!([0.1f32, 0.2f32, 0.3f32]));
    }

    #[test]
    fn test_snapshot_from_flat() {
        let values: Vec<f32> = (0..63).map(|i| i as f32).collect();
        let snapshot = LandmarkSnapshot::from_flat(&values).unwrap();
        assert_eq!(snapshot.points()[1], Landmark::new(3.0, 4.0, 5.0));
        assert_eq!(LandmarkSnapshot::from_flat(&values[..60]), Err(IncompleteHand(20)));
    }

    #[test]
    fn test_recognition_confidence_clamped() {
        assert_eq!(RecognitionResult::new(Letter::A, 140.0).confidence, 100.0);
        assert_eq!(RecognitionResult::new(Letter::A, -3.0).confidence, 0.0);
    }
}
