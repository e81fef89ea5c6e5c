//! Practice loop glue
//!
//! [`PracticeSession`] ties capture, perception, recognition polling and the
//! curriculum together for one learner.

pub mod session;

pub use session::{Detection, PracticeComponents, PracticeOptions, PracticeSession, PracticeStats};

/// Predictions must be strictly above this confidence to count
pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 70.0;
