//! Adaptive curriculum
//!
//! - `mastery`: per-letter mastery and recent history
//! - `client`: `/alphabet/next` and `/alphabet/feedback` wire types and [`PolicyService`]
//! - `session`: [`CurriculumSession`], the apply-and-advance cycle

pub mod client;
pub mod mastery;
pub mod session;

pub use client::{
    FeedbackRequest, FeedbackState, HttpPolicyClient, NextRequest, NextResponse, NextTarget, PolicyService,
    DEFAULT_ACTION,
};
pub use mastery::{AttemptOutcome, MasteryLevel, MasteryMap, MasteryTracker, RecentHistory};
pub use session::{AttemptReport, CurriculumSession, CurriculumState};
