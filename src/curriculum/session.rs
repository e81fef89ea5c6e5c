//! Curriculum session: the apply-and-advance transaction
//!
//! Owns the mastery tracker and the policy's view of the session. Network
//! failures never undo local bookkeeping; they only leave the target where it
//! was.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::client::{FeedbackRequest, FeedbackState, NextRequest, PolicyService, DEFAULT_ACTION};
use super::mastery::{AttemptOutcome, MasteryLevel, MasteryTracker, HISTORY_SENT};
use crate::types::Letter;

/// Policy bookkeeping plus the letter the learner must currently produce
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurriculumState {
    pub state_key: Option<String>,
    pub last_action: Option<String>,
    pub target: Letter,
}

impl Default for CurriculumState {
    fn default() -> Self {
        Self {
            state_key: None,
            last_action: None,
            target: Letter::A,
        }
    }
}

/// What one apply-and-advance cycle did
#[derive(Debug, Clone, PartialEq)]
pub struct AttemptReport {
    pub letter: Letter,
    pub outcome: AttemptOutcome,
    /// Mastery of `letter` after the attempt
    pub mastery: MasteryLevel,
    pub feedback_delivered: bool,
    /// Whether the policy answered the follow-up `next`
    pub next_received: bool,
    pub next_target: Letter,
    pub attempted_at: DateTime<Utc>,
}

pub struct CurriculumSession {
    policy: Arc<dyn PolicyService>,
    tracker: MasteryTracker,
    state: CurriculumState,
}

impl CurriculumSession {
    pub fn new(policy: Arc<dyn PolicyService>) -> Self {
        Self {
            policy,
            tracker: MasteryTracker::new(),
            state: CurriculumState::default(),
        }
    }

    pub fn state(&self) -> &CurriculumState {
        &self.state
    }

    pub fn target(&self) -> Letter {
        self.state.target
    }

    pub fn tracker(&self) -> &MasteryTracker {
        &self.tracker
    }

    /// Pick the first target by asking about "A"
    pub async fn seed(&mut self) -> bool {
        self.request_next(Letter::A).await
    }

    /// Ask the policy what comes after `current`
    ///
    /// On failure the state is left untouched. A response without a usable
    /// target letter still updates the state key and action.
    pub async fn request_next(&mut self, current: Letter) -> bool {
        let request = NextRequest {
            current_letter: current,
            mastery_level: self.tracker.mastery().get(current),
            mastery_map: self.tracker.mastery().clone(),
            recent_history: self.tracker.history().recent(HISTORY_SENT),
        };

        match self.policy.next(&request).await {
            Ok(response) => {
                match response.target_letter() {
                    Some(letter) => self.state.target = letter,
                    None => warn!("Policy response has no target letter, keeping {}", self.state.target),
                }
                debug!("Policy action {:?} for state {}", response.action, response.state_key);
                self.state.state_key = Some(response.state_key);
                self.state.last_action = Some(response.action);
                info!("Next target: {}", self.state.target);
                true
            }
            Err(e) => {
                warn!("Failed to fetch next letter: {}", e);
                false
            }
        }
    }

    /// Report an outcome to the policy; errors are logged, never surfaced
    pub async fn send_feedback(&self, prev: Letter, next_mastery: MasteryLevel, reward: i8) -> bool {
        let request = FeedbackRequest {
            state_key: self.state.state_key.clone(),
            action: self
                .state
                .last_action
                .clone()
                .unwrap_or_else(|| DEFAULT_ACTION.to_string()),
            reward,
            next_state: FeedbackState {
                letter: prev,
                mastery_level: next_mastery,
            },
        };

        match self.policy.feedback(&request).await {
            Ok(()) => true,
            Err(e) => {
                warn!("Failed to send feedback: {}", e);
                false
            }
        }
    }

    /// Record the attempt, send feedback, then ask for the next target
    ///
    /// Both calls are keyed by the letter that was attempted, and feedback is
    /// always sent before `next` is requested.
    pub async fn apply_and_advance(&mut self, is_correct: bool) -> AttemptReport {
        let letter = self.state.target;
        let outcome = AttemptOutcome::new(is_correct);
        let mastery = self.tracker.apply_outcome(letter, is_correct);

        let feedback_delivered = self.send_feedback(letter, mastery, outcome.reward).await;
        let next_received = self.request_next(letter).await;

        AttemptReport {
            letter,
            outcome,
            mastery,
            feedback_delivered,
            next_received,
            next_target: self.state.target,
            attempted_at: Utc::now(),
        }
    }

    /// Move to the alphabetically next letter without asking the policy
    ///
    /// Stops at Z; returns `false` when there was nowhere to go.
    pub fn skip_to_next(&mut self) -> bool {
        match self.state.target.next() {
            Some(next) => {
                self.state.target = next;
                true
            }
            None => false,
        }
    }

    /// Forget all progress; the target returns to A
    pub fn reset(&mut self) {
        self.tracker.reset();
        self.state = CurriculumState::default();
    }
}
