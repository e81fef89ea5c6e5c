//! Recognition of landmark snapshots by the external service
//!
//! - `client`: `/api/verify-sign` wire types and [`RecognitionService`]
//! - `poller`: the fixed-interval poll task

pub mod client;
pub mod poller;

pub use client::{HttpRecognitionClient, RecognitionService, VerifySignRequest, VerifySignResponse};
pub use poller::{InferencePoller, RecognitionCallback, TickOutcome, DEFAULT_POLL_INTERVAL_MS};
