//! # Retrace Player
//!
//! Replays recordings against target surfaces.
//!
//! - [`PlaybackSession`] holds the runtime state of one replay, including
//!   its [`RetryLedger`].
//! - [`ReplayEngine`] is the state machine that steps through a session.
//! - [`PlaybackCoordinator`] owns at most one session per surface and fans
//!   status updates out to observers.

mod coordinator;
mod engine;
mod feed;
mod ledger;
mod session;

#[cfg(test)]
mod test_support;

pub use coordinator::{PlaybackCoordinator, RecordingSource, SurfaceDirectory};
pub use engine::{Control, ReplayEngine, StepOutcome};
pub use feed::{StatusFeed, StatusUpdate};
pub use ledger::RetryLedger;
pub use session::{MAX_SPEED, MIN_SPEED, PlaybackSession, compute_delay, is_valid_speed};
