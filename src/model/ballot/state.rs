use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// Where a single submission has got to.
///
/// The happy path is `Received → Validated → DuplicateChecked → Recorded →
/// Notified`. Every other variant is an early end. `Notified` means the
/// notifications were handed off for delivery, not that they arrived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionState {
    Received,
    Validated,
    DuplicateChecked,
    Recorded,
    Notified,
    RejectedInvalid,
    RejectedDuplicate,
    VotingClosed,
    RecordingFailed,
}

impl SubmissionState {
    /// No further transitions happen from a terminal state.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Notified
                | Self::RejectedInvalid
                | Self::RejectedDuplicate
                | Self::VotingClosed
                | Self::RecordingFailed
        )
    }
}

impl Display for SubmissionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Received => "received",
            Self::Validated => "validated",
            Self::DuplicateChecked => "duplicate-checked",
            Self::Recorded => "recorded",
            Self::Notified => "notified",
            Self::RejectedInvalid => "rejected-invalid",
            Self::RejectedDuplicate => "rejected-duplicate",
            Self::VotingClosed => "voting-closed",
            Self::RecordingFailed => "recording-failed",
        };
        f.write_str(name)
    }
}
