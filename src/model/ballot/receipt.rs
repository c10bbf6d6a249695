use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::mongodb::Id;

use super::{Ballot, OrcidId, SubmissionState};

/// What the voter gets back once their ballot is recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    /// Hex form of the stored record's ID.
    pub id: String,
    pub orcid_id: OrcidId,
    pub timestamp: DateTime<Utc>,
    /// Chosen candidates in rank order.
    pub selections: Vec<String>,
    pub state: SubmissionState,
}

impl Receipt {
    pub fn new(id: Id, ballot: &Ballot, state: SubmissionState) -> Self {
        Self {
            id: id.to_hex(),
            orcid_id: ballot.orcid_id.clone(),
            timestamp: ballot.timestamp,
            selections: ballot.selections().into_iter().map(str::to_string).collect(),
            state,
        }
    }
}
