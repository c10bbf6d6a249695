use std::ops::Deref;

use chrono::{DateTime, Utc};
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use serde::{Deserialize, Serialize};

use crate::model::{ballot::Ballot, mongodb::Id};

/// Core ballot data, as stored in the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BallotCore {
    pub full_name: String,
    /// Unique across all ballots.
    pub email: String,
    /// Unique across all ballots.
    pub orcid_id: String,
    pub selection_1: String,
    pub selection_2: String,
    pub selection_3: String,
    pub selection_4: String,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub timestamp: DateTime<Utc>,
}

impl From<&Ballot> for BallotCore {
    fn from(ballot: &Ballot) -> Self {
        let [selection_1, selection_2, selection_3, selection_4] =
            ballot.selection_slots().map(str::to_string);
        Self {
            full_name: ballot.full_name.clone(),
            email: ballot.email.to_string(),
            orcid_id: ballot.orcid_id.to_string(),
            selection_1,
            selection_2,
            selection_3,
            selection_4,
            timestamp: ballot.timestamp,
        }
    }
}

/// A ballot without an ID.
pub type NewBallot = BallotCore;

/// A ballot from the database, with its unique ID.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredBallot {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub ballot: BallotCore,
}

impl Deref for StoredBallot {
    type Target = BallotCore;

    fn deref(&self) -> &Self::Target {
        &self.ballot
    }
}

#[cfg(test)]
mod tests {
    use mongodb::bson::{self, Bson};

    use super::*;

    #[test]
    fn unfilled_ranks_are_stored_as_none() {
        let core = BallotCore::from(&Ballot::example());
        assert_eq!(core.orcid_id, "0000-0001-2345-6789");
        assert_eq!(core.email, "jane@x.org");
        assert_eq!(
            [
                core.selection_1.as_str(),
                core.selection_2.as_str(),
                core.selection_3.as_str(),
                core.selection_4.as_str(),
            ],
            ["A", "B", "None", "None"]
        );
    }

    #[test]
    fn timestamp_is_a_bson_datetime() {
        let doc = bson::to_document(&BallotCore::from(&Ballot::example())).unwrap();
        assert!(matches!(doc.get("timestamp"), Some(Bson::DateTime(_))));
    }
}
