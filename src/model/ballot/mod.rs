use chrono::{DateTime, Utc};

pub use email::{Email, EmailError};
pub use form::{BallotForm, ValidationError};
pub use orcid::{OrcidError, OrcidId};
pub use receipt::Receipt;
pub use state::SubmissionState;

mod email;
mod form;
mod orcid;
mod receipt;
mod state;

/// How many ranks a ballot has.
pub const MAX_SELECTIONS: usize = 4;

/// Placeholder for an unfilled rank, both on the form and in storage.
pub const NO_SELECTION: &str = "None";

/// One voter's validated submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ballot {
    pub full_name: String,
    pub email: Email,
    pub orcid_id: OrcidId,
    /// The candidate chosen at each rank, as submitted. The first rank is
    /// always filled and no candidate appears twice.
    pub ranks: [Option<String>; MAX_SELECTIONS],
    pub timestamp: DateTime<Utc>,
    pub send_confirmation: bool,
}

impl Ballot {
    /// The chosen candidates in rank order, skipping unfilled ranks.
    pub fn selections(&self) -> Vec<&str> {
        self.ranks.iter().flatten().map(String::as_str).collect()
    }

    /// Every rank in position, with [`NO_SELECTION`] where none was chosen.
    pub fn selection_slots(&self) -> [&str; MAX_SELECTIONS] {
        let mut slots = [NO_SELECTION; MAX_SELECTIONS];
        for (slot, rank) in slots.iter_mut().zip(&self.ranks) {
            if let Some(name) = rank {
                *slot = name.as_str();
            }
        }
        slots
    }
}

/// Example data for tests.
#[cfg(test)]
mod examples {
    use super::*;
    use crate::model::candidate::CandidateCatalog;

    impl Ballot {
        pub fn example() -> Self {
            BallotForm::example()
                .validate(&CandidateCatalog::example(), Utc::now())
                .unwrap()
        }

        pub fn example2() -> Self {
            BallotForm::example2()
                .validate(&CandidateCatalog::example(), Utc::now())
                .unwrap()
        }
    }
}
