//! Persistent storage of ballots, and the duplicate checks run against it.

use std::fmt::Display;

use mongodb::error::Error as DbError;
use thiserror::Error;

use crate::model::{
    ballot::{Ballot, Email, OrcidId},
    mongodb::Id,
};

pub use mongo::MongoStore;

#[cfg(test)]
pub mod memory;
mod mongo;

/// Which unique identifier collided with an existing ballot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuplicateField {
    OrcidId,
    Email,
}

impl Display for DuplicateField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OrcidId => f.write_str("ORCID iD"),
            Self::Email => f.write_str("email address"),
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Ballot store unavailable: {0}")]
    Unavailable(#[from] DbError),
    #[error("The provided {0} is already in use")]
    Duplicate(DuplicateField),
}

/// Where ballots are kept.
///
/// Implementations must enforce uniqueness of both the ORCID iD and the
/// email address at insert time: two concurrent inserts with the same
/// identifier must not both succeed, whatever the existence checks said.
#[rocket::async_trait]
pub trait BallotStore: Send + Sync {
    /// Whether a ballot with this ORCID iD has been recorded.
    async fn orcid_exists(&self, orcid_id: &OrcidId) -> Result<bool, StoreError>;

    /// Whether a ballot with this email address has been recorded.
    async fn email_exists(&self, email: &Email) -> Result<bool, StoreError>;

    /// Durably record the ballot, returning its new ID.
    ///
    /// Fails with [`StoreError::Duplicate`] on a uniqueness violation.
    async fn insert(&self, ballot: &Ballot) -> Result<Id, StoreError>;

    /// Number of recorded ballots.
    async fn count(&self) -> Result<u64, StoreError>;
}

/// Refuse the ballot if its ORCID iD or email address is already recorded.
///
/// The ORCID iD is checked first. A store failure is returned as is and must
/// not be read as "no duplicate".
pub async fn check_duplicates(store: &dyn BallotStore, ballot: &Ballot) -> Result<(), StoreError> {
    if store.orcid_exists(&ballot.orcid_id).await? {
        return Err(StoreError::Duplicate(DuplicateField::OrcidId));
    }
    if store.email_exists(&ballot.email).await? {
        return Err(StoreError::Duplicate(DuplicateField::Email));
    }
    Ok(())
}
