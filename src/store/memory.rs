//! An in-process [`BallotStore`] for tests, with switches to simulate outages.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Mutex,
};

use crate::model::{
    ballot::{Ballot, Email, OrcidId},
    db::ballot::{BallotCore, StoredBallot},
    mongodb::Id,
};

use super::{BallotStore, DuplicateField, StoreError};

pub struct MemoryStore {
    ballots: Mutex<Vec<StoredBallot>>,
    available: AtomicBool,
    inserts_fail: AtomicBool,
    blind_checks: AtomicBool,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self {
            ballots: Mutex::new(Vec::new()),
            available: AtomicBool::new(true),
            inserts_fail: AtomicBool::new(false),
            blind_checks: AtomicBool::new(false),
        }
    }
}

impl MemoryStore {
    /// Make every operation fail as if the server were unreachable.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Make only inserts fail, so existence checks still pass.
    pub fn set_inserts_fail(&self, fail: bool) {
        self.inserts_fail.store(fail, Ordering::SeqCst);
    }

    /// Make existence checks always answer "no", as if another submission
    /// had not committed yet.
    pub fn set_blind_checks(&self, blind: bool) {
        self.blind_checks.store(blind, Ordering::SeqCst);
    }

    /// A copy of everything recorded so far.
    pub fn ballots(&self) -> Vec<StoredBallot> {
        self.ballots.lock().unwrap().clone()
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(unreachable_error())
        }
    }

    fn exists(&self, matches: impl Fn(&StoredBallot) -> bool) -> Result<bool, StoreError> {
        self.check_available()?;
        if self.blind_checks.load(Ordering::SeqCst) {
            return Ok(false);
        }
        Ok(self.ballots.lock().unwrap().iter().any(matches))
    }
}

fn unreachable_error() -> StoreError {
    StoreError::Unavailable(
        std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "connection refused").into(),
    )
}

#[rocket::async_trait]
impl BallotStore for MemoryStore {
    async fn orcid_exists(&self, orcid_id: &OrcidId) -> Result<bool, StoreError> {
        self.exists(|b| b.orcid_id == **orcid_id)
    }

    async fn email_exists(&self, email: &Email) -> Result<bool, StoreError> {
        self.exists(|b| b.email == **email)
    }

    async fn insert(&self, ballot: &Ballot) -> Result<Id, StoreError> {
        self.check_available()?;
        if self.inserts_fail.load(Ordering::SeqCst) {
            return Err(unreachable_error());
        }
        let core = BallotCore::from(ballot);
        let mut ballots = self.ballots.lock().unwrap();
        if ballots.iter().any(|b| b.orcid_id == core.orcid_id) {
            return Err(StoreError::Duplicate(DuplicateField::OrcidId));
        }
        if ballots.iter().any(|b| b.email == core.email) {
            return Err(StoreError::Duplicate(DuplicateField::Email));
        }
        let id = Id::new();
        ballots.push(StoredBallot { id, ballot: core });
        Ok(id)
    }

    async fn count(&self) -> Result<u64, StoreError> {
        self.check_available()?;
        Ok(self.ballots.lock().unwrap().len() as u64)
    }
}
