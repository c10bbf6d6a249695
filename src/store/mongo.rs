use std::{fmt::Display, time::Duration};

use log::{debug, warn};
use mongodb::{
    bson::doc,
    error::{Error as DbError, TRANSIENT_TRANSACTION_ERROR, UNKNOWN_TRANSACTION_COMMIT_RESULT},
    Client, ClientSession, Database,
};
use rocket::tokio::time::sleep;

use crate::model::{
    ballot::{Ballot, Email, OrcidId},
    db::ballot::{BallotCore, NewBallot, StoredBallot},
    mongodb::{duplicate_key_message, Coll, Id, EMAIL_INDEX},
};

use super::{BallotStore, DuplicateField, StoreError};

/// Ballots kept in the `votes` collection of a MongoDB database.
///
/// Relies on the unique indexes created by
/// [`crate::model::mongodb::ensure_indexes_exist`].
#[derive(Clone)]
pub struct MongoStore {
    client: Client,
    new_ballots: Coll<NewBallot>,
    ballots: Coll<StoredBallot>,
}

impl MongoStore {
    pub fn new(client: Client, db: &Database) -> Self {
        Self {
            client,
            new_ballots: Coll::from_db(db),
            ballots: Coll::from_db(db),
        }
    }

    /// Insert in a single transaction. A concurrent insert of the same key
    /// fails either with a duplicate key or a transient write conflict.
    async fn insert_once(&self, new_ballot: &NewBallot) -> Result<Id, StoreError> {
        // Dropping the session without committing aborts the transaction,
        // so every early return below leaves nothing behind.
        let mut session = self.client.start_session(None).await?;
        session.start_transaction(None).await?;

        let new_id: Id = self
            .new_ballots
            .insert_one_with_session(new_ballot, None, &mut session)
            .await
            .map_err(classify)?
            .inserted_id
            .as_object_id()
            .unwrap() // Valid because the ID comes directly from the DB
            .into();

        commit_until_known(&mut session, |err: &DbError| {
            err.contains_label(UNKNOWN_TRANSACTION_COMMIT_RESULT)
        })
        .await
        .map_err(classify)?;
        debug!("Committed ballot {new_id}");
        Ok(new_id)
    }
}

/// Attempts at a ballot transaction before a write conflict is reported.
const MAX_TRANSACTION_ATTEMPTS: u32 = 5;

/// Attempts at a commit whose outcome the server could not confirm.
const MAX_COMMIT_ATTEMPTS: u32 = 3;

/// A transaction that can be asked to commit, possibly more than once.
#[rocket::async_trait]
trait Commit {
    type Error: Display + Send;

    async fn commit(&mut self) -> Result<(), Self::Error>;
}

#[rocket::async_trait]
impl Commit for ClientSession {
    type Error = DbError;

    async fn commit(&mut self) -> Result<(), DbError> {
        self.commit_transaction().await
    }
}

/// Commit, retrying while `is_unknown` says the server could not tell
/// whether the previous attempt took effect. Committing again is safe: a
/// transaction that already committed reports success.
async fn commit_until_known<T, F>(transaction: &mut T, is_unknown: F) -> Result<(), T::Error>
where
    T: Commit + Send,
    F: Fn(&T::Error) -> bool + Send,
{
    let mut attempt = 1;
    loop {
        match transaction.commit().await {
            Err(err) if attempt < MAX_COMMIT_ATTEMPTS && is_unknown(&err) => {
                warn!("Commit outcome unknown, retrying: {err}");
                attempt += 1;
            }
            result => return result,
        }
    }
}

/// Turn a unique index violation into a [`StoreError::Duplicate`].
fn classify(err: DbError) -> StoreError {
    match duplicate_key_message(&err) {
        Some(message) if message.contains(EMAIL_INDEX) => {
            StoreError::Duplicate(DuplicateField::Email)
        }
        Some(_) => StoreError::Duplicate(DuplicateField::OrcidId),
        None => StoreError::Unavailable(err),
    }
}

#[rocket::async_trait]
impl BallotStore for MongoStore {
    async fn orcid_exists(&self, orcid_id: &OrcidId) -> Result<bool, StoreError> {
        let filter = doc! { "orcid_id": &**orcid_id };
        Ok(self.ballots.find_one(filter, None).await?.is_some())
    }

    async fn email_exists(&self, email: &Email) -> Result<bool, StoreError> {
        let filter = doc! { "email": &**email };
        Ok(self.ballots.find_one(filter, None).await?.is_some())
    }

    async fn insert(&self, ballot: &Ballot) -> Result<Id, StoreError> {
        let new_ballot = BallotCore::from(ballot);
        let mut attempt = 1;
        loop {
            match self.insert_once(&new_ballot).await {
                Err(StoreError::Unavailable(err))
                    if attempt < MAX_TRANSACTION_ATTEMPTS
                        && err.contains_label(TRANSIENT_TRANSACTION_ERROR) =>
                {
                    debug!("Retrying ballot transaction after transient error: {err}");
                    sleep(Duration::from_millis(20 * attempt as u64)).await;
                    attempt += 1;
                }
                result => return result,
            }
        }
    }

    async fn count(&self) -> Result<u64, StoreError> {
        Ok(self.ballots.count_documents(None, None).await?)
    }
}
