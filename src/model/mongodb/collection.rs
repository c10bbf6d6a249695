use std::ops::Deref;

use log::debug;
use mongodb::{
    bson::doc, error::Error as DbError, options::IndexOptions, Collection, Database, IndexModel,
};

use crate::model::db::ballot::{NewBallot, StoredBallot};

/// A type that can be directly inserted/read to/from the database.
pub trait MongoCollection {
    /// The name of the collection.
    const NAME: &'static str;
}

/// A database collection of the given type.
pub struct Coll<T>(Collection<T>);

impl<T> Coll<T>
where
    T: MongoCollection,
{
    /// Get a handle on this collection in the given database.
    pub fn from_db(db: &Database) -> Self {
        Self(db.collection(T::NAME))
    }
}

// `Derive(Clone)` would only derive if `T: Clone`, but we don't need that bound.
impl<T> Clone for Coll<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T> Deref for Coll<T> {
    type Target = Collection<T>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

// Ballot collections
const VOTES: &str = "votes";
impl MongoCollection for NewBallot {
    const NAME: &'static str = VOTES;
}
impl MongoCollection for StoredBallot {
    const NAME: &'static str = VOTES;
}

/// Name of the unique index over ORCID iDs.
pub const ORCID_INDEX: &str = "orcid_id_unique";
/// Name of the unique index over email addresses.
pub const EMAIL_INDEX: &str = "email_unique";

/// Ensure that all the required indexes exist on the given database.
///
/// The two unique indexes are what guarantee at most one ballot per ORCID iD
/// and per email address, even when submissions race each other.
///
/// This operation is idempotent.
pub async fn ensure_indexes_exist(db: &Database) -> Result<(), DbError> {
    debug!("Ensuring collection indexes exist");

    let votes = Coll::<StoredBallot>::from_db(db);

    let orcid_index = IndexModel::builder()
        .keys(doc! {"orcid_id": 1})
        .options(
            IndexOptions::builder()
                .unique(true)
                .name(ORCID_INDEX.to_string())
                .build(),
        )
        .build();
    votes.create_index(orcid_index, None).await?;

    let email_index = IndexModel::builder()
        .keys(doc! {"email": 1})
        .options(
            IndexOptions::builder()
                .unique(true)
                .name(EMAIL_INDEX.to_string())
                .build(),
        )
        .build();
    votes.create_index(email_index, None).await?;

    Ok(())
}
