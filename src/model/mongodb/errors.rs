//! Server error codes the store needs to recognise.

use mongodb::error::{Error as DbError, ErrorKind, WriteFailure};

pub const DUPLICATE_KEY: i32 = 11000;

/// If the given error is a duplicate key violation, return the server's
/// message for it, which names the violated index.
pub fn duplicate_key_message(err: &DbError) -> Option<&str> {
    match *err.kind {
        ErrorKind::Write(WriteFailure::WriteError(ref e)) if e.code == DUPLICATE_KEY => {
            Some(&e.message)
        }
        ErrorKind::Command(ref e) if e.code == DUPLICATE_KEY => Some(&e.message),
        _ => None,
    }
}
