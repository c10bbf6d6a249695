use log::error;
use rocket::{
    http::Status,
    response::{status, Responder},
    Request,
};
use thiserror::Error;

use crate::{
    model::ballot::{SubmissionState, ValidationError},
    store::{DuplicateField, StoreError},
};

pub type Result<T> = std::result::Result<T, Error>;

/// Why a submission did not reach the `Notified` state.
///
/// Messages are written for the voter; operator detail stays in the source.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("The provided {0} is already in use. Please check that it is correct.")]
    Duplicate(DuplicateField),
    #[error("The voting period has ended. We are no longer accepting votes.")]
    VotingClosed,
    #[error("Your vote could not be recorded because of a server error. Please try again later.")]
    Store(#[source] StoreError),
}

impl From<StoreError> for Error {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate(field) => Self::Duplicate(field),
            err => Self::Store(err),
        }
    }
}

impl Error {
    /// The terminal state a submission ends in because of this error.
    pub fn state(&self) -> SubmissionState {
        match self {
            Self::Validation(_) => SubmissionState::RejectedInvalid,
            Self::Duplicate(_) => SubmissionState::RejectedDuplicate,
            Self::VotingClosed => SubmissionState::VotingClosed,
            Self::Store(_) => SubmissionState::RecordingFailed,
        }
    }

    pub fn status(&self) -> Status {
        match self {
            Self::Validation(_) => Status::UnprocessableEntity,
            Self::Duplicate(_) => Status::Conflict,
            Self::VotingClosed => Status::Forbidden,
            Self::Store(_) => Status::InternalServerError,
        }
    }
}

impl<'r, 'o: 'r> Responder<'r, 'o> for Error {
    fn respond_to(self, req: &'r Request<'_>) -> rocket::response::Result<'o> {
        if let Self::Store(ref source) = self {
            error!("{source}");
        }
        status::Custom(self.status(), self.to_string()).respond_to(req)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicates_are_not_store_failures() {
        let err = Error::from(StoreError::Duplicate(DuplicateField::OrcidId));
        assert!(matches!(err, Error::Duplicate(DuplicateField::OrcidId)));
        assert_eq!(err.state(), SubmissionState::RejectedDuplicate);
        assert_eq!(err.status(), Status::Conflict);
        assert_eq!(
            err.to_string(),
            "The provided ORCID iD is already in use. Please check that it is correct."
        );
    }

    #[test]
    fn unavailable_store_fails_recording() {
        let io = std::io::Error::new(std::io::ErrorKind::TimedOut, "timed out");
        let err = Error::from(StoreError::Unavailable(io.into()));
        assert_eq!(err.state(), SubmissionState::RecordingFailed);
        assert_eq!(err.status(), Status::InternalServerError);
        assert!(!err.to_string().contains("timed out"));
    }

    #[test]
    fn validation_and_closing_are_client_errors() {
        let err = Error::from(ValidationError::NoFirstChoice);
        assert_eq!(err.state(), SubmissionState::RejectedInvalid);
        assert_eq!(err.status(), Status::UnprocessableEntity);
        assert_eq!(err.to_string(), ValidationError::NoFirstChoice.to_string());

        assert_eq!(Error::VotingClosed.state(), SubmissionState::VotingClosed);
        assert_eq!(Error::VotingClosed.status(), Status::Forbidden);
    }
}
