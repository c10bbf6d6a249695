use std::collections::HashSet;

use chrono::{DateTime, Utc};
use rocket::FromForm;
use thiserror::Error;

use crate::model::candidate::CandidateCatalog;

use super::{Ballot, Email, EmailError, OrcidError, OrcidId, MAX_SELECTIONS, NO_SELECTION};

/// Reasons a submitted form is refused before anything is written.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Please enter your full name")]
    MissingName,
    #[error("Your name must not contain line breaks or other control characters")]
    InvalidName,
    #[error(transparent)]
    Email(#[from] EmailError),
    #[error(transparent)]
    Orcid(#[from] OrcidError),
    #[error("Please select a candidate for your first choice")]
    NoFirstChoice,
    #[error("{0:?} is not a candidate in this election")]
    UnknownCandidate(String),
    #[error("{0:?} is ranked more than once")]
    RepeatedCandidate(String),
}

/// The raw voting form, as posted by the browser.
///
/// Fields are kept as plain strings so that every format check happens in
/// [`BallotForm::validate`] and produces a message fit for the voter.
#[derive(Debug, Clone, Default, FromForm)]
pub struct BallotForm {
    pub full_name: String,
    pub email: String,
    pub orcid_id: String,
    pub selection_1: Option<String>,
    pub selection_2: Option<String>,
    pub selection_3: Option<String>,
    pub selection_4: Option<String>,
    /// Whether the voter wants a confirmation email.
    pub send_email: bool,
}

impl BallotForm {
    /// Check every field and build the ballot, stamped with `timestamp`.
    ///
    /// Unfilled ranks (empty or `None`) stay empty in place, so a ballot
    /// ranking A first and C fourth is stored exactly that way.
    pub fn validate(
        self,
        catalog: &CandidateCatalog,
        timestamp: DateTime<Utc>,
    ) -> Result<Ballot, ValidationError> {
        let full_name = self.full_name.trim();
        if full_name.is_empty() {
            return Err(ValidationError::MissingName);
        }
        if full_name.chars().any(char::is_control) {
            return Err(ValidationError::InvalidName);
        }
        let email: Email = self.email.parse()?;
        let orcid_id: OrcidId = self.orcid_id.parse()?;

        let first = self.selection_1.as_deref().map(str::trim).unwrap_or_default();
        if first.is_empty() || first == NO_SELECTION {
            return Err(ValidationError::NoFirstChoice);
        }

        let mut ranks: [Option<String>; MAX_SELECTIONS] = Default::default();
        let mut seen = HashSet::new();
        let submitted = [
            &self.selection_1,
            &self.selection_2,
            &self.selection_3,
            &self.selection_4,
        ];
        for (rank, submitted) in ranks.iter_mut().zip(submitted) {
            let name = submitted.as_deref().map(str::trim).unwrap_or_default();
            if name.is_empty() || name == NO_SELECTION {
                continue;
            }
            let candidate = catalog
                .get(name)
                .ok_or_else(|| ValidationError::UnknownCandidate(name.to_string()))?;
            if !seen.insert(candidate.name.as_str()) {
                return Err(ValidationError::RepeatedCandidate(name.to_string()));
            }
            *rank = Some(candidate.name.clone());
        }

        Ok(Ballot {
            full_name: full_name.to_string(),
            email,
            orcid_id,
            ranks,
            timestamp,
            send_confirmation: self.send_email,
        })
    }
}

/// Example data for tests.
#[cfg(test)]
mod examples {
    use super::*;

    impl BallotForm {
        /// Jane Doe ranking A then B, leaving the last two ranks empty.
        pub fn example() -> Self {
            Self {
                full_name: "Jane Doe".to_string(),
                email: "jane@x.org".to_string(),
                orcid_id: "0000-0001-2345-6789".to_string(),
                selection_1: Some("A".to_string()),
                selection_2: Some("B".to_string()),
                selection_3: Some(NO_SELECTION.to_string()),
                selection_4: Some(NO_SELECTION.to_string()),
                send_email: true,
            }
        }

        /// A second, unrelated voter.
        pub fn example2() -> Self {
            Self {
                full_name: "John Roe".to_string(),
                email: "john@y.org".to_string(),
                orcid_id: "0000-0002-9876-543X".to_string(),
                selection_1: Some("C".to_string()),
                selection_2: Some("A".to_string()),
                selection_3: Some("E".to_string()),
                selection_4: Some("D".to_string()),
                send_email: false,
            }
        }
    }
}
