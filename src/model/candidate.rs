use std::{collections::HashSet, fs::File, io::Read, path::Path};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A candidate on the ballot, identified by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub name: String,
    pub bio_url: String,
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Failed to open candidate list: {0}")]
    Io(#[from] std::io::Error),
    #[error("Malformed candidate list: {0}")]
    Csv(#[from] csv::Error),
    #[error("Candidate list line {0} needs a name and a bio URL")]
    MissingField(u64),
    #[error("Candidate {0:?} is listed more than once")]
    DuplicateName(String),
    #[error("Candidate list is empty")]
    Empty,
}

/// The fixed, ordered list of candidates voters can rank.
///
/// Loaded once at startup from a CSV file whose first row is a header and
/// whose first two columns are the candidate's name and bio URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateCatalog {
    candidates: Vec<Candidate>,
}

impl CandidateCatalog {
    /// Load the catalog from the CSV file at `path`.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        Self::from_reader(File::open(path)?)
    }

    /// Load the catalog from CSV data.
    pub fn from_reader(reader: impl Read) -> Result<Self, CatalogError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut candidates = Vec::new();
        let mut seen = HashSet::new();
        for record in reader.records() {
            let record = record?;
            let line = record.position().map(|p| p.line()).unwrap_or_default();
            let (name, bio_url) = match (record.get(0), record.get(1)) {
                (Some(name), Some(bio_url)) if !name.is_empty() => (name, bio_url),
                _ => return Err(CatalogError::MissingField(line)),
            };
            if !seen.insert(name.to_string()) {
                return Err(CatalogError::DuplicateName(name.to_string()));
            }
            candidates.push(Candidate {
                name: name.to_string(),
                bio_url: bio_url.to_string(),
            });
        }

        Self::new(candidates)
    }

    /// Build a catalog from an explicit list.
    pub fn new(candidates: Vec<Candidate>) -> Result<Self, CatalogError> {
        if candidates.is_empty() {
            return Err(CatalogError::Empty);
        }
        Ok(Self { candidates })
    }

    /// Look up a candidate by name.
    pub fn get(&self, name: &str) -> Option<&Candidate> {
        self.candidates.iter().find(|c| c.name == name)
    }

    /// All candidates, in file order.
    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }
}
