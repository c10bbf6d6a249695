//! Redundant per-voter CSV copies of recorded ballots.

use std::{fs, path::PathBuf};

use thiserror::Error;

use crate::model::ballot::Ballot;

/// Column headers of every response file.
pub const HEADER: [&str; 7] = [
    "FullName", "Email", "ORCIDiD", "Pref1", "Pref2", "Pref3", "Pref4",
];

/// Timestamp layout used in response file names.
pub const FILE_TIMESTAMP_FORMAT: &str = "%Y.%m.%d_%H.%M.%S";

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("Failed to write response file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to write response file: {0}")]
    Csv(#[from] csv::Error),
}

/// A directory holding one `<orcid_id>_<timestamp>.csv` file per ballot.
#[derive(Debug, Clone)]
pub struct ResponseArchive {
    dir: PathBuf,
}

impl ResponseArchive {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The path the given ballot is written to.
    pub fn path_for(&self, ballot: &Ballot) -> PathBuf {
        let timestamp = ballot.timestamp.format(FILE_TIMESTAMP_FORMAT);
        self.dir.join(format!("{}_{timestamp}.csv", ballot.orcid_id))
    }

    /// Write the ballot's response file, creating the directory if needed.
    pub fn write(&self, ballot: &Ballot) -> Result<PathBuf, ArchiveError> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(ballot);

        let mut writer = csv::Writer::from_path(&path)?;
        writer.write_record(HEADER)?;
        let [pref_1, pref_2, pref_3, pref_4] = ballot.selection_slots();
        writer.write_record([
            ballot.full_name.as_str(),
            &*ballot.email,
            &*ballot.orcid_id,
            pref_1,
            pref_2,
            pref_3,
            pref_4,
        ])?;
        writer.flush()?;

        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    #[test]
    fn file_is_named_by_orcid_and_time() {
        let archive = ResponseArchive::new("/srv/responses");
        let ballot = Ballot {
            timestamp: Utc.with_ymd_and_hms(2024, 3, 7, 9, 5, 1).unwrap(),
            ..Ballot::example()
        };
        assert_eq!(
            archive.path_for(&ballot),
            std::path::Path::new("/srv/responses/0000-0001-2345-6789_2024.03.07_09.05.01.csv")
        );
    }

    #[test]
    fn written_file_has_header_and_row() {
        let dir = tempfile::tempdir().unwrap();
        let archive = ResponseArchive::new(dir.path().join("nested"));

        let path = archive.write(&Ballot::example()).unwrap();

        let contents = fs::read_to_string(path).unwrap();
        assert_eq!(
            contents,
            "FullName,Email,ORCIDiD,Pref1,Pref2,Pref3,Pref4\n\
             Jane Doe,jane@x.org,0000-0001-2345-6789,A,B,None,None\n"
        );
    }

    #[test]
    fn unwritable_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        fs::write(&blocker, "").unwrap();

        let archive = ResponseArchive::new(blocker.join("responses"));
        assert!(matches!(
            archive.write(&Ballot::example()),
            Err(ArchiveError::Io(_))
        ));
    }
}
