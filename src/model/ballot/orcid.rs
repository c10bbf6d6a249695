use std::{fmt::Display, ops::Deref, str::FromStr, sync::OnceLock};

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A voter's ORCID iD, in the canonical `0000-0000-0000-000X` form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct OrcidId(String);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Please enter a valid ORCID iD (e.g. 0000-0000-0000-0000), got {0:?}")]
pub struct OrcidError(pub String);

fn orcid_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\d{4}-\d{4}-\d{4}-\d{3}[0-9X]$").unwrap())
}

/// Trim, upper-case the check digit, and hyphenate a bare 16-character iD.
fn normalise(input: &str) -> String {
    let trimmed = input.trim().to_ascii_uppercase();
    if trimmed.len() == 16 && trimmed.chars().all(|c| c.is_ascii_digit() || c == 'X') {
        let mut hyphenated = String::with_capacity(19);
        for (i, c) in trimmed.chars().enumerate() {
            if i > 0 && i % 4 == 0 {
                hyphenated.push('-');
            }
            hyphenated.push(c);
        }
        hyphenated
    } else {
        trimmed
    }
}

impl FromStr for OrcidId {
    type Err = OrcidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalised = normalise(s);
        if orcid_pattern().is_match(&normalised) {
            Ok(Self(normalised))
        } else {
            Err(OrcidError(s.to_string()))
        }
    }
}

impl Deref for OrcidId {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Display for OrcidId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for OrcidId {
    type Error = OrcidError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<OrcidId> for String {
    fn from(orcid: OrcidId) -> Self {
        orcid.0
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_form_is_accepted() {
        let orcid: OrcidId = "0000-0001-2345-6789".parse().unwrap();
        assert_eq!(&*orcid, "0000-0001-2345-6789");
    }

    #[test]
    fn bare_digits_are_hyphenated() {
        let orcid: OrcidId = " 000000012345678x ".parse().unwrap();
        assert_eq!(orcid.to_string(), "0000-0001-2345-678X");
    }

    #[test]
    fn malformed_ids_are_rejected() {
        for bad in [
            "",
            "0000-0001-2345",
            "0000-0001-2345-67890",
            "0000-0001-2345-678Y",
            "X000-0001-2345-6789",
            "0000_0001_2345_6789",
        ] {
            assert_eq!(bad.parse::<OrcidId>(), Err(OrcidError(bad.to_string())));
        }
    }
}
