use std::{fmt::Display, ops::Deref, str::FromStr, sync::OnceLock};

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A voter's email address, trimmed and lower-cased so that uniqueness
/// checks are case-insensitive.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Email(String);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Please enter a valid email address, got {0:?}")]
pub struct EmailError(pub String);

fn email_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s.]+$").unwrap())
}

impl FromStr for Email {
    type Err = EmailError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalised = s.trim().to_lowercase();
        if email_pattern().is_match(&normalised) {
            Ok(Self(normalised))
        } else {
            Err(EmailError(s.to_string()))
        }
    }
}

impl Deref for Email {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Display for Email {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Email {
    type Error = EmailError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Email> for String {
    fn from(email: Email) -> Self {
        email.0
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn addresses_are_normalised() {
        let email: Email = "  Jane.Doe@Example.ORG ".parse().unwrap();
        assert_eq!(&*email, "jane.doe@example.org");
    }

    #[test]
    fn malformed_addresses_are_rejected() {
        for bad in ["", "jane", "jane@", "@x.org", "jane@x", "ja ne@x.org", "a@b@x.org"] {
            assert!(bad.parse::<Email>().is_err(), "{bad:?} should be rejected");
        }
    }
}
