//! Outbound email: voter confirmations, admin summaries and operator alerts.
//!
//! Every send here is best-effort. A failed delivery is logged and reported
//! to the caller as `false`, never as an error that could undo a vote.

use std::sync::Arc;

use log::{info, warn};
use thiserror::Error;

use crate::{
    model::{ballot::Ballot, candidate::CandidateCatalog},
    store::StoreError,
};

pub use ses::SesMailer;

#[cfg(test)]
pub mod recording;
mod ses;

#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("Failed to build email: {0}")]
    Build(#[from] aws_sdk_sesv2::error::BuildError),
    #[error("Failed to send email: {0}")]
    Send(String),
    #[error("Email has no recipients")]
    NoRecipients,
}

/// The body of an email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MailBody {
    Text(String),
    Html(String),
}

impl MailBody {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Text(body) | Self::Html(body) => body,
        }
    }
}

/// A single outgoing email. The sender is fixed by the [`Mailer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mail {
    pub to: Vec<String>,
    pub subject: String,
    pub body: MailBody,
}

/// Something that can deliver mail.
#[rocket::async_trait]
pub trait Mailer: Send + Sync {
    /// Make exactly one delivery attempt.
    async fn send(&self, mail: &Mail) -> Result<(), NotificationError>;
}

/// Composes and sends every message the voting workflow produces.
#[derive(Clone)]
pub struct Notifier {
    mailer: Arc<dyn Mailer>,
    admin_mailing_list: Vec<String>,
    election_name: String,
    contact_address: String,
}

impl Notifier {
    pub fn new(
        mailer: Arc<dyn Mailer>,
        admin_mailing_list: Vec<String>,
        election_name: impl Into<String>,
        contact_address: impl Into<String>,
    ) -> Self {
        Self {
            mailer,
            admin_mailing_list,
            election_name: election_name.into(),
            contact_address: contact_address.into(),
        }
    }

    /// The confirmation sent to the voter, listing each choice with its bio.
    pub fn confirmation(&self, ballot: &Ballot, catalog: &CandidateCatalog) -> Mail {
        let selections = ballot
            .selections()
            .into_iter()
            .filter_map(|name| catalog.get(name))
            .map(|candidate| {
                let bio_url = escape_html(&candidate.bio_url);
                format!(
                    "{}: <a href=\"{bio_url}\">{bio_url}</a><br>",
                    escape_html(&candidate.name)
                )
            })
            .collect::<Vec<_>>()
            .join("\n");
        let contact = escape_html(&self.contact_address);

        let body = format!(
            "<html>\n\
             <body>\n\
             <p>Hello {name},</p>\n\
             <p>Thank you for voting in the {election}. Your vote has been recorded.</p>\n\
             <p>Your selections are as follows:<br>\n\
             {selections}</p>\n\
             <p>This is an automated message. Please do not reply to this email.</p>\n\
             <p>Best regards,<br>\n\
             <a href=\"mailto:{contact}\">{contact}</a></p>\n\
             </body>\n\
             </html>\n",
            name = escape_html(&ballot.full_name),
            election = escape_html(&self.election_name),
        );

        Mail {
            to: vec![ballot.email.to_string()],
            subject: "Voting Confirmation".to_string(),
            body: MailBody::Html(body),
        }
    }

    /// The summary of a new ballot sent to the admin mailing list.
    pub fn admin_summary(&self, ballot: &Ballot) -> Mail {
        let body = format!(
            "Hello all,\n\n\
             A new vote has been recorded in the {election}.\n\n\
             Voter details:\n\
             Full Name: {name}\n\
             Email: {email}\n\
             ORCID iD: {orcid}\n\n\
             Selections:\n\
             {selections}\n",
            election = self.election_name,
            name = ballot.full_name,
            email = ballot.email,
            orcid = ballot.orcid_id,
            selections = ballot.selections().join("\n"),
        );

        Mail {
            to: self.admin_mailing_list.clone(),
            subject: format!("New vote for the {}", self.election_name),
            body: MailBody::Text(body),
        }
    }

    /// The alert sent to the admin mailing list when the store fails.
    pub fn store_alert(&self, error: &StoreError, context: &str) -> Mail {
        let body = format!(
            "Hello all,\n\n\
             The {election} ballot store failed while {context}.\n\n\
             Error:\n\
             {error}\n\n\
             The voter was told to try again later. The ballot may not have been recorded;\n\
             check the store for their ORCID iD before asking them to resubmit.\n",
            election = self.election_name,
        );

        Mail {
            to: self.admin_mailing_list.clone(),
            subject: "Database Error".to_string(),
            body: MailBody::Text(body),
        }
    }

    /// Attempt delivery once, logging the outcome. Returns whether it succeeded.
    pub async fn send(&self, mail: Mail) -> bool {
        let result = if mail.to.is_empty() {
            Err(NotificationError::NoRecipients)
        } else {
            self.mailer.send(&mail).await
        };
        match result {
            Ok(()) => {
                info!("Sent \"{}\" to {}", mail.subject, mail.to.join(", "));
                true
            }
            Err(err) => {
                warn!(
                    "Could not send \"{}\" to {}: {err}",
                    mail.subject,
                    mail.to.join(", ")
                );
                false
            }
        }
    }

    /// Send the messages due once a ballot is recorded: the voter's
    /// confirmation if they asked for one, then the admin summary.
    pub async fn ballot_recorded(&self, ballot: &Ballot, catalog: &CandidateCatalog) {
        if ballot.send_confirmation {
            self.send(self.confirmation(ballot, catalog)).await;
        }
        self.send(self.admin_summary(ballot)).await;
    }
}

fn escape_html(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            c => escaped.push(c),
        }
    }
    escaped
}
