use std::path::{Path, PathBuf};
use std::sync::Arc;

use aws_config::{retry::RetryConfig, BehaviorVersion, SdkConfig};
use aws_credential_types::provider::SharedCredentialsProvider;
use aws_sdk_sesv2::{
    config::{Credentials, Region},
    Client as SesClient,
};
use chrono::{DateTime, Utc};
use log::{error, info};
use mongodb::{Client as MongoClient, Database};
use rocket::{
    fairing::{Fairing, Info, Kind},
    Build, Rocket,
};
use serde::Deserialize;

use crate::{
    archive::ResponseArchive,
    model::{candidate::CandidateCatalog, mongodb::ensure_indexes_exist},
    notify::{Notifier, SesMailer},
    store::MongoStore,
    voting::VotingSystem,
};

/// Election configuration, derived from `Rocket.toml` and `ROCKET_*`
/// environment variables. This struct becomes managed state.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    election_name: String,
    contact_address: String,
    admin_mailing_list: Vec<String>,
    #[serde(default)]
    voting_ends: Option<DateTime<Utc>>,
    #[serde(default = "default_candidates_file")]
    candidates_file: PathBuf,
    #[serde(default = "default_responses_dir")]
    responses_dir: PathBuf,
}

fn default_candidates_file() -> PathBuf {
    PathBuf::from("data/candidates.csv")
}

fn default_responses_dir() -> PathBuf {
    PathBuf::from("data/responses")
}

impl Config {
    /// Name of the election, used in page data and email text.
    pub fn election_name(&self) -> &str {
        &self.election_name
    }

    /// Address voters are told to contact with questions.
    pub fn contact_address(&self) -> &str {
        &self.contact_address
    }

    /// Recipients of vote summaries and operator alerts.
    pub fn admin_mailing_list(&self) -> &[String] {
        &self.admin_mailing_list
    }

    /// When voting closes. `None` keeps voting open indefinitely.
    pub fn voting_ends(&self) -> Option<DateTime<Utc>> {
        self.voting_ends
    }

    /// CSV of `name,bio_url` rows, with a header.
    pub fn candidates_file(&self) -> &Path {
        &self.candidates_file
    }

    /// Directory receiving one CSV per recorded ballot.
    pub fn responses_dir(&self) -> &Path {
        &self.responses_dir
    }
}

/// A fairing that loads the election config and puts it in managed state.
pub struct ConfigFairing;

#[rocket::async_trait]
impl Fairing for ConfigFairing {
    fn info(&self) -> Info {
        Info {
            name: "Config",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, rocket: Rocket<Build>) -> rocket::fairing::Result {
        let config = match rocket.figment().extract::<Config>() {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load election config");
                rocket::config::pretty_print_error(e);
                return Err(rocket);
            }
        };
        match config.voting_ends {
            Some(ends) => info!("Voting in the {} closes at {ends}", config.election_name),
            None => info!("Voting in the {} has no closing time", config.election_name),
        }

        Ok(rocket.manage(config))
    }
}

/// Configuration for the database.
#[derive(Deserialize)]
struct DbConfig {
    // non-secrets
    #[serde(default = "default_db_name")]
    db_name: String,
    // secrets
    db_uri: String,
}

fn default_db_name() -> String {
    "ballots".to_string()
}

/// A fairing that connects to MongoDB, ensures the ballot indexes exist, and
/// places both a `Client` and a `Database` into managed state.
pub struct DatabaseFairing;

#[rocket::async_trait]
impl Fairing for DatabaseFairing {
    fn info(&self) -> Info {
        Info {
            name: "MongoDB",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, rocket: Rocket<Build>) -> rocket::fairing::Result {
        let config = match rocket.figment().extract::<DbConfig>() {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load database config");
                rocket::config::pretty_print_error(e);
                return Err(rocket);
            }
        };
        info!("Loaded database config, connecting...");
        let client = match MongoClient::with_uri_str(config.db_uri).await {
            Ok(client) => client,
            Err(e) => {
                error!("Failed to connect to database: {e}");
                return Err(rocket);
            }
        };
        let db = client.database(&database_name(config.db_name));

        if let Err(e) = ensure_indexes_exist(&db).await {
            error!("Failed to create ballot indexes: {e}");
            return Err(rocket);
        }
        info!("...database connection online!");

        Ok(rocket.manage(client).manage(db))
    }
}

/// The configured database name.
#[cfg(not(test))]
fn database_name(configured: String) -> String {
    configured
}

/// A random database name, so concurrent tests never share ballots.
#[cfg(test)]
fn database_name(configured: String) -> String {
    let random: u32 = rand::random();
    let db = format!("{configured}_test{random}");
    info!("Using database {db}");
    db
}

/// Configuration for sending mail through Amazon SES.
#[derive(Deserialize)]
struct MailConfig {
    // non-secrets
    aws_region: String,
    aws_access_key_id: String,
    sender_address: String,
    // secrets
    aws_secret_access_key: String,
}

/// A fairing that loads the AWS config and places an [`SesMailer`] into
/// managed state.
pub struct MailFairing;

#[rocket::async_trait]
impl Fairing for MailFairing {
    fn info(&self) -> Info {
        Info {
            name: "Amazon SES",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, rocket: Rocket<Build>) -> rocket::fairing::Result {
        let config = match rocket.figment().extract::<MailConfig>() {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load mail config");
                rocket::config::pretty_print_error(e);
                return Err(rocket);
            }
        };
        let aws_config = ses_sdk_config(&config);
        let mailer = SesMailer::new(SesClient::new(&aws_config), config.sender_address);
        info!("Loaded Amazon SES config");

        Ok(rocket.manage(mailer))
    }
}

/// SDK settings for SES. The SDK's own retries are off: every message gets
/// exactly one delivery attempt.
fn ses_sdk_config(config: &MailConfig) -> SdkConfig {
    SdkConfig::builder()
        .region(Region::new(config.aws_region.clone()))
        .credentials_provider(SharedCredentialsProvider::new(Credentials::new(
            config.aws_access_key_id.clone(),
            config.aws_secret_access_key.clone(),
            None,
            None,
            "rocket config",
        )))
        .retry_config(RetryConfig::disabled())
        .behavior_version(BehaviorVersion::latest())
        .build()
}

/// A fairing that loads the candidate catalog and assembles the
/// [`VotingSystem`] from the state managed by the fairings before it.
///
/// Must be attached after [`ConfigFairing`], [`DatabaseFairing`] and
/// [`MailFairing`].
pub struct VotingFairing;

#[rocket::async_trait]
impl Fairing for VotingFairing {
    fn info(&self) -> Info {
        Info {
            name: "Voting",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, rocket: Rocket<Build>) -> rocket::fairing::Result {
        match voting_system(&rocket) {
            Some(system) => Ok(rocket.manage(system)),
            None => Err(rocket),
        }
    }
}

fn voting_system(rocket: &Rocket<Build>) -> Option<VotingSystem> {
    let (Some(config), Some(client), Some(db), Some(mailer)) = (
        rocket.state::<Config>(),
        rocket.state::<MongoClient>(),
        rocket.state::<Database>(),
        rocket.state::<SesMailer>(),
    ) else {
        error!("Voting needs the config, database and mail fairings attached first");
        return None;
    };

    let catalog = match CandidateCatalog::from_path(config.candidates_file()) {
        Ok(catalog) => catalog,
        Err(e) => {
            error!(
                "Failed to load candidates from {}: {e}",
                config.candidates_file().display()
            );
            return None;
        }
    };
    info!(
        "Loaded {} candidates from {}",
        catalog.candidates().len(),
        config.candidates_file().display()
    );

    let notifier = Notifier::new(
        Arc::new(mailer.clone()),
        config.admin_mailing_list().to_vec(),
        config.election_name(),
        config.contact_address(),
    );
    Some(VotingSystem::new(
        Arc::new(catalog),
        Arc::new(MongoStore::new(client.clone(), db)),
        ResponseArchive::new(config.responses_dir()),
        notifier,
        config.voting_ends(),
    ))
}

/// Example data for tests.
#[cfg(test)]
mod examples {
    use super::*;

    impl Config {
        pub fn example() -> Self {
            Self {
                election_name: "Example election".to_string(),
                contact_address: "info@x.org".to_string(),
                admin_mailing_list: vec!["admin1@x.org".to_string(), "admin2@x.org".to_string()],
                voting_ends: None,
                candidates_file: default_candidates_file(),
                responses_dir: default_responses_dir(),
            }
        }
    }
}
