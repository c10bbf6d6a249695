#[macro_use]
extern crate rocket;

#[cfg(test)]
#[macro_use]
extern crate backend_test;

use rocket::{Build, Rocket};

use config::{Config, ConfigFairing, DatabaseFairing, MailFairing, VotingFairing};
use logging::LoggerFairing;
use voting::VotingSystem;

pub mod api;
pub mod archive;
pub mod config;
pub mod error;
pub mod logging;
pub mod model;
pub mod notify;
pub mod store;
pub mod voting;

/// Build the server from `Rocket.toml` and `ROCKET_*` variables. The
/// fairings connect to MongoDB and SES and load the candidates when the
/// server ignites.
pub fn build() -> Rocket<Build> {
    rocket::build()
        .attach(LoggerFairing)
        .attach(ConfigFairing)
        .attach(DatabaseFairing)
        .attach(MailFairing)
        .attach(VotingFairing)
        .mount("/", api::routes())
}

/// Build the server around an already assembled voting system.
pub fn rocket_for(config: Config, voting: VotingSystem) -> Rocket<Build> {
    rocket::build()
        .attach(LoggerFairing)
        .manage(config)
        .manage(voting)
        .mount("/", api::routes())
}

/// A server over the database `db`, recording mail instead of sending it.
#[cfg(test)]
pub(crate) async fn rocket_for_db(
    db_client: mongodb::Client,
    db: &mongodb::Database,
    responses: &std::path::Path,
) -> Rocket<Build> {
    use std::sync::Arc;

    use crate::{
        archive::ResponseArchive,
        model::{candidate::CandidateCatalog, mongodb::ensure_indexes_exist},
        notify::{recording::RecordingMailer, Notifier},
        store::MongoStore,
    };

    ensure_indexes_exist(db).await.unwrap();
    let voting = VotingSystem::new(
        Arc::new(CandidateCatalog::example()),
        Arc::new(MongoStore::new(db_client, db)),
        ResponseArchive::new(responses),
        Notifier::example(Arc::new(RecordingMailer::default())),
        None,
    );
    rocket_for(Config::example(), voting)
}
