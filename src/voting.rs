//! The vote submission workflow.
//!
//! A submission moves `Received → Validated → DuplicateChecked → Recorded →
//! Notified`. Validation failures, duplicates and a closed voting period end
//! it early with no side effects. A store failure ends it in
//! `RecordingFailed` and alerts operators.
//!
//! Mail is delivered on background tasks so a slow mail service never holds
//! up the voter's receipt. [`VotingSystem::finish_notifications`] waits for
//! any deliveries still in flight.

use std::{
    future::Future,
    sync::{Arc, Mutex, PoisonError},
};

use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};
use rocket::tokio::{self, task::JoinHandle};

use crate::{
    archive::ResponseArchive,
    error::{Error, Result},
    logging::VOTE_LOG_TARGET,
    model::{
        ballot::{Ballot, BallotForm, Receipt, SubmissionState},
        candidate::CandidateCatalog,
        mongodb::Id,
    },
    notify::Notifier,
    store::{check_duplicates, BallotStore, StoreError},
};

/// Everything a submission needs, constructed once at startup.
pub struct VotingSystem {
    catalog: Arc<CandidateCatalog>,
    store: Arc<dyn BallotStore>,
    archive: ResponseArchive,
    notifier: Notifier,
    voting_ends: Option<DateTime<Utc>>,
    pending_mail: Mutex<Vec<JoinHandle<()>>>,
}

impl VotingSystem {
    pub fn new(
        catalog: Arc<CandidateCatalog>,
        store: Arc<dyn BallotStore>,
        archive: ResponseArchive,
        notifier: Notifier,
        voting_ends: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            catalog,
            store,
            archive,
            notifier,
            voting_ends,
            pending_mail: Mutex::new(Vec::new()),
        }
    }

    pub fn catalog(&self) -> &CandidateCatalog {
        &self.catalog
    }

    /// When voting closes, if ever.
    pub fn voting_ends(&self) -> Option<DateTime<Utc>> {
        self.voting_ends
    }

    /// Whether ballots are accepted at `now`.
    pub fn is_open_at(&self, now: DateTime<Utc>) -> bool {
        self.voting_ends.map_or(true, |ends| now < ends)
    }

    /// Run a submission received now.
    pub async fn submit(&self, form: BallotForm) -> Result<Receipt> {
        self.submit_at(form, Utc::now()).await
    }

    /// Run a submission received at `now`.
    pub async fn submit_at(&self, form: BallotForm, now: DateTime<Utc>) -> Result<Receipt> {
        let result = self.run(form, now).await;
        if let Err(ref err) = result {
            match err.state() {
                SubmissionState::RecordingFailed => error!("Submission failed: {err}"),
                state => warn!("Submission ended {state}: {err}"),
            }
        }
        result
    }

    async fn run(&self, form: BallotForm, now: DateTime<Utc>) -> Result<Receipt> {
        let mut state = SubmissionState::Received;
        debug!("Received submission for ORCID iD {:?}", form.orcid_id);

        if !self.is_open_at(now) {
            return Err(Error::VotingClosed);
        }

        let ballot = form.validate(&self.catalog, now)?;
        advance(&mut state, SubmissionState::Validated, &ballot);

        if let Err(err) = check_duplicates(&*self.store, &ballot).await {
            return Err(self.store_failure(err, "checking for duplicates"));
        }
        advance(&mut state, SubmissionState::DuplicateChecked, &ballot);

        let id = self.record(&ballot).await?;
        advance(&mut state, SubmissionState::Recorded, &ballot);

        let notifier = self.notifier.clone();
        let catalog = self.catalog.clone();
        let recorded = ballot.clone();
        self.dispatch(async move { notifier.ballot_recorded(&recorded, &catalog).await });
        advance(&mut state, SubmissionState::Notified, &ballot);

        Ok(Receipt::new(id, &ballot, state))
    }

    /// Store the ballot, then write its response file and audit line.
    ///
    /// Only the store write can fail the submission; the response file is
    /// written after commit and a failure there is logged.
    async fn record(&self, ballot: &Ballot) -> Result<Id> {
        let id = match self.store.insert(ballot).await {
            Ok(id) => id,
            Err(err) => return Err(self.store_failure(err, "recording a ballot")),
        };

        match self.archive.write(ballot) {
            Ok(path) => debug!("Wrote response file {}", path.display()),
            Err(err) => error!(
                "Ballot {id} is stored but its response file is missing: {err}"
            ),
        }

        match audit_record(&id, ballot) {
            Ok(record) => info!(target: VOTE_LOG_TARGET, "{record}"),
            Err(err) => error!("Ballot {id} is stored but has no audit record: {err}"),
        }

        Ok(id)
    }

    /// Convert a store error for the caller, alerting operators unless it is
    /// just a duplicate.
    fn store_failure(&self, err: StoreError, context: &str) -> Error {
        if let StoreError::Unavailable(_) = err {
            let notifier = self.notifier.clone();
            let alert = notifier.store_alert(&err, context);
            self.dispatch(async move {
                notifier.send(alert).await;
            });
        }
        err.into()
    }

    /// Deliver mail in the background, keeping hold of the task so shutdown
    /// can wait for it.
    fn dispatch(&self, delivery: impl Future<Output = ()> + Send + 'static) {
        let handle = tokio::spawn(delivery);
        let mut pending = self
            .pending_mail
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        pending.retain(|task| !task.is_finished());
        pending.push(handle);
    }

    /// Wait for every notification dispatched so far to finish.
    pub async fn finish_notifications(&self) {
        let pending = std::mem::take(
            &mut *self
                .pending_mail
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        );
        if !pending.is_empty() {
            info!("Waiting for {} notification task(s)", pending.len());
        }
        for task in pending {
            if let Err(err) = task.await {
                error!("Notification task failed: {err}");
            }
        }
    }
}

/// One CSV row for the vote audit log: ID, name, email, ORCID iD and the
/// four rank slots, quoted wherever a field needs it.
fn audit_record(id: &Id, ballot: &Ballot) -> std::result::Result<String, csv::Error> {
    let mut writer = csv::Writer::from_writer(Vec::<u8>::new());
    let id = id.to_string();
    let [pref_1, pref_2, pref_3, pref_4] = ballot.selection_slots();
    writer.write_record([
        id.as_str(),
        ballot.full_name.as_str(),
        &*ballot.email,
        &*ballot.orcid_id,
        pref_1,
        pref_2,
        pref_3,
        pref_4,
    ])?;
    let bytes = writer
        .into_inner()
        .map_err(|err| csv::Error::from(err.into_error()))?;
    Ok(String::from_utf8_lossy(&bytes)
        .trim_end_matches(['\r', '\n'])
        .to_string())
}

fn advance(state: &mut SubmissionState, next: SubmissionState, ballot: &Ballot) {
    debug_assert!(!state.is_terminal(), "no transitions out of {state}");
    debug!("Submission {}: {state} -> {next}", ballot.orcid_id);
    *state = next;
}

/// Example data for tests.
#[cfg(test)]
pub(crate) mod examples {
    use std::path::Path;

    use super::*;
    use crate::{notify::recording::RecordingMailer, store::memory::MemoryStore};

    impl VotingSystem {
        /// A system over the example catalog, writing responses under `dir`.
        pub fn example(
            store: Arc<MemoryStore>,
            mailer: Arc<RecordingMailer>,
            dir: &Path,
            voting_ends: Option<DateTime<Utc>>,
        ) -> Self {
            Self::new(
                Arc::new(CandidateCatalog::example()),
                store,
                ResponseArchive::new(dir),
                Notifier::example(mailer),
                voting_ends,
            )
        }
    }
}
