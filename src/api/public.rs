use chrono::{DateTime, Utc};
use rocket::{serde::json::Json, Route, State};
use serde::{Deserialize, Serialize};

use crate::{config::Config, model::candidate::Candidate, voting::VotingSystem};

pub fn routes() -> Vec<Route> {
    routes![candidates, status]
}

/// What a ballot page needs to render.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElectionStatus {
    pub election_name: String,
    pub voting_open: bool,
    pub voting_ends: Option<DateTime<Utc>>,
    pub candidates: Vec<Candidate>,
}

#[get("/candidates")]
fn candidates(voting: &State<VotingSystem>) -> Json<Vec<Candidate>> {
    Json(voting.catalog().candidates().to_vec())
}

#[get("/status")]
fn status(config: &State<Config>, voting: &State<VotingSystem>) -> Json<ElectionStatus> {
    Json(ElectionStatus {
        election_name: config.election_name().to_string(),
        voting_open: voting.is_open_at(Utc::now()),
        voting_ends: voting.voting_ends(),
        candidates: voting.catalog().candidates().to_vec(),
    })
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use rocket::http::Status;

    use super::*;
    use crate::{api::fake::FakeServer, model::candidate::CandidateCatalog};

    #[rocket::async_test]
    async fn candidates_in_catalog_order() {
        let server = FakeServer::start(None).await;

        let response = server.client.get("/candidates").dispatch().await;

        assert_eq!(response.status(), Status::Ok);
        let candidates = response.into_json::<Vec<Candidate>>().await.unwrap();
        assert_eq!(candidates, CandidateCatalog::example().candidates());
    }

    #[rocket::async_test]
    async fn status_while_open() {
        let server = FakeServer::start(None).await;

        let response = server.client.get("/status").dispatch().await;

        assert_eq!(response.status(), Status::Ok);
        let status = response.into_json::<ElectionStatus>().await.unwrap();
        assert_eq!(status.election_name, "Example election");
        assert!(status.voting_open);
        assert_eq!(status.voting_ends, None);
        assert_eq!(status.candidates.len(), 5);
    }

    #[rocket::async_test]
    async fn status_after_close() {
        let ends = Utc::now() - Duration::hours(1);
        let server = FakeServer::start(Some(ends)).await;

        let response = server.client.get("/status").dispatch().await;

        let status = response.into_json::<ElectionStatus>().await.unwrap();
        assert!(!status.voting_open);
        assert_eq!(status.voting_ends, Some(ends));
    }
}
