use rocket::{form::Form, serde::json::Json, Route, State};

use crate::{error::Result, model::ballot::{BallotForm, Receipt}, voting::VotingSystem};

pub fn routes() -> Vec<Route> {
    routes![vote]
}

#[post("/", data = "<form>")]
async fn vote(form: Form<BallotForm>, voting: &State<VotingSystem>) -> Result<Json<Receipt>> {
    let receipt = voting.submit(form.into_inner()).await?;
    Ok(Json(receipt))
}
