use rocket::Route;

mod public;
mod vote;

pub use public::ElectionStatus;

pub fn routes() -> Vec<Route> {
    let mut routes = Vec::new();
    routes.extend(public::routes());
    routes.extend(vote::routes());
    routes
}
