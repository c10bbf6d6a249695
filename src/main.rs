use log::{error, info, LevelFilter};
use rocket::Error as RocketError;

async fn run() -> Result<(), RocketError> {
    info!("Configuring server...");
    let rocket = ballot_backend::build().ignite().await?;
    info!("...server configured!");
    // Rocket's own request logging is replaced by the logger fairing.
    log4rs_dynamic_filters::DynamicLevelFilter::set("rocket", LevelFilter::Off);
    let rocket = rocket.launch().await?;
    if let Some(voting) = rocket.state::<ballot_backend::voting::VotingSystem>() {
        voting.finish_notifications().await;
    }
    Ok(())
}

#[rocket::main]
async fn main() {
    if let Err(err) =
        log4rs::init_file("log4rs.yaml", log4rs_dynamic_filters::default_deserializers())
    {
        eprintln!("Failed to initialise logging: {err}");
        std::process::exit(1)
    }
    info!("Initialised logging");

    if let Err(err) = run().await {
        error!("{err}");
        error!("Critical failure, shutting down");
        std::process::exit(1)
    }
}
