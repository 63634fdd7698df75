use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;

use authforge::auth::{CredentialHasher, ResetTokenIssuer};
use authforge::config::Config;
use authforge::otp::dispatch::{Dispatcher, LogSender};
use authforge::otp::manager::OtpManager;
use authforge::otp::store::{ChallengeStore, PgChallengeStore};
use authforge::otp::RESET_TOKEN_TTL_SECS;
use authforge::routes;
use authforge::users::PgUserDirectory;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init();

    let config = Config::from_env();

    let pool = PgPoolOptions::new()
        .max_connections(10)
        // Pool acquisition is the store-call timeout: a saturated database
        // surfaces as an error instead of hanging the request.
        .acquire_timeout(Duration::from_secs(5))
        .connect(&config.database_url)
        .await
        .expect("Failed to connect to database");

    let hasher = CredentialHasher::new(config.bcrypt_cost);
    let issuer = ResetTokenIssuer::new(&config.jwt_secret, RESET_TOKEN_TTL_SECS);
    let dispatcher = Dispatcher::new(
        Arc::new(LogSender),
        Duration::from_secs(config.send_timeout_secs),
    );

    let store = Arc::new(PgChallengeStore::new(pool.clone()));

    // One-off housekeeping; correctness never depends on it since every
    // read path checks expiry itself.
    match store.purge_expired().await {
        Ok(purged) if purged > 0 => log::info!("purged {} expired challenges", purged),
        Ok(_) => {}
        Err(err) => log::warn!("startup purge failed: {}", err),
    }

    let manager = web::Data::new(OtpManager::new(
        store,
        Arc::new(PgUserDirectory::new(pool)),
        dispatcher,
        hasher,
        issuer,
    ));

    log::info!("Starting authforge server at {}", config.server_url());
    HttpServer::new(move || {
        App::new()
            .app_data(manager.clone())
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allow_any_method()
                    .allow_any_header()
                    .max_age(3600),
            )
            .wrap(Logger::default())
            .service(routes::health::health)
            .service(web::scope("/api").configure(routes::config))
    })
    .bind((config.server_host.as_str(), config.server_port))?
    .run()
    .await
}
