pub mod auth;
pub mod health;

use actix_web::web;

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/auth")
            .service(auth::send_otp)
            .service(auth::verify_otp)
            .service(auth::reset_password),
    );
}
