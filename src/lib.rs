#![doc = "The `authforge` library crate."]
#![doc = ""]
#![doc = "This crate contains the OTP issuance/verification core that gates"]
#![doc = "password resets and account confirmation: hashed challenge storage,"]
#![doc = "delivery dispatch, attempt accounting, and the short-lived reset"]
#![doc = "credential minted after a successful verification. The main binary"]
#![doc = "(`main.rs`) wires these components onto an actix-web server."]

pub mod auth;
pub mod config;
pub mod error;
pub mod otp;
pub mod routes;
pub mod users;
