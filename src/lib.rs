//! # bimo
//!
//! Command-line client for the bimo gateway: device-code login, provider
//! connection (with Google service-account smart connect), and read-only
//! status, usage, and environment export.

pub mod cli;
pub mod commands;
pub mod config;
pub mod connect;
pub mod credentials;
pub mod error;
pub mod gateway;
pub mod google;
pub mod http_client;
pub mod login;
pub mod providers;
pub mod session;
pub mod telemetry;
