//! Google Cloud helpers used by smart connect: service-account inspection,
//! the JWT-bearer token exchange, and billing/dataset auto-detection.

pub mod autodetect;
pub mod jwt;
pub mod service_account;

pub use autodetect::{AutoDetectionResult, AutoDetector};
pub use jwt::{BIGQUERY_READONLY_SCOPE, CLOUD_BILLING_READONLY_SCOPE, JwtBearerExchanger};
pub use service_account::ServiceAccountRecord;
