//! Connection payload sent to `POST /providers/{provider_id}/connect`.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::credentials::Credentials;
use crate::providers::{ConnectionMethod, ConnectionType, ProviderId};

/// Value of `connection_source` for every request built here.
pub const CONNECTION_SOURCE_CLI: &str = "cli";

/// Wire body of a connect call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionRequest {
    pub provider_id: ProviderId,
    pub method: ConnectionMethod,
    pub credentials: Credentials,
    pub connection_type: ConnectionType,
    pub connection_source: String,
}

/// A request paired with the idempotency key it must be sent with.
///
/// The key is generated per attempt and is never reused automatically.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedConnection {
    pub request: ConnectionRequest,
    pub idempotency_key: Uuid,
}

/// Assembles a connection request. Pure, no I/O.
pub fn build(
    provider_id: ProviderId,
    method: ConnectionMethod,
    credentials: Credentials,
    connection_type: ConnectionType,
    idempotency_key: Uuid,
) -> PreparedConnection {
    PreparedConnection {
        request: ConnectionRequest {
            provider_id,
            method,
            credentials,
            connection_type,
            connection_source: CONNECTION_SOURCE_CLI.to_string(),
        },
        idempotency_key,
    }
}

/// Fresh key for one submission attempt.
pub fn new_idempotency_key() -> Uuid {
    Uuid::new_v4()
}
