//! Provider identity types
//!
//! Canonical provider ids, alias normalization, and the enums that travel
//! in a connection request.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Canonical provider key sent to the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ProviderId {
    OpenAi,
    Claude,
    Gemini,
    Gcp,
    Azure,
    /// Any other provider, carried as its lowercased input.
    Other(String),
}

impl ProviderId {
    /// Normalizes a user-supplied provider name or alias.
    ///
    /// Total: every input maps to some id, unknown names pass through
    /// trimmed and lowercased.
    pub fn normalize(input: &str) -> Self {
        let alias = input.trim().to_lowercase();
        match alias.as_str() {
            "openai" => ProviderId::OpenAi,
            "claude" | "anthropic" => ProviderId::Claude,
            "gemini" | "vertex" | "google" => ProviderId::Gemini,
            "gcp" | "google-cloud" => ProviderId::Gcp,
            "azure" => ProviderId::Azure,
            _ => ProviderId::Other(alias),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ProviderId::OpenAi => "openai",
            ProviderId::Claude => "claude",
            ProviderId::Gemini => "gemini",
            ProviderId::Gcp => "gcp",
            ProviderId::Azure => "azure",
            ProviderId::Other(id) => id,
        }
    }

    /// Providers whose billing connection can be backed by a Google service account.
    pub fn is_google(&self) -> bool {
        matches!(self, ProviderId::Gemini | ProviderId::Gcp)
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ProviderId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ProviderId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(ProviderId::normalize(&raw))
    }
}

/// How the gateway should treat the submitted credentials.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionMethod {
    ApiKey,
    /// Google service-account credentials.
    #[serde(rename = "oauth")]
    OAuth,
}

/// Whether the connection tracks production or developer spend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionType {
    #[default]
    Production,
    Developer,
}

impl ConnectionType {
    /// Parses a `--key-type` value. Only `developer` selects developer;
    /// anything else, unknown values included, is production.
    pub fn parse_lenient(raw: &str) -> Self {
        if raw.trim().eq_ignore_ascii_case("developer") {
            ConnectionType::Developer
        } else {
            ConnectionType::Production
        }
    }
}
