//! Connection settings for the MongoDB backend.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use simplemongo_core::error::{DocumentStoreError, DocumentStoreResult};

pub const ENV_URI: &str = "SIMPLEMONGO_URI";
pub const ENV_APP_NAME: &str = "SIMPLEMONGO_APP_NAME";
pub const ENV_CONNECT_TIMEOUT_SECS: &str = "SIMPLEMONGO_CONNECT_TIMEOUT_SECS";
pub const ENV_SERVER_API_V1: &str = "SIMPLEMONGO_SERVER_API_V1";

/// Settings used to build a [`MongoDbStore`](crate::MongoDbStore).
///
/// Deserializable from any `serde` source; missing fields take their defaults.
///
/// # Example
///
/// ```ignore
/// let config: ClientConfig = serde_json::from_str(r#"{ "uri": "mongodb://db:27017", "server_api_v1": true }"#)?;
/// let store = MongoDbStoreBuilder::from_config(config).build().await?;
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Connection string in the driver's URI syntax.
    pub uri: String,
    /// Application name reported to the server.
    pub app_name: Option<String>,
    /// Bound on the whole connection attempt. `None` leaves it to the driver.
    pub connect_timeout_secs: Option<u64>,
    /// Pin the Stable API to version 1.
    pub server_api_v1: bool,
    /// Run a `ping` after building the client so an unreachable store fails at connect time.
    pub verify_connection: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            uri: "mongodb://localhost:27017".to_string(),
            app_name: None,
            connect_timeout_secs: None,
            server_api_v1: false,
            verify_connection: true,
        }
    }
}

impl ClientConfig {
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            ..Default::default()
        }
    }

    /// Reads the configuration from `SIMPLEMONGO_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::Initialization`] if `SIMPLEMONGO_URI` is unset
    /// or another variable cannot be parsed.
    pub fn from_env() -> DocumentStoreResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`ClientConfig::from_env`], reading variables through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> DocumentStoreResult<Self> {
        let uri = lookup(ENV_URI)
            .ok_or_else(|| DocumentStoreError::Initialization(format!("{ENV_URI} is not set")))?;

        let connect_timeout_secs = lookup(ENV_CONNECT_TIMEOUT_SECS)
            .map(|raw| {
                raw.trim().parse::<u64>().map_err(|e| {
                    DocumentStoreError::Initialization(format!("invalid {ENV_CONNECT_TIMEOUT_SECS} '{raw}': {e}"))
                })
            })
            .transpose()?;

        let server_api_v1 = match lookup(ENV_SERVER_API_V1) {
            Some(raw) => parse_flag(ENV_SERVER_API_V1, &raw)?,
            None => false,
        };

        Ok(Self {
            uri,
            app_name: lookup(ENV_APP_NAME),
            connect_timeout_secs,
            server_api_v1,
            ..Default::default()
        })
    }

    pub fn connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout_secs.map(Duration::from_secs)
    }
}

fn parse_flag(key: &str, raw: &str) -> DocumentStoreResult<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(DocumentStoreError::Initialization(format!("invalid {key} '{raw}'"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_in(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect::<HashMap<_, _>>();

        move |key| vars.get(key).cloned()
    }

    #[test]
    fn reads_every_variable() {
        let config = ClientConfig::from_lookup(lookup_in(&[
            (ENV_URI, "mongodb://db:27017"),
            (ENV_APP_NAME, "reports"),
            (ENV_CONNECT_TIMEOUT_SECS, "10"),
            (ENV_SERVER_API_V1, "true"),
        ]))
        .unwrap();

        assert_eq!(config.uri, "mongodb://db:27017");
        assert_eq!(config.app_name.as_deref(), Some("reports"));
        assert_eq!(config.connect_timeout(), Some(Duration::from_secs(10)));
        assert!(config.server_api_v1);
        assert!(config.verify_connection);
    }

    #[test]
    fn uri_is_required() {
        assert!(matches!(
            ClientConfig::from_lookup(lookup_in(&[])),
            Err(DocumentStoreError::Initialization(_))
        ));
    }

    #[test]
    fn malformed_values_are_rejected() {
        assert!(ClientConfig::from_lookup(lookup_in(&[(ENV_URI, "mongodb://db"), (ENV_CONNECT_TIMEOUT_SECS, "soon")])).is_err());
        assert!(ClientConfig::from_lookup(lookup_in(&[(ENV_URI, "mongodb://db"), (ENV_SERVER_API_V1, "maybe")])).is_err());
    }

    #[test]
    fn missing_fields_deserialize_to_defaults() {
        let config: ClientConfig = serde_json::from_str(r#"{ "uri": "mongodb://db:27017" }"#).unwrap();
        assert_eq!(config, ClientConfig::new("mongodb://db:27017"));
    }
}
