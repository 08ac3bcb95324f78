//! Client for the firewall's IPsec child SA listing.
//!
//! One `POST /api/ipsec/connections/search_child` per run, asking for every row of
//! a single connection. Authentication is HTTP basic with the API key and secret, and
//! the server certificate is checked against the configured CA file only.

use std::fs;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Certificate, Client};
use serde::{Deserialize, Serialize};
use swanwatch_common::config::Config;
use swanwatch_common::error::InventoryError;
use swanwatch_common::tunnel::RawTunnelRecord;
use tracing::{debug, info};

pub const SEARCH_CHILD_PATH: &str = "/api/ipsec/connections/search_child";

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Source of raw child SA rows.
#[async_trait]
pub trait TunnelInventory: Send + Sync {
    async fn child_sas(&self) -> Result<Vec<RawTunnelRecord>, InventoryError>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SearchRequest<'a> {
    current: u32,
    /// `-1` asks for all rows in one page.
    row_count: i32,
    sort: serde_json::Map<String, serde_json::Value>,
    search_phrase: &'a str,
    connection: &'a str,
}

impl<'a> SearchRequest<'a> {
    fn all_rows(connection: &'a str) -> Self {
        Self {
            current: 1,
            row_count: -1,
            sort: serde_json::Map::new(),
            search_phrase: "",
            connection,
        }
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    rows: Vec<RawTunnelRecord>,
}

pub struct InventoryClient {
    http: Client,
    base_url: String,
    api_key: String,
    api_secret: String,
    connection: String,
}

impl InventoryClient {
    /// Builds a client that trusts nothing but the CA in `cfg.cert_path`.
    pub fn new(cfg: &Config) -> Result<Self, InventoryError> {
        let pem: Vec<u8> = fs::read(&cfg.cert_path).map_err(|source| InventoryError::Certificate {
            path: cfg.cert_path.clone(),
            source,
        })?;
        let ca = Certificate::from_pem(&pem).map_err(|e| InventoryError::InvalidCertificate {
            path: cfg.cert_path.clone(),
            message: e.to_string(),
        })?;

        let http = Client::builder()
            .tls_built_in_root_certs(false)
            .add_root_certificate(ca)
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| InventoryError::Transport {
                url: cfg.api_base_url(),
                message: e.to_string(),
            })?;

        Ok(Self::from_parts(
            http,
            cfg.api_base_url(),
            cfg.api_key.clone(),
            cfg.api_secret.clone(),
            cfg.connection_uuid.clone(),
        ))
    }

    /// Builds a client for an arbitrary base URL using the platform's default trust
    /// store.
    pub fn with_base_url(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        api_secret: impl Into<String>,
        connection: impl Into<String>,
    ) -> Result<Self, InventoryError> {
        let base_url: String = base_url.into();
        let http = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| InventoryError::Transport {
                url: base_url.clone(),
                message: e.to_string(),
            })?;
        Ok(Self::from_parts(
            http,
            base_url,
            api_key.into(),
            api_secret.into(),
            connection.into(),
        ))
    }

    fn from_parts(
        http: Client,
        base_url: String,
        api_key: String,
        api_secret: String,
        connection: String,
    ) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            api_secret,
            connection,
        }
    }

    pub fn url(&self) -> String {
        format!("{}{}", self.base_url, SEARCH_CHILD_PATH)
    }

    pub async fn search_child(&self) -> Result<Vec<RawTunnelRecord>, InventoryError> {
        let url: String = self.url();
        info!("Requesting child SAs from {url}");

        let resp = self
            .http
            .post(&url)
            .basic_auth(&self.api_key, Some(&self.api_secret))
            .json(&SearchRequest::all_rows(&self.connection))
            .send()
            .await
            .map_err(|e| InventoryError::Transport {
                url: url.clone(),
                message: e.to_string(),
            })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(InventoryError::Status {
                url,
                status: status.as_u16(),
            });
        }

        let body: SearchResponse = resp.json().await.map_err(|e| InventoryError::Decode {
            url: url.clone(),
            message: e.to_string(),
        })?;

        debug!("{} child SAs returned", body.rows.len());
        Ok(body.rows)
    }
}

#[async_trait]
impl TunnelInventory for InventoryClient {
    async fn child_sas(&self) -> Result<Vec<RawTunnelRecord>, InventoryError> {
        self.search_child().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    fn client(server: &MockServer) -> InventoryClient {
        InventoryClient::with_base_url(server.base_url(), "key", "secret", "conn-1").unwrap()
    }

    #[tokio::test]
    async fn posts_all_rows_query_with_basic_auth() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path(SEARCH_CHILD_PATH)
                // base64("key:secret")
                .header("authorization", "Basic a2V5OnNlY3JldA==")
                .json_body(json!({
                    "current": 1,
                    "rowCount": -1,
                    "sort": {},
                    "searchPhrase": "",
                    "connection": "conn-1"
                }));
            then.status(200).json_body(json!({
                "rows": [
                    { "uuid": "u1", "description": "Acme - 10.0.5.9", "remote_ts": "10.0.5.9/32" },
                    { "uuid": "u2", "description": "Globex-10.0.7.9", "remote_ts": "10.0.7.9/32" }
                ],
                "rowCount": 2,
                "total": 2,
                "current": 1
            }));
        });

        let rows = client(&server).child_sas().await.unwrap();

        mock.assert();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].uuid.as_deref(), Some("u1"));
        assert_eq!(rows[1].description.as_deref(), Some("Globex-10.0.7.9"));
    }

    #[tokio::test]
    async fn non_success_status_is_fatal() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path(SEARCH_CHILD_PATH);
            then.status(401).body("unauthorized");
        });

        let err = client(&server).child_sas().await.unwrap_err();
        assert!(matches!(err, InventoryError::Status { status: 401, .. }), "{err:?}");
    }

    #[tokio::test]
    async fn body_without_rows_is_a_decode_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path(SEARCH_CHILD_PATH);
            then.status(200).json_body(json!({ "total": 0 }));
        });

        let err = client(&server).child_sas().await.unwrap_err();
        assert!(matches!(err, InventoryError::Decode { .. }), "{err:?}");
    }

    #[tokio::test]
    async fn unreachable_api_is_a_transport_error() {
        let client =
            InventoryClient::with_base_url("http://127.0.0.1:9", "key", "secret", "conn").unwrap();
        let err = client.child_sas().await.unwrap_err();
        assert!(matches!(err, InventoryError::Transport { .. }), "{err:?}");
    }

    #[test]
    fn trailing_slash_is_dropped() {
        let client =
            InventoryClient::with_base_url("https://fw:4443/", "key", "secret", "conn").unwrap();
        assert_eq!(client.url(), "https://fw:4443/api/ipsec/connections/search_child");
    }

    #[test]
    fn missing_certificate_file_is_reported() {
        let cfg = test_config("/no/such/ca.pem".into());
        let err = InventoryClient::new(&cfg).err().unwrap();
        assert!(matches!(err, InventoryError::Certificate { .. }));
    }

    fn test_config(cert_path: std::path::PathBuf) -> Config {
        serde_json::from_value(json!({
            "firewall_ip": "192.0.2.1",
            "web_port": 4443,
            "api_key": "key",
            "api_secret": "secret",
            "cert_path": cert_path,
            "connection_uuid": "conn-1",
            "ssh_user": "root",
            "ssh_key_path": "id_ed25519",
            "output_path": "out.json"
        }))
        .unwrap()
    }
}
