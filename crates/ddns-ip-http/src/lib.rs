// # HTTP IP Provider
//
// Resolves the current public address by asking an IP echo server.
//
// ## Protocol
//
// ```http
// POST <SERVER_URL>
//
// 200 OK
// {"ip": "203.0.113.7"}
// ```
//
// The echo server is `ddns-echo-server` (or anything that speaks the same
// shape). One request per `get_ip()` call; nothing is cached, so the updater's
// change detection always sees what the server sees right now.

use async_trait::async_trait;
use ddns_core::traits::{IpAddress, IpProvider};
use ddns_core::{Error, Result};
use serde::Deserialize;

/// Response body of the echo server
#[derive(Debug, Deserialize)]
struct IpResponse {
    ip: String,
}

/// IpProvider backed by an IP echo server
#[derive(Debug, Clone)]
pub struct ServerIpProvider {
    /// Echo endpoint
    url: String,

    /// Shared HTTP client; carries the request timeout
    client: reqwest::Client,
}

impl ServerIpProvider {
    /// Create a new provider
    ///
    /// # Parameters
    ///
    /// - `url`: Echo endpoint (`SERVER_URL`)
    /// - `client`: HTTP client; its timeout bounds every call
    pub fn new(url: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            url: url.into(),
            client,
        }
    }

    /// Endpoint this provider posts to
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl IpProvider for ServerIpProvider {
    /// Ask the echo server for the caller's address
    ///
    /// # Returns
    ///
    /// - `Ok(IpAddress)`: The trimmed, non-empty `ip` field
    /// - `Err(Error::Network)`: Transport failure or non-success status
    /// - `Err(Error::Parse)`: Body is not `{"ip": "<non-empty>"}`
    async fn get_ip(&self) -> Result<IpAddress> {
        tracing::debug!("Requesting public IP from {}", self.url);

        let response = self
            .client
            .post(&self.url)
            .send()
            .await
            .map_err(classify)?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::network(format!(
                "IP server {} answered {}",
                self.url, status
            )));
        }

        let body: IpResponse = response.json().await.map_err(classify)?;
        IpAddress::new(body.ip)
    }
}

fn classify(error: reqwest::Error) -> Error {
    if error.is_decode() {
        Error::parse(format!("invalid IP server response: {error}"))
    } else {
        Error::network(format!("IP server request failed: {error}"))
    }
}
