// # Cloudflare DNS Client
//
// Reconciles one A/AAAA record in a Cloudflare zone with the current address.
//
// ## Behaviour
//
// Every `create_or_update_record` call runs the shared upsert protocol
// (`ddns_core::reconcile`) with this crate supplying the wire format:
//
// 1. Verify the API token. A rejected token yields `AuthFailed` and no further
//    request is made.
// 2. List records filtered by name; the first match wins.
// 3. Create, leave alone, or update by id.
//
// No retries, no caching between calls. The shared `reqwest::Client` carries
// the request timeout.
//
// ## Security Requirements
//
// - API token NEVER appears in logs or `Debug` output
// - Provider MUST fail fast if token is empty
//
// ## API Reference
//
// - Cloudflare API v4: https://developers.cloudflare.com/api/
// - Verify Token: GET `/user/tokens/verify`
// - List DNS Records: GET `/zones/:zone_id/dns_records?name=...`
// - Create DNS Record: POST `/zones/:zone_id/dns_records`
// - Update DNS Record: PUT `/zones/:zone_id/dns_records/:record_id`

use async_trait::async_trait;
use ddns_core::config::{CLOUDFLARE, ProviderConfig};
use ddns_core::traits::{
    DnsClient, DnsClientFactory, DnsRecord, IpAddress, ReconciliationOutcome, RecordBackend,
};
use ddns_core::{Error, ProviderRegistry, Result, reconcile};
use reqwest::StatusCode;
use serde::de::{DeserializeOwned, IgnoredAny};
use serde::{Deserialize, Serialize};

/// Cloudflare API base URL
pub const CLOUDFLARE_API_BASE: &str = "https://api.cloudflare.com/client/v4";

/// Response envelope shared by every Cloudflare v4 endpoint
#[derive(Debug, Deserialize)]
struct CloudflareResponse<T> {
    success: bool,
    #[serde(default)]
    errors: Vec<ApiMessage>,
    result: Option<T>,
}

impl<T> CloudflareResponse<T> {
    fn error_summary(&self) -> String {
        if self.errors.is_empty() {
            return "no error details".to_string();
        }
        self.errors
            .iter()
            .map(|e| format!("{} ({})", e.message, e.code))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct TokenStatus {
    id: String,
    status: String,
}

#[derive(Debug, Deserialize)]
struct CloudflareRecord {
    id: String,
    name: String,
    #[serde(rename = "type")]
    record_type: String,
    content: String,
    #[serde(default)]
    ttl: u32,
}

impl From<CloudflareRecord> for DnsRecord {
    fn from(record: CloudflareRecord) -> Self {
        DnsRecord {
            id: record.id,
            name: record.name,
            record_type: record.record_type,
            content: record.content,
            ttl: record.ttl,
        }
    }
}

/// Body of create and update requests
#[derive(Debug, Serialize)]
struct UpsertRecordRequest<'a> {
    #[serde(rename = "type")]
    record_type: &'static str,
    name: &'a str,
    content: &'a str,
    ttl: u32,
    proxied: bool,
    comment: String,
}

/// Cloudflare DNS client for a single record
pub struct CloudflareDnsClient {
    /// Cloudflare API token
    /// ⚠️ NEVER log this value
    token: String,

    /// Zone holding the record
    zone_id: String,

    /// Fully qualified record name
    domain_name: String,

    /// TTL written on create and update
    ttl: u32,

    /// API base, overridable for tests
    base_url: String,

    /// HTTP client for API requests
    client: reqwest::Client,
}

// Custom Debug implementation that hides the API token
impl std::fmt::Debug for CloudflareDnsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudflareDnsClient")
            .field("token", &"<REDACTED>")
            .field("zone_id", &self.zone_id)
            .field("domain_name", &self.domain_name)
            .field("ttl", &self.ttl)
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl CloudflareDnsClient {
    /// Create a new Cloudflare client
    ///
    /// # Parameters
    ///
    /// - `token`: API token with Zone:DNS:Edit permissions
    /// - `zone_id`: Zone identifier
    /// - `domain_name`: Fully qualified record name
    /// - `ttl`: Record TTL in seconds
    /// - `client`: Shared HTTP client
    ///
    /// # Errors
    ///
    /// `Error::Config` if the token, zone or name is empty.
    pub fn new(
        token: impl Into<String>,
        zone_id: impl Into<String>,
        domain_name: impl Into<String>,
        ttl: u32,
        client: reqwest::Client,
    ) -> Result<Self> {
        let token = token.into();
        let zone_id = zone_id.into();
        let domain_name = domain_name.into();

        if token.is_empty() {
            return Err(Error::config("Cloudflare API token cannot be empty"));
        }
        if zone_id.is_empty() || domain_name.is_empty() {
            return Err(Error::config("Cloudflare zone id and domain name are required"));
        }

        Ok(Self {
            token,
            zone_id,
            domain_name,
            ttl,
            base_url: CLOUDFLARE_API_BASE.to_string(),
            client,
        })
    }

    /// Point the client at another API base (tests, proxies)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn records_url(&self) -> String {
        format!("{}/zones/{}/dns_records", self.base_url, self.zone_id)
    }

    fn upsert_body<'a>(&'a self, ip: &'a IpAddress, action: &str) -> UpsertRecordRequest<'a> {
        UpsertRecordRequest {
            record_type: ip.record_type(),
            name: &self.domain_name,
            content: ip.as_str(),
            ttl: self.ttl,
            proxied: false,
            comment: format!("{action} by ddns on {}", chrono::Local::now().to_rfc3339()),
        }
    }

    /// Send an authenticated request and unwrap the response envelope
    ///
    /// # Returns
    ///
    /// - `Ok(Some(T))` / `Ok(None)`: `success` was true; `result` as sent
    /// - `Err(Error::Provider)`: Non-success status or `success: false`
    /// - `Err(Error::Network | Error::Parse)`: Transport or body failure
    async fn execute<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        action: &str,
    ) -> Result<Option<T>> {
        let response = request
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(classify)?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());
            return Err(Error::provider(
                CLOUDFLARE,
                format!("{action} failed: {status} - {error_text}"),
            ));
        }

        let envelope: CloudflareResponse<T> = response.json().await.map_err(classify)?;
        if !envelope.success {
            return Err(Error::provider(
                CLOUDFLARE,
                format!("{action} rejected: {}", envelope.error_summary()),
            ));
        }
        Ok(envelope.result)
    }
}

#[async_trait]
impl RecordBackend for CloudflareDnsClient {
    fn provider_name(&self) -> &'static str {
        CLOUDFLARE
    }

    fn record_name(&self) -> &str {
        &self.domain_name
    }

    /// Check the token before touching any record
    ///
    /// 401/403 or `success: false` means the token was rejected.
    ///
    /// ```http
    /// GET /user/tokens/verify
    /// Authorization: Bearer <token>
    /// ```
    async fn verify_credentials(&self) -> Result<bool> {
        let response = self
            .client
            .get(format!("{}/user/tokens/verify", self.base_url))
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(classify)?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            tracing::warn!("Cloudflare rejected the API token: {}", status);
            return Ok(false);
        }
        if !status.is_success() {
            return Err(Error::provider(
                CLOUDFLARE,
                format!("token verification failed: {status}"),
            ));
        }

        let body: CloudflareResponse<TokenStatus> = response.json().await.map_err(classify)?;
        if let Some(token) = &body.result {
            tracing::debug!("Cloudflare token {} is {}", token.id, token.status);
        }
        if !body.success {
            tracing::warn!("Cloudflare token verification unsuccessful: {}", body.error_summary());
        }
        Ok(body.success)
    }

    /// ```http
    /// GET /zones/:zone_id/dns_records?name=home.example.com
    /// ```
    async fn list_records(&self) -> Result<Vec<DnsRecord>> {
        let request = self
            .client
            .get(self.records_url())
            .query(&[("name", self.domain_name.as_str())]);

        let records: Vec<CloudflareRecord> = self
            .execute(request, "list records")
            .await?
            .ok_or_else(|| Error::parse("Cloudflare list response has no result"))?;

        Ok(records.into_iter().map(DnsRecord::from).collect())
    }

    async fn create_record(&self, ip: &IpAddress) -> Result<()> {
        let request = self
            .client
            .post(self.records_url())
            .json(&self.upsert_body(ip, "Created"));

        self.execute::<IgnoredAny>(request, "create record").await?;
        tracing::info!("Cloudflare record {} created with {}", self.domain_name, ip);
        Ok(())
    }

    async fn update_record(&self, record: &DnsRecord, ip: &IpAddress) -> Result<()> {
        let request = self
            .client
            .put(format!("{}/{}", self.records_url(), record.id))
            .json(&self.upsert_body(ip, "Updated"));

        self.execute::<IgnoredAny>(request, "update record").await?;
        tracing::info!("Cloudflare record {} updated to {}", self.domain_name, ip);
        Ok(())
    }
}

#[async_trait]
impl DnsClient for CloudflareDnsClient {
    async fn create_or_update_record(&self, target: &IpAddress) -> Result<ReconciliationOutcome> {
        reconcile(self, target).await
    }

    fn provider_name(&self) -> &'static str {
        CLOUDFLARE
    }
}

fn classify(error: reqwest::Error) -> Error {
    if error.is_decode() {
        Error::parse(format!("invalid Cloudflare response: {error}"))
    } else {
        Error::network(format!("Cloudflare request failed: {error}"))
    }
}

/// Factory for creating Cloudflare clients
pub struct CloudflareFactory {
    client: reqwest::Client,
}

impl CloudflareFactory {
    /// Factory whose clients share `client`
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl DnsClientFactory for CloudflareFactory {
    fn create(&self, config: &ProviderConfig) -> Result<Box<dyn DnsClient>> {
        match config {
            ProviderConfig::Cloudflare {
                token,
                zone_id,
                domain_name,
                ttl,
            } => Ok(Box::new(CloudflareDnsClient::new(
                token.clone(),
                zone_id.clone(),
                domain_name.clone(),
                *ttl,
                self.client.clone(),
            )?)),
            _ => Err(Error::config("Invalid config for Cloudflare provider")),
        }
    }
}

/// Register the Cloudflare provider with a registry
///
/// # Example
///
/// ```rust
/// use ddns_core::ProviderRegistry;
///
/// let registry = ProviderRegistry::new();
/// ddns_provider_cloudflare::register(&registry, reqwest::Client::new());
/// assert!(registry.has_provider("cloudflare"));
/// ```
pub fn register(registry: &ProviderRegistry, client: reqwest::Client) {
    registry.register_provider(CLOUDFLARE, Box::new(CloudflareFactory::new(client)));
}
