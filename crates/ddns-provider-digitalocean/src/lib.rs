// # DigitalOcean DNS Client
//
// Reconciles `<subdomain>.<domain>` in a DigitalOcean-hosted domain.
//
// DigitalOcean has no token verification step, so the shared upsert protocol
// starts directly at the listing. Only the first page of
// `/domains/:domain/records` is consulted; a record beyond it is treated as
// absent.
//
// ## API Reference
//
// - DigitalOcean API v2: https://docs.digitalocean.com/reference/api/
// - List: GET `/domains/:domain/records`
// - Create: POST `/domains/:domain/records`
// - Update: PUT `/domains/:domain/records/:id`

use async_trait::async_trait;
use ddns_core::config::{DIGITALOCEAN, ProviderConfig};
use ddns_core::traits::{
    DnsClient, DnsClientFactory, DnsRecord, IpAddress, ReconciliationOutcome, RecordBackend,
};
use ddns_core::{Error, ProviderRegistry, Result, reconcile};
use serde::{Deserialize, Serialize};

/// DigitalOcean API base URL
pub const DIGITALOCEAN_API_BASE: &str = "https://api.digitalocean.com/v2";

#[derive(Debug, Deserialize)]
struct DomainRecords {
    domain_records: Vec<DomainRecord>,
}

#[derive(Debug, Deserialize)]
struct DomainRecord {
    id: u64,
    #[serde(rename = "type")]
    record_type: String,
    name: String,
    data: String,
    #[serde(default)]
    ttl: u32,
}

impl From<DomainRecord> for DnsRecord {
    fn from(record: DomainRecord) -> Self {
        DnsRecord {
            id: record.id.to_string(),
            name: record.name,
            record_type: record.record_type,
            content: record.data,
            ttl: record.ttl,
        }
    }
}

#[derive(Debug, Serialize)]
struct UpsertRecordRequest<'a> {
    #[serde(rename = "type")]
    record_type: &'static str,
    name: &'a str,
    data: &'a str,
    ttl: u32,
}

/// DigitalOcean DNS client for a single record
pub struct DigitalOceanDnsClient {
    /// ⚠️ NEVER log this value
    token: String,
    domain_name: String,
    subdomain: String,
    ttl: u32,
    base_url: String,
    client: reqwest::Client,
}

impl std::fmt::Debug for DigitalOceanDnsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DigitalOceanDnsClient")
            .field("token", &"<REDACTED>")
            .field("domain_name", &self.domain_name)
            .field("subdomain", &self.subdomain)
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl DigitalOceanDnsClient {
    /// Create a new DigitalOcean client
    ///
    /// # Parameters
    ///
    /// - `token`: Personal access token with write scope
    /// - `domain_name`: Domain the record lives in
    /// - `subdomain`: Record name relative to the domain
    /// - `ttl`: Record TTL in seconds
    /// - `client`: Shared HTTP client
    pub fn new(
        token: impl Into<String>,
        domain_name: impl Into<String>,
        subdomain: impl Into<String>,
        ttl: u32,
        client: reqwest::Client,
    ) -> Result<Self> {
        let token = token.into();
        let domain_name = domain_name.into();
        let subdomain = subdomain.into();

        if token.is_empty() {
            return Err(Error::config("DigitalOcean API token cannot be empty"));
        }
        if domain_name.is_empty() || subdomain.is_empty() {
            return Err(Error::config("DigitalOcean domain and subdomain are required"));
        }

        Ok(Self {
            token,
            domain_name,
            subdomain,
            ttl,
            base_url: DIGITALOCEAN_API_BASE.to_string(),
            client,
        })
    }

    /// Point the client at another API base
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn records_url(&self) -> String {
        format!("{}/domains/{}/records", self.base_url, self.domain_name)
    }

    fn upsert_body<'a>(&'a self, ip: &'a IpAddress) -> UpsertRecordRequest<'a> {
        UpsertRecordRequest {
            record_type: ip.record_type(),
            name: &self.subdomain,
            data: ip.as_str(),
            ttl: self.ttl,
        }
    }

    async fn send(&self, request: reqwest::RequestBuilder, action: &str) -> Result<reqwest::Response> {
        let response = request
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(classify)?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unable to read error response".to_string());
        Err(Error::provider(
            DIGITALOCEAN,
            format!("{action} failed: {status} - {error_text}"),
        ))
    }
}

#[async_trait]
impl RecordBackend for DigitalOceanDnsClient {
    fn provider_name(&self) -> &'static str {
        DIGITALOCEAN
    }

    fn record_name(&self) -> &str {
        &self.subdomain
    }

    async fn list_records(&self) -> Result<Vec<DnsRecord>> {
        let response = self
            .send(self.client.get(self.records_url()), "list records")
            .await?;
        let body: DomainRecords = response.json().await.map_err(classify)?;
        Ok(body.domain_records.into_iter().map(DnsRecord::from).collect())
    }

    async fn create_record(&self, ip: &IpAddress) -> Result<()> {
        let request = self.client.post(self.records_url()).json(&self.upsert_body(ip));
        self.send(request, "create record").await?;
        tracing::info!(
            "DigitalOcean record {}.{} created with {}",
            self.subdomain,
            self.domain_name,
            ip
        );
        Ok(())
    }

    async fn update_record(&self, record: &DnsRecord, ip: &IpAddress) -> Result<()> {
        let request = self
            .client
            .put(format!("{}/{}", self.records_url(), record.id))
            .json(&self.upsert_body(ip));
        self.send(request, "update record").await?;
        tracing::info!(
            "DigitalOcean record {}.{} updated to {}",
            self.subdomain,
            self.domain_name,
            ip
        );
        Ok(())
    }
}

#[async_trait]
impl DnsClient for DigitalOceanDnsClient {
    async fn create_or_update_record(&self, target: &IpAddress) -> Result<ReconciliationOutcome> {
        reconcile(self, target).await
    }

    fn provider_name(&self) -> &'static str {
        DIGITALOCEAN
    }
}

fn classify(error: reqwest::Error) -> Error {
    if error.is_decode() {
        Error::parse(format!("invalid DigitalOcean response: {error}"))
    } else {
        Error::network(format!("DigitalOcean request failed: {error}"))
    }
}

/// Factory for creating DigitalOcean clients
pub struct DigitalOceanFactory {
    client: reqwest::Client,
}

impl DigitalOceanFactory {
    /// Factory whose clients share `client`
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl DnsClientFactory for DigitalOceanFactory {
    fn create(&self, config: &ProviderConfig) -> Result<Box<dyn DnsClient>> {
        match config {
            ProviderConfig::DigitalOcean {
                token,
                domain_name,
                subdomain,
                ttl,
            } => Ok(Box::new(DigitalOceanDnsClient::new(
                token.clone(),
                domain_name.clone(),
                subdomain.clone(),
                *ttl,
                self.client.clone(),
            )?)),
            _ => Err(Error::config("Invalid config for DigitalOcean provider")),
        }
    }
}

/// Register the DigitalOcean provider with a registry
pub fn register(registry: &ProviderRegistry, client: reqwest::Client) {
    registry.register_provider(DIGITALOCEAN, Box::new(DigitalOceanFactory::new(client)));
}
