// # DNS Client Trait
//
// Defines the interface for reconciling one DNS record against a target IP.
//
// ## Implementations
//
// - Cloudflare: `ddns-provider-cloudflare` crate (token verification gated)
// - DigitalOcean: `ddns-provider-digitalocean` crate
//
// Provider crates implement [`RecordBackend`] for the wire calls and delegate
// [`DnsClient::create_or_update_record`] to [`crate::reconcile::reconcile`], so
// the upsert protocol has exactly one implementation.

use crate::traits::ip_provider::IpAddress;
use async_trait::async_trait;
use std::fmt;

/// A DNS record as listed by a provider
///
/// Fetched fresh on every reconciliation and never cached across cycles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DnsRecord {
    /// Opaque provider-assigned identifier
    pub id: String,
    /// Record name as the provider reports it
    pub name: String,
    /// Record type, e.g. "A"
    pub record_type: String,
    /// Stored value
    pub content: String,
    /// Time-to-live in seconds
    pub ttl: u32,
}

/// Result of one `create_or_update_record` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconciliationOutcome {
    /// No record existed; one was created
    Created,
    /// The record already held the target value; nothing was written
    Unchanged(IpAddress),
    /// The record held a different value and was overwritten; carries the
    /// stored value exactly as the provider returned it
    Updated(String),
    /// Credential verification failed; nothing was read or written
    AuthFailed,
}

impl ReconciliationOutcome {
    /// Whether this outcome should produce a change notification for `target`
    ///
    /// Only an overwrite of a value different from `target` qualifies.
    pub fn notifies(&self, target: &IpAddress) -> bool {
        matches!(self, Self::Updated(previous) if previous.as_str() != target.as_str())
    }

    /// Whether a write was issued against the provider
    pub fn wrote(&self) -> bool {
        matches!(self, Self::Created | Self::Updated(_))
    }
}

impl fmt::Display for ReconciliationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created => write!(f, "created"),
            Self::Unchanged(ip) => write!(f, "unchanged ({ip})"),
            Self::Updated(previous) => write!(f, "updated (was {previous})"),
            Self::AuthFailed => write!(f, "credential verification failed"),
        }
    }
}

/// Trait for DNS client implementations
///
/// The updater holds an ordered list of these and never sees concrete provider
/// types.
///
/// # Contract
///
/// - Never issues more writes than needed: zero once remote state converged
/// - Credential rejection is returned as [`ReconciliationOutcome::AuthFailed`]
/// - Transport and shape errors propagate as `Err`
/// - No retries, no background tasks, no caching between calls
#[async_trait]
pub trait DnsClient: Send + Sync {
    /// Reconcile the configured record with `target`
    async fn create_or_update_record(
        &self,
        target: &IpAddress,
    ) -> Result<ReconciliationOutcome, crate::Error>;

    /// Provider name used in logs and events
    fn provider_name(&self) -> &'static str;
}

/// Wire-level record operations for one provider
///
/// Each method is a single HTTP round trip. The upsert decision lives in
/// [`crate::reconcile::reconcile`], not here.
#[async_trait]
pub trait RecordBackend: Send + Sync {
    /// Provider name used in logs
    fn provider_name(&self) -> &'static str;

    /// Name of the record this backend manages
    fn record_name(&self) -> &str;

    /// One-shot credential check before any read or write
    ///
    /// Returns `Ok(false)` when the provider definitively rejects the
    /// credentials. Providers without such a step keep the default.
    async fn verify_credentials(&self) -> Result<bool, crate::Error> {
        Ok(true)
    }

    /// List records; only the first page the provider returns
    async fn list_records(&self) -> Result<Vec<DnsRecord>, crate::Error>;

    /// Create the managed record holding `ip`
    async fn create_record(&self, ip: &IpAddress) -> Result<(), crate::Error>;

    /// Overwrite `record` so it holds `ip`
    async fn update_record(&self, record: &DnsRecord, ip: &IpAddress) -> Result<(), crate::Error>;
}

/// Helper trait for constructing DNS clients from configuration
pub trait DnsClientFactory: Send + Sync {
    /// Create a DnsClient from its provider configuration
    fn create(
        &self,
        config: &crate::config::ProviderConfig,
    ) -> Result<Box<dyn DnsClient>, crate::Error>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ip(value: &str) -> IpAddress {
        IpAddress::new(value).unwrap()
    }

    #[test]
    fn only_real_overwrites_notify() {
        let target = ip("2.2.2.2");

        assert!(ReconciliationOutcome::Updated("1.1.1.1".to_string()).notifies(&target));
        assert!(!ReconciliationOutcome::Updated("2.2.2.2".to_string()).notifies(&target));
        assert!(!ReconciliationOutcome::Created.notifies(&target));
        assert!(!ReconciliationOutcome::Unchanged(target.clone()).notifies(&target));
        assert!(!ReconciliationOutcome::AuthFailed.notifies(&target));
    }

    #[test]
    fn overwrite_of_padded_or_empty_value_notifies() {
        let target = ip("2.2.2.2");

        assert!(ReconciliationOutcome::Updated(" 2.2.2.2".to_string()).notifies(&target));
        assert!(ReconciliationOutcome::Updated(String::new()).notifies(&target));
    }

    #[test]
    fn wrote_reflects_write_calls() {
        assert!(ReconciliationOutcome::Created.wrote());
        assert!(ReconciliationOutcome::Updated("1.1.1.1".to_string()).wrote());
        assert!(!ReconciliationOutcome::Unchanged(ip("1.1.1.1")).wrote());
        assert!(!ReconciliationOutcome::AuthFailed.wrote());
    }
}
