//! Core traits for the DDNS client
//!
//! This module defines the abstract interfaces that all implementations must follow.
//!
//! - [`IpProvider`]: Resolve the current public IP
//! - [`DnsClient`]: Reconcile one DNS record with a target IP
//! - [`RecordBackend`]: Provider wire calls behind a `DnsClient`
//! - [`Notifier`]: Deliver alerts

pub mod ip_provider;
pub mod dns_client;
pub mod notifier;

pub use ip_provider::{IpAddress, IpProvider};
pub use dns_client::{DnsClient, DnsClientFactory, DnsRecord, ReconciliationOutcome, RecordBackend};
pub use notifier::Notifier;
