// # IP Provider Trait
//
// Defines the interface for resolving the current public IP address.
//
// ## Implementations
//
// - Echo server: `ddns-ip-http` crate (POSTs to `SERVER_URL`, reads `{"ip": ...}`)
//
// ## Usage
//
// ```rust,ignore
// use ddns_core::IpProvider;
//
// let provider = /* IpProvider implementation */;
// let ip = provider.get_ip().await?;
// println!("current address: {ip}");
// ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::Ipv6Addr;

/// A public IP address as reported by an [`IpProvider`]
///
/// The value is kept as the provider returned it. The only invariant is that it
/// is non-empty; DNS provider APIs are the source of truth for which formats
/// they accept.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct IpAddress(String);

impl IpAddress {
    /// Create an address, rejecting empty or whitespace-only values
    pub fn new(value: impl Into<String>) -> Result<Self, crate::Error> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(crate::Error::parse("IP address cannot be empty"));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Borrow the address as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// DNS record type that holds this address
    ///
    /// `AAAA` when the value parses as an IPv6 address, `A` otherwise.
    pub fn record_type(&self) -> &'static str {
        if self.0.parse::<Ipv6Addr>().is_ok() {
            "AAAA"
        } else {
            "A"
        }
    }
}

impl fmt::Display for IpAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for IpAddress {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for IpAddress {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for IpAddress {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl TryFrom<String> for IpAddress {
    type Error = crate::Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<IpAddress> for String {
    fn from(ip: IpAddress) -> Self {
        ip.0
    }
}

/// Trait for IP provider implementations
///
/// # Contract
///
/// - Each call is a single round trip to the remote source
/// - No side effects
/// - Not idempotent in value: consecutive calls may return different addresses
///
/// # Errors
///
/// - [`Error::Network`](crate::Error::Network) on transport failure
/// - [`Error::Parse`](crate::Error::Parse) when the response lacks the address
#[async_trait]
pub trait IpProvider: Send + Sync {
    /// Resolve the current public IP address
    async fn get_ip(&self) -> Result<IpAddress, crate::Error>;
}
