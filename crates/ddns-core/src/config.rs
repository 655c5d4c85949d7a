//! Configuration types for the DDNS client and echo server
//!
//! Configuration arrives as a flat string key/value map. The daemon fills it
//! from the process environment, and tests build it by hand. Every required key
//! is checked here, before the updater loop starts.

use crate::error::{Error, Result};
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

/// Default period between sync attempts
///
/// The period in whole seconds doubles as the record TTL, so it must be at
/// least one second.
pub const DEFAULT_CHECK_PERIOD: Duration = Duration::from_secs(5 * 60);

/// Default HTTP transport timeout
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Default for the (unused) warning threshold
pub const DEFAULT_ATTEMPTS_BEFORE_WARNING: u32 = 5;

/// Default echo server bind host
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default echo server port
pub const DEFAULT_PORT: u16 = 8080;

/// Provider names accepted in `PROVIDERS`
pub const CLOUDFLARE: &str = "cloudflare";
pub const DIGITALOCEAN: &str = "digitalocean";

/// Read-only view over the flat key/value map
///
/// Empty values are treated as absent.
struct Keys<'a>(&'a HashMap<String, String>);

impl<'a> Keys<'a> {
    fn optional(&self, key: &str) -> Option<&'a str> {
        self.0
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    fn required(&self, key: &str) -> Result<&'a str> {
        self.optional(key)
            .ok_or_else(|| Error::config(format!("{key} is not set")))
    }

    fn duration(&self, key: &str, default: Duration) -> Result<Duration> {
        match self.optional(key) {
            Some(raw) => parse_duration(raw)
                .map_err(|e| Error::config(format!("{key} has an invalid duration '{raw}': {e}"))),
            None => Ok(default),
        }
    }
}

/// Process mode selected by `MODE`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Run the updater loop
    #[default]
    Client,
    /// Run the IP echo server
    Server,
}

impl Mode {
    /// Read `MODE`; anything other than `server` selects the client
    pub fn from_map(map: &HashMap<String, String>) -> Self {
        match Keys(map).optional("MODE") {
            Some(mode) if mode.eq_ignore_ascii_case("server") => Mode::Server,
            _ => Mode::Client,
        }
    }
}

/// Client (updater) configuration
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// URL of the IP echo endpoint
    pub server_url: String,

    /// Time between syncs
    pub check_period: Duration,

    /// Timeout enforced by the HTTP transport on every outbound call
    pub request_timeout: Duration,

    /// Parsed for compatibility; no engine logic consumes it
    pub attempts_before_warning: u32,

    /// DNS providers in reconciliation order
    pub providers: Vec<ProviderConfig>,

    /// Notification channel, if configured
    pub telegram: Option<TelegramConfig>,
}

impl ClientConfig {
    /// Build the client configuration from a flat key/value map
    ///
    /// # Errors
    ///
    /// [`Error::Config`] naming the first missing or malformed key.
    pub fn from_map(map: &HashMap<String, String>) -> Result<Self> {
        let keys = Keys(map);

        let server_url = keys.required("SERVER_URL")?.to_string();
        let check_period = keys.duration("CHECK_PERIOD", DEFAULT_CHECK_PERIOD)?;
        let request_timeout = keys.duration("REQUEST_TIMEOUT", DEFAULT_REQUEST_TIMEOUT)?;

        let attempts_before_warning = match keys.optional("ATTEMPTS_BEFORE_WARNING") {
            Some(raw) => raw.parse().map_err(|_| {
                Error::config(format!("ATTEMPTS_BEFORE_WARNING must be an integer, got '{raw}'"))
            })?,
            None => DEFAULT_ATTEMPTS_BEFORE_WARNING,
        };

        let ttl = u32::try_from(check_period.as_secs()).unwrap_or(u32::MAX);

        let order: Vec<String> = match keys.optional("PROVIDERS") {
            Some(list) => list
                .split(',')
                .map(|name| name.trim().to_lowercase())
                .filter(|name| !name.is_empty())
                .collect(),
            None => [
                (CLOUDFLARE, "CLOUDFLARE_TOKEN"),
                (DIGITALOCEAN, "DIGITALOCEAN_TOKEN"),
            ]
            .into_iter()
            .filter(|(_, token_key)| keys.optional(token_key).is_some())
            .map(|(name, _)| name.to_string())
            .collect(),
        };

        let mut providers = Vec::with_capacity(order.len());
        for name in &order {
            if providers
                .iter()
                .any(|p: &ProviderConfig| p.type_name() == name.as_str())
            {
                return Err(Error::config(format!("provider '{name}' is listed twice in PROVIDERS")));
            }
            providers.push(ProviderConfig::from_keys(&keys, name, ttl)?);
        }

        let telegram = match keys.optional("TELEGRAM_TOKEN") {
            Some(token) => Some(TelegramConfig {
                token: token.to_string(),
                chat_id: keys.required("TELEGRAM_CHAT_ID")?.to_string(),
            }),
            None => None,
        };

        let config = Self {
            server_url,
            check_period,
            request_timeout,
            attempts_before_warning,
            providers,
            telegram,
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if !self.server_url.starts_with("http://") && !self.server_url.starts_with("https://") {
            return Err(Error::config(format!(
                "SERVER_URL must use an http or https scheme, got '{}'",
                self.server_url
            )));
        }

        if self.check_period < Duration::from_secs(1) {
            return Err(Error::config(format!(
                "CHECK_PERIOD must be at least 1s since it sets the record TTL, got {:?}",
                self.check_period
            )));
        }

        if self.request_timeout.is_zero() {
            return Err(Error::config("REQUEST_TIMEOUT must be greater than zero"));
        }

        Ok(())
    }
}

/// Per-provider credentials and target identifiers
#[derive(Clone, PartialEq, Eq)]
pub enum ProviderConfig {
    /// Cloudflare: record `domain_name` in zone `zone_id`
    Cloudflare {
        /// API token (never logged)
        token: String,
        /// Zone identifier
        zone_id: String,
        /// Fully qualified record name
        domain_name: String,
        /// Record TTL in seconds
        ttl: u32,
    },

    /// DigitalOcean: record `subdomain` in domain `domain_name`
    DigitalOcean {
        /// API token (never logged)
        token: String,
        /// Domain the record lives in
        domain_name: String,
        /// Record name relative to the domain
        subdomain: String,
        /// Record TTL in seconds
        ttl: u32,
    },
}

impl ProviderConfig {
    fn from_keys(keys: &Keys<'_>, name: &str, ttl: u32) -> Result<Self> {
        match name {
            CLOUDFLARE => Ok(ProviderConfig::Cloudflare {
                token: keys.required("CLOUDFLARE_TOKEN")?.to_string(),
                zone_id: keys.required("CLOUDFLARE_ZONE_ID")?.to_string(),
                domain_name: keys.required("CLOUDFLARE_DOMAIN_NAME")?.to_string(),
                ttl,
            }),
            DIGITALOCEAN => Ok(ProviderConfig::DigitalOcean {
                token: keys.required("DIGITALOCEAN_TOKEN")?.to_string(),
                domain_name: keys.required("DIGITALOCEAN_DOMAIN_NAME")?.to_string(),
                subdomain: keys.required("DIGITALOCEAN_SUBDOMAIN")?.to_string(),
                ttl,
            }),
            other => Err(Error::config(format!(
                "unknown provider '{other}' in PROVIDERS (supported: {CLOUDFLARE}, {DIGITALOCEAN})"
            ))),
        }
    }

    /// Get the provider type name
    pub fn type_name(&self) -> &'static str {
        match self {
            ProviderConfig::Cloudflare { .. } => CLOUDFLARE,
            ProviderConfig::DigitalOcean { .. } => DIGITALOCEAN,
        }
    }
}

// Tokens stay out of Debug output.
impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderConfig::Cloudflare {
                zone_id,
                domain_name,
                ttl,
                ..
            } => f
                .debug_struct("Cloudflare")
                .field("token", &"<REDACTED>")
                .field("zone_id", zone_id)
                .field("domain_name", domain_name)
                .field("ttl", ttl)
                .finish(),
            ProviderConfig::DigitalOcean {
                domain_name,
                subdomain,
                ttl,
                ..
            } => f
                .debug_struct("DigitalOcean")
                .field("token", &"<REDACTED>")
                .field("domain_name", domain_name)
                .field("subdomain", subdomain)
                .field("ttl", ttl)
                .finish(),
        }
    }
}

/// Telegram bot credentials
#[derive(Clone, PartialEq, Eq)]
pub struct TelegramConfig {
    /// Bot token (never logged)
    pub token: String,
    /// Destination chat
    pub chat_id: String,
}

impl fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("token", &"<REDACTED>")
            .field("chat_id", &self.chat_id)
            .finish()
    }
}

/// IP echo server configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Bind host
    pub host: String,
    /// Bind port
    pub port: u16,
    /// Trusted header carrying the caller's address (e.g. set by a proxy)
    pub header: Option<String>,
}

impl ServerConfig {
    /// Build the server configuration from a flat key/value map
    pub fn from_map(map: &HashMap<String, String>) -> Result<Self> {
        let keys = Keys(map);

        let port = match keys.optional("PORT") {
            Some(raw) => raw
                .parse()
                .map_err(|_| Error::config(format!("PORT must be a port number, got '{raw}'")))?,
            None => DEFAULT_PORT,
        };

        Ok(Self {
            host: keys.optional("HOST").unwrap_or(DEFAULT_HOST).to_string(),
            port,
            header: keys.optional("HEADER").map(str::to_string),
        })
    }

    /// `host:port` for binding
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            header: None,
        }
    }
}

/// Parse a duration such as `30s`, `5m`, `1h 30m`, `250ms` or ISO-8601 `PT5M`
pub fn parse_duration(input: &str) -> std::result::Result<Duration, String> {
    let input = input.trim();
    if input.is_empty() {
        return Err("empty duration".to_string());
    }

    if let Some(rest) = input
        .strip_prefix("PT")
        .or_else(|| input.strip_prefix("pt"))
    {
        return parse_components(rest, |unit| match unit.to_ascii_uppercase().as_str() {
            "H" => Some(3_600_000),
            "M" => Some(60_000),
            "S" => Some(1_000),
            _ => None,
        });
    }

    parse_components(input, |unit| match unit {
        "d" => Some(86_400_000),
        "h" => Some(3_600_000),
        "m" => Some(60_000),
        "s" => Some(1_000),
        "ms" => Some(1),
        _ => None,
    })
}

/// Sum `<number><unit>` components, whitespace between components allowed
fn parse_components(
    input: &str,
    unit_millis: impl Fn(&str) -> Option<u64>,
) -> std::result::Result<Duration, String> {
    let mut total: u64 = 0;
    let mut rest = input.trim_start();
    if rest.is_empty() {
        return Err("missing duration components".to_string());
    }

    while !rest.is_empty() {
        let digits = rest.len() - rest.trim_start_matches(|c: char| c.is_ascii_digit()).len();
        if digits == 0 {
            return Err(format!("expected a number at '{rest}'"));
        }
        let value: u64 = rest[..digits]
            .parse()
            .map_err(|e| format!("invalid number: {e}"))?;
        rest = &rest[digits..];

        let unit_len = rest.len() - rest.trim_start_matches(|c: char| c.is_ascii_alphabetic()).len();
        let unit = &rest[..unit_len];
        let millis = unit_millis(unit).ok_or_else(|| format!("unknown unit '{unit}'"))?;
        rest = rest[unit_len..].trim_start();

        total = value
            .checked_mul(millis)
            .and_then(|ms| total.checked_add(ms))
            .ok_or_else(|| "duration overflows".to_string())?;
    }

    Ok(Duration::from_millis(total))
}
