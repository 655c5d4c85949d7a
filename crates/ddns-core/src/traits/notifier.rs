// # Notifier Trait
//
// Delivers one-line alerts to an external channel.
//
// ## Implementations
//
// - Telegram: `ddns-notify-telegram` crate

use async_trait::async_trait;

/// Trait for notification channels
///
/// One external send per call. No retry and no deduplication; failures are
/// returned to the caller, which decides whether they are fatal.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Send `message` to the channel
    async fn notify(&self, message: &str) -> Result<(), crate::Error>;
}
