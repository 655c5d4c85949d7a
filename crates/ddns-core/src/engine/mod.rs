//! Core DDNS updater
//!
//! The Updater is responsible for:
//! - Polling the IpProvider once per check period
//! - Detecting whether the address changed since the last observation
//! - Reconciling every configured DnsClient, in order, on change
//! - Notifying once per provider whose stored value was overwritten
//!
//! ## Architecture
//!
//! ```text
//!                 ┌─────────────┐
//!                 │ IpProvider  │
//!                 └─────────────┘
//!                        │ get_ip()
//!                        ▼
//!                 ┌─────────────┐   events   ┌──────────────┐
//!   shutdown ───▶ │   Updater   │ ─────────▶ │  Receiver    │
//!                 └─────────────┘            └──────────────┘
//!                   │         │
//!     create_or_    │         │ notify()
//!     update_record ▼         ▼
//!          ┌────────────┐  ┌──────────┐
//!          │ DnsClient* │  │ Notifier │
//!          └────────────┘  └──────────┘
//! ```
//!
//! ## State Machine
//!
//! ```text
//! Idle ──quantum, not due──▶ Idle
//! Idle ──check period elapsed──▶ Syncing ──ok──▶ Idle
//!                                 Syncing ──error──▶ Stopped (after best-effort notify)
//! Idle | Syncing ──shutdown seen at next quantum──▶ Stopped
//! ```
//!
//! There is no retry and no backoff: a failed cycle stops the updater and the
//! error is returned to the caller.

pub mod shutdown;

pub use shutdown::ShutdownSignal;

use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::traits::{DnsClient, IpAddress, IpProvider, Notifier, ReconciliationOutcome};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

/// Interval at which the loop checks its deadline and the shutdown flag
pub const DEFAULT_POLL_QUANTUM: Duration = Duration::from_millis(100);

/// Capacity of the updater event channel
pub const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 1000;

/// Lifecycle state of the updater
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdaterState {
    /// Waiting for the next poll tick
    Idle,
    /// One reconciliation cycle in flight
    Syncing,
    /// Terminal
    Stopped,
}

/// Events emitted by the Updater
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdaterEvent {
    /// Loop started
    Started {
        providers_count: usize,
    },

    /// A cycle began (state is now Syncing)
    CycleStarted,

    /// The provider returned the last known address
    IpUnchanged {
        ip: IpAddress,
    },

    /// A new address was observed
    IpChanged {
        previous: Option<IpAddress>,
        new_ip: IpAddress,
    },

    /// One DnsClient finished reconciling
    ProviderReconciled {
        provider: &'static str,
        outcome: ReconciliationOutcome,
    },

    /// A cycle finished without error (state is back to Idle)
    CycleCompleted {
        next_sync_in: Duration,
    },

    /// A cycle raised a fatal error
    Failed {
        error: String,
    },

    /// Loop stopped
    Stopped {
        reason: String,
    },
}

/// Outcome of one provider inside a cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderOutcome {
    /// Provider name
    pub provider: &'static str,
    /// Reconciliation result
    pub outcome: ReconciliationOutcome,
}

/// Result of one reconciliation cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// The address matched the last observation; no provider was called
    IpUnchanged,
    /// The address changed; every provider was reconciled in order
    Reconciled(Vec<ProviderOutcome>),
}

/// Timing settings for the updater loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdaterSettings {
    /// Time between syncs
    pub check_period: Duration,
    /// Interval between deadline/shutdown checks
    pub poll_quantum: Duration,
    /// Capacity of the event channel
    pub event_channel_capacity: usize,
}

impl UpdaterSettings {
    /// Settings with the given check period and default quantum
    pub fn new(check_period: Duration) -> Self {
        Self {
            check_period,
            poll_quantum: DEFAULT_POLL_QUANTUM,
            event_channel_capacity: DEFAULT_EVENT_CHANNEL_CAPACITY,
        }
    }

    /// Override the poll quantum
    pub fn with_poll_quantum(mut self, poll_quantum: Duration) -> Self {
        self.poll_quantum = poll_quantum;
        self
    }

    fn validate(&self) -> Result<()> {
        if self.check_period.is_zero() {
            return Err(Error::config("check period must be greater than zero"));
        }
        if self.poll_quantum.is_zero() {
            return Err(Error::config("poll quantum must be greater than zero"));
        }
        if self.event_channel_capacity == 0 {
            return Err(Error::config("event channel capacity must be greater than zero"));
        }
        Ok(())
    }
}

impl From<&ClientConfig> for UpdaterSettings {
    fn from(config: &ClientConfig) -> Self {
        Self::new(config.check_period)
    }
}

/// Polling DDNS updater
///
/// Owns the last known address and the loop lifecycle. At most one cycle is
/// ever in flight: `run` and `run_cycle` take `&mut self`.
///
/// ## Lifecycle
///
/// 1. Create with [`Updater::new()`]
/// 2. Start with [`Updater::run()`], passing a [`ShutdownSignal`]
/// 3. Returns `Ok(())` after shutdown, `Err` after a fatal cycle error
pub struct Updater {
    /// Source of the current public address
    ip_provider: Box<dyn IpProvider>,

    /// DNS clients in reconciliation order
    dns_clients: Vec<Box<dyn DnsClient>>,

    /// Optional alert channel
    notifier: Option<Box<dyn Notifier>>,

    /// Loop timing
    settings: UpdaterSettings,

    /// Last observed address; `None` never equals a real address
    last_known_ip: Option<IpAddress>,

    /// Current lifecycle state
    state: UpdaterState,

    /// Event sender for external monitoring
    event_tx: mpsc::Sender<UpdaterEvent>,
}

impl Updater {
    /// Create a new updater
    ///
    /// # Parameters
    ///
    /// - `ip_provider`: IpProvider implementation
    /// - `dns_clients`: DNS clients, reconciled in this order
    /// - `notifier`: optional Notifier
    /// - `settings`: loop timing
    ///
    /// # Returns
    ///
    /// A tuple of (updater, event_receiver) where event_receiver yields updater events
    pub fn new(
        ip_provider: Box<dyn IpProvider>,
        dns_clients: Vec<Box<dyn DnsClient>>,
        notifier: Option<Box<dyn Notifier>>,
        settings: UpdaterSettings,
    ) -> Result<(Self, mpsc::Receiver<UpdaterEvent>)> {
        settings.validate()?;

        let (tx, rx) = mpsc::channel(settings.event_channel_capacity);

        let updater = Self {
            ip_provider,
            dns_clients,
            notifier,
            settings,
            last_known_ip: None,
            state: UpdaterState::Idle,
            event_tx: tx,
        };

        Ok((updater, rx))
    }

    /// Current lifecycle state
    pub fn state(&self) -> UpdaterState {
        self.state
    }

    /// Last observed address, if any cycle has seen one
    pub fn last_known_ip(&self) -> Option<&IpAddress> {
        self.last_known_ip.as_ref()
    }

    /// Run the loop until shutdown or a fatal error
    ///
    /// The first cycle runs on the first poll tick. The shutdown flag is checked
    /// once per quantum; an in-flight cycle always completes first.
    ///
    /// # Returns
    ///
    /// - `Ok(())`: Clean shutdown
    /// - `Err(Error)`: The error that stopped the loop
    pub async fn run(&mut self, shutdown: &ShutdownSignal) -> Result<()> {
        if self.state == UpdaterState::Stopped {
            return Err(Error::config("updater already stopped"));
        }

        if self.dns_clients.is_empty() {
            warn!("No DNS providers configured; address changes will only be logged");
        }

        self.emit_event(UpdaterEvent::Started {
            providers_count: self.dns_clients.len(),
        });
        info!(
            "Updater started: check period {:?}, {} provider(s)",
            self.settings.check_period,
            self.dns_clients.len()
        );

        let mut next_sync = Instant::now();

        loop {
            tokio::time::sleep(self.settings.poll_quantum).await;

            if shutdown.is_triggered() {
                info!("Shutdown signal received");
                self.stop("Shutdown signal");
                return Ok(());
            }

            if Instant::now() < next_sync {
                continue;
            }

            info!("Updating IP");
            match self.run_cycle().await {
                Ok(_) => {
                    next_sync = Instant::now() + self.settings.check_period;
                    self.emit_event(UpdaterEvent::CycleCompleted {
                        next_sync_in: self.settings.check_period,
                    });
                    log_next_sync(self.settings.check_period);
                }
                Err(e) => {
                    error!("Sync failed: {}", e);
                    self.emit_event(UpdaterEvent::Failed {
                        error: e.to_string(),
                    });
                    self.report_failure(&e).await;
                    self.stop("Fatal sync error");
                    return Err(e);
                }
            }
        }
    }

    /// Run exactly one reconciliation cycle
    ///
    /// 1. Ask the IpProvider once
    /// 2. Stop if the address equals the last observation
    /// 3. Otherwise record it and reconcile each DnsClient in order
    /// 4. Notify once for every provider that overwrote a different value
    ///
    /// On error the state is left as `Syncing`; [`Updater::run`] moves it to
    /// `Stopped`.
    pub async fn run_cycle(&mut self) -> Result<CycleOutcome> {
        self.state = UpdaterState::Syncing;
        self.emit_event(UpdaterEvent::CycleStarted);

        let new_ip = self.ip_provider.get_ip().await?;

        if self.last_known_ip.as_ref() == Some(&new_ip) {
            debug!("IP unchanged: {}", new_ip);
            self.emit_event(UpdaterEvent::IpUnchanged { ip: new_ip });
            self.state = UpdaterState::Idle;
            return Ok(CycleOutcome::IpUnchanged);
        }

        let previous = self.last_known_ip.replace(new_ip.clone());
        info!("IP changed to {}", new_ip);
        self.emit_event(UpdaterEvent::IpChanged {
            previous,
            new_ip: new_ip.clone(),
        });

        let mut outcomes = Vec::with_capacity(self.dns_clients.len());
        for client in &self.dns_clients {
            let provider = client.provider_name();
            let outcome = client.create_or_update_record(&new_ip).await?;
            info!("{}: {}", provider, outcome);

            if outcome.notifies(&new_ip)
                && let Some(notifier) = &self.notifier
            {
                notifier.notify(new_ip.as_str()).await?;
            }

            self.emit_event(UpdaterEvent::ProviderReconciled {
                provider,
                outcome: outcome.clone(),
            });
            outcomes.push(ProviderOutcome { provider, outcome });
        }

        self.state = UpdaterState::Idle;
        Ok(CycleOutcome::Reconciled(outcomes))
    }

    /// Best-effort alert about a fatal error; its own failure is only logged
    async fn report_failure(&self, error: &Error) {
        let Some(notifier) = &self.notifier else {
            return;
        };

        if let Err(notify_error) = notifier
            .notify(&format!("Sync failed with error: {error}"))
            .await
        {
            warn!("Failed to deliver failure notification: {}", notify_error);
        }
    }

    fn stop(&mut self, reason: &str) {
        self.state = UpdaterState::Stopped;
        self.emit_event(UpdaterEvent::Stopped {
            reason: reason.to_string(),
        });
        info!("Updater stopped");
    }

    /// Emit an updater event
    fn emit_event(&self, event: UpdaterEvent) {
        // A full or closed channel must never stall the loop.
        if self.event_tx.try_send(event).is_err() {
            warn!("Event channel full or closed, dropping event");
        }
    }
}

fn log_next_sync(check_period: Duration) {
    let next = chrono::Duration::from_std(check_period)
        .ok()
        .and_then(|delta| chrono::Local::now().checked_add_signed(delta));
    match next {
        Some(at) => info!("Next sync at {}", at.to_rfc3339()),
        None => info!("Next sync in {:?}", check_period),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedIp;

    #[async_trait::async_trait]
    impl IpProvider for FixedIp {
        async fn get_ip(&self) -> Result<IpAddress> {
            IpAddress::new("203.0.113.5")
        }
    }

    #[test]
    fn zero_periods_are_rejected() {
        let settings = UpdaterSettings::new(Duration::ZERO);
        assert!(Updater::new(Box::new(FixedIp), Vec::new(), None, settings).is_err());

        let settings = UpdaterSettings::new(Duration::from_secs(1)).with_poll_quantum(Duration::ZERO);
        assert!(Updater::new(Box::new(FixedIp), Vec::new(), None, settings).is_err());
    }

    #[tokio::test]
    async fn second_cycle_with_same_ip_is_a_no_op() {
        let settings = UpdaterSettings::new(Duration::from_secs(60));
        let (mut updater, mut events) =
            Updater::new(Box::new(FixedIp), Vec::new(), None, settings).unwrap();

        assert_eq!(updater.state(), UpdaterState::Idle);
        assert!(updater.last_known_ip().is_none());

        let first = updater.run_cycle().await.unwrap();
        assert_eq!(first, CycleOutcome::Reconciled(Vec::new()));
        assert_eq!(updater.last_known_ip().unwrap(), "203.0.113.5");

        let second = updater.run_cycle().await.unwrap();
        assert_eq!(second, CycleOutcome::IpUnchanged);
        assert_eq!(updater.state(), UpdaterState::Idle);

        assert_eq!(events.recv().await, Some(UpdaterEvent::CycleStarted));
        assert!(matches!(
            events.recv().await,
            Some(UpdaterEvent::IpChanged { previous: None, .. })
        ));
    }

    #[tokio::test]
    async fn full_event_channel_does_not_block() {
        let settings = UpdaterSettings {
            event_channel_capacity: 1,
            ..UpdaterSettings::new(Duration::from_secs(60))
        };
        let (mut updater, _events) =
            Updater::new(Box::new(FixedIp), Vec::new(), None, settings).unwrap();

        for _ in 0..5 {
            updater.run_cycle().await.unwrap();
        }
    }
}
