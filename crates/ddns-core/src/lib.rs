// # ddns-core
//
// Core library for the polling DDNS client.
//
// ## Architecture Overview
//
// - **IpProvider**: Trait for resolving the current public IP
// - **DnsClient**: Trait for reconciling one DNS record with a target IP
// - **RecordBackend** + **reconcile**: The shared upsert protocol behind every DnsClient
// - **Notifier**: Trait for delivering one-line alerts
// - **Updater**: Poll/compare/reconcile/notify loop with cooperative shutdown
// - **ProviderRegistry**: Name-to-factory registry for DNS clients
//
// ## Design Principles
//
// 1. **Single writer**: The updater owns the last known IP; nothing else reads it
// 2. **Sequential**: Providers are reconciled one after another in configured order
// 3. **Idempotent**: Reconciliation writes nothing once remote state converged
// 4. **Fail loud**: Any cycle error stops the loop; nothing retries

pub mod traits;
pub mod engine;
pub mod reconcile;
pub mod registry;
pub mod config;
pub mod error;

// Re-export core types for convenience
pub use traits::{
    DnsClient, DnsClientFactory, DnsRecord, IpAddress, IpProvider, Notifier,
    ReconciliationOutcome, RecordBackend,
};
pub use engine::{
    CycleOutcome, ProviderOutcome, ShutdownSignal, Updater, UpdaterEvent, UpdaterSettings,
    UpdaterState,
};
pub use reconcile::reconcile;
pub use registry::ProviderRegistry;
pub use config::{ClientConfig, Mode, ProviderConfig, ServerConfig, TelegramConfig};
pub use error::{Error, Result};
