//! Contract Test: Cooperative Shutdown
//!
//! Constraints verified:
//! - A shutdown request while idle stops the loop within one poll quantum
//! - No IpProvider or DnsClient call happens after the stop
//! - An in-flight cycle is never interrupted; the loop stops after it
//! - The final state is Stopped and a Stopped event is emitted

mod common;

use common::*;
use ddns_core::error::Result;
use ddns_core::traits::{DnsClient, IpAddress, ReconciliationOutcome};
use ddns_core::{ShutdownSignal, Updater, UpdaterEvent, UpdaterState};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

#[tokio::test]
async fn shutdown_while_idle_stops_within_a_quantum() {
    let ip_provider = ScriptedIpProvider::new(&["1.1.1.1"]);
    let client = RecordingDnsClient::new("dns", ReconciliationOutcome::Created);
    let (mut updater, mut events) = updater(
        &ip_provider,
        &[client.clone()],
        None,
        fast_settings(Duration::from_secs(3600)),
    );

    let shutdown = ShutdownSignal::new();
    let handle = {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            let result = updater.run(&shutdown).await;
            (result, updater)
        })
    };

    // Let the initial sync finish; the loop is then idle for an hour.
    tokio::time::sleep(Duration::from_millis(100)).await;
    let calls_before = ip_provider.call_count();
    shutdown.trigger();

    let (result, updater) = tokio::time::timeout(Duration::from_millis(500), handle)
        .await
        .expect("updater stops promptly")
        .unwrap();

    assert!(result.is_ok(), "clean shutdown: {result:?}");
    assert_eq!(updater.state(), UpdaterState::Stopped);
    assert_eq!(ip_provider.call_count(), calls_before);
    assert_eq!(client.call_count(), 1);

    let events = drain(&mut events);
    assert_eq!(
        events.last(),
        Some(&UpdaterEvent::Stopped {
            reason: "Shutdown signal".to_string(),
        })
    );
}

#[tokio::test]
async fn shutdown_before_first_tick_makes_no_calls() {
    let ip_provider = ScriptedIpProvider::new(&["1.1.1.1"]);
    let client = RecordingDnsClient::new("dns", ReconciliationOutcome::Created);
    let (mut updater, _events) = updater(
        &ip_provider,
        &[client.clone()],
        None,
        fast_settings(Duration::from_secs(3600)),
    );

    let shutdown = ShutdownSignal::new();
    shutdown.trigger();
    updater.run(&shutdown).await.expect("clean shutdown");

    assert_eq!(ip_provider.call_count(), 0);
    assert_eq!(client.call_count(), 0);
    assert_eq!(updater.state(), UpdaterState::Stopped);
}

#[tokio::test]
async fn in_flight_cycle_completes_before_stop() {
    struct SlowClient {
        started: Arc<AtomicUsize>,
        finished: Arc<AtomicUsize>,
    }

    #[async_trait::async_trait]
    impl DnsClient for SlowClient {
        async fn create_or_update_record(&self, _target: &IpAddress) -> Result<ReconciliationOutcome> {
            self.started.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(200)).await;
            self.finished.fetch_add(1, Ordering::SeqCst);
            Ok(ReconciliationOutcome::Created)
        }

        fn provider_name(&self) -> &'static str {
            "slow"
        }
    }

    let started = Arc::new(AtomicUsize::new(0));
    let finished = Arc::new(AtomicUsize::new(0));
    let ip_provider = ScriptedIpProvider::new(&["1.1.1.1"]);
    let (mut updater, _events) = Updater::new(
        Box::new(ip_provider.clone()),
        vec![Box::new(SlowClient {
            started: started.clone(),
            finished: finished.clone(),
        })],
        None,
        fast_settings(Duration::from_secs(3600)),
    )
    .expect("updater construction succeeds");

    let shutdown = ShutdownSignal::new();
    let handle = {
        let shutdown = shutdown.clone();
        tokio::spawn(async move { updater.run(&shutdown).await })
    };

    // Trigger while the slow provider call is in flight.
    tokio::time::sleep(Duration::from_millis(60)).await;
    assert_eq!(started.load(Ordering::SeqCst), 1);
    shutdown.trigger();

    let result = tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("updater stops after the cycle")
        .unwrap();

    assert!(result.is_ok());
    assert_eq!(finished.load(Ordering::SeqCst), 1, "the call was not interrupted");
    assert_eq!(ip_provider.call_count(), 1, "no new cycle after shutdown");
}

#[tokio::test]
async fn stopped_updater_refuses_to_run_again() {
    let ip_provider = ScriptedIpProvider::new(&["1.1.1.1"]);
    let (mut updater, _events) =
        updater(&ip_provider, &[], None, fast_settings(Duration::from_secs(3600)));

    let shutdown = ShutdownSignal::new();
    shutdown.trigger();
    updater.run(&shutdown).await.unwrap();

    assert!(updater.run(&ShutdownSignal::new()).await.is_err());
}
