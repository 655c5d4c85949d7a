//! Test doubles and common utilities for updater contract tests
//!
//! Every double records its calls behind an `Arc`, so a test keeps a handle
//! after moving the double into the updater.

#![allow(dead_code)]

use ddns_core::error::{Error, Result};
use ddns_core::traits::{DnsClient, IpAddress, IpProvider, Notifier, ReconciliationOutcome};
use ddns_core::{Updater, UpdaterEvent, UpdaterSettings};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

pub fn ip(value: &str) -> IpAddress {
    IpAddress::new(value).expect("valid test address")
}

/// An IpProvider that returns scripted addresses, repeating the last one
#[derive(Clone)]
pub struct ScriptedIpProvider {
    script: Arc<Mutex<VecDeque<Result<IpAddress>>>>,
    last: Arc<Mutex<Option<IpAddress>>>,
    calls: Arc<AtomicUsize>,
}

impl ScriptedIpProvider {
    pub fn new(addresses: &[&str]) -> Self {
        Self {
            script: Arc::new(Mutex::new(addresses.iter().map(|a| Ok(ip(a))).collect())),
            last: Arc::new(Mutex::new(None)),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Queue a failure for the next call
    pub fn push_error(&self, error: Error) {
        self.script.lock().unwrap().push_back(Err(error));
    }

    /// Get the number of times get_ip() was called
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl IpProvider for ScriptedIpProvider {
    async fn get_ip(&self) -> Result<IpAddress> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self.script.lock().unwrap().pop_front();
        match next {
            Some(Ok(address)) => {
                *self.last.lock().unwrap() = Some(address.clone());
                Ok(address)
            }
            Some(Err(error)) => Err(error),
            None => self
                .last
                .lock()
                .unwrap()
                .clone()
                .ok_or_else(|| Error::network("script exhausted")),
        }
    }
}

/// A DnsClient that returns a fixed outcome and records every target
#[derive(Clone)]
pub struct RecordingDnsClient {
    name: &'static str,
    outcome: Arc<Mutex<Option<ReconciliationOutcome>>>,
    targets: Arc<Mutex<Vec<IpAddress>>>,
    journal: Option<Arc<Mutex<Vec<&'static str>>>>,
}

impl RecordingDnsClient {
    pub fn new(name: &'static str, outcome: ReconciliationOutcome) -> Self {
        Self {
            name,
            outcome: Arc::new(Mutex::new(Some(outcome))),
            targets: Arc::new(Mutex::new(Vec::new())),
            journal: None,
        }
    }

    /// A client whose calls fail with a network error
    pub fn failing(name: &'static str) -> Self {
        Self {
            outcome: Arc::new(Mutex::new(None)),
            ..Self::new(name, ReconciliationOutcome::Created)
        }
    }

    /// Record the provider name into a journal shared across clients
    pub fn with_journal(mut self, journal: Arc<Mutex<Vec<&'static str>>>) -> Self {
        self.journal = Some(journal);
        self
    }

    /// Get the number of times create_or_update_record() was called
    pub fn call_count(&self) -> usize {
        self.targets.lock().unwrap().len()
    }

    /// Targets passed to create_or_update_record(), in call order
    pub fn targets(&self) -> Vec<IpAddress> {
        self.targets.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl DnsClient for RecordingDnsClient {
    async fn create_or_update_record(&self, target: &IpAddress) -> Result<ReconciliationOutcome> {
        self.targets.lock().unwrap().push(target.clone());
        if let Some(journal) = &self.journal {
            journal.lock().unwrap().push(self.name);
        }
        self.outcome
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| Error::network(format!("{} unreachable", self.name)))
    }

    fn provider_name(&self) -> &'static str {
        self.name
    }
}

/// A Notifier that records messages and can be told to fail
#[derive(Clone, Default)]
pub struct RecordingNotifier {
    messages: Arc<Mutex<Vec<String>>>,
    fail: bool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Messages delivered (or attempted, when failing), in order
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, message: &str) -> Result<()> {
        self.messages.lock().unwrap().push(message.to_string());
        if self.fail {
            return Err(Error::notifier("chat unreachable"));
        }
        Ok(())
    }
}

/// Settings with a fast quantum so loop tests finish quickly
pub fn fast_settings(check_period: Duration) -> UpdaterSettings {
    UpdaterSettings::new(check_period).with_poll_quantum(Duration::from_millis(10))
}

/// Helper to build an updater from doubles
pub fn updater(
    ip_provider: &ScriptedIpProvider,
    clients: &[RecordingDnsClient],
    notifier: Option<&RecordingNotifier>,
    settings: UpdaterSettings,
) -> (Updater, mpsc::Receiver<UpdaterEvent>) {
    let clients: Vec<Box<dyn DnsClient>> = clients
        .iter()
        .cloned()
        .map(|c| Box::new(c) as Box<dyn DnsClient>)
        .collect();
    let notifier = notifier.map(|n| Box::new(n.clone()) as Box<dyn Notifier>);

    Updater::new(Box::new(ip_provider.clone()), clients, notifier, settings)
        .expect("updater construction succeeds")
}

/// Drain every event currently buffered
pub fn drain(events: &mut mpsc::Receiver<UpdaterEvent>) -> Vec<UpdaterEvent> {
    let mut drained = Vec::new();
    while let Ok(event) = events.try_recv() {
        drained.push(event);
    }
    drained
}
