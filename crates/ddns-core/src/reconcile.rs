//! Per-provider upsert protocol
//!
//! Every provider shares the same shape and differs only in wire format:
//!
//! 1. Verify credentials if the provider requires it; a rejection short-circuits
//!    to [`ReconciliationOutcome::AuthFailed`] before any read or write.
//! 2. List records and select the first whose name matches the managed record.
//!    Only the first page of a paginated listing is consulted.
//! 3. No match: create, return `Created`.
//! 4. Match holding the target: no write, return `Unchanged`.
//! 5. Match holding another value: update by id, return `Updated(previous)`.

use crate::error::Result;
use crate::traits::{DnsRecord, IpAddress, ReconciliationOutcome, RecordBackend};
use tracing::{debug, info, warn};

/// Run the upsert protocol for `backend` against `target`
pub async fn reconcile<B>(backend: &B, target: &IpAddress) -> Result<ReconciliationOutcome>
where
    B: RecordBackend + ?Sized,
{
    let provider = backend.provider_name();
    let name = backend.record_name();

    if !backend.verify_credentials().await? {
        warn!(
            "{}: credential verification failed, leaving record {} untouched",
            provider, name
        );
        return Ok(ReconciliationOutcome::AuthFailed);
    }

    let records = backend.list_records().await?;
    debug!("{}: listed {} record(s)", provider, records.len());

    match select_record(records, name) {
        None => {
            info!("{}: creating record {} with ip={}", provider, name, target);
            backend.create_record(target).await?;
            Ok(ReconciliationOutcome::Created)
        }
        Some(record) if record.content == target.as_str() => {
            info!(
                "{}: record {} already up to date with ip={}",
                provider, name, target
            );
            Ok(ReconciliationOutcome::Unchanged(target.clone()))
        }
        Some(record) => {
            info!(
                "{}: updating record {} (id={}) {:?} -> {}",
                provider, name, record.id, record.content, target
            );
            backend.update_record(&record, target).await?;
            Ok(ReconciliationOutcome::Updated(record.content))
        }
    }
}

/// First record whose name equals `name`
pub fn select_record(records: Vec<DnsRecord>, name: &str) -> Option<DnsRecord> {
    records.into_iter().find(|record| record.name == name)
}
