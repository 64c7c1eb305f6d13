//! In-memory DNS provider
//!
//! Holds zones and record sets in process memory. Used by the test suites and
//! selectable at runtime (`provider_type = "memory"`) to exercise callers
//! without provider credentials.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, RwLock};

use async_trait::async_trait;

use super::{unfqdn, DnsProvider, RecordSet, RecordType, Zone};
use crate::error::ProviderError;

/// Provider operation, used to inject failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    FindZone,
    GetRecordSet,
    PutRecordSet,
    DeleteRecordSet,
}

type RecordKey = (String, String, RecordType);

/// In-memory provider backend
#[derive(Default)]
pub struct MemoryProvider {
    zones: RwLock<HashMap<String, Zone>>,
    /// (zone, record name, type) -> record set
    records: RwLock<HashMap<RecordKey, RecordSet>>,
    failures: Mutex<HashMap<Operation, VecDeque<ProviderError>>>,
    zone_lookups: AtomicUsize,
    writes: AtomicUsize,
    deletes: AtomicUsize,
}

impl MemoryProvider {
    /// Create a new empty provider
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a provider that hosts the given zones
    pub fn with_zones<I, S>(zones: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let provider = Self::new();
        for zone in zones {
            provider.add_zone(zone.as_ref());
        }
        provider
    }

    pub fn add_zone(&self, name: &str) {
        let name = unfqdn(name);
        let zone = Zone {
            id: format!("mem-{}", name),
            name: name.clone(),
        };
        self.zones
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(name, zone);
    }

    pub fn remove_zone(&self, name: &str) {
        self.zones
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&unfqdn(name));
    }

    /// Seeds a record set without counting it as a write
    pub fn insert_record_set(&self, zone: &str, record_set: RecordSet) {
        let key = (unfqdn(zone), unfqdn(&record_set.name), record_set.record_type);
        self.records
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key, record_set);
    }

    /// Current record set, if any
    pub fn record_set(&self, zone: &str, name: &str, record_type: RecordType) -> Option<RecordSet> {
        let key = (unfqdn(zone), unfqdn(name), record_type);
        self.records
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&key)
            .cloned()
    }

    /// Makes the next call of `operation` fail with `error`
    ///
    /// Failures queue up: each call consumes one.
    pub fn fail_next(&self, operation: Operation, error: ProviderError) {
        self.failures
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .entry(operation)
            .or_default()
            .push_back(error);
    }

    pub fn zone_lookups(&self) -> usize {
        self.zone_lookups.load(Ordering::SeqCst)
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn deletes(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }

    fn injected_failure(&self, operation: Operation) -> Result<(), ProviderError> {
        let mut failures = self.failures.lock().map_err(|e| {
            ProviderError::Unavailable(format!("lock poisoned: {}", e))
        })?;
        match failures.get_mut(&operation).and_then(VecDeque::pop_front) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn zone_exists(&self, zone: &Zone) -> Result<bool, ProviderError> {
        let zones = self.zones.read().map_err(|e| {
            ProviderError::Unavailable(format!("lock poisoned: {}", e))
        })?;
        Ok(zones.contains_key(&zone.name))
    }
}

#[async_trait]
impl DnsProvider for MemoryProvider {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn find_zone(&self, name: &str) -> Result<Option<Zone>, ProviderError> {
        self.zone_lookups.fetch_add(1, Ordering::SeqCst);
        self.injected_failure(Operation::FindZone)?;
        let zones = self.zones.read().map_err(|e| {
            ProviderError::Unavailable(format!("lock poisoned: {}", e))
        })?;
        Ok(zones.get(&unfqdn(name)).cloned())
    }

    async fn get_record_set(
        &self,
        zone: &Zone,
        name: &str,
        record_type: RecordType,
    ) -> Result<Option<RecordSet>, ProviderError> {
        self.injected_failure(Operation::GetRecordSet)?;
        let records = self.records.read().map_err(|e| {
            ProviderError::Unavailable(format!("lock poisoned: {}", e))
        })?;
        Ok(records
            .get(&(zone.name.clone(), unfqdn(name), record_type))
            .cloned())
    }

    async fn put_record_set(
        &self,
        zone: &Zone,
        record_set: &RecordSet,
    ) -> Result<(), ProviderError> {
        self.injected_failure(Operation::PutRecordSet)?;
        if !self.zone_exists(zone)? {
            return Err(ProviderError::Rejected(format!("zone {} not found", zone.name)));
        }
        let mut stored = record_set.clone();
        stored.name = unfqdn(&record_set.name);
        let key = (zone.name.clone(), stored.name.clone(), stored.record_type);
        self.records
            .write()
            .map_err(|e| ProviderError::Unavailable(format!("lock poisoned: {}", e)))?
            .insert(key, stored);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn delete_record_set(
        &self,
        zone: &Zone,
        name: &str,
        record_type: RecordType,
    ) -> Result<(), ProviderError> {
        self.injected_failure(Operation::DeleteRecordSet)?;
        self.records
            .write()
            .map_err(|e| ProviderError::Unavailable(format!("lock poisoned: {}", e)))?
            .remove(&(zone.name.clone(), unfqdn(name), record_type));
        self.deletes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
