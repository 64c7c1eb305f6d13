//! DNS provider abstraction layer
//!
//! The zone resolver and the record set reconciler only ever talk to a
//! provider through the [`DnsProvider`] trait: find a zone, read, write and
//! delete one record set. Implementations live in [`crate::gcore`] and
//! [`memory`].

pub mod memory;

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;

//==============================================================================
// Types
//==============================================================================

/// A zone hosted by the provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Zone {
    /// Zone apex, lowercase, no trailing dot
    pub name: String,
    /// Opaque provider handle
    pub id: String,
}

/// DNS record type of a record set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
pub enum RecordType {
    #[serde(rename = "TXT")]
    Txt,
}

impl RecordType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::Txt => "TXT",
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// All values for one (name, type) pair
///
/// `values` has set semantics but keeps the order the provider returned, so a
/// write-back after removing one token leaves the others where they were.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordSet {
    /// Record name, no trailing dot
    pub name: String,
    #[serde(rename = "type")]
    pub record_type: RecordType,
    pub values: Vec<String>,
    pub ttl: Option<u32>,
}

impl RecordSet {
    pub fn new(name: impl Into<String>, record_type: RecordType) -> Self {
        Self {
            name: name.into(),
            record_type,
            values: Vec::new(),
            ttl: None,
        }
    }

    pub fn with_values<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.values = values.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_ttl(mut self, ttl: u32) -> Self {
        self.ttl = Some(ttl);
        self
    }

    pub fn contains(&self, value: &str) -> bool {
        self.values.iter().any(|v| v == value)
    }
}

impl fmt::Display for RecordSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} [{}]",
            self.record_type,
            self.name,
            self.values.join(", ")
        )?;
        if let Some(ttl) = self.ttl {
            write!(f, " (TTL: {})", ttl)?;
        }
        Ok(())
    }
}

/// Normalizes a DNS name for provider calls: trims whitespace and the
/// trailing dot, lowercases
pub fn unfqdn(name: &str) -> String {
    let trimmed = name.trim();
    trimmed
        .strip_suffix('.')
        .unwrap_or(trimmed)
        .to_ascii_lowercase()
}

//==============================================================================
// Trait
//==============================================================================

/// Zone-scoped record set operations offered by a DNS provider
///
/// Absence is not an error: lookups return `Ok(None)` and deleting a record
/// set that does not exist succeeds. Implementations must be safe to call
/// concurrently; callers never serialize calls among themselves.
#[async_trait]
pub trait DnsProvider: Send + Sync {
    /// Short provider name used in logs and metrics
    fn name(&self) -> &'static str;

    /// Looks up a zone by its exact apex name
    async fn find_zone(&self, name: &str) -> Result<Option<Zone>, ProviderError>;

    /// Reads the record set for (`name`, `record_type`) in `zone`
    async fn get_record_set(
        &self,
        zone: &Zone,
        name: &str,
        record_type: RecordType,
    ) -> Result<Option<RecordSet>, ProviderError>;

    /// Creates the record set or replaces all of its values
    async fn put_record_set(&self, zone: &Zone, record_set: &RecordSet)
        -> Result<(), ProviderError>;

    /// Deletes the record set; an absent record set is not an error
    async fn delete_record_set(
        &self,
        zone: &Zone,
        name: &str,
        record_type: RecordType,
    ) -> Result<(), ProviderError>;
}

//==============================================================================
// Tests
//==============================================================================
