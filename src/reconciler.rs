//! Record set reconciliation
//!
//! Present and cleanup are read-merge-write transactions against a single
//! record set. The provider offers no compare-and-swap, so the read and the
//! write are separate calls: a concurrent writer for the same (name, type) can
//! slip in between them and the later write wins. Both operations are
//! idempotent, which lets the validator's own retry loop converge on the final
//! state.

use std::fmt;

use tracing::{debug, info};

use crate::error::{ChallengeError, Step};
use crate::provider::{DnsProvider, RecordSet, RecordType, Zone};

//==============================================================================
// Types
//==============================================================================

/// What a reconciliation pass did to the record set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciled {
    /// Nothing was written
    Unchanged,
    /// The record set did not exist and was created
    Created,
    /// The record set was rewritten with a different value list
    Updated,
    /// The record set was deleted because no values remained
    Deleted,
}

impl Reconciled {
    pub fn as_str(&self) -> &'static str {
        match self {
            Reconciled::Unchanged => "unchanged",
            Reconciled::Created => "created",
            Reconciled::Updated => "updated",
            Reconciled::Deleted => "deleted",
        }
    }
}

impl fmt::Display for Reconciled {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

//==============================================================================
// Reconciler
//==============================================================================

/// Read-merge-write engine over one provider
pub struct Reconciler<'a> {
    provider: &'a dyn DnsProvider,
}

impl<'a> Reconciler<'a> {
    pub fn new(provider: &'a dyn DnsProvider) -> Self {
        Self { provider }
    }

    /// Ensures `token` is one of the values of the record set
    ///
    /// Existing values are kept in order and the token is appended. Empty
    /// values are dropped from what gets written. A token already present
    /// means no write, unless empty values had to be dropped.
    pub async fn ensure_token(
        &self,
        zone: &Zone,
        name: &str,
        record_type: RecordType,
        token: &str,
        ttl: u32,
    ) -> Result<Reconciled, ChallengeError> {
        let current = self.read(zone, name, record_type).await?;
        let existed = current.is_some();
        let (mut values, current_ttl) = current
            .map(|rs| (rs.values, rs.ttl))
            .unwrap_or_default();
        let original_len = values.len();
        values.retain(|v| !v.is_empty());
        let dropped_empty = values.len() != original_len;

        let mut record_set = RecordSet {
            name: name.to_string(),
            record_type,
            values,
            ttl: Some(ttl),
        };
        if record_set.contains(token) {
            if !dropped_empty {
                debug!("{} {} already holds token", record_type, name);
                return Ok(Reconciled::Unchanged);
            }
            // token already there, only the empty values go
            record_set.ttl = current_ttl;
        } else {
            record_set.values.push(token.to_string());
        }

        self.provider
            .put_record_set(zone, &record_set)
            .await
            .map_err(|e| ChallengeError::provider(Step::WriteRecordSet, e))?;

        info!("Wrote {} in zone {}", record_set, zone.name);
        Ok(if existed {
            Reconciled::Updated
        } else {
            Reconciled::Created
        })
    }

    /// Removes one occurrence of `token` from the record set
    ///
    /// A missing record set is already clean. Empty values are dropped. If
    /// nothing remains the record set is deleted rather than written empty.
    /// Duplicate tokens are removed one per call.
    pub async fn remove_token(
        &self,
        zone: &Zone,
        name: &str,
        record_type: RecordType,
        token: &str,
    ) -> Result<Reconciled, ChallengeError> {
        let Some(current) = self.read(zone, name, record_type).await? else {
            debug!("{} {} not found, nothing to clean", record_type, name);
            return Ok(Reconciled::Unchanged);
        };

        let original_len = current.values.len();
        let mut values = current.values;
        values.retain(|v| !v.is_empty());
        let dropped_empty = values.len() != original_len;

        let removed = match values.iter().position(|v| v == token) {
            Some(idx) => {
                values.remove(idx);
                true
            }
            None => false,
        };

        if !removed && !dropped_empty {
            debug!("{} {} does not hold token, nothing to clean", record_type, name);
            return Ok(Reconciled::Unchanged);
        }

        if values.is_empty() {
            self.provider
                .delete_record_set(zone, name, record_type)
                .await
                .map_err(|e| ChallengeError::provider(Step::DeleteRecordSet, e))?;
            info!("Deleted {} {} in zone {}", record_type, name, zone.name);
            return Ok(Reconciled::Deleted);
        }

        let record_set = RecordSet {
            name: name.to_string(),
            record_type,
            values,
            ttl: current.ttl,
        };
        self.provider
            .put_record_set(zone, &record_set)
            .await
            .map_err(|e| ChallengeError::provider(Step::WriteRecordSet, e))?;

        info!("Wrote {} in zone {}", record_set, zone.name);
        Ok(Reconciled::Updated)
    }

    async fn read(
        &self,
        zone: &Zone,
        name: &str,
        record_type: RecordType,
    ) -> Result<Option<RecordSet>, ChallengeError> {
        self.provider
            .get_record_set(zone, name, record_type)
            .await
            .map_err(|e| ChallengeError::provider(Step::ReadRecordSet, e))
    }
}

//==============================================================================
// Tests
//==============================================================================
