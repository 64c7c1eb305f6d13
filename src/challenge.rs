//! Challenge operation handler
//!
//! The two entry points of the DNS-01 webhook contract. `present` returns as
//! soon as the provider accepted the write; waiting for propagation is the
//! validator's job.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::constants::{MAX_TTL_SECS, MIN_TTL_SECS};
use crate::error::ChallengeError;
use crate::provider::{unfqdn, DnsProvider, RecordType};
use crate::reconciler::{Reconciled, Reconciler};
use crate::validation::{validate_record_name, validate_token};
use crate::zone::{candidate_zones, resolve_zone};

//==============================================================================
// Types
//==============================================================================

/// One present or cleanup call as delivered by the transport
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeRequest {
    /// Challenge record name, trailing-dot form (`_acme-challenge.example.com.`)
    pub fqdn: String,
    /// TXT value to write or remove
    pub key: String,
    #[serde(default)]
    pub resource_namespace: String,
    /// Provider-specific settings for this request
    #[serde(default)]
    pub config: Option<serde_json::Value>,
}

impl ChallengeRequest {
    pub fn new(fqdn: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            fqdn: fqdn.into(),
            key: key.into(),
            resource_namespace: String::new(),
            config: None,
        }
    }

    /// Parses the per-request config blob
    pub fn solver_config(&self) -> Result<SolverConfig, ChallengeError> {
        match &self.config {
            None | Some(serde_json::Value::Null) => Ok(SolverConfig::default()),
            Some(value) => serde_json::from_value(value.clone()).map_err(|e| {
                ChallengeError::MalformedRequest(format!("invalid solver config: {}", e))
            }),
        }
    }
}

/// Settings carried in [`ChallengeRequest::config`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SolverConfig {
    /// TTL for the TXT record set, overrides the process default
    pub ttl: Option<u32>,
}

//==============================================================================
// Solver
//==============================================================================

/// Present/cleanup handler over a DNS provider
///
/// Holds no state between calls; any number of calls may run concurrently.
pub struct ChallengeSolver {
    provider: Arc<dyn DnsProvider>,
    default_ttl: u32,
}

impl ChallengeSolver {
    pub fn new(provider: Arc<dyn DnsProvider>, default_ttl: u32) -> Self {
        Self {
            provider,
            default_ttl,
        }
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }

    /// Adds the request key to the TXT record set of the challenge name
    ///
    /// Fails with `ZoneNotFound` when no zone in the account owns the name.
    pub async fn present(&self, request: &ChallengeRequest) -> Result<Reconciled, ChallengeError> {
        let ttl = check_request(request)?.ttl.unwrap_or(self.default_ttl);
        let name = unfqdn(&request.fqdn);

        let zone = resolve_zone(self.provider.as_ref(), &request.fqdn).await?;
        let outcome = Reconciler::new(self.provider.as_ref())
            .ensure_token(&zone, &name, RecordType::Txt, &request.key, ttl)
            .await?;

        info!(
            "Presented challenge for {} (zone: {}, outcome: {})",
            name, zone.name, outcome
        );
        Ok(outcome)
    }

    /// Removes the request key from the TXT record set of the challenge name
    ///
    /// An already-absent record set or zone counts as clean.
    pub async fn cleanup(&self, request: &ChallengeRequest) -> Result<Reconciled, ChallengeError> {
        check_request(request)?;
        let name = unfqdn(&request.fqdn);

        let zone = match resolve_zone(self.provider.as_ref(), &request.fqdn).await {
            Ok(zone) => zone,
            Err(ChallengeError::ZoneNotFound { .. }) => {
                warn!("No zone owns {} any more, treating as clean", name);
                return Ok(Reconciled::Unchanged);
            }
            Err(e) => return Err(e),
        };
        let outcome = Reconciler::new(self.provider.as_ref())
            .remove_token(&zone, &name, RecordType::Txt, &request.key)
            .await?;

        info!(
            "Cleaned up challenge for {} (zone: {}, outcome: {})",
            name, zone.name, outcome
        );
        Ok(outcome)
    }
}

/// Rejects requests that cannot succeed before any provider call is made
fn check_request(request: &ChallengeRequest) -> Result<SolverConfig, ChallengeError> {
    validate_record_name(&request.fqdn)
        .map_err(|e| ChallengeError::MalformedRequest(format!("fqdn {:?}: {}", request.fqdn, e)))?;
    if candidate_zones(&request.fqdn).is_empty() {
        return Err(ChallengeError::MalformedRequest(format!(
            "fqdn {:?} has no domain portion to resolve",
            request.fqdn
        )));
    }
    validate_token(&request.key).map_err(|e| ChallengeError::MalformedRequest(e.to_string()))?;

    let solver_config = request.solver_config()?;
    if let Some(ttl) = solver_config.ttl {
        if !(MIN_TTL_SECS..=MAX_TTL_SECS).contains(&ttl) {
            return Err(ChallengeError::MalformedRequest(format!(
                "ttl must be between {} and {} seconds, got {}",
                MIN_TTL_SECS, MAX_TTL_SECS, ttl
            )));
        }
    }
    Ok(solver_config)
}

//==============================================================================
// Tests
//==============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::provider::memory::MemoryProvider;

    fn solver(provider: &Arc<MemoryProvider>) -> ChallengeSolver {
        ChallengeSolver::new(provider.clone(), 120)
    }

    #[test]
    fn test_request_deserialization() {
        let json = r#"{
            "fqdn": "_acme-challenge.example.com.",
            "key": "token-A",
            "resourceNamespace": "cert-manager",
            "config": {"ttl": 300}
        }"#;

        let req: ChallengeRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.fqdn, "_acme-challenge.example.com.");
        assert_eq!(req.resource_namespace, "cert-manager");
        assert_eq!(req.solver_config().unwrap().ttl, Some(300));
    }

    #[test]
    fn test_request_without_optional_fields() {
        let json = r#"{"fqdn": "_acme-challenge.example.com.", "key": "token-A"}"#;
        let req: ChallengeRequest = serde_json::from_str(json).unwrap();
        assert!(req.resource_namespace.is_empty());
        assert_eq!(req.solver_config().unwrap(), SolverConfig::default());
    }

    #[test]
    fn test_invalid_solver_config() {
        let mut req = ChallengeRequest::new("_acme-challenge.example.com.", "token-A");
        req.config = Some(serde_json::json!({"ttl": "soon"}));
        let err = req.solver_config().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedRequest);
    }

    #[tokio::test]
    async fn test_present_uses_request_ttl() {
        let provider = Arc::new(MemoryProvider::with_zones(["example.com"]));
        let mut req = ChallengeRequest::new("_acme-challenge.example.com.", "token-A");
        req.config = Some(serde_json::json!({"ttl": 600}));

        solver(&provider).present(&req).await.unwrap();
        let rs = provider
            .record_set("example.com", "_acme-challenge.example.com", RecordType::Txt)
            .unwrap();
        assert_eq!(rs.ttl, Some(600));
    }

    #[tokio::test]
    async fn test_present_rejects_out_of_range_ttl() {
        let provider = Arc::new(MemoryProvider::with_zones(["example.com"]));
        let solver = solver(&provider);

        for ttl in [0u64, 59, 86_401, u64::from(u32::MAX)] {
            let mut req = ChallengeRequest::new("_acme-challenge.example.com.", "token-A");
            req.config = Some(serde_json::json!({ "ttl": ttl }));

            let err = solver.present(&req).await.unwrap_err();
            assert_eq!(err.kind(), ErrorKind::MalformedRequest, "ttl {ttl}");
        }
        assert_eq!(provider.zone_lookups(), 0);
        assert_eq!(provider.writes(), 0);
    }

    #[tokio::test]
    async fn test_cleanup_succeeds_after_zone_removed() {
        let provider = Arc::new(MemoryProvider::with_zones(["example.com"]));
        let solver = solver(&provider);
        let req = ChallengeRequest::new("_acme-challenge.example.com.", "token-A");

        assert_eq!(solver.present(&req).await.unwrap(), Reconciled::Created);
        provider.remove_zone("example.com");

        assert_eq!(solver.cleanup(&req).await.unwrap(), Reconciled::Unchanged);
        assert_eq!(provider.deletes(), 0);
    }

    #[tokio::test]
    async fn test_present_rejects_empty_key_before_provider_call() {
        let provider = Arc::new(MemoryProvider::with_zones(["example.com"]));
        let req = ChallengeRequest::new("_acme-challenge.example.com.", "");

        let err = solver(&provider).present(&req).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedRequest);
        assert_eq!(provider.zone_lookups(), 0);
    }

    #[tokio::test]
    async fn test_present_rejects_name_without_domain() {
        let provider = Arc::new(MemoryProvider::with_zones(["com"]));
        let req = ChallengeRequest::new("_acme-challenge.com.", "token-A");

        let err = solver(&provider).present(&req).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedRequest);
        assert_eq!(provider.zone_lookups(), 0);
    }

    #[tokio::test]
    async fn test_present_fails_without_zone() {
        let provider = Arc::new(MemoryProvider::with_zones(["other.org"]));
        let req = ChallengeRequest::new("_acme-challenge.example.com.", "token-A");

        let err = solver(&provider).present(&req).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ZoneNotFound);
        assert_eq!(provider.writes(), 0);
    }

    #[tokio::test]
    async fn test_cleanup_succeeds_without_zone() {
        let provider = Arc::new(MemoryProvider::with_zones(["other.org"]));
        let req = ChallengeRequest::new("_acme-challenge.example.com.", "token-A");

        let outcome = solver(&provider).cleanup(&req).await.unwrap();
        assert_eq!(outcome, Reconciled::Unchanged);
    }

    #[tokio::test]
    async fn test_present_then_cleanup_round_trip() {
        let provider = Arc::new(MemoryProvider::with_zones(["example.com"]));
        let solver = solver(&provider);
        let req = ChallengeRequest::new("_acme-challenge.Example.com.", "token-A");

        assert_eq!(solver.present(&req).await.unwrap(), Reconciled::Created);
        assert_eq!(solver.cleanup(&req).await.unwrap(), Reconciled::Deleted);
        assert!(provider
            .record_set("example.com", "_acme-challenge.example.com", RecordType::Txt)
            .is_none());
    }
}
