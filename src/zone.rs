//! Zone resolution by longest-suffix match
//!
//! An account may host both `example.com` and `dev.example.com` as separate
//! zones; challenge records must land in the innermost zone the account
//! manages, so candidates are tried from most to least specific.

use tracing::debug;

use crate::constants::ACME_CHALLENGE_LABEL;
use crate::error::{ChallengeError, Step};
use crate::provider::{unfqdn, DnsProvider, Zone};

/// Candidate zone names for a challenge FQDN, most specific first
///
/// The `_acme-challenge` label is stripped, then labels are dropped from the
/// left one at a time. Bare single labels (TLDs) are never candidates, so a
/// remainder with fewer than two labels yields no candidates at all.
///
/// ```
/// use gcore_dns01::zone::candidate_zones;
///
/// assert_eq!(
///     candidate_zones("_acme-challenge.my.test.domain.com."),
///     vec!["my.test.domain.com", "test.domain.com", "domain.com"]
/// );
/// assert!(candidate_zones("_acme-challenge.com.").is_empty());
/// ```
pub fn candidate_zones(fqdn: &str) -> Vec<String> {
    let name = unfqdn(fqdn);
    let domain = name
        .strip_prefix(ACME_CHALLENGE_LABEL)
        .and_then(|rest| rest.strip_prefix('.'))
        .unwrap_or(&name);

    let labels: Vec<&str> = domain.split('.').filter(|l| !l.is_empty()).collect();
    if labels.len() < 2 {
        return Vec::new();
    }

    (0..labels.len() - 1)
        .map(|i| labels[i..].join("."))
        .collect()
}

/// Finds the most specific zone in the provider account that owns `fqdn`
pub async fn resolve_zone(
    provider: &dyn DnsProvider,
    fqdn: &str,
) -> Result<Zone, ChallengeError> {
    for candidate in candidate_zones(fqdn) {
        debug!("Looking up zone {}", candidate);
        let found = provider
            .find_zone(&candidate)
            .await
            .map_err(|e| ChallengeError::provider(Step::ResolveZone, e))?;
        if let Some(zone) = found {
            debug!("Resolved {} to zone {} ({})", fqdn, zone.name, zone.id);
            return Ok(zone);
        }
    }

    Err(ChallengeError::ZoneNotFound {
        fqdn: fqdn.to_string(),
    })
}
